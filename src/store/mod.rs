//! Persistence for candidates and county forms.
//!
//! Handlers only see the repository traits; [`SqliteStore`] is the one
//! implementation and can run against a file or an in-memory database.

pub mod migrations;
pub mod sqlite;

use thiserror::Error;

use crate::types::{Candidate, FormDetails, NewCandidate, NewForm};

pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{entity} with this {field} already exists.")]
    Duplicate { entity: &'static str, field: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub trait CandidateRepository: Send + Sync {
    fn list_candidates(&self) -> StoreResult<Vec<Candidate>>;
    fn get_candidate(&self, id: i64) -> StoreResult<Option<Candidate>>;
    fn insert_candidate(&self, candidate: &NewCandidate) -> StoreResult<Candidate>;
    fn update_candidate(&self, candidate: &Candidate) -> StoreResult<Candidate>;
    /// Returns `false` when no row had that id.
    fn delete_candidate(&self, id: i64) -> StoreResult<bool>;
}

pub trait FormRepository: Send + Sync {
    fn list_forms(&self) -> StoreResult<Vec<FormDetails>>;
    fn get_form(&self, id: i64) -> StoreResult<Option<FormDetails>>;
    fn insert_form(&self, form: &NewForm) -> StoreResult<FormDetails>;
    fn update_form(&self, form: &FormDetails) -> StoreResult<FormDetails>;
    fn delete_form(&self, id: i64) -> StoreResult<bool>;
}

/// Everything the HTTP layer needs from storage.
pub trait TallyRepository: CandidateRepository + FormRepository {}

impl<T: CandidateRepository + FormRepository> TallyRepository for T {}
