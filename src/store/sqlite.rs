use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::debug;

use crate::store::migrations::BASE_MIGRATION;
use crate::store::{CandidateRepository, FormRepository, StoreError, StoreResult};
use crate::types::{Candidate, FormDetails, NewCandidate, NewForm};

const CANDIDATE_ENTITY: &str = "candidate";
const FORM_ENTITY: &str = "form details";

const CANDIDATE_COLUMNS: &str = "id, name, keyword, party, votes, votes_percentage";
const FORM_COLUMNS: &str = "id, county, registered_voters, valid_votes, spoilt_votes, \
     voter_turnout, odinga, ruto, wajackoyah, mweure";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        debug!("opened tally database at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn migrate(&self) -> StoreResult<()> {
        self.conn().execute_batch(BASE_MIGRATION)?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves SQLite itself consistent.
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CandidateRepository for SqliteStore {
    fn list_candidates(&self) -> StoreResult<Vec<Candidate>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates ORDER BY id"
        ))?;
        let rows = stmt
            .query_map([], row_to_candidate)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_candidate(&self, id: i64) -> StoreResult<Option<Candidate>> {
        let conn = self.conn();
        let candidate = conn
            .query_row(
                &format!("SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE id = ?1"),
                params![id],
                row_to_candidate,
            )
            .optional()?;
        Ok(candidate)
    }

    fn insert_candidate(&self, candidate: &NewCandidate) -> StoreResult<Candidate> {
        let conn = self.conn();
        conn.execute(
            r#"
INSERT INTO candidates(name, keyword, party, votes, votes_percentage)
VALUES (?1, ?2, ?3, ?4, ?5)
"#,
            params![
                candidate.name,
                candidate.keyword,
                candidate.party,
                candidate.votes,
                candidate.votes_percentage
            ],
        )
        .map_err(|e| classify(e, CANDIDATE_ENTITY))?;
        Ok(Candidate {
            id: conn.last_insert_rowid(),
            name: candidate.name.clone(),
            keyword: candidate.keyword.clone(),
            party: candidate.party.clone(),
            votes: candidate.votes,
            votes_percentage: candidate.votes_percentage,
        })
    }

    fn update_candidate(&self, candidate: &Candidate) -> StoreResult<Candidate> {
        let changed = self
            .conn()
            .execute(
                r#"
UPDATE candidates
SET name = ?2, keyword = ?3, party = ?4, votes = ?5, votes_percentage = ?6
WHERE id = ?1
"#,
                params![
                    candidate.id,
                    candidate.name,
                    candidate.keyword,
                    candidate.party,
                    candidate.votes,
                    candidate.votes_percentage
                ],
            )
            .map_err(|e| classify(e, CANDIDATE_ENTITY))?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: CANDIDATE_ENTITY,
                id: candidate.id,
            });
        }
        Ok(candidate.clone())
    }

    fn delete_candidate(&self, id: i64) -> StoreResult<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM candidates WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

impl FormRepository for SqliteStore {
    fn list_forms(&self) -> StoreResult<Vec<FormDetails>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {FORM_COLUMNS} FROM forms ORDER BY id"))?;
        let rows = stmt
            .query_map([], row_to_form)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_form(&self, id: i64) -> StoreResult<Option<FormDetails>> {
        let conn = self.conn();
        let form = conn
            .query_row(
                &format!("SELECT {FORM_COLUMNS} FROM forms WHERE id = ?1"),
                params![id],
                row_to_form,
            )
            .optional()?;
        Ok(form)
    }

    fn insert_form(&self, form: &NewForm) -> StoreResult<FormDetails> {
        let conn = self.conn();
        conn.execute(
            r#"
INSERT INTO forms(
    county, registered_voters, valid_votes, spoilt_votes, voter_turnout,
    odinga, ruto, wajackoyah, mweure
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
"#,
            params![
                form.county,
                form.registered_voters,
                form.valid_votes,
                form.spoilt_votes,
                form.voter_turnout,
                form.odinga,
                form.ruto,
                form.wajackoyah,
                form.mweure
            ],
        )
        .map_err(|e| classify(e, FORM_ENTITY))?;
        Ok(FormDetails {
            id: conn.last_insert_rowid(),
            county: form.county.clone(),
            registered_voters: form.registered_voters,
            valid_votes: form.valid_votes,
            spoilt_votes: form.spoilt_votes,
            voter_turnout: form.voter_turnout,
            odinga: form.odinga,
            ruto: form.ruto,
            wajackoyah: form.wajackoyah,
            mweure: form.mweure,
        })
    }

    fn update_form(&self, form: &FormDetails) -> StoreResult<FormDetails> {
        let changed = self
            .conn()
            .execute(
                r#"
UPDATE forms
SET county = ?2, registered_voters = ?3, valid_votes = ?4, spoilt_votes = ?5,
    voter_turnout = ?6, odinga = ?7, ruto = ?8, wajackoyah = ?9, mweure = ?10
WHERE id = ?1
"#,
                params![
                    form.id,
                    form.county,
                    form.registered_voters,
                    form.valid_votes,
                    form.spoilt_votes,
                    form.voter_turnout,
                    form.odinga,
                    form.ruto,
                    form.wajackoyah,
                    form.mweure
                ],
            )
            .map_err(|e| classify(e, FORM_ENTITY))?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: FORM_ENTITY,
                id: form.id,
            });
        }
        Ok(form.clone())
    }

    fn delete_form(&self, id: i64) -> StoreResult<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM forms WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

/// Turns a UNIQUE failure ("UNIQUE constraint failed: forms.county") into
/// [`StoreError::Duplicate`] naming the offending column.
fn classify(error: rusqlite::Error, entity: &'static str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(inner, Some(message)) = &error {
        if inner.code == ErrorCode::ConstraintViolation {
            if let Some(columns) = message.strip_prefix("UNIQUE constraint failed: ") {
                let field = columns
                    .split(',')
                    .next()
                    .and_then(|col| col.trim().rsplit('.').next())
                    .unwrap_or(columns)
                    .to_string();
                return StoreError::Duplicate { entity, field };
            }
        }
    }
    StoreError::Sqlite(error)
}

fn row_to_candidate(row: &Row<'_>) -> rusqlite::Result<Candidate> {
    Ok(Candidate {
        id: row.get(0)?,
        name: row.get(1)?,
        keyword: row.get(2)?,
        party: row.get(3)?,
        votes: row.get(4)?,
        votes_percentage: row.get(5)?,
    })
}

fn row_to_form(row: &Row<'_>) -> rusqlite::Result<FormDetails> {
    Ok(FormDetails {
        id: row.get(0)?,
        county: row.get(1)?,
        registered_voters: row.get(2)?,
        valid_votes: row.get(3)?,
        spoilt_votes: row.get(4)?,
        voter_turnout: row.get(5)?,
        odinga: row.get(6)?,
        ruto: row.get(7)?,
        wajackoyah: row.get(8)?,
        mweure: row.get(9)?,
    })
}
