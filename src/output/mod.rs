pub mod csv;
pub mod table;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use crate::tally::SummaryReport;
use crate::types::{Candidate, FormDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

/// Anything the CLI can print in every output format.
pub trait Render: Serialize {
    fn to_table(&self) -> String;
    fn to_csv(&self) -> Result<String>;
}

pub fn render<T: Render + ?Sized>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(value.to_table()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Csv => value.to_csv(),
    }
}

impl Render for SummaryReport {
    fn to_table(&self) -> String {
        table::render_summary_table(self)
    }

    fn to_csv(&self) -> Result<String> {
        csv::summary_to_csv(self)
    }
}

impl Render for [FormDetails] {
    fn to_table(&self) -> String {
        table::render_forms_table(self)
    }

    fn to_csv(&self) -> Result<String> {
        csv::forms_to_csv(self)
    }
}

impl Render for [Candidate] {
    fn to_table(&self) -> String {
        table::render_candidates_table(self)
    }

    fn to_csv(&self) -> Result<String> {
        csv::candidates_to_csv(self)
    }
}
