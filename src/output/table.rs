use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Row, Table};

use crate::tally::SummaryReport;
use crate::types::{Candidate, FormDetails};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn pct(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

pub fn render_summary_table(report: &SummaryReport) -> String {
    let mut table = new_table();
    table.set_header(vec!["Line", "Total", "Share"]);
    table.add_row(vec![
        "Counties reporting".to_string(),
        report.total_counties.to_string(),
        "-".to_string(),
    ]);
    table.add_row(vec![
        "Registered voters".to_string(),
        report.total_registered_voters.clone(),
        "-".to_string(),
    ]);
    table.add_row(vec![
        "Valid votes".to_string(),
        report.total_valid_votes.value.clone(),
        pct(&report.total_valid_votes.percentage),
    ]);
    table.add_row(vec![
        "Spoilt votes".to_string(),
        report.total_spoilt_votes.count.clone(),
        pct(&report.total_spoilt_votes.percentage),
    ]);
    for (name, line) in report.candidate_lines() {
        table.add_row(Row::from(vec![
            Cell::new(name),
            Cell::new(&line.total).set_alignment(CellAlignment::Right),
            Cell::new(pct(&line.percentage)).set_alignment(CellAlignment::Right),
        ]));
    }
    format!(
        "{table}\nGenerated at {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

pub fn render_forms_table(forms: &[FormDetails]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "ID",
        "County",
        "Registered",
        "Valid",
        "Spoilt",
        "Turnout %",
        "Odinga",
        "Ruto",
        "Wajackoyah",
        "Mwaure",
    ]);
    for form in forms {
        table.add_row(vec![
            form.id.to_string(),
            form.county.clone(),
            form.registered_voters.to_string(),
            form.valid_votes.to_string(),
            form.spoilt_votes.to_string(),
            format!("{:.3}", form.voter_turnout),
            form.odinga.to_string(),
            form.ruto.to_string(),
            form.wajackoyah.to_string(),
            form.mweure.to_string(),
        ]);
    }
    table.to_string()
}

pub fn render_candidates_table(candidates: &[Candidate]) -> String {
    let mut table = new_table();
    table.set_header(vec!["ID", "Name", "Keyword", "Party", "Votes", "Votes %"]);
    for c in candidates {
        table.add_row(vec![
            c.id.to_string(),
            c.name.clone(),
            c.keyword.clone(),
            c.party.clone(),
            c.votes
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
            c.votes_percentage
                .map(|v| format!("{v:.3}"))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table.to_string()
}
