use anyhow::Result;

use crate::tally::SummaryReport;
use crate::types::{Candidate, FormDetails};

pub fn summary_to_csv(report: &SummaryReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["line", "total", "percentage"])?;
    writer.write_record([
        "registered_voters",
        report.total_registered_voters.as_str(),
        "",
    ])?;
    writer.write_record([
        "valid_votes",
        report.total_valid_votes.value.as_str(),
        report.total_valid_votes.percentage.as_deref().unwrap_or_default(),
    ])?;
    writer.write_record([
        "spoilt_votes",
        report.total_spoilt_votes.count.as_str(),
        report.total_spoilt_votes.percentage.as_deref().unwrap_or_default(),
    ])?;
    for (name, line) in report.candidate_lines() {
        writer.write_record([
            name,
            line.total.as_str(),
            line.percentage.as_deref().unwrap_or_default(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn forms_to_csv(forms: &[FormDetails]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    for form in forms {
        writer.serialize(form)?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn candidates_to_csv(candidates: &[Candidate]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    for candidate in candidates {
        writer.serialize(candidate)?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}
