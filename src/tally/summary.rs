use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::tally::validation::round_to;
use crate::types::FormDetails;

/// Column sums across every stored form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TallyTotals {
    pub counties: usize,
    pub registered_voters: i64,
    pub valid_votes: i64,
    pub spoilt_votes: i64,
    pub odinga: i64,
    pub ruto: i64,
    pub wajackoyah: i64,
    pub mweure: i64,
}

impl TallyTotals {
    /// Sums saturate at `i64::MAX`, so rows written before counts were
    /// bounded still produce a report.
    pub fn from_forms(forms: &[FormDetails]) -> Self {
        forms.iter().fold(Self::default(), |mut acc, form| {
            acc.counties += 1;
            acc.registered_voters = acc.registered_voters.saturating_add(form.registered_voters);
            acc.valid_votes = acc.valid_votes.saturating_add(form.valid_votes);
            acc.spoilt_votes = acc.spoilt_votes.saturating_add(form.spoilt_votes);
            acc.odinga = acc.odinga.saturating_add(form.odinga);
            acc.ruto = acc.ruto.saturating_add(form.ruto);
            acc.wajackoyah = acc.wajackoyah.saturating_add(form.wajackoyah);
            acc.mweure = acc.mweure.saturating_add(form.mweure);
            acc
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidVotesLine {
    pub value: String,
    pub percentage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpoiltVotesLine {
    pub count: String,
    pub percentage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateLine {
    pub total: String,
    pub percentage: Option<String>,
}

impl CandidateLine {
    fn new(total: i64, valid_votes: i64) -> Self {
        Self {
            total: format_thousands(total),
            percentage: share(total, valid_votes).map(format_percentage),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub total_counties: usize,
    pub total_registered_voters: String,
    pub total_valid_votes: ValidVotesLine,
    pub total_spoilt_votes: SpoiltVotesLine,
    pub raila_odinga: CandidateLine,
    pub william_ruto: CandidateLine,
    pub wajackoyah: CandidateLine,
    pub mweure: CandidateLine,
    pub generated_at: DateTime<Utc>,
    #[serde(skip)]
    pub totals: TallyTotals,
}

impl SummaryReport {
    /// Display label and line for each candidate, in ballot order.
    pub fn candidate_lines(&self) -> [(&'static str, &CandidateLine); 4] {
        [
            ("Raila Odinga", &self.raila_odinga),
            ("William Ruto", &self.william_ruto),
            ("George Wajackoyah", &self.wajackoyah),
            ("David Mwaure", &self.mweure),
        ]
    }
}

/// Builds the national summary. Returns `None` when no forms exist; shares
/// whose denominator sums to zero are reported as `None`.
pub fn aggregate_summary(forms: &[FormDetails]) -> Option<SummaryReport> {
    if forms.is_empty() {
        return None;
    }
    let totals = TallyTotals::from_forms(forms);
    let valid = totals.valid_votes;

    Some(SummaryReport {
        total_counties: totals.counties,
        total_registered_voters: format_thousands(totals.registered_voters),
        total_valid_votes: ValidVotesLine {
            value: format_thousands(valid),
            percentage: share(valid, totals.registered_voters).map(format_percentage),
        },
        total_spoilt_votes: SpoiltVotesLine {
            count: format_thousands(totals.spoilt_votes),
            percentage: share(totals.spoilt_votes, valid).map(format_percentage),
        },
        raila_odinga: CandidateLine::new(totals.odinga, valid),
        william_ruto: CandidateLine::new(totals.ruto, valid),
        wajackoyah: CandidateLine::new(totals.wajackoyah, valid),
        mweure: CandidateLine::new(totals.mweure, valid),
        generated_at: Utc::now(),
        totals,
    })
}

fn share(part: i64, whole: i64) -> Option<f64> {
    if whole == 0 {
        return None;
    }
    Some(round_to(part as f64 / whole as f64 * 100.0, 3))
}

/// Renders `value` with comma thousands separators, e.g. `1234567` -> `1,234,567`.
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Renders an already-rounded percentage with a trailing `%`, keeping at least
/// one decimal place (`50.0%`, `33.333%`).
pub fn format_percentage(value: f64) -> String {
    let mut rendered = value.to_string();
    if !rendered.contains('.') {
        rendered.push_str(".0");
    }
    rendered.push('%');
    rendered
}
