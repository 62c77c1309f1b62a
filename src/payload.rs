//! Request bodies for the candidate and form endpoints.
//!
//! Counts on a Form 34B are usually typed as they appear on paper ("12,345"),
//! so every integer field accepts a JSON number or a string with thousands
//! separators.

use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::tally::{compute_turnout, round_to};
use crate::types::{CandidatePatch, FormPatch, NewCandidate, NewForm};

pub const REQUIRED: &str = "This field is required.";
pub const NOT_AN_INTEGER: &str = "A valid integer is required.";
pub const NEGATIVE: &str = "Ensure this value is greater than or equal to 0.";
pub const BLANK: &str = "This field may not be blank.";
pub const NOT_A_NUMBER: &str = "A valid number is required.";
pub const TOO_LARGE: &str = "Ensure this value is less than or equal to 2147483647.";

/// Counts are stored as 32-bit integers.
const COUNT_MAX: i64 = i32::MAX as i64;

const NAME_MAX: usize = 100;
const KEYWORD_MAX: usize = 10;
const PARTY_MAX: usize = 100;
const COUNTY_MAX: usize = 100;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CountValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl CountValue {
    pub fn parse(&self) -> Result<i64, &'static str> {
        let value = match self {
            Self::Int(v) => *v,
            Self::Float(v) if v.fract() == 0.0 && v.is_finite() => *v as i64,
            Self::Float(_) => return Err(NOT_AN_INTEGER),
            Self::Text(raw) => {
                let cleaned = raw.replace(',', "");
                let cleaned = cleaned.trim();
                match cleaned.parse::<i64>() {
                    Ok(v) => v,
                    // Digits too long for i64 are still an integer, just too big.
                    Err(_) if is_digits(cleaned) => return Err(TOO_LARGE),
                    Err(_) => return Err(NOT_AN_INTEGER),
                }
            }
        };
        if value < 0 {
            return Err(NEGATIVE);
        }
        if value > COUNT_MAX {
            return Err(TOO_LARGE);
        }
        Ok(value)
    }
}

fn is_digits(raw: &str) -> bool {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// A percentage typed as a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ShareValue {
    Number(f64),
    Text(String),
}

impl ShareValue {
    pub fn parse(&self) -> Result<f64, &'static str> {
        let value = match self {
            Self::Number(v) => *v,
            Self::Text(raw) => raw.trim().parse::<f64>().map_err(|_| NOT_A_NUMBER)?,
        };
        if !value.is_finite() {
            return Err(NOT_A_NUMBER);
        }
        Ok(value)
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`), so a partial update can clear a nullable column.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Per-field validation failures, kept in the order the fields were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(String, String)>);

impl FieldErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push((field.into(), message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, message)| message.as_str())
    }

    fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (field, message)) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidatePayload {
    pub name: Option<String>,
    pub keyword: Option<String>,
    pub party: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub votes: Option<Option<CountValue>>,
    #[serde(default, deserialize_with = "nullable")]
    pub votes_percentage: Option<Option<ShareValue>>,
}

impl CandidatePayload {
    pub fn into_new(self) -> Result<NewCandidate, FieldErrors> {
        let mut errors = FieldErrors::default();
        let name = required_text("name", self.name, NAME_MAX, &mut errors);
        let keyword = required_text("keyword", self.keyword, KEYWORD_MAX, &mut errors);
        let party = required_text("party", self.party, PARTY_MAX, &mut errors);
        let votes = nullable_count("votes", self.votes, &mut errors).flatten();
        let votes_percentage =
            nullable_share("votes_percentage", self.votes_percentage, &mut errors).flatten();
        errors.into_result(NewCandidate {
            name: name.unwrap_or_default(),
            keyword: keyword.unwrap_or_default(),
            party: party.unwrap_or_default(),
            votes,
            votes_percentage,
        })
    }

    pub fn into_patch(self) -> Result<CandidatePatch, FieldErrors> {
        let mut errors = FieldErrors::default();
        let patch = CandidatePatch {
            name: optional_text("name", self.name, NAME_MAX, &mut errors),
            keyword: optional_text("keyword", self.keyword, KEYWORD_MAX, &mut errors),
            party: optional_text("party", self.party, PARTY_MAX, &mut errors),
            votes: nullable_count("votes", self.votes, &mut errors),
            votes_percentage: nullable_share(
                "votes_percentage",
                self.votes_percentage,
                &mut errors,
            ),
        };
        errors.into_result(patch)
    }
}

/// A Form 34B submission. `voter_turnout` is accepted for compatibility and
/// ignored; it is always derived from the counts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormPayload {
    pub county: Option<String>,
    pub registered_voters: Option<CountValue>,
    pub valid_votes: Option<CountValue>,
    pub spoilt_votes: Option<CountValue>,
    pub voter_turnout: Option<serde_json::Value>,
    pub odinga: Option<CountValue>,
    pub ruto: Option<CountValue>,
    pub wajackoyah: Option<CountValue>,
    pub mweure: Option<CountValue>,
}

impl FormPayload {
    pub fn into_new(self) -> Result<NewForm, FieldErrors> {
        let mut errors = FieldErrors::default();
        let county = required_text("county", self.county, COUNTY_MAX, &mut errors);
        let registered =
            required_count("registered_voters", self.registered_voters.as_ref(), &mut errors);
        let valid = required_count("valid_votes", self.valid_votes.as_ref(), &mut errors);
        let spoilt = required_count("spoilt_votes", self.spoilt_votes.as_ref(), &mut errors);
        let odinga = optional_count("odinga", self.odinga.as_ref(), &mut errors);
        let ruto = optional_count("ruto", self.ruto.as_ref(), &mut errors);
        let wajackoyah = optional_count("wajackoyah", self.wajackoyah.as_ref(), &mut errors);
        let mweure = optional_count("mweure", self.mweure.as_ref(), &mut errors);

        let (Some(county), Some(registered), Some(valid), Some(spoilt)) =
            (county, registered, valid, spoilt)
        else {
            return Err(errors);
        };
        let voter_turnout = match turnout_for(registered, valid, spoilt) {
            Ok(turnout) => turnout,
            Err(message) => {
                errors.push("registered_voters", message);
                0.0
            }
        };

        errors.into_result(NewForm {
            county,
            registered_voters: registered,
            valid_votes: valid,
            spoilt_votes: spoilt,
            voter_turnout,
            odinga: odinga.unwrap_or(0),
            ruto: ruto.unwrap_or(0),
            wajackoyah: wajackoyah.unwrap_or(0),
            mweure: mweure.unwrap_or(0),
        })
    }

    pub fn into_patch(self) -> Result<FormPatch, FieldErrors> {
        let mut errors = FieldErrors::default();
        let patch = FormPatch {
            county: optional_text("county", self.county, COUNTY_MAX, &mut errors),
            registered_voters: optional_count(
                "registered_voters",
                self.registered_voters.as_ref(),
                &mut errors,
            ),
            valid_votes: optional_count("valid_votes", self.valid_votes.as_ref(), &mut errors),
            spoilt_votes: optional_count("spoilt_votes", self.spoilt_votes.as_ref(), &mut errors),
            odinga: optional_count("odinga", self.odinga.as_ref(), &mut errors),
            ruto: optional_count("ruto", self.ruto.as_ref(), &mut errors),
            wajackoyah: optional_count("wajackoyah", self.wajackoyah.as_ref(), &mut errors),
            mweure: optional_count("mweure", self.mweure.as_ref(), &mut errors),
        };
        errors.into_result(patch)
    }
}

/// Turnout rounded the way it is persisted.
pub fn turnout_for(registered: i64, valid: i64, spoilt: i64) -> Result<f64, String> {
    compute_turnout(registered, valid, spoilt)
        .map(|turnout| round_to(turnout, 3))
        .map_err(|e| e.to_string())
}

fn required_text(
    field: &str,
    value: Option<String>,
    max_len: usize,
    errors: &mut FieldErrors,
) -> Option<String> {
    if value.is_none() {
        errors.push(field, REQUIRED);
        return None;
    }
    optional_text(field, value, max_len, errors)
}

fn optional_text(
    field: &str,
    value: Option<String>,
    max_len: usize,
    errors: &mut FieldErrors,
) -> Option<String> {
    let value = value?.trim().to_string();
    if value.is_empty() {
        errors.push(field, BLANK);
        return None;
    }
    if value.chars().count() > max_len {
        errors.push(
            field,
            format!("Ensure this field has no more than {max_len} characters."),
        );
        return None;
    }
    Some(value)
}

fn required_count(
    field: &str,
    value: Option<&CountValue>,
    errors: &mut FieldErrors,
) -> Option<i64> {
    if value.is_none() {
        errors.push(field, REQUIRED);
        return None;
    }
    optional_count(field, value, errors)
}

fn optional_count(
    field: &str,
    value: Option<&CountValue>,
    errors: &mut FieldErrors,
) -> Option<i64> {
    match value?.parse() {
        Ok(count) => Some(count),
        Err(message) => {
            errors.push(field, message);
            None
        }
    }
}

fn nullable_count(
    field: &str,
    value: Option<Option<CountValue>>,
    errors: &mut FieldErrors,
) -> Option<Option<i64>> {
    match value? {
        None => Some(None),
        Some(count) => optional_count(field, Some(&count), errors).map(Some),
    }
}

fn nullable_share(
    field: &str,
    value: Option<Option<ShareValue>>,
    errors: &mut FieldErrors,
) -> Option<Option<f64>> {
    match value? {
        None => Some(None),
        Some(share) => match share.parse() {
            Ok(pct) => Some(Some(pct)),
            Err(message) => {
                errors.push(field, message);
                None
            }
        },
    }
}
