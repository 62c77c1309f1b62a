use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub name: String,
    pub keyword: String,
    pub party: String,
    pub votes: Option<i64>,
    pub votes_percentage: Option<f64>,
}

/// Fields accepted when registering a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCandidate {
    pub name: String,
    pub keyword: String,
    pub party: String,
    pub votes: Option<i64>,
    pub votes_percentage: Option<f64>,
}

/// Partial candidate update. For the nullable columns, `Some(None)` clears
/// the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePatch {
    pub name: Option<String>,
    pub keyword: Option<String>,
    pub party: Option<String>,
    pub votes: Option<Option<i64>>,
    pub votes_percentage: Option<Option<f64>>,
}

impl CandidatePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.keyword.is_none()
            && self.party.is_none()
            && self.votes.is_none()
            && self.votes_percentage.is_none()
    }

    pub fn apply(self, candidate: &mut Candidate) {
        if let Some(name) = self.name {
            candidate.name = name;
        }
        if let Some(keyword) = self.keyword {
            candidate.keyword = keyword;
        }
        if let Some(party) = self.party {
            candidate.party = party;
        }
        if let Some(votes) = self.votes {
            candidate.votes = votes;
        }
        if let Some(pct) = self.votes_percentage {
            candidate.votes_percentage = pct;
        }
    }
}

/// A county's Form 34B as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDetails {
    pub id: i64,
    pub county: String,
    pub registered_voters: i64,
    pub valid_votes: i64,
    pub spoilt_votes: i64,
    pub voter_turnout: f64,
    pub odinga: i64,
    pub ruto: i64,
    pub wajackoyah: i64,
    pub mweure: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewForm {
    pub county: String,
    pub registered_voters: i64,
    pub valid_votes: i64,
    pub spoilt_votes: i64,
    pub voter_turnout: f64,
    pub odinga: i64,
    pub ruto: i64,
    pub wajackoyah: i64,
    pub mweure: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormPatch {
    pub county: Option<String>,
    pub registered_voters: Option<i64>,
    pub valid_votes: Option<i64>,
    pub spoilt_votes: Option<i64>,
    pub odinga: Option<i64>,
    pub ruto: Option<i64>,
    pub wajackoyah: Option<i64>,
    pub mweure: Option<i64>,
}

impl FormPatch {
    /// Merges the patch into `form`. Turnout is left for the caller to recompute.
    pub fn apply(self, form: &mut FormDetails) {
        if let Some(county) = self.county {
            form.county = county;
        }
        if let Some(v) = self.registered_voters {
            form.registered_voters = v;
        }
        if let Some(v) = self.valid_votes {
            form.valid_votes = v;
        }
        if let Some(v) = self.spoilt_votes {
            form.spoilt_votes = v;
        }
        if let Some(v) = self.odinga {
            form.odinga = v;
        }
        if let Some(v) = self.ruto {
            form.ruto = v;
        }
        if let Some(v) = self.wajackoyah {
            form.wajackoyah = v;
        }
        if let Some(v) = self.mweure {
            form.mweure = v;
        }
    }
}
