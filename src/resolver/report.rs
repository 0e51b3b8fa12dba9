//! Resolution results.
//!
//! [`Resolution`] is what the resolver returns: live bound values for the
//! ranked candidates, plus structured rejection data. [`Report`] is its
//! text-only snapshot, kept by collectors and printed by the CLI.

use indexmap::IndexMap;
use serde::Serialize;

use crate::core::{Description, PriorityLevel};
use crate::resolver::errors::Rejection;

/// The first failure of one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeFailure {
    pub attribute: String,
    /// Raw input as found in the description, if any.
    pub raw: Option<String>,
    pub reason: Rejection,
}

/// The first failing `only` rule of a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnlyFailure {
    pub rule: String,
    pub reason: Rejection,
}

/// Why one candidate was not eligible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateReport {
    pub candidate: String,
    /// Attribute failures in footprint declaration order.
    pub attributes: Vec<AttributeFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only: Option<OnlyFailure>,
}

/// An eligible candidate with its bound values.
#[derive(Debug, Clone)]
pub struct Ranked {
    pub candidate: String,
    /// Position of the candidate in the input list (declaration order).
    pub index: usize,
    pub priority: PriorityLevel,
    /// Rank of `priority` in the priority set at resolution time.
    pub rank: Option<usize>,
    /// Number of attributes taken from the description.
    pub score: usize,
    /// Bound values, in footprint declaration order.
    pub bound: Description,
    /// Canonical names of the attributes taken from the description.
    pub consumed: Vec<String>,
}

impl Ranked {
    /// Bound values of the attributes that came from the description.
    pub fn consumed_values(&self) -> Description {
        self.consumed
            .iter()
            .filter_map(|k| self.bound.get(k).map(|v| (k.clone(), v.clone())))
            .collect()
    }

    fn ties(&self, other: &Ranked) -> bool {
        self.rank == other.rank && self.score == other.score
    }
}

/// At least one candidate survived.
#[derive(Debug, Clone)]
pub struct Matched {
    /// Best first.
    pub ranked: Vec<Ranked>,
    pub rejected: Vec<CandidateReport>,
}

impl Matched {
    pub fn winner(&self) -> &Ranked {
        &self.ranked[0]
    }

    /// Whether the runner-up ties the winner on priority and score.
    pub fn is_ambiguous(&self) -> bool {
        match self.ranked.as_slice() {
            [first, second, ..] => first.ties(second),
            _ => false,
        }
    }

    /// Candidates that tie the winner, winner included.
    pub fn tied(&self) -> Vec<&str> {
        let winner = self.winner();
        self.ranked
            .iter()
            .filter(|r| r.ties(winner))
            .map(|r| r.candidate.as_str())
            .collect()
    }
}

/// No candidate survived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoMatch {
    pub rejected: Vec<CandidateReport>,
}

#[derive(Debug, Clone)]
pub enum Resolution {
    Match(Matched),
    NoMatch(NoMatch),
}

impl Resolution {
    pub fn is_match(&self) -> bool {
        matches!(self, Resolution::Match(_))
    }

    pub fn winner(&self) -> Option<&Ranked> {
        match self {
            Resolution::Match(m) => Some(m.winner()),
            Resolution::NoMatch(_) => None,
        }
    }

    pub fn ranked(&self) -> &[Ranked] {
        match self {
            Resolution::Match(m) => &m.ranked,
            Resolution::NoMatch(_) => &[],
        }
    }

    pub fn rejected(&self) -> &[CandidateReport] {
        match self {
            Resolution::Match(m) => &m.rejected,
            Resolution::NoMatch(n) => &n.rejected,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        match self {
            Resolution::Match(m) => m.is_ambiguous(),
            Resolution::NoMatch(_) => false,
        }
    }

    /// A text-only snapshot of this resolution.
    pub fn report(&self, tag: &str, desc: &Description) -> Report {
        Report {
            tag: tag.to_string(),
            description: desc.iter().map(|(k, v)| (k.clone(), v.to_string())).collect(),
            ranked: self
                .ranked()
                .iter()
                .map(|r| RankedSummary {
                    candidate: r.candidate.clone(),
                    priority: r.priority.name().to_string(),
                    score: r.score,
                })
                .collect(),
            rejected: self.rejected().to_vec(),
            ambiguous: self.is_ambiguous(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedSummary {
    pub candidate: String,
    pub priority: String,
    pub score: usize,
}

/// Structured record of one resolution, free of live values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub tag: String,
    pub description: IndexMap<String, String>,
    pub ranked: Vec<RankedSummary>,
    pub rejected: Vec<CandidateReport>,
    pub ambiguous: bool,
}

impl Report {
    pub fn is_match(&self) -> bool {
        !self.ranked.is_empty()
    }

    pub fn winner(&self) -> Option<&str> {
        self.ranked.first().map(|r| r.candidate.as_str())
    }

    /// Why `candidate` was not eligible, if it was rejected.
    pub fn why_not(&self, candidate: &str) -> Option<&CandidateReport> {
        self.rejected.iter().find(|c| c.candidate == candidate)
    }
}
