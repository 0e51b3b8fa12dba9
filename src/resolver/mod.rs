//! Candidate resolution.
//!
//! Every candidate is evaluated independently: bind its footprint against
//! the description, then evaluate its `only` rules against the context.
//! Survivors are ranked by priority level, then by the number of attributes
//! taken from the description, then by declaration order. The resolver is
//! pure: same candidates, description and context give the same result.

pub mod bind;
pub mod errors;
pub mod report;
pub mod substitute;

pub use bind::{bind, AliasPolicy, Binding, Mode};
pub use errors::Rejection;
pub use report::{
    AttributeFailure, CandidateReport, Matched, NoMatch, OnlyFailure, Ranked, Report, Resolution,
};

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::core::{Context, Description, Footprint, OnlyOutcome};

/// Anything that can be ranked by the resolver.
pub trait Candidate {
    fn name(&self) -> &str;
    fn footprint(&self) -> &Footprint;
}

impl<C: Candidate + ?Sized> Candidate for &C {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn footprint(&self) -> &Footprint {
        (**self).footprint()
    }
}

/// How a collector treats a tie for the top rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityPolicy {
    /// Take the first declared candidate and log a warning.
    #[default]
    Warn,
    /// Refuse to pick.
    Error,
}

/// Resolution settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    pub alias_policy: AliasPolicy,
    pub ambiguity: AmbiguityPolicy,
}

/// Ranks candidates against descriptions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    options: ResolveOptions,
}

impl Resolver {
    pub fn new(options: ResolveOptions) -> Self {
        Resolver { options }
    }

    pub fn options(&self) -> ResolveOptions {
        self.options
    }

    /// Evaluate every candidate and rank the eligible ones.
    pub fn resolve<C: Candidate>(&self, candidates: &[C], desc: &Description, context: &Context) -> Resolution {
        let mut ranked = Vec::new();
        let mut rejected = Vec::new();

        for (index, candidate) in candidates.iter().enumerate() {
            let footprint = candidate.footprint();
            let binding = bind(footprint, desc, Mode::Full, self.options.alias_policy);
            let only = check_only(footprint, context);

            if binding.is_complete() && only.is_none() {
                tracing::debug!(
                    "candidate `{}` eligible with {} attributes from the description",
                    candidate.name(),
                    binding.score()
                );
                let priority = footprint.priority().clone();
                ranked.push(Ranked {
                    candidate: candidate.name().to_string(),
                    index,
                    rank: priority.rank(),
                    priority,
                    score: binding.score(),
                    bound: binding.values,
                    consumed: binding.consumed,
                });
            } else {
                tracing::debug!(
                    "candidate `{}` rejected ({} attribute failures{})",
                    candidate.name(),
                    binding.failures.len(),
                    if only.is_some() { ", only rule failed" } else { "" }
                );
                rejected.push(CandidateReport {
                    candidate: candidate.name().to_string(),
                    attributes: binding.failures,
                    only,
                });
            }
        }

        if ranked.is_empty() {
            return Resolution::NoMatch(NoMatch { rejected });
        }

        ranked.sort_by_key(|r| (Reverse(r.rank), Reverse(r.score), r.index));
        let matched = Matched { ranked, rejected };

        if matched.ranked.len() > 1 {
            let listing: Vec<String> = matched
                .ranked
                .iter()
                .enumerate()
                .map(|(i, r)| format!("no.{} {} (priority {}, {} attributes)", i + 1, r.candidate, r.priority, r.score))
                .collect();
            if matched.is_ambiguous() {
                tracing::warn!(
                    "ambiguous choice between {}: {}",
                    matched.tied().join(", "),
                    listing.join("; ")
                );
            } else {
                tracing::info!("multiple candidates: {}", listing.join("; "));
            }
        }

        Resolution::Match(matched)
    }
}

/// Resolve with default options.
pub fn resolve<C: Candidate>(candidates: &[C], desc: &Description, context: &Context) -> Resolution {
    Resolver::default().resolve(candidates, desc, context)
}

/// First failing `only` rule, in declaration order.
fn check_only(footprint: &Footprint, context: &Context) -> Option<OnlyFailure> {
    footprint.only().iter().find_map(|(name, rule)| {
        let reason = match rule.evaluate(context) {
            Ok(()) => return None,
            Err(OnlyOutcome::MissingContext) => Rejection::OnlyMissingContext {
                attribute: rule.attribute.clone(),
            },
            Err(OnlyOutcome::Rejected { actual }) => Rejection::OnlyFilterRejected {
                attribute: rule.attribute.clone(),
                filter: rule.filter.to_string(),
                actual,
            },
        };
        Some(OnlyFailure {
            rule: name.clone(),
            reason,
        })
    })
}
