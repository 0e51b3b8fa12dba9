//! Rejection reasons and resolution diagnostics.

use serde::Serialize;
use thiserror::Error;

use crate::resolver::report::{CandidateReport, Report};
use crate::util::diagnostic::Diagnostic;

/// Why one attribute (or one `only` rule) rejected a candidate.
///
/// Rejections are report data: they are collected per candidate and never
/// abort the evaluation of other candidates.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    #[error("missing mandatory value")]
    MissingValue,

    #[error("cannot convert `{raw}` to {type_name}: {message}")]
    CoercionFailure {
        type_name: String,
        raw: String,
        message: String,
    },

    #[error("`{value}` is not one of [{}]", .allowed.join(", "))]
    NotInValues { value: String, allowed: Vec<String> },

    #[error("`{value}` is an outcast value")]
    OutcastValue { value: String },

    #[error("reference cycle: {}", .path.join(" -> "))]
    SubstitutionCycle { path: Vec<String> },

    #[error("reference `[{reference}]` has no value")]
    UnresolvedReference { reference: String },

    #[error("cannot format `[{reference}]` with `{format}`: {reason}")]
    InvalidFormat {
        reference: String,
        format: String,
        reason: String,
    },

    #[error("conflicting names in description: {}", .names.join(", "))]
    AliasConflict { names: Vec<String> },

    #[error("context has no `{attribute}`")]
    OnlyMissingContext { attribute: String },

    #[error("context `{attribute}` = `{actual}` fails `{filter}`")]
    OnlyFilterRejected {
        attribute: String,
        filter: String,
        actual: String,
    },
}

impl Rejection {
    /// Stable short name, as used in serialized reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::MissingValue => "missing_value",
            Rejection::CoercionFailure { .. } => "coercion_failure",
            Rejection::NotInValues { .. } => "not_in_values",
            Rejection::OutcastValue { .. } => "outcast_value",
            Rejection::SubstitutionCycle { .. } => "substitution_cycle",
            Rejection::UnresolvedReference { .. } => "unresolved_reference",
            Rejection::InvalidFormat { .. } => "invalid_format",
            Rejection::AliasConflict { .. } => "alias_conflict",
            Rejection::OnlyMissingContext { .. } => "only_missing_context",
            Rejection::OnlyFilterRejected { .. } => "only_filter_rejected",
        }
    }
}

impl CandidateReport {
    /// One line per failure, attribute failures first.
    pub fn reasons(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .attributes
            .iter()
            .map(|f| match &f.raw {
                Some(raw) => format!("{} (given `{}`): {}", f.attribute, raw, f.reason),
                None => format!("{}: {}", f.attribute, f.reason),
            })
            .collect();
        if let Some(only) = &self.only {
            lines.push(format!("only `{}`: {}", only.rule, only.reason));
        }
        lines
    }
}

impl Report {
    /// Render a failed resolution as a diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(format!("no `{}` candidate matches the description", self.tag));

        if !self.description.is_empty() {
            let given: Vec<_> = self
                .description
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            diag = diag.with_context(format!("description: {}", given.join(" ")));
        }

        if self.rejected.is_empty() {
            diag = diag.with_context(format!("no candidates are registered under `{}`", self.tag));
        }

        for candidate in &self.rejected {
            for reason in candidate.reasons() {
                diag = diag.with_context(format!("`{}` rejected: {}", candidate.candidate, reason));
            }
        }

        let missing = self
            .rejected
            .iter()
            .flat_map(|c| &c.attributes)
            .any(|f| f.reason == Rejection::MissingValue);
        if missing {
            diag = diag.with_suggestion("Supply the missing mandatory attributes");
        }
        let only = self.rejected.iter().any(|c| c.only.is_some());
        if only {
            diag = diag.with_suggestion("Check the ambient context values (`[defaults]` in config or --context)");
        }

        diag
    }

    /// Render an ambiguous resolution as a warning diagnostic.
    pub fn ambiguity_diagnostic(&self) -> Option<Diagnostic> {
        if !self.ambiguous {
            return None;
        }
        let top = self.ranked.first()?;
        let mut diag = Diagnostic::warning(format!("multiple `{}` candidates tie for the top rank", self.tag));
        for r in self
            .ranked
            .iter()
            .filter(|r| r.priority == top.priority && r.score == top.score)
        {
            diag = diag.with_context(format!(
                "`{}` (priority {}, {} attributes)",
                r.candidate, r.priority, r.score
            ));
        }
        Some(diag.with_suggestion(format!(
            "Add a distinguishing attribute to the description or raise the priority of `{}`",
            top.candidate
        )))
    }
}
