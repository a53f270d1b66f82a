//! Diagnostics infrastructure for tracking recoverable issues.
//!
//! Batch runs are expected to continue past per-node and per-edge
//! recoverable errors, emitting partial results plus explicit tallies of
//! skipped/failed items. This module provides the collector those tallies
//! live in:
//!
//! - Severity levels (Warning, Error)
//! - Categories for grouping issues (structure, supply, physical, data, ...)
//! - Optional entity references (e.g. "CS_4", "pipe X_1->X_2")
//! - Serialization for JSON output
//!
//! # Example
//!
//! ```
//! use gns_core::diagnostics::Diagnostics;
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning("supply", "Network has no demand nodes");
//! diag.add_error_with_entity("component", "compressor needs 1 inlet / 1 outlet", "CS_4");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.error_count(), 1);
//! ```

use serde::Serialize;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unusual but operation continued (e.g., defaulted value, skipped item)
    Warning,
    /// Could not complete element/operation (e.g., malformed data)
    Error,
}

/// A single diagnostic issue encountered during an operation
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping (e.g., "structure", "supply", "data")
    pub category: String,
    pub message: String,
    /// Optional entity reference (e.g., "CS_4", "pipe X_1->X_2")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(severity: Severity, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;
        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        Ok(())
    }
}

/// Collection of diagnostic issues for an operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.add(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_error(&mut self, category: &str, message: &str) {
        self.add(DiagnosticIssue::new(Severity::Error, category, message));
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.add(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.add(DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity));
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Number of issues in a category, for skipped/failed-item tallies.
    pub fn count_category(&self, category: &str) -> usize {
        self.issues.iter().filter(|i| i.category == category).count()
    }

    /// Merge issues from another collector.
    pub fn extend(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    /// One-line summary ("2 errors, 5 warnings").
    pub fn summary(&self) -> String {
        format!(
            "{} errors, {} warnings",
            self.error_count(),
            self.warning_count()
        )
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for issue in &self.issues {
            writeln!(f, "{}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_summary() {
        let mut diag = Diagnostics::new();
        diag.add_warning("data", "importance weights file missing, using defaults");
        diag.add_warning_with_entity("component", "valve skipped", "CV_9");
        diag.add_error("structure", "Network has no nodes");

        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.error_count(), 1);
        assert!(diag.has_errors());
        assert_eq!(diag.count_category("component"), 1);
        assert_eq!(diag.summary(), "1 errors, 2 warnings");
    }

    #[test]
    fn test_display_includes_entity() {
        let issue = DiagnosticIssue::new(Severity::Error, "component", "bad inlet count")
            .with_entity("CS_4");
        let text = issue.to_string();
        assert!(text.contains("error:component"));
        assert!(text.contains("CS_4"));
    }

    #[test]
    fn test_serialize_skips_empty() {
        let diag = Diagnostics::new();
        let json = serde_json::to_string(&diag).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_extend() {
        let mut a = Diagnostics::new();
        a.add_warning("data", "first");
        let mut b = Diagnostics::new();
        b.add_error("data", "second");
        a.extend(b);
        assert_eq!(a.issues.len(), 2);
    }
}
