//! Non-fatal diagnostics collected while decoding and migrating documents.
//!
//! Lossy conversions (phase sets inferred from matrix sizes, renamed parameter
//! ids, dropped voltage limits) do not abort a batch conversion. They are
//! pushed here and logged through `tracing` at the same time, while hard
//! failures keep travelling as [`crate::GridError`].
//!
//! # Example
//!
//! ```
//! use gridnet_core::diagnostics::{Diagnostics, Severity};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning("migration", "Line parameters 'lp' were renamed");
//! diag.add_warning_with_entity("migration", "Voltage limits dropped", "Bus 'b1'");
//!
//! assert_eq!(diag.warning_count(), 2);
//! assert_eq!(diag.issues[1].severity, Severity::Warning);
//! ```

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Best-effort interpretation, the operation went on
    Warning,
    /// Purely informational
    Info,
}

/// A single notice raised during an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Grouping key, e.g. "migration" or "decode"
    pub category: String,
    pub message: String,
    /// Element the notice is about, e.g. "Line 'l1'"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
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
            Severity::Info => "info",
        };
        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;
        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        Ok(())
    }
}

/// Ordered collection of notices for one operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue, mirroring it to the log.
    pub fn add(&mut self, issue: DiagnosticIssue) {
        match issue.severity {
            Severity::Warning => tracing::warn!(
                category = %issue.category,
                entity = issue.entity.as_deref().unwrap_or(""),
                "{}",
                issue.message
            ),
            Severity::Info => tracing::info!(
                category = %issue.category,
                entity = issue.entity.as_deref().unwrap_or(""),
                "{}",
                issue.message
            ),
        }
        self.issues.push(issue);
    }

    pub fn add_warning(&mut self, category: &str, message: impl Into<String>) {
        self.add(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_warning_with_entity(
        &mut self,
        category: &str,
        message: impl Into<String>,
        entity: impl Into<String>,
    ) {
        self.add(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn add_info(&mut self, category: &str, message: impl Into<String>) {
        self.add(DiagnosticIssue::new(Severity::Info, category, message));
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    pub fn summary(&self) -> String {
        match self.warning_count() {
            0 => "No warnings".to_string(),
            1 => "1 warning".to_string(),
            w => format!("{w} warnings"),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_counts() {
        let mut diag = Diagnostics::new();
        assert!(diag.is_empty());
        diag.add_warning("migration", "first");
        diag.add_info("migration", "note");
        diag.add_warning_with_entity("decode", "second", "Bus 'b1'");

        assert_eq!(diag.warning_count(), 2);
        assert!(diag.has_warnings());
        assert_eq!(diag.issues_by_category("migration").count(), 2);
    }

    #[test]
    fn test_diagnostics_keep_order() {
        let mut diag = Diagnostics::new();
        diag.add_warning("migration", "a");
        diag.add_warning("migration", "b");
        let messages: Vec<_> = diag.warnings().map(|i| i.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b"]);
    }

    #[test]
    fn test_diagnostics_serialization() {
        let mut diag = Diagnostics::new();
        diag.add_warning_with_entity("migration", "Voltage limits dropped", "Bus 'b1'");

        let json = serde_json::to_string_pretty(&diag).unwrap();
        assert!(json.contains("\"warning\""));
        assert!(json.contains("\"entity\": \"Bus 'b1'\""));
    }

    #[test]
    fn test_issue_display_and_summary() {
        let issue =
            DiagnosticIssue::new(Severity::Warning, "migration", "renamed").with_entity("Line 'l'");
        assert_eq!(issue.to_string(), "[warning:migration] renamed (Line 'l')");

        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No warnings");
        diag.add(issue);
        assert_eq!(diag.summary(), "1 warning");

        diag.add_warning("migration", "again");
        assert_eq!(diag.summary(), "2 warnings");
    }
}
