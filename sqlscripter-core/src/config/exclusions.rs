//! Databases that are never exported.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Built-in databases skipped on every server.
pub const SYSTEM_DATABASES: [&str; 6] = [
    "master",
    "model",
    "msdb",
    "tempdb",
    "ReportServer",
    "ReportServerTempDB",
];

/// Immutable set of excluded database names.
///
/// Always holds [`SYSTEM_DATABASES`] plus whatever the caller adds. Lookups
/// are exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseExclusions {
    names: BTreeSet<String>,
}

impl DatabaseExclusions {
    /// Built-in exclusions merged with caller-supplied names.
    ///
    /// Blank entries are ignored and surrounding whitespace is trimmed.
    ///
    /// # Example
    /// ```rust
    /// use sqlscripter_core::config::DatabaseExclusions;
    ///
    /// let exclusions = DatabaseExclusions::new(["Scratch"]);
    /// assert!(exclusions.contains("Scratch"));
    /// assert!(exclusions.contains("tempdb"));
    /// assert!(!exclusions.contains("Sales"));
    /// ```
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = SYSTEM_DATABASES
            .iter()
            .map(|name| (*name).to_string())
            .chain(
                extra
                    .into_iter()
                    .map(|name| name.as_ref().trim().to_string())
                    .filter(|name| !name.is_empty()),
            )
            .collect();
        Self { names }
    }

    /// Whether the named database must be skipped.
    pub fn contains(&self, database: &str) -> bool {
        self.names.contains(database)
    }

    /// All excluded names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of excluded names, built-ins included.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing is excluded.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for DatabaseExclusions {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_always_present() {
        let exclusions = DatabaseExclusions::default();
        for name in SYSTEM_DATABASES {
            assert!(exclusions.contains(name), "{} should be excluded", name);
        }
        assert_eq!(exclusions.len(), SYSTEM_DATABASES.len());
    }

    #[test]
    fn test_caller_names_are_merged() {
        let exclusions = DatabaseExclusions::new(["Staging", " Archive ", "", "master"]);
        assert!(exclusions.contains("Staging"));
        assert!(exclusions.contains("Archive"));
        assert_eq!(exclusions.len(), SYSTEM_DATABASES.len() + 2);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let exclusions = DatabaseExclusions::default();
        assert!(exclusions.contains("tempdb"));
        assert!(!exclusions.contains("TEMPDB"));
        assert!(!exclusions.contains("Master"));
    }
}
