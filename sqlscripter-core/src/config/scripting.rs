//! Options handed to the scripting service for every object.

use serde::{Deserialize, Serialize};

/// Text encoding of generated script files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptEncoding {
    /// UTF-8 without a byte order mark
    Utf8,
    /// UTF-8 prefixed with `EF BB BF`
    #[default]
    Utf8WithBom,
}

impl ScriptEncoding {
    /// Bytes written before the script text.
    pub fn preamble(self) -> &'static [u8] {
        match self {
            ScriptEncoding::Utf8 => &[],
            ScriptEncoding::Utf8WithBom => &[0xEF, 0xBB, 0xBF],
        }
    }
}

/// Immutable scripting configuration shared by every category.
///
/// The output path is not part of the options; it is passed explicitly with
/// each scripting call.
///
/// # Example
/// ```rust
/// use sqlscripter_core::config::{ScriptEncoding, ScriptingOptions};
///
/// let options = ScriptingOptions::default()
///     .with_indexes(false)
///     .with_encoding(ScriptEncoding::Utf8);
///
/// assert!(options.include_database_context);
/// assert!(!options.include_indexes);
/// assert!(options.continue_on_error);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptingOptions {
    /// Prefix database-scoped scripts with `USE [db]`
    pub include_database_context: bool,
    /// Skip an object whose scripting fails instead of aborting its category
    pub continue_on_error: bool,
    /// Script indexes and constraint-backing keys with tables
    pub include_indexes: bool,
    /// Script `GRANT`/`DENY` statements
    pub include_permissions: bool,
    /// Script table and view triggers
    pub include_triggers: bool,
    /// Script role membership for roles and users
    pub include_role_memberships: bool,
    /// Terminate each batch with `GO`
    pub batch_terminators: bool,
    /// Text encoding of written files
    pub encoding: ScriptEncoding,
}

impl Default for ScriptingOptions {
    fn default() -> Self {
        Self {
            include_database_context: true,
            continue_on_error: true,
            include_indexes: true,
            include_permissions: true,
            include_triggers: true,
            include_role_memberships: true,
            batch_terminators: true,
            encoding: ScriptEncoding::default(),
        }
    }
}

impl ScriptingOptions {
    /// Sets whether scripts start with `USE [db]`.
    pub fn with_database_context(mut self, include: bool) -> Self {
        self.include_database_context = include;
        self
    }

    /// Sets whether a failed object is skipped rather than aborting its category.
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Sets whether indexes are scripted.
    pub fn with_indexes(mut self, include: bool) -> Self {
        self.include_indexes = include;
        self
    }

    /// Sets whether permissions are scripted.
    pub fn with_permissions(mut self, include: bool) -> Self {
        self.include_permissions = include;
        self
    }

    /// Sets whether triggers are scripted.
    pub fn with_triggers(mut self, include: bool) -> Self {
        self.include_triggers = include;
        self
    }

    /// Sets whether role memberships are scripted.
    pub fn with_role_memberships(mut self, include: bool) -> Self {
        self.include_role_memberships = include;
        self
    }

    /// Sets whether batches end with `GO`.
    pub fn with_batch_terminators(mut self, enabled: bool) -> Self {
        self.batch_terminators = enabled;
        self
    }

    /// Sets the output encoding.
    pub fn with_encoding(mut self, encoding: ScriptEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_include_everything() {
        let options = ScriptingOptions::default();
        assert!(options.include_database_context);
        assert!(options.continue_on_error);
        assert!(options.include_indexes);
        assert!(options.include_permissions);
        assert!(options.include_triggers);
        assert!(options.include_role_memberships);
        assert!(options.batch_terminators);
        assert_eq!(options.encoding, ScriptEncoding::Utf8WithBom);
    }

    #[test]
    fn test_builder_chain() {
        let options = ScriptingOptions::default()
            .with_database_context(false)
            .with_continue_on_error(false)
            .with_permissions(false)
            .with_triggers(false)
            .with_role_memberships(false)
            .with_batch_terminators(false);

        assert!(!options.include_database_context);
        assert!(!options.continue_on_error);
        assert!(!options.include_permissions);
        assert!(!options.include_triggers);
        assert!(!options.include_role_memberships);
        assert!(!options.batch_terminators);
        assert!(options.include_indexes);
    }

    #[test]
    fn test_encoding_preamble() {
        assert_eq!(ScriptEncoding::Utf8WithBom.preamble(), &[0xEF, 0xBB, 0xBF]);
        assert!(ScriptEncoding::Utf8.preamble().is_empty());
    }
}
