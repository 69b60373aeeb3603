//! Configuration for one export run.

use super::{DatabaseExclusions, ScriptingOptions};
use crate::{Result, error::ScripterError};
use std::path::PathBuf;

/// Where to write, what to skip and how to script.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Directory under which the `<server>` tree is created
    pub output_root: PathBuf,
    /// Databases that are never exported
    pub exclusions: DatabaseExclusions,
    /// Options passed to every scripting call
    pub scripting: ScriptingOptions,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            exclusions: DatabaseExclusions::default(),
            scripting: ScriptingOptions::default(),
        }
    }
}

impl ExportConfig {
    /// Create a new configuration writing under `output_root`
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            ..Self::default()
        }
    }

    /// Add caller exclusions on top of the built-in ones
    pub fn with_exclusions<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclusions = DatabaseExclusions::new(extra);
        self
    }

    /// Set scripting options
    pub fn with_scripting(mut self, scripting: ScriptingOptions) -> Self {
        self.scripting = scripting;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns a configuration error when the output root is empty or points
    /// at an existing non-directory.
    pub fn validate(&self) -> Result<()> {
        if self.output_root.as_os_str().is_empty() {
            return Err(ScripterError::configuration("output directory cannot be empty"));
        }

        if self.output_root.exists() && !self.output_root.is_dir() {
            return Err(ScripterError::configuration(format!(
                "output path {} is not a directory",
                self.output_root.display()
            )));
        }

        Ok(())
    }
}
