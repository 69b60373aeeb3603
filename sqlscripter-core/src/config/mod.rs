//! Configuration types for connecting and exporting.
//!
//! # Module Structure
//! - `connection`: Server address and authentication
//! - `exclusions`: Databases that are never exported
//! - `scripting`: Options applied to every scripted object
//! - `export`: Run-level configuration combining the above

mod connection;
mod exclusions;
mod export;
mod scripting;

pub use connection::{ConnectionDescriptor, DEFAULT_PORT, ServerAddress};
pub use exclusions::{DatabaseExclusions, SYSTEM_DATABASES};
pub use export::ExportConfig;
pub use scripting::{ScriptEncoding, ScriptingOptions};
