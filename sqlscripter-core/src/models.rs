//! Core data models for the export traversal.
//!
//! These types describe what is being exported (object categories and
//! catalog objects), where the traversal currently is (scopes), and what a
//! run produced (notifications and the summary).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Object categories that are scripted as a unit.
///
/// The serialized names match the tags printed in progress output
/// (`Object: Table.Orders`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectType {
    /// `CREATE DATABASE` script of a whole database
    Database,
    /// Server login of any authentication kind
    Login,
    /// SQL Server Agent job
    #[serde(rename = "SQLAgentJob")]
    SqlAgentJob,
    /// Database user
    User,
    /// Database schema
    Schema,
    /// User-defined database role
    DatabaseRole,
    /// Application role
    ApplicationRole,
    /// User table with keys, indexes and triggers
    Table,
    /// View, with its triggers
    View,
    /// T-SQL or CLR stored procedure
    #[serde(rename = "Proc")]
    StoredProcedure,
    /// T-SQL or CLR user-defined function
    Function,
    /// Alias for another object
    Synonym,
    /// CLR user-defined type
    #[serde(rename = "UserType")]
    UserDefinedType,
    /// Alias data type
    #[serde(rename = "UserDataType")]
    UserDefinedDataType,
    /// Table type used for table-valued parameters
    #[serde(rename = "UserTableType")]
    UserDefinedTableType,
}

impl ObjectType {
    /// Tag used in notifications and logs.
    pub fn tag(self) -> &'static str {
        match self {
            ObjectType::Database => "Database",
            ObjectType::Login => "Login",
            ObjectType::SqlAgentJob => "SQLAgentJob",
            ObjectType::User => "User",
            ObjectType::Schema => "Schema",
            ObjectType::DatabaseRole => "DatabaseRole",
            ObjectType::ApplicationRole => "ApplicationRole",
            ObjectType::Table => "Table",
            ObjectType::View => "View",
            ObjectType::StoredProcedure => "Proc",
            ObjectType::Function => "Function",
            ObjectType::Synonym => "Synonym",
            ObjectType::UserDefinedType => "UserType",
            ObjectType::UserDefinedDataType => "UserDataType",
            ObjectType::UserDefinedTableType => "UserTableType",
        }
    }

    /// Whether objects of this type live at server scope.
    pub fn is_server_scoped(self) -> bool {
        matches!(self, ObjectType::Login | ObjectType::SqlAgentJob)
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Where in the server an enumeration or export is happening.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectScope {
    /// Server-level objects (logins, agent jobs)
    Server,
    /// Objects inside one database
    Database(String),
}

impl ObjectScope {
    /// Database name for database scopes, `None` at server scope.
    pub fn database(&self) -> Option<&str> {
        match self {
            ObjectScope::Server => None,
            ObjectScope::Database(name) => Some(name),
        }
    }
}

impl std::fmt::Display for ObjectScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectScope::Server => write!(f, "server"),
            ObjectScope::Database(name) => write!(f, "database {}", name),
        }
    }
}

/// Catalog flags consulted by exportability predicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFlags {
    /// Owned by the engine rather than created by a user
    pub is_system_object: bool,
    /// Module body is encrypted and cannot be scripted
    pub is_encrypted: bool,
    /// Built-in database role (db_owner, db_datareader, ...)
    pub is_fixed_role: bool,
}

/// One enumerable object on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbObject {
    /// Category the object belongs to
    pub object_type: ObjectType,
    /// Object name without schema
    pub name: String,
    /// Owning schema for schema-scoped objects
    pub schema: Option<String>,
    /// Containing database; `None` for server-scoped objects
    pub database: Option<String>,
    /// Catalog identifier used by the scripting backend to re-resolve the object
    pub id: Option<i32>,
    /// Catalog flags for exportability predicates
    pub flags: ObjectFlags,
}

impl DbObject {
    /// Creates an object with default flags.
    pub fn new(object_type: ObjectType, name: impl Into<String>) -> Self {
        Self {
            object_type,
            name: name.into(),
            schema: None,
            database: None,
            id: None,
            flags: ObjectFlags::default(),
        }
    }

    /// The object standing for a whole database's `CREATE DATABASE` script.
    pub fn database(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(ObjectType::Database, name.clone()).in_database(name)
    }

    /// Sets the owning schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Sets the containing database.
    pub fn in_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the catalog identifier.
    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    /// Replaces the catalog flags.
    pub fn with_flags(mut self, flags: ObjectFlags) -> Self {
        self.flags = flags;
        self
    }

    /// `schema.name` when a schema is known, otherwise the bare name.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

/// Progress record emitted once per successfully exported object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportNotification {
    /// Server the object was exported from
    pub server: String,
    /// Absent for server-scoped objects
    pub database: Option<String>,
    /// Category of the exported object
    pub object_type: ObjectType,
    /// Unqualified object name
    pub object_name: String,
    /// Script file that was written
    pub path: PathBuf,
}

/// A category whose export was aborted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryFailure {
    /// Database the category belongs to, `None` at server scope
    pub database: Option<String>,
    /// Category that was aborted
    pub object_type: ObjectType,
    /// Why the category was aborted
    pub error_message: String,
}

/// Outcome of a complete export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Server name as reported by the connection
    pub server: String,
    /// When the run began
    pub started_at: DateTime<Utc>,
    /// When the run completed; `None` while running
    pub finished_at: Option<DateTime<Utc>>,
    /// Databases traversed, in traversal order
    pub databases_exported: Vec<String>,
    /// Databases skipped because of the exclusion set
    pub databases_excluded: Vec<String>,
    /// Objects written across all categories
    pub objects_exported: usize,
    /// Objects skipped after a scripting failure
    pub objects_failed: usize,
    /// Written objects per category
    pub exported_by_type: BTreeMap<ObjectType, usize>,
    /// Categories aborted by non-fatal errors
    pub failures: Vec<CategoryFailure>,
}

impl ExportSummary {
    /// Starts a summary for the given server.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            started_at: Utc::now(),
            finished_at: None,
            databases_exported: Vec::new(),
            databases_excluded: Vec::new(),
            objects_exported: 0,
            objects_failed: 0,
            exported_by_type: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    /// Counts one written object.
    pub fn record_export(&mut self, object_type: ObjectType) {
        self.objects_exported += 1;
        *self.exported_by_type.entry(object_type).or_insert(0) += 1;
    }

    /// Records an aborted category.
    pub fn record_failure(
        &mut self,
        scope: &ObjectScope,
        object_type: ObjectType,
        error_message: impl Into<String>,
    ) {
        self.failures.push(CategoryFailure {
            database: scope.database().map(str::to_string),
            object_type,
            error_message: error_message.into(),
        });
    }

    /// Number of exported objects of one type.
    pub fn exported(&self, object_type: ObjectType) -> usize {
        self.exported_by_type.get(&object_type).copied().unwrap_or(0)
    }

    /// Stamps the completion time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration in milliseconds, once finished.
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_milliseconds())
    }
}
