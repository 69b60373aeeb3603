//! Object definitions rebuilt from catalog metadata.
//!
//! Each renderer reads what it needs from the catalog views of the object's
//! database and appends batches to a [`ScriptBuilder`]. Optional parts
//! (indexes, triggers, permissions, role memberships) follow the
//! [`ScriptingOptions`] flags.

use super::{RowExt, SqlServerScripter};
use crate::adapters::{ScriptBuilder, quote_literal, quote_name};
use crate::config::ScriptingOptions;
use crate::models::{DbObject, ObjectType};
use crate::security::CHANGEME_PASSWORD;
use crate::{Result, error::ScripterError};
use rand::Rng;
use rand::distr::Alphanumeric;
use tiberius::{IntoSql, Query, Row};

/// Length of the throwaway password put into SQL login scripts.
const GENERATED_PASSWORD_LEN: usize = 24;

/// Permission classes in `sys.database_permissions`.
const CLASS_DATABASE: i32 = 0;
const CLASS_OBJECT: i32 = 1;
const CLASS_SCHEMA: i32 = 3;
const CLASS_TYPE: i32 = 6;

/// Renders the complete script for one object.
pub(super) async fn render(
    scripter: &SqlServerScripter,
    object: &DbObject,
    options: &ScriptingOptions,
) -> Result<String> {
    let mut script = ScriptBuilder::new(options);
    let renderer = Renderer {
        scripter,
        object,
        options,
    };

    match object.object_type {
        ObjectType::Database => renderer.database(&mut script).await?,
        ObjectType::Login => renderer.login(&mut script).await?,
        ObjectType::SqlAgentJob => renderer.agent_job(&mut script).await?,
        ObjectType::User => renderer.user(&mut script).await?,
        ObjectType::Schema => renderer.schema(&mut script).await?,
        ObjectType::DatabaseRole => renderer.database_role(&mut script).await?,
        ObjectType::ApplicationRole => renderer.application_role(&mut script).await?,
        ObjectType::Table => renderer.table(&mut script).await?,
        ObjectType::View | ObjectType::StoredProcedure | ObjectType::Function => {
            renderer.module(&mut script).await?
        }
        ObjectType::Synonym => renderer.synonym(&mut script).await?,
        ObjectType::UserDefinedType => renderer.clr_type(&mut script).await?,
        ObjectType::UserDefinedDataType => renderer.alias_type(&mut script).await?,
        ObjectType::UserDefinedTableType => renderer.table_type(&mut script).await?,
    }

    Ok(script.finish())
}

fn in_database(template: &str, database: &str) -> String {
    template.replace("{db}", &quote_name(database))
}

fn on_off(flag: bool) -> &'static str {
    if flag { "ON" } else { "OFF" }
}

fn generated_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// `GRANT`/`DENY` statement for one `state_desc` row.
fn permission_statement(
    state_desc: &str,
    permission: &str,
    securable: Option<&str>,
    column: Option<&str>,
    grantee: &str,
) -> String {
    let (verb, suffix) = match state_desc {
        "GRANT_WITH_GRANT_OPTION" => ("GRANT", " WITH GRANT OPTION"),
        "DENY" => ("DENY", ""),
        "REVOKE" => ("REVOKE", ""),
        _ => ("GRANT", ""),
    };

    let target = match (securable, column) {
        (Some(securable), Some(column)) => format!(" ON {} ({})", securable, quote_name(column)),
        (Some(securable), None) => format!(" ON {}", securable),
        (None, _) => String::new(),
    };

    format!(
        "{} {}{} TO {}{}",
        verb,
        permission,
        target,
        quote_name(grantee),
        suffix
    )
}

/// Data type as written in a column or alias type definition.
pub(crate) fn format_column_type(
    type_name: &str,
    type_schema: &str,
    is_user_defined: bool,
    max_length: i32,
    precision: i32,
    scale: i32,
) -> String {
    if is_user_defined {
        return format!("{}.{}", quote_name(type_schema), quote_name(type_name));
    }

    let length = |unit: i32| {
        if max_length == -1 {
            "max".to_string()
        } else {
            (max_length / unit).to_string()
        }
    };

    let base = quote_name(type_name);
    match type_name.to_ascii_lowercase().as_str() {
        "varchar" | "char" | "varbinary" | "binary" => format!("{}({})", base, length(1)),
        "nvarchar" | "nchar" => format!("{}({})", base, length(2)),
        "decimal" | "numeric" => format!("{}({}, {})", base, precision, scale),
        "datetime2" | "time" | "datetimeoffset" => format!("{}({})", base, scale),
        _ => base,
    }
}

/// `FOREIGN KEY` referential action clause, empty for `NO_ACTION`.
fn referential_action(event: &str, action_desc: &str) -> String {
    match action_desc {
        "" | "NO_ACTION" => String::new(),
        action => format!("\nON {} {}", event, action.replace('_', " ")),
    }
}

/// `CREATE LOGIN` for principals that do not authenticate with a password.
///
/// `mapped_to` names the certificate or asymmetric key behind `C` and `K`
/// logins. Returns `None` for types that cannot be recreated this way.
fn external_login_statement(
    login_type: &str,
    login: &str,
    defaults: &str,
    mapped_to: Option<&str>,
) -> Option<String> {
    match (login_type, mapped_to) {
        ("U" | "G", _) => Some(format!("CREATE LOGIN {} FROM WINDOWS WITH {}", login, defaults)),
        ("C", Some(certificate)) => Some(format!(
            "CREATE LOGIN {} FROM CERTIFICATE {}",
            login,
            quote_name(certificate)
        )),
        ("K", Some(key)) => Some(format!(
            "CREATE LOGIN {} FROM ASYMMETRIC KEY {}",
            login,
            quote_name(key)
        )),
        ("E" | "X", _) => Some(format!(
            "CREATE LOGIN {} FROM EXTERNAL PROVIDER WITH {}",
            login, defaults
        )),
        _ => None,
    }
}

const COLUMNS: &str = "\
SELECT c.name,
       ty.name AS type_name,
       tys.name AS type_schema,
       CAST(ty.is_user_defined AS bit) AS is_user_defined,
       CAST(c.max_length AS int) AS max_length,
       CAST(c.precision AS int) AS precision,
       CAST(c.scale AS int) AS scale,
       CAST(c.is_nullable AS bit) AS is_nullable,
       CAST(c.is_identity AS bit) AS is_identity,
       CAST(ic.seed_value AS bigint) AS seed_value,
       CAST(ic.increment_value AS bigint) AS increment_value,
       cc.definition AS computed_definition,
       CAST(ISNULL(cc.is_persisted, 0) AS bit) AS is_persisted,
       c.collation_name,
       dc.name AS default_name,
       dc.definition AS default_definition
FROM {db}.sys.columns c
JOIN {db}.sys.types ty ON ty.user_type_id = c.user_type_id
JOIN {db}.sys.schemas tys ON tys.schema_id = ty.schema_id
LEFT JOIN {db}.sys.identity_columns ic ON ic.object_id = c.object_id AND ic.column_id = c.column_id
LEFT JOIN {db}.sys.computed_columns cc ON cc.object_id = c.object_id AND cc.column_id = c.column_id
LEFT JOIN {db}.sys.default_constraints dc ON dc.parent_object_id = c.object_id AND dc.parent_column_id = c.column_id
WHERE c.object_id = @P1
ORDER BY c.column_id";

const INDEXES: &str = "\
SELECT i.name,
       CAST(i.index_id AS int) AS index_id,
       i.type_desc,
       CAST(i.is_unique AS bit) AS is_unique,
       CAST(i.is_primary_key AS bit) AS is_primary_key,
       CAST(i.is_unique_constraint AS bit) AS is_unique_constraint,
       i.filter_definition
FROM {db}.sys.indexes i
WHERE i.object_id = @P1 AND i.type IN (1, 2) AND i.is_hypothetical = 0
ORDER BY i.is_primary_key DESC, i.name";

const INDEX_COLUMNS: &str = "\
SELECT CAST(ic.index_id AS int) AS index_id,
       c.name,
       CAST(ic.is_descending_key AS bit) AS is_descending_key,
       CAST(ic.is_included_column AS bit) AS is_included_column
FROM {db}.sys.index_columns ic
JOIN {db}.sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
WHERE ic.object_id = @P1
ORDER BY ic.index_id, ic.is_included_column, ic.key_ordinal, ic.index_column_id";

const CHECK_CONSTRAINTS: &str = "\
SELECT cc.name, cc.definition, CAST(cc.is_not_trusted AS bit) AS is_not_trusted
FROM {db}.sys.check_constraints cc
WHERE cc.parent_object_id = @P1
ORDER BY cc.name";

const FOREIGN_KEYS: &str = "\
SELECT fk.name,
       CAST(fk.object_id AS int) AS fk_id,
       rs.name AS ref_schema,
       rt.name AS ref_table,
       fk.delete_referential_action_desc,
       fk.update_referential_action_desc,
       CAST(fk.is_not_trusted AS bit) AS is_not_trusted
FROM {db}.sys.foreign_keys fk
JOIN {db}.sys.objects rt ON rt.object_id = fk.referenced_object_id
JOIN {db}.sys.schemas rs ON rs.schema_id = rt.schema_id
WHERE fk.parent_object_id = @P1
ORDER BY fk.name";

const FOREIGN_KEY_COLUMNS: &str = "\
SELECT CAST(fkc.constraint_object_id AS int) AS fk_id,
       pc.name AS parent_column,
       rc.name AS ref_column
FROM {db}.sys.foreign_key_columns fkc
JOIN {db}.sys.columns pc ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id
JOIN {db}.sys.columns rc ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
WHERE fkc.parent_object_id = @P1
ORDER BY fkc.constraint_object_id, fkc.constraint_column_id";

const TRIGGERS: &str = "\
SELECT tr.name,
       m.definition,
       CAST(tr.is_disabled AS bit) AS is_disabled,
       CAST(m.uses_ansi_nulls AS bit) AS uses_ansi_nulls,
       CAST(m.uses_quoted_identifier AS bit) AS uses_quoted_identifier
FROM {db}.sys.triggers tr
JOIN {db}.sys.sql_modules m ON m.object_id = tr.object_id
WHERE tr.parent_id = @P1
ORDER BY tr.name";

const MODULE: &str = "\
SELECT o.type AS object_type,
       m.definition,
       CAST(ISNULL(m.uses_ansi_nulls, 1) AS bit) AS uses_ansi_nulls,
       CAST(ISNULL(m.uses_quoted_identifier, 1) AS bit) AS uses_quoted_identifier,
       a.name AS assembly_name,
       am.assembly_class,
       am.assembly_method
FROM {db}.sys.objects o
LEFT JOIN {db}.sys.sql_modules m ON m.object_id = o.object_id
LEFT JOIN {db}.sys.assembly_modules am ON am.object_id = o.object_id
LEFT JOIN {db}.sys.assemblies a ON a.assembly_id = am.assembly_id
WHERE o.object_id = @P1";

const PARAMETERS: &str = "\
SELECT p.name,
       CAST(p.parameter_id AS int) AS parameter_id,
       ty.name AS type_name,
       tys.name AS type_schema,
       CAST(ty.is_user_defined AS bit) AS is_user_defined,
       CAST(p.max_length AS int) AS max_length,
       CAST(p.precision AS int) AS precision,
       CAST(p.scale AS int) AS scale,
       CAST(p.is_output AS bit) AS is_output
FROM {db}.sys.parameters p
JOIN {db}.sys.types ty ON ty.user_type_id = p.user_type_id
JOIN {db}.sys.schemas tys ON tys.schema_id = ty.schema_id
WHERE p.object_id = @P1
ORDER BY p.parameter_id";

const SECURABLE_PERMISSIONS: &str = "\
SELECT p.state_desc,
       p.permission_name,
       gp.name AS grantee,
       c.name AS column_name
FROM {db}.sys.database_permissions p
JOIN {db}.sys.database_principals gp ON gp.principal_id = p.grantee_principal_id
LEFT JOIN {db}.sys.columns c ON p.class = 1 AND c.object_id = p.major_id AND c.column_id = p.minor_id
WHERE p.class = @P1 AND p.major_id = @P2
ORDER BY gp.name, p.permission_name, c.name";

const PRINCIPAL_PERMISSIONS: &str = "\
SELECT p.state_desc, p.permission_name
FROM {db}.sys.database_permissions p
WHERE p.class = 0 AND p.grantee_principal_id = @P1
ORDER BY p.permission_name";

/// One table or table-type column.
#[derive(Debug, Clone, Default)]
struct ColumnDef {
    name: String,
    data_type: String,
    is_nullable: bool,
    identity: Option<(i64, i64)>,
    computed: Option<String>,
    is_persisted: bool,
    collation: Option<String>,
    default_constraint: Option<(String, String)>,
}

impl ColumnDef {
    fn from_row(row: &Row) -> Result<Self> {
        let is_user_defined = row.flag("is_user_defined")?;
        let identity = if row.flag("is_identity")? {
            Some((
                row.get_field::<i64>("seed_value")?.unwrap_or(1),
                row.get_field::<i64>("increment_value")?.unwrap_or(1),
            ))
        } else {
            None
        };
        let default_constraint = match (
            row.optional_text("default_name")?,
            row.optional_text("default_definition")?,
        ) {
            (Some(name), Some(definition)) => Some((name, definition)),
            _ => None,
        };

        Ok(Self {
            name: row.text("name")?,
            data_type: format_column_type(
                &row.text("type_name")?,
                &row.text("type_schema")?,
                is_user_defined,
                row.int("max_length")?,
                row.int("precision")?,
                row.int("scale")?,
            ),
            is_nullable: row.flag("is_nullable")?,
            identity,
            computed: row.optional_text("computed_definition")?,
            is_persisted: row.flag("is_persisted")?,
            collation: row
                .optional_text("collation_name")?
                .filter(|_| !is_user_defined),
            default_constraint,
        })
    }

    /// Column line inside `CREATE TABLE`.
    fn definition(&self) -> String {
        if let Some(expression) = &self.computed {
            let persisted = if self.is_persisted { " PERSISTED" } else { "" };
            return format!("{} AS {}{}", quote_name(&self.name), expression, persisted);
        }

        let mut line = format!("{} {}", quote_name(&self.name), self.data_type);
        if let Some(collation) = &self.collation {
            line.push_str(&format!(" COLLATE {}", collation));
        }
        if let Some((seed, increment)) = self.identity {
            line.push_str(&format!(" IDENTITY({},{})", seed, increment));
        }
        line.push_str(if self.is_nullable { " NULL" } else { " NOT NULL" });
        line
    }
}

/// Column list joined as `CREATE TABLE` body lines.
fn column_lines(columns: &[ColumnDef]) -> Vec<String> {
    columns
        .iter()
        .map(|column| format!("\t{}", column.definition()))
        .collect()
}

/// Signature and entry point of a CLR procedure or function.
#[derive(Debug, Clone, Default)]
struct ClrModule {
    /// `sys.objects.type`: `PC`, `FS` or `FT`
    kind: String,
    /// `[assembly].[class].[method]`
    external_name: String,
    parameters: Vec<String>,
    /// Scalar return type or `TABLE (...)` body
    returns: Option<String>,
}

impl ClrModule {
    fn create_statement(&self, name: &str) -> Option<String> {
        match self.kind.as_str() {
            "PC" => {
                let parameters = if self.parameters.is_empty() {
                    String::new()
                } else {
                    format!("\n\t{}", self.parameters.join(",\n\t"))
                };
                Some(format!(
                    "CREATE PROCEDURE {}{}\nAS EXTERNAL NAME {}",
                    name, parameters, self.external_name
                ))
            }
            "FS" | "FT" => Some(format!(
                "CREATE FUNCTION {}({})\nRETURNS {}\nAS EXTERNAL NAME {}",
                name,
                self.parameters.join(", "),
                self.returns.as_deref()?,
                self.external_name
            )),
            _ => None,
        }
    }
}

/// A clustered or nonclustered rowstore index, including the ones backing
/// primary key and unique constraints.
#[derive(Debug, Clone, Default)]
struct IndexDef {
    name: String,
    index_id: i32,
    type_desc: String,
    is_unique: bool,
    is_primary_key: bool,
    is_unique_constraint: bool,
    filter: Option<String>,
    keys: Vec<String>,
    included: Vec<String>,
}

impl IndexDef {
    fn is_constraint(&self) -> bool {
        self.is_primary_key || self.is_unique_constraint
    }

    fn key_list(&self) -> String {
        self.keys
            .iter()
            .map(|key| format!("\t{}", key))
            .collect::<Vec<_>>()
            .join(",\n")
    }

    /// Constraint clause inside `CREATE TABLE`; unnamed for table types.
    fn constraint_clause(&self, named: bool) -> String {
        let kind = if self.is_primary_key {
            "PRIMARY KEY"
        } else {
            "UNIQUE"
        };
        let prefix = if named {
            format!(" CONSTRAINT {} ", quote_name(&self.name))
        } else {
            "\t".to_string()
        };
        format!("{}{} {}\n(\n{}\n)", prefix, kind, self.type_desc, self.key_list())
    }

    fn create_statement(&self, table: &str) -> String {
        let unique = if self.is_unique { "UNIQUE " } else { "" };
        let mut sql = format!(
            "CREATE {}{} INDEX {} ON {}\n(\n{}\n)",
            unique,
            self.type_desc,
            quote_name(&self.name),
            table,
            self.key_list()
        );
        if !self.included.is_empty() {
            sql.push_str(&format!("\nINCLUDE({})", self.included.join(", ")));
        }
        if let Some(filter) = &self.filter {
            sql.push_str(&format!("\nWHERE {}", filter));
        }
        sql
    }
}

struct Renderer<'a> {
    scripter: &'a SqlServerScripter,
    object: &'a DbObject,
    options: &'a ScriptingOptions,
}

impl Renderer<'_> {
    fn database_name(&self) -> Result<&str> {
        self.object.database.as_deref().ok_or_else(|| {
            ScripterError::scripting(self.object.qualified_name(), "no containing database")
        })
    }

    fn id(&self) -> Result<i32> {
        self.object.id.ok_or_else(|| {
            ScripterError::scripting(self.object.qualified_name(), "missing catalog identifier")
        })
    }

    fn not_found(&self) -> ScripterError {
        ScripterError::scripting(self.object.qualified_name(), "object no longer exists")
    }

    /// `[schema].[name]`, or `[name]` for schema-less objects.
    fn two_part_name(&self) -> String {
        match &self.object.schema {
            Some(schema) => format!("{}.{}", quote_name(schema), quote_name(&self.object.name)),
            None => quote_name(&self.object.name),
        }
    }

    async fn fetch_by<'k, K>(&self, template: &str, key: K, context: &str) -> Result<Vec<Row>>
    where
        K: IntoSql<'k> + Send + 'k,
    {
        let mut query = Query::new(in_database(template, self.database_name()?));
        query.bind(key);
        self.scripter.fetch(query, context).await
    }

    async fn database(&self, script: &mut ScriptBuilder<'_>) -> Result<()> {
        const DATABASE: &str = "\
SELECT d.collation_name,
       CAST(d.compatibility_level AS int) AS compatibility_level,
       d.recovery_model_desc
FROM sys.databases d
WHERE d.name = @P1";
        const FILES: &str = "\
SELECT df.name,
       df.physical_name,
       CAST(df.type AS int) AS file_type,
       fg.name AS filegroup_name,
       CAST(df.size AS int) AS size_pages,
       CAST(df.max_size AS int) AS max_size_pages,
       CAST(df.growth AS int) AS growth,
       CAST(df.is_percent_growth AS bit) AS is_percent_growth
FROM {db}.sys.database_files df
LEFT JOIN {db}.sys.filegroups fg ON fg.data_space_id = df.data_space_id
WHERE df.type IN (0, 1)
ORDER BY df.type, df.data_space_id, df.file_id";

        let database = self.database_name()?;
        let mut query = Query::new(DATABASE);
        query.bind(database);
        let row = self
            .scripter
            .fetch_one(query, "database properties")
            .await?
            .ok_or_else(|| self.not_found())?;

        let files = self
            .scripter
            .fetch(Query::new(in_database(FILES, database)), "database files")
            .await?;

        let mut data_files = Vec::new();
        let mut log_files = Vec::new();
        let mut current_filegroup: Option<String> = None;
        for file in &files {
            let max_size = match file.int("max_size_pages")? {
                -1 => "UNLIMITED".to_string(),
                pages => format!("{}KB", i64::from(pages) * 8),
            };
            let growth = if file.flag("is_percent_growth")? {
                format!("{}%", file.int("growth")?)
            } else {
                format!("{}KB", i64::from(file.int("growth")?) * 8)
            };
            let spec = format!(
                "( NAME = {}, FILENAME = {} , SIZE = {}KB , MAXSIZE = {}, FILEGROWTH = {} )",
                quote_literal(&file.text("name")?),
                quote_literal(&file.text("physical_name")?),
                i64::from(file.int("size_pages")?) * 8,
                max_size,
                growth
            );

            if file.int("file_type")? == 1 {
                log_files.push(spec);
                continue;
            }

            let filegroup = file.optional_text("filegroup_name")?;
            let spec = match &filegroup {
                Some(name)
                    if name != "PRIMARY" && current_filegroup.as_deref() != Some(name.as_str()) =>
                {
                    format!(" FILEGROUP {} \n{}", quote_name(name), spec)
                }
                _ => spec,
            };
            current_filegroup = filegroup;
            data_files.push(spec);
        }

        let mut create = format!("CREATE DATABASE {}", quote_name(database));
        if !data_files.is_empty() {
            create.push_str(&format!("\n ON  PRIMARY \n{}", data_files.join(",\n")));
        }
        if !log_files.is_empty() {
            create.push_str(&format!("\n LOG ON \n{}", log_files.join(",\n")));
        }
        if let Some(collation) = row.optional_text("collation_name")? {
            create.push_str(&format!("\n COLLATE {}", collation));
        }

        script.use_database("master").batch(&create);
        script.batch(&format!(
            "ALTER DATABASE {} SET COMPATIBILITY_LEVEL = {}",
            quote_name(database),
            row.int("compatibility_level")?
        ));
        if let Some(recovery) = row.optional_text("recovery_model_desc")? {
            script.batch(&format!(
                "ALTER DATABASE {} SET RECOVERY {}",
                quote_name(database),
                recovery
            ));
        }
        Ok(())
    }

    async fn login(&self, script: &mut ScriptBuilder<'_>) -> Result<()> {
        const LOGIN: &str = "\
SELECT p.type,
       p.default_database_name,
       p.default_language_name,
       CAST(p.principal_id AS int) AS principal_id,
       CAST(p.is_disabled AS bit) AS is_disabled,
       CAST(ISNULL(l.is_policy_checked, 0) AS bit) AS is_policy_checked,
       CAST(ISNULL(l.is_expiration_checked, 0) AS bit) AS is_expiration_checked,
       COALESCE(c.name, k.name) AS mapped_to
FROM sys.server_principals p
LEFT JOIN sys.sql_logins l ON l.principal_id = p.principal_id
LEFT JOIN master.sys.certificates c ON c.sid = p.sid
LEFT JOIN master.sys.asymmetric_keys k ON k.sid = p.sid
WHERE p.name = @P1";
        const SERVER_ROLES: &str = "\
SELECT r.name
FROM sys.server_role_members rm
JOIN sys.server_principals r ON r.principal_id = rm.role_principal_id
WHERE rm.member_principal_id = @P1
ORDER BY r.name";
        const SERVER_PERMISSIONS: &str = "\
SELECT perm.state_desc, perm.permission_name
FROM sys.server_permissions perm
WHERE perm.class = 100 AND perm.grantee_principal_id = @P1
ORDER BY perm.permission_name";

        let name = &self.object.name;
        let login = quote_name(name);

        let mut query = Query::new(LOGIN);
        query.bind(name.as_str());
        let row = self
            .scripter
            .fetch_one(query, "login properties")
            .await?
            .ok_or_else(|| self.not_found())?;

        let default_database = row
            .optional_text("default_database_name")?
            .unwrap_or_else(|| "master".to_string());
        let mut defaults = format!("DEFAULT_DATABASE={}", quote_name(&default_database));
        if let Some(language) = row.optional_text("default_language_name")? {
            defaults.push_str(&format!(", DEFAULT_LANGUAGE={}", quote_name(&language)));
        }

        let login_type = row.text("type")?;
        let create = match login_type.trim() {
            "S" => None,
            other => Some(
                external_login_statement(
                    other,
                    &login,
                    &defaults,
                    row.optional_text("mapped_to")?.as_deref(),
                )
                .ok_or_else(|| {
                    ScripterError::scripting(
                        self.object.qualified_name(),
                        format!("login type '{}' cannot be scripted", other),
                    )
                })?,
            ),
        };

        script.use_database("master");
        match create {
            Some(statement) => {
                script.batch(&statement);
            }
            None => {
                script.statement(
                    "/* For security reasons the login is created with a generated password */",
                );
                script.batch(&format!(
                    "CREATE LOGIN {} WITH PASSWORD={}, {}, CHECK_EXPIRATION={}, CHECK_POLICY={}",
                    login,
                    quote_literal(&generated_password()),
                    defaults,
                    on_off(row.flag("is_expiration_checked")?),
                    on_off(row.flag("is_policy_checked")?)
                ));
            }
        }

        if row.flag("is_disabled")? {
            script.batch(&format!("ALTER LOGIN {} DISABLE", login));
        }

        let principal_id = row.int("principal_id")?;
        if self.options.include_role_memberships {
            let mut query = Query::new(SERVER_ROLES);
            query.bind(principal_id);
            for role in self.scripter.fetch(query, "server role membership").await? {
                script.batch(&format!(
                    "ALTER SERVER ROLE {} ADD MEMBER {}",
                    quote_name(&role.text("name")?),
                    login
                ));
            }
        }

        if self.options.include_permissions {
            let mut query = Query::new(SERVER_PERMISSIONS);
            query.bind(principal_id);
            for permission in self.scripter.fetch(query, "server permissions").await? {
                script.batch(&permission_statement(
                    &permission.text("state_desc")?,
                    &permission.text("permission_name")?,
                    None,
                    None,
                    name,
                ));
            }
        }

        Ok(())
    }

    async fn agent_job(&self, script: &mut ScriptBuilder<'_>) -> Result<()> {
        const JOB: &str = "\
SELECT CAST(j.enabled AS bit) AS enabled,
       j.description,
       SUSER_SNAME(j.owner_sid) AS owner_name,
       c.name AS category_name,
       CAST(j.start_step_id AS int) AS start_step_id
FROM msdb.dbo.sysjobs j
LEFT JOIN msdb.dbo.syscategories c ON c.category_id = j.category_id
WHERE j.name = @P1";
        const STEPS: &str = "\
SELECT CAST(s.step_id AS int) AS step_id,
       s.step_name,
       s.subsystem,
       s.command,
       s.database_name,
       CAST(s.on_success_action AS int) AS on_success_action,
       CAST(s.on_success_step_id AS int) AS on_success_step_id,
       CAST(s.on_fail_action AS int) AS on_fail_action,
       CAST(s.on_fail_step_id AS int) AS on_fail_step_id,
       CAST(s.retry_attempts AS int) AS retry_attempts,
       CAST(s.retry_interval AS int) AS retry_interval,
       s.output_file_name
FROM msdb.dbo.sysjobsteps s
JOIN msdb.dbo.sysjobs j ON j.job_id = s.job_id
WHERE j.name = @P1
ORDER BY s.step_id";
        const SCHEDULES: &str = "\
SELECT sc.name,
       CAST(sc.enabled AS int) AS enabled,
       CAST(sc.freq_type AS int) AS freq_type,
       CAST(sc.freq_interval AS int) AS freq_interval,
       CAST(sc.freq_subday_type AS int) AS freq_subday_type,
       CAST(sc.freq_subday_interval AS int) AS freq_subday_interval,
       CAST(sc.freq_relative_interval AS int) AS freq_relative_interval,
       CAST(sc.freq_recurrence_factor AS int) AS freq_recurrence_factor,
       CAST(sc.active_start_date AS int) AS active_start_date,
       CAST(sc.active_end_date AS int) AS active_end_date,
       CAST(sc.active_start_time AS int) AS active_start_time,
       CAST(sc.active_end_time AS int) AS active_end_time
FROM msdb.dbo.sysschedules sc
JOIN msdb.dbo.sysjobschedules js ON js.schedule_id = sc.schedule_id
JOIN msdb.dbo.sysjobs j ON j.job_id = js.job_id
WHERE j.name = @P1
ORDER BY sc.name";
        const ON_ERROR: &str = "IF (@@ERROR <> 0 OR @ReturnCode <> 0) GOTO QuitWithRollback";

        let name = self.object.name.as_str();
        let mut query = Query::new(JOB);
        query.bind(name);
        let job = self
            .scripter
            .fetch_one(query, "agent job")
            .await?
            .ok_or_else(|| self.not_found())?;

        let mut query = Query::new(STEPS);
        query.bind(name);
        let steps = self.scripter.fetch(query, "agent job steps").await?;

        let mut query = Query::new(SCHEDULES);
        query.bind(name);
        let schedules = self.scripter.fetch(query, "agent job schedules").await?;

        let category = job
            .optional_text("category_name")?
            .unwrap_or_else(|| "[Uncategorized (Local)]".to_string());

        let mut body = vec![
            "BEGIN TRANSACTION".to_string(),
            "DECLARE @ReturnCode INT".to_string(),
            "SELECT @ReturnCode = 0".to_string(),
            format!(
                "IF NOT EXISTS (SELECT name FROM msdb.dbo.syscategories WHERE name={} AND category_class=1)",
                quote_literal(&category)
            ),
            "BEGIN".to_string(),
            format!(
                "EXEC @ReturnCode = msdb.dbo.sp_add_category @class=N'JOB', @type=N'LOCAL', @name={}",
                quote_literal(&category)
            ),
            ON_ERROR.to_string(),
            "END".to_string(),
            "DECLARE @jobId BINARY(16)".to_string(),
        ];

        let mut add_job = format!(
            "EXEC @ReturnCode = msdb.dbo.sp_add_job @job_name={}, @enabled={}, @description={}, @category_name={}",
            quote_literal(name),
            u8::from(job.flag("enabled")?),
            quote_literal(&job.optional_text("description")?.unwrap_or_default()),
            quote_literal(&category)
        );
        if let Some(owner) = job.optional_text("owner_name")? {
            add_job.push_str(&format!(", @owner_login_name={}", quote_literal(&owner)));
        }
        add_job.push_str(", @job_id = @jobId OUTPUT");
        body.push(add_job);
        body.push(ON_ERROR.to_string());

        for step in &steps {
            let mut add_step = format!(
                "EXEC @ReturnCode = msdb.dbo.sp_add_jobstep @job_id=@jobId, @step_name={}, @step_id={}, \
                 @on_success_action={}, @on_success_step_id={}, @on_fail_action={}, @on_fail_step_id={}, \
                 @retry_attempts={}, @retry_interval={}, @subsystem={}, @command={}",
                quote_literal(&step.text("step_name")?),
                step.int("step_id")?,
                step.int("on_success_action")?,
                step.int("on_success_step_id")?,
                step.int("on_fail_action")?,
                step.int("on_fail_step_id")?,
                step.int("retry_attempts")?,
                step.int("retry_interval")?,
                quote_literal(&step.text("subsystem")?),
                quote_literal(&step.text("command")?)
            );
            if let Some(database) = step.optional_text("database_name")? {
                add_step.push_str(&format!(", @database_name={}", quote_literal(&database)));
            }
            if let Some(output) = step.optional_text("output_file_name")? {
                add_step.push_str(&format!(", @output_file_name={}", quote_literal(&output)));
            }
            body.push(add_step);
            body.push(ON_ERROR.to_string());
        }

        body.push(format!(
            "EXEC @ReturnCode = msdb.dbo.sp_update_job @job_id = @jobId, @start_step_id = {}",
            job.int("start_step_id")?
        ));
        body.push(ON_ERROR.to_string());

        for schedule in &schedules {
            body.push(format!(
                "EXEC @ReturnCode = msdb.dbo.sp_add_jobschedule @job_id=@jobId, @name={}, @enabled={}, \
                 @freq_type={}, @freq_interval={}, @freq_subday_type={}, @freq_subday_interval={}, \
                 @freq_relative_interval={}, @freq_recurrence_factor={}, @active_start_date={}, \
                 @active_end_date={}, @active_start_time={}, @active_end_time={}",
                quote_literal(&schedule.text("name")?),
                schedule.int("enabled")?,
                schedule.int("freq_type")?,
                schedule.int("freq_interval")?,
                schedule.int("freq_subday_type")?,
                schedule.int("freq_subday_interval")?,
                schedule.int("freq_relative_interval")?,
                schedule.int("freq_recurrence_factor")?,
                schedule.int("active_start_date")?,
                schedule.int("active_end_date")?,
                schedule.int("active_start_time")?,
                schedule.int("active_end_time")?
            ));
            body.push(ON_ERROR.to_string());
        }

        body.extend(
            [
                "EXEC @ReturnCode = msdb.dbo.sp_add_jobserver @job_id = @jobId, @server_name = N'(local)'",
                ON_ERROR,
                "COMMIT TRANSACTION",
                "GOTO EndSave",
                "QuitWithRollback:",
                "    IF (@@TRANCOUNT > 0) ROLLBACK TRANSACTION",
                "EndSave:",
            ]
            .map(str::to_string),
        );

        script.use_database("msdb").batch(&body.join("\n"));
        Ok(())
    }

    /// Database-level permissions granted to a principal.
    async fn principal_permissions(
        &self,
        principal_id: i32,
        script: &mut ScriptBuilder<'_>,
    ) -> Result<()> {
        if !self.options.include_permissions {
            return Ok(());
        }
        for permission in self
            .fetch_by(PRINCIPAL_PERMISSIONS, principal_id, "principal permissions")
            .await?
        {
            script.batch(&permission_statement(
                &permission.text("state_desc")?,
                &permission.text("permission_name")?,
                None,
                None,
                &self.object.name,
            ));
        }
        Ok(())
    }

    /// Permissions on a securable.
    async fn securable_permissions(
        &self,
        class: i32,
        major_id: i32,
        securable: &str,
        script: &mut ScriptBuilder<'_>,
    ) -> Result<()> {
        if !self.options.include_permissions {
            return Ok(());
        }
        let mut query = Query::new(in_database(SECURABLE_PERMISSIONS, self.database_name()?));
        query.bind(class);
        query.bind(major_id);
        for permission in self.scripter.fetch(query, "object permissions").await? {
            script.batch(&permission_statement(
                &permission.text("state_desc")?,
                &permission.text("permission_name")?,
                Some(securable),
                permission.optional_text("column_name")?.as_deref(),
                &permission.text("grantee")?,
            ));
        }
        Ok(())
    }

    async fn user(&self, script: &mut ScriptBuilder<'_>) -> Result<()> {
        const USER: &str = "\
SELECT dp.type,
       dp.default_schema_name,
       sp.name AS login_name,
       cert.name AS certificate_name,
       ak.name AS asymmetric_key_name
FROM {db}.sys.database_principals dp
LEFT JOIN sys.server_principals sp ON sp.sid = dp.sid
LEFT JOIN {db}.sys.certificates cert ON cert.sid = dp.sid
LEFT JOIN {db}.sys.asymmetric_keys ak ON ak.sid = dp.sid
WHERE dp.principal_id = @P1";
        const MEMBER_OF: &str = "\
SELECT r.name
FROM {db}.sys.database_role_members rm
JOIN {db}.sys.database_principals r ON r.principal_id = rm.role_principal_id
WHERE rm.member_principal_id = @P1
ORDER BY r.name";

        let id = self.id()?;
        let user = quote_name(&self.object.name);
        let row = self
            .fetch_by(USER, id, "user properties")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found())?;

        let source = match (
            row.optional_text("login_name")?,
            row.optional_text("certificate_name")?,
            row.optional_text("asymmetric_key_name")?,
            row.text("type")?.as_str(),
        ) {
            (Some(login), _, _, _) => format!(" FOR LOGIN {}", quote_name(&login)),
            (None, Some(certificate), _, _) => format!(" FOR CERTIFICATE {}", quote_name(&certificate)),
            (None, None, Some(key), _) => format!(" FOR ASYMMETRIC KEY {}", quote_name(&key)),
            (None, None, None, "S") => " WITHOUT LOGIN".to_string(),
            (None, None, None, "E" | "X") => " FROM EXTERNAL PROVIDER".to_string(),
            _ => String::new(),
        };
        let default_schema = row
            .optional_text("default_schema_name")?
            .map(|schema| format!(" WITH DEFAULT_SCHEMA={}", quote_name(&schema)))
            .unwrap_or_default();

        script.use_database(self.database_name()?);
        script.batch(&format!("CREATE USER {}{}{}", user, source, default_schema));

        if self.options.include_role_memberships {
            for role in self.fetch_by(MEMBER_OF, id, "user role membership").await? {
                script.batch(&format!(
                    "ALTER ROLE {} ADD MEMBER {}",
                    quote_name(&role.text("name")?),
                    user
                ));
            }
        }

        self.principal_permissions(id, script).await
    }

    async fn schema(&self, script: &mut ScriptBuilder<'_>) -> Result<()> {
        const SCHEMA: &str = "\
SELECT o.name AS owner_name
FROM {db}.sys.schemas s
JOIN {db}.sys.database_principals o ON o.principal_id = s.principal_id
WHERE s.schema_id = @P1";

        let id = self.id()?;
        let row = self
            .fetch_by(SCHEMA, id, "schema owner")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found())?;

        let schema = quote_name(&self.object.name);
        script.use_database(self.database_name()?);
        script.batch(&format!(
            "CREATE SCHEMA {} AUTHORIZATION {}",
            schema,
            quote_name(&row.text("owner_name")?)
        ));

        self.securable_permissions(CLASS_SCHEMA, id, &format!("SCHEMA::{}", schema), script)
            .await
    }

    async fn database_role(&self, script: &mut ScriptBuilder<'_>) -> Result<()> {
        const ROLE: &str = "\
SELECT o.name AS owner_name
FROM {db}.sys.database_principals r
LEFT JOIN {db}.sys.database_principals o ON o.principal_id = r.owning_principal_id
WHERE r.principal_id = @P1";
        const MEMBERS: &str = "\
SELECT m.name
FROM {db}.sys.database_role_members rm
JOIN {db}.sys.database_principals m ON m.principal_id = rm.member_principal_id
WHERE rm.role_principal_id = @P1
ORDER BY m.name";

        let id = self.id()?;
        let role = quote_name(&self.object.name);
        let row = self
            .fetch_by(ROLE, id, "role owner")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found())?;

        let authorization = row
            .optional_text("owner_name")?
            .map(|owner| format!(" AUTHORIZATION {}", quote_name(&owner)))
            .unwrap_or_default();

        script.use_database(self.database_name()?);
        script.batch(&format!("CREATE ROLE {}{}", role, authorization));

        if self.options.include_role_memberships {
            for member in self.fetch_by(MEMBERS, id, "role members").await? {
                script.batch(&format!(
                    "ALTER ROLE {} ADD MEMBER {}",
                    role,
                    quote_name(&member.text("name")?)
                ));
            }
        }

        self.principal_permissions(id, script).await
    }

    async fn application_role(&self, script: &mut ScriptBuilder<'_>) -> Result<()> {
        const APPLICATION_ROLE: &str = "\
SELECT dp.default_schema_name
FROM {db}.sys.database_principals dp
WHERE dp.principal_id = @P1";

        let id = self.id()?;
        let row = self
            .fetch_by(APPLICATION_ROLE, id, "application role")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found())?;

        let default_schema = row
            .optional_text("default_schema_name")?
            .map(|schema| format!("DEFAULT_SCHEMA = {}, ", quote_name(&schema)))
            .unwrap_or_default();

        script.use_database(self.database_name()?);
        script.batch(&format!(
            "CREATE APPLICATION ROLE {} WITH {}PASSWORD = {}",
            quote_name(&self.object.name),
            default_schema,
            quote_literal(CHANGEME_PASSWORD)
        ));

        self.principal_permissions(id, script).await
    }

    async fn columns(&self, object_id: i32) -> Result<Vec<ColumnDef>> {
        self.fetch_by(COLUMNS, object_id, "columns")
            .await?
            .iter()
            .map(ColumnDef::from_row)
            .collect()
    }

    async fn indexes(&self, object_id: i32) -> Result<Vec<IndexDef>> {
        let mut indexes = self
            .fetch_by(INDEXES, object_id, "indexes")
            .await?
            .iter()
            .map(|row| -> Result<IndexDef> {
                Ok(IndexDef {
                    name: row.text("name")?,
                    index_id: row.int("index_id")?,
                    type_desc: row.text("type_desc")?,
                    is_unique: row.flag("is_unique")?,
                    is_primary_key: row.flag("is_primary_key")?,
                    is_unique_constraint: row.flag("is_unique_constraint")?,
                    filter: row.optional_text("filter_definition")?,
                    ..IndexDef::default()
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for row in self
            .fetch_by(INDEX_COLUMNS, object_id, "index columns")
            .await?
        {
            let index_id = row.int("index_id")?;
            let Some(index) = indexes.iter_mut().find(|index| index.index_id == index_id) else {
                continue;
            };
            let column = quote_name(&row.text("name")?);
            if row.flag("is_included_column")? {
                index.included.push(column);
            } else {
                let direction = if row.flag("is_descending_key")? {
                    "DESC"
                } else {
                    "ASC"
                };
                index.keys.push(format!("{} {}", column, direction));
            }
        }

        Ok(indexes)
    }

    async fn triggers(&self, parent_id: i32, table: &str, script: &mut ScriptBuilder<'_>) -> Result<()> {
        if !self.options.include_triggers {
            return Ok(());
        }
        for trigger in self.fetch_by(TRIGGERS, parent_id, "triggers").await? {
            let Some(definition) = trigger.optional_text("definition")? else {
                continue;
            };
            script.batch(&format!("SET ANSI_NULLS {}", on_off(trigger.flag("uses_ansi_nulls")?)));
            script.batch(&format!(
                "SET QUOTED_IDENTIFIER {}",
                on_off(trigger.flag("uses_quoted_identifier")?)
            ));
            script.batch(definition.trim());
            if trigger.flag("is_disabled")? {
                script.batch(&format!(
                    "ALTER TABLE {} DISABLE TRIGGER {}",
                    table,
                    quote_name(&trigger.text("name")?)
                ));
            }
        }
        Ok(())
    }

    async fn table(&self, script: &mut ScriptBuilder<'_>) -> Result<()> {
        let id = self.id()?;
        let table = self.two_part_name();

        let columns = self.columns(id).await?;
        if columns.is_empty() {
            return Err(self.not_found());
        }
        let indexes = self.indexes(id).await?;

        let mut lines = column_lines(&columns);
        lines.extend(
            indexes
                .iter()
                .filter(|index| index.is_constraint())
                .map(|index| index.constraint_clause(true)),
        );

        script.use_database(self.database_name()?);
        script.batch("SET ANSI_NULLS ON");
        script.batch("SET QUOTED_IDENTIFIER ON");
        script.batch(&format!("CREATE TABLE {}(\n{}\n)", table, lines.join(",\n")));

        if self.options.include_indexes {
            for index in indexes.iter().filter(|index| !index.is_constraint()) {
                script.batch(&index.create_statement(&table));
            }
        }

        for column in &columns {
            if let Some((name, definition)) = &column.default_constraint {
                script.batch(&format!(
                    "ALTER TABLE {} ADD  CONSTRAINT {}  DEFAULT {} FOR {}",
                    table,
                    quote_name(name),
                    definition,
                    quote_name(&column.name)
                ));
            }
        }

        let foreign_key_columns = self
            .fetch_by(FOREIGN_KEY_COLUMNS, id, "foreign key columns")
            .await?;
        for foreign_key in self.fetch_by(FOREIGN_KEYS, id, "foreign keys").await? {
            let fk_id = foreign_key.int("fk_id")?;
            let mut parent_columns = Vec::new();
            let mut referenced_columns = Vec::new();
            for column in &foreign_key_columns {
                if column.int("fk_id")? == fk_id {
                    parent_columns.push(quote_name(&column.text("parent_column")?));
                    referenced_columns.push(quote_name(&column.text("ref_column")?));
                }
            }
            let check = if foreign_key.flag("is_not_trusted")? {
                "NOCHECK"
            } else {
                "CHECK"
            };
            script.batch(&format!(
                "ALTER TABLE {}  WITH {} ADD  CONSTRAINT {} FOREIGN KEY({})\nREFERENCES {}.{} ({}){}{}",
                table,
                check,
                quote_name(&foreign_key.text("name")?),
                parent_columns.join(", "),
                quote_name(&foreign_key.text("ref_schema")?),
                quote_name(&foreign_key.text("ref_table")?),
                referenced_columns.join(", "),
                referential_action(
                    "DELETE",
                    &foreign_key.text("delete_referential_action_desc")?
                ),
                referential_action(
                    "UPDATE",
                    &foreign_key.text("update_referential_action_desc")?
                )
            ));
        }

        for check in self.fetch_by(CHECK_CONSTRAINTS, id, "check constraints").await? {
            let mode = if check.flag("is_not_trusted")? {
                "NOCHECK"
            } else {
                "CHECK"
            };
            script.batch(&format!(
                "ALTER TABLE {}  WITH {} ADD  CONSTRAINT {} CHECK {}",
                table,
                mode,
                quote_name(&check.text("name")?),
                check.text("definition")?
            ));
        }

        self.triggers(id, &table, script).await?;
        self.securable_permissions(CLASS_OBJECT, id, &table, script)
            .await
    }

    /// Views, procedures and functions.
    async fn module(&self, script: &mut ScriptBuilder<'_>) -> Result<()> {
        let id = self.id()?;
        let name = self.two_part_name();
        let row = self
            .fetch_by(MODULE, id, "module definition")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found())?;

        if row.optional_text("assembly_name")?.is_some() {
            let module = self.clr_module(id, &row).await?;
            let statement = module.create_statement(&name).ok_or_else(|| {
                ScripterError::scripting(
                    self.object.qualified_name(),
                    format!("CLR module type '{}' cannot be scripted", module.kind),
                )
            })?;
            script.use_database(self.database_name()?);
            script.batch(&statement);
        } else {
            let definition = row.optional_text("definition")?.ok_or_else(|| {
                ScripterError::scripting(
                    self.object.qualified_name(),
                    "definition is encrypted or not visible",
                )
            })?;

            script.use_database(self.database_name()?);
            script.batch(&format!("SET ANSI_NULLS {}", on_off(row.flag("uses_ansi_nulls")?)));
            script.batch(&format!(
                "SET QUOTED_IDENTIFIER {}",
                on_off(row.flag("uses_quoted_identifier")?)
            ));
            script.batch(definition.trim());
        }

        if self.object.object_type == ObjectType::View {
            self.triggers(id, &name, script).await?;
        }
        self.securable_permissions(CLASS_OBJECT, id, &name, script)
            .await
    }

    async fn clr_module(&self, id: i32, row: &Row) -> Result<ClrModule> {
        let kind = row.text("object_type")?.trim().to_string();
        let external_name = format!(
            "{}.{}.{}",
            quote_name(&row.text("assembly_name")?),
            quote_name(&row.text("assembly_class")?),
            quote_name(&row.text("assembly_method")?)
        );

        let mut parameters = Vec::new();
        let mut returns = None;
        for parameter in self.fetch_by(PARAMETERS, id, "module parameters").await? {
            let data_type = format_column_type(
                &parameter.text("type_name")?,
                &parameter.text("type_schema")?,
                parameter.flag("is_user_defined")?,
                parameter.int("max_length")?,
                parameter.int("precision")?,
                parameter.int("scale")?,
            );
            // Parameter 0 is the scalar return value
            if parameter.int("parameter_id")? == 0 {
                returns = Some(data_type);
                continue;
            }
            let output = if parameter.flag("is_output")? { " OUTPUT" } else { "" };
            parameters.push(format!("{} {}{}", parameter.text("name")?, data_type, output));
        }

        if kind == "FT" {
            let columns = self.columns(id).await?;
            returns = Some(format!("TABLE (\n{}\n)", column_lines(&columns).join(",\n")));
        }

        Ok(ClrModule {
            kind,
            external_name,
            parameters,
            returns,
        })
    }

    async fn synonym(&self, script: &mut ScriptBuilder<'_>) -> Result<()> {
        const SYNONYM: &str = "\
SELECT sn.base_object_name
FROM {db}.sys.synonyms sn
WHERE sn.object_id = @P1";

        let id = self.id()?;
        let name = self.two_part_name();
        let row = self
            .fetch_by(SYNONYM, id, "synonym")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found())?;

        script.use_database(self.database_name()?);
        script.batch(&format!(
            "CREATE SYNONYM {} FOR {}",
            name,
            row.text("base_object_name")?
        ));

        self.securable_permissions(CLASS_OBJECT, id, &name, script)
            .await
    }

    async fn clr_type(&self, script: &mut ScriptBuilder<'_>) -> Result<()> {
        const CLR_TYPE: &str = "\
SELECT a.name AS assembly_name, t.assembly_class
FROM {db}.sys.assembly_types t
JOIN {db}.sys.assemblies a ON a.assembly_id = t.assembly_id
WHERE t.user_type_id = @P1";

        let id = self.id()?;
        let name = self.two_part_name();
        let row = self
            .fetch_by(CLR_TYPE, id, "assembly type")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found())?;

        script.use_database(self.database_name()?);
        script.batch(&format!(
            "CREATE TYPE {}\nEXTERNAL NAME {}.{}",
            name,
            quote_name(&row.text("assembly_name")?),
            quote_name(&row.text("assembly_class")?)
        ));

        self.securable_permissions(CLASS_TYPE, id, &format!("TYPE::{}", name), script)
            .await
    }

    async fn alias_type(&self, script: &mut ScriptBuilder<'_>) -> Result<()> {
        const ALIAS_TYPE: &str = "\
SELECT bt.name AS base_type,
       CAST(t.max_length AS int) AS max_length,
       CAST(t.precision AS int) AS precision,
       CAST(t.scale AS int) AS scale,
       CAST(t.is_nullable AS bit) AS is_nullable
FROM {db}.sys.types t
JOIN {db}.sys.types bt ON bt.user_type_id = t.system_type_id
WHERE t.user_type_id = @P1";

        let id = self.id()?;
        let name = self.two_part_name();
        let row = self
            .fetch_by(ALIAS_TYPE, id, "alias type")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found())?;

        let base = format_column_type(
            &row.text("base_type")?,
            "sys",
            false,
            row.int("max_length")?,
            row.int("precision")?,
            row.int("scale")?,
        );
        let nullability = if row.flag("is_nullable")? {
            "NULL"
        } else {
            "NOT NULL"
        };

        script.use_database(self.database_name()?);
        script.batch(&format!("CREATE TYPE {} FROM {} {}", name, base, nullability));

        self.securable_permissions(CLASS_TYPE, id, &format!("TYPE::{}", name), script)
            .await
    }

    async fn table_type(&self, script: &mut ScriptBuilder<'_>) -> Result<()> {
        const TABLE_TYPE: &str = "\
SELECT CAST(tt.type_table_object_id AS int) AS table_object_id
FROM {db}.sys.table_types tt
WHERE tt.user_type_id = @P1";

        let id = self.id()?;
        let name = self.two_part_name();
        let row = self
            .fetch_by(TABLE_TYPE, id, "table type")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found())?;
        let table_object_id = row.int("table_object_id")?;

        let columns = self.columns(table_object_id).await?;
        let indexes = self.indexes(table_object_id).await?;

        let mut lines = column_lines(&columns);
        lines.extend(
            indexes
                .iter()
                .filter(|index| index.is_constraint())
                .map(|index| index.constraint_clause(false)),
        );

        script.use_database(self.database_name()?);
        script.batch(&format!("CREATE TYPE {} AS TABLE(\n{}\n)", name, lines.join(",\n")));

        self.securable_permissions(CLASS_TYPE, id, &format!("TYPE::{}", name), script)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_column_type() {
        assert_eq!(format_column_type("int", "sys", false, 4, 10, 0), "[int]");
        assert_eq!(format_column_type("nvarchar", "sys", false, 100, 0, 0), "[nvarchar](50)");
        assert_eq!(format_column_type("nvarchar", "sys", false, -1, 0, 0), "[nvarchar](max)");
        assert_eq!(format_column_type("varbinary", "sys", false, -1, 0, 0), "[varbinary](max)");
        assert_eq!(format_column_type("char", "sys", false, 3, 0, 0), "[char](3)");
        assert_eq!(format_column_type("decimal", "sys", false, 9, 18, 2), "[decimal](18, 2)");
        assert_eq!(format_column_type("datetime2", "sys", false, 8, 27, 7), "[datetime2](7)");
        assert_eq!(format_column_type("Phone", "dbo", true, 20, 0, 0), "[dbo].[Phone]");
    }

    #[test]
    fn test_column_definition() {
        let identity = ColumnDef {
            name: "OrderId".to_string(),
            data_type: "[int]".to_string(),
            identity: Some((1, 1)),
            ..ColumnDef::default()
        };
        assert_eq!(identity.definition(), "[OrderId] [int] IDENTITY(1,1) NOT NULL");

        let text = ColumnDef {
            name: "Note".to_string(),
            data_type: "[varchar](200)".to_string(),
            is_nullable: true,
            collation: Some("Latin1_General_CI_AS".to_string()),
            ..ColumnDef::default()
        };
        assert_eq!(
            text.definition(),
            "[Note] [varchar](200) COLLATE Latin1_General_CI_AS NULL"
        );

        let computed = ColumnDef {
            name: "Total".to_string(),
            computed: Some("([Qty]*[Price])".to_string()),
            is_persisted: true,
            ..ColumnDef::default()
        };
        assert_eq!(computed.definition(), "[Total] AS ([Qty]*[Price]) PERSISTED");
    }

    #[test]
    fn test_index_statements() {
        let index = IndexDef {
            name: "IX_Orders_Customer".to_string(),
            type_desc: "NONCLUSTERED".to_string(),
            keys: vec!["[CustomerId] ASC".to_string(), "[OrderDate] DESC".to_string()],
            included: vec!["[Total]".to_string()],
            filter: Some("([Total]>(0))".to_string()),
            ..IndexDef::default()
        };
        assert_eq!(
            index.create_statement("[dbo].[Orders]"),
            "CREATE NONCLUSTERED INDEX [IX_Orders_Customer] ON [dbo].[Orders]\n(\n\t[CustomerId] ASC,\n\t[OrderDate] DESC\n)\nINCLUDE([Total])\nWHERE ([Total]>(0))"
        );

        let primary_key = IndexDef {
            name: "PK_Orders".to_string(),
            type_desc: "CLUSTERED".to_string(),
            is_unique: true,
            is_primary_key: true,
            keys: vec!["[OrderId] ASC".to_string()],
            ..IndexDef::default()
        };
        assert!(primary_key.is_constraint());
        assert_eq!(
            primary_key.constraint_clause(true),
            " CONSTRAINT [PK_Orders] PRIMARY KEY CLUSTERED\n(\n\t[OrderId] ASC\n)"
        );
        assert!(primary_key.constraint_clause(false).starts_with("\tPRIMARY KEY"));
    }

    #[test]
    fn test_permission_statement() {
        assert_eq!(
            permission_statement("GRANT", "SELECT", Some("[dbo].[Orders]"), None, "reporting"),
            "GRANT SELECT ON [dbo].[Orders] TO [reporting]"
        );
        assert_eq!(
            permission_statement("DENY", "UPDATE", Some("[dbo].[Orders]"), Some("Total"), "clerk"),
            "DENY UPDATE ON [dbo].[Orders] ([Total]) TO [clerk]"
        );
        assert_eq!(
            permission_statement("GRANT_WITH_GRANT_OPTION", "VIEW SERVER STATE", None, None, "ops"),
            "GRANT VIEW SERVER STATE TO [ops] WITH GRANT OPTION"
        );
    }

    #[test]
    fn test_referential_action() {
        assert_eq!(referential_action("DELETE", "NO_ACTION"), "");
        assert_eq!(referential_action("DELETE", "CASCADE"), "\nON DELETE CASCADE");
        assert_eq!(referential_action("UPDATE", "SET_NULL"), "\nON UPDATE SET NULL");
    }

    #[test]
    fn test_external_login_statements() {
        let defaults = "DEFAULT_DATABASE=[master]";
        assert_eq!(
            external_login_statement("G", "[DOMAIN\\dba]", defaults, None).unwrap(),
            "CREATE LOGIN [DOMAIN\\dba] FROM WINDOWS WITH DEFAULT_DATABASE=[master]"
        );
        assert_eq!(
            external_login_statement("C", "[signer]", defaults, Some("CodeSigning")).unwrap(),
            "CREATE LOGIN [signer] FROM CERTIFICATE [CodeSigning]"
        );
        assert_eq!(
            external_login_statement("K", "[keyed]", defaults, Some("AppKey")).unwrap(),
            "CREATE LOGIN [keyed] FROM ASYMMETRIC KEY [AppKey]"
        );
        assert_eq!(
            external_login_statement("E", "[ops@contoso.com]", defaults, None).unwrap(),
            "CREATE LOGIN [ops@contoso.com] FROM EXTERNAL PROVIDER WITH DEFAULT_DATABASE=[master]"
        );
        assert!(external_login_statement("C", "[orphan]", defaults, None).is_none());
        assert!(external_login_statement("R", "[sysadmin]", defaults, None).is_none());
    }

    #[test]
    fn test_clr_module_statements() {
        let procedure = ClrModule {
            kind: "PC".to_string(),
            external_name: "[Utilities].[Procs].[Compress]".to_string(),
            parameters: vec!["@source [varbinary](max)".to_string(), "@size [int] OUTPUT".to_string()],
            returns: None,
        };
        assert_eq!(
            procedure.create_statement("[dbo].[usp_Compress]").unwrap(),
            "CREATE PROCEDURE [dbo].[usp_Compress]\n\t@source [varbinary](max),\n\t@size [int] OUTPUT\nAS EXTERNAL NAME [Utilities].[Procs].[Compress]"
        );

        let scalar = ClrModule {
            kind: "FS".to_string(),
            external_name: "[Utilities].[Text].[Slug]".to_string(),
            parameters: vec!["@value [nvarchar](200)".to_string()],
            returns: Some("[nvarchar](200)".to_string()),
        };
        assert_eq!(
            scalar.create_statement("[dbo].[fn_Slug]").unwrap(),
            "CREATE FUNCTION [dbo].[fn_Slug](@value [nvarchar](200))\nRETURNS [nvarchar](200)\nAS EXTERNAL NAME [Utilities].[Text].[Slug]"
        );

        let table = ClrModule {
            kind: "FT".to_string(),
            external_name: "[Utilities].[Text].[Split]".to_string(),
            parameters: vec!["@value [nvarchar](max)".to_string()],
            returns: Some("TABLE (\n\t[item] [nvarchar](max) NULL\n)".to_string()),
        };
        assert!(
            table
                .create_statement("[dbo].[fn_Split]")
                .unwrap()
                .contains("RETURNS TABLE (\n\t[item] [nvarchar](max) NULL\n)")
        );

        // A function without a known return shape cannot be scripted.
        let incomplete = ClrModule {
            returns: None,
            ..scalar.clone()
        };
        assert!(incomplete.create_statement("[dbo].[fn_Slug]").is_none());
        let aggregate = ClrModule {
            kind: "AF".to_string(),
            ..scalar
        };
        assert!(aggregate.create_statement("[dbo].[Concat]").is_none());
    }

    #[test]
    fn test_generated_password_is_redactable() {
        let password = generated_password();
        assert_eq!(password.len(), GENERATED_PASSWORD_LEN);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));

        let script = format!(
            "CREATE LOGIN [app] WITH PASSWORD={}, DEFAULT_DATABASE=[master]",
            quote_literal(&password)
        );
        let redacted = crate::security::redact_login_script(script.as_bytes());
        assert!(!String::from_utf8_lossy(&redacted).contains(&password));
    }
}
