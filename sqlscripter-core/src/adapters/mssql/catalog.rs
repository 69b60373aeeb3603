//! Catalog enumeration.
//!
//! Every query returns the same six columns so one row mapper serves all
//! categories: `name`, `schema_name`, `object_id`, `is_system_object`,
//! `is_encrypted`, `is_fixed_role`. Database-scoped queries use three-part
//! names (`[db].sys.tables`) so the session never changes database.

use super::RowExt;
use crate::adapters::quote_name;
use crate::models::{DbObject, ObjectFlags, ObjectScope, ObjectType};
use crate::{Result, error::ScripterError};
use tiberius::Row;

/// Every login: SQL, Windows user and group, certificate, asymmetric key
/// and external provider principals.
const LOGINS: &str = "\
SELECT p.name,
       CAST(NULL AS sysname) AS schema_name,
       CAST(p.principal_id AS int) AS object_id,
       CAST(0 AS bit) AS is_system_object,
       CAST(0 AS bit) AS is_encrypted,
       CAST(0 AS bit) AS is_fixed_role
FROM sys.server_principals p
WHERE p.type IN ('S', 'U', 'G', 'C', 'K', 'E', 'X')
ORDER BY p.name";

const AGENT_JOBS: &str = "\
SELECT j.name,
       CAST(NULL AS sysname) AS schema_name,
       CAST(NULL AS int) AS object_id,
       CAST(0 AS bit) AS is_system_object,
       CAST(0 AS bit) AS is_encrypted,
       CAST(0 AS bit) AS is_fixed_role
FROM msdb.dbo.sysjobs j
ORDER BY j.name";

/// Enumeration query for one category; `{db}` is replaced with the quoted
/// database name.
fn database_template(object_type: ObjectType) -> Option<&'static str> {
    let sql = match object_type {
        ObjectType::User => {
            "\
SELECT dp.name,
       CAST(NULL AS sysname) AS schema_name,
       CAST(dp.principal_id AS int) AS object_id,
       CAST(CASE WHEN dp.principal_id < 5 OR dp.name LIKE '##%' THEN 1 ELSE 0 END AS bit) AS is_system_object,
       CAST(0 AS bit) AS is_encrypted,
       CAST(0 AS bit) AS is_fixed_role
FROM {db}.sys.database_principals dp
WHERE dp.type IN ('S', 'U', 'G', 'C', 'K', 'E', 'X')
ORDER BY dp.name"
        }
        ObjectType::Schema => {
            "\
SELECT s.name,
       CAST(NULL AS sysname) AS schema_name,
       CAST(s.schema_id AS int) AS object_id,
       CAST(CASE WHEN s.schema_id < 5 OR s.schema_id BETWEEN 16384 AND 16399 THEN 1 ELSE 0 END AS bit) AS is_system_object,
       CAST(0 AS bit) AS is_encrypted,
       CAST(0 AS bit) AS is_fixed_role
FROM {db}.sys.schemas s
ORDER BY s.name"
        }
        ObjectType::DatabaseRole => {
            "\
SELECT dp.name,
       CAST(NULL AS sysname) AS schema_name,
       CAST(dp.principal_id AS int) AS object_id,
       CAST(0 AS bit) AS is_system_object,
       CAST(0 AS bit) AS is_encrypted,
       CAST(dp.is_fixed_role AS bit) AS is_fixed_role
FROM {db}.sys.database_principals dp
WHERE dp.type = 'R'
ORDER BY dp.name"
        }
        ObjectType::ApplicationRole => {
            "\
SELECT dp.name,
       CAST(NULL AS sysname) AS schema_name,
       CAST(dp.principal_id AS int) AS object_id,
       CAST(0 AS bit) AS is_system_object,
       CAST(0 AS bit) AS is_encrypted,
       CAST(0 AS bit) AS is_fixed_role
FROM {db}.sys.database_principals dp
WHERE dp.type = 'A'
ORDER BY dp.name"
        }
        ObjectType::Table => {
            "\
SELECT t.name,
       s.name AS schema_name,
       CAST(t.object_id AS int) AS object_id,
       CAST(CASE WHEN t.is_ms_shipped = 1 OR EXISTS (
                SELECT 1 FROM {db}.sys.extended_properties ep
                WHERE ep.class = 1 AND ep.major_id = t.object_id AND ep.minor_id = 0
                  AND ep.name = N'microsoft_database_tools_support')
            THEN 1 ELSE 0 END AS bit) AS is_system_object,
       CAST(0 AS bit) AS is_encrypted,
       CAST(0 AS bit) AS is_fixed_role
FROM {db}.sys.tables t
JOIN {db}.sys.schemas s ON s.schema_id = t.schema_id
ORDER BY t.name, s.name"
        }
        ObjectType::View => {
            "\
SELECT v.name,
       s.name AS schema_name,
       CAST(v.object_id AS int) AS object_id,
       CAST(v.is_ms_shipped AS bit) AS is_system_object,
       CAST(CASE WHEN m.definition IS NULL THEN 1 ELSE 0 END AS bit) AS is_encrypted,
       CAST(0 AS bit) AS is_fixed_role
FROM {db}.sys.views v
JOIN {db}.sys.schemas s ON s.schema_id = v.schema_id
LEFT JOIN {db}.sys.sql_modules m ON m.object_id = v.object_id
ORDER BY v.name, s.name"
        }
        ObjectType::StoredProcedure => {
            "\
SELECT o.name,
       s.name AS schema_name,
       CAST(o.object_id AS int) AS object_id,
       CAST(o.is_ms_shipped AS bit) AS is_system_object,
       CAST(CASE WHEN m.object_id IS NOT NULL AND m.definition IS NULL THEN 1 ELSE 0 END AS bit) AS is_encrypted,
       CAST(0 AS bit) AS is_fixed_role
FROM {db}.sys.objects o
JOIN {db}.sys.schemas s ON s.schema_id = o.schema_id
LEFT JOIN {db}.sys.sql_modules m ON m.object_id = o.object_id
WHERE o.type IN ('P', 'PC')
ORDER BY o.name, s.name"
        }
        ObjectType::Function => {
            "\
SELECT o.name,
       s.name AS schema_name,
       CAST(o.object_id AS int) AS object_id,
       CAST(o.is_ms_shipped AS bit) AS is_system_object,
       CAST(CASE WHEN m.object_id IS NOT NULL AND m.definition IS NULL THEN 1 ELSE 0 END AS bit) AS is_encrypted,
       CAST(0 AS bit) AS is_fixed_role
FROM {db}.sys.objects o
JOIN {db}.sys.schemas s ON s.schema_id = o.schema_id
LEFT JOIN {db}.sys.sql_modules m ON m.object_id = o.object_id
WHERE o.type IN ('FN', 'IF', 'TF', 'FS', 'FT')
ORDER BY o.name, s.name"
        }
        ObjectType::Synonym => {
            "\
SELECT sn.name,
       s.name AS schema_name,
       CAST(sn.object_id AS int) AS object_id,
       CAST(sn.is_ms_shipped AS bit) AS is_system_object,
       CAST(0 AS bit) AS is_encrypted,
       CAST(0 AS bit) AS is_fixed_role
FROM {db}.sys.synonyms sn
JOIN {db}.sys.schemas s ON s.schema_id = sn.schema_id
ORDER BY sn.name, s.name"
        }
        ObjectType::UserDefinedType => {
            "\
SELECT t.name,
       s.name AS schema_name,
       CAST(t.user_type_id AS int) AS object_id,
       CAST(0 AS bit) AS is_system_object,
       CAST(0 AS bit) AS is_encrypted,
       CAST(0 AS bit) AS is_fixed_role
FROM {db}.sys.assembly_types t
JOIN {db}.sys.schemas s ON s.schema_id = t.schema_id
WHERE t.is_user_defined = 1
ORDER BY t.name, s.name"
        }
        ObjectType::UserDefinedDataType => {
            "\
SELECT t.name,
       s.name AS schema_name,
       CAST(t.user_type_id AS int) AS object_id,
       CAST(0 AS bit) AS is_system_object,
       CAST(0 AS bit) AS is_encrypted,
       CAST(0 AS bit) AS is_fixed_role
FROM {db}.sys.types t
JOIN {db}.sys.schemas s ON s.schema_id = t.schema_id
WHERE t.is_user_defined = 1 AND t.is_assembly_type = 0 AND t.is_table_type = 0
ORDER BY t.name, s.name"
        }
        ObjectType::UserDefinedTableType => {
            "\
SELECT t.name,
       s.name AS schema_name,
       CAST(t.user_type_id AS int) AS object_id,
       CAST(0 AS bit) AS is_system_object,
       CAST(0 AS bit) AS is_encrypted,
       CAST(0 AS bit) AS is_fixed_role
FROM {db}.sys.table_types t
JOIN {db}.sys.schemas s ON s.schema_id = t.schema_id
WHERE t.is_user_defined = 1
ORDER BY t.name, s.name"
        }
        ObjectType::Database | ObjectType::Login | ObjectType::SqlAgentJob => return None,
    };
    Some(sql)
}

/// SQL text enumerating `object_type` in `scope`.
///
/// # Errors
/// Returns a configuration error when the category does not belong to the
/// scope (for example logins inside a database).
pub(super) fn enumeration_sql(scope: &ObjectScope, object_type: ObjectType) -> Result<String> {
    let sql = match (scope, object_type) {
        (ObjectScope::Server, ObjectType::Login) => Some(LOGINS.to_string()),
        (ObjectScope::Server, ObjectType::SqlAgentJob) => Some(AGENT_JOBS.to_string()),
        (ObjectScope::Database(database), _) => database_template(object_type)
            .map(|template| template.replace("{db}", &quote_name(database))),
        (ObjectScope::Server, _) => None,
    };

    sql.ok_or_else(|| {
        ScripterError::configuration(format!(
            "{} objects cannot be enumerated at {} scope",
            object_type, scope
        ))
    })
}

/// Maps one enumeration row to a [`DbObject`].
pub(super) fn object_from_row(
    row: &Row,
    object_type: ObjectType,
    scope: &ObjectScope,
) -> Result<DbObject> {
    let mut object = DbObject::new(object_type, row.text("name")?).with_flags(ObjectFlags {
        is_system_object: row.flag("is_system_object")?,
        is_encrypted: row.flag("is_encrypted")?,
        is_fixed_role: row.flag("is_fixed_role")?,
    });

    if let Some(schema) = row.optional_text("schema_name")? {
        object = object.with_schema(schema);
    }
    if let Some(id) = row.get_field::<i32>("object_id")? {
        object = object.with_id(id);
    }
    if let Some(database) = scope.database() {
        object = object.in_database(database);
    }

    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_scope_queries() {
        let logins = enumeration_sql(&ObjectScope::Server, ObjectType::Login).unwrap();
        assert!(logins.contains("sys.server_principals"));
        assert!(logins.ends_with("ORDER BY p.name"));

        let jobs = enumeration_sql(&ObjectScope::Server, ObjectType::SqlAgentJob).unwrap();
        assert!(jobs.contains("msdb.dbo.sysjobs"));
    }

    #[test]
    fn test_database_scope_uses_quoted_three_part_names() {
        let scope = ObjectScope::Database("Sales]DB".to_string());
        let sql = enumeration_sql(&scope, ObjectType::Table).unwrap();
        assert!(sql.contains("FROM [Sales]]DB].sys.tables t"));
        assert!(!sql.contains("{db}"));
    }

    #[test]
    fn test_every_database_category_has_uniform_columns() {
        let scope = ObjectScope::Database("Sales".to_string());
        for category in crate::export::DATABASE_CATEGORIES {
            if category.object_type == ObjectType::Database {
                continue;
            }
            let sql = enumeration_sql(&scope, category.object_type).unwrap();
            for column in [
                "schema_name",
                "object_id",
                "is_system_object",
                "is_encrypted",
                "is_fixed_role",
            ] {
                assert!(
                    sql.contains(&format!("AS {}", column)),
                    "{} query lacks {}",
                    category.object_type,
                    column
                );
            }
            assert!(sql.contains("ORDER BY"));
        }
    }

    #[test]
    fn test_every_login_and_module_kind_enumerated() {
        let logins = enumeration_sql(&ObjectScope::Server, ObjectType::Login).unwrap();
        assert!(logins.contains("p.type IN ('S', 'U', 'G', 'C', 'K', 'E', 'X')"));

        let scope = ObjectScope::Database("Sales".to_string());
        let procs = enumeration_sql(&scope, ObjectType::StoredProcedure).unwrap();
        assert!(procs.contains("o.type IN ('P', 'PC')"));
        let functions = enumeration_sql(&scope, ObjectType::Function).unwrap();
        assert!(functions.contains("o.type IN ('FN', 'IF', 'TF', 'FS', 'FT')"));

        // CLR modules have no sql_modules row and must not read as encrypted.
        for sql in [&procs, &functions] {
            assert!(sql.contains("WHEN m.object_id IS NOT NULL AND m.definition IS NULL"));
        }
    }

    #[test]
    fn test_scope_mismatch_rejected() {
        assert!(enumeration_sql(&ObjectScope::Server, ObjectType::Table).is_err());
        let scope = ObjectScope::Database("Sales".to_string());
        assert!(enumeration_sql(&scope, ObjectType::Login).is_err());
        assert!(enumeration_sql(&scope, ObjectType::Database).is_err());
    }
}
