//! Static description of every exported object category.

use crate::models::{DbObject, ObjectType};

/// How one category of objects is exported.
#[derive(Debug, Clone, Copy)]
pub struct CategoryDescriptor {
    /// Objects handled by this descriptor
    pub object_type: ObjectType,
    /// Path segments below the scope root; empty for the scope root itself
    pub subdirectory: &'static [&'static str],
    /// Objects failing this predicate are enumerated but not scripted
    pub is_exportable: fn(&DbObject) -> bool,
    /// Replace generated passwords after scripting
    pub redact_passwords: bool,
    /// Leave the directory in place even when nothing was exported
    pub keep_directory: bool,
}

impl CategoryDescriptor {
    const fn new(object_type: ObjectType, subdirectory: &'static [&'static str]) -> Self {
        Self {
            object_type,
            subdirectory,
            is_exportable: always,
            redact_passwords: false,
            keep_directory: false,
        }
    }

    const fn filtered(mut self, predicate: fn(&DbObject) -> bool) -> Self {
        self.is_exportable = predicate;
        self
    }
}

fn always(_: &DbObject) -> bool {
    true
}

fn not_system(object: &DbObject) -> bool {
    !object.flags.is_system_object
}

fn user_database_role(role: &DbObject) -> bool {
    !role.flags.is_fixed_role && role.name != "public"
}

fn user_table(table: &DbObject) -> bool {
    not_system(table) && !table.name.ends_with('$')
}

fn readable_module(module: &DbObject) -> bool {
    not_system(module) && !module.flags.is_encrypted
}

/// Categories exported once per server, in order.
pub const SERVER_CATEGORIES: &[CategoryDescriptor] = &[
    CategoryDescriptor {
        redact_passwords: true,
        ..CategoryDescriptor::new(ObjectType::Login, &["Logins"])
    },
    CategoryDescriptor::new(ObjectType::SqlAgentJob, &["SQLAgent"]),
];

/// Categories exported for every database, in order.
pub const DATABASE_CATEGORIES: &[CategoryDescriptor] = &[
    CategoryDescriptor {
        keep_directory: true,
        ..CategoryDescriptor::new(ObjectType::Database, &[])
    },
    CategoryDescriptor::new(ObjectType::User, &["Users"]).filtered(not_system),
    CategoryDescriptor::new(ObjectType::Schema, &["Schemas"]).filtered(not_system),
    CategoryDescriptor::new(ObjectType::DatabaseRole, &["Roles - Database"])
        .filtered(user_database_role),
    CategoryDescriptor::new(ObjectType::ApplicationRole, &["Roles - Application"]),
    CategoryDescriptor::new(ObjectType::Table, &["Tables"]).filtered(user_table),
    CategoryDescriptor::new(ObjectType::View, &["Views"]).filtered(not_system),
    CategoryDescriptor::new(ObjectType::StoredProcedure, &["Procs"]).filtered(readable_module),
    CategoryDescriptor::new(ObjectType::Function, &["Functions"]).filtered(readable_module),
    CategoryDescriptor::new(ObjectType::Synonym, &["Synonyms"]),
    CategoryDescriptor::new(ObjectType::UserDefinedType, &["Types", "User-Defined Types"]),
    CategoryDescriptor::new(
        ObjectType::UserDefinedDataType,
        &["Types", "User-Defined Data Types"],
    ),
    CategoryDescriptor::new(
        ObjectType::UserDefinedTableType,
        &["Types", "User-Defined Table Types"],
    ),
];

/// Descriptor for an object type, if it is exported at all.
pub fn descriptor_for(object_type: ObjectType) -> Option<&'static CategoryDescriptor> {
    SERVER_CATEGORIES
        .iter()
        .chain(DATABASE_CATEGORIES)
        .find(|category| category.object_type == object_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObjectFlags;

    fn flagged(object_type: ObjectType, name: &str, flags: ObjectFlags) -> DbObject {
        DbObject::new(object_type, name).with_flags(flags)
    }

    fn exportable(object: &DbObject) -> bool {
        let descriptor = descriptor_for(object.object_type).unwrap();
        (descriptor.is_exportable)(object)
    }

    #[test]
    fn test_database_category_order() {
        let order: Vec<ObjectType> = DATABASE_CATEGORIES.iter().map(|c| c.object_type).collect();
        assert_eq!(
            order,
            vec![
                ObjectType::Database,
                ObjectType::User,
                ObjectType::Schema,
                ObjectType::DatabaseRole,
                ObjectType::ApplicationRole,
                ObjectType::Table,
                ObjectType::View,
                ObjectType::StoredProcedure,
                ObjectType::Function,
                ObjectType::Synonym,
                ObjectType::UserDefinedType,
                ObjectType::UserDefinedDataType,
                ObjectType::UserDefinedTableType,
            ]
        );
    }

    #[test]
    fn test_only_logins_are_redacted() {
        for category in SERVER_CATEGORIES.iter().chain(DATABASE_CATEGORIES) {
            assert_eq!(
                category.redact_passwords,
                category.object_type == ObjectType::Login
            );
        }
    }

    #[test]
    fn test_table_predicate() {
        let system = ObjectFlags {
            is_system_object: true,
            ..ObjectFlags::default()
        };
        assert!(exportable(&DbObject::new(ObjectType::Table, "Orders")));
        assert!(!exportable(&DbObject::new(ObjectType::Table, "Archive$")));
        assert!(!exportable(&flagged(ObjectType::Table, "sysdiagrams", system)));
    }

    #[test]
    fn test_role_predicate() {
        let fixed = ObjectFlags {
            is_fixed_role: true,
            ..ObjectFlags::default()
        };
        assert!(exportable(&DbObject::new(ObjectType::DatabaseRole, "reporting")));
        assert!(!exportable(&DbObject::new(ObjectType::DatabaseRole, "public")));
        assert!(!exportable(&flagged(ObjectType::DatabaseRole, "db_owner", fixed)));
    }

    #[test]
    fn test_module_predicate() {
        let encrypted = ObjectFlags {
            is_encrypted: true,
            ..ObjectFlags::default()
        };
        assert!(exportable(&DbObject::new(ObjectType::StoredProcedure, "usp_Load")));
        assert!(!exportable(&flagged(ObjectType::StoredProcedure, "usp_Secret", encrypted)));
        assert!(!exportable(&flagged(ObjectType::Function, "fn_Secret", encrypted)));
        assert!(exportable(&flagged(ObjectType::View, "v_Secret", encrypted)));
    }

    #[test]
    fn test_unfiltered_categories() {
        let system = ObjectFlags {
            is_system_object: true,
            is_encrypted: true,
            is_fixed_role: true,
        };
        for object_type in [
            ObjectType::Login,
            ObjectType::SqlAgentJob,
            ObjectType::ApplicationRole,
            ObjectType::Synonym,
            ObjectType::UserDefinedType,
        ] {
            assert!(exportable(&flagged(object_type, "x", system)));
        }
    }
}
