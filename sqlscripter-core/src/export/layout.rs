//! Output directory layout.
//!
//! ```text
//! <root>/<server>/Logins
//! <root>/<server>/SQLAgent
//! <root>/<server>/Databases/<db>/<category...>
//! ```

use super::category::CategoryDescriptor;
use super::sanitize::path_component;
use crate::models::ObjectScope;
use std::path::{Path, PathBuf};

/// Sanitized directory name; names that would resolve to `.`, `..` or
/// nothing have their dots replaced so they stay inside the tree.
fn directory_name(name: &str) -> String {
    let component = path_component(name);
    if component.chars().all(|c| c == '.') {
        "_".repeat(component.len().max(1))
    } else {
        component
    }
}

/// Resolves scope and category directories below one server root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    server_root: PathBuf,
}

impl OutputLayout {
    /// `server` is split on `\` so `HOST\INSTANCE` becomes nested directories.
    pub fn new(output_root: &Path, server: &str) -> Self {
        let server_root = server
            .split('\\')
            .fold(output_root.to_path_buf(), |path, segment| {
                path.join(directory_name(segment))
            });
        Self { server_root }
    }

    /// `<output>/<server>`; nested for named instances.
    pub fn server_root(&self) -> &Path {
        &self.server_root
    }

    /// `Databases/<db>` below the server root.
    pub fn database_dir(&self, database: &str) -> PathBuf {
        self.server_root
            .join("Databases")
            .join(directory_name(database))
    }

    /// Root directory of a scope.
    pub fn scope_root(&self, scope: &ObjectScope) -> PathBuf {
        match scope {
            ObjectScope::Server => self.server_root.clone(),
            ObjectScope::Database(database) => self.database_dir(database),
        }
    }

    /// Directory receiving one category's scripts.
    pub fn category_dir(&self, scope: &ObjectScope, category: &CategoryDescriptor) -> PathBuf {
        category
            .subdirectory
            .iter()
            .fold(self.scope_root(scope), |path, segment| path.join(segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::category::{DATABASE_CATEGORIES, SERVER_CATEGORIES};

    #[test]
    fn test_server_categories() {
        let layout = OutputLayout::new(Path::new("out"), "SQL01");
        assert_eq!(
            layout.category_dir(&ObjectScope::Server, &SERVER_CATEGORIES[0]),
            Path::new("out/SQL01/Logins")
        );
        assert_eq!(
            layout.category_dir(&ObjectScope::Server, &SERVER_CATEGORIES[1]),
            Path::new("out/SQL01/SQLAgent")
        );
    }

    #[test]
    fn test_named_instance_nests() {
        let layout = OutputLayout::new(Path::new("out"), "SQL01\\REPORTING");
        assert_eq!(layout.server_root(), Path::new("out/SQL01/REPORTING"));
    }

    #[test]
    fn test_database_categories() {
        let layout = OutputLayout::new(Path::new("out"), "SQL01");
        let scope = ObjectScope::Database("Sales".to_string());

        assert_eq!(
            layout.category_dir(&scope, &DATABASE_CATEGORIES[0]),
            Path::new("out/SQL01/Databases/Sales")
        );
        let table_types = DATABASE_CATEGORIES.last().unwrap();
        assert_eq!(
            layout.category_dir(&scope, table_types),
            Path::new("out/SQL01/Databases/Sales/Types/User-Defined Table Types")
        );
    }

    #[test]
    fn test_hostile_names_stay_inside_tree() {
        let layout = OutputLayout::new(Path::new("out"), ".");
        assert_eq!(layout.server_root(), Path::new("out/_"));
        assert_eq!(layout.database_dir(".."), Path::new("out/_/Databases/__"));
        assert_eq!(layout.database_dir("a/b:c"), Path::new("out/_/Databases/abc"));
    }
}
