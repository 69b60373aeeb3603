//! File and directory name sanitization.
//!
//! The same character set is stripped on every platform so an export made
//! on Linux is byte-for-byte the tree a Windows run would produce.

/// Extension appended to every script file.
pub const SCRIPT_EXTENSION: &str = ".sql";

/// Characters that may not appear in a file or path component.
fn is_illegal(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{1F}' | '"' | '<' | '>' | '|' | ':' | '*' | '?' | '\\' | '/'
    )
}

/// Strips illegal characters from a name used as a directory.
pub fn path_component(name: &str) -> String {
    name.chars().filter(|c| !is_illegal(*c)).collect()
}

/// Strips illegal characters and appends [`SCRIPT_EXTENSION`].
///
/// A name made only of illegal characters becomes `".sql"`.
///
/// # Example
/// ```rust
/// use sqlscripter_core::export::script_file_name;
///
/// assert_eq!(script_file_name("Orders"), "Orders.sql");
/// assert_eq!(script_file_name("DOMAIN\\svc"), "DOMAINsvc.sql");
/// assert_eq!(script_file_name("<>"), ".sql");
/// ```
pub fn script_file_name(name: &str) -> String {
    let mut file_name = path_component(name);
    file_name.push_str(SCRIPT_EXTENSION);
    file_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_login_with_domain() {
        assert_eq!(script_file_name("CORP\\svc_backup"), "CORPsvc_backup.sql");
    }

    #[test]
    fn test_control_characters_removed() {
        assert_eq!(script_file_name("tab\there\r\n"), "tabhere.sql");
    }

    #[test]
    fn test_spaces_and_dollar_kept() {
        assert_eq!(script_file_name("Order Details$"), "Order Details$.sql");
        assert_eq!(path_component("Roles - Database"), "Roles - Database");
    }

    #[test]
    fn test_all_illegal_yields_bare_extension() {
        assert_eq!(script_file_name("\\/:*?\"<>|"), ".sql");
        assert_eq!(script_file_name(""), ".sql");
    }

    fn illegal_char() -> impl Strategy<Value = char> {
        prop_oneof![
            (0u32..0x20).prop_map(|c| char::from_u32(c).unwrap_or('\0')),
            prop::sample::select(vec!['"', '<', '>', '|', ':', '*', '?', '\\', '/']),
        ]
    }

    proptest! {
        #[test]
        fn prop_only_illegal_chars_give_extension(chars in prop::collection::vec(illegal_char(), 0..32)) {
            let name: String = chars.into_iter().collect();
            prop_assert_eq!(script_file_name(&name), SCRIPT_EXTENSION);
        }

        #[test]
        fn prop_clean_names_pass_through(name in "[A-Za-z0-9 _.$#@-]{1,64}") {
            prop_assert_eq!(script_file_name(&name), format!("{}.sql", name));
        }

        #[test]
        fn prop_output_never_contains_illegal_chars(name in any::<String>()) {
            let sanitized = script_file_name(&name);
            prop_assert!(sanitized.ends_with(SCRIPT_EXTENSION));
            prop_assert!(!sanitized.chars().any(is_illegal));
        }
    }
}
