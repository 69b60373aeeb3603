//! Generated login password replacement.
//!
//! `CREATE LOGIN` scripts for SQL-authenticated logins carry a randomly
//! generated password literal. It is replaced with a fixed sentinel so the
//! exported file neither leaks it nor changes from one run to the next.

use crate::{Result, error::ScripterError};
use regex::bytes::{NoExpand, Regex};
use std::borrow::Cow;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;
use tempfile::NamedTempFile;

/// Placeholder written in place of generated passwords.
pub const CHANGEME_PASSWORD: &str = "**CHANGEME**";

/// `WITH PASSWORD=N'<literal>', DEFAULT` where the literal may span lines
/// and contain doubled quotes.
fn password_clause() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    PATTERN.get_or_init(|| {
        Regex::new(r"WITH PASSWORD=N'(?:[^']|'')*', DEFAULT").expect("Invalid password pattern")
    })
}

/// Replaces every password clause in a script, leaving all other bytes
/// untouched. Returns `Cow::Borrowed` when nothing matched.
pub fn redact_login_script(script: &[u8]) -> Cow<'_, [u8]> {
    let replacement = format!("WITH PASSWORD=N'{}', DEFAULT", CHANGEME_PASSWORD);
    password_clause().replace_all(script, NoExpand(replacement.as_bytes()))
}

/// Rewrites a login script in place with its password literal replaced.
///
/// The new content is written to a temporary file next to the original and
/// then renamed over it, so a failure at any point leaves the original file
/// intact. Files without a password clause are not touched.
///
/// # Returns
/// `true` when the file was rewritten.
///
/// # Errors
/// Returns an I/O error if the script cannot be read or replaced.
pub fn redact_login_password(path: &Path) -> Result<bool> {
    let original = std::fs::read(path).map_err(|e| ScripterError::io("read", path, e))?;

    let redacted = match redact_login_script(&original) {
        Cow::Borrowed(_) => return Ok(false),
        Cow::Owned(bytes) => bytes,
    };

    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut staged = NamedTempFile::new_in(directory)
        .map_err(|e| ScripterError::io("create temporary file in", directory, e))?;
    staged
        .write_all(&redacted)
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|e| ScripterError::io("write temporary file for", path, e))?;
    staged
        .persist(path)
        .map_err(|e| ScripterError::io("replace", path, e.error))?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_SCRIPT: &str = "USE [master]\r\nGO\r\n\
        CREATE LOGIN [app] WITH PASSWORD=N'abc123', DEFAULT_DATABASE=[Sales], \
        DEFAULT_LANGUAGE=[us_english], CHECK_EXPIRATION=OFF, CHECK_POLICY=ON\r\nGO\r\n";

    #[test]
    fn test_redact_single_line_clause() {
        let redacted = redact_login_script(LOGIN_SCRIPT.as_bytes());
        let text = String::from_utf8(redacted.into_owned()).unwrap();

        assert!(text.contains("WITH PASSWORD=N'**CHANGEME**', DEFAULT_DATABASE=[Sales]"));
        assert!(!text.contains("abc123"));
        assert!(text.contains("DEFAULT_LANGUAGE=[us_english]"));
    }

    #[test]
    fn test_redact_only_changes_password_line() {
        let redacted = redact_login_script(LOGIN_SCRIPT.as_bytes());
        let text = String::from_utf8(redacted.into_owned()).unwrap();

        let before: Vec<&str> = LOGIN_SCRIPT.lines().collect();
        let after: Vec<&str> = text.lines().collect();
        assert_eq!(before.len(), after.len());

        let changed: Vec<usize> = (0..before.len())
            .filter(|&i| before[i] != after[i])
            .collect();
        assert_eq!(changed, vec![2]);
    }

    #[test]
    fn test_redact_multiline_literal() {
        let script = b"CREATE LOGIN [x] WITH PASSWORD=N'line1\nline2', DEFAULT_DATABASE=[master]";
        let redacted = redact_login_script(script);
        assert_eq!(
            redacted.as_ref(),
            b"CREATE LOGIN [x] WITH PASSWORD=N'**CHANGEME**', DEFAULT_DATABASE=[master]"
        );
    }

    #[test]
    fn test_redact_literal_with_escaped_quotes() {
        let script = b"WITH PASSWORD=N'it''s, DEFAULT', DEFAULT_DATABASE=[master]";
        let redacted = redact_login_script(script);
        assert_eq!(
            redacted.as_ref(),
            b"WITH PASSWORD=N'**CHANGEME**', DEFAULT_DATABASE=[master]"
        );
    }

    #[test]
    fn test_redact_no_match_is_borrowed() {
        let script = b"CREATE LOGIN [DOMAIN\\svc] FROM WINDOWS WITH DEFAULT_DATABASE=[master]";
        assert!(matches!(redact_login_script(script), Cow::Borrowed(_)));
    }

    #[test]
    fn test_redact_login_password_rewrites_file_preserving_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.sql");
        let mut content = vec![0xEF, 0xBB, 0xBF];
        content.extend_from_slice(LOGIN_SCRIPT.as_bytes());
        std::fs::write(&path, &content).unwrap();

        assert!(redact_login_password(&path).unwrap());

        let rewritten = std::fs::read(&path).unwrap();
        assert_eq!(&rewritten[..3], &[0xEF, 0xBB, 0xBF]);
        let text = String::from_utf8(rewritten[3..].to_vec()).unwrap();
        assert!(text.contains("WITH PASSWORD=N'**CHANGEME**', DEFAULT"));
        assert!(!text.contains("abc123"));

        // Only the script itself remains; the staging file was renamed away
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_redact_login_password_leaves_windows_login_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.sql");
        let content = "CREATE LOGIN [DOMAIN\\svc] FROM WINDOWS\r\n";
        std::fs::write(&path, content).unwrap();

        assert!(!redact_login_password(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn test_redact_login_password_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = redact_login_password(&dir.path().join("missing.sql"));
        assert!(matches!(result, Err(ScripterError::Io { .. })));
    }
}
