// ABOUTME: Utility functions for identifier handling and tool discovery
// ABOUTME: Provides identifier validation/quoting and external client lookup

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use which::which;

/// Longest identifier ClickHouse accepts
const MAX_IDENTIFIER_LENGTH: usize = 255;

/// Check that the external ClickHouse client can be executed
///
/// Resolves `client_path` the way the shell would: bare names are looked up
/// in `PATH`, anything with a path separator is checked directly.
///
/// # Errors
///
/// Returns an error with installation instructions if the client cannot be found.
///
/// # Examples
///
/// ```no_run
/// # use clickhouse_transfer::utils::check_client_tool;
/// # use std::path::Path;
/// # fn example() -> anyhow::Result<()> {
/// let resolved = check_client_tool(Path::new("clickhouse"))?;
/// println!("Using {}", resolved.display());
/// # Ok(())
/// # }
/// ```
pub fn check_client_tool(client_path: &Path) -> Result<PathBuf> {
    which(client_path).with_context(|| {
        format!(
            "ClickHouse client '{}' was not found.\n\
             \n\
             Please install the ClickHouse client or pass --clickhouse-client-path:\n\
             - Linux/macOS: curl https://clickhouse.com/ | sh\n\
             - Ubuntu/Debian: sudo apt-get install clickhouse-client\n\
             - macOS: brew install --cask clickhouse",
            client_path.display()
        )
    })
}

/// Validate a database or table name before it is used in SQL or as a file name
///
/// ClickHouse accepts almost any quoted identifier, but names recovered from
/// or written to artifact files must also be safe path components:
/// - Non-empty and at most 255 bytes
/// - No control characters
/// - No path separators, and not `.` or `..`
///
/// # Examples
///
/// ```
/// # use clickhouse_transfer::utils::validate_identifier;
/// assert!(validate_identifier("events").is_ok());
/// assert!(validate_identifier("events.daily").is_ok());
/// assert!(validate_identifier("").is_err());
/// assert!(validate_identifier("../etc/passwd").is_err());
/// ```
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.trim().is_empty() {
        bail!("Identifier cannot be empty or whitespace-only");
    }

    if identifier.len() > MAX_IDENTIFIER_LENGTH {
        bail!(
            "Identifier '{}' exceeds maximum length of {} bytes (got {})",
            sanitize_identifier(identifier),
            MAX_IDENTIFIER_LENGTH,
            identifier.len()
        );
    }

    if identifier == "." || identifier == ".." {
        bail!("Identifier '{}' is not a valid name", identifier);
    }

    for (i, c) in identifier.chars().enumerate() {
        if c.is_control() {
            bail!(
                "Identifier '{}' contains control character \\x{:02x} at position {}",
                sanitize_identifier(identifier),
                c as u32,
                i
            );
        }
        if c == '/' || c == '\\' {
            bail!(
                "Identifier '{}' contains path separator '{}' at position {}",
                sanitize_identifier(identifier),
                c,
                i
            );
        }
    }

    Ok(())
}

/// Sanitize an identifier for display in logs and error messages
///
/// Removes control characters and limits length to 100 characters.
///
/// ```
/// # use clickhouse_transfer::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("table\nname"), "tablename");
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Quote an identifier with backticks, escaping embedded backticks and backslashes
///
/// ```
/// # use clickhouse_transfer::utils::quote_identifier;
/// assert_eq!(quote_identifier("events"), "`events`");
/// assert_eq!(quote_identifier("odd`name"), "`odd\\`name`");
/// ```
pub fn quote_identifier(identifier: &str) -> String {
    let escaped = identifier.replace('\\', "\\\\").replace('`', "\\`");
    format!("`{}`", escaped)
}

/// `<db>.<table>` with both parts quoted
pub fn qualified_table(database: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(database), quote_identifier(table))
}

/// Escape `?` so statement text passes through the `clickhouse` crate's
/// placeholder substitution unchanged
pub fn escape_placeholders(statement: &str) -> String {
    statement.replace('?', "??")
}
