//! Utility functions for path sanitization and log output

/// Characters that are rejected as part of a path component on Windows
#[cfg(windows)]
const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Characters that are rejected as part of a path component on Unix
#[cfg(not(windows))]
const RESERVED_CHARS: &[char] = &['/'];

/// Replacement for reserved characters
const REPLACEMENT: char = '_';

/// Number of lines shown by [`preview`] in log messages
pub const PREVIEW_LINES: usize = 5;

/// Sanitize a single path component for the current platform
///
/// - NUL, other control characters and `/` are replaced with `_`
/// - On Windows, `\ : * ? " < > |` are replaced as well and trailing dots and
///   spaces are trimmed (Windows silently drops them)
/// - An empty result, `.` or `..` becomes `_`
///
/// # Examples
///
/// ```
/// use timeline_dl::utils::sanitize_component;
///
/// let timed = sanitize_component("2023-02-01 10:32 Kauf");
/// if cfg!(windows) {
///     assert_eq!(timed, "2023-02-01 10_32 Kauf");
/// } else {
///     assert_eq!(timed, "2023-02-01 10:32 Kauf");
/// }
/// assert_eq!(sanitize_component("A/B Corp"), "A_B Corp");
/// assert_eq!(sanitize_component(""), "_");
/// ```
#[must_use]
pub fn sanitize_component(component: &str) -> String {
    let replaced: String = component
        .chars()
        .map(|c| {
            if c.is_control() || RESERVED_CHARS.contains(&c) {
                REPLACEMENT
            } else {
                c
            }
        })
        .collect();

    let trimmed = if cfg!(windows) {
        replaced.trim_end_matches(['.', ' '])
    } else {
        replaced.as_str()
    };
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        REPLACEMENT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Render the first `max_lines` lines of a pretty-printed JSON payload
///
/// Used to log unexpected subscription payloads without flooding the log.
pub fn preview(payload: &serde_json::Value, max_lines: usize) -> String {
    let pretty = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
    let mut lines = pretty.lines();
    let mut out: Vec<&str> = lines.by_ref().take(max_lines).collect();
    if lines.next().is_some() {
        out.push("...");
    }
    out.join("\n")
}
