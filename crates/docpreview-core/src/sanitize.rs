//! Filename sanitizing.
//!
//! Job payloads carry externally supplied filenames which may contain path
//! separators or traversal sequences. Everything that touches the local
//! filesystem goes through `sanitize_file_name` first.

/// Returns only the base name component of an externally supplied filename.
///
/// Directory segments (both `/` and `\` separated) and traversal components
/// (`.`, `..`) are stripped. Absent or empty input yields the fallback, so the
/// result is always safe to join onto a local directory path.
pub fn sanitize_file_name(name: Option<&str>, fallback: &str) -> String {
    let base = name
        .unwrap_or("")
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();

    if base.is_empty() || base == "." || base == ".." {
        fallback.to_string()
    } else {
        base.to_string()
    }
}
