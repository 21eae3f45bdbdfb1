//! File names for merged YouTube output.

const MAX_BASE_CHARS: usize = 196;
const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "webm", "mkv", "m4a", "m4v", "mov", "avi", "flv", "3gp", "wmv", "mpg", "mpeg", "ts",
];

/// Build a safe `.mp4` file name from a video title.
///
/// Characters illegal on common file systems become `_`, a trailing media
/// extension is replaced by `.mp4` and long titles are truncated so the whole
/// name stays within 200 characters.
pub fn sanitize_file_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim();
    let base = match trimmed.rsplit_once('.') {
        Some((stem, ext)) if MEDIA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => stem,
        _ => trimmed,
    };
    let base = base.trim().trim_end_matches('.');

    let base: String = if base.is_empty() {
        "video".to_string()
    } else {
        base.chars().take(MAX_BASE_CHARS).collect()
    };

    format!("{}.mp4", base)
}
