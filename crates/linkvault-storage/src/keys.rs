//! Shared key generation for storage backends.

const MAX_SEGMENT_LEN: usize = 200;

/// Make one path segment safe for every backend.
///
/// Characters outside `[A-Za-z0-9._-]` become `_`, leading dots are dropped
/// and the result is capped at 200 bytes. An empty result becomes `_`.
pub fn sanitize_segment(segment: &str) -> String {
    let mut out: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = out.trim_start_matches('.').len();
    out = out.split_off(out.len() - trimmed);

    out.truncate(MAX_SEGMENT_LEN);

    if out.is_empty() {
        "_".to_string()
    } else {
        out
    }
}

/// Build `{origin}/{content_id}/{file_name}` from sanitized segments.
pub fn media_key(origin: &str, content_id: &str, file_name: &str) -> String {
    format!(
        "{}/{}/{}",
        sanitize_segment(origin),
        sanitize_segment(content_id),
        sanitize_segment(file_name)
    )
}

/// Object file name for one media item: `{native_id}_{file_name}`.
///
/// Native ids are unique within a content; sanitized file names are not.
pub fn media_file_name(native_id: &str, file_name: &str) -> String {
    sanitize_segment(&format!("{}_{}", native_id, file_name))
}

/// Reject keys that could escape a backend's root.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains("..") && !key.starts_with('/') && !key.contains('\\')
}
