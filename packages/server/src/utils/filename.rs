use uuid::Uuid;

/// Longest sanitized name kept in a storage name.
const MAX_NAME_CHARS: usize = 200;

/// Reduce an uploaded filename to a safe, flat ASCII name.
///
/// Path components are dropped, whitespace becomes `_`, and anything outside
/// `[A-Za-z0-9._-]` is removed. Leading and trailing dots and underscores are
/// stripped so the result can never be hidden or be `..`. Returns `None` when
/// nothing usable is left.
pub fn secure_filename(filename: &str) -> Option<String> {
    let flat = filename.replace(['/', '\\'], " ");
    let joined = flat.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        return None;
    }

    // Keep the extension when shortening.
    if trimmed.len() > MAX_NAME_CHARS {
        let ext = trimmed
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| ext.len() < 16)
            .unwrap_or("");
        let keep = MAX_NAME_CHARS - ext.len() - usize::from(!ext.is_empty());
        let mut short = trimmed[..keep].to_string();
        if !ext.is_empty() {
            short.push('.');
            short.push_str(ext);
        }
        return Some(short);
    }

    Some(trimmed.to_string())
}

/// Generate a collision-resistant storage name: `{32 hex}_{sanitized original}`.
pub fn storage_name(original: &str) -> String {
    let prefix = Uuid::new_v4().simple().to_string();
    match secure_filename(original) {
        Some(name) => format!("{prefix}_{name}"),
        None => prefix,
    }
}

/// Build a safe `Content-Disposition` header value.
///
/// `disposition` is `inline` or `attachment`.
pub fn content_disposition_value(disposition: &str, filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_safe = ascii_safe.trim();
    let ascii_name = if ascii_safe.is_empty() {
        "download"
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("{disposition}; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
