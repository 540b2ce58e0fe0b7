//! Encoding of generation results in the `result_image_url` column.
//!
//! A job that produces exactly one image stores the bare URL string. A job
//! that produces two or more stores a JSON-serialized array of URLs. The
//! decoder distinguishes the two by the leading `[`. The asymmetry is
//! load-bearing: existing rows and the gallery both rely on it.

/// Encode a list of result URLs for storage.
///
/// - empty list → empty string
/// - exactly one URL → the bare string
/// - two or more → JSON array string, order preserved
pub fn encode_result_urls(urls: &[String]) -> String {
    match urls {
        [] => String::new(),
        [single] => single.clone(),
        many => serde_json::to_string(many).unwrap_or_default(),
    }
}

/// Decode a stored `result_image_url` value into display URLs.
///
/// A value starting with `[` is parsed as a JSON array of strings; anything
/// else (including a value that merely fails to parse) is treated as a
/// single URL. Empty values decode to an empty list.
pub fn decode_result_urls(stored: &str) -> Vec<String> {
    if stored.is_empty() {
        return Vec::new();
    }
    if stored.starts_with('[') {
        if let Ok(urls) = serde_json::from_str::<Vec<String>>(stored) {
            return urls;
        }
    }
    vec![stored.to_string()]
}
