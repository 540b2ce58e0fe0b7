//! Object-name generation for uploads.
//!
//! Names are namespaced with a timestamp plus a short random token so that
//! concurrent uploads within one submission can never collide. Batch items
//! optionally use a sequential-rename convention driven by a brand-like
//! form field.

use rand::distr::Alphanumeric;
use rand::Rng;

/// Length of the random disambiguator token.
const TOKEN_LEN: usize = 6;

/// Zero-padding width of the sequential-rename counter.
const SEQUENCE_PAD: usize = 3;

/// Generate a short lowercase alphanumeric token.
pub fn random_token() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

/// Replace every character other than ASCII alphanumerics and `.` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect()
}

/// Object name for a static (shared, non-batch) image upload.
///
/// Convention: `static_{timestamp_ms}_{token}_{sanitized_original}`.
pub fn static_object_name(timestamp_ms: i64, token: &str, original: &str) -> String {
    format!("static_{timestamp_ms}_{token}_{}", sanitize_filename(original))
}

/// Default object name for one batch item upload.
///
/// Convention: `{timestamp_ms}_{token}_{sanitized_original}`.
pub fn batch_object_name(timestamp_ms: i64, token: &str, original: &str) -> String {
    format!("{timestamp_ms}_{token}_{}", sanitize_filename(original))
}

/// Sequential-rename object name for one batch item upload.
///
/// Convention: `{brand}_{NNN}_{token}.{ext}` where `NNN` is the zero-padded
/// 1-based item sequence and spaces in the brand value become underscores.
pub fn sequential_object_name(brand: &str, index: usize, token: &str, ext: &str) -> String {
    let brand = brand.split_whitespace().collect::<Vec<_>>().join("_");
    let seq = format!("{:0width$}", index + 1, width = SEQUENCE_PAD);
    format!("{brand}_{seq}_{token}.{ext}")
}

/// Extension of a filename, defaulting to `png` when absent.
pub fn file_extension(name: &str) -> &str {
    name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("png")
}

/// Find a brand-like value among form fields for sequential renaming.
///
/// Matches the first field whose name contains `brand` or `marca`
/// (case-insensitive) and holds a non-empty string.
pub fn detect_brand_value<'a>(
    form_values: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Option<&'a str> {
    form_values
        .into_iter()
        .find(|(name, value)| {
            let name = name.to_lowercase();
            (name.contains("brand") || name.contains("marca")) && !value.is_empty()
        })
        .map(|(_, value)| value)
}
