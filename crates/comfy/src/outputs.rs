//! Result extraction from terminal run payloads.
//!
//! A successful run carries an `outputs` array. The first output holds
//! either a nested `data.images[]` list (each entry with a `url`) or a
//! direct `url`. The nested list wins when both are present.

use serde::Deserialize;

/// One entry of a run's `outputs` array.
#[derive(Debug, Clone, Deserialize)]
pub struct RunOutput {
    /// Direct result URL, used when no image list is present.
    #[serde(default)]
    pub url: Option<String>,
    /// Structured output data.
    #[serde(default)]
    pub data: Option<OutputData>,
}

/// The `data` object of an output entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputData {
    /// Generated images, in production order.
    #[serde(default)]
    pub images: Vec<OutputImage>,
}

/// One generated image reference.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputImage {
    pub url: String,
}

/// Extract result image URLs from a run's outputs.
///
/// Priority: the first output's `data.images[].url` list; if that list is
/// empty or absent, the first output's direct `url`. Outputs beyond the
/// first are ignored, matching the provider contract.
pub fn extract_result_urls(outputs: &[RunOutput]) -> Vec<String> {
    let Some(first) = outputs.first() else {
        return Vec::new();
    };

    if let Some(ref data) = first.data {
        if !data.images.is_empty() {
            return data.images.iter().map(|img| img.url.clone()).collect();
        }
    }

    first.url.clone().map(|url| vec![url]).unwrap_or_default()
}
