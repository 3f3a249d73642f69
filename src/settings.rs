//! Project settings for extraction and localization.

use serde::{Deserialize, Serialize};

/// Settings shared by the extraction and localization passes.
///
/// Deserializable from a project settings file; every field has a
/// sensible default so a missing file means default behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Project name used in translation store keys
    pub project: String,
    /// Locale the source documents are written in
    pub source_locale: String,
    /// Locale that receives pseudo-localized output, when configured
    pub pseudo_locale: Option<String>,
    /// Extract bare URLs as translatable resources
    pub localize_links: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            project: "default".to_string(),
            source_locale: "en-US".to_string(),
            pseudo_locale: None,
            localize_links: false,
        }
    }
}
