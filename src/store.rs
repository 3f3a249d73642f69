//! Translation store and pseudo-localization collaborators.
//!
//! The localization walker only ever performs read-only lookups keyed
//! by (project, locale, key, data type). The trait keeps the library
//! decoupled from any particular backend; [`MemoryStore`] is the
//! in-memory implementation used by the CLI and the tests.

use std::collections::HashMap;

/// Compute the store key for one translation unit.
pub fn hash_key(project: &str, locale: &str, key: &str, data_type: &str) -> String {
    format!("{}_{}_{}_{}", project, locale, key, data_type)
}

/// Read-only lookup of translated placeholder-strings.
pub trait TranslationStore {
    /// Returns the target-language placeholder-string, or None when no
    /// translation exists (resolved by the caller's miss policy).
    fn get_translation(
        &self,
        project: &str,
        locale: &str,
        key: &str,
        data_type: &str,
    ) -> Option<String>;
}

/// In-memory translation store keyed by [`hash_key`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn add_translation(
        &mut self,
        project: &str,
        locale: &str,
        key: &str,
        data_type: &str,
        target: &str,
    ) -> &mut Self {
        self.entries
            .insert(hash_key(project, locale, key, data_type), target.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TranslationStore for MemoryStore {
    fn get_translation(
        &self,
        project: &str,
        locale: &str,
        key: &str,
        data_type: &str,
    ) -> Option<String> {
        self.entries
            .get(&hash_key(project, locale, key, data_type))
            .cloned()
    }
}

/// Pseudo-localization transform applied when a locale has no real
/// translation yet.
pub trait PseudoTranslator {
    /// Transform one source placeholder-string. Placeholder tags must
    /// pass through unmodified.
    fn get_string(&self, source: &str) -> String;

    /// Locale whose existing translations seed the transform, when the
    /// pseudo engine is chained off a non-default base locale.
    fn pseudo_source_locale(&self) -> &str;
}

/// Deterministic accenting pseudo-localizer.
///
/// Maps ASCII letters to accented forms so untranslated strings are
/// visually obvious while staying readable. Everything inside `<...>`
/// is left untouched so placeholder tags survive the transform.
#[derive(Debug, Clone)]
pub struct AccentedPseudo {
    source_locale: String,
}

impl AccentedPseudo {
    pub fn new(source_locale: &str) -> Self {
        AccentedPseudo {
            source_locale: source_locale.to_string(),
        }
    }
}

impl PseudoTranslator for AccentedPseudo {
    fn get_string(&self, source: &str) -> String {
        let mut result = String::with_capacity(source.len());
        let mut in_tag = false;
        for c in source.chars() {
            match c {
                '<' => {
                    in_tag = true;
                    result.push(c);
                }
                '>' => {
                    in_tag = false;
                    result.push(c);
                }
                _ if in_tag => result.push(c),
                _ => result.push(accent(c)),
            }
        }
        result
    }

    fn pseudo_source_locale(&self) -> &str {
        &self.source_locale
    }
}

fn accent(c: char) -> char {
    match c {
        'a' => 'à',
        'e' => 'è',
        'i' => 'î',
        'o' => 'ò',
        'u' => 'ù',
        'y' => 'ý',
        'c' => 'ç',
        'n' => 'ñ',
        's' => 'š',
        'z' => 'ž',
        'A' => 'À',
        'E' => 'È',
        'I' => 'Î',
        'O' => 'Ò',
        'U' => 'Ù',
        'Y' => 'Ý',
        'C' => 'Ç',
        'N' => 'Ñ',
        'S' => 'Š',
        'Z' => 'Ž',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_key_format() {
        assert_eq!(
            hash_key("web", "fr-FR", "id1", "mrkdwn"),
            "web_fr-FR_id1_mrkdwn"
        );
    }

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        store.add_translation("web", "fr-FR", "id1", "mrkdwn", "Ceci est un <c0>essai</c0>");
        assert_eq!(
            store.get_translation("web", "fr-FR", "id1", "mrkdwn").as_deref(),
            Some("Ceci est un <c0>essai</c0>")
        );
        assert_eq!(store.get_translation("web", "de-DE", "id1", "mrkdwn"), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_pseudo_accents_letters() {
        let pseudo = AccentedPseudo::new("en-US");
        assert_eq!(pseudo.get_string("casa"), "çàšà");
    }

    #[test]
    fn test_pseudo_preserves_placeholder_tags() {
        let pseudo = AccentedPseudo::new("en-US");
        assert_eq!(
            pseudo.get_string("This is a <c0>test</c0>."),
            "Thîš îš à <c0>tèšt</c0>."
        );
    }

    #[test]
    fn test_pseudo_source_locale() {
        let pseudo = AccentedPseudo::new("de-DE");
        assert_eq!(pseudo.pseudo_source_locale(), "de-DE");
    }
}
