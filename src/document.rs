//! Document-level parsing and assembly.
//!
//! A document is a JSON object whose string values carry mrkdwn markup.
//! Parsing walks every string value once, producing an immutable
//! segment list per property plus the flat resource list for the whole
//! document. Localization never re-parses: for each target locale the
//! segment lists are replayed, literals verbatim and runs through the
//! [`Localizer`], and the result is written back into a clone of the
//! JSON value.
//!
//! Authors are allowed `//` and `/* */` comments and trailing commas in
//! the source JSON; both are stripped before the strict JSON parse.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

use crate::error::{MismatchWarning, MrkdwnError, MrkdwnResult};
use crate::extract::{Resource, Segment, extract_value};
use crate::localize::Localizer;
use crate::parser::Parser;
use crate::settings::Settings;
use crate::store::{PseudoTranslator, TranslationStore};

/// A parsed source document, ready to be localized into any number of
/// target locales.
#[derive(Debug, Clone)]
pub struct MrkdwnDocument {
    value: Value,
    segments: HashMap<String, Vec<Segment>>,
    resources: Vec<Resource>,
    settings: Settings,
}

/// The assembled output for one target locale.
#[derive(Debug, Clone)]
pub struct LocalizedDocument {
    /// Serialized JSON text, 4-space indented
    pub text: String,
    pub locale: String,
    /// False when any run fell back to source or pseudo text
    pub fully_translated: bool,
    /// Resources that had no translation and must be sent out
    pub new_resources: Vec<Resource>,
    /// Placeholder mismatches absorbed during reconstruction
    pub warnings: Vec<MismatchWarning>,
}

impl MrkdwnDocument {
    /// Parse a source document and extract its translatable resources.
    ///
    /// Extraction order follows the object's property order, so resource
    /// indices are stable across runs.
    pub fn parse(text: &str, settings: Settings) -> MrkdwnResult<MrkdwnDocument> {
        let stripped = strip_json_comments(text);
        let value: Value = serde_json::from_str(&stripped)?;
        if !value.is_object() {
            return Err(MrkdwnError::NotAnObject);
        }

        let mut segments = HashMap::new();
        let mut resources = Vec::new();
        let mut next_index = 0;
        if let Some(object) = value.as_object() {
            for (key, entry) in object {
                if let Value::String(markup) = entry {
                    let ast = Parser::new(markup).parse()?;
                    let (value_segments, value_resources) =
                        extract_value(key, &ast, &settings, next_index);
                    next_index += value_resources.len();
                    resources.extend(value_resources);
                    segments.insert(key.clone(), value_segments);
                }
            }
        }

        Ok(MrkdwnDocument {
            value,
            segments,
            resources,
            settings,
        })
    }

    /// Like [`parse`](MrkdwnDocument::parse), but a document that fails
    /// to parse is logged and skipped instead of aborting a batch.
    pub fn parse_lenient(text: &str, settings: Settings) -> Option<MrkdwnDocument> {
        match MrkdwnDocument::parse(text, settings) {
            Ok(document) => Some(document),
            Err(err) => {
                log::warn!("skipping document that failed to parse: {}", err);
                None
            }
        }
    }

    /// Resources extracted from this document, in document order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Assemble the document for one target locale.
    pub fn localize(
        &self,
        store: &dyn TranslationStore,
        pseudo: Option<&dyn PseudoTranslator>,
        locale: &str,
    ) -> MrkdwnResult<LocalizedDocument> {
        let localizer = Localizer::new(store, pseudo, &self.settings);
        let mut value = self.value.clone();
        let mut warnings = Vec::new();
        let mut fallback_keys: HashSet<String> = HashSet::new();

        if let Some(object) = value.as_object_mut() {
            for (key, entry) in object.iter_mut() {
                let Some(segments) = self.segments.get(key) else {
                    continue;
                };
                let mut assembled = String::new();
                for segment in segments {
                    match segment {
                        Segment::Literal(literal) => assembled.push_str(literal),
                        Segment::Run(run) => {
                            let outcome = localizer.localize_run(run, locale);
                            if outcome.used_fallback {
                                fallback_keys.insert(run.key.clone());
                            }
                            warnings.extend(outcome.warnings);
                            assembled.push_str(&outcome.text);
                        }
                    }
                }
                *entry = Value::String(assembled);
            }
        }

        let new_resources = self
            .resources
            .iter()
            .filter(|resource| fallback_keys.contains(&resource.key))
            .cloned()
            .collect();
        Ok(LocalizedDocument {
            text: to_pretty_string(&value)?,
            locale: locale.to_string(),
            fully_translated: fallback_keys.is_empty(),
            new_resources,
            warnings,
        })
    }
}

/// Serialize with 4-space indentation and a trailing newline, matching
/// how the source documents are conventionally formatted.
fn to_pretty_string(value: &Value) -> MrkdwnResult<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer).map_err(MrkdwnError::from)?;
    let mut text = String::from_utf8_lossy(&buf).into_owned();
    text.push('\n');
    Ok(text)
}

/// Strip `//` and `/* */` comments and trailing commas so the text can
/// be handed to a strict JSON parser. Comments are replaced with spaces
/// to keep parse-error offsets meaningful.
fn strip_json_comments(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out: Vec<char> = Vec::with_capacity(chars.len());
    let mut i = 0;
    let mut in_string = false;
    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            '/' if i + 1 < chars.len() && chars[i + 1] == '/' => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(' ');
                    i += 1;
                }
            }
            '/' if i + 1 < chars.len() && chars[i + 1] == '*' => {
                out.push(' ');
                out.push(' ');
                i += 2;
                while i < chars.len() {
                    if chars[i] == '*' && i + 1 < chars.len() && chars[i + 1] == '/' {
                        out.push(' ');
                        out.push(' ');
                        i += 2;
                        break;
                    }
                    out.push(if chars[i] == '\n' { '\n' } else { ' ' });
                    i += 1;
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    // Second pass: blank out commas whose next significant character
    // closes an object or array.
    let mut in_string = false;
    let mut i = 0;
    while i < out.len() {
        let c = out[i];
        if in_string {
            if c == '\\' {
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                i += 1;
            }
            ',' => {
                let mut j = i + 1;
                while j < out.len() && out[j].is_whitespace() {
                    j += 1;
                }
                if j < out.len() && (out[j] == '}' || out[j] == ']') {
                    out[i] = ' ';
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    out.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AccentedPseudo, MemoryStore};

    fn parse(text: &str) -> MrkdwnDocument {
        MrkdwnDocument::parse(text, Settings::default()).unwrap()
    }

    fn value_of(localized: &LocalizedDocument, key: &str) -> String {
        let value: Value = serde_json::from_str(&localized.text).unwrap();
        value[key].as_str().unwrap().to_string()
    }

    #[test]
    fn test_parse_extracts_resources_in_document_order() {
        let document = parse(r#"{"a": "one *two*", "b": "three", "c": 7}"#);
        let keys: Vec<&str> = document.resources().iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(document.resources()[0].index, 0);
        assert_eq!(document.resources()[1].index, 1);
    }

    #[test]
    fn test_parse_rejects_non_object_root() {
        let err = MrkdwnDocument::parse("[1, 2]", Settings::default()).unwrap_err();
        assert!(matches!(err, MrkdwnError::NotAnObject));
    }

    #[test]
    fn test_parse_lenient_skips_invalid_json() {
        assert!(MrkdwnDocument::parse_lenient("not json", Settings::default()).is_none());
        assert!(MrkdwnDocument::parse_lenient(r#"{"a": "b"}"#, Settings::default()).is_some());
    }

    #[test]
    fn test_comments_and_trailing_commas_are_tolerated() {
        let text = r#"{
            // greeting shown on the landing page
            "greeting": "Hello, *world*!",
            /* block
               comment */
            "farewell": "Bye",
        }"#;
        let document = parse(text);
        assert_eq!(document.resources().len(), 2);
    }

    #[test]
    fn test_comment_markers_inside_strings_survive() {
        let document = parse(r#"{"a": "see // not a comment", "b": "x /* y */ z"}"#);
        let localized = document.localize(&MemoryStore::new(), None, "en-US").unwrap();
        assert_eq!(value_of(&localized, "a"), "see // not a comment");
        assert_eq!(value_of(&localized, "b"), "x /* y */ z");
    }

    #[test]
    fn test_untranslated_document_round_trips() {
        let text = r#"{"a": "before\n```\nlet x = 1;\n```\nafter", "b": "  *hi* :tada:  ", "n": 42}"#;
        let document = parse(text);
        let localized = document.localize(&MemoryStore::new(), None, "de-DE").unwrap();
        assert_eq!(
            value_of(&localized, "a"),
            "before\n```\nlet x = 1;\n```\nafter"
        );
        assert_eq!(value_of(&localized, "b"), "  *hi* :tada:  ");
        assert!(!localized.fully_translated);
        let value: Value = serde_json::from_str(&localized.text).unwrap();
        assert_eq!(value["n"], Value::from(42));
    }

    #[test]
    fn test_localize_end_to_end() {
        let document = parse(r#"{"greeting": "Hello, *world*!"}"#);
        let mut store = MemoryStore::new();
        store.add_translation(
            "default",
            "fr-FR",
            "greeting",
            "mrkdwn",
            "Bonjour, <c0>le monde</c0> !",
        );
        let localized = document.localize(&store, None, "fr-FR").unwrap();
        assert_eq!(value_of(&localized, "greeting"), "Bonjour, *le monde* !");
        assert!(localized.fully_translated);
        assert!(localized.new_resources.is_empty());
        assert!(localized.warnings.is_empty());
    }

    #[test]
    fn test_missing_translations_are_reported_as_new() {
        let document = parse(r#"{"a": "one", "b": "two"}"#);
        let mut store = MemoryStore::new();
        store.add_translation("default", "fr-FR", "a", "mrkdwn", "un");
        let localized = document.localize(&store, None, "fr-FR").unwrap();
        assert!(!localized.fully_translated);
        assert_eq!(localized.new_resources.len(), 1);
        assert_eq!(localized.new_resources[0].key, "b");
    }

    #[test]
    fn test_mismatch_warnings_propagate_to_document() {
        let document = parse(r#"{"a": "one *two*"}"#);
        let mut store = MemoryStore::new();
        store.add_translation("default", "fr-FR", "a", "mrkdwn", "un <c9>deux</c9>");
        let localized = document.localize(&store, None, "fr-FR").unwrap();
        assert_eq!(value_of(&localized, "a"), "un deux");
        assert_eq!(localized.warnings.len(), 1);
        assert_eq!(localized.warnings[0].placeholder_index, 9);
    }

    #[test]
    fn test_pseudo_localization_of_document() {
        let settings = Settings {
            pseudo_locale: Some("en-XA".to_string()),
            ..Settings::default()
        };
        let document = MrkdwnDocument::parse(r#"{"a": "casa *sol*"}"#, settings).unwrap();
        let pseudo = AccentedPseudo::new("en-US");
        let localized = document
            .localize(&MemoryStore::new(), Some(&pseudo), "en-XA")
            .unwrap();
        assert_eq!(value_of(&localized, "a"), "çàšà *šòl*");
        assert!(!localized.fully_translated);
    }

    #[test]
    fn test_output_is_four_space_indented() {
        let document = parse(r#"{"a": "hi"}"#);
        let localized = document.localize(&MemoryStore::new(), None, "en-US").unwrap();
        assert!(localized.text.starts_with("{\n    \"a\""));
        assert!(localized.text.ends_with("}\n"));
    }

    #[test]
    fn test_malformed_tag_aborts_parse() {
        let err = MrkdwnDocument::parse(r#"{"a": "broken <tag"}"#, Settings::default()).unwrap_err();
        assert!(matches!(err, MrkdwnError::MalformedTag { .. }));
    }

    #[test]
    fn test_strip_json_comments_preserves_line_numbers() {
        let stripped = strip_json_comments("{\n// c\n\"a\": 1\n}");
        assert_eq!(stripped.matches('\n').count(), 3);
    }
}
