//! Localization of extracted runs.
//!
//! Each run moves through three states: pending (translation not yet
//! looked up), resolved (a translation was found, or the miss policy
//! substituted pseudo/source text), and reconstructed (original markup
//! syntax regenerated around the translated text). The terminal state
//! is [`RunStatus::Reconstructed`], or
//! [`RunStatus::ReconstructedWithWarning`] when a placeholder mismatch
//! was absorbed along the way — output is still produced either way.
//!
//! Miss policy when no translation exists for (project, locale, key):
//! 1. Target locale is the configured pseudo-locale but no pseudo
//!    engine is enabled: use the source text unchanged.
//! 2. Target locale is the pseudo-locale and an engine is enabled:
//!    pseudo-transform the source (or the pseudo base locale's
//!    existing translation when the engine is chained off one) and
//!    flag the run as falling back.
//! 3. Otherwise: use the source text and flag the run as falling back.
//! Falling back is what marks a document not-fully-translated and
//! registers the resource in the new-strings set.

use crate::error::MismatchWarning;
use crate::extract::{DATA_TYPE, Run};
use crate::placeholder::{ComponentKind, Element, Reconciled, parse_translated};
use crate::settings::Settings;
use crate::store::{PseudoTranslator, TranslationStore};

/// Terminal state of one run's localization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Syntax regenerated with no anomalies
    Reconstructed,
    /// A mismatch was absorbed; output was still produced
    ReconstructedWithWarning,
}

/// The localized text for one run plus everything the assembler needs
/// to track document status.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Reconstructed markup for the target locale
    pub text: String,
    pub status: RunStatus,
    /// True when the run fell back to source or pseudo text, i.e. the
    /// resource must be registered as a new string
    pub used_fallback: bool,
    pub warnings: Vec<MismatchWarning>,
}

/// Localizes runs against a translation store for one project.
pub struct Localizer<'a> {
    store: &'a dyn TranslationStore,
    pseudo: Option<&'a dyn PseudoTranslator>,
    settings: &'a Settings,
}

impl<'a> Localizer<'a> {
    pub fn new(
        store: &'a dyn TranslationStore,
        pseudo: Option<&'a dyn PseudoTranslator>,
        settings: &'a Settings,
    ) -> Self {
        Localizer {
            store,
            pseudo,
            settings,
        }
    }

    /// Produce the translated markup substring that replaces `run` in
    /// the document for `locale`.
    pub fn localize_run(&self, run: &Run, locale: &str) -> RunOutcome {
        let looked_up =
            self.store
                .get_translation(&self.settings.project, locale, &run.key, DATA_TYPE);
        let (translation, used_fallback) = match looked_up {
            Some(translation) => (translation, false),
            None => self.resolve_miss(run, locale),
        };

        let mut warnings = Vec::new();
        let reconciled = match parse_translated(&translation, &run.components) {
            Ok(reconciled) => reconciled,
            Err(err) => {
                // A translation so broken it cannot be scanned is a
                // translation-quality problem, not a document fault:
                // warn and reconstruct from the source string, which is
                // well-formed by construction.
                let warning = MismatchWarning {
                    key: run.key.clone(),
                    locale: locale.to_string(),
                    source: run.source.clone(),
                    translation: translation.clone(),
                    placeholder_index: 0,
                    message: format!("translation could not be parsed: {}", err),
                };
                log::warn!("{}", warning);
                warnings.push(warning);
                parse_translated(&run.source, &run.components).unwrap_or_else(|_| Reconciled {
                    elements: Vec::new(),
                    mismatches: Vec::new(),
                })
            }
        };

        for mismatch in reconciled.mismatches {
            let warning = MismatchWarning {
                key: run.key.clone(),
                locale: locale.to_string(),
                source: run.source.clone(),
                translation: translation.clone(),
                placeholder_index: mismatch.index,
                message: mismatch.message,
            };
            log::warn!("{}", warning);
            warnings.push(warning);
        }

        let status = if warnings.is_empty() {
            RunStatus::Reconstructed
        } else {
            RunStatus::ReconstructedWithWarning
        };
        RunOutcome {
            text: render_elements(&reconciled.elements),
            status,
            used_fallback,
            warnings,
        }
    }

    fn resolve_miss(&self, run: &Run, locale: &str) -> (String, bool) {
        let is_pseudo_locale = self.settings.pseudo_locale.as_deref() == Some(locale);
        if is_pseudo_locale {
            match self.pseudo {
                None => return (run.source.clone(), false),
                Some(pseudo) => {
                    let base = if pseudo.pseudo_source_locale() != self.settings.source_locale {
                        self.store.get_translation(
                            &self.settings.project,
                            pseudo.pseudo_source_locale(),
                            &run.key,
                            DATA_TYPE,
                        )
                    } else {
                        None
                    };
                    let seed = base.unwrap_or_else(|| run.source.clone());
                    return (pseudo.get_string(&seed), true);
                }
            }
        }
        (run.source.clone(), true)
    }
}

/// Regenerate literal markup syntax from a reconciled element list:
/// translated text is inserted as-is, paired components wrap their
/// children in the original syntax, and opaque components re-emit
/// their original content verbatim.
pub fn render_elements(elements: &[Element]) -> String {
    let mut out = String::new();
    for element in elements {
        match element {
            Element::Text(text) => out.push_str(text),
            Element::Component {
                component,
                children,
            } => match component.kind {
                ComponentKind::SelfClosing => out.push_str(&component.node.render()),
                ComponentKind::Paired => {
                    let inner = render_elements(children);
                    out.push_str(&component.node.wrap(&inner));
                }
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Segment, extract_value};
    use crate::parser::Parser;
    use crate::store::{AccentedPseudo, MemoryStore};

    fn run_for(value: &str) -> Run {
        let ast = Parser::new(value).parse().unwrap();
        let (segments, _) = extract_value("id1", &ast, &Settings::default(), 0);
        segments
            .into_iter()
            .find_map(|segment| match segment {
                Segment::Run(run) => Some(run),
                Segment::Literal(_) => None,
            })
            .expect("value yields a run")
    }

    fn store_with(key: &str, locale: &str, target: &str) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_translation("default", locale, key, DATA_TYPE, target);
        store
    }

    #[test]
    fn test_translated_run_regenerates_syntax() {
        let run = run_for("This is a *test*");
        let store = store_with("id1", "fr-FR", "Ceci est un <c0>essai</c0>");
        let settings = Settings::default();
        let localizer = Localizer::new(&store, None, &settings);
        let outcome = localizer.localize_run(&run, "fr-FR");
        assert_eq!(outcome.text, "Ceci est un *essai*");
        assert_eq!(outcome.status, RunStatus::Reconstructed);
        assert!(!outcome.used_fallback);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_missing_translation_falls_back_to_source() {
        let run = run_for("This is a *test*");
        let store = MemoryStore::new();
        let settings = Settings::default();
        let localizer = Localizer::new(&store, None, &settings);
        let outcome = localizer.localize_run(&run, "de-DE");
        assert_eq!(outcome.text, "This is a *test*");
        assert!(outcome.used_fallback);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_reordered_placeholders() {
        let run = run_for("This *is* a _test_");
        let store = store_with("id1", "fr-FR", "<c1>essai</c1> <c0>ceci est</c0>");
        let settings = Settings::default();
        let localizer = Localizer::new(&store, None, &settings);
        let outcome = localizer.localize_run(&run, "fr-FR");
        assert_eq!(outcome.text, "_essai_ *ceci est*");
        assert_eq!(outcome.status, RunStatus::Reconstructed);
    }

    #[test]
    fn test_excess_placeholder_is_dropped_with_warning() {
        let run = run_for("This is a *test*");
        let store = store_with("id1", "fr-FR", "Ceci est un <c5>essai</c5>");
        let settings = Settings::default();
        let localizer = Localizer::new(&store, None, &settings);
        let outcome = localizer.localize_run(&run, "fr-FR");
        assert_eq!(outcome.text, "Ceci est un essai");
        assert_eq!(outcome.status, RunStatus::ReconstructedWithWarning);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].placeholder_index, 5);
        assert_eq!(outcome.warnings[0].locale, "fr-FR");
    }

    #[test]
    fn test_omitted_placeholder_drops_wrapper_syntax() {
        let run = run_for("This is a *test*");
        let store = store_with("id1", "fr-FR", "Ceci est un essai");
        let settings = Settings::default();
        let localizer = Localizer::new(&store, None, &settings);
        let outcome = localizer.localize_run(&run, "fr-FR");
        assert_eq!(outcome.text, "Ceci est un essai");
        assert_eq!(outcome.status, RunStatus::Reconstructed);
    }

    #[test]
    fn test_opaque_code_span_is_preserved_verbatim() {
        let run = run_for("Run `cmd` now");
        let store = store_with("id1", "fr-FR", "Maintenant, lancez <c0/>");
        let settings = Settings::default();
        let localizer = Localizer::new(&store, None, &settings);
        let outcome = localizer.localize_run(&run, "fr-FR");
        assert_eq!(outcome.text, "Maintenant, lancez `cmd`");
    }

    #[test]
    fn test_pseudo_locale_without_engine_uses_source() {
        let run = run_for("This is a *test*");
        let store = MemoryStore::new();
        let settings = Settings {
            pseudo_locale: Some("en-XA".to_string()),
            ..Settings::default()
        };
        let localizer = Localizer::new(&store, None, &settings);
        let outcome = localizer.localize_run(&run, "en-XA");
        assert_eq!(outcome.text, "This is a *test*");
        assert!(!outcome.used_fallback);
    }

    #[test]
    fn test_pseudo_locale_with_engine() {
        let run = run_for("This is a *test*");
        let store = MemoryStore::new();
        let settings = Settings {
            pseudo_locale: Some("en-XA".to_string()),
            ..Settings::default()
        };
        let pseudo = AccentedPseudo::new("en-US");
        let localizer = Localizer::new(&store, Some(&pseudo), &settings);
        let outcome = localizer.localize_run(&run, "en-XA");
        assert_eq!(outcome.text, "Thîš îš à *tèšt*");
        assert!(outcome.used_fallback);
    }

    #[test]
    fn test_pseudo_chained_off_base_locale() {
        let run = run_for("This is a *test*");
        let store = store_with("id1", "fr-FR", "Ceci est un <c0>essai</c0>");
        let settings = Settings {
            pseudo_locale: Some("fr-XA".to_string()),
            ..Settings::default()
        };
        let pseudo = AccentedPseudo::new("fr-FR");
        let localizer = Localizer::new(&store, Some(&pseudo), &settings);
        let outcome = localizer.localize_run(&run, "fr-XA");
        assert_eq!(outcome.text, "Çèçî èšt ùñ *èššàî*");
        assert!(outcome.used_fallback);
    }

    #[test]
    fn test_unparseable_translation_falls_back_to_source() {
        let run = run_for("This is a *test*");
        let store = store_with("id1", "fr-FR", "broken <c0");
        let settings = Settings::default();
        let localizer = Localizer::new(&store, None, &settings);
        let outcome = localizer.localize_run(&run, "fr-FR");
        assert_eq!(outcome.text, "This is a *test*");
        assert_eq!(outcome.status, RunStatus::ReconstructedWithWarning);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_labeled_link_round_trip() {
        let run = run_for("see <https://example.com|the docs> here");
        let store = store_with("id1", "fr-FR", "voir <c0>la documentation</c0> ici");
        let settings = Settings::default();
        let localizer = Localizer::new(&store, None, &settings);
        let outcome = localizer.localize_run(&run, "fr-FR");
        assert_eq!(
            outcome.text,
            "voir <https://example.com|la documentation> ici"
        );
    }
}
