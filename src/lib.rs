//! Extraction and re-localization of mrkdwn markup embedded in JSON
//! documents.
//!
//! Source documents are JSON objects whose string values carry mrkdwn
//! (Slack-flavored markdown). Parsing a document extracts each maximal
//! translatable run as a resource whose markup is replaced by numbered
//! placeholder tags, so translators see `This is a <c0>test</c0>`
//! instead of raw syntax. Localizing replays the document per locale,
//! mapping the translated placeholders back to the original markup,
//! tolerating reordered or missing placeholders.
//!
//! # Example
//!
//! ```
//! use mrkdwn_i18n::{MemoryStore, MrkdwnDocument, Settings};
//!
//! let document = MrkdwnDocument::parse(
//!     r#"{"id1": "This is a *test*"}"#,
//!     Settings::default(),
//! ).unwrap();
//! assert_eq!(document.resources()[0].source, "This is a <c0>test</c0>");
//!
//! let mut store = MemoryStore::new();
//! store.add_translation("default", "fr-FR", "id1", "mrkdwn", "Ceci est un <c0>essai</c0>");
//! let localized = document.localize(&store, None, "fr-FR").unwrap();
//! assert!(localized.text.contains("Ceci est un *essai*"));
//! assert!(localized.fully_translated);
//! ```

pub mod ast;
pub mod document;
pub mod error;
pub mod extract;
pub mod localize;
pub mod parser;
pub mod placeholder;
pub mod settings;
pub mod store;

pub use ast::MarkupNode;
pub use document::{LocalizedDocument, MrkdwnDocument};
pub use error::{MismatchWarning, MrkdwnError, MrkdwnResult};
pub use extract::{DATA_TYPE, Resource, Run, Segment, is_translatable};
pub use localize::{Localizer, RunOutcome, RunStatus};
pub use parser::Parser;
pub use settings::Settings;
pub use store::{
    AccentedPseudo, MemoryStore, PseudoTranslator, TranslationStore, hash_key,
};
