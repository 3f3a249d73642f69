//! Extraction of translatable resources from a parsed mrkdwn tree.
//!
//! The walker traverses one value's tree depth-first, feeding the
//! [`Accumulator`]. Paired wrappers (emphasis, strike, quote, labeled
//! references) open and close component scopes; opaque leaves (code
//! spans, emoji, bare references) become self-closing placeholders.
//! Code blocks and any other non-translatable boundary flush the
//! pending run: if the run holds translatable text it is emitted as a
//! [`Resource`] plus a [`Segment::Run`], otherwise its original markup
//! passes through verbatim as a [`Segment::Literal`]. The segment list
//! is the immutable skeleton every locale's assembly is built from.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::ast::MarkupNode;
use crate::placeholder::{Accumulator, Component};
use crate::settings::Settings;

/// The data type recorded on every resource this handler extracts.
pub const DATA_TYPE: &str = "mrkdwn";

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?c\d+/?>").expect("valid placeholder tag regex"));

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)(https?|ftps?|mailto|github|file|data|irc):\S+$")
        .expect("valid bare-url regex")
});

static I18N_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*i18n\s*:?\s*(.*?)\s*$").expect("valid i18n comment regex"));

/// The unit of translation handed to the translation store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Derived from the JSON property name; suffixed `_N` for the
    /// second and later runs extracted from the same property
    pub key: String,
    /// The placeholder-string, e.g. `"This is a <c0>test</c0>."`
    #[serde(rename = "sourceText")]
    pub source: String,
    /// Translator comment from an adjacent i18n markup comment
    pub comment: Option<String>,
    /// Always [`DATA_TYPE`]
    pub data_type: String,
    /// Ordinal for stable output ordering across the document
    pub index: usize,
}

/// A translatable run together with its placeholder side-table.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub key: String,
    /// The minimal placeholder-string (the resource's source text)
    pub source: String,
    /// Side-table recovered components are resolved against
    pub components: Vec<Component>,
}

/// One piece of a key's value: either markup passed through verbatim
/// or a translatable run to be replaced per locale.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Run(Run),
}

/// Decide whether a placeholder-string is worth translating.
///
/// After stripping placeholder tags the remaining text must contain at
/// least one letter, digit or ideograph, and must not be a bare URL of
/// a registered scheme unless link localization is enabled.
pub fn is_translatable(source: &str, localize_links: bool) -> bool {
    let text = TAG_RE.replace_all(source, "");
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    if !text.chars().any(char::is_alphanumeric) {
        return false;
    }
    if URL_RE.is_match(text) {
        return localize_links;
    }
    true
}

/// Walk one value's tree, producing its segments and resources.
///
/// `first_index` seeds the resource ordinal so indices stay stable
/// across the whole document.
pub fn extract_value(
    key: &str,
    document: &MarkupNode,
    settings: &Settings,
    first_index: usize,
) -> (Vec<Segment>, Vec<Resource>) {
    let mut extractor = Extractor {
        settings,
        key,
        segments: Vec::new(),
        resources: Vec::new(),
        acc: Accumulator::new(),
        run_count: 0,
        pending_comment: None,
        next_index: first_index,
    };
    extractor.walk(document);
    extractor.flush();
    (extractor.segments, extractor.resources)
}

struct Extractor<'a> {
    settings: &'a Settings,
    key: &'a str,
    segments: Vec<Segment>,
    resources: Vec<Resource>,
    acc: Accumulator,
    run_count: usize,
    pending_comment: Option<String>,
    next_index: usize,
}

impl Extractor<'_> {
    fn walk(&mut self, node: &MarkupNode) {
        match node {
            MarkupNode::Text(text) => {
                // Whitespace-only text ahead of any run passes through
                // directly; anything else joins the accumulation.
                if self.acc.is_empty() && text.trim().is_empty() {
                    self.push_literal(text.clone());
                } else {
                    self.acc.add_text(text);
                }
            }
            MarkupNode::Italic(children)
            | MarkupNode::Bold(children)
            | MarkupNode::Strike(children)
            | MarkupNode::Quote(children) => {
                self.acc.begin_component(node);
                for child in children {
                    self.walk(child);
                }
                self.acc.end_component();
            }
            MarkupNode::PreText(_) => {
                // Preformatted content is never translatable and ends
                // the current maximal run.
                self.flush();
                self.push_literal(node.render());
            }
            MarkupNode::Comment(body) => {
                self.flush();
                if let Some(caps) = I18N_COMMENT_RE.captures(body) {
                    self.pending_comment = Some(caps[1].to_string());
                }
                self.push_literal(node.render());
            }
            MarkupNode::Url { label, .. }
            | MarkupNode::ChannelLink { label, .. }
            | MarkupNode::UserLink { label, .. }
            | MarkupNode::Command { label, .. } => match label {
                Some(children) => {
                    self.acc.begin_component(node);
                    for child in children {
                        self.walk(child);
                    }
                    self.acc.end_component();
                }
                // A reference without a label is an opaque unit that a
                // translator may relocate freely.
                None => {
                    self.acc.add_component(node);
                }
            },
            MarkupNode::Emoji(_) | MarkupNode::Code(_) => {
                self.acc.add_component(node);
            }
            MarkupNode::Document(children) => {
                self.flush();
                for child in children {
                    self.walk(child);
                }
            }
        }
    }

    /// Close the pending run: emit it as a resource when it carries
    /// translatable text, or pass its original markup through verbatim.
    fn flush(&mut self) {
        if self.acc.is_empty() {
            return;
        }
        if self.acc.current_level() > 0 {
            log::warn!(
                "flushing run for key '{}' with {} unclosed components",
                self.key,
                self.acc.current_level()
            );
        }
        if self.acc.has_text()
            && is_translatable(self.acc.minimal_string(), self.settings.localize_links)
        {
            let (lead, minimal, trail) = self.acc.minimal_parts();
            let source = minimal.to_string();
            let components = self.acc.components().to_vec();
            self.acc.reset();

            self.push_literal(lead);
            let key = self.next_key();
            self.resources.push(Resource {
                key: key.clone(),
                source: source.clone(),
                comment: self.pending_comment.take(),
                data_type: DATA_TYPE.to_string(),
                index: self.next_index,
            });
            self.next_index += 1;
            self.segments.push(Segment::Run(Run {
                key,
                source,
                components,
            }));
            self.push_literal(trail);
        } else {
            log::debug!(
                "discarding non-translatable run for key '{}' (prefix={:?}, suffix={:?})",
                self.key,
                self.acc.prefix(),
                self.acc.suffix()
            );
            let raw = self.acc.raw().to_string();
            self.acc.reset();
            self.push_literal(raw);
        }
    }

    fn next_key(&mut self) -> String {
        let key = if self.run_count == 0 {
            self.key.to_string()
        } else {
            format!("{}_{}", self.key, self.run_count)
        };
        self.run_count += 1;
        key
    }

    fn push_literal(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Literal(prev)) = self.segments.last_mut() {
            prev.push_str(&text);
            return;
        }
        self.segments.push(Segment::Literal(text));
    }
}
