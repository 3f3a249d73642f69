//! Placeholder accumulation and recovery.
//!
//! The [`Accumulator`] converts a nested sequence of begin-component /
//! text / end-component calls into a flat placeholder-string
//! (`"This is a <c0>test</c0>."`) plus a side-table mapping each
//! placeholder index to the markup node it stands for. The side-table
//! is the contract between source and translation: a translator may
//! reorder, drop or re-nest `<cN>` tags freely, and
//! [`parse_translated`] reconciles whatever comes back against the
//! source table, dropping references the source never defined instead
//! of failing.
//!
//! Wire format: `<cN>...</cN>` for paired components wrapping
//! translatable text, `<cN/>` for opaque self-closing components whose
//! content is never translated. Indices are assigned from 0 in
//! traversal order and are unique within one resource.

use crate::ast::MarkupNode;
use crate::error::{MrkdwnError, MrkdwnResult};
use crate::parser::line_col;

/// How a component participates in the placeholder-string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// Wraps a translatable span: `<cN>...</cN>`
    Paired,
    /// Opaque unit with untranslatable content: `<cN/>`
    SelfClosing,
}

/// One non-text markup node lifted out of a text run.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Placeholder index, assigned in traversal order within one resource
    pub index: usize,
    pub kind: ComponentKind,
    /// The originating markup node, used to regenerate original syntax
    pub node: MarkupNode,
}

/// Stack-based builder turning walker events into a placeholder-string.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    /// Flat placeholder-string under construction
    flat: String,
    /// Original markup syntax of everything accumulated, used when a
    /// run is discarded and must pass through verbatim
    raw: String,
    components: Vec<Component>,
    /// Indices of currently open paired components
    stack: Vec<usize>,
    /// Count of non-whitespace literal characters accumulated
    text_len: usize,
    prefix: Vec<usize>,
    prefix_taken: bool,
    suffix: Vec<usize>,
}

impl Accumulator {
    pub fn new() -> Self {
        Accumulator::default()
    }

    /// Append literal text to the accumulation buffer.
    pub fn add_text(&mut self, text: &str) {
        self.flat.push_str(text);
        self.raw.push_str(text);
        let non_ws = text.chars().filter(|c| !c.is_whitespace()).count();
        if non_ws > 0 {
            if !self.prefix_taken {
                self.prefix = self.stack.clone();
                self.prefix_taken = true;
            }
            self.suffix = self.stack.clone();
            self.text_len += non_ws;
        }
    }

    /// Open a paired component scope, assigning it the next placeholder
    /// index. Returns the assigned index.
    pub fn begin_component(&mut self, node: &MarkupNode) -> usize {
        let index = self.components.len();
        self.flat.push_str(&format!("<c{}>", index));
        self.raw.push_str(&node.open_syntax());
        self.components.push(Component {
            index,
            kind: ComponentKind::Paired,
            node: node.clone(),
        });
        self.stack.push(index);
        index
    }

    /// Record a self-closing component. Returns the assigned index.
    pub fn add_component(&mut self, node: &MarkupNode) -> usize {
        let index = self.components.len();
        self.flat.push_str(&format!("<c{}/>", index));
        self.raw.push_str(&node.render());
        self.components.push(Component {
            index,
            kind: ComponentKind::SelfClosing,
            node: node.clone(),
        });
        index
    }

    /// Close the innermost open component scope.
    ///
    /// Closing with nothing open is absorbed as a no-op with a warning:
    /// malformed upstream markup must not propagate a panic through the
    /// walker.
    pub fn end_component(&mut self) {
        match self.stack.pop() {
            Some(index) => {
                self.flat.push_str(&format!("</c{}>", index));
                self.raw.push_str(&self.components[index].node.close_syntax());
            }
            None => {
                log::warn!("end_component called with no open component; ignoring");
            }
        }
    }

    /// The flat placeholder-string with leading/trailing whitespace and
    /// edge wrappers containing only whitespace trimmed; interior
    /// structure is preserved exactly.
    pub fn minimal_string(&self) -> &str {
        let (start, end) = self.minimal_bounds();
        &self.flat[start..end]
    }

    /// Split the accumulation into (leading syntax, minimal string,
    /// trailing syntax). The edges carry the original markup of the
    /// trimmed whitespace and whitespace-only wrappers, ready to pass
    /// through as literal text.
    pub fn minimal_parts(&self) -> (String, &str, String) {
        let (start, end) = self.minimal_bounds();
        (
            self.render_fragment(&self.flat[..start]),
            &self.flat[start..end],
            self.render_fragment(&self.flat[end..]),
        )
    }

    /// Byte bounds of the minimal string within `flat`. A paired
    /// wrapper at either edge whose whole content is whitespace carries
    /// nothing for a translator and is trimmed along with the
    /// whitespace itself.
    fn minimal_bounds(&self) -> (usize, usize) {
        let tokens = lex_flat(&self.flat);
        let is_ws_text = |i: usize| {
            matches!(tokens[i].1, FlatToken::Text)
                && self.flat[tokens[i].0.clone()].trim().is_empty()
        };
        let mut lo = 0;
        let mut hi = tokens.len();
        loop {
            let before = (lo, hi);
            while lo < hi && is_ws_text(lo) {
                lo += 1;
            }
            if lo < hi {
                if let FlatToken::Open(index) = tokens[lo].1 {
                    let mut j = lo + 1;
                    while j < hi && is_ws_text(j) {
                        j += 1;
                    }
                    if j < hi && tokens[j].1 == FlatToken::Close(index) {
                        lo = j + 1;
                    }
                }
            }
            while hi > lo && is_ws_text(hi - 1) {
                hi -= 1;
            }
            if hi > lo {
                if let FlatToken::Close(index) = tokens[hi - 1].1 {
                    let mut j = hi - 1;
                    while j > lo && is_ws_text(j - 1) {
                        j -= 1;
                    }
                    if j > lo && tokens[j - 1].1 == FlatToken::Open(index) {
                        hi = j - 1;
                    }
                }
            }
            if (lo, hi) == before {
                break;
            }
        }
        if lo >= hi {
            return (self.flat.len(), self.flat.len());
        }
        // Text tokens may mix whitespace with content at their edges;
        // finish with a character-level trim.
        let start = tokens[lo].0.start;
        let end = tokens[hi - 1].0.end;
        let slice = &self.flat[start..end];
        let start = start + (slice.len() - slice.trim_start().len());
        let end = end - (slice.len() - slice.trim_end().len());
        (start, end)
    }

    /// Render a fragment of the flat string back to original markup:
    /// placeholder tags become their component's syntax, text passes
    /// through.
    fn render_fragment(&self, fragment: &str) -> String {
        let mut out = String::new();
        let mut pos = 0;
        while pos < fragment.len() {
            match scan_tag(&fragment[pos..]) {
                TagScan::Tag(kind, index, len) => {
                    if let Some(component) = self.components.get(index) {
                        match kind {
                            TagKind::Open => out.push_str(&component.node.open_syntax()),
                            TagKind::Close => out.push_str(&component.node.close_syntax()),
                            TagKind::SelfClose => out.push_str(&component.node.render()),
                        }
                    }
                    pos += len;
                }
                _ => {
                    let Some(c) = fragment[pos..].chars().next() else { break };
                    out.push(c);
                    pos += c.len_utf8();
                }
            }
        }
        out
    }

    /// The flat placeholder-string as accumulated.
    pub fn flat(&self) -> &str {
        &self.flat
    }

    /// The original markup syntax of everything accumulated.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Count of non-whitespace literal characters accumulated.
    pub fn text_len(&self) -> usize {
        self.text_len
    }

    pub fn has_text(&self) -> bool {
        self.text_len > 0
    }

    /// True when nothing at all has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.flat.is_empty() && self.raw.is_empty() && self.stack.is_empty()
    }

    /// Depth of the open-scope stack.
    pub fn current_level(&self) -> usize {
        self.stack.len()
    }

    /// Component wrappers that were open when text accumulation started.
    pub fn prefix(&self) -> &[usize] {
        &self.prefix
    }

    /// Component wrappers that were open when text accumulation ended.
    pub fn suffix(&self) -> &[usize] {
        &self.suffix
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    /// Discard all accumulated state, ready for the next run.
    pub fn reset(&mut self) {
        *self = Accumulator::default();
    }

    /// Parse a translated placeholder-string back into an element tree,
    /// reconciling its placeholder references against this accumulator's
    /// side-table. See [`parse_translated`].
    pub fn from_translated(&self, translated: &str) -> MrkdwnResult<Reconciled> {
        parse_translated(translated, &self.components)
    }
}

/// One element of a reconciled translation: in-order flattening of the
/// list yields alternating literal text and original components.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Translated literal text, inserted as-is
    Text(String),
    /// An original component recovered from the side-table; children
    /// hold the translated inner content for paired components
    Component {
        component: Component,
        children: Vec<Element>,
    },
}

/// A placeholder reference in the translation that could not be
/// resolved against the source side-table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMismatch {
    pub index: usize,
    pub message: String,
}

/// Result of reconciling a translated placeholder-string.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub elements: Vec<Element>,
    /// Mismatches absorbed during reconciliation, in scan order
    pub mismatches: Vec<PlaceholderMismatch>,
}

/// One token of a flat placeholder-string built by the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlatToken {
    Text,
    Open(usize),
    Close(usize),
    SelfClose(usize),
}

/// Lex an accumulator-built flat string into text runs and placeholder
/// tags with their byte ranges. The accumulator only ever writes
/// well-formed tags, so malformed scans cannot occur here.
fn lex_flat(flat: &str) -> Vec<(std::ops::Range<usize>, FlatToken)> {
    let mut tokens: Vec<(std::ops::Range<usize>, FlatToken)> = Vec::new();
    let mut pos = 0;
    while pos < flat.len() {
        match scan_tag(&flat[pos..]) {
            TagScan::Tag(kind, index, len) => {
                let token = match kind {
                    TagKind::Open => FlatToken::Open(index),
                    TagKind::Close => FlatToken::Close(index),
                    TagKind::SelfClose => FlatToken::SelfClose(index),
                };
                tokens.push((pos..pos + len, token));
                pos += len;
            }
            _ => {
                let Some(c) = flat[pos..].chars().next() else { break };
                let end = pos + c.len_utf8();
                match tokens.last_mut() {
                    Some((range, FlatToken::Text)) if range.end == pos => range.end = end,
                    _ => tokens.push((pos..end, FlatToken::Text)),
                }
                pos = end;
            }
        }
    }
    tokens
}

enum TagScan {
    NotATag,
    Malformed(&'static str),
    Tag(TagKind, usize, usize),
}

enum TagKind {
    Open,
    Close,
    SelfClose,
}

/// Recognize a placeholder tag at the start of `rest`.
///
/// Only `<c` / `</c` followed immediately by digits enter tag space;
/// any other `<` is literal text a translator is free to use. Digits
/// followed by anything but `>` or `/>` are a malformed tag.
fn scan_tag(rest: &str) -> TagScan {
    let (closing, body) = if let Some(body) = rest.strip_prefix("</c") {
        (true, body)
    } else if let Some(body) = rest.strip_prefix("<c") {
        (false, body)
    } else {
        return TagScan::NotATag;
    };
    let digits_len = body.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits_len == 0 {
        return TagScan::NotATag;
    }
    let index: usize = match body[..digits_len].parse() {
        Ok(index) => index,
        Err(_) => return TagScan::Malformed("placeholder index out of range"),
    };
    let prefix_len = if closing { 3 } else { 2 };
    let after = &body[digits_len..];
    if closing {
        if after.starts_with('>') {
            TagScan::Tag(TagKind::Close, index, prefix_len + digits_len + 1)
        } else {
            TagScan::Malformed("malformed closing placeholder tag")
        }
    } else if after.starts_with("/>") {
        TagScan::Tag(TagKind::SelfClose, index, prefix_len + digits_len + 2)
    } else if after.starts_with('>') {
        TagScan::Tag(TagKind::Open, index, prefix_len + digits_len + 1)
    } else {
        TagScan::Malformed("malformed placeholder tag")
    }
}

struct Frame {
    index: usize,
    /// None when the source table has no entry for this index; the
    /// frame's children are then spliced into the parent on close
    component: Option<Component>,
    children: Vec<Element>,
}

fn push_text(elements: &mut Vec<Element>, text: &str) {
    if let Some(Element::Text(prev)) = elements.last_mut() {
        prev.push_str(text);
        return;
    }
    elements.push(Element::Text(text.to_string()));
}

/// Parse a translated placeholder-string into an element tree,
/// resolving each `<cN>` reference through the source side-table.
///
/// The translation is parsed as if it were a full document; the
/// synthetic root wrapper is stripped before returning. References to
/// indices the source never defined are removed from the result — a
/// paired wrapper is unwrapped so its translated inner text survives,
/// a self-closing reference is dropped outright — and each removal is
/// recorded as a [`PlaceholderMismatch`] rather than an error.
///
/// # Example
/// ```ignore
/// // source side-table defines c0 (bold) and c1 (italic)
/// let reconciled = parse_translated("<c1>essai</c1> <c0>ceci</c0>", components)?;
/// assert!(reconciled.mismatches.is_empty());
/// ```
pub fn parse_translated(translated: &str, components: &[Component]) -> MrkdwnResult<Reconciled> {
    let mut root: Vec<Element> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut mismatches: Vec<PlaceholderMismatch> = Vec::new();
    let mut pos = 0;

    while pos < translated.len() {
        let rest = &translated[pos..];
        match scan_tag(rest) {
            TagScan::NotATag => {
                let Some(c) = rest.chars().next() else { break };
                let end = pos + c.len_utf8();
                let target = stack.last_mut().map_or(&mut root, |f| &mut f.children);
                push_text(target, &translated[pos..end]);
                pos = end;
            }
            TagScan::Malformed(message) => {
                let (line, column) = line_col(translated, pos);
                return Err(MrkdwnError::MalformedTag {
                    line,
                    column,
                    message: message.to_string(),
                });
            }
            TagScan::Tag(kind, index, len) => {
                pos += len;
                match kind {
                    TagKind::Open => match components.get(index) {
                        Some(component) if component.kind == ComponentKind::Paired => {
                            stack.push(Frame {
                                index,
                                component: Some(component.clone()),
                                children: Vec::new(),
                            });
                        }
                        Some(component) => {
                            // Paired syntax used on an opaque component:
                            // emit it here and let the inner text flow
                            // into the surrounding scope.
                            let target =
                                stack.last_mut().map_or(&mut root, |f| &mut f.children);
                            target.push(Element::Component {
                                component: component.clone(),
                                children: Vec::new(),
                            });
                            stack.push(Frame {
                                index,
                                component: None,
                                children: Vec::new(),
                            });
                        }
                        None => {
                            mismatches.push(PlaceholderMismatch {
                                index,
                                message: format!(
                                    "translation references component c{} which the source does not define",
                                    index
                                ),
                            });
                            stack.push(Frame {
                                index,
                                component: None,
                                children: Vec::new(),
                            });
                        }
                    },
                    TagKind::Close => {
                        if stack.iter().any(|f| f.index == index) {
                            while let Some(frame) = stack.pop() {
                                let done = frame.index == index;
                                if !done {
                                    log::warn!(
                                        "auto-closing unbalanced placeholder c{}",
                                        frame.index
                                    );
                                }
                                close_frame(frame, &mut stack, &mut root);
                                if done {
                                    break;
                                }
                            }
                        } else {
                            mismatches.push(PlaceholderMismatch {
                                index,
                                message: format!(
                                    "translation closes component c{} which was never opened",
                                    index
                                ),
                            });
                        }
                    }
                    TagKind::SelfClose => match components.get(index) {
                        Some(component) => {
                            let target =
                                stack.last_mut().map_or(&mut root, |f| &mut f.children);
                            target.push(Element::Component {
                                component: component.clone(),
                                children: Vec::new(),
                            });
                        }
                        None => {
                            mismatches.push(PlaceholderMismatch {
                                index,
                                message: format!(
                                    "translation references component c{} which the source does not define",
                                    index
                                ),
                            });
                        }
                    },
                }
            }
        }
    }

    // Anything still open is auto-closed so content is never lost.
    while let Some(frame) = stack.pop() {
        log::warn!("placeholder c{} was never closed in translation", frame.index);
        close_frame(frame, &mut stack, &mut root);
    }

    Ok(Reconciled {
        elements: root,
        mismatches,
    })
}

fn close_frame(frame: Frame, stack: &mut Vec<Frame>, root: &mut Vec<Element>) {
    let target = stack.last_mut().map_or(root, |f| &mut f.children);
    match frame.component {
        Some(component) => target.push(Element::Component {
            component,
            children: frame.children,
        }),
        None => {
            for child in frame.children {
                match child {
                    Element::Text(text) => push_text(target, &text),
                    other => target.push(other),
                }
            }
        }
    }
}
