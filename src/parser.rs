//! A hand-written parser for mrkdwn markup.
//!
//! The parser walks the input with a byte cursor, attempting each
//! construct and backtracking to plain text when a delimiter never
//! closes. Unbalanced emphasis, strike, code and emoji delimiters
//! therefore degrade to literal text instead of failing the document.
//! The one hard fault is a malformed angle-bracket tag: that indicates
//! broken source content, and it surfaces as
//! [`MrkdwnError::MalformedTag`](crate::error::MrkdwnError) with the
//! line and column of the offending `<`.
//!
//! Rendering a parsed tree with [`MarkupNode::render`] reproduces the
//! input exactly; extraction and localization rely on that inverse.

use crate::ast::MarkupNode;
use crate::error::{MrkdwnError, MrkdwnResult};

/// Parsing context for one `parse_nodes` loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Top level: fences and quotes are recognized at line starts.
    Block,
    /// Inside a `>` quote: stops before the end of the line.
    QuoteLine,
    /// Inside an emphasis span: stops before the closing delimiter or
    /// the end of the line.
    Delim(char),
    /// Inside a reference label: inline constructs only.
    Inline,
}

pub struct Parser<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser { input, position: 0 }
    }

    /// Parse the whole input into a document node.
    pub fn parse(&mut self) -> MrkdwnResult<MarkupNode> {
        let children = self.parse_nodes(Mode::Block)?;
        Ok(MarkupNode::Document(children))
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Consumes the current character and advances the position.
    /// Returns the character that was consumed, or None at end of input.
    fn consume(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn at_line_start(&self) -> bool {
        self.position == 0 || self.input.as_bytes()[self.position - 1] == b'\n'
    }

    fn parse_nodes(&mut self, mode: Mode) -> MrkdwnResult<Vec<MarkupNode>> {
        let mut nodes = Vec::new();
        while let Some(c) = self.peek() {
            match mode {
                Mode::QuoteLine if c == '\n' => break,
                Mode::Delim(d) if c == d => break,
                Mode::Delim(_) if c == '\n' => break,
                _ => {}
            }
            if mode == Mode::Block && self.at_line_start() {
                if self.rest().starts_with("```") {
                    let node = self.parse_pretext();
                    push_node(&mut nodes, node);
                    continue;
                }
                if c == '>' {
                    self.consume();
                    let children = self.parse_nodes(Mode::QuoteLine)?;
                    push_node(&mut nodes, MarkupNode::Quote(children));
                    continue;
                }
            }
            match c {
                '*' | '_' | '~' => match self.parse_emphasis(c)? {
                    Some(node) => push_node(&mut nodes, node),
                    None => self.push_literal_char(&mut nodes),
                },
                '`' => match self.parse_code() {
                    Some(node) => push_node(&mut nodes, node),
                    None => self.push_literal_char(&mut nodes),
                },
                ':' => match self.parse_emoji() {
                    Some(node) => push_node(&mut nodes, node),
                    None => self.push_literal_char(&mut nodes),
                },
                '<' => {
                    let node = self.parse_tag()?;
                    push_node(&mut nodes, node);
                }
                _ => {
                    let text = self.parse_text(mode);
                    push_node(&mut nodes, MarkupNode::Text(text));
                }
            }
        }
        Ok(nodes)
    }

    /// Consume a run of plain text up to the next construct delimiter.
    /// Newlines end the run; block-level modes consume the newline so
    /// the main loop re-checks for fences and quotes at the line start.
    fn parse_text(&mut self, mode: Mode) -> String {
        let start = self.position;
        while let Some(c) = self.peek() {
            if matches!(c, '*' | '_' | '~' | '`' | ':' | '<') {
                break;
            }
            if c == '\n' {
                match mode {
                    Mode::Block | Mode::Inline => {
                        self.consume();
                    }
                    Mode::QuoteLine | Mode::Delim(_) => {}
                }
                break;
            }
            self.consume();
        }
        self.input[start..self.position].to_string()
    }

    /// Parse `*bold*`, `_italic_` or `~strike~`.
    ///
    /// Commits only when a matching delimiter closes non-empty content
    /// on the same line; otherwise backtracks and returns None so the
    /// caller emits the delimiter as literal text.
    fn parse_emphasis(&mut self, delim: char) -> MrkdwnResult<Option<MarkupNode>> {
        let start = self.position;
        self.consume(); // opening delimiter
        let children = self.parse_nodes(Mode::Delim(delim))?;
        if self.peek() == Some(delim) && !children.is_empty() {
            self.consume();
            let node = match delim {
                '*' => MarkupNode::Bold(children),
                '_' => MarkupNode::Italic(children),
                _ => MarkupNode::Strike(children),
            };
            Ok(Some(node))
        } else {
            self.position = start;
            Ok(None)
        }
    }

    /// Parse an inline code span. Content is literal.
    fn parse_code(&mut self) -> Option<MarkupNode> {
        let start = self.position;
        self.consume(); // '`'
        let rest = self.rest();
        let line_end = rest.find('\n').unwrap_or(rest.len());
        match rest[..line_end].find('`') {
            Some(0) | None => {
                self.position = start;
                None
            }
            Some(close) => {
                let content = rest[..close].to_string();
                self.position += close + 1;
                Some(MarkupNode::Code(content))
            }
        }
    }

    /// Parse `:emoji_name:`.
    fn parse_emoji(&mut self) -> Option<MarkupNode> {
        let start = self.position;
        self.consume(); // ':'
        let rest = self.rest();
        let end = rest
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || matches!(ch, '_' | '+' | '-')))
            .unwrap_or(rest.len());
        if end > 0 && rest[end..].starts_with(':') {
            let name = rest[..end].to_string();
            self.position += end + 1;
            Some(MarkupNode::Emoji(name))
        } else {
            self.position = start;
            None
        }
    }

    /// Parse a fenced code block. An unterminated fence consumes the
    /// remainder of the input as literal text.
    fn parse_pretext(&mut self) -> MarkupNode {
        let start = self.position;
        self.position += 3; // opening ```
        let rest = self.rest();
        match rest.find("```") {
            Some(close) => {
                let content = rest[..close].to_string();
                self.position += close + 3;
                MarkupNode::PreText(content)
            }
            None => {
                let text = self.input[start..].to_string();
                self.position = self.input.len();
                MarkupNode::Text(text)
            }
        }
    }

    /// Parse an angle-bracket tag: a comment, or a URL / channel /
    /// user / command reference with an optional `|label`.
    fn parse_tag(&mut self) -> MrkdwnResult<MarkupNode> {
        let start = self.position;
        self.consume(); // '<'
        if self.rest().starts_with("!--") {
            return self.parse_comment(start);
        }
        let rest = self.rest();
        let end = match rest.find('>') {
            Some(end) => end,
            None => return Err(self.malformed_tag(start, "unterminated tag")),
        };
        let content = &rest[..end];
        if content.is_empty() {
            return Err(self.malformed_tag(start, "empty tag"));
        }
        if content.contains('<') || content.contains('\n') {
            return Err(self.malformed_tag(start, "unterminated tag"));
        }
        let (target, label) = match content.find('|') {
            Some(bar) => (&content[..bar], Some(&content[bar + 1..])),
            None => (content, None),
        };
        if target.is_empty() {
            return Err(self.malformed_tag(start, "tag has an empty target"));
        }
        let label_nodes = match label {
            Some(text) => Some(Parser::new(text).parse_nodes(Mode::Inline)?),
            None => None,
        };
        self.position += end + 1;
        let node = match target.chars().next() {
            Some('#') => MarkupNode::ChannelLink {
                target: target[1..].to_string(),
                label: label_nodes,
            },
            Some('@') => MarkupNode::UserLink {
                target: target[1..].to_string(),
                label: label_nodes,
            },
            Some('!') => MarkupNode::Command {
                name: target[1..].to_string(),
                label: label_nodes,
            },
            _ => MarkupNode::Url {
                target: target.to_string(),
                label: label_nodes,
            },
        };
        Ok(node)
    }

    /// Parse `<!-- ... -->`. The position passed in points at the `<`.
    fn parse_comment(&mut self, start: usize) -> MrkdwnResult<MarkupNode> {
        self.position += 3; // !--
        let rest = self.rest();
        match rest.find("-->") {
            Some(end) => {
                let body = rest[..end].to_string();
                self.position += end + 3;
                Ok(MarkupNode::Comment(body))
            }
            None => Err(self.malformed_tag(start, "unterminated comment")),
        }
    }

    fn malformed_tag(&self, offset: usize, message: &str) -> MrkdwnError {
        let (line, column) = line_col(self.input, offset);
        MrkdwnError::MalformedTag {
            line,
            column,
            message: message.to_string(),
        }
    }

    fn push_literal_char(&mut self, nodes: &mut Vec<MarkupNode>) {
        if let Some(c) = self.consume() {
            push_node(nodes, MarkupNode::Text(c.to_string()));
        }
    }
}

/// Append a node, merging adjacent text runs.
fn push_node(nodes: &mut Vec<MarkupNode>, node: MarkupNode) {
    if let MarkupNode::Text(text) = &node {
        if let Some(MarkupNode::Text(prev)) = nodes.last_mut() {
            prev.push_str(text);
            return;
        }
    }
    nodes.push(node);
}

/// 1-based line and column of a byte offset in `input`.
pub(crate) fn line_col(input: &str, offset: usize) -> (usize, usize) {
    let before = &input[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before.chars().rev().take_while(|&c| c != '\n').count() + 1;
    (line, column)
}
