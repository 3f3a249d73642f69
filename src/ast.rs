//! The mrkdwn abstract syntax tree.
//!
//! One closed sum type covers every construct the parser can produce.
//! Container variants own their children; leaf variants own literal
//! content. Nodes are immutable once parsed: extraction and localization
//! read them, clone the ones they lift into placeholder side-tables, and
//! never mutate the canonical tree. Exhaustive matches everywhere mean a
//! new markup construct cannot be silently ignored downstream.

/// A single node of parsed mrkdwn.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    /// Root of one parsed value
    Document(Vec<MarkupNode>),
    /// Literal text run
    Text(String),
    /// `_..._`
    Italic(Vec<MarkupNode>),
    /// `*...*`
    Bold(Vec<MarkupNode>),
    /// `~...~`
    Strike(Vec<MarkupNode>),
    /// `>` to the end of the line
    Quote(Vec<MarkupNode>),
    /// Fenced code block; content is literal and never translated
    PreText(String),
    /// Inline code span; content is literal and never translated
    Code(String),
    /// `:name:`
    Emoji(String),
    /// `<url>` or `<url|label>`
    Url {
        target: String,
        label: Option<Vec<MarkupNode>>,
    },
    /// `<#C...>` or `<#C...|label>`
    ChannelLink {
        target: String,
        label: Option<Vec<MarkupNode>>,
    },
    /// `<@U...>` or `<@U...|label>`
    UserLink {
        target: String,
        label: Option<Vec<MarkupNode>>,
    },
    /// `<!here>` or `<!here|label>`
    Command {
        name: String,
        label: Option<Vec<MarkupNode>>,
    },
    /// `<!-- ... -->`; a body matching the i18n pattern supplies the
    /// translator comment of the next extracted resource
    Comment(String),
}

impl MarkupNode {
    /// Render the node back to its original mrkdwn syntax.
    ///
    /// This is the exact inverse of the parser: for any tree the parser
    /// produces, rendering the document node yields the input string
    /// bit-for-bit.
    pub fn render(&self) -> String {
        match self {
            MarkupNode::Document(children) => render_all(children),
            MarkupNode::Text(text) => text.clone(),
            MarkupNode::Italic(children) => format!("_{}_", render_all(children)),
            MarkupNode::Bold(children) => format!("*{}*", render_all(children)),
            MarkupNode::Strike(children) => format!("~{}~", render_all(children)),
            MarkupNode::Quote(children) => format!(">{}", render_all(children)),
            MarkupNode::PreText(content) => format!("```{}```", content),
            MarkupNode::Code(content) => format!("`{}`", content),
            MarkupNode::Emoji(name) => format!(":{}:", name),
            MarkupNode::Url { target, label } => render_reference(target, label, ""),
            MarkupNode::ChannelLink { target, label } => render_reference(target, label, "#"),
            MarkupNode::UserLink { target, label } => render_reference(target, label, "@"),
            MarkupNode::Command { name, label } => render_reference(name, label, "!"),
            MarkupNode::Comment(body) => format!("<!--{}-->", body),
        }
    }

    /// Opening syntax for a paired wrapper (e.g. `*` for bold,
    /// `<url|` for a labeled link). Empty for non-wrapping variants.
    pub fn open_syntax(&self) -> String {
        match self {
            MarkupNode::Italic(_) => "_".to_string(),
            MarkupNode::Bold(_) => "*".to_string(),
            MarkupNode::Strike(_) => "~".to_string(),
            MarkupNode::Quote(_) => ">".to_string(),
            MarkupNode::Url { target, .. } => format!("<{}|", target),
            MarkupNode::ChannelLink { target, .. } => format!("<#{}|", target),
            MarkupNode::UserLink { target, .. } => format!("<@{}|", target),
            MarkupNode::Command { name, .. } => format!("<!{}|", name),
            _ => String::new(),
        }
    }

    /// Closing syntax for a paired wrapper. Empty for non-wrapping
    /// variants and for quotes, which have no trailing marker.
    pub fn close_syntax(&self) -> String {
        match self {
            MarkupNode::Italic(_) => "_".to_string(),
            MarkupNode::Bold(_) => "*".to_string(),
            MarkupNode::Strike(_) => "~".to_string(),
            MarkupNode::Quote(_) => String::new(),
            MarkupNode::Url { .. }
            | MarkupNode::ChannelLink { .. }
            | MarkupNode::UserLink { .. }
            | MarkupNode::Command { .. } => ">".to_string(),
            _ => String::new(),
        }
    }

    /// Wrap already-localized inner text in this node's original syntax.
    pub fn wrap(&self, inner: &str) -> String {
        format!("{}{}{}", self.open_syntax(), inner, self.close_syntax())
    }
}

fn render_all(children: &[MarkupNode]) -> String {
    children.iter().map(MarkupNode::render).collect()
}

fn render_reference(target: &str, label: &Option<Vec<MarkupNode>>, sigil: &str) -> String {
    match label {
        Some(children) => format!("<{}{}|{}>", sigil, target, render_all(children)),
        None => format!("<{}{}>", sigil, target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_text() {
        let node = MarkupNode::Text("Hello, World!".to_string());
        assert_eq!(node.render(), "Hello, World!");
    }

    #[test]
    fn test_render_nested_emphasis() {
        let node = MarkupNode::Bold(vec![
            MarkupNode::Text("a ".to_string()),
            MarkupNode::Italic(vec![MarkupNode::Text("b".to_string())]),
        ]);
        assert_eq!(node.render(), "*a _b_*");
    }

    #[test]
    fn test_render_references() {
        let bare = MarkupNode::Url {
            target: "https://example.com".to_string(),
            label: None,
        };
        assert_eq!(bare.render(), "<https://example.com>");

        let labeled = MarkupNode::Url {
            target: "https://example.com".to_string(),
            label: Some(vec![MarkupNode::Text("example".to_string())]),
        };
        assert_eq!(labeled.render(), "<https://example.com|example>");

        let channel = MarkupNode::ChannelLink {
            target: "C012AB3CD".to_string(),
            label: None,
        };
        assert_eq!(channel.render(), "<#C012AB3CD>");

        let user = MarkupNode::UserLink {
            target: "U012AB3CD".to_string(),
            label: Some(vec![MarkupNode::Text("maria".to_string())]),
        };
        assert_eq!(user.render(), "<@U012AB3CD|maria>");

        let command = MarkupNode::Command {
            name: "here".to_string(),
            label: None,
        };
        assert_eq!(command.render(), "<!here>");
    }

    #[test]
    fn test_render_code_and_emoji() {
        assert_eq!(MarkupNode::Code("cmd".to_string()).render(), "`cmd`");
        assert_eq!(
            MarkupNode::PreText("\nlet x = 1;\n".to_string()).render(),
            "```\nlet x = 1;\n```"
        );
        assert_eq!(MarkupNode::Emoji("tada".to_string()).render(), ":tada:");
    }

    #[test]
    fn test_wrap_regenerates_original_syntax() {
        let bold = MarkupNode::Bold(vec![MarkupNode::Text("test".to_string())]);
        assert_eq!(bold.wrap("essai"), "*essai*");

        let link = MarkupNode::Url {
            target: "https://example.com".to_string(),
            label: Some(vec![MarkupNode::Text("label".to_string())]),
        };
        assert_eq!(link.wrap("étiquette"), "<https://example.com|étiquette>");

        let quote = MarkupNode::Quote(vec![MarkupNode::Text("q".to_string())]);
        assert_eq!(quote.wrap("citation"), ">citation");
    }
}
