//! Lightweight markdown rendering for assistant replies
//!
//! Conversion runs in two explicit passes:
//!
//! 1. Each line is classified ([`LineKind`]) and lines are grouped into
//!    [`Block`]s. A fence state machine keeps the content of fenced code
//!    verbatim; consecutive list items of any marker collapse into one list;
//!    runs of text separated by blank lines become paragraphs.
//! 2. Heading, list item and paragraph text goes through an inline pass
//!    ([`parse_inline`]): inline code first, then bold, then italic.
//!
//! The block tree is then emitted as HTML ([`render_html`]) or as ANSI
//! styled text for the terminal ([`render_terminal`]). Input that is not
//! well-formed markdown is rendered best-effort.

use colored::Colorize;
use regex::Regex;
use std::sync::OnceLock;

/// Classification of a single input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `#`, `##` or `###` followed by a space and text
    Heading { level: u8, text: &'a str },
    /// Opening code fence with an optional language tag
    FenceOpen { lang: Option<&'a str> },
    /// Closing code fence (only recognised inside a fence)
    FenceClose,
    /// Line inside a fence, kept verbatim
    Code(&'a str),
    /// `* item`, `- item` or `1. item`
    ListItem(&'a str),
    Blank,
    Text(&'a str),
}

/// Block-level element produced by the first pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Code { lang: Option<String>, body: String },
    List(Vec<String>),
    Paragraph(String),
}

/// Inline span produced by the second pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,3}) (.+)$").expect("valid heading regex"))
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^```(\w+)?\s*$").expect("valid fence regex"))
}

fn list_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:[*-]|\d+\.) (.+)$").expect("valid list regex"))
}

fn inline_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("valid code regex"))
}

fn strong_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").expect("valid strong regex"))
}

fn emphasis_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*(.+?)\*|_(.+?)_").expect("valid emphasis regex"))
}

/// Classify one line given whether a code fence is currently open
///
/// # Examples
///
/// ```
/// use kfupm_chat::markdown::{classify_line, LineKind};
///
/// assert_eq!(
///     classify_line("## Fees", false),
///     LineKind::Heading { level: 2, text: "Fees" }
/// );
/// assert_eq!(classify_line("- item", false), LineKind::ListItem("item"));
/// assert_eq!(classify_line("- item", true), LineKind::Code("- item"));
/// ```
pub fn classify_line(line: &str, in_fence: bool) -> LineKind<'_> {
    if in_fence {
        if line.trim_start().starts_with("```") {
            return LineKind::FenceClose;
        }
        return LineKind::Code(line);
    }

    if let Some(caps) = fence_re().captures(line.trim_end()) {
        return LineKind::FenceOpen {
            lang: caps.get(1).map(|m| m.as_str()),
        };
    }

    if line.trim().is_empty() {
        return LineKind::Blank;
    }

    if let Some(caps) = heading_re().captures(line) {
        let level = caps.get(1).map_or(1, |m| m.as_str().len()) as u8;
        let text = caps.get(2).map_or("", |m| m.as_str());
        return LineKind::Heading { level, text };
    }

    if let Some(caps) = list_item_re().captures(line) {
        return LineKind::ListItem(caps.get(1).map_or("", |m| m.as_str()));
    }

    LineKind::Text(line)
}

/// First pass: group classified lines into blocks
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut list: Vec<String> = Vec::new();
    let mut fence: Option<(Option<String>, Vec<&str>)> = None;

    fn flush_paragraph(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join("\n")));
            paragraph.clear();
        }
    }

    fn flush_list(list: &mut Vec<String>, blocks: &mut Vec<Block>) {
        if !list.is_empty() {
            blocks.push(Block::List(std::mem::take(list)));
        }
    }

    for line in text.lines() {
        match classify_line(line, fence.is_some()) {
            LineKind::Code(code) => {
                if let Some((_, body)) = fence.as_mut() {
                    body.push(code);
                }
            }
            LineKind::FenceClose => {
                if let Some((lang, body)) = fence.take() {
                    blocks.push(Block::Code {
                        lang,
                        body: body.join("\n"),
                    });
                }
            }
            LineKind::FenceOpen { lang } => {
                flush_paragraph(&mut paragraph, &mut blocks);
                flush_list(&mut list, &mut blocks);
                fence = Some((lang.map(str::to_string), Vec::new()));
            }
            LineKind::Heading { level, text } => {
                flush_paragraph(&mut paragraph, &mut blocks);
                flush_list(&mut list, &mut blocks);
                blocks.push(Block::Heading {
                    level,
                    text: text.to_string(),
                });
            }
            LineKind::ListItem(item) => {
                flush_paragraph(&mut paragraph, &mut blocks);
                list.push(item.to_string());
            }
            LineKind::Blank => {
                flush_paragraph(&mut paragraph, &mut blocks);
                flush_list(&mut list, &mut blocks);
            }
            LineKind::Text(line) => {
                flush_list(&mut list, &mut blocks);
                paragraph.push(line);
            }
        }
    }

    // An unterminated fence runs to the end of the reply.
    if let Some((lang, body)) = fence.take() {
        blocks.push(Block::Code {
            lang,
            body: body.join("\n"),
        });
    }
    flush_paragraph(&mut paragraph, &mut blocks);
    flush_list(&mut list, &mut blocks);

    blocks
}

/// Second pass: split text into inline spans
///
/// Inline code is matched first and its content is never styled; bold is
/// matched before italic so `**x**` is not read as two empty emphases.
///
/// # Examples
///
/// ```
/// use kfupm_chat::markdown::{parse_inline, Inline};
///
/// let spans = parse_inline("use `a*b*c` here");
/// assert_eq!(spans[1], Inline::Code("a*b*c".to_string()));
/// ```
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in inline_code_re().captures_iter(text) {
        let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        spans.extend(parse_strong(&text[last..whole.start()]));
        spans.push(Inline::Code(code.as_str().to_string()));
        last = whole.end();
    }
    spans.extend(parse_strong(&text[last..]));
    spans
}

fn parse_strong(text: &str) -> Vec<Inline> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in strong_re().captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        spans.extend(parse_emphasis(&text[last..whole.start()]));
        spans.push(Inline::Strong(parse_emphasis(inner)));
        last = whole.end();
    }
    spans.extend(parse_emphasis(&text[last..]));
    spans
}

fn parse_emphasis(text: &str) -> Vec<Inline> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in emphasis_re().captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        push_text(&mut spans, &text[last..whole.start()]);
        spans.push(Inline::Emphasis(vec![Inline::Text(inner.to_string())]));
        last = whole.end();
    }
    push_text(&mut spans, &text[last..]);
    spans
}

fn push_text(spans: &mut Vec<Inline>, text: &str) {
    if !text.is_empty() {
        spans.push(Inline::Text(text.to_string()));
    }
}

/// Escape text for inclusion in HTML element content or attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn inline_html(spans: &[Inline], out: &mut String) {
    for span in spans {
        match span {
            Inline::Text(text) => out.push_str(&escape_html(text)),
            Inline::Code(code) => {
                out.push_str("<code>");
                out.push_str(&escape_html(code));
                out.push_str("</code>");
            }
            Inline::Strong(children) => {
                out.push_str("<strong>");
                inline_html(children, out);
                out.push_str("</strong>");
            }
            Inline::Emphasis(children) => {
                out.push_str("<em>");
                inline_html(children, out);
                out.push_str("</em>");
            }
        }
    }
}

/// Render markdown to HTML
///
/// # Examples
///
/// ```
/// use kfupm_chat::markdown::render_html;
///
/// let html = render_html("# Title\n\nBody text");
/// assert_eq!(html, "<h1>Title</h1><p>Body text</p>");
/// ```
pub fn render_html(text: &str) -> String {
    blocks_to_html(&parse_blocks(text))
}

/// Emit already-parsed blocks as HTML
pub fn blocks_to_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                out.push_str(&format!("<h{}>", level));
                inline_html(&parse_inline(text), &mut out);
                out.push_str(&format!("</h{}>", level));
            }
            Block::Code { lang, body } => {
                match lang {
                    Some(lang) => out.push_str(&format!(
                        "<pre><code class=\"language-{}\">",
                        escape_html(lang)
                    )),
                    None => out.push_str("<pre><code>"),
                }
                out.push_str(&escape_html(body));
                out.push_str("</code></pre>");
            }
            Block::List(items) => {
                out.push_str("<ul>");
                for item in items {
                    out.push_str("<li>");
                    inline_html(&parse_inline(item), &mut out);
                    out.push_str("</li>");
                }
                out.push_str("</ul>");
            }
            Block::Paragraph(text) => {
                out.push_str("<p>");
                inline_html(&parse_inline(text), &mut out);
                out.push_str("</p>");
            }
        }
    }
    out
}

fn inline_terminal(spans: &[Inline], out: &mut String) {
    for span in spans {
        match span {
            Inline::Text(text) => out.push_str(text),
            Inline::Code(code) => out.push_str(&code.yellow().to_string()),
            Inline::Strong(children) => {
                let mut inner = String::new();
                inline_terminal(children, &mut inner);
                out.push_str(&inner.bold().to_string());
            }
            Inline::Emphasis(children) => {
                let mut inner = String::new();
                inline_terminal(children, &mut inner);
                out.push_str(&inner.italic().to_string());
            }
        }
    }
}

/// Render markdown as ANSI-styled text for a terminal
///
/// Blocks are separated by blank lines; list items are bulleted
/// regardless of their original marker.
pub fn render_terminal(text: &str) -> String {
    blocks_to_terminal(&parse_blocks(text))
}

/// Emit already-parsed blocks as ANSI-styled text
pub fn blocks_to_terminal(blocks: &[Block]) -> String {
    let mut rendered = Vec::new();
    for block in blocks {
        let mut out = String::new();
        match block {
            Block::Heading { level, text } => {
                let mut inner = String::new();
                inline_terminal(&parse_inline(text), &mut inner);
                let styled = match level {
                    1 => inner.bold().underline().cyan(),
                    2 => inner.bold().cyan(),
                    _ => inner.bold(),
                };
                out.push_str(&styled.to_string());
            }
            Block::Code { body, .. } => {
                let lines: Vec<String> = body
                    .lines()
                    .map(|line| format!("    {}", line.dimmed()))
                    .collect();
                out.push_str(&lines.join("\n"));
            }
            Block::List(items) => {
                let lines: Vec<String> = items
                    .iter()
                    .map(|item| {
                        let mut inner = String::new();
                        inline_terminal(&parse_inline(item), &mut inner);
                        format!("  • {}", inner)
                    })
                    .collect();
                out.push_str(&lines.join("\n"));
            }
            Block::Paragraph(text) => inline_terminal(&parse_inline(text), &mut out),
        }
        rendered.push(out);
    }
    rendered.join("\n\n")
}
