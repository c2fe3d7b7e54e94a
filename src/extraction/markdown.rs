//! HTML to Markdown conversion
//!
//! A DOM walk over a `scraper` fragment that emits Markdown with a fixed
//! style: ATX headings, `---` rules, `-` bullets, fenced code blocks, `*`
//! emphasis and `**` strong emphasis. `script`, `style`, `noscript` and
//! `iframe` are always dropped; images are dropped unless enabled.

use crate::error::{ExtractionError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::borrow::Cow;
use std::sync::OnceLock;
use tracing::{debug, instrument};

/// Bullet list marker
pub const BULLET_MARKER: &str = "-";

/// Horizontal rule
pub const HORIZONTAL_RULE: &str = "---";

/// Emphasis delimiter
pub const EM_DELIMITER: &str = "*";

/// Strong emphasis delimiter
pub const STRONG_DELIMITER: &str = "**";

/// Elements never converted, whatever the options
pub const ALWAYS_REMOVED: [&str; 4] = ["script", "style", "noscript", "iframe"];

/// Deepest element nesting the converter will follow
pub const MAX_NESTING_DEPTH: usize = 512;

/// Metadata-only elements that carry no body content
const NON_CONTENT: [&str; 5] = ["head", "title", "meta", "link", "template"];

const BLOCK_ELEMENTS: [&str; 21] = [
    "p",
    "div",
    "section",
    "article",
    "main",
    "header",
    "footer",
    "nav",
    "aside",
    "figure",
    "figcaption",
    "address",
    "details",
    "summary",
    "form",
    "fieldset",
    "dl",
    "dt",
    "dd",
    "center",
    "hgroup",
];

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\r\n\x0C]+").expect("valid whitespace pattern"))
}

fn ordered_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\. ").expect("valid ordered marker pattern"))
}

fn atx_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#{1,6}( |$)").expect("valid heading marker pattern"))
}

/// Collapse HTML whitespace runs to a single space.
///
/// Only ASCII whitespace collapses; non-breaking spaces survive.
fn collapse_whitespace(text: &str) -> Cow<'_, str> {
    whitespace_re().replace_all(text, " ")
}

/// Escape characters with inline Markdown meaning
pub(crate) fn escape_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape markers that only mean something at the start of a line
pub(crate) fn escape_line_start(text: &str) -> Cow<'_, str> {
    if text.starts_with("- ") || text.starts_with("+ ") || text.starts_with('>') {
        return Cow::Owned(format!("\\{}", text));
    }
    if atx_marker_re().is_match(text) {
        return Cow::Owned(format!("\\{}", text));
    }
    ordered_marker_re().replace(text, "$1\\. ")
}

/// Longest run of consecutive backticks
pub(crate) fn max_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Backtick run opening a code fence, if `line` is one.
///
/// The info string after the run may not contain backticks, otherwise the
/// line is inline code that happens to start a line.
fn fence_opener(line: &str) -> Option<&str> {
    let run_len = line.chars().take_while(|c| *c == '`').count();
    if run_len < 3 {
        return None;
    }
    let (run, info) = line.split_at(run_len);
    (!info.contains('`')).then_some(run)
}

/// Normalise blank lines and trailing whitespace outside code fences
pub(crate) fn tidy(markdown: &str) -> String {
    let mut lines: Vec<(String, bool)> = Vec::new();
    let mut fence: Option<String> = None;

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        match &fence {
            Some(open) => {
                let closes = trimmed.trim_end().len() >= open.len()
                    && trimmed.trim_end().chars().all(|c| c == '`');
                lines.push((line.to_string(), true));
                if closes {
                    fence = None;
                }
            }
            None => {
                if let Some(run) = fence_opener(trimmed) {
                    fence = Some(run.to_string());
                    lines.push((line.trim_end().to_string(), true));
                } else if line.trim().is_empty() {
                    match lines.last_mut() {
                        None => {}
                        Some((prev, _)) if prev.is_empty() => {}
                        Some((prev, fenced)) => {
                            if !*fenced {
                                let end = prev.trim_end().len();
                                prev.truncate(end);
                            }
                            lines.push((String::new(), false));
                        }
                    }
                } else {
                    lines.push((line.to_string(), false));
                }
            }
        }
    }

    if let Some((last, false)) = lines.last_mut() {
        let end = last.trim_end().len();
        last.truncate(end);
    }

    let joined = lines
        .into_iter()
        .map(|(line, _)| line)
        .collect::<Vec<_>>()
        .join("\n");
    joined.trim().to_string()
}

/// Output under construction for one container
struct Buffer {
    out: String,
    /// Inline buffers keep leading whitespace so wrappers can move it
    /// outside their delimiters
    inline: bool,
}

impl Buffer {
    fn block() -> Self {
        Self {
            out: String::new(),
            inline: false,
        }
    }

    fn inline() -> Self {
        Self {
            out: String::new(),
            inline: true,
        }
    }

    fn at_line_start(&self) -> bool {
        (self.out.is_empty() && !self.inline) || self.out.ends_with('\n')
    }

    fn skips_leading_space(&self) -> bool {
        self.at_line_start() || self.out.ends_with(' ')
    }

    /// Escaped text content
    fn text(&mut self, text: &str) {
        let text = if self.skips_leading_space() {
            text.trim_start_matches(' ')
        } else {
            text
        };
        if text.is_empty() {
            return;
        }
        if self.at_line_start() {
            let escaped = escape_line_start(text);
            self.out.push_str(&escaped);
        } else {
            self.out.push_str(text);
        }
    }

    /// Already formatted inline Markdown
    fn inline_markdown(&mut self, markdown: &str) {
        let markdown = if self.skips_leading_space() {
            markdown.trim_start_matches(' ')
        } else {
            markdown
        };
        if markdown.is_empty() {
            return;
        }
        if markdown.starts_with('[') && self.out.ends_with('!') {
            self.out.pop();
            self.out.push_str("\\!");
        }
        self.out.push_str(markdown);
    }

    fn raw(&mut self, markdown: &str) {
        self.out.push_str(markdown);
    }

    fn trim_trailing_spaces(&mut self) {
        let end = self.out.trim_end_matches(' ').len();
        self.out.truncate(end);
    }

    fn block_break(&mut self) {
        self.trim_trailing_spaces();
        if self.out.is_empty() {
            return;
        }
        let newlines = self.out.len() - self.out.trim_end_matches('\n').len();
        for _ in newlines..2 {
            self.out.push('\n');
        }
    }

    fn line_break(&mut self) {
        self.trim_trailing_spaces();
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn hard_break(&mut self) {
        self.trim_trailing_spaces();
        self.out.push_str("  \n");
    }

    fn finish(self) -> String {
        self.out
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Context {
    in_list_item: bool,
}

/// Split surrounding ASCII whitespace off `content`
fn split_padding(content: &str) -> (&'static str, &str, &'static str) {
    let trimmed = content.trim_matches(|c: char| c.is_ascii_whitespace());
    let lead = if content.starts_with(|c: char| c.is_ascii_whitespace()) {
        " "
    } else {
        ""
    };
    let trail = if content.ends_with(|c: char| c.is_ascii_whitespace()) {
        " "
    } else {
        ""
    };
    (lead, trimmed, trail)
}

/// Converts HTML fragments to Markdown
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownConverter {
    include_images: bool,
}

impl MarkdownConverter {
    /// Create a converter; `include_images` keeps `<img>` as image syntax
    pub fn new(include_images: bool) -> Self {
        Self { include_images }
    }

    /// Whether images are kept
    pub fn include_images(&self) -> bool {
        self.include_images
    }

    /// Convert an HTML fragment to Markdown
    #[instrument(skip_all, fields(len = html.len()))]
    pub fn convert(&self, html: &str) -> Result<String> {
        let fragment = Html::parse_fragment(html);
        let mut buf = Buffer::block();
        self.walk_children(fragment.root_element(), &mut buf, Context::default(), 0)?;
        let markdown = tidy(&buf.finish());
        debug!("Converted {} bytes of HTML to {} bytes of Markdown", html.len(), markdown.len());
        Ok(markdown)
    }

    fn is_removed(&self, tag: &str) -> bool {
        ALWAYS_REMOVED.contains(&tag)
            || NON_CONTENT.contains(&tag)
            || (!self.include_images && tag == "img")
    }

    fn walk_children(
        &self,
        el: ElementRef<'_>,
        buf: &mut Buffer,
        ctx: Context,
        depth: usize,
    ) -> Result<()> {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => {
                    let collapsed = collapse_whitespace(text);
                    buf.text(&escape_inline(&collapsed));
                }
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.walk_element(child, buf, ctx, depth + 1)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn walk_element(
        &self,
        el: ElementRef<'_>,
        buf: &mut Buffer,
        ctx: Context,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_NESTING_DEPTH {
            return Err(ExtractionError::ConversionFailed(format!(
                "element nesting exceeds {} levels",
                MAX_NESTING_DEPTH
            ))
            .into());
        }

        let tag = el.value().name();
        if self.is_removed(tag) {
            return Ok(());
        }

        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => self.heading(el, tag, buf, ctx, depth),
            "br" => {
                buf.hard_break();
                Ok(())
            }
            "hr" => {
                buf.block_break();
                buf.raw(HORIZONTAL_RULE);
                buf.block_break();
                Ok(())
            }
            "ul" | "ol" => {
                let list = self.list(el, tag == "ol", depth)?;
                if !list.is_empty() {
                    self.place_list(buf, &list, ctx);
                }
                Ok(())
            }
            "li" => {
                let item = self.list_item(el, &format!("{} ", BULLET_MARKER), depth)?;
                self.place_list(buf, &item, ctx);
                Ok(())
            }
            "blockquote" => self.blockquote(el, buf, ctx, depth),
            "pre" => {
                buf.block_break();
                buf.raw(&Self::fenced_code(el));
                buf.block_break();
                Ok(())
            }
            "code" => {
                if let Some(code) = Self::inline_code(el) {
                    buf.inline_markdown(&code);
                }
                Ok(())
            }
            "em" | "i" => self.emphasis(el, EM_DELIMITER, buf, ctx, depth),
            "strong" | "b" => self.emphasis(el, STRONG_DELIMITER, buf, ctx, depth),
            "a" => self.link(el, buf, ctx, depth),
            "img" => {
                if let Some(image) = Self::image(el) {
                    buf.inline_markdown(&image);
                }
                Ok(())
            }
            "table" => self.table(el, buf, depth),
            _ if BLOCK_ELEMENTS.contains(&tag) => {
                buf.block_break();
                self.walk_children(el, buf, ctx, depth)?;
                buf.block_break();
                Ok(())
            }
            _ => self.walk_children(el, buf, ctx, depth),
        }
    }

    fn heading(
        &self,
        el: ElementRef<'_>,
        tag: &str,
        buf: &mut Buffer,
        ctx: Context,
        depth: usize,
    ) -> Result<()> {
        let level = usize::from(tag.as_bytes()[1] - b'0');
        let mut inner = Buffer::block();
        self.walk_children(el, &mut inner, ctx, depth)?;
        let content = inner
            .finish()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if content.is_empty() {
            return Ok(());
        }
        buf.block_break();
        buf.raw(&format!("{} {}", "#".repeat(level), content));
        buf.block_break();
        Ok(())
    }

    fn place_list(&self, buf: &mut Buffer, list: &str, ctx: Context) {
        if ctx.in_list_item {
            buf.line_break();
            buf.raw(list);
            buf.line_break();
        } else {
            buf.block_break();
            buf.raw(list);
            buf.block_break();
        }
    }

    fn list(&self, el: ElementRef<'_>, ordered: bool, depth: usize) -> Result<String> {
        let start = if ordered {
            el.value()
                .attr("start")
                .and_then(|s| s.trim().parse::<i64>().ok())
                .unwrap_or(1)
        } else {
            1
        };

        let mut items = Vec::new();
        let mut index = 0;
        for child in el.children().filter_map(ElementRef::wrap) {
            let name = child.value().name();
            if name == "li" {
                let marker = if ordered {
                    format!("{}. ", start.saturating_add(index))
                } else {
                    format!("{} ", BULLET_MARKER)
                };
                index += 1;
                items.push(self.list_item(child, &marker, depth + 1)?);
            } else if !self.is_removed(name) {
                let mut inner = Buffer::block();
                let nested = Context { in_list_item: true };
                self.walk_element(child, &mut inner, nested, depth + 1)?;
                let content = tidy(&inner.finish());
                if !content.is_empty() {
                    items.push(content);
                }
            }
        }
        Ok(items.join("\n"))
    }

    fn list_item(&self, el: ElementRef<'_>, marker: &str, depth: usize) -> Result<String> {
        let mut inner = Buffer::block();
        let ctx = Context { in_list_item: true };
        self.walk_children(el, &mut inner, ctx, depth)?;
        let content = inner.finish();
        let content = content.trim_matches(|c: char| c == '\n' || c == ' ');

        let indent = " ".repeat(marker.len());
        let mut item = marker.to_string();
        for (i, line) in content.lines().enumerate() {
            if i > 0 {
                item.push('\n');
                if !line.is_empty() {
                    item.push_str(&indent);
                }
            }
            item.push_str(line);
        }
        Ok(item.trim_end().to_string())
    }

    fn blockquote(
        &self,
        el: ElementRef<'_>,
        buf: &mut Buffer,
        ctx: Context,
        depth: usize,
    ) -> Result<()> {
        let mut inner = Buffer::block();
        self.walk_children(el, &mut inner, ctx, depth)?;
        let content = tidy(&inner.finish());
        if content.is_empty() {
            return Ok(());
        }
        let quoted = content
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {}", line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        buf.block_break();
        buf.raw(&quoted);
        buf.block_break();
        Ok(())
    }

    fn code_language(el: ElementRef<'_>) -> Option<String> {
        let from_classes = |el: ElementRef<'_>| {
            el.value().classes().find_map(|class| {
                class
                    .strip_prefix("language-")
                    .or_else(|| class.strip_prefix("lang-"))
                    .filter(|lang| !lang.is_empty())
                    .map(str::to_string)
            })
        };
        el.children()
            .filter_map(ElementRef::wrap)
            .find(|child| child.value().name() == "code")
            .and_then(from_classes)
            .or_else(|| from_classes(el))
    }

    fn fenced_code(el: ElementRef<'_>) -> String {
        let code = el.text().collect::<String>();
        let code = code.strip_suffix('\n').unwrap_or(&code);
        let fence = "`".repeat((max_backtick_run(code) + 1).max(3));
        let language = Self::code_language(el).unwrap_or_default();
        format!("{}{}\n{}\n{}", fence, language, code, fence)
    }

    fn inline_code(el: ElementRef<'_>) -> Option<String> {
        let code = el
            .text()
            .collect::<String>()
            .replace("\r\n", " ")
            .replace(['\n', '\r'], " ");
        if code.is_empty() {
            return None;
        }
        let delimiter = "`".repeat(max_backtick_run(&code) + 1);
        let padded = code.starts_with('`')
            || code.ends_with('`')
            || (code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty());
        let pad = if padded { " " } else { "" };
        Some(format!("{0}{1}{2}{1}{0}", delimiter, pad, code))
    }

    fn emphasis(
        &self,
        el: ElementRef<'_>,
        delimiter: &str,
        buf: &mut Buffer,
        ctx: Context,
        depth: usize,
    ) -> Result<()> {
        let mut inner = Buffer::inline();
        self.walk_children(el, &mut inner, ctx, depth)?;
        let content = inner.finish();
        let (lead, trimmed, trail) = split_padding(&content);
        if trimmed.is_empty() {
            if !content.is_empty() {
                buf.text(" ");
            }
            return Ok(());
        }
        buf.inline_markdown(&format!("{lead}{delimiter}{trimmed}{delimiter}{trail}"));
        Ok(())
    }

    fn link(&self, el: ElementRef<'_>, buf: &mut Buffer, ctx: Context, depth: usize) -> Result<()> {
        let mut inner = Buffer::inline();
        self.walk_children(el, &mut inner, ctx, depth)?;
        let content = inner.finish();

        let href = el.value().attr("href").map(str::trim).unwrap_or_default();
        if href.is_empty() {
            buf.inline_markdown(&content);
            return Ok(());
        }

        let (lead, text, trail) = split_padding(&content);
        if text.is_empty() {
            return Ok(());
        }
        let href = href.replace('(', "\\(").replace(')', "\\)");
        let title = el
            .value()
            .attr("title")
            .map(|t| format!(" \"{}\"", collapse_whitespace(t).replace('"', "\\\"")))
            .unwrap_or_default();
        buf.inline_markdown(&format!("{lead}[{text}]({href}{title}){trail}"));
        Ok(())
    }

    fn image(el: ElementRef<'_>) -> Option<String> {
        let src = el.value().attr("src").map(str::trim).filter(|s| !s.is_empty())?;
        let alt = el
            .value()
            .attr("alt")
            .map(|a| escape_inline(collapse_whitespace(a).trim()))
            .unwrap_or_default();
        let title = el
            .value()
            .attr("title")
            .map(|t| format!(" \"{}\"", collapse_whitespace(t).replace('"', "\\\"")))
            .unwrap_or_default();
        Some(format!(
            "![{}]({}{})",
            alt,
            src.replace('(', "\\(").replace(')', "\\)"),
            title
        ))
    }

    fn table(&self, el: ElementRef<'_>, buf: &mut Buffer, depth: usize) -> Result<()> {
        let mut caption = None;
        let mut rows: Vec<Vec<String>> = Vec::new();

        let mut row_elements = Vec::new();
        for child in el.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "caption" => caption = Some(child),
                "tr" => row_elements.push(child),
                "thead" | "tbody" | "tfoot" => row_elements.extend(
                    child
                        .children()
                        .filter_map(ElementRef::wrap)
                        .filter(|r| r.value().name() == "tr"),
                ),
                _ => {}
            }
        }

        for row in row_elements {
            let mut cells = Vec::new();
            for cell in row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "th" | "td"))
            {
                let mut inner = Buffer::inline();
                self.walk_children(cell, &mut inner, Context::default(), depth + 2)?;
                let text = inner
                    .finish()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .replace('|', "\\|");
                cells.push(text);
            }
            if !cells.is_empty() {
                rows.push(cells);
            }
        }

        if let Some(caption) = caption {
            let mut inner = Buffer::block();
            self.walk_children(caption, &mut inner, Context::default(), depth + 1)?;
            let text = tidy(&inner.finish());
            if !text.is_empty() {
                buf.block_break();
                buf.raw(&text);
                buf.block_break();
            }
        }

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return Ok(());
        }

        let render_row = |cells: &[String]| {
            let padded = (0..columns)
                .map(|i| cells.get(i).map(String::as_str).unwrap_or(""))
                .collect::<Vec<_>>();
            format!("| {} |", padded.join(" | "))
        };

        let mut lines = vec![render_row(&rows[0])];
        lines.push(format!("|{}", " --- |".repeat(columns)));
        lines.extend(rows[1..].iter().map(|row| render_row(row)));

        buf.block_break();
        buf.raw(&lines.join("\n"));
        buf.block_break();
        Ok(())
    }
}
