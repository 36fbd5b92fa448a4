use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use url::Url;

use crate::format::{format_markdown, FormatOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingStyle {
    /// `# Title`
    #[default]
    Atx,
    /// `Title` underlined with `===` / `---` for h1 and h2; deeper levels stay ATX.
    Setext,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Info string put on every fenced code block.
    pub code_language: String,
    pub heading_style: HeadingStyle,
    /// Render links whose text equals their target as `<url>`.
    pub autolinks: bool,
    /// Elements dropped together with their content.
    pub skip_tags: Vec<String>,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            code_language: "cpp".to_string(),
            heading_style: HeadingStyle::Atx,
            autolinks: true,
            skip_tags: ["title", "script", "style", "noscript", "template", "iframe"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

pub trait Converter: Send + Sync {
    fn to_markdown(&self, html: &str, base_url: Option<&str>) -> String;
}

/// HTML to Markdown conversion over the `scraper` tree followed by
/// [`format_markdown`]. Pure: the same input always yields the same text.
#[derive(Debug, Clone, Default)]
pub struct MarkdownConverter {
    options: MarkdownOptions,
    format: FormatOptions,
}

impl Converter for MarkdownConverter {
    fn to_markdown(&self, html: &str, base_url: Option<&str>) -> String {
        format_markdown(&self.convert_unformatted(html, base_url), &self.format)
    }
}

impl MarkdownConverter {
    pub fn new(options: MarkdownOptions, format: FormatOptions) -> Self {
        Self { options, format }
    }

    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    /// Conversion without the normalizing formatter pass.
    pub fn convert_unformatted(&self, html: &str, base_url: Option<&str>) -> String {
        let document = Html::parse_document(html);
        let base_url = base_url.and_then(|b| Url::parse(b).ok());
        let mut ctx = ConversionContext::new(base_url);

        for child in document.root_element().children() {
            self.visit_node(child, &mut ctx);
        }

        ctx.into_output()
    }

    fn visit_node(&self, node: NodeRef<'_, Node>, ctx: &mut ConversionContext) {
        match node.value() {
            Node::Text(text) => ctx.append_text(text),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    self.visit_element(element, ctx);
                }
            }
            Node::Comment(_) | Node::ProcessingInstruction(_) | Node::Doctype(_) => {}
            _ => {
                for child in node.children() {
                    self.visit_node(child, ctx);
                }
            }
        }
    }

    fn visit_element(&self, element: ElementRef, ctx: &mut ConversionContext) {
        let tag = element.value().name().to_ascii_lowercase();
        if self
            .options
            .skip_tags
            .iter()
            .any(|skip| skip.eq_ignore_ascii_case(&tag))
        {
            return;
        }

        match tag.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(tag.as_bytes()[1] - b'0');
                self.handle_heading(element, level, ctx);
            }
            "p" => {
                ctx.ensure_block_break();
                self.visit_children(element, ctx);
                ctx.ensure_block_break();
            }
            "pre" => self.handle_pre(element, ctx),
            "code" | "kbd" | "samp" | "tt" => self.handle_inline_code(element, ctx),
            "a" => self.handle_anchor(element, ctx),
            "img" => self.handle_image(element, ctx),
            "strong" | "b" => self.handle_emphasis(element, "**", ctx),
            "em" | "i" => self.handle_emphasis(element, "*", ctx),
            "br" => ctx.hard_break(),
            "hr" => {
                ctx.ensure_blank_line();
                ctx.write_str("---");
                ctx.ensure_blank_line();
            }
            "ul" | "ol" => self.handle_list(element, tag == "ol", ctx),
            "li" => self.handle_list_item(element, ctx),
            "blockquote" => {
                ctx.ensure_blank_line();
                ctx.prefixes.push("> ".to_string());
                self.visit_children(element, ctx);
                ctx.ensure_newline();
                ctx.trim_blank_prefix_line();
                ctx.prefixes.pop();
                ctx.ensure_blank_line();
            }
            "table" => {
                ctx.ensure_blank_line();
                ctx.tables.push(0);
                self.visit_children(element, ctx);
                ctx.tables.pop();
                ctx.ensure_blank_line();
            }
            "tr" => self.handle_table_row(element, ctx),
            "div" | "section" | "article" | "main" | "header" | "footer" | "nav" | "aside"
            | "figure" | "figcaption" | "address" | "details" | "summary" | "dl" | "dt" | "dd"
            | "form" | "fieldset" | "center" => {
                ctx.ensure_newline();
                self.visit_children(element, ctx);
                ctx.ensure_newline();
            }
            _ => self.visit_children(element, ctx),
        }
    }

    fn visit_children(&self, element: ElementRef, ctx: &mut ConversionContext) {
        for child in element.children() {
            self.visit_node(child, ctx);
        }
    }

    /// Render an element's children on their own as a single line of inline text.
    fn render_inline(&self, element: ElementRef, ctx: &ConversionContext) -> String {
        let mut inner = ConversionContext::new(ctx.base_url.clone());
        self.visit_children(element, &mut inner);
        collapse_whitespace(&inner.into_output())
    }

    fn handle_heading(&self, element: ElementRef, level: usize, ctx: &mut ConversionContext) {
        let text = self.render_inline(element, ctx);
        if text.is_empty() {
            return;
        }
        ctx.ensure_blank_line();
        match (self.options.heading_style, level) {
            (HeadingStyle::Setext, 1 | 2) => {
                let underline = if level == 1 { "=" } else { "-" };
                let width = text.chars().count().max(3);
                ctx.write_str(&text);
                ctx.write_str("\n");
                ctx.write_str(&underline.repeat(width));
            }
            _ => {
                ctx.write_str(&"#".repeat(level));
                ctx.write_str(" ");
                ctx.write_str(&text);
            }
        }
        ctx.ensure_blank_line();
    }

    fn handle_pre(&self, element: ElementRef, ctx: &mut ConversionContext) {
        let code: String = element.text().collect();
        let code = code.strip_prefix('\n').unwrap_or(&code).trim_end();
        let fence = "`".repeat(longest_run(code, '`').max(2) + 1);

        // Directly after a list marker the fence opens on the marker line.
        ctx.ensure_blank_line();
        ctx.write_str(&fence);
        ctx.write_str(&self.options.code_language);
        ctx.write_str("\n");
        if !code.is_empty() {
            ctx.write_str(code);
            ctx.write_str("\n");
        }
        ctx.write_str(&fence);
        ctx.ensure_blank_line();
    }

    fn handle_inline_code(&self, element: ElementRef, ctx: &mut ConversionContext) {
        let code = collapse_whitespace(&element.text().collect::<String>());
        if code.is_empty() {
            return;
        }
        let ticks = "`".repeat(longest_run(&code, '`') + 1);
        let padding = if code.starts_with('`') || code.ends_with('`') {
            " "
        } else {
            ""
        };
        ctx.write_str(&format!("{ticks}{padding}{code}{padding}{ticks}"));
    }

    fn handle_anchor(&self, element: ElementRef, ctx: &mut ConversionContext) {
        let text = self.render_inline(element, ctx);
        let plain = collapse_whitespace(&element.text().collect::<String>());
        let href = element
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty());
        let Some(href) = href else {
            ctx.write_str(&text);
            return;
        };
        let target = resolve_url(href, ctx.base_url.as_ref());

        if self.options.autolinks && (plain == href || plain == target) && is_autolinkable(&target) {
            ctx.write_str(&format!("<{target}>"));
            return;
        }
        if text.is_empty() {
            return;
        }
        match element.value().attr("title").map(str::trim) {
            Some(title) if !title.is_empty() => {
                let title = title.replace('"', "\\\"");
                ctx.write_str(&format!("[{text}]({target} \"{title}\")"));
            }
            _ => ctx.write_str(&format!("[{text}]({target})")),
        }
    }

    fn handle_image(&self, element: ElementRef, ctx: &mut ConversionContext) {
        let Some(src) = element
            .value()
            .attr("src")
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return;
        };
        let alt = element.value().attr("alt").unwrap_or("").trim();
        let target = resolve_url(src, ctx.base_url.as_ref());
        ctx.write_str(&format!("![{alt}]({target})"));
    }

    fn handle_emphasis(&self, element: ElementRef, marker: &str, ctx: &mut ConversionContext) {
        let text = self.render_inline(element, ctx);
        if text.is_empty() {
            return;
        }
        ctx.write_str(&format!("{marker}{text}{marker}"));
    }

    fn handle_list(&self, element: ElementRef, ordered: bool, ctx: &mut ConversionContext) {
        let nested = !ctx.lists.is_empty();
        if nested {
            ctx.ensure_newline();
        } else {
            ctx.ensure_blank_line();
        }
        let start = element
            .value()
            .attr("start")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1);
        ctx.lists.push(ListFrame {
            ordered,
            next: start,
        });
        self.visit_children(element, ctx);
        ctx.lists.pop();
        if nested {
            ctx.ensure_newline();
        } else {
            ctx.ensure_blank_line();
        }
    }

    fn handle_list_item(&self, element: ElementRef, ctx: &mut ConversionContext) {
        ctx.ensure_newline();
        let marker = match ctx.lists.last_mut() {
            Some(frame) if frame.ordered => {
                let marker = format!("{}. ", frame.next);
                frame.next += 1;
                marker
            }
            _ => "- ".to_string(),
        };
        ctx.write_str(&marker);
        ctx.item_start = true;
        ctx.prefixes.push(" ".repeat(marker.len()));
        self.visit_children(element, ctx);
        ctx.item_start = false;
        ctx.prefixes.pop();
        ctx.ensure_newline();
    }

    fn handle_table_row(&self, element: ElementRef, ctx: &mut ConversionContext) {
        let cells: Vec<String> = element
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| matches!(cell.value().name(), "td" | "th"))
            .map(|cell| self.render_inline(cell, ctx).replace('|', "\\|"))
            .collect();
        if cells.is_empty() {
            return;
        }
        let header_row = ctx.tables.last().is_some_and(|rows| *rows == 0);
        ctx.ensure_newline();
        ctx.write_str(&format!("| {} |", cells.join(" | ")));
        ctx.write_str("\n");
        if header_row {
            let separator = vec!["---"; cells.len()].join(" | ");
            ctx.write_str(&format!("| {separator} |"));
            ctx.write_str("\n");
        }
        if let Some(rows) = ctx.tables.last_mut() {
            *rows += 1;
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn longest_run(text: &str, needle: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == needle {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn resolve_url(reference: &str, base: Option<&Url>) -> String {
    if reference.starts_with('#') {
        return reference.to_string();
    }
    if let Ok(url) = Url::parse(reference) {
        return url.to_string();
    }
    base.and_then(|base| base.join(reference).ok())
        .map(String::from)
        .unwrap_or_else(|| reference.to_string())
}

fn is_autolinkable(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("mailto:"))
        && !target.contains(|c: char| c.is_whitespace() || c == '<' || c == '>')
}

struct ListFrame {
    ordered: bool,
    next: usize,
}

struct ConversionContext {
    builder: String,
    base_url: Option<Url>,
    last_char: Option<char>,
    at_line_start: bool,
    /// Line prefixes for blockquotes and list item continuation lines.
    prefixes: Vec<String>,
    lists: Vec<ListFrame>,
    /// Row counters of the open tables.
    tables: Vec<usize>,
    /// Just after a list marker; block children must not break the line.
    item_start: bool,
}

impl ConversionContext {
    fn new(base_url: Option<Url>) -> Self {
        Self {
            builder: String::new(),
            base_url,
            last_char: None,
            at_line_start: true,
            prefixes: Vec::new(),
            lists: Vec::new(),
            tables: Vec::new(),
            item_start: false,
        }
    }

    fn into_output(self) -> String {
        self.builder.trim().to_string()
    }

    /// Write text verbatim, emitting line prefixes at the start of each line.
    fn write_str(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                if self.at_line_start {
                    let prefix = self.prefixes.concat();
                    self.push_raw(prefix.trim_end());
                }
                self.push_char('\n');
                self.at_line_start = true;
            } else {
                if self.at_line_start {
                    let prefix = self.prefixes.concat();
                    self.push_raw(&prefix);
                    self.at_line_start = false;
                }
                self.push_char(ch);
            }
        }
        if !text.is_empty() {
            self.item_start = false;
        }
    }

    /// Collapse whitespace and escape emphasis characters in ordinary text.
    fn append_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                if self.at_line_start
                    || self.builder.is_empty()
                    || self.last_char == Some(' ')
                    || self.last_char == Some('\n')
                {
                    continue;
                }
                self.write_str(" ");
            } else if matches!(ch, '*' | '_') {
                let mut escaped = String::with_capacity(2);
                escaped.push('\\');
                escaped.push(ch);
                self.write_str(&escaped);
            } else {
                let mut buf = [0u8; 4];
                self.write_str(ch.encode_utf8(&mut buf));
            }
        }
    }

    fn hard_break(&mut self) {
        if self.at_line_start || self.builder.is_empty() {
            return;
        }
        self.trim_trailing_spaces();
        self.write_str("\\\n");
    }

    fn ensure_newline(&mut self) {
        if self.item_start {
            return;
        }
        if self.builder.is_empty() || self.at_line_start {
            return;
        }
        self.trim_trailing_spaces();
        self.write_str("\n");
    }

    /// Paragraph-level break: a blank line, or a plain newline inside list items.
    fn ensure_block_break(&mut self) {
        if self.lists.is_empty() {
            self.ensure_blank_line();
        } else {
            self.ensure_newline();
        }
    }

    fn ensure_blank_line(&mut self) {
        if self.item_start {
            return;
        }
        self.ensure_newline();
        if self.builder.is_empty() || self.builder.ends_with("\n\n") || self.ends_with_blank_prefix_line() {
            return;
        }
        self.write_str("\n");
    }

    fn ends_with_blank_prefix_line(&self) -> bool {
        let prefix = self.prefixes.concat();
        let blank = format!("\n{}\n", prefix.trim_end());
        self.builder.ends_with(&blank)
    }

    /// Drop a trailing line that holds nothing but the current prefix.
    fn trim_blank_prefix_line(&mut self) {
        let prefix = self.prefixes.concat();
        let prefix = prefix.trim_end();
        if prefix.is_empty() {
            return;
        }
        let blank = format!("\n{prefix}\n");
        if self.builder.ends_with(&blank) {
            let keep = self.builder.len() - blank.len() + 1;
            self.builder.truncate(keep);
            self.last_char = Some('\n');
            self.at_line_start = true;
        }
    }

    fn trim_trailing_spaces(&mut self) {
        while self.builder.ends_with(' ') {
            self.builder.pop();
        }
        self.last_char = self.builder.chars().last();
    }

    fn push_raw(&mut self, text: &str) {
        for ch in text.chars() {
            self.push_char(ch);
        }
    }

    fn push_char(&mut self, ch: char) {
        self.builder.push(ch);
        self.last_char = Some(ch);
    }
}
