//! Normalizing Markdown formatter applied to converter output.
//!
//! Rules, applied outside fenced code only:
//! - `*` and `+` bullets become `-`, thematic breaks become `---`
//! - trailing whitespace is removed
//! - at most one blank line separates blocks
//! - headings and code fences are surrounded by blank lines
//! - paragraphs are optionally re-wrapped
//!
//! The document always ends with exactly one newline. Formatting is idempotent.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Wrap {
    /// Leave paragraph lines as they are.
    #[default]
    Keep,
    /// Greedily wrap paragraph lines at the given column.
    Width(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatOptions {
    pub wrap: Wrap,
}

struct Fence {
    marker: char,
    len: usize,
}

pub fn format_markdown(text: &str, options: &FormatOptions) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut fence: Option<Fence> = None;
    let mut blank_after = false;

    for raw_line in text.lines() {
        if let Some(open) = &fence {
            let closes = parse_fence(raw_line)
                .is_some_and(|f| f.marker == open.marker && f.len >= open.len && f.info_empty);
            out.push(raw_line.trim_end_matches(['\r']).to_string());
            if closes {
                fence = None;
                blank_after = true;
            }
            continue;
        }

        let line = raw_line.trim_end();
        if line.is_empty() {
            push_blank(&mut out);
            blank_after = false;
            continue;
        }
        if blank_after {
            push_blank(&mut out);
            blank_after = false;
        }

        if let Some(open) = parse_fence(line) {
            push_blank(&mut out);
            out.push(normalize_bullet(line));
            fence = Some(Fence {
                marker: open.marker,
                len: open.len,
            });
            continue;
        }

        if is_thematic_break(line) {
            push_blank(&mut out);
            out.push("---".to_string());
            blank_after = true;
            continue;
        }

        if is_atx_heading(line) {
            push_blank(&mut out);
            out.push(line.trim_start().to_string());
            blank_after = true;
            continue;
        }

        let line = normalize_bullet(line);
        match options.wrap {
            Wrap::Width(width) if is_paragraph_line(&line) => {
                out.extend(wrap_line(&line, width));
            }
            _ => out.push(line),
        }
    }

    while out.last().is_some_and(|line| line.is_empty()) {
        out.pop();
    }
    if out.is_empty() {
        return String::new();
    }
    let mut formatted = out.join("\n");
    formatted.push('\n');
    formatted
}

fn push_blank(out: &mut Vec<String>) {
    if out.last().is_some_and(|line| !line.is_empty()) {
        out.push(String::new());
    }
}

struct FenceLine {
    marker: char,
    len: usize,
    info_empty: bool,
}

/// Fences may open directly after a list marker (`- ```cpp`).
fn parse_fence(line: &str) -> Option<FenceLine> {
    let trimmed = strip_list_marker(line.trim_start());
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    let info = trimmed[len..].trim();
    if marker == '`' && info.contains('`') {
        return None;
    }
    Some(FenceLine {
        marker,
        len,
        info_empty: info.is_empty(),
    })
}

fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = ["- ", "* ", "+ "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
    {
        return rest.trim_start();
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(". ") {
            return rest.trim_start();
        }
    }
    line
}

fn is_thematic_break(line: &str) -> bool {
    let trimmed = line.trim();
    let Some(marker) = trimmed.chars().next().filter(|c| matches!(c, '*' | '-' | '_')) else {
        return false;
    };
    let mut count = 0;
    for c in trimmed.chars() {
        if c == marker {
            count += 1;
        } else if c != ' ' && c != '\t' {
            return false;
        }
    }
    count >= 3
}

fn is_atx_heading(line: &str) -> bool {
    let trimmed = line.trim_start();
    if line.len() - trimmed.len() > 3 {
        return false;
    }
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    (1..=6).contains(&hashes)
        && trimmed[hashes..]
            .chars()
            .next()
            .is_none_or(|c| c == ' ' || c == '\t')
}

fn normalize_bullet(line: &str) -> String {
    let indent = line.len() - line.trim_start_matches(' ').len();
    let rest = &line[indent..];
    for marker in ["* ", "+ "] {
        if let Some(item) = rest.strip_prefix(marker) {
            return format!("{}- {}", &line[..indent], item);
        }
    }
    line.to_string()
}

fn is_paragraph_line(line: &str) -> bool {
    if line.starts_with("    ") || line.starts_with('\t') {
        return false;
    }
    let trimmed = line.trim_start();
    let starts_block = trimmed.starts_with("- ")
        || trimmed.starts_with('>')
        || trimmed.starts_with('|')
        || trimmed.starts_with('<')
        || trimmed.starts_with('#')
        || is_ordered_item(trimmed);
    // A trailing backslash is a hard line break and must stay at the end of its line.
    !starts_block && !line.ends_with('\\')
}

fn is_ordered_item(line: &str) -> bool {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && (line[digits..].starts_with(". ") || line[digits..].starts_with(") "))
}

fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
