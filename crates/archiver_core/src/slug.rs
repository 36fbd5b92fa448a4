use url::Url;

const MAX_COMPONENT_CHARS: usize = 80;

/// Windows-safe, single path component. Unsafe characters and whitespace
/// become `_`, runs of `_` collapse, and `fallback` is used when nothing is left.
pub fn sanitize_component(input: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        let c = if is_forbidden(c) { '_' } else { c };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let capped: String = out
        .trim_matches(['_', '.'])
        .chars()
        .take(MAX_COMPONENT_CHARS)
        .collect();
    // The cut can expose a trailing `.`, which Windows rejects.
    let mut name = capped.trim_end_matches(['_', '.']).to_string();
    if name.is_empty() {
        name = fallback.to_string();
    }
    if is_reserved_device_name(&name) {
        name.push('_');
    }
    name
}

/// Last non-empty path segment of `url`, sanitized; `index` for the site root.
pub fn original_slug(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("");
    sanitize_component(segment, "index")
}

fn is_forbidden(c: char) -> bool {
    c.is_whitespace()
        || c.is_control()
        || matches!(
            c,
            '\\' | '/' | ':' | '*' | '?' | '"' | '\'' | '`' | '<' | '>' | '|'
        )
}

/// `CON`, `NUL`, `COM1` and friends cannot be file names on Windows.
fn is_reserved_device_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    match upper.as_str() {
        "CON" | "PRN" | "AUX" | "NUL" => true,
        _ => matches!(
            (upper.get(..3), upper.get(3..).map(str::as_bytes)),
            (Some("COM" | "LPT"), Some([b'1'..=b'9']))
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_become_single_underscores() {
        assert_eq!(sanitize_component("2-Control  Flow", "x"), "2-Control_Flow");
    }

    #[test]
    fn long_names_are_cut_on_char_boundaries() {
        let input = "é".repeat(200);
        let out = sanitize_component(&input, "x");
        assert_eq!(out.chars().count(), MAX_COMPONENT_CHARS);
    }

    #[test]
    fn cut_names_do_not_end_in_dot_or_underscore() {
        let input = format!("{}.{}", "a".repeat(MAX_COMPONENT_CHARS - 1), "b".repeat(10));
        let out = sanitize_component(&input, "x");
        assert_eq!(out, "a".repeat(MAX_COMPONENT_CHARS - 1));

        let input = format!("{} tail", "c".repeat(MAX_COMPONENT_CHARS - 1));
        assert_eq!(sanitize_component(&input, "x"), "c".repeat(MAX_COMPONENT_CHARS - 1));
    }

    #[test]
    fn reserved_names_are_patched() {
        assert_eq!(sanitize_component("nul", "x"), "nul_");
        assert_eq!(sanitize_component("Lpt7", "x"), "Lpt7_");
        assert_eq!(sanitize_component("COM10", "x"), "COM10");
    }

    #[test]
    fn empty_input_uses_fallback() {
        assert_eq!(sanitize_component(" ?* ", "lesson"), "lesson");
    }

    #[test]
    fn original_slug_ignores_trailing_slash() {
        let url = Url::parse("https://www.learncpp.com/cpp-tutorial/introduction/").unwrap();
        assert_eq!(original_slug(&url), "introduction");

        let root = Url::parse("https://www.learncpp.com/").unwrap();
        assert_eq!(original_slug(&root), "index");
    }
}
