use archiver_engine::{
    format_markdown, Converter, FormatOptions, MarkdownConverter, MarkdownOptions, Wrap,
};
use pretty_assertions::assert_eq;

const BASE: &str = "https://www.learncpp.com/cpp-tutorial/statements/";

fn convert(html: &str) -> String {
    MarkdownConverter::default().to_markdown(html, Some(BASE))
}

#[test]
fn headings_paragraphs_and_emphasis() {
    let md = convert(
        "<html><head><title>ignored</title></head><body>\
         <h1>1.1 Statements</h1><p>A <strong>statement</strong> is an <em>instruction</em>.</p>\
         <h2>Functions</h2><p>Second paragraph.</p></body></html>",
    );
    assert_eq!(
        md,
        "# 1.1 Statements\n\nA **statement** is an *instruction*.\n\n## Functions\n\nSecond paragraph.\n"
    );
}

#[test]
fn preformatted_code_becomes_fenced_cpp_block() {
    let md = convert(
        "<p>Example:</p><pre>#include &lt;iostream&gt;\n\nint main()\n{\n    std::cout &lt;&lt; \"Hi\";\n}</pre>",
    );
    assert_eq!(
        md,
        "Example:\n\n```cpp\n#include <iostream>\n\nint main()\n{\n    std::cout << \"Hi\";\n}\n```\n"
    );
}

#[test]
fn inline_code_and_escaping() {
    let md = convert("<p>Use <code>a*b</code> not a*b_c.</p>");
    assert_eq!(md, "Use `a*b` not a\\*b\\_c.\n");
}

#[test]
fn links_are_resolved_and_bare_urls_autolinked() {
    let md = convert(
        "<p><a href=\"/cpp-tutorial/comments/\">next lesson</a> and \
         <a href=\"https://isocpp.org/\">https://isocpp.org/</a></p>",
    );
    assert_eq!(
        md,
        "[next lesson](https://www.learncpp.com/cpp-tutorial/comments/) and <https://isocpp.org/>\n"
    );
}

#[test]
fn lists_nest_and_number() {
    let md = convert(
        "<ul><li>one</li><li>two<ol start=\"3\"><li>three</li><li>four</li></ol></li></ul>",
    );
    assert_eq!(md, "- one\n- two\n  3. three\n  4. four\n");
}

#[test]
fn scripts_and_styles_are_dropped() {
    let md = convert(
        "<body><script>var x = 1;</script><style>p{}</style><p>text</p><noscript>js off</noscript></body>",
    );
    assert_eq!(md, "text\n");
}

#[test]
fn code_language_follows_options() {
    let converter = MarkdownConverter::new(
        MarkdownOptions {
            code_language: String::new(),
            ..MarkdownOptions::default()
        },
        FormatOptions::default(),
    );
    let md = converter.to_markdown("<pre>x = 1</pre>", None);
    assert_eq!(md, "```\nx = 1\n```\n");
}

#[test]
fn conversion_is_deterministic() {
    let html = "<h1>T</h1><blockquote><p>quoted</p></blockquote><hr><p>end</p>";
    assert_eq!(convert(html), convert(html));
    assert_eq!(convert(html), "# T\n\n> quoted\n\n---\n\nend\n");
}

#[test]
fn formatter_wraps_long_paragraphs_when_asked() {
    let options = FormatOptions {
        wrap: Wrap::Width(20),
    };
    let out = format_markdown(
        "This paragraph is a little too long.\n\n```\nkeep this very long code line\n```",
        &options,
    );
    assert_eq!(
        out,
        "This paragraph is a\nlittle too long.\n\n```\nkeep this very long code line\n```\n"
    );
}
