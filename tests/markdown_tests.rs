//! Markdown converter tests
//!
//! Each case pins the exact output for one construct.

use mcp_fetch::extraction::MarkdownConverter;
use pretty_assertions::assert_eq;

fn md(html: &str) -> String {
    MarkdownConverter::new(false).convert(html).unwrap()
}

fn md_with_images(html: &str) -> String {
    MarkdownConverter::new(true).convert(html).unwrap()
}

#[test]
fn test_empty_input() {
    assert_eq!(md(""), "");
    assert_eq!(md("   \n  "), "");
}

#[test]
fn test_whitespace_collapses() {
    assert_eq!(md("<p>a\n     b\t\tc</p>"), "a b c");
}

#[test]
fn test_bullet_list() {
    assert_eq!(md("<ul><li>one</li><li>two</li></ul>"), "- one\n- two");
}

#[test]
fn test_nested_list_is_indented() {
    assert_eq!(
        md("<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>"),
        "- a\n  - b\n- c"
    );
}

#[test]
fn test_ordered_list_honours_start() {
    assert_eq!(md(r#"<ol start="3"><li>x</li><li>y</li></ol>"#), "3. x\n4. y");
    assert_eq!(md("<ol><li>x</li></ol>"), "1. x");
}

#[test]
fn test_blockquote() {
    assert_eq!(
        md("<blockquote><p>q1</p><p>q2</p></blockquote>"),
        "> q1\n>\n> q2"
    );
}

#[test]
fn test_fenced_code_with_language() {
    assert_eq!(
        md("<pre><code class=\"language-rust\">fn main() {}\n</code></pre>"),
        "```rust\nfn main() {}\n```"
    );
}

#[test]
fn test_fenced_code_keeps_blank_lines() {
    assert_eq!(
        md("<pre><code>a\n\n\nb</code></pre>"),
        "```\na\n\n\nb\n```"
    );
}

#[test]
fn test_fence_longer_than_content_backticks() {
    assert_eq!(
        md("<pre><code>x ``` y</code></pre>"),
        "````\nx ``` y\n````"
    );
}

#[test]
fn test_inline_code() {
    assert_eq!(md("<p>run <code>ls -la</code> now</p>"), "run `ls -la` now");
    assert_eq!(md("<p>use <code>a`b</code></p>"), "use ``a`b``");
}

#[test]
fn test_links() {
    assert_eq!(
        md(r#"<p><a href="https://x.test/a(b)" title="T">link</a></p>"#),
        r#"[link](https://x.test/a\(b\) "T")"#
    );
    assert_eq!(md("<p><a>plain</a></p>"), "plain");
    assert_eq!(md(r#"<p>x<a href="/y"></a></p>"#), "x");
}

#[test]
fn test_link_with_emphasis() {
    assert_eq!(
        md(r#"<p>see <a href="/d"><em>docs</em></a>.</p>"#),
        "see [*docs*](/d)."
    );
}

#[test]
fn test_images_dropped_by_default() {
    assert_eq!(md(r#"<p>see <img src="a.png" alt="A"></p>"#), "see");
}

#[test]
fn test_images_kept_when_enabled() {
    assert_eq!(
        md_with_images(r#"<p>see <img src="a.png" alt="A" title="Fig"></p>"#),
        r#"see ![A](a.png "Fig")"#
    );
    assert_eq!(md_with_images(r#"<p><img alt="no src"></p>"#), "");
}

#[test]
fn test_table() {
    let html = "<table><caption>Cap</caption>\
                <tr><th>A</th><th>B</th></tr>\
                <tr><td>1</td><td>2|3</td></tr></table>";
    assert_eq!(md(html), "Cap\n\n| A | B |\n| --- | --- |\n| 1 | 2\\|3 |");
}

#[test]
fn test_table_pads_short_rows() {
    let html = "<table><thead><tr><th>A</th><th>B</th></tr></thead>\
                <tbody><tr><td>1</td></tr></tbody></table>";
    assert_eq!(md(html), "| A | B |\n| --- | --- |\n| 1 |  |");
}

#[test]
fn test_markdown_characters_escaped() {
    assert_eq!(md("<p>*stars* and _under_</p>"), r"\*stars\* and \_under\_");
    assert_eq!(md("<p>1. not a list</p>"), r"1\. not a list");
    assert_eq!(md("<p># not a heading</p>"), r"\# not a heading");
}

#[test]
fn test_nbsp_survives() {
    assert_eq!(md("<p>a&nbsp;b</p>"), "a\u{a0}b");
}

#[test]
fn test_non_content_elements_skipped() {
    assert_eq!(md("<template><p>x</p></template><p>y</p>"), "y");
}

#[test]
fn test_empty_heading_skipped() {
    assert_eq!(md("<h2> </h2><p>body</p>"), "body");
}

#[test]
fn test_mixed_document() {
    let html = r#"
        <h2>Install</h2>
        <p>Run the <strong>installer</strong>:</p>
        <pre><code class="language-sh">./install.sh</code></pre>
        <hr>
        <ul>
          <li>Fast</li>
          <li>Small</li>
        </ul>
    "#;
    assert_eq!(
        md(html),
        "## Install\n\nRun the **installer**:\n\n```sh\n./install.sh\n```\n\n---\n\n- Fast\n- Small"
    );
}
