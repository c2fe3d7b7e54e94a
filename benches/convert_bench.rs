//! Benchmarks for content location and Markdown conversion.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mcp_fetch::extraction::{ContentLocator, HtmlSnapshot, MarkdownConverter, MetadataExtractor};

const SAMPLE_HTML: &str = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Sample Article</title>
    <meta name="author" content="Jane Roe">
    <meta name="description" content="A sample article for benchmarking.">
    <meta property="og:title" content="Sample Article">
</head>
<body>
    <nav><a href="/">Home</a> <a href="/about">About</a></nav>
    <article>
        <h1>Sample Article Title</h1>
        <p>This is the <strong>first</strong> paragraph. It links to
        <a href="https://example.com/docs" title="Docs">the docs</a>.</p>
        <pre><code class="language-rust">fn main() {
    println!("hello");
}</code></pre>
        <blockquote><p>A quoted remark with <em>emphasis</em>.</p></blockquote>
        <ol><li>First</li><li>Second<ul><li>Nested</li></ul></li></ol>
        <table>
            <tr><th>Name</th><th>Value</th></tr>
            <tr><td>alpha</td><td>1</td></tr>
            <tr><td>beta</td><td>2</td></tr>
        </table>
        <img src="/figure.png" alt="Figure">
    </article>
    <footer><p>Copyright</p></footer>
</body>
</html>
"#;

fn bench_convert(c: &mut Criterion) {
    let converter = MarkdownConverter::new(false);
    c.bench_function("convert_article", |b| {
        b.iter(|| converter.convert(black_box(SAMPLE_HTML)));
    });
}

fn bench_full_extraction(c: &mut Criterion) {
    let locator = ContentLocator::new();
    let extractor = MetadataExtractor::new();
    let converter = MarkdownConverter::new(true);

    c.bench_function("locate_extract_convert", |b| {
        b.iter(|| {
            let doc = HtmlSnapshot::parse(black_box(SAMPLE_HTML));
            let metadata = extractor.extract(&doc);
            let content = locator.locate(&doc).map(|c| c.html).unwrap_or_default();
            (metadata, converter.convert(&content))
        });
    });
}

fn bench_document_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_size");
    let converter = MarkdownConverter::default();

    for paragraphs in [10usize, 100, 1000] {
        let html: String = (0..paragraphs)
            .map(|i| format!("<p>Paragraph {i} with <em>some</em> <code>inline</code> text.</p>"))
            .collect();
        group.throughput(Throughput::Bytes(html.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(paragraphs), &html, |b, html| {
            b.iter(|| converter.convert(black_box(html)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_convert, bench_full_extraction, bench_document_size);
criterion_main!(benches);
