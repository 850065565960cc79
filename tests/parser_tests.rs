use serpcache::parser::{ParserConfig, ResultPageParser, parse_result_count};

const RESULTS_PAGE: &str = include_str!("fixtures/results_page.html");

fn parser() -> ResultPageParser {
    ResultPageParser::new(&ParserConfig::default()).unwrap()
}

#[test]
fn test_locale_result_counts() {
    assert_eq!(parse_result_count("10,000 results"), Some(10_000));
    assert_eq!(parse_result_count("10.000 Ergebnisse"), Some(10_000));
    assert_eq!(parse_result_count("10 000 wyników"), Some(10_000));
}

#[test]
fn test_result_count_from_page() {
    let page = parser().parse(RESULTS_PAGE, 20);
    assert_eq!(page.total_result_count, Some(1_230_000));
}

#[test]
fn test_malformed_blocks_are_skipped() {
    let page = parser().parse(RESULTS_PAGE, 20);
    let titles: Vec<&str> = page.entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Rust Programming Language",
            "Rust book searches",
            "The Rust Programming Language Book",
            "Rust (programming language) - Wikipedia",
        ]
    );
    assert!(!titles.contains(&"People also ask"));
}

#[test]
fn test_relative_links_are_excluded() {
    let page = parser().parse(RESULTS_PAGE, 20);
    assert_eq!(
        page.links,
        vec![
            "https://www.rust-lang.org/",
            "https://doc.rust-lang.org/book/",
            "https://en.wikipedia.org/wiki/Rust_(programming_language)",
        ]
    );
    assert!(page.links.iter().all(|l| !l.starts_with("/search")));
}

#[test]
fn test_snippet_marker_variants() {
    let page = parser().parse(RESULTS_PAGE, 20);
    assert_eq!(
        page.entries[3].snippet,
        "Rust is a general-purpose programming language."
    );
}

#[test]
fn test_scan_stops_at_result_limit() {
    let page = parser().parse(RESULTS_PAGE, 2);
    assert_eq!(
        page.links,
        vec!["https://www.rust-lang.org/", "https://doc.rust-lang.org/book/"]
    );
    // the relative-link entry before the cutoff still contributes words,
    // the Wikipedia entry after it is never inspected
    assert_eq!(page.entries.len(), 3);
    assert!(page.entries.iter().all(|e| !e.title.contains("Wikipedia")));
}

#[test]
fn test_zero_limit_inspects_nothing() {
    let page = parser().parse(RESULTS_PAGE, 0);
    assert!(page.entries.is_empty());
    assert!(page.links.is_empty());
    assert_eq!(page.total_result_count, Some(1_230_000));
}

#[test]
fn test_entry_with_empty_title_keeps_no_link() {
    let html = r#"<html><body>
        <div id="result-stats">5 results</div>
        <div class="g"><a href="https://a.example"><h3></h3></a><span class="aCOpRe">only a snippet</span></div>
    </body></html>"#;
    let page = parser().parse(html, 20);
    assert_eq!(page.entries.len(), 1);
    assert!(page.links.is_empty());
}

#[test]
fn test_page_without_results() {
    let html = "<html><body><p>Your search did not match any documents.</p></body></html>";
    let page = parser().parse(html, 20);
    assert_eq!(page.total_result_count, None);
    assert!(page.entries.is_empty());
    assert!(page.links.is_empty());
}

#[test]
fn test_custom_selectors() {
    let config = ParserConfig {
        stats_selector: "#count".into(),
        block_selector: "li.result".into(),
        title_selector: "h2".into(),
        snippet_selector: "p.desc".into(),
        link_selector: "a[href]".into(),
    };
    let html = r#"<html><body>
        <span id="count">42 hits</span>
        <ul><li class="result"><h2>Title</h2><p class="desc">Desc</p><a href="https://x.example">x</a></li></ul>
    </body></html>"#;
    let page = ResultPageParser::new(&config).unwrap().parse(html, 20);
    assert_eq!(page.total_result_count, Some(42));
    assert_eq!(page.links, vec!["https://x.example"]);
}
