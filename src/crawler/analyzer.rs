//! Page analysis: structural facts extracted from fetched HTML
//!
//! `inspect_page` is a pure, synchronous pass over the parsed document.
//! `analyze_page` composes it with the async link audit; the parsed DOM
//! never crosses an await point (`scraper::Html` is not `Send`), only the
//! extracted strings do.

use crate::crawler::fetcher::LivenessProbe;
use crate::crawler::links::audit_links;
use crate::storage::{AnalysisRecord, BrokenLinkRecord};
use scraper::{Html, Node, Selector};
use url::Url;

/// Selectors treated as evidence of a login form, checked in order with
/// first-match short-circuit. Deliberately permissive: the flag is
/// advisory, so false positives beat false negatives.
const LOGIN_FORM_SELECTORS: &[&str] = &[
    "form input[type='password']",
    "form input[name*='password']",
    "form input[name*='pass']",
    "form input[name*='login']",
    "form input[name*='user']",
    "form input[name*='email']",
];

/// Facts read off a document in one synchronous pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFacts {
    /// Doctype text, or the `HTML5`/`HTML` heuristic fallbacks
    pub html_version: String,
    /// First `<title>` text, trimmed; `None` when absent or empty
    pub page_title: Option<String>,
    /// Counts for h1 through h6, in level order
    pub heading_counts: [u32; 6],
    pub has_login_form: bool,
    /// Raw `href` values of every `<a href>` occurrence, document order
    pub anchor_hrefs: Vec<String>,
}

/// Parses a document and extracts its structural facts
///
/// Never fails: malformed HTML is parsed leniently and missing features
/// simply yield empty or zero facts.
pub fn inspect_page(html: &str) -> PageFacts {
    let document = Html::parse_document(html);

    PageFacts {
        html_version: detect_html_version(&document),
        page_title: extract_title(&document),
        heading_counts: count_headings(&document),
        has_login_form: detect_login_form(&document),
        anchor_hrefs: extract_anchor_hrefs(&document),
    }
}

/// Best-effort HTML version label
///
/// The doctype's literal name wins when present and non-empty; otherwise
/// a document with a root `<html>` element is labelled `HTML5`, and
/// anything else falls back to the generic `HTML`.
fn detect_html_version(document: &Html) -> String {
    let doctype = document.tree.root().children().find_map(|node| {
        if let Node::Doctype(doctype) = node.value() {
            Some(doctype.name().to_string())
        } else {
            None
        }
    });
    if let Some(name) = doctype {
        if !name.is_empty() {
            return name;
        }
    }

    if let Ok(selector) = Selector::parse("html") {
        if document.select(&selector).next().is_some() {
            return "HTML5".to_string();
        }
    }

    "HTML".to_string()
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>();
    let title = title.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

fn count_headings(document: &Html) -> [u32; 6] {
    let mut counts = [0u32; 6];
    for (level, count) in counts.iter_mut().enumerate() {
        if let Ok(selector) = Selector::parse(&format!("h{}", level + 1)) {
            *count = document.select(&selector).count() as u32;
        }
    }
    counts
}

fn detect_login_form(document: &Html) -> bool {
    for selector in LOGIN_FORM_SELECTORS {
        if let Ok(selector) = Selector::parse(selector) {
            if document.select(&selector).next().is_some() {
                return true;
            }
        }
    }
    false
}

fn extract_anchor_hrefs(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// Full analysis of a fetched page: structural facts plus link audit
///
/// Returns the analysis record and the broken link records to persist
/// alongside it. Deterministic for a fixed document and probe behavior.
pub async fn analyze_page(
    html: &str,
    base_url: &Url,
    probe: &dyn LivenessProbe,
    probe_concurrency: usize,
) -> (AnalysisRecord, Vec<BrokenLinkRecord>) {
    let facts = inspect_page(html);
    let audit = audit_links(&facts.anchor_hrefs, base_url, probe, probe_concurrency).await;

    let analysis = AnalysisRecord {
        html_version: Some(facts.html_version),
        page_title: facts.page_title,
        h1_count: facts.heading_counts[0],
        h2_count: facts.heading_counts[1],
        h3_count: facts.heading_counts[2],
        h4_count: facts.heading_counts[3],
        h5_count: facts.heading_counts[4],
        h6_count: facts.heading_counts[5],
        internal_links_count: audit.internal.len() as u32,
        external_links_count: audit.external.len() as u32,
        broken_links_count: audit.broken.len() as u32,
        has_login_form: facts.has_login_form,
    };

    (analysis, audit.broken)
}
