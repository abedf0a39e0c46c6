//! Outbound link resolution, classification, and liveness auditing
//!
//! Every `<a href>` occurrence on a page is classified independently:
//! repeated links to the same target are counted once per occurrence, and
//! an external link whose probe fails appears in both the external list
//! and the broken list.

use crate::crawler::fetcher::{LivenessProbe, ProbeOutcome};
use crate::storage::BrokenLinkRecord;
use crate::url::host_of;
use futures::stream::{self, StreamExt};
use url::Url;

/// Whether a resolved link targets the page's own host or another one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkScope {
    Internal,
    External,
}

/// Classified links for one page, one entry per href occurrence
#[derive(Debug, Default)]
pub struct LinkAudit {
    pub internal: Vec<String>,
    pub external: Vec<String>,
    pub broken: Vec<BrokenLinkRecord>,
}

/// Resolves an href against the page URL, following relative references
pub fn resolve_href(href: &str, base: &Url) -> Result<Url, url::ParseError> {
    Url::options().base_url(Some(base)).parse(href)
}

/// Classifies a resolved link by hostname equality with the page URL
///
/// Only the hostname is compared; scheme, port and path differences do
/// not make a link external.
pub fn classify(resolved: &Url, base: &Url) -> LinkScope {
    if host_of(resolved) == host_of(base) {
        LinkScope::Internal
    } else {
        LinkScope::External
    }
}

/// Resolves, classifies, and probes every href found on a page
///
/// Unparsable hrefs go straight to the broken list with the raw href text.
/// Resolvable links are classified, then probed with at most
/// `probe_concurrency` requests in flight; a probe status >= 400 or a
/// transport failure adds the link to the broken list as well.
pub async fn audit_links(
    hrefs: &[String],
    base: &Url,
    probe: &dyn LivenessProbe,
    probe_concurrency: usize,
) -> LinkAudit {
    let mut audit = LinkAudit::default();
    let mut to_probe = Vec::new();

    for href in hrefs {
        match resolve_href(href, base) {
            Ok(resolved) => {
                let link = resolved.to_string();
                match classify(&resolved, base) {
                    LinkScope::Internal => audit.internal.push(link.clone()),
                    LinkScope::External => audit.external.push(link.clone()),
                }
                to_probe.push(link);
            }
            Err(e) => {
                tracing::debug!("Unparsable href '{}': {}", href, e);
                audit
                    .broken
                    .push(BrokenLinkRecord::unparsable(href, &e.to_string()));
            }
        }
    }

    let outcomes = stream::iter(to_probe)
        .map(|link| async move {
            let outcome = probe.probe(&link).await;
            (link, outcome)
        })
        .buffer_unordered(probe_concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    for (link, outcome) in outcomes {
        match outcome {
            ProbeOutcome::Status(code) if code >= 400 => {
                audit.broken.push(BrokenLinkRecord::dead(&link, code));
            }
            ProbeOutcome::Status(_) => {}
            ProbeOutcome::Error(message) => {
                audit
                    .broken
                    .push(BrokenLinkRecord::unreachable(&link, &message));
            }
        }
    }

    audit
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Probe stub with canned outcomes; unknown URLs report 200
    struct StubProbe {
        outcomes: HashMap<String, ProbeOutcome>,
    }

    impl StubProbe {
        fn all_alive() -> Self {
            Self {
                outcomes: HashMap::new(),
            }
        }

        fn with(outcomes: &[(&str, ProbeOutcome)]) -> Self {
            Self {
                outcomes: outcomes
                    .iter()
                    .map(|(url, outcome)| (url.to_string(), outcome.clone()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl LivenessProbe for StubProbe {
        async fn probe(&self, url: &str) -> ProbeOutcome {
            self.outcomes
                .get(url)
                .cloned()
                .unwrap_or(ProbeOutcome::Status(200))
        }
    }

    fn base() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_relative_href_resolves_against_base() {
        let resolved = resolve_href("/about", &base()).unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/about");
        assert_eq!(classify(&resolved, &base()), LinkScope::Internal);
    }

    #[test]
    fn test_other_host_is_external() {
        let resolved = resolve_href("https://other.org/page", &base()).unwrap();
        assert_eq!(classify(&resolved, &base()), LinkScope::External);
    }

    #[test]
    fn test_scheme_and_port_do_not_affect_scope() {
        let http = resolve_href("http://example.com/x", &base()).unwrap();
        assert_eq!(classify(&http, &base()), LinkScope::Internal);

        let with_port = resolve_href("https://example.com:8443/x", &base()).unwrap();
        assert_eq!(classify(&with_port, &base()), LinkScope::Internal);
    }

    #[test]
    fn test_subdomain_is_external() {
        let resolved = resolve_href("https://blog.example.com/", &base()).unwrap();
        assert_eq!(classify(&resolved, &base()), LinkScope::External);
    }

    #[tokio::test]
    async fn test_audit_classifies_per_occurrence() {
        let hrefs = vec![
            "/a".to_string(),
            "/a".to_string(),
            "https://other.org/".to_string(),
        ];
        let probe = StubProbe::all_alive();

        let audit = audit_links(&hrefs, &base(), &probe, 4).await;

        // Duplicates are not collapsed
        assert_eq!(audit.internal.len(), 2);
        assert_eq!(audit.external.len(), 1);
        assert!(audit.broken.is_empty());
    }

    #[tokio::test]
    async fn test_unparsable_href_is_broken_with_raw_text() {
        let hrefs = vec!["http://[bad".to_string()];
        let probe = StubProbe::all_alive();

        let audit = audit_links(&hrefs, &base(), &probe, 4).await;

        assert!(audit.internal.is_empty());
        assert!(audit.external.is_empty());
        assert_eq!(audit.broken.len(), 1);
        assert_eq!(audit.broken[0].link_url, "http://[bad");
        assert_eq!(audit.broken[0].status_code, None);
        assert!(audit.broken[0].error_message.is_some());
    }

    #[tokio::test]
    async fn test_dead_external_link_counts_in_both_lists() {
        let hrefs = vec!["https://other.org/gone".to_string()];
        let probe = StubProbe::with(&[("https://other.org/gone", ProbeOutcome::Status(404))]);

        let audit = audit_links(&hrefs, &base(), &probe, 4).await;

        assert_eq!(audit.external.len(), 1);
        assert_eq!(audit.broken.len(), 1);
        assert_eq!(audit.broken[0].status_code, Some(404));
    }

    #[tokio::test]
    async fn test_probe_transport_failure_is_broken() {
        let hrefs = vec!["/down".to_string()];
        let probe = StubProbe::with(&[(
            "https://example.com/down",
            ProbeOutcome::Error("connection refused".to_string()),
        )]);

        let audit = audit_links(&hrefs, &base(), &probe, 4).await;

        assert_eq!(audit.internal.len(), 1);
        assert_eq!(audit.broken.len(), 1);
        assert_eq!(
            audit.broken[0].error_message.as_deref(),
            Some("connection refused")
        );
    }

    #[tokio::test]
    async fn test_status_399_is_not_broken() {
        let hrefs = vec!["/redirect".to_string()];
        let probe = StubProbe::with(&[(
            "https://example.com/redirect",
            ProbeOutcome::Status(399),
        )]);

        let audit = audit_links(&hrefs, &base(), &probe, 4).await;
        assert!(audit.broken.is_empty());
    }

    #[tokio::test]
    async fn test_every_parsable_link_is_internal_or_external() {
        let hrefs = vec![
            "/a".to_string(),
            "b.html".to_string(),
            "https://other.org/".to_string(),
            "http://[bad".to_string(),
        ];
        let probe = StubProbe::all_alive();

        let audit = audit_links(&hrefs, &base(), &probe, 4).await;
        // 3 parsable hrefs partition into internal + external
        assert_eq!(audit.internal.len() + audit.external.len(), 3);
    }
}
