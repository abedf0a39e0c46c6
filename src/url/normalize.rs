use crate::UrlError;
use url::Url;

/// Normalizes a user-submitted URL before it is queued for crawling
///
/// # Normalization Steps
///
/// 1. Default the scheme to `https://` when none is present
/// 2. Parse the URL; reject if malformed
/// 3. Reject schemes other than HTTP and HTTPS
/// 4. Require a host
///
/// The `url` crate lowercases the host during parsing, so `EXAMPLE.com`
/// and `example.com` normalize identically.
///
/// # Examples
///
/// ```
/// use pagelens::url::normalize_url;
///
/// let url = normalize_url("example.com").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let trimmed = url_str.trim();

    // Anything carrying an explicit scheme is parsed as-is so that
    // non-HTTP schemes are rejected instead of mangled.
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&with_scheme).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}
