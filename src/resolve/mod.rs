//! Profile page resolution.
//!
//! Turns a page URL (a social profile, an article) into the image it
//! advertises in its markup. Resolution is best-effort: callers fall back to
//! fetching the original URL when nothing is found.

mod extract;

use log::debug;
use url::Url;

use crate::config::{
    HEADER_CONTENT_TYPE, HTML_CONTENT_TYPE, IMAGE_EXTENSIONS, MAX_PROFILE_PAGE_SIZE,
    PROFILE_PAGE_MAX_REDIRECTS, PROFILE_PAGE_TIMEOUT,
};
use crate::fetch::{
    read_body_with_limit, send_following_redirects, BodyError, FetchError, HttpMethod,
    RedirectChain, RequestKind, Transport,
};
use crate::security::validate;

/// Outcome of a resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileImage {
    /// The URL already points at an image file; nothing was fetched.
    AlreadyImage,
    /// The page advertises this image (absolute URL).
    Found(String),
    /// The page was fetched but names no image, or is not HTML.
    NotFound,
    /// The page could not be fetched.
    Failed(String),
}

impl ProfileImage {
    /// The resolved image URL, if resolution produced one.
    pub fn into_option(self) -> Option<String> {
        match self {
            ProfileImage::Found(url) => Some(url),
            _ => None,
        }
    }

    /// URL to fetch: the resolved image, or `original` otherwise.
    pub fn target_or(self, original: &str) -> String {
        self.into_option().unwrap_or_else(|| original.to_string())
    }
}

/// True when the URL path ends in a known image extension.
///
/// The query string and fragment are ignored; comparison is case-insensitive.
pub fn has_image_extension(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let file_name = path.rsplit('/').next().unwrap_or_default();
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => IMAGE_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

/// Finds the image a page advertises through Open Graph, Twitter Card or
/// JSON-LD markup.
///
/// URLs that already name an image file return `AlreadyImage` without any
/// request. Otherwise the page goes through the validator and is fetched with
/// a 5 second budget, at most 5 validated redirects and a 2 MiB body cap.
/// Never panics; every failure is a `Failed` or `NotFound` value.
pub async fn resolve_profile_image<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
) -> ProfileImage {
    if has_image_extension(url) {
        return ProfileImage::AlreadyImage;
    }

    let page = resolve_page(transport, url);
    let result = match tokio::time::timeout(PROFILE_PAGE_TIMEOUT, page).await {
        Ok(result) => result,
        Err(_) => ProfileImage::Failed(format!(
            "Profile page timed out after {} ms",
            PROFILE_PAGE_TIMEOUT.as_millis()
        )),
    };
    debug!("Profile resolution for {url}: {result:?}");
    result
}

async fn resolve_page<T: Transport + ?Sized>(transport: &T, url: &str) -> ProfileImage {
    let start = match validate(url) {
        Ok(safe) => safe,
        Err(e) => return ProfileImage::Failed(e.to_string()),
    };

    let mut chain = RedirectChain::starting_at(start.as_str());
    let (page_url, response) = match send_following_redirects(
        transport,
        HttpMethod::Get,
        RequestKind::Document,
        start,
        &mut chain,
        PROFILE_PAGE_MAX_REDIRECTS,
    )
    .await
    {
        Ok(reached) => reached,
        Err(e) => return ProfileImage::Failed(e.to_string()),
    };

    if !(200..300).contains(&response.status) {
        let e = FetchError::HttpError {
            status: response.status,
            status_text: response.status_text,
        };
        return ProfileImage::Failed(e.to_string());
    }

    let is_html = response
        .headers
        .get(HEADER_CONTENT_TYPE)
        .is_some_and(|ct| ct.to_ascii_lowercase().contains(HTML_CONTENT_TYPE));
    if !is_html {
        return ProfileImage::NotFound;
    }

    let body = match read_body_with_limit(response.body, MAX_PROFILE_PAGE_SIZE as u64).await {
        Ok(body) => body,
        Err(BodyError::TooLarge { limit, .. }) => {
            return ProfileImage::Failed(format!("Profile page exceeds {limit} bytes"))
        }
        Err(BodyError::Transport(e)) => return ProfileImage::Failed(e.to_string()),
    };

    let html = String::from_utf8_lossy(&body);
    let page_url = page_url.into_url();
    extract::image_candidates(&html)
        .into_iter()
        .find_map(|candidate| absolutize(&page_url, &candidate))
        .map(ProfileImage::Found)
        .unwrap_or(ProfileImage::NotFound)
}

/// Joins a page-relative reference; only http(s) results are kept.
fn absolutize(page_url: &Url, candidate: &str) -> Option<String> {
    let joined = page_url.join(candidate).ok()?;
    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
}
