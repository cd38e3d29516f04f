//! User-Agent string for outbound metadata requests.
//!
//! Single source for project URL and UA format so API traffic stays
//! consistent and easy to update (good citizenship; RFC 9308).

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/bibscan/bibscan";

/// Default User-Agent for metadata API requests (identifies the tool).
#[must_use]
pub(crate) fn default_api_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("bibscan/{version} (academic-research-tool; +{PROJECT_UA_URL})")
}
