//! The fixed browser-like identity presented to the console backend.

/// Firefox on Windows 7. The console serves a different (and less
/// scrapeable) page variant to clients it does not recognize as browsers.
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:15.0) Gecko/20100101 Firefox/15.0";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-us,en;q=0.5";
const ACCEPT_CHARSET: &str = "ISO-8859-1,utf-8;q=0.7,*;q=0.7";
const KEEP_ALIVE: &str = "115";

/// Identity strings sent with every outbound request.
///
/// Kept as one immutable value rather than scattered constants so tests
/// can substitute an alternate identity through [`build_client`].
///
/// [`build_client`]: crate::client::build_client
#[derive(Debug, Clone)]
pub struct BrowserIdentity {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub accept_charset: String,
    pub keep_alive: String,
}

impl Default for BrowserIdentity {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            accept: ACCEPT.to_string(),
            accept_language: ACCEPT_LANGUAGE.to_string(),
            accept_charset: ACCEPT_CHARSET.to_string(),
            keep_alive: KEEP_ALIVE.to_string(),
        }
    }
}
