//! Instagram-specific URLs and selectors. This is a single-site pipeline;
//! everything the DOM layer needs to know about the site lives here.

pub const BASE_URL: &str = "https://www.instagram.com";

/// Path fragment present in the URL whenever the login form is shown.
pub const LOGIN_ROUTE: &str = "/accounts/login";

pub const SEL_USERNAME: &str = "input[name=\"username\"]";
pub const SEL_PASSWORD: &str = "input[name=\"password\"]";
pub const SEL_SUBMIT: &str = "button[type=\"submit\"]";

/// Link on a profile page that opens the followers overlay.
pub const SEL_FOLLOWERS_LINK: &str = "a[href$=\"/followers/\"]";
/// The followers overlay itself.
pub const SEL_OVERLAY: &str = "div[role=\"dialog\"]";
/// Member entries rendered inside the overlay.
pub const SEL_OVERLAY_ENTRIES: &str = "div[role=\"dialog\"] a[href^=\"/\"]";

/// Profile metadata field holding the bio.
pub const SEL_BIO_META: &str = "head meta[name=\"description\"]";
/// Text before this delimiter is follower/post stats; after it, the bio.
pub const BIO_DELIMITER: &str = " on Instagram: ";

/// Post-login "save your login info?" interstitial dismissal text.
pub const INTERSTITIAL_DISMISS_TEXT: &str = "not now";

pub fn login_url() -> String {
    format!("{BASE_URL}{LOGIN_ROUTE}/")
}

pub fn profile_url(handle: &str) -> String {
    format!("{BASE_URL}/{handle}/")
}
