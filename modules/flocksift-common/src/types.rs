use serde::{Deserialize, Serialize};

/// Login credentials for the scraping account. Supplied per invocation and
/// never persisted beyond the serialized session cookies.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub identity: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }
}

/// The cookie subset chromiumoxide can round-trip through CDP. Serialized
/// as-is into the per-identity session file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    #[serde(default)]
    pub same_site: Option<String>,
}

/// One collected follower with its profile bio. Empty bio is a valid
/// terminal state, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileRecord {
    pub username: String,
    pub bio: String,
}

impl ProfileRecord {
    pub fn new(username: impl Into<String>, bio: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            bio: bio.into(),
        }
    }
}

/// Classification outcome for one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Yes,
    No,
}

impl Verdict {
    pub fn is_yes(self) -> bool {
        self == Verdict::Yes
    }
}

/// One matching follower in the final output. Shape matches what an HTTP
/// layer would return directly.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRow {
    pub username: String,
    pub url: String,
}
