pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{FlocksiftError, Result};
pub use types::{Credentials, ProfileRecord, ResultRow, SessionCookie, Verdict};
