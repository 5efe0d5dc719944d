//! Login controller.
//!
//! Applies stored session cookies, probes the landing page, and only walks
//! the credential form when the site actually bounces us to its login
//! route. A successful interactive login persists fresh cookies so the next
//! run skips all of this.

use std::time::Duration;

use tracing::{debug, info, warn};

use flocksift_common::{Credentials, FlocksiftError, Result};

use crate::browser::PageDriver;
use crate::session::SessionStore;
use crate::site::{
    login_url, BASE_URL, INTERSTITIAL_DISMISS_TEXT, LOGIN_ROUTE, SEL_PASSWORD, SEL_SUBMIT,
    SEL_USERNAME,
};

/// Short bound for the landing-page probe; a slow load is not a login
/// signal and must not fail the run.
const PROBE_TIMEOUT: Duration = Duration::from_secs(8);
const NAV_TIMEOUT: Duration = Duration::from_secs(30);
const FORM_TIMEOUT: Duration = Duration::from_secs(8);
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(15);
const SUBMIT_POLL: Duration = Duration::from_millis(500);
/// The save-login prompt renders some time after the post-login redirect.
const INTERSTITIAL_TIMEOUT: Duration = Duration::from_secs(8);

pub struct LoginFlow<'a> {
    store: &'a SessionStore,
}

impl<'a> LoginFlow<'a> {
    pub fn new(store: &'a SessionStore) -> Self {
        Self { store }
    }

    /// Ensure `page` is an authenticated context for `creds.identity`.
    /// Fatal errors here abort the whole run; no collection is attempted
    /// against an unauthenticated context.
    pub async fn ensure_authenticated(
        &self,
        page: &dyn PageDriver,
        creds: &Credentials,
    ) -> Result<()> {
        if let Some(cookies) = self.store.load(&creds.identity) {
            page.restore_cookies(cookies).await?;
        }

        match page.navigate(BASE_URL, PROBE_TIMEOUT).await {
            Ok(()) => {}
            Err(e) if e.is_timeout() => {
                debug!("Landing probe timed out, checking login state anyway")
            }
            Err(e) => return Err(e),
        }

        if !page.current_url().await?.contains(LOGIN_ROUTE) {
            info!(identity = creds.identity.as_str(), "Session valid, login skipped");
            return Ok(());
        }

        info!(identity = creds.identity.as_str(), "Logging in");
        page.navigate(&login_url(), NAV_TIMEOUT).await?;
        page.wait_for(SEL_USERNAME, FORM_TIMEOUT).await?;
        page.fill(SEL_USERNAME, &creds.identity).await?;
        page.fill(SEL_PASSWORD, &creds.secret).await?;
        page.click(SEL_SUBMIT).await?;
        self.wait_until_logged_in(page).await?;

        self.dismiss_interstitial(page).await;

        let cookies = page.cookies().await?;
        if let Err(e) = self.store.save(&creds.identity, &cookies) {
            warn!(identity = creds.identity.as_str(), error = %e, "Failed to persist session state");
        }
        Ok(())
    }

    /// Best-effort dismissal of the save-login prompt, polling until it
    /// renders or the bound elapses. Never fails the login.
    async fn dismiss_interstitial(&self, page: &dyn PageDriver) {
        let deadline = tokio::time::Instant::now() + INTERSTITIAL_TIMEOUT;
        loop {
            match page.click_text(INTERSTITIAL_DISMISS_TEXT).await {
                Ok(true) => {
                    debug!("Dismissed post-login interstitial");
                    return;
                }
                Ok(false) => {}
                Err(e) => {
                    debug!(error = %e, "Interstitial dismissal failed, continuing");
                    return;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return;
            }
            tokio::time::sleep(SUBMIT_POLL).await;
        }
    }

    async fn wait_until_logged_in(&self, page: &dyn PageDriver) -> Result<()> {
        let deadline = tokio::time::Instant::now() + SUBMIT_TIMEOUT;
        loop {
            if !page.current_url().await?.contains(LOGIN_ROUTE) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(FlocksiftError::timeout("login submission"));
            }
            tokio::time::sleep(SUBMIT_POLL).await;
        }
    }
}
