//! Test mocks for the scout pipeline.
//!
//! Two mocks matching the two trait boundaries:
//! - MockPage (PageDriver) — scripted navigation/DOM state, recorded calls
//! - MockAgent (ChatAgent) — scripted reply or failure, counted calls
//!
//! Plus MockPages (PageSource) handing out one shared MockPage, and small
//! fixture helpers.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result as AnyResult};
use async_trait::async_trait;

use ai_client::{ChatAgent, Message};
use flocksift_common::{FlocksiftError, Result, SessionCookie};

use crate::browser::{PageDriver, PageSource};
use crate::site;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn session_cookie(name: &str) -> SessionCookie {
    SessionCookie {
        name: name.to_string(),
        value: "value".to_string(),
        domain: ".instagram.com".to_string(),
        path: "/".to_string(),
        secure: true,
        http_only: true,
        same_site: Some("Lax".to_string()),
    }
}

// ---------------------------------------------------------------------------
// MockPage
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PageState {
    current_url: String,
    round: usize,
    fills: Vec<(String, String)>,
    clicks: Vec<String>,
    navigations: Vec<String>,
    scrolls: usize,
    restored_cookies: usize,
    screenshots: usize,
    closes: usize,
    click_text_calls: usize,
}

/// Scripted page. Builder methods register behavior up front; the
/// `PageDriver` impl records every call so tests can assert on interaction.
pub struct MockPage {
    nav_redirects: HashMap<String, String>,
    nav_failures: HashSet<String>,
    nav_hangs: HashSet<String>,
    click_urls: HashMap<String, String>,
    missing_selectors: HashSet<String>,
    attributes: HashMap<(String, String), String>,
    entry_rounds: Vec<Vec<String>>,
    cookies: Vec<SessionCookie>,
    click_text_found: bool,
    click_text_after: Option<usize>,
    state: Mutex<PageState>,
}

impl MockPage {
    pub fn new() -> Self {
        Self {
            nav_redirects: HashMap::new(),
            nav_failures: HashSet::new(),
            nav_hangs: HashSet::new(),
            click_urls: HashMap::new(),
            missing_selectors: HashSet::new(),
            attributes: HashMap::new(),
            entry_rounds: vec![Vec::new()],
            cookies: Vec::new(),
            click_text_found: false,
            click_text_after: None,
            state: Mutex::new(PageState {
                current_url: "about:blank".to_string(),
                ..Default::default()
            }),
        }
    }

    /// Navigating to `url` lands on `lands_at` (site-side redirect).
    pub fn on_navigate(mut self, url: &str, lands_at: &str) -> Self {
        self.nav_redirects
            .insert(url.to_string(), lands_at.to_string());
        self
    }

    /// Navigating to `url` times out.
    pub fn fail_navigate(mut self, url: &str) -> Self {
        self.nav_failures.insert(url.to_string());
        self
    }

    /// Navigating to `url` never resolves (for cancellation tests).
    pub fn hang_navigate(mut self, url: &str) -> Self {
        self.nav_hangs.insert(url.to_string());
        self
    }

    /// Clicking `selector` moves the page to `then_url`.
    pub fn on_click(mut self, selector: &str, then_url: &str) -> Self {
        self.click_urls
            .insert(selector.to_string(), then_url.to_string());
        self
    }

    /// `wait_for(selector)` never resolves.
    pub fn missing_selector(mut self, selector: &str) -> Self {
        self.missing_selectors.insert(selector.to_string());
        self
    }

    /// Overlay entry texts per scroll round; the last round repeats forever
    /// (a stalled list).
    pub fn with_entry_rounds(mut self, rounds: Vec<Vec<String>>) -> Self {
        assert!(!rounds.is_empty(), "at least one entry round required");
        self.entry_rounds = rounds;
        self
    }

    /// `read_attribute(selector, "content")` result while on `url`.
    pub fn on_attribute(mut self, url: &str, selector: &str, value: &str) -> Self {
        self.attributes
            .insert((url.to_string(), selector.to_string()), value.to_string());
        self
    }

    /// Cookies the page reports after login.
    pub fn with_cookies(mut self, cookies: Vec<SessionCookie>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_click_text_found(mut self, found: bool) -> Self {
        self.click_text_found = found;
        self
    }

    /// `click_text` misses the first `n` calls, then hits (a prompt that
    /// renders late).
    pub fn with_click_text_after(mut self, n: usize) -> Self {
        self.click_text_after = Some(n);
        self
    }

    // --- recorded-call accessors ---

    pub fn fills(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().fills.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn scroll_count(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    pub fn restored_cookie_count(&self) -> usize {
        self.state.lock().unwrap().restored_cookies
    }

    pub fn screenshot_count(&self) -> usize {
        self.state.lock().unwrap().screenshots
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    pub fn click_text_calls(&self) -> usize {
        self.state.lock().unwrap().click_text_calls
    }
}

impl Default for MockPage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .navigations
            .push(url.to_string());
        if self.nav_hangs.contains(url) {
            futures::future::pending::<()>().await;
        }
        if self.nav_failures.contains(url) {
            return Err(FlocksiftError::timeout(format!("navigation to {url}")));
        }
        let mut state = self.state.lock().unwrap();
        state.current_url = self
            .nav_redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().current_url.clone())
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<()> {
        if self.missing_selectors.contains(selector) {
            return Err(FlocksiftError::timeout(format!("selector {selector}")));
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .fills
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.clicks.push(selector.to_string());
        if let Some(url) = self.click_urls.get(selector) {
            state.current_url = url.clone();
        }
        Ok(())
    }

    async fn click_text(&self, _needle: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.click_text_calls += 1;
        match self.click_text_after {
            Some(after) => Ok(state.click_text_calls > after),
            None => Ok(self.click_text_found),
        }
    }

    async fn read_texts(&self, selector: &str) -> Result<Vec<String>> {
        if selector != site::SEL_OVERLAY_ENTRIES {
            return Ok(Vec::new());
        }
        let state = self.state.lock().unwrap();
        let idx = state.round.min(self.entry_rounds.len() - 1);
        Ok(self.entry_rounds[idx].clone())
    }

    async fn read_attribute(&self, selector: &str, _attr: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        let key = (state.current_url.clone(), selector.to_string());
        Ok(self.attributes.get(&key).cloned())
    }

    async fn scroll_last_into_view(&self, _selector: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.scrolls += 1;
        state.round += 1;
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        Ok(self.cookies.clone())
    }

    async fn restore_cookies(&self, cookies: Vec<SessionCookie>) -> Result<()> {
        self.state.lock().unwrap().restored_cookies += cookies.len();
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.state.lock().unwrap().screenshots += 1;
        // PNG magic, enough for artifact-write assertions.
        Ok(vec![0x89, 0x50, 0x4e, 0x47])
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockPages
// ---------------------------------------------------------------------------

/// PageSource handing out one shared MockPage, so tests can assert on the
/// page after the pipeline finished with it.
pub struct MockPages {
    page: Arc<MockPage>,
    opened: AtomicUsize,
}

impl MockPages {
    pub fn new(page: Arc<MockPage>) -> Self {
        Self {
            page,
            opened: AtomicUsize::new(0),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for MockPages {
    async fn open_page(&self) -> Result<Arc<dyn PageDriver>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(self.page.clone())
    }
}

// ---------------------------------------------------------------------------
// MockAgent
// ---------------------------------------------------------------------------

/// ChatAgent returning one scripted reply (or failure) and counting calls.
pub struct MockAgent {
    reply: std::result::Result<String, String>,
    calls: AtomicUsize,
}

impl MockAgent {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            reply: Err(error.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatAgent for MockAgent {
    async fn chat(&self, _messages: Vec<Message>) -> AnyResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(e) => Err(anyhow!("{e}")),
        }
    }
}
