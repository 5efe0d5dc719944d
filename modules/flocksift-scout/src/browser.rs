//! Browser engine access.
//!
//! `BrowserPool` launches one long-lived headless Chromium and hands out
//! isolated pages, capped by a semaphore. `PageDriver` is the capability
//! interface the pipeline depends on; `ChromiumPage` implements it over CDP,
//! doing DOM work through `page.evaluate` so no selector logic leaks into
//! the rest of the crate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::info;

use flocksift_common::{FlocksiftError, Result, SessionCookie};

/// Headless Chromium leaks "HeadlessChrome" in its default UA.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64)";

const VIEWPORT_WIDTH: u32 = 1280;
const VIEWPORT_HEIGHT: u32 = 800;

/// Polling interval for selector waits.
const WAIT_POLL: Duration = Duration::from_millis(250);

fn transport(e: impl std::fmt::Display) -> FlocksiftError {
    FlocksiftError::Transport(e.to_string())
}

// ---------------------------------------------------------------------------
// PageDriver — the capability interface the pipeline is written against
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for the load to settle, bounded by `timeout`.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Wait until `selector` is attached to the DOM, bounded by `timeout`.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Focus the element and set its value, firing input/change events.
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    async fn click(&self, selector: &str) -> Result<()>;

    /// Click the first button-like element whose text contains `needle`
    /// (case-insensitive). Returns whether anything was clicked.
    async fn click_text(&self, needle: &str) -> Result<bool>;

    /// Inner text of every element matching `selector`, in DOM order.
    async fn read_texts(&self, selector: &str) -> Result<Vec<String>>;

    async fn read_attribute(&self, selector: &str, attr: &str) -> Result<Option<String>>;

    /// Scroll the last element matching `selector` into view, triggering
    /// lazy-loading in virtualized lists.
    async fn scroll_last_into_view(&self, selector: &str) -> Result<()>;

    async fn cookies(&self) -> Result<Vec<SessionCookie>>;

    async fn restore_cookies(&self, cookies: Vec<SessionCookie>) -> Result<()>;

    async fn screenshot(&self) -> Result<Vec<u8>>;

    async fn close(&self) -> Result<()>;
}

/// Source of fresh navigable contexts. `BrowserPool` in production, a mock
/// in tests.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn open_page(&self) -> Result<Arc<dyn PageDriver>>;
}

// ---------------------------------------------------------------------------
// BrowserPool
// ---------------------------------------------------------------------------

pub struct BrowserPool {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
    semaphore: Arc<Semaphore>,
}

impl BrowserPool {
    /// Launch a headless browser shared by all pipeline invocations.
    pub async fn launch(max_concurrent: usize) -> anyhow::Result<Self> {
        let (browser, mut handler) = Browser::launch(
            BrowserConfig::builder()
                .no_sandbox()
                .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
                .args(vec![
                    "--disable-blink-features=AutomationControlled",
                    "--disable-dev-shm-usage",
                    "--disable-gpu",
                    "--no-first-run",
                    "--no-default-browser-check",
                ])
                .arg(format!("--user-agent={USER_AGENT}"))
                .build()
                .map_err(|e| anyhow::anyhow!(e))
                .context("Failed to build browser config")?,
        )
        .await
        .context("Failed to launch browser")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::error!("Browser event error: {}", e);
                }
            }
        });

        info!(max_concurrent, "Browser pool ready");

        Ok(Self {
            browser,
            handler_task,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        })
    }

    /// Close the browser process. Pages handed out earlier become invalid.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        self.browser.close().await.context("Failed to close browser")?;
        self.handler_task.abort();
        Ok(())
    }
}

#[async_trait]
impl PageSource for BrowserPool {
    async fn open_page(&self) -> Result<Arc<dyn PageDriver>> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(transport)?;

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(transport)?;

        Ok(Arc::new(ChromiumPage {
            page,
            closed: AtomicBool::new(false),
            _permit: permit,
        }))
    }
}

// ---------------------------------------------------------------------------
// ChromiumPage
// ---------------------------------------------------------------------------

/// One isolated page plus the pool permit that capacity-limits it.
pub struct ChromiumPage {
    page: Page,
    closed: AtomicBool,
    _permit: OwnedSemaphorePermit,
}

/// The orchestrator closes pages explicitly; this guard covers the case
/// where the owning future is cancelled before it gets there, so the CDP
/// target does not linger in the shared browser until shutdown.
impl Drop for ChromiumPage {
    fn drop(&mut self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let page = self.page.clone();
            handle.spawn(async move {
                let _ = page.close().await;
            });
        }
    }
}

impl ChromiumPage {
    async fn eval<T: DeserializeOwned>(&self, js: String) -> Result<T> {
        let result = self.page.evaluate(js).await.map_err(transport)?;
        result
            .into_value::<T>()
            .map_err(|e| FlocksiftError::Parse(e.to_string()))
    }

    /// Selector attached and usable right now?
    async fn selector_present(&self, selector: &str) -> Result<bool> {
        let sel = serde_json::to_string(selector).map_err(transport)?;
        self.eval(format!("document.querySelector({sel}) !== null"))
            .await
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        let nav = async {
            self.page.goto(url).await.map_err(transport)?;
            self.page.wait_for_navigation().await.map_err(transport)?;
            Ok::<(), FlocksiftError>(())
        };
        match tokio::time::timeout(timeout, nav).await {
            Ok(result) => result,
            Err(_) => Err(FlocksiftError::timeout(format!("navigation to {url}"))),
        }
    }

    async fn current_url(&self) -> Result<String> {
        self.eval("window.location.href".to_string()).await
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.selector_present(selector).await? {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(FlocksiftError::timeout(format!("selector {selector}")));
            }
            tokio::time::sleep(WAIT_POLL).await;
        }
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let sel = serde_json::to_string(selector).map_err(transport)?;
        let val = serde_json::to_string(value).map_err(transport)?;
        let js = format!(
            r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return false;
  try {{ el.focus(); }} catch (_) {{}}
  el.value = {val};
  try {{ el.dispatchEvent(new Event('input', {{ bubbles: true }})); }} catch (_) {{}}
  try {{ el.dispatchEvent(new Event('change', {{ bubbles: true }})); }} catch (_) {{}}
  return true;
}})()"#
        );
        let ok: bool = self.eval(js).await?;
        if ok {
            Ok(())
        } else {
            Err(FlocksiftError::NotFound(selector.to_string()))
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let sel = serde_json::to_string(selector).map_err(transport)?;
        let js = format!(
            r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return false;
  try {{ el.click(); return true; }} catch (_) {{}}
  try {{
    el.dispatchEvent(new MouseEvent('click', {{ bubbles: true, cancelable: true, view: window }}));
    return true;
  }} catch (_) {{}}
  return false;
}})()"#
        );
        let ok: bool = self.eval(js).await?;
        if ok {
            Ok(())
        } else {
            Err(FlocksiftError::NotFound(selector.to_string()))
        }
    }

    async fn click_text(&self, needle: &str) -> Result<bool> {
        let want = serde_json::to_string(&needle.to_lowercase()).map_err(transport)?;
        let js = format!(
            r#"(() => {{
  const want = {want};
  const els = Array.from(document.querySelectorAll('button,[role="button"],div,span'));
  for (const el of els) {{
    const txt = String(el.textContent || '').trim().toLowerCase();
    if (txt === want || (txt.length < 40 && txt.includes(want))) {{
      try {{ el.click(); return true; }} catch (_) {{}}
    }}
  }}
  return false;
}})()"#
        );
        self.eval(js).await
    }

    async fn read_texts(&self, selector: &str) -> Result<Vec<String>> {
        let sel = serde_json::to_string(selector).map_err(transport)?;
        let js = format!(
            "Array.from(document.querySelectorAll({sel})).map(e => e.innerText || e.textContent || '')"
        );
        self.eval(js).await
    }

    async fn read_attribute(&self, selector: &str, attr: &str) -> Result<Option<String>> {
        let sel = serde_json::to_string(selector).map_err(transport)?;
        let name = serde_json::to_string(attr).map_err(transport)?;
        let js = format!(
            r#"(() => {{
  const el = document.querySelector({sel});
  return el ? el.getAttribute({name}) : null;
}})()"#
        );
        self.eval(js).await
    }

    async fn scroll_last_into_view(&self, selector: &str) -> Result<()> {
        let sel = serde_json::to_string(selector).map_err(transport)?;
        let js = format!(
            r#"(() => {{
  const els = document.querySelectorAll({sel});
  if (els.length) els[els.length - 1].scrollIntoView({{ block: 'center' }});
  return els.length;
}})()"#
        );
        let _count: u64 = self.eval(js).await?;
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        let cookies = self.page.get_cookies().await.map_err(transport)?;
        Ok(cookies
            .into_iter()
            .map(|c| SessionCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                secure: c.secure,
                http_only: c.http_only,
                same_site: c.same_site.map(|s| format!("{s:?}")),
            })
            .collect())
    }

    async fn restore_cookies(&self, cookies: Vec<SessionCookie>) -> Result<()> {
        if cookies.is_empty() {
            return Ok(());
        }
        let mut params = Vec::with_capacity(cookies.len());
        for c in cookies {
            let mut cookie = CookieParam::new(c.name, c.value);
            cookie.domain = Some(c.domain);
            cookie.path = Some(c.path);
            cookie.secure = Some(c.secure);
            cookie.http_only = Some(c.http_only);
            params.push(cookie);
        }
        self.page.set_cookies(params).await.map_err(transport)?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(transport)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.page.clone().close().await.map_err(transport)
    }
}
