//! Pipeline orchestrator: one end-to-end invocation.
//!
//! Opens a fresh page from the pool, runs login → collect → bios →
//! classify, and turns Yes verdicts into result rows. On failure it grabs a
//! full-page screenshot for postmortems before propagating; success or not,
//! the page is closed exactly once. There are no partial results: the call
//! either returns the full row set or an error.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{error, info, warn};

use ai_client::ChatAgent;
use flocksift_common::{Config, Credentials, Result, ResultRow};

use crate::bio::BioFetcher;
use crate::browser::{PageDriver, PageSource};
use crate::classify::{BioClassifier, Predicate};
use crate::followers::FollowerCollector;
use crate::login::LoginFlow;
use crate::session::SessionStore;
use crate::site::profile_url;

pub struct Pipeline {
    pages: Arc<dyn PageSource>,
    sessions: SessionStore,
    classifier: BioClassifier,
    artifact_dir: PathBuf,
    time_budget: Duration,
}

impl Pipeline {
    pub fn new(
        pages: Arc<dyn PageSource>,
        sessions: SessionStore,
        agent: Arc<dyn ChatAgent>,
        predicate: Predicate,
        artifact_dir: impl Into<PathBuf>,
        time_budget: Duration,
    ) -> Self {
        Self {
            pages,
            sessions,
            classifier: BioClassifier::new(agent, predicate),
            artifact_dir: artifact_dir.into(),
            time_budget,
        }
    }

    /// Wire a pipeline from env config with the default predicate.
    pub fn from_config(pages: Arc<dyn PageSource>, agent: Arc<dyn ChatAgent>, config: &Config) -> Self {
        Self::new(
            pages,
            SessionStore::new(config.session_dir.clone()),
            agent,
            Predicate::christian_student(),
            config.artifact_dir.clone(),
            Duration::from_secs(config.scroll_budget_secs),
        )
    }

    /// Run one full invocation against `target`, returning the followers
    /// that match the predicate.
    pub async fn run(
        &self,
        creds: &Credentials,
        target: &str,
        max_count: usize,
    ) -> Result<Vec<ResultRow>> {
        let page = self.pages.open_page().await?;

        let outcome = self.drive(page.as_ref(), creds, target, max_count).await;

        if let Err(e) = &outcome {
            error!(target, error = %e, "Pipeline failed, capturing diagnostic artifact");
            self.capture_artifact(page.as_ref(), target).await;
        }
        if let Err(e) = page.close().await {
            warn!(error = %e, "Failed to close page");
        }

        outcome
    }

    async fn drive(
        &self,
        page: &dyn PageDriver,
        creds: &Credentials,
        target: &str,
        max_count: usize,
    ) -> Result<Vec<ResultRow>> {
        LoginFlow::new(&self.sessions)
            .ensure_authenticated(page, creds)
            .await?;

        let handles = FollowerCollector::new(max_count, self.time_budget)
            .collect(page, target)
            .await?;

        let records = BioFetcher.fetch_all(page, &handles).await;
        let verdicts = self.classifier.classify(&records).await;

        let rows: Vec<ResultRow> = verdicts
            .into_iter()
            .filter(|(_, verdict)| verdict.is_yes())
            .map(|(username, _)| ResultRow {
                url: profile_url(&username),
                username,
            })
            .collect();

        info!(
            target,
            collected = records.len(),
            matched = rows.len(),
            "Pipeline complete"
        );
        Ok(rows)
    }

    /// Best-effort failure screenshot; never turns a pipeline error into a
    /// different one.
    async fn capture_artifact(&self, page: &dyn PageDriver, target: &str) {
        let bytes = match page.screenshot().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Could not capture failure screenshot");
                return;
            }
        };
        if let Err(e) = std::fs::create_dir_all(&self.artifact_dir) {
            warn!(error = %e, "Could not create artifact dir");
            return;
        }
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let safe_target: String = target
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let path = self.artifact_dir.join(format!("{safe_target}-{stamp}.png"));
        match std::fs::write(&path, bytes) {
            Ok(()) => info!(path = %path.display(), "Wrote failure screenshot"),
            Err(e) => warn!(error = %e, "Could not write failure screenshot"),
        }
    }
}
