//! Follower collection via the profile's followers overlay.
//!
//! The overlay lazy-loads entries as it scrolls, so collection is a
//! read / scroll / settle loop bounded by both a distinct-handle cap and a
//! wall-clock budget. Whichever bound trips first ends the loop; a short
//! or stalled list is a valid partial result, not an error.

use std::collections::HashSet;
use std::time::Duration;

use tracing::info;

use flocksift_common::{FlocksiftError, Result};

use crate::browser::PageDriver;
use crate::site::{profile_url, SEL_FOLLOWERS_LINK, SEL_OVERLAY, SEL_OVERLAY_ENTRIES};

const PROFILE_NAV_TIMEOUT: Duration = Duration::from_secs(30);
const OVERLAY_TIMEOUT: Duration = Duration::from_secs(15);
/// Settle pause after each scroll, giving lazy-loading a beat to attach
/// more entries.
const SCROLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct FollowerCollector {
    max_count: usize,
    time_budget: Duration,
}

impl FollowerCollector {
    pub fn new(max_count: usize, time_budget: Duration) -> Self {
        Self {
            max_count,
            time_budget,
        }
    }

    /// Harvest up to `max_count` distinct follower handles of `target`,
    /// returned sorted lexicographically. The overlay never appearing is a
    /// structural failure; everything after that is best-effort.
    pub async fn collect(&self, page: &dyn PageDriver, target: &str) -> Result<Vec<String>> {
        page.navigate(&profile_url(target), PROFILE_NAV_TIMEOUT)
            .await?;

        // The followers link can attach after the load event settles.
        page.wait_for(SEL_FOLLOWERS_LINK, OVERLAY_TIMEOUT)
            .await
            .map_err(|_| FlocksiftError::NotFound("followers link".to_string()))?;
        page.click(SEL_FOLLOWERS_LINK).await?;

        page.wait_for(SEL_OVERLAY, OVERLAY_TIMEOUT)
            .await
            .map_err(|_| FlocksiftError::NotFound("followers overlay".to_string()))?;
        page.wait_for(SEL_OVERLAY_ENTRIES, OVERLAY_TIMEOUT)
            .await
            .map_err(|_| FlocksiftError::NotFound("followers overlay".to_string()))?;

        let mut handles: HashSet<String> = HashSet::new();
        let started = tokio::time::Instant::now();

        loop {
            for text in page.read_texts(SEL_OVERLAY_ENTRIES).await? {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    handles.insert(trimmed.to_string());
                }
            }
            if handles.len() >= self.max_count {
                break;
            }
            if started.elapsed() >= self.time_budget {
                break;
            }
            page.scroll_last_into_view(SEL_OVERLAY_ENTRIES).await?;
            tokio::time::sleep(SCROLL_INTERVAL).await;
        }

        info!(target, count = handles.len(), "Collected follower handles");

        let mut sorted: Vec<String> = handles.into_iter().collect();
        sorted.sort();
        sorted.truncate(self.max_count);
        Ok(sorted)
    }
}
