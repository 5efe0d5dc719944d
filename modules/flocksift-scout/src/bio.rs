//! Per-profile bio extraction.
//!
//! The bio is read from the profile page's description metadata rather than
//! the rendered DOM; the field packs stats and bio into one string separated
//! by a fixed delimiter. Every failure mode for a single handle collapses to
//! an empty bio so one bad profile never aborts the batch.

use std::time::Duration;

use tracing::{info, warn};

use flocksift_common::{ProfileRecord, Result};

use crate::browser::PageDriver;
use crate::site::{profile_url, BIO_DELIMITER, SEL_BIO_META};

const BIO_NAV_TIMEOUT: Duration = Duration::from_secs(30);

pub struct BioFetcher;

impl BioFetcher {
    /// Bio text for `handle`, empty on any failure.
    pub async fn fetch(&self, page: &dyn PageDriver, handle: &str) -> String {
        match self.try_fetch(page, handle).await {
            Ok(bio) => bio,
            Err(e) => {
                warn!(handle, error = %e, "Bio fetch failed, recording empty bio");
                String::new()
            }
        }
    }

    /// One record per handle, same order as the input.
    pub async fn fetch_all(
        &self,
        page: &dyn PageDriver,
        handles: &[String],
    ) -> Vec<ProfileRecord> {
        info!(count = handles.len(), "Fetching follower bios");
        let mut records = Vec::with_capacity(handles.len());
        for handle in handles {
            let bio = self.fetch(page, handle).await;
            records.push(ProfileRecord::new(handle.clone(), bio));
        }
        records
    }

    async fn try_fetch(&self, page: &dyn PageDriver, handle: &str) -> Result<String> {
        page.navigate(&profile_url(handle), BIO_NAV_TIMEOUT).await?;
        let desc = page.read_attribute(SEL_BIO_META, "content").await?;
        Ok(extract_bio(desc.as_deref()))
    }
}

fn extract_bio(description: Option<&str>) -> String {
    let Some(description) = description else {
        return String::new();
    };
    match description.split_once(BIO_DELIMITER) {
        Some((_, bio)) => bio.trim().trim_matches('"').to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site;
    use crate::testing::MockPage;

    #[test]
    fn extracts_text_after_delimiter() {
        let desc = "10 Followers, 5 Posts - See photos from amy on Instagram: \"senior at UMN\"";
        assert_eq!(extract_bio(Some(desc)), "senior at UMN");
    }

    #[test]
    fn missing_delimiter_means_no_bio() {
        assert_eq!(extract_bio(Some("just some text")), "");
        assert_eq!(extract_bio(None), "");
    }

    #[tokio::test]
    async fn failed_navigation_yields_empty_bio() {
        let page = MockPage::new().fail_navigate(&site::profile_url("ghost"));
        assert_eq!(BioFetcher.fetch(&page, "ghost").await, "");
    }

    #[tokio::test]
    async fn fetch_all_preserves_order_across_failures() {
        let page = MockPage::new()
            .on_attribute(
                &site::profile_url("amy"),
                site::SEL_BIO_META,
                "amy on Instagram: \"class of 2027\"",
            )
            .fail_navigate(&site::profile_url("bad"))
            .on_attribute(
                &site::profile_url("zoe"),
                site::SEL_BIO_META,
                "zoe on Instagram: \"coffee person\"",
            );

        let records = BioFetcher
            .fetch_all(
                &page,
                &["amy".to_string(), "bad".to_string(), "zoe".to_string()],
            )
            .await;

        let got: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.username.as_str(), r.bio.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("amy", "class of 2027"),
                ("bad", ""),
                ("zoe", "coffee person"),
            ]
        );
    }
}
