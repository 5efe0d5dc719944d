//! Boundary tests — one full pipeline invocation at a time.
//!
//! Each test follows MOCK → FUNCTION → OUTPUT: script a MockPage and
//! MockAgent, call Pipeline::run once, assert on rows and on how the page
//! was used.

use std::sync::Arc;
use std::time::Duration;

use flocksift_common::{Credentials, FlocksiftError};

use crate::classify::Predicate;
use crate::pipeline::Pipeline;
use crate::session::SessionStore;
use crate::site;
use crate::testing::{MockAgent, MockPage, MockPages};

fn creds() -> Credentials {
    Credentials::new("alice", "hunter2")
}

fn pipeline(
    page: Arc<MockPage>,
    agent: Arc<MockAgent>,
    session_dir: &std::path::Path,
    artifact_dir: &std::path::Path,
) -> (Pipeline, Arc<MockPages>) {
    let pages = Arc::new(MockPages::new(page));
    let pipeline = Pipeline::new(
        pages.clone(),
        SessionStore::new(session_dir),
        agent,
        Predicate::christian_student(),
        artifact_dir,
        Duration::from_secs(2),
    );
    (pipeline, pages)
}

#[tokio::test]
async fn matching_followers_become_result_rows() {
    let sessions = tempfile::tempdir().unwrap();
    let artifacts = tempfile::tempdir().unwrap();

    // Two followers render on the first overlay read. amy's bio is a
    // definite heuristic hit; ben's goes to the semantic tier and comes
    // back "no".
    let page = Arc::new(
        MockPage::new()
            .with_entry_rounds(vec![vec!["amy".into(), "ben".into()]])
            .on_attribute(
                &site::profile_url("amy"),
                site::SEL_BIO_META,
                "amy on Instagram: \"senior, psalm 23\"",
            )
            .on_attribute(
                &site::profile_url("ben"),
                site::SEL_BIO_META,
                "ben on Instagram: \"dog dad\"",
            ),
    );
    let agent = Arc::new(MockAgent::replying("no"));

    let (pipeline, pages) = pipeline(page.clone(), agent.clone(), sessions.path(), artifacts.path());
    let rows = pipeline.run(&creds(), "target", 2).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].username, "amy");
    assert_eq!(rows[0].url, "https://www.instagram.com/amy/");
    assert_eq!(agent.calls(), 1);
    assert_eq!(pages.opened(), 1);
    assert_eq!(page.close_count(), 1, "page released exactly once");
    assert_eq!(page.screenshot_count(), 0, "no artifact on success");
}

#[tokio::test]
async fn no_matches_is_an_empty_success() {
    let sessions = tempfile::tempdir().unwrap();
    let artifacts = tempfile::tempdir().unwrap();

    let page = Arc::new(
        MockPage::new()
            .with_entry_rounds(vec![vec!["cal".into()]])
            .on_attribute(
                &site::profile_url("cal"),
                site::SEL_BIO_META,
                "cal on Instagram: \"espresso and film\"",
            ),
    );
    let agent = Arc::new(MockAgent::replying("no"));

    let (pipeline, _) = pipeline(page.clone(), agent, sessions.path(), artifacts.path());
    let rows = pipeline.run(&creds(), "target", 1).await.unwrap();

    assert!(rows.is_empty());
    assert_eq!(page.close_count(), 1);
}

#[tokio::test]
async fn structural_failure_captures_artifact_and_releases_once() {
    let sessions = tempfile::tempdir().unwrap();
    let artifacts = tempfile::tempdir().unwrap();

    // The followers overlay never appears.
    let page = Arc::new(
        MockPage::new()
            .with_entry_rounds(vec![vec!["amy".into()]])
            .missing_selector(site::SEL_OVERLAY),
    );
    let agent = Arc::new(MockAgent::replying("no"));

    let (pipeline, _) = pipeline(page.clone(), agent.clone(), sessions.path(), artifacts.path());
    let err = pipeline.run(&creds(), "target", 5).await.unwrap_err();

    assert!(matches!(err, FlocksiftError::NotFound(ref what) if what == "followers overlay"));
    assert_eq!(page.close_count(), 1, "page still released exactly once");
    assert_eq!(page.screenshot_count(), 1);
    assert_eq!(agent.calls(), 0, "no classification on aborted run");

    let artifact_count = std::fs::read_dir(artifacts.path()).unwrap().count();
    assert_eq!(artifact_count, 1, "one failure screenshot written");
}

#[tokio::test(start_paused = true)]
async fn aborted_run_drops_the_page() {
    let sessions = tempfile::tempdir().unwrap();
    let artifacts = tempfile::tempdir().unwrap();

    // The landing navigation never resolves; the caller gives up and
    // cancels the invocation mid-flight.
    let page = Arc::new(
        MockPage::new()
            .with_entry_rounds(vec![vec!["amy".into()]])
            .hang_navigate(site::BASE_URL),
    );
    let agent = Arc::new(MockAgent::replying("no"));

    let (pipeline, pages) = pipeline(page.clone(), agent, sessions.path(), artifacts.path());
    let task = tokio::spawn(async move { pipeline.run(&creds(), "target", 1).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    task.abort();
    let _ = task.await;

    // The cancelled future released its page handle; only the test and the
    // source still hold one, so drop-based cleanup can run.
    assert_eq!(Arc::strong_count(&page), 2);
    assert_eq!(pages.opened(), 1);
}

#[tokio::test]
async fn bio_failures_do_not_abort_the_run() {
    let sessions = tempfile::tempdir().unwrap();
    let artifacts = tempfile::tempdir().unwrap();

    // amy's profile navigation fails; she is still classified (empty bio →
    // No) and the run succeeds.
    let page = Arc::new(
        MockPage::new()
            .with_entry_rounds(vec![vec!["amy".into(), "ben".into()]])
            .fail_navigate(&site::profile_url("amy"))
            .on_attribute(
                &site::profile_url("ben"),
                site::SEL_BIO_META,
                "ben on Instagram: \"freshman, jesus first\"",
            ),
    );
    let agent = Arc::new(MockAgent::replying("no"));

    let (pipeline, _) = pipeline(page.clone(), agent.clone(), sessions.path(), artifacts.path());
    let rows = pipeline.run(&creds(), "target", 2).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].username, "ben");
    assert_eq!(agent.calls(), 0, "empty bio and heuristic hit need no external call");
}
