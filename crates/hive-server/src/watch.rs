//! `hive-server watch`: follow a course's environments until they answer.
//!
//! The assignment list is fetched from a running API server on every
//! refresh, and the readiness poller is synced to it, so assignments created
//! or deleted elsewhere are picked up without a restart.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use hive_provisioning::readiness::{ReadinessPoller, ReadinessProbe, ReadinessStatus};
use hive_provisioning::storage::AssignmentWithEnvironment;
use reqwest::Url;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fetches a course's assignments from the API server.
#[derive(Debug, Clone)]
pub struct AssignmentFeed {
    http: reqwest::Client,
    url: Url,
}

impl AssignmentFeed {
    pub fn new(api_base: &str, course_code: &str) -> anyhow::Result<Self> {
        let mut url = Url::parse(api_base).with_context(|| format!("invalid API URL {api_base}"))?;
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("API URL cannot be a base: {api_base}"))?
            .pop_if_empty()
            .extend(["api", "course", course_code, "assignments"]);

        let _ = rustls::crypto::ring::default_provider().install_default();
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, url })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub async fn fetch(&self) -> anyhow::Result<Vec<AssignmentWithEnvironment>> {
        let resp = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .with_context(|| format!("GET {}", self.url))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("GET {} returned {status}: {body}", self.url);
        }
        resp.json().await.context("malformed assignment list")
    }
}

/// `(assignment id, environment address)` for every provisioned assignment.
pub fn watch_targets(assignments: &[AssignmentWithEnvironment]) -> Vec<(String, String)> {
    assignments
        .iter()
        .filter_map(|a| {
            a.environment_url()
                .map(|url| (a.assignment.id.clone(), url.to_string()))
        })
        .collect()
}

/// Keep `poller` in sync with `feed` until `shutdown` fires.
///
/// A failed refresh is logged and leaves the current watches running.
pub async fn run<P: ReadinessProbe>(
    feed: AssignmentFeed,
    poller: Arc<ReadinessPoller<P>>,
    refresh: Duration,
    shutdown: CancellationToken,
) {
    let mut updates = poller.subscribe();
    let mut timer = tokio::time::interval(refresh.max(Duration::from_millis(1)));

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = timer.tick() => {
                match feed.fetch().await {
                    Ok(assignments) => {
                        let targets = watch_targets(&assignments);
                        debug!(
                            assignments = assignments.len(),
                            provisioned = targets.len(),
                            "Assignment list refreshed"
                        );
                        poller.sync(targets).await;
                    }
                    Err(e) => warn!(error = %e, "Failed to refresh assignment list"),
                }
            }
            update = updates.recv() => match update {
                Ok(update) if update.status == ReadinessStatus::Available => {
                    info!(assignment_id = %update.assignment_id, "Environment available");
                }
                Ok(update) => debug!(assignment_id = %update.assignment_id, "Environment pending"),
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "Readiness updates lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    poller.shutdown().await;
}
