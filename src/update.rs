//! Startup update check.
//!
//! Fetches a small JSON release descriptor once and, if it names a newer
//! version, stores a notice that `/checkupdate` hands to clients. Failures
//! are logged and otherwise ignored.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Timeout for the release descriptor request.
const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Release descriptor served at the update URL.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    /// Latest published version, e.g. "0.3.1" or "v0.3.1".
    pub version: String,

    /// Download page for the release.
    #[serde(default)]
    pub url: Option<String>,
}

/// Shared, initially empty update notice.
#[derive(Debug, Clone, Default)]
pub struct UpdateNotice {
    inner: Arc<RwLock<Option<String>>>,
}

impl UpdateNotice {
    /// Creates an empty notice.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the notice text.
    pub async fn set(&self, text: impl Into<String>) {
        *self.inner.write().await = Some(text.into());
    }

    /// Returns the notice text, if an update was found.
    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }
}

/// Returns true if `candidate` is a strictly newer dotted version than
/// `current`. A leading `v` is ignored and missing components count as 0.
///
/// Unparsable versions are never newer.
pub fn is_newer(current: &str, candidate: &str) -> bool {
    match (parse_version(current), parse_version(candidate)) {
        (Some(current), Some(candidate)) => {
            let len = current.len().max(candidate.len());
            let pad = |v: &[u64]| {
                let mut v = v.to_vec();
                v.resize(len, 0);
                v
            };
            pad(candidate.as_slice()) > pad(current.as_slice())
        }
        _ => false,
    }
}

fn parse_version(version: &str) -> Option<Vec<u64>> {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);
    // Pre-release and build suffixes are ignored.
    let core = version.split(&['-', '+'][..]).next()?;
    core.split('.').map(|part| part.parse().ok()).collect()
}

/// Formats the notice shown to clients for `release`.
pub fn notice_text(release: &ReleaseInfo) -> String {
    let version = release.version.trim().trim_start_matches('v');
    match release.url {
        Some(ref url) => format!("New version {} available: {}", version, url),
        None => format!("New version {} available", version),
    }
}

/// Fetches the release descriptor at `url`.
pub async fn fetch_release(client: &reqwest::Client, url: &str) -> reqwest::Result<ReleaseInfo> {
    client
        .get(url)
        .timeout(CHECK_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json::<ReleaseInfo>()
        .await
}

/// Spawns the update check.
///
/// The task stores a notice in `notice` when `url` names a version newer
/// than this build, and exits early when `cancel` fires.
pub fn spawn_update_check(
    url: String,
    notice: UpdateNotice,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let client = reqwest::Client::new();
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("update check cancelled");
                return;
            }
            result = fetch_release(&client, &url) => result,
        };

        let current = env!("CARGO_PKG_VERSION");
        match result {
            Ok(release) if is_newer(current, &release.version) => {
                let text = notice_text(&release);
                info!(current, latest = %release.version, "update available");
                notice.set(text).await;
            }
            Ok(release) => {
                debug!(current, latest = %release.version, "no update available");
            }
            Err(e) => {
                warn!(url = %url, error = %e, "update check failed");
            }
        }
    })
}
