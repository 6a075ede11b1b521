//! Opens the service page in the default browser after startup.

use std::time::Duration;

use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Delay before launching, so the listener is accepting connections.
pub const OPEN_DELAY: Duration = Duration::from_millis(500);

/// Returns the platform opener program and its arguments for `url`.
pub fn opener_command(url: &str) -> (&'static str, Vec<String>) {
    if cfg!(target_os = "macos") {
        ("open", vec![url.to_string()])
    } else if cfg!(target_os = "windows") {
        // The empty argument is the window title `start` expects first.
        (
            "cmd",
            vec![
                "/C".to_string(),
                "start".to_string(),
                String::new(),
                url.to_string(),
            ],
        )
    } else {
        ("xdg-open", vec![url.to_string()])
    }
}

/// Spawns a task that opens `url` after `delay` unless `cancel` fires first.
///
/// A missing opener is logged and ignored.
pub fn spawn_open_browser(
    url: String,
    delay: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("browser launch cancelled");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let (program, args) = opener_command(&url);
        match Command::new(program).args(&args).status().await {
            Ok(status) if status.success() => debug!(url = %url, "opened browser"),
            Ok(status) => warn!(program, %status, "browser opener failed"),
            Err(e) => warn!(program, error = %e, "could not launch browser"),
        }
    })
}
