//! Waiting for the code-intelligence engine to catch up.
//!
//! The observed text is checked once up front, then after every host event.
//! The first relevant event decides what happens next: matching text ends
//! the wait, a source change restarts it from a fresh snapshot, and a closed
//! or deleted shadow document starts another round.

use std::path::Path;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::host::{HostEvent, ShadowHost};
use super::session::ShadowSession;

const LOG_TARGET: &str = "reqfile_ls::shadow_sync";

enum Round {
    InSync(String),
    Restart,
    Abort,
}

pub(super) async fn wait_for_in_sync<H: ShadowHost>(
    session: &ShadowSession<H>,
    source_path: &Path,
    cancel: &CancellationToken,
) -> Option<String> {
    loop {
        match one_round(session, source_path, cancel).await {
            Round::InSync(text) => return Some(text),
            Round::Restart => continue,
            Round::Abort => return None,
        }
    }
}

async fn one_round<H: ShadowHost>(
    session: &ShadowSession<H>,
    source_path: &Path,
    cancel: &CancellationToken,
) -> Round {
    let host = session.host();
    // Subscribe before the first check so no change slips between the two.
    let mut events = host.subscribe();
    let shadow_path = session.shadow_path(source_path);

    let Some(desired) = session.desired_content(source_path).await else {
        log::debug!(
            target: LOG_TARGET,
            "No shadow content for {}",
            source_path.display()
        );
        return Round::Abort;
    };

    if host.observed_text(&shadow_path).await.as_deref() == Some(desired.as_str()) {
        return Round::InSync(desired);
    }

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return Round::Abort,
            event = events.recv() => event,
        };

        match event {
            Ok(HostEvent::ShadowChanged(path)) if path == shadow_path => {
                if host.observed_text(&shadow_path).await.as_deref() == Some(desired.as_str()) {
                    return Round::InSync(desired);
                }
            }
            Ok(HostEvent::SourceChanged(path)) if path == source_path => {
                log::debug!(target: LOG_TARGET, "Source changed; restarting wait");
                return Round::Restart;
            }
            Ok(HostEvent::ShadowClosed(path)) | Ok(HostEvent::ShadowDeleted(path))
                if path == shadow_path =>
            {
                return Round::Restart;
            }
            Ok(_) => {}
            Err(RecvError::Lagged(_)) => return Round::Restart,
            Err(RecvError::Closed) => return Round::Abort,
        }
    }
}
