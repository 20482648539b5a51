//! Signal handling for long harvests.
//!
//! SIGINT and SIGTERM flip the cancel token and wake any retry pause in
//! progress; the harvest loop stops at its next safe point, after persisting
//! the entry in flight.

use std::sync::Arc;

use anyhow::Result;
use romdb_core::harvest::cancel::CancelToken;
use tokio::sync::Notify;
use tracing::warn;

/// Cancel `token` and wake whoever is pausing on `wake`.
///
/// `notify_one` keeps a permit when nobody is waiting yet, so a pause that
/// starts right after the request still returns immediately.
pub fn request(token: &CancelToken, wake: &Notify) {
    token.cancel();
    wake.notify_one();
}

/// Listen for termination signals. The returned handle is woken on the first
/// one.
pub fn install(cancel: &CancelToken) -> Result<Arc<Notify>> {
    let token = cancel.clone();
    let wake = Arc::new(Notify::new());
    let listener = Arc::clone(&wake);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
            warn!("termination signal received, stopping after the current entry");
            request(&token, &listener);
        });
    }

    #[cfg(not(unix))]
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("termination signal received, stopping after the current entry");
            request(&token, &listener);
        }
    });

    Ok(wake)
}
