// src/signal.rs

//! Interrupt handling.
//!
//! The first SIGINT/SIGTERM (Ctrl-C on Windows) sets the run's cancellation
//! token. Later signals are logged and otherwise ignored so the process gets
//! one orderly shutdown instead of dying halfway through it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::engine::CancelToken;

/// Connects OS signals to a [`CancelToken`].
#[derive(Debug, Clone)]
pub struct SignalBridge {
    token: CancelToken,
    received: Arc<AtomicUsize>,
}

impl SignalBridge {
    pub fn new(token: CancelToken) -> Self {
        Self {
            token,
            received: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Record one received signal. Returns `true` when this signal is the
    /// one that cancelled the run.
    pub fn on_signal(&self) -> bool {
        let seen = self.received.fetch_add(1, Ordering::SeqCst);
        if seen > 0 {
            warn!(count = seen + 1, "shutdown already in progress; ignoring signal");
            return false;
        }

        let cancelled = self.token.cancel();
        info!(cancelled, "interrupt received; no further commands will start");
        cancelled
    }

    /// Whether any signal arrived.
    pub fn fired(&self) -> bool {
        self.signals_received() > 0
    }

    pub fn signals_received(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }
}

/// Listen for termination signals for the rest of the process lifetime.
pub fn spawn_listener(bridge: SignalBridge) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = listen(&bridge).await {
            warn!(error = %e, "failed to install signal handlers");
        }
    })
}

#[cfg(unix)]
async fn listen(bridge: &SignalBridge) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
        bridge.on_signal();
    }
}

#[cfg(not(unix))]
async fn listen(bridge: &SignalBridge) -> std::io::Result<()> {
    loop {
        tokio::signal::ctrl_c().await?;
        bridge.on_signal();
    }
}
