//! Termination-signal routing.
//!
//! [`SignalRouter`] dispatches delivered signals to registered callbacks
//! in registration order. OS delivery is wired through tokio's unix
//! signal streams; tests inject signals directly with [`SignalRouter::send`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Handler = Box<dyn Fn() + Send + Sync>;

/// Routes termination signals to per-signal handler lists.
pub struct SignalRouter {
    tx: mpsc::UnboundedSender<SignalKind>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<SignalKind>>>,
    handlers: Arc<RwLock<HashMap<i32, Vec<Handler>>>>,
}

impl SignalRouter {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Append a handler to the given signal's list. Handlers run in
    /// registration order when the signal is delivered.
    pub fn register<F>(&self, kind: SignalKind, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().expect("signal handlers lock poisoned");
        handlers
            .entry(kind.as_raw_value())
            .or_default()
            .push(Box::new(handler));
        debug!(signal = kind.as_raw_value(), "signal handler registered");
    }

    /// Subscribe to OS delivery of SIGINT, SIGTERM and SIGQUIT.
    ///
    /// Returns an error if the signal streams cannot be installed.
    pub fn listen_os_signals(&self) -> anyhow::Result<()> {
        for kind in [
            SignalKind::interrupt(),
            SignalKind::terminate(),
            SignalKind::quit(),
        ] {
            let mut stream = signal(kind)?;
            let tx = self.tx.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    if tx.send(kind).is_err() {
                        return;
                    }
                }
            });
        }
        Ok(())
    }

    /// Spawn the dispatcher. It runs every handler registered for each
    /// delivered signal and exits when `shutdown` flips.
    ///
    /// The dispatcher can only be started once; later calls return `None`.
    pub fn start(&self, mut shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        let mut rx = self.rx.lock().expect("signal receiver lock poisoned").take()?;
        let handlers = Arc::clone(&self.handlers);
        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        debug!("signal dispatcher stopped");
                        return;
                    }
                    delivered = rx.recv() => {
                        let Some(kind) = delivered else { return };
                        info!(signal = kind.as_raw_value(), "signal received");
                        let handlers = handlers.read().expect("signal handlers lock poisoned");
                        match handlers.get(&kind.as_raw_value()) {
                            Some(list) => {
                                for handler in list {
                                    handler();
                                }
                            }
                            None => warn!(signal = kind.as_raw_value(), "no handlers registered"),
                        }
                    }
                }
            }
        }))
    }

    /// Inject a signal directly, bypassing the OS. Test-only entry point.
    pub fn send(&self, kind: SignalKind) {
        let _ = self.tx.send(kind);
    }
}

impl Default for SignalRouter {
    fn default() -> Self {
        Self::new()
    }
}
