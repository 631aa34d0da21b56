//! One-shot initialization signal.
//!
//! A single writer resolves the signal exactly once; any number of readers
//! observe it. Built on `tokio::sync::watch`, so a reader that subscribes late
//! still sees the terminal state.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::BuildError;

/// Lifecycle of the route build.
#[derive(Debug, Clone, Default)]
pub enum InitState {
    #[default]
    Pending,
    Succeeded,
    Failed(Arc<BuildError>),
}

impl InitState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InitState::Pending)
    }
}

/// What waiting on the signal yields.
pub type InitOutcome = Result<(), Arc<BuildError>>;

/// Create a pending signal and the completer that resolves it.
pub fn channel() -> (InitCompleter, InitSignal) {
    let (tx, rx) = watch::channel(InitState::Pending);
    (InitCompleter { tx: Some(tx) }, InitSignal { rx })
}

/// Write side. Completing consumes it; dropping it unresolved fails the
/// signal with [`BuildError::Abandoned`].
#[derive(Debug)]
pub struct InitCompleter {
    tx: Option<watch::Sender<InitState>>,
}

impl InitCompleter {
    pub fn succeed(mut self) {
        self.resolve(InitState::Succeeded);
    }

    pub fn fail(mut self, error: BuildError) {
        self.resolve(InitState::Failed(Arc::new(error)));
    }

    fn resolve(&mut self, state: InitState) {
        if let Some(tx) = self.tx.take() {
            tx.send_replace(state);
        }
    }
}

impl Drop for InitCompleter {
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::warn!("Route initialization dropped before completing");
            self.resolve(InitState::Failed(Arc::new(BuildError::Abandoned)));
        }
    }
}

/// Read side; cheap to clone.
#[derive(Debug, Clone)]
pub struct InitSignal {
    rx: watch::Receiver<InitState>,
}

impl InitSignal {
    pub fn state(&self) -> InitState {
        self.rx.borrow().clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.rx.borrow().is_terminal()
    }

    /// Wait for the terminal state.
    pub async fn wait(&self) -> InitOutcome {
        let mut rx = self.rx.clone();
        let state = match rx.wait_for(InitState::is_terminal).await {
            Ok(state) => state.clone(),
            // The sender always publishes a terminal state before going away.
            Err(_) => InitState::Failed(Arc::new(BuildError::Abandoned)),
        };
        match state {
            InitState::Failed(reason) => Err(reason),
            _ => Ok(()),
        }
    }
}
