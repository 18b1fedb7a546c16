//! Request cancellation.
//!
//! An [`AbortController`] hands out any number of [`AbortSignal`]s. Once
//! [`AbortController::abort`] is called every request carrying one of its
//! signals fails with [`HypermediaError::Cancelled`](crate::HypermediaError::Cancelled),
//! including requests that start afterwards.
//!
//! ```
//! use hypermedia_client::AbortController;
//!
//! let controller = AbortController::new();
//! let signal = controller.signal();
//! assert!(!signal.is_aborted());
//! controller.abort();
//! assert!(signal.is_aborted());
//! ```

use crate::error::{HypermediaError, Result};
use std::future::Future;
use tokio::sync::watch;

/// Owner side of a cancellation channel.
#[derive(Debug)]
pub struct AbortController {
    tx: watch::Sender<bool>,
}

impl AbortController {
    /// Create a controller that has not aborted.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        AbortController { tx }
    }

    /// A signal observing this controller.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Abort every request carrying one of this controller's signals.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    /// Whether [`abort`](Self::abort) was called.
    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation channel.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// Whether the controller aborted.
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the controller aborts. Never resolves if the controller
    /// is dropped without aborting.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Race `future` against `signal`.
pub(crate) async fn abortable<T, F>(future: F, signal: Option<&AbortSignal>) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(signal) = signal else {
        return future.await;
    };
    if signal.is_aborted() {
        return Err(HypermediaError::Cancelled);
    }
    tokio::select! {
        result = future => result,
        _ = signal.aborted() => Err(HypermediaError::Cancelled),
    }
}
