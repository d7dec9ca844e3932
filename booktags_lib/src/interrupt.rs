//! Cooperative interruption for a running batch.

use std::future::Future;

use tokio::sync::watch;

/// Raises the interrupt. Held by whoever listens for the signal.
pub struct InterruptHandle {
    tx: watch::Sender<bool>,
}

impl InterruptHandle {
    pub fn raise(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes the interrupt. Cheap to clone.
#[derive(Clone)]
pub struct Interrupt {
    rx: watch::Receiver<bool>,
}

/// Creates a connected handle / observer pair.
pub fn interrupt_channel() -> (InterruptHandle, Interrupt) {
    let (tx, rx) = watch::channel(false);
    (InterruptHandle { tx }, Interrupt { rx })
}

impl Interrupt {
    /// An interrupt that is never raised.
    pub fn never() -> Self {
        interrupt_channel().1
    }

    pub fn is_raised(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the interrupt is raised. Pends forever if the handle
    /// was dropped without raising.
    pub async fn raised(&mut self) {
        if self.rx.wait_for(|raised| *raised).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Runs `fut` to completion unless the interrupt fires first.
    pub async fn guard<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.raised() => None,
            out = fut => Some(out),
        }
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::never()
    }
}
