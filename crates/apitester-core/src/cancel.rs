use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::{self, error::TryRecvError};

/// Checked by the suite executor between cases.
pub struct CancelToken {
    rx: Option<broadcast::Receiver<()>>,
    cancelled: bool,
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn none() -> Self {
        Self {
            rx: None,
            cancelled: false,
        }
    }

    /// Returns true once a cancel signal has arrived; stays true afterwards.
    ///
    /// A lagged receiver means several signals arrived, which still counts.
    pub fn is_cancelled(&mut self) -> bool {
        if !self.cancelled {
            if let Some(rx) = self.rx.as_mut() {
                self.cancelled = matches!(rx.try_recv(), Ok(()) | Err(TryRecvError::Lagged(_)));
            }
        }
        self.cancelled
    }
}

struct Entry {
    tx: broadcast::Sender<()>,
    runs: usize,
}

/// In-flight runs by suite id.
///
/// Several runs of one suite share a signal, so one cancel stops them all.
#[derive(Default)]
pub struct CancelRegistry {
    runs: Mutex<HashMap<String, Entry>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a run and returns its token. Pair with [`release`](Self::release).
    pub fn register(&self, id: &str) -> CancelToken {
        let mut runs = self.lock();
        let entry = runs.entry(id.to_string()).or_insert_with(|| Entry {
            tx: broadcast::channel(1).0,
            runs: 0,
        });
        entry.runs += 1;

        CancelToken {
            rx: Some(entry.tx.subscribe()),
            cancelled: false,
        }
    }

    /// Registers a run that is released when the returned guard drops,
    /// including when the run's future is dropped before it finishes.
    pub fn start(&self, id: &str) -> (CancelToken, RunGuard<'_>) {
        let token = self.register(id);
        let guard = RunGuard {
            registry: self,
            id: id.to_string(),
        };
        (token, guard)
    }

    /// Signals every run of `id`. Returns false if none is in flight.
    pub fn cancel(&self, id: &str) -> bool {
        match self.lock().get(id) {
            Some(entry) => {
                let _ = entry.tx.send(());
                true
            }
            None => false,
        }
    }

    /// Marks one run of `id` finished.
    pub fn release(&self, id: &str) {
        let mut runs = self.lock();
        if let Some(entry) = runs.get_mut(id) {
            entry.runs = entry.runs.saturating_sub(1);
            if entry.runs == 0 {
                runs.remove(id);
            }
        }
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }
}

/// Releases one run of a suite on drop.
pub struct RunGuard<'a> {
    registry: &'a CancelRegistry,
    id: String,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.id);
    }
}
