use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Admits store writes only while their activation epoch is current.
///
/// Writers hold the read side for the duration of a write; `close` takes the
/// write side, so it returns only after in-flight writes have finished and
/// every later write observes the gate closed.
pub struct ActivationGate {
    current: RwLock<Option<u64>>,
    next_epoch: AtomicU64,
}

impl ActivationGate {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            next_epoch: AtomicU64::new(0),
        }
    }

    /// Start a new epoch. Writes tagged with any earlier epoch are refused.
    pub fn open(&self) -> u64 {
        let epoch = self.next_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(epoch);
        epoch
    }

    /// Close the gate, waiting for in-flight writes. Returns the closed epoch.
    pub fn close(&self) -> Option<u64> {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn current(&self) -> Option<u64> {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_open(&self, epoch: u64) -> bool {
        self.current() == Some(epoch)
    }

    /// Run `write` if `epoch` is still current. The gate cannot close while
    /// `write` runs. Returns None when the write was refused.
    pub fn run<R>(&self, epoch: u64, write: impl FnOnce() -> R) -> Option<R> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        if *current != Some(epoch) {
            return None;
        }
        Some(write())
    }
}

impl Default for ActivationGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_closed_gate_refuses_writes() {
        let gate = ActivationGate::new();
        assert_eq!(gate.current(), None);
        assert_eq!(gate.run(1, || 42), None);
    }

    #[test]
    fn test_open_gate_admits_current_epoch_only() {
        let gate = ActivationGate::new();
        let first = gate.open();
        assert_eq!(gate.run(first, || "ok"), Some("ok"));

        assert_eq!(gate.close(), Some(first));
        let second = gate.open();
        assert_ne!(first, second);

        assert_eq!(gate.run(first, || "stale"), None);
        assert_eq!(gate.run(second, || "fresh"), Some("fresh"));
        assert!(gate.is_open(second));
    }

    #[test]
    fn test_close_waits_for_in_flight_write() {
        let gate = Arc::new(ActivationGate::new());
        let epoch = gate.open();
        let finished = Arc::new(AtomicBool::new(false));
        let (entered_tx, entered_rx) = mpsc::channel();

        let writer = {
            let gate = Arc::clone(&gate);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                gate.run(epoch, || {
                    entered_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(100));
                    finished.store(true, Ordering::SeqCst);
                })
            })
        };

        entered_rx.recv().unwrap();
        gate.close();
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(writer.join().unwrap(), Some(()));
        assert_eq!(gate.run(epoch, || ()), None);
    }
}
