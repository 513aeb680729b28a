//! Cancellation
//!
//! A [`CancelToken`] is observed by the poll loop between store calls. It
//! fires when its [`CancelSource`] cancels (or is dropped) or when its
//! deadline passes. Waiting is a crossbeam `select!` over the cancel signal,
//! the deadline timer and the poll interval, so it never spins.

use std::time::{Duration, Instant};

use crossbeam::channel::{self, select, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

/// Owner side of a cancellation signal
///
/// Cancels every token it handed out on `cancel()` or on drop.
pub struct CancelSource {
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (sender, receiver) = channel::bounded(0);
        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
        }
    }

    /// A token observing this source
    pub fn token(&self) -> CancelToken {
        CancelToken {
            signal: self.receiver.clone(),
            deadline: None,
        }
    }

    /// Fire the signal; idempotent
    pub fn cancel(&self) {
        // Dropping the only sender disconnects every receiver
        self.sender.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation signal, with an optional deadline
#[derive(Debug, Clone)]
pub struct CancelToken {
    /// Disconnects when the source cancels
    signal: Receiver<()>,

    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that never fires
    pub fn never() -> Self {
        Self {
            signal: channel::never(),
            deadline: None,
        }
    }

    /// A token that has already fired
    pub fn cancelled() -> Self {
        let (_, signal) = channel::bounded(0);
        Self {
            signal,
            deadline: None,
        }
    }

    /// Also fire at `deadline` (the earlier deadline wins)
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Also fire `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        matches!(self.signal.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Sleep for `duration` unless the token fires first
    ///
    /// Returns `true` when woken by cancellation or the deadline.
    pub fn wait(&self, duration: Duration) -> bool {
        let deadline = match self.deadline {
            Some(at) => channel::at(at),
            None => channel::never(),
        };

        select! {
            recv(self.signal) -> _ => true,
            recv(deadline) -> _ => true,
            default(duration) => false,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::never()
    }
}
