//! Debounce over caller-supplied timestamps
//!
//! The debouncer never owns a timer. Whoever drives it reports the current
//! time on each call and calls [`Debounce::fire`] when the timer it armed
//! (for [`Debounce::wait`]) elapses. A fire that arrives before the current
//! deadline belongs to an older arming and does nothing.

use std::time::Duration;

/// Leading-edge debounce with an optional trailing edge
#[derive(Debug, Clone)]
pub struct Debounce<A> {
    wait: Duration,
    trailing: bool,
    deadline: Option<Duration>,
    pending: Option<A>,
}

impl<A> Debounce<A> {
    /// Leading edge only: the first call of a burst fires, the rest are dropped
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            trailing: false,
            deadline: None,
            pending: None,
        }
    }

    /// Leading edge plus one trailing delivery of the last absorbed call
    pub fn with_trailing(wait: Duration) -> Self {
        Self {
            trailing: true,
            ..Self::new(wait)
        }
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// When the current burst ends, if one is running
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn is_idle(&self) -> bool {
        self.deadline.is_none()
    }

    /// Register a call at `now`.
    ///
    /// Returns the arguments back when this call starts a new burst and must
    /// run immediately. Every call pushes the deadline to `now + wait`.
    pub fn call(&mut self, now: Duration, args: A) -> Option<A> {
        let leading = match self.deadline {
            None => true,
            Some(deadline) => now >= deadline,
        };

        self.deadline = Some(now + self.wait);

        if leading {
            if self.pending.take().is_some() {
                tracing::trace!("debounce: trailing call superseded by a new burst");
            }
            return Some(args);
        }

        if self.trailing {
            self.pending = Some(args);
        }
        None
    }

    /// The armed timer elapsed at `now`.
    ///
    /// Ends the burst if its deadline has passed and hands back the trailing
    /// arguments, if any were absorbed.
    pub fn fire(&mut self, now: Duration) -> Option<A> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    /// Forget the running burst and any pending trailing call
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.pending = None;
    }
}
