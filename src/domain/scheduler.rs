//! Fixed-interval scheduling of the decision engine.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Invoke `tick` once immediately, then once per `interval`, until the stop
/// channel receives a message or its sender hangs up.
///
/// The interval is measured from tick start. Ticks are serialized: a tick
/// that runs longer than the interval is followed immediately by the next
/// one, never by a concurrent one.
pub fn run_every<F>(interval: Duration, stop: &Receiver<()>, mut tick: F)
where
    F: FnMut(),
{
    loop {
        let started = Instant::now();
        tick();

        let wait = interval.saturating_sub(started.elapsed());
        match stop.recv_timeout(wait) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}
