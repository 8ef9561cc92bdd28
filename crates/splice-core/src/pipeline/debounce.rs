//! Event debouncing for bursty announcement streams.

use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Coalesces bursts on `rx` into single handler calls.
///
/// Each received event (re)arms a timer of `quiet_period`. When the timer
/// elapses with no newer event, `handler` is invoked exactly once with the
/// most recent event; an event arriving before the timer elapses resets it
/// without queueing a second call.
///
/// On a shutdown signal the loop exits without firing an in-flight call.
/// The same applies when `rx` closes: a burst cut short by channel close
/// is treated as cancellation, not as a completed quiet period.
pub async fn debounce<T, F>(
    mut rx: mpsc::Receiver<T>,
    quiet_period: Duration,
    mut handler: F,
    mut shutdown: broadcast::Receiver<()>,
) where
    T: Send,
    F: FnMut(T),
{
    let mut pending: Option<T> = None;

    loop {
        match pending.take() {
            None => {
                tokio::select! {
                    biased;

                    _ = shutdown.recv() => return,

                    maybe = rx.recv() => match maybe {
                        Some(event) => pending = Some(event),
                        None => return,
                    },
                }
            }
            Some(latest) => {
                tokio::select! {
                    biased;

                    _ = shutdown.recv() => return,

                    maybe = rx.recv() => match maybe {
                        // Newer event wins; the timer re-arms on the next
                        // loop iteration.
                        Some(event) => pending = Some(event),
                        None => return,
                    },

                    () = tokio::time::sleep(quiet_period) => handler(latest),
                }
            }
        }
    }
}
