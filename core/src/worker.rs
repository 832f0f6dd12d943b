use std::{
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use thiserror::Error;

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Failure to start a background worker thread.
#[derive(Debug, Error)]
#[error("failed to spawn the {worker} worker thread")]
pub struct SpawnError {
    /// Name of the worker that could not start.
    pub worker: &'static str,
    /// Underlying operating-system failure.
    #[source]
    pub source: std::io::Error,
}

/// How a bounded join attempt ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The thread finished and was joined.
    Joined,
    /// The thread finished by panicking.
    Panicked,
    /// The thread was still running when the timeout elapsed and was abandoned.
    TimedOut,
}

/// Joins a worker thread, abandoning it if it does not finish within `timeout`.
///
/// Abandoned threads keep running detached; the process never waits on them.
pub fn join_with_timeout<T>(handle: JoinHandle<T>, timeout: Duration) -> JoinOutcome {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return JoinOutcome::TimedOut;
        }
        thread::sleep(JOIN_POLL_INTERVAL);
    }

    match handle.join() {
        Ok(_) => JoinOutcome::Joined,
        Err(_) => JoinOutcome::Panicked,
    }
}

#[cfg(test)]
mod tests {
    use super::{join_with_timeout, JoinOutcome};
    use std::{thread, time::Duration};

    #[test]
    fn finished_threads_are_joined() {
        let handle = thread::spawn(|| 7);
        assert_eq!(
            join_with_timeout(handle, Duration::from_secs(1)),
            JoinOutcome::Joined
        );
    }

    #[test]
    fn stuck_threads_are_abandoned() {
        let handle = thread::spawn(|| thread::sleep(Duration::from_millis(500)));
        assert_eq!(
            join_with_timeout(handle, Duration::from_millis(20)),
            JoinOutcome::TimedOut
        );
    }
}
