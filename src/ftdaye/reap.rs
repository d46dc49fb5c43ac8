use crate::status::FtResult;
use std::time::{Duration, Instant};

/// Pause between polls while nothing has completed.
const POLL_INTERVAL: Duration = Duration::from_micros(100);

/// Result of one poll of a transfer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Reap {
    /// Nothing is outstanding.
    Done,
    /// A completion was handled.
    Progress,
    /// Transfers are outstanding but none has completed.
    Idle,
}

/// Call `poll` until it reports [`Reap::Done`] or `deadline` passes.
///
/// `poll` runs at least once. The deadline is checked after every call, so a
/// queue that keeps completing cannot hold the caller past it.
pub(super) fn reap_until(
    deadline: Instant,
    mut poll: impl FnMut() -> FtResult<Reap>,
) -> FtResult<()> {
    loop {
        match poll()? {
            Reap::Done => return Ok(()),
            _ if Instant::now() >= deadline => return Ok(()),
            Reap::Progress => {}
            Reap::Idle => std::thread::sleep(POLL_INTERVAL),
        }
    }
}
