//! Deadline-bounded collection of damage responses.

use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, warn};

use super::{Probe, ServerEvent, ServerHandle};

/// Deadline for one wait invocation, computed once at entry. Zero seconds
/// means no deadline at all, not an immediate timeout.
pub(crate) fn deadline_for(secs: u64) -> Option<Instant> {
    (secs > 0).then(|| Instant::now() + Duration::from_secs(secs))
}

impl<S: ServerHandle, W: Write> Probe<S, W> {
    /// Consume damage responses until the wait timeout elapses with an empty
    /// queue, or forever when the timeout is zero. Returns how many
    /// notifications fell inside the monitored rectangle and were logged.
    ///
    /// Already-queued events are consumed without waiting; the deadline only
    /// bounds actual blocking. Notifications outside the monitored rectangle
    /// and non-damage events neither satisfy the wait nor extend it, but
    /// damage is always acknowledged back to the server so future changes in
    /// the same area keep being reported.
    pub fn wait_for_updates(&mut self) -> Result<usize> {
        let deadline = deadline_for(self.wait_secs);
        let mut accepted = 0;

        while let Some(event) = self.server.next_event(deadline)? {
            match event {
                ServerEvent::Damage(notice) => {
                    if self.monitor.contains(&notice.area) {
                        self.logger.log(
                            notice.time,
                            &format!(
                                "Got damage event {}x{}+{}+{}",
                                notice.area.width,
                                notice.area.height,
                                notice.area.x,
                                notice.area.y
                            ),
                        )?;
                        accepted += 1;
                    }
                    self.server.acknowledge(notice.damage)?;
                }
                ServerEvent::Timestamp(_) => {
                    debug!("stray timestamp property change while waiting for damage");
                }
                ServerEvent::Other(kind) => {
                    warn!("Got unwanted event type {kind}");
                }
            }
        }

        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_has_no_deadline() {
        assert!(deadline_for(0).is_none());
    }

    #[test]
    fn test_nonzero_timeout_sets_deadline() {
        let before = Instant::now();
        let deadline = deadline_for(3).expect("deadline");
        assert!(deadline >= before + Duration::from_secs(3));
    }
}
