//! Flush suspension guard for the tracking phase.

use tempo_core::{EndpointId, FlushControl};

/// Suspends automatic flush on every connected endpoint, resuming on
/// drop.
///
/// The endpoint snapshot is taken once, when the guard is built;
/// endpoints that connect mid-phase are unaffected. Every snapshotted
/// endpoint is resumed exactly once no matter how the phase ends: a
/// failed tracking run or a cancelled barrier wait must never leave a
/// connection with flushing stuck off.
pub struct FlushPause<'a> {
    network: &'a dyn FlushControl,
    suspended: Vec<EndpointId>,
}

impl<'a> FlushPause<'a> {
    /// Snapshot the connected endpoints and suspend flush on each.
    pub fn new(network: &'a dyn FlushControl) -> Self {
        let suspended = network.connected_endpoints();
        for &endpoint in &suspended {
            network.suspend_flush(endpoint);
        }
        Self { network, suspended }
    }

    /// Number of endpoints in the snapshot.
    pub fn suspended_count(&self) -> usize {
        self.suspended.len()
    }
}

impl Drop for FlushPause<'_> {
    fn drop(&mut self) {
        for &endpoint in &self.suspended {
            self.network.resume_flush(endpoint);
        }
    }
}
