/// Transport statistics
///
/// Counters saturate instead of wrapping. Use [`Stats::take`] to read and
/// clear them when reporting periodically.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    /// DATA packets sent for the first time
    pub sent: u16,
    /// DATA packets sent again after NACK or timeout
    pub retransmitted: u16,
    /// DATA packets acknowledged by the peer
    pub acked: u16,
    /// DATA packets abandoned after all retries
    pub dropped: u16,
    /// DATA packets delivered to the application
    pub received: u16,
    /// Retransmitted DATA packets acknowledged again without delivery
    pub duplicates: u16,
    /// Received packets that failed validation
    pub invalid: u16,
    pub nacks_sent: u16,
    pub nacks_received: u16,
    /// Missing ACK/NACK responses
    pub timeouts: u16,
    /// Packet numbering resets for any reason
    pub resets: u16,
    /// Data or notifications lost because of full buffers
    pub overflows: u16,
    /// Ticks cut short by the state transitions limit
    pub transition_limits: u16,
}

impl Stats {
    /// Get current values and start counting from zero
    pub fn take(&mut self) -> Self {
        core::mem::take(self)
    }
}

/// Increment a counter without overflowing
pub(crate) fn inc(counter: &mut u16) {
    *counter = counter.saturating_add(1);
}
