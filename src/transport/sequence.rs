/// Packet numbering of both directions
///
/// Outgoing numbers run over `1..=255`, 0 is reserved for RESET packets.
/// Incoming numbers are tracked to recognize retransmissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sequence {
    outgoing: u8,
    last_incoming: u8,
}

impl Sequence {
    pub const fn new() -> Self {
        Self { outgoing: 1, last_incoming: 0 }
    }

    /// Number of the packet currently being sent
    pub fn outgoing(&self) -> u8 {
        self.outgoing
    }

    /// Number of the last delivered packet, 0 if none since reset
    pub fn last_incoming(&self) -> u8 {
        self.last_incoming
    }

    /// Move to next outgoing number, returns true on wraparound
    ///
    /// Wraparound also forgets the last incoming number so that both sides
    /// start tracking from scratch.
    pub fn advance_outgoing(&mut self) -> bool {
        if self.outgoing == u8::MAX {
            self.outgoing = 1;
            self.last_incoming = 0;
            true
        } else {
            self.outgoing += 1;
            false
        }
    }

    /// Check if incoming DATA `number` has not been delivered yet
    ///
    /// Incoming numbers must strictly increase. Packet 0 is never new.
    /// The peer wrapping 255 -> 1 is only recovered from by a reset on either side
    /// (our own wraparound, RESET packet or silence).
    pub fn is_new(&self, number: u8) -> bool {
        number > self.last_incoming
    }

    /// Mark `number` as delivered
    pub fn accept_incoming(&mut self, number: u8) {
        self.last_incoming = number;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}
