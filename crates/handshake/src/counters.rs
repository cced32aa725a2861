/// The two per-direction record sequence counters of an established engine.
///
/// Each counter is kept in the engine's own 8-byte representation and copied
/// verbatim on read and write. The `u64` helpers interpret them as big-endian
/// for diagnostics; injection never goes through them.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct SequenceCounters {
    /// Counter for records received from the peer.
    pub inbound: [u8; 8],
    /// Counter for records sent to the peer.
    pub outbound: [u8; 8],
}

impl SequenceCounters {
    /// Both counters at zero, the value an engine starts from after its handshake.
    pub const ZERO: Self = Self {
        inbound: [0; 8],
        outbound: [0; 8],
    };

    /// Builds counters from raw engine bytes.
    #[must_use]
    pub const fn new(inbound: [u8; 8], outbound: [u8; 8]) -> Self {
        Self { inbound, outbound }
    }

    /// Builds counters from big-endian integers.
    #[must_use]
    pub const fn from_u64(inbound: u64, outbound: u64) -> Self {
        Self {
            inbound: inbound.to_be_bytes(),
            outbound: outbound.to_be_bytes(),
        }
    }

    /// Inbound counter read as a big-endian integer.
    #[must_use]
    pub const fn inbound_u64(&self) -> u64 {
        u64::from_be_bytes(self.inbound)
    }

    /// Outbound counter read as a big-endian integer.
    #[must_use]
    pub const fn outbound_u64(&self) -> u64 {
        u64::from_be_bytes(self.outbound)
    }

    /// Reports whether both counters are zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.inbound_u64() == 0 && self.outbound_u64() == 0
    }
}
