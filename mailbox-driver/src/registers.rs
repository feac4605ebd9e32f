//! Bit-level encode/decode of the mailbox control/status and info registers.
//!
//! These are plain value types: they never touch the hardware. Reading and
//! writing them goes through [`RegisterWindow`](crate::mmio::RegisterWindow).

use mailbox_abi::{
    CSR_DOORBELL, CSR_INT_ENABLE, CSR_VALID_MASK, INFO_FIELD_MASK, INFO_HEAD_SHIFT,
    INFO_TAIL_SHIFT,
};

/// Snapshot of a control/status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Csr(u64);

impl Csr {
    /// A CSR with only the interrupt-enable bit set.
    pub const ENABLED: Self = Self(CSR_INT_ENABLE);

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Whether the receiver owning this CSR accepts messages.
    pub const fn is_enabled(self) -> bool {
        self.0 & CSR_INT_ENABLE != 0
    }

    pub const fn with_enabled(self, enabled: bool) -> Self {
        if enabled {
            Self(self.0 | CSR_INT_ENABLE)
        } else {
            Self(self.0 & !CSR_INT_ENABLE)
        }
    }

    /// Doorbell or validity bits (everything below the enable bit).
    pub const fn signal_bits(self) -> u64 {
        self.0 & CSR_DOORBELL
    }

    /// Whether an interrupt would be raised for the owner of this CSR.
    pub const fn interrupt_pending(self) -> bool {
        self.is_enabled() && self.signal_bits() != 0
    }

    /// Assert the ring-index doorbell, leaving the enable bit alone.
    pub const fn with_doorbell(self) -> Self {
        Self(self.0 | CSR_DOORBELL)
    }

    /// Clear doorbell/validity bits, leaving the enable bit alone.
    pub const fn acknowledged(self) -> Self {
        Self(self.0 & CSR_INT_ENABLE)
    }

    /// Per-slot validity bits, restricted to the first `slot_count` slots.
    pub const fn validity(self, slot_count: usize) -> u64 {
        self.0 & CSR_VALID_MASK & slot_mask(slot_count)
    }

    pub const fn with_validity_set(self, mask: u64) -> Self {
        Self(self.0 | (mask & CSR_VALID_MASK))
    }

    pub const fn with_validity_cleared(self, mask: u64) -> Self {
        Self(self.0 & !(mask & CSR_VALID_MASK))
    }
}

/// Mask with the low `slot_count` bits set.
pub const fn slot_mask(slot_count: usize) -> u64 {
    if slot_count >= 64 {
        u64::MAX
    } else {
        (1u64 << slot_count) - 1
    }
}

/// Which half of an info register a writer owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoHalf {
    /// Consumer index of a ring, bits [0:7].
    Head,
    /// Producer index of a ring, bits [8:15].
    Tail,
}

impl InfoHalf {
    const fn shift(self) -> u32 {
        match self {
            Self::Head => INFO_HEAD_SHIFT,
            Self::Tail => INFO_TAIL_SHIFT,
        }
    }
}

/// Snapshot of an info register packing a head/tail index pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InfoRegister(u64);

impl InfoRegister {
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn get(self, half: InfoHalf) -> usize {
        ((self.0 >> half.shift()) & INFO_FIELD_MASK) as usize
    }

    /// Replace one half, preserving every other bit verbatim.
    pub const fn with(self, half: InfoHalf, index: usize) -> Self {
        let shift = half.shift();
        let cleared = self.0 & !(INFO_FIELD_MASK << shift);
        Self(cleared | (((index as u64) & INFO_FIELD_MASK) << shift))
    }

    pub const fn head(self) -> usize {
        self.get(InfoHalf::Head)
    }

    pub const fn tail(self) -> usize {
        self.get(InfoHalf::Tail)
    }
}
