//! Channel configuration: register layout, encoding and queue sizing.
//!
//! Defaults come from the hardware constants in `mailbox_abi`; overriding
//! them is for bring-up and tests. [`MailboxConfig::validate`] checks a
//! configuration against the size of the mapped window once, at attach time,
//! so the data path can index registers without further checks.

use mailbox_abi::{
    A2C_CSR_OFFSET, A2C_INFO_OFFSET, A2C_SLOTS_OFFSET, BITMASK_MAX_SLOTS, C2A_CSR_OFFSET,
    C2A_INFO_OFFSET, C2A_SLOTS_OFFSET, DEFAULT_HALT_FREE_SLOTS, DEFAULT_QUEUE_CAPACITY,
    INFO_FIELD_MASK, REGISTER_SIZE, RING_SLOT_COUNT,
};

use crate::encoding::Encoding;
use crate::error::ConfigError;
use crate::ring::RingChannel;

/// Default bound on consecutive empty credit polls in one send.
pub const DEFAULT_TX_SPIN_LIMIT: u32 = 1 << 20;

/// Register placement of one direction of the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingLayout {
    /// Offset of slot 0.
    pub slots: usize,
    pub slot_count: usize,
    /// Offset of the info register of this block.
    pub info: usize,
    /// Offset of the control/status register of this block.
    pub csr: usize,
}

impl RingLayout {
    /// Host → accelerator block.
    pub const C2A: Self = Self {
        slots: C2A_SLOTS_OFFSET,
        slot_count: RING_SLOT_COUNT,
        info: C2A_INFO_OFFSET,
        csr: C2A_CSR_OFFSET,
    };

    /// Accelerator → host block.
    pub const A2C: Self = Self {
        slots: A2C_SLOTS_OFFSET,
        slot_count: RING_SLOT_COUNT,
        info: A2C_INFO_OFFSET,
        csr: A2C_CSR_OFFSET,
    };

    pub const fn ring(&self) -> RingChannel {
        RingChannel::new(self.slot_count)
    }

    /// Byte offset of slot `index`, wrapping at the slot count.
    pub const fn slot_offset(&self, index: usize) -> usize {
        self.slots + (index % self.slot_count) * REGISTER_SIZE
    }

    /// Byte ranges occupied by the slots, the info register and the CSR.
    const fn regions(&self) -> [(usize, usize); 3] {
        [
            (self.slots, self.slots + self.slot_count * REGISTER_SIZE),
            (self.info, self.info + REGISTER_SIZE),
            (self.csr, self.csr + REGISTER_SIZE),
        ]
    }

    fn validate(&self, window_size: usize, encoding: Encoding) -> Result<(), ConfigError> {
        if self.slot_count < 2 || self.slot_count as u64 > INFO_FIELD_MASK + 1 {
            return Err(ConfigError::InvalidSlotCount(self.slot_count));
        }
        if encoding == Encoding::Bitmask && self.slot_count > BITMASK_MAX_SLOTS {
            return Err(ConfigError::TooManySlotsForBitmask(self.slot_count));
        }
        for (start, end) in self.regions() {
            if start % REGISTER_SIZE != 0 {
                return Err(ConfigError::Misaligned(start));
            }
            if end > window_size {
                return Err(ConfigError::OutOfWindow {
                    offset: start,
                    window_size,
                });
            }
        }
        Ok(())
    }
}

/// Both directions as seen by one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxLayout {
    /// The block this endpoint transmits on. Its info register is the local
    /// info register: own tail in the tail half, own inbound head in the head
    /// half.
    pub outbound: RingLayout,
    /// The block the peer transmits on.
    pub inbound: RingLayout,
}

impl MailboxLayout {
    /// The host's view of the hardware window.
    pub const fn host() -> Self {
        Self {
            outbound: RingLayout::C2A,
            inbound: RingLayout::A2C,
        }
    }

    /// The same window seen from the other endpoint.
    pub const fn mirrored(self) -> Self {
        Self {
            outbound: self.inbound,
            inbound: self.outbound,
        }
    }

    pub fn validate(&self, window_size: usize, encoding: Encoding) -> Result<(), ConfigError> {
        self.outbound.validate(window_size, encoding)?;
        self.inbound.validate(window_size, encoding)?;

        let [a, b, c] = self.outbound.regions();
        let [d, e, f] = self.inbound.regions();
        let regions = [a, b, c, d, e, f];
        for (i, &(start, end)) in regions.iter().enumerate() {
            for &(other_start, other_end) in &regions[i + 1..] {
                if start < other_end && other_start < end {
                    return Err(ConfigError::Overlap(start.max(other_start)));
                }
            }
        }
        Ok(())
    }
}

impl Default for MailboxLayout {
    fn default() -> Self {
        Self::host()
    }
}

/// Everything needed to attach a [`MailboxChannel`](crate::channel::MailboxChannel).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxConfig {
    pub layout: MailboxLayout,
    pub encoding: Encoding,
    /// Inbound messages buffered between interrupt and reader.
    pub queue_capacity: usize,
    /// Receive interrupts halt once fewer free staging entries remain.
    pub halt_free_slots: usize,
    /// Give up a send after this many consecutive polls without credit.
    /// `None` spins until credit appears or the send is cancelled.
    pub tx_spin_limit: Option<u32>,
}

impl MailboxConfig {
    pub fn validate(&self, window_size: usize) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.halt_free_slots >= self.queue_capacity {
            return Err(ConfigError::HaltThresholdTooLarge {
                halt_free_slots: self.halt_free_slots,
                capacity: self.queue_capacity,
            });
        }
        self.layout.validate(window_size, self.encoding)
    }

    /// The configuration of the other endpoint of a loopback pair.
    pub fn mirrored(self) -> Self {
        Self {
            layout: self.layout.mirrored(),
            ..self
        }
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            layout: MailboxLayout::host(),
            encoding: Encoding::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            halt_free_slots: DEFAULT_HALT_FREE_SLOTS,
            tx_spin_limit: Some(DEFAULT_TX_SPIN_LIMIT),
        }
    }
}
