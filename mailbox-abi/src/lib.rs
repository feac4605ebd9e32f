//! Shared ABI definitions between the mailbox driver and its users.
//!
//! This crate contains the hardware register layout, the bit fields of the
//! control/status and info registers, and the byte-stream device contract
//! (position modes, poll flags, message sizes) that both the driver and
//! user-space programs need to agree on.

#![no_std]

// =============================================================================
// Device identity
// =============================================================================

/// Name of the character device node (`/dev/sw_mailbox`).
pub const DEVICE_NAME: &str = "sw_mailbox";

/// Device-tree compatible string of the mailbox block.
pub const COMPATIBLE: &str = "asp,asp_mailbox";

// =============================================================================
// Register layout (host view, byte offsets into the mapped window)
// =============================================================================

/// Size of one register in bytes. Every register access is 64-bit.
pub const REGISTER_SIZE: usize = 8;

/// Size of the whole register window in bytes.
pub const WINDOW_SIZE: usize = 0x400;

/// Number of message slots in each ring.
///
/// The ring-index encoding keeps one of them empty to tell "full" from
/// "empty", so at most `RING_SLOT_COUNT - 1` messages are in flight.
pub const RING_SLOT_COUNT: usize = 62;

/// Outbound (host → accelerator) message slots.
pub const C2A_SLOTS_OFFSET: usize = 0x000;
/// Outbound info register. Holds the host's tail and the host's inbound head.
pub const C2A_INFO_OFFSET: usize = 0x1F0;
/// Outbound control/status register. Its enable bit belongs to the accelerator.
pub const C2A_CSR_OFFSET: usize = 0x1F8;

/// Inbound (accelerator → host) message slots.
pub const A2C_SLOTS_OFFSET: usize = 0x200;
/// Inbound info register. Holds the accelerator's tail and its inbound head.
pub const A2C_INFO_OFFSET: usize = 0x3F0;
/// Inbound control/status register. Its enable bit belongs to the host.
pub const A2C_CSR_OFFSET: usize = 0x3F8;

// =============================================================================
// Control/status register bits
// =============================================================================

/// Receiver is accepting messages and its interrupt is enabled.
pub const CSR_INT_ENABLE: u64 = 1 << 63;

/// Doorbell bits a ring-index sender sets to raise the peer's interrupt.
pub const CSR_DOORBELL: u64 = !CSR_INT_ENABLE;

/// Per-slot validity bits used by the bitmask encoding (bits 0..=61).
pub const CSR_VALID_MASK: u64 = (1 << 62) - 1;

/// Largest slot count the bitmask encoding can describe.
pub const BITMASK_MAX_SLOTS: usize = 62;

// =============================================================================
// Info register fields
// =============================================================================

/// Shift of the head index (consumer side) inside an info register.
pub const INFO_HEAD_SHIFT: u32 = 0;
/// Shift of the tail index (producer side) inside an info register.
pub const INFO_TAIL_SHIFT: u32 = 8;
/// Width mask of one index field.
pub const INFO_FIELD_MASK: u64 = 0xff;

// =============================================================================
// Staging queue defaults
// =============================================================================

/// Default number of inbound messages buffered between interrupt and reader.
pub const DEFAULT_QUEUE_CAPACITY: usize = 512;

/// Queued messages the default configuration tolerates before halting.
pub const HALT_HEADROOM: usize = 200;

/// Default free-space low watermark of the staging queue: capacity minus
/// [`HALT_HEADROOM`].
///
/// Receive interrupts are halted once fewer than this many free entries
/// remain after a drain, i.e. once more than 200 messages are queued.
pub const DEFAULT_HALT_FREE_SLOTS: usize = DEFAULT_QUEUE_CAPACITY - HALT_HEADROOM;

// =============================================================================
// Byte-stream device contract
// =============================================================================

/// Size of one message word written to the device.
pub const MESSAGE_SIZE: usize = 8;

/// Size of one `{slot, value}` record read from the device in bitmask mode.
pub const SLOT_RECORD_SIZE: usize = 16;

/// Read position: return buffered messages.
pub const READ_MODE_MESSAGES: u64 = 0;
/// Read position: return the current outbound credit as one u64.
pub const READ_MODE_CREDIT: u64 = 1;

/// Write position: send the buffer as message words.
pub const WRITE_MODE_DATA: u64 = 0;
/// Write position: (re-)enable receive delivery.
pub const WRITE_MODE_START: u64 = 1;
/// Write position: disable receive delivery and clear the receive queue.
pub const WRITE_MODE_STOP: u64 = 2;

/// Poll flag: data may be read without blocking.
pub const POLLIN: u32 = 0x0001;
/// Poll flag: normal data may be read without blocking.
pub const POLLRDNORM: u32 = 0x0040;

// =============================================================================
// Layout sanity
// =============================================================================

const _: () = {
    assert!(C2A_SLOTS_OFFSET + RING_SLOT_COUNT * REGISTER_SIZE <= C2A_INFO_OFFSET);
    assert!(A2C_SLOTS_OFFSET + RING_SLOT_COUNT * REGISTER_SIZE <= A2C_INFO_OFFSET);
    assert!(A2C_CSR_OFFSET + REGISTER_SIZE <= WINDOW_SIZE);
    assert!(RING_SLOT_COUNT <= BITMASK_MAX_SLOTS);
    assert!(RING_SLOT_COUNT as u64 <= INFO_FIELD_MASK);
    assert!(CSR_VALID_MASK & CSR_INT_ENABLE == 0);
    assert!(DEFAULT_HALT_FREE_SLOTS < DEFAULT_QUEUE_CAPACITY);
};
