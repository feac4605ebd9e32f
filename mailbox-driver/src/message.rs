//! Messages and their byte form.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// One transferred word and the slot it was drained from.
///
/// The payload is opaque to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub slot: u8,
    pub value: u64,
}

impl Message {
    pub const fn new(slot: u8, value: u64) -> Self {
        Self { slot, value }
    }
}

/// `{slot, value}` record handed to readers in bitmask mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct SlotRecord {
    pub slot: u64,
    pub value: u64,
}

impl From<Message> for SlotRecord {
    fn from(msg: Message) -> Self {
        Self {
            slot: msg.slot as u64,
            value: msg.value,
        }
    }
}

const _: () = assert!(core::mem::size_of::<SlotRecord>() == mailbox_abi::SLOT_RECORD_SIZE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_record_layout() {
        let record = SlotRecord::from(Message::new(3, 0x1122_3344_5566_7788));
        let bytes = record.as_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..8], &3u64.to_ne_bytes());
        assert_eq!(&bytes[8..], &0x1122_3344_5566_7788u64.to_ne_bytes());

        let parsed = SlotRecord::read_from_bytes(bytes).unwrap();
        assert_eq!(parsed, record);
    }
}
