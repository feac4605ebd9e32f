//! Byte-stream device on top of a channel.
//!
//! The file position selects what a read or write does, and every read or
//! write puts the position back to 0:
//!
//! | position | read                     | write                          |
//! |----------|--------------------------|--------------------------------|
//! | 0        | queued messages          | send message words             |
//! | 1        | outbound credit (u64)    | start receive delivery         |
//! | 2        | -                        | stop delivery, clear the queue |
//!
//! Messages are 8-byte native-endian words on write. On read they are 8-byte
//! words in ring-index mode and 16-byte `{slot, value}` records in bitmask
//! mode.

use alloc::sync::Arc;
use alloc::vec::Vec;

use log::debug;
use mailbox_abi::{
    MESSAGE_SIZE, POLLIN, POLLRDNORM, READ_MODE_CREDIT, READ_MODE_MESSAGES, WRITE_MODE_DATA,
    WRITE_MODE_START, WRITE_MODE_STOP,
};
use zerocopy::{FromBytes, IntoBytes};

use crate::channel::MailboxChannel;
use crate::encoding::Encoding;
use crate::error::DeviceError;
use crate::message::{Message, SlotRecord};
use crate::mmio::RegisterBus;
use crate::waker::Readable;

/// Seek origin, as in `std::io::SeekFrom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    /// Offset from the start of the device
    Start(u64),
    /// Offset from the current position (can be negative)
    Current(i64),
    /// Offset from the end; the device has no length, so this is from 0
    End(i64),
}

/// An open handle on a mailbox channel. Closing the handle closes the
/// channel's session.
pub struct MailboxFile<B: RegisterBus> {
    channel: Arc<MailboxChannel<B>>,
    position: u64,
}

impl<B: RegisterBus> MailboxFile<B> {
    /// Open the channel. Only one handle may be open at a time.
    pub fn open(channel: Arc<MailboxChannel<B>>) -> Result<Self, DeviceError> {
        channel.open()?;
        Ok(Self {
            channel,
            position: 0,
        })
    }

    pub fn channel(&self) -> &Arc<MailboxChannel<B>> {
        &self.channel
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, DeviceError> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(offset) => self.position.checked_add_signed(offset),
            SeekFrom::End(offset) => u64::try_from(offset).ok(),
        };
        self.position = new_pos.ok_or(DeviceError::InvalidOffset)?;
        Ok(self.position)
    }

    /// Read according to the current position. Returns 0 when no message is
    /// queued.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        let mode = core::mem::take(&mut self.position);
        match mode {
            READ_MODE_MESSAGES => self.read_messages(buf),
            READ_MODE_CREDIT => self.read_credit(buf),
            other => Err(DeviceError::InvalidMode(other)),
        }
    }

    fn read_messages(&self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        let encoding = self.channel.encoding();
        let record_size = encoding.record_size();
        let received = self.channel.receive(buf.len() / record_size);

        for (msg, out) in received
            .messages
            .iter()
            .zip(buf.chunks_exact_mut(record_size))
        {
            encode_record(encoding, *msg, out);
        }
        Ok(received.messages.len() * record_size)
    }

    fn read_credit(&self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        let credit = self.channel.credit() as u64;
        let bytes = credit.as_bytes();
        let got = buf.len();
        let out = buf
            .get_mut(..bytes.len())
            .ok_or(DeviceError::BufferTooSmall {
                needed: bytes.len(),
                got,
            })?;
        out.copy_from_slice(bytes);
        Ok(bytes.len())
    }

    /// Write according to the current position.
    ///
    /// At position 0 `buf` is a sequence of message words. Returns the bytes
    /// sent, which is short if the send gave up waiting for credit and 0 if
    /// the peer is not accepting.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, DeviceError> {
        let mode = core::mem::take(&mut self.position);
        match mode {
            WRITE_MODE_DATA => self.write_messages(buf),
            WRITE_MODE_START => {
                self.channel.start();
                Ok(buf.len())
            }
            WRITE_MODE_STOP => {
                self.channel.stop();
                Ok(buf.len())
            }
            other => Err(DeviceError::InvalidMode(other)),
        }
    }

    fn write_messages(&self, buf: &[u8]) -> Result<usize, DeviceError> {
        if buf.len() % MESSAGE_SIZE != 0 {
            return Err(DeviceError::InvalidLength(buf.len()));
        }
        let words = buf
            .chunks_exact(MESSAGE_SIZE)
            .map(u64::read_from_bytes)
            .collect::<Result<Vec<u64>, _>>()
            .map_err(|_| DeviceError::InvalidLength(buf.len()))?;

        let sent = self.channel.send(&words);
        if sent < words.len() {
            debug!("mailbox: short write, {} of {} words", sent, words.len());
        }
        Ok(sent * MESSAGE_SIZE)
    }

    /// Poll flags for the device.
    pub fn poll(&self) -> u32 {
        if self.channel.poll() {
            POLLIN | POLLRDNORM
        } else {
            0
        }
    }

    /// Wait until a read at position 0 would return data.
    pub fn readable(&self) -> Readable<'_> {
        self.channel.readable()
    }
}

impl<B: RegisterBus> Drop for MailboxFile<B> {
    fn drop(&mut self) {
        self.channel.close();
    }
}

fn encode_record(encoding: Encoding, msg: Message, out: &mut [u8]) {
    match encoding {
        Encoding::RingIndex => out.copy_from_slice(msg.value.as_bytes()),
        Encoding::Bitmask => out.copy_from_slice(SlotRecord::from(msg).as_bytes()),
    }
}
