//! Host side of the `sw_mailbox` register mailbox.
//!
//! Two unidirectional rings of 64-bit message slots share a small register
//! window with an accelerator. This crate implements the protocol on top of
//! that window: credit-based transmit, interrupt-time receive into a bounded
//! staging queue with backpressure, and a byte-stream device for user space.
//!
//! The platform supplies a mapped window (any [`RegisterBus`]) and an
//! [`InterruptController`], attaches a [`MailboxChannel`] and forwards the
//! mailbox interrupt to [`MailboxChannel::handle_interrupt`].

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod channel;
pub mod config;
pub mod consumer;
pub mod device;
pub mod encoding;
pub mod error;
pub mod irq;
pub mod logging;
pub mod loopback;
pub mod message;
pub mod mmio;
pub mod receive;
pub mod registers;
pub mod ring;
pub mod staging;
pub mod transmit;
pub mod waker;

pub use channel::{MailboxChannel, MailboxStats};
pub use config::{MailboxConfig, MailboxLayout, RingLayout};
pub use consumer::Received;
pub use device::{MailboxFile, SeekFrom};
pub use encoding::Encoding;
pub use error::{AttachError, ChannelClosed, ConfigError, DeviceError, IrqError};
pub use irq::{InterruptController, IrqLine, IrqReturn};
pub use message::{Message, SlotRecord};
pub use mmio::{MmioBus, RegisterBus, RegisterWindow, SharedRegisters};
pub use transmit::CancelToken;
pub use waker::Readable;
