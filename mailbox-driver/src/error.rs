//! Error types.

use core::fmt;

use crate::irq::IrqLine;

/// A [`MailboxConfig`](crate::config::MailboxConfig) that cannot drive the
/// given register window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Staging queue capacity of zero.
    ZeroQueueCapacity,
    /// Halt threshold not below the queue capacity; every drain would halt.
    HaltThresholdTooLarge { halt_free_slots: usize, capacity: usize },
    /// Ring too small to hold a message, or too large for an 8-bit index.
    InvalidSlotCount(usize),
    /// Bitmask encoding with more slots than validity bits.
    TooManySlotsForBitmask(usize),
    /// Register offset not 64-bit aligned.
    Misaligned(usize),
    /// Register offset past the end of the window.
    OutOfWindow { offset: usize, window_size: usize },
    /// Two registers of the layout share an offset.
    Overlap(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroQueueCapacity => write!(f, "staging queue capacity is zero"),
            Self::HaltThresholdTooLarge {
                halt_free_slots,
                capacity,
            } => write!(
                f,
                "halt threshold {} is not below queue capacity {}",
                halt_free_slots, capacity
            ),
            Self::InvalidSlotCount(n) => write!(f, "invalid ring slot count {}", n),
            Self::TooManySlotsForBitmask(n) => {
                write!(f, "{} slots do not fit the validity bitmask", n)
            }
            Self::Misaligned(offset) => write!(f, "register offset {:#x} is misaligned", offset),
            Self::OutOfWindow {
                offset,
                window_size,
            } => write!(
                f,
                "register offset {:#x} outside window of {:#x} bytes",
                offset, window_size
            ),
            Self::Overlap(offset) => write!(f, "registers overlap at {:#x}", offset),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Interrupt line could not be claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqError {
    /// Line does not exist on this controller.
    NoSuchLine(IrqLine),
    /// Line already claimed by another handler.
    Busy(IrqLine),
}

impl fmt::Display for IrqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchLine(line) => write!(f, "no interrupt line {}", line),
            Self::Busy(line) => write!(f, "interrupt line {} already in use", line),
        }
    }
}

impl core::error::Error for IrqError {}

/// Setup-time failure. No channel exists afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachError {
    Config(ConfigError),
    Irq(IrqError),
}

impl From<ConfigError> for AttachError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<IrqError> for AttachError {
    fn from(err: IrqError) -> Self {
        Self::Irq(err)
    }
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid mailbox configuration: {}", err),
            Self::Irq(err) => write!(f, "cannot attach interrupt: {}", err),
        }
    }
}

impl core::error::Error for AttachError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Irq(err) => Some(err),
        }
    }
}

/// Misuse of the byte-stream device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// The device is already open.
    Busy,
    /// Write length is not a whole number of message words.
    InvalidLength(usize),
    /// Read or write at a position that selects no mode.
    InvalidMode(u64),
    /// Read buffer cannot hold a single result.
    BufferTooSmall { needed: usize, got: usize },
    /// Seek to a negative or unrepresentable position.
    InvalidOffset,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "device busy"),
            Self::InvalidLength(len) => {
                write!(f, "length {} is not a multiple of the message size", len)
            }
            Self::InvalidMode(pos) => write!(f, "no device mode at position {}", pos),
            Self::BufferTooSmall { needed, got } => {
                write!(f, "buffer of {} bytes, need at least {}", got, needed)
            }
            Self::InvalidOffset => write!(f, "invalid offset"),
        }
    }
}

impl core::error::Error for DeviceError {}

/// A blocking wait ended because the channel was closed or torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed;

impl fmt::Display for ChannelClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel closed")
    }
}

impl core::error::Error for ChannelClosed {}

