//! Interrupt line registration.
//!
//! The platform owns the interrupt controller. A channel claims its line at
//! attach time and releases it when dropped; the platform's handler for the
//! line calls [`MailboxChannel::handle_interrupt`](crate::channel::MailboxChannel::handle_interrupt).

use alloc::sync::Arc;

use log::debug;

use crate::error::IrqError;

pub type IrqLine = u8;

/// Result of one interrupt-handler pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// Nothing to do; the interrupt was not ours or raced with a drain.
    None,
    /// At least one message was drained.
    Handled,
}

pub trait InterruptController: Send + Sync {
    /// Claim `line` for the mailbox.
    fn request(&self, line: IrqLine) -> Result<(), IrqError>;

    /// Give `line` back. Called exactly once per successful `request`.
    fn release(&self, line: IrqLine);
}

/// A claimed interrupt line, released on drop.
pub(crate) struct IrqRegistration {
    controller: Arc<dyn InterruptController>,
    line: IrqLine,
}

impl IrqRegistration {
    pub(crate) fn request(
        controller: Arc<dyn InterruptController>,
        line: IrqLine,
    ) -> Result<Self, IrqError> {
        controller.request(line)?;
        debug!("mailbox: claimed IRQ {}", line);
        Ok(Self { controller, line })
    }

    pub(crate) fn line(&self) -> IrqLine {
        self.line
    }
}

impl Drop for IrqRegistration {
    fn drop(&mut self) {
        self.controller.release(self.line);
        debug!("mailbox: released IRQ {}", self.line);
    }
}
