//! Register window access.
//!
//! All mailbox register traffic goes through a [`RegisterBus`]: 64-bit
//! accesses at byte offsets into the mapped window. [`MmioBus`] performs
//! volatile accesses on real device memory; [`SharedRegisters`] is a plain
//! memory window that two endpoints can share for loopback operation.
//!
//! [`RegisterWindow`] layers the typed CSR/info/slot accessors on top and
//! serializes this side's read-modify-write cycles.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ptr::{read_volatile, write_volatile};
use core::sync::atomic::{AtomicU64, Ordering};

use mailbox_abi::REGISTER_SIZE;
use spinning_top::Spinlock;

use crate::config::RingLayout;
use crate::registers::{Csr, InfoHalf, InfoRegister};

/// 64-bit register access at byte offsets into a window.
///
/// # Panics
///
/// Implementations panic on misaligned or out-of-window offsets. Offsets are
/// validated once against the window size when a channel is attached, so a
/// panic here is a driver bug.
pub trait RegisterBus: Send + Sync {
    /// Size of the window in bytes.
    fn size(&self) -> usize;

    fn read(&self, offset: usize) -> u64;

    fn write(&self, offset: usize, value: u64);

    /// Replace the register at `offset` with `f(old)`, returning the new value.
    ///
    /// Device registers offer no atomic read-modify-write, so the default is
    /// a plain read followed by a write. A write from the other endpoint
    /// landing between the two is lost. Memory-backed windows shared by two
    /// endpoints override this so concurrent updates from both sides compose.
    fn modify(&self, offset: usize, f: &mut dyn FnMut(u64) -> u64) -> u64 {
        let value = f(self.read(offset));
        self.write(offset, value);
        value
    }
}

fn check_access(offset: usize, size: usize, what: &str) {
    assert!(
        offset % REGISTER_SIZE == 0 && offset + REGISTER_SIZE <= size,
        "{} at {:#x} outside register window of {:#x} bytes",
        what,
        offset,
        size
    );
}

/// Volatile access to a device register window.
///
/// The mapping itself is owned by whoever supplied the base pointer; it must
/// outlive this value.
///
/// Read-modify-write uses the plain default of [`RegisterBus::modify`]. A
/// sender's doorbell or validity update rewrites the receiver-owned enable
/// bit 63 with the value it just read, so a receiver clearing that bit in
/// the same window can have it set again. The device must either treat
/// CSR writes from the sending side as write-1-to-set for bits 0-61 and
/// ignore bit 63, or serialize the two endpoints' CSR accesses.
pub struct MmioBus {
    base: *mut u64,
    size: usize,
}

// SAFETY: every access is a single volatile 64-bit load or store; the
// registers themselves are the synchronization point with the device.
unsafe impl Send for MmioBus {}
unsafe impl Sync for MmioBus {}

impl MmioBus {
    /// Wrap an already-mapped register window.
    ///
    /// # Safety
    ///
    /// `base` must be 8-byte aligned and point to at least `size` bytes of
    /// device memory that stays mapped for the lifetime of the returned value.
    pub unsafe fn new(base: *mut u8, size: usize) -> Self {
        Self {
            base: base.cast(),
            size,
        }
    }
}

impl RegisterBus for MmioBus {
    fn size(&self) -> usize {
        self.size
    }

    fn read(&self, offset: usize) -> u64 {
        check_access(offset, self.size, "MMIO read");
        // SAFETY: bounds and alignment checked above, mapping guaranteed by `new`.
        unsafe { read_volatile(self.base.add(offset / REGISTER_SIZE)) }
    }

    fn write(&self, offset: usize, value: u64) {
        check_access(offset, self.size, "MMIO write");
        // SAFETY: bounds and alignment checked above, mapping guaranteed by `new`.
        unsafe { write_volatile(self.base.add(offset / REGISTER_SIZE), value) }
    }
}

/// A register window backed by ordinary memory.
///
/// Clones share the same registers, which is how a loopback peer sees the
/// host's writes.
#[derive(Clone)]
pub struct SharedRegisters {
    registers: Arc<[AtomicU64]>,
}

impl SharedRegisters {
    /// Zero-filled window of `size` bytes.
    pub fn new(size: usize) -> Self {
        let registers: Vec<AtomicU64> = (0..size / REGISTER_SIZE)
            .map(|_| AtomicU64::new(0))
            .collect();
        Self {
            registers: registers.into(),
        }
    }
}

impl RegisterBus for SharedRegisters {
    fn size(&self) -> usize {
        self.registers.len() * REGISTER_SIZE
    }

    fn read(&self, offset: usize) -> u64 {
        check_access(offset, self.size(), "register read");
        self.registers[offset / REGISTER_SIZE].load(Ordering::SeqCst)
    }

    fn write(&self, offset: usize, value: u64) {
        check_access(offset, self.size(), "register write");
        self.registers[offset / REGISTER_SIZE].store(value, Ordering::SeqCst);
    }

    fn modify(&self, offset: usize, f: &mut dyn FnMut(u64) -> u64) -> u64 {
        check_access(offset, self.size(), "register update");
        let register = &self.registers[offset / REGISTER_SIZE];
        let mut current = register.load(Ordering::SeqCst);
        loop {
            let value = f(current);
            match register.compare_exchange_weak(current, value, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return value,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Typed access to one endpoint's view of the mailbox registers.
pub struct RegisterWindow<B> {
    bus: B,
    /// Serializes this side's read-modify-write of shared registers.
    rmw: Spinlock<()>,
}

impl<B: RegisterBus> RegisterWindow<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            rmw: Spinlock::new(()),
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn size(&self) -> usize {
        self.bus.size()
    }

    pub fn read(&self, offset: usize) -> u64 {
        self.bus.read(offset)
    }

    pub fn write(&self, offset: usize, value: u64) {
        self.bus.write(offset, value)
    }

    pub fn csr(&self, ring: &RingLayout) -> Csr {
        Csr::from_bits(self.read(ring.csr))
    }

    pub fn write_csr(&self, ring: &RingLayout, csr: Csr) {
        self.write(ring.csr, csr.bits())
    }

    /// Read-modify-write a CSR. Returns the value written.
    pub fn update_csr(&self, ring: &RingLayout, f: impl Fn(Csr) -> Csr) -> Csr {
        let _guard = self.rmw.lock();
        let bits = self
            .bus
            .modify(ring.csr, &mut |bits| f(Csr::from_bits(bits)).bits());
        Csr::from_bits(bits)
    }

    pub fn info(&self, ring: &RingLayout) -> InfoRegister {
        InfoRegister::from_bits(self.read(ring.info))
    }

    /// Replace one index half of an info register, preserving the other bits.
    pub fn update_info(&self, ring: &RingLayout, half: InfoHalf, index: usize) {
        let _guard = self.rmw.lock();
        self.bus.modify(ring.info, &mut |bits| {
            InfoRegister::from_bits(bits).with(half, index).bits()
        });
    }

    pub fn slot(&self, ring: &RingLayout, index: usize) -> u64 {
        self.read(ring.slot_offset(index))
    }

    pub fn write_slot(&self, ring: &RingLayout, index: usize, value: u64) {
        self.write(ring.slot_offset(index), value)
    }
}
