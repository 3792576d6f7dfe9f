//! [`Hardware`] implementation for real VEGA processors
use core::{arch::asm, marker::PhantomData};
use riscv::register::{mie, mstatus, mtvec};
use tock_registers::{
    interfaces::{Readable, Writeable},
    registers::ReadOnly,
};

use crate::{
    hw::{AddressWidth, Hardware, IntcReg, NativeWidth, Rv32, Rv64, TimerReg},
    intc::intc_regs,
    timer::{cfg::TimerId, timer_regs},
    INTC_BASE, TIMERS_RAW_INTR_STATUS_OFFSET, TIMER_BASE, TIMER_STRIDE,
};

/// The register layout of the interrupt controller for an [`AddressWidth`].
pub trait IntcLayout: AddressWidth {
    #[doc(hidden)]
    fn read_intc(base: usize, reg: IntcReg) -> u32;
    #[doc(hidden)]
    fn write_intc(base: usize, reg: IntcReg, value: u32);
}

impl IntcLayout for Rv32 {
    #[inline]
    fn read_intc(base: usize, reg: IntcReg) -> u32 {
        // Safety: Verified by the user of `Mmio::new`
        let regs = unsafe { &*(base as *const intc_regs::Intc32) };
        match reg {
            IntcReg::RawStatus => regs.RAW_INTR.get(),
            IntcReg::Enable => regs.INTR_EN.get(),
            IntcReg::Status => regs.INTR_STATUS.get(),
        }
    }

    #[inline]
    fn write_intc(base: usize, reg: IntcReg, value: u32) {
        // Safety: Verified by the user of `Mmio::new`
        let regs = unsafe { &*(base as *const intc_regs::Intc32) };
        if reg == IntcReg::Enable {
            regs.INTR_EN.set(value);
        }
    }
}

impl IntcLayout for Rv64 {
    #[inline]
    fn read_intc(base: usize, reg: IntcReg) -> u32 {
        // Safety: Verified by the user of `Mmio::new`
        let regs = unsafe { &*(base as *const intc_regs::Intc64) };
        (match reg {
            IntcReg::RawStatus => regs.RAW_INTR.get(),
            IntcReg::Enable => regs.INTR_EN.get(),
            IntcReg::Status => regs.INTR_STATUS.get(),
        }) as u32
    }

    #[inline]
    fn write_intc(base: usize, reg: IntcReg, value: u32) {
        // Safety: Verified by the user of `Mmio::new`
        let regs = unsafe { &*(base as *const intc_regs::Intc64) };
        if reg == IntcReg::Enable {
            // Preserve the lines we don't manage
            let upper = regs.INTR_EN.get() & !(u32::MAX as u64);
            regs.INTR_EN.set(upper | value as u64);
        }
    }
}

/// Accesses the interrupt controller and the timer block through their
/// memory-mapped registers, and the machine-mode CSRs of the current hart.
pub struct Mmio<W = NativeWidth> {
    intc_base: usize,
    timer_base: usize,
    _width: PhantomData<fn() -> W>,
}

impl<W: IntcLayout> Mmio<W> {
    /// Construct `Mmio` for the standard register locations
    /// ([`INTC_BASE`], [`TIMER_BASE`]).
    ///
    /// # Safety
    ///
    ///  - The code must be running on a VEGA processor of the given
    ///    [`AddressWidth`] in M-mode.
    ///  - There must be only one instance of `Mmio` at a time.
    ///
    pub const unsafe fn new() -> Self {
        // Safety: Upheld by the caller
        unsafe { Self::with_bases(INTC_BASE, TIMER_BASE) }
    }

    /// Construct `Mmio` for a custom memory map.
    ///
    /// # Safety
    ///
    /// See [`Self::new`]. In addition, `intc_base` and `timer_base` must point
    /// to the respective register blocks.
    pub const unsafe fn with_bases(intc_base: usize, timer_base: usize) -> Self {
        Self {
            intc_base,
            timer_base,
            _width: PhantomData,
        }
    }

    #[inline(always)]
    fn timer_regs(&self, timer: TimerId) -> &timer_regs::Timer {
        // Safety: Verified by the user of `Mmio::new`
        unsafe {
            &*((self.timer_base + timer.index() * TIMER_STRIDE) as *const timer_regs::Timer)
        }
    }

    #[inline(always)]
    fn timers_raw_status_reg(&self) -> &ReadOnly<u32> {
        // Safety: Verified by the user of `Mmio::new`
        unsafe { &*((self.timer_base + TIMERS_RAW_INTR_STATUS_OFFSET) as *const ReadOnly<u32>) }
    }
}

// Safety: A RISC-V hart doesn't take a machine-mode interrupt while
//         `mstatus.MIE` is clear
unsafe impl<W: IntcLayout> Hardware for Mmio<W> {
    type Width = W;

    #[inline]
    fn read_intc(&self, reg: IntcReg) -> u32 {
        W::read_intc(self.intc_base, reg)
    }

    #[inline]
    fn write_intc(&self, reg: IntcReg, value: u32) {
        W::write_intc(self.intc_base, reg, value)
    }

    #[inline]
    fn read_timer(&self, timer: TimerId, reg: TimerReg) -> u32 {
        let regs = self.timer_regs(timer);
        match reg {
            TimerReg::LoadCount => regs.LoadCount.get(),
            TimerReg::CurrentValue => regs.CurrentValue.get(),
            TimerReg::Control => regs.Control.get(),
            TimerReg::Eoi => regs.EOI.get(),
            TimerReg::IntrStatus => regs.IntrStatus.get(),
        }
    }

    #[inline]
    fn write_timer(&self, timer: TimerId, reg: TimerReg, value: u32) {
        let regs = self.timer_regs(timer);
        match reg {
            TimerReg::LoadCount => regs.LoadCount.set(value),
            TimerReg::Control => regs.Control.set(value),
            TimerReg::CurrentValue | TimerReg::Eoi | TimerReg::IntrStatus => {}
        }
    }

    #[inline]
    fn read_timers_raw_status(&self) -> u32 {
        self.timers_raw_status_reg().get()
    }

    #[inline(always)]
    fn fence(&self) {
        // Safety: `fence` only orders memory accesses
        unsafe { asm!("fence") };
    }

    #[inline(always)]
    fn set_mie_meie(&self) {
        // Safety: M-mode is verified by the user of `Mmio::new`
        unsafe { mie::set_mext() };
    }

    #[inline(always)]
    fn clear_mie_meie(&self) {
        // Safety: M-mode is verified by the user of `Mmio::new`
        unsafe { mie::clear_mext() };
    }

    #[inline(always)]
    fn set_mstatus_mie(&self) {
        // Safety: M-mode is verified by the user of `Mmio::new`. `trap::enable`
        // writes `mtvec` before setting `MIE` for the first time.
        unsafe { mstatus::set_mie() };
    }

    #[inline(always)]
    fn fetch_clear_mstatus_mie(&self) -> bool {
        let was_enabled = mstatus::read().mie();
        // Safety: M-mode is verified by the user of `Mmio::new`
        unsafe { mstatus::clear_mie() };
        was_enabled
    }

    #[inline]
    fn write_mtvec(&self, base: usize) {
        // Safety: M-mode is verified by the user of `Mmio::new`. `base` comes
        // from `Config::trap_vector`, whose documentation requires it to be
        // the trap entry point.
        unsafe { mtvec::write(base, mtvec::TrapMode::Direct) };
    }

    #[inline]
    fn read_mtvec(&self) -> usize {
        mtvec::read().address()
    }
}
