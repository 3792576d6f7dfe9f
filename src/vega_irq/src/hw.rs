//! The hardware contract between the drivers and the platform
use crate::{timer::cfg::TimerId, InterruptNum};

/// The registers of the interrupt controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntcReg {
    /// `RAW_INTR` (read-only)
    RawStatus,
    /// `INTR_EN`
    Enable,
    /// `INTR_STATUS` (read-only), `RAW_INTR & INTR_EN`
    Status,
}

/// The registers of a single timer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerReg {
    LoadCount,
    /// Read-only
    CurrentValue,
    Control,
    /// Read-only. Reading it acknowledges the timer's interrupt condition.
    Eoi,
    /// Read-only
    IntrStatus,
}

/// Selects the register layout and the interrupt line assignment of a VEGA
/// processor family. This is a build-time choice; see [`NativeWidth`].
pub trait AddressWidth: 'static {
    /// `"rv32"` or `"rv64"`
    const NAME: &'static str;

    /// The interrupt lines of the timers 0, 1, and 2, respectively.
    const TIMER_LINES: [InterruptNum; 3];
}

/// The 32-bit processors (e.g., THEJAS32). The controller registers are 32 bits
/// wide and padded to an 8-byte stride.
#[derive(Debug, Clone, Copy)]
pub enum Rv32 {}

impl AddressWidth for Rv32 {
    const NAME: &'static str = "rv32";
    const TIMER_LINES: [InterruptNum; 3] = [7, 8, 9];
}

/// The 64-bit processors (e.g., THEJAS64). The controller registers are
/// naturally aligned 64-bit fields.
#[derive(Debug, Clone, Copy)]
pub enum Rv64 {}

impl AddressWidth for Rv64 {
    const NAME: &'static str = "rv64";
    const TIMER_LINES: [InterruptNum; 3] = [10, 11, 12];
}

/// The [`AddressWidth`] matching the compilation target.
#[cfg(target_pointer_width = "64")]
pub type NativeWidth = Rv64;

/// The [`AddressWidth`] matching the compilation target.
#[cfg(not(target_pointer_width = "64"))]
pub type NativeWidth = Rv32;

/// Provides access to the memory-mapped registers of the interrupt controller
/// and the timer block, and to the processor's machine-mode interrupt state.
///
/// A value of this type represents the whole hardware context. Drivers never
/// touch global state; everything flows through the instance owned by
/// [`Board`](crate::Board), which makes it possible to run several
/// independent simulated instances side by side.
///
/// Controller registers are exposed through their lower 32 bits regardless of
/// [`AddressWidth`] because the dispatcher only serves lines `0..32`.
///
/// # Safety
///
/// The implementation must represent a single hart. In particular, while
/// `mstatus.MIE` is clear, the trap handler (and thus
/// [`Board::handle_trap`](crate::Board::handle_trap)) must not be entered.
/// The drivers rely on this to protect the state they share with the trap
/// handler.
pub unsafe trait Hardware {
    type Width: AddressWidth;

    fn read_intc(&self, reg: IntcReg) -> u32;

    /// Write an interrupt controller register. Writes to read-only registers
    /// are ignored.
    fn write_intc(&self, reg: IntcReg, value: u32);

    /// Read a timer register. Reading [`TimerReg::Eoi`] has a side effect.
    fn read_timer(&self, timer: TimerId, reg: TimerReg) -> u32;

    /// Write a timer register. Writes to read-only registers are ignored.
    fn write_timer(&self, timer: TimerId, reg: TimerReg, value: u32);

    /// Read the timer block's global raw interrupt status register. Bit `n`
    /// reflects timer `n`'s interrupt condition regardless of its mask bit.
    fn read_timers_raw_status(&self) -> u32;

    /// Make preceding register writes visible to the devices before any
    /// subsequent access.
    fn fence(&self);

    /// Set `mie.MEIE` (Machine External Interrupt Enable).
    fn set_mie_meie(&self);

    /// Clear `mie.MEIE`.
    fn clear_mie_meie(&self);

    /// Set `mstatus.MIE` (Machine Interrupt Enable).
    fn set_mstatus_mie(&self);

    /// Clear `mstatus.MIE`, returning its previous value.
    fn fetch_clear_mstatus_mie(&self) -> bool;

    /// Program `mtvec` with `base` in direct mode.
    fn write_mtvec(&self, base: usize);

    /// Read the base address programmed in `mtvec`.
    fn read_mtvec(&self) -> usize;
}
