#![doc = include_str!("./lib.md")]
#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

mod board;
mod error;
mod hw;
mod trap;
mod utils;

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
mod mmio;

/// The interrupt controller driver and the dispatcher.
#[doc(hidden)]
pub mod intc {
    pub mod cfg;
    pub mod imp;
    pub mod intc_regs;
}

/// The timer driver.
#[doc(hidden)]
pub mod timer {
    pub mod cfg;
    pub mod imp;
    pub mod timer_regs;
}

pub use self::board::*;
pub use self::error::*;
pub use self::hw::*;
pub use self::intc::cfg::*;
pub use self::intc::imp::{DispatchReport, DispatchTable, InterruptHandler, Slot, StuckDetector};
#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
pub use self::mmio::*;
pub use self::timer::cfg::*;
pub use self::timer::imp::poll_satisfied;
pub use self::trap::IrqLockGuard;

/// Numeric value used to identify an interrupt line.
pub type InterruptNum = usize;
