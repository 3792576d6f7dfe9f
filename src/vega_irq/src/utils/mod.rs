//! Utility
mod irq_cell;
pub use self::irq_cell::*;
