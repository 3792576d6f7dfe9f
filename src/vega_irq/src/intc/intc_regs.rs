#![allow(non_snake_case)]
use tock_registers::registers::{ReadOnly, ReadWrite};

/// The interrupt controller's register block on RV32 processors.
///
/// Each register is 32 bits wide, but the block keeps the 8-byte register
/// stride of the RV64 layout by inserting padding words.
#[repr(C)]
pub struct Intc32 {
    /// 0x00 - Raw (unmasked) interrupt lines
    pub RAW_INTR: ReadOnly<u32>,
    _reserved0: u32,
    /// 0x08 - Interrupt enable
    pub INTR_EN: ReadWrite<u32>,
    _reserved1: u32,
    /// 0x10 - Masked interrupt status (`RAW_INTR & INTR_EN`)
    pub INTR_STATUS: ReadOnly<u32>,
}

/// The interrupt controller's register block on RV64 processors.
#[repr(C)]
pub struct Intc64 {
    /// 0x00 - Raw (unmasked) interrupt lines
    pub RAW_INTR: ReadOnly<u64>,
    /// 0x08 - Interrupt enable
    pub INTR_EN: ReadWrite<u64>,
    /// 0x10 - Masked interrupt status (`RAW_INTR & INTR_EN`)
    pub INTR_STATUS: ReadOnly<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoffset::offset_of;

    #[test]
    fn rv32_layout() {
        assert_eq!(offset_of!(Intc32, RAW_INTR), 0x00);
        assert_eq!(offset_of!(Intc32, INTR_EN), 0x08);
        assert_eq!(offset_of!(Intc32, INTR_STATUS), 0x10);
    }

    #[test]
    fn rv64_layout() {
        assert_eq!(offset_of!(Intc64, RAW_INTR), 0x00);
        assert_eq!(offset_of!(Intc64, INTR_EN), 0x08);
        assert_eq!(offset_of!(Intc64, INTR_STATUS), 0x10);
    }
}
