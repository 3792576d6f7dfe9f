#![allow(non_snake_case)]
use tock_registers::registers::{ReadOnly, ReadWrite};

/// One timer instance of the timer block.
#[repr(C)]
pub struct Timer {
    /// 0x00 - The value loaded into the down-counter when it's enabled or
    /// when it reaches zero in user-defined mode
    pub LoadCount: ReadWrite<u32>,
    /// 0x04 - The current value of the down-counter
    pub CurrentValue: ReadOnly<u32>,
    /// 0x08
    pub Control: ReadWrite<u32, Control::Register>,
    /// 0x0c - Reading this register clears the timer's interrupt condition
    pub EOI: ReadOnly<u32>,
    /// 0x10 - The timer's interrupt condition after masking
    pub IntrStatus: ReadOnly<u32>,
}

tock_registers::register_bitfields! {u32,
    pub Control [
        /// Enable bit
        ENABLE OFFSET(0) NUMBITS(1) [
            Disable = 0,
            Enable = 1
        ],

        /// Selects the counting mode
        MODE OFFSET(1) NUMBITS(1) [
            /// Count down from `0xffffffff` after reaching zero
            FreeRunning = 0,
            /// Reload `LoadCount` after reaching zero
            UserDefined = 1
        ],

        /// Interrupt mask bit
        INTERRUPT_MASK OFFSET(2) NUMBITS(1) [
            Unmasked = 0,
            Masked = 1
        ]
    ]
}
