//! The public interface of the timer block.
use core::fmt;

/// The base address of the timer block.
pub const TIMER_BASE: usize = 0x1000_0a00;

/// The distance between the register blocks of two adjacent timers.
pub const TIMER_STRIDE: usize = 0x14;

/// The offset of `TimersRawIntStatus` (the timer block's global raw interrupt
/// status register) from [`TIMER_BASE`].
pub const TIMERS_RAW_INTR_STATUS_OFFSET: usize = 0xa8;

/// The number of timers in the timer block.
pub const NUM_TIMERS: usize = 3;

/// Identifies one of the timers in the timer block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u8);

impl TimerId {
    pub const TIMER0: Self = Self(0);
    pub const TIMER1: Self = Self(1);
    pub const TIMER2: Self = Self(2);

    /// All timers in index order.
    pub const ALL: [Self; NUM_TIMERS] = [Self::TIMER0, Self::TIMER1, Self::TIMER2];

    /// Construct `TimerId` from a timer index. Returns `None` if the timer
    /// block doesn't have a timer with that index.
    #[inline]
    pub const fn new(index: usize) -> Option<Self> {
        if index < NUM_TIMERS {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The bit representing this timer in `TimersRawIntStatus`.
    #[inline]
    pub const fn raw_status_bit(self) -> u32 {
        1 << self.0
    }
}

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Timer{}", self.0)
    }
}
