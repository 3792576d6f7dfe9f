//! The public configuration of the interrupt subsystem.
use crate::InterruptNum;

/// The number of interrupt lines served by the dispatcher. The valid range of
/// interrupt numbers is defined as `0..NUM_INTERRUPT_LINES`.
pub const NUM_INTERRUPT_LINES: usize = 32;

/// The base address of the interrupt controller's register block.
pub const INTC_BASE: usize = 0x2001_0000;

/// The default value of [`Config::stuck_threshold`].
pub const DEFAULT_STUCK_THRESHOLD: u32 = 16;

/// Check whether `line` names an interrupt line served by the dispatcher.
#[inline]
pub const fn is_valid_line(line: InterruptNum) -> bool {
    line < NUM_INTERRUPT_LINES
}

/// Specifies how [`Board::delay`] waits for the timer.
///
/// [`Board::delay`]: crate::Board::delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Spin until the status register shows the timer's interrupt condition
    /// and no other, no matter how long it takes.
    Unbounded,
    /// Give up with [`DelayError::Timeout`] after polling the status register
    /// `max_polls` times. `0` gives up without polling at all.
    ///
    /// [`DelayError::Timeout`]: crate::DelayError::Timeout
    Bounded { max_polls: u32 },
}

/// The configuration of a [`Board`](crate::Board).
///
/// ```rust
/// use vega_irq::{Config, PollMode};
///
/// const CONFIG: Config = Config::new()
///     .trap_vector(0x8000_0100)
///     .poll_mode(PollMode::Bounded { max_polls: 1_000_000 });
/// assert_eq!(CONFIG.stuck_threshold, Some(16));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// The address programmed into `mtvec` by [`Board::enable_global`].
    /// It must be 4-byte aligned and must point to a trap entry point that
    /// calls [`Board::handle_trap`]. Defaults to `0`.
    ///
    /// [`Board::enable_global`]: crate::Board::enable_global
    /// [`Board::handle_trap`]: crate::Board::handle_trap
    pub trap_vector: usize,

    /// Defaults to [`PollMode::Unbounded`].
    pub poll_mode: PollMode,

    /// The number of consecutive dispatch passes an interrupt line may be
    /// observed asserted before [`Board::dispatch`] reports it as stuck.
    /// `None` disables the detection.
    ///
    /// Defaults to `Some(DEFAULT_STUCK_THRESHOLD)`.
    ///
    /// [`Board::dispatch`]: crate::Board::dispatch
    pub stuck_threshold: Option<u32>,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            trap_vector: 0,
            poll_mode: PollMode::Unbounded,
            stuck_threshold: Some(DEFAULT_STUCK_THRESHOLD),
        }
    }

    pub const fn trap_vector(self, trap_vector: usize) -> Self {
        assert!(trap_vector % 4 == 0, "`trap_vector` must be 4-byte aligned");
        Self {
            trap_vector,
            ..self
        }
    }

    pub const fn poll_mode(self, poll_mode: PollMode) -> Self {
        Self { poll_mode, ..self }
    }

    pub const fn stuck_threshold(self, stuck_threshold: Option<u32>) -> Self {
        Self {
            stuck_threshold,
            ..self
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
