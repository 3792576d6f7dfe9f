//! The implementation of the timer driver.
use crate::{
    error::{DelayError, TimerConfigError},
    hw::{Hardware, TimerReg},
    intc::cfg::PollMode,
    timer::{
        cfg::{TimerId, NUM_TIMERS},
        timer_regs::Control,
    },
    trap::{self, IrqLockGuard},
    utils::IrqLockCell,
};
use tock_registers::fields::FieldValue;

type ControlValue = FieldValue<u32, Control::Register>;

/// Enabled, reloading, interrupt masked. The condition is still visible in
/// `TimersRawIntStatus`.
#[inline]
fn control_polling() -> ControlValue {
    Control::ENABLE::Enable + Control::MODE::UserDefined + Control::INTERRUPT_MASK::Masked
}

/// Enabled, reloading, interrupt unmasked.
#[inline]
fn control_interrupt() -> ControlValue {
    Control::ENABLE::Enable + Control::MODE::UserDefined + Control::INTERRUPT_MASK::Unmasked
}

/// The number of expirations observed by the built-in timer handlers, per
/// timer, since the last [`take_events`].
pub struct TimerEvents {
    counts: [IrqLockCell<u32>; NUM_TIMERS],
}

impl TimerEvents {
    pub const fn new() -> Self {
        Self {
            counts: [IrqLockCell::new(0), IrqLockCell::new(0), IrqLockCell::new(0)],
        }
    }
}

impl Default for TimerEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn timer_id(timer: usize) -> Result<TimerId, TimerConfigError> {
    TimerId::new(timer).ok_or(TimerConfigError::BadParam)
}

/// Disable `timer`, load it with `clocks`, and re-enable it with `control`.
///
/// Must be called inside a critical section so that the trap handler doesn't
/// observe the timer half-configured.
fn program<H: Hardware>(
    _lock: &IrqLockGuard<'_, H>,
    hw: &H,
    timer: TimerId,
    clocks: u32,
    control: ControlValue,
) {
    log::trace!("{timer:?}: load {clocks:#x}, control {:#x}", control.value);

    hw.write_timer(timer, TimerReg::Control, 0);
    hw.fence();
    hw.write_timer(timer, TimerReg::LoadCount, clocks);
    hw.fence();
    hw.write_timer(timer, TimerReg::Control, control.value);
    hw.fence();
}

/// Check whether `raw_status` (a value of `TimersRawIntStatus`) completes a
/// polling wait on `timer`.
///
/// The wait completes only if `timer`'s bit is the only one set. If another
/// timer's condition is pending at the same time, an unbounded wait never
/// completes; use [`PollMode::Bounded`] to get out of it.
#[inline]
pub const fn poll_satisfied(raw_status: u32, timer: TimerId) -> bool {
    raw_status == timer.raw_status_bit()
}

/// Implements [`crate::Board::delay`].
pub fn delay<H: Hardware>(
    hw: &H,
    poll_mode: PollMode,
    timer: usize,
    clocks: u32,
) -> Result<(), DelayError> {
    let timer = timer_id(timer)?;

    {
        let lock = trap::lock(hw);
        program(&lock, hw, timer, clocks, control_polling());
    }

    // Spin outside the critical section. The timer's interrupt is masked, so
    // the trap handler won't touch it in the meantime.
    match poll_mode {
        PollMode::Unbounded => {
            while !poll_satisfied(hw.read_timers_raw_status(), timer) {
                core::hint::spin_loop();
            }
        }
        PollMode::Bounded { max_polls } => {
            let mut polls = 0;
            loop {
                if polls >= max_polls {
                    log::debug!("{timer:?}: gave up after {polls} polls");
                    return Err(DelayError::Timeout);
                }
                polls += 1;
                if poll_satisfied(hw.read_timers_raw_status(), timer) {
                    break;
                }
                core::hint::spin_loop();
            }
        }
    }

    // Acknowledge so that the next wait on this timer doesn't complete
    // immediately
    hw.read_timer(timer, TimerReg::Eoi);

    Ok(())
}

/// Implements [`crate::Board::run_in_interrupt_mode`].
pub fn run_in_interrupt_mode<H: Hardware>(
    lock: &IrqLockGuard<'_, H>,
    hw: &H,
    timer: usize,
    clocks: u32,
) -> Result<(), TimerConfigError> {
    let timer = timer_id(timer)?;
    program(lock, hw, timer, clocks, control_interrupt());
    Ok(())
}

/// Implements [`crate::Board::stop_timer`].
pub fn stop<H: Hardware>(
    _lock: &IrqLockGuard<'_, H>,
    hw: &H,
    timer: usize,
) -> Result<(), TimerConfigError> {
    let timer = timer_id(timer)?;
    hw.write_timer(timer, TimerReg::Control, 0);
    hw.fence();
    Ok(())
}

/// Implements [`crate::Board::timer_current_value`].
pub fn current_value<H: Hardware>(hw: &H, timer: usize) -> Result<u32, TimerConfigError> {
    let timer = timer_id(timer)?;
    Ok(hw.read_timer(timer, TimerReg::CurrentValue))
}

/// The built-in interrupt handler of `timer`.
pub fn handle_interrupt<H: Hardware>(
    lock: &IrqLockGuard<'_, H>,
    hw: &H,
    events: &TimerEvents,
    timer: TimerId,
) {
    // Reading `EOI` deasserts the interrupt line
    hw.read_timer(timer, TimerReg::Eoi);

    log::info!("{timer:?} interrupt occurred");
    events.counts[timer.index()].update(lock, |x| x.wrapping_add(1));
}

/// Implements [`crate::Board::take_timer_events`].
pub fn take_events<H: Hardware>(
    lock: &IrqLockGuard<'_, H>,
    events: &TimerEvents,
    timer: usize,
) -> Result<u32, TimerConfigError> {
    let timer = timer_id(timer)?;
    Ok(events.counts[timer.index()].replace(lock, 0))
}
