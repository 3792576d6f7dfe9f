//! The implementation of the interrupt controller driver and the dispatcher.
use core::fmt;

use crate::{
    error::{
        EnableInterruptLineError, InstallHandlerError, QueryInterruptLineError,
        StuckInterruptError,
    },
    hw::{AddressWidth, Hardware, IntcReg},
    intc::cfg::{is_valid_line, NUM_INTERRUPT_LINES},
    timer::{self, cfg::TimerId},
    trap::IrqLockGuard,
    utils::IrqLockCell,
    InterruptNum,
};

/// An interrupt handler.
///
/// Handlers are called in the trap context with interrupts masked. A handler
/// must clear the condition that asserted its line (e.g., by reading a timer's
/// `EOI` register) before returning. Otherwise the line stays asserted and the
/// handler is called again on the very next dispatch pass.
///
/// This trait is implemented for `Fn(&H)` so that plain functions and
/// closures can be installed directly.
pub trait InterruptHandler<H> {
    fn handle(&self, hw: &H);
}

impl<H, F: Fn(&H)> InterruptHandler<H> for F {
    #[inline]
    fn handle(&self, hw: &H) {
        self(hw)
    }
}

/// The content of a [`DispatchTable`] entry.
pub enum Slot<'a, H> {
    /// No handler. A pending interrupt on this line is ignored.
    Unassigned,
    /// The built-in handler of the specified timer. It acknowledges the
    /// interrupt and posts an event that can be retrieved by
    /// [`Board::take_timer_events`](crate::Board::take_timer_events).
    Timer(TimerId),
    /// A handler provided by a peripheral driver.
    Handler(&'a (dyn InterruptHandler<H> + Sync)),
}

impl<H> Clone for Slot<'_, H> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<H> Copy for Slot<'_, H> {}

impl<H> Slot<'_, H> {
    #[inline]
    pub fn is_assigned(&self) -> bool {
        !matches!(self, Self::Unassigned)
    }
}

impl<H> PartialEq for Slot<'_, H> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unassigned, Self::Unassigned) => true,
            (Self::Timer(x), Self::Timer(y)) => x == y,
            // Compare the data pointers only. Vtable pointers of the same type
            // aren't guaranteed to be unique.
            (Self::Handler(x), Self::Handler(y)) => {
                core::ptr::eq(*x as *const _ as *const u8, *y as *const _ as *const u8)
            }
            _ => false,
        }
    }
}

impl<H> fmt::Debug for Slot<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unassigned => f.write_str("Unassigned"),
            Self::Timer(timer) => f.debug_tuple("Timer").field(timer).finish(),
            Self::Handler(handler) => f
                .debug_tuple("Handler")
                .field(&(*handler as *const _ as *const u8))
                .finish(),
        }
    }
}

/// Maps interrupt lines to [`Slot`]s.
///
/// Every entry starts as [`Slot::Unassigned`]. Entries are only modified
/// inside a critical section, so they can be updated while interrupts are
/// live.
pub struct DispatchTable<'a, H> {
    slots: IrqLockCell<[Slot<'a, H>; NUM_INTERRUPT_LINES]>,
}

impl<'a, H: Hardware> DispatchTable<'a, H> {
    pub const fn new() -> Self {
        Self {
            slots: IrqLockCell::new([Slot::Unassigned; NUM_INTERRUPT_LINES]),
        }
    }

    /// Get the content of the entry for `line`.
    pub fn get(&self, lock: &IrqLockGuard<'_, H>, line: InterruptNum) -> Option<Slot<'a, H>> {
        self.slots.get_at(lock, line)
    }

    /// Replace the entry for `line`, returning the old one.
    pub fn set(
        &self,
        lock: &IrqLockGuard<'_, H>,
        line: InterruptNum,
        slot: Slot<'a, H>,
    ) -> Result<Slot<'a, H>, InstallHandlerError> {
        let old = self
            .slots
            .replace_at(lock, line, slot)
            .ok_or(InstallHandlerError::BadParam)?;
        log::debug!("line {line}: {old:?} -> {slot:?}");
        Ok(old)
    }

    /// Install `handler` for `line`, replacing whatever the entry held.
    pub fn install(
        &self,
        lock: &IrqLockGuard<'_, H>,
        line: InterruptNum,
        handler: &'a (dyn InterruptHandler<H> + Sync),
    ) -> Result<(), InstallHandlerError> {
        self.set(lock, line, Slot::Handler(handler)).map(|_| ())
    }

    /// Reset the entry for `line` to [`Slot::Unassigned`].
    pub fn uninstall(
        &self,
        lock: &IrqLockGuard<'_, H>,
        line: InterruptNum,
    ) -> Result<(), InstallHandlerError> {
        self.set(lock, line, Slot::Unassigned).map(|_| ())
    }

    /// Point the entries at [`AddressWidth::TIMER_LINES`] to the built-in
    /// timer handlers. Lines outside the table are skipped.
    pub fn install_timers<W: AddressWidth>(&self, lock: &IrqLockGuard<'_, H>) {
        for (timer, line) in TimerId::ALL.into_iter().zip(W::TIMER_LINES) {
            match self.slots.replace_at(lock, line, Slot::Timer(timer)) {
                Some(old) => log::debug!("line {line}: {old:?} -> {timer:?} ({})", W::NAME),
                None => log::warn!("{}: {timer:?} is assigned to nonexistent line {line}", W::NAME),
            }
        }
    }

    /// Call the handlers of the lines set in `status`, in increasing line
    /// order. `status` is not re-read between handlers.
    pub fn dispatch(
        &self,
        lock: &IrqLockGuard<'_, H>,
        hw: &H,
        timer_events: &timer::imp::TimerEvents,
        status: u32,
    ) -> DispatchReport {
        let mut report = DispatchReport {
            status,
            invoked: 0,
            unassigned: 0,
        };

        for line in set_bits(status) {
            let bit = 1u32 << line;
            match self.slots.get_at(lock, line).unwrap_or(Slot::Unassigned) {
                Slot::Unassigned => {
                    log::warn!("line {line} is pending but has no handler");
                    report.unassigned |= bit;
                }
                Slot::Timer(timer) => {
                    log::trace!("line {line}: dispatching to {timer:?}");
                    timer::imp::handle_interrupt(lock, hw, timer_events, timer);
                    report.invoked |= bit;
                }
                Slot::Handler(handler) => {
                    log::trace!("line {line}: dispatching to a driver handler");
                    handler.handle(hw);
                    report.invoked |= bit;
                }
            }
        }

        report
    }
}

impl<H: Hardware> Default for DispatchTable<'_, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> fmt::Debug for DispatchTable<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("DispatchTable { .. }")
    }
}

/// The outcome of a dispatch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// The snapshot of `INTR_STATUS` the pass was based on.
    pub status: u32,
    /// The lines whose handlers were called.
    pub invoked: u32,
    /// The lines that were pending but had no handler.
    pub unassigned: u32,
}

impl DispatchReport {
    /// Iterate over the lines whose handlers were called, in the order they
    /// were called.
    pub fn invoked_lines(&self) -> impl Iterator<Item = InterruptNum> {
        set_bits(self.invoked)
    }

    /// Get a flag indicating whether the pass called no handlers.
    pub fn is_idle(&self) -> bool {
        self.invoked == 0
    }
}

/// Enumerate the set bits of `x` in increasing order.
#[inline]
fn set_bits(mut x: u32) -> impl Iterator<Item = InterruptNum> {
    core::iter::from_fn(move || {
        if x == 0 {
            None
        } else {
            let i = x.trailing_zeros();
            x &= x - 1;
            Some(i as InterruptNum)
        }
    })
}

/// Counts, for each line, the consecutive dispatch passes that made no
/// progress on it.
///
/// A pass makes no progress on a line if the line is still asserted after the
/// pass. A handler that acknowledges its source resets the count even if the
/// source fires again before the next pass.
pub struct StuckDetector {
    passes: IrqLockCell<[u32; NUM_INTERRUPT_LINES]>,
}

impl StuckDetector {
    pub const fn new() -> Self {
        Self {
            passes: IrqLockCell::new([0; NUM_INTERRUPT_LINES]),
        }
    }

    /// Record a dispatch pass. `stalled` is the set of lines asserted both
    /// before and after the pass. Returns the first line that has stalled for
    /// more than `threshold` consecutive passes.
    pub fn observe<H: Hardware + ?Sized>(
        &self,
        lock: &IrqLockGuard<'_, H>,
        stalled: u32,
        threshold: u32,
    ) -> Result<(), StuckInterruptError> {
        let mut all_passes = self.passes.get(lock);
        let mut stuck = None;
        for (line, passes) in all_passes.iter_mut().enumerate() {
            if stalled & (1 << line) == 0 {
                *passes = 0;
                continue;
            }

            *passes = passes.saturating_add(1);
            if *passes > threshold && stuck.is_none() {
                stuck = Some(StuckInterruptError {
                    line,
                    passes: *passes,
                });
            }
        }
        self.passes.set(lock, all_passes);

        match stuck {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for StuckDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StuckDetector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("StuckDetector { .. }")
    }
}

/// Implements [`crate::Board::enable_interrupt_line`].
pub fn enable_interrupt_line<H: Hardware>(
    _lock: &IrqLockGuard<'_, H>,
    hw: &H,
    line: InterruptNum,
) -> Result<(), EnableInterruptLineError> {
    if !is_valid_line(line) {
        return Err(EnableInterruptLineError::BadParam);
    }

    let reg = hw.read_intc(IntcReg::Enable);
    hw.write_intc(IntcReg::Enable, reg | (1u32 << line));
    hw.fence();

    Ok(())
}

/// Implements [`crate::Board::disable_interrupt_line`].
pub fn disable_interrupt_line<H: Hardware>(
    _lock: &IrqLockGuard<'_, H>,
    hw: &H,
    line: InterruptNum,
) -> Result<(), EnableInterruptLineError> {
    if !is_valid_line(line) {
        return Err(EnableInterruptLineError::BadParam);
    }

    let reg = hw.read_intc(IntcReg::Enable);
    hw.write_intc(IntcReg::Enable, reg & !(1u32 << line));
    hw.fence();

    Ok(())
}

/// Implements [`crate::Board::is_interrupt_line_enabled`].
pub fn is_interrupt_line_enabled<H: Hardware>(
    hw: &H,
    line: InterruptNum,
) -> Result<bool, QueryInterruptLineError> {
    if !is_valid_line(line) {
        return Err(QueryInterruptLineError::BadParam);
    }

    Ok((hw.read_intc(IntcReg::Enable) & (1u32 << line)) != 0)
}

/// Implements [`crate::Board::is_interrupt_line_pending`].
pub fn is_interrupt_line_pending<H: Hardware>(
    hw: &H,
    line: InterruptNum,
) -> Result<bool, QueryInterruptLineError> {
    if !is_valid_line(line) {
        return Err(QueryInterruptLineError::BadParam);
    }

    Ok((hw.read_intc(IntcReg::RawStatus) & (1u32 << line)) != 0)
}
