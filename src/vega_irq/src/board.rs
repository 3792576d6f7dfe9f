//! The subsystem instance
use core::fmt;

use crate::{
    error::{
        DelayError, EnableInterruptLineError, InstallHandlerError, QueryInterruptLineError,
        StuckInterruptError, TimerConfigError,
    },
    hw::{AddressWidth, Hardware, IntcReg},
    intc::{
        cfg::Config,
        imp::{
            self as intc_imp, DispatchReport, DispatchTable, InterruptHandler, Slot,
            StuckDetector,
        },
    },
    timer::{
        cfg::TimerId,
        imp::{self as timer_imp, TimerEvents},
    },
    trap::{self, IrqLockGuard},
    InterruptNum,
};

/// Owns a [`Hardware`] context and everything the drivers share with the
/// trap handler: the dispatch table, the stuck interrupt detector, and the
/// timer event counters.
///
/// The platform's trap entry point (the address given by
/// [`Config::trap_vector`]) must call [`Self::handle_trap`] on the instance
/// that configured it.
pub struct Board<'a, H: Hardware> {
    hw: H,
    config: Config,
    table: DispatchTable<'a, H>,
    stuck_detector: StuckDetector,
    timer_events: TimerEvents,
}

impl<'a, H: Hardware> Board<'a, H> {
    /// Construct a `Board`. All dispatch table entries start as
    /// [`Slot::Unassigned`], and the hardware is left untouched until
    /// [`Self::init`] is called.
    ///
    /// This is a `const fn`, so a `Board` can live in a `static` reachable
    /// from the trap entry point.
    pub const fn new(hw: H, config: Config) -> Self {
        Self {
            hw,
            config,
            table: DispatchTable::new(),
            stuck_detector: StuckDetector::new(),
            timer_events: TimerEvents::new(),
        }
    }

    #[inline]
    pub fn hw(&self) -> &H {
        &self.hw
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn dispatch_table(&self) -> &DispatchTable<'a, H> {
        &self.table
    }

    /// Enable trap delivery and install the built-in timer handlers at the
    /// lines assigned by `H::Width`.
    ///
    /// The interrupt lines themselves stay disabled. Each driver enables its
    /// own line with [`Self::enable_interrupt_line`].
    pub fn init(&self) {
        log::debug!(
            "initializing ({}, timer lines {:?})",
            H::Width::NAME,
            H::Width::TIMER_LINES
        );
        self.enable_global();

        let lock = self.lock_irq();
        self.table.install_timers::<H::Width>(&lock);
    }

    /// Set `mie.MEIE` and `mstatus.MIE` and point `mtvec` at
    /// [`Config::trap_vector`]. Idempotent.
    pub fn enable_global(&self) {
        trap::enable(&self.hw, self.config.trap_vector);
    }

    /// Clear `mstatus.MIE` and `mie.MEIE`.
    pub fn disable_global(&self) {
        trap::disable(&self.hw);
    }

    /// Enter a critical section. The trap handler doesn't run until the
    /// returned guard (and every guard it's nested in) is dropped.
    #[inline]
    pub fn lock_irq(&self) -> IrqLockGuard<'_, H> {
        trap::lock(&self.hw)
    }

    /// Set the enable bit of `line` in the interrupt controller.
    pub fn enable_interrupt_line(
        &self,
        line: InterruptNum,
    ) -> Result<(), EnableInterruptLineError> {
        let lock = self.lock_irq();
        intc_imp::enable_interrupt_line(&lock, &self.hw, line)?;
        log::debug!("line {line} enabled");
        Ok(())
    }

    /// Clear the enable bit of `line` in the interrupt controller.
    pub fn disable_interrupt_line(
        &self,
        line: InterruptNum,
    ) -> Result<(), EnableInterruptLineError> {
        let lock = self.lock_irq();
        intc_imp::disable_interrupt_line(&lock, &self.hw, line)?;
        log::debug!("line {line} disabled");
        Ok(())
    }

    pub fn is_interrupt_line_enabled(
        &self,
        line: InterruptNum,
    ) -> Result<bool, QueryInterruptLineError> {
        intc_imp::is_interrupt_line_enabled(&self.hw, line)
    }

    /// Get a flag indicating whether `line` is asserted, regardless of its
    /// enable bit.
    pub fn is_interrupt_line_pending(
        &self,
        line: InterruptNum,
    ) -> Result<bool, QueryInterruptLineError> {
        intc_imp::is_interrupt_line_pending(&self.hw, line)
    }

    /// Install `handler` for `line`, replacing whatever was there (including
    /// a built-in timer handler).
    pub fn install_handler(
        &self,
        line: InterruptNum,
        handler: &'a (dyn InterruptHandler<H> + Sync),
    ) -> Result<(), InstallHandlerError> {
        let lock = self.lock_irq();
        self.table.install(&lock, line, handler)
    }

    pub fn uninstall_handler(&self, line: InterruptNum) -> Result<(), InstallHandlerError> {
        let lock = self.lock_irq();
        self.table.uninstall(&lock, line)
    }

    /// Get the dispatch table entry for `line`. Returns `None` if `line` is
    /// out of range.
    pub fn slot(&self, line: InterruptNum) -> Option<Slot<'a, H>> {
        let lock = self.lock_irq();
        self.table.get(&lock, line)
    }

    /// Run a dispatch pass: take a snapshot of `INTR_STATUS` and call the
    /// handler of every line set in it, in increasing line order.
    ///
    /// Returns `Err(_)` if a line has been left asserted by too many
    /// consecutive passes (see [`Config::stuck_threshold`]). The handlers of
    /// the pass have been called in this case too.
    pub fn dispatch(&self) -> Result<DispatchReport, StuckInterruptError> {
        let lock = self.lock_irq();

        let status = self.hw.read_intc(IntcReg::Status);
        log::trace!("dispatch pass, status = {status:#010x}");

        let report = self
            .table
            .dispatch(&lock, &self.hw, &self.timer_events, status);

        if let Some(threshold) = self.config.stuck_threshold {
            let stalled = status & self.hw.read_intc(IntcReg::Status);
            self.stuck_detector.observe(&lock, stalled, threshold)?;
        }

        Ok(report)
    }

    /// The body of the trap handler. Calls [`Self::dispatch`].
    ///
    /// # Panics
    ///
    /// There's nobody to report a stuck interrupt line to, and returning
    /// would only re-enter the trap handler, so this method panics if
    /// [`Self::dispatch`] detects one.
    pub fn handle_trap(&self) {
        match self.dispatch() {
            Ok(report) => {
                if report.status == 0 {
                    log::trace!("spurious trap");
                }
            }
            Err(e) => {
                log::error!("{e}");
                panic!("unacknowledged interrupt on line {}", e.line);
            }
        }
    }

    /// Get the interrupt line of `timer`.
    pub fn timer_interrupt_line(&self, timer: usize) -> Result<InterruptNum, TimerConfigError> {
        let timer = TimerId::new(timer).ok_or(TimerConfigError::BadParam)?;
        Ok(H::Width::TIMER_LINES[timer.index()])
    }

    /// Load `timer` with `clocks` with its interrupt masked and wait until it
    /// expires.
    ///
    /// How long this waits is governed by [`Config::poll_mode`].
    pub fn delay(&self, timer: usize, clocks: u32) -> Result<(), DelayError> {
        timer_imp::delay(&self.hw, self.config.poll_mode, timer, clocks)
    }

    /// Load `timer` with `clocks` and start it with its interrupt unmasked.
    ///
    /// The expiration is delivered only if the timer's interrupt line is
    /// enabled and [`Self::enable_global`] has been called.
    pub fn run_in_interrupt_mode(
        &self,
        timer: usize,
        clocks: u32,
    ) -> Result<(), TimerConfigError> {
        let lock = self.lock_irq();
        timer_imp::run_in_interrupt_mode(&lock, &self.hw, timer, clocks)?;
        log::debug!("timer {timer} running in interrupt mode, {clocks:#x} clocks");
        Ok(())
    }

    pub fn stop_timer(&self, timer: usize) -> Result<(), TimerConfigError> {
        let lock = self.lock_irq();
        timer_imp::stop(&lock, &self.hw, timer)
    }

    pub fn timer_current_value(&self, timer: usize) -> Result<u32, TimerConfigError> {
        timer_imp::current_value(&self.hw, timer)
    }

    /// Get and reset the number of expirations of `timer` handled by its
    /// built-in handler.
    pub fn take_timer_events(&self, timer: usize) -> Result<u32, TimerConfigError> {
        let lock = self.lock_irq();
        timer_imp::take_events(&lock, &self.timer_events, timer)
    }
}

impl<H: Hardware + fmt::Debug> fmt::Debug for Board<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Board")
            .field("hw", &self.hw)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
