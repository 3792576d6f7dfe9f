//! Simulation environment for running `vega_irq` on a hosted environment.
//!
//! [`SimHardware`] models the interrupt controller, the timer block, and the
//! machine-mode interrupt state of a single hart in memory. Time only passes
//! when the simulation is told so ([`SimHardware::advance`]), and traps are
//! only taken at the points chosen by the caller ([`take_trap`], [`run`]),
//! which makes every scenario deterministic.
//!
//! ```
//! use vega_irq::{Board, Config, Rv32};
//! use vega_irq_sim::SimHardware;
//!
//! let board = Board::new(SimHardware::<Rv32>::new(), Config::new());
//! board.init();
//! board.enable_interrupt_line(7).unwrap();
//! board.run_in_interrupt_mode(0, 0x200).unwrap();
//!
//! vega_irq_sim::run(&board, 0x200);
//! assert_eq!(board.take_timer_events(0), Ok(1));
//! ```
use std::{
    cell::{Cell, RefCell},
    fmt,
    marker::PhantomData,
};
use tock_registers::LocalRegisterCopy;
use vega_irq::{
    timer::timer_regs::Control, AddressWidth, Board, Hardware, IntcReg, NativeWidth, TimerId,
    TimerReg, NUM_INTERRUPT_LINES, NUM_TIMERS,
};

/// Used by tests
#[doc(hidden)]
pub extern crate env_logger;

/// Initialize `env_logger` for a test. Can be called more than once.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The state of a simulated timer.
#[derive(Debug, Default, Clone, Copy)]
struct SimTimer {
    load_count: u32,
    current_value: u32,
    control: u32,
    /// The raw (unmasked) interrupt condition
    raw: bool,
    eoi_reads: u32,
}

impl SimTimer {
    fn control(&self) -> LocalRegisterCopy<u32, Control::Register> {
        LocalRegisterCopy::new(self.control)
    }

    fn is_enabled(&self) -> bool {
        self.control().is_set(Control::ENABLE)
    }

    /// The condition as seen by the interrupt controller
    fn is_asserting(&self) -> bool {
        self.raw && !self.control().is_set(Control::INTERRUPT_MASK)
    }

    fn reload_value(&self) -> u32 {
        if self.control().is_set(Control::MODE) {
            self.load_count
        } else {
            u32::MAX
        }
    }

    fn write_control(&mut self, value: u32) {
        let was_enabled = self.is_enabled();
        self.control = value;
        match (was_enabled, self.is_enabled()) {
            (false, true) => self.current_value = self.load_count,
            // Disabling a timer clears its interrupt condition
            (true, false) => self.raw = false,
            _ => {}
        }
    }

    /// Advance one clock cycle.
    fn tick(&mut self) {
        if !self.is_enabled() {
            return;
        }
        if self.current_value <= 1 {
            self.raw = true;
            self.current_value = self.reload_value();
        } else {
            self.current_value -= 1;
        }
    }
}

#[derive(Debug, Default)]
struct State {
    external_lines: u32,
    intc_enable: u32,
    timers: [SimTimer; NUM_TIMERS],
    mstatus_mie: bool,
    mie_meie: bool,
    mtvec: usize,
    fences: u32,
    cycles: u64,
    traps: u32,
}

/// A simulated VEGA processor with the interrupt controller layout and the
/// timer line assignment of `W`.
///
/// This type is `!Sync`. Like the hart it models, it has a single thread of
/// control.
pub struct SimHardware<W = NativeWidth> {
    state: RefCell<State>,
    auto_clock: Cell<bool>,
    _width: PhantomData<fn() -> W>,
}

impl<W: AddressWidth> SimHardware<W> {
    /// Construct a `SimHardware` in the reset state with the automatic clock
    /// enabled.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State::default()),
            auto_clock: Cell::new(true),
            _width: PhantomData,
        }
    }

    /// Control whether every read of `TimersRawIntStatus` advances the clock
    /// by one cycle. This is what makes polling waits terminate. Enabled by
    /// default.
    pub fn set_auto_clock(&self, enabled: bool) {
        self.auto_clock.set(enabled);
    }

    /// Advance the clock by `cycles` cycles.
    pub fn advance(&self, cycles: u32) {
        let mut state = self.state.borrow_mut();
        for _ in 0..cycles {
            for timer in state.timers.iter_mut() {
                timer.tick();
            }
        }
        state.cycles += u64::from(cycles);
    }

    /// Assert an interrupt line that isn't driven by a timer.
    ///
    /// # Panics
    ///
    /// Panics if `line` is out of range.
    pub fn raise_line(&self, line: usize) {
        assert!(line < NUM_INTERRUPT_LINES, "line {line} is out of range");
        log::trace!("raise_line({line})");
        self.state.borrow_mut().external_lines |= 1 << line;
    }

    /// Deassert a line asserted by [`Self::raise_line`].
    ///
    /// # Panics
    ///
    /// Panics if `line` is out of range.
    pub fn lower_line(&self, line: usize) {
        assert!(line < NUM_INTERRUPT_LINES, "line {line} is out of range");
        log::trace!("lower_line({line})");
        self.state.borrow_mut().external_lines &= !(1 << line);
    }

    /// The value of `RAW_INTR`.
    pub fn raw_lines(&self) -> u32 {
        let state = self.state.borrow();
        state
            .timers
            .iter()
            .zip(W::TIMER_LINES)
            .filter(|(timer, _)| timer.is_asserting())
            .fold(state.external_lines, |acc, (_, line)| acc | (1 << line))
    }

    /// Get a flag indicating whether the hart would take an external
    /// interrupt now.
    pub fn is_trap_pending(&self) -> bool {
        let (mie, meie) = {
            let state = self.state.borrow();
            (state.mstatus_mie, state.mie_meie)
        };
        mie && meie && self.read_intc(IntcReg::Status) != 0
    }

    /// The number of times `EOI` of `timer` has been read.
    pub fn eoi_reads(&self, timer: TimerId) -> u32 {
        self.state.borrow().timers[timer.index()].eoi_reads
    }

    /// The number of fences issued.
    pub fn fences(&self) -> u32 {
        self.state.borrow().fences
    }

    /// The number of cycles elapsed since reset.
    pub fn cycles(&self) -> u64 {
        self.state.borrow().cycles
    }

    /// The number of traps taken by [`take_trap`].
    pub fn traps(&self) -> u32 {
        self.state.borrow().traps
    }

    pub fn mstatus_mie(&self) -> bool {
        self.state.borrow().mstatus_mie
    }

    pub fn mie_meie(&self) -> bool {
        self.state.borrow().mie_meie
    }
}

impl<W: AddressWidth> Default for SimHardware<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: AddressWidth> fmt::Debug for SimHardware<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SimHardware")
            .field("width", &W::NAME)
            .field("state", &self.state)
            .field("auto_clock", &self.auto_clock.get())
            .finish()
    }
}

// Safety: `SimHardware` is `!Sync`, and traps are only taken by `take_trap`,
//         which checks `mstatus.MIE`
unsafe impl<W: AddressWidth> Hardware for SimHardware<W> {
    type Width = W;

    fn read_intc(&self, reg: IntcReg) -> u32 {
        match reg {
            IntcReg::RawStatus => self.raw_lines(),
            IntcReg::Enable => self.state.borrow().intc_enable,
            IntcReg::Status => self.raw_lines() & self.state.borrow().intc_enable,
        }
    }

    fn write_intc(&self, reg: IntcReg, value: u32) {
        log::trace!("write_intc({reg:?}, {value:#010x})");
        if reg == IntcReg::Enable {
            self.state.borrow_mut().intc_enable = value;
        }
    }

    fn read_timer(&self, timer: TimerId, reg: TimerReg) -> u32 {
        let mut state = self.state.borrow_mut();
        let timer = &mut state.timers[timer.index()];
        match reg {
            TimerReg::LoadCount => timer.load_count,
            TimerReg::CurrentValue => timer.current_value,
            TimerReg::Control => timer.control,
            TimerReg::Eoi => {
                timer.raw = false;
                timer.eoi_reads += 1;
                0
            }
            TimerReg::IntrStatus => timer.is_asserting() as u32,
        }
    }

    fn write_timer(&self, timer: TimerId, reg: TimerReg, value: u32) {
        log::trace!("write_timer({timer:?}, {reg:?}, {value:#x})");
        let mut state = self.state.borrow_mut();
        let timer = &mut state.timers[timer.index()];
        match reg {
            TimerReg::LoadCount => timer.load_count = value,
            TimerReg::Control => timer.write_control(value),
            TimerReg::CurrentValue | TimerReg::Eoi | TimerReg::IntrStatus => {}
        }
    }

    fn read_timers_raw_status(&self) -> u32 {
        if self.auto_clock.get() {
            self.advance(1);
        }
        let state = self.state.borrow();
        state
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.raw)
            .fold(0, |acc, (i, _)| acc | (1 << i))
    }

    fn fence(&self) {
        self.state.borrow_mut().fences += 1;
    }

    fn set_mie_meie(&self) {
        self.state.borrow_mut().mie_meie = true;
    }

    fn clear_mie_meie(&self) {
        self.state.borrow_mut().mie_meie = false;
    }

    fn set_mstatus_mie(&self) {
        self.state.borrow_mut().mstatus_mie = true;
    }

    fn fetch_clear_mstatus_mie(&self) -> bool {
        std::mem::replace(&mut self.state.borrow_mut().mstatus_mie, false)
    }

    fn write_mtvec(&self, base: usize) {
        self.state.borrow_mut().mtvec = base;
    }

    fn read_mtvec(&self) -> usize {
        self.state.borrow().mtvec
    }
}

/// Take an external interrupt trap if the hart would take one now, i.e.,
/// `mstatus.MIE` and `mie.MEIE` are set and `INTR_STATUS` is nonzero.
///
/// Like the hart, this clears `mstatus.MIE` while [`Board::handle_trap`]
/// runs and restores it afterwards. Returns `true` if a trap was taken.
pub fn take_trap<W: AddressWidth>(board: &Board<'_, SimHardware<W>>) -> bool {
    let hw = board.hw();
    if !hw.is_trap_pending() {
        return false;
    }

    {
        let mut state = hw.state.borrow_mut();
        state.traps += 1;
        state.mstatus_mie = false;
        log::trace!("taking trap #{} at cycle {}", state.traps, state.cycles);
    }

    board.handle_trap();

    // `mret`
    hw.set_mstatus_mie();

    true
}

/// Advance the clock by `cycles` cycles one cycle at a time, taking a trap
/// whenever one is pending. Returns the number of traps taken.
pub fn run<W: AddressWidth>(board: &Board<'_, SimHardware<W>>, cycles: u32) -> u32 {
    let mut traps = 0;
    for _ in 0..cycles {
        board.hw().advance(1);
        if take_trap(board) {
            traps += 1;
        }
    }
    traps
}

#[cfg(test)]
mod tests {
    use super::*;
    use vega_irq::{Rv32, Rv64};

    #[test]
    fn timer_fires_after_load_count_cycles() {
        let mut timer = SimTimer {
            load_count: 3,
            ..Default::default()
        };
        timer.write_control(0x07);
        assert_eq!(timer.current_value, 3);

        timer.tick();
        timer.tick();
        assert!(!timer.raw);
        timer.tick();
        assert!(timer.raw);
        // Reloaded in user-defined mode
        assert_eq!(timer.current_value, 3);
        // Masked
        assert!(!timer.is_asserting());
    }

    #[test]
    fn disabled_timer_doesnt_count() {
        let mut timer = SimTimer {
            load_count: 1,
            ..Default::default()
        };
        timer.tick();
        assert!(!timer.raw);
        assert_eq!(timer.current_value, 0);
    }

    #[test]
    fn disabling_clears_the_condition() {
        let mut timer = SimTimer {
            load_count: 1,
            ..Default::default()
        };
        timer.write_control(0x03);
        timer.tick();
        assert!(timer.is_asserting());
        timer.write_control(0);
        assert!(!timer.raw);
    }

    #[test]
    fn timer_lines_follow_the_width() {
        let rv32 = SimHardware::<Rv32>::new();
        let rv64 = SimHardware::<Rv64>::new();
        rv32.write_timer(TimerId::TIMER1, TimerReg::LoadCount, 1);
        rv32.write_timer(TimerId::TIMER1, TimerReg::Control, 0x03);
        rv64.write_timer(TimerId::TIMER1, TimerReg::LoadCount, 1);
        rv64.write_timer(TimerId::TIMER1, TimerReg::Control, 0x03);
        rv32.advance(1);
        rv64.advance(1);

        assert_eq!(rv32.raw_lines(), 1 << 8);
        assert_eq!(rv64.raw_lines(), 1 << 11);
    }

    #[test]
    fn status_is_raw_and_enable() {
        let hw = SimHardware::<Rv32>::new();
        hw.raise_line(3);
        hw.raise_line(4);
        hw.write_intc(IntcReg::Enable, 1 << 4);
        assert_eq!(hw.read_intc(IntcReg::RawStatus), 0b11000);
        assert_eq!(hw.read_intc(IntcReg::Status), 0b10000);
        hw.lower_line(4);
        assert_eq!(hw.read_intc(IntcReg::Status), 0);
    }
}
