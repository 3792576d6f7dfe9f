//! The timer driver in polling and interrupt modes
use quickcheck_macros::quickcheck;
use vega_irq::{
    poll_satisfied, Board, Config, DelayError, Hardware, IntcReg, PollMode, Rv32, Rv64,
    TimerConfigError, TimerId, TimerReg, NUM_TIMERS,
};
use vega_irq_sim::{init_logger, run, take_trap, SimHardware};

#[test]
fn end_to_end_timer0_rv32() {
    init_logger();
    let board = Board::new(SimHardware::<Rv32>::new(), Config::new());
    board.init();
    board.run_in_interrupt_mode(0, 0x200).unwrap();
    board.enable_interrupt_line(7).unwrap();
    board.enable_global();

    board.hw().advance(0x1ff);
    assert_eq!(board.hw().read_intc(IntcReg::Status), 0);
    board.hw().advance(1);
    assert_eq!(board.hw().read_intc(IntcReg::Status), 1 << 7);

    let report = board.dispatch().unwrap();
    assert_eq!(report.invoked_lines().collect::<Vec<_>>(), [7]);
    assert_eq!(board.hw().eoi_reads(TimerId::TIMER0), 1);
    assert_eq!(board.hw().eoi_reads(TimerId::TIMER1), 0);
    assert_eq!(board.hw().eoi_reads(TimerId::TIMER2), 0);

    // Acknowledged
    assert_eq!(board.hw().read_intc(IntcReg::Status) & (1 << 7), 0);
    assert!(board.dispatch().unwrap().is_idle());
    assert_eq!(board.take_timer_events(0), Ok(1));
}

#[test]
fn periodic_timer_rv64() {
    init_logger();
    let board = Board::new(SimHardware::<Rv64>::new(), Config::new());
    board.init();
    let line = board.timer_interrupt_line(2).unwrap();
    assert_eq!(line, 12);
    board.enable_interrupt_line(line).unwrap();
    board.run_in_interrupt_mode(2, 0x40).unwrap();

    // Reloads and fires every 0x40 cycles; never classified as stuck
    assert_eq!(run(&board, 0x40 * 20), 20);
    assert_eq!(board.take_timer_events(2), Ok(20));
    assert_eq!(board.take_timer_events(2), Ok(0));
    assert_eq!(board.hw().eoi_reads(TimerId::TIMER2), 20);
}

#[test]
fn masked_line_is_not_delivered() {
    let board = Board::new(SimHardware::<Rv32>::new(), Config::new());
    board.init();
    board.run_in_interrupt_mode(1, 0x10).unwrap();

    // Line 8 isn't enabled
    assert_eq!(run(&board, 0x100), 0);
    assert_eq!(board.is_interrupt_line_pending(8), Ok(true));
    assert_eq!(board.take_timer_events(1), Ok(0));
}

#[test]
fn interrupt_mode_sequence_is_fenced() {
    let board = Board::new(SimHardware::<Rv32>::new(), Config::new());
    board.run_in_interrupt_mode(0, 0x200).unwrap();
    // Disable, load, enable
    assert_eq!(board.hw().fences(), 3);
    assert_eq!(
        board.hw().read_timer(TimerId::TIMER0, TimerReg::Control),
        0x03
    );
    assert_eq!(board.timer_current_value(0), Ok(0x200));

    board.hw().advance(0x10);
    assert_eq!(board.timer_current_value(0), Ok(0x1f0));
}

#[test]
fn stopped_timer_stays_silent() {
    let board = Board::new(SimHardware::<Rv32>::new(), Config::new());
    board.init();
    board.enable_interrupt_line(9).unwrap();
    board.run_in_interrupt_mode(2, 0x10).unwrap();
    board.stop_timer(2).unwrap();

    assert_eq!(run(&board, 0x100), 0);
    assert_eq!(board.timer_current_value(2), Ok(0x10));
}

#[test]
fn polling_wait_completes_after_load_count() {
    init_logger();
    for timer in 0..NUM_TIMERS {
        let board = Board::new(SimHardware::<Rv32>::new(), Config::new());
        board.delay(timer, 0x80).unwrap();

        let hw = board.hw();
        assert_eq!(hw.cycles(), 0x80);
        assert_eq!(hw.eoi_reads(TimerId::new(timer).unwrap()), 1);
        // The interrupt is masked during the wait
        assert_eq!(hw.raw_lines(), 0);
        assert_eq!(hw.traps(), 0);
    }
}

#[test]
fn polling_wait_can_be_repeated() {
    let board = Board::new(SimHardware::<Rv32>::new(), Config::new());
    board.delay(1, 0x20).unwrap();
    board.delay(1, 0x30).unwrap();
    assert_eq!(board.hw().cycles(), 0x50);
}

#[test]
fn poll_bit_patterns() {
    for (timer, pattern) in TimerId::ALL.into_iter().zip([1, 2, 4]) {
        for raw_status in 0..8 {
            assert_eq!(
                poll_satisfied(raw_status, timer),
                raw_status == pattern,
                "{timer:?}, raw status {raw_status:#b}",
            );
        }
        assert!(!poll_satisfied(!pattern & 0b111, timer));
    }

    // Two timers pending at once satisfy neither
    assert!(!poll_satisfied(0b011, TimerId::TIMER0));
    assert!(!poll_satisfied(0b110, TimerId::TIMER1));
}

#[quickcheck]
fn other_timers_never_satisfy_the_wait(raw_status: u32, timer: u8) -> bool {
    let timer = TimerId::new(timer as usize % NUM_TIMERS).unwrap();
    !poll_satisfied(raw_status & !timer.raw_status_bit(), timer)
}

#[quickcheck]
fn extra_bits_spoil_the_wait(raw_status: u32, timer: u8) -> bool {
    let timer = TimerId::new(timer as usize % NUM_TIMERS).unwrap();
    let bit = timer.raw_status_bit();
    poll_satisfied(raw_status | bit, timer) == (raw_status & !bit == 0)
}

#[test]
fn bounded_wait_times_out() {
    init_logger();
    let board = Board::new(
        SimHardware::<Rv32>::new(),
        Config::new().poll_mode(PollMode::Bounded { max_polls: 0x100 }),
    );
    board.hw().set_auto_clock(false);
    assert_eq!(board.delay(0, 1), Err(DelayError::Timeout));
    assert_eq!(board.hw().eoi_reads(TimerId::TIMER0), 0);
}

#[test]
fn bounded_wait_within_budget() {
    let board = Board::new(
        SimHardware::<Rv32>::new(),
        Config::new().poll_mode(PollMode::Bounded { max_polls: 0x100 }),
    );
    assert_eq!(board.delay(0, 0x100), Ok(()));
    assert_eq!(board.delay(0, 0x101), Err(DelayError::Timeout));
}

#[test]
fn bounded_wait_ignores_other_timers() {
    let board = Board::new(
        SimHardware::<Rv32>::new(),
        Config::new().poll_mode(PollMode::Bounded { max_polls: 0x40 }),
    );
    // Timer 1 fires every cycle and nobody acknowledges it. Timer 0 expires
    // within the budget, but the raw status reads 0b011.
    board.run_in_interrupt_mode(1, 1).unwrap();
    assert_eq!(board.delay(0, 0x10), Err(DelayError::Timeout));
    assert_eq!(board.hw().eoi_reads(TimerId::TIMER0), 0);
    assert_eq!(board.hw().read_timers_raw_status(), 0b011);

    // Once timer 1 is stopped the same wait completes
    board.stop_timer(1).unwrap();
    assert_eq!(board.delay(0, 0x10), Ok(()));
    assert_eq!(board.hw().eoi_reads(TimerId::TIMER0), 1);
}

#[test]
fn bad_timers_are_rejected() {
    let board = Board::new(SimHardware::<Rv32>::new(), Config::new());
    assert_eq!(board.delay(NUM_TIMERS, 1), Err(DelayError::BadParam));
    assert_eq!(
        board.run_in_interrupt_mode(NUM_TIMERS, 1),
        Err(TimerConfigError::BadParam)
    );
    assert_eq!(board.stop_timer(usize::MAX), Err(TimerConfigError::BadParam));
    assert_eq!(board.hw().fences(), 0);
}

#[test]
fn reprogramming_holds_off_the_trap() {
    init_logger();
    let board = Board::new(SimHardware::<Rv32>::new(), Config::new());
    board.init();
    board.enable_interrupt_line(7).unwrap();
    board.run_in_interrupt_mode(0, 0x10).unwrap();
    board.hw().advance(0x10);

    // The trap is held off while the foreground reprograms the timer
    {
        let _lock = board.lock_irq();
        board.run_in_interrupt_mode(0, 0x20).unwrap();
        assert!(!take_trap(&board));
    }

    // Disabling the timer dropped the old condition
    assert!(!take_trap(&board));
    assert_eq!(run(&board, 0x20), 1);
}
