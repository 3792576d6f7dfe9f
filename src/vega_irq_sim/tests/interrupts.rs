//! Dispatch, interrupt line gating, and trap delivery
use quickcheck_macros::quickcheck;
use std::sync::Mutex;
use vega_irq::{
    Board, Config, EnableInterruptLineError, InstallHandlerError, InterruptHandler, InterruptNum,
    QueryInterruptLineError, Rv32, Rv64, Slot, StuckInterruptError, TimerId,
    NUM_INTERRUPT_LINES,
};
use vega_irq_sim::{init_logger, take_trap, SimHardware};

type Sim32 = SimHardware<Rv32>;

/// Records the lines of the handlers that were called.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<InterruptNum>>,
}

impl Recorder {
    fn take(&self) -> Vec<InterruptNum> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

/// Records the call and acknowledges the line.
struct Acknowledging<'a> {
    line: InterruptNum,
    recorder: &'a Recorder,
}

impl InterruptHandler<Sim32> for Acknowledging<'_> {
    fn handle(&self, hw: &Sim32) {
        self.recorder.calls.lock().unwrap().push(self.line);
        hw.lower_line(self.line);
    }
}

/// Records the call but forgets to acknowledge the line.
struct Forgetful<'a> {
    line: InterruptNum,
    recorder: &'a Recorder,
}

impl InterruptHandler<Sim32> for Forgetful<'_> {
    fn handle(&self, _: &Sim32) {
        self.recorder.calls.lock().unwrap().push(self.line);
    }
}

fn acknowledging_handlers(recorder: &Recorder) -> Vec<Acknowledging<'_>> {
    (0..NUM_INTERRUPT_LINES)
        .map(|line| Acknowledging { line, recorder })
        .collect()
}

#[quickcheck]
fn asserted_line_invokes_only_its_handler(line: u8) -> bool {
    init_logger();
    let line = line as usize % NUM_INTERRUPT_LINES;

    let recorder = Recorder::default();
    let handlers = acknowledging_handlers(&recorder);
    let board = Board::new(Sim32::new(), Config::new());
    for (i, handler) in handlers.iter().enumerate() {
        board.install_handler(i, handler).unwrap();
        board.enable_interrupt_line(i).unwrap();
    }

    board.hw().raise_line(line);
    let report = board.dispatch().unwrap();

    recorder.take() == [line] && report.invoked == 1 << line
}

#[test]
fn handlers_run_in_line_order_from_one_snapshot() {
    init_logger();
    let recorder = Recorder::default();
    let handlers = acknowledging_handlers(&recorder);
    let board = Board::new(Sim32::new(), Config::new());
    for line in [2, 5, 30] {
        board.install_handler(line, &handlers[line]).unwrap();
        board.enable_interrupt_line(line).unwrap();
    }
    for line in [30, 5, 2] {
        board.hw().raise_line(line);
    }

    board.dispatch().unwrap();
    assert_eq!(recorder.take(), [2, 5, 30]);

    // All acknowledged
    assert!(board.dispatch().unwrap().is_idle());
    assert!(recorder.take().is_empty());
}

#[test]
fn timer_line_sets_follow_the_width() {
    init_logger();
    let rv32 = Board::new(SimHardware::<Rv32>::new(), Config::new());
    let rv64 = Board::new(SimHardware::<Rv64>::new(), Config::new());
    rv32.init();
    rv64.init();

    let lines = |timer_slot: &dyn Fn(InterruptNum) -> bool| {
        (0..NUM_INTERRUPT_LINES)
            .filter(|&line| timer_slot(line))
            .collect::<Vec<_>>()
    };
    let rv32_lines = lines(&|line| matches!(rv32.slot(line), Some(Slot::Timer(_))));
    let rv64_lines = lines(&|line| matches!(rv64.slot(line), Some(Slot::Timer(_))));

    assert_eq!(rv32_lines, [7, 8, 9]);
    assert_eq!(rv64_lines, [10, 11, 12]);
    assert!(rv32_lines.iter().all(|line| !rv64_lines.contains(line)));

    for (i, timer) in TimerId::ALL.into_iter().enumerate() {
        assert_eq!(rv32.slot(7 + i), Some(Slot::Timer(timer)));
        assert_eq!(rv64.slot(10 + i), Some(Slot::Timer(timer)));
    }
}

#[test]
fn init_programs_the_trap_state() {
    let board = Board::new(Sim32::new(), Config::new().trap_vector(0x8000_0040));
    assert!(!board.hw().mstatus_mie());
    board.init();

    assert!(board.hw().mstatus_mie());
    assert!(board.hw().mie_meie());
    assert_eq!(vega_irq::Hardware::read_mtvec(board.hw()), 0x8000_0040);

    // Repeating has no further effect
    board.enable_global();
    assert!(board.hw().mstatus_mie());
    assert_eq!(vega_irq::Hardware::read_mtvec(board.hw()), 0x8000_0040);
}

#[test]
fn gate_is_idempotent() {
    let board = Board::new(Sim32::new(), Config::new());
    board.enable_interrupt_line(5).unwrap();
    let fences = board.hw().fences();
    assert_eq!(board.is_interrupt_line_enabled(5), Ok(true));

    board.enable_interrupt_line(5).unwrap();
    assert_eq!(board.is_interrupt_line_enabled(5), Ok(true));
    assert!((0..NUM_INTERRUPT_LINES)
        .filter(|&line| line != 5)
        .all(|line| board.is_interrupt_line_enabled(line) == Ok(false)));

    // Every update is followed by a fence
    assert_eq!(board.hw().fences(), fences + 1);
}

#[test]
fn out_of_range_lines_are_rejected() {
    let handler = |_: &Sim32| {};
    let board = Board::new(Sim32::new(), Config::new());
    for line in [NUM_INTERRUPT_LINES, 63, usize::MAX] {
        assert_eq!(
            board.enable_interrupt_line(line),
            Err(EnableInterruptLineError::BadParam)
        );
        assert_eq!(
            board.disable_interrupt_line(line),
            Err(EnableInterruptLineError::BadParam)
        );
        assert_eq!(
            board.is_interrupt_line_pending(line),
            Err(QueryInterruptLineError::BadParam)
        );
        assert_eq!(
            board.install_handler(line, &handler),
            Err(InstallHandlerError::BadParam)
        );
        assert_eq!(board.slot(line), None);
    }
    assert_eq!(board.hw().fences(), 0);
}

#[test]
fn pending_ignores_the_enable_bit() {
    let board = Board::new(Sim32::new(), Config::new());
    board.hw().raise_line(12);
    assert_eq!(board.is_interrupt_line_pending(12), Ok(true));
    assert_eq!(board.is_interrupt_line_enabled(12), Ok(false));
    // Not enabled, so not dispatched
    assert_eq!(board.dispatch().unwrap().status, 0);
}

#[test]
fn unassigned_line_is_a_no_op() {
    init_logger();
    let board = Board::new(Sim32::new(), Config::new());
    board.enable_interrupt_line(20).unwrap();
    board.hw().raise_line(20);

    let report = board.dispatch().unwrap();
    assert_eq!(report.unassigned, 1 << 20);
    assert!(report.is_idle());
}

#[test]
fn unacknowledged_handler_is_invoked_again() {
    init_logger();
    let recorder = Recorder::default();
    let handler = Forgetful {
        line: 3,
        recorder: &recorder,
    };
    let board = Board::new(Sim32::new(), Config::new());
    board.install_handler(3, &handler).unwrap();
    board.enable_interrupt_line(3).unwrap();
    board.hw().raise_line(3);

    board.dispatch().unwrap();
    board.dispatch().unwrap();
    assert_eq!(recorder.take(), [3, 3]);
}

#[test]
fn unacknowledged_handler_is_reported_stuck() {
    init_logger();
    let recorder = Recorder::default();
    let handler = Forgetful {
        line: 3,
        recorder: &recorder,
    };
    let board = Board::new(Sim32::new(), Config::new().stuck_threshold(Some(4)));
    board.install_handler(3, &handler).unwrap();
    board.enable_interrupt_line(3).unwrap();
    board.hw().raise_line(3);

    for _ in 0..4 {
        board.dispatch().unwrap();
    }
    assert_eq!(
        board.dispatch(),
        Err(StuckInterruptError { line: 3, passes: 5 })
    );
    assert_eq!(recorder.take().len(), 5);
}

#[test]
#[should_panic(expected = "unacknowledged interrupt on line 3")]
fn stuck_line_is_fatal_in_the_trap_handler() {
    init_logger();
    let recorder = Recorder::default();
    let handler = Forgetful {
        line: 3,
        recorder: &recorder,
    };
    let board = Board::new(Sim32::new(), Config::new());
    board.init();
    board.install_handler(3, &handler).unwrap();
    board.enable_interrupt_line(3).unwrap();
    board.hw().raise_line(3);

    while take_trap(&board) {}
}

#[test]
fn trap_requires_every_enable() {
    let recorder = Recorder::default();
    let handlers = acknowledging_handlers(&recorder);
    let board = Board::new(Sim32::new(), Config::new());
    board.install_handler(6, &handlers[6]).unwrap();
    board.hw().raise_line(6);

    // Neither the line nor the hart is enabled
    assert!(!take_trap(&board));

    board.enable_interrupt_line(6).unwrap();
    assert!(!take_trap(&board));

    board.enable_global();
    assert!(take_trap(&board));
    assert_eq!(recorder.take(), [6]);
    assert!(board.hw().mstatus_mie());

    board.hw().raise_line(6);
    board.disable_global();
    assert!(!take_trap(&board));
}

#[test]
fn critical_section_defers_the_trap() {
    let recorder = Recorder::default();
    let handlers = acknowledging_handlers(&recorder);
    let board = Board::new(Sim32::new(), Config::new());
    board.init();
    board.install_handler(6, &handlers[6]).unwrap();
    board.enable_interrupt_line(6).unwrap();

    {
        let outer = board.lock_irq();
        board.hw().raise_line(6);
        {
            let _inner = board.lock_irq();
            assert!(!take_trap(&board));
        }
        // The inner guard doesn't unmask
        assert!(!take_trap(&board));
        assert!(outer.is_outermost());
    }

    assert!(take_trap(&board));
    assert_eq!(recorder.take(), [6]);
}

#[test]
fn uninstalled_handler_is_not_invoked() {
    let recorder = Recorder::default();
    let handlers = acknowledging_handlers(&recorder);
    let board = Board::new(Sim32::new(), Config::new());
    board.install_handler(1, &handlers[1]).unwrap();
    board.enable_interrupt_line(1).unwrap();
    board.uninstall_handler(1).unwrap();
    board.hw().raise_line(1);

    let report = board.dispatch().unwrap();
    assert_eq!(report.unassigned, 1 << 1);
    assert!(recorder.take().is_empty());
}
