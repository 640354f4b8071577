//! Execution controller: single-step/free-run arbitration, breakpoints and
//! reset, plus the observation entry points used by a host render loop.
//!
//! Engine and peripheral state live in one session behind a mutex shared
//! with at most one free-run worker thread. The worker checks a stop flag
//! once per step and is always joined before the controller leaves
//! free-run, so no engine mutation follows a switch back to single-step.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::checksum::{rom_checksum, ChecksumReport};
use crate::diag::ExecutionDiagnostics;
use crate::disasm::{label_instruction, Disassembler, InstructionLabel};
use crate::display::{self, DisplayDecoder, DisplayFrame, DisplaySource};
use crate::engine::Engine;
use crate::memory::MemoryView;
use crate::peripherals::{KeyBinding, KeyMatrix, PeripheralTicker};
use crate::report::{RegisterReport, ReportContext};
use crate::snapshot::MemorySnapshot;
use crate::{
    Breakpoint, CodeAddress, ControllerConfig, ControllerError, ExecutionMode, InitError,
    MemoryFault, Notification, Register, StepOutcome, StepResult, StopState,
};

/// Engine plus everything a step touches.
struct Session<E> {
    engine: E,
    ticker: PeripheralTicker,
    breakpoint: Option<Breakpoint>,
    previous: Option<CodeAddress>,
    diagnostics: ExecutionDiagnostics,
    stack_base: u16,
    events: Sender<Notification>,
}

impl<E: Engine> Session<E> {
    fn location(&self) -> CodeAddress {
        CodeAddress::new(
            self.engine.read_register(Register::Csr).to_le_bytes()[0],
            self.engine.read_register(Register::Pc),
        )
    }

    fn notify(&self, notification: Notification) {
        // The receiver only goes away with the controller.
        let _ = self.events.send(notification);
    }

    fn reset(&mut self, stack_base_override: Option<u16>) {
        self.engine.zero();
        self.engine.reset();
        self.previous = None;
        self.ticker.reset();
        self.diagnostics.reset();
        self.stack_base = stack_base_override
            .unwrap_or_else(|| self.engine.read_code_word(0, 0).unwrap_or(0));
    }

    fn perform_step(&mut self, free_running: bool) -> Result<StepOutcome, MemoryFault> {
        let before = self.location();
        self.previous = Some(before);

        let mut tick = self
            .ticker
            .before_step(&mut MemoryView::new(&mut self.engine))?;
        let result = if self.ticker.stop_state().is_stopped() {
            None
        } else {
            Some(self.engine.step())
        };
        self.ticker
            .after_step(&mut MemoryView::new(&mut self.engine), &mut tick)?;

        let after = self.location();
        self.diagnostics
            .record_standby(tick.entered_standby, tick.woke);
        if tick.woke {
            self.notify(Notification::TimerWake);
        }
        if tick.entered_standby {
            self.notify(Notification::StandbyEntered);
        }

        if let Some(result) = result {
            self.diagnostics.record_step(result);
            self.classify(result, after, free_running);
        }
        let breakpoint_hit = self.breakpoint.is_some_and(|bp| bp.matches(after));
        if breakpoint_hit {
            log::info!("breakpoint {after} hit");
            self.diagnostics.record_breakpoint();
            self.notify(Notification::BreakpointHit { at: after });
        }

        Ok(StepOutcome {
            before,
            after,
            result,
            breakpoint_hit,
            stop_state: self.ticker.stop_state(),
        })
    }

    fn classify(&self, result: StepResult, at: CodeAddress, free_running: bool) {
        match result {
            StepResult::Ok => {}
            StepResult::ReadOnlyWrite => {
                log::warn!("write to a read-only region at CSR:PC = {at}");
                self.notify(Notification::ReadOnlyWrite { at });
            }
            StepResult::UnimplementedSkipped => {
                let skipped = CodeAddress::new(at.segment, at.offset.wrapping_sub(2));
                log::warn!("unimplemented instruction skipped at {skipped}");
                self.notify(Notification::UnimplementedSkipped { at: skipped });
            }
            StepResult::IllegalInstruction => {
                log::error!("illegal instruction at CSR:PC = {at}");
                self.notify(Notification::IllegalInstruction {
                    at,
                    was_free_running: free_running,
                });
            }
        }
    }
}

struct Shared<E> {
    session: Mutex<Session<E>>,
    free_run: AtomicBool,
}

impl<E> Shared<E> {
    fn lock(&self) -> MutexGuard<'_, Session<E>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn run_worker<E: Engine>(shared: &Shared<E>) {
    log::debug!("free-run worker started");
    while shared.free_run.load(Ordering::Acquire) {
        let mut session = shared.lock();
        if !shared.free_run.load(Ordering::Acquire) {
            break;
        }
        match session.perform_step(true) {
            Ok(outcome) if outcome.requires_supervision() => {
                shared.free_run.store(false, Ordering::Release);
                break;
            }
            Ok(_) => {}
            Err(fault) => {
                log::error!("free run halted: {fault}");
                session.notify(Notification::BusFault(fault));
                shared.free_run.store(false, Ordering::Release);
                break;
            }
        }
        drop(session);
        thread::yield_now();
    }
    log::debug!("free-run worker stopped");
}

/// Drives one emulated core for a host application.
///
/// Construction resets the engine and leaves the controller in
/// [`ExecutionMode::SingleStep`]. Dropping the controller joins the worker,
/// resets the engine and releases it.
pub struct ExecutionController<E: Engine + Send + 'static> {
    shared: Arc<Shared<E>>,
    worker: Option<JoinHandle<()>>,
    notifications: Receiver<Notification>,
    step_pending: bool,
    config: ControllerConfig,
    keys: KeyMatrix,
    decoder: DisplayDecoder,
    disassembler: Option<Box<dyn Disassembler>>,
}

impl<E: Engine + Send + 'static> ExecutionController<E> {
    /// Wraps an initialized engine and applies a reset.
    #[must_use]
    pub fn new(engine: E, config: ControllerConfig) -> Self {
        let (events, notifications) = mpsc::channel();
        let mut session = Session {
            engine,
            ticker: PeripheralTicker::new(config.keyboard_mode),
            breakpoint: None,
            previous: None,
            diagnostics: ExecutionDiagnostics::new(),
            stack_base: 0,
            events,
        };
        session.reset(config.stack_base_override);
        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                free_run: AtomicBool::new(false),
            }),
            worker: None,
            notifications,
            step_pending: false,
            config,
            keys: KeyMatrix::new(),
            decoder: DisplayDecoder::new(),
            disassembler: None,
        }
    }

    /// Initializes an engine from `rom_path` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns the engine's [`InitError`]; no controller is created.
    pub fn open(rom_path: &Path, config: ControllerConfig) -> Result<Self, InitError> {
        let engine = E::init(rom_path)?;
        Ok(Self::new(engine, config))
    }

    /// Current execution mode.
    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        if self.shared.free_run.load(Ordering::Acquire) {
            ExecutionMode::FreeRun
        } else {
            ExecutionMode::SingleStep
        }
    }

    /// Switches execution mode; a no-op when `mode` is already active.
    ///
    /// Returns once the free-run worker has exited when switching to
    /// single-step.
    pub fn set_mode(&mut self, mode: ExecutionMode) {
        match mode {
            ExecutionMode::SingleStep => self.stop_worker(),
            ExecutionMode::FreeRun => self.start_worker(),
        }
    }

    /// Queues one step for the next [`Self::run_frame`].
    ///
    /// Repeated requests before the next frame still yield a single step.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::StepWhileFreeRunning`] in free-run mode.
    pub fn request_step(&mut self) -> Result<(), ControllerError> {
        if self.mode() == ExecutionMode::FreeRun {
            return Err(ControllerError::StepWhileFreeRunning);
        }
        self.step_pending = true;
        Ok(())
    }

    /// Per-frame hook: reaps a worker that stopped itself, then performs the
    /// pending single step, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Memory`] when a peripheral access faults.
    pub fn run_frame(&mut self) -> Result<Option<StepOutcome>, ControllerError> {
        if self.mode() == ExecutionMode::SingleStep {
            self.join_worker();
        }
        if !std::mem::take(&mut self.step_pending) || self.mode() == ExecutionMode::FreeRun {
            return Ok(None);
        }
        let outcome = self.shared.lock().perform_step(false)?;
        Ok(Some(outcome))
    }

    /// Requests and performs one step immediately.
    ///
    /// # Errors
    ///
    /// Same as [`Self::request_step`] and [`Self::run_frame`].
    pub fn step(&mut self) -> Result<StepOutcome, ControllerError> {
        self.request_step()?;
        self.run_frame()?.ok_or(ControllerError::StepWhileFreeRunning)
    }

    /// Zeroes and resets the core, clearing the previous location, peripheral
    /// state and counters. Ends in single-step when `enter_single_step` is
    /// set, free-run otherwise.
    pub fn reset(&mut self, enter_single_step: bool) {
        self.stop_worker();
        self.step_pending = false;
        self.shared.lock().reset(self.config.stack_base_override);
        log::debug!("core reset");
        if !enter_single_step {
            self.start_worker();
        }
    }

    /// Sets the single breakpoint, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Rejects segments above `0xF` and odd addresses.
    pub fn set_breakpoint(&mut self, segment: u8, address: u16) -> Result<(), ControllerError> {
        let breakpoint = Breakpoint::new(segment, address)?;
        self.shared.lock().breakpoint = Some(breakpoint);
        log::debug!("breakpoint set to {}", breakpoint.location());
        Ok(())
    }

    /// Disables the breakpoint.
    pub fn clear_breakpoint(&mut self) {
        self.shared.lock().breakpoint = None;
    }

    /// Active breakpoint.
    #[must_use]
    pub fn breakpoint(&self) -> Option<Breakpoint> {
        self.shared.lock().breakpoint
    }

    /// Moves execution to `segment:address`.
    ///
    /// # Errors
    ///
    /// Rejects segments above `0xF` and odd addresses.
    pub fn jump_to(&mut self, segment: u8, address: u16) -> Result<(), ControllerError> {
        let target = CodeAddress::checked(segment, address)?;
        let mut session = self.shared.lock();
        session
            .engine
            .write_register(Register::Csr, u16::from(target.segment));
        session.engine.write_register(Register::Pc, target.offset);
        drop(session);
        Ok(())
    }

    /// Writes one data byte.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Memory`] for unmapped addresses.
    pub fn write_byte(
        &mut self,
        segment: u8,
        address: u16,
        value: u8,
    ) -> Result<(), ControllerError> {
        MemoryView::new(&mut self.shared.lock().engine).write_u8(segment, address, value)?;
        Ok(())
    }

    /// Replaces the logical key map.
    pub fn set_key_matrix(&mut self, keys: KeyMatrix) {
        self.keys = keys;
    }

    /// Logical key map.
    #[must_use]
    pub const fn key_matrix(&self) -> &KeyMatrix {
        &self.keys
    }

    /// Presses a logical key. Reset keys reset the core in the current mode.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::UnknownKey`] for unmapped names.
    pub fn press_key(&mut self, key: &str) -> Result<(), ControllerError> {
        match self.keys.binding(key) {
            Some(KeyBinding::Matrix { row, column }) => {
                self.shared.lock().ticker.keyboard_mut().press(row, column);
                Ok(())
            }
            Some(KeyBinding::Reset) => {
                self.reset(self.mode() == ExecutionMode::SingleStep);
                Ok(())
            }
            None => Err(ControllerError::UnknownKey(key.to_string())),
        }
    }

    /// Releases a logical key.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::UnknownKey`] for unmapped names.
    pub fn release_key(&mut self, key: &str) -> Result<(), ControllerError> {
        match self.keys.binding(key) {
            Some(KeyBinding::Matrix { row, column }) => {
                self.shared.lock().ticker.keyboard_mut().release(row, column);
                Ok(())
            }
            Some(KeyBinding::Reset) => Ok(()),
            None => Err(ControllerError::UnknownKey(key.to_string())),
        }
    }

    /// Releases every held key.
    pub fn release_all_keys(&mut self) {
        self.shared.lock().ticker.keyboard_mut().release_all();
    }

    /// Attaches the instruction decoder used by reports.
    pub fn set_disassembler(&mut self, disassembler: Box<dyn Disassembler>) {
        self.disassembler = Some(disassembler);
    }

    /// Captures a data memory window.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Memory`] when the window is unmapped.
    pub fn snapshot(
        &self,
        segment: u8,
        base: u16,
        len: usize,
    ) -> Result<MemorySnapshot, ControllerError> {
        let mut session = self.shared.lock();
        let snapshot =
            MemorySnapshot::capture(&MemoryView::new(&mut session.engine), segment, base, len);
        drop(session);
        Ok(snapshot?)
    }

    /// Collects the register panel.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Memory`] when the stack window is unmapped.
    pub fn register_report(&self) -> Result<RegisterReport, ControllerError> {
        let mode = self.mode();
        let mut guard = self.shared.lock();
        let session = &mut *guard;
        let context = ReportContext {
            stack_base: session.stack_base,
            previous: session.previous,
            breakpoint: session.breakpoint,
            stop_state: session.ticker.stop_state(),
            mode,
        };
        let location = session.location();
        let mut view = MemoryView::new(&mut session.engine);
        let instruction = self
            .disassembler
            .as_deref()
            .map(|disasm| label_instruction(&view, disasm, location).text);
        let report = RegisterReport::collect(&mut view, context);
        drop(guard);
        Ok(report?.with_instruction(instruction))
    }

    /// Disassembles the instruction at `CSR:PC`.
    #[must_use]
    pub fn current_instruction(&self) -> Option<InstructionLabel> {
        let disassembler = self.disassembler.as_deref()?;
        let mut session = self.shared.lock();
        let location = session.location();
        let view = MemoryView::new(&mut session.engine);
        let label = label_instruction(&view, disassembler, location);
        drop(session);
        Some(label)
    }

    /// Captures and decodes the display from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Memory`] when the window is unmapped.
    pub fn display_frame(
        &mut self,
        source: DisplaySource,
    ) -> Result<DisplayFrame, ControllerError> {
        let mut session = self.shared.lock();
        let raw = display::capture(&MemoryView::new(&mut session.engine), source)?;
        drop(session);
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{source:?} capture:\n{}", display::format_raw(&raw));
        }
        Ok(self.decoder.decode(&raw))
    }

    /// Takes every notification raised since the last call.
    #[must_use]
    pub fn drain_notifications(&self) -> Vec<Notification> {
        self.notifications.try_iter().collect()
    }

    /// Current stop state.
    #[must_use]
    pub fn stop_state(&self) -> StopState {
        self.shared.lock().ticker.stop_state()
    }

    /// Counters since the last reset.
    #[must_use]
    pub fn diagnostics(&self) -> ExecutionDiagnostics {
        self.shared.lock().diagnostics
    }

    /// `CSR:PC` before the most recent step.
    #[must_use]
    pub fn previous_location(&self) -> Option<CodeAddress> {
        self.shared.lock().previous
    }

    /// Recomputes the ROM checksum.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Memory`] when the image is too short.
    pub fn rom_checksum(&self) -> Result<ChecksumReport, ControllerError> {
        Ok(rom_checksum(&self.shared.lock().engine)?)
    }

    /// Runs `f` with exclusive access to the engine.
    ///
    /// While free running this serializes with the worker between steps.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        f(&mut self.shared.lock().engine)
    }

    fn start_worker(&mut self) {
        if self.shared.free_run.load(Ordering::Acquire) {
            return;
        }
        self.join_worker();
        self.step_pending = false;
        self.shared.free_run.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        self.worker = Some(thread::spawn(move || run_worker(&shared)));
        log::debug!("mode: free-run");
    }

    fn stop_worker(&mut self) {
        let was_running = self.shared.free_run.swap(false, Ordering::AcqRel);
        self.join_worker();
        if was_running {
            log::debug!("mode: single-step");
        }
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("free-run worker panicked");
            }
        }
    }
}

impl<E: Engine + Send + 'static> Drop for ExecutionController<E> {
    fn drop(&mut self) {
        self.stop_worker();
        let mut session = self.shared.lock();
        session.engine.reset();
        session.engine.free();
        drop(session);
    }
}
