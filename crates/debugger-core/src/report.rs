//! Register panel projection over engine registers and stack memory.

use std::fmt;

use crate::engine::Engine;
use crate::memory::{ByteOrder, MemoryView};
use crate::{
    Breakpoint, CodeAddress, ExecutionMode, MemoryFault, Psw, Register, StopState,
    EXCEPTION_LEVELS, GENERAL_REGISTER_COUNT,
};

/// Words shown from the top of the stack.
pub const STACK_WORDS_SHOWN: usize = 8;

/// Saved context for one exception level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExceptionContext {
    /// Exception level (`1..=3`).
    pub level: u8,
    /// Return location `ECSRn:ELRn`.
    pub link: CodeAddress,
    /// Saved PSW `EPSWn`.
    pub psw: Psw,
}

/// Controller-side facts that are not engine registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportContext {
    /// Initial stack pointer, used to count pushed words.
    pub stack_base: u16,
    /// `CSR:PC` before the most recent step.
    pub previous: Option<CodeAddress>,
    /// Active breakpoint.
    pub breakpoint: Option<Breakpoint>,
    /// Current stop state.
    pub stop_state: StopState,
    /// Current execution mode.
    pub mode: ExecutionMode,
}

/// Structured register panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterReport {
    /// `R0..R15`.
    pub general: [u8; GENERAL_REGISTER_COUNT],
    /// `CSR:PC`.
    pub location: CodeAddress,
    /// Three code words at `CSR:PC`, zero where unmapped.
    pub code_words: [u16; 3],
    /// Stack pointer.
    pub sp: u16,
    /// Words at `SP`, most significant byte first.
    pub stack_words: [u16; STACK_WORDS_SHOWN],
    /// Words pushed since reset, `None` on underflow.
    pub stack_depth: Option<u16>,
    /// Data segment register.
    pub dsr: u8,
    /// Effective address register.
    pub ea: u16,
    /// Program status word.
    pub psw: Psw,
    /// `LCSR:LR`.
    pub link: CodeAddress,
    /// Exception levels 1..=3.
    pub exceptions: [ExceptionContext; EXCEPTION_LEVELS as usize],
    /// Decoded instruction at `CSR:PC`, when a disassembler is attached.
    pub instruction: Option<String>,
    /// Controller-side context.
    pub context: ReportContext,
}

impl RegisterReport {
    /// Reads registers and the top of the stack.
    ///
    /// # Errors
    ///
    /// Propagates [`MemoryFault`] when the stack window is unmapped.
    pub fn collect<E: Engine + ?Sized>(
        view: &mut MemoryView<'_, E>,
        context: ReportContext,
    ) -> Result<Self, MemoryFault> {
        let engine = view.engine();
        let byte = |value: u16| value.to_le_bytes()[0];
        let location = CodeAddress::new(
            byte(engine.read_register(Register::Csr)),
            engine.read_register(Register::Pc),
        );
        let sp = engine.read_register(Register::Sp);
        let general = engine.general_registers();
        let dsr = byte(engine.read_register(Register::Dsr));
        let ea = engine.read_register(Register::Ea);
        let psw = Psw(byte(engine.read_register(Register::Psw)));
        let link = CodeAddress::new(
            byte(engine.read_register(Register::Lcsr)),
            engine.read_register(Register::Lr),
        );
        let mut exceptions = [ExceptionContext::default(); EXCEPTION_LEVELS as usize];
        for (slot, level) in exceptions.iter_mut().zip(1..=EXCEPTION_LEVELS) {
            *slot = ExceptionContext {
                level,
                link: CodeAddress::new(
                    byte(engine.read_register(Register::Ecsr(level))),
                    engine.read_register(Register::Elr(level)),
                ),
                psw: Psw(byte(engine.read_register(Register::Epsw(level)))),
            };
        }

        let code_words = view.code_words_or_zero::<3>(location.segment, location.offset);
        let mut stack_words = [0u16; STACK_WORDS_SHOWN];
        for (i, word) in stack_words.iter_mut().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let at = sp.wrapping_add((i * 2) as u16);
            *word = view.read_u16(0, at, ByteOrder::Big)?;
        }
        let stack_depth = context
            .stack_base
            .checked_sub(sp)
            .map(|bytes| bytes / 2);

        Ok(Self {
            general,
            location,
            code_words,
            sp,
            stack_words,
            stack_depth,
            dsr,
            ea,
            psw,
            link,
            exceptions,
            instruction: None,
            context,
        })
    }

    /// Attaches a decoded instruction text.
    #[must_use]
    pub fn with_instruction(mut self, instruction: Option<String>) -> Self {
        self.instruction = instruction;
        self
    }
}

fn write_bytes(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{byte:02X}")?;
    }
    Ok(())
}

fn write_words(f: &mut fmt::Formatter<'_>, words: &[u16]) -> fmt::Result {
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{word:04X}")?;
    }
    Ok(())
}

impl fmt::Display for RegisterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== REGISTERS ===")?;
        writeln!(f)?;
        writeln!(f, "General registers:")?;
        f.write_str("QR0 = ")?;
        write_bytes(f, &self.general[..8])?;
        f.write_str("\nQR8 = ")?;
        write_bytes(f, &self.general[8..])?;
        writeln!(f)?;
        writeln!(f)?;

        writeln!(f, "Control registers:")?;
        writeln!(f, "CSR:PC                 {}", self.location)?;
        f.write_str("Code words @ CSR:PC    ")?;
        write_words(f, &self.code_words)?;
        writeln!(f)?;
        if let Some(text) = &self.instruction {
            writeln!(f, "Instruction            {text}")?;
        }
        if let Some(previous) = self.context.previous {
            writeln!(f, "Previous CSR:PC        {previous}")?;
        }
        writeln!(f, "SP                     {:04X}H", self.sp)?;
        f.write_str("Words at SP            ")?;
        write_words(f, &self.stack_words[..4])?;
        f.write_str("\n                       ")?;
        write_words(f, &self.stack_words[4..])?;
        writeln!(f)?;
        match self.stack_depth {
            Some(depth) => writeln!(f, "No. of words in stack  {depth}")?,
            None => writeln!(f, "No. of words in stack  [Stack underflow!]")?,
        }
        writeln!(f, "DSR:EA                 {:X}:{:04X}H", self.dsr, self.ea)?;
        writeln!(f, "PSW                    {}", self.psw)?;
        writeln!(f)?;

        writeln!(f, "LCSR:LR                {}", self.link)?;
        for ctx in &self.exceptions {
            writeln!(f, "ECSR{0}:ELR{0}             {1}", ctx.level, ctx.link)?;
        }
        writeln!(f)?;
        for ctx in &self.exceptions {
            writeln!(f, "EPSW{}                  {:02X}", ctx.level, ctx.psw.raw())?;
        }
        writeln!(f)?;

        let stop = match self.context.stop_state {
            StopState::Running => "running",
            StopState::Armed { .. } => "armed",
            StopState::Stopped => "stopped",
        };
        let mode = match self.context.mode {
            ExecutionMode::SingleStep => "single-step",
            ExecutionMode::FreeRun => "free-run",
        };
        writeln!(f, "Stop mode              {stop}")?;
        writeln!(f, "Execution              {mode}")?;
        writeln!(f)?;
        match self.context.breakpoint {
            Some(breakpoint) => write!(f, "Breakpoint set to {}", breakpoint.location()),
            None => write!(f, "No breakpoint set."),
        }
    }
}
