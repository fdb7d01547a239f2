//! The register VM: a single dispatch loop over a `Program`'s
//! instruction stream, executing straight-line bytecode against typed
//! register banks and returning one terminating scalar or column.

mod dispatch;
pub mod sandbox;

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, trace};

use crate::context::{CancelReason, Context, NeverCancel};
use crate::error::DasmError;
use crate::frame::Frame;
use crate::loader::{FrameLoader, NoLoader};
use crate::program::Program;
use crate::registers::RegisterFile;
use crate::series::Column;
use crate::stats::Stats;

use self::sandbox::Sandbox;

/// The value a terminating `HALT*` instruction returns, per the
/// HALT/HALT_F/HALT_V variant that ran.
#[derive(Clone, Debug, PartialEq)]
pub enum ReturnValue {
    Int(i64),
    Float(f64),
    Column(Column),
}

pub(crate) enum StepOutcome {
    Continue,
    Halt(ReturnValue),
}

pub struct Vm {
    regs: RegisterFile,
    program: Option<Program>,
    ip: usize,
    step: u64,
    max_steps: u64,
    memory_limit: u64,
    memory_used: u64,
    sandbox: Sandbox,
    context: Box<dyn Context>,
    stats: Option<Stats>,
    predeclared: HashMap<String, Frame>,
    loader: Box<dyn FrameLoader>,
}

impl Vm {
    pub fn new() -> Vm {
        Vm {
            regs: RegisterFile::new(),
            program: None,
            ip: 0,
            step: 0,
            max_steps: 0,
            memory_limit: 0,
            memory_used: 0,
            sandbox: Sandbox::disabled(),
            context: Box::new(NeverCancel),
            stats: None,
            predeclared: HashMap::new(),
            loader: Box::new(NoLoader),
        }
    }

    pub fn set_predeclared_frames(&mut self, frames: HashMap<String, Frame>) {
        self.predeclared = frames;
    }

    pub fn set_loader(&mut self, loader: Box<dyn FrameLoader>) {
        self.loader = loader;
    }

    pub fn set_max_steps(&mut self, n: u64) {
        self.max_steps = n;
    }

    pub fn set_memory_limit(&mut self, bytes: u64) {
        self.memory_limit = bytes;
    }

    pub fn set_sandbox(&mut self, enabled: bool, allowed_paths: Vec<String>) {
        self.sandbox = if enabled { Sandbox::enabled(allowed_paths) } else { Sandbox::disabled() };
    }

    pub fn set_context(&mut self, context: Box<dyn Context>) {
        self.context = context;
    }

    pub fn enable_stats(&mut self) {
        self.stats = Some(Stats::default());
    }

    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    /// Loads a program and resets all mutable VM state (registers, frame
    /// table, group-by table, program counter, step counter).
    pub fn load(&mut self, program: Program) {
        self.regs = RegisterFile::new();
        self.ip = 0;
        self.step = 0;
        self.memory_used = 0;
        if let Some(stats) = &mut self.stats {
            *stats = Stats::default();
        }
        self.program = Some(program);
    }

    fn account_column(&mut self, column: &Column) -> Result<(), DasmError> {
        let bytes = estimate_column_bytes(column);
        self.memory_used = self.memory_used.saturating_add(bytes);
        if self.memory_limit > 0 && self.memory_used > self.memory_limit {
            return Err(DasmError::MemoryLimit);
        }
        Ok(())
    }

    pub fn execute(&mut self) -> Result<ReturnValue, DasmError> {
        let start = Instant::now();
        let result = self.run_loop();
        if let Some(stats) = &mut self.stats {
            stats.elapsed = start.elapsed();
        }
        result
    }

    fn run_loop(&mut self) -> Result<ReturnValue, DasmError> {
        loop {
            if let Some(reason) = self.context.check() {
                return Err(DasmError::from(reason));
            }

            let code_len = self.program.as_ref().map_or(0, |p| p.code.len());
            if self.ip >= code_len {
                return Err(DasmError::NoHalt);
            }

            self.step += 1;
            if self.max_steps > 0 && self.step > self.max_steps {
                return Err(DasmError::InstructionLimit);
            }

            let instr = self.program.as_ref().unwrap().code[self.ip];
            let op = instr.opcode().ok_or(DasmError::InvalidInstruction)?;

            if let Some(stats) = &mut self.stats {
                stats.record_opcode(op);
                stats.steps = self.step;
            }
            trace!(step = self.step, ip = self.ip, opcode = op.name(), "dispatch");

            match dispatch::execute_one(self, op, instr)? {
                StepOutcome::Continue => self.ip += 1,
                StepOutcome::Halt(value) => {
                    debug!(step = self.step, "halted");
                    return Ok(value);
                }
            }
        }
    }
}

impl Default for Vm {
    fn default() -> Vm {
        Vm::new()
    }
}

fn estimate_column_bytes(column: &Column) -> u64 {
    use crate::series::ColumnData;
    let per_cell = match column.data() {
        ColumnData::Int64(_) => 8,
        ColumnData::Float64(_) => 8,
        ColumnData::Bool(_) => 1,
        ColumnData::Str(v) => {
            return v.iter().map(|s| s.as_ref().map_or(0, |s| s.len() as u64) + 24).sum();
        }
    };
    column.length() as u64 * per_cell
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::AlreadyCanceled;
    use crate::instruction::{encode_plain, Instruction};
    use crate::opcode::Opcode;
    use crate::program::Program;

    fn program(instrs: Vec<Instruction>) -> Program {
        Program { code: instrs, constants: Vec::new(), float_constants: Vec::new() }
    }

    #[test]
    fn program_without_halt_fails() {
        let mut vm = Vm::new();
        vm.load(program(vec![encode_plain(Opcode::Nop, 0, 0, 0, 0)]));
        assert_eq!(vm.execute(), Err(DasmError::NoHalt));
    }

    #[test]
    fn canceled_before_first_step_returns_immediately() {
        let mut vm = Vm::new();
        vm.set_context(Box::new(AlreadyCanceled(CancelReason::Canceled)));
        vm.load(program(vec![encode_plain(Opcode::Halt, 0, 0, 0, 0)]));
        assert_eq!(vm.execute(), Err(DasmError::Canceled));
    }

    #[test]
    fn instruction_limit_is_reachable_at_exactly_max_steps() {
        let mut vm = Vm::new();
        vm.set_max_steps(2);
        vm.load(program(vec![
            encode_plain(Opcode::Nop, 0, 0, 0, 0),
            encode_plain(Opcode::Halt, 0, 0, 0, 0),
        ]));
        assert_eq!(vm.execute(), Ok(ReturnValue::Int(0)));
    }

    #[test]
    fn one_more_step_than_max_fails() {
        let mut vm = Vm::new();
        vm.set_max_steps(1);
        vm.load(program(vec![
            encode_plain(Opcode::Nop, 0, 0, 0, 0),
            encode_plain(Opcode::Halt, 0, 0, 0, 0),
        ]));
        assert_eq!(vm.execute(), Err(DasmError::InstructionLimit));
    }
}
