//! Fetch-decode-execute pipeline and host control surface.

use std::fmt::Write as _;

use crate::api::{FaultSink, TraceSink};
use crate::bus::Bus;
use crate::decoder::{
    dispatch_opcode, instruction_length, resolve_operand, AddressingMode, Operand,
    INSTRUCTION_BUFFER_BYTES,
};
use crate::fault::{Fault, FaultCode};
use crate::isa::InstructionSet;
use crate::state::execution::ExecutionState;
use crate::state::registers::{GeneralRegister, RegisterFile, FLAG_DEBUG, FLAG_JUMP_PERFORMED};
use crate::state::run_state::RunState;

/// Dispatch-key mask for head-only instructions: the six head bits left
/// over once the size field is fixed at 3.
const HEAD_ONLY_OPCODE_MASK: u8 = 0x3F;

/// One emulated CAT-32 core.
///
/// The core exclusively owns its register file and per-step execution
/// state; the bus is threaded through every operation so independent cores
/// can run against isolated address spaces.
#[derive(Default)]
pub struct Cpu {
    regs: RegisterFile,
    exec: ExecutionState,
    run_state: RunState,
    isa: Option<Box<dyn InstructionSet>>,
    fault_sink: Option<Box<dyn FaultSink>>,
    trace_sink: Option<Box<dyn TraceSink>>,
}

impl Cpu {
    /// Creates a core in the `Running` state with zeroed registers and no
    /// instruction set attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the instruction-set capability used by dispatch.
    pub fn set_instruction_set(&mut self, isa: Box<dyn InstructionSet>) {
        self.isa = Some(isa);
    }

    /// Attaches the host fault sink.
    pub fn set_fault_sink(&mut self, sink: Box<dyn FaultSink>) {
        self.fault_sink = Some(sink);
    }

    /// Attaches the host trace sink consulted while the debug flag is set.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.trace_sink = Some(sink);
    }

    /// Architectural register file.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Mutable architectural register file.
    pub const fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    /// Per-step execution state (raw bytes, head fields, operands).
    #[must_use]
    pub const fn execution(&self) -> &ExecutionState {
        &self.exec
    }

    /// Current control-loop state.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Returns `true` once the core has latched the halted state.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.run_state.is_halted()
    }

    /// The fault that halted the core, when one did.
    #[must_use]
    pub const fn latched_fault(&self) -> Option<Fault> {
        self.run_state.latched_fault()
    }

    /// Halts the core without a fault (halt instruction or host request).
    pub const fn halt(&mut self) {
        self.run_state = RunState::Halted(None);
    }

    /// Zeroes all registers and execution state and resumes `Running`.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.exec.reset();
        self.run_state = RunState::Running;
    }

    /// Reads a register by its numeric operand-encoding name.
    ///
    /// # Errors
    ///
    /// Returns an [`FaultCode::UnknownRegister`] fault for names outside the
    /// architectural map.
    pub const fn register(&self, name: u8) -> Result<u32, Fault> {
        self.regs.register(name)
    }

    /// Writes a register by its numeric operand-encoding name.
    ///
    /// # Errors
    ///
    /// Same policy as [`Cpu::register`].
    pub const fn set_register(&mut self, name: u8, value: u32) -> Result<(), Fault> {
        self.regs.set_register(name, value)
    }

    /// Returns `true` when every bit of `flag` is set in `FLAGS`.
    #[must_use]
    pub const fn flag_is_set(&self, flag: u32) -> bool {
        self.regs.flag_is_set(flag)
    }

    /// Sets or clears the bits of `flag` in `FLAGS`.
    pub const fn set_flag(&mut self, flag: u32, enabled: bool) {
        self.regs.set_flag(flag, enabled);
    }

    /// Executes one fetch-decode-execute step.
    ///
    /// A no-op once halted. Any fetch- or decode-time fault, and any fault
    /// returned by the execute callback, halts the core and reports through
    /// the fault sink; a missing callback is itself an
    /// [`FaultCode::UnknownInstruction`] fault, never a silent no-op.
    pub fn step(&mut self, bus: &mut Bus) {
        if self.is_halted() {
            return;
        }

        if let Err(fault) = self.fetch(bus).and_then(|()| self.decode()) {
            self.fault(fault);
            return;
        }

        let Some(execute) = self.exec.execute() else {
            self.fault(Fault::new(
                FaultCode::UnknownInstruction,
                self.exec.opcode(),
            ));
            return;
        };

        if let Err(fault) = execute(self, bus) {
            self.fault(fault);
        }
    }

    /// Runs the control loop until the core halts.
    ///
    /// After each step the jump-performed flag is consumed: when set it is
    /// cleared and the trailing increment skipped; otherwise `pc` advances
    /// by exactly one on top of the fetch advance. The trailing increment is
    /// the architecture's inter-instruction padding byte and applies under
    /// `start()` only; hosts stepping incrementally own `pc` themselves.
    pub fn start(&mut self, bus: &mut Bus) {
        while !self.is_halted() {
            self.step(bus);
            if self.regs.flag_is_set(FLAG_JUMP_PERFORMED) {
                self.regs.set_flag(FLAG_JUMP_PERFORMED, false);
            } else {
                let pc = self.regs.pc();
                self.regs.set_pc(pc.wrapping_add(1));
            }
        }
    }

    /// Reads the head byte at `pc`, sizes the instruction, and pulls the
    /// full frame into the execution buffer, advancing `pc` past it.
    fn fetch(&mut self, bus: &mut Bus) -> Result<(), Fault> {
        self.exec.reset();
        let pc = self.regs.pc();

        let head = bus
            .read_u8(pc)
            .map_err(|_| Fault::new(FaultCode::IllegalState, pc))?;
        let length = instruction_length(head);

        // Head-only instruction: consume exactly the head byte.
        if length == 0 {
            self.exec.load(&[head]);
            self.regs.set_pc(pc.wrapping_add(1));
            return Ok(());
        }

        let span = usize::from(length);
        if span > INSTRUCTION_BUFFER_BYTES {
            return Err(Fault::new(FaultCode::InstructionTooLong, u32::from(length)));
        }

        let mut frame = [0u8; INSTRUCTION_BUFFER_BYTES];
        bus.read(pc, &mut frame[..span])
            .map_err(|_| Fault::new(FaultCode::IllegalState, pc))?;
        self.exec.load(&frame[..span]);
        self.regs.set_pc(pc.wrapping_add(u32::from(length)));
        Ok(())
    }

    /// Resolves operands and the execute callback for the fetched frame.
    fn decode(&mut self) -> Result<(), Fault> {
        if self.regs.flag_is_set(FLAG_DEBUG) {
            let pc = self.regs.pc();
            if let Some(sink) = self.trace_sink.as_mut() {
                sink.instruction(pc, self.exec.bytes());
            }
        }

        let head = self.exec.head();
        let size = head.size_class();
        let mut operands = [Operand::None; 2];

        let opcode = if head.is_head_only() {
            u32::from(head.raw() & HEAD_ONLY_OPCODE_MASK)
        } else {
            let bytes = self.exec.bytes();
            let pc = self.regs.pc();
            let opcode = dispatch_opcode(size, bytes.get(1..).unwrap_or_default())?;

            // Operands trail the opcode field, first then second.
            let mut cursor = 1 + size.opcode_bytes();
            for (slot, mode) in operands.iter_mut().zip([head.addr1(), head.addr2()]) {
                if mode == AddressingMode::None {
                    continue;
                }
                let tail = bytes.get(cursor..).unwrap_or_default();
                *slot = resolve_operand(mode, tail, pc, &self.regs)?;
                cursor += usize::from(mode.operand_bytes());
            }
            opcode
        };

        let isa = self
            .isa
            .as_deref()
            .ok_or_else(|| Fault::new(FaultCode::NoInstructionSet, 0))?;
        let execute = isa
            .lookup(size, opcode)
            .ok_or_else(|| Fault::new(FaultCode::UnknownInstruction, opcode))?;

        self.exec.set_decoded(operands, opcode, execute);
        Ok(())
    }

    /// Reports a fault through the sink and latches the halted state.
    fn fault(&mut self, fault: Fault) {
        let fault = fault.at(self.regs.pc());
        if let Some(sink) = self.fault_sink.as_mut() {
            sink.raise(fault);
        }
        self.run_state = RunState::Halted(Some(fault));
    }

    /// Renders a human-readable diagnostic block of the full core state.
    #[must_use]
    pub fn dump_state(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=-= CPU STATE =-=");
        let _ = writeln!(out, "halted: {}", self.is_halted());
        let _ = writeln!(out, "general purpose registers:");
        for (reg, name) in GeneralRegister::ALL.into_iter().zip("abcdefgh".chars()) {
            let value = self.regs.gpr(reg);
            let _ = writeln!(out, "  $r{name} = {value:#010x}");
        }
        let _ = writeln!(out, "special registers:");
        let _ = writeln!(out, "  $pc = {:#010x}", self.regs.pc());
        let _ = writeln!(out, "  $sp = {:#010x}", self.regs.sp());
        let _ = writeln!(out, "  $bp = {:#010x}", self.regs.bp());
        let _ = writeln!(out, "  $flags = {:#010x}", self.regs.flags());
        let _ = write!(out, "instruction:");
        for byte in self.exec.bytes() {
            let _ = write!(out, " {byte:02x}");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "operands:");
        for (index, operand) in self.exec.operands().iter().enumerate() {
            let _ = writeln!(out, "  {}: {operand:?}", index + 1);
        }
        let _ = writeln!(out, "=-= END OF CPU STATE =-=");
        out
    }
}
