//! Core emulator crate for the CAT-32 virtual computer.
//!
//! Emulates a bespoke 32-bit von Neumann machine: a register file, a
//! variable-length bit-packed instruction format with eight addressing
//! modes, and a byte-granular 32-bit bus routing accesses to RAM and
//! peripheral windows. Opcode semantics live outside this crate behind the
//! [`InstructionSet`] capability; peripherals plug in behind [`BusTarget`].

/// Host-facing capability contracts (fault and trace sinks).
pub mod api;
pub use api::{FaultSink, RecordingFaultSink, TraceSink};

/// Address-space router and the bus-target seam.
pub mod bus;
pub use bus::{Bus, BusError, BusTarget};

/// Fetch-decode-execute pipeline and host control surface.
pub mod cpu;
pub use cpu::Cpu;

/// Instruction-format decoder and addressing-mode resolver.
pub mod decoder;
pub use decoder::{
    dispatch_opcode, instruction_length, resolve_operand, AddressingMode, InstructionHead,
    Operand, SizeClass, INSTRUCTION_BUFFER_BYTES, MODE_OPERAND_BYTES,
};

/// Fault taxonomy for fatal core and instruction-set conditions.
pub mod fault;
pub use fault::{Fault, FaultCode};

/// Pluggable instruction-set capability and registration table.
pub mod isa;
pub use isa::{ExecuteFn, InstructionSet, InstructionTable};

/// Fixed-capacity byte store for RAM windows.
pub mod memory;
pub use memory::Memory;

/// Architectural CPU state model primitives.
pub mod state;
pub use state::{
    ExecutionState, GeneralRegister, RegisterFile, RunState, FLAG_CARRY, FLAG_DEBUG,
    FLAG_JUMP_PERFORMED, FLAG_OVERFLOW, FLAG_SIGN, FLAG_ZERO, GENERAL_REGISTER_COUNT,
    STACK_POINTER_NAME,
};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
