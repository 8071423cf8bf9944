//! Architectural CPU state model primitives.

/// Per-step transient execution state.
pub mod execution;
/// Architectural register file, numeric register naming, and flag bits.
pub mod registers;
/// Control-loop state machine.
pub mod run_state;

pub use execution::ExecutionState;
pub use registers::{
    GeneralRegister, RegisterFile, FLAG_CARRY, FLAG_DEBUG, FLAG_JUMP_PERFORMED, FLAG_OVERFLOW,
    FLAG_SIGN, FLAG_ZERO, GENERAL_REGISTER_COUNT, STACK_POINTER_NAME,
};
pub use run_state::RunState;
