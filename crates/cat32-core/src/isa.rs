//! Pluggable instruction-set capability consumed by the dispatch stage.
//!
//! The core never interprets opcode semantics; it resolves an execute
//! callback here and invokes it with exclusive access to the CPU and its
//! bus. Multiple instruction sets can coexist without recompilation
//! coupling by implementing [`InstructionSet`].

use std::collections::HashMap;

use crate::bus::Bus;
use crate::cpu::Cpu;
use crate::decoder::SizeClass;
use crate::fault::Fault;

/// Execute callback invoked once per retired instruction.
///
/// The callback may mutate registers and the bus, set flags (including
/// jump-performed when it repositions `pc`), and halt the core. Returning a
/// fault halts the core and reports through the fault sink.
pub type ExecuteFn = fn(&mut Cpu, &mut Bus) -> Result<(), Fault>;

/// Opcode-to-callback lookup capability.
pub trait InstructionSet {
    /// Returns the execute callback assigned to `(size, opcode)`, if any.
    fn lookup(&self, size: SizeClass, opcode: u32) -> Option<ExecuteFn>;
}

/// Table-backed instruction set with an explicit registration API.
#[derive(Default)]
pub struct InstructionTable {
    entries: HashMap<(SizeClass, u32), ExecuteFn>,
}

impl InstructionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `execute` to `(size, opcode)`, returning any callback it
    /// replaced.
    pub fn register(
        &mut self,
        size: SizeClass,
        opcode: u32,
        execute: ExecuteFn,
    ) -> Option<ExecuteFn> {
        self.entries.insert((size, opcode), execute)
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl InstructionSet for InstructionTable {
    fn lookup(&self, size: SizeClass, opcode: u32) -> Option<ExecuteFn> {
        self.entries.get(&(size, opcode)).copied()
    }
}
