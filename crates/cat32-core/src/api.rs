//! Host-facing capability contracts for embedding the core.

use crate::fault::Fault;

/// Host capability receiving structured fatal faults.
///
/// The core reports every fatal fault here immediately before latching the
/// halted state; the default host behavior is to retain the report.
pub trait FaultSink {
    /// Reports a fault stamped with the program counter it was observed at.
    fn raise(&mut self, fault: Fault);
}

/// Host capability receiving per-instruction traces.
///
/// Invoked at decode time with the post-fetch program counter and the raw
/// instruction bytes, but only while the debug flag is set.
pub trait TraceSink {
    /// Observes one fetched instruction.
    fn instruction(&mut self, pc: u32, bytes: &[u8]);
}

/// Default sink retaining the most recent fault for host inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordingFaultSink {
    last: Option<Fault>,
}

impl RecordingFaultSink {
    /// Creates a sink with no recorded fault.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// The most recently reported fault, if any.
    #[must_use]
    pub const fn last(&self) -> Option<Fault> {
        self.last
    }
}

impl FaultSink for RecordingFaultSink {
    fn raise(&mut self, fault: Fault) {
        self.last = Some(fault);
    }
}
