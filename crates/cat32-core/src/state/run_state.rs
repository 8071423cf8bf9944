use crate::fault::Fault;

/// Control-loop state machine for one core.
///
/// `Halted` is terminal until an explicit reset; it carries the fault that
/// forced the halt when one did (a plain halt instruction or host request
/// latches no fault).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to fetch the next instruction.
    #[default]
    Running,
    /// No further fetch/decode/execute happens until reset.
    Halted(Option<Fault>),
}

impl RunState {
    /// Returns `true` for either halted variant.
    #[must_use]
    pub const fn is_halted(self) -> bool {
        matches!(self, Self::Halted(_))
    }

    /// Returns the latched fault, if this state was reached through one.
    #[must_use]
    pub const fn latched_fault(self) -> Option<Fault> {
        match self {
            Self::Halted(fault) => fault,
            Self::Running => None,
        }
    }
}
