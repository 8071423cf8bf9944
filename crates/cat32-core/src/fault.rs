use thiserror::Error;

/// Stable fault taxonomy shared by the core pipeline and instruction-set
/// callbacks.
///
/// The first five codes are raised by the core itself; `IllegalOperand` and
/// `DivideByZero` are reserved for execute callbacks reporting through the
/// same channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// Dispatch found no execute callback for the decoded opcode.
    #[error("unknown instruction")]
    UnknownInstruction = 0x01,
    /// A register name fell outside the architectural register map.
    #[error("unknown register name")]
    UnknownRegister = 0x02,
    /// The declared instruction length exceeds the fetch buffer.
    #[error("instruction length exceeds fetch buffer")]
    InstructionTooLong = 0x03,
    /// The core reached a state it cannot continue from (for example a bus
    /// failure on the fetch path).
    #[error("illegal core state")]
    IllegalState = 0x04,
    /// Dispatch was attempted with no instruction set attached to the core.
    #[error("no instruction set attached")]
    NoInstructionSet = 0x05,
    /// An execute callback rejected one of its resolved operands.
    #[error("illegal operand")]
    IllegalOperand = 0x06,
    /// An execute callback attempted a division by zero.
    #[error("divide by zero")]
    DivideByZero = 0x07,
}

impl FaultCode {
    /// Converts a fault code to its stable low-byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable low-byte value back into a fault code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::UnknownInstruction),
            0x02 => Some(Self::UnknownRegister),
            0x03 => Some(Self::InstructionTooLong),
            0x04 => Some(Self::IllegalState),
            0x05 => Some(Self::NoInstructionSet),
            0x06 => Some(Self::IllegalOperand),
            0x07 => Some(Self::DivideByZero),
            _ => None,
        }
    }

    /// Returns `true` for codes raised by the core pipeline itself rather
    /// than by instruction-set callbacks.
    #[must_use]
    pub const fn is_core_raised(self) -> bool {
        !matches!(self, Self::IllegalOperand | Self::DivideByZero)
    }
}

/// Structured fault record: taxonomy code plus context data.
///
/// `detail` carries the code-specific datum (offending register name,
/// declared length, missed opcode). `pc` is stamped by the core at report
/// time with the program counter the fault was observed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[error("{code} (detail {detail:#010x}, pc {pc:#010x})")]
pub struct Fault {
    /// Taxonomy code.
    pub code: FaultCode,
    /// Code-specific context datum.
    pub detail: u32,
    /// Program counter at report time.
    pub pc: u32,
}

impl Fault {
    /// Creates a fault with a context datum and an unstamped `pc`.
    #[must_use]
    pub const fn new(code: FaultCode, detail: u32) -> Self {
        Self {
            code,
            detail,
            pc: 0,
        }
    }

    /// Returns this fault stamped with the reporting program counter.
    #[must_use]
    pub const fn at(self, pc: u32) -> Self {
        Self {
            code: self.code,
            detail: self.detail,
            pc,
        }
    }
}
