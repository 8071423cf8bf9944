//! Instruction-format decoder for the CAT-32 variable-length encoding.
//!
//! The head byte packs three fields, MSB to LSB: `size`(2) | `addr1`(3) |
//! `addr2`(3). The size field selects an opcode width of `2^size` bytes;
//! the reserved value 3 marks a head-only instruction with no opcode or
//! operand bytes. All multi-byte fields on the wire are little-endian.

use crate::fault::{Fault, FaultCode};
use crate::state::registers::RegisterFile;

/// Operand byte widths indexed by the 3-bit addressing mode.
pub const MODE_OPERAND_BYTES: [u8; 8] = [4, 4, 4, 1, 1, 5, 4, 0];

/// Capacity of the raw instruction fetch buffer in bytes.
pub const INSTRUCTION_BUFFER_BYTES: usize = 16;

/// Opcode width class declared by the 2-bit size field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum SizeClass {
    /// 1-byte opcode.
    Byte = 0,
    /// 2-byte opcode.
    Word = 1,
    /// 4-byte opcode.
    Dword = 2,
    /// Head-only instruction: no opcode or operand bytes follow the head.
    HeadOnly = 3,
}

impl SizeClass {
    /// Decodes the 2-bit size field. Total over `0..=3`.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Byte),
            1 => Some(Self::Word),
            2 => Some(Self::Dword),
            3 => Some(Self::HeadOnly),
            _ => None,
        }
    }

    /// Number of opcode bytes following the head.
    #[must_use]
    pub const fn opcode_bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Dword => 4,
            Self::HeadOnly => 0,
        }
    }
}

/// One of the eight operand addressing schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum AddressingMode {
    /// Immediate dword constant.
    Immediate = 0,
    /// Absolute dword address.
    Absolute = 1,
    /// `pc`-relative signed dword offset.
    PcRelative = 2,
    /// Direct register operand (value resolution deferred to the consumer).
    Register = 3,
    /// Address held in a register.
    RegisterIndirect = 4,
    /// Address held in a register plus a signed dword offset.
    RegisterIndirectOffset = 5,
    /// Base register plus index register scaled by an unsigned word factor.
    RegisterIndexed = 6,
    /// No operand.
    None = 7,
}

impl AddressingMode {
    /// Decodes a 3-bit mode field. Total over the masked field.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x7 {
            0 => Self::Immediate,
            1 => Self::Absolute,
            2 => Self::PcRelative,
            3 => Self::Register,
            4 => Self::RegisterIndirect,
            5 => Self::RegisterIndirectOffset,
            6 => Self::RegisterIndexed,
            _ => Self::None,
        }
    }

    /// Number of trailing bytes this mode consumes.
    #[must_use]
    pub const fn operand_bytes(self) -> u8 {
        MODE_OPERAND_BYTES[self as usize]
    }
}

/// Parsed view of the instruction head byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InstructionHead {
    raw: u8,
}

impl InstructionHead {
    /// Wraps a raw head byte.
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self { raw }
    }

    /// Raw head byte.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.raw
    }

    /// 2-bit size field, bits `[7:6]`.
    #[must_use]
    pub const fn size_bits(self) -> u8 {
        (self.raw >> 6) & 0x3
    }

    /// 3-bit first addressing-mode field, bits `[5:3]`.
    #[must_use]
    pub const fn addr1_bits(self) -> u8 {
        (self.raw >> 3) & 0x7
    }

    /// 3-bit second addressing-mode field, bits `[2:0]`.
    #[must_use]
    pub const fn addr2_bits(self) -> u8 {
        self.raw & 0x7
    }

    /// Declared opcode width class.
    #[must_use]
    pub const fn size_class(self) -> SizeClass {
        match SizeClass::from_bits(self.size_bits()) {
            Some(class) => class,
            // size_bits is masked to two bits; from_bits is total there.
            None => SizeClass::HeadOnly,
        }
    }

    /// First addressing mode.
    #[must_use]
    pub const fn addr1(self) -> AddressingMode {
        AddressingMode::from_bits(self.addr1_bits())
    }

    /// Second addressing mode.
    #[must_use]
    pub const fn addr2(self) -> AddressingMode {
        AddressingMode::from_bits(self.addr2_bits())
    }

    /// Returns `true` for head-only instructions (`size == 3`).
    #[must_use]
    pub const fn is_head_only(self) -> bool {
        self.size_bits() == 3
    }
}

/// Total instruction length in bytes for a head value.
///
/// Pure and total over all 256 head values. A result of 0 marks a head-only
/// instruction whose fetch consumes exactly the head byte.
#[must_use]
pub const fn instruction_length(head: u8) -> u8 {
    let head = InstructionHead::new(head);
    if head.is_head_only() {
        return 0;
    }
    1 + (1 << head.size_bits())
        + MODE_OPERAND_BYTES[head.addr1_bits() as usize]
        + MODE_OPERAND_BYTES[head.addr2_bits() as usize]
}

/// Operand resolved by the addressing resolver.
///
/// The decoder never interprets operand meaning beyond addressing; execute
/// callbacks consume these as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Operand {
    /// Direct register operand carrying the raw register name.
    Register(u8),
    /// Effective bus address.
    Address(u32),
    /// Immediate constant.
    Constant(u32),
    /// No operand.
    #[default]
    None,
}

fn truncation_fault(bytes: &[u8]) -> Fault {
    let available = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
    Fault::new(FaultCode::IllegalState, available)
}

fn read_u32_le(bytes: &[u8]) -> Result<u32, Fault> {
    let field: Result<[u8; 4], _> = bytes.get(..4).unwrap_or_default().try_into();
    field
        .map(u32::from_le_bytes)
        .map_err(|_| truncation_fault(bytes))
}

fn read_i32_le(bytes: &[u8]) -> Result<i32, Fault> {
    let field: Result<[u8; 4], _> = bytes.get(..4).unwrap_or_default().try_into();
    field
        .map(i32::from_le_bytes)
        .map_err(|_| truncation_fault(bytes))
}

fn read_u16_le(bytes: &[u8]) -> Result<u16, Fault> {
    let field: Result<[u8; 2], _> = bytes.get(..2).unwrap_or_default().try_into();
    field
        .map(u16::from_le_bytes)
        .map_err(|_| truncation_fault(bytes))
}

fn read_u8(bytes: &[u8]) -> Result<u8, Fault> {
    bytes
        .first()
        .copied()
        .ok_or_else(|| Fault::new(FaultCode::IllegalState, 0))
}

/// Resolves one operand from `bytes` (the instruction tail at the operand
/// cursor) under `mode`.
///
/// `pc` is the post-fetch program counter, already advanced past the whole
/// instruction; `pc`-relative addressing is anchored there. Register-indirect
/// modes read register contents eagerly; the direct register mode defers
/// value resolution to the consumer.
///
/// # Errors
///
/// Returns an [`FaultCode::UnknownRegister`] fault carrying the offending
/// name when an indirect mode names a register outside the map, and an
/// [`FaultCode::IllegalState`] fault when `bytes` is shorter than the mode's
/// declared width.
pub fn resolve_operand(
    mode: AddressingMode,
    bytes: &[u8],
    pc: u32,
    regs: &RegisterFile,
) -> Result<Operand, Fault> {
    match mode {
        AddressingMode::Immediate => Ok(Operand::Constant(read_u32_le(bytes)?)),
        AddressingMode::Absolute => Ok(Operand::Address(read_u32_le(bytes)?)),
        AddressingMode::PcRelative => {
            let offset = read_i32_le(bytes)?;
            Ok(Operand::Address(pc.wrapping_add_signed(offset)))
        }
        AddressingMode::Register => Ok(Operand::Register(read_u8(bytes)?)),
        AddressingMode::RegisterIndirect => {
            let base = regs.register(read_u8(bytes)?)?;
            Ok(Operand::Address(base))
        }
        AddressingMode::RegisterIndirectOffset => {
            let base = regs.register(read_u8(bytes)?)?;
            let offset = read_i32_le(bytes.get(1..).unwrap_or_default())?;
            Ok(Operand::Address(base.wrapping_add_signed(offset)))
        }
        AddressingMode::RegisterIndexed => {
            let base = regs.register(read_u8(bytes)?)?;
            let index = regs.register(read_u8(bytes.get(1..).unwrap_or_default())?)?;
            let factor = read_u16_le(bytes.get(2..).unwrap_or_default())?;
            Ok(Operand::Address(
                base.wrapping_add(index.wrapping_mul(u32::from(factor))),
            ))
        }
        AddressingMode::None => Ok(Operand::None),
    }
}

/// Dispatch opcode under the documented masking rule: the `2^size` declared
/// opcode bytes, little-endian, zero-extended to 32 bits.
///
/// Head-only instructions have no opcode field; their dispatch key is the
/// six remaining head bits, see [`crate::Cpu`].
///
/// # Errors
///
/// Returns an [`FaultCode::IllegalState`] fault when `bytes` is shorter than
/// the declared opcode width.
pub fn dispatch_opcode(size: SizeClass, bytes: &[u8]) -> Result<u32, Fault> {
    match size {
        SizeClass::Byte => Ok(u32::from(read_u8(bytes)?)),
        SizeClass::Word => Ok(u32::from(read_u16_le(bytes)?)),
        SizeClass::Dword => read_u32_le(bytes),
        SizeClass::HeadOnly => Ok(0),
    }
}
