use crate::decoder::{InstructionHead, Operand, SizeClass, INSTRUCTION_BUFFER_BYTES};
use crate::isa::ExecuteFn;

/// Per-step transient execution state.
///
/// Holds the raw fetched instruction bytes, the parsed head fields, and the
/// decode products (operands, dispatch opcode, execute callback). Reset at
/// every fetch and meaningless once the step completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionState {
    bytes: [u8; INSTRUCTION_BUFFER_BYTES],
    length: u8,
    head: InstructionHead,
    operands: [Operand; 2],
    opcode: u32,
    execute: Option<ExecuteFn>,
}

impl ExecutionState {
    /// Clears every field back to the post-reset state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Loads freshly fetched instruction bytes, clearing prior decode
    /// products. Callers guarantee `raw` fits the fetch buffer.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn load(&mut self, raw: &[u8]) {
        self.reset();
        let length = raw.len().min(INSTRUCTION_BUFFER_BYTES);
        self.bytes[..length].copy_from_slice(&raw[..length]);
        self.length = length as u8;
        self.head = InstructionHead::new(self.bytes[0]);
    }

    pub(crate) fn set_decoded(&mut self, operands: [Operand; 2], opcode: u32, execute: ExecuteFn) {
        self.operands = operands;
        self.opcode = opcode;
        self.execute = Some(execute);
    }

    /// Raw bytes of the current instruction, head included.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.length)]
    }

    /// Parsed head fields.
    #[must_use]
    pub const fn head(&self) -> InstructionHead {
        self.head
    }

    /// Declared opcode width class.
    #[must_use]
    pub const fn size_class(&self) -> SizeClass {
        self.head.size_class()
    }

    /// Both resolved operands; unused slots hold [`Operand::None`].
    #[must_use]
    pub const fn operands(&self) -> [Operand; 2] {
        self.operands
    }

    /// One resolved operand by position (0 or 1).
    #[must_use]
    pub fn operand(&self, index: usize) -> Operand {
        self.operands.get(index).copied().unwrap_or_default()
    }

    /// Dispatch opcode under the declared-width masking rule.
    #[must_use]
    pub const fn opcode(&self) -> u32 {
        self.opcode
    }

    /// Resolved execute callback, when decode succeeded.
    #[must_use]
    pub const fn execute(&self) -> Option<ExecuteFn> {
        self.execute
    }
}

#[cfg(test)]
mod tests {
    use super::ExecutionState;
    use crate::bus::Bus;
    use crate::cpu::Cpu;
    use crate::decoder::Operand;
    use crate::fault::Fault;

    #[allow(clippy::missing_const_for_fn)]
    fn nop(_cpu: &mut Cpu, _bus: &mut Bus) -> Result<(), Fault> {
        Ok(())
    }

    #[test]
    fn load_captures_bytes_and_head_fields() {
        let mut exec = ExecutionState::default();
        exec.load(&[0b00_011_011, 0x2A, 0x00, 0x01]);

        assert_eq!(exec.bytes(), &[0b00_011_011, 0x2A, 0x00, 0x01]);
        assert_eq!(exec.head().size_bits(), 0);
        assert_eq!(exec.head().addr1_bits(), 3);
        assert_eq!(exec.head().addr2_bits(), 3);
        assert!(exec.execute().is_none());
    }

    #[test]
    fn load_clears_prior_decode_products() {
        let mut exec = ExecutionState::default();
        exec.load(&[0x00; 6]);
        exec.set_decoded([Operand::Constant(1), Operand::None], 0x2A, nop);
        assert_eq!(exec.opcode(), 0x2A);
        assert!(exec.execute().is_some());

        exec.load(&[0xC0]);
        assert_eq!(exec.bytes(), &[0xC0]);
        assert_eq!(exec.operands(), [Operand::None, Operand::None]);
        assert_eq!(exec.opcode(), 0);
        assert!(exec.execute().is_none());
    }

    #[test]
    fn out_of_range_operand_index_reads_none() {
        let mut exec = ExecutionState::default();
        exec.load(&[0x00]);
        exec.set_decoded([Operand::Register(2), Operand::Constant(7)], 0, nop);
        assert_eq!(exec.operand(0), Operand::Register(2));
        assert_eq!(exec.operand(1), Operand::Constant(7));
        assert_eq!(exec.operand(2), Operand::None);
    }
}
