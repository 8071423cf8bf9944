use crate::fault::{Fault, FaultCode};

/// Number of general-purpose registers (`ra`..`rh`).
pub const GENERAL_REGISTER_COUNT: usize = 8;
/// Numeric register name selecting the stack pointer in operand encodings.
pub const STACK_POINTER_NAME: u8 = 9;

/// `FLAGS` bit for carry/borrow.
pub const FLAG_CARRY: u32 = 1 << 0;
/// `FLAGS` bit for zero result.
pub const FLAG_ZERO: u32 = 1 << 1;
/// `FLAGS` bit for negative result.
pub const FLAG_SIGN: u32 = 1 << 2;
/// `FLAGS` bit for signed overflow.
pub const FLAG_OVERFLOW: u32 = 1 << 3;
/// `FLAGS` bit enabling per-instruction debug traces.
pub const FLAG_DEBUG: u32 = 1 << 4;
/// `FLAGS` bit set by callbacks that repositioned `pc`; consumed once by the
/// control loop to suppress the trailing increment.
pub const FLAG_JUMP_PERFORMED: u32 = 1 << 5;

/// Architecturally visible general-purpose register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum GeneralRegister {
    Ra = 0,
    Rb = 1,
    Rc = 2,
    Rd = 3,
    Re = 4,
    Rf = 5,
    Rg = 6,
    Rh = 7,
}

impl GeneralRegister {
    /// Ordered list of all general-purpose registers.
    pub const ALL: [Self; GENERAL_REGISTER_COUNT] = [
        Self::Ra,
        Self::Rb,
        Self::Rc,
        Self::Rd,
        Self::Re,
        Self::Rf,
        Self::Rg,
        Self::Rh,
    ];

    /// Returns the array index for this register (`0..=7`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decodes a numeric register name into a general-purpose register.
    #[must_use]
    pub const fn from_name(name: u8) -> Option<Self> {
        match name {
            0 => Some(Self::Ra),
            1 => Some(Self::Rb),
            2 => Some(Self::Rc),
            3 => Some(Self::Rd),
            4 => Some(Self::Re),
            5 => Some(Self::Rf),
            6 => Some(Self::Rg),
            7 => Some(Self::Rh),
            _ => None,
        }
    }
}

/// Full architectural register state for one core.
///
/// `bp` is architecturally present but has no numeric name in operand
/// encodings; it is reachable only through the typed accessors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    gpr: [u32; GENERAL_REGISTER_COUNT],
    pc: u32,
    sp: u32,
    bp: u32,
    flags: u32,
}

impl RegisterFile {
    /// Reads a general-purpose register.
    #[must_use]
    pub const fn gpr(&self, reg: GeneralRegister) -> u32 {
        self.gpr[reg.index()]
    }

    /// Writes a general-purpose register.
    pub const fn set_gpr(&mut self, reg: GeneralRegister, value: u32) {
        self.gpr[reg.index()] = value;
    }

    /// Reads a register by its numeric operand-encoding name.
    ///
    /// Names `0..=7` select the general-purpose slots; name `9` selects the
    /// stack pointer.
    ///
    /// # Errors
    ///
    /// Returns an [`FaultCode::UnknownRegister`] fault carrying the offending
    /// name for any other value.
    pub const fn register(&self, name: u8) -> Result<u32, Fault> {
        if let Some(reg) = GeneralRegister::from_name(name) {
            return Ok(self.gpr(reg));
        }
        if name == STACK_POINTER_NAME {
            return Ok(self.sp);
        }
        Err(Fault::new(FaultCode::UnknownRegister, name as u32))
    }

    /// Writes a register by its numeric operand-encoding name.
    ///
    /// # Errors
    ///
    /// Same policy as [`RegisterFile::register`].
    pub const fn set_register(&mut self, name: u8, value: u32) -> Result<(), Fault> {
        if let Some(reg) = GeneralRegister::from_name(name) {
            self.set_gpr(reg, value);
            return Ok(());
        }
        if name == STACK_POINTER_NAME {
            self.sp = value;
            return Ok(());
        }
        Err(Fault::new(FaultCode::UnknownRegister, name as u32))
    }

    /// Reads the program counter.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Writes the program counter.
    pub const fn set_pc(&mut self, value: u32) {
        self.pc = value;
    }

    /// Reads the stack pointer.
    #[must_use]
    pub const fn sp(&self) -> u32 {
        self.sp
    }

    /// Writes the stack pointer.
    pub const fn set_sp(&mut self, value: u32) {
        self.sp = value;
    }

    /// Reads the base pointer.
    #[must_use]
    pub const fn bp(&self) -> u32 {
        self.bp
    }

    /// Writes the base pointer.
    pub const fn set_bp(&mut self, value: u32) {
        self.bp = value;
    }

    /// Reads the raw `FLAGS` word.
    #[must_use]
    pub const fn flags(&self) -> u32 {
        self.flags
    }

    /// Writes the raw `FLAGS` word.
    pub const fn set_flags(&mut self, value: u32) {
        self.flags = value;
    }

    /// Returns `true` when every bit of `flag` is set.
    #[must_use]
    pub const fn flag_is_set(&self, flag: u32) -> bool {
        (self.flags & flag) == flag && flag != 0
    }

    /// Sets or clears the bits of `flag`.
    pub const fn set_flag(&mut self, flag: u32, enabled: bool) {
        if enabled {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    /// Zeroes every register, including `FLAGS`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
