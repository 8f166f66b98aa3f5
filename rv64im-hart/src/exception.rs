//! Architectural exceptions and the small enumerations that accompany trap delivery.

use thiserror::Error;

/// A synchronous architectural exception.
///
/// Each variant carries the trap value that is latched into `mtval`/`stval` on entry. Exceptions
/// are recovered locally by the trap machinery; they never escape [`crate::Hart::step`] or
/// [`crate::Hart::run`] as an `Err`.
///
/// > When a trap is taken into M-mode (or S-mode), `mcause` (or `scause`) is written with a code
/// > indicating the event that caused the trap.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Exception {
    #[error("instruction address misaligned: {0:#x}")]
    InstructionAddressMisaligned(u64),
    #[error("instruction access fault: {0:#x}")]
    InstructionAccessFault(u64),
    #[error("illegal instruction: {0:#x}")]
    IllegalInstruction(u64),
    #[error("breakpoint")]
    Breakpoint(u64),
    #[error("load address misaligned: {0:#x}")]
    LoadAddressMisaligned(u64),
    #[error("load access fault: {0:#x}")]
    LoadAccessFault(u64),
    #[error("store/AMO address misaligned: {0:#x}")]
    StoreOrAmoAddressMisaligned(u64),
    #[error("store/AMO access fault: {0:#x}")]
    StoreOrAmoAccessFault(u64),
    #[error("environment call from U-mode")]
    EnvironmentCallFromUMode,
    #[error("environment call from S-mode")]
    EnvironmentCallFromSMode,
    #[error("environment call from M-mode")]
    EnvironmentCallFromMMode,
    #[error("instruction page fault: {0:#x}")]
    InstructionPageFault(u64),
    #[error("load page fault: {0:#x}")]
    LoadPageFault(u64),
    #[error("store/AMO page fault: {0:#x}")]
    StoreOrAmoPageFault(u64),
}

impl Exception {
    /// Returns the exception code as it appears in the low bits of `mcause`/`scause`.
    pub fn code(&self) -> u64 {
        match self {
            Self::InstructionAddressMisaligned(_) => 0,
            Self::InstructionAccessFault(_) => 1,
            Self::IllegalInstruction(_) => 2,
            Self::Breakpoint(_) => 3,
            Self::LoadAddressMisaligned(_) => 4,
            Self::LoadAccessFault(_) => 5,
            Self::StoreOrAmoAddressMisaligned(_) => 6,
            Self::StoreOrAmoAccessFault(_) => 7,
            Self::EnvironmentCallFromUMode => 8,
            Self::EnvironmentCallFromSMode => 9,
            Self::EnvironmentCallFromMMode => 11,
            Self::InstructionPageFault(_) => 12,
            Self::LoadPageFault(_) => 13,
            Self::StoreOrAmoPageFault(_) => 15,
        }
    }

    /// Returns the value that should be latched into `mtval`/`stval` for this exception.
    pub fn trap_value(&self) -> u64 {
        match self {
            Self::InstructionAddressMisaligned(v)
            | Self::InstructionAccessFault(v)
            | Self::IllegalInstruction(v)
            | Self::Breakpoint(v)
            | Self::LoadAddressMisaligned(v)
            | Self::LoadAccessFault(v)
            | Self::StoreOrAmoAddressMisaligned(v)
            | Self::StoreOrAmoAccessFault(v)
            | Self::InstructionPageFault(v)
            | Self::LoadPageFault(v)
            | Self::StoreOrAmoPageFault(v) => *v,
            Self::EnvironmentCallFromUMode
            | Self::EnvironmentCallFromSMode
            | Self::EnvironmentCallFromMMode => 0,
        }
    }
}

/// Trap vector mode, decoded from the low 2 bits of `mtvec`/`stvec`.
///
/// > When `MODE=Direct`, all traps into the relevant privilege mode cause the pc to be set to the
/// > address in the BASE field. When `MODE=Vectored`, all synchronous exceptions into the relevant
/// > privilege mode cause the pc to be set to the address in the BASE field, whereas interrupts
/// > cause the pc to be set to the address in the BASE field plus four times the interrupt cause
/// > number.
///
/// This core only ever delivers synchronous exceptions, so `Vectored` behaves identically to
/// `Direct`: the base address is used unconditionally.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VectorMode {
    Direct,
    Vectored,
}

impl VectorMode {
    pub fn from_u2(value: u64) -> Option<Self> {
        match value & 0b11 {
            0 => Some(Self::Direct),
            1 => Some(Self::Vectored),
            _ => None,
        }
    }

    pub fn as_u2(self) -> u64 {
        match self {
            Self::Direct => 0,
            Self::Vectored => 1,
        }
    }
}

/// Address-translation mode, decoded from the top 4 bits of `satp`.
///
/// Only `Bare` is implemented: this core performs no page-table walking. All other modes are
/// accepted as encodings (so `satp` can report their existence) but are rejected on write with
/// [`crate::HartError::UnsupportedAddressTranslationMode`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AddressTranslationMode {
    Bare,
    Sv39,
    Sv48,
    Sv57,
    Sv64,
}

impl AddressTranslationMode {
    pub fn from_u4(value: u64) -> Option<Self> {
        match value & 0b1111 {
            0 => Some(Self::Bare),
            8 => Some(Self::Sv39),
            9 => Some(Self::Sv48),
            10 => Some(Self::Sv57),
            11 => Some(Self::Sv64),
            _ => None,
        }
    }

    pub fn as_u4(self) -> u64 {
        match self {
            Self::Bare => 0,
            Self::Sv39 => 8,
            Self::Sv48 => 9,
            Self::Sv57 => 10,
            Self::Sv64 => 11,
        }
    }
}
