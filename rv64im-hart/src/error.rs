//! Host-level failures: conditions the hart cannot recover from by itself.
//!
//! Unlike [`crate::Exception`], these terminate [`crate::Hart::run`]/[`crate::Hart::step`] and are
//! reported to the caller rather than handled by the trap machinery.

use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum HartError {
    #[error("fetch or memory access at {address:#x} (width {width}) is out of bounds")]
    ExecutionOutOfBounds { address: u64, width: u8 },
    #[error("unimplemented opcode in instruction {0:#010x}")]
    UnimplementedOpcode(u32),
    #[error("invalid CSR specifier {0:#05x}")]
    InvalidCsr(u16),
    #[error("invalid privilege level encoding {0}")]
    InvalidPrivilegeLevel(u8),
    #[error("invalid context status encoding {0}")]
    InvalidContextStatus(u8),
    #[error("invalid vector mode encoding {0}")]
    InvalidVectorMode(u8),
    #[error("invalid address translation mode encoding {0}")]
    InvalidAddressTranslationMode(u8),
    #[error("unsupported address translation mode {0}")]
    UnsupportedAddressTranslationMode(u8),
    #[error("EBREAK encountered at {0:#x}")]
    EBreak(u64),
}
