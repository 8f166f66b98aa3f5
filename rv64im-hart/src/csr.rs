//! Control-and-Status Register address space: the recognized subset and its permission encoding.
//!
//! > By convention, the upper 4 bits of the CSR address (csr\[11:8]) are used to encode the read
//! > and write accessibility of the CSRs according to privilege level. The top two bits
//! > (csr\[11:10]) indicate whether the register is read/write (00, 01, or 10) or read-only (11).
//! > The next two bits (csr\[9:8]) encode the lowest privilege level that can access the CSR.

use crate::privilege::RawPrivilegeLevel;

/// General 12-bit value representing a CSR specifier. May hold any 12-bit value, even one that
/// does not name a recognized register.
pub type CsrSpecifier = u16;

//
// Supervisor trap setup/handling/translation.
//
pub const STVEC: CsrSpecifier = 0x105;
pub const SEPC: CsrSpecifier = 0x141;
pub const SCAUSE: CsrSpecifier = 0x142;
pub const STVAL: CsrSpecifier = 0x143;
pub const SATP: CsrSpecifier = 0x180;

//
// Machine information registers.
//
pub const MHARTID: CsrSpecifier = 0xF14;

//
// Machine trap setup.
//
pub const MSTATUS: CsrSpecifier = 0x300;
pub const MEDELEG: CsrSpecifier = 0x302;
pub const MIDELEG: CsrSpecifier = 0x303;
pub const MIE: CsrSpecifier = 0x304;
pub const MTVEC: CsrSpecifier = 0x305;

//
// Machine trap handling.
//
pub const MEPC: CsrSpecifier = 0x341;
pub const MCAUSE: CsrSpecifier = 0x342;
pub const MTVAL: CsrSpecifier = 0x343;
pub const MIP: CsrSpecifier = 0x344;

//
// Machine memory protection. Represented as a range predicate rather than 72 literal constants
// (8 `pmpcfg*` at even indices, 64 `pmpaddr*`): the only requirement on this address class is
// "read as 0, discard writes."
//
pub const PMPCFG_BASE: CsrSpecifier = 0x3A0;
pub const PMPCFG_COUNT: CsrSpecifier = 8;
pub const PMPADDR_BASE: CsrSpecifier = 0x3B0;
pub const PMPADDR_COUNT: CsrSpecifier = 64;

/// Returns `true` if `specifier` names one of the even-indexed `pmpcfg0..=pmpcfg14` registers.
fn is_pmpcfg(specifier: CsrSpecifier) -> bool {
    specifier >= PMPCFG_BASE
        && specifier < PMPCFG_BASE + PMPCFG_COUNT * 2
        && (specifier - PMPCFG_BASE) % 2 == 0
}

/// Returns `true` if `specifier` names one of `pmpaddr0..=pmpaddr63`.
fn is_pmpaddr(specifier: CsrSpecifier) -> bool {
    specifier >= PMPADDR_BASE && specifier < PMPADDR_BASE + PMPADDR_COUNT
}

/// Returns `true` if `specifier` names any CSR this core recognizes.
pub fn is_valid(specifier: CsrSpecifier) -> bool {
    matches!(
        specifier,
        STVEC | SEPC | SCAUSE | STVAL | SATP | MHARTID | MSTATUS | MEDELEG | MIDELEG | MIE
            | MTVEC | MEPC | MCAUSE | MTVAL | MIP
    ) || is_pmpcfg(specifier)
        || is_pmpaddr(specifier)
}

/// Returns `true` if this CSR only supports read access.
///
/// Requires [`is_valid(specifier)`](is_valid); otherwise the return value is meaningless.
pub fn is_read_only(specifier: CsrSpecifier) -> bool {
    specifier >> 10 == 0b11
}

/// Returns the minimum required privilege level to access this CSR.
///
/// Requires [`is_valid(specifier)`](is_valid); otherwise the return value is meaningless.
///
/// Returns a [`RawPrivilegeLevel`] since the encoded minimum may legally be the reserved level,
/// which simply means no privilege level implemented by this core can access the register.
pub fn required_privilege_level(specifier: CsrSpecifier) -> RawPrivilegeLevel {
    RawPrivilegeLevel::from_u2(((specifier >> 8) & 0b11) as u8)
}
