//! Fetch/decode/execute core for a single RV64IM hart with the Zicsr extension and a subset of
//! the privileged architecture (machine and supervisor modes, trap delegation).
//!
//! This crate deliberately stops at the boundary of the hart itself. Loading a program image,
//! parsing ELF files, and wiring up a CLI or debugger are the responsibility of a collaborator;
//! this crate only needs a contiguous, mutable byte buffer and an initial program counter.
//!
//! > A component is termed a core if it contains an independent instruction fetch unit. A
//! > RISC-V-compatible core might support multiple RISC-V-compatible hardware threads, or harts,
//! > through multithreading.

#[macro_use]
extern crate static_assertions;

mod bits;
pub mod config;
pub mod cs_registers;
pub mod csr;
pub mod error;
pub mod exception;
mod execute;
pub mod hart;
pub mod instruction;
mod memory;
pub mod privilege;
pub mod registers;

pub use config::Config;
pub use error::HartError;
pub use exception::{AddressTranslationMode, Exception, VectorMode};
pub use hart::Hart;
pub use privilege::{PrivilegeLevel, RawPrivilegeLevel, ReservedPrivilegeLevelError};
