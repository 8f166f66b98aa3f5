//! Privilege levels of the RISC-V privileged architecture.

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// List of all possible privilege levels for RISC-V.
///
/// Same as [`PrivilegeLevel`] except that it allows specifying the reserved privilege level `2`.
/// This is useful whenever a minimum required privilege level is read out of a 2-bit field (such
/// as the minimum-privilege bits of a CSR address), since that field may legally hold the
/// reserved value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum RawPrivilegeLevel {
    User = 0,
    Supervisor = 1,
    /// Privilege level `0b10` is reserved in the base ISA. When using the hypervisor extension,
    /// this becomes the Hypervisor privilege level, which this core does not implement.
    Reserved = 2,
    Machine = 3,
}

impl RawPrivilegeLevel {
    /// Converts a 2-bit value into a [`RawPrivilegeLevel`].
    ///
    /// # Panics
    ///
    /// Panics if the value doesn't fit in 2 bits (`0..=3`).
    pub fn from_u2(value_u2: u8) -> Self {
        match value_u2 {
            0 => Self::User,
            1 => Self::Supervisor,
            2 => Self::Reserved,
            3 => Self::Machine,
            _ => panic!("out of range u2 used"),
        }
    }

    pub fn is_reserved(self) -> bool {
        matches!(self, Self::Reserved)
    }
}

impl fmt::Display for RawPrivilegeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            RawPrivilegeLevel::User => "U",
            RawPrivilegeLevel::Supervisor => "S",
            RawPrivilegeLevel::Reserved => "2",
            RawPrivilegeLevel::Machine => "M",
        })
    }
}

/// The three privilege levels this core implements.
///
/// > The machine level has the highest privileges and is the only mandatory privilege level for a
/// > RISC-V hardware platform. Code run in machine-mode (M-mode) is usually inherently trusted, as
/// > it has low-level access to the machine implementation. User-mode (U-mode) and supervisor-mode
/// > (S-mode) are intended for conventional application and operating system usage respectively.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Default)]
pub enum PrivilegeLevel {
    /// User/application (abbreviated `U`) is the lowest privilege level.
    #[default]
    User = 0,
    /// Supervisor (abbreviated `S`) is an intermediate privilege level, intended for the OS.
    Supervisor = 1,
    // Level 2 is reserved.
    /// Machine (abbreviated `M`) is the highest privilege level, and the only one a hart is
    /// guaranteed to support.
    Machine = 3,
}

impl PartialEq<PrivilegeLevel> for RawPrivilegeLevel {
    fn eq(&self, other: &PrivilegeLevel) -> bool {
        *self as usize == *other as usize
    }
}

impl PartialEq<RawPrivilegeLevel> for PrivilegeLevel {
    fn eq(&self, other: &RawPrivilegeLevel) -> bool {
        *self as usize == *other as usize
    }
}

impl PartialOrd<PrivilegeLevel> for RawPrivilegeLevel {
    fn partial_cmp(&self, other: &PrivilegeLevel) -> Option<Ordering> {
        (*self as usize).partial_cmp(&(*other as usize))
    }
}

impl PartialOrd<RawPrivilegeLevel> for PrivilegeLevel {
    fn partial_cmp(&self, other: &RawPrivilegeLevel) -> Option<Ordering> {
        (*self as usize).partial_cmp(&(*other as usize))
    }
}

impl fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            PrivilegeLevel::User => "U",
            PrivilegeLevel::Supervisor => "S",
            PrivilegeLevel::Machine => "M",
        })
    }
}

impl From<PrivilegeLevel> for RawPrivilegeLevel {
    fn from(value: PrivilegeLevel) -> Self {
        match value {
            PrivilegeLevel::User => Self::User,
            PrivilegeLevel::Supervisor => Self::Supervisor,
            PrivilegeLevel::Machine => Self::Machine,
        }
    }
}

impl TryFrom<RawPrivilegeLevel> for PrivilegeLevel {
    type Error = ReservedPrivilegeLevelError;
    fn try_from(value: RawPrivilegeLevel) -> Result<Self, Self::Error> {
        match value {
            RawPrivilegeLevel::User => Ok(Self::User),
            RawPrivilegeLevel::Supervisor => Ok(Self::Supervisor),
            RawPrivilegeLevel::Reserved => Err(ReservedPrivilegeLevelError(value)),
            RawPrivilegeLevel::Machine => Ok(Self::Machine),
        }
    }
}

#[derive(Error, Debug)]
#[error("privilege level {0} is reserved")]
pub struct ReservedPrivilegeLevelError(RawPrivilegeLevel);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(PrivilegeLevel::User < PrivilegeLevel::Supervisor);
        assert!(PrivilegeLevel::Supervisor < PrivilegeLevel::Machine);
    }

    #[test]
    fn test_reserved_rejected() {
        assert!(PrivilegeLevel::try_from(RawPrivilegeLevel::Reserved).is_err());
    }

    #[test]
    fn test_cross_type_comparison() {
        assert_eq!(RawPrivilegeLevel::Machine, PrivilegeLevel::Machine);
        assert!(RawPrivilegeLevel::User < PrivilegeLevel::Supervisor);
    }
}
