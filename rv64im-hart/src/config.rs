//! Runtime policy configuration for a [`crate::Hart`].

/// Policy flags controlling which host-level conditions are fatal versus reflected into the guest
/// as architectural exceptions, plus trace verbosity.
///
/// Defaults make every host-level failure fatal and omit `pc` from trace lines, matching a
/// strict/debuggable-by-default posture.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Config {
    /// If `false`, an unrecognized opcode raises [`crate::Exception::IllegalInstruction`] instead
    /// of terminating [`crate::Hart::run`] with [`crate::HartError::UnimplementedOpcode`].
    pub unrecognized_instruction_is_fatal: bool,
    /// If `false`, an unrecognized CSR address raises [`crate::Exception::IllegalInstruction`]
    /// instead of terminating with [`crate::HartError::InvalidCsr`].
    pub unrecognized_csr_is_fatal: bool,
    /// If `true`, `EBREAK` terminates [`crate::Hart::run`] with [`crate::HartError::EBreak`]
    /// instead of raising [`crate::Exception::Breakpoint`].
    pub ebreak_is_fatal: bool,
    /// If `false`, an out-of-bounds fetch/load/store raises the matching access-fault exception
    /// instead of terminating with [`crate::HartError::ExecutionOutOfBounds`].
    pub execution_out_of_bounds_is_fatal: bool,
    /// If `true`, trace lines include the current `pc`.
    pub always_print_pc: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unrecognized_instruction_is_fatal: true,
            unrecognized_csr_is_fatal: true,
            ebreak_is_fatal: true,
            execution_out_of_bounds_is_fatal: true,
            always_print_pc: false,
        }
    }
}
