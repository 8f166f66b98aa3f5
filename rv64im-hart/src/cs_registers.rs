//! Storage and read/write dispatch for the recognized Control and Status Registers.
//!
//! Part of the "Zicsr" extension.
//!
//! > RISC-V defines a separate address space of 4096 Control and Status registers associated with
//! > each hart.

use bitvec::field::BitField;
use bitvec::prelude::*;

use crate::csr::{self, CsrSpecifier};
use crate::exception::{AddressTranslationMode, VectorMode};
use crate::privilege::{PrivilegeLevel, RawPrivilegeLevel};

/// Bit offsets of the decomposed `mstatus` fields, as packed into the 64-bit register.
mod mstatus_bit {
    pub const SIE: usize = 1;
    pub const MIE: usize = 3;
    pub const SPIE: usize = 5;
    pub const UBE: usize = 6;
    pub const MPIE: usize = 7;
    pub const SPP: usize = 8;
    pub const MPP: usize = 11;
    pub const FS: usize = 13;
    pub const XS: usize = 15;
    pub const MPRV: usize = 17;
    pub const SUM: usize = 18;
    pub const MXR: usize = 19;
    pub const TVM: usize = 20;
    pub const TW: usize = 21;
    pub const TSR: usize = 22;
    pub const UXL: usize = 32;
    pub const SXL: usize = 34;
    pub const SBE: usize = 36;
    pub const MBE: usize = 37;
    pub const SD: usize = 63;
}

/// The state of an extension context (`fs`/`xs` in `mstatus`).
///
/// > The FS field encodes the status of the floating-point unit state, including the CSR `fcsr`
/// > and any floating-point registers. ... XS is designated for use by additional user-mode
/// > extensions and associated state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ContextStatus {
    Off = 0,
    Initial = 1,
    Clean = 2,
    Dirty = 3,
}

impl ContextStatus {
    fn from_u2(value: u64) -> Self {
        match value & 0b11 {
            0 => Self::Off,
            1 => Self::Initial,
            2 => Self::Clean,
            _ => Self::Dirty,
        }
    }
}

/// Control and Status Registers for a single RV64 hart, plus the subset of the privileged
/// architecture (machine and supervisor trap setup/handling, and `satp`) this core implements.
///
/// No floating-point or vector state is tracked; `fs`/`xs` exist only as bookkeeping bits of
/// `mstatus` so that `sd` can be derived, per the data model.
#[derive(Debug, Clone)]
pub struct CsRegisters {
    mstatus: u64,
    mtvec_base: u64,
    mtvec_mode: VectorMode,
    stvec_base: u64,
    stvec_mode: VectorMode,
    mepc: u64,
    sepc: u64,
    mcause: u64,
    scause: u64,
    mtval: u64,
    stval: u64,
    mhartid: u64,
    medeleg: u64,
    mideleg: u64,
    mie_mask: u64,
    mip_mask: u64,
    satp_mode: AddressTranslationMode,
    satp_asid: u64,
    satp_ppn: u64,
}

impl Default for CsRegisters {
    fn default() -> Self {
        let mut mstatus: u64 = 0;
        {
            let bits = mstatus.view_bits_mut::<Lsb0>();
            bits[mstatus_bit::MPP..mstatus_bit::MPP + 2].store(PrivilegeLevel::Machine as u64);
            bits[mstatus_bit::SPP] = true; // Supervisor, a single bit: User=0, Supervisor=1
            bits[mstatus_bit::FS..mstatus_bit::FS + 2].store(ContextStatus::Initial as u64);
            bits[mstatus_bit::XS..mstatus_bit::XS + 2].store(ContextStatus::Initial as u64);
            bits[mstatus_bit::UXL..mstatus_bit::UXL + 2].store(2u64); // XLEN=64
            bits[mstatus_bit::SXL..mstatus_bit::SXL + 2].store(2u64); // XLEN=64
        }
        let mut registers = Self {
            mstatus,
            mtvec_base: 0,
            mtvec_mode: VectorMode::Direct,
            stvec_base: 0,
            stvec_mode: VectorMode::Direct,
            mepc: 0,
            sepc: 0,
            mcause: 0,
            scause: 0,
            mtval: 0,
            stval: 0,
            mhartid: 0,
            medeleg: 0,
            mideleg: 0,
            mie_mask: 0,
            mip_mask: 0,
            satp_mode: AddressTranslationMode::Bare,
            satp_asid: 0,
            satp_ppn: 0,
        };
        registers.recompute_sd();
        registers
    }
}

impl CsRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    //
    // Privilege-gated access, used by the `CSRR*` instruction family.
    //

    /// Reads a CSR by its specifier, enforcing the read-privilege check encoded in the address.
    pub fn read(
        &self,
        specifier: CsrSpecifier,
        privilege_level: PrivilegeLevel,
    ) -> Result<u64, CsrAccessError> {
        self.check_readable(specifier, privilege_level)?;
        Ok(self.read_unchecked(specifier))
    }

    /// Writes a CSR by its specifier, enforcing the read+write-privilege check encoded in the
    /// address.
    pub fn write(
        &mut self,
        specifier: CsrSpecifier,
        privilege_level: PrivilegeLevel,
        value: u64,
    ) -> Result<(), CsrWriteError> {
        self.check_readable(specifier, privilege_level)
            .map_err(CsrWriteError::Access)?;
        // `mhartid` is architecturally read-only (its address even encodes the read-only bit
        // pattern), but this core accepts writes to it as a harmless simplification. See
        // DESIGN.md for the source of this deviation.
        if specifier != csr::MHARTID && csr::is_read_only(specifier) {
            return Err(CsrWriteError::Access(CsrAccessError::WriteToReadOnly(
                specifier,
            )));
        }
        self.write_unchecked(specifier, value)
    }

    fn check_readable(
        &self,
        specifier: CsrSpecifier,
        privilege_level: PrivilegeLevel,
    ) -> Result<(), CsrAccessError> {
        if !csr::is_valid(specifier) {
            return Err(CsrAccessError::Unsupported(specifier));
        }
        let required_level = csr::required_privilege_level(specifier);
        if privilege_level < required_level {
            return Err(CsrAccessError::Privileged {
                specifier,
                required_level,
                actual_level: privilege_level,
            });
        }
        Ok(())
    }

    fn read_unchecked(&self, specifier: CsrSpecifier) -> u64 {
        match specifier {
            csr::STVEC => pack_tvec(self.stvec_base, self.stvec_mode),
            csr::SEPC => self.sepc,
            csr::SCAUSE => self.scause,
            csr::STVAL => self.stval,
            csr::SATP => pack_satp(self.satp_mode, self.satp_asid, self.satp_ppn),
            csr::MHARTID => self.mhartid,
            csr::MSTATUS => self.mstatus,
            csr::MEDELEG => self.medeleg,
            csr::MIDELEG => self.mideleg,
            csr::MIE => self.mie_mask,
            csr::MTVEC => pack_tvec(self.mtvec_base, self.mtvec_mode),
            csr::MEPC => self.mepc,
            csr::MCAUSE => self.mcause,
            csr::MTVAL => self.mtval,
            csr::MIP => self.mip_mask,
            _ => 0, // PMP CSRs (and anything else reaching here) always read as 0.
        }
    }

    fn write_unchecked(&mut self, specifier: CsrSpecifier, value: u64) -> Result<(), CsrWriteError> {
        match specifier {
            csr::STVEC => {
                let (base, mode) = unpack_tvec(value)?;
                self.stvec_base = base;
                self.stvec_mode = mode;
            }
            csr::SEPC => self.sepc = value & !1,
            csr::SCAUSE => self.scause = value,
            csr::STVAL => self.stval = value,
            csr::SATP => {
                let (mode, asid, ppn) = unpack_satp(value)?;
                if mode != AddressTranslationMode::Bare {
                    return Err(CsrWriteError::UnsupportedAddressTranslationMode(
                        mode.as_u4() as u8,
                    ));
                }
                self.satp_mode = mode;
                self.satp_asid = asid;
                self.satp_ppn = ppn;
            }
            csr::MHARTID => self.mhartid = value, // deviates from the architecture: see DESIGN.md
            csr::MSTATUS => self.write_mstatus(value)?,
            csr::MEDELEG => self.medeleg = value,
            csr::MIDELEG => self.mideleg = value,
            csr::MIE => self.mie_mask = value,
            csr::MTVEC => {
                let (base, mode) = unpack_tvec(value)?;
                self.mtvec_base = base;
                self.mtvec_mode = mode;
            }
            csr::MEPC => self.mepc = value & !1,
            csr::MCAUSE => self.mcause = value,
            csr::MTVAL => self.mtval = value,
            csr::MIP => self.mip_mask = value,
            _ => {} // PMP CSRs silently discard writes.
        }
        Ok(())
    }

    fn write_mstatus(&mut self, value: u64) -> Result<(), CsrWriteError> {
        // `ube`, `uxl`, `sxl`, `sbe`, `mbe` are unmodifiable: the old bits are always preserved.
        let mut unmodifiable_mask: u64 = 0;
        unmodifiable_mask.view_bits_mut::<Lsb0>().set(mstatus_bit::UBE, true);
        {
            let bits = unmodifiable_mask.view_bits_mut::<Lsb0>();
            bits[mstatus_bit::UXL..mstatus_bit::UXL + 2].store(0b11u64);
            bits[mstatus_bit::SXL..mstatus_bit::SXL + 2].store(0b11u64);
        }
        unmodifiable_mask.view_bits_mut::<Lsb0>().set(mstatus_bit::SBE, true);
        unmodifiable_mask.view_bits_mut::<Lsb0>().set(mstatus_bit::MBE, true);

        let new_value = (self.mstatus & unmodifiable_mask) | (value & !unmodifiable_mask);

        let mpp_bits = new_value.view_bits::<Lsb0>()[mstatus_bit::MPP..mstatus_bit::MPP + 2]
            .load::<u64>();
        if RawPrivilegeLevel::from_u2(mpp_bits as u8).is_reserved() {
            return Err(CsrWriteError::InvalidPrivilegeLevel(mpp_bits as u8));
        }

        self.mstatus = new_value;
        self.recompute_sd();
        Ok(())
    }

    /// `sd` is a read-only summary bit: set whenever any extension context is `Dirty`.
    fn recompute_sd(&mut self) {
        let dirty = self.fs() == ContextStatus::Dirty || self.xs() == ContextStatus::Dirty;
        self.mstatus.view_bits_mut::<Lsb0>().set(mstatus_bit::SD, dirty);
    }

    //
    // Decomposed `mstatus` accessors, used by the trap machinery and by tests. These bypass the
    // privilege/read-only checks that guard the `CSRR*`-facing `read`/`write` above, since trap
    // entry and `MRET` mutate `mstatus` directly as part of the architecture, not as a guest CSR
    // access.
    //

    pub fn mstatus(&self) -> u64 {
        self.mstatus
    }

    pub fn sie(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[mstatus_bit::SIE]
    }

    pub fn set_sie(&mut self, value: bool) {
        self.mstatus.view_bits_mut::<Lsb0>().set(mstatus_bit::SIE, value);
    }

    pub fn mie(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[mstatus_bit::MIE]
    }

    pub fn set_mie(&mut self, value: bool) {
        self.mstatus.view_bits_mut::<Lsb0>().set(mstatus_bit::MIE, value);
    }

    pub fn spie(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[mstatus_bit::SPIE]
    }

    pub fn set_spie(&mut self, value: bool) {
        self.mstatus.view_bits_mut::<Lsb0>().set(mstatus_bit::SPIE, value);
    }

    pub fn mpie(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[mstatus_bit::MPIE]
    }

    pub fn set_mpie(&mut self, value: bool) {
        self.mstatus.view_bits_mut::<Lsb0>().set(mstatus_bit::MPIE, value);
    }

    /// Supervisor previous privilege level. Only `User`/`Supervisor` are representable (one bit).
    pub fn spp(&self) -> PrivilegeLevel {
        if self.mstatus.view_bits::<Lsb0>()[mstatus_bit::SPP] {
            PrivilegeLevel::Supervisor
        } else {
            PrivilegeLevel::User
        }
    }

    pub fn set_spp(&mut self, level: PrivilegeLevel) {
        self.mstatus
            .view_bits_mut::<Lsb0>()
            .set(mstatus_bit::SPP, level == PrivilegeLevel::Supervisor);
    }

    /// Machine previous privilege level.
    ///
    /// Returns [`Err`] with the raw 2-bit encoding if it names the reserved level; this can only
    /// happen if something wrote `mstatus` through a channel that bypassed [`Self::write`]'s
    /// validity check, which this core never does, but `MRET` still checks defensively.
    pub fn mpp(&self) -> Result<PrivilegeLevel, u8> {
        let bits = self.mstatus.view_bits::<Lsb0>()[mstatus_bit::MPP..mstatus_bit::MPP + 2]
            .load::<u64>();
        PrivilegeLevel::try_from(RawPrivilegeLevel::from_u2(bits as u8)).map_err(|_| bits as u8)
    }

    pub fn set_mpp(&mut self, level: PrivilegeLevel) {
        self.mstatus.view_bits_mut::<Lsb0>()[mstatus_bit::MPP..mstatus_bit::MPP + 2]
            .store(level as u64);
        self.recompute_sd();
    }

    pub fn mprv(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[mstatus_bit::MPRV]
    }

    pub fn set_mprv(&mut self, value: bool) {
        self.mstatus.view_bits_mut::<Lsb0>().set(mstatus_bit::MPRV, value);
    }

    pub fn sum(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[mstatus_bit::SUM]
    }

    pub fn mxr(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[mstatus_bit::MXR]
    }

    pub fn tvm(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[mstatus_bit::TVM]
    }

    pub fn tw(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[mstatus_bit::TW]
    }

    pub fn tsr(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[mstatus_bit::TSR]
    }

    pub fn fs(&self) -> ContextStatus {
        ContextStatus::from_u2(
            self.mstatus.view_bits::<Lsb0>()[mstatus_bit::FS..mstatus_bit::FS + 2].load::<u64>(),
        )
    }

    pub fn xs(&self) -> ContextStatus {
        ContextStatus::from_u2(
            self.mstatus.view_bits::<Lsb0>()[mstatus_bit::XS..mstatus_bit::XS + 2].load::<u64>(),
        )
    }

    pub fn sd(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[mstatus_bit::SD]
    }

    //
    // Trap machinery. These bypass the CSRR* privilege model entirely: the trap protocol is part
    // of the hart's own state transitions, not a guest-visible register access.
    //

    pub fn mepc(&self) -> u64 {
        self.mepc
    }

    pub fn set_mepc(&mut self, value: u64) {
        self.mepc = value & !1;
    }

    pub fn sepc(&self) -> u64 {
        self.sepc
    }

    pub fn set_sepc(&mut self, value: u64) {
        self.sepc = value & !1;
    }

    pub fn set_mcause(&mut self, code: u64, interrupt: bool) {
        self.mcause = code | ((interrupt as u64) << 63);
    }

    pub fn set_scause(&mut self, code: u64, interrupt: bool) {
        self.scause = code | ((interrupt as u64) << 63);
    }

    pub fn set_mtval(&mut self, value: u64) {
        self.mtval = value;
    }

    pub fn set_stval(&mut self, value: u64) {
        self.stval = value;
    }

    pub fn mtvec_base(&self) -> u64 {
        self.mtvec_base
    }

    pub fn stvec_base(&self) -> u64 {
        self.stvec_base
    }

    /// Returns `true` if exception code `code` is delegated from Machine to Supervisor.
    pub fn is_delegated(&self, code: u64) -> bool {
        code < 64 && (self.medeleg >> code) & 1 == 1
    }

    pub fn mhartid(&self) -> u64 {
        self.mhartid
    }

    pub fn set_mhartid(&mut self, value: u64) {
        self.mhartid = value;
    }
}

/// Error raised by [`CsRegisters::read`]/[`CsRegisters::check_readable`]: an ordinary permission
/// violation. Always folds into [`crate::Exception::IllegalInstruction`] at the call site.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CsrAccessError {
    Unsupported(CsrSpecifier),
    Privileged {
        specifier: CsrSpecifier,
        required_level: RawPrivilegeLevel,
        actual_level: PrivilegeLevel,
    },
    WriteToReadOnly(CsrSpecifier),
}

/// Error raised by [`CsRegisters::write`].
///
/// [`Self::Access`] folds into [`crate::Exception::IllegalInstruction`], same as a read failure.
/// The others are host-level failures (they indicate the guest tried to configure something this
/// core cannot actually provide) and fold into the matching [`crate::HartError`] variant.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CsrWriteError {
    Access(CsrAccessError),
    UnsupportedAddressTranslationMode(u8),
    InvalidPrivilegeLevel(u8),
    InvalidVectorMode(u8),
}

/// `base` is stored pre-shifted, i.e. already the jump target address with its low 2 bits cleared
/// (not the raw 62-bit BASE field value) -- so [`CsRegisters::mtvec_base`]/[`CsRegisters::stvec_base`]
/// can be used directly as a trap target without the caller re-applying `<< 2`.
fn pack_tvec(base: u64, mode: VectorMode) -> u64 {
    (base & !0b11) | mode.as_u2()
}

fn unpack_tvec(value: u64) -> Result<(u64, VectorMode), CsrWriteError> {
    let mode_bits = value & 0b11;
    let mode =
        VectorMode::from_u2(mode_bits).ok_or(CsrWriteError::InvalidVectorMode(mode_bits as u8))?;
    Ok((value & !0b11, mode))
}

fn pack_satp(mode: AddressTranslationMode, asid: u64, ppn: u64) -> u64 {
    (mode.as_u4() << 60) | ((asid & 0xFFFF) << 44) | (ppn & 0xFFF_FFFF_FFFF)
}

fn unpack_satp(value: u64) -> Result<(AddressTranslationMode, u64, u64), CsrWriteError> {
    let mode_bits = (value >> 60) & 0b1111;
    let mode = AddressTranslationMode::from_u4(mode_bits)
        .ok_or(CsrWriteError::UnsupportedAddressTranslationMode(mode_bits as u8))?;
    let asid = (value >> 44) & 0xFFFF;
    let ppn = value & 0xFFF_FFFF_FFFF;
    Ok((mode, asid, ppn))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let registers = CsRegisters::new();
        assert_eq!(Ok(PrivilegeLevel::Machine), registers.mpp());
        assert_eq!(PrivilegeLevel::Supervisor, registers.spp());
        assert_eq!(ContextStatus::Initial, registers.fs());
        assert_eq!(ContextStatus::Initial, registers.xs());
        assert!(!registers.sd());
    }

    #[test]
    fn test_pmp_reads_zero_and_discards_writes() {
        let mut registers = CsRegisters::new();
        let pmpcfg0 = csr::PMPCFG_BASE;
        let pmpaddr0 = csr::PMPADDR_BASE;
        assert_eq!(0, registers.read(pmpcfg0, PrivilegeLevel::Machine).unwrap());
        registers.write(pmpaddr0, PrivilegeLevel::Machine, u64::MAX).unwrap();
        assert_eq!(0, registers.read(pmpaddr0, PrivilegeLevel::Machine).unwrap());
    }

    #[test]
    fn test_unmodifiable_fields_preserve_old_bits() {
        let mut registers = CsRegisters::new();
        let before = registers.mstatus();
        registers
            .write(csr::MSTATUS, PrivilegeLevel::Machine, u64::MAX)
            .unwrap();
        let ube_mask = 1u64 << mstatus_bit::UBE;
        let sbe_mask = 1u64 << mstatus_bit::SBE;
        let mbe_mask = 1u64 << mstatus_bit::MBE;
        assert_eq!(before & ube_mask, registers.mstatus() & ube_mask);
        assert_eq!(before & sbe_mask, registers.mstatus() & sbe_mask);
        assert_eq!(before & mbe_mask, registers.mstatus() & mbe_mask);
        assert_eq!(2, registers.mstatus().view_bits::<Lsb0>()
            [mstatus_bit::UXL..mstatus_bit::UXL + 2].load::<u64>());
    }

    #[test]
    fn test_mstatus_write_rejects_reserved_mpp() {
        let mut registers = CsRegisters::new();
        let mut value = registers.mstatus();
        value.view_bits_mut::<Lsb0>()[mstatus_bit::MPP..mstatus_bit::MPP + 2].store(2u64);
        let err = registers
            .write(csr::MSTATUS, PrivilegeLevel::Machine, value)
            .unwrap_err();
        assert_eq!(CsrWriteError::InvalidPrivilegeLevel(2), err);
    }

    #[test]
    fn test_satp_rejects_non_bare_mode() {
        let mut registers = CsRegisters::new();
        let sv39 = AddressTranslationMode::Sv39.as_u4() << 60;
        let err = registers
            .write(csr::SATP, PrivilegeLevel::Machine, sv39)
            .unwrap_err();
        assert_eq!(CsrWriteError::UnsupportedAddressTranslationMode(8), err);
    }

    #[test]
    fn test_mepc_clears_low_bit() {
        let mut registers = CsRegisters::new();
        registers.set_mepc(0x1001);
        assert_eq!(0x1000, registers.mepc());
    }

    #[test]
    fn test_mhartid_write_deviates_from_read_only_encoding() {
        // mhartid's address encodes the read-only bit pattern, but writes are accepted anyway.
        let mut registers = CsRegisters::new();
        assert!(csr::is_read_only(csr::MHARTID));
        registers.write(csr::MHARTID, PrivilegeLevel::Machine, 7).unwrap();
        assert_eq!(7, registers.mhartid());
    }

    #[test]
    fn test_privilege_gates_access() {
        let registers = CsRegisters::new();
        let err = registers.read(csr::MSTATUS, PrivilegeLevel::User).unwrap_err();
        assert!(matches!(err, CsrAccessError::Privileged { .. }));
    }

    #[test]
    fn test_delegation_bitmask() {
        let mut registers = CsRegisters::new();
        registers.write(csr::MEDELEG, PrivilegeLevel::Machine, 1 << 8).unwrap();
        assert!(registers.is_delegated(8));
        assert!(!registers.is_delegated(9));
    }

    #[test]
    fn test_mtvec_direct_mode_round_trip() {
        let mut registers = CsRegisters::new();
        registers.write(csr::MTVEC, PrivilegeLevel::Machine, 0x1000).unwrap();
        assert_eq!(0x1000, registers.mtvec_base());
        assert_eq!(0x1000, registers.read(csr::MTVEC, PrivilegeLevel::Machine).unwrap());
    }

    #[test]
    fn test_sd_tracks_dirty_extension_context() {
        let mut registers = CsRegisters::new();
        let mut value = registers.mstatus();
        value.view_bits_mut::<Lsb0>()[mstatus_bit::FS..mstatus_bit::FS + 2]
            .store(ContextStatus::Dirty as u64);
        registers.write(csr::MSTATUS, PrivilegeLevel::Machine, value).unwrap();
        assert!(registers.sd());
    }
}
