//! Per-instruction semantics: the execute stage of the fetch/decode/execute loop.
//!
//! Each helper here mutates [`Hart`] state for exactly one decoded [`Instruction`] and advances
//! `pc` on success. Jumps and taken branches write `pc` directly instead of calling
//! [`increment_pc`]; everything else does. Control never checks the *new* `pc` for alignment here
//! -- a misaligned target is only ever caught by the next fetch, per [`crate::Hart::step`].

use log::trace;

use crate::cs_registers::{CsrAccessError, CsrWriteError};
use crate::error::HartError;
use crate::exception::Exception;
use crate::hart::Hart;
use crate::instruction::{
    BranchCondition, CsrOp, Instruction, LoadWidth, RegImmOp, RegRegOp, RegShiftOp, StoreWidth,
};
use crate::memory;
use crate::privilege::PrivilegeLevel;
use crate::registers::Specifier;

/// The outcome of decoding+executing one instruction that the caller cannot recover from locally.
///
/// [`Self::Exception`] is handled by [`crate::Hart::step`]'s trap machinery; [`Self::Fatal`]
/// propagates out of [`crate::Hart::run`].
pub(crate) enum ExecuteError {
    Exception(Exception),
    Fatal(HartError),
}

impl From<Exception> for ExecuteError {
    fn from(exception: Exception) -> Self {
        Self::Exception(exception)
    }
}

impl From<HartError> for ExecuteError {
    fn from(error: HartError) -> Self {
        Self::Fatal(error)
    }
}

type ExecResult = Result<(), ExecuteError>;

pub(crate) fn execute(hart: &mut Hart, instruction: Instruction, raw_instruction: u32) -> ExecResult {
    if hart.config.always_print_pc {
        trace!(pc = hart.pc(); "executing {instruction:?}");
    } else {
        trace!("executing {instruction:?}");
    }

    match instruction {
        Instruction::OpImm { op, dest, src, immediate } => {
            let result = reg_imm_op(op, hart.x(src), immediate);
            hart.registers.set_x(dest, result);
            increment_pc(hart);
            Ok(())
        }
        Instruction::OpImmWord { op, dest, src, immediate } => {
            let result = reg_imm_word_op(op, hart.x(src), immediate);
            hart.registers.set_x(dest, result);
            increment_pc(hart);
            Ok(())
        }
        Instruction::OpShiftImm { op, dest, src, shift_amount } => {
            let result = reg_shift_op(op, hart.x(src), shift_amount);
            hart.registers.set_x(dest, result);
            increment_pc(hart);
            Ok(())
        }
        Instruction::OpShiftImmWord { op, dest, src, shift_amount } => {
            let result = reg_shift_word_op(op, hart.x(src), shift_amount);
            hart.registers.set_x(dest, result);
            increment_pc(hart);
            Ok(())
        }
        Instruction::Auipc { dest, immediate } => {
            let result = hart.pc().wrapping_add_signed(immediate);
            hart.registers.set_x(dest, result);
            increment_pc(hart);
            Ok(())
        }
        Instruction::Lui { dest, immediate } => {
            hart.registers.set_x(dest, immediate as u64);
            increment_pc(hart);
            Ok(())
        }
        Instruction::Op { op, dest, src1, src2 } => {
            let result = reg_reg_op(op, hart.x(src1), hart.x(src2));
            hart.registers.set_x(dest, result);
            increment_pc(hart);
            Ok(())
        }
        Instruction::OpWord { op, dest, src1, src2 } => {
            let result = reg_reg_word_op(op, hart.x(src1), hart.x(src2));
            hart.registers.set_x(dest, result);
            increment_pc(hart);
            Ok(())
        }
        Instruction::Jal { dest, offset } => {
            jump(hart, dest, hart.pc().wrapping_add_signed(offset));
            Ok(())
        }
        Instruction::Jalr { dest, base, offset } => {
            let target = hart.x(base).wrapping_add_signed(offset) & !1;
            jump(hart, dest, target);
            Ok(())
        }
        Instruction::Branch { condition, src1, src2, offset } => {
            branch(hart, condition, hart.x(src1), hart.x(src2), offset);
            Ok(())
        }
        Instruction::Load { width, dest, base, offset } => load(hart, width, dest, base, offset),
        Instruction::Store { width, src, base, offset } => store(hart, width, src, base, offset),
        Instruction::Fence { .. } => {
            // This core has a single hart and no other bus masters: every FENCE is already
            // satisfied the moment it is reached.
            increment_pc(hart);
            Ok(())
        }
        Instruction::Ecall => Err(ecall(hart).into()),
        Instruction::Ebreak => Err(ebreak(hart).into()),
        Instruction::Mret => mret(hart, raw_instruction),
        Instruction::Csr { op, dest, csr, src } => {
            let value = if op == CsrOp::ReadWrite || src != Specifier::X0 {
                Some(hart.x(src))
            } else {
                None
            };
            csr_transaction(hart, op, dest, csr, value, raw_instruction)
        }
        Instruction::Csri { op, dest, csr, immediate } => {
            let value = if op == CsrOp::ReadWrite || immediate != 0 {
                Some(immediate as u64)
            } else {
                None
            };
            csr_transaction(hart, op, dest, csr, value, raw_instruction)
        }
    }
}

fn increment_pc(hart: &mut Hart) {
    *hart.registers.pc_mut() = hart.pc().wrapping_add(4);
}

fn jump(hart: &mut Hart, dest: Specifier, target: u64) {
    let return_address = hart.pc().wrapping_add(4);
    hart.registers.set_x(dest, return_address);
    *hart.registers.pc_mut() = target;
}

fn branch(hart: &mut Hart, condition: BranchCondition, lhs: u64, rhs: u64, offset: i64) {
    let taken = match condition {
        BranchCondition::Beq => lhs == rhs,
        BranchCondition::Bne => lhs != rhs,
        BranchCondition::Blt => (lhs as i64) < (rhs as i64),
        BranchCondition::Bge => (lhs as i64) >= (rhs as i64),
        BranchCondition::Bltu => lhs < rhs,
        BranchCondition::Bgeu => lhs >= rhs,
    };
    if taken {
        *hart.registers.pc_mut() = hart.pc().wrapping_add_signed(offset);
    } else {
        increment_pc(hart);
    }
}

fn reg_imm_op(op: RegImmOp, src: u64, immediate: i64) -> u64 {
    match op {
        RegImmOp::Addi => src.wrapping_add(immediate as u64),
        RegImmOp::Slti => (((src as i64) < immediate) as u64),
        RegImmOp::Sltiu => ((src < immediate as u64) as u64),
        RegImmOp::Xori => src ^ (immediate as u64),
        RegImmOp::Ori => src | (immediate as u64),
        RegImmOp::Andi => src & (immediate as u64),
    }
}

/// `ADDIW` is the only instruction decoded into [`crate::instruction::Instruction::OpImmWord`].
fn reg_imm_word_op(op: RegImmOp, src: u64, immediate: i64) -> u64 {
    match op {
        RegImmOp::Addi => {
            let result = (src as u32).wrapping_add(immediate as u32);
            (result as i32) as i64 as u64
        }
        _ => unreachable!("only ADDIW decodes into OpImmWord"),
    }
}

fn reg_shift_op(op: RegShiftOp, src: u64, shift_amount: u32) -> u64 {
    match op {
        RegShiftOp::Slli => src << shift_amount,
        RegShiftOp::Srli => src >> shift_amount,
        RegShiftOp::Srai => ((src as i64) >> shift_amount) as u64,
    }
}

fn reg_shift_word_op(op: RegShiftOp, src: u64, shift_amount: u32) -> u64 {
    let src32 = src as u32;
    match op {
        RegShiftOp::Slli => ((src32 << shift_amount) as i32) as i64 as u64,
        RegShiftOp::Srli => ((src32 >> shift_amount) as i32) as i64 as u64,
        RegShiftOp::Srai => (((src as i32) >> shift_amount) as i64) as u64,
    }
}

fn reg_reg_op(op: RegRegOp, lhs: u64, rhs: u64) -> u64 {
    match op {
        RegRegOp::Add => lhs.wrapping_add(rhs),
        RegRegOp::Sub => lhs.wrapping_sub(rhs),
        RegRegOp::Slt => (((lhs as i64) < (rhs as i64)) as u64),
        RegRegOp::Sltu => ((lhs < rhs) as u64),
        RegRegOp::And => lhs & rhs,
        RegRegOp::Or => lhs | rhs,
        RegRegOp::Xor => lhs ^ rhs,
        RegRegOp::Sll => lhs << (rhs & 0x3F),
        RegRegOp::Srl => lhs >> (rhs & 0x3F),
        RegRegOp::Sra => ((lhs as i64) >> (rhs & 0x3F)) as u64,
        RegRegOp::Mul => lhs.wrapping_mul(rhs),
        RegRegOp::Mulh => (((lhs as i64 as i128) * (rhs as i64 as i128)) >> 64) as u64,
        RegRegOp::Mulhsu => (((lhs as i64 as i128) * (rhs as u128 as i128)) >> 64) as u64,
        RegRegOp::Mulhu => (((lhs as u128) * (rhs as u128)) >> 64) as u64,
        RegRegOp::Div => div_signed(lhs as i64, rhs as i64).0 as u64,
        RegRegOp::Divu => div_unsigned(lhs, rhs).0,
        RegRegOp::Rem => div_signed(lhs as i64, rhs as i64).1 as u64,
        RegRegOp::Remu => div_unsigned(lhs, rhs).1,
    }
}

/// Same as [`reg_reg_op`], restricted to the `*W` mnemonics valid in the OP-32 opcode class.
///
/// Every result, including the "unsigned" division/remainder forms, is computed on 32-bit
/// operands and then sign-extended to 64 bits -- that sign-extension is not optional for `DIVUW`/
/// `REMUW` even though the operation itself is unsigned; it is a property of the `*W` instruction
/// class, not of signedness.
fn reg_reg_word_op(op: RegRegOp, lhs: u64, rhs: u64) -> u64 {
    let (l32, r32) = (lhs as u32, rhs as u32);
    let sext = |v: u32| (v as i32) as i64 as u64;
    match op {
        RegRegOp::Add => sext(l32.wrapping_add(r32)),
        RegRegOp::Sub => sext(l32.wrapping_sub(r32)),
        RegRegOp::Sll => sext(l32 << (r32 & 0x1F)),
        RegRegOp::Srl => sext(l32 >> (r32 & 0x1F)),
        RegRegOp::Sra => (((l32 as i32) >> (r32 & 0x1F)) as i64) as u64,
        RegRegOp::Mul => sext(l32.wrapping_mul(r32)),
        RegRegOp::Div => sext(div_signed_32(l32 as i32, r32 as i32).0 as u32),
        RegRegOp::Divu => sext(div_unsigned_32(l32, r32).0),
        RegRegOp::Rem => sext(div_signed_32(l32 as i32, r32 as i32).1 as u32),
        RegRegOp::Remu => sext(div_unsigned_32(l32, r32).1),
        RegRegOp::Slt | RegRegOp::Sltu | RegRegOp::And | RegRegOp::Or | RegRegOp::Xor
        | RegRegOp::Mulh | RegRegOp::Mulhsu | RegRegOp::Mulhu => {
            unreachable!("not a member of the OP-32 opcode class")
        }
    }
}

/// Division by zero yields quotient `-1`, remainder = dividend. Overflow (`MIN / -1`) yields
/// quotient = dividend, remainder `0` -- which is exactly what [`i64::wrapping_div`]/
/// [`i64::wrapping_rem`] already compute, so only the zero-divisor case needs a manual check.
fn div_signed(dividend: i64, divisor: i64) -> (i64, i64) {
    if divisor == 0 {
        (-1, dividend)
    } else {
        (dividend.wrapping_div(divisor), dividend.wrapping_rem(divisor))
    }
}

fn div_signed_32(dividend: i32, divisor: i32) -> (i32, i32) {
    if divisor == 0 {
        (-1, dividend)
    } else {
        (dividend.wrapping_div(divisor), dividend.wrapping_rem(divisor))
    }
}

/// Division by zero yields quotient = all-ones, remainder = dividend. Unsigned division has no
/// overflow case.
fn div_unsigned(dividend: u64, divisor: u64) -> (u64, u64) {
    if divisor == 0 {
        (u64::MAX, dividend)
    } else {
        (dividend / divisor, dividend % divisor)
    }
}

fn div_unsigned_32(dividend: u32, divisor: u32) -> (u32, u32) {
    if divisor == 0 {
        (u32::MAX, dividend)
    } else {
        (dividend / divisor, dividend % divisor)
    }
}

fn load(hart: &mut Hart, width: LoadWidth, dest: Specifier, base: Specifier, offset: i64) -> ExecResult {
    let address = hart.x(base).wrapping_add_signed(offset);
    let (raw, access_width) = match width {
        LoadWidth::Lb | LoadWidth::Lbu => (memory::read::<1>(hart.memory, address), 1),
        LoadWidth::Lh | LoadWidth::Lhu => (memory::read::<2>(hart.memory, address), 2),
        LoadWidth::Lw | LoadWidth::Lwu => (memory::read::<4>(hart.memory, address), 4),
        LoadWidth::Ld => (memory::read::<8>(hart.memory, address), 8),
    };
    let raw = match raw {
        Some(raw) => raw,
        None => return Err(access_fault(hart, address, access_width, Exception::LoadAccessFault)),
    };
    let value = match width {
        LoadWidth::Lb => crate::bits::sign_extend(raw, 8) as u64,
        LoadWidth::Lh => crate::bits::sign_extend(raw, 16) as u64,
        LoadWidth::Lw => crate::bits::sign_extend(raw, 32) as u64,
        LoadWidth::Lbu | LoadWidth::Lhu | LoadWidth::Lwu | LoadWidth::Ld => raw,
    };
    hart.registers.set_x(dest, value);
    increment_pc(hart);
    Ok(())
}

fn store(hart: &mut Hart, width: StoreWidth, src: Specifier, base: Specifier, offset: i64) -> ExecResult {
    let address = hart.x(base).wrapping_add_signed(offset);
    let value = hart.x(src);
    let (result, access_width) = match width {
        StoreWidth::Sb => (memory::write::<1>(hart.memory, address, value), 1),
        StoreWidth::Sh => (memory::write::<2>(hart.memory, address, value), 2),
        StoreWidth::Sw => (memory::write::<4>(hart.memory, address, value), 4),
        StoreWidth::Sd => (memory::write::<8>(hart.memory, address, value), 8),
    };
    if result.is_none() {
        return Err(access_fault(hart, address, access_width, Exception::StoreOrAmoAccessFault));
    }
    increment_pc(hart);
    Ok(())
}

/// Maps an out-of-bounds memory access to either a host-level failure or an architectural access
/// fault, per [`crate::Config::execution_out_of_bounds_is_fatal`].
fn access_fault(hart: &Hart, address: u64, width: u8, exception: fn(u64) -> Exception) -> ExecuteError {
    if hart.config.execution_out_of_bounds_is_fatal {
        ExecuteError::Fatal(HartError::ExecutionOutOfBounds { address, width })
    } else {
        ExecuteError::Exception(exception(address))
    }
}

fn ecall(hart: &Hart) -> Exception {
    match hart.privilege_level() {
        PrivilegeLevel::User => Exception::EnvironmentCallFromUMode,
        PrivilegeLevel::Supervisor => Exception::EnvironmentCallFromSMode,
        PrivilegeLevel::Machine => Exception::EnvironmentCallFromMMode,
    }
}

fn ebreak(hart: &Hart) -> ExecuteError {
    if hart.config.ebreak_is_fatal {
        ExecuteError::Fatal(HartError::EBreak(hart.pc()))
    } else {
        ExecuteError::Exception(Exception::Breakpoint(hart.pc()))
    }
}

/// > The MRET instruction is used to return from a trap in M-mode. MRET first sets the privilege
/// > mode as per the MPP value, then sets MPIE to 1 and MIE to MPIE, and sets MPP to the least-
/// > privileged supported mode (U, or M if U-mode is not implemented). If MPP != M, MRET also sets
/// > MPRV to 0.
fn mret(hart: &mut Hart, raw_instruction: u32) -> ExecResult {
    if hart.privilege_level() != PrivilegeLevel::Machine {
        return Err(Exception::IllegalInstruction(raw_instruction as u64).into());
    }
    let mpp = hart
        .cs_registers
        .mpp()
        .map_err(|bits| ExecuteError::Fatal(HartError::InvalidPrivilegeLevel(bits)))?;
    if mpp != PrivilegeLevel::Machine {
        hart.cs_registers.set_mprv(false);
    }
    let mpie = hart.cs_registers.mpie();
    hart.cs_registers.set_mie(mpie);
    hart.privilege_level = mpp;
    hart.cs_registers.set_mpie(true);
    hart.cs_registers.set_mpp(PrivilegeLevel::User);
    *hart.registers.pc_mut() = hart.cs_registers.mepc();
    Ok(())
}

/// Implements the read-old/write-new sequencing shared by all six `CSRR*`/`CSRR*I` mnemonics.
///
/// The CSR is always read (there are no read side effects in this model, so there is nothing to
/// skip); `value` is `None` when the write should be elided entirely (`rs1`/the immediate is
/// zero, for the Set/Clear forms), which also elides the write-permission check.
fn csr_transaction(
    hart: &mut Hart,
    op: CsrOp,
    dest: Specifier,
    csr: u16,
    value: Option<u64>,
    raw_instruction: u32,
) -> ExecResult {
    let old = read_csr(hart, csr, raw_instruction)?;
    if let Some(operand) = value {
        let new_value = match op {
            CsrOp::ReadWrite => operand,
            CsrOp::ReadSet => old | operand,
            CsrOp::ReadClear => old & !operand,
        };
        write_csr(hart, csr, new_value, raw_instruction)?;
    }
    hart.registers.set_x(dest, old);
    increment_pc(hart);
    Ok(())
}

fn read_csr(hart: &Hart, csr: u16, raw_instruction: u32) -> Result<u64, ExecuteError> {
    let privilege_level = hart.privilege_level();
    let unrecognized_csr_is_fatal = hart.config.unrecognized_csr_is_fatal;
    hart.cs_registers.read(csr, privilege_level).map_err(|error| match error {
        CsrAccessError::Unsupported(specifier) => {
            unrecognized_csr(unrecognized_csr_is_fatal, specifier, raw_instruction)
        }
        CsrAccessError::Privileged { .. } | CsrAccessError::WriteToReadOnly(_) => {
            Exception::IllegalInstruction(raw_instruction as u64).into()
        }
    })
}

fn write_csr(hart: &mut Hart, csr: u16, value: u64, raw_instruction: u32) -> ExecResult {
    let privilege_level = hart.privilege_level();
    let unrecognized_csr_is_fatal = hart.config.unrecognized_csr_is_fatal;
    hart.cs_registers.write(csr, privilege_level, value).map_err(|error| match error {
        CsrWriteError::Access(CsrAccessError::Unsupported(specifier)) => {
            unrecognized_csr(unrecognized_csr_is_fatal, specifier, raw_instruction)
        }
        CsrWriteError::Access(_) => Exception::IllegalInstruction(raw_instruction as u64).into(),
        CsrWriteError::UnsupportedAddressTranslationMode(mode) => {
            ExecuteError::Fatal(HartError::UnsupportedAddressTranslationMode(mode))
        }
        CsrWriteError::InvalidPrivilegeLevel(level) => {
            ExecuteError::Fatal(HartError::InvalidPrivilegeLevel(level))
        }
        CsrWriteError::InvalidVectorMode(mode) => ExecuteError::Fatal(HartError::InvalidVectorMode(mode)),
    })
}

/// An address that doesn't name any CSR this core recognizes: fatal or an `IllegalInstruction`
/// trap, per [`crate::Config::unrecognized_csr_is_fatal`].
fn unrecognized_csr(is_fatal: bool, specifier: u16, raw_instruction: u32) -> ExecuteError {
    if is_fatal {
        ExecuteError::Fatal(HartError::InvalidCsr(specifier))
    } else {
        ExecuteError::Exception(Exception::IllegalInstruction(raw_instruction as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::csr;
    use crate::instruction::Instruction;
    use crate::registers::Specifier;

    fn program(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn test_addi_wraps_around_u64() {
        let mut memory = program(&[0x0000_0013]); // addi x0, x0, 0 -- placeholder, overwritten below
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        hart.registers.set_x(Specifier::from_u5(1), u64::MAX);
        execute(
            &mut hart,
            Instruction::OpImm {
                op: RegImmOp::Addi,
                dest: Specifier::from_u5(1),
                src: Specifier::from_u5(1),
                immediate: 1,
            },
            0,
        )
        .unwrap();
        assert_eq!(0, hart.x(Specifier::from_u5(1)));
    }

    #[test]
    fn test_div_by_zero() {
        let mut memory = program(&[0]);
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        hart.registers.set_x(Specifier::from_u5(1), 42);
        execute(
            &mut hart,
            Instruction::Op {
                op: RegRegOp::Div,
                dest: Specifier::from_u5(2),
                src1: Specifier::from_u5(1),
                src2: Specifier::X0,
            },
            0,
        )
        .unwrap();
        assert_eq!(u64::MAX, hart.x(Specifier::from_u5(2)));
    }

    #[test]
    fn test_divu_by_zero() {
        let mut memory = program(&[0]);
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        hart.registers.set_x(Specifier::from_u5(1), 42);
        execute(
            &mut hart,
            Instruction::Op {
                op: RegRegOp::Divu,
                dest: Specifier::from_u5(2),
                src1: Specifier::from_u5(1),
                src2: Specifier::X0,
            },
            0,
        )
        .unwrap();
        assert_eq!(u64::MAX, hart.x(Specifier::from_u5(2)));
    }

    #[test]
    fn test_signed_division_overflow() {
        let mut memory = program(&[0]);
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        hart.registers.set_x(Specifier::from_u5(1), i64::MIN as u64);
        hart.registers.set_x(Specifier::from_u5(2), u64::MAX); // -1
        execute(
            &mut hart,
            Instruction::Op {
                op: RegRegOp::Div,
                dest: Specifier::from_u5(3),
                src1: Specifier::from_u5(1),
                src2: Specifier::from_u5(2),
            },
            0,
        )
        .unwrap();
        assert_eq!(i64::MIN as u64, hart.x(Specifier::from_u5(3)));
        execute(
            &mut hart,
            Instruction::Op {
                op: RegRegOp::Rem,
                dest: Specifier::from_u5(4),
                src1: Specifier::from_u5(1),
                src2: Specifier::from_u5(2),
            },
            0,
        )
        .unwrap();
        assert_eq!(0, hart.x(Specifier::from_u5(4)));
    }

    #[test]
    fn test_divw_overflow_sign_extends_32_bit_min() {
        let mut memory = program(&[0]);
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        hart.registers.set_x(Specifier::from_u5(1), i32::MIN as u32 as u64);
        hart.registers.set_x(Specifier::from_u5(2), u64::MAX); // -1
        execute(
            &mut hart,
            Instruction::OpWord {
                op: RegRegOp::Div,
                dest: Specifier::from_u5(3),
                src1: Specifier::from_u5(1),
                src2: Specifier::from_u5(2),
            },
            0,
        )
        .unwrap();
        assert_eq!(i32::MIN as i64 as u64, hart.x(Specifier::from_u5(3)));
    }

    #[test]
    fn test_jalr_clears_low_bit() {
        let mut memory = program(&[0; 4]);
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        hart.registers.set_x(Specifier::from_u5(1), 0b11);
        execute(
            &mut hart,
            Instruction::Jalr { dest: Specifier::from_u5(2), base: Specifier::from_u5(1), offset: 0 },
            0,
        )
        .unwrap();
        assert_eq!(0b10, hart.pc());
        assert_eq!(4, hart.x(Specifier::from_u5(2)));
    }

    #[test]
    fn test_auipc_wraps_at_top_of_address_space() {
        let mut memory = program(&[0]);
        let mut hart = Hart::new(&mut memory, Config::default(), u64::MAX - 3);
        execute(
            &mut hart,
            Instruction::Auipc { dest: Specifier::from_u5(1), immediate: -(1 << 12) },
            0,
        )
        .unwrap();
        assert_eq!((u64::MAX - 3).wrapping_add_signed(-(1 << 12)), hart.x(Specifier::from_u5(1)));
    }

    #[test]
    fn test_branch_not_taken_falls_through() {
        let mut memory = program(&[0, 0]);
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        execute(
            &mut hart,
            Instruction::Branch {
                condition: BranchCondition::Beq,
                src1: Specifier::from_u5(1),
                src2: Specifier::from_u5(2),
                offset: 100,
            },
            0,
        )
        .unwrap();
        assert_eq!(4, hart.pc());
    }

    #[test]
    fn test_branch_taken_jumps() {
        let mut memory = program(&[0, 0]);
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        hart.registers.set_x(Specifier::from_u5(1), 5);
        execute(
            &mut hart,
            Instruction::Branch {
                condition: BranchCondition::Bne,
                src1: Specifier::from_u5(1),
                src2: Specifier::from_u5(2),
                offset: 100,
            },
            0,
        )
        .unwrap();
        assert_eq!(100, hart.pc());
    }

    #[test]
    fn test_load_out_of_bounds_is_fatal_by_default() {
        let mut memory = [0u8; 4];
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        let err = execute(
            &mut hart,
            Instruction::Load {
                width: LoadWidth::Ld,
                dest: Specifier::from_u5(1),
                base: Specifier::X0,
                offset: 0,
            },
            0,
        )
        .err()
        .unwrap();
        assert!(matches!(err, ExecuteError::Fatal(HartError::ExecutionOutOfBounds { address: 0, width: 8 })));
    }

    #[test]
    fn test_load_out_of_bounds_traps_when_not_fatal() {
        let mut memory = [0u8; 4];
        let mut config = Config::default();
        config.execution_out_of_bounds_is_fatal = false;
        let mut hart = Hart::new(&mut memory, config, 0);
        let err = execute(
            &mut hart,
            Instruction::Load {
                width: LoadWidth::Ld,
                dest: Specifier::from_u5(1),
                base: Specifier::X0,
                offset: 0,
            },
            0,
        )
        .err()
        .unwrap();
        assert!(matches!(err, ExecuteError::Exception(Exception::LoadAccessFault(0))));
    }

    #[test]
    fn test_store_then_load_round_trip() {
        let mut memory = [0u8; 8];
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        hart.registers.set_x(Specifier::from_u5(1), 0xDEAD_BEEF);
        execute(
            &mut hart,
            Instruction::Store { width: StoreWidth::Sw, src: Specifier::from_u5(1), base: Specifier::X0, offset: 0 },
            0,
        )
        .unwrap();
        execute(
            &mut hart,
            Instruction::Load { width: LoadWidth::Lwu, dest: Specifier::from_u5(2), base: Specifier::X0, offset: 0 },
            0,
        )
        .unwrap();
        assert_eq!(0xDEAD_BEEF, hart.x(Specifier::from_u5(2)));
    }

    #[test]
    fn test_ecall_reports_privilege_appropriate_exception() {
        let mut memory = [0u8; 4];
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        let err = execute(&mut hart, Instruction::Ecall, 0).err().unwrap();
        assert!(matches!(err, ExecuteError::Exception(Exception::EnvironmentCallFromMMode)));
    }

    #[test]
    fn test_ebreak_is_fatal_by_default() {
        let mut memory = [0u8; 4];
        let mut hart = Hart::new(&mut memory, Config::default(), 0x40);
        let err = execute(&mut hart, Instruction::Ebreak, 0).err().unwrap();
        assert!(matches!(err, ExecuteError::Fatal(HartError::EBreak(0x40))));
    }

    #[test]
    fn test_mret_from_user_mode_traps() {
        let mut memory = [0u8; 4];
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        hart.privilege_level = PrivilegeLevel::User;
        let err = execute(&mut hart, Instruction::Mret, 0x3020_0073).err().unwrap();
        assert!(matches!(err, ExecuteError::Exception(Exception::IllegalInstruction(0x3020_0073))));
    }

    #[test]
    fn test_mret_restores_privilege_and_pc() {
        let mut memory = [0u8; 4];
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        hart.cs_registers.set_mepc(0x8000);
        hart.cs_registers.set_mpp(PrivilegeLevel::Supervisor);
        hart.cs_registers.set_mprv(true);
        execute(&mut hart, Instruction::Mret, 0).unwrap();
        assert_eq!(0x8000, hart.pc());
        assert_eq!(PrivilegeLevel::Supervisor, hart.privilege_level());
        assert!(hart.cs_registers().mpie());
        assert_eq!(Ok(PrivilegeLevel::User), hart.cs_registers().mpp());
        assert!(!hart.cs_registers().mprv());
    }

    #[test]
    fn test_csrrw_always_writes_even_with_dest_zero() {
        let mut memory = [0u8; 4];
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        hart.registers.set_x(Specifier::from_u5(1), 0x1234);
        execute(
            &mut hart,
            Instruction::Csr { op: CsrOp::ReadWrite, dest: Specifier::X0, csr: csr::MEPC, src: Specifier::from_u5(1) },
            0,
        )
        .unwrap();
        assert_eq!(0x1234, hart.cs_registers().mepc());
    }

    #[test]
    fn test_csrrs_skips_write_when_src_is_zero() {
        let mut memory = [0u8; 4];
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        hart.cs_registers.set_mepc(0x9);
        execute(
            &mut hart,
            Instruction::Csr { op: CsrOp::ReadSet, dest: Specifier::from_u5(1), csr: csr::MEPC, src: Specifier::X0 },
            0,
        )
        .unwrap();
        assert_eq!(0x9, hart.x(Specifier::from_u5(1)));
        assert_eq!(0x9, hart.cs_registers().mepc());
    }

    #[test]
    fn test_csr_access_from_insufficient_privilege_traps() {
        let mut memory = [0u8; 4];
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        hart.privilege_level = PrivilegeLevel::User;
        let err = execute(
            &mut hart,
            Instruction::Csr {
                op: CsrOp::ReadWrite,
                dest: Specifier::from_u5(1),
                csr: csr::MSTATUS,
                src: Specifier::X0,
            },
            0xDEAD_BEEF,
        )
        .err()
        .unwrap();
        assert!(matches!(err, ExecuteError::Exception(Exception::IllegalInstruction(0xDEAD_BEEF))));
    }

    #[test]
    fn test_unrecognized_csr_is_fatal_by_default() {
        let mut memory = [0u8; 4];
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        let err = execute(
            &mut hart,
            Instruction::Csr { op: CsrOp::ReadWrite, dest: Specifier::from_u5(1), csr: 0x000, src: Specifier::X0 },
            0,
        )
        .err()
        .unwrap();
        assert!(matches!(err, ExecuteError::Fatal(HartError::InvalidCsr(0x000))));
    }

    #[test]
    fn test_csrwi_skips_write_when_immediate_is_zero() {
        let mut memory = [0u8; 4];
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        hart.cs_registers.set_mepc(0x20);
        execute(
            &mut hart,
            Instruction::Csri { op: CsrOp::ReadClear, dest: Specifier::from_u5(1), csr: csr::MEPC, immediate: 0 },
            0,
        )
        .unwrap();
        assert_eq!(0x20, hart.x(Specifier::from_u5(1)));
        assert_eq!(0x20, hart.cs_registers().mepc());
    }

    #[test]
    fn test_pmp_csr_reads_zero_and_discards_writes() {
        let mut memory = [0u8; 4];
        let mut hart = Hart::new(&mut memory, Config::default(), 0);
        execute(
            &mut hart,
            Instruction::Csr {
                op: CsrOp::ReadWrite,
                dest: Specifier::from_u5(1),
                csr: csr::PMPADDR_BASE,
                src: Specifier::from_u5(2),
            },
            0,
        )
        .unwrap();
        assert_eq!(0, hart.x(Specifier::from_u5(1)));
    }
}
