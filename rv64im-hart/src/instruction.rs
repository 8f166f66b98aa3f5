//! Decodes a 32-bit RV64IM/Zicsr instruction word into a tagged [`Instruction`].

use crate::bits::sign_extend;
use crate::csr::CsrSpecifier;
use crate::registers::Specifier;
use log::trace;
use thiserror::Error;

/// Data structure that can hold any recognized instruction in its decoded form.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Instruction {
    OpImm {
        op: RegImmOp,
        dest: Specifier,
        src: Specifier,
        immediate: i64,
    },
    OpImmWord {
        op: RegImmOp,
        dest: Specifier,
        src: Specifier,
        immediate: i64,
    },
    OpShiftImm {
        op: RegShiftOp,
        dest: Specifier,
        src: Specifier,
        shift_amount: u32,
    },
    OpShiftImmWord {
        op: RegShiftOp,
        dest: Specifier,
        src: Specifier,
        shift_amount: u32,
    },
    Auipc {
        dest: Specifier,
        immediate: i64,
    },
    Lui {
        dest: Specifier,
        immediate: i64,
    },
    Op {
        op: RegRegOp,
        dest: Specifier,
        src1: Specifier,
        src2: Specifier,
    },
    OpWord {
        op: RegRegOp,
        dest: Specifier,
        src1: Specifier,
        src2: Specifier,
    },
    Jal {
        dest: Specifier,
        offset: i64,
    },
    Jalr {
        dest: Specifier,
        base: Specifier,
        offset: i64,
    },
    Branch {
        condition: BranchCondition,
        src1: Specifier,
        src2: Specifier,
        offset: i64,
    },
    Load {
        width: LoadWidth,
        dest: Specifier,
        base: Specifier,
        offset: i64,
    },
    Store {
        width: StoreWidth,
        src: Specifier,
        base: Specifier,
        offset: i64,
    },
    Fence {
        predecessor: FenceOrderCombination,
        successor: FenceOrderCombination,
    },
    Ecall,
    Ebreak,
    Mret,
    Csr {
        op: CsrOp,
        dest: Specifier,
        csr: CsrSpecifier,
        src: Specifier,
    },
    Csri {
        op: CsrOp,
        dest: Specifier,
        csr: CsrSpecifier,
        immediate: u32,
    },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegImmOp {
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegShiftOp {
    Slli,
    Srli,
    Srai,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegRegOp {
    Add,
    Slt,
    Sltu,
    And,
    Or,
    Xor,
    Sll,
    Srl,
    Sub,
    Sra,
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BranchCondition {
    Beq,
    Bne,
    Blt,
    Bltu,
    Bge,
    Bgeu,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoadWidth {
    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,
    Lwu,
    Ld,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StoreWidth {
    Sb,
    Sh,
    Sw,
    Sd,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FenceOrderCombination {
    pub device_input: bool,
    pub device_output: bool,
    pub memory_reads: bool,
    pub memory_writes: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CsrOp {
    /// Atomic Read/Write CSR.
    ReadWrite,
    /// Atomic Read and Set Bits in CSR.
    ReadSet,
    /// Atomic Read and Clear Bits in CSR.
    ReadClear,
}

impl Instruction {
    pub fn decode(raw_instruction: u32) -> Result<Self, DecodeError> {
        trace!(raw_instruction = raw_instruction; "decoding instruction");
        match opcode(raw_instruction).ok_or(DecodeError::UnsupportedOpcode)? {
            Opcode::OpImm => match i_funct(raw_instruction) {
                Some(op) => Ok(Self::OpImm {
                    op,
                    dest: rd(raw_instruction),
                    src: rs1(raw_instruction),
                    immediate: i_imm(raw_instruction),
                }),
                None => match i_shfunct(raw_instruction, 6) {
                    Some(op) => Ok(Self::OpShiftImm {
                        op,
                        dest: rd(raw_instruction),
                        src: rs1(raw_instruction),
                        shift_amount: shamt(raw_instruction, 6),
                    }),
                    None => Err(DecodeError::IllegalInstruction),
                },
            },
            Opcode::OpImm32 => match funct3(raw_instruction) {
                // ADDIW is the only non-shift instruction in this opcode class; there is no
                // SLTIW/XORIW/ORIW/ANDIW.
                0b000 => Ok(Self::OpImmWord {
                    op: RegImmOp::Addi,
                    dest: rd(raw_instruction),
                    src: rs1(raw_instruction),
                    immediate: i_imm(raw_instruction),
                }),
                _ => match i_shfunct(raw_instruction, 5) {
                    Some(op) => Ok(Self::OpShiftImmWord {
                        op,
                        dest: rd(raw_instruction),
                        src: rs1(raw_instruction),
                        shift_amount: shamt(raw_instruction, 5),
                    }),
                    None => Err(DecodeError::IllegalInstruction),
                },
            },
            Opcode::Auipc => Ok(Self::Auipc {
                dest: rd(raw_instruction),
                immediate: u_imm(raw_instruction),
            }),
            Opcode::Lui => Ok(Self::Lui {
                dest: rd(raw_instruction),
                immediate: u_imm(raw_instruction),
            }),
            Opcode::Op => match r_funct(raw_instruction) {
                Some(op) => Ok(Self::Op {
                    op,
                    dest: rd(raw_instruction),
                    src1: rs1(raw_instruction),
                    src2: rs2(raw_instruction),
                }),
                None => Err(DecodeError::IllegalInstruction),
            },
            Opcode::Op32 => match r_funct_32(raw_instruction) {
                Some(op) => Ok(Self::OpWord {
                    op,
                    dest: rd(raw_instruction),
                    src1: rs1(raw_instruction),
                    src2: rs2(raw_instruction),
                }),
                None => Err(DecodeError::IllegalInstruction),
            },
            Opcode::Jal => Ok(Self::Jal {
                dest: rd(raw_instruction),
                offset: j_imm(raw_instruction),
            }),
            Opcode::Jalr => {
                if funct3(raw_instruction) != 0b000 {
                    return Err(DecodeError::IllegalInstruction);
                }
                Ok(Self::Jalr {
                    dest: rd(raw_instruction),
                    base: rs1(raw_instruction),
                    offset: i_imm(raw_instruction),
                })
            }
            Opcode::Branch => match b_funct(raw_instruction) {
                Some(condition) => Ok(Self::Branch {
                    condition,
                    src1: rs1(raw_instruction),
                    src2: rs2(raw_instruction),
                    offset: b_imm(raw_instruction),
                }),
                None => Err(DecodeError::IllegalInstruction),
            },
            Opcode::Load => match i_width(raw_instruction) {
                Some(width) => Ok(Self::Load {
                    width,
                    dest: rd(raw_instruction),
                    base: rs1(raw_instruction),
                    offset: i_imm(raw_instruction),
                }),
                None => Err(DecodeError::IllegalInstruction),
            },
            Opcode::Store => match s_width(raw_instruction) {
                Some(width) => Ok(Self::Store {
                    width,
                    src: rs2(raw_instruction),
                    base: rs1(raw_instruction),
                    offset: s_imm(raw_instruction),
                }),
                None => Err(DecodeError::IllegalInstruction),
            },
            Opcode::MiscMem => match i_mem(raw_instruction) {
                Some(MemFunct::Fence) => {
                    // `fm`, `rd`, `rs1` are reserved for future fence variants; this core treats
                    // any encoding as an ordinary fence regardless of their value.
                    let predecessor = FenceOrderCombination {
                        device_input: (raw_instruction >> 27) & 0b1 == 1,
                        device_output: (raw_instruction >> 26) & 0b1 == 1,
                        memory_reads: (raw_instruction >> 25) & 0b1 == 1,
                        memory_writes: (raw_instruction >> 24) & 0b1 == 1,
                    };
                    let successor = FenceOrderCombination {
                        device_input: (raw_instruction >> 23) & 0b1 == 1,
                        device_output: (raw_instruction >> 22) & 0b1 == 1,
                        memory_reads: (raw_instruction >> 21) & 0b1 == 1,
                        memory_writes: (raw_instruction >> 20) & 0b1 == 1,
                    };
                    Ok(Self::Fence {
                        predecessor,
                        successor,
                    })
                }
                None => Err(DecodeError::IllegalInstruction),
            },
            Opcode::System => match i_sys(raw_instruction) {
                Some(sys) => match sys {
                    SysFunct::Priv => match sys_priv(raw_instruction) {
                        Some(sys_priv) => Ok(match sys_priv {
                            SysPriv::Ecall => Self::Ecall,
                            SysPriv::Ebreak => Self::Ebreak,
                            SysPriv::Mret => Self::Mret,
                        }),
                        None => Err(DecodeError::IllegalInstruction),
                    },
                    SysFunct::Csrrw | SysFunct::Csrrs | SysFunct::Csrrc => Ok(Instruction::Csr {
                        op: match sys {
                            SysFunct::Csrrw => CsrOp::ReadWrite,
                            SysFunct::Csrrs => CsrOp::ReadSet,
                            SysFunct::Csrrc => CsrOp::ReadClear,
                            _ => unreachable!(),
                        },
                        dest: rd(raw_instruction),
                        csr: csr(raw_instruction),
                        src: rs1(raw_instruction),
                    }),
                    SysFunct::Csrrwi | SysFunct::Csrrsi | SysFunct::Csrrci => {
                        Ok(Instruction::Csri {
                            op: match sys {
                                SysFunct::Csrrwi => CsrOp::ReadWrite,
                                SysFunct::Csrrsi => CsrOp::ReadSet,
                                SysFunct::Csrrci => CsrOp::ReadClear,
                                _ => unreachable!(),
                            },
                            dest: rd(raw_instruction),
                            csr: csr(raw_instruction),
                            immediate: u32::from(rs1(raw_instruction)),
                        })
                    }
                },
                None => Err(DecodeError::IllegalInstruction),
            },
        }
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum DecodeError {
    #[error("instruction has unsupported opcode")]
    UnsupportedOpcode,
    #[error("illegal instruction")]
    IllegalInstruction,
}

/// Returns the 7-bit *opcode* value of the instruction, or `None` if it isn't supported.
fn opcode(raw_instruction: u32) -> Option<Opcode> {
    #[allow(clippy::unusual_byte_groupings)]
    match raw_instruction & 0x7F {
        0b00_000_11 => Some(Opcode::Load),
        0b00_011_11 => Some(Opcode::MiscMem),
        0b00_100_11 => Some(Opcode::OpImm),
        0b00_101_11 => Some(Opcode::Auipc),
        0b00_110_11 => Some(Opcode::OpImm32),
        0b01_000_11 => Some(Opcode::Store),
        0b01_100_11 => Some(Opcode::Op),
        0b01_101_11 => Some(Opcode::Lui),
        0b01_110_11 => Some(Opcode::Op32),
        0b11_000_11 => Some(Opcode::Branch),
        0b11_001_11 => Some(Opcode::Jalr),
        0b11_011_11 => Some(Opcode::Jal),
        0b11_100_11 => Some(Opcode::System),
        _ => None,
    }
}

/// Returns the 5-bit *rd* value for R-type, I-type, U-type, J-type instructions.
fn rd(raw_instruction: u32) -> Specifier {
    Specifier::from_u5(((raw_instruction >> 7) & 0x1F) as u8)
}

/// Returns the 5-bit *rs1* value for R-type, I-type, S-type, B-type instructions.
fn rs1(raw_instruction: u32) -> Specifier {
    Specifier::from_u5(((raw_instruction >> 15) & 0x1F) as u8)
}

/// Returns the 5-bit *rs2* value for R-type, S-type, B-type instructions.
fn rs2(raw_instruction: u32) -> Specifier {
    Specifier::from_u5(((raw_instruction >> 20) & 0x1F) as u8)
}

fn csr(raw_instruction: u32) -> CsrSpecifier {
    (raw_instruction >> 20) as u16
}

fn i_funct(raw_instruction: u32) -> Option<RegImmOp> {
    match funct3(raw_instruction) {
        0b000 => Some(RegImmOp::Addi),
        0b010 => Some(RegImmOp::Slti),
        0b011 => Some(RegImmOp::Sltiu),
        0b100 => Some(RegImmOp::Xori),
        0b110 => Some(RegImmOp::Ori),
        0b111 => Some(RegImmOp::Andi),
        _ => None,
    }
}

/// Decodes the shift-immediate funct, given the width (in bits) of the `shamt` field: 6 bits
/// (`[25:20]`) for 64-bit shifts, where the shift-type discriminator is the 6-bit `funct6` in
/// `[31:26]` (bit 25 belongs to `shamt`); 5 bits (`[24:20]`) for the 32-bit `*IW` forms, where
/// `shamt` leaves the full 7-bit `funct7` free as the discriminator.
///
/// Any other discriminator value is a reserved encoding and decodes as `None`, matching how
/// [`r_funct`] rejects unrecognized `funct7` values.
fn i_shfunct(raw_instruction: u32, shamt_width: u32) -> Option<RegShiftOp> {
    if shamt_width == 6 {
        let funct6 = (raw_instruction >> 26) & 0x3F;
        return match (funct6, funct3(raw_instruction)) {
            (0b000000, 0b001) => Some(RegShiftOp::Slli),
            (0b000000, 0b101) => Some(RegShiftOp::Srli),
            (0b010000, 0b101) => Some(RegShiftOp::Srai),
            _ => None,
        };
    }
    match (funct7(raw_instruction), funct3(raw_instruction)) {
        (0b0000000, 0b001) => Some(RegShiftOp::Slli),
        (0b0000000, 0b101) => Some(RegShiftOp::Srli),
        (0b0100000, 0b101) => Some(RegShiftOp::Srai),
        _ => None,
    }
}

fn i_sys(raw_instruction: u32) -> Option<SysFunct> {
    match funct3(raw_instruction) {
        0b000 => Some(SysFunct::Priv),
        0b001 => Some(SysFunct::Csrrw),
        0b010 => Some(SysFunct::Csrrs),
        0b011 => Some(SysFunct::Csrrc),
        0b101 => Some(SysFunct::Csrrwi),
        0b110 => Some(SysFunct::Csrrsi),
        0b111 => Some(SysFunct::Csrrci),
        _ => None,
    }
}

fn sys_priv(raw_instruction: u32) -> Option<SysPriv> {
    if u8::from(rd(raw_instruction)) != 0 || u8::from(rs1(raw_instruction)) != 0 {
        return None;
    }
    let funct = funct12(raw_instruction);
    match funct {
        0 => Some(SysPriv::Ecall),
        1 => Some(SysPriv::Ebreak),
        0b0011000_00010 => Some(SysPriv::Mret),
        _ => None,
    }
}

fn i_mem(raw_instruction: u32) -> Option<MemFunct> {
    match funct3(raw_instruction) {
        0b000 => Some(MemFunct::Fence),
        _ => None,
    }
}

fn i_width(raw_instruction: u32) -> Option<LoadWidth> {
    match funct3(raw_instruction) {
        0b000 => Some(LoadWidth::Lb),
        0b001 => Some(LoadWidth::Lh),
        0b010 => Some(LoadWidth::Lw),
        0b011 => Some(LoadWidth::Ld),
        0b100 => Some(LoadWidth::Lbu),
        0b101 => Some(LoadWidth::Lhu),
        0b110 => Some(LoadWidth::Lwu),
        _ => None,
    }
}

fn s_width(raw_instruction: u32) -> Option<StoreWidth> {
    match funct3(raw_instruction) {
        0b000 => Some(StoreWidth::Sb),
        0b001 => Some(StoreWidth::Sh),
        0b010 => Some(StoreWidth::Sw),
        0b011 => Some(StoreWidth::Sd),
        _ => None,
    }
}

fn r_funct(raw_instruction: u32) -> Option<RegRegOp> {
    match (funct7(raw_instruction), funct3(raw_instruction)) {
        (0b0000000, 0b000) => Some(RegRegOp::Add),
        (0b0000000, 0b001) => Some(RegRegOp::Sll),
        (0b0000000, 0b010) => Some(RegRegOp::Slt),
        (0b0000000, 0b011) => Some(RegRegOp::Sltu),
        (0b0000000, 0b100) => Some(RegRegOp::Xor),
        (0b0000000, 0b101) => Some(RegRegOp::Srl),
        (0b0000000, 0b110) => Some(RegRegOp::Or),
        (0b0000000, 0b111) => Some(RegRegOp::And),
        (0b0100000, 0b000) => Some(RegRegOp::Sub),
        (0b0100000, 0b101) => Some(RegRegOp::Sra),
        // funct7 == MULDIV
        (0b0000001, 0b000) => Some(RegRegOp::Mul),
        (0b0000001, 0b001) => Some(RegRegOp::Mulh),
        (0b0000001, 0b010) => Some(RegRegOp::Mulhsu),
        (0b0000001, 0b011) => Some(RegRegOp::Mulhu),
        (0b0000001, 0b100) => Some(RegRegOp::Div),
        (0b0000001, 0b101) => Some(RegRegOp::Divu),
        (0b0000001, 0b110) => Some(RegRegOp::Rem),
        (0b0000001, 0b111) => Some(RegRegOp::Remu),
        _ => None,
    }
}

/// Same as [`r_funct`], restricted to the subset valid in the OP-32 opcode class (`ADDW`/`SUBW`/
/// `SLLW`/`SRLW`/`SRAW`/`MULW`/`DIVW`/`DIVUW`/`REMW`/`REMUW`; there is no `SLTW`/`ANDW`/etc).
fn r_funct_32(raw_instruction: u32) -> Option<RegRegOp> {
    match (funct7(raw_instruction), funct3(raw_instruction)) {
        (0b0000000, 0b000) => Some(RegRegOp::Add),
        (0b0100000, 0b000) => Some(RegRegOp::Sub),
        (0b0000000, 0b001) => Some(RegRegOp::Sll),
        (0b0000000, 0b101) => Some(RegRegOp::Srl),
        (0b0100000, 0b101) => Some(RegRegOp::Sra),
        (0b0000001, 0b000) => Some(RegRegOp::Mul),
        (0b0000001, 0b100) => Some(RegRegOp::Div),
        (0b0000001, 0b101) => Some(RegRegOp::Divu),
        (0b0000001, 0b110) => Some(RegRegOp::Rem),
        (0b0000001, 0b111) => Some(RegRegOp::Remu),
        _ => None,
    }
}

fn b_funct(raw_instruction: u32) -> Option<BranchCondition> {
    match funct3(raw_instruction) {
        0b000 => Some(BranchCondition::Beq),
        0b001 => Some(BranchCondition::Bne),
        0b100 => Some(BranchCondition::Blt),
        0b101 => Some(BranchCondition::Bge),
        0b110 => Some(BranchCondition::Bltu),
        0b111 => Some(BranchCondition::Bgeu),
        _ => None,
    }
}

/// Returns the 3-bit *funct3* value for R-type, I-type, S-type, B-type instructions.
fn funct3(raw_instruction: u32) -> u8 {
    ((raw_instruction >> 12) & 0b111) as u8
}

/// Returns the 7-bit *funct7* value for R-type instructions.
fn funct7(raw_instruction: u32) -> u8 {
    (raw_instruction >> 25) as u8
}

/// Returns the shift amount: 6 bits (`[25:20]`) for 64-bit shifts, 5 bits (`[24:20]`) for the
/// 32-bit `*IW` forms.
fn shamt(raw_instruction: u32, width: u32) -> u32 {
    (raw_instruction >> 20) & ((1 << width) - 1)
}

/// Returns the 12-bit I-immediate sign-extended to 64 bits.
fn i_imm(raw_instruction: u32) -> i64 {
    sign_extend((raw_instruction >> 20) as u64, 12)
}

/// Returns the 12-bit zero-extended funct used by SYSTEM/PRIV instructions.
fn funct12(raw_instruction: u32) -> u32 {
    raw_instruction >> 20
}

/// Returns the 12-bit S-immediate sign-extended to 64 bits.
fn s_imm(raw_instruction: u32) -> i64 {
    let imm_11_5 = (raw_instruction >> 25) & 0x7F;
    let imm_4_0 = (raw_instruction >> 7) & 0x1F;
    sign_extend(((imm_11_5 << 5) | imm_4_0) as u64, 12)
}

/// Returns the 13-bit B-immediate sign-extended to 64 bits. Bit 0 is always `0`.
fn b_imm(raw_instruction: u32) -> i64 {
    let imm_12 = (raw_instruction >> 31) & 0x1;
    let imm_10_5 = (raw_instruction >> 25) & 0x3F;
    let imm_4_1 = (raw_instruction >> 8) & 0xF;
    let imm_11 = (raw_instruction >> 7) & 0x1;
    let value = (imm_12 << 12) | (imm_11 << 11) | (imm_10_5 << 5) | (imm_4_1 << 1);
    sign_extend(value as u64, 13)
}

/// Returns the signed 64-bit U-immediate (top 20 bits, shifted into position, sign-extended).
fn u_imm(raw_instruction: u32) -> i64 {
    sign_extend((raw_instruction & 0xFFFF_F000) as u64, 32)
}

/// Returns the 21-bit J-immediate sign-extended to 64 bits. Bit 0 is always `0`.
fn j_imm(raw_instruction: u32) -> i64 {
    let imm_20 = (raw_instruction >> 31) & 0x1;
    let imm_10_1 = (raw_instruction >> 21) & 0x3FF;
    let imm_11 = (raw_instruction >> 20) & 0x1;
    let imm_19_12 = (raw_instruction >> 12) & 0xFF;
    let value = (imm_20 << 20) | (imm_19_12 << 12) | (imm_11 << 11) | (imm_10_1 << 1);
    sign_extend(value as u64, 21)
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Opcode {
    OpImm,
    OpImm32,
    Auipc,
    Lui,
    Op,
    Op32,
    Jal,
    Jalr,
    Branch,
    Load,
    Store,
    MiscMem,
    System,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum SysFunct {
    Priv,
    Csrrw,
    Csrrs,
    Csrrc,
    Csrrwi,
    Csrrsi,
    Csrrci,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum SysPriv {
    Ecall,
    Ebreak,
    Mret,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum MemFunct {
    Fence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i_imm() {
        assert_eq!(0, i_imm(0x0000_0000));
        assert_eq!(-1, i_imm(0xFFF0_0000));
        assert_eq!(2047, i_imm(2047 << 20));
        assert_eq!(-2048, i_imm(0x8000_0000));
        assert_eq!(-42, i_imm((-42_i32 << 20) as u32));
    }

    #[test]
    fn test_s_imm() {
        // sw x2, -4(x1): imm = -4
        assert_eq!(-4, s_imm(0xFE20_AE23));
        assert_eq!(0, s_imm(0));
    }

    #[test]
    fn test_b_imm_offset_8() {
        // BEQ x1, x1, +8 => 0x00108463
        assert_eq!(8, b_imm(0x0010_8463));
    }

    #[test]
    fn test_j_imm_zero() {
        assert_eq!(0, j_imm(0x0000_006F));
    }

    #[test]
    fn test_u_imm_sign_extends() {
        assert_eq!(-0x1000, u_imm(0xFFFF_F000));
        assert_eq!(0x7FFF_F000, u_imm(0x7FFF_F000));
    }

    #[test]
    fn test_decode_simple_add_program() {
        // addi x1, x0, 5
        assert_eq!(
            Instruction::OpImm {
                op: RegImmOp::Addi,
                dest: Specifier::from_u5(1),
                src: Specifier::X0,
                immediate: 5,
            },
            Instruction::decode(0x0050_0093).unwrap()
        );
        // add x3, x1, x2
        assert_eq!(
            Instruction::Op {
                op: RegRegOp::Add,
                dest: Specifier::from_u5(3),
                src1: Specifier::from_u5(1),
                src2: Specifier::from_u5(2),
            },
            Instruction::decode(0x0020_81B3).unwrap()
        );
    }

    #[test]
    fn test_decode_csrrs_zero_rs1() {
        // csrrs x10, mepc, x0
        assert_eq!(
            Instruction::Csr {
                op: CsrOp::ReadSet,
                dest: Specifier::from_u5(10),
                csr: 0x341,
                src: Specifier::X0,
            },
            Instruction::decode(0x3410_2573).unwrap()
        );
    }

    #[test]
    fn test_decode_word_variants() {
        // addiw x1, x0, 5
        assert_eq!(
            Instruction::OpImmWord {
                op: RegImmOp::Addi,
                dest: Specifier::from_u5(1),
                src: Specifier::X0,
                immediate: 5,
            },
            Instruction::decode(0x0050_009B).unwrap()
        );
    }

    #[test]
    fn test_decode_shift_immediate_reserved_funct6_is_illegal() {
        // A 64-bit shift-immediate encoding with funct6 = 0b000001 (neither SLLI/SRLI's 0b000000
        // nor SRAI's 0b010000) is reserved, even though bit 30 alone reads as 0.
        assert_eq!(
            DecodeError::IllegalInstruction,
            Instruction::decode(0x0401_1093).unwrap_err()
        );
    }

    #[test]
    fn test_decode_mret() {
        assert_eq!(Instruction::Mret, Instruction::decode(0x3020_0073).unwrap());
    }

    #[test]
    fn test_decode_amo_opcode_is_unsupported() {
        // AMO opcode (0b0101111) is not part of the recognized set.
        assert_eq!(
            DecodeError::UnsupportedOpcode,
            Instruction::decode(0x0000_002F).unwrap_err()
        );
    }

    #[test]
    fn test_decode_unsupported_opcode() {
        assert_eq!(
            DecodeError::UnsupportedOpcode,
            Instruction::decode(0xFFFF_FFFF).unwrap_err()
        );
    }
}
