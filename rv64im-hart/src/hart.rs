//! The hart: durable architectural state plus the fetch/decode/execute loop.

use log::debug;

use crate::config::Config;
use crate::cs_registers::CsRegisters;
use crate::error::HartError;
use crate::exception::Exception;
use crate::execute::{self, ExecuteError};
use crate::instruction::{DecodeError, Instruction};
use crate::memory;
use crate::privilege::PrivilegeLevel;
use crate::registers::{Registers, Specifier};

/// A single RV64IM hart with Zicsr and the machine/supervisor privileged-architecture subset.
///
/// The hart does not own its memory; the caller supplies a mutable byte buffer whose lifetime
/// must outlive the hart.
#[derive(Debug)]
pub struct Hart<'m> {
    pub(crate) registers: Registers,
    pub(crate) cs_registers: CsRegisters,
    pub(crate) privilege_level: PrivilegeLevel,
    pub(crate) config: Config,
    pub(crate) memory: &'m mut [u8],
}

impl<'m> Hart<'m> {
    /// Creates a hart over `memory`, with `pc` set to `initial_pc` and all other state at its
    /// architectural default (see [`crate::cs_registers::CsRegisters::default`]).
    pub fn new(memory: &'m mut [u8], config: Config, initial_pc: u64) -> Self {
        Self {
            registers: Registers::new(initial_pc),
            cs_registers: CsRegisters::new(),
            privilege_level: PrivilegeLevel::Machine,
            config,
            memory,
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn cs_registers(&self) -> &CsRegisters {
        &self.cs_registers
    }

    pub fn privilege_level(&self) -> PrivilegeLevel {
        self.privilege_level
    }

    pub fn pc(&self) -> u64 {
        self.registers.pc()
    }

    pub fn x(&self, specifier: Specifier) -> u64 {
        self.registers.x(specifier)
    }

    /// Fetches, decodes, and executes exactly one instruction.
    ///
    /// Architectural exceptions are recovered locally (the trap machinery runs and `Ok(())` is
    /// returned); only host-level failures are returned as `Err`.
    pub fn step(&mut self) -> Result<(), HartError> {
        let pc = self.registers.pc();

        if pc % 4 != 0 {
            self.enter_trap(Exception::InstructionAddressMisaligned(pc));
            return Ok(());
        }

        let raw_instruction = match memory::read::<4>(self.memory, pc) {
            Some(word) => word as u32,
            None => {
                if self.config.execution_out_of_bounds_is_fatal {
                    return Err(HartError::ExecutionOutOfBounds { address: pc, width: 4 });
                }
                self.enter_trap(Exception::InstructionAccessFault(pc));
                return Ok(());
            }
        };

        let instruction = match Instruction::decode(raw_instruction) {
            Ok(instruction) => instruction,
            Err(DecodeError::UnsupportedOpcode | DecodeError::IllegalInstruction) => {
                if self.config.unrecognized_instruction_is_fatal {
                    return Err(HartError::UnimplementedOpcode(raw_instruction));
                }
                self.enter_trap(Exception::IllegalInstruction(raw_instruction as u64));
                return Ok(());
            }
        };

        match execute::execute(self, instruction, raw_instruction) {
            Ok(()) => Ok(()),
            Err(ExecuteError::Exception(exception)) => {
                self.enter_trap(exception);
                Ok(())
            }
            Err(ExecuteError::Fatal(error)) => Err(error),
        }
    }

    /// Runs [`Self::step`] until a host-level failure terminates execution.
    pub fn run(&mut self) -> Result<(), HartError> {
        loop {
            self.step()?;
        }
    }

    /// Delivers an architectural exception: routes to Supervisor or Machine per `medeleg`,
    /// updates cause/value/previous-privilege/interrupt-enable state, and jumps to the vector
    /// base.
    ///
    /// Vectored mode is accepted on `mtvec`/`stvec` but behaves identically to Direct: this core
    /// only ever delivers synchronous exceptions, never interrupts, so there is no cause-indexed
    /// vector table entry to jump to.
    fn enter_trap(&mut self, exception: Exception) {
        let code = exception.code();
        let trap_value = exception.trap_value();
        let pc = self.registers.pc();

        if self.privilege_level < PrivilegeLevel::Machine && self.cs_registers.is_delegated(code) {
            debug!(code, trap_value, pc; "delivering exception to supervisor mode");
            self.cs_registers.set_scause(code, false);
            self.cs_registers.set_stval(trap_value);
            self.cs_registers.set_spp(self.privilege_level);
            let sie = self.cs_registers.sie();
            self.cs_registers.set_spie(sie);
            self.cs_registers.set_sie(false);
            self.cs_registers.set_sepc(pc);
            *self.registers.pc_mut() = self.cs_registers.stvec_base();
            self.privilege_level = PrivilegeLevel::Supervisor;
        } else {
            debug!(code, trap_value, pc; "delivering exception to machine mode");
            self.cs_registers.set_mcause(code, false);
            self.cs_registers.set_mtval(trap_value);
            self.cs_registers.set_mpp(self.privilege_level);
            let mie = self.cs_registers.mie();
            self.cs_registers.set_mpie(mie);
            self.cs_registers.set_mie(false);
            self.cs_registers.set_mepc(pc);
            *self.registers.pc_mut() = self.cs_registers.mtvec_base();
            self.privilege_level = PrivilegeLevel::Machine;
        }
    }
}
