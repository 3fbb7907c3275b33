//! A runtime x86/x86-64 assembler and compiler core.
//!
//! `anvil-x86` encodes machine instructions at runtime, byte-exact against
//! the Intel SDM, and hands back relocatable code:
//!
//! - a machine-checked [instruction database](inst) with per-mnemonic
//!   encoding records and operand signatures;
//! - a validator that matches operand tuples against those signatures and
//!   an [encoder](Assembler) covering the legacy, REX, VEX and EVEX prefix
//!   families, including AVX-512 masking, broadcast and compressed
//!   displacements;
//! - a [`CodeHolder`] with sections, forward/backward labels and
//!   relocations;
//! - a [`Compiler`] front-end with virtual registers, a linear-scan
//!   register allocator and calling-convention aware prologue/epilogue
//!   synthesis;
//! - a [`JitRuntime`] helper mapping finished code into executable pages.
//!
//! ```
//! use anvil_x86::{Assembler, CodeHolder, Environment};
//! use anvil_x86::regs::*;
//!
//! let mut holder = CodeHolder::new(Environment::x64());
//! let mut asm = Assembler::new(&mut holder);
//! asm.add(RBX, RCX)?;
//! asm.ret()?;
//! drop(asm);
//! assert_eq!(holder.section(0).data(), &[0x48, 0x01, 0xcb, 0xc3]);
//! # Ok::<(), anvil_x86::AsmError>(())
//! ```

mod asm;
mod buffer;
pub mod compiler;
mod cpu;
mod encode;
mod error;
pub mod inst;
mod matcher;
mod memory;
mod operand;
mod reg;

pub use asm::{Assembler, InstOptions, RoundingMode};
pub use buffer::{CodeHolder, CodeOffset, FixupKind, Section, SectionFlags, SectionId};
pub use compiler::{CallConv, Compiler, FuncSignature, VType};
pub use cpu::{Arch, ArchMask, CpuFeatures, Environment};
pub use error::{AsmError, AsmResult};
pub use inst::{find_inst, get_inst, Mnemonic};
pub use memory::{ExecAllocator, ExecutableCode, JitRuntime, SystemAllocator};
pub use operand::{
    byte_ptr, dword_ptr, ptr, qword_ptr, word_ptr, xmmword_ptr, ymmword_ptr, zmmword_ptr,
    Broadcast, Imm, Label, Mem, Operand,
};
pub use reg::{enc, regs, Reg, RegClass};
