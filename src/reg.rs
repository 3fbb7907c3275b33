//! Register classes and register values.
//!
//! A [`Reg`] packs a class and an identifier. Identifiers below
//! [`Reg::FIRST_VIRTUAL`] name physical registers and can be asked for their
//! hardware encoding; identifiers at or above it are virtual registers minted
//! by the compiler front-end and must be rewritten by register allocation
//! before encoding.

use core::fmt;

/// Classes of architectural registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RegClass {
    /// 8-bit general purpose, low byte (AL, CL, .., R15B; includes SPL/BPL/SIL/DIL).
    GpbLo,
    /// 8-bit general purpose, high byte (AH, CH, DH, BH).
    GpbHi,
    /// 16-bit general purpose.
    Gpw,
    /// 32-bit general purpose.
    Gpd,
    /// 64-bit general purpose.
    Gpq,
    /// 128-bit SSE vector.
    Xmm,
    /// 256-bit AVX vector.
    Ymm,
    /// 512-bit AVX-512 vector.
    Zmm,
    /// AVX-512 mask register (k0..k7).
    KMask,
    /// 64-bit MMX register.
    Mm,
    /// x87 stack register st(0)..st(7).
    St,
    /// Segment register (ES, CS, SS, DS, FS, GS).
    Seg,
    /// Control register.
    Cr,
    /// Debug register.
    Dr,
    /// MPX bound register.
    Bnd,
}

impl RegClass {
    /// Size in bytes of a register in this class; 0 for classes without a
    /// meaningful data width (segment/control/debug).
    #[must_use]
    pub fn size(self) -> u32 {
        match self {
            RegClass::GpbLo | RegClass::GpbHi => 1,
            RegClass::Gpw | RegClass::Seg => 2,
            RegClass::Gpd => 4,
            RegClass::Gpq | RegClass::Mm | RegClass::KMask => 8,
            RegClass::St | RegClass::Cr | RegClass::Dr => 0,
            RegClass::Bnd | RegClass::Xmm => 16,
            RegClass::Ymm => 32,
            RegClass::Zmm => 64,
        }
    }

    /// True for the general-purpose classes.
    #[must_use]
    pub fn is_gp(self) -> bool {
        matches!(
            self,
            RegClass::GpbLo | RegClass::GpbHi | RegClass::Gpw | RegClass::Gpd | RegClass::Gpq
        )
    }

    /// True for the XMM/YMM/ZMM classes.
    #[must_use]
    pub fn is_vec(self) -> bool {
        matches!(self, RegClass::Xmm | RegClass::Ymm | RegClass::Zmm)
    }

    /// Number of architectural registers in the class for the 64-bit mode.
    #[must_use]
    pub fn count_x64(self) -> u16 {
        match self {
            RegClass::GpbHi => 4,
            RegClass::St | RegClass::Mm | RegClass::KMask | RegClass::Dr => 8,
            RegClass::Seg => 6,
            RegClass::Bnd => 4,
            RegClass::Cr => 9,
            RegClass::Xmm | RegClass::Ymm | RegClass::Zmm => 32,
            _ => 16,
        }
    }
}

/// A register operand: a class plus an identifier.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Reg {
    class: RegClass,
    id: u16,
}

impl Reg {
    /// Identifiers at or above this value denote virtual registers.
    pub const FIRST_VIRTUAL: u16 = 0x100;

    /// Create a register from a class and identifier.
    #[must_use]
    pub const fn new(class: RegClass, id: u16) -> Reg {
        Reg { class, id }
    }

    /// The register's class.
    #[must_use]
    pub const fn class(self) -> RegClass {
        self.class
    }

    /// The raw identifier (virtual ids included).
    #[must_use]
    pub const fn id(self) -> u16 {
        self.id
    }

    /// True for identifiers minted by the compiler front-end.
    #[must_use]
    pub const fn is_virtual(self) -> bool {
        self.id >= Reg::FIRST_VIRTUAL
    }

    /// The hardware encoding used in ModR/M, SIB and prefix fields.
    ///
    /// The low three bits select within a bank; bit 3 lands in REX/VEX and
    /// bit 4 in the EVEX high-register extensions. High-byte registers
    /// (AH..BH) occupy encodings 4..7 of the byte bank.
    ///
    /// # Panics
    ///
    /// Panics if the register is virtual; the register allocator must have
    /// replaced it before encoding.
    #[must_use]
    pub fn enc(self) -> u8 {
        assert!(!self.is_virtual(), "virtual register reached the encoder");
        match self.class {
            RegClass::GpbHi => {
                debug_assert!(self.id < 4);
                self.id as u8 + 4
            }
            _ => self.id as u8,
        }
    }

    /// Size in bytes of the value the register holds.
    #[must_use]
    pub fn size(self) -> u32 {
        self.class.size()
    }

    /// True for any of SPL/BPL/SIL/DIL, which require a REX prefix to be
    /// addressable as byte registers.
    #[must_use]
    pub fn is_uniform_byte(self) -> bool {
        self.class == RegClass::GpbLo && (4..8).contains(&self.id)
    }

    /// True for AH/CH/DH/BH, which cannot be encoded together with any REX
    /// prefix.
    #[must_use]
    pub fn is_high_byte(self) -> bool {
        self.class == RegClass::GpbHi
    }

    /// Widen or narrow a general-purpose register to another GP class,
    /// keeping the identifier. High-byte registers convert via their low
    /// counterpart.
    #[must_use]
    pub fn with_class(self, class: RegClass) -> Reg {
        Reg { class, id: self.id }
    }

    /// The register's assembly name.
    #[must_use]
    pub fn name(self) -> String {
        if self.is_virtual() {
            return format!("v{}", self.id - Reg::FIRST_VIRTUAL);
        }
        let i = self.id as usize;
        match self.class {
            RegClass::GpbLo => names::GPB_LO[i].to_string(),
            RegClass::GpbHi => names::GPB_HI[i].to_string(),
            RegClass::Gpw => names::GPW[i].to_string(),
            RegClass::Gpd => names::GPD[i].to_string(),
            RegClass::Gpq => names::GPQ[i].to_string(),
            RegClass::Xmm => format!("xmm{i}"),
            RegClass::Ymm => format!("ymm{i}"),
            RegClass::Zmm => format!("zmm{i}"),
            RegClass::KMask => format!("k{i}"),
            RegClass::Mm => format!("mm{i}"),
            RegClass::St => format!("st{i}"),
            RegClass::Seg => names::SEG[i].to_string(),
            RegClass::Cr => format!("cr{i}"),
            RegClass::Dr => format!("dr{i}"),
            RegClass::Bnd => format!("bnd{i}"),
        }
    }
}

impl fmt::Debug for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

mod names {
    pub(super) static GPB_LO: [&str; 16] = [
        "al", "cl", "dl", "bl", "spl", "bpl", "sil", "dil", "r8b", "r9b", "r10b", "r11b", "r12b",
        "r13b", "r14b", "r15b",
    ];
    pub(super) static GPB_HI: [&str; 4] = ["ah", "ch", "dh", "bh"];
    pub(super) static GPW: [&str; 16] = [
        "ax", "cx", "dx", "bx", "sp", "bp", "si", "di", "r8w", "r9w", "r10w", "r11w", "r12w",
        "r13w", "r14w", "r15w",
    ];
    pub(super) static GPD: [&str; 16] = [
        "eax", "ecx", "edx", "ebx", "esp", "ebp", "esi", "edi", "r8d", "r9d", "r10d", "r11d",
        "r12d", "r13d", "r14d", "r15d",
    ];
    pub(super) static GPQ: [&str; 16] = [
        "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11", "r12",
        "r13", "r14", "r15",
    ];
    pub(super) static SEG: [&str; 6] = ["es", "cs", "ss", "ds", "fs", "gs"];
}

/// Hardware encodings for the general-purpose bank.
pub mod enc {
    pub const RAX: u8 = 0;
    pub const RCX: u8 = 1;
    pub const RDX: u8 = 2;
    pub const RBX: u8 = 3;
    pub const RSP: u8 = 4;
    pub const RBP: u8 = 5;
    pub const RSI: u8 = 6;
    pub const RDI: u8 = 7;
}

/// Pre-built physical register constants.
pub mod regs {
    use super::{Reg, RegClass};

    macro_rules! bank {
        ($class:ident, $($name:ident = $id:expr),+ $(,)?) => {
            $(pub const $name: Reg = Reg::new(RegClass::$class, $id);)+
        };
    }

    bank!(GpbLo, AL = 0, CL = 1, DL = 2, BL = 3, SPL = 4, BPL = 5, SIL = 6, DIL = 7,
          R8B = 8, R9B = 9, R10B = 10, R11B = 11, R12B = 12, R13B = 13, R14B = 14, R15B = 15);
    bank!(GpbHi, AH = 0, CH = 1, DH = 2, BH = 3);
    bank!(Gpw, AX = 0, CX = 1, DX = 2, BX = 3, SP = 4, BP = 5, SI = 6, DI = 7,
          R8W = 8, R9W = 9, R10W = 10, R11W = 11, R12W = 12, R13W = 13, R14W = 14, R15W = 15);
    bank!(Gpd, EAX = 0, ECX = 1, EDX = 2, EBX = 3, ESP = 4, EBP = 5, ESI = 6, EDI = 7,
          R8D = 8, R9D = 9, R10D = 10, R11D = 11, R12D = 12, R13D = 13, R14D = 14, R15D = 15);
    bank!(Gpq, RAX = 0, RCX = 1, RDX = 2, RBX = 3, RSP = 4, RBP = 5, RSI = 6, RDI = 7,
          R8 = 8, R9 = 9, R10 = 10, R11 = 11, R12 = 12, R13 = 13, R14 = 14, R15 = 15);

    bank!(Xmm, XMM0 = 0, XMM1 = 1, XMM2 = 2, XMM3 = 3, XMM4 = 4, XMM5 = 5, XMM6 = 6, XMM7 = 7,
          XMM8 = 8, XMM9 = 9, XMM10 = 10, XMM11 = 11, XMM12 = 12, XMM13 = 13, XMM14 = 14,
          XMM15 = 15, XMM16 = 16, XMM17 = 17, XMM18 = 18, XMM19 = 19, XMM20 = 20, XMM21 = 21,
          XMM22 = 22, XMM23 = 23, XMM24 = 24, XMM25 = 25, XMM26 = 26, XMM27 = 27, XMM28 = 28,
          XMM29 = 29, XMM30 = 30, XMM31 = 31);
    bank!(Ymm, YMM0 = 0, YMM1 = 1, YMM2 = 2, YMM3 = 3, YMM4 = 4, YMM5 = 5, YMM6 = 6, YMM7 = 7,
          YMM8 = 8, YMM9 = 9, YMM10 = 10, YMM11 = 11, YMM12 = 12, YMM13 = 13, YMM14 = 14,
          YMM15 = 15, YMM16 = 16, YMM17 = 17, YMM18 = 18, YMM19 = 19, YMM20 = 20, YMM21 = 21,
          YMM22 = 22, YMM23 = 23, YMM24 = 24, YMM25 = 25, YMM26 = 26, YMM27 = 27, YMM28 = 28,
          YMM29 = 29, YMM30 = 30, YMM31 = 31);
    bank!(Zmm, ZMM0 = 0, ZMM1 = 1, ZMM2 = 2, ZMM3 = 3, ZMM4 = 4, ZMM5 = 5, ZMM6 = 6, ZMM7 = 7,
          ZMM8 = 8, ZMM9 = 9, ZMM10 = 10, ZMM11 = 11, ZMM12 = 12, ZMM13 = 13, ZMM14 = 14,
          ZMM15 = 15, ZMM16 = 16, ZMM17 = 17, ZMM18 = 18, ZMM19 = 19, ZMM20 = 20, ZMM21 = 21,
          ZMM22 = 22, ZMM23 = 23, ZMM24 = 24, ZMM25 = 25, ZMM26 = 26, ZMM27 = 27, ZMM28 = 28,
          ZMM29 = 29, ZMM30 = 30, ZMM31 = 31);
    bank!(KMask, K0 = 0, K1 = 1, K2 = 2, K3 = 3, K4 = 4, K5 = 5, K6 = 6, K7 = 7);
    bank!(Mm, MM0 = 0, MM1 = 1, MM2 = 2, MM3 = 3, MM4 = 4, MM5 = 5, MM6 = 6, MM7 = 7);
    bank!(St, ST0 = 0, ST1 = 1, ST2 = 2, ST3 = 3, ST4 = 4, ST5 = 5, ST6 = 6, ST7 = 7);
    bank!(Seg, ES = 0, CS = 1, SS = 2, DS = 3, FS = 4, GS = 5);
    bank!(Cr, CR0 = 0, CR2 = 2, CR3 = 3, CR4 = 4, CR8 = 8);
    bank!(Dr, DR0 = 0, DR1 = 1, DR2 = 2, DR3 = 3, DR6 = 6, DR7 = 7);
    bank!(Bnd, BND0 = 0, BND1 = 1, BND2 = 2, BND3 = 3);
}

#[cfg(test)]
mod tests {
    use super::regs::*;
    use super::*;

    #[test]
    fn encodings() {
        assert_eq!(RAX.enc(), 0);
        assert_eq!(R12.enc(), 12);
        assert_eq!(AH.enc(), 4);
        assert_eq!(BH.enc(), 7);
        assert_eq!(SPL.enc(), 4);
        assert!(SPL.is_uniform_byte());
        assert!(AH.is_high_byte());
        assert!(!AL.is_uniform_byte());
    }

    #[test]
    fn names() {
        assert_eq!(RAX.name(), "rax");
        assert_eq!(R10D.name(), "r10d");
        assert_eq!(XMM17.name(), "xmm17");
        assert_eq!(K3.name(), "k3");
        assert_eq!(Reg::new(RegClass::Gpq, Reg::FIRST_VIRTUAL + 2).name(), "v2");
    }

    #[test]
    fn virtual_ids() {
        let v = Reg::new(RegClass::Gpd, Reg::FIRST_VIRTUAL);
        assert!(v.is_virtual());
        assert!(!EAX.is_virtual());
    }
}
