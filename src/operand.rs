//! Instruction operands: registers, memory references, immediates, labels.
//!
//! Operands are small tagged values, cheap to copy and to store in the
//! compiler front-end's node list. Memory operands normalize every x86
//! addressing shape (base, base+index*scale, label-anchored) into one record;
//! the encoder decides ModR/M/SIB/displacement layout from it.

use crate::reg::{Reg, RegClass};
use core::fmt;

/// A label reference; create and bind through a
/// [`CodeHolder`](crate::CodeHolder).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(pub(crate) u32);

impl Label {
    /// The identifier inside the owning holder.
    #[must_use]
    pub fn id(self) -> u32 {
        self.0
    }
}

/// EVEX embedded-broadcast selection for a memory operand.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Broadcast {
    #[default]
    None,
    B1To2,
    B1To4,
    B1To8,
    B1To16,
}

impl Broadcast {
    /// Number of elements the scalar is repeated into.
    #[must_use]
    pub fn count(self) -> u32 {
        match self {
            Broadcast::None => 1,
            Broadcast::B1To2 => 2,
            Broadcast::B1To4 => 4,
            Broadcast::B1To8 => 8,
            Broadcast::B1To16 => 16,
        }
    }
}

/// A memory operand.
///
/// Exactly one of `base` or `label` anchors the address (an index register
/// may accompany a base). Label-anchored operands encode RIP-relative in
/// 64-bit mode and as absolute-address relocations in 32-bit mode.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Mem {
    base: Option<Reg>,
    index: Option<Reg>,
    shift: u8,
    disp: i32,
    label: Option<Label>,
    segment: Option<Reg>,
    size: u8,
    broadcast: Broadcast,
}

impl Mem {
    /// `[base]`.
    #[must_use]
    pub fn base(base: Reg) -> Mem {
        Mem {
            base: Some(base),
            index: None,
            shift: 0,
            disp: 0,
            label: None,
            segment: None,
            size: 0,
            broadcast: Broadcast::None,
        }
    }

    /// `[label]`: RIP-relative in 64-bit mode, absolute in 32-bit mode.
    #[must_use]
    pub fn label(label: Label) -> Mem {
        Mem {
            base: None,
            index: None,
            shift: 0,
            disp: 0,
            label: Some(label),
            segment: None,
            size: 0,
            broadcast: Broadcast::None,
        }
    }

    /// Attach an index register scaled by `1 << shift` (shift in 0..=3).
    ///
    /// # Panics
    ///
    /// Panics if `shift > 3`.
    #[must_use]
    pub fn index(mut self, index: Reg, shift: u8) -> Mem {
        assert!(shift <= 3, "scale shift out of range");
        self.index = Some(index);
        self.shift = shift;
        self
    }

    /// Add a displacement.
    #[must_use]
    pub fn disp(mut self, disp: i32) -> Mem {
        self.disp = self.disp.wrapping_add(disp);
        self
    }

    /// Set the operand-size hint in bytes. Zero means "infer from the
    /// matched signature"; a nonzero hint must agree with it.
    #[must_use]
    pub fn size(mut self, bytes: u32) -> Mem {
        debug_assert!(bytes <= 64);
        self.size = bytes as u8;
        self
    }

    /// Attach a segment override.
    #[must_use]
    pub fn segment(mut self, seg: Reg) -> Mem {
        debug_assert_eq!(seg.class(), RegClass::Seg);
        self.segment = Some(seg);
        self
    }

    /// Request EVEX embedded broadcast (`{1toN}`).
    #[must_use]
    pub fn broadcast(mut self, bcst: Broadcast) -> Mem {
        self.broadcast = bcst;
        self
    }

    #[must_use]
    pub fn base_reg(&self) -> Option<Reg> {
        self.base
    }

    #[must_use]
    pub fn index_reg(&self) -> Option<Reg> {
        self.index
    }

    #[must_use]
    pub fn shift_amount(&self) -> u8 {
        self.shift
    }

    #[must_use]
    pub fn displacement(&self) -> i32 {
        self.disp
    }

    #[must_use]
    pub fn label_base(&self) -> Option<Label> {
        self.label
    }

    #[must_use]
    pub fn segment_override(&self) -> Option<Reg> {
        self.segment
    }

    #[must_use]
    pub fn size_hint(&self) -> u32 {
        u32::from(self.size)
    }

    #[must_use]
    pub fn broadcast_mode(&self) -> Broadcast {
        self.broadcast
    }

    /// True when the index register is a vector register (VSIB addressing).
    #[must_use]
    pub fn has_vector_index(&self) -> bool {
        self.index.is_some_and(|r| r.class().is_vec())
    }

    /// Rewrite the base register in place (register allocation).
    pub(crate) fn replace_base(&mut self, reg: Reg) {
        debug_assert!(self.base.is_some());
        self.base = Some(reg);
    }

    /// Rewrite the index register in place (register allocation).
    pub(crate) fn replace_index(&mut self, reg: Reg) {
        debug_assert!(self.index.is_some());
        self.index = Some(reg);
    }
}

impl fmt::Debug for Mem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut lead = false;
        if let Some(l) = self.label {
            write!(f, "L{}", l.id())?;
            lead = true;
        }
        if let Some(b) = self.base {
            write!(f, "{b}")?;
            lead = true;
        }
        if let Some(i) = self.index {
            if lead {
                write!(f, "+")?;
            }
            write!(f, "{i}*{}", 1u32 << self.shift)?;
        }
        if self.disp != 0 {
            write!(f, "{:+#x}", self.disp)?;
        }
        write!(f, "]")?;
        if !matches!(self.broadcast, Broadcast::None) {
            write!(f, "{{1to{}}}", self.broadcast.count())?;
        }
        Ok(())
    }
}

/// `[base]` shorthand.
#[must_use]
pub fn ptr(base: Reg) -> Mem {
    Mem::base(base)
}

macro_rules! sized_ptr {
    ($($name:ident => $bytes:expr),+ $(,)?) => {
        $(
            #[doc = concat!("`[base]` with an explicit ", stringify!($bytes), "-byte size hint.")]
            #[must_use]
            pub fn $name(base: Reg) -> Mem {
                Mem::base(base).size($bytes)
            }
        )+
    };
}

sized_ptr! {
    byte_ptr => 1,
    word_ptr => 2,
    dword_ptr => 4,
    qword_ptr => 8,
    xmmword_ptr => 16,
    ymmword_ptr => 32,
    zmmword_ptr => 64,
}

/// An immediate operand.
///
/// The encoding width is chosen by the matched signature, not by the stored
/// value; `signed` records how the caller-provided integer should be range
/// checked against the signature's allowed widths.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Imm {
    value: i64,
    signed: bool,
}

impl Imm {
    #[must_use]
    pub fn new(value: i64) -> Imm {
        Imm { value, signed: true }
    }

    #[must_use]
    pub fn new_unsigned(value: u64) -> Imm {
        #[allow(clippy::cast_possible_wrap)]
        Imm { value: value as i64, signed: false }
    }

    #[must_use]
    pub fn value(self) -> i64 {
        self.value
    }

    #[must_use]
    pub fn unsigned_value(self) -> u64 {
        #[allow(clippy::cast_sign_loss)]
        {
            self.value as u64
        }
    }

    #[must_use]
    pub fn is_signed(self) -> bool {
        self.signed
    }

    #[must_use]
    pub fn fits_i8(self) -> bool {
        i8::try_from(self.value).is_ok()
    }

    #[must_use]
    pub fn fits_u8(self) -> bool {
        !self.signed && u8::try_from(self.unsigned_value()).is_ok()
            || self.signed && (0..=0xff).contains(&self.value)
    }

    #[must_use]
    pub fn fits_i16(self) -> bool {
        i16::try_from(self.value).is_ok()
    }

    #[must_use]
    pub fn fits_u16(self) -> bool {
        (0..=0xffff).contains(&self.value) || (!self.signed && self.unsigned_value() <= 0xffff)
    }

    #[must_use]
    pub fn fits_i32(self) -> bool {
        i32::try_from(self.value).is_ok()
    }

    #[must_use]
    pub fn fits_u32(self) -> bool {
        if self.signed {
            (0..=0xffff_ffff).contains(&self.value)
        } else {
            self.unsigned_value() <= 0xffff_ffff
        }
    }
}

macro_rules! imm_from_signed {
    ($($t:ty),+) => {
        $(impl From<$t> for Imm {
            fn from(v: $t) -> Imm {
                Imm::new(i64::from(v))
            }
        })+
    };
}
imm_from_signed!(i8, i16, i32, i64);

macro_rules! imm_from_unsigned {
    ($($t:ty),+) => {
        $(impl From<$t> for Imm {
            fn from(v: $t) -> Imm {
                Imm::new_unsigned(u64::from(v))
            }
        })+
    };
}
imm_from_unsigned!(u8, u16, u32, u64);

macro_rules! operand_from_int {
    ($($t:ty),+) => {
        $(impl From<$t> for Operand {
            fn from(v: $t) -> Operand {
                Operand::Imm(Imm::from(v))
            }
        })+
    };
}
operand_from_int!(i8, i16, i32, i64, u8, u16, u32, u64);

/// An instruction operand.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Operand {
    #[default]
    None,
    Reg(Reg),
    Mem(Mem),
    Imm(Imm),
    Label(Label),
}

impl Operand {
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Operand::None)
    }

    #[must_use]
    pub fn as_reg(&self) -> Option<Reg> {
        match self {
            Operand::Reg(r) => Some(*r),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_mem(&self) -> Option<&Mem> {
        match self {
            Operand::Mem(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_imm(&self) -> Option<Imm> {
        match self {
            Operand::Imm(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_label(&self) -> Option<Label> {
        match self {
            Operand::Label(l) => Some(*l),
            _ => None,
        }
    }

    /// Data size in bytes, when the operand pins one (registers and sized
    /// memory hints); 0 otherwise.
    #[must_use]
    pub fn size(&self) -> u32 {
        match self {
            Operand::Reg(r) => r.size(),
            Operand::Mem(m) => m.size_hint(),
            _ => 0,
        }
    }
}

impl From<Reg> for Operand {
    fn from(r: Reg) -> Operand {
        Operand::Reg(r)
    }
}

impl From<Mem> for Operand {
    fn from(m: Mem) -> Operand {
        Operand::Mem(m)
    }
}

impl From<Imm> for Operand {
    fn from(i: Imm) -> Operand {
        Operand::Imm(i)
    }
}

impl From<Label> for Operand {
    fn from(l: Label) -> Operand {
        Operand::Label(l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reg::regs::*;

    #[test]
    fn mem_builder() {
        let m = ptr(RAX).index(RCX, 2).disp(8).size(4);
        assert_eq!(m.base_reg(), Some(RAX));
        assert_eq!(m.index_reg(), Some(RCX));
        assert_eq!(m.shift_amount(), 2);
        assert_eq!(m.displacement(), 8);
        assert_eq!(m.size_hint(), 4);
        assert!(!m.has_vector_index());
        assert!(ptr(RAX).index(XMM1, 1).has_vector_index());
    }

    #[test]
    fn imm_ranges() {
        assert!(Imm::new(-1).fits_i8());
        assert!(!Imm::new(-1).fits_u8());
        assert!(Imm::new(255).fits_u8());
        assert!(!Imm::new(255).fits_i8());
        assert!(Imm::new(-0x8000_0000).fits_i32());
        assert!(!Imm::new(0x1_0000_0000).fits_u32());
        assert!(Imm::new_unsigned(0xffff_ffff).fits_u32());
    }

    #[test]
    fn operand_sizes() {
        assert_eq!(Operand::from(RAX).size(), 8);
        assert_eq!(Operand::from(dword_ptr(RAX)).size(), 4);
        assert_eq!(Operand::from(Imm::new(3)).size(), 0);
    }
}
