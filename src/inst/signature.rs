//! Operand signatures: the shapes an instruction accepts.
//!
//! Each instruction record points at a list of [`Signature`]s; the validator
//! matches the caller's operand tuple against them in order and the first
//! match wins. Signature slots carry bitsets over the operand-kind and
//! memory-form universes plus an access mode, an optional fixed hardware
//! register and an implicit marker.

use crate::cpu::ArchMask;
use crate::operand::Imm;
use crate::reg::RegClass;

/// A bitset over operand kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OpKindSet(u32);

impl OpKindSet {
    pub const NONE: OpKindSet = OpKindSet(0);

    pub const R8LO: OpKindSet = OpKindSet(1 << 0);
    pub const R8HI: OpKindSet = OpKindSet(1 << 1);
    pub const R16: OpKindSet = OpKindSet(1 << 2);
    pub const R32: OpKindSet = OpKindSet(1 << 3);
    pub const R64: OpKindSet = OpKindSet(1 << 4);
    pub const XMM: OpKindSet = OpKindSet(1 << 5);
    pub const YMM: OpKindSet = OpKindSet(1 << 6);
    pub const ZMM: OpKindSet = OpKindSet(1 << 7);
    pub const KREG: OpKindSet = OpKindSet(1 << 8);
    pub const MM: OpKindSet = OpKindSet(1 << 9);
    pub const ST: OpKindSet = OpKindSet(1 << 10);
    pub const SREG: OpKindSet = OpKindSet(1 << 11);
    pub const CREG: OpKindSet = OpKindSet(1 << 12);
    pub const DREG: OpKindSet = OpKindSet(1 << 13);
    pub const BND: OpKindSet = OpKindSet(1 << 14);
    pub const MEM: OpKindSet = OpKindSet(1 << 15);
    pub const I8: OpKindSet = OpKindSet(1 << 16);
    pub const U8: OpKindSet = OpKindSet(1 << 17);
    pub const I16: OpKindSet = OpKindSet(1 << 18);
    pub const U16: OpKindSet = OpKindSet(1 << 19);
    pub const I32: OpKindSet = OpKindSet(1 << 20);
    pub const U32: OpKindSet = OpKindSet(1 << 21);
    pub const I64: OpKindSet = OpKindSet(1 << 22);
    pub const U64: OpKindSet = OpKindSet(1 << 23);
    pub const REL8: OpKindSet = OpKindSet(1 << 24);
    pub const REL32: OpKindSet = OpKindSet(1 << 25);

    /// Every bit the universe defines; used by the table-closure test.
    pub const UNIVERSE: OpKindSet = OpKindSet((1 << 26) - 1);

    pub const R8: OpKindSet = Self::R8LO.or(Self::R8HI);
    pub const GP: OpKindSet = Self::R8.or(Self::R16).or(Self::R32).or(Self::R64);
    pub const VEC: OpKindSet = Self::XMM.or(Self::YMM).or(Self::ZMM);
    pub const IMM: OpKindSet = Self::I8
        .or(Self::U8)
        .or(Self::I16)
        .or(Self::U16)
        .or(Self::I32)
        .or(Self::U32)
        .or(Self::I64)
        .or(Self::U64);
    pub const REL: OpKindSet = Self::REL8.or(Self::REL32);

    #[must_use]
    pub const fn or(self, other: OpKindSet) -> OpKindSet {
        OpKindSet(self.0 | other.0)
    }

    #[must_use]
    pub fn intersects(self, other: OpKindSet) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub fn is_subset_of(self, other: OpKindSet) -> bool {
        self.0 & !other.0 == 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The kind bit a physical register class occupies.
    #[must_use]
    pub fn of_reg_class(class: RegClass) -> OpKindSet {
        match class {
            RegClass::GpbLo => Self::R8LO,
            RegClass::GpbHi => Self::R8HI,
            RegClass::Gpw => Self::R16,
            RegClass::Gpd => Self::R32,
            RegClass::Gpq => Self::R64,
            RegClass::Xmm => Self::XMM,
            RegClass::Ymm => Self::YMM,
            RegClass::Zmm => Self::ZMM,
            RegClass::KMask => Self::KREG,
            RegClass::Mm => Self::MM,
            RegClass::St => Self::ST,
            RegClass::Seg => Self::SREG,
            RegClass::Cr => Self::CREG,
            RegClass::Dr => Self::DREG,
            RegClass::Bnd => Self::BND,
        }
    }

    /// True if any allowed immediate width admits `imm`.
    #[must_use]
    pub fn admits_imm(self, imm: Imm) -> bool {
        (self.intersects(Self::I8) && imm.fits_i8())
            || (self.intersects(Self::U8) && imm.fits_u8())
            || (self.intersects(Self::I16) && imm.fits_i16())
            || (self.intersects(Self::U16) && imm.fits_u16())
            || (self.intersects(Self::I32) && imm.fits_i32())
            || (self.intersects(Self::U32) && imm.fits_u32())
            || self.intersects(Self::I64.or(Self::U64))
    }
}

/// A bitset over memory-operand forms.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemFormSet(u32);

impl MemFormSet {
    pub const NONE: MemFormSet = MemFormSet(0);

    /// Any size; the signature does not constrain the access width.
    pub const ANY: MemFormSet = MemFormSet(1 << 0);
    pub const M8: MemFormSet = MemFormSet(1 << 1);
    pub const M16: MemFormSet = MemFormSet(1 << 2);
    pub const M32: MemFormSet = MemFormSet(1 << 3);
    pub const M48: MemFormSet = MemFormSet(1 << 4);
    pub const M64: MemFormSet = MemFormSet(1 << 5);
    pub const M80: MemFormSet = MemFormSet(1 << 6);
    pub const M128: MemFormSet = MemFormSet(1 << 7);
    pub const M256: MemFormSet = MemFormSet(1 << 8);
    pub const M512: MemFormSet = MemFormSet(1 << 9);
    pub const M1024: MemFormSet = MemFormSet(1 << 10);
    /// Base register only: no index, no displacement.
    pub const BASE_ONLY: MemFormSet = MemFormSet(1 << 11);
    pub const VM32X: MemFormSet = MemFormSet(1 << 12);
    pub const VM32Y: MemFormSet = MemFormSet(1 << 13);
    pub const VM32Z: MemFormSet = MemFormSet(1 << 14);
    pub const VM64X: MemFormSet = MemFormSet(1 << 15);
    pub const VM64Y: MemFormSet = MemFormSet(1 << 16);
    pub const VM64Z: MemFormSet = MemFormSet(1 << 17);
    /// MPX memory-operand form.
    pub const MIB: MemFormSet = MemFormSet(1 << 18);

    pub const UNIVERSE: MemFormSet = MemFormSet((1 << 19) - 1);

    pub const VM_ANY: MemFormSet = Self::VM32X
        .or(Self::VM32Y)
        .or(Self::VM32Z)
        .or(Self::VM64X)
        .or(Self::VM64Y)
        .or(Self::VM64Z);

    #[must_use]
    pub const fn or(self, other: MemFormSet) -> MemFormSet {
        MemFormSet(self.0 | other.0)
    }

    #[must_use]
    pub fn intersects(self, other: MemFormSet) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub fn is_subset_of(self, other: MemFormSet) -> bool {
        self.0 & !other.0 == 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The form bit corresponding to an access width in bytes.
    #[must_use]
    pub fn of_size(bytes: u32) -> MemFormSet {
        match bytes {
            1 => Self::M8,
            2 => Self::M16,
            4 => Self::M32,
            6 => Self::M48,
            8 => Self::M64,
            10 => Self::M80,
            16 => Self::M128,
            32 => Self::M256,
            64 => Self::M512,
            128 => Self::M1024,
            _ => Self::NONE,
        }
    }

    /// Size in bytes implied by the smallest plain-size bit in the set, used
    /// to infer an access width when the operand has no hint. Returns 0 when
    /// the set has no plain size.
    #[must_use]
    pub fn implied_size(self) -> u32 {
        for (bit, bytes) in [
            (Self::M8, 1),
            (Self::M16, 2),
            (Self::M32, 4),
            (Self::M48, 6),
            (Self::M64, 8),
            (Self::M80, 10),
            (Self::M128, 16),
            (Self::M256, 32),
            (Self::M512, 64),
            (Self::M1024, 128),
        ] {
            if self.intersects(bit) {
                return bytes;
            }
        }
        0
    }

    /// The VSIB form bit for a vector index register class.
    #[must_use]
    pub fn of_vector_index(class: RegClass) -> MemFormSet {
        match class {
            RegClass::Xmm => Self::VM32X.or(Self::VM64X),
            RegClass::Ymm => Self::VM32Y.or(Self::VM64Y),
            RegClass::Zmm => Self::VM32Z.or(Self::VM64Z),
            _ => Self::NONE,
        }
    }
}

/// How an operand slot is accessed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    #[must_use]
    pub fn is_read(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }
}

/// One operand slot of a signature.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SigOp {
    pub kinds: OpKindSet,
    pub mem: MemFormSet,
    pub access: Access,
    /// `0xff` when the slot accepts any register id.
    fixed_id: u8,
    /// Implicit slots consume no explicit argument.
    implicit: bool,
}

const NO_FIXED: u8 = 0xff;

impl SigOp {
    /// The fixed hardware register this slot requires, if any.
    #[must_use]
    pub fn fixed_id(&self) -> Option<u8> {
        if self.fixed_id == NO_FIXED {
            None
        } else {
            Some(self.fixed_id)
        }
    }

    #[must_use]
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    /// Pin this slot to a hardware register id.
    #[must_use]
    pub const fn fixed(mut self, id: u8) -> SigOp {
        self.fixed_id = id;
        self
    }

    /// Mark this slot implicit.
    #[must_use]
    pub const fn implicit(mut self) -> SigOp {
        self.implicit = true;
        self
    }

    /// Constrain the memory forms this slot accepts.
    #[must_use]
    pub const fn mem(mut self, forms: MemFormSet) -> SigOp {
        self.mem = forms;
        self
    }
}

/// A read-only slot.
#[must_use]
pub const fn r(kinds: OpKindSet) -> SigOp {
    SigOp { kinds, mem: MemFormSet::NONE, access: Access::Read, fixed_id: NO_FIXED, implicit: false }
}

/// A write-only slot.
#[must_use]
pub const fn w(kinds: OpKindSet) -> SigOp {
    SigOp { kinds, mem: MemFormSet::NONE, access: Access::Write, fixed_id: NO_FIXED, implicit: false }
}

/// A read-write slot.
#[must_use]
pub const fn rw(kinds: OpKindSet) -> SigOp {
    SigOp {
        kinds,
        mem: MemFormSet::NONE,
        access: Access::ReadWrite,
        fixed_id: NO_FIXED,
        implicit: false,
    }
}

/// An operand signature: an ordered list of slots plus an architecture mask.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Signature {
    pub ops: &'static [SigOp],
    pub arch: ArchMask,
}

impl Signature {
    /// Number of slots the caller supplies explicitly.
    #[must_use]
    pub fn explicit_count(&self) -> usize {
        self.ops.iter().filter(|o| !o.implicit).count()
    }

    /// Iterate the explicit slots in order.
    pub fn explicit_ops(&self) -> impl Iterator<Item = &SigOp> {
        self.ops.iter().filter(|o| !o.implicit)
    }
}

/// A signature valid in both modes.
#[must_use]
pub const fn sig(ops: &'static [SigOp]) -> Signature {
    Signature { ops, arch: ArchMask::ANY }
}

/// A signature valid only in 64-bit mode.
#[must_use]
pub const fn sig64(ops: &'static [SigOp]) -> Signature {
    Signature { ops, arch: ArchMask::X64 }
}

/// A signature valid only in 32-bit mode.
#[must_use]
pub const fn sig32(ops: &'static [SigOp]) -> Signature {
    Signature { ops, arch: ArchMask::X86 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_combos() {
        assert!(OpKindSet::GP.intersects(OpKindSet::R32));
        assert!(OpKindSet::R8.intersects(OpKindSet::R8HI));
        assert!(!OpKindSet::VEC.intersects(OpKindSet::KREG));
        assert!(OpKindSet::GP.is_subset_of(OpKindSet::UNIVERSE));
    }

    #[test]
    fn imm_admission() {
        let i8_only = OpKindSet::I8;
        assert!(i8_only.admits_imm(Imm::new(-128)));
        assert!(!i8_only.admits_imm(Imm::new(200)));
        assert!(OpKindSet::U8.admits_imm(Imm::new(200)));
        assert!(OpKindSet::I32.admits_imm(Imm::new(i64::from(i32::MIN))));
        assert!(!OpKindSet::I32.admits_imm(Imm::new(i64::from(i32::MAX) + 1)));
        assert!(OpKindSet::I64.admits_imm(Imm::new(i64::MIN)));
    }

    #[test]
    fn mem_sizes() {
        assert_eq!(MemFormSet::of_size(4), MemFormSet::M32);
        assert_eq!(MemFormSet::M32.or(MemFormSet::M64).implied_size(), 4);
        assert_eq!(MemFormSet::VM_ANY.implied_size(), 0);
        assert!(MemFormSet::of_vector_index(crate::reg::RegClass::Ymm)
            .is_subset_of(MemFormSet::VM_ANY));
    }

    #[test]
    fn slot_builders() {
        let s = rw(OpKindSet::R32.or(OpKindSet::MEM)).mem(MemFormSet::M32);
        assert!(s.access.is_read() && s.access.is_write());
        assert_eq!(s.fixed_id(), None);
        let f = r(OpKindSet::R16).fixed(2).implicit();
        assert_eq!(f.fixed_id(), Some(2));
        assert!(f.is_implicit());
    }
}
