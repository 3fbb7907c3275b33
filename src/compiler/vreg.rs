//! Virtual registers.

use crate::reg::{Reg, RegClass};

/// Value types a virtual register can hold; used for sizing and for ABI
/// classification of parameters and return values.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    /// Pointer-sized integer of the target.
    IntPtr,
    F32,
    F64,
    /// 128-bit vector.
    V128,
    /// 256-bit vector.
    V256,
    /// 512-bit vector.
    V512,
    /// AVX-512 predicate.
    Mask,
}

impl VType {
    /// Size of the value in bytes (64-bit target).
    #[must_use]
    pub fn size(self) -> u32 {
        match self {
            VType::I8 | VType::U8 => 1,
            VType::I16 | VType::U16 => 2,
            VType::I32 | VType::U32 | VType::F32 => 4,
            VType::I64 | VType::U64 | VType::IntPtr | VType::F64 | VType::Mask => 8,
            VType::V128 => 16,
            VType::V256 => 32,
            VType::V512 => 64,
        }
    }

    /// The register class a value of this type lives in.
    #[must_use]
    pub fn reg_class(self) -> RegClass {
        match self {
            VType::I8 | VType::U8 => RegClass::GpbLo,
            VType::I16 | VType::U16 => RegClass::Gpw,
            VType::I32 | VType::U32 => RegClass::Gpd,
            VType::I64 | VType::U64 | VType::IntPtr => RegClass::Gpq,
            VType::F32 | VType::F64 | VType::V128 => RegClass::Xmm,
            VType::V256 => RegClass::Ymm,
            VType::V512 => RegClass::Zmm,
            VType::Mask => RegClass::KMask,
        }
    }

    /// True for types passed in general-purpose registers.
    #[must_use]
    pub fn is_int(self) -> bool {
        self.reg_class().is_gp()
    }

    /// True for types passed in vector registers.
    #[must_use]
    pub fn is_vec(self) -> bool {
        self.reg_class().is_vec()
    }
}

/// Book-keeping for one virtual register.
#[derive(Debug)]
pub(crate) struct VirtReg {
    pub vtype: VType,
    pub class: RegClass,
    /// Spill-slot offset from the post-prologue stack pointer; assigned on
    /// first spill.
    pub home: Option<u32>,
}

impl VirtReg {
    pub(crate) fn new(vtype: VType) -> VirtReg {
        VirtReg { vtype, class: vtype.reg_class(), home: None }
    }

    /// Spill width in bytes: GP values always spill their full register.
    pub(crate) fn spill_size(&self) -> u32 {
        if self.class.is_gp() {
            8
        } else {
            self.vtype.size().max(8)
        }
    }
}

/// Translate a vreg table index into its operand representation.
pub(crate) fn vreg_operand(index: usize, class: RegClass) -> Reg {
    #[allow(clippy::cast_possible_truncation)]
    Reg::new(class, Reg::FIRST_VIRTUAL + index as u16)
}

/// The vreg table index of a virtual register operand.
pub(crate) fn vreg_index(reg: Reg) -> usize {
    debug_assert!(reg.is_virtual());
    usize::from(reg.id() - Reg::FIRST_VIRTUAL)
}
