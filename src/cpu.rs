//! Target architecture and CPU feature description.

use core::fmt;

/// The instruction-set mode code is generated for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 32-bit protected mode.
    X86,
    /// 64-bit long mode.
    X64,
}

impl Arch {
    /// Width of a pointer, in bytes.
    #[must_use]
    pub fn pointer_size(self) -> u32 {
        match self {
            Arch::X86 => 4,
            Arch::X64 => 8,
        }
    }

    /// True in 64-bit long mode.
    #[must_use]
    pub fn is_64(self) -> bool {
        matches!(self, Arch::X64)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Arch::X86 => "x86",
            Arch::X64 => "x64",
        })
    }
}

/// Bitmask describing in which modes an operand signature is valid.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ArchMask(u8);

impl ArchMask {
    pub const X86: ArchMask = ArchMask(0b01);
    pub const X64: ArchMask = ArchMask(0b10);
    pub const ANY: ArchMask = ArchMask(0b11);

    /// True if `arch` is included in the mask.
    #[must_use]
    pub fn contains(self, arch: Arch) -> bool {
        match arch {
            Arch::X86 => self.0 & 0b01 != 0,
            Arch::X64 => self.0 & 0b10 != 0,
        }
    }

    /// The mask must never be empty; an empty mask is an authoring bug in the
    /// instruction tables.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// A set of CPUID-style features.
///
/// Instruction records carry the feature set they require; an environment
/// carries the feature set it provides. Emission requires the former to be a
/// subset of the latter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CpuFeatures(u64);

impl CpuFeatures {
    pub const NONE: CpuFeatures = CpuFeatures(0);

    pub const FPU: CpuFeatures = CpuFeatures(1 << 0);
    pub const MMX: CpuFeatures = CpuFeatures(1 << 1);
    pub const CMOV: CpuFeatures = CpuFeatures(1 << 2);
    pub const SSE: CpuFeatures = CpuFeatures(1 << 3);
    pub const SSE2: CpuFeatures = CpuFeatures(1 << 4);
    pub const SSE3: CpuFeatures = CpuFeatures(1 << 5);
    pub const SSSE3: CpuFeatures = CpuFeatures(1 << 6);
    pub const SSE41: CpuFeatures = CpuFeatures(1 << 7);
    pub const SSE42: CpuFeatures = CpuFeatures(1 << 8);
    pub const POPCNT: CpuFeatures = CpuFeatures(1 << 9);
    pub const LZCNT: CpuFeatures = CpuFeatures(1 << 10);
    pub const BMI1: CpuFeatures = CpuFeatures(1 << 11);
    pub const BMI2: CpuFeatures = CpuFeatures(1 << 12);
    pub const AVX: CpuFeatures = CpuFeatures(1 << 13);
    pub const AVX2: CpuFeatures = CpuFeatures(1 << 14);
    pub const FMA: CpuFeatures = CpuFeatures(1 << 15);
    pub const F16C: CpuFeatures = CpuFeatures(1 << 16);
    pub const AVX512F: CpuFeatures = CpuFeatures(1 << 17);
    pub const AVX512VL: CpuFeatures = CpuFeatures(1 << 18);
    pub const AVX512BW: CpuFeatures = CpuFeatures(1 << 19);
    pub const AVX512DQ: CpuFeatures = CpuFeatures(1 << 20);
    pub const AVX512CD: CpuFeatures = CpuFeatures(1 << 21);

    /// Everything this crate knows about; useful for tests and for hosts
    /// that do their own feature detection.
    pub const ALL: CpuFeatures = CpuFeatures(u64::MAX);

    /// A baseline every x86-64 CPU provides.
    pub const BASELINE_X64: CpuFeatures = CpuFeatures(
        CpuFeatures::FPU.0 | CpuFeatures::MMX.0 | CpuFeatures::CMOV.0 | CpuFeatures::SSE.0 | CpuFeatures::SSE2.0,
    );

    /// Union of two feature sets.
    #[must_use]
    pub const fn union(self, other: CpuFeatures) -> CpuFeatures {
        CpuFeatures(self.0 | other.0)
    }

    /// True if every feature in `required` is present in `self`.
    #[must_use]
    pub fn supports(self, required: CpuFeatures) -> bool {
        self.0 & required.0 == required.0
    }

    /// True if no feature is set.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl core::ops::BitOr for CpuFeatures {
    type Output = CpuFeatures;
    fn bitor(self, rhs: CpuFeatures) -> CpuFeatures {
        self.union(rhs)
    }
}

/// The compilation target: an architecture plus the features it provides.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Environment {
    pub arch: Arch,
    pub features: CpuFeatures,
}

impl Environment {
    /// A 64-bit environment with every feature enabled.
    #[must_use]
    pub fn x64() -> Environment {
        Environment { arch: Arch::X64, features: CpuFeatures::ALL }
    }

    /// A 32-bit environment with every feature enabled.
    #[must_use]
    pub fn x86() -> Environment {
        Environment { arch: Arch::X86, features: CpuFeatures::ALL }
    }

    /// An environment restricted to an explicit feature set.
    #[must_use]
    pub fn with_features(arch: Arch, features: CpuFeatures) -> Environment {
        Environment { arch, features }
    }

    /// The environment matching the machine the crate itself runs on.
    #[must_use]
    pub fn host() -> Environment {
        #[cfg(target_arch = "x86_64")]
        {
            Environment::x64()
        }
        #[cfg(target_arch = "x86")]
        {
            Environment::x86()
        }
        #[cfg(not(any(target_arch = "x86_64", target_arch = "x86")))]
        {
            // Cross-assembling host; default to the 64-bit target.
            Environment::x64()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_subset() {
        let env = CpuFeatures::BASELINE_X64;
        assert!(env.supports(CpuFeatures::SSE2));
        assert!(env.supports(CpuFeatures::NONE));
        assert!(!env.supports(CpuFeatures::AVX));
        assert!(env.supports(CpuFeatures::SSE | CpuFeatures::CMOV));
    }

    #[test]
    fn arch_mask() {
        assert!(ArchMask::ANY.contains(Arch::X86));
        assert!(ArchMask::ANY.contains(Arch::X64));
        assert!(!ArchMask::X64.contains(Arch::X86));
        assert!(!ArchMask::X86.is_empty());
    }
}
