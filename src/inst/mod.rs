//! The instruction database.
//!
//! The database is a read-only set of static tables: one [`InstRecord`] per
//! mnemonic, shared [`CommonInfo`] metadata, and per-record signature lists.
//! It is generated offline from an encoding description and checked by the
//! table-closure tests in this module; at runtime it is only read.
//!
//! Lookup is O(1) by [`Mnemonic`] and O(log k) by name, where k is the size
//! of the mnemonic's initial-letter bucket.

pub mod opcode;
pub mod signature;
mod tables;

use crate::cpu::CpuFeatures;
use self::opcode::Opcode;
use self::signature::Signature;
use std::sync::OnceLock;

macro_rules! mnemonics {
    ($($variant:ident => $name:literal,)+) => {
        /// A dense instruction identifier. `Invalid` (0) denotes "no
        /// instruction". Variants are declared in ASCII order of their names
        /// so the name table is sorted.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Mnemonic {
            Invalid = 0,
            $($variant,)+
        }

        /// Mnemonic names, indexed by identifier.
        pub(crate) static NAMES: &[&str] = &["", $($name,)+];

        static ALL: &[Mnemonic] = &[Mnemonic::Invalid, $(Mnemonic::$variant,)+];
    };
}

mnemonics! {
    Adc => "adc",
    Add => "add",
    Addpd => "addpd",
    Addps => "addps",
    Addsd => "addsd",
    Addss => "addss",
    And => "and",
    Andnpd => "andnpd",
    Andnps => "andnps",
    Andpd => "andpd",
    Andps => "andps",
    Bsf => "bsf",
    Bsr => "bsr",
    Bswap => "bswap",
    Bt => "bt",
    Btc => "btc",
    Btr => "btr",
    Bts => "bts",
    Call => "call",
    Cbw => "cbw",
    Cdq => "cdq",
    Cdqe => "cdqe",
    Clc => "clc",
    Cld => "cld",
    Cmc => "cmc",
    Cmova => "cmova",
    Cmovae => "cmovae",
    Cmovb => "cmovb",
    Cmovbe => "cmovbe",
    Cmove => "cmove",
    Cmovg => "cmovg",
    Cmovge => "cmovge",
    Cmovl => "cmovl",
    Cmovle => "cmovle",
    Cmovne => "cmovne",
    Cmovno => "cmovno",
    Cmovnp => "cmovnp",
    Cmovns => "cmovns",
    Cmovo => "cmovo",
    Cmovp => "cmovp",
    Cmovs => "cmovs",
    Cmp => "cmp",
    Cmppd => "cmppd",
    Cmpps => "cmpps",
    Cmpsb => "cmpsb",
    Cmpsd => "cmpsd",
    Cmpsq => "cmpsq",
    Cmpss => "cmpss",
    Cmpsw => "cmpsw",
    Cpuid => "cpuid",
    Cqo => "cqo",
    Cvtsi2sd => "cvtsi2sd",
    Cvtsi2ss => "cvtsi2ss",
    Cvttsd2si => "cvttsd2si",
    Cvttss2si => "cvttss2si",
    Cwd => "cwd",
    Cwde => "cwde",
    Dec => "dec",
    Div => "div",
    Divpd => "divpd",
    Divps => "divps",
    Divsd => "divsd",
    Divss => "divss",
    Enter => "enter",
    Fadd => "fadd",
    Faddp => "faddp",
    Fdiv => "fdiv",
    Fdivp => "fdivp",
    Fild => "fild",
    Fistp => "fistp",
    Fld => "fld",
    Fmul => "fmul",
    Fmulp => "fmulp",
    Fst => "fst",
    Fstp => "fstp",
    Fsub => "fsub",
    Fsubp => "fsubp",
    Hlt => "hlt",
    Idiv => "idiv",
    Imul => "imul",
    Inc => "inc",
    Int3 => "int3",
    Ja => "ja",
    Jae => "jae",
    Jb => "jb",
    Jbe => "jbe",
    Je => "je",
    Jg => "jg",
    Jge => "jge",
    Jl => "jl",
    Jle => "jle",
    Jmp => "jmp",
    Jne => "jne",
    Jno => "jno",
    Jnp => "jnp",
    Jns => "jns",
    Jo => "jo",
    Jp => "jp",
    Js => "js",
    Kmovb => "kmovb",
    Kmovd => "kmovd",
    Kmovq => "kmovq",
    Kmovw => "kmovw",
    Lahf => "lahf",
    Lea => "lea",
    Leave => "leave",
    Lodsb => "lodsb",
    Lodsd => "lodsd",
    Lodsq => "lodsq",
    Lodsw => "lodsw",
    Lzcnt => "lzcnt",
    Maxpd => "maxpd",
    Maxps => "maxps",
    Maxsd => "maxsd",
    Maxss => "maxss",
    Minpd => "minpd",
    Minps => "minps",
    Minsd => "minsd",
    Minss => "minss",
    Mov => "mov",
    Movapd => "movapd",
    Movaps => "movaps",
    Movd => "movd",
    Movdqa => "movdqa",
    Movdqu => "movdqu",
    Movq => "movq",
    Movsb => "movsb",
    Movsd => "movsd",
    Movsq => "movsq",
    Movss => "movss",
    Movsw => "movsw",
    Movsx => "movsx",
    Movsxd => "movsxd",
    Movupd => "movupd",
    Movups => "movups",
    Movzx => "movzx",
    Mul => "mul",
    Mulpd => "mulpd",
    Mulps => "mulps",
    Mulsd => "mulsd",
    Mulss => "mulss",
    Neg => "neg",
    Nop => "nop",
    Not => "not",
    Or => "or",
    Orpd => "orpd",
    Orps => "orps",
    Paddb => "paddb",
    Paddd => "paddd",
    Paddq => "paddq",
    Paddw => "paddw",
    Pand => "pand",
    Pcmpeqb => "pcmpeqb",
    Pcmpeqd => "pcmpeqd",
    Pcmpeqw => "pcmpeqw",
    Pop => "pop",
    Popcnt => "popcnt",
    Popf => "popf",
    Por => "por",
    Pshufd => "pshufd",
    Psubb => "psubb",
    Psubd => "psubd",
    Psubq => "psubq",
    Psubw => "psubw",
    Push => "push",
    Pushf => "pushf",
    Pxor => "pxor",
    Rcl => "rcl",
    Rcr => "rcr",
    Rdtsc => "rdtsc",
    Ret => "ret",
    Rol => "rol",
    Ror => "ror",
    Sahf => "sahf",
    Sar => "sar",
    Sbb => "sbb",
    Scasb => "scasb",
    Scasd => "scasd",
    Scasq => "scasq",
    Scasw => "scasw",
    Seta => "seta",
    Setae => "setae",
    Setb => "setb",
    Setbe => "setbe",
    Sete => "sete",
    Setg => "setg",
    Setge => "setge",
    Setl => "setl",
    Setle => "setle",
    Setne => "setne",
    Setno => "setno",
    Setnp => "setnp",
    Setns => "setns",
    Seto => "seto",
    Setp => "setp",
    Sets => "sets",
    Shl => "shl",
    Shld => "shld",
    Shr => "shr",
    Shrd => "shrd",
    Sqrtpd => "sqrtpd",
    Sqrtps => "sqrtps",
    Sqrtsd => "sqrtsd",
    Sqrtss => "sqrtss",
    Stc => "stc",
    Std => "std",
    Stosb => "stosb",
    Stosd => "stosd",
    Stosq => "stosq",
    Stosw => "stosw",
    Sub => "sub",
    Subpd => "subpd",
    Subps => "subps",
    Subsd => "subsd",
    Subss => "subss",
    Test => "test",
    Tzcnt => "tzcnt",
    Ucomisd => "ucomisd",
    Ucomiss => "ucomiss",
    Ud2 => "ud2",
    Vaddpd => "vaddpd",
    Vaddps => "vaddps",
    Vaddsd => "vaddsd",
    Vaddss => "vaddss",
    Vandpd => "vandpd",
    Vandps => "vandps",
    Vblendvps => "vblendvps",
    Vbroadcastsd => "vbroadcastsd",
    Vbroadcastss => "vbroadcastss",
    Vcvtsi2sd => "vcvtsi2sd",
    Vcvtsi2ss => "vcvtsi2ss",
    Vdivpd => "vdivpd",
    Vdivps => "vdivps",
    Vfmadd213pd => "vfmadd213pd",
    Vfmadd213ps => "vfmadd213ps",
    Vgatherdps => "vgatherdps",
    Vinsertf128 => "vinsertf128",
    Vmaxpd => "vmaxpd",
    Vmaxps => "vmaxps",
    Vminpd => "vminpd",
    Vminps => "vminps",
    Vmovapd => "vmovapd",
    Vmovaps => "vmovaps",
    Vmovd => "vmovd",
    Vmovdqa => "vmovdqa",
    Vmovdqa32 => "vmovdqa32",
    Vmovdqa64 => "vmovdqa64",
    Vmovdqu => "vmovdqu",
    Vmovdqu32 => "vmovdqu32",
    Vmovdqu64 => "vmovdqu64",
    Vmovq => "vmovq",
    Vmovsd => "vmovsd",
    Vmovss => "vmovss",
    Vmovupd => "vmovupd",
    Vmovups => "vmovups",
    Vmulpd => "vmulpd",
    Vmulps => "vmulps",
    Vmulsd => "vmulsd",
    Vmulss => "vmulss",
    Vorpd => "vorpd",
    Vorps => "vorps",
    Vpaddb => "vpaddb",
    Vpaddd => "vpaddd",
    Vpaddq => "vpaddq",
    Vpaddw => "vpaddw",
    Vpand => "vpand",
    Vpandd => "vpandd",
    Vpandq => "vpandq",
    Vpbroadcastd => "vpbroadcastd",
    Vpbroadcastq => "vpbroadcastq",
    Vpor => "vpor",
    Vpord => "vpord",
    Vporq => "vporq",
    Vpshufd => "vpshufd",
    Vpsubb => "vpsubb",
    Vpsubd => "vpsubd",
    Vpsubq => "vpsubq",
    Vpsubw => "vpsubw",
    Vpxor => "vpxor",
    Vpxord => "vpxord",
    Vpxorq => "vpxorq",
    Vsqrtpd => "vsqrtpd",
    Vsqrtps => "vsqrtps",
    Vsubpd => "vsubpd",
    Vsubps => "vsubps",
    Vsubsd => "vsubsd",
    Vsubss => "vsubss",
    Vucomisd => "vucomisd",
    Vucomiss => "vucomiss",
    Vxorpd => "vxorpd",
    Vxorps => "vxorps",
    Xchg => "xchg",
    Xor => "xor",
    Xorpd => "xorpd",
    Xorps => "xorps",
}

impl Mnemonic {
    /// Number of identifiers, including `Invalid`.
    #[must_use]
    pub fn count() -> usize {
        ALL.len()
    }

    /// The mnemonic at a dense index, if in range.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Mnemonic> {
        ALL.get(index).copied()
    }

    /// The mnemonic's lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        NAMES[self as usize]
    }

    /// Look up a mnemonic by name.
    ///
    /// Names are sorted; the search narrows to the initial-letter bucket and
    /// binary-searches within it.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Mnemonic> {
        let first = *name.as_bytes().first()?;
        if !first.is_ascii_lowercase() {
            return None;
        }
        let (lo, hi) = letter_buckets()[(first - b'a') as usize];
        let bucket = &NAMES[lo..hi];
        let pos = bucket.binary_search(&name).ok()?;
        Mnemonic::from_index(lo + pos)
    }

    /// Fetch the instruction record.
    #[must_use]
    pub fn record(self) -> &'static InstRecord {
        &tables::INSTS[self as usize]
    }
}

/// Per-letter `[start, end)` ranges into the sorted name table.
fn letter_buckets() -> &'static [(usize, usize); 26] {
    static BUCKETS: OnceLock<[(usize, usize); 26]> = OnceLock::new();
    BUCKETS.get_or_init(|| {
        let mut buckets = [(0usize, 0usize); 26];
        for (letter, bucket) in buckets.iter_mut().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let c = b'a' + letter as u8;
            // Index 0 is the empty Invalid name; it sorts before every
            // letter and so never lands in a bucket.
            let lo = NAMES.partition_point(|n| n.is_empty() || n.as_bytes()[0] < c);
            let hi = NAMES.partition_point(|n| n.is_empty() || n.as_bytes()[0] <= c);
            *bucket = (lo, hi);
        }
        buckets
    })
}

/// EFLAGS bits an instruction reads or writes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EFlags(u8);

impl EFlags {
    pub const NONE: EFlags = EFlags(0);
    pub const CF: EFlags = EFlags(1 << 0);
    pub const PF: EFlags = EFlags(1 << 1);
    pub const AF: EFlags = EFlags(1 << 2);
    pub const ZF: EFlags = EFlags(1 << 3);
    pub const SF: EFlags = EFlags(1 << 4);
    pub const DF: EFlags = EFlags(1 << 5);
    pub const OF: EFlags = EFlags(1 << 6);

    /// The six status flags arithmetic writes.
    pub const STATUS: EFlags =
        EFlags(Self::CF.0 | Self::PF.0 | Self::AF.0 | Self::ZF.0 | Self::SF.0 | Self::OF.0);

    #[must_use]
    pub const fn or(self, other: EFlags) -> EFlags {
        EFlags(self.0 | other.0)
    }

    #[must_use]
    pub fn intersects(self, other: EFlags) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Control-flow class of an instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControlFlow {
    Regular,
    Jump,
    Branch,
    Call,
    Return,
}

/// How an encoding behaves when the destination and first source are the
/// same register; consumed by the compiler front-end's liveness pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SingleReg {
    /// No special aliasing behavior.
    None,
    /// Reads the same value twice (e.g. `and x, x`).
    ReadOnly,
    /// The result is independent of the input (e.g. `xor x, x`).
    WriteOnly,
}

/// Shared instruction metadata referenced by `InstRecord::common`.
#[derive(Copy, Clone, Debug)]
pub struct CommonInfo {
    pub flags_read: EFlags,
    pub flags_written: EFlags,
    pub control: ControlFlow,
    pub single_reg: SingleReg,
}

/// Which emission path the encoder dispatches to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EncodingClass {
    /// Unencodable placeholder (`Mnemonic::Invalid`).
    None,
    /// Bare opcode, no ModR/M.
    Op,
    /// One reg/mem operand selected by the opcode's `/digit`.
    M,
    /// Register encoded in the opcode byte (`bswap`).
    O,
    /// The classic ALU family: MR/RM/MI plus accumulator short forms.
    Alu,
    /// All the `mov` shapes, including segment/control/debug moves.
    Mov,
    /// `movsx`/`movzx`/`movsxd`.
    MovExtend,
    Lea,
    Test,
    Xchg,
    Imul,
    IncDec,
    /// Rotate/shift group (`C0..C1`, `D0..D3`).
    Shift,
    /// `shld`/`shrd`.
    ShiftD,
    /// `bt`/`btc`/`btr`/`bts`.
    BitTest,
    Push,
    Pop,
    /// Generic `reg <- reg/mem` with a `0F`-map opcode (`cmov`, `bsf`,
    /// `popcnt`, ...).
    Rm,
    Jmp,
    Jcc,
    Call,
    Ret,
    /// `movs`/`stos`/`lods`/`scas`/`cmps` with optional REP prefixes.
    StringOp,
    Enter,
    /// x87 memory forms; the primary word is the m32 variant, the alternate
    /// the m64 variant.
    Fpu,
    /// x87 register arithmetic (`st(0), st(i)` primary, `st(i), st(0)`
    /// alternate).
    FpuArith,
    /// Legacy SSE/MMX `/r`, reg-to-the-left; alternate word is the store
    /// direction.
    XmmRm,
    /// Like [`EncodingClass::XmmRm`] with a trailing imm8.
    XmmRmi,
    /// VEX/EVEX unary: `reg <- reg/mem` (+ alternate store direction).
    VexRm,
    /// VEX/EVEX `dst, src1, src2/mem`.
    VexRvm,
    /// VEX/EVEX `dst, src/mem, imm8`.
    VexRmi,
    /// VEX/EVEX `dst, src1, src2/mem, imm8`.
    VexRvmi,
    /// VEX `dst, src1, src2/mem, src3` (register in imm8[7:4]).
    VexRvmr,
    /// VEX gather: `dst, vsib-mem, mask` (mask in `vvvv`).
    VexRmv,
    /// The `kmov` family (k/k, k/mem primary; k/gpr alternate).
    VexKmov,
}

/// One instruction record. See the module documentation.
#[derive(Copy, Clone, Debug)]
pub struct InstRecord {
    pub name: &'static str,
    pub class: EncodingClass,
    pub opcode: Opcode,
    pub alt_opcode: Opcode,
    /// Index into the shared [`CommonInfo`] table.
    pub common: u16,
    pub features: CpuFeatures,
    pub sigs: &'static [Signature],
}

impl InstRecord {
    /// The shared metadata entry.
    #[must_use]
    pub fn common_info(&self) -> &'static CommonInfo {
        &tables::COMMON[self.common as usize]
    }
}

/// Fetch an instruction record by id.
#[must_use]
pub fn get_inst(id: Mnemonic) -> &'static InstRecord {
    id.record()
}

/// Find a mnemonic id by name; `None` for unknown names.
#[must_use]
pub fn find_inst(name: &str) -> Option<Mnemonic> {
    Mnemonic::from_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_sorted() {
        // Skip the empty Invalid name at index 0.
        for pair in NAMES[1..].windows(2) {
            assert!(pair[0] < pair[1], "names out of order: {} vs {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn name_id_roundtrip() {
        for i in 1..Mnemonic::count() {
            let m = Mnemonic::from_index(i).unwrap();
            assert_eq!(Mnemonic::from_name(m.name()), Some(m), "roundtrip failed for {}", m.name());
        }
        assert_eq!(Mnemonic::from_name("definitely_not_an_inst"), None);
        assert_eq!(Mnemonic::from_name(""), None);
        assert_eq!(Mnemonic::from_name("ADD"), None);
        assert_eq!(Mnemonic::from_name("addp"), None);
    }

    #[test]
    fn record_table_is_aligned() {
        assert_eq!(tables::INSTS.len(), Mnemonic::count());
        for i in 0..Mnemonic::count() {
            let m = Mnemonic::from_index(i).unwrap();
            assert_eq!(m.record().name, m.name(), "record/table mismatch at index {i}");
        }
    }

    #[test]
    fn signature_closure() {
        use super::signature::{MemFormSet, OpKindSet};
        for i in 1..Mnemonic::count() {
            let rec = Mnemonic::from_index(i).unwrap().record();
            assert!(usize::from(rec.common) < tables::COMMON.len());
            for s in rec.sigs {
                assert!(!s.arch.is_empty(), "{}: empty arch mask", rec.name);
                assert!(s.ops.len() <= 6, "{}: too many slots", rec.name);
                for op in s.ops {
                    assert!(op.kinds.is_subset_of(OpKindSet::UNIVERSE));
                    assert!(op.mem.is_subset_of(MemFormSet::UNIVERSE));
                    if op.mem.is_empty() {
                        assert!(
                            !op.kinds.intersects(OpKindSet::MEM),
                            "{}: memory kind without memory forms",
                            rec.name
                        );
                    }
                }
            }
        }
    }
}
