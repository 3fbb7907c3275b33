//! The packed 32-bit opcode word stored in instruction records.
//!
//! One word carries the mandatory prefix group, the opcode map, the opcode
//! byte, an optional ModR/M `/digit` extension, the W and L'L bits, the EVEX
//! tuple type and the admissible prefix families. Records hold a primary and
//! an optional alternate word; the alternate covers second encodings such as
//! the store direction of `movaps` or the GPR forms of `kmov`.
//!
//! Words are built with const-fn builders so the static tables read like the
//! reference manual: `op(0x81).digit(0)` is `81 /0`, `op(0x58).map0f().pf3()`
//! is `F3 0F 58`.

use core::fmt;

const PP_SHIFT: u32 = 8;
const MAP_SHIFT: u32 = 10;
const DIGIT_SHIFT: u32 = 13;
const W_BIT: u32 = 1 << 16;
const LL_SHIFT: u32 = 17;
const TUPLE_SHIFT: u32 = 19;
const HAS_DIGIT_BIT: u32 = 1 << 24;
const VEXMODE_SHIFT: u32 = 25;
const VALID_BIT: u32 = 1 << 31;

/// Opcode escape maps.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpMap {
    /// Single-byte map.
    Primary,
    /// `0F` escape.
    M0F,
    /// `0F 38` escape.
    M0F38,
    /// `0F 3A` escape.
    M0F3A,
    /// `0F 01` group (system instructions).
    M0F01,
    /// AMD XOP map 8 (`8F` escape).
    Xop8,
    /// AMD XOP map 9.
    Xop9,
    /// AMD XOP map 10.
    XopA,
}

impl OpMap {
    /// The `mmmmm` field value used by VEX/EVEX/XOP prefixes.
    #[must_use]
    pub fn mmmmm(self) -> u8 {
        match self {
            OpMap::Primary | OpMap::M0F01 => 0,
            OpMap::M0F => 1,
            OpMap::M0F38 => 2,
            OpMap::M0F3A => 3,
            OpMap::Xop8 => 8,
            OpMap::Xop9 => 9,
            OpMap::XopA => 10,
        }
    }

    /// True for the XOP maps, which use the `8F` escape byte.
    #[must_use]
    pub fn is_xop(self) -> bool {
        matches!(self, OpMap::Xop8 | OpMap::Xop9 | OpMap::XopA)
    }
}

/// EVEX displacement-compression categories (SDM Vol. 2, 2.7.5).
///
/// Together with the vector length, the W bit and the broadcast flag, the
/// tuple type determines the scaling factor applied to disp8.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TupleType {
    None,
    /// Full vector, broadcast-capable 32/64-bit elements.
    Full,
    /// Half vector, broadcast-capable 32-bit elements.
    Half,
    /// Full vector memory, no broadcast.
    FullMem,
    /// One scalar element, element size from W.
    Tuple1Scalar,
    /// One 8-bit scalar.
    Tuple1Scalar8,
    /// One 16-bit scalar.
    Tuple1Scalar16,
    /// One 32-bit element regardless of W.
    Tuple1Fixed32,
    /// One 64-bit element regardless of W.
    Tuple1Fixed64,
    Tuple2,
    Tuple4,
    Tuple8,
    HalfMem,
    QuarterMem,
    EighthMem,
    Mem128,
    MovDdup,
    /// Full vector move.
    Fvm,
    /// Half vector move.
    Hvm,
    /// Quarter vector move.
    Qvm,
    /// Eighth vector move.
    Ovm,
}

impl TupleType {
    fn from_bits(bits: u32) -> TupleType {
        match bits {
            0 => TupleType::None,
            1 => TupleType::Full,
            2 => TupleType::Half,
            3 => TupleType::FullMem,
            4 => TupleType::Tuple1Scalar,
            5 => TupleType::Tuple1Scalar8,
            6 => TupleType::Tuple1Scalar16,
            7 => TupleType::Tuple1Fixed32,
            8 => TupleType::Tuple1Fixed64,
            9 => TupleType::Tuple2,
            10 => TupleType::Tuple4,
            11 => TupleType::Tuple8,
            12 => TupleType::HalfMem,
            13 => TupleType::QuarterMem,
            14 => TupleType::EighthMem,
            15 => TupleType::Mem128,
            16 => TupleType::MovDdup,
            17 => TupleType::Fvm,
            18 => TupleType::Hvm,
            19 => TupleType::Qvm,
            20 => TupleType::Ovm,
            _ => unreachable!("corrupt tuple bits"),
        }
    }

    /// `log2(N)` of the disp8 scaling factor for the given effective vector
    /// length (`ll`: 0/1/2 for 128/256/512), W bit and broadcast flag.
    #[must_use]
    pub fn disp8_shift(self, ll: u8, w: bool, broadcast: bool) -> u8 {
        let ll = u8::min(ll, 2);
        match self {
            TupleType::None => 0,
            TupleType::Full => {
                if broadcast {
                    if w { 3 } else { 2 }
                } else {
                    4 + ll
                }
            }
            TupleType::Half => {
                if broadcast {
                    2
                } else {
                    3 + ll
                }
            }
            TupleType::FullMem | TupleType::Fvm => 4 + ll,
            TupleType::Tuple1Scalar => {
                if w { 3 } else { 2 }
            }
            TupleType::Tuple1Scalar8 => 0,
            TupleType::Tuple1Scalar16 => 1,
            TupleType::Tuple1Fixed32 => 2,
            TupleType::Tuple1Fixed64 => 3,
            TupleType::Tuple2 => {
                if w { 4 } else { 3 }
            }
            TupleType::Tuple4 => {
                if w { 5 } else { 4 }
            }
            TupleType::Tuple8 => 5,
            TupleType::HalfMem | TupleType::Hvm => 3 + ll,
            TupleType::QuarterMem | TupleType::Qvm => 2 + ll,
            TupleType::EighthMem | TupleType::Ovm => 1 + ll,
            TupleType::Mem128 => 4,
            TupleType::MovDdup => {
                if ll == 0 {
                    3
                } else {
                    4 + ll
                }
            }
        }
    }
}

/// The prefix families an encoding may be expressed in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VexMode {
    /// Legacy/REX encoding only.
    Legacy,
    /// VEX (or XOP) prefix only.
    Vex,
    /// EVEX prefix only.
    Evex,
    /// VEX by default, EVEX when operands or options demand it.
    VexOrEvex,
}

/// The packed opcode word. See the module documentation for the layout.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Opcode(u32);

/// Start building an opcode word from its opcode byte.
#[must_use]
pub const fn op(byte: u8) -> Opcode {
    Opcode(byte as u32 | VALID_BIT)
}

impl Opcode {
    /// The absent opcode word (alternate slot of most records).
    pub const NONE: Opcode = Opcode(0);

    /// Mandatory `66` prefix (`pp = 01`).
    #[must_use]
    pub const fn p66(self) -> Opcode {
        Opcode(self.0 | 1 << PP_SHIFT)
    }

    /// Mandatory `F3` prefix (`pp = 10`).
    #[must_use]
    pub const fn pf3(self) -> Opcode {
        Opcode(self.0 | 2 << PP_SHIFT)
    }

    /// Mandatory `F2` prefix (`pp = 11`).
    #[must_use]
    pub const fn pf2(self) -> Opcode {
        Opcode(self.0 | 3 << PP_SHIFT)
    }

    /// `0F` escape.
    #[must_use]
    pub const fn map0f(self) -> Opcode {
        Opcode(self.0 | 1 << MAP_SHIFT)
    }

    /// `0F 38` escape.
    #[must_use]
    pub const fn map0f38(self) -> Opcode {
        Opcode(self.0 | 2 << MAP_SHIFT)
    }

    /// `0F 3A` escape.
    #[must_use]
    pub const fn map0f3a(self) -> Opcode {
        Opcode(self.0 | 3 << MAP_SHIFT)
    }

    /// ModR/M `/digit` opcode extension.
    #[must_use]
    pub const fn digit(self, digit: u8) -> Opcode {
        assert!(digit < 8);
        Opcode(self.0 | (digit as u32) << DIGIT_SHIFT | HAS_DIGIT_BIT)
    }

    /// Set REX.W / VEX.W / EVEX.W.
    #[must_use]
    pub const fn w(self) -> Opcode {
        Opcode(self.0 | W_BIT)
    }

    /// 256-bit vector length.
    #[must_use]
    pub const fn l256(self) -> Opcode {
        Opcode(self.0 | 1 << LL_SHIFT)
    }

    /// 512-bit vector length.
    #[must_use]
    pub const fn l512(self) -> Opcode {
        Opcode(self.0 | 2 << LL_SHIFT)
    }

    /// EVEX tuple type for disp8 compression.
    #[must_use]
    pub const fn tuple(self, t: TupleType) -> Opcode {
        Opcode(self.0 | (t as u32) << TUPLE_SHIFT)
    }

    /// VEX-only encoding.
    #[must_use]
    pub const fn vex(self) -> Opcode {
        Opcode(self.0 | 1 << VEXMODE_SHIFT)
    }

    /// EVEX-only encoding.
    #[must_use]
    pub const fn evex(self) -> Opcode {
        Opcode(self.0 | 2 << VEXMODE_SHIFT)
    }

    /// VEX encoding that upgrades to EVEX on demand.
    #[must_use]
    pub const fn vex_or_evex(self) -> Opcode {
        Opcode(self.0 | 3 << VEXMODE_SHIFT)
    }

    /// True when this slot holds an encoding.
    #[must_use]
    pub const fn is_some(self) -> bool {
        self.0 & VALID_BIT != 0
    }

    /// The opcode byte.
    #[must_use]
    pub fn byte(self) -> u8 {
        #[allow(clippy::cast_possible_truncation)]
        {
            self.0 as u8
        }
    }

    /// Replace the opcode byte, keeping every other field. Used for opcode
    /// families laid out at fixed byte offsets (ALU accumulator forms,
    /// `kmov` stores).
    #[must_use]
    pub fn with_byte(self, byte: u8) -> Opcode {
        Opcode((self.0 & !0xff) | u32::from(byte))
    }

    /// The `pp` mandatory-prefix field (0, 1 = 66, 2 = F3, 3 = F2).
    #[must_use]
    pub fn pp(self) -> u8 {
        ((self.0 >> PP_SHIFT) & 0b11) as u8
    }

    /// The opcode map.
    #[must_use]
    pub fn map(self) -> OpMap {
        match (self.0 >> MAP_SHIFT) & 0b111 {
            0 => OpMap::Primary,
            1 => OpMap::M0F,
            2 => OpMap::M0F38,
            3 => OpMap::M0F3A,
            4 => OpMap::M0F01,
            5 => OpMap::Xop8,
            6 => OpMap::Xop9,
            7 => OpMap::XopA,
            _ => unreachable!(),
        }
    }

    /// The ModR/M `/digit` extension, when present.
    #[must_use]
    pub fn modrm_digit(self) -> Option<u8> {
        if self.0 & HAS_DIGIT_BIT != 0 {
            Some(((self.0 >> DIGIT_SHIFT) & 0b111) as u8)
        } else {
            None
        }
    }

    /// The W bit.
    #[must_use]
    pub fn is_w(self) -> bool {
        self.0 & W_BIT != 0
    }

    /// Encoded vector length (0/1/2 for 128/256/512).
    #[must_use]
    pub fn ll(self) -> u8 {
        ((self.0 >> LL_SHIFT) & 0b11) as u8
    }

    /// The EVEX tuple type.
    #[must_use]
    pub fn tuple_type(self) -> TupleType {
        TupleType::from_bits((self.0 >> TUPLE_SHIFT) & 0b1_1111)
    }

    /// The admissible prefix families.
    #[must_use]
    pub fn vex_mode(self) -> VexMode {
        match (self.0 >> VEXMODE_SHIFT) & 0b11 {
            0 => VexMode::Legacy,
            1 => VexMode::Vex,
            2 => VexMode::Evex,
            3 => VexMode::VexOrEvex,
            _ => unreachable!(),
        }
    }
}

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_some() {
            return f.write_str("(none)");
        }
        match self.pp() {
            1 => f.write_str("66 ")?,
            2 => f.write_str("F3 ")?,
            3 => f.write_str("F2 ")?,
            _ => {}
        }
        match self.map() {
            OpMap::Primary => {}
            OpMap::M0F => f.write_str("0F ")?,
            OpMap::M0F38 => f.write_str("0F 38 ")?,
            OpMap::M0F3A => f.write_str("0F 3A ")?,
            OpMap::M0F01 => f.write_str("0F 01 ")?,
            OpMap::Xop8 => f.write_str("XOP.M8 ")?,
            OpMap::Xop9 => f.write_str("XOP.M9 ")?,
            OpMap::XopA => f.write_str("XOP.MA ")?,
        }
        write!(f, "{:02X}", self.byte())?;
        if let Some(d) = self.modrm_digit() {
            write!(f, " /{d}")?;
        }
        if self.is_w() {
            f.write_str(" W1")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_roundtrip() {
        let o = op(0x58).map0f().pf3().w().l512().tuple(TupleType::Tuple1Scalar).vex_or_evex();
        assert!(o.is_some());
        assert_eq!(o.byte(), 0x58);
        assert_eq!(o.pp(), 2);
        assert_eq!(o.map(), OpMap::M0F);
        assert!(o.is_w());
        assert_eq!(o.ll(), 2);
        assert_eq!(o.tuple_type(), TupleType::Tuple1Scalar);
        assert_eq!(o.vex_mode(), VexMode::VexOrEvex);
        assert_eq!(o.modrm_digit(), None);
    }

    #[test]
    fn digit_field() {
        let o = op(0x81).digit(5);
        assert_eq!(o.modrm_digit(), Some(5));
        assert_eq!(op(0x81).modrm_digit(), None);
        // A zero digit is distinct from "no digit".
        assert_eq!(op(0xc7).digit(0).modrm_digit(), Some(0));
    }

    #[test]
    fn disp8_scaling() {
        use TupleType::*;
        // vaddps zmm, zmm, m512: full vector, 64-byte scale.
        assert_eq!(Full.disp8_shift(2, false, false), 6);
        // vaddps zmm, zmm, m32{1to16}: 4-byte scale.
        assert_eq!(Full.disp8_shift(2, false, true), 2);
        // vaddpd with broadcast: 8-byte scale.
        assert_eq!(Full.disp8_shift(2, true, true), 3);
        // vaddss: scalar 4-byte.
        assert_eq!(Tuple1Scalar.disp8_shift(0, false, false), 2);
        // vmovddup 256-bit: 32-byte scale.
        assert_eq!(MovDdup.disp8_shift(1, false, false), 5);
        assert_eq!(MovDdup.disp8_shift(0, false, false), 3);
    }

    #[test]
    fn with_byte_preserves_fields() {
        let o = op(0x90).map0f().p66().with_byte(0x91);
        assert_eq!(o.byte(), 0x91);
        assert_eq!(o.pp(), 1);
        assert_eq!(o.map(), OpMap::M0F);
    }
}
