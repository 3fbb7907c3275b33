//! VEX (and XOP) prefix construction.

use crate::buffer::SectionWriter;
use crate::error::AsmResult;
use crate::inst::opcode::OpMap;

/// The two- or three-byte VEX prefix, or the three-byte XOP form.
pub(crate) enum VexPrefix {
    TwoByte(u8),
    ThreeByte(u8, u8, u8),
}

/// The VEX prefix stores the top bit of each register encoding inverted.
#[inline(always)]
fn invert_top_bit(enc: u8) -> u8 {
    (!(enc >> 3)) & 1
}

fn use_2byte_prefix(x: u8, b: u8, w: bool, map: OpMap) -> bool {
    // X/B/W and the 0F38/0F3A maps are only representable in the 3-byte
    // form; everything else can shrink to C5.
    x == 1 && b == 1 && !w && map == OpMap::M0F
}

impl VexPrefix {
    /// Build the prefix for an instruction with up to three register
    /// encodings: `reg` (ModR/M reg), `vvvv` (non-destructive source) and
    /// the rm side's base/index encodings.
    ///
    /// `force_3byte` is the `vex3()` emitter option.
    pub(crate) fn new(
        reg: u8,
        vvvv: u8,
        (b_enc, x_enc): (u8, u8),
        l: u8,
        pp: u8,
        map: OpMap,
        w: bool,
        force_3byte: bool,
    ) -> VexPrefix {
        let r = invert_top_bit(reg);
        let b = invert_top_bit(b_enc);
        let x = invert_top_bit(x_enc);
        debug_assert!(vvvv < 16);
        debug_assert!(l < 2);
        debug_assert!(pp < 4);

        if use_2byte_prefix(x, b, w, map) && !force_3byte && !map.is_xop() {
            //  +-----+ +-------------------+
            //  | C5h | | R | vvvv | L | pp |
            //  +-----+ +-------------------+
            let last = (r << 7) | ((!vvvv & 0b1111) << 3) | ((l & 1) << 2) | (pp & 0b11);
            VexPrefix::TwoByte(last)
        } else {
            //  +-----+ +--------------+ +-------------------+
            //  | C4h | | RXB | m-mmmm | | W | vvvv | L | pp |
            //  +-----+ +--------------+ +-------------------+
            let escape = if map.is_xop() { 0x8f } else { 0xc4 };
            let mid = (r << 7) | (x << 6) | (b << 5) | map.mmmmm();
            let last = (u8::from(w) << 7) | ((!vvvv & 0b1111) << 3) | ((l & 1) << 2) | (pp & 0b11);
            VexPrefix::ThreeByte(escape, mid, last)
        }
    }

    pub(crate) fn encode(&self, sink: &mut SectionWriter<'_>) -> AsmResult<()> {
        match self {
            VexPrefix::TwoByte(last) => {
                sink.put1(0xc5)?;
                sink.put1(*last)
            }
            VexPrefix::ThreeByte(escape, mid, last) => {
                sink.put1(*escape)?;
                sink.put1(*mid)?;
                sink.put1(*last)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_byte_when_possible() {
        // vaddps xmm0, xmm1, xmm2: C5 F0 58 C2; prefix part is C5 F0.
        let p = VexPrefix::new(0, 1, (2, 0), 0, 0, OpMap::M0F, false, false);
        match p {
            VexPrefix::TwoByte(last) => assert_eq!(last, 0xf0),
            VexPrefix::ThreeByte(..) => panic!("expected 2-byte prefix"),
        }
    }

    #[test]
    fn three_byte_when_required() {
        // A high rm register (b bit) forces the C4 form.
        let p = VexPrefix::new(0, 0, (8, 0), 0, 1, OpMap::M0F38, false, false);
        match p {
            VexPrefix::ThreeByte(escape, mid, last) => {
                assert_eq!(escape, 0xc4);
                // R=1 (inverted 0), X=1, B=0 (inverted: high reg), map 0F38.
                assert_eq!(mid, 0b1100_0010);
                assert_eq!(last, 0b0111_1001);
            }
            VexPrefix::TwoByte(_) => panic!("expected 3-byte prefix"),
        }
    }

    #[test]
    fn vex3_option_forces_three_bytes() {
        let p = VexPrefix::new(0, 0, (0, 0), 0, 0, OpMap::M0F, false, true);
        assert!(matches!(p, VexPrefix::ThreeByte(0xc4, _, _)));
    }
}
