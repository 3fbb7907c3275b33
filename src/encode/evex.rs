//! EVEX prefix construction.

use crate::buffer::SectionWriter;
use crate::error::AsmResult;
use crate::inst::opcode::OpMap;

/// The 4-byte EVEX prefix; byte 0 is always 0x62.
///
/// ```text
///         ┌───┬───┬───┬───┬───┬───┬───┬───┐
/// Byte 1: │ R │ X │ B │ R'│ 0 │ m │ m │ m │
///         ├───┼───┼───┼───┼───┼───┼───┼───┤
/// Byte 2: │ W │ v │ v │ v │ v │ 1 │ p │ p │
///         ├───┼───┼───┼───┼───┼───┼───┼───┤
/// Byte 3: │ z │ L'│ L │ b │ V'│ a │ a │ a │
///         └───┴───┴───┴───┴───┴───┴───┴───┘
/// ```
pub(crate) struct EvexPrefix {
    byte1: u8,
    byte2: u8,
    byte3: u8,
}

#[inline(always)]
fn invert_bit(bit: u8) -> u8 {
    (!bit) & 1
}

impl EvexPrefix {
    /// Construct the prefix.
    ///
    /// Register encodings are full 5-bit values; `b_bit`/`x_bit` are the
    /// already-extracted third bits of the rm side (for a register rm, `x`
    /// carries its fourth bit, per the SDM's register-extension table).
    /// `ll` is the effective length (embedded rounding overrides it with
    /// the rounding mode), `aaa` the mask register, `z` the zeroing flag
    /// and `bcast` the broadcast/rounding/SAE bit.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        reg: u8,
        vvvv: u8,
        (b_bit, x_bit): (u8, u8),
        ll: u8,
        pp: u8,
        map: OpMap,
        w: bool,
        bcast: bool,
        aaa: u8,
        z: bool,
    ) -> EvexPrefix {
        debug_assert!(reg < 32);
        debug_assert!(vvvv < 32);
        debug_assert!(ll < 4, "L'L of 11b is valid only with embedded rounding");
        debug_assert!(pp < 4);
        debug_assert!(aaa < 8);

        let r = invert_bit(reg >> 3);
        let r_prime = invert_bit(reg >> 4);
        let b = invert_bit(b_bit);
        let x = invert_bit(x_bit);
        let v_prime = invert_bit(vvvv >> 4);
        let vvvv_low = !vvvv & 0b1111;
        let mmm = map.mmmmm() & 0b111;

        let byte1 = (r << 7) | (x << 6) | (b << 5) | (r_prime << 4) | mmm;
        let byte2 = (u8::from(w) << 7) | (vvvv_low << 3) | 0b100 | (pp & 0b11);
        let byte3 = (u8::from(z) << 7)
            | ((ll & 0b11) << 5)
            | (u8::from(bcast) << 4)
            | (v_prime << 3)
            | aaa;
        EvexPrefix { byte1, byte2, byte3 }
    }

    pub(crate) fn encode(&self, sink: &mut SectionWriter<'_>) -> AsmResult<()> {
        sink.put1(0x62)?;
        sink.put1(self.byte1)?;
        sink.put1(self.byte2)?;
        sink.put1(self.byte3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_masked_zeroing() {
        // vaddps zmm0{k1}{z}, zmm1, [rax]{1to16}:
        // EVEX.512.0F.W0 58 with b=1, aaa=001, z=1.
        let p = EvexPrefix::new(0, 1, (0, 0), 0b10, 0, OpMap::M0F, false, true, 1, true);
        assert_eq!(p.byte1, 0b1111_0001);
        assert_eq!(p.byte2, 0b0111_0100);
        assert_eq!(p.byte3, 0b1101_1001);
    }

    #[test]
    fn high_registers() {
        // reg = zmm24 (bits 3 and 4 set): both R and R' encode as 0 after
        // inversion.
        let p = EvexPrefix::new(24, 0, (0, 0), 0b10, 1, OpMap::M0F, true, false, 0, false);
        assert_eq!(p.byte1 & 0b1001_0000, 0);
        // W set, vvvv = 1111 (inverted 0).
        assert_eq!(p.byte2, 0b1111_1101);
    }
}
