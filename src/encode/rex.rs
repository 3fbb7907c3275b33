//! Legacy-encoding building blocks: prefix bytes, REX, ModR/M, SIB and
//! displacement emission.

use crate::asm::InstOptions;
use crate::buffer::{FixupKind, SectionWriter};
use crate::cpu::Arch;
use crate::error::{AsmError, AsmResult};
use crate::inst::opcode::{OpMap, Opcode};
use crate::operand::Mem;
use crate::reg::{enc, Reg, RegClass};

/// Encode the ModR/M byte.
#[inline]
pub(crate) fn encode_modrm(m0d: u8, reg: u8, rm: u8) -> u8 {
    debug_assert!(m0d < 4);
    debug_assert!(reg < 8);
    debug_assert!(rm < 8);
    (m0d << 6) | (reg << 3) | rm
}

/// Encode the SIB byte.
#[inline]
pub(crate) fn encode_sib(scale: u8, index: u8, base: u8) -> u8 {
    debug_assert!(scale < 4);
    debug_assert!(index < 8);
    debug_assert!(base < 8);
    (scale << 6) | (index << 3) | base
}

/// The reg/mem side of a ModR/M-encoded instruction.
#[derive(Copy, Clone)]
pub(crate) enum RmRef<'a> {
    Reg(u8),
    Mem(&'a Mem),
}

impl RmRef<'_> {
    /// The hardware encodings feeding REX.X (index) and REX.B (base or rm).
    pub(crate) fn rex_xb(&self) -> (u8, u8) {
        match self {
            RmRef::Reg(e) => (0, *e),
            RmRef::Mem(mem) => {
                let b = mem.base_reg().map_or(0, Reg::enc);
                let x = mem.index_reg().map_or(0, Reg::enc);
                (x, b)
            }
        }
    }
}

/// Displacement size classification, including EVEX compressed disp8.
#[derive(Copy, Clone)]
pub(crate) enum Disp {
    None,
    D8(i8),
    D32(i32),
}

impl Disp {
    /// Classify `val`, scaling by `1 << disp8_shift` for EVEX compressed
    /// displacements (SDM 2.7.5): disp8 applies only when the displacement
    /// is an exact multiple of the tuple-derived factor and the quotient
    /// fits in a signed byte.
    pub(crate) fn new(val: i32, disp8_shift: Option<u8>) -> Disp {
        if val == 0 {
            return Disp::None;
        }
        match disp8_shift {
            Some(shift) => {
                let scale = 1i32 << shift;
                if val % scale == 0 {
                    if let Ok(scaled) = i8::try_from(val / scale) {
                        return Disp::D8(scaled);
                    }
                }
                Disp::D32(val)
            }
            None => match i8::try_from(val) {
                Ok(v) => Disp::D8(v),
                Err(_) => Disp::D32(val),
            },
        }
    }

    /// Bases with the RBP low encoding require an explicit displacement.
    fn force(&mut self) {
        if let Disp::None = self {
            *self = Disp::D8(0);
        }
    }

    fn m0d(self) -> u8 {
        match self {
            Disp::None => 0b00,
            Disp::D8(_) => 0b01,
            Disp::D32(_) => 0b10,
        }
    }

    fn emit(self, sink: &mut SectionWriter<'_>) -> AsmResult<()> {
        match self {
            Disp::None => Ok(()),
            #[allow(clippy::cast_sign_loss)]
            Disp::D8(v) => sink.put1(v as u8),
            #[allow(clippy::cast_sign_loss)]
            Disp::D32(v) => sink.put4(v as u32),
        }
    }
}

/// Validate addressing-register classes and report whether a 0x67 prefix is
/// needed.
pub(crate) fn address_size_override(arch: Arch, mem: &Mem) -> AsmResult<bool> {
    let mut narrow = false;
    let mut check = |reg: Reg| match (arch, reg.class()) {
        (Arch::X64, RegClass::Gpq) | (Arch::X86, RegClass::Gpd) => Ok(()),
        (Arch::X64, RegClass::Gpd) => {
            narrow = true;
            Ok(())
        }
        _ if reg.class().is_vec() => Ok(()),
        _ => Err(AsmError::InvalidMemoryOperand),
    };
    if let Some(base) = mem.base_reg() {
        check(base)?;
    }
    if let Some(index) = mem.index_reg() {
        check(index)?;
    }
    Ok(narrow)
}

const SEG_PREFIX: [u8; 6] = [0x26, 0x2e, 0x36, 0x3e, 0x64, 0x65];

/// Emit every legacy prefix the instruction needs, in the conventional
/// order: lock, rep, segment override, address size, operand size and the
/// mandatory prefix.
pub(crate) fn emit_legacy_prefixes(
    sink: &mut SectionWriter<'_>,
    arch: Arch,
    options: &InstOptions,
    pp: u8,
    op_size16: bool,
    mem: Option<&Mem>,
) -> AsmResult<()> {
    if options.has_lock() {
        sink.put1(0xf0)?;
    }
    if options.has_rep() {
        sink.put1(0xf3)?;
    } else if options.has_repne() {
        sink.put1(0xf2)?;
    }
    if let Some(mem) = mem {
        if let Some(seg) = mem.segment_override() {
            sink.put1(SEG_PREFIX[usize::from(seg.enc())])?;
        }
        if address_size_override(arch, mem)? {
            sink.put1(0x67)?;
        }
    }
    if op_size16 || pp == 1 {
        sink.put1(0x66)?;
    }
    match pp {
        2 => sink.put1(0xf3)?,
        3 => sink.put1(0xf2)?,
        _ => {}
    }
    Ok(())
}

/// Emit a REX prefix when one is required.
///
/// The prefix is synthesized iff at least one of W, R, X, B is set or
/// emission is forced (uniform byte registers SPL/BPL/SIL/DIL, or the
/// caller's `rex()` option). `no_rex` marks tuples containing AH/CH/DH/BH,
/// which can never coexist with a REX prefix.
pub(crate) fn emit_rex(
    sink: &mut SectionWriter<'_>,
    arch: Arch,
    w: bool,
    force: bool,
    reg_enc: u8,
    x_enc: u8,
    b_enc: u8,
    no_rex: bool,
) -> AsmResult<()> {
    let rex = 0x40
        | (u8::from(w) << 3)
        | (((reg_enc >> 3) & 1) << 2)
        | (((x_enc >> 3) & 1) << 1)
        | ((b_enc >> 3) & 1);
    if rex == 0x40 && !force {
        return Ok(());
    }
    if arch == Arch::X86 || no_rex {
        return Err(AsmError::InvalidOperandCombination);
    }
    sink.put1(rex)
}

/// Emit the escape bytes selected by the opcode map.
pub(crate) fn emit_escapes(sink: &mut SectionWriter<'_>, map: OpMap) -> AsmResult<()> {
    match map {
        OpMap::Primary => Ok(()),
        OpMap::M0F => sink.put1(0x0f),
        OpMap::M0F38 => {
            sink.put1(0x0f)?;
            sink.put1(0x38)
        }
        OpMap::M0F3A => {
            sink.put1(0x0f)?;
            sink.put1(0x3a)
        }
        OpMap::M0F01 => {
            sink.put1(0x0f)?;
            sink.put1(0x01)
        }
        OpMap::Xop8 | OpMap::Xop9 | OpMap::XopA => {
            // XOP maps never use legacy escapes; the 8F prefix carries them.
            Err(AsmError::InvalidOperandCombination)
        }
    }
}

/// Emit ModR/M, SIB and displacement for the rm side.
///
/// `bytes_at_end` counts immediate bytes that follow the displacement; a
/// RIP-relative placeholder compensates for them so the final displacement
/// is relative to the instruction end (mirrors how trailing immediates are
/// handled by every x86 assembler).
pub(crate) fn emit_modrm_sib_disp(
    sink: &mut SectionWriter<'_>,
    arch: Arch,
    reg: u8,
    rm: RmRef<'_>,
    bytes_at_end: u8,
    disp8_shift: Option<u8>,
) -> AsmResult<()> {
    let reg = reg & 7;
    let mem = match rm {
        RmRef::Reg(e) => {
            return sink.put1(encode_modrm(0b11, reg, e & 7));
        }
        RmRef::Mem(mem) => mem,
    };

    if let Some(label) = mem.label_base() {
        if !sink.label_is_valid(label) {
            return Err(AsmError::InvalidLabel);
        }
        sink.put1(encode_modrm(0b00, reg, 0b101))?;
        let offset = sink.offset();
        return match arch {
            Arch::X64 => {
                // RIP-relative: the placeholder pre-subtracts the trailing
                // immediate bytes; label resolution adds the rel32 part.
                let placeholder = mem.displacement().wrapping_sub(i32::from(bytes_at_end));
                #[allow(clippy::cast_sign_loss)]
                sink.put4(placeholder as u32)?;
                sink.use_label_at(offset, FixupKind::Rel32, label)
            }
            Arch::X86 => {
                #[allow(clippy::cast_sign_loss)]
                sink.put4(mem.displacement() as u32)?;
                sink.use_label_at(offset, FixupKind::Abs32, label)
            }
        };
    }

    let base = mem.base_reg();
    let index = mem.index_reg();
    let disp = mem.displacement();

    match (base, index) {
        (None, None) => {
            // Absolute disp32. In 64-bit mode mod=00/rm=101 means
            // RIP-relative, so the SIB no-base form is required instead.
            match arch {
                Arch::X64 => {
                    sink.put1(encode_modrm(0b00, reg, 0b100))?;
                    sink.put1(encode_sib(0, 0b100, 0b101))?;
                }
                Arch::X86 => sink.put1(encode_modrm(0b00, reg, 0b101))?,
            }
            #[allow(clippy::cast_sign_loss)]
            sink.put4(disp as u32)
        }
        (None, Some(ix)) => {
            // Scaled index without a base: SIB with base=101 and disp32.
            if !ix.class().is_vec() && ix.enc() == enc::RSP {
                return Err(AsmError::InvalidMemoryOperand);
            }
            sink.put1(encode_modrm(0b00, reg, 0b100))?;
            sink.put1(encode_sib(mem.shift_amount(), ix.enc() & 7, 0b101))?;
            #[allow(clippy::cast_sign_loss)]
            sink.put4(disp as u32)
        }
        (Some(base), None) => {
            let enc_b = base.enc();
            let mut d = Disp::new(disp, disp8_shift);
            if enc_b & 7 == enc::RSP {
                // rsp/r12 base always takes the SIB escape.
                sink.put1(encode_modrm(d.m0d(), reg, 0b100))?;
                sink.put1(encode_sib(0, 0b100, 0b100))?;
            } else {
                if enc_b & 7 == enc::RBP {
                    d.force();
                }
                sink.put1(encode_modrm(d.m0d(), reg, enc_b & 7))?;
            }
            d.emit(sink)
        }
        (Some(base), Some(ix)) => {
            if !ix.class().is_vec() && ix.enc() == enc::RSP {
                return Err(AsmError::InvalidMemoryOperand);
            }
            let enc_b = base.enc();
            let mut d = Disp::new(disp, disp8_shift);
            if enc_b & 7 == enc::RBP {
                d.force();
            }
            sink.put1(encode_modrm(d.m0d(), reg, 0b100))?;
            sink.put1(encode_sib(mem.shift_amount(), ix.enc() & 7, enc_b & 7))?;
            d.emit(sink)
        }
    }
}

/// Legacy ModR/M instruction description consumed by [`emit_legacy`].
pub(crate) struct LegacyInst<'a> {
    pub opcode: Opcode,
    /// Final opcode byte (width-adjusted by the caller).
    pub opcode_byte: u8,
    /// Value of the ModR/M reg field: a register encoding or a `/digit`.
    pub reg: u8,
    pub rm: RmRef<'a>,
    pub w: bool,
    pub op_size16: bool,
    pub force_rex: bool,
    pub no_rex: bool,
    pub bytes_at_end: u8,
}

/// Emit prefixes, opcode and ModR/M/SIB/displacement for a legacy-encoded
/// instruction; the caller appends any immediate afterwards.
pub(crate) fn emit_legacy(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    li: &LegacyInst<'_>,
) -> AsmResult<()> {
    let arch = sink.arch();
    let mem = match li.rm {
        RmRef::Mem(m) => Some(m),
        RmRef::Reg(_) => None,
    };
    emit_legacy_prefixes(sink, arch, options, li.opcode.pp(), li.op_size16, mem)?;
    let (x, b) = li.rm.rex_xb();
    emit_rex(
        sink,
        arch,
        li.w,
        li.force_rex || options.has_force_rex(),
        li.reg,
        x,
        b,
        li.no_rex,
    )?;
    emit_escapes(sink, li.opcode.map())?;
    sink.put1(li.opcode_byte)?;
    emit_modrm_sib_disp(sink, arch, li.reg, li.rm, li.bytes_at_end, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modrm_bit_layout() {
        assert_eq!(encode_modrm(0b11, 0b001, 0b011), 0xcb);
        assert_eq!(encode_sib(0b10, 0b001, 0b000), 0x88);
    }

    #[test]
    fn disp_classification() {
        assert!(matches!(Disp::new(0, None), Disp::None));
        assert!(matches!(Disp::new(127, None), Disp::D8(127)));
        assert!(matches!(Disp::new(128, None), Disp::D32(128)));
        // EVEX: 64 with a 4-byte scale compresses to disp8 of 16.
        assert!(matches!(Disp::new(64, Some(2)), Disp::D8(16)));
        // 63 is not a multiple of 4.
        assert!(matches!(Disp::new(63, Some(2)), Disp::D32(63)));
        // 8128 = 127 * 64: disp8 under a 64-byte scale, disp32 under 4-byte.
        assert!(matches!(Disp::new(8128, Some(6)), Disp::D8(127)));
        assert!(matches!(Disp::new(8192, Some(6)), Disp::D32(8192)));
    }
}
