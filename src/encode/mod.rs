//! The instruction encoder.
//!
//! [`emit_inst`] dispatches on the record's [`EncodingClass`] and writes the
//! final byte sequence: legacy prefixes, REX/VEX/EVEX, opcode, ModR/M, SIB,
//! displacement and immediate. The signature selected by the validator
//! drives width decisions; the encoder re-checks the constraints that
//! matter for correctness (high-byte registers vs REX, EVEX feature
//! availability, immediate ranges) as defense in depth.

mod evex;
mod rex;
mod vex;

use crate::asm::InstOptions;
use crate::buffer::{FixupKind, SectionWriter};
use crate::cpu::{Arch, CpuFeatures, Environment};
use crate::error::{AsmError, AsmResult};
use crate::inst::opcode::{Opcode, TupleType, VexMode};
use crate::inst::signature::Signature;
use crate::inst::{EncodingClass, InstRecord};
use crate::operand::{Broadcast, Imm, Label, Operand};
use crate::reg::{Reg, RegClass};

use self::evex::EvexPrefix;
use self::rex::{
    emit_escapes, emit_legacy, emit_legacy_prefixes, emit_modrm_sib_disp, emit_rex, encode_modrm,
    LegacyInst, RmRef,
};
use self::vex::VexPrefix;

/// Encode one validated instruction into the sink.
pub(crate) fn emit_inst(
    sink: &mut SectionWriter<'_>,
    env: Environment,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
) -> AsmResult<()> {
    validate_options(rec.class, options, ops)?;
    match rec.class {
        EncodingClass::None => Err(AsmError::InvalidOperandCombination),
        EncodingClass::Op | EncodingClass::StringOp => emit_op(sink, options, rec),
        EncodingClass::M => emit_m(sink, options, rec, sig, ops, None),
        EncodingClass::IncDec => emit_incdec(sink, env, options, rec, sig, ops),
        EncodingClass::O => emit_o(sink, options, rec, ops),
        EncodingClass::Alu => emit_alu(sink, options, rec, sig, ops),
        EncodingClass::Mov => emit_mov(sink, options, rec, sig, ops),
        EncodingClass::MovExtend => emit_movext(sink, options, rec, sig, ops),
        EncodingClass::Lea => emit_lea(sink, options, rec, ops),
        EncodingClass::Test => emit_test(sink, options, rec, sig, ops),
        EncodingClass::Xchg => emit_xchg(sink, options, rec, sig, ops),
        EncodingClass::Imul => emit_imul(sink, options, rec, sig, ops),
        EncodingClass::Shift => emit_shift(sink, options, rec, sig, ops),
        EncodingClass::ShiftD => emit_shiftd(sink, options, rec, sig, ops),
        EncodingClass::BitTest => emit_bittest(sink, options, rec, sig, ops),
        EncodingClass::Push => emit_push_pop(sink, options, rec, sig, ops, true),
        EncodingClass::Pop => emit_push_pop(sink, options, rec, sig, ops, false),
        EncodingClass::Rm => emit_rm(sink, options, rec, sig, ops),
        EncodingClass::Jmp => emit_jump(sink, options, rec, ops, JumpKind::Unconditional),
        EncodingClass::Jcc => emit_jump(sink, options, rec, ops, JumpKind::Conditional),
        EncodingClass::Call => emit_jump(sink, options, rec, ops, JumpKind::Call),
        EncodingClass::Ret => emit_ret(sink, options, rec, ops),
        EncodingClass::Enter => emit_enter(sink, options, rec, ops),
        EncodingClass::Fpu => emit_fpu(sink, options, rec, sig, ops),
        EncodingClass::FpuArith => emit_fpu_arith(sink, options, rec, ops),
        EncodingClass::XmmRm => emit_xmm_rm(sink, options, rec, sig, ops, None),
        EncodingClass::XmmRmi => {
            let imm = trailing_imm8(ops)?;
            emit_xmm_rm(sink, options, rec, sig, ops, Some(imm))
        }
        EncodingClass::VexRm
        | EncodingClass::VexRvm
        | EncodingClass::VexRmi
        | EncodingClass::VexRvmi
        | EncodingClass::VexRvmr
        | EncodingClass::VexRmv
        | EncodingClass::VexKmov => emit_vector(sink, env, options, rec, sig, ops),
    }
}

// ---------------------------------------------------------------------------
// Shared width and operand helpers.

#[derive(Copy, Clone)]
struct Width {
    bytes: u32,
}

impl Width {
    fn of(bytes: u32) -> Width {
        debug_assert!(matches!(bytes, 1 | 2 | 4 | 8));
        Width { bytes }
    }

    fn is_byte(self) -> bool {
        self.bytes == 1
    }

    fn w(self) -> bool {
        self.bytes == 8
    }

    fn size16(self) -> bool {
        self.bytes == 2
    }

    /// The `opcode |= 1` convention for byte/word forms.
    fn adjust(self, byte: u8) -> u8 {
        if self.is_byte() {
            byte
        } else {
            byte | 1
        }
    }

    /// Immediate width of the classic `rm, imm` forms (imm32 even for
    /// 64-bit operands, sign-extended by hardware).
    fn imm_bytes(self) -> u32 {
        self.bytes.min(4)
    }
}

/// The operand width of a legacy GP form, derived from the operand tuple
/// and, for pure memory tuples, the matched signature slot.
fn tuple_width(sig: &Signature, ops: &[Operand]) -> Width {
    for op in explicit(ops) {
        if let Some(reg) = op.as_reg() {
            if reg.class().is_gp() {
                return Width::of(reg.size());
            }
        }
    }
    let mut slots = sig.explicit_ops();
    for op in explicit(ops) {
        let slot = slots.next().expect("validated arity");
        if let Some(mem) = op.as_mem() {
            let hinted = mem.size_hint();
            let bytes = if hinted != 0 { hinted } else { slot.mem.implied_size() };
            if bytes != 0 {
                return Width::of(bytes);
            }
        }
    }
    Width::of(4)
}

fn explicit(ops: &[Operand]) -> impl Iterator<Item = &Operand> {
    ops.iter().take_while(|o| !o.is_none())
}

/// True when the tuple contains AH/CH/DH/BH, which exclude any REX prefix.
fn tuple_no_rex(ops: &[Operand]) -> bool {
    explicit(ops).any(|op| op.as_reg().is_some_and(Reg::is_high_byte))
}

/// True when the tuple references SPL/BPL/SIL/DIL, which require a REX
/// prefix even with no extension bit set.
fn tuple_force_rex(ops: &[Operand]) -> bool {
    explicit(ops).any(|op| op.as_reg().is_some_and(Reg::is_uniform_byte))
}

fn expect_reg(op: &Operand) -> AsmResult<Reg> {
    op.as_reg().ok_or(AsmError::InvalidOperandCombination)
}

fn expect_imm(op: &Operand) -> AsmResult<Imm> {
    op.as_imm().ok_or(AsmError::InvalidOperandCombination)
}

fn rm_ref(op: &Operand) -> AsmResult<RmRef<'_>> {
    match op {
        Operand::Reg(r) => Ok(RmRef::Reg(r.enc())),
        Operand::Mem(m) => Ok(RmRef::Mem(m)),
        _ => Err(AsmError::InvalidOperandCombination),
    }
}

fn trailing_imm8(ops: &[Operand]) -> AsmResult<u8> {
    let imm = explicit(ops)
        .last()
        .and_then(Operand::as_imm)
        .ok_or(AsmError::InvalidOperandCombination)?;
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    Ok(imm.value() as u8)
}

/// Emit an immediate of `bytes` width, range checking against the stored
/// value.
fn put_imm(sink: &mut SectionWriter<'_>, imm: Imm, bytes: u32) -> AsmResult<()> {
    let v = imm.value();
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    match bytes {
        1 => {
            if !(imm.fits_i8() || imm.fits_u8()) {
                return Err(AsmError::InvalidImmediate);
            }
            sink.put1(v as u8)
        }
        2 => {
            if !(imm.fits_i16() || imm.fits_u16()) {
                return Err(AsmError::InvalidImmediate);
            }
            sink.put2(v as u16)
        }
        4 => {
            if !(imm.fits_i32() || imm.fits_u32()) {
                return Err(AsmError::InvalidImmediate);
            }
            sink.put4(v as u32)
        }
        8 => sink.put8(v as u64),
        _ => Err(AsmError::InvalidImmediate),
    }
}

/// Option validity per encoding class.
fn validate_options(
    class: EncodingClass,
    options: &InstOptions,
    ops: &[Operand],
) -> AsmResult<()> {
    if (options.has_rep() || options.has_repne()) && class != EncodingClass::StringOp {
        return Err(AsmError::InvalidOperandCombination);
    }
    if options.has_lock() {
        let mem_dest = matches!(ops.first(), Some(Operand::Mem(_)));
        let lockable = matches!(
            class,
            EncodingClass::Alu
                | EncodingClass::IncDec
                | EncodingClass::M
                | EncodingClass::BitTest
                | EncodingClass::Xchg
        );
        if !mem_dest || !lockable {
            return Err(AsmError::InvalidOperandCombination);
        }
    }
    if options.has_short() && !matches!(class, EncodingClass::Jmp | EncodingClass::Jcc) {
        return Err(AsmError::InvalidOperandCombination);
    }
    let vector = matches!(
        class,
        EncodingClass::VexRm
            | EncodingClass::VexRvm
            | EncodingClass::VexRmi
            | EncodingClass::VexRvmi
            | EncodingClass::VexRvmr
            | EncodingClass::VexRmv
            | EncodingClass::VexKmov
    );
    if !vector
        && (options.mask_reg() != 0 || options.has_zeroing() || options.rounding().is_some() || options.has_sae())
    {
        return Err(AsmError::InvalidOperandCombination);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Legacy GP paths.

fn emit_op(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
) -> AsmResult<()> {
    let arch = sink.arch();
    emit_legacy_prefixes(sink, arch, options, rec.opcode.pp(), false, None)?;
    emit_rex(sink, arch, rec.opcode.is_w(), options.has_force_rex(), 0, 0, 0, false)?;
    emit_escapes(sink, rec.opcode.map())?;
    sink.put1(rec.opcode.byte())
}

fn emit_m(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
    digit_override: Option<u8>,
) -> AsmResult<()> {
    let width = tuple_width(sig, ops);
    let digit = digit_override
        .or(rec.opcode.modrm_digit())
        .ok_or(AsmError::Relocation("M-class record without /digit"))?;
    let li = LegacyInst {
        opcode: rec.opcode,
        opcode_byte: width.adjust(rec.opcode.byte()),
        reg: digit,
        rm: rm_ref(&ops[0])?,
        w: width.w(),
        op_size16: width.size16(),
        force_rex: tuple_force_rex(ops),
        no_rex: tuple_no_rex(ops),
        bytes_at_end: 0,
    };
    emit_legacy(sink, options, &li)
}

fn emit_incdec(
    sink: &mut SectionWriter<'_>,
    env: Environment,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
) -> AsmResult<()> {
    let width = tuple_width(sig, ops);
    if env.arch == Arch::X86 && !width.is_byte() && !options.has_lock() {
        if let Some(reg) = ops[0].as_reg() {
            // 32-bit mode keeps the one-byte 40+r / 48+r forms.
            let digit = rec.opcode.modrm_digit().unwrap_or(0);
            let base = if digit == 0 { 0x40 } else { 0x48 };
            let arch = sink.arch();
            emit_legacy_prefixes(sink, arch, options, 0, width.size16(), None)?;
            return sink.put1(base + (reg.enc() & 7));
        }
    }
    emit_m(sink, options, rec, sig, ops, None)
}

fn emit_o(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    ops: &[Operand],
) -> AsmResult<()> {
    let reg = expect_reg(&ops[0])?;
    let arch = sink.arch();
    let width = Width::of(reg.size());
    emit_legacy_prefixes(sink, arch, options, rec.opcode.pp(), width.size16(), None)?;
    emit_rex(sink, arch, width.w(), options.has_force_rex(), 0, 0, reg.enc(), false)?;
    emit_escapes(sink, rec.opcode.map())?;
    sink.put1(rec.opcode.byte() + (reg.enc() & 7))
}

fn emit_alu(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
) -> AsmResult<()> {
    let width = tuple_width(sig, ops);
    let base = rec.opcode.byte();
    let digit = rec.opcode.modrm_digit().expect("ALU records carry the /digit");

    if let Some(imm) = ops[1].as_imm() {
        // Size-class selection: sign-extended imm8 first, then the
        // accumulator short forms, then the general `80/81 /digit`.
        if !width.is_byte() && imm.fits_i8() {
            let li = LegacyInst {
                opcode: rec.opcode,
                opcode_byte: 0x83,
                reg: digit,
                rm: rm_ref(&ops[0])?,
                w: width.w(),
                op_size16: width.size16(),
                force_rex: tuple_force_rex(ops),
                no_rex: tuple_no_rex(ops),
                bytes_at_end: 1,
            };
            emit_legacy(sink, options, &li)?;
            return put_imm(sink, imm, 1);
        }
        if let Some(reg) = ops[0].as_reg() {
            if reg.enc() == 0 && !reg.is_high_byte() {
                let arch = sink.arch();
                emit_legacy_prefixes(sink, arch, options, 0, width.size16(), None)?;
                emit_rex(sink, arch, width.w(), options.has_force_rex(), 0, 0, 0, false)?;
                sink.put1(width.adjust(base | 0x04))?;
                return put_imm(sink, imm, width.imm_bytes());
            }
        }
        let imm_bytes = width.imm_bytes();
        #[allow(clippy::cast_possible_truncation)]
        let li = LegacyInst {
            opcode: rec.opcode,
            opcode_byte: width.adjust(0x80),
            reg: digit,
            rm: rm_ref(&ops[0])?,
            w: width.w(),
            op_size16: width.size16(),
            force_rex: tuple_force_rex(ops),
            no_rex: tuple_no_rex(ops),
            bytes_at_end: imm_bytes as u8,
        };
        emit_legacy(sink, options, &li)?;
        return put_imm(sink, imm, imm_bytes);
    }

    // Register/memory forms: prefer MR (dst on the rm side); use RM when
    // the source is memory.
    let (opcode_byte, reg, rm) = if ops[1].as_mem().is_some() {
        (width.adjust(base | 0x02), expect_reg(&ops[0])?, rm_ref(&ops[1])?)
    } else {
        (width.adjust(base), expect_reg(&ops[1])?, rm_ref(&ops[0])?)
    };
    let li = LegacyInst {
        opcode: rec.opcode,
        opcode_byte,
        reg: reg.enc(),
        rm,
        w: width.w(),
        op_size16: width.size16(),
        force_rex: tuple_force_rex(ops),
        no_rex: tuple_no_rex(ops),
        bytes_at_end: 0,
    };
    emit_legacy(sink, options, &li)
}

fn emit_mov(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
) -> AsmResult<()> {
    use crate::inst::opcode::op;
    let arch = sink.arch();
    let a = &ops[0];
    let b = &ops[1];

    let special = |class: RegClass| {
        matches!(class, RegClass::Seg | RegClass::Cr | RegClass::Dr)
    };

    // Segment/control/debug moves.
    if let Some(rb) = b.as_reg() {
        if special(rb.class()) {
            let (word, w) = match rb.class() {
                RegClass::Seg => (op(0x8c), false),
                RegClass::Cr => (op(0x20).map0f(), false),
                RegClass::Dr => (op(0x21).map0f(), false),
                _ => unreachable!(),
            };
            let size16 = rb.class() == RegClass::Seg && a.as_reg().is_some_and(|r| r.size() == 2);
            let li = LegacyInst {
                opcode: word,
                opcode_byte: word.byte(),
                reg: rb.enc(),
                rm: rm_ref(a)?,
                w,
                op_size16: size16,
                force_rex: false,
                no_rex: false,
                bytes_at_end: 0,
            };
            return emit_legacy(sink, options, &li);
        }
    }
    if let Some(ra) = a.as_reg() {
        if special(ra.class()) {
            let word = match ra.class() {
                RegClass::Seg => op(0x8e),
                RegClass::Cr => op(0x22).map0f(),
                RegClass::Dr => op(0x23).map0f(),
                _ => unreachable!(),
            };
            let li = LegacyInst {
                opcode: word,
                opcode_byte: word.byte(),
                reg: ra.enc(),
                rm: rm_ref(b)?,
                w: false,
                op_size16: false,
                force_rex: false,
                no_rex: false,
                bytes_at_end: 0,
            };
            return emit_legacy(sink, options, &li);
        }
    }

    if let Some(imm) = b.as_imm() {
        if let Some(reg) = a.as_reg() {
            let width = Width::of(reg.size());
            let force = tuple_force_rex(ops);
            let no_rex = tuple_no_rex(ops);
            if width.is_byte() {
                emit_legacy_prefixes(sink, arch, options, 0, false, None)?;
                emit_rex(sink, arch, false, force || options.has_force_rex(), 0, 0, reg.enc(), no_rex)?;
                sink.put1(0xb0 + (reg.enc() & 7))?;
                return put_imm(sink, imm, 1);
            }
            if width.w() {
                let zero_extendable = imm.value() >= 0 && imm.fits_u32();
                if zero_extendable && !options.has_force_rex() {
                    // Implicit zero extension allows the short 32-bit form.
                    emit_legacy_prefixes(sink, arch, options, 0, false, None)?;
                    emit_rex(sink, arch, false, false, 0, 0, reg.enc(), no_rex)?;
                    sink.put1(0xb8 + (reg.enc() & 7))?;
                    return put_imm(sink, imm, 4);
                }
                if imm.fits_i32() {
                    let li = LegacyInst {
                        opcode: op(0xc7),
                        opcode_byte: 0xc7,
                        reg: 0,
                        rm: RmRef::Reg(reg.enc()),
                        w: true,
                        op_size16: false,
                        force_rex: force,
                        no_rex,
                        bytes_at_end: 4,
                    };
                    emit_legacy(sink, options, &li)?;
                    return put_imm(sink, imm, 4);
                }
                emit_legacy_prefixes(sink, arch, options, 0, false, None)?;
                emit_rex(sink, arch, true, force, 0, 0, reg.enc(), no_rex)?;
                sink.put1(0xb8 + (reg.enc() & 7))?;
                return put_imm(sink, imm, 8);
            }
            emit_legacy_prefixes(sink, arch, options, 0, width.size16(), None)?;
            emit_rex(sink, arch, false, force || options.has_force_rex(), 0, 0, reg.enc(), no_rex)?;
            sink.put1(0xb8 + (reg.enc() & 7))?;
            return put_imm(sink, imm, width.bytes);
        }
        // mov mem, imm.
        let width = tuple_width(sig, ops);
        let imm_bytes = width.imm_bytes();
        #[allow(clippy::cast_possible_truncation)]
        let li = LegacyInst {
            opcode: rec.opcode,
            opcode_byte: width.adjust(0xc6),
            reg: 0,
            rm: rm_ref(a)?,
            w: width.w(),
            op_size16: width.size16(),
            force_rex: false,
            no_rex: false,
            bytes_at_end: imm_bytes as u8,
        };
        emit_legacy(sink, options, &li)?;
        return put_imm(sink, imm, imm_bytes);
    }

    // Plain register/memory moves.
    let width = tuple_width(sig, ops);
    let (opcode_byte, reg, rm) = if b.as_mem().is_some() {
        (width.adjust(0x8a), expect_reg(a)?, rm_ref(b)?)
    } else {
        (width.adjust(0x88), expect_reg(b)?, rm_ref(a)?)
    };
    let li = LegacyInst {
        opcode: rec.opcode,
        opcode_byte,
        reg: reg.enc(),
        rm,
        w: width.w(),
        op_size16: width.size16(),
        force_rex: tuple_force_rex(ops),
        no_rex: tuple_no_rex(ops),
        bytes_at_end: 0,
    };
    emit_legacy(sink, options, &li)
}

fn emit_movext(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
) -> AsmResult<()> {
    let dst = expect_reg(&ops[0])?;
    let dst_width = Width::of(dst.size());
    // Source width picks between the byte and word forms of 0F BE/B6; the
    // doubleword source form (movsxd) keeps its opcode byte untouched.
    let src_bytes = match &ops[1] {
        Operand::Reg(r) => r.size(),
        Operand::Mem(m) => {
            let hinted = m.size_hint();
            if hinted != 0 {
                hinted
            } else {
                sig.explicit_ops()
                    .nth(1)
                    .map_or(0, |s| s.mem.implied_size())
            }
        }
        _ => return Err(AsmError::InvalidOperandCombination),
    };
    let opcode_byte = if src_bytes == 2 { rec.opcode.byte() | 1 } else { rec.opcode.byte() };
    let li = LegacyInst {
        opcode: rec.opcode,
        opcode_byte,
        reg: dst.enc(),
        rm: rm_ref(&ops[1])?,
        w: dst_width.w(),
        op_size16: dst_width.size16(),
        force_rex: tuple_force_rex(ops),
        no_rex: tuple_no_rex(ops),
        bytes_at_end: 0,
    };
    emit_legacy(sink, options, &li)
}

fn emit_lea(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    ops: &[Operand],
) -> AsmResult<()> {
    let dst = expect_reg(&ops[0])?;
    let width = Width::of(dst.size());
    let li = LegacyInst {
        opcode: rec.opcode,
        opcode_byte: rec.opcode.byte(),
        reg: dst.enc(),
        rm: rm_ref(&ops[1])?,
        w: width.w(),
        op_size16: width.size16(),
        force_rex: false,
        no_rex: false,
        bytes_at_end: 0,
    };
    emit_legacy(sink, options, &li)
}

fn emit_test(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
) -> AsmResult<()> {
    let width = tuple_width(sig, ops);
    if let Some(imm) = ops[1].as_imm() {
        if let Some(reg) = ops[0].as_reg() {
            if reg.enc() == 0 && !reg.is_high_byte() {
                let arch = sink.arch();
                emit_legacy_prefixes(sink, arch, options, 0, width.size16(), None)?;
                emit_rex(sink, arch, width.w(), options.has_force_rex(), 0, 0, 0, false)?;
                sink.put1(width.adjust(0xa8))?;
                return put_imm(sink, imm, width.imm_bytes());
            }
        }
        let imm_bytes = width.imm_bytes();
        #[allow(clippy::cast_possible_truncation)]
        let li = LegacyInst {
            opcode: rec.opcode,
            opcode_byte: width.adjust(0xf6),
            reg: 0,
            rm: rm_ref(&ops[0])?,
            w: width.w(),
            op_size16: width.size16(),
            force_rex: tuple_force_rex(ops),
            no_rex: tuple_no_rex(ops),
            bytes_at_end: imm_bytes as u8,
        };
        emit_legacy(sink, options, &li)?;
        return put_imm(sink, imm, imm_bytes);
    }
    let li = LegacyInst {
        opcode: rec.opcode,
        opcode_byte: width.adjust(0x84),
        reg: expect_reg(&ops[1])?.enc(),
        rm: rm_ref(&ops[0])?,
        w: width.w(),
        op_size16: width.size16(),
        force_rex: tuple_force_rex(ops),
        no_rex: tuple_no_rex(ops),
        bytes_at_end: 0,
    };
    emit_legacy(sink, options, &li)
}

fn emit_xchg(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
) -> AsmResult<()> {
    let width = tuple_width(sig, ops);
    if let (Some(a), Some(b)) = (ops[0].as_reg(), ops[1].as_reg()) {
        if !width.is_byte() && (a.enc() == 0 || b.enc() == 0) && !options.has_lock() {
            let other = if a.enc() == 0 { b } else { a };
            let arch = sink.arch();
            emit_legacy_prefixes(sink, arch, options, 0, width.size16(), None)?;
            emit_rex(sink, arch, width.w(), options.has_force_rex(), 0, 0, other.enc(), false)?;
            return sink.put1(0x90 + (other.enc() & 7));
        }
    }
    let (reg, rm) = if ops[0].as_mem().is_some() {
        (expect_reg(&ops[1])?, rm_ref(&ops[0])?)
    } else if ops[1].as_mem().is_some() {
        (expect_reg(&ops[0])?, rm_ref(&ops[1])?)
    } else {
        (expect_reg(&ops[1])?, rm_ref(&ops[0])?)
    };
    let li = LegacyInst {
        opcode: rec.opcode,
        opcode_byte: width.adjust(0x86),
        reg: reg.enc(),
        rm,
        w: width.w(),
        op_size16: width.size16(),
        force_rex: tuple_force_rex(ops),
        no_rex: tuple_no_rex(ops),
        bytes_at_end: 0,
    };
    emit_legacy(sink, options, &li)
}

fn emit_imul(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
) -> AsmResult<()> {
    let count = explicit(ops).count();
    let width = tuple_width(sig, ops);
    match count {
        1 => {
            let li = LegacyInst {
                opcode: crate::inst::opcode::op(0xf6),
                opcode_byte: width.adjust(0xf6),
                reg: 5,
                rm: rm_ref(&ops[0])?,
                w: width.w(),
                op_size16: width.size16(),
                force_rex: tuple_force_rex(ops),
                no_rex: tuple_no_rex(ops),
                bytes_at_end: 0,
            };
            emit_legacy(sink, options, &li)
        }
        2 => {
            let dst = expect_reg(&ops[0])?;
            let li = LegacyInst {
                opcode: rec.opcode,
                opcode_byte: rec.opcode.byte(),
                reg: dst.enc(),
                rm: rm_ref(&ops[1])?,
                w: width.w(),
                op_size16: width.size16(),
                force_rex: false,
                no_rex: false,
                bytes_at_end: 0,
            };
            emit_legacy(sink, options, &li)
        }
        3 => {
            let dst = expect_reg(&ops[0])?;
            let imm = expect_imm(&ops[2])?;
            let (byte, imm_bytes) = if imm.fits_i8() {
                (0x6b, 1)
            } else {
                (0x69, width.imm_bytes())
            };
            #[allow(clippy::cast_possible_truncation)]
            let li = LegacyInst {
                opcode: crate::inst::opcode::op(byte),
                opcode_byte: byte,
                reg: dst.enc(),
                rm: rm_ref(&ops[1])?,
                w: width.w(),
                op_size16: width.size16(),
                force_rex: false,
                no_rex: false,
                bytes_at_end: imm_bytes as u8,
            };
            emit_legacy(sink, options, &li)?;
            put_imm(sink, imm, imm_bytes)
        }
        _ => Err(AsmError::InvalidOperandCombination),
    }
}

fn emit_shift(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
) -> AsmResult<()> {
    let width = tuple_width(sig, ops);
    let digit = rec.opcode.modrm_digit().expect("shift records carry the /digit");
    let (byte, imm) = match &ops[1] {
        Operand::Reg(_) => (0xd2, None),
        Operand::Imm(imm) if imm.value() == 1 => (0xd0, None),
        Operand::Imm(imm) => (0xc0, Some(*imm)),
        _ => return Err(AsmError::InvalidOperandCombination),
    };
    let li = LegacyInst {
        opcode: rec.opcode,
        opcode_byte: width.adjust(byte),
        reg: digit,
        rm: rm_ref(&ops[0])?,
        w: width.w(),
        op_size16: width.size16(),
        force_rex: tuple_force_rex(ops),
        no_rex: tuple_no_rex(ops),
        bytes_at_end: u8::from(imm.is_some()),
    };
    emit_legacy(sink, options, &li)?;
    if let Some(imm) = imm {
        put_imm(sink, imm, 1)?;
    }
    Ok(())
}

fn emit_shiftd(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
) -> AsmResult<()> {
    let width = tuple_width(sig, ops);
    let reg = expect_reg(&ops[1])?;
    let (opcode_byte, imm) = match &ops[2] {
        Operand::Reg(_) => (rec.opcode.byte() | 1, None),
        Operand::Imm(imm) => (rec.opcode.byte(), Some(*imm)),
        _ => return Err(AsmError::InvalidOperandCombination),
    };
    let li = LegacyInst {
        opcode: rec.opcode,
        opcode_byte,
        reg: reg.enc(),
        rm: rm_ref(&ops[0])?,
        w: width.w(),
        op_size16: width.size16(),
        force_rex: tuple_force_rex(ops),
        no_rex: tuple_no_rex(ops),
        bytes_at_end: u8::from(imm.is_some()),
    };
    emit_legacy(sink, options, &li)?;
    if let Some(imm) = imm {
        put_imm(sink, imm, 1)?;
    }
    Ok(())
}

fn emit_bittest(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
) -> AsmResult<()> {
    let width = tuple_width(sig, ops);
    if let Some(imm) = ops[1].as_imm() {
        let alt = rec.alt_opcode;
        let digit = alt.modrm_digit().expect("bit-test alternate carries the /digit");
        let li = LegacyInst {
            opcode: alt,
            opcode_byte: alt.byte(),
            reg: digit,
            rm: rm_ref(&ops[0])?,
            w: width.w(),
            op_size16: width.size16(),
            force_rex: false,
            no_rex: false,
            bytes_at_end: 1,
        };
        emit_legacy(sink, options, &li)?;
        return put_imm(sink, imm, 1);
    }
    let reg = expect_reg(&ops[1])?;
    let li = LegacyInst {
        opcode: rec.opcode,
        opcode_byte: rec.opcode.byte(),
        reg: reg.enc(),
        rm: rm_ref(&ops[0])?,
        w: width.w(),
        op_size16: width.size16(),
        force_rex: false,
        no_rex: false,
        bytes_at_end: 0,
    };
    emit_legacy(sink, options, &li)
}

fn emit_push_pop(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
    is_push: bool,
) -> AsmResult<()> {
    let _ = sig;
    let arch = sink.arch();
    match &ops[0] {
        Operand::Reg(reg) => {
            let size16 = reg.size() == 2;
            emit_legacy_prefixes(sink, arch, options, 0, size16, None)?;
            // Stack width is implicit; no REX.W.
            emit_rex(sink, arch, false, options.has_force_rex(), 0, 0, reg.enc(), false)?;
            sink.put1(rec.opcode.byte() + (reg.enc() & 7))
        }
        Operand::Mem(_) => {
            let alt = rec.alt_opcode;
            let digit = alt.modrm_digit().expect("push/pop alternate carries the /digit");
            let li = LegacyInst {
                opcode: alt,
                opcode_byte: alt.byte(),
                reg: digit,
                rm: rm_ref(&ops[0])?,
                w: false,
                op_size16: false,
                force_rex: false,
                no_rex: false,
                bytes_at_end: 0,
            };
            emit_legacy(sink, options, &li)
        }
        Operand::Imm(imm) if is_push => {
            emit_legacy_prefixes(sink, arch, options, 0, false, None)?;
            if imm.fits_i8() {
                sink.put1(0x6a)?;
                put_imm(sink, *imm, 1)
            } else {
                sink.put1(0x68)?;
                put_imm(sink, *imm, 4)
            }
        }
        _ => Err(AsmError::InvalidOperandCombination),
    }
}

fn emit_rm(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
) -> AsmResult<()> {
    let width = tuple_width(sig, ops);
    let dst = expect_reg(&ops[0])?;
    let li = LegacyInst {
        opcode: rec.opcode,
        opcode_byte: rec.opcode.byte(),
        reg: dst.enc(),
        rm: rm_ref(&ops[1])?,
        w: width.w(),
        op_size16: width.size16(),
        force_rex: false,
        no_rex: false,
        bytes_at_end: 0,
    };
    emit_legacy(sink, options, &li)
}

// ---------------------------------------------------------------------------
// Branches.

enum JumpKind {
    Unconditional,
    Conditional,
    Call,
}

fn emit_jump(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    ops: &[Operand],
    kind: JumpKind,
) -> AsmResult<()> {
    match &ops[0] {
        Operand::Label(label) => emit_branch_to_label(sink, options, rec, *label, kind),
        // Indirect forms: FF /4 (jmp) or FF /2 (call).
        Operand::Reg(_) | Operand::Mem(_) => {
            let digit = match kind {
                JumpKind::Unconditional => 4,
                JumpKind::Call => 2,
                JumpKind::Conditional => return Err(AsmError::InvalidOperandCombination),
            };
            let word = crate::inst::opcode::op(0xff);
            let li = LegacyInst {
                opcode: word,
                opcode_byte: 0xff,
                reg: digit,
                rm: rm_ref(&ops[0])?,
                w: false,
                op_size16: false,
                force_rex: false,
                no_rex: false,
                bytes_at_end: 0,
            };
            emit_legacy(sink, options, &li)
        }
        _ => Err(AsmError::InvalidOperandCombination),
    }
}

fn emit_branch_to_label(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    label: Label,
    kind: JumpKind,
) -> AsmResult<()> {
    if !sink.label_is_valid(label) {
        return Err(AsmError::InvalidLabel);
    }
    let bound = sink.bound_position(label);

    let short_allowed = !matches!(kind, JumpKind::Call);
    let use_short = if options.has_short() {
        true
    } else if let (Some(target), true) = (bound, short_allowed) {
        // Backward branch: take rel8 when in range.
        let cur = i64::from(sink.offset());
        let disp = i64::from(target) - (cur + 2);
        (-128..=127).contains(&disp)
    } else {
        false
    };

    if use_short {
        if !short_allowed {
            return Err(AsmError::InvalidOperandCombination);
        }
        sink.put1(rec.opcode.byte())?;
        let at = sink.offset();
        sink.put1(0)?;
        return sink.use_label_at(at, FixupKind::Rel8, label);
    }

    match kind {
        JumpKind::Call => sink.put1(rec.opcode.byte())?,
        JumpKind::Unconditional => sink.put1(rec.alt_opcode.byte())?,
        JumpKind::Conditional => {
            sink.put1(0x0f)?;
            sink.put1(rec.alt_opcode.byte())?;
        }
    }
    let at = sink.offset();
    sink.put4(0)?;
    sink.use_label_at(at, FixupKind::Rel32, label)
}

fn emit_ret(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    ops: &[Operand],
) -> AsmResult<()> {
    let arch = sink.arch();
    emit_legacy_prefixes(sink, arch, options, 0, false, None)?;
    match explicit(ops).count() {
        0 => sink.put1(rec.opcode.byte()),
        1 => {
            let imm = expect_imm(&ops[0])?;
            sink.put1(rec.alt_opcode.byte())?;
            put_imm(sink, imm, 2)
        }
        _ => Err(AsmError::InvalidOperandCombination),
    }
}

fn emit_enter(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    ops: &[Operand],
) -> AsmResult<()> {
    let arch = sink.arch();
    emit_legacy_prefixes(sink, arch, options, 0, false, None)?;
    sink.put1(rec.opcode.byte())?;
    put_imm(sink, expect_imm(&ops[0])?, 2)?;
    put_imm(sink, expect_imm(&ops[1])?, 1)
}

// ---------------------------------------------------------------------------
// x87.

fn emit_fpu(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
) -> AsmResult<()> {
    let count = explicit(ops).count();
    if let Some(mem) = ops[0].as_mem() {
        let hinted = mem.size_hint();
        let bytes = if hinted != 0 {
            hinted
        } else {
            sig.explicit_ops().next().map_or(0, |s| s.mem.implied_size())
        };
        let word = match bytes {
            4 => rec.opcode,
            8 => rec.alt_opcode,
            _ => return Err(AsmError::InvalidOperandCombination),
        };
        let digit = word.modrm_digit().expect("x87 words carry the /digit");
        let li = LegacyInst {
            opcode: word,
            opcode_byte: word.byte(),
            reg: digit,
            rm: RmRef::Mem(mem),
            w: false,
            op_size16: false,
            force_rex: false,
            no_rex: false,
            bytes_at_end: 0,
        };
        return emit_legacy(sink, options, &li);
    }

    // Register stack forms. One operand: fld/fst/fstp st(i); the store
    // variants live on the alternate opcode.
    let arch = sink.arch();
    emit_legacy_prefixes(sink, arch, options, 0, false, None)?;
    let digit = rec.opcode.modrm_digit().expect("x87 words carry the /digit");
    if count == 1 {
        let st = expect_reg(&ops[0])?;
        let slot = sig.explicit_ops().next().expect("validated arity");
        let byte = if slot.access.is_write() { rec.alt_opcode.byte() } else { rec.opcode.byte() };
        sink.put1(byte)?;
        return sink.put1(encode_modrm(0b11, digit, st.enc() & 7));
    }
    let a = expect_reg(&ops[0])?;
    let b = expect_reg(&ops[1])?;
    if a.enc() == 0 {
        // fop st(0), st(i): the D8-family opcode.
        sink.put1(rec.opcode.byte())?;
        sink.put1(encode_modrm(0b11, digit, b.enc() & 7))
    } else {
        // fop st(i), st(0): the DC-family opcode; the subtraction and
        // division groups flip to the reversed digit there.
        debug_assert_eq!(b.enc(), 0);
        let alt_digit = rec.alt_opcode.modrm_digit().unwrap_or(digit);
        let reg_digit = if alt_digit >= 4 { alt_digit | 1 } else { alt_digit };
        sink.put1(rec.alt_opcode.byte())?;
        sink.put1(encode_modrm(0b11, reg_digit, a.enc() & 7))
    }
}

fn emit_fpu_arith(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    ops: &[Operand],
) -> AsmResult<()> {
    let arch = sink.arch();
    emit_legacy_prefixes(sink, arch, options, 0, false, None)?;
    let digit = rec.opcode.modrm_digit().expect("x87 words carry the /digit");
    let i = match explicit(ops).count() {
        // The bare form pops into st(1).
        0 => 1,
        2 => expect_reg(&ops[0])?.enc() & 7,
        _ => return Err(AsmError::InvalidOperandCombination),
    };
    sink.put1(rec.opcode.byte())?;
    sink.put1(encode_modrm(0b11, digit, i))
}

// ---------------------------------------------------------------------------
// Legacy SSE/MMX.

fn emit_xmm_rm(
    sink: &mut SectionWriter<'_>,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
    imm: Option<u8>,
) -> AsmResult<()> {
    let _ = sig;
    let arch = sink.arch();
    let a = &ops[0];
    let b = &ops[1];

    // Direction and field assignment: the vector register always occupies
    // the ModR/M reg field; stores and reg-to-GP moves use the alternate
    // opcode word.
    let (word, reg, rm) = if a.as_mem().is_some() {
        (rec.alt_opcode, expect_reg(b)?, rm_ref(a)?)
    } else if a.as_reg().is_some_and(|r| r.class().is_gp()) && rec.alt_opcode.is_some() {
        (rec.alt_opcode, expect_reg(b)?, rm_ref(a)?)
    } else {
        (rec.opcode, expect_reg(a)?, rm_ref(b)?)
    };
    if !word.is_some() {
        return Err(AsmError::InvalidOperandCombination);
    }

    // Legacy encodings reach only xmm0..xmm15.
    for op in explicit(ops) {
        if let Some(r) = op.as_reg() {
            if r.class().is_vec() && r.enc() > 15 {
                return Err(AsmError::InvalidOperandCombination);
            }
        }
    }

    let mmx = explicit(ops).any(|op| op.as_reg().is_some_and(|r| r.class() == RegClass::Mm));
    let pp = if mmx { 0 } else { word.pp() };
    // A 64-bit GP operand forces REX.W (cvtsi2sd rax, cvttsd2si rax, ...).
    let gp64 = explicit(ops).any(|op| op.as_reg().is_some_and(|r| r.class() == RegClass::Gpq));
    let w = word.is_w() || gp64;

    let mem = match rm {
        RmRef::Mem(m) => Some(m),
        RmRef::Reg(_) => None,
    };
    emit_legacy_prefixes(sink, arch, options, pp, false, mem)?;
    let (x, bb) = rm.rex_xb();
    emit_rex(sink, arch, w, options.has_force_rex(), reg.enc(), x, bb, false)?;
    emit_escapes(sink, word.map())?;
    sink.put1(word.byte())?;
    emit_modrm_sib_disp(sink, arch, reg.enc(), rm, u8::from(imm.is_some()), None)?;
    if let Some(imm) = imm {
        sink.put1(imm)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// VEX/EVEX.

fn ll_of_class(class: RegClass) -> u8 {
    match class {
        RegClass::Ymm => 1,
        RegClass::Zmm => 2,
        _ => 0,
    }
}

struct VecForm<'a> {
    word: Opcode,
    reg: Reg,
    vvvv: Option<Reg>,
    rm: RmRef<'a>,
    imm: Option<u8>,
}

fn emit_vector(
    sink: &mut SectionWriter<'_>,
    env: Environment,
    options: &InstOptions,
    rec: &'static InstRecord,
    sig: &'static Signature,
    ops: &[Operand],
) -> AsmResult<()> {
    let _ = sig;
    let form = vector_form(rec, ops)?;
    let word = form.word;
    if !word.is_some() {
        return Err(AsmError::InvalidOperandCombination);
    }

    // Effective vector length from the operand classes, with the opcode's
    // fixed length (e.g. vinsertf128) as a floor.
    let mut ll = word.ll();
    for op in explicit(ops) {
        if let Some(reg) = op.as_reg() {
            if reg.class().is_vec() {
                ll = ll.max(ll_of_class(reg.class()));
            }
        }
    }

    let mem = match form.rm {
        RmRef::Mem(m) => Some(m),
        RmRef::Reg(_) => None,
    };
    let broadcast = mem.is_some_and(|m| m.broadcast_mode() != Broadcast::None);

    // A 64-bit GP source forces W (vcvtsi2sd rax form).
    let gp64 = explicit(ops).any(|op| op.as_reg().is_some_and(|r| r.class() == RegClass::Gpq));
    let w = word.is_w() || gp64;

    let needs_evex = {
        let mut need = matches!(word.vex_mode(), VexMode::Evex)
            || options.has_force_evex()
            || options.mask_reg() != 0
            || options.has_zeroing()
            || options.rounding().is_some()
            || options.has_sae()
            || broadcast
            || ll == 2;
        for op in explicit(ops) {
            if let Some(reg) = op.as_reg() {
                if reg.class().is_vec() && reg.enc() > 15 {
                    need = true;
                }
            }
        }
        need
    };

    match (word.vex_mode(), needs_evex) {
        (VexMode::Legacy, _) => return Err(AsmError::InvalidOperandCombination),
        (VexMode::Vex, true) => return Err(AsmError::InvalidOperandCombination),
        (VexMode::Vex | VexMode::VexOrEvex, false) => {
            emit_vex_encoded(sink, env, options, &form, ll, w)
        }
        (VexMode::Evex | VexMode::VexOrEvex, true) | (VexMode::Evex, false) => {
            emit_evex_encoded(sink, env, options, &form, ll, w, broadcast)
        }
    }
}

/// Resolve operands into prefix fields per encoding class.
fn vector_form<'a>(rec: &'static InstRecord, ops: &'a [Operand]) -> AsmResult<VecForm<'a>> {
    match rec.class {
        EncodingClass::VexRm => {
            if ops[0].as_mem().is_some()
                || (ops[0].as_reg().is_some_and(|r| r.class().is_gp()) && rec.alt_opcode.is_some())
            {
                Ok(VecForm {
                    word: rec.alt_opcode,
                    reg: expect_reg(&ops[1])?,
                    vvvv: None,
                    rm: rm_ref(&ops[0])?,
                    imm: None,
                })
            } else {
                Ok(VecForm {
                    word: rec.opcode,
                    reg: expect_reg(&ops[0])?,
                    vvvv: None,
                    rm: rm_ref(&ops[1])?,
                    imm: None,
                })
            }
        }
        EncodingClass::VexRvm => Ok(VecForm {
            word: rec.opcode,
            reg: expect_reg(&ops[0])?,
            vvvv: Some(expect_reg(&ops[1])?),
            rm: rm_ref(&ops[2])?,
            imm: None,
        }),
        EncodingClass::VexRmi => Ok(VecForm {
            word: rec.opcode,
            reg: expect_reg(&ops[0])?,
            vvvv: None,
            rm: rm_ref(&ops[1])?,
            imm: Some(trailing_imm8(ops)?),
        }),
        EncodingClass::VexRvmi => Ok(VecForm {
            word: rec.opcode,
            reg: expect_reg(&ops[0])?,
            vvvv: Some(expect_reg(&ops[1])?),
            rm: rm_ref(&ops[2])?,
            imm: Some(trailing_imm8(ops)?),
        }),
        EncodingClass::VexRvmr => {
            let is4 = expect_reg(&ops[3])?;
            Ok(VecForm {
                word: rec.opcode,
                reg: expect_reg(&ops[0])?,
                vvvv: Some(expect_reg(&ops[1])?),
                rm: rm_ref(&ops[2])?,
                imm: Some(is4.enc() << 4),
            })
        }
        EncodingClass::VexRmv => Ok(VecForm {
            word: rec.opcode,
            reg: expect_reg(&ops[0])?,
            vvvv: Some(expect_reg(&ops[2])?),
            rm: rm_ref(&ops[1])?,
            imm: None,
        }),
        EncodingClass::VexKmov => {
            let a = &ops[0];
            let b = &ops[1];
            if a.as_mem().is_some() {
                // kmov mN, k: primary opcode + 1.
                Ok(VecForm {
                    word: rec.opcode.with_byte(rec.opcode.byte() + 1),
                    reg: expect_reg(b)?,
                    vvvv: None,
                    rm: rm_ref(a)?,
                    imm: None,
                })
            } else if a.as_reg().is_some_and(|r| r.class().is_gp()) {
                // kmov r, k: alternate opcode + 1.
                Ok(VecForm {
                    word: rec.alt_opcode.with_byte(rec.alt_opcode.byte() + 1),
                    reg: expect_reg(a)?,
                    vvvv: None,
                    rm: rm_ref(b)?,
                    imm: None,
                })
            } else if b.as_reg().is_some_and(|r| r.class().is_gp()) {
                // kmov k, r: alternate opcode.
                Ok(VecForm {
                    word: rec.alt_opcode,
                    reg: expect_reg(a)?,
                    vvvv: None,
                    rm: rm_ref(b)?,
                    imm: None,
                })
            } else {
                Ok(VecForm {
                    word: rec.opcode,
                    reg: expect_reg(a)?,
                    vvvv: None,
                    rm: rm_ref(b)?,
                    imm: None,
                })
            }
        }
        _ => Err(AsmError::InvalidOperandCombination),
    }
}

fn emit_vex_encoded(
    sink: &mut SectionWriter<'_>,
    env: Environment,
    options: &InstOptions,
    form: &VecForm<'_>,
    ll: u8,
    w: bool,
) -> AsmResult<()> {
    if env.arch == Arch::X86 {
        // VEX encodings exist in 32-bit mode but only registers 0..7; the
        // inverted R/X/B bits must read as ones there.
        for reg in [Some(form.reg), form.vvvv].into_iter().flatten() {
            if reg.enc() > 7 {
                return Err(AsmError::InvalidOperandCombination);
            }
        }
    }
    let vvvv = form.vvvv.map_or(0, Reg::enc);
    if vvvv > 15 || form.reg.enc() > 15 {
        return Err(AsmError::InvalidOperandCombination);
    }

    let mem = match form.rm {
        RmRef::Mem(m) => Some(m),
        RmRef::Reg(_) => None,
    };
    // Only the segment and address-size legacy prefixes survive under VEX;
    // pp subsumes the mandatory prefix.
    let arch = sink.arch();
    emit_legacy_prefixes(sink, arch, options, 0, false, mem)?;
    let (x, b) = form.rm.rex_xb();
    let prefix = VexPrefix::new(
        form.reg.enc(),
        vvvv,
        (b, x),
        u8::from(ll >= 1),
        form.word.pp(),
        form.word.map(),
        w,
        options.has_vex3(),
    );
    prefix.encode(sink)?;
    sink.put1(form.word.byte())?;
    emit_modrm_sib_disp(sink, arch, form.reg.enc(), form.rm, u8::from(form.imm.is_some()), None)?;
    if let Some(imm) = form.imm {
        sink.put1(imm)?;
    }
    Ok(())
}

fn emit_evex_encoded(
    sink: &mut SectionWriter<'_>,
    env: Environment,
    options: &InstOptions,
    form: &VecForm<'_>,
    ll: u8,
    w: bool,
    broadcast: bool,
) -> AsmResult<()> {
    if !env.features.supports(CpuFeatures::AVX512F) {
        return Err(AsmError::IncompatibleInstruction);
    }
    if env.arch == Arch::X86 && (form.reg.enc() > 7 || form.vvvv.is_some_and(|r| r.enc() > 7)) {
        return Err(AsmError::InvalidOperandCombination);
    }
    if options.has_zeroing() && options.mask_reg() == 0 {
        // Zeroing requires a mask register.
        return Err(AsmError::InvalidOperandCombination);
    }
    if form.imm.is_some() && (options.rounding().is_some() || options.has_sae()) {
        return Err(AsmError::InvalidOperandCombination);
    }

    let tuple = form.word.tuple_type();
    let mem = match form.rm {
        RmRef::Mem(m) => Some(m),
        RmRef::Reg(_) => None,
    };

    // Embedded rounding/SAE override L'L and are valid only for
    // register-only operands.
    let (ll_bits, b_flag) = if let Some(rc) = options.rounding() {
        if mem.is_some() {
            return Err(AsmError::InvalidOperandCombination);
        }
        (rc, true)
    } else if options.has_sae() {
        if mem.is_some() {
            return Err(AsmError::InvalidOperandCombination);
        }
        (ll, true)
    } else {
        (ll, broadcast)
    };

    if broadcast {
        // The broadcast element size is fixed by the tuple type and W; the
        // requested repetition must fill the vector exactly.
        let elem = match (tuple, w) {
            (TupleType::Full, false) | (TupleType::Half, _) => 4u32,
            (TupleType::Full, true) => 8,
            _ => return Err(AsmError::InvalidOperandCombination),
        };
        let lanes = (16u32 << ll) / elem;
        let requested = mem.map_or(0, |m| m.broadcast_mode().count());
        if requested != lanes {
            return Err(AsmError::InvalidOperandCombination);
        }
    }

    let arch = sink.arch();
    emit_legacy_prefixes(sink, arch, options, 0, false, mem)?;

    let (b_bit, x_bit) = match form.rm {
        RmRef::Reg(enc) => ((enc >> 3) & 1, (enc >> 4) & 1),
        RmRef::Mem(m) => {
            let base = m.base_reg().map_or(0, |r| (r.enc() >> 3) & 1);
            let index = m.index_reg().map_or(0, |r| (r.enc() >> 3) & 1);
            (base, index)
        }
    };
    let vvvv = form.vvvv.map_or(0, Reg::enc);
    let prefix = EvexPrefix::new(
        form.reg.enc(),
        vvvv,
        (b_bit, x_bit),
        ll_bits,
        form.word.pp(),
        form.word.map(),
        w,
        b_flag,
        options.mask_reg(),
        options.has_zeroing(),
    );
    prefix.encode(sink)?;
    sink.put1(form.word.byte())?;
    let disp8_shift = tuple.disp8_shift(ll, w, broadcast);
    emit_modrm_sib_disp(
        sink,
        arch,
        form.reg.enc(),
        form.rm,
        u8::from(form.imm.is_some()),
        Some(disp8_shift),
    )?;
    if let Some(imm) = form.imm {
        sink.put1(imm)?;
    }
    Ok(())
}
