//! The assembler front-end.
//!
//! An [`Assembler`] borrows a [`CodeHolder`] exclusively (attach) for the
//! duration of an emission session and releases it on drop (detach).
//! Instructions are emitted either through the generic [`Assembler::emit`]
//! or through the per-mnemonic convenience methods, which are thin
//! forwarders.
//!
//! Instruction options (`lock`, `rep`, `k(..)`, `z()`, ...) are sticky
//! one-shot state: setting one applies to exactly the next emitted
//! instruction and is cleared afterwards, whether or not the emit succeeds.
//!
//! The first error is latched: once an emit fails, every subsequent emit
//! returns the same error without touching the buffer, so a long emission
//! sequence can be checked once at the end via [`Assembler::error`].

use crate::buffer::{CodeHolder, SectionId, SectionWriter};
use crate::encode;
use crate::error::{AsmError, AsmResult};
use crate::inst::{get_inst, Mnemonic};
use crate::matcher::select_signature;
use crate::operand::{Label, Operand};
use crate::reg::{Reg, RegClass};

/// EVEX embedded rounding control.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RoundingMode {
    /// Round to nearest even.
    Nearest,
    /// Round toward negative infinity.
    Down,
    /// Round toward positive infinity.
    Up,
    /// Truncate.
    TowardZero,
}

impl RoundingMode {
    fn bits(self) -> u8 {
        match self {
            RoundingMode::Nearest => 0b00,
            RoundingMode::Down => 0b01,
            RoundingMode::Up => 0b10,
            RoundingMode::TowardZero => 0b11,
        }
    }
}

const OPT_LOCK: u16 = 1 << 0;
const OPT_REP: u16 = 1 << 1;
const OPT_REPNE: u16 = 1 << 2;
const OPT_REX: u16 = 1 << 3;
const OPT_VEX3: u16 = 1 << 4;
const OPT_EVEX: u16 = 1 << 5;
const OPT_SHORT: u16 = 1 << 6;
const OPT_ZEROING: u16 = 1 << 7;
const OPT_SAE: u16 = 1 << 8;

const NO_ROUNDING: u8 = 0xff;

/// The modifier consumed by the next emitted instruction.
#[derive(Copy, Clone, Debug)]
pub struct InstOptions {
    flags: u16,
    mask: u8,
    rounding: u8,
}

impl Default for InstOptions {
    fn default() -> InstOptions {
        InstOptions { flags: 0, mask: 0, rounding: NO_ROUNDING }
    }
}

impl InstOptions {
    pub(crate) fn has_lock(&self) -> bool {
        self.flags & OPT_LOCK != 0
    }
    pub(crate) fn has_rep(&self) -> bool {
        self.flags & OPT_REP != 0
    }
    pub(crate) fn has_repne(&self) -> bool {
        self.flags & OPT_REPNE != 0
    }
    pub(crate) fn has_force_rex(&self) -> bool {
        self.flags & OPT_REX != 0
    }
    pub(crate) fn has_vex3(&self) -> bool {
        self.flags & OPT_VEX3 != 0
    }
    pub(crate) fn has_force_evex(&self) -> bool {
        self.flags & OPT_EVEX != 0
    }
    pub(crate) fn has_short(&self) -> bool {
        self.flags & OPT_SHORT != 0
    }
    pub(crate) fn has_zeroing(&self) -> bool {
        self.flags & OPT_ZEROING != 0
    }
    pub(crate) fn has_sae(&self) -> bool {
        self.flags & OPT_SAE != 0
    }
    /// The EVEX mask register id; 0 means unmasked.
    pub(crate) fn mask_reg(&self) -> u8 {
        self.mask
    }
    /// The embedded-rounding control bits, when requested.
    pub(crate) fn rounding(&self) -> Option<u8> {
        (self.rounding != NO_ROUNDING).then_some(self.rounding)
    }
}

/// The assembler emitter.
pub struct Assembler<'a> {
    holder: &'a mut CodeHolder,
    section: SectionId,
    options: InstOptions,
    error: Option<AsmError>,
}

impl<'a> Assembler<'a> {
    /// Attach to a holder; emission targets its `.text` section until
    /// [`Assembler::set_section`] changes that.
    pub fn new(holder: &'a mut CodeHolder) -> Assembler<'a> {
        let section = holder.text_section();
        Assembler { holder, section, options: InstOptions::default(), error: None }
    }

    /// The holder this assembler writes to.
    #[must_use]
    pub fn holder(&self) -> &CodeHolder {
        self.holder
    }

    /// The section subsequent emissions append to.
    #[must_use]
    pub fn current_section(&self) -> SectionId {
        self.section
    }

    pub fn set_section(&mut self, section: SectionId) {
        self.section = section;
    }

    /// Offset of the next byte in the current section.
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.holder.cursor(self.section)
    }

    /// The latched error, if any emit has failed.
    #[must_use]
    pub fn error(&self) -> Option<AsmError> {
        self.error
    }

    /// Forward to [`CodeHolder::new_label`].
    pub fn new_label(&mut self) -> Label {
        self.holder.new_label()
    }

    /// Bind `label` at the current position.
    pub fn bind(&mut self, label: Label) -> AsmResult<()> {
        self.check()?;
        self.holder
            .bind_label(label, self.section)
            .inspect_err(|e| self.error = Some(*e))
    }

    /// Pad the current section to `alignment` with NOPs in executable
    /// sections and zeroes elsewhere.
    pub fn align(&mut self, alignment: u32) -> AsmResult<()> {
        self.check()?;
        let fill = if self
            .holder
            .section(self.section)
            .flags()
            .contains(crate::buffer::SectionFlags::EXEC)
        {
            0x90
        } else {
            0
        };
        self.holder
            .align(self.section, alignment, fill)
            .inspect_err(|e| self.error = Some(*e))
    }

    /// Append raw bytes.
    pub fn embed(&mut self, bytes: &[u8]) -> AsmResult<()> {
        self.check()?;
        self.holder
            .push_bytes(self.section, bytes)
            .inspect_err(|e| self.error = Some(*e))
    }

    pub fn db(&mut self, v: u8) -> AsmResult<()> {
        self.embed(&[v])
    }

    pub fn dw(&mut self, v: u16) -> AsmResult<()> {
        self.embed(&v.to_le_bytes())
    }

    pub fn dd(&mut self, v: u32) -> AsmResult<()> {
        self.embed(&v.to_le_bytes())
    }

    pub fn dq(&mut self, v: u64) -> AsmResult<()> {
        self.embed(&v.to_le_bytes())
    }

    // -- sticky one-shot options ------------------------------------------

    /// `lock` prefix on the next instruction.
    pub fn lock(&mut self) -> &mut Self {
        self.options.flags |= OPT_LOCK;
        self
    }

    /// `rep`/`repe` prefix on the next string instruction.
    pub fn rep(&mut self) -> &mut Self {
        self.options.flags |= OPT_REP;
        self
    }

    /// `repne` prefix on the next string instruction.
    pub fn repne(&mut self) -> &mut Self {
        self.options.flags |= OPT_REPNE;
        self
    }

    /// Force a REX prefix even when no bit requires it.
    pub fn rex(&mut self) -> &mut Self {
        self.options.flags |= OPT_REX;
        self
    }

    /// Force the 3-byte VEX form.
    pub fn vex3(&mut self) -> &mut Self {
        self.options.flags |= OPT_VEX3;
        self
    }

    /// Force EVEX where a VEX encoding would otherwise be chosen.
    pub fn evex(&mut self) -> &mut Self {
        self.options.flags |= OPT_EVEX;
        self
    }

    /// Request the short (rel8) form of the next branch.
    pub fn short_(&mut self) -> &mut Self {
        self.options.flags |= OPT_SHORT;
        self
    }

    /// Attach an AVX-512 mask register (`{k}`) to the next instruction.
    ///
    /// # Panics
    ///
    /// Panics if `mask` is not a mask register.
    pub fn k(&mut self, mask: Reg) -> &mut Self {
        assert_eq!(mask.class(), RegClass::KMask, "mask operand must be k1..k7");
        self.options.mask = u8::try_from(mask.id()).expect("mask register id");
        self
    }

    /// Zeroing-masking (`{z}`) on the next instruction.
    pub fn z(&mut self) -> &mut Self {
        self.options.flags |= OPT_ZEROING;
        self
    }

    /// Embedded rounding (`{er}`) on the next instruction.
    pub fn er(&mut self, mode: RoundingMode) -> &mut Self {
        self.options.rounding = mode.bits();
        self
    }

    /// Suppress-all-exceptions (`{sae}`) on the next instruction.
    pub fn sae(&mut self) -> &mut Self {
        self.options.flags |= OPT_SAE;
        self
    }

    // -- emission ---------------------------------------------------------

    fn check(&self) -> AsmResult<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Emit one instruction from its mnemonic and operand list.
    pub fn emit(&mut self, id: Mnemonic, ops: &[Operand]) -> AsmResult<()> {
        self.check()?;
        let options = core::mem::take(&mut self.options);
        let result = self.emit_inner(id, ops, &options);
        if let Err(e) = result {
            log::trace!("emit {} failed: {e}", id.name());
            self.error = Some(e);
        }
        result
    }

    fn emit_inner(
        &mut self,
        id: Mnemonic,
        ops: &[Operand],
        options: &InstOptions,
    ) -> AsmResult<()> {
        let env = self.holder.env();
        let rec = get_inst(id);
        if !env.features.supports(rec.features) {
            return Err(AsmError::IncompatibleInstruction);
        }
        let sig = select_signature(env, rec, ops)?;
        let mut sink = SectionWriter::new(self.holder, self.section);
        encode::emit_inst(&mut sink, env, options, rec, sig, ops)
    }

    /// Emit with an explicit one-shot option set; used by the compiler
    /// front-end when replaying buffered nodes.
    pub(crate) fn emit_with_options(
        &mut self,
        id: Mnemonic,
        ops: &[Operand],
        options: InstOptions,
    ) -> AsmResult<()> {
        self.options = options;
        self.emit(id, ops)
    }

    fn emit0(&mut self, id: Mnemonic) -> AsmResult<()> {
        self.emit(id, &[])
    }

    fn emit1(&mut self, id: Mnemonic, op0: Operand) -> AsmResult<()> {
        self.emit(id, &[op0])
    }

    fn emit2(&mut self, id: Mnemonic, op0: Operand, op1: Operand) -> AsmResult<()> {
        self.emit(id, &[op0, op1])
    }

    fn emit3(&mut self, id: Mnemonic, op0: Operand, op1: Operand, op2: Operand) -> AsmResult<()> {
        self.emit(id, &[op0, op1, op2])
    }

    fn emit4(
        &mut self,
        id: Mnemonic,
        op0: Operand,
        op1: Operand,
        op2: Operand,
        op3: Operand,
    ) -> AsmResult<()> {
        self.emit(id, &[op0, op1, op2, op3])
    }
}

macro_rules! fwd0 {
    ($($fn_name:ident => $m:ident,)+) => {
        impl Assembler<'_> {
            $(pub fn $fn_name(&mut self) -> AsmResult<()> {
                self.emit0(Mnemonic::$m)
            })+
        }
    };
}

macro_rules! fwd1 {
    ($($fn_name:ident => $m:ident,)+) => {
        impl Assembler<'_> {
            $(pub fn $fn_name(&mut self, op0: impl Into<Operand>) -> AsmResult<()> {
                self.emit1(Mnemonic::$m, op0.into())
            })+
        }
    };
}

macro_rules! fwd2 {
    ($($fn_name:ident => $m:ident,)+) => {
        impl Assembler<'_> {
            $(pub fn $fn_name(
                &mut self,
                op0: impl Into<Operand>,
                op1: impl Into<Operand>,
            ) -> AsmResult<()> {
                self.emit2(Mnemonic::$m, op0.into(), op1.into())
            })+
        }
    };
}

macro_rules! fwd3 {
    ($($fn_name:ident => $m:ident,)+) => {
        impl Assembler<'_> {
            $(pub fn $fn_name(
                &mut self,
                op0: impl Into<Operand>,
                op1: impl Into<Operand>,
                op2: impl Into<Operand>,
            ) -> AsmResult<()> {
                self.emit3(Mnemonic::$m, op0.into(), op1.into(), op2.into())
            })+
        }
    };
}

macro_rules! fwd4 {
    ($($fn_name:ident => $m:ident,)+) => {
        impl Assembler<'_> {
            $(pub fn $fn_name(
                &mut self,
                op0: impl Into<Operand>,
                op1: impl Into<Operand>,
                op2: impl Into<Operand>,
                op3: impl Into<Operand>,
            ) -> AsmResult<()> {
                self.emit4(Mnemonic::$m, op0.into(), op1.into(), op2.into(), op3.into())
            })+
        }
    };
}

fwd0! {
    cbw => Cbw, cdq => Cdq, cdqe => Cdqe, clc => Clc, cld => Cld, cmc => Cmc,
    cmpsb => Cmpsb, cmpsq => Cmpsq, cmpsw => Cmpsw,
    cpuid => Cpuid, cqo => Cqo, cwd => Cwd, cwde => Cwde,
    faddp => Faddp, fdivp => Fdivp, fmulp => Fmulp, fsubp => Fsubp,
    hlt => Hlt, int3 => Int3, lahf => Lahf, leave => Leave,
    lodsb => Lodsb, lodsd => Lodsd, lodsq => Lodsq, lodsw => Lodsw,
    movsb => Movsb, movsq => Movsq, movsw => Movsw,
    nop => Nop, popf => Popf, pushf => Pushf, rdtsc => Rdtsc, ret => Ret,
    sahf => Sahf,
    scasb => Scasb, scasd => Scasd, scasq => Scasq, scasw => Scasw,
    stc => Stc, std => Std,
    stosb => Stosb, stosd => Stosd, stosq => Stosq, stosw => Stosw,
    ud2 => Ud2,
}

fwd1! {
    bswap => Bswap, call => Call, dec => Dec, div => Div,
    fadd => Fadd, fdiv => Fdiv, fild => Fild, fistp => Fistp, fld => Fld,
    fmul => Fmul, fst => Fst, fstp => Fstp, fsub => Fsub,
    idiv => Idiv, inc => Inc,
    ja => Ja, jae => Jae, jb => Jb, jbe => Jbe, je => Je, jg => Jg, jge => Jge,
    jl => Jl, jle => Jle, jmp => Jmp, jne => Jne, jno => Jno, jnp => Jnp,
    jns => Jns, jo => Jo, jp => Jp, js => Js,
    mul => Mul, neg => Neg, not => Not, pop => Pop, push => Push,
    ret_imm => Ret,
    seta => Seta, setae => Setae, setb => Setb, setbe => Setbe, sete => Sete,
    setg => Setg, setge => Setge, setl => Setl, setle => Setle, setne => Setne,
    setno => Setno, setnp => Setnp, setns => Setns, seto => Seto, setp => Setp,
    sets => Sets,
}

fwd2! {
    adc => Adc, add => Add, addpd => Addpd, addps => Addps, addsd => Addsd,
    addss => Addss, and => And, andnpd => Andnpd, andnps => Andnps,
    andpd => Andpd, andps => Andps,
    bsf => Bsf, bsr => Bsr, bt => Bt, btc => Btc, btr => Btr, bts => Bts,
    cmova => Cmova, cmovae => Cmovae, cmovb => Cmovb, cmovbe => Cmovbe,
    cmove => Cmove, cmovg => Cmovg, cmovge => Cmovge, cmovl => Cmovl,
    cmovle => Cmovle, cmovne => Cmovne, cmovno => Cmovno, cmovnp => Cmovnp,
    cmovns => Cmovns, cmovo => Cmovo, cmovp => Cmovp, cmovs => Cmovs,
    cmp => Cmp, cvtsi2sd => Cvtsi2sd, cvtsi2ss => Cvtsi2ss,
    cvttsd2si => Cvttsd2si, cvttss2si => Cvttss2si,
    divpd => Divpd, divps => Divps, divsd => Divsd, divss => Divss,
    enter => Enter, imul => Imul, kmovb => Kmovb, kmovd => Kmovd,
    kmovq => Kmovq, kmovw => Kmovw, lea => Lea, lzcnt => Lzcnt,
    maxpd => Maxpd, maxps => Maxps, maxsd => Maxsd, maxss => Maxss,
    minpd => Minpd, minps => Minps, minsd => Minsd, minss => Minss,
    mov => Mov, movapd => Movapd, movaps => Movaps, movd => Movd,
    movdqa => Movdqa, movdqu => Movdqu, movq => Movq, movsd => Movsd,
    movss => Movss, movsx => Movsx, movsxd => Movsxd, movupd => Movupd,
    movups => Movups, movzx => Movzx,
    mulpd => Mulpd, mulps => Mulps, mulsd => Mulsd, mulss => Mulss,
    or => Or, orpd => Orpd, orps => Orps,
    paddb => Paddb, paddd => Paddd, paddq => Paddq, paddw => Paddw,
    pand => Pand, pcmpeqb => Pcmpeqb, pcmpeqd => Pcmpeqd, pcmpeqw => Pcmpeqw,
    popcnt => Popcnt, por => Por,
    psubb => Psubb, psubd => Psubd, psubq => Psubq, psubw => Psubw,
    pxor => Pxor, rcl => Rcl, rcr => Rcr, rol => Rol, ror => Ror,
    sar => Sar, sbb => Sbb, shl => Shl, shr => Shr,
    sqrtpd => Sqrtpd, sqrtps => Sqrtps, sqrtsd => Sqrtsd, sqrtss => Sqrtss,
    sub => Sub, subpd => Subpd, subps => Subps, subsd => Subsd, subss => Subss,
    test => Test, tzcnt => Tzcnt, ucomisd => Ucomisd, ucomiss => Ucomiss,
    vbroadcastsd => Vbroadcastsd, vbroadcastss => Vbroadcastss,
    vmovapd => Vmovapd, vmovaps => Vmovaps, vmovd => Vmovd, vmovdqa => Vmovdqa,
    vmovdqa32 => Vmovdqa32, vmovdqa64 => Vmovdqa64, vmovdqu => Vmovdqu,
    vmovdqu32 => Vmovdqu32, vmovdqu64 => Vmovdqu64, vmovq => Vmovq,
    vmovsd => Vmovsd, vmovss => Vmovss, vmovupd => Vmovupd, vmovups => Vmovups,
    vpbroadcastd => Vpbroadcastd, vpbroadcastq => Vpbroadcastq,
    vsqrtpd => Vsqrtpd, vsqrtps => Vsqrtps,
    vucomisd => Vucomisd, vucomiss => Vucomiss,
    xchg => Xchg, xor => Xor, xorpd => Xorpd, xorps => Xorps,
}

fwd3! {
    cmppd => Cmppd, cmpps => Cmpps, cmpsd => Cmpsd, cmpss => Cmpss,
    imul3 => Imul, pshufd => Pshufd, shld => Shld, shrd => Shrd,
    vaddpd => Vaddpd, vaddps => Vaddps, vaddsd => Vaddsd, vaddss => Vaddss,
    vandpd => Vandpd, vandps => Vandps,
    vcvtsi2sd => Vcvtsi2sd, vcvtsi2ss => Vcvtsi2ss,
    vdivpd => Vdivpd, vdivps => Vdivps,
    vfmadd213pd => Vfmadd213pd, vfmadd213ps => Vfmadd213ps,
    vgatherdps => Vgatherdps,
    vmaxpd => Vmaxpd, vmaxps => Vmaxps, vminpd => Vminpd, vminps => Vminps,
    vmulpd => Vmulpd, vmulps => Vmulps, vmulsd => Vmulsd, vmulss => Vmulss,
    vorpd => Vorpd, vorps => Vorps,
    vpaddb => Vpaddb, vpaddd => Vpaddd, vpaddq => Vpaddq, vpaddw => Vpaddw,
    vpand => Vpand, vpandd => Vpandd, vpandq => Vpandq,
    vpor => Vpor, vpord => Vpord, vporq => Vporq, vpshufd => Vpshufd,
    vpsubb => Vpsubb, vpsubd => Vpsubd, vpsubq => Vpsubq, vpsubw => Vpsubw,
    vpxor => Vpxor, vpxord => Vpxord, vpxorq => Vpxorq,
    vsubpd => Vsubpd, vsubps => Vsubps, vsubsd => Vsubsd, vsubss => Vsubss,
    vxorpd => Vxorpd, vxorps => Vxorps,
}

fwd4! {
    vblendvps => Vblendvps, vinsertf128 => Vinsertf128,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Environment;
    use crate::operand::dword_ptr;
    use crate::reg::regs::*;

    fn assemble(f: impl FnOnce(&mut Assembler<'_>)) -> Vec<u8> {
        let mut holder = CodeHolder::new(Environment::x64());
        let mut asm = Assembler::new(&mut holder);
        f(&mut asm);
        assert_eq!(asm.error(), None);
        holder.section(0).data().to_vec()
    }

    #[test]
    fn add_reg_reg() {
        // The canonical MR form: 48 01 CB.
        assert_eq!(assemble(|a| a.add(RBX, RCX).unwrap()), vec![0x48, 0x01, 0xcb]);
    }

    #[test]
    fn options_are_one_shot() {
        let bytes = assemble(|a| {
            a.lock().add(dword_ptr(RAX), ECX).unwrap();
            a.add(dword_ptr(RAX), ECX).unwrap();
        });
        assert_eq!(bytes, vec![0xf0, 0x01, 0x08, 0x01, 0x08]);
    }

    #[test]
    fn errors_latch() {
        let mut holder = CodeHolder::new(Environment::x64());
        let mut asm = Assembler::new(&mut holder);
        // No signature accepts two immediates.
        let err = asm.emit(Mnemonic::Add, &[1i32.into(), 2i32.into()]).unwrap_err();
        assert_eq!(err, AsmError::InvalidOperandCombination);
        // A subsequently valid emit is refused with the latched error.
        assert_eq!(asm.add(RAX, RCX), Err(AsmError::InvalidOperandCombination));
        assert_eq!(asm.error(), Some(AsmError::InvalidOperandCombination));
        assert!(holder.section(0).data().is_empty());
    }

    #[test]
    fn rep_applies_to_string_ops_only() {
        let mut holder = CodeHolder::new(Environment::x64());
        let mut asm = Assembler::new(&mut holder);
        assert!(asm.rep().movsb().is_ok());
        let mut holder = CodeHolder::new(Environment::x64());
        let mut asm = Assembler::new(&mut holder);
        assert_eq!(asm.rep().add(RAX, RCX), Err(AsmError::InvalidOperandCombination));
    }

    #[test]
    fn labels_and_embed() {
        let bytes = assemble(|a| {
            let l = a.new_label();
            a.jmp(l).unwrap();
            a.embed(&[0x90; 3]).unwrap();
            a.bind(l).unwrap();
            a.ret().unwrap();
        });
        // Forward jump reserves rel32.
        assert_eq!(bytes, vec![0xe9, 3, 0, 0, 0, 0x90, 0x90, 0x90, 0xc3]);
    }

    #[test]
    fn short_jump_option() {
        let bytes = assemble(|a| {
            let l = a.new_label();
            a.short_().jmp(l).unwrap();
            a.embed(&[0x90; 3]).unwrap();
            a.bind(l).unwrap();
        });
        assert_eq!(bytes, vec![0xeb, 3, 0x90, 0x90, 0x90]);
    }
}
