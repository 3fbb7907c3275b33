//! Golden byte-sequence tests against the Intel SDM encodings.
//!
//! Reference bytes were produced with a system assembler; comments give the
//! AT&T-free Intel syntax of each case.

use anvil_x86::regs::*;
use anvil_x86::{
    byte_ptr, dword_ptr, ptr, qword_ptr, Assembler, Broadcast, CodeHolder, Environment, Mem,
    Mnemonic, Operand, RoundingMode,
};

fn asm_x64(f: impl FnOnce(&mut Assembler<'_>)) -> Vec<u8> {
    let mut holder = CodeHolder::new(Environment::x64());
    let mut asm = Assembler::new(&mut holder);
    f(&mut asm);
    assert_eq!(asm.error(), None, "emission failed");
    drop(asm);
    holder.section(0).data().to_vec()
}

fn asm_x86(f: impl FnOnce(&mut Assembler<'_>)) -> Vec<u8> {
    let mut holder = CodeHolder::new(Environment::x86());
    let mut asm = Assembler::new(&mut holder);
    f(&mut asm);
    assert_eq!(asm.error(), None, "emission failed");
    drop(asm);
    holder.section(0).data().to_vec()
}

#[test]
fn mov_eax_imm32_in_32bit_mode() {
    // mov eax, 0x12345678
    let bytes = asm_x86(|a| a.mov(EAX, 0x1234_5678u32).unwrap());
    assert_eq!(bytes, [0xb8, 0x78, 0x56, 0x34, 0x12]);
}

#[test]
fn movabs_rax_imm64() {
    // mov rax, 0x1122334455667788
    let bytes = asm_x64(|a| a.mov(RAX, 0x1122_3344_5566_7788u64).unwrap());
    assert_eq!(bytes, [0x48, 0xb8, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
}

#[test]
fn mov_r64_imm_size_classes() {
    // Zero-extendable constants use the 32-bit form.
    assert_eq!(
        asm_x64(|a| a.mov(RAX, 0x1234_5678u64).unwrap()),
        [0xb8, 0x78, 0x56, 0x34, 0x12]
    );
    // Negative 32-bit constants sign-extend through C7 /0.
    assert_eq!(
        asm_x64(|a| a.mov(RAX, -1i64).unwrap()),
        [0x48, 0xc7, 0xc0, 0xff, 0xff, 0xff, 0xff]
    );
}

#[test]
fn add_rbx_rcx() {
    let bytes = asm_x64(|a| a.add(RBX, RCX).unwrap());
    assert_eq!(bytes, [0x48, 0x01, 0xcb]);
}

#[test]
fn forward_short_jump() {
    // jmp L; 3 filler bytes; L:
    let bytes = asm_x64(|a| {
        let l = a.new_label();
        a.short_().jmp(l).unwrap();
        a.embed(&[0xcc; 3]).unwrap();
        a.bind(l).unwrap();
    });
    assert_eq!(bytes[..2], [0xeb, 0x03]);
}

#[test]
fn pop_r12() {
    let bytes = asm_x64(|a| a.pop(R12).unwrap());
    assert_eq!(bytes, [0x41, 0x5c]);
}

#[test]
fn evex_broadcast_mask_zeroing() {
    // vaddps zmm0{k1}{z}, zmm1, dword ptr [rax+64]{1to16}
    let mem = ptr(RAX).disp(64).broadcast(Broadcast::B1To16);
    let bytes = asm_x64(|a| {
        a.k(K1).z().vaddps(ZMM0, ZMM1, mem).unwrap();
    });
    // EVEX: 62 F1 74 D9; opcode 58; ModRM 40 (disp8); disp8 = 64/4 = 16.
    assert_eq!(bytes, [0x62, 0xf1, 0x74, 0xd9, 0x58, 0x40, 0x10]);
}

#[test]
fn evex_disp8_compression_boundaries() {
    // Full 64-byte tuple: disp 64 compresses to 1, disp 68 cannot.
    let bytes = asm_x64(|a| a.vaddps(ZMM0, ZMM1, ptr(RAX).disp(64)).unwrap());
    assert_eq!(bytes, [0x62, 0xf1, 0x74, 0x48, 0x58, 0x40, 0x01]);
    let bytes = asm_x64(|a| a.vaddps(ZMM0, ZMM1, ptr(RAX).disp(68)).unwrap());
    assert_eq!(bytes, [0x62, 0xf1, 0x74, 0x48, 0x58, 0x80, 0x44, 0x00, 0x00, 0x00]);
}

#[test]
fn alu_immediate_size_classes() {
    // Sign-extended imm8 form.
    assert_eq!(asm_x64(|a| a.add(EAX, 5).unwrap()), [0x83, 0xc0, 0x05]);
    // Accumulator short form.
    assert_eq!(asm_x64(|a| a.add(EAX, 300).unwrap()), [0x05, 0x2c, 0x01, 0x00, 0x00]);
    // Generic MI form.
    assert_eq!(asm_x64(|a| a.add(ECX, 300).unwrap()), [0x81, 0xc1, 0x2c, 0x01, 0x00, 0x00]);
    // Memory destination with a size hint.
    assert_eq!(asm_x64(|a| a.cmp(dword_ptr(RAX), 1).unwrap()), [0x83, 0x38, 0x01]);
}

#[test]
fn sib_and_displacement_forms() {
    // lea rax, [rbx+rcx*4+16]
    assert_eq!(
        asm_x64(|a| a.lea(RAX, ptr(RBX).index(RCX, 2).disp(16)).unwrap()),
        [0x48, 0x8d, 0x44, 0x8b, 0x10]
    );
    // rsp base forces a SIB byte.
    assert_eq!(
        asm_x64(|a| a.mov(RAX, ptr(RSP).disp(8)).unwrap()),
        [0x48, 0x8b, 0x44, 0x24, 0x08]
    );
    // rbp base forces a disp8 of zero.
    assert_eq!(asm_x64(|a| a.mov(RAX, ptr(RBP)).unwrap()), [0x48, 0x8b, 0x45, 0x00]);
    // r13 shares the rbp low bits.
    assert_eq!(asm_x64(|a| a.mov(RAX, ptr(R13)).unwrap()), [0x49, 0x8b, 0x45, 0x00]);
}

#[test]
fn rex_synthesis_rules() {
    // No REX when nothing requires one.
    assert_eq!(asm_x64(|a| a.mov(EAX, ECX).unwrap()), [0x89, 0xc8]);
    // SPL requires an empty REX.
    assert_eq!(asm_x64(|a| a.mov(SPL, 1u8).unwrap()), [0x40, 0xb4, 0x01]);
    // AH uses the same ModR/M encoding without REX.
    assert_eq!(asm_x64(|a| a.mov(AH, 1u8).unwrap()), [0xb4, 0x01]);
    // AH cannot be combined with an extended register.
    let mut holder = CodeHolder::new(Environment::x64());
    let mut a = Assembler::new(&mut holder);
    assert!(a.mov(AH, R8B).is_err());
}

#[test]
fn wide_and_narrow_operand_sizes() {
    // 16-bit operand size prefix.
    assert_eq!(asm_x64(|a| a.add(AX, CX).unwrap()), [0x66, 0x01, 0xc8]);
    // 8-bit form.
    assert_eq!(asm_x64(|a| a.add(AL, CL).unwrap()), [0x00, 0xc8]);
    // movzx from a byte in memory.
    assert_eq!(asm_x64(|a| a.movzx(EAX, byte_ptr(RAX)).unwrap()), [0x0f, 0xb6, 0x00]);
    // movsx r64 from a register byte.
    assert_eq!(asm_x64(|a| a.movsx(RAX, CL).unwrap()), [0x48, 0x0f, 0xbe, 0xc1]);
    // movsxd.
    assert_eq!(asm_x64(|a| a.movsxd(RAX, ECX).unwrap()), [0x48, 0x63, 0xc1]);
}

#[test]
fn shifts() {
    assert_eq!(asm_x64(|a| a.shl(RAX, 1).unwrap()), [0x48, 0xd1, 0xe0]);
    assert_eq!(asm_x64(|a| a.shl(RAX, 5).unwrap()), [0x48, 0xc1, 0xe0, 0x05]);
    assert_eq!(asm_x64(|a| a.shl(RAX, CL).unwrap()), [0x48, 0xd3, 0xe0]);
    assert_eq!(asm_x64(|a| a.shrd(RAX, RDX, 3).unwrap()), [0x48, 0x0f, 0xac, 0xd0, 0x03]);
}

#[test]
fn imul_forms() {
    assert_eq!(asm_x64(|a| a.imul(RAX, RBX).unwrap()), [0x48, 0x0f, 0xaf, 0xc3]);
    assert_eq!(asm_x64(|a| a.imul3(RAX, RBX, 10).unwrap()), [0x48, 0x6b, 0xc3, 0x0a]);
    assert_eq!(
        asm_x64(|a| a.imul3(RAX, RBX, 300).unwrap()),
        [0x48, 0x69, 0xc3, 0x2c, 0x01, 0x00, 0x00]
    );
    // One-operand form via the generic entry point: F7 /5.
    assert_eq!(
        asm_x64(|a| a.emit(Mnemonic::Imul, &[Operand::Reg(RCX)]).unwrap()),
        [0x48, 0xf7, 0xe9]
    );
}

#[test]
fn stack_ops() {
    assert_eq!(asm_x64(|a| a.push(RBP).unwrap()), [0x55]);
    assert_eq!(asm_x64(|a| a.push(R12).unwrap()), [0x41, 0x54]);
    assert_eq!(asm_x64(|a| a.push(0x12).unwrap()), [0x6a, 0x12]);
    assert_eq!(asm_x64(|a| a.push(0x1234).unwrap()), [0x68, 0x34, 0x12, 0x00, 0x00]);
    assert_eq!(asm_x64(|a| a.push(qword_ptr(RAX)).unwrap()), [0xff, 0x30]);
    assert_eq!(asm_x64(|a| a.ret_imm(16).unwrap()), [0xc2, 0x10, 0x00]);
}

#[test]
fn xchg_short_forms() {
    assert_eq!(asm_x64(|a| a.xchg(EAX, ECX).unwrap()), [0x91]);
    assert_eq!(asm_x64(|a| a.xchg(RAX, R8).unwrap()), [0x49, 0x90]);
    assert_eq!(asm_x64(|a| a.xchg(ECX, EDX).unwrap()), [0x87, 0xd1]);
}

#[test]
fn test_forms() {
    assert_eq!(asm_x64(|a| a.test(EAX, 0x100).unwrap()), [0xa9, 0x00, 0x01, 0x00, 0x00]);
    assert_eq!(asm_x64(|a| a.test(ECX, ECX).unwrap()), [0x85, 0xc9]);
}

#[test]
fn setcc_and_cmov() {
    assert_eq!(asm_x64(|a| a.sete(AL).unwrap()), [0x0f, 0x94, 0xc0]);
    assert_eq!(asm_x64(|a| a.seta(R11B).unwrap()), [0x41, 0x0f, 0x97, 0xc3]);
    assert_eq!(asm_x64(|a| a.cmove(EAX, ECX).unwrap()), [0x0f, 0x44, 0xc1]);
}

#[test]
fn sse_scalar_and_packed() {
    assert_eq!(asm_x64(|a| a.addss(XMM0, XMM1).unwrap()), [0xf3, 0x0f, 0x58, 0xc1]);
    assert_eq!(asm_x64(|a| a.addpd(XMM0, XMM1).unwrap()), [0x66, 0x0f, 0x58, 0xc1]);
    assert_eq!(asm_x64(|a| a.addps(XMM8, XMM1).unwrap()), [0x44, 0x0f, 0x58, 0xc1]);
    // Store direction uses the alternate opcode.
    assert_eq!(asm_x64(|a| a.movaps(ptr(RAX), XMM2).unwrap()), [0x0f, 0x29, 0x10]);
    assert_eq!(asm_x64(|a| a.movdqa(ptr(RAX), XMM1).unwrap()), [0x66, 0x0f, 0x7f, 0x08]);
    // movd/movq cross-register moves.
    assert_eq!(asm_x64(|a| a.movd(XMM0, EAX).unwrap()), [0x66, 0x0f, 0x6e, 0xc0]);
    assert_eq!(asm_x64(|a| a.movd(EAX, XMM0).unwrap()), [0x66, 0x0f, 0x7e, 0xc0]);
    // cvtsi2sd with a 64-bit source forces REX.W.
    assert_eq!(asm_x64(|a| a.cvtsi2sd(XMM0, RAX).unwrap()), [0xf2, 0x48, 0x0f, 0x2a, 0xc0]);
    // pshufd with an immediate.
    assert_eq!(asm_x64(|a| a.pshufd(XMM1, XMM2, 0x1b).unwrap()), [0x66, 0x0f, 0x70, 0xca, 0x1b]);
    // MMX form drops the 66 prefix.
    assert_eq!(asm_x64(|a| a.pxor(MM0, MM1).unwrap()), [0x0f, 0xef, 0xc1]);
}

#[test]
fn avx_forms() {
    // 2-byte VEX.
    assert_eq!(asm_x64(|a| a.vaddps(XMM0, XMM1, XMM2).unwrap()), [0xc5, 0xf0, 0x58, 0xc2]);
    assert_eq!(asm_x64(|a| a.vaddps(YMM1, YMM2, YMM3).unwrap()), [0xc5, 0xec, 0x58, 0xcb]);
    // 3-byte VEX when B extends the rm register.
    assert_eq!(
        asm_x64(|a| a.vaddps(XMM0, XMM1, XMM8).unwrap()),
        [0xc4, 0xc1, 0x70, 0x58, 0xc0]
    );
    // The vex3 option forces the long form.
    assert_eq!(
        asm_x64(|a| a.vex3().vaddps(XMM0, XMM1, XMM2).unwrap()),
        [0xc4, 0xe1, 0x70, 0x58, 0xc2]
    );
    // vblendvps encodes the fourth operand in imm8[7:4].
    assert_eq!(
        asm_x64(|a| a.vblendvps(XMM1, XMM2, XMM3, XMM4).unwrap()),
        [0xc4, 0xe3, 0x69, 0x4a, 0xcb, 0x40]
    );
    // VSIB gather.
    assert_eq!(
        asm_x64(|a| a.vgatherdps(XMM1, ptr(RAX).index(XMM2, 2), XMM3).unwrap()),
        [0xc4, 0xe2, 0x61, 0x92, 0x0c, 0x90]
    );
    // vinsertf128 has a fixed 256-bit length.
    assert_eq!(
        asm_x64(|a| a.vinsertf128(YMM1, YMM2, XMM3, 1).unwrap()),
        [0xc4, 0xe3, 0x6d, 0x18, 0xcb, 0x01]
    );
}

#[test]
fn evex_forms() {
    // High registers force EVEX even at 128 bits.
    assert_eq!(
        asm_x64(|a| a.vaddps(XMM16, XMM1, XMM2).unwrap()),
        [0x62, 0xe1, 0x74, 0x08, 0x58, 0xc2]
    );
    // EVEX-only data-typed moves.
    assert_eq!(
        asm_x64(|a| a.vmovdqa64(ZMM1, ZMM2).unwrap()),
        [0x62, 0xf1, 0xfd, 0x48, 0x6f, 0xca]
    );
    // Embedded rounding.
    assert_eq!(
        asm_x64(|a| a.er(RoundingMode::TowardZero).vaddps(ZMM0, ZMM1, ZMM2).unwrap()),
        [0x62, 0xf1, 0x74, 0x78, 0x58, 0xc2]
    );
    // kmov family.
    assert_eq!(asm_x64(|a| a.kmovw(K1, K2).unwrap()), [0xc5, 0xf8, 0x90, 0xca]);
    assert_eq!(asm_x64(|a| a.kmovw(K1, EAX).unwrap()), [0xc5, 0xf8, 0x92, 0xc8]);
    assert_eq!(asm_x64(|a| a.kmovw(EAX, K1).unwrap()), [0xc5, 0xf8, 0x93, 0xc1]);
}

#[test]
fn branches_and_labels() {
    // Backward branches use rel8 when in range.
    let bytes = asm_x64(|a| {
        let top = a.new_label();
        a.bind(top).unwrap();
        a.add(EAX, ECX).unwrap();
        a.jne(top).unwrap();
    });
    assert_eq!(bytes, [0x01, 0xc8, 0x75, 0xfc]);

    // Out-of-range backward branches fall back to rel32.
    let bytes = asm_x64(|a| {
        let top = a.new_label();
        a.bind(top).unwrap();
        a.embed(&[0x90; 200]).unwrap();
        a.jmp(top).unwrap();
    });
    assert_eq!(bytes[200..], [0xe9, 0x33, 0xff, 0xff, 0xff]);

    // Forward conditional branches reserve rel32.
    let bytes = asm_x64(|a| {
        let out = a.new_label();
        a.je(out).unwrap();
        a.nop().unwrap();
        a.bind(out).unwrap();
    });
    assert_eq!(bytes, [0x0f, 0x84, 0x01, 0x00, 0x00, 0x00, 0x90]);

    // Calls always use rel32.
    let bytes = asm_x64(|a| {
        let f = a.new_label();
        a.call(f).unwrap();
        a.bind(f).unwrap();
    });
    assert_eq!(bytes, [0xe8, 0x00, 0x00, 0x00, 0x00]);

    // Indirect forms.
    assert_eq!(asm_x64(|a| a.jmp(RAX).unwrap()), [0xff, 0xe0]);
    assert_eq!(asm_x64(|a| a.call(RAX).unwrap()), [0xff, 0xd0]);
}

#[test]
fn rip_relative_addressing() {
    let bytes = asm_x64(|a| {
        let l = a.new_label();
        a.bind(l).unwrap();
        a.dd(0x1122_3344).unwrap();
        a.mov(EAX, Mem::label(l)).unwrap();
    });
    // Data at 0; mov at 4; disp field at 6; disp = 0 - 10 = -10.
    assert_eq!(bytes[4..], [0x8b, 0x05, 0xf6, 0xff, 0xff, 0xff]);
}

#[test]
fn string_and_x87() {
    assert_eq!(asm_x64(|a| a.rep().movsb().unwrap()), [0xf3, 0xa4]);
    assert_eq!(asm_x64(|a| a.rep().stosq().unwrap()), [0xf3, 0x48, 0xab]);
    assert_eq!(asm_x64(|a| a.repne().scasb().unwrap()), [0xf2, 0xae]);
    assert_eq!(asm_x64(|a| a.fld(dword_ptr(RAX)).unwrap()), [0xd9, 0x00]);
    assert_eq!(asm_x64(|a| a.fld(qword_ptr(RAX)).unwrap()), [0xdd, 0x00]);
    assert_eq!(asm_x64(|a| a.fstp(qword_ptr(RSP)).unwrap()), [0xdd, 0x1c, 0x24]);
    assert_eq!(
        asm_x64(|a| a.emit(Mnemonic::Fadd, &[Operand::Reg(ST0), Operand::Reg(ST1)]).unwrap()),
        [0xd8, 0xc1]
    );
    assert_eq!(asm_x64(|a| a.faddp().unwrap()), [0xde, 0xc1]);
    // fsub st(1), st(0) flips to the reversed digit group.
    assert_eq!(
        asm_x64(|a| a.emit(Mnemonic::Fsub, &[Operand::Reg(ST1), Operand::Reg(ST0)]).unwrap()),
        [0xdc, 0xe9]
    );
}

#[test]
fn segment_and_address_overrides() {
    // FS segment override.
    assert_eq!(
        asm_x64(|a| a.mov(RAX, ptr(RAX).segment(FS)).unwrap()),
        [0x64, 0x48, 0x8b, 0x00]
    );
    // 32-bit base register in long mode needs 0x67.
    assert_eq!(asm_x64(|a| a.mov(EAX, ptr(EBX)).unwrap()), [0x67, 0x8b, 0x03]);
}

#[test]
fn encoding_determinism() {
    let run = || {
        asm_x64(|a| {
            a.vaddps(ZMM0, ZMM1, ptr(RAX).disp(64).broadcast(Broadcast::B1To16)).unwrap();
            a.add(RBX, RCX).unwrap();
            a.pop(R12).unwrap();
        })
    };
    assert_eq!(run(), run());
}

#[test]
fn thirty_two_bit_mode() {
    // inc/dec keep their short forms in 32-bit mode.
    assert_eq!(asm_x86(|a| a.inc(EAX).unwrap()), [0x40]);
    assert_eq!(asm_x86(|a| a.dec(ECX).unwrap()), [0x49]);
    // 64-bit registers are rejected.
    let mut holder = CodeHolder::new(Environment::x86());
    let mut a = Assembler::new(&mut holder);
    assert!(a.add(RAX, RCX).is_err());
}
