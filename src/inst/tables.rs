//! The static instruction tables.
//!
//! One record per mnemonic, in identifier order, plus the shared metadata
//! table. Rows are written with the const builders from
//! [`opcode`](super::opcode) and [`signature`](super::signature) so each one
//! reads like its reference-manual entry. The layout of signature lists is
//! significant: the validator picks the first match, so reg-reg rows precede
//! memory rows and narrow immediates precede wide ones.

use super::opcode::{op, Opcode, TupleType};
use super::signature::{r, rw, sig, sig32, sig64, w, MemFormSet as M, OpKindSet as K, Signature};
use super::{CommonInfo, ControlFlow, EFlags, EncodingClass as E, InstRecord, SingleReg};
use crate::cpu::CpuFeatures as F;

// ---------------------------------------------------------------------------
// Shared metadata.

const NONE: u16 = 0;
const ARITH: u16 = 1;
const ARITH_CF: u16 = 2;
const LOGIC_RO: u16 = 3;
const LOGIC_WO: u16 = 4;
const CC_IN: u16 = 5;
const BRANCH: u16 = 6;
const JUMP: u16 = 7;
const CALL: u16 = 8;
const RET: u16 = 9;
const DIR_W: u16 = 10;
const CARRY_W: u16 = 11;
const LAHF: u16 = 12;
const SAHF: u16 = 13;
const STRING: u16 = 14;
const STRING_CMP: u16 = 15;
const SHIFT_CF: u16 = 16;

pub(crate) static COMMON: &[CommonInfo] = &[
    common(EFlags::NONE, EFlags::NONE, ControlFlow::Regular, SingleReg::None),
    common(EFlags::NONE, EFlags::STATUS, ControlFlow::Regular, SingleReg::None),
    common(EFlags::CF, EFlags::STATUS, ControlFlow::Regular, SingleReg::None),
    common(EFlags::NONE, EFlags::STATUS, ControlFlow::Regular, SingleReg::ReadOnly),
    common(EFlags::NONE, EFlags::STATUS, ControlFlow::Regular, SingleReg::WriteOnly),
    common(EFlags::STATUS, EFlags::NONE, ControlFlow::Regular, SingleReg::None),
    common(EFlags::STATUS, EFlags::NONE, ControlFlow::Branch, SingleReg::None),
    common(EFlags::NONE, EFlags::NONE, ControlFlow::Jump, SingleReg::None),
    common(EFlags::NONE, EFlags::NONE, ControlFlow::Call, SingleReg::None),
    common(EFlags::NONE, EFlags::NONE, ControlFlow::Return, SingleReg::None),
    common(EFlags::NONE, EFlags::DF, ControlFlow::Regular, SingleReg::None),
    common(EFlags::CF, EFlags::CF, ControlFlow::Regular, SingleReg::None),
    common(EFlags::STATUS, EFlags::NONE, ControlFlow::Regular, SingleReg::None),
    common(EFlags::NONE, EFlags::STATUS, ControlFlow::Regular, SingleReg::None),
    common(EFlags::DF, EFlags::NONE, ControlFlow::Regular, SingleReg::None),
    common(EFlags::DF, EFlags::STATUS, ControlFlow::Regular, SingleReg::None),
    common(EFlags::CF, EFlags::STATUS, ControlFlow::Regular, SingleReg::None),
];

const fn common(
    flags_read: EFlags,
    flags_written: EFlags,
    control: ControlFlow,
    single_reg: SingleReg,
) -> CommonInfo {
    CommonInfo { flags_read, flags_written, control, single_reg }
}

const fn inst(
    name: &'static str,
    class: E,
    opcode: Opcode,
    alt_opcode: Opcode,
    common: u16,
    features: F,
    sigs: &'static [Signature],
) -> InstRecord {
    InstRecord { name, class, opcode, alt_opcode, common, features, sigs }
}

// ---------------------------------------------------------------------------
// Signature building blocks.

const RM8: K = K::R8.or(K::MEM);
const RM16: K = K::R16.or(K::MEM);
const RM32: K = K::R32.or(K::MEM);
const RM64: K = K::R64.or(K::MEM);
const GPV: K = K::R16.or(K::R32).or(K::R64);
const IMM8: K = K::I8.or(K::U8);
const IMM16: K = K::I16.or(K::U16);
const IMM32: K = K::I32.or(K::U32);
const XM128: K = K::XMM.or(K::MEM);
const YM256: K = K::YMM.or(K::MEM);
const ZM512: K = K::ZMM.or(K::MEM);
const MMM64: K = K::MM.or(K::MEM);

/// al/cl are pinned by hardware encoding, not by class.
const ENC_AX: u8 = 0;
const ENC_CX: u8 = 1;
const ENC_DX: u8 = 2;

static ALU_SIGS: &[Signature] = &[
    sig(&[rw(RM8).mem(M::M8), r(K::R8)]),
    sig(&[rw(RM16).mem(M::M16), r(K::R16)]),
    sig(&[rw(RM32).mem(M::M32), r(K::R32)]),
    sig64(&[rw(RM64).mem(M::M64), r(K::R64)]),
    sig(&[rw(K::R8), r(K::MEM).mem(M::M8)]),
    sig(&[rw(K::R16), r(K::MEM).mem(M::M16)]),
    sig(&[rw(K::R32), r(K::MEM).mem(M::M32)]),
    sig64(&[rw(K::R64), r(K::MEM).mem(M::M64)]),
    sig(&[rw(RM8).mem(M::M8), r(IMM8)]),
    sig(&[rw(RM16).mem(M::M16), r(IMM16.or(K::I8))]),
    sig(&[rw(RM32).mem(M::M32), r(IMM32.or(K::I8))]),
    sig64(&[rw(RM64).mem(M::M64), r(K::I32.or(K::I8))]),
];

static CMP_SIGS: &[Signature] = &[
    sig(&[r(RM8).mem(M::M8), r(K::R8)]),
    sig(&[r(RM16).mem(M::M16), r(K::R16)]),
    sig(&[r(RM32).mem(M::M32), r(K::R32)]),
    sig64(&[r(RM64).mem(M::M64), r(K::R64)]),
    sig(&[r(K::R8), r(K::MEM).mem(M::M8)]),
    sig(&[r(K::R16), r(K::MEM).mem(M::M16)]),
    sig(&[r(K::R32), r(K::MEM).mem(M::M32)]),
    sig64(&[r(K::R64), r(K::MEM).mem(M::M64)]),
    sig(&[r(RM8).mem(M::M8), r(IMM8)]),
    sig(&[r(RM16).mem(M::M16), r(IMM16.or(K::I8))]),
    sig(&[r(RM32).mem(M::M32), r(IMM32.or(K::I8))]),
    sig64(&[r(RM64).mem(M::M64), r(K::I32.or(K::I8))]),
];

static MOV_SIGS: &[Signature] = &[
    sig(&[w(RM8).mem(M::M8), r(K::R8)]),
    sig(&[w(RM16).mem(M::M16), r(K::R16)]),
    sig(&[w(RM32).mem(M::M32), r(K::R32)]),
    sig64(&[w(RM64).mem(M::M64), r(K::R64)]),
    sig(&[w(K::R8), r(K::MEM).mem(M::M8)]),
    sig(&[w(K::R16), r(K::MEM).mem(M::M16)]),
    sig(&[w(K::R32), r(K::MEM).mem(M::M32)]),
    sig64(&[w(K::R64), r(K::MEM).mem(M::M64)]),
    sig(&[w(GPV.or(K::MEM)).mem(M::M16), r(K::SREG)]),
    sig(&[w(K::SREG), r(GPV.or(K::MEM)).mem(M::M16)]),
    sig(&[w(K::R8), r(IMM8)]),
    sig(&[w(K::R16), r(IMM16)]),
    sig(&[w(K::R32), r(IMM32)]),
    sig64(&[w(K::R64), r(K::I64.or(K::U64))]),
    sig(&[w(K::MEM).mem(M::M8), r(IMM8)]),
    sig(&[w(K::MEM).mem(M::M16), r(IMM16)]),
    sig(&[w(K::MEM).mem(M::M32), r(IMM32)]),
    sig64(&[w(K::MEM).mem(M::M64), r(K::I32)]),
    sig(&[w(K::CREG), r(K::R32.or(K::R64))]),
    sig(&[w(K::R32.or(K::R64)), r(K::CREG)]),
    sig(&[w(K::DREG), r(K::R32.or(K::R64))]),
    sig(&[w(K::R32.or(K::R64)), r(K::DREG)]),
];

static MOVSX_SIGS: &[Signature] = &[
    sig(&[w(GPV), r(RM8).mem(M::M8)]),
    sig(&[w(K::R32.or(K::R64)), r(RM16).mem(M::M16)]),
];

static MOVSXD_SIGS: &[Signature] = &[sig64(&[w(K::R64), r(RM32).mem(M::M32)])];

static LEA_SIGS: &[Signature] = &[sig(&[w(GPV), r(K::MEM).mem(M::ANY)])];

static TEST_SIGS: &[Signature] = &[
    sig(&[r(RM8).mem(M::M8), r(K::R8)]),
    sig(&[r(RM16).mem(M::M16), r(K::R16)]),
    sig(&[r(RM32).mem(M::M32), r(K::R32)]),
    sig64(&[r(RM64).mem(M::M64), r(K::R64)]),
    sig(&[r(RM8).mem(M::M8), r(IMM8)]),
    sig(&[r(RM16).mem(M::M16), r(IMM16)]),
    sig(&[r(RM32).mem(M::M32), r(IMM32)]),
    sig64(&[r(RM64).mem(M::M64), r(K::I32)]),
];

static XCHG_SIGS: &[Signature] = &[
    sig(&[rw(RM8).mem(M::M8), rw(K::R8)]),
    sig(&[rw(RM16).mem(M::M16), rw(K::R16)]),
    sig(&[rw(RM32).mem(M::M32), rw(K::R32)]),
    sig64(&[rw(RM64).mem(M::M64), rw(K::R64)]),
    sig(&[rw(K::R8), rw(K::MEM).mem(M::M8)]),
    sig(&[rw(K::R16), rw(K::MEM).mem(M::M16)]),
    sig(&[rw(K::R32), rw(K::MEM).mem(M::M32)]),
    sig64(&[rw(K::R64), rw(K::MEM).mem(M::M64)]),
];

static IMUL_SIGS: &[Signature] = &[
    sig(&[rw(K::R16), r(RM16).mem(M::M16)]),
    sig(&[rw(K::R32), r(RM32).mem(M::M32)]),
    sig64(&[rw(K::R64), r(RM64).mem(M::M64)]),
    sig(&[w(K::R16), r(RM16).mem(M::M16), r(K::I8.or(K::I16))]),
    sig(&[w(K::R32), r(RM32).mem(M::M32), r(K::I8.or(K::I32))]),
    sig64(&[w(K::R64), r(RM64).mem(M::M64), r(K::I8.or(K::I32))]),
    sig(&[r(RM8).mem(M::M8), rw(K::R16).fixed(ENC_AX).implicit()]),
    sig(&[r(RM16).mem(M::M16), rw(K::R16).fixed(ENC_AX).implicit(), w(K::R16).fixed(ENC_DX).implicit()]),
    sig(&[r(RM32).mem(M::M32), rw(K::R32).fixed(ENC_AX).implicit(), w(K::R32).fixed(ENC_DX).implicit()]),
    sig64(&[r(RM64).mem(M::M64), rw(K::R64).fixed(ENC_AX).implicit(), w(K::R64).fixed(ENC_DX).implicit()]),
];

static MULDIV_SIGS: &[Signature] = &[
    sig(&[r(RM8).mem(M::M8), rw(K::R16).fixed(ENC_AX).implicit()]),
    sig(&[r(RM16).mem(M::M16), rw(K::R16).fixed(ENC_AX).implicit(), rw(K::R16).fixed(ENC_DX).implicit()]),
    sig(&[r(RM32).mem(M::M32), rw(K::R32).fixed(ENC_AX).implicit(), rw(K::R32).fixed(ENC_DX).implicit()]),
    sig64(&[r(RM64).mem(M::M64), rw(K::R64).fixed(ENC_AX).implicit(), rw(K::R64).fixed(ENC_DX).implicit()]),
];

static RM_RW_SIGS: &[Signature] = &[
    sig(&[rw(RM8).mem(M::M8)]),
    sig(&[rw(RM16).mem(M::M16)]),
    sig(&[rw(RM32).mem(M::M32)]),
    sig64(&[rw(RM64).mem(M::M64)]),
];

static SETCC_SIGS: &[Signature] = &[sig(&[w(RM8).mem(M::M8)])];

static SHIFT_SIGS: &[Signature] = &[
    sig(&[rw(RM8).mem(M::M8), r(IMM8)]),
    sig(&[rw(RM16).mem(M::M16), r(IMM8)]),
    sig(&[rw(RM32).mem(M::M32), r(IMM8)]),
    sig64(&[rw(RM64).mem(M::M64), r(IMM8)]),
    sig(&[rw(RM8).mem(M::M8), r(K::R8LO).fixed(ENC_CX)]),
    sig(&[rw(RM16).mem(M::M16), r(K::R8LO).fixed(ENC_CX)]),
    sig(&[rw(RM32).mem(M::M32), r(K::R8LO).fixed(ENC_CX)]),
    sig64(&[rw(RM64).mem(M::M64), r(K::R8LO).fixed(ENC_CX)]),
];

static SHIFTD_SIGS: &[Signature] = &[
    sig(&[rw(RM16).mem(M::M16), r(K::R16), r(IMM8)]),
    sig(&[rw(RM32).mem(M::M32), r(K::R32), r(IMM8)]),
    sig64(&[rw(RM64).mem(M::M64), r(K::R64), r(IMM8)]),
    sig(&[rw(RM16).mem(M::M16), r(K::R16), r(K::R8LO).fixed(ENC_CX)]),
    sig(&[rw(RM32).mem(M::M32), r(K::R32), r(K::R8LO).fixed(ENC_CX)]),
    sig64(&[rw(RM64).mem(M::M64), r(K::R64), r(K::R8LO).fixed(ENC_CX)]),
];

static BT_SIGS: &[Signature] = &[
    sig(&[r(RM16).mem(M::M16), r(K::R16)]),
    sig(&[r(RM32).mem(M::M32), r(K::R32)]),
    sig64(&[r(RM64).mem(M::M64), r(K::R64)]),
    sig(&[r(RM16).mem(M::M16), r(IMM8)]),
    sig(&[r(RM32).mem(M::M32), r(IMM8)]),
    sig64(&[r(RM64).mem(M::M64), r(IMM8)]),
];

static BTX_SIGS: &[Signature] = &[
    sig(&[rw(RM16).mem(M::M16), r(K::R16)]),
    sig(&[rw(RM32).mem(M::M32), r(K::R32)]),
    sig64(&[rw(RM64).mem(M::M64), r(K::R64)]),
    sig(&[rw(RM16).mem(M::M16), r(IMM8)]),
    sig(&[rw(RM32).mem(M::M32), r(IMM8)]),
    sig64(&[rw(RM64).mem(M::M64), r(IMM8)]),
];

static PUSH_SIGS: &[Signature] = &[
    sig64(&[r(K::R64)]),
    sig32(&[r(K::R32)]),
    sig(&[r(K::R16)]),
    sig64(&[r(K::MEM).mem(M::M64)]),
    sig32(&[r(K::MEM).mem(M::M32)]),
    sig(&[r(K::I8.or(K::I32))]),
];

static POP_SIGS: &[Signature] = &[
    sig64(&[w(K::R64)]),
    sig32(&[w(K::R32)]),
    sig(&[w(K::R16)]),
    sig64(&[w(K::MEM).mem(M::M64)]),
    sig32(&[w(K::MEM).mem(M::M32)]),
];

static CMOV_SIGS: &[Signature] = &[
    sig(&[rw(K::R16), r(RM16).mem(M::M16)]),
    sig(&[rw(K::R32), r(RM32).mem(M::M32)]),
    sig64(&[rw(K::R64), r(RM64).mem(M::M64)]),
];

static BITSCAN_SIGS: &[Signature] = &[
    sig(&[w(K::R16), r(RM16).mem(M::M16)]),
    sig(&[w(K::R32), r(RM32).mem(M::M32)]),
    sig64(&[w(K::R64), r(RM64).mem(M::M64)]),
];

static BSWAP_SIGS: &[Signature] = &[
    sig(&[rw(K::R32)]),
    sig64(&[rw(K::R64)]),
];

static REL_SIGS: &[Signature] = &[sig(&[r(K::REL)])];

static JMP_SIGS: &[Signature] = &[
    sig(&[r(K::REL)]),
    sig64(&[r(K::R64.or(K::MEM)).mem(M::M64)]),
    sig32(&[r(K::R32.or(K::MEM)).mem(M::M32)]),
];

static RET_SIGS: &[Signature] = &[
    sig(&[]),
    sig(&[r(IMM16)]),
];

static NOARG_SIGS: &[Signature] = &[sig(&[])];
static NOARG64_SIGS: &[Signature] = &[sig64(&[])];

static ENTER_SIGS: &[Signature] = &[sig(&[r(IMM16), r(IMM8)])];

// x87.
static FLD_SIGS: &[Signature] = &[
    sig(&[r(K::MEM).mem(M::M32), w(K::ST).fixed(0).implicit()]),
    sig(&[r(K::MEM).mem(M::M64), w(K::ST).fixed(0).implicit()]),
    sig(&[r(K::ST)]),
];
static FST_SIGS: &[Signature] = &[
    sig(&[w(K::MEM).mem(M::M32), r(K::ST).fixed(0).implicit()]),
    sig(&[w(K::MEM).mem(M::M64), r(K::ST).fixed(0).implicit()]),
    sig(&[w(K::ST)]),
];
static FARITH_SIGS: &[Signature] = &[
    sig(&[r(K::MEM).mem(M::M32), rw(K::ST).fixed(0).implicit()]),
    sig(&[r(K::MEM).mem(M::M64), rw(K::ST).fixed(0).implicit()]),
    sig(&[rw(K::ST).fixed(0), r(K::ST)]),
    sig(&[rw(K::ST), r(K::ST).fixed(0)]),
];
static FARITHP_SIGS: &[Signature] = &[
    sig(&[rw(K::ST), r(K::ST).fixed(0)]),
    sig(&[]),
];
static FILD_SIGS: &[Signature] = &[
    sig(&[r(K::MEM).mem(M::M32), w(K::ST).fixed(0).implicit()]),
    sig(&[r(K::MEM).mem(M::M64), w(K::ST).fixed(0).implicit()]),
];
static FISTP_SIGS: &[Signature] = &[
    sig(&[w(K::MEM).mem(M::M32), r(K::ST).fixed(0).implicit()]),
    sig(&[w(K::MEM).mem(M::M64), r(K::ST).fixed(0).implicit()]),
];

// Legacy SSE shapes.
static XMM_RM_RW: &[Signature] = &[sig(&[rw(K::XMM), r(XM128).mem(M::M128)])];
static XMM_RM_RW_MMX: &[Signature] = &[
    sig(&[rw(K::XMM), r(XM128).mem(M::M128)]),
    sig(&[rw(K::MM), r(MMM64).mem(M::M64)]),
];
static XMM_RM_SS: &[Signature] = &[sig(&[rw(K::XMM), r(XM128).mem(M::M32)])];
static XMM_RM_SD: &[Signature] = &[sig(&[rw(K::XMM), r(XM128).mem(M::M64)])];
static XMM_SQRT_PS: &[Signature] = &[sig(&[w(K::XMM), r(XM128).mem(M::M128)])];
static UCOMISS_SIGS: &[Signature] = &[sig(&[r(K::XMM), r(XM128).mem(M::M32)])];
static UCOMISD_SIGS: &[Signature] = &[sig(&[r(K::XMM), r(XM128).mem(M::M64)])];
static MOVAPS_SIGS: &[Signature] = &[
    sig(&[w(K::XMM), r(XM128).mem(M::M128)]),
    sig(&[w(K::MEM).mem(M::M128), r(K::XMM)]),
];
static MOVSS_SIGS: &[Signature] = &[
    sig(&[w(K::XMM), r(XM128).mem(M::M32)]),
    sig(&[w(K::MEM).mem(M::M32), r(K::XMM)]),
];
static MOVSD_SIGS: &[Signature] = &[
    sig(&[w(K::XMM), r(XM128).mem(M::M64)]),
    sig(&[w(K::MEM).mem(M::M64), r(K::XMM)]),
];
static MOVD_SIGS: &[Signature] = &[
    sig(&[w(K::XMM), r(RM32).mem(M::M32)]),
    sig(&[w(RM32).mem(M::M32), r(K::XMM)]),
];
static MOVQ_SIGS: &[Signature] = &[
    sig(&[w(K::XMM), r(XM128).mem(M::M64)]),
    sig(&[w(K::MEM).mem(M::M64), r(K::XMM)]),
];
static CVTSI2SS_SIGS: &[Signature] = &[
    sig(&[rw(K::XMM), r(RM32).mem(M::M32)]),
    sig64(&[rw(K::XMM), r(RM64).mem(M::M64)]),
];
static CVTTSS2SI_SIGS: &[Signature] = &[
    sig(&[w(K::R32), r(XM128).mem(M::M32)]),
    sig64(&[w(K::R64), r(XM128).mem(M::M32)]),
];
static CVTTSD2SI_SIGS: &[Signature] = &[
    sig(&[w(K::R32), r(XM128).mem(M::M64)]),
    sig64(&[w(K::R64), r(XM128).mem(M::M64)]),
];
static PSHUFD_SIGS: &[Signature] = &[sig(&[w(K::XMM), r(XM128).mem(M::M128), r(IMM8)])];
static CMPPS_SIGS: &[Signature] = &[sig(&[rw(K::XMM), r(XM128).mem(M::M128), r(IMM8)])];
static CMPSS_SIGS: &[Signature] = &[sig(&[rw(K::XMM), r(XM128).mem(M::M32), r(IMM8)])];
static CMPSD_SIGS: &[Signature] = &[sig(&[rw(K::XMM), r(XM128).mem(M::M64), r(IMM8)])];

// AVX/AVX-512 shapes.
static V_RVM_PACKED: &[Signature] = &[
    sig(&[w(K::XMM), r(K::XMM), r(XM128).mem(M::M128)]),
    sig(&[w(K::YMM), r(K::YMM), r(YM256).mem(M::M256)]),
    sig(&[w(K::ZMM), r(K::ZMM), r(ZM512).mem(M::M512)]),
];
static V_RVM_PACKED_NOZMM: &[Signature] = &[
    sig(&[w(K::XMM), r(K::XMM), r(XM128).mem(M::M128)]),
    sig(&[w(K::YMM), r(K::YMM), r(YM256).mem(M::M256)]),
];
static V_RVM_SS: &[Signature] = &[sig(&[w(K::XMM), r(K::XMM), r(XM128).mem(M::M32)])];
static V_RVM_SD: &[Signature] = &[sig(&[w(K::XMM), r(K::XMM), r(XM128).mem(M::M64)])];
static V_FMA_PACKED: &[Signature] = &[
    sig(&[rw(K::XMM), r(K::XMM), r(XM128).mem(M::M128)]),
    sig(&[rw(K::YMM), r(K::YMM), r(YM256).mem(M::M256)]),
    sig(&[rw(K::ZMM), r(K::ZMM), r(ZM512).mem(M::M512)]),
];
static V_RM_PACKED: &[Signature] = &[
    sig(&[w(K::XMM), r(XM128).mem(M::M128)]),
    sig(&[w(K::MEM).mem(M::M128), r(K::XMM)]),
    sig(&[w(K::YMM), r(YM256).mem(M::M256)]),
    sig(&[w(K::MEM).mem(M::M256), r(K::YMM)]),
    sig(&[w(K::ZMM), r(ZM512).mem(M::M512)]),
    sig(&[w(K::MEM).mem(M::M512), r(K::ZMM)]),
];
static V_RM_PACKED_NOZMM: &[Signature] = &[
    sig(&[w(K::XMM), r(XM128).mem(M::M128)]),
    sig(&[w(K::MEM).mem(M::M128), r(K::XMM)]),
    sig(&[w(K::YMM), r(YM256).mem(M::M256)]),
    sig(&[w(K::MEM).mem(M::M256), r(K::YMM)]),
];
static V_SQRT_PACKED: &[Signature] = &[
    sig(&[w(K::XMM), r(XM128).mem(M::M128)]),
    sig(&[w(K::YMM), r(YM256).mem(M::M256)]),
    sig(&[w(K::ZMM), r(ZM512).mem(M::M512)]),
];
static V_MOVSS_SIGS: &[Signature] = &[
    sig(&[w(K::XMM), r(K::MEM).mem(M::M32)]),
    sig(&[w(K::MEM).mem(M::M32), r(K::XMM)]),
];
static V_MOVSD_SIGS: &[Signature] = &[
    sig(&[w(K::XMM), r(K::MEM).mem(M::M64)]),
    sig(&[w(K::MEM).mem(M::M64), r(K::XMM)]),
];
static V_UCOMISS_SIGS: &[Signature] = &[sig(&[r(K::XMM), r(XM128).mem(M::M32)])];
static V_UCOMISD_SIGS: &[Signature] = &[sig(&[r(K::XMM), r(XM128).mem(M::M64)])];
static V_MOVD_SIGS: &[Signature] = &[
    sig(&[w(K::XMM), r(RM32).mem(M::M32)]),
    sig(&[w(RM32).mem(M::M32), r(K::XMM)]),
];
static V_MOVQ_SIGS: &[Signature] = &[
    sig(&[w(K::XMM), r(XM128).mem(M::M64)]),
    sig(&[w(K::MEM).mem(M::M64), r(K::XMM)]),
];
static V_CVTSI2SS_SIGS: &[Signature] = &[
    sig(&[w(K::XMM), r(K::XMM), r(RM32).mem(M::M32)]),
    sig64(&[w(K::XMM), r(K::XMM), r(RM64).mem(M::M64)]),
];
static V_PSHUFD_SIGS: &[Signature] = &[
    sig(&[w(K::XMM), r(XM128).mem(M::M128), r(IMM8)]),
    sig(&[w(K::YMM), r(YM256).mem(M::M256), r(IMM8)]),
    sig(&[w(K::ZMM), r(ZM512).mem(M::M512), r(IMM8)]),
];
static V_BLENDV_SIGS: &[Signature] = &[
    sig(&[w(K::XMM), r(K::XMM), r(XM128).mem(M::M128), r(K::XMM)]),
    sig(&[w(K::YMM), r(K::YMM), r(YM256).mem(M::M256), r(K::YMM)]),
];
static V_INSERTF128_SIGS: &[Signature] =
    &[sig(&[w(K::YMM), r(K::YMM), r(XM128).mem(M::M128), r(IMM8)])];
static V_BCASTSS_SIGS: &[Signature] = &[
    sig(&[w(K::XMM), r(XM128).mem(M::M32)]),
    sig(&[w(K::YMM), r(XM128).mem(M::M32)]),
    sig(&[w(K::ZMM), r(XM128).mem(M::M32)]),
];
static V_BCASTSD_SIGS: &[Signature] = &[
    sig(&[w(K::YMM), r(XM128).mem(M::M64)]),
    sig(&[w(K::ZMM), r(XM128).mem(M::M64)]),
];
static V_PBCASTD_SIGS: &[Signature] = &[
    sig(&[w(K::XMM), r(XM128).mem(M::M32)]),
    sig(&[w(K::YMM), r(XM128).mem(M::M32)]),
    sig(&[w(K::ZMM), r(XM128).mem(M::M32)]),
];
static V_PBCASTQ_SIGS: &[Signature] = &[
    sig(&[w(K::XMM), r(XM128).mem(M::M64)]),
    sig(&[w(K::YMM), r(XM128).mem(M::M64)]),
    sig(&[w(K::ZMM), r(XM128).mem(M::M64)]),
];
static V_GATHERDPS_SIGS: &[Signature] = &[
    sig(&[rw(K::XMM), r(K::MEM).mem(M::VM32X), rw(K::XMM)]),
    sig(&[rw(K::YMM), r(K::MEM).mem(M::VM32Y), rw(K::YMM)]),
];

static KMOV_B_SIGS: &[Signature] = &[
    sig(&[w(K::KREG), r(K::KREG.or(K::MEM)).mem(M::M8)]),
    sig(&[w(K::MEM).mem(M::M8), r(K::KREG)]),
    sig(&[w(K::KREG), r(K::R32)]),
    sig(&[w(K::R32), r(K::KREG)]),
];
static KMOV_W_SIGS: &[Signature] = &[
    sig(&[w(K::KREG), r(K::KREG.or(K::MEM)).mem(M::M16)]),
    sig(&[w(K::MEM).mem(M::M16), r(K::KREG)]),
    sig(&[w(K::KREG), r(K::R32)]),
    sig(&[w(K::R32), r(K::KREG)]),
];
static KMOV_D_SIGS: &[Signature] = &[
    sig(&[w(K::KREG), r(K::KREG.or(K::MEM)).mem(M::M32)]),
    sig(&[w(K::MEM).mem(M::M32), r(K::KREG)]),
    sig(&[w(K::KREG), r(K::R32)]),
    sig(&[w(K::R32), r(K::KREG)]),
];
static KMOV_Q_SIGS: &[Signature] = &[
    sig(&[w(K::KREG), r(K::KREG.or(K::MEM)).mem(M::M64)]),
    sig(&[w(K::MEM).mem(M::M64), r(K::KREG)]),
    sig64(&[w(K::KREG), r(K::R64)]),
    sig64(&[w(K::R64), r(K::KREG)]),
];

// ---------------------------------------------------------------------------
// The records, in `Mnemonic` order.

const SSE: F = F::SSE;
const SSE2: F = F::SSE2;
const AVX: F = F::AVX;
const AVX2: F = F::AVX2;
const AVX512: F = F::AVX512F;

pub(crate) static INSTS: &[InstRecord] = &[
    inst("", E::None, Opcode::NONE, Opcode::NONE, NONE, F::NONE, &[]),
    inst("adc", E::Alu, op(0x10).digit(2), Opcode::NONE, ARITH_CF, F::NONE, ALU_SIGS),
    inst("add", E::Alu, op(0x00).digit(0), Opcode::NONE, ARITH, F::NONE, ALU_SIGS),
    inst("addpd", E::XmmRm, op(0x58).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW),
    inst("addps", E::XmmRm, op(0x58).map0f(), Opcode::NONE, NONE, SSE, XMM_RM_RW),
    inst("addsd", E::XmmRm, op(0x58).map0f().pf2(), Opcode::NONE, NONE, SSE2, XMM_RM_SD),
    inst("addss", E::XmmRm, op(0x58).map0f().pf3(), Opcode::NONE, NONE, SSE, XMM_RM_SS),
    inst("and", E::Alu, op(0x20).digit(4), Opcode::NONE, LOGIC_RO, F::NONE, ALU_SIGS),
    inst("andnpd", E::XmmRm, op(0x55).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW),
    inst("andnps", E::XmmRm, op(0x55).map0f(), Opcode::NONE, NONE, SSE, XMM_RM_RW),
    inst("andpd", E::XmmRm, op(0x54).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW),
    inst("andps", E::XmmRm, op(0x54).map0f(), Opcode::NONE, NONE, SSE, XMM_RM_RW),
    inst("bsf", E::Rm, op(0xbc).map0f(), Opcode::NONE, ARITH, F::NONE, BITSCAN_SIGS),
    inst("bsr", E::Rm, op(0xbd).map0f(), Opcode::NONE, ARITH, F::NONE, BITSCAN_SIGS),
    inst("bswap", E::O, op(0xc8).map0f(), Opcode::NONE, NONE, F::NONE, BSWAP_SIGS),
    inst("bt", E::BitTest, op(0xa3).map0f(), op(0xba).map0f().digit(4), ARITH, F::NONE, BT_SIGS),
    inst("btc", E::BitTest, op(0xbb).map0f(), op(0xba).map0f().digit(7), ARITH, F::NONE, BTX_SIGS),
    inst("btr", E::BitTest, op(0xb3).map0f(), op(0xba).map0f().digit(6), ARITH, F::NONE, BTX_SIGS),
    inst("bts", E::BitTest, op(0xab).map0f(), op(0xba).map0f().digit(5), ARITH, F::NONE, BTX_SIGS),
    inst("call", E::Call, op(0xe8), Opcode::NONE, CALL, F::NONE, JMP_SIGS),
    inst("cbw", E::Op, op(0x98).p66(), Opcode::NONE, NONE, F::NONE, NOARG_SIGS),
    inst("cdq", E::Op, op(0x99), Opcode::NONE, NONE, F::NONE, NOARG_SIGS),
    inst("cdqe", E::Op, op(0x98).w(), Opcode::NONE, NONE, F::NONE, NOARG64_SIGS),
    inst("clc", E::Op, op(0xf8), Opcode::NONE, CARRY_W, F::NONE, NOARG_SIGS),
    inst("cld", E::Op, op(0xfc), Opcode::NONE, DIR_W, F::NONE, NOARG_SIGS),
    inst("cmc", E::Op, op(0xf5), Opcode::NONE, CARRY_W, F::NONE, NOARG_SIGS),
    inst("cmova", E::Rm, op(0x47).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmovae", E::Rm, op(0x43).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmovb", E::Rm, op(0x42).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmovbe", E::Rm, op(0x46).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmove", E::Rm, op(0x44).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmovg", E::Rm, op(0x4f).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmovge", E::Rm, op(0x4d).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmovl", E::Rm, op(0x4c).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmovle", E::Rm, op(0x4e).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmovne", E::Rm, op(0x45).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmovno", E::Rm, op(0x41).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmovnp", E::Rm, op(0x4b).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmovns", E::Rm, op(0x49).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmovo", E::Rm, op(0x40).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmovp", E::Rm, op(0x4a).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmovs", E::Rm, op(0x48).map0f(), Opcode::NONE, CC_IN, F::CMOV, CMOV_SIGS),
    inst("cmp", E::Alu, op(0x38).digit(7), Opcode::NONE, ARITH, F::NONE, CMP_SIGS),
    inst("cmppd", E::XmmRmi, op(0xc2).map0f().p66(), Opcode::NONE, NONE, SSE2, CMPPS_SIGS),
    inst("cmpps", E::XmmRmi, op(0xc2).map0f(), Opcode::NONE, NONE, SSE, CMPPS_SIGS),
    inst("cmpsb", E::StringOp, op(0xa6), Opcode::NONE, STRING_CMP, F::NONE, NOARG_SIGS),
    inst("cmpsd", E::XmmRmi, op(0xc2).map0f().pf2(), Opcode::NONE, NONE, SSE2, CMPSD_SIGS),
    inst("cmpsq", E::StringOp, op(0xa7).w(), Opcode::NONE, STRING_CMP, F::NONE, NOARG64_SIGS),
    inst("cmpss", E::XmmRmi, op(0xc2).map0f().pf3(), Opcode::NONE, NONE, SSE, CMPSS_SIGS),
    inst("cmpsw", E::StringOp, op(0xa7).p66(), Opcode::NONE, STRING_CMP, F::NONE, NOARG_SIGS),
    inst("cpuid", E::Op, op(0xa2).map0f(), Opcode::NONE, NONE, F::NONE, NOARG_SIGS),
    inst("cqo", E::Op, op(0x99).w(), Opcode::NONE, NONE, F::NONE, NOARG64_SIGS),
    inst("cvtsi2sd", E::XmmRm, op(0x2a).map0f().pf2(), Opcode::NONE, NONE, SSE2, CVTSI2SS_SIGS),
    inst("cvtsi2ss", E::XmmRm, op(0x2a).map0f().pf3(), Opcode::NONE, NONE, SSE, CVTSI2SS_SIGS),
    inst("cvttsd2si", E::XmmRm, op(0x2c).map0f().pf2(), Opcode::NONE, NONE, SSE2, CVTTSD2SI_SIGS),
    inst("cvttss2si", E::XmmRm, op(0x2c).map0f().pf3(), Opcode::NONE, NONE, SSE, CVTTSS2SI_SIGS),
    inst("cwd", E::Op, op(0x99).p66(), Opcode::NONE, NONE, F::NONE, NOARG_SIGS),
    inst("cwde", E::Op, op(0x98), Opcode::NONE, NONE, F::NONE, NOARG_SIGS),
    inst("dec", E::IncDec, op(0xfe).digit(1), Opcode::NONE, ARITH, F::NONE, RM_RW_SIGS),
    inst("div", E::M, op(0xf6).digit(6), Opcode::NONE, ARITH, F::NONE, MULDIV_SIGS),
    inst("divpd", E::XmmRm, op(0x5e).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW),
    inst("divps", E::XmmRm, op(0x5e).map0f(), Opcode::NONE, NONE, SSE, XMM_RM_RW),
    inst("divsd", E::XmmRm, op(0x5e).map0f().pf2(), Opcode::NONE, NONE, SSE2, XMM_RM_SD),
    inst("divss", E::XmmRm, op(0x5e).map0f().pf3(), Opcode::NONE, NONE, SSE, XMM_RM_SS),
    inst("enter", E::Enter, op(0xc8), Opcode::NONE, NONE, F::NONE, ENTER_SIGS),
    inst("fadd", E::Fpu, op(0xd8).digit(0), op(0xdc).digit(0), NONE, F::FPU, FARITH_SIGS),
    inst("faddp", E::FpuArith, op(0xde).digit(0), Opcode::NONE, NONE, F::FPU, FARITHP_SIGS),
    inst("fdiv", E::Fpu, op(0xd8).digit(6), op(0xdc).digit(6), NONE, F::FPU, FARITH_SIGS),
    inst("fdivp", E::FpuArith, op(0xde).digit(7), Opcode::NONE, NONE, F::FPU, FARITHP_SIGS),
    inst("fild", E::Fpu, op(0xdb).digit(0), op(0xdf).digit(5), NONE, F::FPU, FILD_SIGS),
    inst("fistp", E::Fpu, op(0xdb).digit(3), op(0xdf).digit(7), NONE, F::FPU, FISTP_SIGS),
    inst("fld", E::Fpu, op(0xd9).digit(0), op(0xdd).digit(0), NONE, F::FPU, FLD_SIGS),
    inst("fmul", E::Fpu, op(0xd8).digit(1), op(0xdc).digit(1), NONE, F::FPU, FARITH_SIGS),
    inst("fmulp", E::FpuArith, op(0xde).digit(1), Opcode::NONE, NONE, F::FPU, FARITHP_SIGS),
    inst("fst", E::Fpu, op(0xd9).digit(2), op(0xdd).digit(2), NONE, F::FPU, FST_SIGS),
    inst("fstp", E::Fpu, op(0xd9).digit(3), op(0xdd).digit(3), NONE, F::FPU, FST_SIGS),
    inst("fsub", E::Fpu, op(0xd8).digit(4), op(0xdc).digit(4), NONE, F::FPU, FARITH_SIGS),
    inst("fsubp", E::FpuArith, op(0xde).digit(5), Opcode::NONE, NONE, F::FPU, FARITHP_SIGS),
    inst("hlt", E::Op, op(0xf4), Opcode::NONE, NONE, F::NONE, NOARG_SIGS),
    inst("idiv", E::M, op(0xf6).digit(7), Opcode::NONE, ARITH, F::NONE, MULDIV_SIGS),
    inst("imul", E::Imul, op(0xaf).map0f(), Opcode::NONE, ARITH, F::NONE, IMUL_SIGS),
    inst("inc", E::IncDec, op(0xfe).digit(0), Opcode::NONE, ARITH, F::NONE, RM_RW_SIGS),
    inst("int3", E::Op, op(0xcc), Opcode::NONE, NONE, F::NONE, NOARG_SIGS),
    inst("ja", E::Jcc, op(0x77), op(0x87).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("jae", E::Jcc, op(0x73), op(0x83).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("jb", E::Jcc, op(0x72), op(0x82).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("jbe", E::Jcc, op(0x76), op(0x86).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("je", E::Jcc, op(0x74), op(0x84).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("jg", E::Jcc, op(0x7f), op(0x8f).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("jge", E::Jcc, op(0x7d), op(0x8d).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("jl", E::Jcc, op(0x7c), op(0x8c).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("jle", E::Jcc, op(0x7e), op(0x8e).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("jmp", E::Jmp, op(0xeb), op(0xe9), JUMP, F::NONE, JMP_SIGS),
    inst("jne", E::Jcc, op(0x75), op(0x85).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("jno", E::Jcc, op(0x71), op(0x81).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("jnp", E::Jcc, op(0x7b), op(0x8b).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("jns", E::Jcc, op(0x79), op(0x89).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("jo", E::Jcc, op(0x70), op(0x80).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("jp", E::Jcc, op(0x7a), op(0x8a).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("js", E::Jcc, op(0x78), op(0x88).map0f(), BRANCH, F::NONE, REL_SIGS),
    inst("kmovb", E::VexKmov, op(0x90).map0f().p66().vex(), op(0x92).map0f().p66().vex(), NONE, F::AVX512DQ, KMOV_B_SIGS),
    inst("kmovd", E::VexKmov, op(0x90).map0f().p66().w().vex(), op(0x92).map0f().pf2().vex(), NONE, F::AVX512BW, KMOV_D_SIGS),
    inst("kmovq", E::VexKmov, op(0x90).map0f().w().vex(), op(0x92).map0f().pf2().w().vex(), NONE, F::AVX512BW, KMOV_Q_SIGS),
    inst("kmovw", E::VexKmov, op(0x90).map0f().vex(), op(0x92).map0f().vex(), NONE, AVX512, KMOV_W_SIGS),
    inst("lahf", E::Op, op(0x9f), Opcode::NONE, LAHF, F::NONE, NOARG_SIGS),
    inst("lea", E::Lea, op(0x8d), Opcode::NONE, NONE, F::NONE, LEA_SIGS),
    inst("leave", E::Op, op(0xc9), Opcode::NONE, NONE, F::NONE, NOARG_SIGS),
    inst("lodsb", E::StringOp, op(0xac), Opcode::NONE, STRING, F::NONE, NOARG_SIGS),
    inst("lodsd", E::StringOp, op(0xad), Opcode::NONE, STRING, F::NONE, NOARG_SIGS),
    inst("lodsq", E::StringOp, op(0xad).w(), Opcode::NONE, STRING, F::NONE, NOARG64_SIGS),
    inst("lodsw", E::StringOp, op(0xad).p66(), Opcode::NONE, STRING, F::NONE, NOARG_SIGS),
    inst("lzcnt", E::Rm, op(0xbd).map0f().pf3(), Opcode::NONE, ARITH, F::LZCNT, BITSCAN_SIGS),
    inst("maxpd", E::XmmRm, op(0x5f).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW),
    inst("maxps", E::XmmRm, op(0x5f).map0f(), Opcode::NONE, NONE, SSE, XMM_RM_RW),
    inst("maxsd", E::XmmRm, op(0x5f).map0f().pf2(), Opcode::NONE, NONE, SSE2, XMM_RM_SD),
    inst("maxss", E::XmmRm, op(0x5f).map0f().pf3(), Opcode::NONE, NONE, SSE, XMM_RM_SS),
    inst("minpd", E::XmmRm, op(0x5d).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW),
    inst("minps", E::XmmRm, op(0x5d).map0f(), Opcode::NONE, NONE, SSE, XMM_RM_RW),
    inst("minsd", E::XmmRm, op(0x5d).map0f().pf2(), Opcode::NONE, NONE, SSE2, XMM_RM_SD),
    inst("minss", E::XmmRm, op(0x5d).map0f().pf3(), Opcode::NONE, NONE, SSE, XMM_RM_SS),
    inst("mov", E::Mov, op(0x88), Opcode::NONE, NONE, F::NONE, MOV_SIGS),
    inst("movapd", E::XmmRm, op(0x28).map0f().p66(), op(0x29).map0f().p66(), NONE, SSE2, MOVAPS_SIGS),
    inst("movaps", E::XmmRm, op(0x28).map0f(), op(0x29).map0f(), NONE, SSE, MOVAPS_SIGS),
    inst("movd", E::XmmRm, op(0x6e).map0f().p66(), op(0x7e).map0f().p66(), NONE, SSE2, MOVD_SIGS),
    inst("movdqa", E::XmmRm, op(0x6f).map0f().p66(), op(0x7f).map0f().p66(), NONE, SSE2, MOVAPS_SIGS),
    inst("movdqu", E::XmmRm, op(0x6f).map0f().pf3(), op(0x7f).map0f().pf3(), NONE, SSE2, MOVAPS_SIGS),
    inst("movq", E::XmmRm, op(0x7e).map0f().pf3(), op(0xd6).map0f().p66(), NONE, SSE2, MOVQ_SIGS),
    inst("movsb", E::StringOp, op(0xa4), Opcode::NONE, STRING, F::NONE, NOARG_SIGS),
    inst("movsd", E::XmmRm, op(0x10).map0f().pf2(), op(0x11).map0f().pf2(), NONE, SSE2, MOVSD_SIGS),
    inst("movsq", E::StringOp, op(0xa5).w(), Opcode::NONE, STRING, F::NONE, NOARG64_SIGS),
    inst("movss", E::XmmRm, op(0x10).map0f().pf3(), op(0x11).map0f().pf3(), NONE, SSE, MOVSS_SIGS),
    inst("movsw", E::StringOp, op(0xa5).p66(), Opcode::NONE, STRING, F::NONE, NOARG_SIGS),
    inst("movsx", E::MovExtend, op(0xbe).map0f(), Opcode::NONE, NONE, F::NONE, MOVSX_SIGS),
    inst("movsxd", E::MovExtend, op(0x63), Opcode::NONE, NONE, F::NONE, MOVSXD_SIGS),
    inst("movupd", E::XmmRm, op(0x10).map0f().p66(), op(0x11).map0f().p66(), NONE, SSE2, MOVAPS_SIGS),
    inst("movups", E::XmmRm, op(0x10).map0f(), op(0x11).map0f(), NONE, SSE, MOVAPS_SIGS),
    inst("movzx", E::MovExtend, op(0xb6).map0f(), Opcode::NONE, NONE, F::NONE, MOVSX_SIGS),
    inst("mul", E::M, op(0xf6).digit(4), Opcode::NONE, ARITH, F::NONE, MULDIV_SIGS),
    inst("mulpd", E::XmmRm, op(0x59).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW),
    inst("mulps", E::XmmRm, op(0x59).map0f(), Opcode::NONE, NONE, SSE, XMM_RM_RW),
    inst("mulsd", E::XmmRm, op(0x59).map0f().pf2(), Opcode::NONE, NONE, SSE2, XMM_RM_SD),
    inst("mulss", E::XmmRm, op(0x59).map0f().pf3(), Opcode::NONE, NONE, SSE, XMM_RM_SS),
    inst("neg", E::M, op(0xf6).digit(3), Opcode::NONE, ARITH, F::NONE, RM_RW_SIGS),
    inst("nop", E::Op, op(0x90), Opcode::NONE, NONE, F::NONE, NOARG_SIGS),
    inst("not", E::M, op(0xf6).digit(2), Opcode::NONE, NONE, F::NONE, RM_RW_SIGS),
    inst("or", E::Alu, op(0x08).digit(1), Opcode::NONE, LOGIC_RO, F::NONE, ALU_SIGS),
    inst("orpd", E::XmmRm, op(0x56).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW),
    inst("orps", E::XmmRm, op(0x56).map0f(), Opcode::NONE, NONE, SSE, XMM_RM_RW),
    inst("paddb", E::XmmRm, op(0xfc).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW_MMX),
    inst("paddd", E::XmmRm, op(0xfe).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW_MMX),
    inst("paddq", E::XmmRm, op(0xd4).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW_MMX),
    inst("paddw", E::XmmRm, op(0xfd).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW_MMX),
    inst("pand", E::XmmRm, op(0xdb).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW_MMX),
    inst("pcmpeqb", E::XmmRm, op(0x74).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW_MMX),
    inst("pcmpeqd", E::XmmRm, op(0x76).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW_MMX),
    inst("pcmpeqw", E::XmmRm, op(0x75).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW_MMX),
    inst("pop", E::Pop, op(0x58), op(0x8f).digit(0), NONE, F::NONE, POP_SIGS),
    inst("popcnt", E::Rm, op(0xb8).map0f().pf3(), Opcode::NONE, ARITH, F::POPCNT, BITSCAN_SIGS),
    inst("popf", E::Op, op(0x9d), Opcode::NONE, SAHF, F::NONE, NOARG_SIGS),
    inst("por", E::XmmRm, op(0xeb).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW_MMX),
    inst("pshufd", E::XmmRmi, op(0x70).map0f().p66(), Opcode::NONE, NONE, SSE2, PSHUFD_SIGS),
    inst("psubb", E::XmmRm, op(0xf8).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW_MMX),
    inst("psubd", E::XmmRm, op(0xfa).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW_MMX),
    inst("psubq", E::XmmRm, op(0xfb).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW_MMX),
    inst("psubw", E::XmmRm, op(0xf9).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW_MMX),
    inst("push", E::Push, op(0x50), op(0xff).digit(6), NONE, F::NONE, PUSH_SIGS),
    inst("pushf", E::Op, op(0x9c), Opcode::NONE, LAHF, F::NONE, NOARG_SIGS),
    inst("pxor", E::XmmRm, op(0xef).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW_MMX),
    inst("rcl", E::Shift, op(0xc0).digit(2), Opcode::NONE, SHIFT_CF, F::NONE, SHIFT_SIGS),
    inst("rcr", E::Shift, op(0xc0).digit(3), Opcode::NONE, SHIFT_CF, F::NONE, SHIFT_SIGS),
    inst("rdtsc", E::Op, op(0x31).map0f(), Opcode::NONE, NONE, F::NONE, NOARG_SIGS),
    inst("ret", E::Ret, op(0xc3), op(0xc2), RET, F::NONE, RET_SIGS),
    inst("rol", E::Shift, op(0xc0).digit(0), Opcode::NONE, ARITH, F::NONE, SHIFT_SIGS),
    inst("ror", E::Shift, op(0xc0).digit(1), Opcode::NONE, ARITH, F::NONE, SHIFT_SIGS),
    inst("sahf", E::Op, op(0x9e), Opcode::NONE, SAHF, F::NONE, NOARG_SIGS),
    inst("sar", E::Shift, op(0xc0).digit(7), Opcode::NONE, ARITH, F::NONE, SHIFT_SIGS),
    inst("sbb", E::Alu, op(0x18).digit(3), Opcode::NONE, ARITH_CF, F::NONE, ALU_SIGS),
    inst("scasb", E::StringOp, op(0xae), Opcode::NONE, STRING_CMP, F::NONE, NOARG_SIGS),
    inst("scasd", E::StringOp, op(0xaf), Opcode::NONE, STRING_CMP, F::NONE, NOARG_SIGS),
    inst("scasq", E::StringOp, op(0xaf).w(), Opcode::NONE, STRING_CMP, F::NONE, NOARG64_SIGS),
    inst("scasw", E::StringOp, op(0xaf).p66(), Opcode::NONE, STRING_CMP, F::NONE, NOARG_SIGS),
    inst("seta", E::M, op(0x97).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("setae", E::M, op(0x93).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("setb", E::M, op(0x92).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("setbe", E::M, op(0x96).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("sete", E::M, op(0x94).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("setg", E::M, op(0x9f).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("setge", E::M, op(0x9d).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("setl", E::M, op(0x9c).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("setle", E::M, op(0x9e).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("setne", E::M, op(0x95).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("setno", E::M, op(0x91).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("setnp", E::M, op(0x9b).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("setns", E::M, op(0x99).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("seto", E::M, op(0x90).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("setp", E::M, op(0x9a).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("sets", E::M, op(0x98).map0f().digit(0), Opcode::NONE, CC_IN, F::NONE, SETCC_SIGS),
    inst("shl", E::Shift, op(0xc0).digit(4), Opcode::NONE, ARITH, F::NONE, SHIFT_SIGS),
    inst("shld", E::ShiftD, op(0xa4).map0f(), Opcode::NONE, ARITH, F::NONE, SHIFTD_SIGS),
    inst("shr", E::Shift, op(0xc0).digit(5), Opcode::NONE, ARITH, F::NONE, SHIFT_SIGS),
    inst("shrd", E::ShiftD, op(0xac).map0f(), Opcode::NONE, ARITH, F::NONE, SHIFTD_SIGS),
    inst("sqrtpd", E::XmmRm, op(0x51).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_SQRT_PS),
    inst("sqrtps", E::XmmRm, op(0x51).map0f(), Opcode::NONE, NONE, SSE, XMM_SQRT_PS),
    inst("sqrtsd", E::XmmRm, op(0x51).map0f().pf2(), Opcode::NONE, NONE, SSE2, XMM_RM_SD),
    inst("sqrtss", E::XmmRm, op(0x51).map0f().pf3(), Opcode::NONE, NONE, SSE, XMM_RM_SS),
    inst("stc", E::Op, op(0xf9), Opcode::NONE, CARRY_W, F::NONE, NOARG_SIGS),
    inst("std", E::Op, op(0xfd), Opcode::NONE, DIR_W, F::NONE, NOARG_SIGS),
    inst("stosb", E::StringOp, op(0xaa), Opcode::NONE, STRING, F::NONE, NOARG_SIGS),
    inst("stosd", E::StringOp, op(0xab), Opcode::NONE, STRING, F::NONE, NOARG_SIGS),
    inst("stosq", E::StringOp, op(0xab).w(), Opcode::NONE, STRING, F::NONE, NOARG64_SIGS),
    inst("stosw", E::StringOp, op(0xab).p66(), Opcode::NONE, STRING, F::NONE, NOARG_SIGS),
    inst("sub", E::Alu, op(0x28).digit(5), Opcode::NONE, LOGIC_WO, F::NONE, ALU_SIGS),
    inst("subpd", E::XmmRm, op(0x5c).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW),
    inst("subps", E::XmmRm, op(0x5c).map0f(), Opcode::NONE, NONE, SSE, XMM_RM_RW),
    inst("subsd", E::XmmRm, op(0x5c).map0f().pf2(), Opcode::NONE, NONE, SSE2, XMM_RM_SD),
    inst("subss", E::XmmRm, op(0x5c).map0f().pf3(), Opcode::NONE, NONE, SSE, XMM_RM_SS),
    inst("test", E::Test, op(0x84).digit(0), Opcode::NONE, LOGIC_RO, F::NONE, TEST_SIGS),
    inst("tzcnt", E::Rm, op(0xbc).map0f().pf3(), Opcode::NONE, ARITH, F::BMI1, BITSCAN_SIGS),
    inst("ucomisd", E::XmmRm, op(0x2e).map0f().p66(), Opcode::NONE, ARITH, SSE2, UCOMISD_SIGS),
    inst("ucomiss", E::XmmRm, op(0x2e).map0f(), Opcode::NONE, ARITH, SSE, UCOMISS_SIGS),
    inst("ud2", E::Op, op(0x0b).map0f(), Opcode::NONE, NONE, F::NONE, NOARG_SIGS),
    inst("vaddpd", E::VexRvm, op(0x58).map0f().p66().w().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vaddps", E::VexRvm, op(0x58).map0f().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vaddsd", E::VexRvm, op(0x58).map0f().pf2().w().tuple(TupleType::Tuple1Scalar).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_SD),
    inst("vaddss", E::VexRvm, op(0x58).map0f().pf3().tuple(TupleType::Tuple1Scalar).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_SS),
    inst("vandpd", E::VexRvm, op(0x54).map0f().p66().w().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vandps", E::VexRvm, op(0x54).map0f().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vblendvps", E::VexRvmr, op(0x4a).map0f3a().p66().vex(), Opcode::NONE, NONE, AVX, V_BLENDV_SIGS),
    inst("vbroadcastsd", E::VexRm, op(0x19).map0f38().p66().tuple(TupleType::Tuple1Scalar).vex_or_evex(), Opcode::NONE, NONE, AVX, V_BCASTSD_SIGS),
    inst("vbroadcastss", E::VexRm, op(0x18).map0f38().p66().tuple(TupleType::Tuple1Scalar).vex_or_evex(), Opcode::NONE, NONE, AVX, V_BCASTSS_SIGS),
    inst("vcvtsi2sd", E::VexRvm, op(0x2a).map0f().pf2().tuple(TupleType::Tuple1Scalar).vex_or_evex(), Opcode::NONE, NONE, AVX, V_CVTSI2SS_SIGS),
    inst("vcvtsi2ss", E::VexRvm, op(0x2a).map0f().pf3().tuple(TupleType::Tuple1Scalar).vex_or_evex(), Opcode::NONE, NONE, AVX, V_CVTSI2SS_SIGS),
    inst("vdivpd", E::VexRvm, op(0x5e).map0f().p66().w().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vdivps", E::VexRvm, op(0x5e).map0f().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vfmadd213pd", E::VexRvm, op(0xa8).map0f38().p66().w().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, F::FMA, V_FMA_PACKED),
    inst("vfmadd213ps", E::VexRvm, op(0xa8).map0f38().p66().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, F::FMA, V_FMA_PACKED),
    inst("vgatherdps", E::VexRmv, op(0x92).map0f38().p66().vex(), Opcode::NONE, NONE, AVX2, V_GATHERDPS_SIGS),
    inst("vinsertf128", E::VexRvmi, op(0x18).map0f3a().p66().l256().vex(), Opcode::NONE, NONE, AVX, V_INSERTF128_SIGS),
    inst("vmaxpd", E::VexRvm, op(0x5f).map0f().p66().w().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vmaxps", E::VexRvm, op(0x5f).map0f().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vminpd", E::VexRvm, op(0x5d).map0f().p66().w().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vminps", E::VexRvm, op(0x5d).map0f().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vmovapd", E::VexRm, op(0x28).map0f().p66().w().tuple(TupleType::Fvm).vex_or_evex(), op(0x29).map0f().p66().w().tuple(TupleType::Fvm).vex_or_evex(), NONE, AVX, V_RM_PACKED),
    inst("vmovaps", E::VexRm, op(0x28).map0f().tuple(TupleType::Fvm).vex_or_evex(), op(0x29).map0f().tuple(TupleType::Fvm).vex_or_evex(), NONE, AVX, V_RM_PACKED),
    inst("vmovd", E::VexRm, op(0x6e).map0f().p66().tuple(TupleType::Tuple1Scalar).vex_or_evex(), op(0x7e).map0f().p66().tuple(TupleType::Tuple1Scalar).vex_or_evex(), NONE, AVX, V_MOVD_SIGS),
    inst("vmovdqa", E::VexRm, op(0x6f).map0f().p66().vex(), op(0x7f).map0f().p66().vex(), NONE, AVX, V_RM_PACKED_NOZMM),
    inst("vmovdqa32", E::VexRm, op(0x6f).map0f().p66().tuple(TupleType::Fvm).evex(), op(0x7f).map0f().p66().tuple(TupleType::Fvm).evex(), NONE, AVX512, V_RM_PACKED),
    inst("vmovdqa64", E::VexRm, op(0x6f).map0f().p66().w().tuple(TupleType::Fvm).evex(), op(0x7f).map0f().p66().w().tuple(TupleType::Fvm).evex(), NONE, AVX512, V_RM_PACKED),
    inst("vmovdqu", E::VexRm, op(0x6f).map0f().pf3().vex(), op(0x7f).map0f().pf3().vex(), NONE, AVX, V_RM_PACKED_NOZMM),
    inst("vmovdqu32", E::VexRm, op(0x6f).map0f().pf3().tuple(TupleType::Fvm).evex(), op(0x7f).map0f().pf3().tuple(TupleType::Fvm).evex(), NONE, AVX512, V_RM_PACKED),
    inst("vmovdqu64", E::VexRm, op(0x6f).map0f().pf3().w().tuple(TupleType::Fvm).evex(), op(0x7f).map0f().pf3().w().tuple(TupleType::Fvm).evex(), NONE, AVX512, V_RM_PACKED),
    inst("vmovq", E::VexRm, op(0x7e).map0f().pf3().w().tuple(TupleType::Tuple1Scalar).vex_or_evex(), op(0xd6).map0f().p66().w().tuple(TupleType::Tuple1Scalar).vex_or_evex(), NONE, AVX, V_MOVQ_SIGS),
    inst("vmovsd", E::VexRm, op(0x10).map0f().pf2().w().tuple(TupleType::Tuple1Scalar).vex_or_evex(), op(0x11).map0f().pf2().w().tuple(TupleType::Tuple1Scalar).vex_or_evex(), NONE, AVX, V_MOVSD_SIGS),
    inst("vmovss", E::VexRm, op(0x10).map0f().pf3().tuple(TupleType::Tuple1Scalar).vex_or_evex(), op(0x11).map0f().pf3().tuple(TupleType::Tuple1Scalar).vex_or_evex(), NONE, AVX, V_MOVSS_SIGS),
    inst("vmovupd", E::VexRm, op(0x10).map0f().p66().w().tuple(TupleType::Fvm).vex_or_evex(), op(0x11).map0f().p66().w().tuple(TupleType::Fvm).vex_or_evex(), NONE, AVX, V_RM_PACKED),
    inst("vmovups", E::VexRm, op(0x10).map0f().tuple(TupleType::Fvm).vex_or_evex(), op(0x11).map0f().tuple(TupleType::Fvm).vex_or_evex(), NONE, AVX, V_RM_PACKED),
    inst("vmulpd", E::VexRvm, op(0x59).map0f().p66().w().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vmulps", E::VexRvm, op(0x59).map0f().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vmulsd", E::VexRvm, op(0x59).map0f().pf2().w().tuple(TupleType::Tuple1Scalar).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_SD),
    inst("vmulss", E::VexRvm, op(0x59).map0f().pf3().tuple(TupleType::Tuple1Scalar).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_SS),
    inst("vorpd", E::VexRvm, op(0x56).map0f().p66().w().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vorps", E::VexRvm, op(0x56).map0f().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vpaddb", E::VexRvm, op(0xfc).map0f().p66().tuple(TupleType::FullMem).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vpaddd", E::VexRvm, op(0xfe).map0f().p66().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vpaddq", E::VexRvm, op(0xd4).map0f().p66().w().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vpaddw", E::VexRvm, op(0xfd).map0f().p66().tuple(TupleType::FullMem).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vpand", E::VexRvm, op(0xdb).map0f().p66().vex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED_NOZMM),
    inst("vpandd", E::VexRvm, op(0xdb).map0f().p66().tuple(TupleType::Full).evex(), Opcode::NONE, NONE, AVX512, V_RVM_PACKED),
    inst("vpandq", E::VexRvm, op(0xdb).map0f().p66().w().tuple(TupleType::Full).evex(), Opcode::NONE, NONE, AVX512, V_RVM_PACKED),
    inst("vpbroadcastd", E::VexRm, op(0x58).map0f38().p66().tuple(TupleType::Tuple1Scalar).vex_or_evex(), Opcode::NONE, NONE, AVX2, V_PBCASTD_SIGS),
    inst("vpbroadcastq", E::VexRm, op(0x59).map0f38().p66().w().tuple(TupleType::Tuple1Scalar).vex_or_evex(), Opcode::NONE, NONE, AVX2, V_PBCASTQ_SIGS),
    inst("vpor", E::VexRvm, op(0xeb).map0f().p66().vex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED_NOZMM),
    inst("vpord", E::VexRvm, op(0xeb).map0f().p66().tuple(TupleType::Full).evex(), Opcode::NONE, NONE, AVX512, V_RVM_PACKED),
    inst("vporq", E::VexRvm, op(0xeb).map0f().p66().w().tuple(TupleType::Full).evex(), Opcode::NONE, NONE, AVX512, V_RVM_PACKED),
    inst("vpshufd", E::VexRmi, op(0x70).map0f().p66().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_PSHUFD_SIGS),
    inst("vpsubb", E::VexRvm, op(0xf8).map0f().p66().tuple(TupleType::FullMem).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vpsubd", E::VexRvm, op(0xfa).map0f().p66().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vpsubq", E::VexRvm, op(0xfb).map0f().p66().w().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vpsubw", E::VexRvm, op(0xf9).map0f().p66().tuple(TupleType::FullMem).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vpxor", E::VexRvm, op(0xef).map0f().p66().vex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED_NOZMM),
    inst("vpxord", E::VexRvm, op(0xef).map0f().p66().tuple(TupleType::Full).evex(), Opcode::NONE, NONE, AVX512, V_RVM_PACKED),
    inst("vpxorq", E::VexRvm, op(0xef).map0f().p66().w().tuple(TupleType::Full).evex(), Opcode::NONE, NONE, AVX512, V_RVM_PACKED),
    inst("vsqrtpd", E::VexRm, op(0x51).map0f().p66().w().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_SQRT_PACKED),
    inst("vsqrtps", E::VexRm, op(0x51).map0f().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_SQRT_PACKED),
    inst("vsubpd", E::VexRvm, op(0x5c).map0f().p66().w().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vsubps", E::VexRvm, op(0x5c).map0f().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vsubsd", E::VexRvm, op(0x5c).map0f().pf2().w().tuple(TupleType::Tuple1Scalar).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_SD),
    inst("vsubss", E::VexRvm, op(0x5c).map0f().pf3().tuple(TupleType::Tuple1Scalar).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_SS),
    inst("vucomisd", E::VexRm, op(0x2e).map0f().p66().w().tuple(TupleType::Tuple1Scalar).vex_or_evex(), Opcode::NONE, ARITH, AVX, V_UCOMISD_SIGS),
    inst("vucomiss", E::VexRm, op(0x2e).map0f().tuple(TupleType::Tuple1Scalar).vex_or_evex(), Opcode::NONE, ARITH, AVX, V_UCOMISS_SIGS),
    inst("vxorpd", E::VexRvm, op(0x57).map0f().p66().w().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("vxorps", E::VexRvm, op(0x57).map0f().tuple(TupleType::Full).vex_or_evex(), Opcode::NONE, NONE, AVX, V_RVM_PACKED),
    inst("xchg", E::Xchg, op(0x86), Opcode::NONE, NONE, F::NONE, XCHG_SIGS),
    inst("xor", E::Alu, op(0x30).digit(6), Opcode::NONE, LOGIC_WO, F::NONE, ALU_SIGS),
    inst("xorpd", E::XmmRm, op(0x57).map0f().p66(), Opcode::NONE, NONE, SSE2, XMM_RM_RW),
    inst("xorps", E::XmmRm, op(0x57).map0f(), Opcode::NONE, NONE, SSE, XMM_RM_RW),
];
