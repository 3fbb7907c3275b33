//! Operand-signature validation: match an operand tuple against the
//! database and select the encoding variant.
//!
//! The database is authored so earlier signatures are the preferred
//! tie-breakers (register forms before memory forms, narrow immediates
//! before wide ones), so selection is simply the first full match.

use crate::cpu::Environment;
use crate::error::{AsmError, AsmResult};
use crate::inst::signature::{MemFormSet, OpKindSet, SigOp, Signature};
use crate::inst::InstRecord;
use crate::operand::{Broadcast, Mem, Operand};

/// Select the first signature of `rec` matching `ops` in `env`.
pub(crate) fn select_signature(
    env: Environment,
    rec: &'static InstRecord,
    ops: &[Operand],
) -> AsmResult<&'static Signature> {
    let count = explicit_count(ops);
    let mut selected = None;
    for sig in rec.sigs {
        if !sig.arch.contains(env.arch) || sig.explicit_count() != count {
            continue;
        }
        if tuple_matches(sig, ops) {
            selected = Some(sig);
            break;
        }
    }
    let Some(sig) = selected else {
        return Err(AsmError::InvalidOperandCombination);
    };

    // Memory-size disambiguation: an unsized memory operand is acceptable
    // only when some other operand (or the instruction itself) pins the
    // width. If a later signature would also match at a different width,
    // the caller must supply a size hint.
    if has_unsized_mem(ops) && !has_width_pinning_reg(ops) {
        let first_width = mem_slot_width(sig, ops);
        for other in rec.sigs {
            if core::ptr::eq(other, sig)
                || !other.arch.contains(env.arch)
                || other.explicit_count() != count
            {
                continue;
            }
            if tuple_matches(other, ops) && mem_slot_width(other, ops) != first_width {
                return Err(AsmError::AmbiguousOperandSize);
            }
        }
    }
    Ok(sig)
}

fn explicit_count(ops: &[Operand]) -> usize {
    ops.iter().take_while(|o| !o.is_none()).count()
}

fn tuple_matches(sig: &Signature, ops: &[Operand]) -> bool {
    let mut slots = sig.explicit_ops();
    for op in ops.iter().take_while(|o| !o.is_none()) {
        let Some(slot) = slots.next() else {
            return false;
        };
        if !operand_matches(slot, op) {
            return false;
        }
    }
    slots.next().is_none()
}

fn operand_matches(slot: &SigOp, op: &Operand) -> bool {
    match op {
        Operand::None => false,
        Operand::Reg(reg) => {
            if !slot.kinds.intersects(OpKindSet::of_reg_class(reg.class())) {
                return false;
            }
            match slot.fixed_id() {
                // Virtual registers are pinned later, by the register
                // allocator.
                Some(enc) => reg.is_virtual() || reg.enc() == enc,
                None => true,
            }
        }
        Operand::Mem(mem) => {
            if !slot.kinds.intersects(OpKindSet::MEM) {
                return false;
            }
            mem_matches(slot.mem, mem)
        }
        Operand::Imm(imm) => slot.kinds.admits_imm(*imm),
        Operand::Label(_) => slot.kinds.intersects(OpKindSet::REL),
    }
}

fn mem_matches(forms: MemFormSet, mem: &Mem) -> bool {
    if let Some(index) = mem.index_reg() {
        if index.class().is_vec() {
            // VSIB addressing matches only slots that allow the
            // corresponding vmN form.
            return forms.intersects(MemFormSet::of_vector_index(index.class()));
        }
    }
    if forms.is_subset_of(MemFormSet::VM_ANY) {
        // A VSIB-only slot requires a vector index.
        return false;
    }
    if mem.broadcast_mode() != Broadcast::None {
        // A broadcast load stands for a full vector; the element size is
        // checked against the tuple type at encode time.
        return forms
            .intersects(MemFormSet::M128.or(MemFormSet::M256).or(MemFormSet::M512));
    }
    match mem.size_hint() {
        0 => true,
        bytes => forms.intersects(MemFormSet::ANY) || forms.intersects(MemFormSet::of_size(bytes)),
    }
}

fn has_unsized_mem(ops: &[Operand]) -> bool {
    ops.iter().any(|op| {
        op.as_mem()
            .is_some_and(|m| m.size_hint() == 0 && m.broadcast_mode() == Broadcast::None)
    })
}

fn has_width_pinning_reg(ops: &[Operand]) -> bool {
    ops.iter().any(|op| op.as_reg().is_some_and(|r| r.size() != 0))
}

/// The width the matched signature implies for the tuple's memory operand.
fn mem_slot_width(sig: &Signature, ops: &[Operand]) -> u32 {
    let mut slots = sig.explicit_ops();
    for op in ops.iter().take_while(|o| !o.is_none()) {
        let slot = slots.next().expect("tuple_matches checked arity");
        if op.as_mem().is_some() {
            return slot.mem.implied_size();
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Environment;
    use crate::inst::{get_inst, Mnemonic};
    use crate::operand::{dword_ptr, ptr, Imm};
    use crate::reg::regs::*;

    fn sel(
        env: Environment,
        m: Mnemonic,
        ops: &[Operand],
    ) -> AsmResult<&'static Signature> {
        select_signature(env, get_inst(m), ops)
    }

    #[test]
    fn alu_selects_reg_form_first() {
        let env = Environment::x64();
        let sig = sel(env, Mnemonic::Add, &[RBX.into(), RCX.into()]).unwrap();
        // First slot of the matched signature accepts memory: the rm form.
        assert!(sig.ops[0].kinds.intersects(OpKindSet::MEM));
        assert!(sig.ops[0].access.is_write());
    }

    #[test]
    fn arch_masks_apply() {
        let x86 = Environment::x86();
        assert!(sel(x86, Mnemonic::Add, &[RAX.into(), RCX.into()]).is_err());
        assert!(sel(x86, Mnemonic::Add, &[EAX.into(), ECX.into()]).is_ok());
    }

    #[test]
    fn imm_width_admission() {
        let env = Environment::x64();
        assert!(sel(env, Mnemonic::Add, &[EAX.into(), Imm::new(0x7fff_ffff).into()]).is_ok());
        // A 64-bit immediate cannot be added directly.
        assert!(sel(env, Mnemonic::Add, &[RAX.into(), Imm::new(0x1_0000_0000).into()]).is_err());
        // But mov accepts it.
        assert!(sel(env, Mnemonic::Mov, &[RAX.into(), Imm::new(0x1_0000_0000).into()]).is_ok());
    }

    #[test]
    fn unsized_mem_with_imm_is_ambiguous() {
        let env = Environment::x64();
        assert_eq!(
            sel(env, Mnemonic::Add, &[ptr(RAX).into(), Imm::new(1).into()]),
            Err(AsmError::AmbiguousOperandSize)
        );
        assert!(sel(env, Mnemonic::Add, &[dword_ptr(RAX).into(), Imm::new(1).into()]).is_ok());
        // A register operand pins the width.
        assert!(sel(env, Mnemonic::Add, &[ptr(RAX).into(), ECX.into()]).is_ok());
    }

    #[test]
    fn vsib_only_for_gather() {
        let env = Environment::x64();
        let vsib: Operand = ptr(RAX).index(XMM2, 2).into();
        assert!(sel(env, Mnemonic::Vgatherdps, &[XMM0.into(), vsib, XMM1.into()]).is_ok());
        // A vector index is rejected where no vmN form is allowed.
        assert!(sel(env, Mnemonic::Vaddps, &[XMM0.into(), XMM1.into(), vsib]).is_err());
        // And a plain index is rejected where only vmN forms are allowed.
        let plain: Operand = ptr(RAX).index(RCX, 2).into();
        assert!(sel(env, Mnemonic::Vgatherdps, &[XMM0.into(), plain, XMM1.into()]).is_err());
    }

    #[test]
    fn fixed_register_slots() {
        let env = Environment::x64();
        // shl rax, cl: the count must be CL.
        assert!(sel(env, Mnemonic::Shl, &[RAX.into(), CL.into()]).is_ok());
        assert!(sel(env, Mnemonic::Shl, &[RAX.into(), DL.into()]).is_err());
    }

    #[test]
    fn implicit_slots_do_not_consume_arguments() {
        let env = Environment::x64();
        // One-operand mul matches the signature with implicit AX/DX slots.
        let sig = sel(env, Mnemonic::Mul, &[RCX.into()]).unwrap();
        assert_eq!(sig.explicit_count(), 1);
        assert!(sig.ops.len() > 1);
    }
}
