//! Physical register assignment over the linear node stream.
//!
//! One forward scan in emission order, as described by the pass design:
//! reads of unassigned virtual registers insert reloads from their home
//! slots; allocation failure picks the assigned register with the furthest
//! next use and spills it; call nodes evict caller-saved registers; labels
//! and branches are region boundaries where every live register is flushed
//! to memory, which keeps the single-pass allocation correct across
//! arbitrary control flow.
//!
//! Next-use positions come from a single backward-equivalent pre-scan that
//! records every mention of a virtual register, using the operand access
//! modes of the matched signatures.

use super::frame::Frame;
use super::node::{NodeKind, NodeList};
use super::vreg::{vreg_index, VirtReg};
use crate::cpu::Environment;
use crate::error::{AsmError, AsmResult};
use crate::inst::signature::{Access, OpKindSet};
use crate::inst::{get_inst, ControlFlow, Mnemonic};
use crate::matcher::select_signature;
use crate::operand::{ptr, Operand};
use crate::reg::{Reg, RegClass};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::VecDeque;

const BANK_GP: usize = 0;
const BANK_VEC: usize = 1;
const BANK_MASK: usize = 2;

fn bank_of(class: RegClass) -> usize {
    match class {
        c if c.is_gp() => BANK_GP,
        c if c.is_vec() => BANK_VEC,
        RegClass::KMask => BANK_MASK,
        _ => BANK_GP,
    }
}

/// Allocation-order preference: caller-saved registers first, so leaf-ish
/// functions avoid prologue pushes. RSP and RBP are never allocatable.
static GP_ORDER: [u8; 14] = [0, 1, 2, 6, 7, 8, 9, 10, 11, 3, 12, 13, 14, 15];
static VEC_ORDER: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
static MASK_ORDER: [u8; 7] = [1, 2, 3, 4, 5, 6, 7];

struct Bank {
    order: &'static [u8],
    /// Which vreg currently occupies each register.
    holder: [Option<usize>; 32],
}

impl Bank {
    fn new(order: &'static [u8]) -> Bank {
        Bank { order, holder: [None; 32] }
    }
}

pub(crate) struct RegAlloc<'a> {
    env: Environment,
    vregs: &'a mut Vec<VirtReg>,
    frame: &'a mut Frame,
    banks: [Bank; 3],
    assigned: Vec<Option<u8>>,
    dirty: Vec<bool>,
    in_home: Vec<bool>,
    uses: Vec<VecDeque<u32>>,
    positions: FxHashMap<u32, u32>,
    /// Registers that may not be evicted while processing the current node.
    claimed: [u32; 3],
}

impl<'a> RegAlloc<'a> {
    pub(crate) fn new(
        env: Environment,
        vregs: &'a mut Vec<VirtReg>,
        frame: &'a mut Frame,
    ) -> RegAlloc<'a> {
        let n = vregs.len();
        RegAlloc {
            env,
            vregs,
            frame,
            banks: [Bank::new(&GP_ORDER), Bank::new(&VEC_ORDER), Bank::new(&MASK_ORDER)],
            assigned: vec![None; n],
            dirty: vec![false; n],
            in_home: vec![false; n],
            uses: vec![VecDeque::new(); n],
            positions: FxHashMap::default(),
            claimed: [0; 3],
        }
    }

    /// Record every virtual-register mention, in order.
    fn analyze(&mut self, nodes: &NodeList) {
        let mut pos = 0u32;
        for id in nodes.ids() {
            self.positions.insert(id, pos);
            match &nodes.get(id).kind {
                NodeKind::Inst(inst) => {
                    for op in &inst.ops {
                        self.note_operand(op, pos);
                    }
                }
                NodeKind::Call(call) => {
                    self.note_operand(&call.target, pos);
                }
                _ => {}
            }
            pos += 1;
        }
    }

    fn note_operand(&mut self, op: &Operand, pos: u32) {
        match op {
            Operand::Reg(r) if r.is_virtual() => {
                self.uses[vreg_index(*r)].push_back(pos);
            }
            Operand::Mem(m) => {
                for r in [m.base_reg(), m.index_reg()].into_iter().flatten() {
                    if r.is_virtual() {
                        self.uses[vreg_index(r)].push_back(pos);
                    }
                }
            }
            _ => {}
        }
    }

    /// Run the pass; afterwards no node mentions a virtual register.
    pub(crate) fn run(&mut self, nodes: &mut NodeList) -> AsmResult<()> {
        self.analyze(nodes);
        let ids: Vec<u32> = nodes.ids().collect();
        for id in ids {
            self.claimed = [0; 3];
            let kind = &nodes.get(id).kind;
            match kind {
                NodeKind::Inst(inst) => {
                    let mut inst = inst.clone();
                    self.process_inst(nodes, id, &mut inst)?;
                    nodes.get_mut(id).kind = NodeKind::Inst(inst);
                }
                NodeKind::Label(_) => self.flush_all(nodes, id),
                NodeKind::Call(call) => {
                    let mut call = call.clone();
                    let pos = self.positions[&id];
                    let mut target = call.target;
                    self.process_operand_read(nodes, id, &mut target)?;
                    call.target = target;
                    self.release_dead(pos);
                    self.evict_caller_saved(nodes, id);
                    nodes.get_mut(id).kind = NodeKind::Call(call);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn process_inst(
        &mut self,
        nodes: &mut NodeList,
        id: u32,
        inst: &mut super::node::InstNode,
    ) -> AsmResult<()> {
        let rec = get_inst(inst.id);
        let sig = select_signature(self.env, rec, &inst.ops)?;
        let slots: SmallVec<[(Access, Option<u8>); 6]> = sig
            .explicit_ops()
            .map(|s| (s.access, s.fixed_id()))
            .collect();

        // Pre-claim every register this node already names, so allocation
        // for one operand cannot steal another operand's register.
        for op in &inst.ops {
            match op {
                Operand::Reg(r) if !r.is_virtual() => {
                    self.claim(bank_of(r.class()), r.enc());
                }
                Operand::Reg(r) => {
                    if let Some(enc) = self.assigned[vreg_index(*r)] {
                        self.claim(bank_of(r.class()), enc);
                    }
                }
                Operand::Mem(m) => {
                    for r in [m.base_reg(), m.index_reg()].into_iter().flatten() {
                        if !r.is_virtual() {
                            self.claim(bank_of(r.class()), r.enc());
                        } else if let Some(enc) = self.assigned[vreg_index(r)] {
                            self.claim(bank_of(r.class()), enc);
                        }
                    }
                }
                _ => {}
            }
        }

        // Address registers are always reads.
        for op in inst.ops.iter_mut() {
            if matches!(op, Operand::Mem(_)) {
                self.process_operand_read(nodes, id, op)?;
            }
        }

        // Register operands, honoring access mode and fixed constraints.
        for (i, op) in inst.ops.iter_mut().enumerate() {
            let Some((access, fixed)) = slots.get(i).copied() else { break };
            let Operand::Reg(r) = *op else { continue };
            if !r.is_virtual() {
                if access.is_write() {
                    self.evict_physical(nodes, id, bank_of(r.class()), r.enc());
                    self.note_write(r.class(), r.enc());
                }
                continue;
            }
            let vidx = vreg_index(r);
            let class = self.vregs[vidx].class;
            let enc = match fixed {
                Some(enc) => {
                    self.ensure_in(nodes, id, vidx, enc, access.is_read())?;
                    enc
                }
                None if access.is_read() => self.ensure_read(nodes, id, vidx)?,
                None => self.ensure_any(nodes, id, vidx)?,
            };
            if access.is_write() {
                self.dirty[vidx] = true;
                self.in_home[vidx] = false;
                self.note_write(class, enc);
            }
            *op = Operand::Reg(Reg::new(class, u16::from(enc)));
        }

        // Implicit fixed registers (the mul/div families) clobber physical
        // registers that never appear in the operand list.
        for slot in sig.ops.iter().filter(|s| s.is_implicit()) {
            if let (Some(enc), true) = (slot.fixed_id(), slot.access.is_write()) {
                let bank = if slot.kinds.intersects(OpKindSet::VEC) {
                    BANK_VEC
                } else if slot.kinds.intersects(OpKindSet::KREG) {
                    BANK_MASK
                } else {
                    BANK_GP
                };
                self.evict_physical(nodes, id, bank, enc);
            }
        }

        let pos = self.positions[&id];
        self.release_dead(pos);

        // Branches end a straight-line region.
        if matches!(rec.common_info().control, ControlFlow::Jump | ControlFlow::Branch) {
            self.flush_all(nodes, id);
        }
        Ok(())
    }

    /// Rewrite any virtual address registers inside a memory (or register)
    /// operand, reloading as needed.
    fn process_operand_read(
        &mut self,
        nodes: &mut NodeList,
        id: u32,
        op: &mut Operand,
    ) -> AsmResult<()> {
        match op {
            Operand::Reg(r) if r.is_virtual() => {
                let vidx = vreg_index(*r);
                let class = self.vregs[vidx].class;
                let enc = self.ensure_read(nodes, id, vidx)?;
                *op = Operand::Reg(Reg::new(class, u16::from(enc)));
                Ok(())
            }
            Operand::Mem(m) => {
                if let Some(base) = m.base_reg() {
                    if base.is_virtual() {
                        let vidx = vreg_index(base);
                        let enc = self.ensure_read(nodes, id, vidx)?;
                        m.replace_base(Reg::new(base.class(), u16::from(enc)));
                    }
                }
                if let Some(index) = m.index_reg() {
                    if index.is_virtual() {
                        let vidx = vreg_index(index);
                        let enc = self.ensure_read(nodes, id, vidx)?;
                        m.replace_index(Reg::new(index.class(), u16::from(enc)));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn claim(&mut self, bank: usize, enc: u8) {
        self.claimed[bank] |= 1 << enc;
    }

    fn is_claimed(&self, bank: usize, enc: u8) -> bool {
        self.claimed[bank] & (1 << enc) != 0
    }

    fn note_write(&mut self, class: RegClass, enc: u8) {
        if class.is_gp() {
            self.frame.note_gp_write(enc);
        } else if class.is_vec() {
            self.frame.note_vec_write(enc);
        }
    }

    fn next_use(&self, vidx: usize) -> u32 {
        self.uses[vidx].front().copied().unwrap_or(0)
    }

    fn release_dead(&mut self, pos: u32) {
        for vidx in 0..self.vregs.len() {
            while self.uses[vidx].front().is_some_and(|&p| p <= pos) {
                self.uses[vidx].pop_front();
            }
            if self.uses[vidx].is_empty() {
                if let Some(enc) = self.assigned[vidx] {
                    let bank = bank_of(self.vregs[vidx].class);
                    self.banks[bank].holder[usize::from(enc)] = None;
                    self.assigned[vidx] = None;
                }
            }
        }
    }

    fn ensure_read(&mut self, nodes: &mut NodeList, id: u32, vidx: usize) -> AsmResult<u8> {
        if let Some(enc) = self.assigned[vidx] {
            self.claim(bank_of(self.vregs[vidx].class), enc);
            return Ok(enc);
        }
        let enc = self.allocate(nodes, id, vidx)?;
        if self.in_home[vidx] {
            let (mnemonic, ops) = self.load_ops(vidx, enc);
            nodes.insert_before(id, inst_node(mnemonic, &ops));
            self.dirty[vidx] = false;
        }
        Ok(enc)
    }

    fn ensure_any(&mut self, nodes: &mut NodeList, id: u32, vidx: usize) -> AsmResult<u8> {
        if let Some(enc) = self.assigned[vidx] {
            self.claim(bank_of(self.vregs[vidx].class), enc);
            return Ok(enc);
        }
        self.allocate(nodes, id, vidx)
    }

    /// Put `vidx` into the specific register `enc`, moving or reloading.
    fn ensure_in(
        &mut self,
        nodes: &mut NodeList,
        id: u32,
        vidx: usize,
        enc: u8,
        need_value: bool,
    ) -> AsmResult<u8> {
        let class = self.vregs[vidx].class;
        let bank = bank_of(class);
        if self.assigned[vidx] == Some(enc) {
            self.claim(bank, enc);
            return Ok(enc);
        }
        self.evict_physical(nodes, id, bank, enc);
        if let Some(cur) = self.assigned[vidx] {
            if need_value {
                let (mnemonic, ops) = move_ops(class, enc, cur);
                nodes.insert_before(id, inst_node(mnemonic, &ops));
            }
            self.banks[bank].holder[usize::from(cur)] = None;
        } else if need_value && self.in_home[vidx] {
            self.assigned[vidx] = Some(enc);
            let (mnemonic, ops) = self.load_ops(vidx, enc);
            nodes.insert_before(id, inst_node(mnemonic, &ops));
            self.dirty[vidx] = false;
        }
        self.assigned[vidx] = Some(enc);
        self.banks[bank].holder[usize::from(enc)] = Some(vidx);
        self.note_write(class, enc);
        self.claim(bank, enc);
        Ok(enc)
    }

    /// Pick a register for `vidx`, spilling the furthest-next-use victim if
    /// the bank is full.
    fn allocate(&mut self, nodes: &mut NodeList, id: u32, vidx: usize) -> AsmResult<u8> {
        let class = self.vregs[vidx].class;
        let bank = bank_of(class);
        let free = self.banks[bank]
            .order
            .iter()
            .copied()
            .find(|&e| self.banks[bank].holder[usize::from(e)].is_none() && !self.is_claimed(bank, e));
        let enc = match free {
            Some(e) => e,
            None => {
                let victim_enc = self.banks[bank]
                    .order
                    .iter()
                    .copied()
                    .filter(|&e| !self.is_claimed(bank, e))
                    .max_by_key(|&e| {
                        self.banks[bank].holder[usize::from(e)]
                            .map_or(0, |v| self.next_use(v))
                    })
                    .ok_or(AsmError::RegAllocFailure(
                        "register class exhausted by pinned operands",
                    ))?;
                self.evict_physical(nodes, id, bank, victim_enc);
                victim_enc
            }
        };
        self.assigned[vidx] = Some(enc);
        self.banks[bank].holder[usize::from(enc)] = Some(vidx);
        self.note_write(class, enc);
        self.claim(bank, enc);
        Ok(enc)
    }

    /// Free one physical register, storing its occupant to the home slot
    /// when the value is live and not already in memory.
    fn evict_physical(&mut self, nodes: &mut NodeList, id: u32, bank: usize, enc: u8) {
        let Some(vidx) = self.banks[bank].holder[usize::from(enc)] else {
            return;
        };
        if !self.uses[vidx].is_empty() && self.dirty[vidx] {
            let (mnemonic, ops) = self.store_ops(vidx, enc);
            nodes.insert_before(id, inst_node(mnemonic, &ops));
            self.in_home[vidx] = true;
            self.dirty[vidx] = false;
        }
        self.banks[bank].holder[usize::from(enc)] = None;
        self.assigned[vidx] = None;
    }

    /// Region boundary: flush every live assigned register to memory.
    fn flush_all(&mut self, nodes: &mut NodeList, before: u32) {
        for vidx in 0..self.vregs.len() {
            if let Some(enc) = self.assigned[vidx] {
                if !self.uses[vidx].is_empty() && self.dirty[vidx] {
                    let (mnemonic, ops) = self.store_ops(vidx, enc);
                    nodes.insert_before(before, inst_node(mnemonic, &ops));
                    self.in_home[vidx] = true;
                    self.dirty[vidx] = false;
                }
                let bank = bank_of(self.vregs[vidx].class);
                self.banks[bank].holder[usize::from(enc)] = None;
                self.assigned[vidx] = None;
            }
        }
    }

    /// Call boundary: only caller-saved registers are lost.
    fn evict_caller_saved(&mut self, nodes: &mut NodeList, call_id: u32) {
        let info = self.frame.call_conv.info();
        for vidx in 0..self.vregs.len() {
            let Some(enc) = self.assigned[vidx] else { continue };
            if self.uses[vidx].is_empty() {
                continue;
            }
            let class = self.vregs[vidx].class;
            let preserved = match bank_of(class) {
                BANK_GP => info.is_preserved_gp(enc),
                BANK_VEC => info.is_preserved_vec(enc),
                // Mask registers are caller-saved everywhere.
                _ => false,
            };
            if preserved {
                continue;
            }
            if self.dirty[vidx] {
                let (mnemonic, ops) = self.store_ops(vidx, enc);
                nodes.insert_before(call_id, inst_node(mnemonic, &ops));
                self.in_home[vidx] = true;
                self.dirty[vidx] = false;
            }
            let bank = bank_of(class);
            self.banks[bank].holder[usize::from(enc)] = None;
            self.assigned[vidx] = None;
        }
    }

    fn home_of(&mut self, vidx: usize) -> u32 {
        if let Some(offset) = self.vregs[vidx].home {
            return offset;
        }
        let size = self.vregs[vidx].spill_size();
        let offset = self.frame.alloc_spill_slot(size);
        self.vregs[vidx].home = Some(offset);
        offset
    }

    fn store_ops(&mut self, vidx: usize, enc: u8) -> (Mnemonic, [Operand; 2]) {
        let offset = self.home_of(vidx);
        let class = self.vregs[vidx].class;
        let (mnemonic, reg) = spill_reg(class, enc);
        #[allow(clippy::cast_possible_wrap)]
        let slot = ptr(rsp()).disp(offset as i32);
        (mnemonic, [Operand::Mem(slot), Operand::Reg(reg)])
    }

    fn load_ops(&mut self, vidx: usize, enc: u8) -> (Mnemonic, [Operand; 2]) {
        let offset = self.home_of(vidx);
        let class = self.vregs[vidx].class;
        let (mnemonic, reg) = spill_reg(class, enc);
        #[allow(clippy::cast_possible_wrap)]
        let slot = ptr(rsp()).disp(offset as i32);
        (mnemonic, [Operand::Reg(reg), Operand::Mem(slot)])
    }
}

fn rsp() -> Reg {
    Reg::new(RegClass::Gpq, u16::from(crate::reg::enc::RSP))
}

/// The mnemonic and register shape used to move a class through memory.
/// GP values always spill the full 64-bit register.
fn spill_reg(class: RegClass, enc: u8) -> (Mnemonic, Reg) {
    match class {
        c if c.is_gp() => (Mnemonic::Mov, Reg::new(RegClass::Gpq, u16::from(enc))),
        RegClass::Xmm => (Mnemonic::Movups, Reg::new(RegClass::Xmm, u16::from(enc))),
        RegClass::Ymm => (Mnemonic::Vmovups, Reg::new(RegClass::Ymm, u16::from(enc))),
        RegClass::Zmm => (Mnemonic::Vmovups, Reg::new(RegClass::Zmm, u16::from(enc))),
        RegClass::KMask => (Mnemonic::Kmovq, Reg::new(RegClass::KMask, u16::from(enc))),
        _ => (Mnemonic::Mov, Reg::new(RegClass::Gpq, u16::from(enc))),
    }
}

/// Register-to-register move for a class.
fn move_ops(class: RegClass, dst_enc: u8, src_enc: u8) -> (Mnemonic, [Operand; 2]) {
    let (mnemonic, _) = spill_reg(class, dst_enc);
    let dst = match class {
        c if c.is_gp() => Reg::new(RegClass::Gpq, u16::from(dst_enc)),
        _ => Reg::new(class, u16::from(dst_enc)),
    };
    let src = match class {
        c if c.is_gp() => Reg::new(RegClass::Gpq, u16::from(src_enc)),
        _ => Reg::new(class, u16::from(src_enc)),
    };
    (mnemonic, [Operand::Reg(dst), Operand::Reg(src)])
}

fn inst_node(id: Mnemonic, ops: &[Operand]) -> NodeKind {
    NodeKind::Inst(super::node::InstNode {
        id,
        ops: ops.iter().copied().collect(),
        options: crate::asm::InstOptions::default(),
    })
}
