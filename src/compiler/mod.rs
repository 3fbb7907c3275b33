//! The compiler front-end.
//!
//! Unlike the [`Assembler`](crate::Assembler), which encodes immediately,
//! the [`Compiler`] records instructions into a node list and may use
//! virtual registers (and virtual-register-based addressing) anywhere a
//! physical register is accepted. [`Compiler::finalize`] then runs the
//! lowering and register-allocation passes and replays the stream through
//! the assembler into the holder:
//!
//! 1. lowering expands calls, returns and parameter bindings into explicit
//!    move instructions around their marker nodes;
//! 2. register allocation assigns physical registers, inserting spills and
//!    reloads against the function frame;
//! 3. prologue/epilogue synthesis wraps the stream per the calling
//!    convention, and everything is emitted as plain machine code.

mod callconv;
mod frame;
mod node;
mod regalloc;
mod vreg;

pub use self::callconv::CallConv;
pub use self::frame::FuncSignature;
pub use self::vreg::VType;

use crate::asm::{Assembler, InstOptions};
use crate::buffer::CodeHolder;
use crate::error::{AsmError, AsmResult};
use crate::inst::{get_inst, Mnemonic};
use crate::matcher::select_signature;
use crate::operand::{ptr, Imm, Label, Operand};
use crate::reg::{enc, Reg, RegClass};
use self::frame::{classify_params, Frame, ParamLocation};
use self::node::{CallNode, InstNode, NodeKind, NodeList};
use self::regalloc::RegAlloc;
use smallvec::SmallVec;
use self::vreg::{vreg_operand, VirtReg};

/// The compiler emitter. See the module documentation.
pub struct Compiler<'a> {
    holder: &'a mut CodeHolder,
    nodes: NodeList,
    vregs: Vec<VirtReg>,
    signature: Option<FuncSignature>,
    params: Vec<Reg>,
    options: InstOptions,
    error: Option<AsmError>,
}

impl<'a> Compiler<'a> {
    pub fn new(holder: &'a mut CodeHolder) -> Compiler<'a> {
        Compiler {
            holder,
            nodes: NodeList::new(),
            vregs: Vec::new(),
            signature: None,
            params: Vec::new(),
            options: InstOptions::default(),
            error: None,
        }
    }

    /// The latched error, if any recording step has failed.
    #[must_use]
    pub fn error(&self) -> Option<AsmError> {
        self.error
    }

    fn check(&self) -> AsmResult<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn latch<T>(&mut self, r: AsmResult<T>) -> AsmResult<T> {
        if let Err(e) = &r {
            if self.error.is_none() {
                self.error = Some(*e);
            }
        }
        r
    }

    // -- virtual registers -------------------------------------------------

    /// Create a virtual register of the given value type.
    pub fn new_vreg(&mut self, vtype: VType) -> Reg {
        let index = self.vregs.len();
        self.vregs.push(VirtReg::new(vtype));
        vreg_operand(index, vtype.reg_class())
    }

    pub fn new_gp8(&mut self) -> Reg {
        self.new_vreg(VType::U8)
    }

    pub fn new_gp16(&mut self) -> Reg {
        self.new_vreg(VType::U16)
    }

    pub fn new_gp32(&mut self) -> Reg {
        self.new_vreg(VType::I32)
    }

    pub fn new_gp64(&mut self) -> Reg {
        self.new_vreg(VType::I64)
    }

    pub fn new_ptr(&mut self) -> Reg {
        self.new_vreg(VType::IntPtr)
    }

    pub fn new_f32(&mut self) -> Reg {
        self.new_vreg(VType::F32)
    }

    pub fn new_f64(&mut self) -> Reg {
        self.new_vreg(VType::F64)
    }

    pub fn new_v128(&mut self) -> Reg {
        self.new_vreg(VType::V128)
    }

    pub fn new_v256(&mut self) -> Reg {
        self.new_vreg(VType::V256)
    }

    pub fn new_v512(&mut self) -> Reg {
        self.new_vreg(VType::V512)
    }

    pub fn new_mask(&mut self) -> Reg {
        self.new_vreg(VType::Mask)
    }

    // -- structure ---------------------------------------------------------

    /// Begin a function; returns one virtual register per parameter,
    /// bound to the ABI locations on entry.
    pub fn func_begin(&mut self, signature: FuncSignature) -> AsmResult<Vec<Reg>> {
        self.check()?;
        if self.signature.is_some() {
            return self.latch(Err(AsmError::Relocation("nested functions are not supported")));
        }
        let params: Vec<Reg> =
            signature.params.iter().map(|&ty| self.new_vreg(ty)).collect();
        self.signature = Some(signature);
        self.params = params.clone();
        self.nodes.push_back(NodeKind::FuncBegin);
        Ok(params)
    }

    /// End the function body.
    pub fn func_end(&mut self) -> AsmResult<()> {
        self.check()?;
        self.nodes.push_back(NodeKind::FuncEnd);
        Ok(())
    }

    /// Return from the function, optionally with a value.
    pub fn ret(&mut self, value: Option<Operand>) -> AsmResult<()> {
        self.check()?;
        self.nodes.push_back(NodeKind::Ret(value));
        Ok(())
    }

    /// Call `target` with `args`; returns the virtual register holding the
    /// result when `ret` names a type.
    pub fn call(
        &mut self,
        target: impl Into<Operand>,
        args: &[Operand],
        ret: Option<VType>,
    ) -> AsmResult<Option<Reg>> {
        self.check()?;
        let ret_reg = ret.map(|ty| self.new_vreg(ty));
        self.nodes.push_back(NodeKind::Call(CallNode {
            target: target.into(),
            args: args.iter().copied().collect(),
            ret: ret_reg.map(Operand::Reg),
            vararg: false,
        }));
        Ok(ret_reg)
    }

    /// Like [`Compiler::call`] for System V variadic callees: AL receives
    /// the vector-argument count.
    pub fn call_vararg(
        &mut self,
        target: impl Into<Operand>,
        args: &[Operand],
        ret: Option<VType>,
    ) -> AsmResult<Option<Reg>> {
        self.check()?;
        let ret_reg = ret.map(|ty| self.new_vreg(ty));
        self.nodes.push_back(NodeKind::Call(CallNode {
            target: target.into(),
            args: args.iter().copied().collect(),
            ret: ret_reg.map(Operand::Reg),
            vararg: true,
        }));
        Ok(ret_reg)
    }

    /// Create an (unbound) label in the holder.
    pub fn new_label(&mut self) -> Label {
        self.holder.new_label()
    }

    /// Bind `label` at this point in the stream.
    pub fn bind(&mut self, label: Label) -> AsmResult<()> {
        self.check()?;
        self.nodes.push_back(NodeKind::Label(label));
        Ok(())
    }

    /// Align the code position.
    pub fn align(&mut self, alignment: u32) -> AsmResult<()> {
        self.check()?;
        self.nodes.push_back(NodeKind::Align(alignment));
        Ok(())
    }

    /// Embed raw data at this point.
    pub fn embed(&mut self, bytes: &[u8]) -> AsmResult<()> {
        self.check()?;
        self.nodes.push_back(NodeKind::Data(bytes.to_vec()));
        Ok(())
    }

    /// Attach a note to the stream; ignored at emission.
    pub fn comment(&mut self, text: &str) -> AsmResult<()> {
        self.check()?;
        self.nodes.push_back(NodeKind::Comment(text.to_string()));
        Ok(())
    }

    // -- instructions ------------------------------------------------------

    /// Record one instruction; operands may contain virtual registers.
    pub fn emit(&mut self, id: Mnemonic, ops: &[Operand]) -> AsmResult<()> {
        self.check()?;
        let options = core::mem::take(&mut self.options);
        // Validate the shape early so mistakes surface at the call site
        // rather than at finalization.
        let env = self.holder.env();
        let rec = get_inst(id);
        if !env.features.supports(rec.features) {
            return self.latch(Err(AsmError::IncompatibleInstruction));
        }
        let validated = select_signature(env, rec, ops).map(|_| ());
        self.latch(validated)?;
        self.nodes.push_back(NodeKind::Inst(InstNode {
            id,
            ops: ops.iter().copied().collect(),
            options,
        }));
        Ok(())
    }

    // -- finalization ------------------------------------------------------

    /// Run lowering and register allocation, then emit everything into the
    /// holder. Consumes the compiler.
    pub fn finalize(mut self) -> AsmResult<()> {
        self.check()?;
        let env = self.holder.env();
        let conv = self
            .signature
            .as_ref()
            .map_or_else(CallConv::host, |s| s.call_conv);
        let mut frame = Frame::new(conv);

        self.lower(&mut frame)?;
        let mut vregs = core::mem::take(&mut self.vregs);
        let mut nodes = core::mem::take(&mut self.nodes);
        RegAlloc::new(env, &mut vregs, &mut frame).run(&mut nodes)?;

        let mut asm = Assembler::new(self.holder);
        emit_stream(&mut asm, &nodes, &frame)?;
        match asm.error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Expand call/return/parameter markers into explicit moves.
    fn lower(&mut self, frame: &mut Frame) -> AsmResult<()> {
        let info = frame.call_conv.info();
        let ids: Vec<u32> = self.nodes.ids().collect();
        for id in ids {
            match self.nodes.get(id).kind.clone() {
                NodeKind::FuncBegin => {
                    let Some(signature) = self.signature.clone() else { continue };
                    let locations = classify_params(&signature);
                    let mut anchor = id;
                    for (param, loc) in self.params.clone().iter().zip(&locations) {
                        let kind = match *loc {
                            ParamLocation::Reg(reg_enc) => {
                                let phys = Reg::new(param.class(), u16::from(reg_enc));
                                move_node(param.class(), Operand::Reg(*param), Operand::Reg(phys))
                            }
                            ParamLocation::Stack(offset) => {
                                frame.use_frame_pointer = true;
                                // After `push rbp; mov rbp, rsp` the entry
                                // stack pointer is rbp + 8.
                                #[allow(clippy::cast_possible_wrap)]
                                let slot = ptr(Reg::new(RegClass::Gpq, u16::from(enc::RBP)))
                                    .disp(offset as i32 + 8);
                                move_node(param.class(), Operand::Reg(*param), Operand::Mem(slot))
                            }
                        };
                        anchor = self.nodes.insert_after(anchor, kind);
                    }
                }
                NodeKind::Ret(value) => {
                    if let Some(value) = value {
                        let class = operand_move_class(&value);
                        let ret_enc = if class.is_vec() { info.vec_ret } else { info.int_ret };
                        let phys = Reg::new(class, u16::from(ret_enc));
                        self.nodes.insert_before(
                            id,
                            move_node(class, Operand::Reg(phys), value),
                        );
                    }
                    self.nodes.get_mut(id).kind = NodeKind::Ret(None);
                }
                NodeKind::Call(call) => {
                    frame.has_calls = true;
                    let mut next_slot = 0usize;
                    let mut next_vec = 0usize;
                    let mut next_int = 0usize;
                    let windows = info.shadow_space != 0;
                    let mut stack_args = 0u32;
                    let mut vec_count = 0u32;
                    for arg in &call.args {
                        let class = operand_move_class(arg);
                        let is_vec = class.is_vec();
                        if is_vec {
                            vec_count += 1;
                        }
                        let reg_enc = if windows {
                            let i = next_slot;
                            next_slot += 1;
                            if is_vec {
                                info.vec_args.get(i).copied()
                            } else {
                                info.int_args.get(i).copied()
                            }
                        } else if is_vec {
                            let i = next_vec;
                            next_vec += 1;
                            info.vec_args.get(i).copied()
                        } else {
                            let i = next_int;
                            next_int += 1;
                            info.int_args.get(i).copied()
                        };
                        let kind = match reg_enc {
                            Some(reg_enc) => {
                                let phys = Reg::new(class, u16::from(reg_enc));
                                move_node(class, Operand::Reg(phys), *arg)
                            }
                            None => {
                                #[allow(clippy::cast_possible_wrap)]
                                let slot = ptr(Reg::new(RegClass::Gpq, u16::from(enc::RSP)))
                                    .disp((info.shadow_space + stack_args) as i32);
                                stack_args += 8;
                                move_node(class, Operand::Mem(slot), *arg)
                            }
                        };
                        self.nodes.insert_before(id, kind);
                    }
                    if call.vararg && info.vararg_vec_count_in_al {
                        let al = Reg::new(RegClass::GpbLo, 0);
                        self.nodes.insert_before(
                            id,
                            inst(Mnemonic::Mov, &[
                                Operand::Reg(al),
                                Operand::Imm(Imm::new(i64::from(vec_count))),
                            ]),
                        );
                    }
                    frame.outgoing = frame.outgoing.max(info.shadow_space + stack_args);
                    if let Some(Operand::Reg(ret)) = call.ret {
                        let class = ret.class();
                        let ret_enc = if class.is_vec() { info.vec_ret } else { info.int_ret };
                        let phys = Reg::new(class, u16::from(ret_enc));
                        self.nodes.insert_after(
                            id,
                            move_node(class, Operand::Reg(ret), Operand::Reg(phys)),
                        );
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// The class a value moves through for ABI purposes.
fn operand_move_class(op: &Operand) -> RegClass {
    match op {
        Operand::Reg(r) => r.class(),
        _ => RegClass::Gpq,
    }
}

/// Build the move instruction appropriate for a register class.
fn move_node(class: RegClass, dst: Operand, src: Operand) -> NodeKind {
    let id = match class {
        RegClass::Xmm => Mnemonic::Movaps,
        RegClass::Ymm => Mnemonic::Vmovaps,
        RegClass::Zmm => Mnemonic::Vmovaps,
        RegClass::KMask => Mnemonic::Kmovq,
        _ => Mnemonic::Mov,
    };
    inst(id, &[dst, src])
}

fn inst(id: Mnemonic, ops: &[Operand]) -> NodeKind {
    NodeKind::Inst(InstNode {
        id,
        ops: SmallVec::from_slice(ops),
        options: InstOptions::default(),
    })
}

/// Replay the allocated node stream into the assembler, synthesizing the
/// prologue and epilogue.
fn emit_stream(asm: &mut Assembler<'_>, nodes: &NodeList, frame: &Frame) -> AsmResult<()> {
    let rsp = Reg::new(RegClass::Gpq, u16::from(enc::RSP));
    let rbp = Reg::new(RegClass::Gpq, u16::from(enc::RBP));
    let adjust = frame.stack_adjustment();
    let saved_gp = frame.saved_gp();
    let saved_vec = frame.saved_vec();
    let vec_base = frame.vec_save_base();

    for id in nodes.ids() {
        match &nodes.get(id).kind {
            NodeKind::FuncBegin => {
                if frame.use_frame_pointer {
                    asm.push(rbp)?;
                    asm.mov(rbp, rsp)?;
                }
                for &e in &saved_gp {
                    asm.push(Reg::new(RegClass::Gpq, u16::from(e)))?;
                }
                if adjust != 0 {
                    #[allow(clippy::cast_possible_wrap)]
                    asm.sub(rsp, adjust as i32)?;
                }
                for (i, &e) in saved_vec.iter().enumerate() {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                    let slot = ptr(rsp).disp((vec_base + 16 * i as u32) as i32);
                    asm.movups(slot, Reg::new(RegClass::Xmm, u16::from(e)))?;
                }
            }
            NodeKind::Ret(_) => {
                for (i, &e) in saved_vec.iter().enumerate() {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                    let slot = ptr(rsp).disp((vec_base + 16 * i as u32) as i32);
                    asm.movups(Reg::new(RegClass::Xmm, u16::from(e)), slot)?;
                }
                if adjust != 0 {
                    #[allow(clippy::cast_possible_wrap)]
                    asm.add(rsp, adjust as i32)?;
                }
                for &e in saved_gp.iter().rev() {
                    asm.pop(Reg::new(RegClass::Gpq, u16::from(e)))?;
                }
                if frame.use_frame_pointer {
                    asm.pop(rbp)?;
                }
                asm.ret()?;
            }
            NodeKind::FuncEnd | NodeKind::Comment(_) => {}
            NodeKind::Label(label) => asm.bind(*label)?,
            NodeKind::Align(alignment) => asm.align(*alignment)?,
            NodeKind::Data(bytes) => asm.embed(bytes)?,
            NodeKind::Inst(instn) => {
                asm.emit_with_options(instn.id, &instn.ops, instn.options)?;
            }
            NodeKind::Call(call) => {
                asm.emit(Mnemonic::Call, &[call.target])?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Environment;

    #[test]
    fn leaf_function_add() {
        let mut holder = CodeHolder::new(Environment::x64());
        {
            let mut c = Compiler::new(&mut holder);
            let sig = FuncSignature::new(CallConv::SystemV, &[VType::I64, VType::I64], Some(VType::I64));
            let params = c.func_begin(sig).unwrap();
            let sum = c.new_gp64();
            c.emit(Mnemonic::Mov, &[sum.into(), params[0].into()]).unwrap();
            c.emit(Mnemonic::Add, &[sum.into(), params[1].into()]).unwrap();
            c.ret(Some(sum.into())).unwrap();
            c.func_end().unwrap();
            c.finalize().unwrap();
        }
        let code = holder.section(0).data();
        assert!(!code.is_empty());
        // The function must end with a ret.
        assert_eq!(*code.last().unwrap(), 0xc3);
    }

    #[test]
    fn spills_are_inserted_when_registers_run_out() {
        let mut holder = CodeHolder::new(Environment::x64());
        {
            let mut c = Compiler::new(&mut holder);
            let sig = FuncSignature::new(CallConv::SystemV, &[], Some(VType::I64));
            c.func_begin(sig).unwrap();
            // More live values than allocatable GP registers.
            let vs: Vec<Reg> = (0..20).map(|_| c.new_gp64()).collect();
            for (i, v) in vs.iter().enumerate() {
                c.emit(Mnemonic::Mov, &[(*v).into(), Operand::from(i as i64 + 1)]).unwrap();
            }
            let acc = c.new_gp64();
            c.emit(Mnemonic::Mov, &[acc.into(), 0i64.into()]).unwrap();
            for v in &vs {
                c.emit(Mnemonic::Add, &[acc.into(), (*v).into()]).unwrap();
            }
            c.ret(Some(acc.into())).unwrap();
            c.func_end().unwrap();
            c.finalize().unwrap();
        }
        assert!(!holder.section(0).data().is_empty());
    }

    #[test]
    fn call_lowering_moves_arguments() {
        let mut holder = CodeHolder::new(Environment::x64());
        {
            let mut c = Compiler::new(&mut holder);
            let sig = FuncSignature::new(CallConv::SystemV, &[VType::I64], Some(VType::I64));
            let params = c.func_begin(sig).unwrap();
            let callee = c.new_label();
            let ret = c.call(callee, &[params[0].into()], Some(VType::I64)).unwrap().unwrap();
            c.ret(Some(ret.into())).unwrap();
            c.func_end().unwrap();
            c.bind(callee).unwrap();
            c.emit(Mnemonic::Ud2, &[]).unwrap();
            c.finalize().unwrap();
        }
        let code = holder.section(0).data();
        // Somewhere in the stream there is a call rel32 (E8).
        assert!(code.contains(&0xe8));
    }
}
