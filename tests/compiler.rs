//! End-to-end tests for the compiler front-end: virtual registers through
//! register allocation, frame synthesis and, on x86-64 hosts, execution.

use anvil_x86::compiler::{CallConv, Compiler, FuncSignature, VType};
use anvil_x86::{CodeHolder, Environment, Mnemonic, Operand};

#[test]
fn finalize_produces_a_complete_function() {
    let mut holder = CodeHolder::new(Environment::x64());
    {
        let mut c = Compiler::new(&mut holder);
        let sig = FuncSignature::new(CallConv::SystemV, &[VType::I32, VType::I32], Some(VType::I32));
        let params = c.func_begin(sig).unwrap();
        let tmp = c.new_gp32();
        c.emit(Mnemonic::Mov, &[tmp.into(), params[0].into()]).unwrap();
        c.emit(Mnemonic::Imul, &[tmp.into(), params[1].into()]).unwrap();
        c.ret(Some(tmp.into())).unwrap();
        c.func_end().unwrap();
        c.finalize().unwrap();
    }
    let code = holder.section(0).data();
    assert!(code.len() >= 4);
    assert_eq!(*code.last().unwrap(), 0xc3);
    // No stray virtual-register markers can survive into machine code; a
    // quick sanity scan for the REX-invalid 0x62..0x67 run is not possible,
    // so instead re-flatten and check determinism.
    let again = holder.flatten(0).unwrap();
    assert_eq!(again.as_slice(), code);
}

#[test]
fn loops_spill_across_branches() {
    let mut holder = CodeHolder::new(Environment::x64());
    {
        let mut c = Compiler::new(&mut holder);
        let sig = FuncSignature::new(CallConv::SystemV, &[VType::I32], Some(VType::I32));
        let params = c.func_begin(sig).unwrap();
        let acc = c.new_gp32();
        let i = c.new_gp32();
        c.emit(Mnemonic::Xor, &[acc.into(), acc.into()]).unwrap();
        c.emit(Mnemonic::Mov, &[i.into(), params[0].into()]).unwrap();
        let top = c.new_label();
        c.bind(top).unwrap();
        c.emit(Mnemonic::Add, &[acc.into(), i.into()]).unwrap();
        c.emit(Mnemonic::Sub, &[i.into(), Operand::from(1)]).unwrap();
        c.emit(Mnemonic::Jne, &[top.into()]).unwrap();
        c.ret(Some(acc.into())).unwrap();
        c.func_end().unwrap();
        c.finalize().unwrap();
    }
    assert!(!holder.section(0).data().is_empty());
}

#[cfg(all(target_arch = "x86_64", unix))]
mod run {
    use super::*;
    use anvil_x86::JitRuntime;

    #[test]
    fn run_mul_function() {
        let mut holder = CodeHolder::new(Environment::x64());
        {
            let mut c = Compiler::new(&mut holder);
            let sig =
                FuncSignature::new(CallConv::SystemV, &[VType::I32, VType::I32], Some(VType::I32));
            let params = c.func_begin(sig).unwrap();
            let tmp = c.new_gp32();
            c.emit(Mnemonic::Mov, &[tmp.into(), params[0].into()]).unwrap();
            c.emit(Mnemonic::Imul, &[tmp.into(), params[1].into()]).unwrap();
            c.ret(Some(tmp.into())).unwrap();
            c.func_end().unwrap();
            c.finalize().unwrap();
        }
        let rt = JitRuntime::new();
        let code = rt.add(&holder).unwrap();
        let ptr = code.ptr();
        let f: extern "C" fn(i32, i32) -> i32 = unsafe { core::mem::transmute(ptr) };
        assert_eq!(f(6, 7), 42);
        assert_eq!(f(-3, 5), -15);
    }

    #[test]
    fn run_sum_loop() {
        let mut holder = CodeHolder::new(Environment::x64());
        {
            let mut c = Compiler::new(&mut holder);
            let sig = FuncSignature::new(CallConv::SystemV, &[VType::I32], Some(VType::I32));
            let params = c.func_begin(sig).unwrap();
            let acc = c.new_gp32();
            let i = c.new_gp32();
            c.emit(Mnemonic::Xor, &[acc.into(), acc.into()]).unwrap();
            c.emit(Mnemonic::Mov, &[i.into(), params[0].into()]).unwrap();
            let top = c.new_label();
            c.bind(top).unwrap();
            c.emit(Mnemonic::Add, &[acc.into(), i.into()]).unwrap();
            c.emit(Mnemonic::Sub, &[i.into(), Operand::from(1)]).unwrap();
            c.emit(Mnemonic::Jne, &[top.into()]).unwrap();
            c.ret(Some(acc.into())).unwrap();
            c.func_end().unwrap();
            c.finalize().unwrap();
        }
        let rt = JitRuntime::new();
        let code = rt.add(&holder).unwrap();
        let ptr = code.ptr();
        let f: extern "C" fn(i32) -> i32 = unsafe { core::mem::transmute(ptr) };
        assert_eq!(f(10), 55);
        assert_eq!(f(1), 1);
    }

    #[test]
    fn run_with_forced_spills() {
        // Use more simultaneously live values than allocatable registers so
        // the allocator must spill, then verify the arithmetic survives.
        let mut holder = CodeHolder::new(Environment::x64());
        let n = 20i64;
        {
            let mut c = Compiler::new(&mut holder);
            let sig = FuncSignature::new(CallConv::SystemV, &[], Some(VType::I64));
            c.func_begin(sig).unwrap();
            let vs: Vec<_> = (0..n).map(|_| c.new_gp64()).collect();
            for (k, v) in vs.iter().enumerate() {
                c.emit(Mnemonic::Mov, &[(*v).into(), Operand::from(k as i64 + 1)]).unwrap();
            }
            let acc = c.new_gp64();
            c.emit(Mnemonic::Mov, &[acc.into(), Operand::from(0i64)]).unwrap();
            for v in &vs {
                c.emit(Mnemonic::Add, &[acc.into(), (*v).into()]).unwrap();
            }
            c.ret(Some(acc.into())).unwrap();
            c.func_end().unwrap();
            c.finalize().unwrap();
        }
        let rt = JitRuntime::new();
        let code = rt.add(&holder).unwrap();
        let ptr = code.ptr();
        let f: extern "C" fn() -> i64 = unsafe { core::mem::transmute(ptr) };
        assert_eq!(f(), n * (n + 1) / 2);
    }
}
