//! Executable memory: the pluggable allocator boundary and a small runtime
//! helper that turns a finalized [`CodeHolder`] into callable code.
//!
//! The core itself never maps memory; everything goes through
//! [`ExecAllocator`]. The default [`SystemAllocator`] uses `mmap`/`mprotect`
//! on unix and `VirtualAlloc`/`VirtualProtect` on Windows, writing the code
//! into writable pages first and flipping them to read-execute afterwards.

use crate::buffer::CodeHolder;
use crate::error::{AsmError, AsmResult};

/// Provider of executable pages.
pub trait ExecAllocator {
    /// Allocate at least `size` bytes of writable memory that
    /// [`ExecAllocator::make_executable`] can later switch to read-execute.
    /// Returns the pointer and the allocation granularity.
    fn alloc_rx(&self, size: usize) -> AsmResult<(*mut u8, usize)>;

    /// Switch the pages to read-execute.
    fn make_executable(&self, ptr: *mut u8, size: usize) -> AsmResult<()>;

    /// Return pages to the system. `ptr` and `size` must describe an
    /// allocation from [`ExecAllocator::alloc_rx`].
    fn release(&self, ptr: *mut u8, size: usize);

    /// Size of a hardware page.
    fn page_size(&self) -> usize;

    /// Granularity of allocations (>= page size on Windows).
    fn page_granularity(&self) -> usize;
}

/// The default OS-page allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

#[cfg(unix)]
impl ExecAllocator for SystemAllocator {
    fn alloc_rx(&self, size: usize) -> AsmResult<(*mut u8, usize)> {
        let granularity = self.page_granularity();
        let rounded = round_up(size, granularity);
        // SAFETY: anonymous private mapping with no required address.
        let ptr = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                rounded,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANON,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(AsmError::EncodingOverflow);
        }
        Ok((ptr.cast(), granularity))
    }

    fn make_executable(&self, ptr: *mut u8, size: usize) -> AsmResult<()> {
        let rounded = round_up(size, self.page_size());
        // SAFETY: `ptr`/`rounded` describe a mapping returned by alloc_rx.
        let rc = unsafe { libc::mprotect(ptr.cast(), rounded, libc::PROT_READ | libc::PROT_EXEC) };
        if rc != 0 {
            return Err(AsmError::EncodingOverflow);
        }
        Ok(())
    }

    fn release(&self, ptr: *mut u8, size: usize) {
        let rounded = round_up(size, self.page_granularity());
        // SAFETY: releasing a mapping created by alloc_rx.
        unsafe {
            libc::munmap(ptr.cast(), rounded);
        }
    }

    fn page_size(&self) -> usize {
        // SAFETY: sysconf is always callable.
        let sz = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        usize::try_from(sz).unwrap_or(4096)
    }

    fn page_granularity(&self) -> usize {
        self.page_size()
    }
}

#[cfg(windows)]
impl ExecAllocator for SystemAllocator {
    fn alloc_rx(&self, size: usize) -> AsmResult<(*mut u8, usize)> {
        use windows_sys::Win32::System::Memory::{
            VirtualAlloc, MEM_COMMIT, MEM_RESERVE, PAGE_READWRITE,
        };
        let granularity = self.page_granularity();
        let rounded = round_up(size, granularity);
        // SAFETY: reserving and committing fresh pages.
        let ptr = unsafe {
            VirtualAlloc(core::ptr::null(), rounded, MEM_COMMIT | MEM_RESERVE, PAGE_READWRITE)
        };
        if ptr.is_null() {
            return Err(AsmError::EncodingOverflow);
        }
        Ok((ptr.cast(), granularity))
    }

    fn make_executable(&self, ptr: *mut u8, size: usize) -> AsmResult<()> {
        use windows_sys::Win32::System::Memory::{VirtualProtect, PAGE_EXECUTE_READ};
        let rounded = round_up(size, self.page_size());
        let mut old = 0u32;
        // SAFETY: `ptr` describes pages from alloc_rx.
        let ok = unsafe { VirtualProtect(ptr.cast(), rounded, PAGE_EXECUTE_READ, &mut old) };
        if ok == 0 {
            return Err(AsmError::EncodingOverflow);
        }
        Ok(())
    }

    fn release(&self, ptr: *mut u8, _size: usize) {
        use windows_sys::Win32::System::Memory::{VirtualFree, MEM_RELEASE};
        // SAFETY: releasing a reservation from alloc_rx.
        unsafe {
            VirtualFree(ptr.cast(), 0, MEM_RELEASE);
        }
    }

    fn page_size(&self) -> usize {
        4096
    }

    fn page_granularity(&self) -> usize {
        65536
    }
}

fn round_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Owns the executable pages produced by [`JitRuntime::add`].
pub struct ExecutableCode<'rt> {
    runtime: &'rt JitRuntime,
    ptr: *mut u8,
    size: usize,
}

impl ExecutableCode<'_> {
    /// Entry point of the code (base of the flattened image).
    #[must_use]
    pub fn ptr(&self) -> *const u8 {
        self.ptr
    }

    /// Flattened image size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl Drop for ExecutableCode<'_> {
    fn drop(&mut self) {
        self.runtime.alloc.release(self.ptr, self.size);
    }
}

/// Finalize-to-runnable helper: flattens a holder into fresh executable
/// pages with relocations applied against their address.
pub struct JitRuntime {
    alloc: Box<dyn ExecAllocator>,
}

impl Default for JitRuntime {
    fn default() -> JitRuntime {
        JitRuntime::new()
    }
}

impl JitRuntime {
    #[must_use]
    pub fn new() -> JitRuntime {
        JitRuntime { alloc: Box::new(SystemAllocator) }
    }

    #[must_use]
    pub fn with_allocator(alloc: Box<dyn ExecAllocator>) -> JitRuntime {
        JitRuntime { alloc }
    }

    /// Copy the holder's sections into executable memory.
    pub fn add(&self, holder: &CodeHolder) -> AsmResult<ExecutableCode<'_>> {
        let size = holder.code_size();
        if size == 0 {
            return Err(AsmError::Relocation("empty code holder"));
        }
        let (ptr, _granularity) = self.alloc.alloc_rx(size)?;
        // SAFETY: alloc_rx returned at least `size` writable bytes.
        let dest = unsafe { core::slice::from_raw_parts_mut(ptr, size) };
        match holder.copy_flattened(dest, ptr as u64) {
            Ok(_) => {}
            Err(e) => {
                self.alloc.release(ptr, size);
                return Err(e);
            }
        }
        if let Err(e) = self.alloc.make_executable(ptr, size) {
            self.alloc.release(ptr, size);
            return Err(e);
        }
        log::trace!("jit: mapped {size} bytes at {ptr:p}");
        Ok(ExecutableCode { runtime: self, ptr, size })
    }
}

#[cfg(all(test, target_arch = "x86_64"))]
mod tests {
    use super::*;
    use crate::asm::Assembler;
    use crate::cpu::Environment;
    use crate::reg::regs::*;

    #[test]
    fn run_generated_code() {
        let mut holder = CodeHolder::new(Environment::host());
        {
            let mut asm = Assembler::new(&mut holder);
            asm.mov(EAX, 42u32).unwrap();
            asm.ret().unwrap();
        }
        let runtime = JitRuntime::new();
        let code = runtime.add(&holder).unwrap();
        let f: extern "C" fn() -> i32 = unsafe { core::mem::transmute(code.ptr()) };
        assert_eq!(f(), 42);
    }

    #[test]
    fn run_loop_with_labels() {
        // Sum 1..=10 with a backward short jump.
        let mut holder = CodeHolder::new(Environment::host());
        {
            let mut asm = Assembler::new(&mut holder);
            asm.xor(EAX, EAX).unwrap();
            asm.mov(ECX, 10u32).unwrap();
            let top = asm.new_label();
            asm.bind(top).unwrap();
            asm.add(EAX, ECX).unwrap();
            asm.sub(ECX, 1).unwrap();
            asm.jne(top).unwrap();
            asm.ret().unwrap();
        }
        let runtime = JitRuntime::new();
        let code = runtime.add(&holder).unwrap();
        let f: extern "C" fn() -> i32 = unsafe { core::mem::transmute(code.ptr()) };
        assert_eq!(f(), 55);
    }
}
