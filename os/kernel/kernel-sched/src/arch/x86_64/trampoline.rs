//! # Timer interrupt trampoline
//!
//! Install [`preempt_trampoline`] as the handler of the periodic timer
//! vector. On every tick it snapshots the interrupted context onto the
//! current stack, asks the scheduler for the next stack pointer, switches to
//! it and resumes whatever context lives there.

use crate::global;
use kernel_memory_addresses::VirtualAddress;
use kernel_sync::SyncOnceCell;

static END_OF_INTERRUPT: SyncOnceCell<fn()> = SyncOnceCell::new();

/// Registers the routine that acknowledges the timer interrupt (e.g. a
/// LAPIC EOI write). It runs after each scheduling decision.
///
/// Only the first registration takes effect.
pub fn set_end_of_interrupt(eoi: fn()) {
    if END_OF_INTERRUPT.set(eoi).is_err() {
        log::warn!("End-of-interrupt routine already registered");
    }
}

#[unsafe(naked)]
pub extern "C" fn preempt_trampoline() {
    core::arch::naked_asm!(
        "cld",
        // Snapshot; must mirror `SavedRegisters` (r15 ends up lowest).
        "push rax","push rbx","push rcx","push rdx","push rsi","push rdi","push rbp",
        "push r8","push r9","push r10","push r11","push r12","push r13","push r14","push r15",

        // The snapshot address is the interrupted thread's stack pointer.
        "mov rdi, rsp",

        // SysV call alignment. The old RSP is already in RDI and the stack
        // is replaced below, so nothing needs undoing.
        "and rsp, -16",
        "call {preempt}",

        // Switch to the context the scheduler picked.
        "mov rsp, rax",

        "pop r15","pop r14","pop r13","pop r12","pop r11","pop r10","pop r9","pop r8",
        "pop rbp","pop rdi","pop rsi","pop rdx","pop rcx","pop rbx","pop rax",
        "iretq",

        preempt = sym preempt,
    )
}

// `VirtualAddress` is `repr(transparent)` over `u64`: RDI in, RAX out.
extern "C" fn preempt(stack_pointer: VirtualAddress) -> VirtualAddress {
    let next = global::schedule(stack_pointer);
    if let Some(eoi) = END_OF_INTERRUPT.get() {
        eoi();
    }
    next
}
