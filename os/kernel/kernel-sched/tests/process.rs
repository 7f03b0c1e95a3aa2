mod common;

use common::{Machine, other_entry, spin_forever};
use kernel_info::cpu::{INITIAL_RFLAGS, KERNEL_CS, KERNEL_DS, USER_CS, USER_DS};
use kernel_info::memory::THREAD_STACK_PAGES;
use kernel_pmm::PhysMapper;
use kernel_sched::arch::x86_64::INITIAL_CONTEXT_SIZE;
use kernel_sched::{Process, Promotion, ThreadEntry};
use std::sync::Arc;

#[test]
fn processes_get_distinct_ids() {
    let machine = Machine::with_frames(16);
    let a = Process::new(None, Promotion::Supervisor, machine.builder());
    let b = Process::new(None, Promotion::Supervisor, machine.builder());

    assert_ne!(a.id(), b.id());
    assert_eq!(a.to_string(), format!("Process({})", a.id().as_u64()));
}

#[test]
fn children_refer_to_their_parent_without_owning_it() {
    let machine = Machine::with_frames(16);
    let root = Process::new(None, Promotion::Supervisor, machine.builder());
    let child = root.spawn_child(Promotion::User);

    assert!(root.parent().is_none());
    assert_eq!(child.promotion(), Promotion::User);
    assert!(Arc::ptr_eq(&child.parent().unwrap(), &root));

    drop(root);
    assert!(child.parent().is_none());
}

#[test]
fn created_threads_are_attached_to_the_process() {
    let machine = Machine::with_frames(64);
    let process = Process::new(None, Promotion::Supervisor, machine.builder());

    let t1 = process.create_thread(spin_forever);
    let t2 = process.create_thread(other_entry);

    assert_eq!(process.thread_count(), 2);
    assert_ne!(t1.id(), t2.id());
    assert_eq!(t1.process(), process.id());
    assert_eq!(t1.promotion(), Promotion::Supervisor);

    let ids: Vec<_> = process.threads().iter().map(|t| t.id()).collect();
    assert_eq!(ids, [t1.id(), t2.id()]);
    assert_eq!(t1.to_string(), format!("Thread({})", t1.id().as_u64()));
}

#[test]
fn each_thread_owns_a_stack() {
    let machine = Machine::with_frames(64);
    let process = Process::new(None, Promotion::Supervisor, machine.builder());

    let t1 = process.create_thread(spin_forever);
    let t2 = process.create_thread(spin_forever);

    assert_eq!(t1.stack().region().page_count(), THREAD_STACK_PAGES);
    assert!(!t1.stack().region().is_overlapping_with(t2.stack().region()));
    assert_eq!(machine.available_pages(), 64 - 2 * THREAD_STACK_PAGES);
}

#[test]
fn supervisor_thread_starts_with_an_interrupt_context() {
    let machine = Machine::with_frames(64);
    let process = Process::new(None, Promotion::Supervisor, machine.builder());
    let thread = process.create_thread(spin_forever);

    let stack = thread.stack();
    let sp = stack.pointer();
    assert_eq!(sp, stack.top() - INITIAL_CONTEXT_SIZE);

    // r15 .. rax, all zero.
    assert_eq!(machine.ram.read_u64s(sp, 15), [0; 15]);

    let entry: ThreadEntry = spin_forever;
    let frame = machine.ram.read_u64s(sp + 15 * 8, 5);
    assert_eq!(
        frame,
        [
            entry as usize as u64,
            u64::from(KERNEL_CS),
            INITIAL_RFLAGS,
            stack.top().as_u64(),
            u64::from(KERNEL_DS),
        ]
    );
}

#[test]
fn context_lives_at_the_mapped_address_of_high_memory() {
    // RAM at 4 GiB, mapped somewhere else entirely.
    let machine = Machine::at(0x10_0000, 64);
    let process = Process::new(None, Promotion::Supervisor, machine.builder());
    let thread = process.create_thread(spin_forever);

    let stack = thread.stack();
    let physical_top = stack.region().end_address();
    assert!(physical_top.as_u64() > 1 << 32);
    assert_eq!(stack.top(), machine.ram.phys_to_virt(physical_top));

    let sp = stack.pointer();
    assert_eq!(sp, stack.top() - INITIAL_CONTEXT_SIZE);
    assert!(machine.ram.contains(sp));
    let physical = stack.region().base_address().as_u64()..physical_top.as_u64();
    assert!(!physical.contains(&sp.as_u64()));

    // The frame's rsp is what iretq loads, so it must be the mapped top too.
    let frame = machine.ram.read_u64s(sp + 15 * 8, 5);
    assert_eq!(frame[3], stack.top().as_u64());
    assert_ne!(frame[3], physical_top.as_u64());
}

#[test]
fn user_thread_uses_user_selectors() {
    let machine = Machine::with_frames(64);
    let process = Process::new(None, Promotion::User, machine.builder());
    let thread = process.create_thread(other_entry);

    let frame = machine.ram.read_u64s(thread.stack().pointer() + 15 * 8, 5);
    assert_eq!(frame[1], u64::from(USER_CS));
    assert_eq!(frame[4], u64::from(USER_DS));
    assert_eq!(thread.promotion(), Promotion::User);
}

#[test]
fn detached_threads_release_their_stack_when_dropped() {
    let machine = Machine::with_frames(64);
    let process = Process::new(None, Promotion::Supervisor, machine.builder());

    let id = process.create_thread(spin_forever).id();
    assert_eq!(machine.available_pages(), 64 - THREAD_STACK_PAGES);

    let thread = process.detach_thread(id).unwrap();
    assert_eq!(process.thread_count(), 0);
    assert!(process.detach_thread(id).is_none());

    drop(thread);
    assert_eq!(machine.available_pages(), 64);
}

#[test]
fn dropping_a_process_releases_its_threads() {
    let machine = Machine::with_frames(64);
    let process = Process::new(None, Promotion::Supervisor, machine.builder());
    let _ = process.create_thread(spin_forever);
    let _ = process.create_thread(spin_forever);
    assert_eq!(machine.available_pages(), 64 - 2 * THREAD_STACK_PAGES);

    drop(process);
    assert_eq!(machine.available_pages(), 64);
}
