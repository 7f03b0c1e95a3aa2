//! A tiny simulated machine: heap-backed "physical" RAM at a chosen physical
//! base, plus a physical allocator that owns all of it.
//!
//! The RAM's physical addresses and the host addresses it is mapped at never
//! coincide, so anything that confuses the two reads the wrong memory.

#![allow(dead_code)]

use kernel_pmm::{
    PhysMapper, PhysicalAddress, PhysicalAllocator, Region, RegionAllocator, VirtualAddress,
};
use kernel_sched::Stack;
use kernel_sched::arch::x86_64::X86_64ThreadBuilder;
use kernel_sync::SpinLock;
use std::ptr;
use std::sync::Arc;

pub const PAGE: u64 = 4096;

#[repr(C, align(4096))]
struct Aligned4K([u8; 4096]);

pub struct FakeRam {
    base: *mut Aligned4K,
    frames: usize,
    phys_base: PhysicalAddress,
}

// SAFETY: the buffer is owned by `FakeRam`; tests coordinate access through
// the allocator, which hands every page to a single owner.
unsafe impl Send for FakeRam {}
unsafe impl Sync for FakeRam {}

impl FakeRam {
    /// `frames` pages of RAM, physically starting at `phys_base`.
    pub fn at(phys_base: PhysicalAddress, frames: usize) -> Self {
        let buffer: Box<[Aligned4K]> = (0..frames).map(|_| Aligned4K([0; 4096])).collect();
        Self {
            base: Box::into_raw(buffer).cast::<Aligned4K>(),
            frames,
            phys_base,
        }
    }

    fn len(&self) -> u64 {
        self.frames as u64 * PAGE
    }

    /// Host address of the first byte.
    pub fn start(&self) -> VirtualAddress {
        VirtualAddress::from_ptr(self.base.cast::<u8>().cast_const())
    }

    /// Whether `va` lies inside the buffer.
    pub fn contains(&self, va: VirtualAddress) -> bool {
        va >= self.start() && va.as_u64() < self.start().as_u64() + self.len()
    }

    pub fn read_u64(&self, va: VirtualAddress) -> u64 {
        assert!(
            self.contains(va) && self.contains(va + 7),
            "{va} is outside the fake RAM"
        );
        // SAFETY: in bounds, checked above.
        unsafe { ptr::read_unaligned(va.as_mut_ptr::<u64>()) }
    }

    /// `count` consecutive quadwords starting at `va`.
    pub fn read_u64s(&self, va: VirtualAddress, count: u64) -> Vec<u64> {
        (0..count).map(|i| self.read_u64(va + i * 8)).collect()
    }
}

// SAFETY: every physical address in `phys_base..=phys_base + len` maps into
// the owned buffer (one past the end for region tops).
unsafe impl PhysMapper for FakeRam {
    fn phys_to_virt(&self, pa: PhysicalAddress) -> VirtualAddress {
        let offset = pa.checked_sub(self.phys_base.as_u64());
        match offset {
            Some(offset) if offset.as_u64() <= self.len() => self.start() + offset.as_u64(),
            _ => panic!("{pa} is outside the fake RAM"),
        }
    }
}

impl Drop for FakeRam {
    fn drop(&mut self) {
        // SAFETY: `base` came from `Box::into_raw` of a slice of `frames` elements.
        unsafe {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                self.base,
                self.frames,
            )));
        }
    }
}

pub struct Machine {
    pub ram: Arc<FakeRam>,
    pub pmm: Arc<SpinLock<PhysicalAllocator>>,
}

impl Machine {
    /// A machine whose allocator owns every page of a `frames`-page RAM
    /// starting at physical address zero.
    pub fn with_frames(frames: u64) -> Self {
        Self::at(0, frames)
    }

    /// Like [`with_frames`](Self::with_frames), with RAM starting at `base_page`.
    pub fn at(base_page: u64, frames: u64) -> Self {
        let region = Region::from_page(base_page, frames);
        let ram = Arc::new(FakeRam::at(
            region.base_address(),
            usize::try_from(frames).unwrap(),
        ));

        let mut pmm = PhysicalAllocator::new(Region::empty());
        pmm.free_region(region);

        Self {
            ram,
            pmm: Arc::new(SpinLock::new(pmm)),
        }
    }

    pub fn allocator(&self) -> Arc<dyn RegionAllocator> {
        self.pmm.clone()
    }

    pub fn mapper(&self) -> Arc<dyn PhysMapper> {
        self.ram.clone()
    }

    pub fn builder(&self) -> Arc<X86_64ThreadBuilder> {
        Arc::new(X86_64ThreadBuilder::new(self.allocator(), self.mapper()))
    }

    /// A stack of `pages` pages mapped through this machine's RAM.
    pub fn stack(&self, pages: u64) -> Stack {
        Stack::new(self.allocator(), self.ram.as_ref(), pages)
    }

    pub fn available_pages(&self) -> u64 {
        self.pmm.lock_irq().available_pages()
    }
}

pub extern "C" fn spin_forever() -> ! {
    loop {
        std::hint::spin_loop();
    }
}

pub extern "C" fn other_entry() -> ! {
    loop {
        std::thread::yield_now();
    }
}
