use bootloader_api::info::MemoryRegionKind;
use bootloader_api::BootInfo;
use linked_list_allocator::LockedHeap;

use lessonos::config::BOOT_CONFIG;

use crate::println;

// Static heap buffer embedded in the kernel binary. PCB stacks, names and
// the scheduler's queues all live here.
const HEAP_SIZE: usize = BOOT_CONFIG.heap_size;
#[repr(align(4096))]
struct HeapBuffer([u8; HEAP_SIZE]);
static mut HEAP_BUFFER: HeapBuffer = HeapBuffer([0; HEAP_SIZE]);

#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Hands the static buffer to the allocator. Must run exactly once, before
/// anything allocates.
pub fn init_heap(boot_info: &BootInfo) -> Result<(), &'static str> {
    let mut heap = ALLOCATOR.lock();
    if heap.size() != 0 {
        return Err("heap already initialized");
    }

    // SAFETY: the buffer is only ever touched through the allocator, and
    // the check above keeps it from being handed out twice.
    let heap_start = unsafe { core::ptr::addr_of_mut!(HEAP_BUFFER.0) as *mut u8 };
    unsafe { heap.init(heap_start, HEAP_SIZE) };

    println!(
        "Heap: {:#x} - {:#x} ({} KB)",
        heap_start as usize,
        heap_start as usize + HEAP_SIZE,
        HEAP_SIZE / 1024
    );
    drop(heap);

    memory_stats(boot_info);
    Ok(())
}

fn memory_stats(boot_info: &BootInfo) {
    let mut total_usable = 0u64;
    let mut total_reserved = 0u64;

    for region in boot_info.memory_regions.iter() {
        let size = region.end - region.start;
        match region.kind {
            MemoryRegionKind::Usable => total_usable += size,
            _ => total_reserved += size,
        }
    }

    println!("Total Usable:   {} MB", total_usable / (1024 * 1024));
    println!("Total Reserved: {} MB", total_reserved / (1024 * 1024));
}
