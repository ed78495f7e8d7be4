use core::arch::global_asm;

use spin::Lazy;
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame, PageFaultErrorCode};
use x86_64::VirtAddr;

use crate::interrupts::gdt;
use crate::interrupts::pic::{InterruptIndex, PICS};
use crate::kernel::state::KERNEL;
use crate::println;
use lessonos::Context;

// System request trampoline. Saves the caller's registers as a `Context`
// on top of the interrupt frame, lets the scheduler overwrite it with the
// registers of whoever runs next, and returns into that process.
global_asm!(
    r#"
.global syscall_trampoline
syscall_trampoline:
    push rax
    push rbx
    push rcx
    push rdx
    push rsi
    push rdi
    push rbp
    push r8
    push r9
    push r10
    push r11
    push r12
    push r13
    push r14
    push r15

    mov rdi, rsp
    call {entry}

    pop r15
    pop r14
    pop r13
    pop r12
    pop r11
    pop r10
    pop r9
    pop r8
    pop rbp
    pop rdi
    pop rsi
    pop rdx
    pop rcx
    pop rbx
    pop rax
    iretq
"#,
    entry = sym syscall_entry,
);

extern "C" {
    fn syscall_trampoline();
}

static IDT: Lazy<InterruptDescriptorTable> = Lazy::new(|| {
    let mut idt = InterruptDescriptorTable::new();

    // CPU EXCEPTIONS (0-31)
    idt.breakpoint.set_handler_fn(breakpoint_handler);
    idt.page_fault.set_handler_fn(page_fault_handler);
    idt.divide_error.set_handler_fn(divide_error_handler);
    idt.invalid_opcode.set_handler_fn(invalid_opcode_handler);
    idt.general_protection_fault.set_handler_fn(general_protection_fault_handler);
    unsafe {
        idt.double_fault
            .set_handler_fn(double_fault_handler)
            .set_stack_index(gdt::DOUBLE_FAULT_IST_INDEX);
    }

    // HARDWARE INTERRUPTS
    idt[InterruptIndex::Com1.as_u8()].set_handler_fn(com1_interrupt_handler);
    idt[InterruptIndex::Com2.as_u8()].set_handler_fn(com2_interrupt_handler);

    // SYSTEM REQUESTS
    unsafe {
        idt[InterruptIndex::Syscall.as_u8()]
            .set_handler_addr(VirtAddr::new(syscall_trampoline as usize as u64));
    }

    idt
});

pub fn init_idt() {
    IDT.load();
}

/// Called by the trampoline with interrupts off. `frame` is the caller's
/// saved registers and receives the registers to resume with.
extern "C" fn syscall_entry(frame: *mut Context) {
    // SAFETY: the trampoline passes its own stack pointer, which points at
    // 20 words laid out exactly as a `Context`.
    let frame = unsafe { &mut *frame };
    let next = KERNEL.lock().sys_call(frame);
    *frame = next;
}

extern "x86-interrupt" fn breakpoint_handler(stack_frame: InterruptStackFrame) {
    println!("EXCEPTION: BREAKPOINT\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn divide_error_handler(stack_frame: InterruptStackFrame) {
    panic!("EXCEPTION: DIVIDE BY ZERO\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn invalid_opcode_handler(stack_frame: InterruptStackFrame) {
    panic!("EXCEPTION: INVALID OPCODE\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn general_protection_fault_handler(stack_frame: InterruptStackFrame, error_code: u64) {
    panic!("EXCEPTION: GENERAL PROTECTION FAULT (error code: {})\n{:#?}", error_code, stack_frame);
}

extern "x86-interrupt" fn double_fault_handler(stack_frame: InterruptStackFrame, error_code: u64) -> ! {
    panic!("EXCEPTION: DOUBLE FAULT\n{stack_frame:#?}\n CODE{error_code}");
}

extern "x86-interrupt" fn page_fault_handler(stack_frame: InterruptStackFrame, error_code: PageFaultErrorCode) {
    use x86_64::registers::control::Cr2;

    println!("EXCEPTION: PAGE FAULT");
    println!("Accessed Address: {:?}", Cr2::read());
    println!("Error Code: {:?}", error_code);
    println!("{:#?}", stack_frame);

    panic!("Page fault!");
}

fn serial_interrupt(index: InterruptIndex) {
    KERNEL.lock().serial_interrupt(index.irq());
    unsafe {
        PICS.lock().notify_end_of_interrupt(index.as_u8());
    }
}

extern "x86-interrupt" fn com1_interrupt_handler(_stack_frame: InterruptStackFrame) {
    serial_interrupt(InterruptIndex::Com1);
}

extern "x86-interrupt" fn com2_interrupt_handler(_stack_frame: InterruptStackFrame) {
    serial_interrupt(InterruptIndex::Com2);
}
