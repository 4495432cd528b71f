// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot path: update trigger, application validation and jump.

use crate::{layout, watchdog};

struct VectorTable {
    initial_sp: u32,
    reset_vector: u32,
}

impl VectorTable {
    unsafe fn read_from(addr: u32) -> Self {
        Self {
            initial_sp: (addr as *const u32).read_volatile(),
            reset_vector: (addr as *const u32).offset(1).read_volatile(),
        }
    }

    /// Erased flash reads as 0xFFFFFFFF and fails both checks.
    fn is_valid_for_flash_execution(&self) -> bool {
        layout::is_sram(self.initial_sp)
            && self.initial_sp % 4 == 0
            && layout::is_app_flash(self.reset_vector)
            && self.reset_vector & 1 == 1
    }
}

/// Check if update mode is requested via GP2 pin (LOW) or the watchdog
/// scratch flag.
pub fn check_update_trigger(gp2_is_low: bool) -> bool {
    let requested = watchdog::take_update_request();
    gp2_is_low || requested
}

/// Jump to the application at [`layout::APP_BASE`] if it looks bootable.
/// Returns if it does not.
pub fn try_boot_app() {
    let vt = unsafe { VectorTable::read_from(layout::APP_BASE) };
    if !vt.is_valid_for_flash_execution() {
        defmt::println!(
            "No valid application at 0x{:08x} (sp=0x{:08x}, reset=0x{:08x})",
            layout::APP_BASE,
            vt.initial_sp,
            vt.reset_vector
        );
        return;
    }

    defmt::println!("Jumping to application at 0x{:08x}", vt.reset_vector);
    unsafe {
        // Reset peripherals before jumping so firmware SDK can reinitialize cleanly
        prepare_for_firmware_handoff();
        relocate_vector_table(layout::APP_BASE);
        jump_to_firmware(vt.initial_sp, vt.reset_vector);
    }
}

/// Prepare the system for firmware handoff.
/// Clocks are left configured - SDK's runtime_init_clocks handles this
/// by switching away from PLLs before reconfiguring them.
unsafe fn prepare_for_firmware_handoff() {
    // Disable all interrupts
    cortex_m::interrupt::disable();

    // Clear all pending interrupts in NVIC
    const NVIC_ICPR: *mut u32 = 0xE000_E280 as *mut u32;
    NVIC_ICPR.write_volatile(0xFFFF_FFFF);

    // Disable all NVIC interrupts
    const NVIC_ICER: *mut u32 = 0xE000_E180 as *mut u32;
    NVIC_ICER.write_volatile(0xFFFF_FFFF);
}

unsafe fn relocate_vector_table(base: u32) {
    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(base);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

unsafe fn jump_to_firmware(initial_sp: u32, reset_vector: u32) -> ! {
    core::arch::asm!(
        "msr msp, {sp}",
        "cpsie i",  // Re-enable interrupts before jumping (SDK expects PRIMASK=0)
        "bx {reset}",
        sp = in(reg) initial_sp,
        reset = in(reg) reset_vector,
        options(noreturn)
    );
}
