// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! RP2040 implementation of the engine's hardware seam.
//!
//! Task completions are queued here by the worker and drained by the USB
//! interrupt, which is pended after every push.

use core::cell::RefCell;

use cortex_m::peripheral::NVIC;
use critical_section::Mutex;
use heapless::Deque;
use rp2040_hal::pac;
use uf2boot_common::control::completion_response;
use uf2boot_common::platform::{FlashOp, Platform, RebootRequest};
use uf2boot_common::protocol::Response;
use uf2boot_common::task::Task;

use crate::{flash, watchdog};

/// Two mailboxes, so at most two tasks finish between interrupt runs.
const COMPLETION_SLOTS: usize = 4;

static COMPLETIONS: Mutex<RefCell<Deque<Response, COMPLETION_SLOTS>>> =
    Mutex::new(RefCell::new(Deque::new()));

/// Next finished task to report to the host.
pub fn pop_completion() -> Option<Response> {
    critical_section::with(|cs| COMPLETIONS.borrow_ref_mut(cs).pop_front())
}

/// Load one byte. Goes through asm so address 0 (the ROM vector table) is
/// readable without forming a null pointer.
fn read_byte(addr: u32) -> u8 {
    let value: u32;
    unsafe {
        core::arch::asm!(
            "ldrb {value}, [{addr}]",
            addr = in(reg) addr,
            value = out(reg) value,
            options(readonly, nostack, preserves_flags)
        );
    }
    value as u8
}

pub struct Rp2040Platform;

impl Platform for Rp2040Platform {
    fn read_memory(&mut self, addr: u32, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = read_byte(addr.wrapping_add(i as u32));
        }
    }

    fn write_ram(&mut self, addr: u32, data: &[u8]) {
        unsafe { core::ptr::copy_nonoverlapping(data.as_ptr(), addr as *mut u8, data.len()) };
    }

    fn flash_update(&mut self, op: &FlashOp<'_>) {
        flash::update(op);
    }

    fn execute(&mut self, entry: u32) {
        defmt::println!("Calling 0x{:08x}", entry);
        let entry =
            unsafe { core::mem::transmute::<usize, extern "C" fn()>(entry as usize) };
        entry();
    }

    fn eject(&mut self) {
        // Update mode has no mass-storage interface; sectors arrive over CDC.
        defmt::println!("Eject requested");
    }

    fn schedule_reboot(&mut self, request: RebootRequest) {
        watchdog::schedule_reboot(request);
    }

    fn async_complete(&mut self, task: &Task) {
        let response = completion_response(task);
        let queued =
            critical_section::with(|cs| COMPLETIONS.borrow_ref_mut(cs).push_back(response).is_ok());
        if !queued {
            defmt::warn!("Completion queue full, dropping token {}", task.token);
        }
        NVIC::pend(pac::Interrupt::USBCTRL_IRQ);
    }
}
