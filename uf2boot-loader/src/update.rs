// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Update mode.
//!
//! The USB interrupt owns the CDC transport: it decodes commands, hands
//! them to the control dispatcher and sends back replies and task
//! completions. Thread mode runs the worker, which executes queued tasks
//! and sleeps in `wfe` when both mailboxes are empty.

use core::ptr::addr_of_mut;

use cortex_m::peripheral::NVIC;
use embedded_hal::digital::OutputPin;
use rp2040_hal as hal;
use rp2040_hal::pac::{self, interrupt};
use uf2boot_common::control::{self, Outcome};
use uf2boot_common::ingest::{
    Uf2Storage, FLASH_CLEARED_PAGE_WORDS, FLASH_VALID_BLOCK_WORDS, RAM_VALID_BLOCK_WORDS,
};
use uf2boot_common::memory::XIP_SRAM_BASE;
use uf2boot_common::protocol::Response;
use uf2boot_common::{Engine, Status, Worker};
use usb_device::class_prelude::UsbBusAllocator;

use crate::peripherals::{self, Peripherals};
use crate::platform::{self, Rp2040Platform};
use crate::usb_transport::UsbTransport;
use crate::{flash, layout, watchdog};

static mut RAM_VALID_BLOCKS: [u32; RAM_VALID_BLOCK_WORDS] = [0; RAM_VALID_BLOCK_WORDS];
static mut ENGINE: Option<Engine<'static>> = None;
/// Written once before USBCTRL_IRQ is unmasked, then only touched by it.
static mut SERVICE: Option<UsbService> = None;

struct UsbService {
    engine: &'static Engine<'static>,
    transport: UsbTransport,
    next_token: u32,
}

impl UsbService {
    fn run(&mut self) {
        self.transport.poll();

        while let Some(command) = self.transport.try_receive() {
            let token = self.next_token;
            self.next_token = self.next_token.wrapping_add(1);

            match control::handle(self.engine, &command, token) {
                Outcome::Reply(response) => self.transport.send(&response),
                Outcome::Pending => {}
                Outcome::Reboot(request) => {
                    self.transport.send(&Response::Ack {
                        token,
                        status: Status::Ok,
                    });
                    watchdog::schedule_reboot(request);
                }
            }
        }

        while let Some(response) = platform::pop_completion() {
            self.transport.send(&response);
        }
    }
}

#[interrupt]
fn USBCTRL_IRQ() {
    // SAFETY: SERVICE is initialized before this interrupt is unmasked and
    // no other context touches it afterwards.
    if let Some(service) = unsafe { (*addr_of_mut!(SERVICE)).as_mut() } {
        service.run();
    }
}

/// Bitset storage: RAM targets in .bss, flash targets in the XIP cache SRAM.
///
/// # Safety
/// Call once, with the XIP cache disabled.
unsafe fn uf2_storage() -> Uf2Storage<'static> {
    let xip_sram = XIP_SRAM_BASE as *mut u32;
    Uf2Storage {
        ram_valid_blocks: &mut *addr_of_mut!(RAM_VALID_BLOCKS),
        flash_valid_blocks: core::slice::from_raw_parts_mut(xip_sram, FLASH_VALID_BLOCK_WORDS),
        flash_cleared_pages: core::slice::from_raw_parts_mut(
            xip_sram.add(FLASH_VALID_BLOCK_WORDS),
            FLASH_CLEARED_PAGE_WORDS,
        ),
    }
}

/// Enter update mode: bring up USB and run the worker. Leaves only through
/// a watchdog reboot.
pub fn enter_update_mode(p: &mut Peripherals) -> ! {
    defmt::println!("Update mode requested");

    peripherals::blink(&mut p.led_pin, &mut p.timer, 10, 50);

    flash::disable_xip_cache();
    let engine: &'static Engine<'static> = unsafe {
        (*addr_of_mut!(ENGINE)).insert(Engine::new(layout::config(), uf2_storage()))
    };

    let mut usb = p.usb.take().expect("USB peripherals already taken");
    let usb_bus = peripherals::store_usb_bus(UsbBusAllocator::new(hal::usb::UsbBus::new(
        usb.regs,
        usb.dpram,
        usb.clock,
        true,
        &mut usb.resets,
    )));

    unsafe {
        SERVICE = Some(UsbService {
            engine,
            transport: UsbTransport::new(usb_bus),
            next_token: 1,
        });
        NVIC::unmask(pac::Interrupt::USBCTRL_IRQ);
    }

    defmt::println!("USB CDC initialized, entering worker loop");
    p.led_pin.set_high().ok();

    let mut worker = Worker::new(engine, Rp2040Platform);
    worker.run(cortex_m::asm::wfe)
}
