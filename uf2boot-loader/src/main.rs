// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! UF2 bootloader for RP2040.
//!
//! Boots the application at 0x10010000 unless GP2 is held low, the
//! application asked for update mode, or no valid image is present. In
//! update mode the host talks to the loader over USB CDC: it can stream
//! UF2 sectors, or read, write, erase and execute memory directly.

#![no_std]
#![no_main]

mod boot;
mod flash;
mod layout;
mod peripherals;
mod platform;
mod update;
mod usb_transport;
mod watchdog;

use defmt_rtt as _;
use embedded_hal::digital::InputPin;
use panic_probe as _;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

#[entry]
fn main() -> ! {
    defmt::println!("Bootloader init");

    let mut p = peripherals::init();

    peripherals::blink(&mut p.led_pin, &mut p.timer, 3, 200);
    flash::init();

    let gp2_low = p.gp2.is_low().unwrap_or(false);
    if !boot::check_update_trigger(gp2_low) {
        boot::try_boot_app();
        defmt::println!("Falling back to update mode");
    }

    update::enter_update_mode(&mut p)
}
