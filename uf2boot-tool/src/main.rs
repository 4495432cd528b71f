// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Host tool for the RP2040 UF2 bootloader via USB CDC.
//!
//! Usage:
//!   uf2boot pack firmware.bin firmware.uf2 --base 0x10010000
//!   uf2boot --port /dev/ttyACM0 flash firmware.uf2
//!   uf2boot --port /dev/ttyACM0 status
//!   uf2boot --port /dev/ttyACM0 read 0x10010000 256 --output dump.bin
//!   uf2boot --port /dev/ttyACM0 reboot

mod cli;
mod commands;
mod pack;
mod transport;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
