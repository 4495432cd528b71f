// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use uf2boot_common::task::ExclusiveMode;
use uf2boot_common::uf2::RP2040_FAMILY_ID;

use crate::commands;
use crate::transport::Transport;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "uf2boot")]
#[command(about = "Host tool for the RP2040 UF2 bootloader")]
pub struct Cli {
    /// Serial port (e.g., /dev/ttyACM0); required for device commands
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Convert a raw binary into a UF2 file
    Pack {
        /// Raw binary input
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// UF2 output
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Load address of the first byte
        #[arg(short, long, value_parser = parse_u32, default_value = "0x10010000")]
        base: u32,

        /// UF2 family ID
        #[arg(short, long, value_parser = parse_u32, default_value_t = RP2040_FAMILY_ID)]
        family: u32,
    },

    /// Summarize a UF2 file
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Get transfer and access status
    Status,

    /// Stream a UF2 file to the device sector by sector
    Flash {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Read device memory
    Read {
        #[arg(value_parser = parse_u32)]
        addr: u32,

        #[arg(value_parser = parse_u32)]
        len: u32,

        /// Write the bytes here instead of printing a hex dump
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a file to device RAM or flash
    Write {
        #[arg(value_parser = parse_u32)]
        addr: u32,

        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Erase a sector-aligned flash range
    Erase {
        #[arg(value_parser = parse_u32)]
        addr: u32,

        #[arg(value_parser = parse_u32)]
        len: u32,
    },

    /// Change exclusive access to the device
    Exclusive {
        #[arg(value_enum)]
        mode: ModeArg,
    },

    /// Call code at an address on the device
    Exec {
        #[arg(value_parser = parse_u32)]
        addr: u32,
    },

    /// Reboot the device
    Reboot {
        /// Entry point for a RAM image; 0 boots flash normally
        #[arg(long, value_parser = parse_u32, default_value = "0")]
        pc: u32,

        /// Initial stack pointer when --pc is set
        #[arg(long, value_parser = parse_u32, default_value = "0x20042000")]
        sp: u32,

        #[arg(long, default_value = "100")]
        delay_ms: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Shared,
    Exclusive,
    Eject,
}

impl From<ModeArg> for ExclusiveMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Shared => ExclusiveMode::Shared,
            ModeArg::Exclusive => ExclusiveMode::Exclusive,
            ModeArg::Eject => ExclusiveMode::ExclusiveAndEject,
        }
    }
}

/// Parse decimal or `0x`-prefixed hexadecimal.
fn parse_u32(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", s, e))
}

fn open(port: Option<&str>) -> Result<Transport> {
    let port = port.context("--port is required for this command")?;
    Transport::new(port)
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let port = cli.port.as_deref();

    match cli.command {
        Commands::Pack {
            input,
            output,
            base,
            family,
        } => commands::pack(&input, &output, base, family),
        Commands::Info { file } => commands::info(&file),
        Commands::Status => commands::status(&mut open(port)?),
        Commands::Flash { file } => commands::flash(&mut open(port)?, &file),
        Commands::Read { addr, len, output } => {
            commands::read(&mut open(port)?, addr, len, output.as_deref())
        }
        Commands::Write { addr, file } => commands::write(&mut open(port)?, addr, &file),
        Commands::Erase { addr, len } => commands::erase(&mut open(port)?, addr, len),
        Commands::Exclusive { mode } => commands::exclusive(&mut open(port)?, mode.into()),
        Commands::Exec { addr } => commands::exec(&mut open(port)?, addr),
        Commands::Reboot { pc, sp, delay_ms } => {
            commands::reboot(&mut open(port)?, pc, sp, delay_ms)
        }
    }
}
