// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations for bootloader operations.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use crc::{Crc, CRC_32_ISO_HDLC};
use indicatif::{ProgressBar, ProgressStyle};

use uf2boot_common::ingest::TransferState;
use uf2boot_common::protocol::{Command, Response, MAX_TRANSFER_SIZE};
use uf2boot_common::task::{ExclusiveMode, Status};
use uf2boot_common::uf2::RP2040_FAMILY_ID;

use crate::pack;
use crate::transport::Transport;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);
const CHUNK_SIZE: usize = MAX_TRANSFER_SIZE;

fn progress_bar(total: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Fail unless `response` reports `Status::Ok` for a finished task.
fn expect_ok(response: &Response, what: &str) -> Result<()> {
    match response.completion() {
        Some((_, Status::Ok)) => Ok(()),
        Some((_, status)) => bail!("{} failed: {:?}", what, status),
        None => bail!("Unexpected response to {}: {:?}", what, response),
    }
}

/// Convert a raw binary into a UF2 file.
pub fn pack(input: &Path, output: &Path, base: u32, family_id: u32) -> Result<()> {
    let image = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let uf2 = pack::pack(&image, base, family_id)?;
    fs::write(output, &uf2).with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Packed {} ({} bytes) at 0x{:08x} into {} ({} blocks)",
        input.display(),
        image.len(),
        base,
        output.display(),
        uf2.len() / 512
    );
    Ok(())
}

/// Summarize a UF2 file.
pub fn info(file: &Path) -> Result<()> {
    let uf2 = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let sectors = pack::sectors(&uf2)?;
    let summary = pack::summarize(&sectors, RP2040_FAMILY_ID);

    println!("UF2 file: {}", file.display());
    println!("  Sectors:         {}", sectors.len());
    println!("  UF2 blocks:      {}", summary.blocks);
    println!("  RP2040 blocks:   {}", summary.matching);
    println!("  Other sectors:   {}", summary.other);
    if let Some(num_blocks) = summary.num_blocks {
        println!("  Declared blocks: {}", num_blocks);
    }
    if let (Some(lowest), Some(end)) = (summary.lowest_addr, summary.highest_end) {
        println!("  Address range:   0x{:08x}..0x{:08x}", lowest, end);
    }
    Ok(())
}

/// Get and display transfer status.
pub fn status(transport: &mut Transport) -> Result<()> {
    let response = transport.send_recv(&Command::GetStatus)?;

    match response {
        Response::Status {
            transfer,
            exclusive,
            rebooting,
        } => {
            println!("Bootloader Status:");
            println!("  Transfer:  {:?}", transfer.state);
            if transfer.state != TransferState::Idle {
                println!(
                    "  Blocks:    {}/{} ({})",
                    transfer.valid_block_count,
                    transfer.num_blocks,
                    if transfer.is_ram { "RAM" } else { "flash" }
                );
            }
            println!("  Exclusive: {:?}", exclusive);
            println!("  Rebooting: {}", rebooting);
        }
        other => bail!("Unexpected response: {:?}", other),
    }

    Ok(())
}

/// Stream a UF2 file as mass-storage sectors. The device reboots on its own
/// once the last block lands.
pub fn flash(transport: &mut Transport, file: &Path) -> Result<()> {
    let uf2 = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let sectors = pack::sectors(&uf2)?;
    let summary = pack::summarize(&sectors, RP2040_FAMILY_ID);
    if summary.matching == 0 {
        bail!("{} contains no RP2040 blocks", file.display());
    }

    println!(
        "UF2:    {} ({} sectors, {} RP2040 blocks)",
        file.display(),
        sectors.len(),
        summary.matching
    );
    println!();

    let pb = progress_bar(uf2.len() as u64)?;
    for (lba, sector) in sectors.iter().enumerate() {
        let command = Command::write_sector(lba as u32, sector)
            .context("Sector does not fit a WriteSector command")?;
        let response = transport.send_recv(&command)?;
        if let Err(e) = expect_ok(&response, &format!("Sector {}", lba)) {
            pb.abandon();
            return Err(e);
        }
        pb.inc(sector.len() as u64);
    }
    pb.finish_with_message("Transfer complete");
    println!();

    match transport.send_recv(&Command::GetStatus)? {
        Response::Status { transfer, .. } if transfer.state == TransferState::Complete => {
            println!("Image complete, device is rebooting.");
        }
        Response::Status { transfer, .. } => bail!(
            "Device reports {}/{} blocks written ({:?})",
            transfer.valid_block_count,
            transfer.num_blocks,
            transfer.state
        ),
        other => bail!("Unexpected response: {:?}", other),
    }

    Ok(())
}

/// Read device memory into a file, or hex-dump it.
pub fn read(transport: &mut Transport, addr: u32, len: u32, output: Option<&Path>) -> Result<()> {
    let mut data = Vec::with_capacity(len as usize);
    let pb = progress_bar(len as u64)?;

    while data.len() < len as usize {
        let chunk_addr = addr.wrapping_add(data.len() as u32);
        let chunk_len = (len as usize - data.len()).min(CHUNK_SIZE) as u32;
        let response = transport.send_recv(&Command::Read {
            addr: chunk_addr,
            len: chunk_len,
        })?;
        match response {
            Response::Data {
                status: Status::Ok,
                data: chunk,
                ..
            } if !chunk.is_empty() => data.extend_from_slice(&chunk),
            other => {
                pb.abandon();
                expect_ok(&other, &format!("Read at 0x{:08x}", chunk_addr))?;
                bail!("Unexpected response at 0x{:08x}: {:?}", chunk_addr, other);
            }
        }
        pb.set_position(data.len() as u64);
    }
    pb.finish_and_clear();

    match output {
        Some(path) => {
            fs::write(path, &data).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {} bytes to {}", data.len(), path.display());
        }
        None => {
            for (i, line) in data.chunks(16).enumerate() {
                println!(
                    "{:08x}: {:02x?}",
                    addr.wrapping_add((i * 16) as u32),
                    line
                );
            }
        }
    }
    println!("CRC32: 0x{:08x}", CRC32.checksum(&data));
    Ok(())
}

/// Write a file to device memory.
pub fn write(transport: &mut Transport, addr: u32, file: &Path) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    println!(
        "Writing {} ({} bytes, CRC32: 0x{:08x}) to 0x{:08x}",
        file.display(),
        data.len(),
        CRC32.checksum(&data),
        addr
    );

    let pb = progress_bar(data.len() as u64)?;
    let mut offset = 0u32;
    for chunk in data.chunks(CHUNK_SIZE) {
        let chunk_addr = addr.wrapping_add(offset);
        let command = Command::write(chunk_addr, chunk).context("Chunk exceeds transfer size")?;
        let response = transport.send_recv(&command)?;
        if let Err(e) = expect_ok(&response, &format!("Write at 0x{:08x}", chunk_addr)) {
            pb.abandon();
            return Err(e);
        }
        offset += chunk.len() as u32;
        pb.set_position(offset as u64);
    }
    pb.finish_with_message("Write complete");
    Ok(())
}

/// Erase a sector-aligned flash range.
pub fn erase(transport: &mut Transport, addr: u32, len: u32) -> Result<()> {
    print!("Erasing 0x{:08x}..0x{:08x}... ", addr, addr.wrapping_add(len));
    std::io::stdout().flush()?;

    let response = transport.send_recv(&Command::FlashErase { addr, len })?;
    expect_ok(&response, "Erase")?;
    println!("OK");
    Ok(())
}

/// Change exclusive access.
pub fn exclusive(transport: &mut Transport, mode: ExclusiveMode) -> Result<()> {
    let response = transport.send_recv(&Command::ExclusiveAccess { mode })?;
    expect_ok(&response, "ExclusiveAccess")?;
    println!("Access mode set to {:?}", mode);
    Ok(())
}

/// Call code on the device. Returns once the callee does.
pub fn exec(transport: &mut Transport, addr: u32) -> Result<()> {
    let response = transport.send_recv(&Command::Exec { addr })?;
    expect_ok(&response, "Exec")?;
    println!("Code at 0x{:08x} returned", addr);
    Ok(())
}

/// Reboot the device.
pub fn reboot(transport: &mut Transport, pc: u32, sp: u32, delay_ms: u32) -> Result<()> {
    print!("Rebooting device... ");
    std::io::stdout().flush()?;

    let response = transport.send_recv(&Command::Reboot { pc, sp, delay_ms })?;
    expect_ok(&response, "Reboot")?;
    println!("OK");
    Ok(())
}
