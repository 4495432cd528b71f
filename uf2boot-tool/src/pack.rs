// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! UF2 file creation and inspection.

use anyhow::{bail, Result};
use uf2boot_common::uf2::{Uf2Block, Uf2Error, Uf2Header, UF2_BLOCK_SIZE, UF2_PAYLOAD_SIZE};

/// Split `image` into page-sized blocks loaded at `base`. The last block is
/// padded with 0xFF, the erased-flash value.
pub fn pack(image: &[u8], base: u32, family_id: u32) -> Result<Vec<u8>> {
    if image.is_empty() {
        bail!("Input image is empty");
    }
    if base % UF2_PAYLOAD_SIZE != 0 {
        bail!("Base address 0x{:08x} is not 256-byte aligned", base);
    }
    let end = base as u64 + image.len() as u64;
    if end > u32::MAX as u64 + 1 {
        bail!("Image does not fit above 0x{:08x}", base);
    }

    let page = UF2_PAYLOAD_SIZE as usize;
    let num_blocks = image.len().div_ceil(page) as u32;
    let mut out = Vec::with_capacity(num_blocks as usize * UF2_BLOCK_SIZE);

    for (block_no, chunk) in image.chunks(page).enumerate() {
        let mut payload = [0xFFu8; 256];
        payload[..chunk.len()].copy_from_slice(chunk);
        let block_no = block_no as u32;
        let addr = base + block_no * UF2_PAYLOAD_SIZE;
        let header = Uf2Header::new(addr, block_no, num_blocks, family_id);
        out.extend_from_slice(&header.to_bytes(&payload));
    }
    Ok(out)
}

/// Split a UF2 file into its 512-byte sectors.
pub fn sectors(uf2: &[u8]) -> Result<Vec<[u8; UF2_BLOCK_SIZE]>> {
    if uf2.is_empty() || uf2.len() % UF2_BLOCK_SIZE != 0 {
        bail!(
            "UF2 file size {} is not a non-zero multiple of {}",
            uf2.len(),
            UF2_BLOCK_SIZE
        );
    }
    Ok(uf2
        .chunks_exact(UF2_BLOCK_SIZE)
        .map(|chunk| {
            let mut sector = [0u8; UF2_BLOCK_SIZE];
            sector.copy_from_slice(chunk);
            sector
        })
        .collect())
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Sectors carrying valid UF2 magic.
    pub blocks: u32,
    /// Sectors without UF2 magic.
    pub other: u32,
    /// Blocks matching the requested family.
    pub matching: u32,
    pub num_blocks: Option<u32>,
    pub lowest_addr: Option<u32>,
    pub highest_end: Option<u32>,
}

/// Count blocks and the address range covered by those for `family_id`.
pub fn summarize(sectors: &[[u8; UF2_BLOCK_SIZE]], family_id: u32) -> Summary {
    let mut summary = Summary::default();
    for sector in sectors {
        match Uf2Block::parse_for(sector, family_id) {
            Ok(block) => {
                let h = block.header();
                summary.blocks += 1;
                summary.matching += 1;
                summary.num_blocks.get_or_insert(h.num_blocks);
                let end = h.target_addr.saturating_add(h.payload_size);
                summary.lowest_addr =
                    Some(summary.lowest_addr.map_or(h.target_addr, |a| a.min(h.target_addr)));
                summary.highest_end = Some(summary.highest_end.map_or(end, |e| e.max(end)));
            }
            Err(Uf2Error::Foreign) => summary.blocks += 1,
            Err(Uf2Error::NotUf2) => summary.other += 1,
        }
    }
    summary
}
