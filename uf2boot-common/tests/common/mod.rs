// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Shared fixtures: a recording platform and UF2 sector builders.

#![allow(dead_code)]

use uf2boot_common::ingest::{
    Uf2Storage, FLASH_CLEARED_PAGE_WORDS, FLASH_VALID_BLOCK_WORDS, RAM_VALID_BLOCK_WORDS,
};
use uf2boot_common::platform::{FlashOp, Platform, RebootRequest};
use uf2boot_common::task::Task;
use uf2boot_common::uf2::{Uf2Header, RP2040_FAMILY_ID, UF2_BLOCK_SIZE};

/// Recorded flash mutation, with the programmed bytes copied out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlashRecord {
    pub erase: Option<(u32, u32)>,
    pub program: Option<(u32, Vec<u8>)>,
}

/// Platform that records every call. Reads return `addr as u8` patterns.
#[derive(Default)]
pub struct FakePlatform {
    pub ram_writes: Vec<(u32, Vec<u8>)>,
    pub flash: Vec<FlashRecord>,
    pub reads: Vec<(u32, usize)>,
    pub executed: Vec<u32>,
    pub ejects: usize,
    pub reboots: Vec<RebootRequest>,
    pub completed: Vec<Task>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether anything in memory was touched.
    pub fn memory_untouched(&self) -> bool {
        self.ram_writes.is_empty() && self.flash.is_empty()
    }
}

impl Platform for FakePlatform {
    fn read_memory(&mut self, addr: u32, buf: &mut [u8]) {
        self.reads.push((addr, buf.len()));
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = addr.wrapping_add(i as u32) as u8;
        }
    }

    fn write_ram(&mut self, addr: u32, data: &[u8]) {
        self.ram_writes.push((addr, data.to_vec()));
    }

    fn flash_update(&mut self, op: &FlashOp<'_>) {
        self.flash.push(FlashRecord {
            erase: op.erase,
            program: op.program.map(|(offset, data)| (offset, data.to_vec())),
        });
    }

    fn execute(&mut self, entry: u32) {
        self.executed.push(entry);
    }

    fn eject(&mut self) {
        self.ejects += 1;
    }

    fn schedule_reboot(&mut self, request: RebootRequest) {
        self.reboots.push(request);
    }

    fn async_complete(&mut self, task: &Task) {
        self.completed.push(*task);
    }
}

/// Owned bitset words for an engine under test.
pub struct Storage {
    ram_valid: Vec<u32>,
    flash_valid: Vec<u32>,
    flash_cleared: Vec<u32>,
}

impl Storage {
    /// Same capacities as the firmware.
    pub fn new() -> Self {
        Self::with_words(
            RAM_VALID_BLOCK_WORDS,
            FLASH_VALID_BLOCK_WORDS,
            FLASH_CLEARED_PAGE_WORDS,
        )
    }

    pub fn with_words(ram: usize, flash: usize, cleared: usize) -> Self {
        Self {
            ram_valid: vec![0; ram],
            flash_valid: vec![0; flash],
            flash_cleared: vec![0; cleared],
        }
    }

    pub fn uf2(&mut self) -> Uf2Storage<'_> {
        Uf2Storage {
            ram_valid_blocks: &mut self.ram_valid,
            flash_valid_blocks: &mut self.flash_valid,
            flash_cleared_pages: &mut self.flash_cleared,
        }
    }
}

/// 256-byte payload tagged with the block number.
pub fn payload(block_no: u32) -> Vec<u8> {
    (0..256).map(|i| (i as u32 ^ block_no) as u8).collect()
}

/// A valid RP2040 UF2 sector.
pub fn uf2_sector(target_addr: u32, block_no: u32, num_blocks: u32) -> [u8; UF2_BLOCK_SIZE] {
    Uf2Header::new(target_addr, block_no, num_blocks, RP2040_FAMILY_ID).to_bytes(&payload(block_no))
}

/// Sector for block `block_no` of a contiguous image starting at `base`.
pub fn image_sector(base: u32, block_no: u32, num_blocks: u32) -> [u8; UF2_BLOCK_SIZE] {
    uf2_sector(base + block_no * 256, block_no, num_blocks)
}
