// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! UF2 transfer tracking.
//!
//! One upload is tracked at a time. A block whose `num_blocks` differs from
//! the tracked value starts a new transfer; garbage resets to idle. Block
//! completion is counted on the 0->1 transition of the block's bit, so a
//! retransmitted block is rewritten but never counted twice.
//!
//! All methods here run under the engine's critical section: `accept` from
//! the USB interrupt, `complete` from the worker's completion callback.

use critical_section::CriticalSection;
use serde::{Deserialize, Serialize};

use crate::bitset::{test_bit, BitSet};
use crate::engine::{Config, Engine};
use crate::memory::{
    find_region_of, RegionKind, FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, XIP_SRAM_SIZE,
};
use crate::platform::{Platform, RebootRequest};
use crate::task::{EraseRange, Status, Task, TaskSource};
use crate::uf2::Uf2Block;

/// Largest RAM image, in 256-byte blocks (all of SRAM plus XIP SRAM).
pub const MAX_RAM_UF2_BLOCKS: u32 = 1280;
pub const RAM_VALID_BLOCK_WORDS: usize = MAX_RAM_UF2_BLOCKS.div_ceil(32) as usize;

/// Bytes available for the flash-target bitsets (the XIP cache used as RAM).
pub const FLASH_BITMAPS_SIZE: u32 = XIP_SRAM_SIZE;
/// Split the bitmap budget between one bit per page and one bit per sector.
pub const FLASH_MAX_VALID_BLOCKS: u32 = ((FLASH_BITMAPS_SIZE as u64 * 8 * FLASH_SECTOR_SIZE as u64
    / (FLASH_PAGE_SIZE + FLASH_SECTOR_SIZE) as u64) as u32)
    & !31;
pub const FLASH_MAX_CLEARED_PAGES: u32 =
    FLASH_MAX_VALID_BLOCKS * FLASH_PAGE_SIZE / FLASH_SECTOR_SIZE;
pub const FLASH_VALID_BLOCK_WORDS: usize = (FLASH_MAX_VALID_BLOCKS / 32) as usize;
pub const FLASH_CLEARED_PAGE_WORDS: usize = FLASH_MAX_CLEARED_PAGES.div_ceil(32) as usize;

const _: () = assert!(MAX_RAM_UF2_BLOCKS >= (crate::memory::SRAM_SIZE + XIP_SRAM_SIZE) / 256);
const _: () = assert!(
    (FLASH_VALID_BLOCK_WORDS + FLASH_CLEARED_PAGE_WORDS) * 4 <= FLASH_BITMAPS_SIZE as usize
);

/// Backing words for the transfer bitsets.
pub struct Uf2Storage<'a> {
    pub ram_valid_blocks: &'a mut [u32],
    pub flash_valid_blocks: &'a mut [u32],
    pub flash_cleared_pages: &'a mut [u32],
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferState {
    Idle,
    Active,
    /// Every block written; a reboot has been requested.
    Complete,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferStatus {
    pub state: TransferState,
    pub valid_block_count: u32,
    pub num_blocks: u32,
    pub is_ram: bool,
}

pub struct Uf2Transfer<'a> {
    storage: Uf2Storage<'a>,
    /// 0 while no transfer is active.
    num_blocks: u32,
    valid_block_count: u32,
    lowest_addr: u32,
    is_ram: bool,
    block_no: u32,
    token: u32,
}

impl<'a> Uf2Transfer<'a> {
    pub fn new(storage: Uf2Storage<'a>) -> Self {
        Self {
            storage,
            num_blocks: 0,
            valid_block_count: 0,
            lowest_addr: u32::MAX,
            is_ram: false,
            block_no: 0,
            token: 0,
        }
    }

    pub fn reset(&mut self) {
        self.num_blocks = 0;
    }

    pub fn status(&self) -> TransferStatus {
        let state = if self.num_blocks == 0 {
            TransferState::Idle
        } else if self.valid_block_count == self.num_blocks {
            TransferState::Complete
        } else {
            TransferState::Active
        };
        TransferStatus {
            state,
            valid_block_count: self.valid_block_count,
            num_blocks: self.num_blocks,
            is_ram: self.is_ram,
        }
    }

    pub fn lowest_addr(&self) -> u32 {
        self.lowest_addr
    }

    /// Whether `block_no` has been confirmed written in this transfer.
    pub fn is_block_valid(&self, block_no: u32) -> bool {
        let words: &[u32] = if self.is_ram {
            &*self.storage.ram_valid_blocks
        } else {
            &*self.storage.flash_valid_blocks
        };
        test_bit(words, block_no)
    }

    fn valid_blocks(&mut self) -> BitSet<'_> {
        if self.is_ram {
            BitSet::new(self.storage.ram_valid_blocks)
        } else {
            BitSet::new(self.storage.flash_valid_blocks)
        }
    }

    fn cleared_pages(&mut self) -> BitSet<'_> {
        BitSet::new(self.storage.flash_cleared_pages)
    }

    /// Start tracking a transfer of `num_blocks`. Leaves the transfer idle
    /// and returns false if the image does not fit the bitsets.
    fn start(&mut self, is_ram: bool, num_blocks: u32) -> bool {
        self.num_blocks = 0;
        self.valid_block_count = 0;
        self.lowest_addr = u32::MAX;
        self.block_no = 0;
        self.token = 0;
        self.is_ram = is_ram;

        let mut valid = self.valid_blocks();
        valid.clear();
        let capacity = valid.capacity();
        self.cleared_pages().clear();
        debug!(
            "  ram {}, so valid_blocks (max {}) for {}K",
            is_ram,
            capacity,
            capacity / 4
        );

        if num_blocks > capacity {
            debug!("Oops image requires {} blocks and won't fit", num_blocks);
            return false;
        }
        warn!("New UF2 transfer");
        self.num_blocks = num_blocks;
        true
    }

    /// Validate a block and build the write task for it.
    ///
    /// Returns `None` when the block is dropped; the transfer is reset to
    /// idle for garbage and left untouched for out-of-range blocks.
    pub fn accept(
        &mut self,
        block: &Uf2Block,
        token: u32,
        config: &Config<'_>,
        disk_disabled: bool,
    ) -> Option<Task> {
        let h = block.header();
        let ram = find_region_of(config.regions, RegionKind::Ram, h.target_addr, FLASH_PAGE_SIZE);
        let flash =
            find_region_of(config.regions, RegionKind::Flash, h.target_addr, FLASH_PAGE_SIZE);
        let misaligned = flash.is_some() && h.target_addr % FLASH_PAGE_SIZE != 0;

        if h.num_blocks == 0 || (ram.is_none() && flash.is_none()) || misaligned {
            debug!("Resetting active UF2 transfer because received garbage");
            self.reset();
            return None;
        }
        if disk_disabled {
            debug!("Resetting active UF2 transfer because virtual disk is disabled");
            self.reset();
            return None;
        }

        let is_ram = ram.is_some();
        if self.num_blocks != h.num_blocks {
            debug!(
                "Resetting active UF2 transfer because have new binary size {}->{}",
                self.num_blocks,
                h.num_blocks
            );
            if !self.start(is_ram, h.num_blocks) {
                return None;
            }
        }

        if is_ram != self.is_ram {
            debug!(
                "Ignoring write to out of range address 0x{:08x}->0x{:08x}",
                h.target_addr,
                h.target_addr.wrapping_add(h.payload_size)
            );
            return None;
        }
        if h.block_no >= h.num_blocks {
            debug!(
                "Ignoring write to out of range block {} >= {}",
                h.block_no,
                h.num_blocks
            );
            return None;
        }

        let mut task = Task::write(TaskSource::VirtualDisk, token, h.target_addr, block.payload())
            .ok()?;
        if let Some(region) = flash {
            task = task.with_exit_xip();
            let sector = region.offset_of(h.target_addr) / FLASH_SECTOR_SIZE;
            let cleared = self.cleared_pages();
            if sector >= cleared.capacity() {
                debug!("Ignoring write beyond tracked flash sectors ({})", sector);
                return None;
            }
            if !cleared.contains(sector) {
                task = task.with_erase(EraseRange {
                    addr: region.base + sector * FLASH_SECTOR_SIZE,
                    len: FLASH_SECTOR_SIZE,
                });
            }
        }

        self.block_no = h.block_no;
        self.token = token;
        Some(task)
    }

    /// Record a finished write. Returns the reboot to schedule when this
    /// completion finished the image.
    pub fn complete(&mut self, task: &Task, config: &Config<'_>) -> Option<RebootRequest> {
        if self.num_blocks == 0 || task.token != self.token || task.result != Some(Status::Ok) {
            return None;
        }

        if let Some(erase) = task.erase {
            if let Some(region) =
                find_region_of(config.regions, RegionKind::Flash, erase.addr, erase.len)
            {
                let sector = region.offset_of(erase.addr) / FLASH_SECTOR_SIZE;
                self.cleared_pages().insert(sector);
            }
        }

        let block_no = self.block_no;
        if !self.valid_blocks().insert(block_no) {
            trace!("block {} already written", block_no);
            return None;
        }
        self.valid_block_count += 1;
        self.lowest_addr = self.lowest_addr.min(task.transfer_addr);
        trace!(
            "block {} done, {}/{}",
            block_no,
            self.valid_block_count,
            self.num_blocks
        );

        if self.valid_block_count != self.num_blocks {
            return None;
        }
        Some(if self.is_ram {
            RebootRequest {
                pc: self.lowest_addr,
                sp: config.ram_image_sp,
                delay_ms: config.reboot_delay_ms,
            }
        } else {
            RebootRequest {
                pc: 0,
                sp: 0,
                delay_ms: config.reboot_delay_ms,
            }
        })
    }
}

/// Completion callback for virtual-disk writes.
pub(crate) fn write_complete(
    cs: CriticalSection<'_>,
    engine: &Engine<'_>,
    task: &Task,
    platform: &mut dyn Platform,
) {
    let finished = engine.transfer(cs).complete(task, engine.config());
    if let Some(request) = finished {
        warn!("UF2 image complete, rebooting to 0x{:08x}", request.pc);
        engine.schedule_reboot(platform, request);
    }
    platform.async_complete(task);
}
