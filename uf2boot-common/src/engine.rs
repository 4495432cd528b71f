// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Shared state between the USB interrupt and the worker.

use core::cell::{RefCell, RefMut};
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::{CriticalSection, Mutex};

use crate::disk::SECTOR_SIZE;
use crate::ingest::{write_complete, TransferStatus, Uf2Storage, Uf2Transfer};
use crate::mailbox::Mailbox;
use crate::memory::{MemoryRegion, RP2040_REGIONS, SRAM_END};
use crate::platform::{Platform, RebootRequest};
use crate::uf2::{Uf2Block, Uf2Error, RP2040_FAMILY_ID};

/// Delay between the last block of an image landing and the watchdog reboot.
pub const REBOOT_DELAY_MS: u32 = 1000;

#[derive(Clone, Copy, Debug)]
pub struct Config<'a> {
    /// UF2 family accepted over the virtual disk.
    pub family_id: u32,
    pub regions: &'a [MemoryRegion],
    pub reboot_delay_ms: u32,
    /// Stack pointer handed to a RAM image on reboot.
    pub ram_image_sp: u32,
}

impl Config<'static> {
    pub const fn rp2040() -> Self {
        Self {
            family_id: RP2040_FAMILY_ID,
            regions: &RP2040_REGIONS,
            reboot_delay_ms: REBOOT_DELAY_MS,
            ram_image_sp: SRAM_END,
        }
    }
}

pub struct Engine<'a> {
    config: Config<'a>,
    vd_queue: Mailbox,
    control_queue: Mailbox,
    uf2: Mutex<RefCell<Uf2Transfer<'a>>>,
    rebooting: AtomicBool,
}

impl<'a> Engine<'a> {
    pub fn new(config: Config<'a>, storage: Uf2Storage<'a>) -> Self {
        Self {
            config,
            vd_queue: Mailbox::new("virtual disk"),
            control_queue: Mailbox::new("control"),
            uf2: Mutex::new(RefCell::new(Uf2Transfer::new(storage))),
            rebooting: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config<'a> {
        &self.config
    }

    pub fn vd_queue(&self) -> &Mailbox {
        &self.vd_queue
    }

    pub fn control_queue(&self) -> &Mailbox {
        &self.control_queue
    }

    pub fn transfer<'cs>(&'cs self, cs: CriticalSection<'cs>) -> RefMut<'cs, Uf2Transfer<'a>> {
        self.uf2.borrow_ref_mut(cs)
    }

    pub fn transfer_status(&self) -> TransferStatus {
        critical_section::with(|cs| self.uf2.borrow_ref(cs).status())
    }

    /// Handle a sector write from the mass-storage host.
    ///
    /// Returns true if a task was queued and completion will be reported
    /// through the platform's `async_complete`; false if the write was
    /// absorbed without effect.
    pub fn vd_write_block(&self, token: u32, lba: u32, buf: &[u8; SECTOR_SIZE]) -> bool {
        let block = match Uf2Block::parse_for(buf, self.config.family_id) {
            Ok(block) => block,
            Err(Uf2Error::NotUf2) => {
                trace!("lba {}: not a UF2 block", lba);
                return false;
            }
            Err(Uf2Error::Foreign) => {
                debug!("lba {}: ignoring UF2 block for another target", lba);
                return false;
            }
        };

        let disk_disabled = self.vd_queue.is_disabled();
        let task = critical_section::with(|cs| {
            self.transfer(cs)
                .accept(block, token, &self.config, disk_disabled)
        });
        match task {
            Some(task) => {
                self.vd_queue.enqueue(task.with_callback(write_complete));
                true
            }
            None => false,
        }
    }

    /// Mass-storage bus reset: forget the current transfer.
    pub fn vd_reset(&self) {
        critical_section::with(|cs| self.transfer(cs).reset());
    }

    pub fn is_rebooting(&self) -> bool {
        self.rebooting.load(Ordering::Acquire)
    }

    /// Latch the rebooting flag; every task executed from now on fails.
    pub fn latch_reboot(&self) {
        self.rebooting.store(true, Ordering::Release);
    }

    pub fn schedule_reboot(&self, platform: &mut dyn Platform, request: RebootRequest) {
        self.latch_reboot();
        platform.schedule_reboot(request);
    }
}
