// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Task execution.
//!
//! Effects are applied in a fixed order:
//!
//! 1. rebooting check (nothing else happens once a reboot is latched)
//! 2. exclusive-access change
//! 3. execute
//! 4. interleave check for mutations
//! 5. address validation, then erase / program / RAM copy / read
//!
//! Every range is validated before the first byte moves, so a rejected
//! task leaves memory untouched.

use crate::engine::Engine;
use crate::memory::{
    find_region, find_region_of, MemoryRegion, RegionKind, FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE,
};
use crate::platform::{FlashOp, Platform};
use crate::task::{
    Direction, EraseRange, ExclusiveMode, Status, Task, TaskSource, TASK_DATA_SIZE,
};

/// Where a validated transfer goes.
#[derive(Clone, Copy)]
enum Target {
    None,
    Ram,
    Flash,
    Read,
}

pub struct Executor {
    /// Source of the last mutating task that was allowed to run.
    last_mutation_source: Option<TaskSource>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    pub const fn new() -> Self {
        Self {
            last_mutation_source: None,
        }
    }

    pub fn last_mutation_source(&self) -> Option<TaskSource> {
        self.last_mutation_source
    }

    /// Run every effect of `task`. Read data lands in `task.data`.
    pub fn execute<P: Platform + ?Sized>(
        &mut self,
        engine: &Engine<'_>,
        platform: &mut P,
        task: &mut Task,
    ) -> Status {
        match self.run(engine, platform, task) {
            Ok(()) => Status::Ok,
            Err(status) => {
                debug!("task {} failed: {:?}", task.token, status);
                status
            }
        }
    }

    fn run<P: Platform + ?Sized>(
        &mut self,
        engine: &Engine<'_>,
        platform: &mut P,
        task: &mut Task,
    ) -> Result<(), Status> {
        if engine.is_rebooting() {
            return Err(Status::Rebooting);
        }

        if let Some(mode) = task.exclusive {
            warn!("exclusive access {:?}", mode);
            engine.vd_queue().disable(mode);
            if mode == ExclusiveMode::ExclusiveAndEject {
                platform.eject();
            }
        }

        if task.execute {
            debug!("exec 0x{:08x}", task.transfer_addr);
            platform.execute(task.transfer_addr | 1);
        }

        if task.is_mutation() {
            self.check_interleave(task)?;
        }

        self.transfer(engine.config().regions, platform, task)
    }

    fn check_interleave(&mut self, task: &Task) -> Result<(), Status> {
        if task.check_interleave
            && self
                .last_mutation_source
                .is_some_and(|source| source != task.source)
        {
            warn!(
                "interleaved write from {:?} after {:?}",
                task.source, self.last_mutation_source
            );
            return Err(Status::InterleavedWrite);
        }
        self.last_mutation_source = Some(task.source);
        Ok(())
    }

    fn transfer<P: Platform + ?Sized>(
        &mut self,
        regions: &[MemoryRegion],
        platform: &mut P,
        task: &mut Task,
    ) -> Result<(), Status> {
        let erase = match task.erase {
            Some(range) => Some(validate_erase(regions, task.exit_xip, range)?),
            None => None,
        };

        let addr = task.transfer_addr;
        let len = task.data_length;
        if task.transfer.is_some() && len as usize > TASK_DATA_SIZE {
            return Err(Status::InvalidTransferLength);
        }
        let target = match task.transfer {
            None => Target::None,
            Some(Direction::Write) => {
                if find_region_of(regions, RegionKind::Ram, addr, len).is_some() {
                    Target::Ram
                } else if task.exit_xip
                    && find_region_of(regions, RegionKind::Flash, addr, len).is_some()
                {
                    if addr % FLASH_PAGE_SIZE != 0 || len % FLASH_PAGE_SIZE != 0 {
                        return Err(Status::BadAlignment);
                    }
                    Target::Flash
                } else {
                    return Err(Status::InvalidAddress);
                }
            }
            Some(Direction::Read) => {
                find_region(regions, addr, len).ok_or(Status::InvalidAddress)?;
                Target::Read
            }
        };

        let program = match target {
            Target::Flash => Some((addr, task.payload())),
            _ => None,
        };
        if erase.is_some() || program.is_some() {
            trace!("flash update erase {:?} program {}", erase, program.is_some());
            platform.flash_update(&FlashOp { erase, program });
        }

        match target {
            Target::Ram => platform.write_ram(addr, task.payload()),
            Target::Read => platform.read_memory(addr, &mut task.data[..len as usize]),
            Target::None | Target::Flash => {}
        }
        Ok(())
    }
}

fn validate_erase(
    regions: &[MemoryRegion],
    exit_xip: bool,
    range: EraseRange,
) -> Result<(u32, u32), Status> {
    if !exit_xip || find_region_of(regions, RegionKind::Flash, range.addr, range.len).is_none() {
        return Err(Status::InvalidAddress);
    }
    if range.len == 0 || range.addr % FLASH_SECTOR_SIZE != 0 || range.len % FLASH_SECTOR_SIZE != 0 {
        return Err(Status::BadAlignment);
    }
    Ok((range.addr, range.len))
}
