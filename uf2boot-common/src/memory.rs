// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Address map and region descriptors.
//!
//! Every transfer the executor performs is checked against a table of
//! regions before any byte moves. A range is only accepted when one region
//! contains all of it; ranges that straddle two regions are rejected even
//! if both neighbours are individually valid.

// --- RP2040 address map ---

pub const ROM_BASE: u32 = 0x0000_0000;
pub const ROM_SIZE: u32 = 16 * 1024;

pub const FLASH_BASE: u32 = 0x1000_0000;
/// Size of the XIP window; the attached part may be smaller.
pub const FLASH_WINDOW_SIZE: u32 = 16 * 1024 * 1024;

pub const XIP_SRAM_BASE: u32 = 0x1500_0000;
pub const XIP_SRAM_SIZE: u32 = 16 * 1024;

pub const SRAM_BASE: u32 = 0x2000_0000;
pub const SRAM_SIZE: u32 = 264 * 1024;
pub const SRAM_END: u32 = SRAM_BASE + SRAM_SIZE;

pub const FLASH_SECTOR_SIZE: u32 = 4096;
pub const FLASH_PAGE_SIZE: u32 = 256;

/// Kind of memory behind an address range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegionKind {
    Ram,
    Rom,
    Flash,
}

/// A contiguous, half-open address range `[base, base + len)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryRegion {
    pub kind: RegionKind,
    pub base: u32,
    pub len: u32,
}

impl MemoryRegion {
    pub const fn new(kind: RegionKind, base: u32, len: u32) -> Self {
        Self { kind, base, len }
    }

    /// One past the last address, widened so regions touching the top of
    /// the address space do not wrap.
    pub const fn end(&self) -> u64 {
        self.base as u64 + self.len as u64
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.base && (addr as u64) < self.end()
    }

    /// Whether `[addr, addr + len)` lies entirely inside this region.
    /// An empty range is contained if its start address is.
    pub fn contains_range(&self, addr: u32, len: u32) -> bool {
        let end = addr as u64 + len as u64;
        addr >= self.base && end <= self.end() && (len > 0 || self.contains(addr))
    }

    /// Offset of `addr` from the region base. Caller must have checked
    /// containment.
    pub fn offset_of(&self, addr: u32) -> u32 {
        addr - self.base
    }
}

pub const ROM_REGION: MemoryRegion = MemoryRegion::new(RegionKind::Rom, ROM_BASE, ROM_SIZE);
pub const FLASH_REGION: MemoryRegion =
    MemoryRegion::new(RegionKind::Flash, FLASH_BASE, FLASH_WINDOW_SIZE);
pub const XIP_SRAM_REGION: MemoryRegion =
    MemoryRegion::new(RegionKind::Ram, XIP_SRAM_BASE, XIP_SRAM_SIZE);
pub const SRAM_REGION: MemoryRegion = MemoryRegion::new(RegionKind::Ram, SRAM_BASE, SRAM_SIZE);

/// Full RP2040 map as seen by the boot ROM.
pub const RP2040_REGIONS: [MemoryRegion; 4] =
    [ROM_REGION, FLASH_REGION, XIP_SRAM_REGION, SRAM_REGION];

/// Find the single region that fully contains `[addr, addr + len)`.
pub fn find_region(regions: &[MemoryRegion], addr: u32, len: u32) -> Option<&MemoryRegion> {
    regions.iter().find(|r| r.contains_range(addr, len))
}

/// Like [`find_region`], restricted to regions of the given kind.
pub fn find_region_of(
    regions: &[MemoryRegion],
    kind: RegionKind,
    addr: u32,
    len: u32,
) -> Option<&MemoryRegion> {
    regions
        .iter()
        .find(|r| r.kind == kind && r.contains_range(addr, len))
}
