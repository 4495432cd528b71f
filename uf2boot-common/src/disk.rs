// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Mass-storage facing side of the engine.
//!
//! The USB mass-storage class driver talks to a [`BlockDevice`]. Reads are
//! served synchronously from a [`SectorImage`] (the synthesized FAT volume);
//! writes are fed to the UF2 ingestion path.

use crate::engine::Engine;

pub const SECTOR_SIZE: usize = 512;

/// Read-only contents of the exported volume.
pub trait SectorImage {
    fn read_sector(&self, lba: u32, buf: &mut [u8; SECTOR_SIZE]);
}

/// Sector-level interface seen by the mass-storage transport.
pub trait BlockDevice {
    /// Fill `buf` with sector `lba`. Returns true if completion will be
    /// signalled later for `token`.
    fn read_block(&mut self, token: u32, lba: u32, buf: &mut [u8; SECTOR_SIZE]) -> bool;

    /// Accept sector `lba`. Returns true if completion will be signalled
    /// later for `token`; false means the write is already done.
    fn write_block(&mut self, token: u32, lba: u32, buf: &[u8; SECTOR_SIZE]) -> bool;

    /// Bus reset or media change.
    fn reset(&mut self);
}

/// Empty volume: every sector reads as zeros.
pub struct BlankImage;

impl SectorImage for BlankImage {
    fn read_sector(&self, _lba: u32, _buf: &mut [u8; SECTOR_SIZE]) {}
}

pub struct VirtualDisk<'e, 'a, I> {
    engine: &'e Engine<'a>,
    image: I,
}

impl<'e, 'a, I: SectorImage> VirtualDisk<'e, 'a, I> {
    pub fn new(engine: &'e Engine<'a>, image: I) -> Self {
        Self { engine, image }
    }
}

impl<I: SectorImage> BlockDevice for VirtualDisk<'_, '_, I> {
    fn read_block(&mut self, _token: u32, lba: u32, buf: &mut [u8; SECTOR_SIZE]) -> bool {
        buf.fill(0);
        self.image.read_sector(lba, buf);
        false
    }

    fn write_block(&mut self, token: u32, lba: u32, buf: &[u8; SECTOR_SIZE]) -> bool {
        self.engine.vd_write_block(token, lba, buf)
    }

    fn reset(&mut self) {
        self.engine.vd_reset();
    }
}
