// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! UF2 block wire format.
//!
//! A block is one 512-byte mass-storage sector: a 32-byte header, 476 data
//! bytes and a trailing magic word, all little endian. [`Uf2Block`] overlays
//! a sector buffer in place.

use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const UF2_MAGIC_START0: u32 = 0x0A32_4655;
pub const UF2_MAGIC_START1: u32 = 0x9E5D_5157;
pub const UF2_MAGIC_END: u32 = 0x0AB1_6F30;

pub const UF2_FLAG_NOT_MAIN_FLASH: u32 = 0x0000_0001;
pub const UF2_FLAG_FAMILY_ID_PRESENT: u32 = 0x0000_2000;

pub const RP2040_FAMILY_ID: u32 = 0xE48B_FF56;

pub const UF2_BLOCK_SIZE: usize = 512;
pub const UF2_DATA_SIZE: usize = 476;
/// The only payload size the device accepts: one flash page.
pub const UF2_PAYLOAD_SIZE: u32 = 256;

/// Why a sector was not treated as a block for this device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Uf2Error {
    /// Magic words missing: an ordinary filesystem write.
    NotUf2,
    /// A UF2 block for another family, a non-flash payload, or an
    /// unsupported payload size.
    Foreign,
}

/// Decoded header fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Uf2Header {
    pub flags: u32,
    pub target_addr: u32,
    pub payload_size: u32,
    pub block_no: u32,
    pub num_blocks: u32,
    pub family_id: u32,
}

#[derive(Debug, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct Uf2Block {
    pub magic_start0: U32,
    pub magic_start1: U32,
    pub flags: U32,
    pub target_addr: U32,
    pub payload_size: U32,
    pub block_no: U32,
    pub num_blocks: U32,
    /// `file_size`, repurposed as the family id when the flag is set.
    pub family_id: U32,
    pub data: [u8; UF2_DATA_SIZE],
    pub magic_end: U32,
}

const _: () = assert!(core::mem::size_of::<Uf2Block>() == UF2_BLOCK_SIZE);

impl Uf2Block {
    /// Overlay `buf` and check the three magic words.
    pub fn parse(buf: &[u8; UF2_BLOCK_SIZE]) -> Result<&Self, Uf2Error> {
        let block = Self::ref_from_bytes(buf).map_err(|_| Uf2Error::NotUf2)?;
        if block.magic_start0.get() != UF2_MAGIC_START0
            || block.magic_start1.get() != UF2_MAGIC_START1
            || block.magic_end.get() != UF2_MAGIC_END
        {
            return Err(Uf2Error::NotUf2);
        }
        Ok(block)
    }

    /// Parse and require a main-flash block of `family_id` with a
    /// page-sized payload.
    pub fn parse_for(buf: &[u8; UF2_BLOCK_SIZE], family_id: u32) -> Result<&Self, Uf2Error> {
        let block = Self::parse(buf)?;
        let h = block.header();
        if h.flags & UF2_FLAG_FAMILY_ID_PRESENT == 0
            || h.family_id != family_id
            || h.flags & UF2_FLAG_NOT_MAIN_FLASH != 0
            || h.payload_size != UF2_PAYLOAD_SIZE
        {
            return Err(Uf2Error::Foreign);
        }
        Ok(block)
    }

    pub fn header(&self) -> Uf2Header {
        Uf2Header {
            flags: self.flags.get(),
            target_addr: self.target_addr.get(),
            payload_size: self.payload_size.get(),
            block_no: self.block_no.get(),
            num_blocks: self.num_blocks.get(),
            family_id: self.family_id.get(),
        }
    }

    /// The payload bytes, clamped to the data area.
    pub fn payload(&self) -> &[u8] {
        let len = (self.payload_size.get() as usize).min(UF2_DATA_SIZE);
        &self.data[..len]
    }
}

impl Uf2Header {
    /// Header for a main-flash block tagged with `family_id`.
    pub fn new(target_addr: u32, block_no: u32, num_blocks: u32, family_id: u32) -> Self {
        Self {
            flags: UF2_FLAG_FAMILY_ID_PRESENT,
            target_addr,
            payload_size: UF2_PAYLOAD_SIZE,
            block_no,
            num_blocks,
            family_id,
        }
    }

    /// Serialize into a full sector. `payload` is truncated to the data
    /// area; `payload_size` is written as given.
    pub fn to_bytes(&self, payload: &[u8]) -> [u8; UF2_BLOCK_SIZE] {
        let mut data = [0u8; UF2_DATA_SIZE];
        let len = payload.len().min(UF2_DATA_SIZE);
        data[..len].copy_from_slice(&payload[..len]);

        let block = Uf2Block {
            magic_start0: U32::new(UF2_MAGIC_START0),
            magic_start1: U32::new(UF2_MAGIC_START1),
            flags: U32::new(self.flags),
            target_addr: U32::new(self.target_addr),
            payload_size: U32::new(self.payload_size),
            block_no: U32::new(self.block_no),
            num_blocks: U32::new(self.num_blocks),
            family_id: U32::new(self.family_id),
            data,
            magic_end: U32::new(UF2_MAGIC_END),
        };
        let mut buf = [0u8; UF2_BLOCK_SIZE];
        buf.copy_from_slice(block.as_bytes());
        buf
    }
}
