//! iNES cartridge images.
//!
//! Parses the 16-byte iNES header and splits the payload into PRG ROM
//! and CHR data. The decoded image is plain data; `crate::mapper::create`
//! consumes it to build the mapper that actually serves the address
//! space.

use std::error::Error;
use std::fmt;

/// Nametable mirroring mode.
///
/// Header bits give Horizontal/Vertical/FourScreen; MMC1 and AxROM
/// additionally switch the single-screen modes at run time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mirroring {
    /// $2000=$2400, $2800=$2C00 (vertical scrolling layouts).
    Horizontal,
    /// $2000=$2800, $2400=$2C00 (horizontal scrolling layouts).
    Vertical,
    /// Everything maps to the first 1 KiB page.
    SingleScreenA,
    /// Everything maps to the second 1 KiB page.
    SingleScreenB,
    /// Cartridge provides the extra 2 KiB; no mirroring.
    FourScreen,
}

/// Why a ROM image was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadError {
    /// The first four bytes are not `NES\x1A`.
    HeaderInvalid,
    /// The header-declared PRG/CHR sizes exceed the payload.
    Truncated,
    /// Mapper id outside the supported set {0, 1, 2, 3, 4, 5, 7}.
    UnsupportedMapper(u8),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeaderInvalid => write!(f, "not an iNES file (bad magic)"),
            Self::Truncated => write!(f, "iNES file truncated (PRG/CHR exceed payload)"),
            Self::UnsupportedMapper(id) => write!(f, "unsupported mapper {id}"),
        }
    }
}

impl Error for LoadError {}

/// Decoded iNES image.
pub struct Cartridge {
    /// PRG ROM, a multiple of 16 KiB.
    pub prg_rom: Vec<u8>,
    /// CHR ROM, or zeroed CHR RAM when the header declares no CHR.
    pub chr: Vec<u8>,
    /// True when `chr` is RAM (writable through the PPU bus).
    pub chr_is_ram: bool,
    /// Mapper number from the split header nibbles.
    pub mapper_id: u8,
    /// Header-declared mirroring. Mappers may override dynamically.
    pub mirroring: Mirroring,
}

impl Cartridge {
    /// Parse an iNES image.
    pub fn from_ines(data: &[u8]) -> Result<Self, LoadError> {
        if data.len() < 16 || &data[0..4] != b"NES\x1A" {
            return Err(LoadError::HeaderInvalid);
        }

        let prg_size = data[4] as usize * 16 * 1024;
        let chr_banks = data[5] as usize;
        let flags6 = data[6];
        let flags7 = data[7];

        let mapper_id = (flags6 >> 4) | (flags7 & 0xF0);
        if !matches!(mapper_id, 0 | 1 | 2 | 3 | 4 | 5 | 7) {
            return Err(LoadError::UnsupportedMapper(mapper_id));
        }

        let mirroring = if flags6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        // An optional 512-byte trainer sits between header and PRG.
        let prg_start = if flags6 & 0x04 != 0 { 16 + 512 } else { 16 };
        let chr_start = prg_start + prg_size;
        let chr_size = chr_banks * 8 * 1024;

        if data.len() < chr_start + chr_size {
            return Err(LoadError::Truncated);
        }

        let prg_rom = data[prg_start..prg_start + prg_size].to_vec();
        let chr_is_ram = chr_banks == 0;
        let chr = if chr_is_ram {
            vec![0; 8 * 1024]
        } else {
            data[chr_start..chr_start + chr_size].to_vec()
        };

        Ok(Self {
            prg_rom,
            chr,
            chr_is_ram,
            mapper_id,
            mirroring,
        })
    }
}
