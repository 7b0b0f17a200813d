//! iNES (v1) file parsing.
//!
//! Layout: 16-byte header, optional 512-byte trainer, PRG ROM in 16K
//! banks, CHR ROM in 8K banks. A CHR bank count of zero means the board
//! carries CHR RAM instead of ROM.

use std::fmt;

use bitflags::bitflags;
use tracing::{debug, info};

use crate::mappers::{CnRom, Mmc1, Mmc3, Nrom, UxRom};
use crate::{Mapper, Mirroring};

/// Length of the iNES header.
pub const HEADER_LEN: usize = 16;

/// 16K PRG bank size.
const PRG_BANK: usize = 16 * 1024;
/// 8K CHR bank size.
const CHR_BANK: usize = 8 * 1024;
/// Trainer size when flag 6 bit 2 is set.
const TRAINER_LEN: usize = 512;

/// Cartridge load error.
///
/// Loading either succeeds completely or fails with one of these; no
/// partially-initialized cartridge ever escapes.
#[derive(Debug)]
pub enum Error {
    /// Provided buffer is shorter than the 16-byte header.
    TooShort { actual: usize },
    /// Magic number ("NES<EOF>") is missing.
    InvalidMagic,
    /// A ROM section (trainer/PRG/CHR) is shorter than the header claims.
    SectionTooShort {
        section: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The image wants a mapper this crate does not implement.
    UnsupportedMapper(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { actual } => {
                write!(f, "header expected {HEADER_LEN} bytes, got {actual}")
            }
            Self::InvalidMagic => write!(f, "missing NES magic bytes"),
            Self::SectionTooShort {
                section,
                expected,
                actual,
            } => write!(
                f,
                "{section} section expected {expected} bytes, got {actual}"
            ),
            Self::UnsupportedMapper(id) => write!(f, "unsupported mapper {id}"),
        }
    }
}

impl std::error::Error for Error {}

bitflags! {
    /// Header byte 6: mirroring, battery, trainer, and the low mapper nibble.
    #[derive(Debug, Clone, Copy)]
    struct Flags6: u8 {
        const VERTICAL_MIRRORING = 0x01;
        const BATTERY            = 0x02;
        const TRAINER            = 0x04;
        const FOUR_SCREEN        = 0x08;
        const MAPPER_LOW         = 0xF0;
    }
}

/// Parse an iNES image and build its mapper.
///
/// # Errors
///
/// Fails fast on malformed data or an unsupported mapper id — see
/// [`Error`].
pub fn parse_ines(data: &[u8]) -> Result<Box<dyn Mapper>, Error> {
    if data.len() < HEADER_LEN {
        return Err(Error::TooShort { actual: data.len() });
    }
    if &data[0..4] != b"NES\x1A" {
        return Err(Error::InvalidMagic);
    }

    let prg_banks = data[4] as usize;
    let chr_banks = data[5] as usize;
    let flags6 = Flags6::from_bits_retain(data[6]);
    let flags7 = data[7];

    let mapper_id = (flags6.bits() >> 4) | (flags7 & 0xF0);

    let mirroring = if flags6.contains(Flags6::FOUR_SCREEN) {
        Mirroring::FourScreen
    } else if flags6.contains(Flags6::VERTICAL_MIRRORING) {
        Mirroring::Vertical
    } else {
        Mirroring::Horizontal
    };

    let prg_len = prg_banks * PRG_BANK;
    let chr_len = chr_banks * CHR_BANK;
    let trainer_len = if flags6.contains(Flags6::TRAINER) {
        TRAINER_LEN
    } else {
        0
    };

    let prg_start = HEADER_LEN + trainer_len;
    let chr_start = prg_start + prg_len;
    if data.len() < chr_start {
        return Err(Error::SectionTooShort {
            section: "PRG ROM",
            expected: prg_len,
            actual: data.len().saturating_sub(prg_start),
        });
    }
    if data.len() < chr_start + chr_len {
        return Err(Error::SectionTooShort {
            section: "CHR ROM",
            expected: chr_len,
            actual: data.len() - chr_start,
        });
    }

    let prg_rom = data[prg_start..prg_start + prg_len].to_vec();
    let chr_rom = data[chr_start..chr_start + chr_len].to_vec();

    debug!(
        mapper_id,
        prg_banks,
        chr_banks,
        ?mirroring,
        battery = flags6.contains(Flags6::BATTERY),
        "parsed iNES header"
    );
    if chr_rom.is_empty() {
        info!(mapper_id, "cartridge uses CHR RAM");
    }

    let mapper: Box<dyn Mapper> = match mapper_id {
        0 => Box::new(Nrom::new(prg_rom, chr_rom, mirroring)),
        1 => Box::new(Mmc1::new(prg_rom, chr_rom)),
        2 => Box::new(UxRom::new(prg_rom, chr_rom, mirroring)),
        3 => Box::new(CnRom::new(prg_rom, chr_rom, mirroring)),
        4 => Box::new(Mmc3::new(prg_rom, chr_rom)),
        id => return Err(Error::UnsupportedMapper(id)),
    };
    Ok(mapper)
}
