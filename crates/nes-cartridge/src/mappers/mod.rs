//! Mapper (board) implementations.

mod cnrom;
mod mmc1;
mod mmc3;
mod nrom;
mod uxrom;

pub use cnrom::CnRom;
pub use mmc1::Mmc1;
pub use mmc3::{IRQ_DISABLE, IRQ_ENABLE, IRQ_LATCH, IRQ_RELOAD, Mmc3};
pub use nrom::Nrom;
pub use uxrom::UxRom;

/// Build an 8K CHR RAM bank when the cartridge carries no CHR ROM.
///
/// Returns (chr, is_ram).
pub(crate) fn chr_or_ram(chr_rom: Vec<u8>) -> (Vec<u8>, bool) {
    if chr_rom.is_empty() {
        (vec![0u8; 8 * 1024], true)
    } else {
        (chr_rom, false)
    }
}
