//! iNES cartridge parsing and mapper implementations.
//!
//! A mapper is the cartridge-side hardware between the console and the
//! ROM chips: it translates CPU and PPU addresses into ROM/RAM offsets,
//! switches banks in response to register writes, controls nametable
//! mirroring, and — on IRQ-capable boards — watches PPU address-line
//! activity to drive a scanline counter.
//!
//! Supported boards: NROM (mapper 0), MMC1/SxROM (1), UxROM (2),
//! CNROM (3), MMC3/TxROM (4).

mod a12;
mod ines;
mod mappers;

pub use a12::A12Filter;
pub use ines::{Error, parse_ines};
pub use mappers::{CnRom, IRQ_DISABLE, IRQ_ENABLE, IRQ_LATCH, IRQ_RELOAD, Mmc1, Mmc3, Nrom, UxRom};

/// Nametable mirroring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
    SingleScreenLower,
    SingleScreenUpper,
}

/// Cartridge-side address translation and state.
///
/// `ppu_read`/`ppu_write` carry the PPU's pattern-table traffic
/// ($0000-$1FFF). They take `&mut self` because some boards observe this
/// address stream: MMC3 clocks its scanline counter on filtered rises of
/// PPU address line 12. Nametable traffic stays inside the console and
/// never reaches the cartridge connector here.
pub trait Mapper {
    /// CPU read from the cartridge window ($4020-$FFFF).
    fn cpu_read(&self, addr: u16) -> u8;

    /// CPU write to the cartridge window ($4020-$FFFF).
    fn cpu_write(&mut self, addr: u16, value: u8);

    /// PPU read from the pattern tables ($0000-$1FFF).
    fn ppu_read(&mut self, addr: u16) -> u8;

    /// PPU write to the pattern tables (CHR RAM boards).
    fn ppu_write(&mut self, addr: u16, value: u8);

    /// Current nametable mirroring.
    fn mirroring(&self) -> Mirroring;

    /// Whether the mapper is asserting its IRQ line.
    ///
    /// The line stays asserted until the program acknowledges it through
    /// the board's own register interface; the console never clears it.
    fn irq_pending(&self) -> bool {
        false
    }

    /// Restore power-on state: banking registers, IRQ state, and any
    /// cartridge RAM. ROM contents are untouched.
    fn reset(&mut self);
}
