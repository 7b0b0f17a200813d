//! MMC3 / TxROM (mapper 4): fine-grained banking and a scanline IRQ.
//!
//! Used by Super Mario Bros. 3, Kirby's Adventure and Mega Man 3-6, all
//! of which split the screen with the scanline counter: the counter is
//! clocked by filtered rising edges of PPU address line 12, which during
//! rendering occur once per scanline (the sprite-fetch window reads the
//! opposite pattern table from the background fetches).
//!
//! Register map (all within $8000-$FFFF, selected by A14-A13 plus A0):
//!
//! | Address        | Function                               |
//! |----------------|----------------------------------------|
//! | $8000 (even)   | Bank select (target register, modes)   |
//! | $8001 (odd)    | Bank data                              |
//! | $A000 (even)   | Mirroring                              |
//! | $A001 (odd)    | PRG RAM enable / write protect         |
//! | $C000 (even)   | IRQ latch (reload value)               |
//! | $C001 (odd)    | IRQ reload request                     |
//! | $E000 (even)   | IRQ disable and acknowledge            |
//! | $E001 (odd)    | IRQ enable                             |

use crate::{A12Filter, Mapper, Mirroring};

use super::chr_or_ram;

/// IRQ latch (reload value) register.
pub const IRQ_LATCH: u16 = 0xC000;
/// IRQ reload-request register.
pub const IRQ_RELOAD: u16 = 0xC001;
/// IRQ disable-and-acknowledge register.
pub const IRQ_DISABLE: u16 = 0xE000;
/// IRQ enable register.
pub const IRQ_ENABLE: u16 = 0xE001;

pub struct Mmc3 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_ram: Vec<u8>,

    /// Bank select ($8000): bits 0-2 target register, bit 6 PRG mode,
    /// bit 7 CHR mode (pattern-table inversion).
    bank_select: u8,
    /// R0-R7 bank registers, written through $8001.
    registers: [u8; 8],
    mirroring: Mirroring,
    prg_ram_enable: bool,
    prg_ram_write_protect: bool,

    // Scanline counter ------------------------------------------------------
    /// Reload value stored by $C000.
    irq_latch: u8,
    /// Current counter value.
    irq_counter: u8,
    /// Set by $C001; the next accepted edge reloads from the latch
    /// instead of decrementing.
    irq_reload_pending: bool,
    /// Gate set/cleared by $E001/$E000.
    irq_enabled: bool,
    /// The IRQ line. Asserted by the counter reaching zero while enabled;
    /// cleared only by $E000.
    irq_pending: bool,
    /// Debounced A12 edge detector fed by pattern-table traffic.
    a12: A12Filter,
}

impl Mmc3 {
    #[must_use]
    pub fn new(prg_rom: Vec<u8>, chr_rom: Vec<u8>) -> Self {
        let (chr, chr_is_ram) = chr_or_ram(chr_rom);
        Self {
            prg_rom,
            chr,
            chr_is_ram,
            prg_ram: vec![0; 8 * 1024],
            bank_select: 0,
            registers: [0; 8],
            mirroring: Mirroring::Vertical,
            prg_ram_enable: true,
            prg_ram_write_protect: false,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload_pending: false,
            irq_enabled: false,
            irq_pending: false,
            a12: A12Filter::new(),
        }
    }

    fn prg_8k_count(&self) -> usize {
        self.prg_rom.len() / 0x2000
    }

    fn read_prg_8k(&self, bank: usize, offset: usize) -> u8 {
        let bank = bank % self.prg_8k_count();
        self.prg_rom[bank * 0x2000 + offset]
    }

    /// Resolve a pattern-table address to a CHR offset under the current
    /// banking mode. Windows are 1K; R0/R1 span two windows each.
    fn chr_offset(&self, addr: u16) -> usize {
        let addr = addr as usize & 0x1FFF;
        let window = addr >> 10;
        // Bit 7 of bank select swaps the 2K and 1K halves of the map.
        let window = if self.bank_select & 0x80 != 0 {
            window ^ 0x04
        } else {
            window
        };

        let bank_1k = match window {
            0 => (self.registers[0] & 0xFE) as usize,
            1 => (self.registers[0] | 0x01) as usize,
            2 => (self.registers[1] & 0xFE) as usize,
            3 => (self.registers[1] | 0x01) as usize,
            4 => self.registers[2] as usize,
            5 => self.registers[3] as usize,
            6 => self.registers[4] as usize,
            _ => self.registers[5] as usize,
        };

        (bank_1k * 0x400 + (addr & 0x3FF)) % self.chr.len()
    }

    /// Feed one pattern-table address to the A12 filter and clock the
    /// scanline counter when an edge is accepted.
    fn watch_a12(&mut self, addr: u16) {
        if self.a12.observe(addr) {
            self.clock_scanline_counter();
        }
    }

    /// One step of the scanline counter state machine.
    ///
    /// Reload consumes the pending flag; a counter already at zero also
    /// reloads. The IRQ line asserts when this step leaves the counter at
    /// zero — including a reload from a zero latch — and IRQs are enabled.
    fn clock_scanline_counter(&mut self) {
        if self.irq_counter == 0 || self.irq_reload_pending {
            self.irq_counter = self.irq_latch;
            self.irq_reload_pending = false;
        } else {
            self.irq_counter -= 1;
        }

        if self.irq_counter == 0 && self.irq_enabled {
            self.irq_pending = true;
        }
    }
}

impl Mapper for Mmc3 {
    fn cpu_read(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enable {
                    self.prg_ram[(addr - 0x6000) as usize]
                } else {
                    0
                }
            }
            0x8000..=0x9FFF => {
                let offset = (addr - 0x8000) as usize;
                if self.bank_select & 0x40 == 0 {
                    self.read_prg_8k(self.registers[6] as usize & 0x3F, offset)
                } else {
                    self.read_prg_8k(self.prg_8k_count() - 2, offset)
                }
            }
            0xA000..=0xBFFF => {
                let offset = (addr - 0xA000) as usize;
                self.read_prg_8k(self.registers[7] as usize & 0x3F, offset)
            }
            0xC000..=0xDFFF => {
                let offset = (addr - 0xC000) as usize;
                if self.bank_select & 0x40 == 0 {
                    self.read_prg_8k(self.prg_8k_count() - 2, offset)
                } else {
                    self.read_prg_8k(self.registers[6] as usize & 0x3F, offset)
                }
            }
            0xE000..=0xFFFF => {
                let offset = (addr - 0xE000) as usize;
                self.read_prg_8k(self.prg_8k_count() - 1, offset)
            }
            _ => 0,
        }
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enable && !self.prg_ram_write_protect {
                    self.prg_ram[(addr - 0x6000) as usize] = value;
                }
            }
            0x8000..=0x9FFF => {
                if addr & 1 == 0 {
                    self.bank_select = value;
                } else {
                    let target = (self.bank_select & 0x07) as usize;
                    self.registers[target] = value;
                }
            }
            0xA000..=0xBFFF => {
                if addr & 1 == 0 {
                    self.mirroring = if value & 1 == 0 {
                        Mirroring::Vertical
                    } else {
                        Mirroring::Horizontal
                    };
                } else {
                    self.prg_ram_write_protect = value & 0x40 != 0;
                    self.prg_ram_enable = value & 0x80 != 0;
                }
            }
            0xC000..=0xDFFF => {
                if addr & 1 == 0 {
                    // Latch write has no immediate effect on the counter.
                    self.irq_latch = value;
                } else {
                    self.irq_counter = 0;
                    self.irq_reload_pending = true;
                }
            }
            0xE000..=0xFFFF => {
                if addr & 1 == 0 {
                    // The only path that deasserts the IRQ line.
                    self.irq_enabled = false;
                    self.irq_pending = false;
                } else {
                    self.irq_enabled = true;
                }
            }
            _ => {}
        }
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.watch_a12(addr);
        self.chr[self.chr_offset(addr)]
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        self.watch_a12(addr);
        if self.chr_is_ram {
            let offset = self.chr_offset(addr);
            self.chr[offset] = value;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    fn reset(&mut self) {
        self.prg_ram.fill(0);
        if self.chr_is_ram {
            self.chr.fill(0);
        }
        self.bank_select = 0;
        self.registers = [0; 8];
        self.mirroring = Mirroring::Vertical;
        self.prg_ram_enable = true;
        self.prg_ram_write_protect = false;
        self.irq_latch = 0;
        self.irq_counter = 0;
        self.irq_reload_pending = false;
        self.irq_enabled = false;
        self.irq_pending = false;
        self.a12.reset();
    }
}
