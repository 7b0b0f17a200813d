//! NES bus: CPU address routing.
//!
//! Implements `emu_core::Bus` for the NES. Routes CPU addresses to
//! internal RAM, PPU registers, the APU, controllers, and the cartridge.
//! The map is total — every 16-bit address resolves to exactly one
//! destination, and reads of write-only or disabled regions return the
//! open-bus latch (the last value driven on the data bus) rather than a
//! made-up constant.
//!
//! Dispatch is synchronous: a write has taken effect on the targeted
//! component by the time `write` returns. Nothing is queued or reordered.

use emu_core::Bus;
use nes_cartridge::Mapper;

use crate::apu::Apu;
use crate::controller::Controller;
use crate::ppu::Ppu;

pub struct NesBus {
    /// 2K internal RAM ($0000-$07FF, mirrored through $1FFF).
    pub ram: [u8; 2048],
    /// PPU (2C02).
    pub ppu: Ppu,
    /// APU register stub.
    pub apu: Apu,
    /// Cartridge mapper.
    pub cartridge: Box<dyn Mapper>,
    /// Controller 1 ($4016 reads).
    pub controller1: Controller,
    /// Controller 2 ($4017 reads).
    pub controller2: Controller,
    /// OAM DMA page, set when $4014 is written and taken by the
    /// machine's tick loop.
    pub oam_dma_page: Option<u8>,
    /// Last value driven on the CPU data bus.
    open_bus: u8,
}

impl NesBus {
    #[must_use]
    pub fn new(cartridge: Box<dyn Mapper>) -> Self {
        Self {
            ram: [0; 2048],
            ppu: Ppu::new(),
            apu: Apu::new(),
            cartridge,
            controller1: Controller::new(),
            controller2: Controller::new(),
            oam_dma_page: None,
            open_bus: 0,
        }
    }

    /// Aggregate IRQ level seen by the CPU: the APU frame interrupt or
    /// the cartridge's IRQ line.
    #[must_use]
    pub fn irq_line(&self) -> bool {
        self.apu.irq_pending() || self.cartridge.irq_pending()
    }

    /// Read without side effects where that is possible (RAM and
    /// cartridge); registers with read side effects report the open-bus
    /// latch instead of disturbing the hardware state.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            0x4020..=0xFFFF => self.cartridge.cpu_read(addr),
            _ => self.open_bus,
        }
    }

    /// Power-on state for everything the console owns. The cartridge
    /// resets its own registers and RAM.
    pub fn reset(&mut self) {
        self.ram = [0; 2048];
        self.ppu.reset();
        self.apu.reset();
        self.cartridge.reset();
        self.controller1.reset();
        self.controller2.reset();
        self.oam_dma_page = None;
        self.open_bus = 0;
    }
}

impl Bus for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        let value = match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            0x2000..=0x3FFF => self.ppu.cpu_read(addr & 0x0007, self.cartridge.as_mut()),
            0x4015 => self.apu.read_status(),
            0x4016 => self.controller1.read(),
            0x4017 => self.controller2.read(),
            // Write-only APU/IO registers and the disabled test-mode
            // range float at the last driven value.
            0x4000..=0x4014 | 0x4018..=0x401F => self.open_bus,
            0x4020..=0xFFFF => self.cartridge.cpu_read(addr),
        };
        self.open_bus = value;
        value
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.open_bus = value;
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize] = value,
            0x2000..=0x3FFF => {
                self.ppu
                    .cpu_write(addr & 0x0007, value, self.cartridge.as_mut());
            }
            0x4014 => self.oam_dma_page = Some(value),
            0x4016 => {
                self.controller1.write(value);
                self.controller2.write(value);
            }
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write(addr, value),
            0x4018..=0x401F => {}
            0x4020..=0xFFFF => self.cartridge.cpu_write(addr, value),
        }
    }
}
