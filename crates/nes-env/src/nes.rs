//! Top-level machine: master-clock scheduler and the frame-step surface.
//!
//! The master clock counts ticks of the NTSC crystal (21,477,272 Hz).
//! The PPU runs every 4 crystal ticks and the CPU every 12, which yields
//! the hardware ratio of 3 PPU dots per CPU cycle. Within a shared master
//! tick the PPU runs first, so a mapper IRQ raised by a rendering fetch
//! is already on the line when the CPU reaches its next instruction
//! boundary.
//!
//! A frame step runs until the PPU wraps past its last scanline rather
//! than for a fixed tick budget: the odd-frame dot skip shortens some
//! frames by one dot, and a fixed budget would slowly drift the step
//! boundary across the frame.

use emu_core::{Bus, Cpu, Tickable};
use mos_6502::Mos6502;
use nes_cartridge::{Mapper, parse_ines};
use tracing::debug;

use crate::bus::NesBus;
use crate::joypad::JoypadButtons;
use crate::ppu::FrameBuffer;

/// Crystal ticks per PPU dot.
const PPU_DIVISOR: u64 = 4;
/// Crystal ticks per CPU cycle.
const CPU_DIVISOR: u64 = 12;

/// NES system: CPU, bus-owned components, and the frame-step scheduler.
///
/// One `Nes` is a fully isolated unit — no state is shared between
/// instances, so a host may run any number of them independently.
pub struct Nes {
    cpu: Mos6502,
    bus: NesBus,
    /// Master clock, in crystal ticks since power-on.
    master_clock: u64,
    /// Completed frame steps since power-on.
    frame_count: u64,
    /// CPU cycles still owed by the most recently stepped instruction.
    ///
    /// The CPU core executes whole instructions; the scheduler spreads
    /// each instruction's cycle count over subsequent CPU slots so the
    /// PPU interleaves at true cycle granularity.
    cpu_stall: u32,
    // OAM DMA engine ($4014): suspends the CPU while 256 bytes are
    // copied into sprite memory.
    dma_cycles_remaining: u16,
    dma_addr: u16,
    dma_read_data: u8,
    dma_odd_cycle: bool,
}

impl Nes {
    /// Build a machine from an iNES image.
    ///
    /// The machine comes up in power-on state with the reset vector
    /// already loaded; `reset` is only needed to return to that state
    /// later.
    ///
    /// # Errors
    ///
    /// Fails fast on malformed images or unsupported mappers; no
    /// partially-initialized machine is ever returned.
    pub fn from_ines(data: &[u8]) -> Result<Self, nes_cartridge::Error> {
        let mapper = parse_ines(data)?;
        Ok(Self::from_mapper(mapper))
    }

    fn from_mapper(mapper: Box<dyn Mapper>) -> Self {
        let mut nes = Self {
            cpu: Mos6502::new_2a03(),
            bus: NesBus::new(mapper),
            master_clock: 0,
            frame_count: 0,
            cpu_stall: 0,
            dma_cycles_remaining: 0,
            dma_addr: 0,
            dma_read_data: 0,
            dma_odd_cycle: false,
        };
        nes.cpu.reset(&mut nes.bus);
        nes
    }

    /// Return every component to power-on state.
    ///
    /// Deterministic: repeated resets of the same machine produce
    /// bit-identical frame sequences for identical input sequences.
    /// Covers cartridge registers and CHR/PRG RAM as well as console
    /// state.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
        self.master_clock = 0;
        self.frame_count = 0;
        self.cpu_stall = 0;
        self.dma_cycles_remaining = 0;
        self.dma_addr = 0;
        self.dma_read_data = 0;
        self.dma_odd_cycle = false;
    }

    /// Advance exactly one rendered frame with the given pad state held
    /// on controller 1, and return the completed framebuffer.
    ///
    /// The step is synchronous and always runs to completion; callers
    /// pace the machine only at frame granularity by calling `step`
    /// repeatedly.
    pub fn step(&mut self, buttons: JoypadButtons) -> &FrameBuffer {
        self.bus.controller1.set_buttons(buttons.bits());

        loop {
            self.tick();
            if self.bus.ppu.take_frame_complete() {
                break;
            }
        }

        self.frame_count += 1;
        self.bus.ppu.frame()
    }

    /// The most recently completed frame. Stable between steps.
    #[must_use]
    pub fn frame(&self) -> &FrameBuffer {
        self.bus.ppu.frame()
    }

    /// Privileged bus read, outside normal CPU execution.
    ///
    /// Identical side effects to a CPU-issued read, including register
    /// read effects and the open-bus latch refresh.
    pub fn bus_read(&mut self, addr: u16) -> u8 {
        self.bus.read(addr)
    }

    /// Privileged bus write, outside normal CPU execution.
    ///
    /// Identical side effects to a CPU-issued write — writing a mapper
    /// IRQ register here acknowledges exactly as the program would.
    pub fn bus_write(&mut self, addr: u16, value: u8) {
        self.bus.write(addr, value);
    }

    /// Release held resources.
    ///
    /// The machine owns nothing beyond its own memory, so this only
    /// logs; calling it again is a no-op. Exists for drivers that expect
    /// an explicit close.
    pub fn close(&mut self) {
        debug!(frames = self.frame_count, "machine closed");
    }

    /// Reference to the CPU.
    #[must_use]
    pub fn cpu(&self) -> &Mos6502 {
        &self.cpu
    }

    /// Reference to the bus and the components it owns.
    #[must_use]
    pub fn bus(&self) -> &NesBus {
        &self.bus
    }

    /// Master clock tick count since power-on.
    #[must_use]
    pub fn master_clock(&self) -> u64 {
        self.master_clock
    }

    /// Completed frame steps since power-on.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// One CPU-rate slot: DMA if one is in flight, otherwise stall out
    /// the current instruction, otherwise run the next one.
    fn tick_cpu(&mut self) {
        if let Some(page) = self.bus.oam_dma_page.take() {
            self.dma_addr = u16::from(page) << 8;
            // 513 cycles, plus one alignment cycle when triggered on an
            // odd CPU cycle.
            self.dma_cycles_remaining = 513;
            self.dma_odd_cycle = false;
            if (self.master_clock / CPU_DIVISOR) % 2 == 1 {
                self.dma_cycles_remaining += 1;
            }
        }

        if self.dma_cycles_remaining > 0 {
            self.tick_dma();
            return;
        }

        if self.cpu_stall > 0 {
            self.cpu_stall -= 1;
            return;
        }

        // Instruction boundary: sample the IRQ level, then run one
        // instruction (or one interrupt entry). The level is recomputed
        // every boundary, so a line acknowledged mid-instruction can
        // never fire a stale interrupt.
        <Mos6502 as Cpu<NesBus>>::set_irq_line(&mut self.cpu, self.bus.irq_line());
        let cycles = self.cpu.step(&mut self.bus);
        self.cpu_stall = cycles.saturating_sub(1);
    }

    fn tick_dma(&mut self) {
        self.dma_cycles_remaining -= 1;

        if self.dma_odd_cycle {
            self.bus.ppu.write_oam(
                self.bus
                    .ppu
                    .oam_addr()
                    .wrapping_add((self.dma_addr & 0xFF) as u8),
                self.dma_read_data,
            );
            self.dma_addr = self.dma_addr.wrapping_add(1);
        } else {
            self.dma_read_data = self.bus.read(self.dma_addr);
        }

        self.dma_odd_cycle = !self.dma_odd_cycle;
    }
}

impl Tickable for Nes {
    fn tick(&mut self) {
        self.master_clock += 1;

        // PPU first: rendering fetches (and any mapper IRQ they raise)
        // precede the CPU slot sharing this master tick.
        if self.master_clock.is_multiple_of(PPU_DIVISOR) {
            self.bus.ppu.tick(self.bus.cartridge.as_mut());

            if self.bus.ppu.take_nmi() {
                <Mos6502 as Cpu<NesBus>>::nmi(&mut self.cpu);
            }
        }

        if self.master_clock.is_multiple_of(CPU_DIVISOR) {
            self.tick_cpu();
            self.bus.apu.tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ppu::{FB_HEIGHT, FB_WIDTH};
    use nes_cartridge::{Mirroring, Nrom};

    /// NOP sled with the reset vector at $8000.
    fn make_nes() -> Nes {
        let mut prg = vec![0xEA; 32768];
        prg[0x7FFC] = 0x00;
        prg[0x7FFD] = 0x80;
        let mapper = Box::new(Nrom::new(prg, vec![0; 8192], Mirroring::Horizontal));
        Nes::from_mapper(mapper)
    }

    #[test]
    fn reset_vector_loaded_at_power_on() {
        let nes = make_nes();
        assert_eq!(nes.cpu().regs.pc, 0x8000);
    }

    #[test]
    fn step_advances_exactly_one_frame() {
        let mut nes = make_nes();
        nes.step(JoypadButtons::empty());
        // Rendering is off, so no odd-frame dot skip: 341 dots x 262
        // scanlines x 4 crystal ticks per dot.
        assert_eq!(nes.master_clock(), 341 * 262 * 4);
        assert_eq!(nes.frame_count(), 1);

        nes.step(JoypadButtons::empty());
        assert_eq!(nes.master_clock(), 2 * 341 * 262 * 4);
        assert_eq!(nes.frame_count(), 2);
    }

    #[test]
    fn framebuffer_dimensions() {
        let mut nes = make_nes();
        let frame = nes.step(JoypadButtons::empty());
        assert_eq!(frame.as_slice().len(), FB_WIDTH * FB_HEIGHT);
    }

    #[test]
    fn step_latches_buttons_on_controller_one() {
        let mut nes = make_nes();
        nes.step(JoypadButtons::LEFT | JoypadButtons::A);
        assert_eq!(
            nes.bus().controller1.buttons(),
            (JoypadButtons::LEFT | JoypadButtons::A).bits()
        );
        assert_eq!(nes.bus().controller2.buttons(), 0);
    }

    #[test]
    fn privileged_access_matches_cpu_path() {
        let mut nes = make_nes();
        nes.bus_write(0x0042, 0xAB);
        assert_eq!(nes.bus_read(0x0042), 0xAB);

        // Same open-bus behavior as a CPU access: the write drives the
        // latch, and a write-only register reads it back.
        nes.bus_write(0x4000, 0x57);
        assert_eq!(nes.bus_read(0x4000), 0x57);
    }

    #[test]
    fn reset_returns_to_power_on() {
        let mut nes = make_nes();
        nes.bus_write(0x0000, 0xFF);
        nes.step(JoypadButtons::START);
        nes.reset();

        assert_eq!(nes.master_clock(), 0);
        assert_eq!(nes.frame_count(), 0);
        assert_eq!(nes.cpu().regs.pc, 0x8000);
        assert_eq!(nes.bus_read(0x0000), 0x00);
    }

    #[test]
    fn close_is_idempotent() {
        let mut nes = make_nes();
        nes.close();
        nes.close();
        // Still usable for inspection afterwards.
        assert_eq!(nes.frame().as_slice().len(), FB_WIDTH * FB_HEIGHT);
    }
}
