//! APU register stub.
//!
//! No audio is synthesized — the environment is headless — but the APU's
//! CPU-visible surface still matters: the frame counter can raise an IRQ,
//! and programs routinely configure $4017 and poll $4015 during startup.
//! This stub keeps the register file, the frame-counter IRQ and the
//! $4015 read protocol, and nothing else.

/// CPU cycles in one 4-step frame-counter sequence (NTSC).
const FOUR_STEP_PERIOD: u32 = 29830;
/// CPU cycles in one 5-step sequence.
const FIVE_STEP_PERIOD: u32 = 37282;

pub struct Apu {
    /// $4000-$4013 channel registers, stored for readback/debugging only.
    registers: [u8; 0x14],
    /// Channel enable bits from $4015.
    enabled: u8,
    /// $4017 bit 7: 5-step sequence (no IRQ).
    five_step_mode: bool,
    /// $4017 bit 6: frame IRQ inhibit.
    irq_inhibit: bool,
    /// Frame IRQ flag: set at the end of a 4-step sequence, cleared by
    /// reading $4015 or setting the inhibit bit.
    frame_irq: bool,
    /// CPU cycles into the current sequence.
    sequence_cycles: u32,
}

impl Apu {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registers: [0; 0x14],
            enabled: 0,
            five_step_mode: false,
            irq_inhibit: false,
            frame_irq: false,
            sequence_cycles: 0,
        }
    }

    /// Advance one CPU cycle.
    pub fn tick(&mut self) {
        self.sequence_cycles += 1;
        let period = if self.five_step_mode {
            FIVE_STEP_PERIOD
        } else {
            FOUR_STEP_PERIOD
        };
        if self.sequence_cycles >= period {
            self.sequence_cycles = 0;
            if !self.five_step_mode && !self.irq_inhibit {
                self.frame_irq = true;
            }
        }
    }

    /// Read $4015: bit 6 reports the frame IRQ flag, and the read clears
    /// it. Channel status bits approximate "enabled" since no length
    /// counters run here.
    pub fn read_status(&mut self) -> u8 {
        let mut status = self.enabled & 0x1F;
        if self.frame_irq {
            status |= 0x40;
        }
        self.frame_irq = false;
        status
    }

    /// Write an APU register ($4000-$4013, $4015, $4017).
    pub fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x4000..=0x4013 => self.registers[(addr - 0x4000) as usize] = value,
            0x4015 => self.enabled = value & 0x1F,
            0x4017 => {
                self.five_step_mode = value & 0x80 != 0;
                self.irq_inhibit = value & 0x40 != 0;
                if self.irq_inhibit {
                    self.frame_irq = false;
                }
                self.sequence_cycles = 0;
            }
            _ => {}
        }
    }

    /// Whether the frame IRQ line is asserted.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.frame_irq
    }

    /// Power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}
