//! MOS 6502 CPU emulator.
//!
//! Implements the NMOS 6502 instruction set including the commonly-used
//! undocumented ("illegal") opcodes. The Ricoh 2A03 found in the NES is a
//! 6502 with the decimal mode disconnected; construct one with
//! [`Mos6502::new_2a03`].
//!
//! Execution is instruction-stepped: [`Mos6502::step`] runs one instruction
//! (or one interrupt entry sequence) and returns the cycles it consumed.
//! The IRQ input is a level supplied by the machine each CPU cycle via
//! [`Mos6502::set_irq_line`]; it is sampled between instructions and, while
//! the interrupt-disable flag is set, deferred rather than dropped. NMI is
//! an edge, latched until serviced.

mod addressing;
mod registers;

pub use addressing::Mode;
pub use registers::{Registers, Status, flags};

use emu_core::{Bus, Cpu};

/// NMI vector address.
pub const NMI_VECTOR: u16 = 0xFFFA;
/// Reset vector address.
pub const RESET_VECTOR: u16 = 0xFFFC;
/// IRQ/BRK vector address.
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// MOS 6502 CPU state.
pub struct Mos6502 {
    /// Register file, exposed for observation and tests.
    pub regs: Registers,
    /// Latched NMI edge, cleared when serviced.
    nmi_pending: bool,
    /// Sampled level of the IRQ line.
    irq_line: bool,
    /// Wedged by a JAM opcode until reset.
    halted: bool,
    /// Decimal mode wired up (false on the 2A03).
    bcd_enabled: bool,
}

impl Mos6502 {
    /// Create a 6502 with decimal mode available.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            nmi_pending: false,
            irq_line: false,
            halted: false,
            bcd_enabled: true,
        }
    }

    /// Create a Ricoh 2A03: a 6502 with the decimal mode disconnected.
    ///
    /// The D flag can still be set and cleared, but ADC/SBC always operate
    /// in binary.
    #[must_use]
    pub fn new_2a03() -> Self {
        Self {
            bcd_enabled: false,
            ..Self::new()
        }
    }

    /// Whether a JAM opcode has wedged the CPU.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    // =========================================================================
    // Flag helpers
    // =========================================================================

    fn set_zn(&mut self, value: u8) {
        self.regs.p.assign(flags::Z, value == 0);
        self.regs.p.assign(flags::N, value & 0x80 != 0);
    }

    fn decimal_active(&self) -> bool {
        self.bcd_enabled && self.regs.p.is_set(flags::D)
    }

    // =========================================================================
    // ALU operations
    // =========================================================================

    /// ADC — add with carry.
    fn adc(&mut self, value: u8) {
        if self.decimal_active() {
            self.adc_decimal(value);
        } else {
            self.adc_binary(value);
        }
    }

    fn adc_binary(&mut self, value: u8) {
        let a = u16::from(self.regs.a);
        let v = u16::from(value);
        let c = u16::from(self.regs.p.is_set(flags::C));

        let result = a + v + c;
        let result8 = result as u8;

        self.regs.p.assign(flags::C, result > 0xFF);
        self.regs
            .p
            .assign(flags::V, (self.regs.a ^ result8) & (value ^ result8) & 0x80 != 0);
        self.set_zn(result8);
        self.regs.a = result8;
    }

    fn adc_decimal(&mut self, value: u8) {
        let a = u16::from(self.regs.a);
        let v = u16::from(value);
        let c = u16::from(self.regs.p.is_set(flags::C));

        let mut lo = (a & 0x0F) + (v & 0x0F) + c;
        if lo > 9 {
            lo += 6;
        }
        let mut hi = (a >> 4) + (v >> 4) + u16::from(lo > 0x0F);

        // Z, N and V come from the intermediate binary result on NMOS parts.
        let binary = (a + v + c) as u8;
        self.regs.p.assign(flags::Z, binary == 0);
        self.regs.p.assign(flags::N, hi & 0x08 != 0);
        self.regs
            .p
            .assign(flags::V, (a ^ u16::from(binary)) & (v ^ u16::from(binary)) & 0x80 != 0);

        if hi > 9 {
            hi += 6;
        }
        self.regs.p.assign(flags::C, hi > 0x0F);
        self.regs.a = ((hi << 4) | (lo & 0x0F)) as u8;
    }

    /// SBC — subtract with borrow.
    fn sbc(&mut self, value: u8) {
        if self.decimal_active() {
            self.sbc_decimal(value);
        } else {
            // Binary subtraction is addition of the one's complement.
            self.adc_binary(!value);
        }
    }

    fn sbc_decimal(&mut self, value: u8) {
        let a = i16::from(self.regs.a);
        let v = i16::from(value);
        let c = i16::from(!self.regs.p.is_set(flags::C));

        let mut lo = (a & 0x0F) - (v & 0x0F) - c;
        if lo < 0 {
            lo = ((lo - 6) & 0x0F) - 0x10;
        }
        let mut hi = (a >> 4) - (v >> 4) + if lo < 0 { -1 } else { 0 };
        if hi < 0 {
            hi = (hi - 6) & 0x0F;
        }

        let binary = a.wrapping_sub(v).wrapping_sub(c);
        self.regs.p.assign(flags::C, binary >= 0);
        self.regs.p.assign(flags::Z, binary as u8 == 0);
        self.regs.p.assign(flags::N, binary & 0x80 != 0);
        self.regs
            .p
            .assign(flags::V, (a ^ binary) & (!v ^ binary) & 0x80 != 0);

        self.regs.a = ((hi << 4) | (lo & 0x0F)) as u8;
    }

    /// Compare a register against a value (CMP/CPX/CPY).
    fn compare(&mut self, reg: u8, value: u8) {
        self.regs.p.assign(flags::C, reg >= value);
        self.set_zn(reg.wrapping_sub(value));
    }

    /// ASL — arithmetic shift left.
    fn asl(&mut self, value: u8) -> u8 {
        self.regs.p.assign(flags::C, value & 0x80 != 0);
        let result = value << 1;
        self.set_zn(result);
        result
    }

    /// LSR — logical shift right.
    fn lsr(&mut self, value: u8) -> u8 {
        self.regs.p.assign(flags::C, value & 0x01 != 0);
        let result = value >> 1;
        self.set_zn(result);
        result
    }

    /// ROL — rotate left through carry.
    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.regs.p.is_set(flags::C));
        self.regs.p.assign(flags::C, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.set_zn(result);
        result
    }

    /// ROR — rotate right through carry.
    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = if self.regs.p.is_set(flags::C) { 0x80 } else { 0 };
        self.regs.p.assign(flags::C, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.set_zn(result);
        result
    }

    /// BIT — bit test.
    fn bit(&mut self, value: u8) {
        self.regs.p.assign(flags::Z, self.regs.a & value == 0);
        self.regs.p.assign(flags::N, value & 0x80 != 0);
        self.regs.p.assign(flags::V, value & 0x40 != 0);
    }

    // =========================================================================
    // Instruction families
    // =========================================================================

    fn lda(&mut self, bus: &mut impl Bus, mode: Mode) -> u32 {
        let (value, cycles) = self.read_operand(bus, mode);
        self.regs.a = value;
        self.set_zn(value);
        cycles
    }

    fn ldx(&mut self, bus: &mut impl Bus, mode: Mode) -> u32 {
        let (value, cycles) = self.read_operand(bus, mode);
        self.regs.x = value;
        self.set_zn(value);
        cycles
    }

    fn ldy(&mut self, bus: &mut impl Bus, mode: Mode) -> u32 {
        let (value, cycles) = self.read_operand(bus, mode);
        self.regs.y = value;
        self.set_zn(value);
        cycles
    }

    fn store(&mut self, bus: &mut impl Bus, mode: Mode, value: u8) -> u32 {
        let (addr, cycles) = self.write_addr(bus, mode);
        bus.write(addr, value);
        cycles
    }

    fn ora(&mut self, bus: &mut impl Bus, mode: Mode) -> u32 {
        let (value, cycles) = self.read_operand(bus, mode);
        self.regs.a |= value;
        self.set_zn(self.regs.a);
        cycles
    }

    fn and(&mut self, bus: &mut impl Bus, mode: Mode) -> u32 {
        let (value, cycles) = self.read_operand(bus, mode);
        self.regs.a &= value;
        self.set_zn(self.regs.a);
        cycles
    }

    fn eor(&mut self, bus: &mut impl Bus, mode: Mode) -> u32 {
        let (value, cycles) = self.read_operand(bus, mode);
        self.regs.a ^= value;
        self.set_zn(self.regs.a);
        cycles
    }

    fn adc_mode(&mut self, bus: &mut impl Bus, mode: Mode) -> u32 {
        let (value, cycles) = self.read_operand(bus, mode);
        self.adc(value);
        cycles
    }

    fn sbc_mode(&mut self, bus: &mut impl Bus, mode: Mode) -> u32 {
        let (value, cycles) = self.read_operand(bus, mode);
        self.sbc(value);
        cycles
    }

    fn cmp_mode(&mut self, bus: &mut impl Bus, mode: Mode, reg: u8) -> u32 {
        let (value, cycles) = self.read_operand(bus, mode);
        self.compare(reg, value);
        cycles
    }

    /// Read-modify-write: read, transform, write back.
    fn rmw(&mut self, bus: &mut impl Bus, mode: Mode, f: fn(&mut Self, u8) -> u8) -> u32 {
        let (addr, cycles) = self.rmw_addr(bus, mode);
        let value = bus.read(addr);
        let result = f(self, value);
        bus.write(addr, result);
        cycles
    }

    fn inc_value(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.set_zn(result);
        result
    }

    fn dec_value(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.set_zn(result);
        result
    }

    // Illegal RMW combinations: shift/step the memory operand, then fold
    // the result into A through the paired ALU operation.

    fn slo_value(&mut self, value: u8) -> u8 {
        let result = self.asl(value);
        self.regs.a |= result;
        self.set_zn(self.regs.a);
        result
    }

    fn rla_value(&mut self, value: u8) -> u8 {
        let result = self.rol(value);
        self.regs.a &= result;
        self.set_zn(self.regs.a);
        result
    }

    fn sre_value(&mut self, value: u8) -> u8 {
        let result = self.lsr(value);
        self.regs.a ^= result;
        self.set_zn(self.regs.a);
        result
    }

    fn rra_value(&mut self, value: u8) -> u8 {
        let result = self.ror(value);
        self.adc(result);
        result
    }

    fn dcp_value(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.compare(self.regs.a, result);
        result
    }

    fn isc_value(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.sbc(result);
        result
    }

    fn lax(&mut self, bus: &mut impl Bus, mode: Mode) -> u32 {
        let (value, cycles) = self.read_operand(bus, mode);
        self.regs.a = value;
        self.regs.x = value;
        self.set_zn(value);
        cycles
    }

    /// Dummy read with the cycle cost of the addressed mode (illegal NOPs).
    fn nop_read(&mut self, bus: &mut impl Bus, mode: Mode) -> u32 {
        let (_, cycles) = self.read_operand(bus, mode);
        cycles
    }

    /// Store with the high-byte+1 corruption the unstable SHA/SHX/SHY
    /// family exhibits.
    fn store_high_and(&mut self, bus: &mut impl Bus, mode: Mode, value: u8) -> u32 {
        let (addr, cycles) = self.write_addr(bus, mode);
        bus.write(addr, value & ((addr >> 8) as u8).wrapping_add(1));
        cycles
    }

    // =========================================================================
    // Interrupts
    // =========================================================================

    /// Push PC and status, set I, jump through `vector`. 7 cycles.
    ///
    /// Used for IRQ and NMI entry; the pushed status has B clear. The IRQ
    /// line itself is left untouched — clearing it is the interrupt
    /// source's job (for NES mappers, an explicit acknowledge register).
    fn service_interrupt(&mut self, bus: &mut impl Bus, vector: u16) -> u32 {
        self.push_word(bus, self.regs.pc);
        let status = self.regs.p.for_push(false);
        self.push(bus, status);
        self.regs.p.set(flags::I);
        self.regs.pc = self.read_word(bus, vector);
        7
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn execute(&mut self, bus: &mut impl Bus, opcode: u8) -> u32 {
        use Mode::{
            Absolute, AbsoluteX, AbsoluteY, Immediate, IndexedIndirect, IndirectIndexed, ZeroPage,
            ZeroPageX, ZeroPageY,
        };

        match opcode {
            // === Loads ===
            0xA9 => self.lda(bus, Immediate),
            0xA5 => self.lda(bus, ZeroPage),
            0xB5 => self.lda(bus, ZeroPageX),
            0xAD => self.lda(bus, Absolute),
            0xBD => self.lda(bus, AbsoluteX),
            0xB9 => self.lda(bus, AbsoluteY),
            0xA1 => self.lda(bus, IndexedIndirect),
            0xB1 => self.lda(bus, IndirectIndexed),

            0xA2 => self.ldx(bus, Immediate),
            0xA6 => self.ldx(bus, ZeroPage),
            0xB6 => self.ldx(bus, ZeroPageY),
            0xAE => self.ldx(bus, Absolute),
            0xBE => self.ldx(bus, AbsoluteY),

            0xA0 => self.ldy(bus, Immediate),
            0xA4 => self.ldy(bus, ZeroPage),
            0xB4 => self.ldy(bus, ZeroPageX),
            0xAC => self.ldy(bus, Absolute),
            0xBC => self.ldy(bus, AbsoluteX),

            // === Stores ===
            0x85 => self.store(bus, ZeroPage, self.regs.a),
            0x95 => self.store(bus, ZeroPageX, self.regs.a),
            0x8D => self.store(bus, Absolute, self.regs.a),
            0x9D => self.store(bus, AbsoluteX, self.regs.a),
            0x99 => self.store(bus, AbsoluteY, self.regs.a),
            0x81 => self.store(bus, IndexedIndirect, self.regs.a),
            0x91 => self.store(bus, IndirectIndexed, self.regs.a),

            0x86 => self.store(bus, ZeroPage, self.regs.x),
            0x96 => self.store(bus, ZeroPageY, self.regs.x),
            0x8E => self.store(bus, Absolute, self.regs.x),

            0x84 => self.store(bus, ZeroPage, self.regs.y),
            0x94 => self.store(bus, ZeroPageX, self.regs.y),
            0x8C => self.store(bus, Absolute, self.regs.y),

            // === Register transfers ===
            0xAA => {
                self.regs.x = self.regs.a;
                self.set_zn(self.regs.x);
                2
            }
            0xA8 => {
                self.regs.y = self.regs.a;
                self.set_zn(self.regs.y);
                2
            }
            0x8A => {
                self.regs.a = self.regs.x;
                self.set_zn(self.regs.a);
                2
            }
            0x98 => {
                self.regs.a = self.regs.y;
                self.set_zn(self.regs.a);
                2
            }
            0xBA => {
                self.regs.x = self.regs.s;
                self.set_zn(self.regs.x);
                2
            }
            0x9A => {
                // TXS does not touch flags.
                self.regs.s = self.regs.x;
                2
            }

            // === Stack ===
            0x48 => {
                self.push(bus, self.regs.a);
                3
            }
            0x08 => {
                let status = self.regs.p.for_push(true);
                self.push(bus, status);
                3
            }
            0x68 => {
                self.regs.a = self.pull(bus);
                self.set_zn(self.regs.a);
                4
            }
            0x28 => {
                let value = self.pull(bus);
                self.regs.p.restore(value);
                4
            }

            // === Logical ===
            0x29 => self.and(bus, Immediate),
            0x25 => self.and(bus, ZeroPage),
            0x35 => self.and(bus, ZeroPageX),
            0x2D => self.and(bus, Absolute),
            0x3D => self.and(bus, AbsoluteX),
            0x39 => self.and(bus, AbsoluteY),
            0x21 => self.and(bus, IndexedIndirect),
            0x31 => self.and(bus, IndirectIndexed),

            0x49 => self.eor(bus, Immediate),
            0x45 => self.eor(bus, ZeroPage),
            0x55 => self.eor(bus, ZeroPageX),
            0x4D => self.eor(bus, Absolute),
            0x5D => self.eor(bus, AbsoluteX),
            0x59 => self.eor(bus, AbsoluteY),
            0x41 => self.eor(bus, IndexedIndirect),
            0x51 => self.eor(bus, IndirectIndexed),

            0x09 => self.ora(bus, Immediate),
            0x05 => self.ora(bus, ZeroPage),
            0x15 => self.ora(bus, ZeroPageX),
            0x0D => self.ora(bus, Absolute),
            0x1D => self.ora(bus, AbsoluteX),
            0x19 => self.ora(bus, AbsoluteY),
            0x01 => self.ora(bus, IndexedIndirect),
            0x11 => self.ora(bus, IndirectIndexed),

            0x24 => {
                let (value, cycles) = self.read_operand(bus, ZeroPage);
                self.bit(value);
                cycles
            }
            0x2C => {
                let (value, cycles) = self.read_operand(bus, Absolute);
                self.bit(value);
                cycles
            }

            // === Arithmetic ===
            0x69 => self.adc_mode(bus, Immediate),
            0x65 => self.adc_mode(bus, ZeroPage),
            0x75 => self.adc_mode(bus, ZeroPageX),
            0x6D => self.adc_mode(bus, Absolute),
            0x7D => self.adc_mode(bus, AbsoluteX),
            0x79 => self.adc_mode(bus, AbsoluteY),
            0x61 => self.adc_mode(bus, IndexedIndirect),
            0x71 => self.adc_mode(bus, IndirectIndexed),

            0xE9 | 0xEB => self.sbc_mode(bus, Immediate),
            0xE5 => self.sbc_mode(bus, ZeroPage),
            0xF5 => self.sbc_mode(bus, ZeroPageX),
            0xED => self.sbc_mode(bus, Absolute),
            0xFD => self.sbc_mode(bus, AbsoluteX),
            0xF9 => self.sbc_mode(bus, AbsoluteY),
            0xE1 => self.sbc_mode(bus, IndexedIndirect),
            0xF1 => self.sbc_mode(bus, IndirectIndexed),

            // === Comparisons ===
            0xC9 => self.cmp_mode(bus, Immediate, self.regs.a),
            0xC5 => self.cmp_mode(bus, ZeroPage, self.regs.a),
            0xD5 => self.cmp_mode(bus, ZeroPageX, self.regs.a),
            0xCD => self.cmp_mode(bus, Absolute, self.regs.a),
            0xDD => self.cmp_mode(bus, AbsoluteX, self.regs.a),
            0xD9 => self.cmp_mode(bus, AbsoluteY, self.regs.a),
            0xC1 => self.cmp_mode(bus, IndexedIndirect, self.regs.a),
            0xD1 => self.cmp_mode(bus, IndirectIndexed, self.regs.a),

            0xE0 => self.cmp_mode(bus, Immediate, self.regs.x),
            0xE4 => self.cmp_mode(bus, ZeroPage, self.regs.x),
            0xEC => self.cmp_mode(bus, Absolute, self.regs.x),

            0xC0 => self.cmp_mode(bus, Immediate, self.regs.y),
            0xC4 => self.cmp_mode(bus, ZeroPage, self.regs.y),
            0xCC => self.cmp_mode(bus, Absolute, self.regs.y),

            // === Increments / decrements ===
            0xE6 => self.rmw(bus, ZeroPage, Self::inc_value),
            0xF6 => self.rmw(bus, ZeroPageX, Self::inc_value),
            0xEE => self.rmw(bus, Absolute, Self::inc_value),
            0xFE => self.rmw(bus, AbsoluteX, Self::inc_value),

            0xC6 => self.rmw(bus, ZeroPage, Self::dec_value),
            0xD6 => self.rmw(bus, ZeroPageX, Self::dec_value),
            0xCE => self.rmw(bus, Absolute, Self::dec_value),
            0xDE => self.rmw(bus, AbsoluteX, Self::dec_value),

            0xE8 => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.set_zn(self.regs.x);
                2
            }
            0xC8 => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.set_zn(self.regs.y);
                2
            }
            0xCA => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.set_zn(self.regs.x);
                2
            }
            0x88 => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.set_zn(self.regs.y);
                2
            }

            // === Shifts and rotates ===
            0x0A => {
                self.regs.a = self.asl(self.regs.a);
                2
            }
            0x06 => self.rmw(bus, ZeroPage, Self::asl),
            0x16 => self.rmw(bus, ZeroPageX, Self::asl),
            0x0E => self.rmw(bus, Absolute, Self::asl),
            0x1E => self.rmw(bus, AbsoluteX, Self::asl),

            0x4A => {
                self.regs.a = self.lsr(self.regs.a);
                2
            }
            0x46 => self.rmw(bus, ZeroPage, Self::lsr),
            0x56 => self.rmw(bus, ZeroPageX, Self::lsr),
            0x4E => self.rmw(bus, Absolute, Self::lsr),
            0x5E => self.rmw(bus, AbsoluteX, Self::lsr),

            0x2A => {
                self.regs.a = self.rol(self.regs.a);
                2
            }
            0x26 => self.rmw(bus, ZeroPage, Self::rol),
            0x36 => self.rmw(bus, ZeroPageX, Self::rol),
            0x2E => self.rmw(bus, Absolute, Self::rol),
            0x3E => self.rmw(bus, AbsoluteX, Self::rol),

            0x6A => {
                self.regs.a = self.ror(self.regs.a);
                2
            }
            0x66 => self.rmw(bus, ZeroPage, Self::ror),
            0x76 => self.rmw(bus, ZeroPageX, Self::ror),
            0x6E => self.rmw(bus, Absolute, Self::ror),
            0x7E => self.rmw(bus, AbsoluteX, Self::ror),

            // === Jumps and subroutines ===
            0x4C => {
                self.regs.pc = self.fetch_word(bus);
                3
            }
            0x6C => {
                let ptr = self.fetch_word(bus);
                self.regs.pc = self.read_word_no_carry(bus, ptr);
                5
            }
            0x20 => {
                let target = self.fetch_word(bus);
                let return_addr = self.regs.pc.wrapping_sub(1);
                self.push_word(bus, return_addr);
                self.regs.pc = target;
                6
            }
            0x60 => {
                self.regs.pc = self.pull_word(bus).wrapping_add(1);
                6
            }
            0x40 => {
                let status = self.pull(bus);
                self.regs.p.restore(status);
                self.regs.pc = self.pull_word(bus);
                6
            }

            // === Branches ===
            0x90 => self.branch(bus, !self.regs.p.is_set(flags::C)),
            0xB0 => self.branch(bus, self.regs.p.is_set(flags::C)),
            0xD0 => self.branch(bus, !self.regs.p.is_set(flags::Z)),
            0xF0 => self.branch(bus, self.regs.p.is_set(flags::Z)),
            0x10 => self.branch(bus, !self.regs.p.is_set(flags::N)),
            0x30 => self.branch(bus, self.regs.p.is_set(flags::N)),
            0x50 => self.branch(bus, !self.regs.p.is_set(flags::V)),
            0x70 => self.branch(bus, self.regs.p.is_set(flags::V)),

            // === Flag operations ===
            0x18 => {
                self.regs.p.clear(flags::C);
                2
            }
            0x38 => {
                self.regs.p.set(flags::C);
                2
            }
            0x58 => {
                self.regs.p.clear(flags::I);
                2
            }
            0x78 => {
                self.regs.p.set(flags::I);
                2
            }
            0xB8 => {
                self.regs.p.clear(flags::V);
                2
            }
            0xD8 => {
                self.regs.p.clear(flags::D);
                2
            }
            0xF8 => {
                self.regs.p.set(flags::D);
                2
            }

            // === BRK / NOP ===
            0x00 => {
                // BRK pushes PC+2 (the padding byte is fetched and skipped)
                // and the status with B set, then vectors through $FFFE.
                self.fetch(bus);
                self.push_word(bus, self.regs.pc);
                let status = self.regs.p.for_push(true);
                self.push(bus, status);
                self.regs.p.set(flags::I);
                self.regs.pc = self.read_word(bus, IRQ_VECTOR);
                7
            }
            0xEA | 0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA => 2,

            // === Illegal opcodes ===

            // LAX: load A and X together.
            0xA7 => self.lax(bus, ZeroPage),
            0xB7 => self.lax(bus, ZeroPageY),
            0xAF => self.lax(bus, Absolute),
            0xBF => self.lax(bus, AbsoluteY),
            0xA3 => self.lax(bus, IndexedIndirect),
            0xB3 => self.lax(bus, IndirectIndexed),
            0xAB => self.lax(bus, Immediate),

            // SAX: store A & X.
            0x87 => self.store(bus, ZeroPage, self.regs.a & self.regs.x),
            0x97 => self.store(bus, ZeroPageY, self.regs.a & self.regs.x),
            0x8F => self.store(bus, Absolute, self.regs.a & self.regs.x),
            0x83 => self.store(bus, IndexedIndirect, self.regs.a & self.regs.x),

            // SLO: ASL memory, ORA result.
            0x07 => self.rmw(bus, ZeroPage, Self::slo_value),
            0x17 => self.rmw(bus, ZeroPageX, Self::slo_value),
            0x0F => self.rmw(bus, Absolute, Self::slo_value),
            0x1F => self.rmw(bus, AbsoluteX, Self::slo_value),
            0x1B => self.rmw(bus, AbsoluteY, Self::slo_value),
            0x03 => self.rmw(bus, IndexedIndirect, Self::slo_value),
            0x13 => self.rmw(bus, IndirectIndexed, Self::slo_value),

            // RLA: ROL memory, AND result.
            0x27 => self.rmw(bus, ZeroPage, Self::rla_value),
            0x37 => self.rmw(bus, ZeroPageX, Self::rla_value),
            0x2F => self.rmw(bus, Absolute, Self::rla_value),
            0x3F => self.rmw(bus, AbsoluteX, Self::rla_value),
            0x3B => self.rmw(bus, AbsoluteY, Self::rla_value),
            0x23 => self.rmw(bus, IndexedIndirect, Self::rla_value),
            0x33 => self.rmw(bus, IndirectIndexed, Self::rla_value),

            // SRE: LSR memory, EOR result.
            0x47 => self.rmw(bus, ZeroPage, Self::sre_value),
            0x57 => self.rmw(bus, ZeroPageX, Self::sre_value),
            0x4F => self.rmw(bus, Absolute, Self::sre_value),
            0x5F => self.rmw(bus, AbsoluteX, Self::sre_value),
            0x5B => self.rmw(bus, AbsoluteY, Self::sre_value),
            0x43 => self.rmw(bus, IndexedIndirect, Self::sre_value),
            0x53 => self.rmw(bus, IndirectIndexed, Self::sre_value),

            // RRA: ROR memory, ADC result.
            0x67 => self.rmw(bus, ZeroPage, Self::rra_value),
            0x77 => self.rmw(bus, ZeroPageX, Self::rra_value),
            0x6F => self.rmw(bus, Absolute, Self::rra_value),
            0x7F => self.rmw(bus, AbsoluteX, Self::rra_value),
            0x7B => self.rmw(bus, AbsoluteY, Self::rra_value),
            0x63 => self.rmw(bus, IndexedIndirect, Self::rra_value),
            0x73 => self.rmw(bus, IndirectIndexed, Self::rra_value),

            // DCP: DEC memory, CMP result.
            0xC7 => self.rmw(bus, ZeroPage, Self::dcp_value),
            0xD7 => self.rmw(bus, ZeroPageX, Self::dcp_value),
            0xCF => self.rmw(bus, Absolute, Self::dcp_value),
            0xDF => self.rmw(bus, AbsoluteX, Self::dcp_value),
            0xDB => self.rmw(bus, AbsoluteY, Self::dcp_value),
            0xC3 => self.rmw(bus, IndexedIndirect, Self::dcp_value),
            0xD3 => self.rmw(bus, IndirectIndexed, Self::dcp_value),

            // ISC: INC memory, SBC result.
            0xE7 => self.rmw(bus, ZeroPage, Self::isc_value),
            0xF7 => self.rmw(bus, ZeroPageX, Self::isc_value),
            0xEF => self.rmw(bus, Absolute, Self::isc_value),
            0xFF => self.rmw(bus, AbsoluteX, Self::isc_value),
            0xFB => self.rmw(bus, AbsoluteY, Self::isc_value),
            0xE3 => self.rmw(bus, IndexedIndirect, Self::isc_value),
            0xF3 => self.rmw(bus, IndirectIndexed, Self::isc_value),

            // ANC: AND immediate, carry takes bit 7.
            0x0B | 0x2B => {
                let value = self.fetch(bus);
                self.regs.a &= value;
                self.set_zn(self.regs.a);
                self.regs.p.assign(flags::C, self.regs.a & 0x80 != 0);
                2
            }
            // ALR: AND immediate, then LSR A.
            0x4B => {
                let value = self.fetch(bus);
                self.regs.a &= value;
                self.regs.a = self.lsr(self.regs.a);
                2
            }
            // ARR: AND immediate, then ROR A with its own flag rules.
            0x6B => {
                let value = self.fetch(bus);
                let and = self.regs.a & value;
                let carry_in = if self.regs.p.is_set(flags::C) { 0x80 } else { 0 };
                let result = (and >> 1) | carry_in;
                self.regs.a = result;
                self.set_zn(result);
                self.regs.p.assign(flags::C, result & 0x40 != 0);
                self.regs
                    .p
                    .assign(flags::V, ((result >> 6) ^ (result >> 5)) & 1 != 0);
                2
            }
            // SBX (AXS): X = (A & X) - immediate, carry set like CMP.
            0xCB => {
                let value = self.fetch(bus);
                let operand = self.regs.a & self.regs.x;
                self.regs.p.assign(flags::C, operand >= value);
                self.regs.x = operand.wrapping_sub(value);
                self.set_zn(self.regs.x);
                2
            }
            // XAA: unstable; the stable subset behaves as A = X & immediate.
            0x8B => {
                let value = self.fetch(bus);
                self.regs.a = self.regs.x & value;
                self.set_zn(self.regs.a);
                2
            }
            // LAS: A, X and S all take memory & S.
            0xBB => {
                let (value, cycles) = self.read_operand(bus, AbsoluteY);
                let result = value & self.regs.s;
                self.regs.a = result;
                self.regs.x = result;
                self.regs.s = result;
                self.set_zn(result);
                cycles
            }

            // SHA/SHX/SHY/TAS: stores corrupted by the address high byte.
            0x9F => self.store_high_and(bus, AbsoluteY, self.regs.a & self.regs.x),
            0x93 => self.store_high_and(bus, IndirectIndexed, self.regs.a & self.regs.x),
            0x9E => self.store_high_and(bus, AbsoluteY, self.regs.x),
            0x9C => self.store_high_and(bus, AbsoluteX, self.regs.y),
            0x9B => {
                self.regs.s = self.regs.a & self.regs.x;
                self.store_high_and(bus, AbsoluteY, self.regs.a & self.regs.x)
            }

            // Illegal NOPs with an operand fetch.
            0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 => self.nop_read(bus, Immediate),
            0x04 | 0x44 | 0x64 => self.nop_read(bus, ZeroPage),
            0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 => self.nop_read(bus, ZeroPageX),
            0x0C => self.nop_read(bus, Absolute),
            0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => self.nop_read(bus, AbsoluteX),

            // JAM: the CPU wedges until reset.
            0x02 | 0x12 | 0x22 | 0x32 | 0x42 | 0x52 | 0x62 | 0x72 | 0x92 | 0xB2 | 0xD2 | 0xF2 => {
                self.halted = true;
                2
            }
        }
    }
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Bus> Cpu<B> for Mos6502 {
    fn step(&mut self, bus: &mut B) -> u32 {
        if self.halted {
            return 2;
        }

        // Interrupts are taken at instruction boundaries. NMI wins over IRQ;
        // the IRQ level is re-checked every boundary, so an interrupt
        // deferred by the I flag fires as soon as the flag clears (and never
        // fires once the source has been acknowledged).
        if self.nmi_pending {
            self.nmi_pending = false;
            return self.service_interrupt(bus, NMI_VECTOR);
        }
        if self.irq_line && !self.regs.p.is_set(flags::I) {
            return self.service_interrupt(bus, IRQ_VECTOR);
        }

        let opcode = self.fetch(bus);
        self.execute(bus, opcode)
    }

    fn reset(&mut self, bus: &mut B) {
        self.regs = Registers::new();
        self.regs.pc = self.read_word(bus, RESET_VECTOR);
        self.nmi_pending = false;
        self.irq_line = false;
        self.halted = false;
    }

    fn set_irq_line(&mut self, asserted: bool) {
        self.irq_line = asserted;
    }

    fn nmi(&mut self) {
        self.nmi_pending = true;
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }
}
