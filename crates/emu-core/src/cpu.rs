//! CPU core trait.

use crate::Bus;

/// A CPU core.
///
/// CPUs are instruction-stepped: `step` runs one whole instruction (or one
/// interrupt sequence) and reports how many cycles it consumed. The machine
/// scheduler uses the cycle count to keep slower instructions interleaved
/// correctly with other components.
///
/// Interrupt inputs follow the hardware signal shapes: the IRQ pin is a
/// level (the caller re-supplies it every CPU cycle and the source holds it
/// until acknowledged on the device side), while NMI is an edge that stays
/// latched until serviced.
pub trait Cpu<B: Bus> {
    /// Execute one instruction. Returns cycles consumed.
    fn step(&mut self, bus: &mut B) -> u32;

    /// Reset the CPU to its initial state (reads the reset vector).
    fn reset(&mut self, bus: &mut B);

    /// Supply the current level of the IRQ line.
    ///
    /// Sampled at the next instruction boundary; when the interrupt-disable
    /// flag is set the interrupt is deferred, not dropped, for as long as
    /// the line stays asserted. Servicing an IRQ never deasserts the line —
    /// that is the interrupt source's responsibility.
    fn set_irq_line(&mut self, asserted: bool);

    /// Signal a non-maskable interrupt (latched edge).
    fn nmi(&mut self);

    /// Current program counter.
    fn pc(&self) -> u16;
}
