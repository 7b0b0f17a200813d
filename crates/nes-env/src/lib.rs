//! Headless, deterministic frame-step NES emulation environment.
//!
//! The environment is driven one frame at a time: the caller supplies a
//! joypad bitmask, [`Nes::step`] advances the machine exactly one rendered
//! frame, and the palette-indexed framebuffer comes back for inspection.
//! There is no window, no audio output and no real-time pacing — the
//! caller owns the loop, which makes the core suitable for automated
//! agents and test scripts.
//!
//! Timing: the master clock ticks at the NTSC crystal (21,477,272 Hz).
//! The PPU ticks at crystal/4 and the CPU at crystal/12, the hardware
//! 3:1 dot-to-cycle ratio. One frame is 341 dots × 262 scanlines.

pub mod capture;

mod apu;
mod bus;
mod controller;
mod joypad;
mod nes;
mod palette;
mod ppu;

pub use apu::Apu;
pub use bus::NesBus;
pub use controller::Controller;
pub use joypad::JoypadButtons;
pub use nes::Nes;
pub use palette::MASTER_PALETTE;
pub use ppu::{FB_HEIGHT, FB_WIDTH, FrameBuffer, Ppu};
