//! Boot-path tests on hand-assembled NROM images.
//!
//! The first ROM does nothing but the standard power-on dance (SEI, CLD,
//! stack init, two $2002 VBlank polls) and parks in an idle loop; if the
//! CPU gets there, reset-vector dispatch and VBlank reporting work. The
//! second ROM writes text tiles into the nametable and enables rendering,
//! pinning the PPU's background pipeline to exact palette indices.

use nes_env::{JoypadButtons, Nes};

const PRG_SIZE: usize = 32768;
const CHR_SIZE: usize = 8192;

/// NROM header + zeroed PRG/CHR, reset vector at $8000.
fn blank_nrom() -> Vec<u8> {
    let mut rom = vec![0u8; 16 + PRG_SIZE + CHR_SIZE];
    rom[0..4].copy_from_slice(b"NES\x1A");
    rom[4] = 2; // 32K PRG
    rom[5] = 1; // 8K CHR
    rom[16 + 0x7FFC] = 0x00;
    rom[16 + 0x7FFD] = 0x80;
    rom
}

fn build_boot_rom() -> Vec<u8> {
    let mut rom = blank_nrom();

    #[rustfmt::skip]
    let code: &[u8] = &[
        0x78,             // $8000  SEI
        0xD8,             // $8001  CLD
        0xA2, 0xFF,       // $8002  LDX #$FF
        0x9A,             // $8004  TXS
        0xAD, 0x02, 0x20, // $8005  LDA $2002    ; VBlank wait 1
        0x10, 0xFB,       // $8008  BPL $8005
        0xAD, 0x02, 0x20, // $800A  LDA $2002    ; VBlank wait 2
        0x10, 0xFB,       // $800D  BPL $800A
        0x4C, 0x0F, 0x80, // $800F  JMP $800F    ; idle
    ];
    rom[16..16 + code.len()].copy_from_slice(code);

    // NMI and IRQ never fire (CTRL untouched, I set), but point the
    // vectors somewhere harmless anyway.
    rom[16 + 0x7FFA] = 0x0F;
    rom[16 + 0x7FFB] = 0x80;
    rom[16 + 0x7FFE] = 0x0F;
    rom[16 + 0x7FFF] = 0x80;

    rom
}

#[test]
fn boots_through_vblank_polling_to_idle() {
    let mut nes = Nes::from_ines(&build_boot_rom()).expect("valid boot ROM");
    assert_eq!(nes.cpu().regs.pc, 0x8000, "reset vector dispatch");

    // Two VBlank waits need about two frames; give it five. The PC can
    // be sampled mid-instruction, so accept any byte of the JMP.
    let idle = 0x800F..=0x8011;
    for _ in 0..5 {
        nes.step(JoypadButtons::empty());
        if idle.contains(&nes.cpu().regs.pc) {
            return;
        }
    }
    panic!("never reached idle loop, stuck at ${:04X}", nes.cpu().regs.pc);
}

/// Init, palette load, "HI" written at nametable row 14 col 12, then
/// rendering on and idle.
fn build_render_rom() -> Vec<u8> {
    let mut rom = blank_nrom();

    #[rustfmt::skip]
    let code: &[u8] = &[
        0x78,             // $8000  SEI
        0xD8,             // $8001  CLD
        0xA2, 0xFF,       // $8002  LDX #$FF
        0x9A,             // $8004  TXS
        0xA9, 0x00,       // $8005  LDA #$00
        0x8D, 0x01, 0x20, // $8007  STA $2001    ; rendering off for setup
        0xAD, 0x02, 0x20, // $800A  LDA $2002    ; VBlank wait 1
        0x10, 0xFB,       // $800D  BPL $800A
        0xAD, 0x02, 0x20, // $800F  LDA $2002    ; VBlank wait 2
        0x10, 0xFB,       // $8012  BPL $800F
        0xAD, 0x02, 0x20, // $8014  LDA $2002    ; reset address latch
        0xA9, 0x3F,       // $8017  LDA #$3F
        0x8D, 0x06, 0x20, // $8019  STA $2006
        0xA9, 0x00,       // $801C  LDA #$00
        0x8D, 0x06, 0x20, // $801E  STA $2006    ; PPU address = $3F00
        0xA2, 0x00,       // $8021  LDX #$00
        0xBD, 0x5A, 0x80, // $8023  LDA $805A,X  ; palette table
        0x8D, 0x07, 0x20, // $8026  STA $2007
        0xE8,             // $8029  INX
        0xE0, 0x04,       // $802A  CPX #$04
        0xD0, 0xF5,       // $802C  BNE $8023
        0xA9, 0x21,       // $802E  LDA #$21
        0x8D, 0x06, 0x20, // $8030  STA $2006
        0xA9, 0xCC,       // $8033  LDA #$CC
        0x8D, 0x06, 0x20, // $8035  STA $2006    ; nametable row 14, col 12
        0xA2, 0x00,       // $8038  LDX #$00
        0xBD, 0x5E, 0x80, // $803A  LDA $805E,X  ; text tiles
        0x8D, 0x07, 0x20, // $803D  STA $2007
        0xE8,             // $8040  INX
        0xE0, 0x02,       // $8041  CPX #$02
        0xD0, 0xF5,       // $8043  BNE $803A
        0xA9, 0x00,       // $8045  LDA #$00
        0x8D, 0x05, 0x20, // $8047  STA $2005
        0x8D, 0x05, 0x20, // $804A  STA $2005    ; scroll (0, 0)
        0xA9, 0x1E,       // $804D  LDA #$1E
        0x8D, 0x01, 0x20, // $804F  STA $2001    ; rendering on
        0xA9, 0x80,       // $8052  LDA #$80
        0x8D, 0x00, 0x20, // $8054  STA $2000    ; NMI on, BG table 0
        0x4C, 0x57, 0x80, // $8057  JMP $8057    ; idle
        // $805A palette: backdrop $0F, then $30/$10/$00
        0x0F, 0x30, 0x10, 0x00,
        // $805E text: tiles 1 ("H"), 2 ("I")
        0x01, 0x02,
        // $8060 RTI — NMI/IRQ handler
        0x40,
    ];
    rom[16..16 + code.len()].copy_from_slice(code);

    rom[16 + 0x7FFA] = 0x60; // NMI -> $8060 RTI
    rom[16 + 0x7FFB] = 0x80;
    rom[16 + 0x7FFE] = 0x60;
    rom[16 + 0x7FFF] = 0x80;

    // CHR tiles 1 and 2: bitplane 0 carries the glyph, bitplane 1 stays
    // zero, so lit pixels use palette index 1.
    let chr = 16 + PRG_SIZE;
    #[rustfmt::skip]
    let h_tile: [u8; 8] = [0x88, 0x88, 0x88, 0xF8, 0x88, 0x88, 0x88, 0x00];
    #[rustfmt::skip]
    let i_tile: [u8; 8] = [0xF8, 0x20, 0x20, 0x20, 0x20, 0x20, 0xF8, 0x00];
    rom[chr + 16..chr + 24].copy_from_slice(&h_tile);
    rom[chr + 32..chr + 40].copy_from_slice(&i_tile);

    rom
}

#[test]
fn renders_background_tiles_to_expected_palette_indices() {
    let mut nes = Nes::from_ines(&build_render_rom()).expect("valid render ROM");

    // Two frames of VBlank waits, one for setup, and a couple rendered.
    for _ in 0..6 {
        nes.step(JoypadButtons::empty());
    }

    let frame = nes.frame();

    // Tile 0 everywhere else: the backdrop colour ($3F00 = $0F).
    assert_eq!(frame.pixel(0, 0), 0x0F, "backdrop palette index");

    // Row 14 col 12 of the nametable = pixel (96, 112). The 'H' glyph
    // has bit 7 of row 0 set, so its top-left pixel is palette index 1,
    // which the palette maps to $30.
    assert_eq!(frame.pixel(96, 112), 0x30, "glyph pixel palette index");

    // Frame is stable between steps.
    let pixel_before = nes.frame().pixel(96, 112);
    nes.step(JoypadButtons::empty());
    assert_eq!(nes.frame().pixel(96, 112), pixel_before);
}
