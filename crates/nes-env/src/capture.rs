//! Headless capture: PNG screenshots.
//!
//! The framebuffer holds palette indices, not colours, so captures are
//! written as indexed-colour PNGs with the NES master palette in the
//! PLTE chunk. Viewers resolve the colours; the pixel data on disk stays
//! byte-for-byte comparable with the framebuffer.

use std::error::Error;
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use crate::palette::MASTER_PALETTE;
use crate::ppu::{FB_HEIGHT, FB_WIDTH, FrameBuffer};

/// Save a framebuffer as an indexed-colour PNG.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_png(frame: &FrameBuffer, path: &Path) -> Result<(), Box<dyn Error>> {
    let file = fs::File::create(path)?;
    let w = BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, FB_WIDTH as u32, FB_HEIGHT as u32);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);

    let mut plte = Vec::with_capacity(MASTER_PALETTE.len() * 3);
    for rgb in &MASTER_PALETTE {
        plte.extend_from_slice(rgb);
    }
    encoder.set_palette(plte);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(frame.as_slice())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ppu::Ppu;

    #[test]
    fn writes_a_png_file() {
        let ppu = Ppu::new();
        let path = std::env::temp_dir().join("nes-env-capture-test.png");
        save_png(ppu.frame(), &path).expect("capture should succeed");

        let data = fs::read(&path).expect("file should exist");
        assert_eq!(&data[1..4], b"PNG");
        fs::remove_file(&path).ok();
    }
}
