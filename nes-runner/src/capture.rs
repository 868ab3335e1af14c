//! Headless capture: PNG screenshots of the framebuffer.

use std::error::Error;
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use nes_core::{Console, FB_HEIGHT, FB_WIDTH};

/// Save the current framebuffer as an RGBA8 PNG.
pub fn save_screenshot(console: &Console, path: &Path) -> Result<(), Box<dyn Error>> {
    let file = fs::File::create(path)?;
    let writer = BufWriter::new(file);
    let mut encoder = png::Encoder::new(writer, FB_WIDTH as u32, FB_HEIGHT as u32);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut png_writer = encoder.write_header()?;

    let mut rgba = Vec::with_capacity(FB_WIDTH * FB_HEIGHT * 4);
    for &argb in console.frame_buffer().iter() {
        rgba.push((argb >> 16) as u8);
        rgba.push((argb >> 8) as u8);
        rgba.push(argb as u8);
        rgba.push(0xFF);
    }

    png_writer.write_image_data(&rgba)?;
    Ok(())
}
