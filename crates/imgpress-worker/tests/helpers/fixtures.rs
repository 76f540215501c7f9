//! Test fixtures: real encoded images and placeholder files.

use image::{ImageFormat, Rgb, RgbImage};
use imgpress_core::ImageFile;
use std::io::Cursor;

/// PNG with a color gradient so compression has something to chew on
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("encode test png");
    buffer
}

pub fn png_file(name: &str) -> ImageFile {
    ImageFile::new(name, "image/png", create_test_png(64, 48))
}

/// File the mocks accept without decoding
pub fn fake_file(name: &str) -> ImageFile {
    ImageFile::new(name, "image/png", vec![7u8; 100])
}

pub fn text_file(name: &str) -> ImageFile {
    ImageFile::new(name, "text/plain", b"hello".to_vec())
}
