//! Test fixtures: small generated photos and named selections

#![allow(dead_code)]

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use photoshoot::models::image::SourceImage;

/// Three styles standing in for jobs A, B and C.
pub const JOB_A: &str = "Smiling Portrait";
pub const JOB_B: &str = "Walking Pose";
pub const JOB_C: &str = "Candid Moment";

/// Encode a flat-colored PNG.
pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("PNG encoding failed");
    out
}

/// The uploaded photo used throughout the tests.
pub fn source_photo() -> SourceImage {
    SourceImage::from_bytes(png_bytes(64, 64, [180, 140, 120])).expect("fixture must be valid")
}
