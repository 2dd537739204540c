//! Download, decode and rank candidate images.

pub mod select;
pub mod validate;

/// Smallest width a validated image may have.
pub const MIN_WIDTH: u32 = 300;
/// Smallest height a validated image may have.
pub const MIN_HEIGHT: u32 = 200;

pub use select::select;
pub use validate::{Rejection, validate};

#[cfg(test)]
pub(crate) mod testing {
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    /// PNG bytes of a solid image with the given size.
    pub fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }
}
