// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;
use alloc::vec::Vec;

use base64ct::{Base64, Encoding};
use understory_drawing::PixelBuffer;

/// Failure to embed an image in the document.
#[derive(thiserror::Error, Debug)]
pub enum ImageEncodeError {
    /// The image has no pixels.
    #[error("cannot encode an empty {width}x{height} image")]
    Empty {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },
    /// The PNG encoder failed.
    #[error("PNG encoding failed")]
    Png(#[from] png::EncodingError),
}

/// Encode `image` as a `data:image/png;base64,…` URI.
pub fn png_data_uri(image: &PixelBuffer) -> Result<String, ImageEncodeError> {
    let png = encode_png(image)?;
    let mut uri = String::from("data:image/png;base64,");
    uri.push_str(&Base64::encode_string(&png));
    Ok(uri)
}

fn encode_png(image: &PixelBuffer) -> Result<Vec<u8>, ImageEncodeError> {
    if image.is_empty() {
        return Err(ImageEncodeError::Empty {
            width: image.width(),
            height: image.height(),
        });
    }
    let mut out = Vec::new();
    let mut encoder = png::Encoder::new(&mut out, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&image.to_rgba8())?;
    writer.finish()?;
    Ok(out)
}
