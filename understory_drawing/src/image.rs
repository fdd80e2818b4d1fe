// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::DrawingError;

/// Immutable image pixels carried by [`Command::Image`](crate::Command::Image).
///
/// Each pixel is one packed `0xAARRGGBB` word with straight (non
/// premultiplied) alpha, stored row-major with no row padding.
///
/// Pixel data is reference counted, so cloning a buffer (and therefore a
/// command that carries it) does not copy pixels.
///
/// Deserialization applies the same pixel count check as
/// [`PixelBuffer::new`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPixelBuffer")]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Arc<[u32]>,
}

#[derive(Deserialize)]
struct RawPixelBuffer {
    width: u32,
    height: u32,
    data: Arc<[u32]>,
}

impl TryFrom<RawPixelBuffer> for PixelBuffer {
    type Error = DrawingError;

    fn try_from(raw: RawPixelBuffer) -> Result<Self, DrawingError> {
        Self::new(raw.width, raw.height, raw.data)
    }
}

impl PixelBuffer {
    /// Create a pixel buffer, checking that `data` holds exactly
    /// `width * height` pixels.
    pub fn new(width: u32, height: u32, data: impl Into<Arc<[u32]>>) -> Result<Self, DrawingError> {
        let data = data.into();
        let expected = u64::from(width) * u64::from(height);
        if u64::try_from(data.len()).ok() != Some(expected) {
            return Err(DrawingError::PixelCount {
                width,
                height,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a buffer filled with a single packed color.
    ///
    /// Fails with [`DrawingError::ImageTooLarge`] when `width * height` does
    /// not fit in memory on this target.
    pub fn filled(width: u32, height: u32, argb: u32) -> Result<Self, DrawingError> {
        let len = usize::try_from(u64::from(width) * u64::from(height))
            .map_err(|_| DrawingError::ImageTooLarge { width, height })?;
        Self::new(width, height, vec![argb; len])
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed `0xAARRGGBB` pixels, row-major.
    pub fn pixels(&self) -> &[u32] {
        &self.data
    }

    /// Returns `true` if the buffer has no pixels.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Unpack into tightly packed RGBA8 bytes.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * 4);
        for pixel in self.data.iter() {
            let [a, r, g, b] = pixel.to_be_bytes();
            out.extend_from_slice(&[r, g, b, a]);
        }
        out
    }
}
