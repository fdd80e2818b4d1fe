// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Errors reported by [`CommandBuffer`](crate::CommandBuffer) and its helpers.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum DrawingError {
    /// A whole-buffer replacement was attempted while a save/restore scope
    /// was still open on either side.
    #[error(
        "unbalanced save/restore: target depth {target_depth}, source depth {source_depth}"
    )]
    UnbalancedSave {
        /// Save depth of the buffer being replaced.
        target_depth: i32,
        /// Save depth of the buffer being copied from.
        source_depth: i32,
    },
    /// Pixel data does not match the declared image dimensions.
    #[error("expected {width}x{height} pixels, got {actual}")]
    PixelCount {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Number of pixels supplied.
        actual: usize,
    },
    /// An image has more pixels than this target can address.
    #[error("a {width}x{height} image does not fit in memory")]
    ImageTooLarge {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },
}
