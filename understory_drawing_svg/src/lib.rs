// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_drawing_svg --heading-base-level=0

//! SVG replay for Understory drawing command buffers.
//!
//! [`render_svg`] translates a recorded command sequence into a standalone
//! SVG document in a single forward pass. Clip paths and gradients are written
//! to `<defs>`; paths, text and images are written to the body.
//!
//! ```
//! use kurbo::{Rect, Size};
//! use understory_drawing::CommandBuffer;
//! use understory_drawing_svg::{SvgDocument, render_svg};
//!
//! let mut buffer = CommandBuffer::new();
//! buffer.begin_path();
//! buffer.rect(10.0, 20.0, 30.0, 40.0);
//! buffer.set_fill_style("#3875D6");
//! buffer.fill();
//!
//! let document = SvgDocument::new(Size::new(64.0, 64.0), Rect::new(0.0, 0.0, 64.0, 64.0));
//! let svg = render_svg(buffer.commands(), &document);
//! assert!(svg.contains(r##"<path d="M 10 20 L 40 20 L 40 60 L 10 60 Z" fill="#3875D6""##));
//! ```
//!
//! Notes:
//! - Each `save` snapshots the whole graphics state, including the current
//!   path, and `restore` closes the clip groups opened since.
//! - Transforms are kept as a list of SVG transform functions in the order
//!   they were applied and attached to every element drawn under them.
//! - `fill` and `stroke` draw nothing until a fill or stroke style is set.
//! - Arcs are converted to cubic Béziers.
//! - Images are embedded as base64 PNG data URIs. PNG encoding needs the
//!   `std` feature (on by default); without it images are drawn as
//!   placeholder rectangles.
//! - The `max_width` of `fill-text` is not supported.
//! - Gradient color stops attach to the most recently declared gradient.
//!
//! The crate is `no_std` with `alloc`. Enable `libm` instead of `std` for
//! float maths on targets without the standard library.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
mod image;
mod renderer;
mod state;

#[cfg(feature = "std")]
pub use image::{ImageEncodeError, png_data_uri};
pub use renderer::SvgRenderer;
pub use state::{FontFace, FontSize, FontUnit, GraphicsState, PathData};

use alloc::string::String;

use kurbo::{Rect, Size};
use understory_drawing::{Command, LayerSource};

/// Document-level options supplied at render time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SvgDocument {
    /// Width and height attributes of the root element.
    pub size: Size,
    /// The user-space rectangle mapped onto `size`.
    pub view_box: Rect,
}

impl SvgDocument {
    /// Create document options.
    pub fn new(size: Size, view_box: Rect) -> Self {
        Self { size, view_box }
    }

    /// Options for a document whose view box matches its size.
    pub fn from_size(size: Size) -> Self {
        Self::new(size, size.to_rect())
    }
}

/// Render `commands` as an SVG document.
///
/// `draw-layer` markers are skipped; use [`render_svg_with_layers`] to expand
/// them.
#[tracing::instrument(level = "debug", skip_all, fields(commands = commands.len()))]
pub fn render_svg(commands: &[Command], document: &SvgDocument) -> String {
    let mut renderer = SvgRenderer::new();
    renderer.replay(commands);
    renderer.finish(document)
}

/// Render `commands` as an SVG document, drawing cached layers from `layers`
/// at each `draw-layer` marker.
#[tracing::instrument(level = "debug", skip_all, fields(commands = commands.len()))]
pub fn render_svg_with_layers(
    commands: &[Command],
    layers: &dyn LayerSource,
    document: &SvgDocument,
) -> String {
    let mut renderer = SvgRenderer::with_layers(layers);
    renderer.replay(commands);
    renderer.finish(document)
}
