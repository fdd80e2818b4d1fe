// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_drawing --heading-base-level=0

//! Understory Drawing: a retained, backend-agnostic 2D drawing command buffer.
//!
//! A [`CommandBuffer`] records an ordered log of drawing [`Command`]s (paths,
//! transforms, styles, text, images, gradients, and layer markers). The log is
//! built once and can then be replayed by any number of interpreters, each
//! targeting a different backend:
//!
//! - `understory_drawing_canvas` replays into an immediate-mode canvas API.
//! - `understory_drawing_svg` replays into a standalone SVG document.
//!
//! The buffer itself never renders anything and performs no I/O.
//!
//! # Core concepts
//!
//! - **Commands**: a closed vocabulary ([`Command`]) of tagged records with
//!   primitive arguments. Commands are immutable once appended; only whole
//!   buffer operations ([`CommandBuffer::clear`], [`CommandBuffer::copy_from`],
//!   [`CommandBuffer::add`]) change existing content.
//! - **Save depth**: the buffer counts unmatched `save` commands. Balanced
//!   buffers have a depth of zero; [`CommandBuffer::copy_from`] refuses to run
//!   otherwise.
//! - **Gradients**: a [`LinearGradient`] records its own declaration and color
//!   stops. Installing it as a fill style splices that sub-sequence into the
//!   consuming buffer, followed by a reference to its [`GradientId`].
//! - **Handles**: gradient and image handles come from a [`HandleAllocator`],
//!   an explicitly owned pair of atomic counters. Buffers share the process
//!   allocator unless given their own.
//! - **Layers**: an optional [`LayerStorage`] collaborator caches sub-sequences
//!   of commands under a [`LayerId`] so they can be drawn again without
//!   re-recording. Interpreters resolve cached layers through [`LayerSource`].
//!
//! # Example
//!
//! ```
//! use understory_drawing::CommandBuffer;
//!
//! let mut buffer = CommandBuffer::new();
//! buffer.with_saved(|b| {
//!     b.begin_path();
//!     b.rect(10.0, 20.0, 30.0, 40.0);
//!     b.set_fill_style("#3875D6");
//!     b.fill();
//! });
//! assert_eq!(buffer.save_depth(), 0);
//! assert_eq!(buffer.len(), 6);
//! ```
//!
//! # Features
//!
//! - `std` (default): the `Mutex`-shared layer storage on [`CommandBuffer`]
//!   and wall-clock latency markers. Without it the crate is `no_std` and
//!   needs only `alloc`.
//!
//! # Concurrency
//!
//! A buffer is not internally synchronized. Appends to a given buffer must be
//! serialized by the caller, and a buffer must not be replayed while it is
//! still being appended to. Handle allocation is the only shared mutable
//! resource and is safe to use from any number of threads.

#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod buffer;
mod command;
mod error;
mod gradient;
mod handles;
mod image;
mod layer;

pub use buffer::{CommandBuffer, FillStyle, SaveGuard};
#[cfg(feature = "std")]
pub use buffer::{LayerGuard, SharedLayerStorage};
pub use command::{Command, GradientId, ImageId};
pub use error::DrawingError;
pub use gradient::LinearGradient;
pub use handles::HandleAllocator;
pub use image::PixelBuffer;
pub use layer::{LayerCache, LayerId, LayerSource, LayerStorage, visit_commands};
