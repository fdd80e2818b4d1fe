// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::sync::atomic::{AtomicU64, Ordering};

use crate::command::{GradientId, ImageId};

static SHARED: HandleAllocator = HandleAllocator::new();

/// Monotonic source of gradient and image handles.
///
/// Each counter is advanced with a single atomic increment, so handles stay
/// unique even when gradients or images are constructed from several threads
/// at once. The first handle of each kind is `1`.
///
/// Most callers use the process-wide allocator from [`HandleAllocator::shared`],
/// which every [`CommandBuffer::new`](crate::CommandBuffer::new) buffer draws
/// from. Buffers that are rendered together must draw their handles from the
/// same allocator.
#[derive(Debug)]
pub struct HandleAllocator {
    next_gradient: AtomicU64,
    next_image: AtomicU64,
}

impl HandleAllocator {
    /// Create a fresh allocator whose first handles are `1`.
    pub const fn new() -> Self {
        Self {
            next_gradient: AtomicU64::new(1),
            next_image: AtomicU64::new(1),
        }
    }

    /// Returns the process-wide allocator.
    pub fn shared() -> &'static Self {
        &SHARED
    }

    /// Issue the next gradient handle.
    pub fn next_gradient(&self) -> GradientId {
        GradientId(self.next_gradient.fetch_add(1, Ordering::Relaxed))
    }

    /// Issue the next image handle.
    pub fn next_image(&self) -> ImageId {
        ImageId(self.next_image.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}
