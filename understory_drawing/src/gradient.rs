// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::command::{Command, GradientId};
use crate::handles::HandleAllocator;

/// A linear gradient under construction.
///
/// A gradient records its own declaration followed by its color stops. It is
/// committed into a buffer with
/// [`CommandBuffer::set_fill_style`](crate::CommandBuffer::set_fill_style), which
/// appends the recorded commands and then a reference to [`LinearGradient::id`].
///
/// Interpreters attach color stops to the most recently declared gradient, so
/// add every stop before installing the gradient, and install it before
/// declaring another gradient in the same buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    id: GradientId,
    commands: Vec<Command>,
}

impl LinearGradient {
    /// Declare a gradient from `(x1, y1)` to `(x2, y2)` inside a
    /// `width` × `height` reference box.
    pub fn new(
        allocator: &HandleAllocator,
        width: f64,
        height: f64,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    ) -> Self {
        let id = allocator.next_gradient();
        Self {
            id,
            commands: vec![Command::Gradient {
                gradient: id,
                width,
                height,
                x1,
                y1,
                x2,
                y2,
            }],
        }
    }

    /// Add a color stop at `offset` (in `0..=1`).
    pub fn add_color_stop(&mut self, offset: f64, color: impl Into<String>) -> &mut Self {
        self.commands.push(Command::ColorStop {
            gradient: self.id,
            offset,
            color: color.into(),
        });
        self
    }

    /// Handle of this gradient.
    pub fn id(&self) -> GradientId {
        self.id
    }

    /// The declaration and color stop commands recorded so far.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}
