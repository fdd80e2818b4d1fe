// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_drawing_canvas --heading-base-level=0

//! Canvas 2D replay for Understory drawing command buffers.
//!
//! [`replay`] walks a recorded command sequence and issues one call per
//! command against a [`CanvasContext`], the immediate-mode seam implemented by
//! a concrete canvas. [`ScriptCanvas`] is a context that renders those calls as
//! canvas 2D JavaScript statements, ready to embed in a page.
//!
//! ```
//! use understory_drawing::CommandBuffer;
//! use understory_drawing_canvas::to_script;
//!
//! let mut buffer = CommandBuffer::new();
//! buffer.rect(10.0, 20.0, 30.0, 40.0);
//! buffer.set_fill_style("#3875D6");
//! buffer.fill();
//!
//! let script = to_script(buffer.commands());
//! assert!(script.contains("ctx.rect(10, 20, 30, 40);"));
//! assert!(script.contains("ctx.fill();"));
//! ```
//!
//! Notes:
//! - `fill` and `stroke` are only issued once a fill or stroke style has been
//!   set in the current save scope; a buffer that never sets one draws nothing.
//! - Images are reduced to their destination rectangle by default. A canvas
//!   able to blit pixels overrides [`CanvasContext::draw_image`].
//! - Instrumentation (`sleep`, `mark-latency`, `statistics-marker`) and layer
//!   boundary markers produce no calls.
//! - Gradient color stops attach to the most recently declared gradient.

mod script;

pub use script::{ScriptCanvas, to_script, to_script_with_layers};

use understory_drawing::{Command, GradientId, LayerSource, PixelBuffer, visit_commands};

/// An immediate-mode 2D canvas that commands are replayed into.
///
/// The methods mirror the canvas 2D API. Angles are in radians.
pub trait CanvasContext {
    /// Push the drawing state.
    fn save(&mut self);
    /// Pop the drawing state.
    fn restore(&mut self);
    /// Start a new path.
    fn begin_path(&mut self);
    /// Close the current subpath.
    fn close_path(&mut self);
    /// Start a subpath at `(x, y)`.
    fn move_to(&mut self, x: f64, y: f64);
    /// Add a line to `(x, y)`.
    fn line_to(&mut self, x: f64, y: f64);
    /// Add a rectangle subpath.
    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    /// Add a circular arc.
    fn arc(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        counterclockwise: bool,
    );
    /// Add a tangent arc.
    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64);
    /// Intersect the clip region with a rectangle.
    fn clip_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    /// Translate the current transform.
    fn translate(&mut self, x: f64, y: f64);
    /// Scale the current transform.
    fn scale(&mut self, x: f64, y: f64);
    /// Rotate the current transform by `radians`.
    fn rotate(&mut self, radians: f64);
    /// Stroke the current path.
    fn stroke(&mut self);
    /// Fill the current path.
    fn fill(&mut self);
    /// Draw text at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f64, y: f64, max_width: Option<f64>);
    /// Use a CSS color for fills.
    fn set_fill_style(&mut self, color: &str);
    /// Use a previously declared gradient for fills.
    fn set_fill_gradient(&mut self, gradient: GradientId);
    /// Set the font shorthand.
    fn set_font(&mut self, font: &str);
    /// Set the text alignment keyword.
    fn set_text_align(&mut self, align: &str);
    /// Set the text baseline keyword.
    fn set_text_baseline(&mut self, baseline: &str);
    /// Use a CSS color for strokes.
    fn set_stroke_style(&mut self, color: &str);
    /// Set the stroke width.
    fn set_line_width(&mut self, width: f64);
    /// Set an even dash pattern of `dash` on, `dash` off.
    fn set_line_dash(&mut self, dash: f64);
    /// Set the line cap keyword.
    fn set_line_cap(&mut self, cap: &str);
    /// Set the line join keyword.
    fn set_line_join(&mut self, join: &str);
    /// Declare gradient `gradient` running from `(x1, y1)` to `(x2, y2)`.
    fn create_linear_gradient(&mut self, gradient: GradientId, x1: f64, y1: f64, x2: f64, y2: f64);
    /// Add a color stop to gradient `gradient`.
    fn add_color_stop(&mut self, gradient: GradientId, offset: f64, color: &str);

    /// Draw `image` into the destination rectangle.
    ///
    /// The default only adds the destination rectangle to the current path.
    fn draw_image(&mut self, image: &PixelBuffer, x: f64, y: f64, width: f64, height: f64) {
        let _ = image;
        self.rect(x, y, width, height);
    }
}

/// Replay `commands` into `ctx`.
///
/// `draw-layer` markers are skipped; use [`replay_with_layers`] to expand them.
pub fn replay<C: CanvasContext + ?Sized>(commands: &[Command], ctx: &mut C) {
    replay_from(commands, None, ctx);
}

/// Replay `commands` into `ctx`, drawing cached layers from `layers` at each
/// `draw-layer` marker.
pub fn replay_with_layers<C: CanvasContext + ?Sized>(
    commands: &[Command],
    layers: &dyn LayerSource,
    ctx: &mut C,
) {
    replay_from(commands, Some(layers), ctx);
}

#[tracing::instrument(level = "debug", skip_all, fields(commands = commands.len()))]
fn replay_from<C: CanvasContext + ?Sized>(
    commands: &[Command],
    layers: Option<&dyn LayerSource>,
    ctx: &mut C,
) {
    let mut replay = Replay::new(ctx);
    visit_commands(commands, layers, &mut |command| replay.apply(command));
}

/// Which paints are set, so `fill`/`stroke` without a style draw nothing.
#[derive(Copy, Clone, Debug, Default)]
struct Paints {
    fill: bool,
    stroke: bool,
}

struct Replay<'c, C: ?Sized> {
    ctx: &'c mut C,
    paints: Paints,
    saved: Vec<Paints>,
    gradient: Option<GradientId>,
}

impl<'c, C: CanvasContext + ?Sized> Replay<'c, C> {
    fn new(ctx: &'c mut C) -> Self {
        Self {
            ctx,
            paints: Paints::default(),
            saved: Vec::new(),
            gradient: None,
        }
    }

    fn apply(&mut self, command: &Command) {
        let ctx = &mut *self.ctx;
        match command {
            Command::Save => {
                self.saved.push(self.paints);
                ctx.save();
            }
            Command::Restore => {
                match self.saved.pop() {
                    Some(paints) => self.paints = paints,
                    None => tracing::warn!("restore without matching save"),
                }
                ctx.restore();
            }
            Command::BeginPath => ctx.begin_path(),
            Command::ClosePath => ctx.close_path(),
            Command::MoveTo { x, y } => ctx.move_to(*x, *y),
            Command::LineTo { x, y } => ctx.line_to(*x, *y),
            Command::Rect {
                x,
                y,
                width,
                height,
            } => ctx.rect(*x, *y, *width, *height),
            Command::Arc {
                x,
                y,
                radius,
                start_angle,
                end_angle,
                counterclockwise,
            } => ctx.arc(*x, *y, *radius, *start_angle, *end_angle, *counterclockwise),
            Command::ArcTo {
                x1,
                y1,
                x2,
                y2,
                radius,
            } => ctx.arc_to(*x1, *y1, *x2, *y2, *radius),
            Command::Clip {
                x,
                y,
                width,
                height,
            } => ctx.clip_rect(*x, *y, *width, *height),
            Command::Translate { x, y } => ctx.translate(*x, *y),
            Command::Scale { x, y } => ctx.scale(*x, *y),
            Command::Rotate { degrees } => ctx.rotate(degrees.to_radians()),
            Command::Image {
                pixels,
                x,
                y,
                dst_width,
                dst_height,
                ..
            } => ctx.draw_image(pixels, *x, *y, *dst_width, *dst_height),
            Command::Stroke => {
                if self.paints.stroke {
                    ctx.stroke();
                }
            }
            Command::Fill => {
                if self.paints.fill {
                    ctx.fill();
                }
            }
            Command::FillText {
                text,
                x,
                y,
                max_width,
            } => ctx.fill_text(text, *x, *y, *max_width),
            Command::FillStyle { color } => {
                self.paints.fill = true;
                ctx.set_fill_style(color);
            }
            Command::FillStyleGradient { gradient } => {
                self.paints.fill = true;
                ctx.set_fill_gradient(*gradient);
            }
            Command::Font { font } => ctx.set_font(font),
            Command::TextAlign { align } => ctx.set_text_align(align),
            Command::TextBaseline { baseline } => ctx.set_text_baseline(baseline),
            Command::StrokeStyle { color } => {
                self.paints.stroke = true;
                ctx.set_stroke_style(color);
            }
            Command::LineWidth { width } => ctx.set_line_width(*width),
            Command::LineDash { dash } => ctx.set_line_dash(*dash),
            Command::LineCap { cap } => ctx.set_line_cap(cap),
            Command::LineJoin { join } => ctx.set_line_join(join),
            Command::Gradient {
                gradient,
                x1,
                y1,
                x2,
                y2,
                ..
            } => {
                self.gradient = Some(*gradient);
                ctx.create_linear_gradient(*gradient, *x1, *y1, *x2, *y2);
            }
            Command::ColorStop {
                gradient,
                offset,
                color,
            } => {
                let Some(current) = self.gradient else {
                    tracing::debug!(gradient = gradient.0, "color stop before any gradient");
                    return;
                };
                if current != *gradient {
                    tracing::warn!(
                        stop = gradient.0,
                        current = current.0,
                        "color stop for a gradient other than the latest one"
                    );
                }
                ctx.add_color_stop(current, *offset, color);
            }
            Command::Sleep { .. }
            | Command::MarkLatency { .. }
            | Command::StatisticsMarker { .. }
            | Command::BeginLayer { .. }
            | Command::EndLayer { .. }
            | Command::DrawLayer { .. } => {}
            Command::Unknown => tracing::debug!("skipping unknown command"),
        }
    }
}
