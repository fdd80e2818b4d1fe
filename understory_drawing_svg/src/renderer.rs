// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::f64::consts::TAU;
use core::fmt::{self, Write as _};

use hashbrown::HashSet;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Arc, PathEl, Point, SvgArc, Vec2};
use understory_drawing::{Command, GradientId, LayerSource, PixelBuffer, visit_commands};

use crate::SvgDocument;
#[cfg(feature = "std")]
use crate::image::png_data_uri;
use crate::state::{self, FontFace, GraphicsState};

const ARC_TOLERANCE: f64 = 0.1;

/// A gradient declared but not yet referenced by a fill style.
#[derive(Clone, Debug)]
struct PendingGradient {
    id: GradientId,
    start_tag: String,
    stops: String,
}

/// Single-pass translator from drawing commands to SVG markup.
///
/// Definitions (clip paths and gradients) and drawn elements accumulate in
/// separate streams that [`SvgRenderer::finish`] assembles into a document.
pub struct SvgRenderer<'a> {
    layers: Option<&'a dyn LayerSource>,
    defs: String,
    body: String,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    next_clip: u64,
    pending_gradient: Option<PendingGradient>,
    written_gradients: HashSet<GradientId>,
}

impl fmt::Debug for SvgRenderer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SvgRenderer")
            .field("has_layers", &self.layers.is_some())
            .field("defs_len", &self.defs.len())
            .field("body_len", &self.body.len())
            .field("state", &self.state)
            .field("stack_depth", &self.stack.len())
            .field("next_clip", &self.next_clip)
            .field("pending_gradient", &self.pending_gradient)
            .field("written_gradients", &self.written_gradients.len())
            .finish()
    }
}

impl Default for SvgRenderer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SvgRenderer<'a> {
    /// Create a renderer that skips `draw-layer` markers.
    pub fn new() -> Self {
        Self {
            layers: None,
            defs: String::new(),
            body: String::new(),
            state: GraphicsState::default(),
            stack: Vec::new(),
            next_clip: 0,
            pending_gradient: None,
            written_gradients: HashSet::new(),
        }
    }

    /// Create a renderer that draws cached layers from `layers`.
    pub fn with_layers(layers: &'a dyn LayerSource) -> Self {
        Self {
            layers: Some(layers),
            ..Self::new()
        }
    }

    /// The live graphics state.
    pub fn state(&self) -> &GraphicsState {
        &self.state
    }

    /// Number of saved states not yet restored.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Translate `commands` in order, expanding `draw-layer` markers.
    pub fn replay(&mut self, commands: &[Command]) {
        let layers = self.layers;
        visit_commands(commands, layers, &mut |command| self.apply(command));
    }

    /// Translate a single command.
    ///
    /// `draw-layer` markers are not expanded here; see
    /// [`SvgRenderer::replay`].
    pub fn apply(&mut self, command: &Command) {
        match command {
            Command::Save => self.save(),
            Command::Restore => self.restore(),
            Command::BeginPath => self.state.path.clear(),
            Command::ClosePath => self.state.path.close(),
            Command::MoveTo { x, y } => self.state.path.move_to(Point::new(*x, *y)),
            Command::LineTo { x, y } => self.state.path.line_to(Point::new(*x, *y)),
            Command::Rect {
                x,
                y,
                width,
                height,
            } => {
                let path = &mut self.state.path;
                path.move_to(Point::new(*x, *y));
                path.line_to(Point::new(x + width, *y));
                path.line_to(Point::new(x + width, y + height));
                path.line_to(Point::new(*x, y + height));
                path.close();
            }
            Command::Arc {
                x,
                y,
                radius,
                start_angle,
                end_angle,
                counterclockwise,
            } => self.arc(
                Point::new(*x, *y),
                *radius,
                *start_angle,
                *end_angle,
                *counterclockwise,
            ),
            Command::ArcTo {
                x1,
                y1,
                x2,
                y2,
                radius,
            } => self.arc_to(Point::new(*x1, *y1), Point::new(*x2, *y2), *radius),
            Command::Clip {
                x,
                y,
                width,
                height,
            } => self.clip(*x, *y, *width, *height),
            Command::Translate { x, y } => {
                self.state.transform.push(format!("translate({x}, {y})"));
            }
            Command::Scale { x, y } => self.state.transform.push(format!("scale({x}, {y})")),
            Command::Rotate { degrees } => self.state.transform.push(format!("rotate({degrees})")),
            Command::Image {
                pixels,
                x,
                y,
                dst_width,
                dst_height,
                ..
            } => self.image(pixels, *x, *y, *dst_width, *dst_height),
            Command::Stroke => self.stroke(),
            Command::Fill => self.fill(),
            Command::FillText { text, x, y, .. } => self.fill_text(text, *x, *y),
            Command::FillStyle { color } => self.state.fill_style = Some(color.clone()),
            Command::FillStyleGradient { gradient } => self.fill_gradient(*gradient),
            Command::Font { font } => self.state.font = FontFace::parse(font),
            Command::TextAlign { align } => self.state.text_anchor = state::text_anchor(align),
            Command::TextBaseline { baseline } => {
                self.state.text_baseline = state::text_baseline(baseline);
            }
            Command::StrokeStyle { color } => self.state.stroke_style = Some(color.clone()),
            Command::LineWidth { width } => self.state.line_width = *width,
            Command::LineDash { dash } => {
                self.state.line_dash = (*dash != 0.0).then_some(*dash);
            }
            Command::LineCap { cap } => self.state.line_cap = state::line_cap(cap),
            Command::LineJoin { join } => self.state.line_join = state::line_join(join),
            Command::Gradient {
                gradient,
                width,
                height,
                x1,
                y1,
                x2,
                y2,
            } => {
                let start_tag = format!(
                    "<linearGradient id=\"grad{}\" x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\">",
                    gradient.0,
                    unit(*x1, *width),
                    unit(*y1, *height),
                    unit(*x2, *width),
                    unit(*y2, *height)
                );
                self.pending_gradient = Some(PendingGradient {
                    id: *gradient,
                    start_tag,
                    stops: String::new(),
                });
            }
            Command::ColorStop {
                gradient,
                offset,
                color,
            } => self.color_stop(*gradient, *offset, color),
            Command::Sleep { .. }
            | Command::MarkLatency { .. }
            | Command::StatisticsMarker { .. }
            | Command::BeginLayer { .. }
            | Command::EndLayer { .. }
            | Command::DrawLayer { .. } => {}
            Command::Unknown => tracing::debug!("skipping unknown command"),
        }
    }

    /// Close any groups still open and wrap everything in an `<svg>` root.
    pub fn finish(mut self, document: &SvgDocument) -> String {
        let mut open = core::mem::take(&mut self.state.closers);
        while let Some(mut saved) = self.stack.pop() {
            open.append(&mut saved.closers);
        }
        if !open.is_empty() {
            tracing::debug!(groups = open.len(), "closing groups left open by unbalanced save");
        }
        for closer in open {
            self.body.push_str(closer);
        }

        let size = document.size;
        let view_box = document.view_box;
        let mut svg = String::new();
        let _ = write!(
            svg,
            "<svg version=\"1.1\" baseProfile=\"full\" width=\"{}\" height=\"{}\" viewBox=\"{} {} {} {}\" xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">",
            size.width,
            size.height,
            view_box.x0,
            view_box.y0,
            view_box.width(),
            view_box.height()
        );
        svg.push_str("<defs>");
        svg.push_str(&self.defs);
        svg.push_str("</defs>");
        svg.push_str(&self.body);
        svg.push_str("</svg>");
        svg
    }

    fn save(&mut self) {
        let mut saved = self.state.clone();
        saved.closers = core::mem::take(&mut self.state.closers);
        self.stack.push(saved);
    }

    fn restore(&mut self) {
        let Some(saved) = self.stack.pop() else {
            tracing::warn!("restore without matching save");
            return;
        };
        for closer in self.state.closers.drain(..) {
            self.body.push_str(closer);
        }
        self.state = saved;
    }

    fn arc(&mut self, center: Point, radius: f64, start: f64, end: f64, counterclockwise: bool) {
        if radius < 0.0 {
            tracing::warn!(radius, "skipping arc with negative radius");
            return;
        }
        let sweep = if counterclockwise {
            if start - end >= TAU {
                -TAU
            } else {
                -(start - end).rem_euclid(TAU)
            }
        } else if end - start >= TAU {
            TAU
        } else {
            (end - start).rem_euclid(TAU)
        };
        let first = center + Vec2::from_angle(start) * radius;
        if self.state.path.current_point().is_some() {
            self.state.path.line_to(first);
        } else {
            self.state.path.move_to(first);
        }
        let arc = Arc {
            center,
            radii: Vec2::new(radius, radius),
            start_angle: start,
            sweep_angle: sweep,
            x_rotation: 0.0,
        };
        self.append_arc(&arc);
    }

    fn arc_to(&mut self, p1: Point, p2: Point, radius: f64) {
        if radius < 0.0 {
            tracing::warn!(radius, "skipping arc-to with negative radius");
            return;
        }
        let Some(p0) = self.state.path.current_point() else {
            self.state.path.move_to(p1);
            return;
        };
        let to_p0 = p0 - p1;
        let to_p2 = p2 - p1;
        let turn = (p1 - p0).cross(to_p2);
        if p0 == p1 || p1 == p2 || radius == 0.0 || turn == 0.0 {
            self.state.path.line_to(p1);
            return;
        }
        let u0 = to_p0 / to_p0.hypot();
        let u2 = to_p2 / to_p2.hypot();
        // Distance from the corner to each tangent point: r / tan(θ/2).
        let distance = radius * (1.0 + u0.dot(u2)) / u0.cross(u2).abs();
        let t0 = p1 + u0 * distance;
        let t2 = p1 + u2 * distance;
        self.state.path.line_to(t0);
        let svg_arc = SvgArc {
            from: t0,
            to: t2,
            radii: Vec2::new(radius, radius),
            x_rotation: 0.0,
            large_arc: false,
            sweep: turn > 0.0,
        };
        match Arc::from_svg_arc(&svg_arc) {
            Some(arc) => self.append_arc(&arc),
            None => self.state.path.line_to(t2),
        }
    }

    fn append_arc(&mut self, arc: &Arc) {
        for el in arc.append_iter(ARC_TOLERANCE) {
            match el {
                PathEl::CurveTo(a, b, c) => self.state.path.curve_to(a, b, c),
                PathEl::LineTo(p) => self.state.path.line_to(p),
                PathEl::QuadTo(a, b) => {
                    let from = self.state.path.current_point().unwrap_or(a);
                    let c1 = from + (a - from) * (2.0 / 3.0);
                    let c2 = b + (a - b) * (2.0 / 3.0);
                    self.state.path.curve_to(c1, c2, b);
                }
                PathEl::MoveTo(p) => self.state.path.move_to(p),
                PathEl::ClosePath => self.state.path.close(),
            }
        }
    }

    fn clip(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.next_clip += 1;
        let id = self.next_clip;
        let _ = write!(
            self.defs,
            "<clipPath id=\"clip{id}\"><rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\"{}/></clipPath>",
            self.state.transform_attr()
        );
        let _ = write!(self.body, "<g clip-path=\"url(#clip{id})\">");
        self.state.closers.push("</g>");
    }

    fn stroke(&mut self) {
        let state = &self.state;
        let Some(stroke) = &state.stroke_style else {
            return;
        };
        let _ = write!(
            self.body,
            "<path d=\"{}\" fill=\"transparent\" stroke=\"{}\" stroke-width=\"{}\" stroke-linejoin=\"{}\" stroke-linecap=\"{}\"",
            state.path.as_str(),
            Attr(stroke),
            state.line_width,
            state.line_join,
            state.line_cap
        );
        if let Some(dash) = state.line_dash {
            let _ = write!(self.body, " stroke-dasharray=\"{dash}, {dash}\"");
        }
        let _ = write!(self.body, "{}/>", state.transform_attr());
    }

    fn fill(&mut self) {
        let state = &self.state;
        let Some(fill) = &state.fill_style else {
            return;
        };
        let _ = write!(
            self.body,
            "<path d=\"{}\" fill=\"{}\" stroke=\"transparent\"{}/>",
            state.path.as_str(),
            Attr(fill),
            state.transform_attr()
        );
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        let state = &self.state;
        let body = &mut self.body;
        let _ = write!(
            body,
            "<text x=\"{x}\" y=\"{y}\" text-anchor=\"{}\" alignment-baseline=\"{}\"",
            state.text_anchor, state.text_baseline
        );
        if let Some(fill) = &state.fill_style {
            let _ = write!(body, " fill=\"{}\"", Attr(fill));
        }
        let font = &state.font;
        if let Some(style) = &font.style {
            let _ = write!(body, " font-style=\"{}\"", Attr(style));
        }
        if let Some(weight) = &font.weight {
            let _ = write!(body, " font-weight=\"{}\"", Attr(weight));
        }
        if let Some(size) = font.size {
            let _ = write!(body, " font-size=\"{size}\"");
        }
        if let Some(family) = &font.family {
            let _ = write!(body, " font-family=\"{}\"", Attr(family));
        }
        let _ = write!(body, "{}>{}</text>", state.transform_attr(), Text(text));
    }

    #[cfg(feature = "std")]
    fn image(&mut self, pixels: &PixelBuffer, x: f64, y: f64, width: f64, height: f64) {
        let transform = self.state.transform_attr();
        match png_data_uri(pixels) {
            Ok(uri) => {
                let _ = write!(
                    self.body,
                    "<image x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" preserveAspectRatio=\"none\" xlink:href=\"{uri}\"{transform}/>"
                );
            }
            Err(err) => {
                tracing::warn!(%err, "drawing image placeholder");
                self.image_placeholder(x, y, width, height);
            }
        }
    }

    #[cfg(not(feature = "std"))]
    fn image(&mut self, pixels: &PixelBuffer, x: f64, y: f64, width: f64, height: f64) {
        tracing::debug!(
            width = pixels.width(),
            height = pixels.height(),
            "PNG embedding needs std, drawing image placeholder"
        );
        self.image_placeholder(x, y, width, height);
    }

    fn image_placeholder(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let _ = write!(
            self.body,
            "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" fill=\"none\" stroke=\"gray\"{}/>",
            self.state.transform_attr()
        );
    }

    fn color_stop(&mut self, gradient: GradientId, offset: f64, color: &str) {
        let Some(pending) = &mut self.pending_gradient else {
            tracing::debug!(gradient = gradient.0, "color stop with no gradient in flight");
            return;
        };
        if pending.id != gradient {
            tracing::warn!(
                stop = gradient.0,
                current = pending.id.0,
                "color stop for a gradient other than the latest one"
            );
        }
        let percent = (offset.clamp(0.0, 1.0) * 100.0).trunc();
        let _ = write!(
            pending.stops,
            "<stop offset=\"{percent}%\" stop-color=\"{}\"/>",
            Attr(color)
        );
    }

    fn fill_gradient(&mut self, gradient: GradientId) {
        match self.pending_gradient.take() {
            Some(pending) => {
                if pending.id != gradient {
                    tracing::warn!(
                        fill = gradient.0,
                        pending = pending.id.0,
                        "fill style names a gradient other than the latest one"
                    );
                }
                if self.written_gradients.insert(pending.id) {
                    self.defs.push_str(&pending.start_tag);
                    self.defs.push_str(&pending.stops);
                    self.defs.push_str("</linearGradient>");
                }
            }
            None if !self.written_gradients.contains(&gradient) => {
                tracing::warn!(gradient = gradient.0, "fill style names an undeclared gradient");
            }
            None => {}
        }
        self.state.fill_style = Some(format!("url(#grad{})", gradient.0));
    }
}

/// `value / extent`, or zero for an empty extent.
fn unit(value: f64, extent: f64) -> f64 {
    if extent == 0.0 { 0.0 } else { value / extent }
}

/// Escapes a value for a double-quoted attribute.
struct Attr<'a>(&'a str);

impl fmt::Display for Attr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&apos;")?,
                c => f.write_char(c)?,
            }
        }
        Ok(())
    }
}

/// Escapes character data.
struct Text<'a>(&'a str);

impl fmt::Display for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                c => f.write_char(c)?,
            }
        }
        Ok(())
    }
}
