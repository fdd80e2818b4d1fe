// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The closed drawing command vocabulary.

use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::image::PixelBuffer;
use crate::layer::LayerId;

/// Identifier for a linear gradient declared in a command stream.
///
/// Handles are issued by a [`HandleAllocator`](crate::HandleAllocator) and are
/// unique for every gradient constructed from the same allocator.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradientId(pub u64);

/// Identifier for an image drawn from a command stream.
///
/// Image handles exist so backends can cache or de-duplicate uploaded pixels.
/// Replay correctness never depends on them.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub u64);

/// A single recorded drawing instruction.
///
/// Arguments are primitive values fixed at the time the command is appended.
/// Keyword arguments (`text-align`, `line-cap`, ...) are kept as the strings the
/// caller supplied; interpreters map them onto their own vocabulary and fall
/// back to a default for values they do not recognize.
///
/// The serialized form is internally tagged with a kebab-case `kind` field.
/// A tag that this version does not know deserializes to [`Command::Unknown`],
/// which every interpreter skips.
///
/// JSON has no encoding for non-finite numbers: `serde_json` writes a NaN or
/// infinite argument as `null`, and reading it back fails. Buffers meant to be
/// persisted as JSON must keep their arguments finite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Command {
    /// Push the current graphics state.
    Save,
    /// Pop the most recently saved graphics state.
    Restore,
    /// Start a new, empty path.
    BeginPath,
    /// Close the current subpath.
    ClosePath,
    /// Start a new subpath at a point.
    MoveTo {
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
    },
    /// Add a straight segment to a point.
    LineTo {
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
    },
    /// Add a closed rectangular subpath.
    Rect {
        /// Left edge.
        x: f64,
        /// Top edge.
        y: f64,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
    /// Add a circular arc around a center point.
    Arc {
        /// Center X coordinate.
        x: f64,
        /// Center Y coordinate.
        y: f64,
        /// Arc radius.
        radius: f64,
        /// Start angle in radians.
        start_angle: f64,
        /// End angle in radians.
        end_angle: f64,
        /// Sweep counterclockwise from the start angle.
        counterclockwise: bool,
    },
    /// Add an arc tangent to the lines through the current point, `(x1, y1)`
    /// and `(x2, y2)`.
    ArcTo {
        /// First control point X.
        x1: f64,
        /// First control point Y.
        y1: f64,
        /// Second control point X.
        x2: f64,
        /// Second control point Y.
        y2: f64,
        /// Arc radius.
        radius: f64,
    },
    /// Intersect the clip region with a rectangle.
    Clip {
        /// Left edge.
        x: f64,
        /// Top edge.
        y: f64,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
    /// Append a translation to the current transform.
    Translate {
        /// Horizontal offset.
        x: f64,
        /// Vertical offset.
        y: f64,
    },
    /// Append a scale to the current transform.
    Scale {
        /// Horizontal factor.
        x: f64,
        /// Vertical factor.
        y: f64,
    },
    /// Append a rotation to the current transform.
    Rotate {
        /// Rotation angle in degrees.
        degrees: f64,
    },
    /// Draw an image into a destination rectangle.
    Image {
        /// Source image width in pixels.
        width: u32,
        /// Source image height in pixels.
        height: u32,
        /// Source pixels.
        pixels: PixelBuffer,
        /// Handle identifying this draw for backend caching.
        image: ImageId,
        /// Destination left edge.
        x: f64,
        /// Destination top edge.
        y: f64,
        /// Destination width.
        dst_width: f64,
        /// Destination height.
        dst_height: f64,
    },
    /// Stroke the current path with the current stroke style.
    Stroke,
    /// Fill the current path with the current fill style.
    Fill,
    /// Draw a run of text.
    FillText {
        /// Text content, unescaped.
        text: String,
        /// Anchor X coordinate.
        x: f64,
        /// Anchor Y coordinate.
        y: f64,
        /// Optional maximum rendered width.
        max_width: Option<f64>,
    },
    /// Set the fill style to a color.
    FillStyle {
        /// Color in CSS syntax.
        color: String,
    },
    /// Set the fill style to a previously declared gradient.
    FillStyleGradient {
        /// Gradient to fill with.
        gradient: GradientId,
    },
    /// Set the font from a CSS-like shorthand such as `"italic bold 14px Arial"`.
    Font {
        /// Font shorthand.
        font: String,
    },
    /// Set horizontal text alignment (`start`, `end`, `left`, `center`, `right`).
    TextAlign {
        /// Alignment keyword.
        align: String,
    },
    /// Set the text baseline (`top`, `hanging`, `middle`, `alphabetic`,
    /// `ideographic`, `bottom`). The SVG interpreter also accepts the
    /// `ideaographic` spelling.
    TextBaseline {
        /// Baseline keyword.
        baseline: String,
    },
    /// Set the stroke style to a color.
    StrokeStyle {
        /// Color in CSS syntax.
        color: String,
    },
    /// Set the stroke width.
    LineWidth {
        /// Width in user units.
        width: f64,
    },
    /// Set an even dash pattern.
    LineDash {
        /// Length of each dash and each gap.
        dash: f64,
    },
    /// Set the line cap (`square`, `round`, `butt`).
    LineCap {
        /// Cap keyword.
        cap: String,
    },
    /// Set the line join (`round`, `miter`, `bevel`).
    LineJoin {
        /// Join keyword.
        join: String,
    },
    /// Declare a linear gradient.
    ///
    /// Coordinates are in the space of a `width` × `height` box.
    Gradient {
        /// Handle of the declared gradient.
        gradient: GradientId,
        /// Width of the reference box.
        width: f64,
        /// Height of the reference box.
        height: f64,
        /// Start X.
        x1: f64,
        /// Start Y.
        y1: f64,
        /// End X.
        x2: f64,
        /// End Y.
        y2: f64,
    },
    /// Add a color stop to the most recently declared gradient.
    ColorStop {
        /// Handle of the gradient the stop was built for.
        gradient: GradientId,
        /// Offset in `0..=1`.
        offset: f64,
        /// Color in CSS syntax.
        color: String,
    },
    /// Instrumentation: pause the renderer.
    Sleep {
        /// Duration in seconds.
        seconds: f64,
    },
    /// Instrumentation: latency marker.
    MarkLatency {
        /// Wall-clock time in seconds since the Unix epoch.
        timestamp: f64,
    },
    /// Instrumentation: statistics marker.
    StatisticsMarker {
        /// Statistic identifier.
        id: String,
    },
    /// Start of a cached layer's content.
    BeginLayer {
        /// Layer identifier.
        id: LayerId,
    },
    /// End of a cached layer's content.
    EndLayer {
        /// Layer identifier.
        id: LayerId,
    },
    /// Draw a previously cached layer at this point.
    DrawLayer {
        /// Layer identifier.
        id: LayerId,
    },
    /// A command whose tag is not part of this vocabulary.
    ///
    /// Only produced by deserialization.
    #[serde(other)]
    Unknown,
}

impl Command {
    /// Returns the stable, kebab-case tag of this command.
    ///
    /// This matches the `kind` field of the serialized form.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Restore => "restore",
            Self::BeginPath => "begin-path",
            Self::ClosePath => "close-path",
            Self::MoveTo { .. } => "move-to",
            Self::LineTo { .. } => "line-to",
            Self::Rect { .. } => "rect",
            Self::Arc { .. } => "arc",
            Self::ArcTo { .. } => "arc-to",
            Self::Clip { .. } => "clip",
            Self::Translate { .. } => "translate",
            Self::Scale { .. } => "scale",
            Self::Rotate { .. } => "rotate",
            Self::Image { .. } => "image",
            Self::Stroke => "stroke",
            Self::Fill => "fill",
            Self::FillText { .. } => "fill-text",
            Self::FillStyle { .. } => "fill-style",
            Self::FillStyleGradient { .. } => "fill-style-gradient",
            Self::Font { .. } => "font",
            Self::TextAlign { .. } => "text-align",
            Self::TextBaseline { .. } => "text-baseline",
            Self::StrokeStyle { .. } => "stroke-style",
            Self::LineWidth { .. } => "line-width",
            Self::LineDash { .. } => "line-dash",
            Self::LineCap { .. } => "line-cap",
            Self::LineJoin { .. } => "line-join",
            Self::Gradient { .. } => "gradient",
            Self::ColorStop { .. } => "color-stop",
            Self::Sleep { .. } => "sleep",
            Self::MarkLatency { .. } => "mark-latency",
            Self::StatisticsMarker { .. } => "statistics-marker",
            Self::BeginLayer { .. } => "begin-layer",
            Self::EndLayer { .. } => "end-layer",
            Self::DrawLayer { .. } => "draw-layer",
            Self::Unknown => "unknown",
        }
    }

    /// Returns `true` for commands that only carry instrumentation and never
    /// affect rendered output.
    pub fn is_instrumentation(&self) -> bool {
        matches!(
            self,
            Self::Sleep { .. } | Self::MarkLatency { .. } | Self::StatisticsMarker { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_serialized_tag() {
        let commands = [
            Command::Save,
            Command::MoveTo { x: 1.0, y: 2.0 },
            Command::FillStyleGradient {
                gradient: GradientId(3),
            },
            Command::StatisticsMarker { id: "paint".into() },
            Command::DrawLayer {
                id: LayerId::from("layer-1"),
            },
        ];
        for command in commands {
            let json = serde_json::to_value(&command).unwrap();
            assert_eq!(json["kind"], command.kind(), "tag for {command:?}");
        }
    }

    #[test]
    fn unknown_tag_deserializes_to_unknown() {
        let command: Command =
            serde_json::from_str(r#"{"kind":"shadow-blur","radius":4.0}"#).unwrap();
        assert_eq!(command, Command::Unknown);
    }

    #[test]
    fn instrumentation_commands_are_flagged() {
        assert!(Command::Sleep { seconds: 0.5 }.is_instrumentation());
        assert!(Command::MarkLatency { timestamp: 1.0 }.is_instrumentation());
        assert!(!Command::Fill.is_instrumentation());
    }
}
