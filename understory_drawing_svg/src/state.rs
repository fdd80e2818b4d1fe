// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Graphics state snapshots and keyword tables.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Write as _};

use kurbo::Point;

/// Path data accumulated since the last `begin-path`.
///
/// Tracks the current point and the start of the current subpath so arcs can
/// be joined to what came before.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathData {
    data: String,
    current: Option<Point>,
    start: Option<Point>,
}

impl PathData {
    /// The `d` attribute value.
    pub fn as_str(&self) -> &str {
        self.data.trim_start()
    }

    /// Returns `true` if nothing has been added since the last reset.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The point the next segment starts from.
    pub fn current_point(&self) -> Option<Point> {
        self.current
    }

    pub(crate) fn clear(&mut self) {
        self.data.clear();
        self.current = None;
        self.start = None;
    }

    pub(crate) fn move_to(&mut self, p: Point) {
        let _ = write!(self.data, " M {} {}", p.x, p.y);
        self.current = Some(p);
        self.start = Some(p);
    }

    /// A line with no current point starts a subpath instead.
    pub(crate) fn line_to(&mut self, p: Point) {
        if self.current.is_none() {
            self.move_to(p);
            return;
        }
        let _ = write!(self.data, " L {} {}", p.x, p.y);
        self.current = Some(p);
    }

    pub(crate) fn curve_to(&mut self, p1: Point, p2: Point, p3: Point) {
        let _ = write!(
            self.data,
            " C {} {} {} {} {} {}",
            p1.x, p1.y, p2.x, p2.y, p3.x, p3.y
        );
        self.current = Some(p3);
    }

    pub(crate) fn close(&mut self) {
        self.data.push_str(" Z");
        self.current = self.start;
    }
}

/// Unit of a font size.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FontUnit {
    /// CSS pixels.
    Px,
    /// Points.
    Pt,
}

impl FontUnit {
    /// The CSS suffix.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Px => "px",
            Self::Pt => "pt",
        }
    }
}

/// A font size taken from a font shorthand.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FontSize {
    /// Magnitude, always positive.
    pub value: u32,
    /// Unit the size was given in.
    pub unit: FontUnit,
}

impl fmt::Display for FontSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.as_str())
    }
}

/// A font shorthand decomposed into the parts SVG text understands.
///
/// Unset parts are left off the output element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FontFace {
    /// `italic` when requested.
    pub style: Option<String>,
    /// `bold` when requested.
    pub weight: Option<String>,
    /// Size with unit.
    pub size: Option<FontSize>,
    /// Family name.
    pub family: Option<String>,
}

impl FontFace {
    /// Parse a shorthand such as `"italic bold 14px Arial"`.
    ///
    /// Tokens are split on whitespace. `italic` sets the style, `bold` sets the
    /// weight, a positive integer followed by `px` or `pt` sets the size and
    /// any other token sets the family, the last one winning.
    pub fn parse(shorthand: &str) -> Self {
        let mut face = Self::default();
        for token in shorthand.split_whitespace() {
            match token {
                "italic" => face.style = Some(token.into()),
                "bold" => face.weight = Some(token.into()),
                _ => match parse_size(token) {
                    Some(size) => face.size = Some(size),
                    None => face.family = Some(token.into()),
                },
            }
        }
        face
    }
}

fn parse_size(token: &str) -> Option<FontSize> {
    let (digits, unit) = if let Some(digits) = token.strip_suffix("px") {
        (digits, FontUnit::Px)
    } else {
        (token.strip_suffix("pt")?, FontUnit::Pt)
    };
    let value: u32 = digits.parse().ok()?;
    (value > 0).then_some(FontSize { value, unit })
}

/// The mutable state saved by `save` and restored by `restore`.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphicsState {
    /// Path accumulated since the last `begin-path`.
    pub path: PathData,
    /// Transform operations in the order they were applied.
    pub transform: Vec<String>,
    /// Fill paint, a color or a gradient reference.
    pub fill_style: Option<String>,
    /// Stroke color.
    pub stroke_style: Option<String>,
    /// SVG `stroke-linecap` value.
    pub line_cap: &'static str,
    /// SVG `stroke-linejoin` value.
    pub line_join: &'static str,
    /// Stroke width.
    pub line_width: f64,
    /// Dash length, when dashing.
    pub line_dash: Option<f64>,
    /// Current font.
    pub font: FontFace,
    /// SVG `text-anchor` value.
    pub text_anchor: &'static str,
    /// SVG `alignment-baseline` value.
    pub text_baseline: &'static str,
    /// Closing tags owed by groups opened in this scope.
    pub closers: Vec<&'static str>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            path: PathData::default(),
            transform: Vec::new(),
            fill_style: None,
            stroke_style: None,
            line_cap: "square",
            line_join: "bevel",
            line_width: 1.0,
            line_dash: None,
            font: FontFace::default(),
            text_anchor: "start",
            text_baseline: "alphabetic",
            closers: Vec::new(),
        }
    }
}

impl GraphicsState {
    /// The transform list as a `transform` attribute, or nothing.
    pub(crate) fn transform_attr(&self) -> TransformAttr<'_> {
        TransformAttr(&self.transform)
    }
}

pub(crate) struct TransformAttr<'a>(&'a [String]);

impl fmt::Display for TransformAttr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        f.write_str(" transform=\"")?;
        for (i, op) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(' ')?;
            }
            f.write_str(op)?;
        }
        f.write_char('"')
    }
}

pub(crate) fn text_anchor(align: &str) -> &'static str {
    match align {
        "end" | "right" => "end",
        "center" => "middle",
        _ => "start",
    }
}

pub(crate) fn text_baseline(baseline: &str) -> &'static str {
    match baseline {
        "top" | "hanging" => "hanging",
        "middle" => "middle",
        "ideographic" => "ideographic",
        "ideaographic" => "ideaographic",
        "bottom" => "bottom",
        _ => "alphabetic",
    }
}

pub(crate) fn line_cap(cap: &str) -> &'static str {
    match cap {
        "round" => "round",
        "butt" => "butt",
        _ => "square",
    }
}

pub(crate) fn line_join(join: &str) -> &'static str {
    match join {
        "round" => "round",
        "miter" => "miter",
        _ => "bevel",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn font_shorthand_decomposes() {
        let face = FontFace::parse("italic bold 14px Arial");
        assert_eq!(face.style.as_deref(), Some("italic"));
        assert_eq!(face.weight.as_deref(), Some("bold"));
        assert_eq!(
            face.size,
            Some(FontSize {
                value: 14,
                unit: FontUnit::Px
            })
        );
        assert_eq!(face.family.as_deref(), Some("Arial"));
    }

    #[test]
    fn font_size_keeps_unit_and_rejects_zero() {
        let face = FontFace::parse("12pt serif");
        assert_eq!(face.size.map(|s| s.to_string()).as_deref(), Some("12pt"));

        let face = FontFace::parse("0px sans-serif Helvetica");
        assert_eq!(face.size, None);
        assert_eq!(face.family.as_deref(), Some("Helvetica"));
    }

    #[test]
    fn keyword_tables_fall_back() {
        assert_eq!(text_anchor("right"), "end");
        assert_eq!(text_anchor("justify"), "start");
        assert_eq!(text_baseline("top"), "hanging");
        assert_eq!(text_baseline("central"), "alphabetic");
        assert_eq!(text_baseline("ideographic"), "ideographic");
        assert_eq!(text_baseline("ideaographic"), "ideaographic");
        assert_eq!(line_cap("butt"), "butt");
        assert_eq!(line_cap("flat"), "square");
        assert_eq!(line_join("miter"), "miter");
        assert_eq!(line_join("sharp"), "bevel");
    }

    #[test]
    fn path_data_tracks_points() {
        let mut path = PathData::default();
        path.line_to(Point::new(1.0, 2.0));
        path.line_to(Point::new(3.0, 4.0));
        path.close();
        assert_eq!(path.as_str(), "M 1 2 L 3 4 Z");
        assert_eq!(path.current_point(), Some(Point::new(1.0, 2.0)));
    }

    #[test]
    fn transform_attr_joins_ops() {
        let mut state = GraphicsState::default();
        assert_eq!(state.transform_attr().to_string(), "");
        state.transform.push("translate(1, 2)".into());
        state.transform.push("rotate(90)".into());
        assert_eq!(
            state.transform_attr().to_string(),
            " transform=\"translate(1, 2) rotate(90)\""
        );
    }
}
