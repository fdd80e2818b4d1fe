// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt::{self, Write as _};

use understory_drawing::{Command, GradientId, LayerSource};

use crate::{CanvasContext, replay, replay_with_layers};

/// Render `commands` as canvas 2D statements against a context named `ctx`.
pub fn to_script(commands: &[Command]) -> String {
    let mut canvas = ScriptCanvas::new();
    replay(commands, &mut canvas);
    canvas.finish()
}

/// Like [`to_script`], expanding `draw-layer` markers from `layers`.
pub fn to_script_with_layers(commands: &[Command], layers: &dyn LayerSource) -> String {
    let mut canvas = ScriptCanvas::new();
    replay_with_layers(commands, layers, &mut canvas);
    canvas.finish()
}

/// A [`CanvasContext`] that writes canvas 2D JavaScript, one statement per
/// line.
///
/// Strings are written as single-quoted literals escaped so the script can be
/// embedded in an HTML `<script>` element. Gradient `N` is held in a variable
/// named `gradN`.
#[derive(Clone, Debug)]
pub struct ScriptCanvas {
    context: String,
    script: String,
}

impl Default for ScriptCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptCanvas {
    /// Create an empty script addressing a context variable named `ctx`.
    pub fn new() -> Self {
        Self::with_context_name("ctx")
    }

    /// Create an empty script addressing the context variable `name`.
    pub fn with_context_name(name: impl Into<String>) -> Self {
        Self {
            context: name.into(),
            script: String::new(),
        }
    }

    /// The statements written so far.
    pub fn as_str(&self) -> &str {
        &self.script
    }

    /// Consume the canvas and return the script.
    pub fn finish(self) -> String {
        self.script
    }

    fn call(&mut self, method: &str, args: fmt::Arguments<'_>) {
        let _ = writeln!(self.script, "{}.{method}({args});", self.context);
    }

    fn assign(&mut self, property: &str, value: fmt::Arguments<'_>) {
        let _ = writeln!(self.script, "{}.{property} = {value};", self.context);
    }
}

impl CanvasContext for ScriptCanvas {
    fn save(&mut self) {
        self.call("save", format_args!(""));
    }

    fn restore(&mut self) {
        self.call("restore", format_args!(""));
    }

    fn begin_path(&mut self) {
        self.call("beginPath", format_args!(""));
    }

    fn close_path(&mut self) {
        self.call("closePath", format_args!(""));
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.call("moveTo", format_args!("{}, {}", Num(x), Num(y)));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.call("lineTo", format_args!("{}, {}", Num(x), Num(y)));
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.call(
            "rect",
            format_args!("{}, {}, {}, {}", Num(x), Num(y), Num(width), Num(height)),
        );
    }

    fn arc(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        counterclockwise: bool,
    ) {
        self.call(
            "arc",
            format_args!(
                "{}, {}, {}, {}, {}, {counterclockwise}",
                Num(x),
                Num(y),
                Num(radius),
                Num(start_angle),
                Num(end_angle)
            ),
        );
    }

    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) {
        self.call(
            "arcTo",
            format_args!(
                "{}, {}, {}, {}, {}",
                Num(x1),
                Num(y1),
                Num(x2),
                Num(y2),
                Num(radius)
            ),
        );
    }

    fn clip_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.begin_path();
        self.rect(x, y, width, height);
        self.call("clip", format_args!(""));
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.call("translate", format_args!("{}, {}", Num(x), Num(y)));
    }

    fn scale(&mut self, x: f64, y: f64) {
        self.call("scale", format_args!("{}, {}", Num(x), Num(y)));
    }

    fn rotate(&mut self, radians: f64) {
        self.call("rotate", format_args!("{}", Num(radians)));
    }

    fn stroke(&mut self) {
        self.call("stroke", format_args!(""));
    }

    fn fill(&mut self) {
        self.call("fill", format_args!(""));
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, max_width: Option<f64>) {
        match max_width {
            Some(max_width) => self.call(
                "fillText",
                format_args!("{}, {}, {}, {}", Str(text), Num(x), Num(y), Num(max_width)),
            ),
            None => self.call(
                "fillText",
                format_args!("{}, {}, {}", Str(text), Num(x), Num(y)),
            ),
        }
    }

    fn set_fill_style(&mut self, color: &str) {
        self.assign("fillStyle", format_args!("{}", Str(color)));
    }

    fn set_fill_gradient(&mut self, gradient: GradientId) {
        self.assign("fillStyle", format_args!("grad{}", gradient.0));
    }

    fn set_font(&mut self, font: &str) {
        self.assign("font", format_args!("{}", Str(font)));
    }

    fn set_text_align(&mut self, align: &str) {
        self.assign("textAlign", format_args!("{}", Str(align)));
    }

    fn set_text_baseline(&mut self, baseline: &str) {
        self.assign("textBaseline", format_args!("{}", Str(baseline)));
    }

    fn set_stroke_style(&mut self, color: &str) {
        self.assign("strokeStyle", format_args!("{}", Str(color)));
    }

    fn set_line_width(&mut self, width: f64) {
        self.assign("lineWidth", format_args!("{}", Num(width)));
    }

    fn set_line_dash(&mut self, dash: f64) {
        self.call("setLineDash", format_args!("[{}, {}]", Num(dash), Num(dash)));
    }

    fn set_line_cap(&mut self, cap: &str) {
        self.assign("lineCap", format_args!("{}", Str(cap)));
    }

    fn set_line_join(&mut self, join: &str) {
        self.assign("lineJoin", format_args!("{}", Str(join)));
    }

    fn create_linear_gradient(&mut self, gradient: GradientId, x1: f64, y1: f64, x2: f64, y2: f64) {
        let _ = writeln!(
            self.script,
            "var grad{} = {}.createLinearGradient({}, {}, {}, {});",
            gradient.0,
            self.context,
            Num(x1),
            Num(y1),
            Num(x2),
            Num(y2)
        );
    }

    fn add_color_stop(&mut self, gradient: GradientId, offset: f64, color: &str) {
        let _ = writeln!(
            self.script,
            "grad{}.addColorStop({}, {});",
            gradient.0,
            Num(offset),
            Str(color)
        );
    }
}

/// A number as a JavaScript literal.
struct Num(f64);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v.is_finite() {
            write!(f, "{v}")
        } else if v.is_nan() {
            f.write_str("NaN")
        } else if v > 0.0 {
            f.write_str("Infinity")
        } else {
            f.write_str("-Infinity")
        }
    }
}

/// A string as a single-quoted JavaScript literal that is also safe inside an
/// HTML `<script>` element.
struct Str<'a>(&'a str);

impl fmt::Display for Str<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('\'')?;
        for c in self.0.chars() {
            match c {
                '\\' => f.write_str("\\\\")?,
                '\'' => f.write_str("\\'")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '<' => f.write_str("\\x3C")?,
                '>' => f.write_str("\\x3E")?,
                '&' => f.write_str("\\x26")?,
                '\u{2028}' => f.write_str("\\u2028")?,
                '\u{2029}' => f.write_str("\\u2029")?,
                c => f.write_char(c)?,
            }
        }
        f.write_char('\'')
    }
}
