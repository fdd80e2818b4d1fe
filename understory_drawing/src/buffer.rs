// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::time::Duration;
#[cfg(feature = "std")]
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::command::Command;
use crate::error::DrawingError;
use crate::gradient::LinearGradient;
use crate::handles::HandleAllocator;
use crate::image::PixelBuffer;
#[cfg(feature = "std")]
use crate::layer::{LayerId, LayerStorage};

/// Layer storage shared between a buffer and whoever renders it.
#[cfg(feature = "std")]
pub type SharedLayerStorage = Arc<Mutex<dyn LayerStorage + Send>>;

/// A fill style: either a CSS color or a gradient.
#[derive(Clone, Debug)]
pub enum FillStyle<'a> {
    /// A color in CSS syntax.
    Color(String),
    /// A gradient whose commands are committed into the buffer.
    Gradient(&'a LinearGradient),
}

impl From<&str> for FillStyle<'_> {
    fn from(color: &str) -> Self {
        Self::Color(color.into())
    }
}

impl From<String> for FillStyle<'_> {
    fn from(color: String) -> Self {
        Self::Color(color)
    }
}

impl<'a> From<&'a LinearGradient> for FillStyle<'a> {
    fn from(gradient: &'a LinearGradient) -> Self {
        Self::Gradient(gradient)
    }
}

/// An ordered, append-only log of drawing commands.
///
/// Builder methods append exactly one command each, except
/// [`CommandBuffer::round_rect`] (six commands) and
/// [`CommandBuffer::set_fill_style`] with a gradient (the gradient's commands
/// plus one).
///
/// The buffer tracks its save depth: the number of `save` commands not yet
/// matched by a `restore`. Nothing corrects an unbalanced buffer; only
/// [`CommandBuffer::copy_from`] checks the depth.
#[derive(Clone)]
pub struct CommandBuffer {
    commands: Vec<Command>,
    save_depth: i32,
    handles: Handles,
    #[cfg(feature = "std")]
    layers: Option<SharedLayerStorage>,
}

impl fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("CommandBuffer");
        out.field("commands", &self.commands.len())
            .field("save_depth", &self.save_depth);
        #[cfg(feature = "std")]
        out.field("has_layer_storage", &self.layers.is_some());
        out.finish_non_exhaustive()
    }
}

/// Where a buffer draws its gradient and image handles from.
#[derive(Clone, Debug)]
enum Handles {
    Shared,
    Owned(Arc<HandleAllocator>),
}

impl Handles {
    fn get(&self) -> &HandleAllocator {
        match self {
            Self::Shared => HandleAllocator::shared(),
            Self::Owned(allocator) => allocator,
        }
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBuffer {
    /// Create an empty buffer using the process-wide handle allocator and no
    /// layer storage.
    pub fn new() -> Self {
        Self::with_handles(Handles::Shared)
    }

    /// Create an empty buffer drawing handles from `handles`.
    pub fn with_allocator(handles: Arc<HandleAllocator>) -> Self {
        Self::with_handles(Handles::Owned(handles))
    }

    fn with_handles(handles: Handles) -> Self {
        Self {
            commands: Vec::new(),
            save_depth: 0,
            handles,
            #[cfg(feature = "std")]
            layers: None,
        }
    }

    /// Create a buffer holding `commands`, for example a deserialized log.
    ///
    /// The save depth is computed from the `save`/`restore` commands present.
    pub fn from_commands(commands: impl IntoIterator<Item = Command>) -> Self {
        let mut buffer = Self::new();
        buffer.extend_commands(commands);
        buffer
    }

    /// Attach a layer storage collaborator.
    #[cfg(feature = "std")]
    pub fn with_layer_storage(mut self, storage: SharedLayerStorage) -> Self {
        self.layers = Some(storage);
        self
    }

    /// Attach or detach the layer storage collaborator.
    #[cfg(feature = "std")]
    pub fn set_layer_storage(&mut self, storage: Option<SharedLayerStorage>) {
        self.layers = storage;
    }

    /// The handle allocator this buffer draws from.
    pub fn allocator(&self) -> &HandleAllocator {
        self.handles.get()
    }

    /// The recorded commands, in order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Iterate over the recorded commands.
    pub fn iter(&self) -> core::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of `save` commands not yet matched by a `restore`.
    ///
    /// Negative when more restores than saves have been recorded.
    pub fn save_depth(&self) -> i32 {
        self.save_depth
    }

    /// Append one command.
    ///
    /// `save` and `restore` commands adjust the save depth like
    /// [`CommandBuffer::save`] and [`CommandBuffer::restore`].
    pub fn push(&mut self, command: Command) {
        match command {
            Command::Save => self.save_depth += 1,
            Command::Restore => self.save_depth -= 1,
            _ => {}
        }
        self.commands.push(command);
    }

    /// Append every command yielded by `commands`.
    pub fn extend_commands(&mut self, commands: impl IntoIterator<Item = Command>) {
        for command in commands {
            self.push(command);
        }
    }

    /// Replace this buffer's commands with a copy of `other`'s.
    ///
    /// Both buffers must be balanced. Otherwise nothing changes and
    /// [`DrawingError::UnbalancedSave`] is returned.
    pub fn copy_from(&mut self, other: &Self) -> Result<(), DrawingError> {
        if self.save_depth != 0 || other.save_depth != 0 {
            return Err(DrawingError::UnbalancedSave {
                target_depth: self.save_depth,
                source_depth: other.save_depth,
            });
        }
        self.commands.clone_from(&other.commands);
        Ok(())
    }

    /// Append all of `other`'s commands to this buffer.
    ///
    /// Unlike [`CommandBuffer::copy_from`] this has no balance requirement; the
    /// save depth absorbs `other`'s depth.
    pub fn add(&mut self, other: &Self) {
        self.commands.extend_from_slice(&other.commands);
        self.save_depth += other.save_depth;
    }

    /// Remove every command and reset the save depth to zero.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.save_depth = 0;
    }

    /// Save the graphics state.
    pub fn save(&mut self) {
        self.push(Command::Save);
    }

    /// Restore the most recently saved graphics state.
    pub fn restore(&mut self) {
        self.push(Command::Restore);
    }

    /// Save the graphics state and return a guard that restores it when
    /// dropped, including during unwinding.
    pub fn saved(&mut self) -> SaveGuard<'_> {
        self.save();
        SaveGuard { buffer: self }
    }

    /// Run `f` inside a save/restore scope.
    pub fn with_saved<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let mut guard = self.saved();
        f(&mut guard)
    }

    /// Start a new, empty path.
    pub fn begin_path(&mut self) {
        self.push(Command::BeginPath);
    }

    /// Close the current subpath.
    pub fn close_path(&mut self) {
        self.push(Command::ClosePath);
    }

    /// Start a new subpath at `(x, y)`.
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.push(Command::MoveTo { x, y });
    }

    /// Add a straight segment to `(x, y)`.
    pub fn line_to(&mut self, x: f64, y: f64) {
        self.push(Command::LineTo { x, y });
    }

    /// Add a closed rectangle subpath.
    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(Command::Rect {
            x,
            y,
            width,
            height,
        });
    }

    /// Add a rounded rectangle subpath with corner radius `radius`.
    ///
    /// Recorded as a move, four arc-to commands, and a close.
    pub fn round_rect(&mut self, x: f64, y: f64, width: f64, height: f64, radius: f64) {
        let (right, bottom) = (x + width, y + height);
        self.move_to(x + radius, y);
        self.arc_to(right, y, right, bottom, radius);
        self.arc_to(right, bottom, x, bottom, radius);
        self.arc_to(x, bottom, x, y, radius);
        self.arc_to(x, y, right, y, radius);
        self.close_path();
    }

    /// Add a circular arc centered on `(x, y)` from `start_angle` to
    /// `end_angle` (radians).
    pub fn arc(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        counterclockwise: bool,
    ) {
        self.push(Command::Arc {
            x,
            y,
            radius,
            start_angle,
            end_angle,
            counterclockwise,
        });
    }

    /// Add an arc of `radius` tangent to the lines from the current point to
    /// `(x1, y1)` and from `(x1, y1)` to `(x2, y2)`.
    pub fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) {
        self.push(Command::ArcTo {
            x1,
            y1,
            x2,
            y2,
            radius,
        });
    }

    /// Intersect the clip region with a rectangle.
    pub fn clip_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(Command::Clip {
            x,
            y,
            width,
            height,
        });
    }

    /// Append a translation to the current transform.
    pub fn translate(&mut self, x: f64, y: f64) {
        self.push(Command::Translate { x, y });
    }

    /// Append a scale to the current transform.
    pub fn scale(&mut self, x: f64, y: f64) {
        self.push(Command::Scale { x, y });
    }

    /// Append a rotation by `radians` to the current transform.
    ///
    /// The command stores the angle in degrees.
    pub fn rotate(&mut self, radians: f64) {
        self.push(Command::Rotate {
            degrees: radians.to_degrees(),
        });
    }

    /// Stroke the current path.
    pub fn stroke(&mut self) {
        self.push(Command::Stroke);
    }

    /// Fill the current path.
    pub fn fill(&mut self) {
        self.push(Command::Fill);
    }

    /// Draw `text` anchored at `(x, y)`.
    pub fn fill_text(&mut self, text: impl Into<String>, x: f64, y: f64, max_width: Option<f64>) {
        self.push(Command::FillText {
            text: text.into(),
            x,
            y,
            max_width,
        });
    }

    /// Draw `image` into the rectangle at `(x, y)` of size `width` × `height`.
    ///
    /// Allocates a fresh [`ImageId`](crate::ImageId) for the draw.
    pub fn draw_image(&mut self, image: &PixelBuffer, x: f64, y: f64, width: f64, height: f64) {
        let id = self.handles.get().next_image();
        self.push(Command::Image {
            width: image.width(),
            height: image.height(),
            pixels: image.clone(),
            image: id,
            x,
            y,
            dst_width: width,
            dst_height: height,
        });
    }

    /// Set the fill style to a color or a gradient.
    ///
    /// A gradient's declaration and color stops are appended here, followed by
    /// a `fill-style-gradient` reference to it.
    pub fn set_fill_style<'a>(&mut self, style: impl Into<FillStyle<'a>>) {
        match style.into() {
            FillStyle::Color(color) => self.push(Command::FillStyle { color }),
            FillStyle::Gradient(gradient) => {
                self.extend_commands(gradient.commands().iter().cloned());
                self.push(Command::FillStyleGradient {
                    gradient: gradient.id(),
                });
            }
        }
    }

    /// Declare a linear gradient using this buffer's handle allocator.
    ///
    /// Nothing is appended until the gradient is installed with
    /// [`CommandBuffer::set_fill_style`].
    pub fn create_linear_gradient(
        &self,
        width: f64,
        height: f64,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    ) -> LinearGradient {
        LinearGradient::new(self.handles.get(), width, height, x1, y1, x2, y2)
    }

    /// Set the font from a shorthand such as `"italic bold 14px Arial"`.
    pub fn set_font(&mut self, font: impl Into<String>) {
        self.push(Command::Font { font: font.into() });
    }

    /// Set the horizontal text alignment.
    pub fn set_text_align(&mut self, align: impl Into<String>) {
        self.push(Command::TextAlign {
            align: align.into(),
        });
    }

    /// Set the text baseline.
    pub fn set_text_baseline(&mut self, baseline: impl Into<String>) {
        self.push(Command::TextBaseline {
            baseline: baseline.into(),
        });
    }

    /// Set the stroke color.
    pub fn set_stroke_style(&mut self, color: impl Into<String>) {
        self.push(Command::StrokeStyle {
            color: color.into(),
        });
    }

    /// Set the stroke width.
    pub fn set_line_width(&mut self, width: f64) {
        self.push(Command::LineWidth { width });
    }

    /// Set an even dash pattern of `dash` on, `dash` off.
    pub fn set_line_dash(&mut self, dash: f64) {
        self.push(Command::LineDash { dash });
    }

    /// Set the line cap.
    pub fn set_line_cap(&mut self, cap: impl Into<String>) {
        self.push(Command::LineCap { cap: cap.into() });
    }

    /// Set the line join.
    pub fn set_line_join(&mut self, join: impl Into<String>) {
        self.push(Command::LineJoin { join: join.into() });
    }

    /// Record a renderer pause, used for performance testing.
    pub fn sleep(&mut self, duration: Duration) {
        self.push(Command::Sleep {
            seconds: duration.as_secs_f64(),
        });
    }

    /// Record a latency marker stamped with the current wall-clock time.
    #[cfg(feature = "std")]
    pub fn mark_latency(&mut self) {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0.0, |since| since.as_secs_f64());
        self.mark_latency_at(timestamp);
    }

    /// Record a latency marker with an explicit timestamp in seconds since
    /// the Unix epoch.
    pub fn mark_latency_at(&mut self, timestamp: f64) {
        self.push(Command::MarkLatency { timestamp });
    }

    /// Record a statistics marker.
    pub fn statistics(&mut self, id: impl Into<String>) {
        self.push(Command::StatisticsMarker { id: id.into() });
    }

    /// Mint a fresh layer identifier from the layer storage.
    ///
    /// Returns `None` when no storage is attached.
    #[cfg(feature = "std")]
    pub fn create_layer(&self) -> Option<LayerId> {
        let storage = self.layers.as_ref()?;
        Some(lock(storage).create_layer())
    }

    /// Mark the start of layer `id`. Ignored for an empty id.
    #[cfg(feature = "std")]
    pub fn begin_layer(&mut self, id: &LayerId) {
        self.with_storage(id, |storage, buffer| storage.begin_layer(buffer, id));
    }

    /// Mark the end of layer `id`. Ignored for an empty id.
    #[cfg(feature = "std")]
    pub fn end_layer(&mut self, id: &LayerId) {
        self.with_storage(id, |storage, buffer| storage.end_layer(buffer, id));
    }

    /// Draw the cached content of layer `id` here. Ignored for an empty id.
    #[cfg(feature = "std")]
    pub fn draw_layer(&mut self, id: &LayerId) {
        self.with_storage(id, |storage, buffer| storage.draw_layer(buffer, id));
    }

    /// Begin layer `id` and return a guard that ends it when dropped,
    /// including during unwinding.
    #[cfg(feature = "std")]
    pub fn layer(&mut self, id: &LayerId) -> LayerGuard<'_> {
        self.begin_layer(id);
        LayerGuard {
            buffer: self,
            id: id.clone(),
        }
    }

    /// Run `f` between [`CommandBuffer::begin_layer`] and
    /// [`CommandBuffer::end_layer`].
    #[cfg(feature = "std")]
    pub fn with_layer<R>(&mut self, id: &LayerId, f: impl FnOnce(&mut Self) -> R) -> R {
        let mut guard = self.layer(id);
        f(&mut guard)
    }

    #[cfg(feature = "std")]
    fn with_storage(
        &mut self,
        id: &LayerId,
        f: impl FnOnce(&mut (dyn LayerStorage + Send + 'static), &mut Self),
    ) {
        if id.is_empty() {
            return;
        }
        let Some(storage) = self.layers.clone() else {
            tracing::debug!(layer = %id, "no layer storage attached, ignoring layer operation");
            return;
        };
        let mut storage = lock(&storage);
        f(&mut *storage, self);
    }
}

#[cfg(feature = "std")]
fn lock(storage: &SharedLayerStorage) -> MutexGuard<'_, dyn LayerStorage + Send + 'static> {
    storage.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<'a> IntoIterator for &'a CommandBuffer {
    type Item = &'a Command;
    type IntoIter = core::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

/// Scope guard returned by [`CommandBuffer::saved`].
///
/// Dereferences to the buffer; appends the matching `restore` when dropped.
#[derive(Debug)]
pub struct SaveGuard<'a> {
    buffer: &'a mut CommandBuffer,
}

impl Deref for SaveGuard<'_> {
    type Target = CommandBuffer;

    fn deref(&self) -> &CommandBuffer {
        self.buffer
    }
}

impl DerefMut for SaveGuard<'_> {
    fn deref_mut(&mut self) -> &mut CommandBuffer {
        self.buffer
    }
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        self.buffer.restore();
    }
}

/// Scope guard returned by [`CommandBuffer::layer`].
///
/// Dereferences to the buffer; ends the layer when dropped.
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct LayerGuard<'a> {
    buffer: &'a mut CommandBuffer,
    id: LayerId,
}

#[cfg(feature = "std")]
impl LayerGuard<'_> {
    /// The layer being recorded.
    pub fn id(&self) -> &LayerId {
        &self.id
    }
}

#[cfg(feature = "std")]
impl Deref for LayerGuard<'_> {
    type Target = CommandBuffer;

    fn deref(&self) -> &CommandBuffer {
        self.buffer
    }
}

#[cfg(feature = "std")]
impl DerefMut for LayerGuard<'_> {
    fn deref_mut(&mut self) -> &mut CommandBuffer {
        self.buffer
    }
}

#[cfg(feature = "std")]
impl Drop for LayerGuard<'_> {
    fn drop(&mut self) {
        self.buffer.end_layer(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "std")]
    use crate::layer::{LayerCache, LayerSource};

    #[test]
    fn save_restore_track_depth() {
        let mut buffer = CommandBuffer::new();
        buffer.save();
        buffer.save();
        assert_eq!(buffer.save_depth(), 2);
        buffer.restore();
        assert_eq!(buffer.save_depth(), 1);
        buffer.restore();
        buffer.restore();
        assert_eq!(buffer.save_depth(), -1);
    }

    #[test]
    fn clear_resets_everything() {
        let mut buffer = CommandBuffer::new();
        buffer.save();
        buffer.save();
        buffer.move_to(1.0, 2.0);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.save_depth(), 0);
    }

    #[test]
    fn copy_from_requires_balance_on_both_sides() {
        let mut source = CommandBuffer::new();
        source.begin_path();
        source.save();

        let mut target = CommandBuffer::new();
        target.fill();
        assert_eq!(
            target.copy_from(&source),
            Err(DrawingError::UnbalancedSave {
                target_depth: 0,
                source_depth: 1
            })
        );
        assert_eq!(target.commands(), &[Command::Fill]);

        source.restore();
        target.save();
        assert!(target.copy_from(&source).is_err());

        target.restore();
        target.copy_from(&source).unwrap();
        assert_eq!(target.commands(), source.commands());
    }

    #[test]
    fn add_appends_without_balance_check() {
        let mut a = CommandBuffer::new();
        a.save();
        let mut b = CommandBuffer::new();
        b.save();
        b.fill();
        a.add(&b);
        assert_eq!(a.commands(), &[Command::Save, Command::Save, Command::Fill]);
        assert_eq!(a.save_depth(), 2);
    }

    #[test]
    fn round_rect_appends_six_commands() {
        let mut buffer = CommandBuffer::new();
        buffer.round_rect(0.0, 0.0, 10.0, 20.0, 2.0);
        let kinds: Vec<_> = buffer.iter().map(Command::kind).collect();
        assert_eq!(
            kinds,
            ["move-to", "arc-to", "arc-to", "arc-to", "arc-to", "close-path"]
        );
        assert_eq!(buffer.commands()[0], Command::MoveTo { x: 2.0, y: 0.0 });
    }

    #[test]
    fn rotate_records_degrees() {
        let mut buffer = CommandBuffer::new();
        buffer.rotate(core::f64::consts::FRAC_PI_2);
        let Command::Rotate { degrees } = buffer.commands()[0] else {
            panic!("expected rotate");
        };
        assert!((degrees - 90.0).abs() < 1e-9, "got {degrees}");
    }

    #[test]
    fn gradient_fill_style_commits_gradient_inline() {
        let mut buffer = CommandBuffer::with_allocator(Arc::new(HandleAllocator::new()));
        let mut gradient = buffer.create_linear_gradient(10.0, 10.0, 0.0, 0.0, 10.0, 0.0);
        gradient.add_color_stop(0.0, "red").add_color_stop(1.0, "blue");

        buffer.fill();
        buffer.set_fill_style(&gradient);
        buffer.set_fill_style("#ccc");

        let kinds: Vec<_> = buffer.iter().map(Command::kind).collect();
        assert_eq!(
            kinds,
            [
                "fill",
                "gradient",
                "color-stop",
                "color-stop",
                "fill-style-gradient",
                "fill-style"
            ]
        );
        assert_eq!(
            buffer.commands()[4],
            Command::FillStyleGradient {
                gradient: gradient.id()
            }
        );
    }

    #[test]
    fn saved_guard_restores_on_early_return() {
        fn paint(buffer: &mut CommandBuffer, bail: bool) -> Option<()> {
            let mut scope = buffer.saved();
            scope.fill();
            if bail {
                return None;
            }
            scope.stroke();
            Some(())
        }

        let mut buffer = CommandBuffer::new();
        assert!(paint(&mut buffer, true).is_none());
        assert_eq!(buffer.save_depth(), 0);
        assert_eq!(
            buffer.commands(),
            &[Command::Save, Command::Fill, Command::Restore]
        );
    }

    #[test]
    fn draw_image_allocates_distinct_handles() {
        let mut buffer = CommandBuffer::with_allocator(Arc::new(HandleAllocator::new()));
        let image = PixelBuffer::filled(2, 2, 0xff_00_00_00).unwrap();
        buffer.draw_image(&image, 0.0, 0.0, 4.0, 4.0);
        buffer.draw_image(&image, 4.0, 0.0, 4.0, 4.0);
        let ids: Vec<_> = buffer
            .iter()
            .filter_map(|command| match command {
                Command::Image { image, .. } => Some(image.0),
                _ => None,
            })
            .collect();
        assert_eq!(ids, [1, 2]);
    }

    #[test]
    fn latency_marker_keeps_explicit_timestamp() {
        let mut buffer = CommandBuffer::new();
        buffer.mark_latency_at(12.5);
        assert_eq!(
            buffer.commands(),
            &[Command::MarkLatency { timestamp: 12.5 }]
        );
    }

    #[test]
    fn allocator_defaults_to_shared() {
        let buffer = CommandBuffer::new();
        assert!(core::ptr::eq(buffer.allocator(), HandleAllocator::shared()));
        let own = Arc::new(HandleAllocator::new());
        let buffer = CommandBuffer::with_allocator(own.clone());
        assert!(core::ptr::eq(buffer.allocator(), &*own));
    }

    #[cfg(feature = "std")]
    #[test]
    fn layer_operations_without_storage_are_noops() {
        let mut buffer = CommandBuffer::new();
        assert_eq!(buffer.create_layer(), None);
        buffer.begin_layer(&LayerId::from("a"));
        buffer.draw_layer(&LayerId::from("a"));
        buffer.end_layer(&LayerId::from("a"));
        assert!(buffer.is_empty());
    }

    #[cfg(feature = "std")]
    #[test]
    fn layer_operations_delegate_to_storage() {
        let cache = Arc::new(Mutex::new(LayerCache::new()));
        let mut buffer = CommandBuffer::new().with_layer_storage(cache.clone());

        let id = buffer.create_layer().unwrap();
        buffer.with_layer(&id, |b| {
            b.rect(0.0, 0.0, 1.0, 1.0);
        });
        buffer.draw_layer(&id);
        buffer.begin_layer(&LayerId::from(""));

        assert_eq!(buffer.len(), 4);
        let cache = cache.lock().unwrap();
        assert_eq!(cache.layer_commands(&id).map(<[Command]>::len), Some(1));
    }

    #[cfg(feature = "std")]
    #[test]
    fn layer_guard_ends_layer_on_early_return() {
        fn record(buffer: &mut CommandBuffer, id: &LayerId, bail: bool) -> Option<()> {
            let mut scope = buffer.layer(id);
            scope.rect(0.0, 0.0, 1.0, 1.0);
            if bail {
                return None;
            }
            scope.fill();
            Some(())
        }

        let cache = Arc::new(Mutex::new(LayerCache::new()));
        let mut buffer = CommandBuffer::new().with_layer_storage(cache.clone());
        let id = buffer.create_layer().unwrap();
        assert!(record(&mut buffer, &id, true).is_none());

        let kinds: Vec<_> = buffer.iter().map(Command::kind).collect();
        assert_eq!(kinds, ["begin-layer", "rect", "end-layer"]);
        let cache = cache.lock().unwrap();
        assert_eq!(cache.layer_commands(&id).map(<[Command]>::len), Some(1));
    }

    #[cfg(feature = "std")]
    #[test]
    fn layer_guard_ends_layer_when_unwinding() {
        let cache = Arc::new(Mutex::new(LayerCache::new()));
        let mut buffer = CommandBuffer::new().with_layer_storage(cache.clone());
        let id = buffer.create_layer().unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            buffer.with_layer(&id, |b| {
                b.begin_path();
                panic!("interrupted while recording");
            });
        }));
        assert!(result.is_err());
        assert_eq!(buffer.commands().last().map(Command::kind), Some("end-layer"));
        let cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(cache.layer_commands(&id).map(<[Command]>::len), Some(1));
    }
}
