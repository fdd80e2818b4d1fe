// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::buffer::CommandBuffer;
use crate::command::Command;

/// Opaque identifier of a cached layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    /// Create a layer identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty identifier, which layer operations ignore.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for LayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for LayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage collaborator that owns cached layer content.
///
/// A [`CommandBuffer`] only ever holds layer boundary markers. Each method
/// receives the buffer being recorded so the storage can append the markers
/// it needs and capture whatever lies between them.
pub trait LayerStorage {
    /// Mint a fresh, unused layer identifier.
    fn create_layer(&mut self) -> LayerId;

    /// Mark the start of the content of layer `id` in `buffer`.
    fn begin_layer(&mut self, buffer: &mut CommandBuffer, id: &LayerId);

    /// Mark the end of the content of layer `id` in `buffer`.
    fn end_layer(&mut self, buffer: &mut CommandBuffer, id: &LayerId);

    /// Request that the cached content of layer `id` be drawn at the current
    /// position of `buffer`.
    fn draw_layer(&mut self, buffer: &mut CommandBuffer, id: &LayerId);
}

/// Read access to cached layer content, used by interpreters at replay time.
pub trait LayerSource {
    /// Returns the commands recorded for layer `id`, if it is known.
    fn layer_commands(&self, id: &LayerId) -> Option<&[Command]>;
}

/// In-memory [`LayerStorage`] and [`LayerSource`].
///
/// `begin_layer`/`end_layer` append `begin-layer`/`end-layer` markers and
/// cache a copy of everything recorded between them. `draw_layer` appends a
/// `draw-layer` marker, which interpreters expand to the cached content.
#[derive(Debug, Default)]
pub struct LayerCache {
    next_id: u64,
    open: HashMap<LayerId, usize>,
    layers: HashMap<LayerId, Arc<[Command]>>,
}

impl LayerCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layers with cached content.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if no layer has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Drop the cached content of layer `id`.
    pub fn remove(&mut self, id: &LayerId) -> bool {
        self.open.remove(id);
        self.layers.remove(id).is_some()
    }
}

impl LayerStorage for LayerCache {
    fn create_layer(&mut self) -> LayerId {
        self.next_id += 1;
        LayerId(format!("layer-{}", self.next_id))
    }

    fn begin_layer(&mut self, buffer: &mut CommandBuffer, id: &LayerId) {
        buffer.push(Command::BeginLayer { id: id.clone() });
        self.open.insert(id.clone(), buffer.len());
    }

    fn end_layer(&mut self, buffer: &mut CommandBuffer, id: &LayerId) {
        let end = buffer.len();
        buffer.push(Command::EndLayer { id: id.clone() });
        let Some(start) = self.open.remove(id) else {
            tracing::warn!(layer = %id, "end_layer without matching begin_layer");
            return;
        };
        let content = buffer.commands().get(start..end).unwrap_or_default();
        tracing::trace!(layer = %id, commands = content.len(), "cached layer");
        self.layers.insert(id.clone(), Arc::from(content));
    }

    fn draw_layer(&mut self, buffer: &mut CommandBuffer, id: &LayerId) {
        if !self.layers.contains_key(id) {
            tracing::debug!(layer = %id, "drawing a layer that has not been cached yet");
        }
        buffer.push(Command::DrawLayer { id: id.clone() });
    }
}

impl LayerSource for LayerCache {
    fn layer_commands(&self, id: &LayerId) -> Option<&[Command]> {
        self.layers.get(id).map(|commands| &commands[..])
    }
}

/// Walk `commands` in order, expanding every `draw-layer` marker into the
/// cached content of that layer.
///
/// `visit` sees every command except `draw-layer` markers. Layers are resolved
/// through `layers`; without a source, or for an unknown layer, the marker is
/// skipped with a diagnostic. A layer that would draw itself (directly or
/// through another layer) is skipped as well.
pub fn visit_commands<'a>(
    commands: &'a [Command],
    layers: Option<&'a dyn LayerSource>,
    visit: &mut dyn FnMut(&'a Command),
) {
    let mut active = Vec::new();
    walk(commands, layers, &mut active, visit);
}

fn walk<'a>(
    commands: &'a [Command],
    layers: Option<&'a dyn LayerSource>,
    active: &mut Vec<&'a LayerId>,
    visit: &mut dyn FnMut(&'a Command),
) {
    for command in commands {
        let Command::DrawLayer { id } = command else {
            visit(command);
            continue;
        };
        if active.contains(&id) {
            tracing::warn!(layer = %id, "skipping recursive layer draw");
            continue;
        }
        let Some(content) = layers.and_then(|source| source.layer_commands(id)) else {
            tracing::debug!(layer = %id, "skipping draw of unknown layer");
            continue;
        };
        active.push(id);
        walk(content, layers, active, visit);
        active.pop();
    }
}
