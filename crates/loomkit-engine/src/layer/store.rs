//! Layer store
//!
//! The ordered layer collection of one session. Layers are kept sorted by
//! `order`, which is always the dense range `0..len`. Pixel content lives in
//! the [`SurfacePool`] under [`SurfaceKey::Layer`]; every operation that
//! binds or releases surfaces takes the pool explicitly.
//!
//! Two revision counters let the compositor skip work: `revision` moves on
//! every change that affects the composed output, `displacement_revision`
//! on changes that affect puff layers.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use loomkit_core::{
    EngineError, EventBus, GroupId, LayerEvent, LayerId, Result, SessionEvent,
};

use super::group::LayerGroup;
use super::model::{BlendMode, Layer, LayerKind, ToolPayload};
use crate::pool::{SurfaceKey, SurfacePool};
use crate::surface::Surface;

fn not_found(id: LayerId) -> EngineError {
    EngineError::LayerNotFound { id: id.to_string() }
}

fn group_not_found(id: GroupId) -> EngineError {
    EngineError::GroupNotFound { id: id.to_string() }
}

/// Ordered layers plus groups
pub struct LayerStore {
    width: u32,
    height: u32,
    layers: Vec<Layer>,
    groups: Vec<LayerGroup>,
    active: Option<LayerId>,
    revision: u64,
    displacement_revision: u64,
    bus: Arc<EventBus>,
}

impl LayerStore {
    /// Store with its own event bus
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_bus(width, height, Arc::new(EventBus::new()))
    }

    /// Store publishing on a session's bus
    pub fn with_bus(width: u32, height: u32, bus: Arc<EventBus>) -> Self {
        Self {
            width,
            height,
            layers: Vec::new(),
            groups: Vec::new(),
            active: None,
            revision: 0,
            displacement_revision: 0,
            bus,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers bottom to top.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Ids bottom to top.
    pub fn ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id).collect()
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer(&self, id: LayerId) -> Result<&Layer> {
        Ok(self.get(id).ok_or_else(|| not_found(id))?)
    }

    pub fn active_id(&self) -> Option<LayerId> {
        self.active
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn set_active(&mut self, id: LayerId) -> Result<()> {
        self.index_of(id)?;
        if self.active != Some(id) {
            self.active = Some(id);
            self.emit(LayerEvent::ActiveChanged { id: Some(id) });
        }
        Ok(())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn displacement_revision(&self) -> u64 {
        self.displacement_revision
    }

    pub fn groups(&self) -> &[LayerGroup] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Option<&LayerGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// The group a layer belongs to, if any.
    pub fn group_of(&self, layer: LayerId) -> Option<&LayerGroup> {
        self.groups.iter().find(|g| g.contains(&layer))
    }

    /// Layer opacity times its group's opacity.
    pub fn effective_opacity(&self, layer: &Layer) -> f32 {
        let group = self.group_of(layer.id).map_or(1.0, |g| g.opacity);
        (layer.opacity * group).clamp(0.0, 1.0)
    }

    /// Visible itself and not hidden by its group.
    pub fn is_effectively_visible(&self, layer: &Layer) -> bool {
        layer.visible && self.group_of(layer.id).is_none_or(|g| g.visible)
    }

    /// Append a new empty layer on top and make it active.
    pub fn create(
        &mut self,
        kind: LayerKind,
        name: Option<&str>,
        pool: &mut SurfacePool,
    ) -> Result<&Layer> {
        let order = self.layers.len();
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("Layer {}", order + 1));
        let layer = Layer::new(kind, name, order);
        pool.acquire(SurfaceKey::Layer(layer.id), self.width, self.height)?;
        Ok(self.push_layer(layer))
    }

    fn push_layer(&mut self, layer: Layer) -> &Layer {
        let id = layer.id;
        let name = layer.name.clone();
        self.layers.push(layer);
        self.active = Some(id);
        self.bump(false);
        tracing::debug!("Created layer {} '{}'", id, name);
        self.emit(LayerEvent::Created { id, name });
        self.emit(LayerEvent::ActiveChanged { id: Some(id) });
        &self.layers[self.layers.len() - 1]
    }

    /// Remove a layer and return its surface to the pool.
    pub fn delete(&mut self, id: LayerId, pool: &mut SurfacePool) -> Result<()> {
        let index = self.index_of(id)?;
        let removed = self.layers.remove(index);
        pool.release(&SurfaceKey::Layer(id));
        for group in &mut self.groups {
            group.members.remove(&id);
        }
        self.renumber();
        self.bump(removed.payload.is_displacement());
        tracing::debug!("Deleted layer {}", id);
        self.emit(LayerEvent::Deleted { id });

        if self.active == Some(id) {
            self.active = self.layers.last().map(|l| l.id);
            self.emit(LayerEvent::ActiveChanged { id: self.active });
        }
        Ok(())
    }

    /// Deep copy (metadata, payload and pixels) appended on top.
    pub fn duplicate(&mut self, id: LayerId, pool: &mut SurfacePool) -> Result<&Layer> {
        let source = self.layer(id)?.clone();
        let mut copy = Layer::new(source.kind, format!("{} copy", source.name), self.layers.len());
        copy.visible = source.visible;
        copy.opacity = source.opacity;
        copy.blend_mode = source.blend_mode;
        copy.locked = source.locked;
        copy.tool = source.tool.clone();
        copy.payload = source.payload.clone();

        let pixels = pool.get(&SurfaceKey::Layer(id)).cloned();
        let target = pool.acquire(SurfaceKey::Layer(copy.id), self.width, self.height)?;
        if let Some(pixels) = pixels {
            if let Err(err) = target.copy_from(&pixels) {
                pool.release(&SurfaceKey::Layer(copy.id));
                return Err(err);
            }
        }
        let is_displacement = copy.payload.is_displacement();
        let copy = self.push_layer(copy).id;
        if is_displacement {
            self.bump(true);
        }
        self.layer(copy)
    }

    pub fn rename(&mut self, id: LayerId, name: impl Into<String>) -> Result<()> {
        let index = self.index_of(id)?;
        self.layers[index].name = name.into();
        self.layers[index].touch();
        self.emit(LayerEvent::MetadataChanged { id });
        Ok(())
    }

    pub fn set_visible(&mut self, id: LayerId, visible: bool) -> Result<()> {
        self.update_metadata(id, |l| {
            let changed = l.visible != visible;
            l.visible = visible;
            changed
        })
    }

    /// Opacity is clamped to `[0, 1]`; NaN is ignored.
    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) -> Result<()> {
        if opacity.is_nan() {
            tracing::warn!("Ignoring NaN opacity for layer {}", id);
            return Ok(());
        }
        let opacity = opacity.clamp(0.0, 1.0);
        self.update_metadata(id, |l| {
            let changed = l.opacity != opacity;
            l.opacity = opacity;
            changed
        })
    }

    pub fn set_blend_mode(&mut self, id: LayerId, mode: BlendMode) -> Result<()> {
        self.update_metadata(id, |l| {
            let changed = l.blend_mode != mode;
            l.blend_mode = mode;
            changed
        })
    }

    /// Locked layers refuse pixel and payload edits.
    pub fn set_locked(&mut self, id: LayerId, locked: bool) -> Result<()> {
        self.update_metadata(id, |l| {
            let changed = l.locked != locked;
            l.locked = locked;
            changed
        })
    }

    fn update_metadata(&mut self, id: LayerId, f: impl FnOnce(&mut Layer) -> bool) -> Result<()> {
        let index = self.index_of(id)?;
        let layer = &mut self.layers[index];
        if f(layer) {
            layer.touch();
            let displacement = layer.payload.is_displacement();
            self.bump(displacement);
            self.emit(LayerEvent::MetadataChanged { id });
        }
        Ok(())
    }

    pub fn move_up(&mut self, id: LayerId) -> Result<()> {
        let index = self.index_of(id)?;
        if index + 1 < self.layers.len() {
            self.layers.swap(index, index + 1);
            self.reordered();
        }
        Ok(())
    }

    pub fn move_down(&mut self, id: LayerId) -> Result<()> {
        let index = self.index_of(id)?;
        if index > 0 {
            self.layers.swap(index, index - 1);
            self.reordered();
        }
        Ok(())
    }

    pub fn move_to_top(&mut self, id: LayerId) -> Result<()> {
        let index = self.index_of(id)?;
        if index + 1 < self.layers.len() {
            let layer = self.layers.remove(index);
            self.layers.push(layer);
            self.reordered();
        }
        Ok(())
    }

    pub fn move_to_bottom(&mut self, id: LayerId) -> Result<()> {
        let index = self.index_of(id)?;
        if index > 0 {
            let layer = self.layers.remove(index);
            self.layers.insert(0, layer);
            self.reordered();
        }
        Ok(())
    }

    /// Apply a full bottom-to-top ordering.
    ///
    /// `order` must be a permutation of the current ids; anything else is
    /// rejected with `InvalidOrder` and nothing changes.
    pub fn reorder(&mut self, order: &[LayerId]) -> Result<()> {
        if order.len() != self.layers.len() {
            return Err(EngineError::invalid_order(format!(
                "expected {} ids, got {}",
                self.layers.len(),
                order.len()
            ))
            .into());
        }
        let mut seen = HashSet::with_capacity(order.len());
        for id in order {
            if !seen.insert(*id) {
                return Err(EngineError::invalid_order(format!("{} listed twice", id)).into());
            }
            if self.get(*id).is_none() {
                return Err(EngineError::invalid_order(format!("{} is not in the store", id)).into());
            }
        }

        let position: HashMap<LayerId, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        self.layers
            .sort_by_key(|l| position.get(&l.id).copied().unwrap_or(usize::MAX));
        self.reordered();
        Ok(())
    }

    fn reordered(&mut self) {
        self.renumber();
        let has_displacement = self.layers.iter().any(|l| l.payload.is_displacement());
        self.bump(has_displacement);
        self.emit(LayerEvent::Reordered);
    }

    /// First visible, unlocked layer bound to `tool`, or a new one.
    ///
    /// Repeated strokes of one tool accumulate into one layer; the returned
    /// layer becomes active.
    pub fn get_or_create_tool_layer(
        &mut self,
        tool: &str,
        kind: LayerKind,
        pool: &mut SurfacePool,
    ) -> Result<LayerId> {
        let existing = self
            .layers
            .iter()
            .find(|l| l.is_bound_to(tool) && l.visible && !l.locked)
            .map(|l| l.id);
        if let Some(id) = existing {
            self.set_active(id)?;
            return Ok(id);
        }

        let id = self.create(kind, Some(&format!("{} layer", tool)), pool)?.id;
        let index = self.index_of(id)?;
        self.layers[index].tool = Some(tool.to_string());
        Ok(id)
    }

    /// Run a drawing operation against a layer's payload and surface, then
    /// mark the layer dirty. Locked layers are refused.
    pub fn paint<R>(
        &mut self,
        id: LayerId,
        pool: &mut SurfacePool,
        f: impl FnOnce(&mut ToolPayload, &mut Surface) -> Result<R>,
    ) -> Result<R> {
        let index = self.index_of(id)?;
        if self.layers[index].locked {
            return Err(EngineError::LayerLocked { id: id.to_string() }.into());
        }
        self.paint_at(index, pool, f)
    }

    /// Like [`paint`](Self::paint) but ignores the lock; used when replaying
    /// stored payloads after a resize or restore.
    pub(crate) fn repaint<R>(
        &mut self,
        id: LayerId,
        pool: &mut SurfacePool,
        f: impl FnOnce(&mut ToolPayload, &mut Surface) -> Result<R>,
    ) -> Result<R> {
        let index = self.index_of(id)?;
        self.paint_at(index, pool, f)
    }

    fn paint_at<R>(
        &mut self,
        index: usize,
        pool: &mut SurfacePool,
        f: impl FnOnce(&mut ToolPayload, &mut Surface) -> Result<R>,
    ) -> Result<R> {
        let id = self.layers[index].id;
        let surface = pool.acquire(SurfaceKey::Layer(id), self.width, self.height)?;
        let layer = &mut self.layers[index];
        let was_displacement = layer.payload.is_displacement();
        let result = f(&mut layer.payload, surface);
        layer.touch();
        let displacement = was_displacement || layer.payload.is_displacement();
        self.bump(displacement);
        self.emit(LayerEvent::Dirty { id });
        result
    }

    /// Drop a layer's payload and pixels.
    pub fn clear_layer(&mut self, id: LayerId, pool: &mut SurfacePool) -> Result<()> {
        self.paint(id, pool, |payload, surface| {
            *payload = ToolPayload::Empty;
            surface.clear();
            Ok(())
        })
    }

    /// New group holding `members`. Members leave any group they were in.
    pub fn create_group(&mut self, name: &str, members: &[LayerId]) -> Result<GroupId> {
        for id in members {
            self.index_of(*id)?;
        }
        let mut group = LayerGroup::new(name, self.groups.len());
        for id in members {
            self.detach_from_groups(*id);
            group.members.insert(*id);
        }
        let id = group.id;
        self.groups.push(group);
        self.bump(true);
        self.emit(LayerEvent::GroupChanged { id });
        Ok(id)
    }

    /// Move a layer into `group`.
    pub fn add_to_group(&mut self, group: GroupId, layer: LayerId) -> Result<()> {
        self.index_of(layer)?;
        let gi = self.group_index(group)?;
        if self.groups[gi].contains(&layer) {
            return Ok(());
        }
        self.detach_from_groups(layer);
        self.groups[gi].members.insert(layer);
        self.bump(true);
        self.emit(LayerEvent::GroupChanged { id: group });
        Ok(())
    }

    /// Returns false when the layer was not a member.
    pub fn remove_from_group(&mut self, group: GroupId, layer: LayerId) -> Result<bool> {
        let gi = self.group_index(group)?;
        let removed = self.groups[gi].members.remove(&layer);
        if removed {
            self.bump(true);
            self.emit(LayerEvent::GroupChanged { id: group });
        }
        Ok(removed)
    }

    /// Remove a group; its member layers stay.
    pub fn delete_group(&mut self, group: GroupId) -> Result<()> {
        let gi = self.group_index(group)?;
        self.groups.remove(gi);
        for (i, g) in self.groups.iter_mut().enumerate() {
            g.order = i;
        }
        self.bump(true);
        self.emit(LayerEvent::GroupChanged { id: group });
        Ok(())
    }

    pub fn set_group_visible(&mut self, group: GroupId, visible: bool) -> Result<()> {
        let gi = self.group_index(group)?;
        self.groups[gi].visible = visible;
        self.bump(true);
        self.emit(LayerEvent::GroupChanged { id: group });
        Ok(())
    }

    pub fn set_group_opacity(&mut self, group: GroupId, opacity: f32) -> Result<()> {
        let gi = self.group_index(group)?;
        if !opacity.is_nan() {
            self.groups[gi].opacity = opacity.clamp(0.0, 1.0);
        }
        self.bump(false);
        self.emit(LayerEvent::GroupChanged { id: group });
        Ok(())
    }

    pub fn set_group_blend_mode(&mut self, group: GroupId, mode: BlendMode) -> Result<()> {
        let gi = self.group_index(group)?;
        self.groups[gi].blend_mode = mode;
        self.emit(LayerEvent::GroupChanged { id: group });
        Ok(())
    }

    fn detach_from_groups(&mut self, layer: LayerId) {
        for group in &mut self.groups {
            group.members.remove(&layer);
        }
    }

    /// Record new canonical dimensions. Surfaces are resized by the pool;
    /// content must be replayed by the caller.
    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.bump(true);
    }

    /// Release every layer surface and forget all layers and groups.
    pub fn clear(&mut self, pool: &mut SurfacePool) {
        for layer in self.layers.drain(..) {
            pool.release(&SurfaceKey::Layer(layer.id));
        }
        self.groups.clear();
        if self.active.take().is_some() {
            self.emit(LayerEvent::ActiveChanged { id: None });
        }
        self.bump(true);
    }

    /// Check that `layers`, `groups` and `active` form a consistent store:
    /// unique ids, group members present and in at most one group.
    pub fn validate_content(
        layers: &[Layer],
        groups: &[LayerGroup],
        active: Option<LayerId>,
    ) -> Result<()> {
        let mut ids = HashSet::with_capacity(layers.len());
        for layer in layers {
            if !ids.insert(layer.id) {
                return Err(EngineError::DuplicateId {
                    id: layer.id.to_string(),
                }
                .into());
            }
        }
        let mut grouped: BTreeSet<LayerId> = BTreeSet::new();
        let mut group_ids = HashSet::with_capacity(groups.len());
        for group in groups {
            if !group_ids.insert(group.id) {
                return Err(EngineError::DuplicateId {
                    id: group.id.to_string(),
                }
                .into());
            }
            for member in &group.members {
                if !ids.contains(member) {
                    return Err(not_found(*member).into());
                }
                if !grouped.insert(*member) {
                    return Err(EngineError::DuplicateId {
                        id: member.to_string(),
                    }
                    .into());
                }
            }
        }
        if let Some(active) = active {
            if !ids.contains(&active) {
                return Err(not_found(active).into());
            }
        }
        Ok(())
    }

    /// Replace the whole content, e.g. from a snapshot.
    ///
    /// Layers are re-sorted by their stored order and renumbered densely.
    /// Every layer gets a cleared surface; payloads must be replayed by the
    /// caller. Validation and the pool ceiling are checked before anything
    /// changes, so a refusal leaves the current layers bound.
    pub fn replace_all(
        &mut self,
        mut layers: Vec<Layer>,
        groups: Vec<LayerGroup>,
        active: Option<LayerId>,
        pool: &mut SurfacePool,
    ) -> Result<()> {
        Self::validate_content(&layers, &groups, active)?;
        pool.check_rebind(self.layers.len(), layers.len(), self.width, self.height)?;

        self.clear(pool);
        layers.sort_by_key(|l| l.order);
        for (i, layer) in layers.iter_mut().enumerate() {
            layer.order = i;
        }
        for (bound, layer) in layers.iter().enumerate() {
            let acquired = pool
                .acquire(SurfaceKey::Layer(layer.id), self.width, self.height)
                .map(|_| ());
            if let Err(err) = acquired {
                // no surface may outlive its layer
                for orphan in &layers[..bound] {
                    pool.release(&SurfaceKey::Layer(orphan.id));
                }
                return Err(err);
            }
        }
        let mut groups = groups;
        groups.sort_by_key(|g| g.order);
        for (i, group) in groups.iter_mut().enumerate() {
            group.order = i;
        }

        self.layers = layers;
        self.groups = groups;
        self.active = active.or_else(|| self.layers.last().map(|l| l.id));
        self.bump(true);
        self.emit(LayerEvent::ActiveChanged { id: self.active });
        Ok(())
    }

    fn index_of(&self, id: LayerId) -> Result<usize> {
        Ok(self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| not_found(id))?)
    }

    fn group_index(&self, id: GroupId) -> Result<usize> {
        Ok(self
            .groups
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| group_not_found(id))?)
    }

    fn renumber(&mut self) {
        for (i, layer) in self.layers.iter_mut().enumerate() {
            layer.order = i;
        }
    }

    fn bump(&mut self, displacement: bool) {
        self.revision += 1;
        if displacement {
            self.displacement_revision += 1;
        }
    }

    fn emit(&self, event: LayerEvent) {
        self.bus.emit(SessionEvent::Layer(event));
    }
}

impl std::fmt::Debug for LayerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerStore")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layers", &self.layers.len())
            .field("groups", &self.groups.len())
            .field("active", &self.active)
            .field("revision", &self.revision)
            .finish()
    }
}
