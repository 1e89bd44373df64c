//! Surface pool
//!
//! Hands out cleared surfaces keyed by owner, and keeps released surfaces
//! around for reuse by a later acquire of matching dimensions. Bound plus
//! checked-out surfaces are counted against an optional memory ceiling;
//! idle surfaces are evicted before an acquire is refused.

use std::collections::HashMap;

use loomkit_core::{EngineError, LayerId, Result};

use crate::surface::{estimate_bytes, Surface, SurfaceFormat};

/// Owner of a bound surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKey {
    /// Pixel content of one layer
    Layer(LayerId),
    /// Merged visible stack
    Composed,
    /// Scalar height channel
    Displacement,
    /// Encoded surface normals
    Normal,
    /// Transient preview geometry and anchor markers
    Overlay,
}

impl SurfaceKey {
    /// Pixel format a surface for this owner uses.
    pub fn format(&self) -> SurfaceFormat {
        match self {
            SurfaceKey::Displacement => SurfaceFormat::Gray8,
            _ => SurfaceFormat::Rgba8,
        }
    }
}

/// Pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Surfaces bound to an owner (including checked-out ones)
    pub active: usize,
    /// Idle surfaces waiting for reuse
    pub pooled: usize,
    /// Estimated bytes held by active surfaces
    pub active_bytes: usize,
    /// Estimated bytes held by idle surfaces
    pub pooled_bytes: usize,
}

impl PoolStats {
    /// Total estimated footprint
    pub fn estimated_bytes(&self) -> usize {
        self.active_bytes + self.pooled_bytes
    }
}

/// Pool of raster surfaces for one compositing session
#[derive(Debug)]
pub struct SurfacePool {
    width: u32,
    height: u32,
    ceiling_bytes: usize,
    bound: HashMap<SurfaceKey, Surface>,
    checked_out: HashMap<SurfaceKey, usize>,
    idle: Vec<Surface>,
}

impl SurfacePool {
    /// Create a pool with canonical dimensions. A ceiling of 0 disables the
    /// memory check.
    pub fn new(width: u32, height: u32, ceiling_bytes: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidDimensions { width, height }.into());
        }
        Ok(Self {
            width,
            height,
            ceiling_bytes,
            bound: HashMap::new(),
            checked_out: HashMap::new(),
            idle: Vec::new(),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn ceiling_bytes(&self) -> usize {
        self.ceiling_bytes
    }

    /// Return the surface bound to `key`, binding one if needed.
    ///
    /// An existing binding with other dimensions is resized in place and
    /// cleared. A new binding reuses an idle surface of matching shape or
    /// allocates; either way it is handed out cleared.
    pub fn acquire(&mut self, key: SurfaceKey, width: u32, height: u32) -> Result<&mut Surface> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidDimensions { width, height }.into());
        }
        let requested = estimate_bytes(width, height);

        if self.bound.contains_key(&key) {
            let current = self
                .bound
                .get(&key)
                .map(|s| (s.dimensions(), s.byte_size()))
                .unwrap_or(((0, 0), 0));
            if current.0 != (width, height) {
                self.reserve(requested, current.1)?;
                if let Some(surface) = self.bound.get_mut(&key) {
                    surface.resize(width, height)?;
                }
                tracing::debug!("Resized {:?} surface to {}x{}", key, width, height);
            }
        } else {
            self.reserve(requested, 0)?;
            let format = key.format();
            let surface = match self
                .idle
                .iter()
                .position(|s| s.format() == format && s.dimensions() == (width, height))
            {
                Some(index) => {
                    let mut surface = self.idle.swap_remove(index);
                    surface.clear();
                    surface
                }
                None => Surface::new(width, height, format)?,
            };
            self.bound.insert(key, surface);
        }

        self.bound
            .get_mut(&key)
            .ok_or_else(|| loomkit_core::Error::other(format!("{:?} surface vanished", key)))
    }

    /// Acquire at canonical dimensions.
    pub fn acquire_canonical(&mut self, key: SurfaceKey) -> Result<&mut Surface> {
        let (w, h) = self.dimensions();
        self.acquire(key, w, h)
    }

    /// Detach the surface from `key` and keep it for reuse.
    ///
    /// Returns false when nothing was bound.
    pub fn release(&mut self, key: &SurfaceKey) -> bool {
        match self.bound.remove(key) {
            Some(surface) => {
                self.idle.push(surface);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &SurfaceKey) -> Option<&Surface> {
        self.bound.get(key)
    }

    pub fn get_mut(&mut self, key: &SurfaceKey) -> Option<&mut Surface> {
        self.bound.get_mut(key)
    }

    pub fn contains(&self, key: &SurfaceKey) -> bool {
        self.bound.contains_key(key)
    }

    /// Take the canonical surface for `key` out of the pool so it can be
    /// written while other bound surfaces are read. Its bytes stay counted
    /// until [`checkin`](Self::checkin).
    pub fn checkout(&mut self, key: SurfaceKey) -> Result<Surface> {
        self.acquire_canonical(key)?;
        let surface = self
            .bound
            .remove(&key)
            .ok_or_else(|| loomkit_core::Error::other(format!("{:?} surface vanished", key)))?;
        self.checked_out.insert(key, surface.byte_size());
        Ok(surface)
    }

    /// Return a checked-out surface to its owner.
    pub fn checkin(&mut self, key: SurfaceKey, surface: Surface) {
        self.checked_out.remove(&key);
        if let Some(previous) = self.bound.insert(key, surface) {
            self.idle.push(previous);
        }
    }

    /// Lazily created composed output.
    pub fn composed(&mut self) -> Result<&mut Surface> {
        self.acquire_canonical(SurfaceKey::Composed)
    }

    /// Lazily created displacement output.
    pub fn displacement(&mut self) -> Result<&mut Surface> {
        self.acquire_canonical(SurfaceKey::Displacement)
    }

    /// Lazily created normal output.
    pub fn normal(&mut self) -> Result<&mut Surface> {
        self.acquire_canonical(SurfaceKey::Normal)
    }

    /// Lazily created overlay.
    pub fn overlay(&mut self) -> Result<&mut Surface> {
        self.acquire_canonical(SurfaceKey::Overlay)
    }

    /// Change canonical dimensions; every bound surface is resized and
    /// cleared and idle surfaces are dropped. Atomic on failure.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidDimensions { width, height }.into());
        }
        let per_surface = estimate_bytes(width, height);
        let count = self.bound.len() + self.checked_out.len();
        let needed = per_surface.saturating_mul(count);
        if self.ceiling_bytes != 0 && needed > self.ceiling_bytes {
            return Err(EngineError::ResourceExhaustion {
                requested_bytes: needed,
                in_use_bytes: self.in_use_bytes(),
                ceiling_bytes: self.ceiling_bytes,
            }
            .into());
        }

        for surface in self.bound.values_mut() {
            surface.resize(width, height)?;
        }
        self.idle.clear();
        self.width = width;
        self.height = height;
        tracing::info!("Surface pool resized to {}x{}", width, height);
        Ok(())
    }

    /// Check that swapping `released` bound surfaces for `added` new ones
    /// fits the ceiling once every surface is `width`x`height`. Changes
    /// nothing; used before bulk rebinding so a refusal leaves owners intact.
    pub fn check_rebind(
        &self,
        released: usize,
        added: usize,
        width: u32,
        height: u32,
    ) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidDimensions { width, height }.into());
        }
        if self.ceiling_bytes == 0 {
            return Ok(());
        }
        let count = (self.bound.len() + self.checked_out.len()).saturating_sub(released);
        let needed = estimate_bytes(width, height).saturating_mul(count.saturating_add(added));
        if needed > self.ceiling_bytes {
            return Err(EngineError::ResourceExhaustion {
                requested_bytes: needed,
                in_use_bytes: self.in_use_bytes(),
                ceiling_bytes: self.ceiling_bytes,
            }
            .into());
        }
        Ok(())
    }

    /// Drop every idle surface.
    pub fn trim(&mut self) -> usize {
        let dropped = self.idle.len();
        self.idle.clear();
        dropped
    }

    /// Bytes held by bound and checked-out surfaces.
    pub fn in_use_bytes(&self) -> usize {
        self.bound.values().map(Surface::byte_size).sum::<usize>()
            + self.checked_out.values().sum::<usize>()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            active: self.bound.len() + self.checked_out.len(),
            pooled: self.idle.len(),
            active_bytes: self.in_use_bytes(),
            pooled_bytes: self.idle.iter().map(Surface::byte_size).sum(),
        }
    }

    /// Make room for `requested` bytes replacing `replacing` bytes of an
    /// existing binding. Idle surfaces are evicted first.
    fn reserve(&mut self, requested: usize, replacing: usize) -> Result<()> {
        if self.ceiling_bytes == 0 {
            return Ok(());
        }
        let in_use = self.in_use_bytes().saturating_sub(replacing);
        if in_use.saturating_add(requested) > self.ceiling_bytes {
            return Err(EngineError::ResourceExhaustion {
                requested_bytes: requested,
                in_use_bytes: in_use,
                ceiling_bytes: self.ceiling_bytes,
            }
            .into());
        }

        let mut pooled: usize = self.idle.iter().map(Surface::byte_size).sum();
        while in_use + requested + pooled > self.ceiling_bytes {
            let Some(evicted) = self.idle.pop() else {
                break;
            };
            pooled -= evicted.byte_size();
            tracing::debug!("Evicted idle {}x{} surface", evicted.width(), evicted.height());
        }
        Ok(())
    }
}
