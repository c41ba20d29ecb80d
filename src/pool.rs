//! Bounded pool of reusable render surfaces with LRU recycling.

use std::collections::{HashMap, VecDeque};

use tempfile::TempDir;

use crate::errors::DisplayError;
use crate::fingerprint::Fingerprint;
use crate::surface::{RenderSurface, SurfaceId};

/// Maps content fingerprints to render surfaces and decides whether a request
/// hits an existing surface, fills a spare slot, or recycles the least
/// recently used one. Owned and mutated exclusively by the presentation
/// thread, so no internal locking is needed.
pub struct SurfacePool {
    capacity: usize,
    /// Populated surfaces, keyed by the fingerprint of their current content.
    surfaces: HashMap<Fingerprint, RenderSurface>,
    /// Fingerprints from least to most recently used. Every entry has exactly
    /// one counterpart in `surfaces` and vice versa.
    recency: VecDeque<Fingerprint>,
    /// Surfaces reset by `reset_all`, kept warm for reuse before any new
    /// allocation.
    idle: Vec<RenderSurface>,
    /// Root directory below which every surface gets its private profile.
    profile_root: TempDir,
}

impl SurfacePool {
    pub fn new(capacity: usize) -> Result<Self, DisplayError> {
        let profile_root = tempfile::Builder::new().prefix("kiosk-display-").tempdir()?;
        Ok(Self {
            capacity: capacity.max(1),
            surfaces: HashMap::new(),
            recency: VecDeque::new(),
            idle: Vec::new(),
            profile_root,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of fingerprints currently mapped.
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Total surfaces alive, populated or idle. Never exceeds `capacity`.
    pub fn slot_count(&self) -> usize {
        self.surfaces.len() + self.idle.len()
    }

    /// Returns the surface for `fingerprint`, creating or recycling one if
    /// the content is not already pooled. The returned surface is most
    /// recently used afterwards.
    pub fn acquire(&mut self, fingerprint: Fingerprint) -> Result<&mut RenderSurface, DisplayError> {
        if self.surfaces.contains_key(&fingerprint) {
            self.touch(fingerprint);
        } else if let Some(mut surface) = self.idle.pop() {
            surface.retag(Some(fingerprint));
            self.surfaces.insert(fingerprint, surface);
            self.recency.push_back(fingerprint);
        } else if self.slot_count() < self.capacity {
            let surface = RenderSurface::new(fingerprint, self.profile_root.path())?;
            self.surfaces.insert(fingerprint, surface);
            self.recency.push_back(fingerprint);
        } else {
            // Pool is full: recycle the least recently used surface.
            let outdated = self
                .recency
                .pop_front()
                .expect("full pool with empty recency queue");
            let mut surface = self
                .surfaces
                .remove(&outdated)
                .expect("recency entry without mapping");
            log::debug!("recycling surface {:?} (was {outdated})", surface.id());
            surface.retag(Some(fingerprint));
            self.surfaces.insert(fingerprint, surface);
            self.recency.push_back(fingerprint);
        }

        debug_assert!(self.slot_count() <= self.capacity);
        debug_assert_eq!(self.recency.len(), self.surfaces.len());

        Ok(self
            .surfaces
            .get_mut(&fingerprint)
            .expect("surface inserted above"))
    }

    /// Moves `fingerprint` to the most recently used position.
    fn touch(&mut self, fingerprint: Fingerprint) {
        self.recency.retain(|fp| *fp != fingerprint);
        self.recency.push_back(fingerprint);
    }

    /// Returns every surface to the idle list, leaving the mapping empty but
    /// the slot count unchanged. In-flight loads are forgotten; the returned
    /// ids name the surfaces whose backend loads should be cancelled.
    pub fn reset_all(&mut self) -> Vec<SurfaceId> {
        let mut cancelled = Vec::with_capacity(self.surfaces.len());
        for (_, mut surface) in self.surfaces.drain() {
            cancelled.push(surface.id());
            surface.reset();
            self.idle.push(surface);
        }
        self.recency.clear();
        cancelled
    }

    /// Tears down all surfaces, removing their profile directories
    /// best-effort, then the shared profile root.
    pub fn shutdown(self) {
        for (_, surface) in self.surfaces {
            surface.shutdown();
        }
        for surface in self.idle {
            surface.shutdown();
        }
        let path = self.profile_root.path().to_owned();
        if let Err(e) = self.profile_root.close() {
            log::warn!("could not clean up profile root {path:?}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(payload: &str) -> Fingerprint {
        Fingerprint::of(payload)
    }

    #[test]
    fn capacity_is_never_exceeded() {
        let mut pool = SurfacePool::new(3).unwrap();
        for i in 0..20 {
            pool.acquire(fp(&format!("content-{i}"))).unwrap();
            assert!(pool.len() <= 3);
            assert!(pool.slot_count() <= 3);
        }
    }

    #[test]
    fn repeated_acquire_returns_same_surface() {
        let mut pool = SurfacePool::new(2).unwrap();
        let first = pool.acquire(fp("a")).unwrap().id();
        let second = pool.acquire(fp("a")).unwrap().id();
        assert_eq!(first, second);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn lru_surface_is_recycled() {
        let mut pool = SurfacePool::new(2).unwrap();
        let a = pool.acquire(fp("a")).unwrap().id();
        let b = pool.acquire(fp("b")).unwrap().id();
        // Refreshes "a" to most recently used, so "b" is the eviction victim.
        pool.acquire(fp("a")).unwrap();
        let c = pool.acquire(fp("c")).unwrap().id();

        assert_eq!(c, b, "surface that backed b must be recycled for c");
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.acquire(fp("a")).unwrap().id(), a);
        assert_eq!(pool.acquire(fp("c")).unwrap().id(), c);
    }

    #[test]
    fn recycled_surface_keeps_its_identity_and_profile() {
        let mut pool = SurfacePool::new(1).unwrap();
        let surface = pool.acquire(fp("a")).unwrap();
        let id = surface.id();
        let profile = surface.profile_dir().to_owned();

        let recycled = pool.acquire(fp("b")).unwrap();
        assert_eq!(recycled.id(), id);
        assert_eq!(recycled.profile_dir(), profile);
        assert_eq!(recycled.fingerprint(), Some(fp("b")));
    }

    #[test]
    fn reset_all_empties_mapping_but_keeps_slots() {
        let mut pool = SurfacePool::new(5).unwrap();
        for payload in ["a", "b", "c"] {
            pool.acquire(fp(payload)).unwrap();
        }
        assert_eq!(pool.len(), 3);

        let cancelled = pool.reset_all();

        assert_eq!(cancelled.len(), 3);
        assert!(pool.is_empty());
        assert_eq!(pool.slot_count(), 3);

        // Idle surfaces are reused before new ones are allocated.
        pool.acquire(fp("d")).unwrap();
        assert_eq!(pool.slot_count(), 3);
    }

    #[test]
    fn reset_surface_reloads_previously_identical_payload() {
        let mut pool = SurfacePool::new(1).unwrap();

        let request = crate::backend::LoadRequest::url("https://example.org");
        let (_, first) = pool
            .acquire(fp("https://example.org"))
            .unwrap()
            .load(&request, false);
        pool.reset_all();
        let (_, second) = pool
            .acquire(fp("https://example.org"))
            .unwrap()
            .load(&request, false);

        assert!(first.is_some());
        assert!(second.is_some(), "reset must forget the cached payload");
    }
}
