//! Scratch render-target pool
//!
//! Named, reusable off-screen targets. Backings are cached across frames
//! and reallocated only when the descriptor changes (resize, format
//! change); within one frame `acquire` is idempotent for the same name.
//! Every acquire must be matched by a release on every exit path;
//! `end_frame` force-releases stragglers with a diagnostic, since silent
//! leaks accumulate frame over frame.

use std::collections::HashMap;

use crate::target::backing::{BackingId, TargetBacking};
use crate::target::descriptor::TargetDescriptor;

/// Handle to a pooled scratch target
///
/// Valid for the frame it was acquired in. The generation increments when
/// the slot's backing is reallocated, so stale handles are detectable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetHandle {
    index: u32,
    generation: u32,
}

impl TargetHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

struct Slot {
    name: String,
    desc: TargetDescriptor,
    backing: BackingId,
    generation: u32,
    in_use: bool,
}

/// Pool of named scratch targets with cached backings
#[derive(Default)]
pub struct ScratchPool {
    slots: Vec<Slot>,
    by_name: HashMap<String, usize>,
    frame_open: bool,
}

impl ScratchPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the per-frame acquire window
    pub fn begin_frame(&mut self) {
        debug_assert!(!self.frame_open, "begin_frame called twice");
        self.frame_open = true;
    }

    /// Acquire the target named `name`, allocating or reallocating through
    /// `backing` as needed
    ///
    /// Idempotent within a frame: a second acquire with the same name and
    /// descriptor returns the same handle. A descriptor change frees the
    /// stale backing exactly once and allocates a replacement.
    pub fn acquire(
        &mut self,
        backing: &mut dyn TargetBacking,
        name: &str,
        desc: TargetDescriptor,
    ) -> TargetHandle {
        debug_assert!(self.frame_open, "acquire outside of a frame");

        if let Some(&index) = self.by_name.get(name) {
            let slot = &mut self.slots[index];
            if slot.desc != desc {
                backing.free(slot.backing);
                slot.backing = backing.alloc(name, &desc);
                slot.desc = desc;
                slot.generation += 1;
            }
            slot.in_use = true;
            return TargetHandle {
                index: index as u32,
                generation: slot.generation,
            };
        }

        let index = self.slots.len();
        let id = backing.alloc(name, &desc);
        self.slots.push(Slot {
            name: name.to_owned(),
            desc,
            backing: id,
            generation: 0,
            in_use: true,
        });
        self.by_name.insert(name.to_owned(), index);
        TargetHandle {
            index: index as u32,
            generation: 0,
        }
    }

    /// Release a handle acquired this frame
    ///
    /// The cached backing stays alive for reuse next frame; release only
    /// ends this frame's exclusive ownership.
    pub fn release(&mut self, handle: TargetHandle) {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            log::warn!("release of unknown scratch handle {:?}", handle);
            return;
        };
        if slot.generation != handle.generation {
            log::warn!("release of stale scratch handle for '{}'", slot.name);
            return;
        }
        slot.in_use = false;
    }

    /// Close the frame, force-releasing anything still held
    ///
    /// Returns the number of leaked handles. Leaks are the most severe
    /// defect class here; each one is logged.
    pub fn end_frame(&mut self) -> usize {
        debug_assert!(self.frame_open, "end_frame without begin_frame");
        self.frame_open = false;
        let mut leaked = 0;
        for slot in &mut self.slots {
            if slot.in_use {
                log::warn!("scratch target '{}' leaked past end of frame", slot.name);
                slot.in_use = false;
                leaked += 1;
            }
        }
        leaked
    }

    /// Force-release every handle held this frame without logging
    ///
    /// Used when an effect fails mid-record and its partial work is being
    /// discarded. Returns the number of handles reclaimed.
    pub fn reclaim(&mut self) -> usize {
        let mut reclaimed = 0;
        for slot in &mut self.slots {
            if slot.in_use {
                slot.in_use = false;
                reclaimed += 1;
            }
        }
        reclaimed
    }

    /// Free every cached backing; used when the owning feature set is
    /// disabled and must not allocate again until re-enabled
    pub fn retire_all(&mut self, backing: &mut dyn TargetBacking) {
        for slot in self.slots.drain(..) {
            backing.free(slot.backing);
        }
        self.by_name.clear();
        self.frame_open = false;
    }

    /// Backing image for a handle, if the handle is still current
    pub fn backing_of(&self, handle: TargetHandle) -> Option<BackingId> {
        let slot = self.slots.get(handle.index as usize)?;
        (slot.generation == handle.generation).then_some(slot.backing)
    }

    /// Descriptor for a handle, if the handle is still current
    pub fn descriptor_of(&self, handle: TargetHandle) -> Option<TargetDescriptor> {
        let slot = self.slots.get(handle.index as usize)?;
        (slot.generation == handle.generation).then_some(slot.desc)
    }

    /// Number of handles currently acquired this frame
    pub fn live_acquired(&self) -> usize {
        self.slots.iter().filter(|s| s.in_use).count()
    }

    /// Number of cached backings, in use or not
    pub fn cached_count(&self) -> usize {
        self.slots.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Extent2d, TargetFormat};
    use crate::target::backing::HeadlessBacking;

    fn desc(w: u32, h: u32) -> TargetDescriptor {
        TargetDescriptor::new(Extent2d::new(w, h), TargetFormat::Rgba8Unorm)
    }

    #[test]
    fn test_acquire_is_idempotent_within_frame() {
        let mut pool = ScratchPool::new();
        let mut backing = HeadlessBacking::new();

        pool.begin_frame();
        let a = pool.acquire(&mut backing, "blur_ping", desc(1920, 1080));
        let b = pool.acquire(&mut backing, "blur_ping", desc(1920, 1080));
        assert_eq!(a, b);
        assert_eq!(backing.total_allocations(), 1);
        pool.release(a);
        pool.end_frame();
    }

    #[test]
    fn test_backings_are_reused_across_frames() {
        let mut pool = ScratchPool::new();
        let mut backing = HeadlessBacking::new();

        for _ in 0..5 {
            pool.begin_frame();
            let h = pool.acquire(&mut backing, "fog_term", desc(1280, 720));
            pool.release(h);
            assert_eq!(pool.end_frame(), 0);
        }
        assert_eq!(backing.total_allocations(), 1);
        assert_eq!(backing.live_count(), 1);
    }

    #[test]
    fn test_resolution_change_reallocates_exactly_once() {
        let mut pool = ScratchPool::new();
        let mut backing = HeadlessBacking::new();

        pool.begin_frame();
        let h = pool.acquire(&mut backing, "fog_term", desc(1920, 1080));
        pool.release(h);
        pool.end_frame();

        pool.begin_frame();
        let h2 = pool.acquire(&mut backing, "fog_term", desc(1280, 720));
        pool.release(h2);
        pool.end_frame();

        // stale 1080p backing freed exactly once, replacement allocated
        assert_eq!(backing.total_allocations(), 2);
        assert_eq!(backing.total_frees(), 1);
        assert_eq!(backing.double_frees(), 0);
        assert_eq!(backing.live_count(), 1);
        // handle from before the resize is stale
        assert!(pool.backing_of(h).is_none());
        assert!(pool.backing_of(h2).is_some());
    }

    #[test]
    fn test_thousand_frames_do_not_leak() {
        let mut pool = ScratchPool::new();
        let mut backing = HeadlessBacking::new();

        // resolutions cycle so reallocation paths are exercised too
        let sizes = [(1920, 1080), (1280, 720), (640, 360)];
        for frame in 0..1000 {
            let (w, h) = sizes[(frame / 97) % sizes.len()];
            pool.begin_frame();
            let a = pool.acquire(&mut backing, "ping", desc(w, h));
            let b = pool.acquire(&mut backing, "pong", desc(w, h));
            pool.release(a);
            pool.release(b);
            assert_eq!(pool.end_frame(), 0);
            assert_eq!(pool.live_acquired(), 0);
            // live backings never exceed the named set
            assert_eq!(backing.live_count(), 2);
        }
        assert_eq!(backing.double_frees(), 0);
        assert_eq!(
            backing.total_allocations() - backing.total_frees(),
            backing.live_count() as u64
        );
    }

    #[test]
    fn test_end_frame_reports_leaks() {
        let mut pool = ScratchPool::new();
        let mut backing = HeadlessBacking::new();

        pool.begin_frame();
        let _never_released = pool.acquire(&mut backing, "oops", desc(64, 64));
        assert_eq!(pool.end_frame(), 1);
        assert_eq!(pool.live_acquired(), 0);
    }

    #[test]
    fn test_retire_all_frees_every_backing() {
        let mut pool = ScratchPool::new();
        let mut backing = HeadlessBacking::new();

        pool.begin_frame();
        let a = pool.acquire(&mut backing, "a", desc(64, 64));
        let b = pool.acquire(&mut backing, "b", desc(32, 32));
        pool.release(a);
        pool.release(b);
        pool.end_frame();

        pool.retire_all(&mut backing);
        assert_eq!(backing.live_count(), 0);
        assert_eq!(pool.cached_count(), 0);
        assert!(!pool.contains("a"));
    }

    #[test]
    fn test_stale_release_is_ignored() {
        let mut pool = ScratchPool::new();
        let mut backing = HeadlessBacking::new();

        pool.begin_frame();
        let old = pool.acquire(&mut backing, "t", desc(100, 100));
        pool.release(old);
        pool.end_frame();

        pool.begin_frame();
        let new = pool.acquire(&mut backing, "t", desc(200, 200));
        // releasing the pre-resize handle must not end the new ownership
        pool.release(old);
        assert_eq!(pool.live_acquired(), 1);
        pool.release(new);
        pool.end_frame();
    }
}
