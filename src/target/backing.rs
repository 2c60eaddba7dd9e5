//! Backing storage seam for scratch targets
//!
//! The pool does bookkeeping only; actual image memory lives behind this
//! trait so the same pool drives a wgpu backend, a test double, or a dry
//! run with no device at all.

use std::collections::HashSet;

use crate::target::descriptor::TargetDescriptor;

/// Identifier of a backing image allocated by a backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BackingId(pub u64);

/// Allocates and frees backing images for the scratch pool
pub trait TargetBacking {
    /// Allocate a backing image for `desc`; `name` is a debug label
    fn alloc(&mut self, name: &str, desc: &TargetDescriptor) -> BackingId;

    /// Free a previously allocated backing image
    fn free(&mut self, id: BackingId);
}

/// Bookkeeping-only backing for tests, benches and dry runs
///
/// Counts allocations and frees so leak and double-free properties can be
/// asserted without a GPU device.
#[derive(Debug, Default)]
pub struct HeadlessBacking {
    next: u64,
    live: HashSet<BackingId>,
    total_allocs: u64,
    total_frees: u64,
    double_frees: u64,
}

impl HeadlessBacking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently live backing images
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn total_allocations(&self) -> u64 {
        self.total_allocs
    }

    pub fn total_frees(&self) -> u64 {
        self.total_frees
    }

    /// Number of frees for ids that were not live
    pub fn double_frees(&self) -> u64 {
        self.double_frees
    }
}

impl TargetBacking for HeadlessBacking {
    fn alloc(&mut self, _name: &str, _desc: &TargetDescriptor) -> BackingId {
        let id = BackingId(self.next);
        self.next += 1;
        self.live.insert(id);
        self.total_allocs += 1;
        id
    }

    fn free(&mut self, id: BackingId) {
        if self.live.remove(&id) {
            self.total_frees += 1;
        } else {
            log::error!("freed unknown backing id {:?}", id);
            self.double_frees += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Extent2d, TargetFormat};

    fn desc() -> TargetDescriptor {
        TargetDescriptor::new(Extent2d::new(64, 64), TargetFormat::Rgba8Unorm)
    }

    #[test]
    fn test_headless_alloc_free_accounting() {
        let mut backing = HeadlessBacking::new();
        let a = backing.alloc("a", &desc());
        let b = backing.alloc("b", &desc());
        assert_ne!(a, b);
        assert_eq!(backing.live_count(), 2);

        backing.free(a);
        assert_eq!(backing.live_count(), 1);
        assert_eq!(backing.total_allocations(), 2);
        assert_eq!(backing.total_frees(), 1);
    }

    #[test]
    fn test_headless_detects_double_free() {
        let mut backing = HeadlessBacking::new();
        let a = backing.alloc("a", &desc());
        backing.free(a);
        backing.free(a);
        assert_eq!(backing.double_frees(), 1);
    }
}
