//! Heap-backed frame allocator.
//!
//! Implements [`FrameAllocator`] with fallible allocation, so an exhausted
//! heap (PSRAM on the device) becomes a `None` instead of an abort.  An
//! optional byte budget caps how much frame memory may be outstanding.

use log::warn;

use crate::app::ports::{FrameAllocator, FrameBuffer, FrameSize};

#[derive(Debug, Default)]
pub struct HeapFrameAllocator {
    budget: Option<usize>,
    outstanding_bytes: usize,
    outstanding: u32,
    allocations: u32,
    releases: u32,
}

impl HeapFrameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse allocations that would push outstanding bytes past `bytes`.
    pub fn with_budget(bytes: usize) -> Self {
        Self {
            budget: Some(bytes),
            ..Self::default()
        }
    }

    /// Frames handed out and not yet released.
    pub fn outstanding(&self) -> u32 {
        self.outstanding
    }

    pub fn allocations(&self) -> u32 {
        self.allocations
    }

    pub fn releases(&self) -> u32 {
        self.releases
    }
}

impl FrameAllocator for HeapFrameAllocator {
    fn allocate(&mut self, size: FrameSize) -> Option<FrameBuffer> {
        let len = size.byte_len();
        if let Some(budget) = self.budget {
            if self.outstanding_bytes + len > budget {
                warn!("frames: {len} bytes exceeds budget ({} in use)", self.outstanding_bytes);
                return None;
            }
        }

        let mut pixels = Vec::new();
        if pixels.try_reserve_exact(len).is_err() {
            warn!("frames: heap exhausted allocating {len} bytes");
            return None;
        }
        pixels.resize(len, 0);

        self.outstanding_bytes += len;
        self.outstanding += 1;
        self.allocations += 1;
        FrameBuffer::from_pixels(size, pixels)
    }

    fn release(&mut self, frame: FrameBuffer) {
        self.outstanding_bytes = self.outstanding_bytes.saturating_sub(frame.size().byte_len());
        self.outstanding = self.outstanding.saturating_sub(1);
        self.releases += 1;
    }
}
