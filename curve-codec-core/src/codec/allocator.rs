//! Allocation seam for the codec's output buffer.
//!
//! The compressor never keeps a buffer it hands out: it leases one from the
//! caller's `TrackAllocator` and wraps it in an `AllocatedBuffer` guard. The
//! guard returns the buffer, with the size it was allocated with, exactly once
//! when it goes out of scope, whichever path the caller leaves by.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Supplies and reclaims the byte buffers the codec writes compressed data into.
pub trait TrackAllocator {
    /// Returns a zero-initialized buffer of exactly `size` bytes.
    fn allocate(&self, size: usize) -> Box<[u8]>;

    /// Takes back a buffer previously returned by `allocate`, along with the size it was requested with.
    fn deallocate(&self, buffer: Box<[u8]>, size: usize);
}

/// Plain heap allocation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAllocator;

impl TrackAllocator for DefaultAllocator {
    fn allocate(&self, size: usize) -> Box<[u8]> {
        vec![0u8; size].into_boxed_slice()
    }

    fn deallocate(&self, buffer: Box<[u8]>, _size: usize) {
        drop(buffer);
    }
}

/// Heap allocation that keeps books on every lease. Useful to assert that a
/// compression call left nothing outstanding.
#[derive(Debug, Default)]
pub struct CountingAllocator {
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    live_bytes: AtomicUsize,
    size_mismatches: AtomicUsize,
}

impl CountingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    pub fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::Relaxed)
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }

    pub fn size_mismatches(&self) -> usize {
        self.size_mismatches.load(Ordering::Relaxed)
    }

    /// True when every allocation has been returned with its original size.
    pub fn is_balanced(&self) -> bool {
        self.allocations() == self.deallocations() && self.live_bytes() == 0 && self.size_mismatches() == 0
    }
}

impl TrackAllocator for CountingAllocator {
    fn allocate(&self, size: usize) -> Box<[u8]> {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_add(size, Ordering::Relaxed);
        vec![0u8; size].into_boxed_slice()
    }

    fn deallocate(&self, buffer: Box<[u8]>, size: usize) {
        if buffer.len() != size {
            log::warn!(
                "Buffer returned with size {} but was allocated with {}",
                size,
                buffer.len()
            );
            self.size_mismatches.fetch_add(1, Ordering::Relaxed);
        }
        self.deallocations.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(buffer.len(), Ordering::Relaxed);
    }
}

/// A buffer leased from a `TrackAllocator`, released on drop.
pub struct AllocatedBuffer<'a, A: TrackAllocator + ?Sized> {
    allocator: &'a A,
    buffer: Option<Box<[u8]>>,
    size: usize,
}

impl<'a, A: TrackAllocator + ?Sized> AllocatedBuffer<'a, A> {
    /// Leases `size` bytes from `allocator`.
    pub fn new(allocator: &'a A, size: usize) -> Self {
        Self {
            allocator,
            buffer: Some(allocator.allocate(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.buffer.as_deref_mut().unwrap_or(&mut [])
    }

    /// Copies the leased bytes into an owned vector. The lease itself is
    /// still released when `self` drops.
    pub fn to_vec(&self) -> Vec<u8> {
        self.deref().to_vec()
    }
}

impl<A: TrackAllocator + ?Sized> Deref for AllocatedBuffer<'_, A> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buffer.as_deref().unwrap_or(&[])
    }
}

impl<A: TrackAllocator + ?Sized> Drop for AllocatedBuffer<'_, A> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.allocator.deallocate(buffer, self.size);
        }
    }
}

impl<A: TrackAllocator + ?Sized> std::fmt::Debug for AllocatedBuffer<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocatedBuffer").field("size", &self.size).finish()
    }
}
