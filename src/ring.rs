//! Lock-free single-producer/single-consumer ring buffer over interleaved
//! multi-channel `f32` frames.
//!
//! Mirrors the SPSC discipline the dev-server's audio callbacks rely on
//! (`rtrb`-backed rings in the teacher crate), but exposes the exact
//! frame-counted, power-of-two-capacity contract this pipeline's components
//! assume: `available_to_read`/`available_to_write` in frames, clamped
//! writes/reads, and acquire/release publication of the counterparty's
//! cursor.

use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Shared {
    buf: UnsafeCell<Box<[f32]>>,
    channels: usize,
    capacity_frames: usize,
    mask: usize,
    read_pos: AtomicUsize,
    write_pos: AtomicUsize,
}

// SAFETY: `buf` is only ever written in the frame range
// `[write_pos_old, write_pos_old + written)` by the producer and read in
// `[read_pos_old, read_pos_old + read)` by the consumer. Those ranges never
// overlap because `write_interleaved` clamps to `available_to_write` and
// `read_interleaved` clamps to `available_to_read`, so concurrent access is
// always to disjoint memory. Cursor publication uses release/acquire so the
// payload write happens-before the reader observes it.
unsafe impl Sync for Shared {}

impl Shared {
    #[inline]
    fn available_to_read(&self) -> usize {
        let w = self.write_pos.load(Ordering::Acquire);
        let r = self.read_pos.load(Ordering::Acquire);
        w.wrapping_sub(r)
    }

    #[inline]
    fn available_to_write(&self) -> usize {
        self.capacity_frames - self.available_to_read()
    }
}

fn next_pow2(n: usize) -> usize {
    let mut p = 1usize;
    while p < n {
        p <<= 1;
    }
    p
}

/// Producer half of an [`spsc_ring`] pair. Exactly one thread may hold and
/// call into this value.
pub struct RingProducer {
    shared: Arc<Shared>,
}

/// Consumer half of an [`spsc_ring`] pair. Exactly one thread may hold and
/// call into this value.
pub struct RingConsumer {
    shared: Arc<Shared>,
}

/// Allocates a ring with room for at least `capacity_frames` frames of
/// `channels` interleaved `f32` samples each, rounding the capacity up to
/// the next power of two (minimum 2). Returns `None` for non-positive
/// arguments, matching spec's `init(...) -> bool` failure case.
pub fn spsc_ring(capacity_frames: usize, channels: usize) -> Option<(RingProducer, RingConsumer)> {
    if capacity_frames == 0 || channels == 0 {
        return None;
    }

    let capacity_frames = next_pow2(capacity_frames).max(2);
    let buf = vec![0.0f32; capacity_frames * channels].into_boxed_slice();

    let shared = Arc::new(Shared {
        buf: UnsafeCell::new(buf),
        channels,
        capacity_frames,
        mask: capacity_frames - 1,
        read_pos: AtomicUsize::new(0),
        write_pos: AtomicUsize::new(0),
    });

    Some((
        RingProducer {
            shared: shared.clone(),
        },
        RingConsumer { shared },
    ))
}

impl RingProducer {
    pub fn capacity_frames(&self) -> usize {
        self.shared.capacity_frames
    }

    pub fn channels(&self) -> usize {
        self.shared.channels
    }

    pub fn available_to_write(&self) -> usize {
        self.shared.available_to_write()
    }

    /// Observes the consumer's cursor for flow control; not the producer's
    /// own role, but any caller may read either counter (spec.md §4.1).
    pub fn available_to_read(&self) -> usize {
        self.shared.available_to_read()
    }

    /// Writes up to `frames` interleaved frames from `src`, clamped to
    /// `available_to_write()` and to `src.len() / channels`. Returns the
    /// number of frames actually written. Splits the copy into at most two
    /// contiguous segments around the ring boundary and publishes the new
    /// write cursor with a single release store after the payload copy.
    pub fn write_interleaved(&mut self, src: &[f32], frames: usize) -> usize {
        let channels = self.shared.channels;
        let frames = frames
            .min(self.shared.available_to_write())
            .min(src.len() / channels);
        if frames == 0 {
            return 0;
        }

        let write_pos = self.shared.write_pos.load(Ordering::Relaxed);
        let start = write_pos & self.shared.mask;
        let first = frames.min(self.shared.capacity_frames - start);
        let second = frames - first;

        // SAFETY: see `Shared`'s Sync justification; this region is only
        // ever touched by the producer.
        let buf: &mut [f32] = unsafe { &mut *self.shared.buf.get() };
        buf[start * channels..(start + first) * channels]
            .copy_from_slice(&src[..first * channels]);
        if second > 0 {
            buf[..second * channels]
                .copy_from_slice(&src[first * channels..frames * channels]);
        }

        self.shared
            .write_pos
            .store(write_pos.wrapping_add(frames), Ordering::Release);
        frames
    }
}

impl RingConsumer {
    pub fn capacity_frames(&self) -> usize {
        self.shared.capacity_frames
    }

    pub fn channels(&self) -> usize {
        self.shared.channels
    }

    pub fn available_to_read(&self) -> usize {
        self.shared.available_to_read()
    }

    /// Observes the producer's cursor for flow control.
    pub fn available_to_write(&self) -> usize {
        self.shared.available_to_write()
    }

    /// Reads up to `frames` interleaved frames into `dst`, clamped to
    /// `available_to_read()` and to `dst.len() / channels`. Returns the
    /// number of frames actually read.
    pub fn read_interleaved(&mut self, dst: &mut [f32], frames: usize) -> usize {
        let channels = self.shared.channels;
        let frames = frames
            .min(self.shared.available_to_read())
            .min(dst.len() / channels);
        if frames == 0 {
            return 0;
        }

        let read_pos = self.shared.read_pos.load(Ordering::Relaxed);
        let start = read_pos & self.shared.mask;
        let first = frames.min(self.shared.capacity_frames - start);
        let second = frames - first;

        // SAFETY: see `Shared`'s Sync justification; this region is only
        // ever touched by the consumer.
        let buf: &[f32] = unsafe { &*self.shared.buf.get() };
        dst[..first * channels].copy_from_slice(&buf[start * channels..(start + first) * channels]);
        if second > 0 {
            dst[first * channels..frames * channels].copy_from_slice(&buf[..second * channels]);
        }

        self.shared
            .read_pos
            .store(read_pos.wrapping_add(frames), Ordering::Release);
        frames
    }
}
