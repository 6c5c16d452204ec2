// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Lock-free handoff of source buffers from the loader to the audio thread.
//!
//! The exchange is a single atomic pointer. The producer swaps in a new buffer
//! and gets the old one back as a [`RetiredBuffer`]. The consumer reads the
//! pointer once per block and, in doing so, acknowledges the publish
//! generation it observed. A retired buffer may only be freed once the
//! consumer has acknowledged the generation that retired it, which means the
//! consumer has started a block after the swap and can no longer hold a
//! reference to it.

use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

use super::buffer::SourceBuffer;

/// State shared between both halves of the exchange.
struct Shared {
    /// The published buffer, or null before the first publish.
    current: AtomicPtr<SourceBuffer>,
    /// Incremented after every swap of `current`.
    generation: AtomicU64,
    /// The generation the consumer observed at the start of its current block.
    acknowledged: AtomicU64,
    /// Cleared when the reader is dropped.
    reader_alive: AtomicBool,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let current = *self.current.get_mut();
        if !current.is_null() {
            // SAFETY: `current` came from `Box::into_raw` in `publish`, and both halves of
            // the exchange are gone so nothing else can observe it.
            drop(unsafe { Box::from_raw(current) });
        }
    }
}

/// Creates a connected publisher/reader pair with no buffer published.
pub fn sample_exchange() -> (SamplePublisher, SampleReader) {
    let shared = Arc::new(Shared {
        current: AtomicPtr::new(ptr::null_mut()),
        generation: AtomicU64::new(0),
        acknowledged: AtomicU64::new(0),
        reader_alive: AtomicBool::new(true),
    });

    (
        SamplePublisher {
            shared: shared.clone(),
        },
        SampleReader { shared },
    )
}

/// The producing half. Owned by the loader; never used on the audio thread.
pub struct SamplePublisher {
    shared: Arc<Shared>,
}

impl SamplePublisher {
    /// Publishes a new buffer, returning the buffer it replaced (if any).
    ///
    /// The returned buffer must be released off the real-time thread, usually by
    /// handing it to a [`super::DisposalQueue`].
    #[must_use = "a retired buffer must be handed to a disposal queue"]
    pub fn publish(&mut self, buffer: SourceBuffer) -> Option<RetiredBuffer> {
        let new = Box::into_raw(Box::new(buffer));
        let old = self.shared.current.swap(new, Ordering::AcqRel);
        let retired_at = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;

        NonNull::new(old).map(|buffer| RetiredBuffer {
            buffer: Some(buffer),
            retired_at,
            shared: self.shared.clone(),
        })
    }

    /// Returns the number of buffers published so far.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// Returns the generation the reader has most recently acknowledged.
    pub fn acknowledged(&self) -> u64 {
        self.shared.acknowledged.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for SamplePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplePublisher")
            .field("generation", &self.generation())
            .field("acknowledged", &self.acknowledged())
            .finish()
    }
}

/// The consuming half. Owned by the audio thread.
pub struct SampleReader {
    shared: Arc<Shared>,
}

impl SampleReader {
    /// Returns the currently published buffer, or `None` if nothing playable has
    /// been published.
    ///
    /// Call once at the start of each block. Taking `&mut self` ties the returned
    /// reference to that call, so no reference can survive into the next block,
    /// which is what lets the publisher reclaim buffers retired before it.
    /// Wait-free: two atomic loads and one store.
    pub fn current_buffer(&mut self) -> Option<&SourceBuffer> {
        // The generation is loaded before the pointer. A publish swaps the pointer
        // before bumping the generation, so the buffer we load is never older than
        // the generation we acknowledge.
        let generation = self.shared.generation.load(Ordering::Acquire);
        let current = self.shared.current.load(Ordering::Acquire);
        self.shared
            .acknowledged
            .store(generation, Ordering::Release);

        // SAFETY: a non-null `current` points to a live buffer. It can only be freed
        // after being retired and after a later acknowledgement, and the next
        // acknowledgement requires this borrow to have ended.
        unsafe { current.as_ref() }.filter(|buffer| !buffer.is_empty())
    }
}

impl Drop for SampleReader {
    fn drop(&mut self) {
        self.shared.reader_alive.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for SampleReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleReader")
            .field(
                "generation",
                &self.shared.generation.load(Ordering::Relaxed),
            )
            .finish()
    }
}

/// A buffer that has been swapped out and is waiting to be freed.
pub struct RetiredBuffer {
    /// None once the buffer has been freed.
    buffer: Option<NonNull<SourceBuffer>>,
    /// The generation whose publish retired this buffer.
    retired_at: u64,
    shared: Arc<Shared>,
}

// SAFETY: the retired buffer is uniquely owned by this handle; the reader will not
// touch it again once it is reclaimable, and `SourceBuffer` is plain data.
unsafe impl Send for RetiredBuffer {}

impl RetiredBuffer {
    /// True once no reader can still be using this buffer.
    pub fn is_reclaimable(&self) -> bool {
        !self.shared.reader_alive.load(Ordering::Acquire)
            || self.shared.acknowledged.load(Ordering::Acquire) >= self.retired_at
    }

    /// Frees the buffer if it is reclaimable, otherwise hands it back.
    pub fn try_reclaim(self) -> Result<(), RetiredBuffer> {
        if self.is_reclaimable() {
            drop(self);
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Returns the generation whose publish retired this buffer.
    pub fn retired_at(&self) -> u64 {
        self.retired_at
    }
}

impl Drop for RetiredBuffer {
    fn drop(&mut self) {
        let Some(buffer) = self.buffer.take() else {
            return;
        };

        if self.is_reclaimable() {
            // SAFETY: the pointer came from `Box::into_raw` in `publish` and the reader
            // has moved past the generation that retired it.
            drop(unsafe { Box::from_raw(buffer.as_ptr()) });
        } else {
            // Freeing here could pull the buffer out from under the audio thread.
            warn!(
                retired_at = self.retired_at,
                "Retired sample buffer dropped while still in use, leaking it"
            );
        }
    }
}

impl std::fmt::Debug for RetiredBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetiredBuffer")
            .field("retired_at", &self.retired_at)
            .field("reclaimable", &self.is_reclaimable())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn buffer(value: f32, frames: usize) -> SourceBuffer {
        SourceBuffer::from_mono(vec![value; frames], 44100).expect("buffer")
    }

    #[test]
    fn test_nothing_published() {
        let (publisher, mut reader) = sample_exchange();
        assert!(reader.current_buffer().is_none());
        assert_eq!(publisher.generation(), 0);
    }

    #[test]
    fn test_empty_buffer_reads_as_none() {
        let (mut publisher, mut reader) = sample_exchange();
        assert!(publisher.publish(buffer(0.0, 0)).is_none());
        assert!(reader.current_buffer().is_none());
    }

    #[test]
    fn test_publish_and_read() {
        let (mut publisher, mut reader) = sample_exchange();

        let retired = publisher.publish(buffer(0.5, 16));
        assert!(retired.is_none());

        let current = reader.current_buffer().expect("published buffer");
        assert_eq!(current.frame_count(), 16);
        assert_eq!(current.playback_channel()[0], 0.5);
    }

    #[test]
    fn test_retired_buffer_waits_for_reader() {
        let (mut publisher, mut reader) = sample_exchange();
        assert!(publisher.publish(buffer(0.1, 8)).is_none());
        assert!(reader.current_buffer().is_some());

        let retired = publisher.publish(buffer(0.2, 8)).expect("retired buffer");
        assert_eq!(retired.retired_at(), 2);
        assert!(!retired.is_reclaimable());

        // The reader starts a new block and sees the new buffer.
        let current = reader.current_buffer().expect("current buffer");
        assert_eq!(current.playback_channel()[0], 0.2);
        assert!(retired.is_reclaimable());
        assert!(retired.try_reclaim().is_ok());
    }

    #[test]
    fn test_try_reclaim_hands_back() {
        let (mut publisher, reader) = sample_exchange();
        assert!(publisher.publish(buffer(0.1, 8)).is_none());
        let retired = publisher.publish(buffer(0.2, 8)).expect("retired buffer");

        let retired = retired.try_reclaim().expect_err("reader has not moved on");
        assert_eq!(retired.retired_at(), 2);

        drop(reader);
        assert!(retired.try_reclaim().is_ok());
    }

    #[test]
    fn test_dropped_reader_releases_everything() {
        let (mut publisher, reader) = sample_exchange();
        assert!(publisher.publish(buffer(0.1, 8)).is_none());
        let retired = publisher.publish(buffer(0.2, 8)).expect("retired buffer");
        drop(reader);
        assert!(retired.is_reclaimable());
    }

    #[test]
    fn test_concurrent_publish() {
        let (mut publisher, mut reader) = sample_exchange();

        let producer = thread::spawn(move || {
            let mut pending: Vec<RetiredBuffer> = Vec::new();
            for i in 0..200 {
                if let Some(retired) = publisher.publish(buffer(i as f32, 64)) {
                    pending.push(retired);
                }
                pending = pending
                    .into_iter()
                    .filter_map(|r| r.try_reclaim().err())
                    .collect();
            }
            pending
        });

        // Every buffer must be internally consistent: all samples equal.
        let mut last = -1.0;
        for _ in 0..2000 {
            if let Some(current) = reader.current_buffer() {
                let data = current.playback_channel();
                let first = data[0];
                assert!(data.iter().all(|s| *s == first));
                assert!(first >= last, "buffers must only move forward");
                last = first;
            }
        }

        let pending = producer.join().expect("producer thread");
        drop(reader);
        for retired in pending {
            assert!(retired.try_reclaim().is_ok());
        }
    }
}
