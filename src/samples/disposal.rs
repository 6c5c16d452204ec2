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

//! Deferred release of buffers that have been swapped out of the exchange.

use tracing::debug;

use super::exchange::RetiredBuffer;

/// Holds retired buffers until the audio thread can no longer observe them.
/// Lives on the loader thread.
#[derive(Default)]
pub struct DisposalQueue {
    retired: Vec<RetiredBuffer>,
}

impl DisposalQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a retired buffer for release.
    pub fn defer(&mut self, retired: RetiredBuffer) {
        debug!(retired_at = retired.retired_at(), "Deferring buffer disposal");
        self.retired.push(retired);
    }

    /// Frees every buffer that is safe to free. Returns how many were freed.
    pub fn collect(&mut self) -> usize {
        let before = self.retired.len();
        self.retired = std::mem::take(&mut self.retired)
            .into_iter()
            .filter_map(|retired| retired.try_reclaim().err())
            .collect();

        let freed = before - self.retired.len();
        if freed > 0 {
            debug!(freed, pending = self.retired.len(), "Disposed retired buffers");
        }
        freed
    }

    /// Returns the number of buffers still waiting.
    pub fn pending(&self) -> usize {
        self.retired.len()
    }
}

impl std::fmt::Debug for DisposalQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposalQueue")
            .field("pending", &self.retired.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::{sample_exchange, SourceBuffer};

    #[test]
    fn test_collect_waits_for_reader() {
        let (mut publisher, mut reader) = sample_exchange();
        let mut queue = DisposalQueue::new();

        let first = SourceBuffer::from_mono(vec![0.0; 32], 44100).expect("buffer");
        let second = SourceBuffer::from_mono(vec![1.0; 32], 44100).expect("buffer");

        assert!(publisher.publish(first).is_none());
        assert!(reader.current_buffer().is_some());

        queue.defer(publisher.publish(second).expect("retired buffer"));
        assert_eq!(queue.collect(), 0);
        assert_eq!(queue.pending(), 1);

        assert!(reader.current_buffer().is_some());
        assert_eq!(queue.collect(), 1);
        assert_eq!(queue.pending(), 0);
    }
}
