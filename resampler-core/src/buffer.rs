// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The intermediate buffers (§4.3) and the leftover-frame protocol.
//!
//! The reference design keeps four pool-backed `(block, offset, length)` triples and grows them
//! by releasing the old block and allocating a new one, copying any leftover prefix across. In
//! Rust, `to_work`/`remap`/`resample` are represented directly as typed [`WorkBuf`]s (Design Notes
//! §11: "raw pointer arithmetic on interleaved PCM → typed slice views"); growth is an ordinary
//! `Vec` resize, and leftover preservation is an ordinary prefix-preserving concatenation rather
//! than a manual block-swap. Only the final `from_work` buffer — the raw output bytes handed back
//! across the `run` call boundary — is backed by a pool [`Block`], since that is the buffer whose
//! lifetime genuinely crosses the caller/callee boundary described in §5.

use crate::pool::{Block, Pool};
use crate::sample::{SampleFormat, WorkBuf, WorkFormat};

/// Tracks the `remap`-stage buffer's leftover state (§4.3 "Leftover protocol").
///
/// A backend that consumes fewer input frames than it was offered calls
/// [`RemapBuffer::save_leftover`] with the unconsumed tail. The orchestrator keeps those frames at
/// the front of the buffer; the next `run()` call pre-sizes the buffer to
/// `leftover_frames + new_remap_output_frames` and writes the newly remapped data after the
/// leftover, so that from the rate-conversion backend's point of view input is contiguous across
/// calls.
#[derive(Debug)]
pub struct RemapBuffer {
    format: WorkFormat,
    channels: usize,
    buf: WorkBuf,
    leftover_frames: usize,
}

impl RemapBuffer {
    pub fn new(format: WorkFormat, channels: usize) -> RemapBuffer {
        RemapBuffer { format, channels, buf: WorkBuf::new(format, 0), leftover_frames: 0 }
    }

    pub fn leftover_present(&self) -> bool {
        self.leftover_frames > 0
    }

    pub fn leftover_frames(&self) -> usize {
        self.leftover_frames
    }

    /// Replace the buffer's contents with `new_frames` freshly remapped frames, placed after any
    /// existing leftover. Returns the total frame count (leftover + new).
    pub fn append_after_leftover(&mut self, new: WorkBuf) -> usize {
        assert_eq!(new.format(), self.format, "remap buffer format mismatch");
        match (&mut self.buf, new) {
            (WorkBuf::S16(existing), WorkBuf::S16(new)) => {
                existing.truncate(self.leftover_frames * self.channels);
                existing.extend(new);
            }
            (WorkBuf::F32(existing), WorkBuf::F32(new)) => {
                existing.truncate(self.leftover_frames * self.channels);
                existing.extend(new);
            }
            _ => unreachable!("work format is fixed for the lifetime of the buffer"),
        }
        self.buf.len() / self.channels
    }

    /// Save the unconsumed tail of the buffer (frames `[consumed, total)`) as the new leftover,
    /// dropping everything before it.
    pub fn save_leftover(&mut self, consumed_frames: usize, total_frames: usize) {
        let tail_frames = total_frames - consumed_frames;
        match &mut self.buf {
            WorkBuf::S16(v) => {
                v.drain(0..consumed_frames * self.channels);
                v.truncate(tail_frames * self.channels);
            }
            WorkBuf::F32(v) => {
                v.drain(0..consumed_frames * self.channels);
                v.truncate(tail_frames * self.channels);
            }
        }
        self.leftover_frames = tail_frames;
    }

    /// Clear the leftover (used by `reset`).
    pub fn clear_leftover(&mut self) {
        self.leftover_frames = 0;
        self.buf = WorkBuf::new(self.format, 0);
    }

    pub fn samples(&self) -> &WorkBuf {
        &self.buf
    }

    pub fn frames(&self) -> usize {
        self.buf.len() / self.channels
    }
}

/// The `from_work` output buffer: a pool-backed byte block sized for `frames * channels *
/// format.byte_width()` bytes, reused across calls by growing in place when a larger block is
/// needed.
#[derive(Debug)]
pub struct OutputBuffer {
    pool: Pool,
    format: SampleFormat,
    channels: usize,
    block: Block,
}

impl OutputBuffer {
    pub fn new(pool: Pool, format: SampleFormat, channels: usize) -> OutputBuffer {
        let block = pool.alloc(0);
        OutputBuffer { pool, format, channels, block }
    }

    /// Ensure the backing block can hold `frames` frames, growing (reallocating from the pool) if
    /// necessary. Does not preserve prior contents — the `from_work` stage is always written in
    /// full before being read.
    pub fn ensure_capacity(&mut self, frames: usize) -> &Block {
        let needed = frames * self.channels * self.format.byte_width();
        if self.block.len() < needed {
            self.block = self.pool.alloc(needed);
        }
        &self.block
    }

    pub fn block(&self) -> &Block {
        &self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Pool;

    #[test]
    fn verify_leftover_roundtrip() {
        let mut buf = RemapBuffer::new(WorkFormat::F32NE, 2);
        let total = buf.append_after_leftover(WorkBuf::F32(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        assert_eq!(total, 3);

        // Backend consumed only the first 2 frames; frame 3 is leftover.
        buf.save_leftover(2, 3);
        assert!(buf.leftover_present());
        assert_eq!(buf.leftover_frames(), 1);
        match buf.samples() {
            WorkBuf::F32(v) => assert_eq!(v.as_slice(), &[5.0, 6.0]),
            _ => unreachable!(),
        }

        // Next call's new remap output lands after the leftover.
        let total = buf.append_after_leftover(WorkBuf::F32(vec![7.0, 8.0]));
        assert_eq!(total, 2);
        match buf.samples() {
            WorkBuf::F32(v) => assert_eq!(v.as_slice(), &[5.0, 6.0, 7.0, 8.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn verify_reset_clears_leftover() {
        let mut buf = RemapBuffer::new(WorkFormat::S16NE, 1);
        buf.append_after_leftover(WorkBuf::S16(vec![1, 2, 3]));
        buf.save_leftover(1, 3);
        assert!(buf.leftover_present());
        buf.clear_leftover();
        assert!(!buf.leftover_present());
        assert_eq!(buf.frames(), 0);
    }

    #[test]
    fn verify_output_buffer_grows_on_demand() {
        let mut out = OutputBuffer::new(Pool::new(4096), SampleFormat::S16, 2);
        let block = out.ensure_capacity(10).clone();
        assert_eq!(block.len(), 10 * 2 * 2);
    }
}
