// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `copy` and `trivial` (nearest-neighbor) backends (§4.4.1).

use crate::backend::{Backend, ProcessResult};
use crate::error::Result;
use crate::sample::WorkBuf;

/// A pure blit: valid only when the fix-up rules have already guaranteed no conversion of any
/// kind is required. Always consumes and produces the full buffer.
pub struct CopyBackend {
    channels: usize,
}

impl CopyBackend {
    pub fn new(channels: usize) -> CopyBackend {
        CopyBackend { channels: channels.max(1) }
    }
}

impl Backend for CopyBackend {
    fn process(&mut self, input: &WorkBuf, _max_output_frames: usize) -> Result<(WorkBuf, ProcessResult)> {
        let samples = match input {
            WorkBuf::S16(v) => v.len(),
            WorkBuf::F32(v) => v.len(),
        };
        let frames = samples / self.channels;
        Ok((input.clone(), ProcessResult { consumed: frames, produced: frames }))
    }

    fn update_rates(&mut self, _rate_in: u32, _rate_out: u32) -> Result<()> {
        Ok(())
    }

    fn reset(&mut self) {}
}

/// Nearest-neighbor rate conversion with a rational counter (§4.4.1). Counters are periodically
/// reduced modulo the rates to keep the `o_counter * in_rate` product from overflowing on long
/// streams — preserved verbatim from the reference implementation per Design Notes §11.
pub struct TrivialBackend {
    channels: usize,
    rate_in: u64,
    rate_out: u64,
    i_counter: u64,
    o_counter: u64,
}

impl TrivialBackend {
    pub fn new(rate_in: u32, rate_out: u32) -> TrivialBackend {
        TrivialBackend {
            channels: 0,
            rate_in: u64::from(rate_in),
            rate_out: u64::from(rate_out),
            i_counter: 0,
            o_counter: 0,
        }
    }

    /// The interleave stride. Set by the orchestrator immediately after construction; `construct`
    /// does not thread a channel count into `TrivialBackend::new` since the trivial backend has no
    /// per-channel filter state, only an interleave stride.
    pub fn set_channels(&mut self, channels: usize) {
        self.channels = channels;
    }

    fn normalize(&mut self) {
        while self.i_counter >= self.rate_in {
            self.i_counter -= self.rate_in;
            self.o_counter -= self.rate_out;
        }
    }
}

impl Backend for TrivialBackend {
    fn process(&mut self, input: &WorkBuf, max_output_frames: usize) -> Result<(WorkBuf, ProcessResult)> {
        let channels = self.channels.max(1);

        macro_rules! run {
            ($variant:ident, $samples:expr, $zero:expr) => {{
                let in_frames = $samples.len() / channels;
                let mut out = Vec::with_capacity(max_output_frames * channels);
                let mut produced = 0usize;
                while produced < max_output_frames {
                    let i = (self.o_counter * self.rate_in) / self.rate_out - self.i_counter;
                    if i as usize >= in_frames {
                        break;
                    }
                    let base = (i as usize) * channels;
                    out.extend_from_slice(&$samples[base..base + channels]);
                    produced += 1;
                    self.o_counter += 1;
                }
                let _ = $zero;
                self.i_counter += in_frames as u64;
                self.normalize();
                (WorkBuf::$variant(out), ProcessResult { consumed: in_frames, produced })
            }};
        }

        let (out, result) = match input {
            WorkBuf::S16(samples) => run!(S16, samples, 0i16),
            WorkBuf::F32(samples) => run!(F32, samples, 0f32),
        };

        // The trivial backend never reports a leftover: every offered input frame advances
        // `i_counter` and is considered "accounted for" even if its samples were never copied to
        // an output frame (§4.4.1).
        Ok((out, ProcessResult { consumed: result.consumed, produced: result.produced }))
    }

    fn update_rates(&mut self, rate_in: u32, rate_out: u32) -> Result<()> {
        self.rate_in = u64::from(rate_in);
        self.rate_out = u64::from(rate_out);
        self.i_counter = 0;
        self.o_counter = 0;
        Ok(())
    }

    fn reset(&mut self) {
        self.i_counter = 0;
        self.o_counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_downsample_picks_nearest_frames() {
        let mut backend = TrivialBackend::new(4, 2);
        backend.set_channels(1);
        let input = WorkBuf::F32(vec![10.0, 20.0, 30.0, 40.0]);
        let (out, result) = backend.process(&input, 2).unwrap();
        assert_eq!(result.consumed, 4);
        match out {
            WorkBuf::F32(v) => assert_eq!(v, vec![10.0, 30.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn verify_counter_stays_bounded_over_many_calls() {
        let mut backend = TrivialBackend::new(48000, 44100);
        backend.set_channels(1);
        let input = WorkBuf::F32(vec![0.0; 1000]);
        for _ in 0..2000 {
            let (_out, result) = backend.process(&input, 1000).unwrap();
            assert_eq!(result.consumed, 1000);
        }
        assert!(backend.i_counter < backend.rate_in);
    }

    #[test]
    fn verify_identity_rate_is_a_pure_copy() {
        let mut backend = TrivialBackend::new(44100, 44100);
        backend.set_channels(2);
        let input = WorkBuf::F32(vec![1.0, -1.0, 0.5, -0.5]);
        let (out, result) = backend.process(&input, 2).unwrap();
        assert_eq!(result.produced, 2);
        match out {
            WorkBuf::F32(v) => assert_eq!(v, vec![1.0, -1.0, 0.5, -0.5]),
            _ => unreachable!(),
        }
    }
}
