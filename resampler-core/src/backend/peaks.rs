// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `peaks` downsampling envelope follower backend (§4.4.2).
//!
//! Only ever constructed for `rate_in >= rate_out` — the fix-up rules in `backend::mod` never
//! resolve `peaks` to this backend when upsampling.

use crate::backend::{Backend, ProcessResult};
use crate::error::Result;
use crate::sample::WorkBuf;

/// Tracks, per channel, the largest-magnitude sample seen since the last output frame was
/// emitted, and emits that peak (sign preserved) whenever the rational counter crosses an output
/// boundary. Grounded on `pulsecore/resampler.c`'s `peaks_resample()`.
pub struct PeaksBackend {
    channels: usize,
    rate_in: u64,
    rate_out: u64,
    i_counter: u64,
    o_counter: u64,
    max_s16: Vec<i16>,
    max_f32: Vec<f32>,
}

impl PeaksBackend {
    pub fn new(channels: usize, rate_in: u32, rate_out: u32) -> PeaksBackend {
        PeaksBackend {
            channels: channels.max(1),
            rate_in: u64::from(rate_in),
            rate_out: u64::from(rate_out),
            i_counter: 0,
            o_counter: 0,
            max_s16: vec![0; channels.max(1)],
            max_f32: vec![0.0; channels.max(1)],
        }
    }

    fn normalize(&mut self) {
        while self.i_counter >= self.rate_in {
            self.i_counter -= self.rate_in;
            self.o_counter -= self.rate_out;
        }
    }

    fn next_output_input_index(&self) -> u64 {
        (self.o_counter * self.rate_in) / self.rate_out
    }
}

impl Backend for PeaksBackend {
    fn process(&mut self, input: &WorkBuf, max_output_frames: usize) -> Result<(WorkBuf, ProcessResult)> {
        let channels = self.channels;

        match input {
            WorkBuf::S16(samples) => {
                let in_frames = samples.len() / channels;
                let mut out = Vec::with_capacity(max_output_frames * channels);
                let mut produced = 0usize;
                let mut frame = 0usize;

                while frame < in_frames {
                    let boundary = self.next_output_input_index();
                    if (self.i_counter + frame as u64) < boundary {
                        for c in 0..channels {
                            let s = samples[frame * channels + c];
                            if s.unsigned_abs() > self.max_s16[c].unsigned_abs() {
                                self.max_s16[c] = s;
                            }
                        }
                        frame += 1;
                        continue;
                    }

                    if produced >= max_output_frames {
                        break;
                    }
                    out.extend_from_slice(&self.max_s16);
                    self.max_s16.iter_mut().for_each(|m| *m = 0);
                    produced += 1;
                    self.o_counter += 1;
                }

                self.i_counter += in_frames as u64;
                self.normalize();
                Ok((WorkBuf::S16(out), ProcessResult { consumed: in_frames, produced }))
            }
            WorkBuf::F32(samples) => {
                let in_frames = samples.len() / channels;
                let mut out = Vec::with_capacity(max_output_frames * channels);
                let mut produced = 0usize;
                let mut frame = 0usize;

                while frame < in_frames {
                    let boundary = self.next_output_input_index();
                    if (self.i_counter + frame as u64) < boundary {
                        for c in 0..channels {
                            let s = samples[frame * channels + c];
                            if s.abs() > self.max_f32[c].abs() {
                                self.max_f32[c] = s;
                            }
                        }
                        frame += 1;
                        continue;
                    }

                    if produced >= max_output_frames {
                        break;
                    }
                    out.extend_from_slice(&self.max_f32);
                    self.max_f32.iter_mut().for_each(|m| *m = 0.0);
                    produced += 1;
                    self.o_counter += 1;
                }

                self.i_counter += in_frames as u64;
                self.normalize();
                Ok((WorkBuf::F32(out), ProcessResult { consumed: in_frames, produced }))
            }
        }
    }

    fn update_rates(&mut self, rate_in: u32, rate_out: u32) -> Result<()> {
        self.rate_in = u64::from(rate_in);
        self.rate_out = u64::from(rate_out);
        self.i_counter = 0;
        self.o_counter = 0;
        self.max_s16.iter_mut().for_each(|m| *m = 0);
        self.max_f32.iter_mut().for_each(|m| *m = 0.0);
        Ok(())
    }

    fn reset(&mut self) {
        self.i_counter = 0;
        self.o_counter = 0;
        self.max_s16.iter_mut().for_each(|m| *m = 0);
        self.max_f32.iter_mut().for_each(|m| *m = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_mono_float_tracks_largest_magnitude() {
        let mut backend = PeaksBackend::new(1, 4, 2);
        let input = WorkBuf::F32(vec![0.1, -0.9, 0.3, 0.2]);
        let (out, result) = backend.process(&input, 2).unwrap();
        assert_eq!(result.consumed, 4);
        match out {
            WorkBuf::F32(v) => {
                assert_eq!(v.len(), 2);
                assert!((v[0].abs() - 0.9).abs() < 1e-6);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn verify_s16_two_channel_peak_per_channel() {
        let mut backend = PeaksBackend::new(2, 4, 2);
        let input = WorkBuf::S16(vec![10, -5, -20, 3, 1, 1, 1, 1]);
        let (out, result) = backend.process(&input, 2).unwrap();
        assert_eq!(result.consumed, 4);
        match out {
            WorkBuf::S16(v) => {
                assert_eq!(v.len(), 4);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn verify_counter_stays_bounded() {
        let mut backend = PeaksBackend::new(1, 48000, 44100);
        let input = WorkBuf::F32(vec![0.5; 1000]);
        for _ in 0..2000 {
            let (_out, result) = backend.process(&input, 1000).unwrap();
            assert_eq!(result.consumed, 1000);
        }
        assert!(backend.i_counter < backend.rate_in);
    }
}
