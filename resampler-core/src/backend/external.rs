// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `rubato`-backed adapter for the `src-*` family of methods (§4.4.3).
//!
//! `rubato`'s sinc resampler is fixed-input, planar, and `f64`: this module de-interleaves the
//! work buffer into one `Vec<f64>` per channel, drives `rubato`, and re-interleaves the planar
//! result back into a work buffer. The fixed-input contract means a caller offering fewer frames
//! than `input_frames_next()` wants gets nothing back for this call and must be considered
//! unconsumed — the orchestrator's leftover protocol (`buffer::RemapBuffer`) already handles that.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::backend::{Backend, Method, ProcessResult};
use crate::error::{Error, Result};
use crate::sample::WorkBuf;

/// Maps a `src-sinc-*`/`src-zero-order-hold`/`src-linear` method to `rubato` sinc parameters. The
/// zero-order-hold and linear methods are approximated with the fastest valid sinc parameter set
/// `rubato` accepts, since `rubato` does not expose bare ZOH/linear kernels directly; this is the
/// one place the adapter does not have a 1:1 counterpart for a listed method name.
fn sinc_params(method: Method) -> SincInterpolationParameters {
    match method {
        Method::SrcSincBestQuality => SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Cubic,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        },
        Method::SrcSincMediumQuality => SincInterpolationParameters {
            sinc_len: 128,
            f_cutoff: 0.925,
            interpolation: SincInterpolationType::Cubic,
            oversampling_factor: 128,
            window: WindowFunction::Blackman2,
        },
        Method::SrcSincFastest | Method::SrcZeroOrderHold | Method::SrcLinear => {
            SincInterpolationParameters {
                sinc_len: 64,
                f_cutoff: 0.9,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 64,
                window: WindowFunction::Hann2,
            }
        }
        other => unreachable!("{:?} is not routed through the external adapter", other),
    }
}

pub struct ExternalBackend {
    method: Method,
    channels: usize,
    rate_in: u32,
    rate_out: u32,
    inner: SincFixedIn<f64>,
    planar_in: Vec<Vec<f64>>,
}

impl ExternalBackend {
    pub fn new(method: Method, channels: usize, rate_in: u32, rate_out: u32) -> Result<ExternalBackend> {
        let channels = channels.max(1);
        let ratio = f64::from(rate_out) / f64::from(rate_in);
        let chunk_size = 1024;

        let inner = SincFixedIn::<f64>::new(ratio, 2.0, sinc_params(method), chunk_size, channels)
            .map_err(|e| Error::Backend(Box::new(e)))?;

        Ok(ExternalBackend {
            method,
            channels,
            rate_in,
            rate_out,
            inner,
            planar_in: vec![Vec::new(); channels],
        })
    }

    fn deinterleave_f32(&mut self, samples: &[f32], frames: usize) {
        for plane in &mut self.planar_in {
            plane.clear();
            plane.reserve(frames);
        }
        for frame in samples.chunks_exact(self.channels) {
            for (c, &s) in frame.iter().enumerate() {
                self.planar_in[c].push(f64::from(s));
            }
        }
    }

    fn deinterleave_s16(&mut self, samples: &[i16], frames: usize) {
        for plane in &mut self.planar_in {
            plane.clear();
            plane.reserve(frames);
        }
        for frame in samples.chunks_exact(self.channels) {
            for (c, &s) in frame.iter().enumerate() {
                self.planar_in[c].push(f64::from(s) / f64::from(i16::MAX));
            }
        }
    }
}

impl Backend for ExternalBackend {
    fn process(&mut self, input: &WorkBuf, max_output_frames: usize) -> Result<(WorkBuf, ProcessResult)> {
        let needed = self.inner.input_frames_next();

        let offered_frames = input.len() / self.channels;
        if offered_frames < needed {
            // Not enough buffered to satisfy rubato's fixed chunk size this call; the orchestrator
            // will save the whole offering as leftover and retry once more has accumulated.
            return Ok((WorkBuf::new(input.format(), 0), ProcessResult { consumed: 0, produced: 0 }));
        }

        match input {
            WorkBuf::F32(samples) => self.deinterleave_f32(&samples[..needed * self.channels], needed),
            WorkBuf::S16(samples) => self.deinterleave_s16(&samples[..needed * self.channels], needed),
        }

        let planar_out =
            self.inner.process(&self.planar_in, None).map_err(|e| Error::Backend(Box::new(e)))?;
        let produced = planar_out.first().map_or(0, Vec::len).min(max_output_frames);

        let mut out = Vec::with_capacity(produced * self.channels);
        for frame in 0..produced {
            for plane in &planar_out {
                out.push(plane[frame] as f32);
            }
        }

        Ok((WorkBuf::F32(out), ProcessResult { consumed: needed, produced }))
    }

    fn update_rates(&mut self, rate_in: u32, rate_out: u32) -> Result<()> {
        let ratio = f64::from(rate_out) / f64::from(rate_in);
        if self.inner.set_resample_ratio(ratio, true).is_err() {
            // Ratio moved outside the relative bound the resampler was constructed with; tear
            // down and rebuild rather than surfacing a hard error to the caller.
            let rebuilt = ExternalBackend::new(self.method, self.channels, rate_in, rate_out)?;
            *self = rebuilt;
            return Ok(());
        }
        self.rate_in = rate_in;
        self.rate_out = rate_out;
        Ok(())
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_deinterleave_f32_splits_channels_in_order() {
        let mut backend = ExternalBackend::new(Method::SrcSincFastest, 2, 44_100, 48_000).unwrap();
        let interleaved = [1.0f32, -1.0, 2.0, -2.0, 3.0, -3.0];
        backend.deinterleave_f32(&interleaved, 3);
        assert_eq!(backend.planar_in[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(backend.planar_in[1], vec![-1.0, -2.0, -3.0]);
    }

    #[test]
    fn verify_deinterleave_s16_normalizes_to_unit_range() {
        let mut backend = ExternalBackend::new(Method::SrcSincFastest, 1, 44_100, 48_000).unwrap();
        backend.deinterleave_s16(&[i16::MAX, i16::MIN + 1, 0], 3);
        assert!((backend.planar_in[0][0] - 1.0).abs() < 1e-6);
        assert!((backend.planar_in[0][1] - (-1.0)).abs() < 1e-6);
        assert_eq!(backend.planar_in[0][2], 0.0);
    }

    #[test]
    fn verify_deinterleave_clears_previous_call_before_filling() {
        let mut backend = ExternalBackend::new(Method::SrcSincFastest, 1, 44_100, 48_000).unwrap();
        backend.deinterleave_f32(&[1.0, 2.0, 3.0, 4.0], 4);
        backend.deinterleave_f32(&[9.0, 8.0], 2);
        assert_eq!(backend.planar_in[0], vec![9.0, 8.0]);
    }

    #[test]
    fn verify_process_reports_zero_consumed_when_offered_less_than_chunk_size() {
        let mut backend = ExternalBackend::new(Method::SrcSincFastest, 2, 44_100, 48_000).unwrap();
        let needed = backend.inner.input_frames_next();
        assert!(needed > 1, "rubato's fixed chunk size should exceed a single frame");

        let short = WorkBuf::F32(vec![0.0; (needed - 1) * 2]);
        let (out, result) = backend.process(&short, usize::MAX).unwrap();
        assert_eq!(result.consumed, 0);
        assert_eq!(result.produced, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn verify_process_consumes_exactly_one_chunk_when_enough_is_offered() {
        let mut backend = ExternalBackend::new(Method::SrcSincFastest, 2, 44_100, 48_000).unwrap();
        let needed = backend.inner.input_frames_next();

        let input = WorkBuf::F32(vec![0.0; needed * 2]);
        let (_out, result) = backend.process(&input, usize::MAX).unwrap();
        assert_eq!(result.consumed, needed);
    }
}
