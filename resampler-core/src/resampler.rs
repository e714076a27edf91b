// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The pipeline orchestrator (§4.5): `Resampler::run` and the request/result/max-block-size
//! accounting callers use to size their own buffers.

use crate::backend::{self, Backend, Method};
use crate::buffer::{OutputBuffer, RemapBuffer};
use crate::channels::{default_map_for_count, ChannelMap};
use crate::error::{config_error, Result};
use crate::flags::Flags;
use crate::matrix::{self, ChannelMatrix};
use crate::pool::Pool;
use crate::sample::{choose_work_format, convert_from_work, convert_to_work, SampleFormat, WorkBuf};

/// The maximum sample rate this engine accepts, mirroring the reference implementation's
/// `PA_RATE_MAX`.
pub const RATE_MAX: u32 = 384_000;
/// The maximum channel count this engine accepts, mirroring `PA_CHANNELS_MAX`.
pub const CHANNELS_MAX: usize = 32;
/// Per-call backend overshoot allowance (§6).
const EXTRA_FRAMES: usize = 128;

/// A PCM endpoint descriptor: sample format, rate, and channel count. The channel *map* is
/// supplied separately to `Resampler::new` since it may be defaulted from the count alone.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SampleSpec {
    pub format: SampleFormat,
    pub rate: u32,
    pub channels: usize,
}

impl SampleSpec {
    fn validate(self) -> Result<()> {
        if self.rate == 0 || self.rate > RATE_MAX {
            return config_error("sample rate out of range");
        }
        if self.channels == 0 || self.channels > CHANNELS_MAX {
            return config_error("channel count out of range");
        }
        Ok(())
    }

    fn frame_bytes(self) -> usize {
        self.format.byte_width() * self.channels
    }
}

/// A real-time PCM rate, format, and channel-layout resampler (§2).
///
/// Not `Sync`: an instance is owned by exactly one thread for its lifetime (§5). It remains
/// `Send` so ownership may be handed off once, e.g. to a dedicated audio I/O thread.
pub struct Resampler {
    pool: Pool,
    in_spec: SampleSpec,
    out_spec: SampleSpec,
    in_map: ChannelMap,
    out_map: ChannelMap,
    method: Method,
    flags: Flags,
    work_format: crate::sample::WorkFormat,
    work_channels: usize,
    matrix: ChannelMatrix,
    backend: Box<dyn Backend>,
    /// `true` when `out_channels <= in_channels`: remap runs before resample, and leftover is
    /// carried between those two stages. `false` (fan-out): resample runs before remap, and
    /// leftover is carried between to-work and resample instead (Open Question 4).
    fold_down: bool,
    carry: RemapBuffer,
    output: OutputBuffer,
    /// Zero-sized marker that is `Send` but not `Sync` (`Cell` is never `Sync`), so `Resampler`
    /// auto-derives `Send` (matching §5: ownership may move to a dedicated audio thread) while
    /// losing `Sync` (an instance is never safe to call concurrently from multiple threads).
    /// `negative_impls` is unstable, so this is the stable way to withhold just `Sync`.
    _not_sync: std::marker::PhantomData<std::cell::Cell<()>>,
}

impl Resampler {
    /// Construct a resampler. `in_map`/`out_map` default to the conventional layout for their
    /// channel count when `None`, per §6; a channel count with no unambiguous convention and no
    /// explicit map is a configuration error.
    pub fn new(
        pool: Pool,
        in_spec: SampleSpec,
        in_map: Option<ChannelMap>,
        out_spec: SampleSpec,
        out_map: Option<ChannelMap>,
        method: Method,
        flags: Flags,
    ) -> Result<Resampler> {
        in_spec.validate()?;
        out_spec.validate()?;

        let in_map = resolve_map(in_map, in_spec.channels)?;
        let out_map = resolve_map(out_map, out_spec.channels)?;

        let fixed_method = method.fixup(in_spec.rate, out_spec.rate, flags);

        let matrix = matrix::build(&in_map, &out_map, flags);
        let work_format =
            choose_work_format(in_spec.format, out_spec.format, fixed_method, matrix.map_required);
        let work_channels = in_spec.channels.min(out_spec.channels);

        let backend = backend::construct(fixed_method, work_channels, in_spec.rate, out_spec.rate)?;

        let fold_down = out_spec.channels <= in_spec.channels;
        let carry_channels = if fold_down { out_spec.channels } else { in_spec.channels };

        Ok(Resampler {
            pool: pool.clone(),
            in_spec,
            out_spec,
            in_map,
            out_map,
            method: fixed_method,
            flags,
            work_format,
            work_channels,
            matrix,
            backend,
            fold_down,
            carry: RemapBuffer::new(work_format, carry_channels),
            output: OutputBuffer::new(pool, out_spec.format, out_spec.channels),
            _not_sync: std::marker::PhantomData,
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn work_channels(&self) -> usize {
        self.work_channels
    }

    /// Run one chunk through the pipeline (§4.5). `in_chunk` must be non-empty and a whole
    /// multiple of the input frame size; both are caller preconditions, enforced with `assert!`
    /// rather than a recoverable error (§7).
    pub fn run(&mut self, in_chunk: &[u8]) -> Result<Vec<u8>> {
        assert!(!in_chunk.is_empty(), "run() called with an empty input chunk");
        let in_frame_bytes = self.in_spec.frame_bytes();
        assert_eq!(
            in_chunk.len() % in_frame_bytes,
            0,
            "input chunk length is not a multiple of the input frame size"
        );
        let in_frames = in_chunk.len() / in_frame_bytes;

        let mut to_work = WorkBuf::new(self.work_format, in_frames * self.in_spec.channels);
        convert_to_work(self.in_spec.format, in_chunk, &mut to_work);

        let buf = if self.fold_down {
            let remapped = matrix::remix(&self.matrix, &to_work, in_frames);
            let total_frames = self.carry.append_after_leftover(remapped);
            let max_out = self.backend_output_budget(total_frames);
            let (resampled, result) = self.backend.process(self.carry.samples(), max_out)?;
            if result.consumed < total_frames {
                self.carry.save_leftover(result.consumed, total_frames);
            }
            else {
                self.carry.clear_leftover();
            }
            resampled
        }
        else {
            let total_frames = self.carry.append_after_leftover(to_work);
            let max_out = self.backend_output_budget(total_frames);
            let (resampled, result) = self.backend.process(self.carry.samples(), max_out)?;
            if result.consumed < total_frames {
                self.carry.save_leftover(result.consumed, total_frames);
            }
            else {
                self.carry.clear_leftover();
            }
            matrix::remix(&self.matrix, &resampled, result.produced)
        };

        if buf.is_empty() {
            return Ok(Vec::new());
        }

        let out_frames = buf.len() / self.out_spec.channels;
        let out_bytes = out_frames * self.out_spec.frame_bytes();
        let block = self.output.ensure_capacity(out_frames).clone();
        block.with_mut(|bytes| convert_from_work(self.out_spec.format, &buf, &mut bytes[..out_bytes]));
        Ok(block.with(|bytes| bytes[..out_bytes].to_vec()))
    }

    /// Upper bound on frames a backend call should be allowed to produce this call: the exact
    /// rate-ratio expectation plus the per-call overshoot allowance (§6).
    fn backend_output_budget(&self, in_frames: usize) -> usize {
        let exact = (in_frames as u64 * u64::from(self.out_spec.rate)) / u64::from(self.in_spec.rate);
        exact as usize + EXTRA_FRAMES
    }

    /// Smallest input byte-length such that running it yields at least `out_length` bytes.
    /// Leftover already buffered is not counted, to avoid a `request → run → 0 bytes` deadlock
    /// (§4.5).
    pub fn request(&self, out_length: usize) -> usize {
        let out_frame_bytes = self.out_spec.frame_bytes();
        let out_frames = ceil_div(out_length as u64, out_frame_bytes as u64);
        let in_frames = ceil_div(out_frames * u64::from(self.in_spec.rate), u64::from(self.out_spec.rate));
        in_frames as usize * self.in_spec.frame_bytes()
    }

    /// Upper bound on output bytes `run` may produce given `in_length` input bytes, including any
    /// leftover already sitting in the carry buffer.
    pub fn result(&self, in_length: usize) -> usize {
        let in_frames = in_length / self.in_spec.frame_bytes();
        let total_frames = (in_frames + self.carry.leftover_frames()) as u64;
        let out_frames =
            ceil_div(total_frames * u64::from(self.out_spec.rate), u64::from(self.in_spec.rate));
        out_frames as usize * self.out_spec.frame_bytes()
    }

    /// Largest input byte length whose worst-case expansion still fits within one pool block,
    /// after reserving space for `EXTRA_FRAMES` of backend overshoot and any leftover already
    /// buffered — all converted to output-frame bytes before subtraction (Open Question 3).
    pub fn max_block_size(&self) -> usize {
        let out_frame_bytes = self.out_spec.frame_bytes();
        let reserved = EXTRA_FRAMES * out_frame_bytes + self.carry.leftover_frames() * out_frame_bytes;
        let available = self.pool.max_block_size().saturating_sub(reserved);
        let out_frames = available / out_frame_bytes.max(1);
        let in_frames = (out_frames as u64 * u64::from(self.in_spec.rate)) / u64::from(self.out_spec.rate);
        in_frames as usize * self.in_spec.frame_bytes()
    }

    /// Update the input rate, calling the backend's `update_rates` iff it actually changed.
    pub fn set_input_rate(&mut self, rate: u32) -> Result<()> {
        if rate == self.in_spec.rate {
            return Ok(());
        }
        log::debug!("resampler: input rate {} -> {}", self.in_spec.rate, rate);
        self.in_spec.rate = rate;
        self.backend.update_rates(self.in_spec.rate, self.out_spec.rate)
    }

    /// Update the output rate, calling the backend's `update_rates` iff it actually changed.
    pub fn set_output_rate(&mut self, rate: u32) -> Result<()> {
        if rate == self.out_spec.rate {
            return Ok(());
        }
        log::debug!("resampler: output rate {} -> {}", self.out_spec.rate, rate);
        self.out_spec.rate = rate;
        self.backend.update_rates(self.in_spec.rate, self.out_spec.rate)
    }

    /// Flush backend filter memory and drop any buffered leftover.
    pub fn reset(&mut self) {
        log::debug!("resampler: reset");
        self.backend.reset();
        self.carry.clear_leftover();
    }
}

fn ceil_div(a: u64, b: u64) -> u64 {
    (a + b - 1) / b
}

fn resolve_map(map: Option<ChannelMap>, channels: usize) -> Result<ChannelMap> {
    match map {
        Some(m) if m.len() == channels => Ok(m),
        Some(_) => config_error("channel map length does not match channel count"),
        None => default_map_for_count(channels as u32)
            .ok_or("channel count has no default map; an explicit map is required")
            .or_else(|msg| config_error(msg)),
    }
}
