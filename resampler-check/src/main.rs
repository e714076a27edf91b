// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![forbid(unsafe_code)]

//! `resampler-check`: a QA tool for `resampler-core`.
//!
//! Generates a test tone (or silence), drives it through a [`resampler_core::Resampler`]
//! configured entirely from CLI flags, and reports the observed input/output frame counts against
//! the exact rate-ratio expectation, plus the largest output sample magnitude seen. Unlike the
//! teacher's QA tool, there is no reference decoder to diff against — the pass/fail criterion here
//! is "frame accounting stayed within tolerance", not "bytes matched a target decoder".

mod report;

use std::f64::consts::PI;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::info;

use resampler_core::sample::{convert_from_work, WorkBuf};
use resampler_core::{Error, Flags, Method, Pool, Resampler, SampleFormat, SampleSpec};

use report::RunReport;

/// How many frames of drift between the exact rate-ratio expectation and the observed output are
/// tolerated before a run is reported as failed. Chosen generously: every backend is allowed at
/// least one block's worth of internal buffering delay.
const MAX_ALLOWED_DRIFT_FRAMES: u64 = 256;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CliFormat {
    U8,
    S16,
    S32,
    F32,
    F64,
}

impl std::fmt::Display for CliFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_possible_value().unwrap().get_name())
    }
}

impl CliFormat {
    fn to_sample_format(self) -> SampleFormat {
        match self {
            CliFormat::U8 => SampleFormat::U8,
            CliFormat::S16 => SampleFormat::S16,
            CliFormat::S32 => SampleFormat::S32,
            CliFormat::F32 => SampleFormat::F32,
            CliFormat::F64 => SampleFormat::F64,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CliMethod {
    Auto,
    Copy,
    Trivial,
    Peaks,
    SrcSincBestQuality,
    SrcSincMediumQuality,
    SrcSincFastest,
    SrcZeroOrderHold,
    SrcLinear,
}

impl std::fmt::Display for CliMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_possible_value().unwrap().get_name())
    }
}

impl CliMethod {
    fn to_method(self) -> Method {
        match self {
            CliMethod::Auto => Method::Auto,
            CliMethod::Copy => Method::Copy,
            CliMethod::Trivial => Method::Trivial,
            CliMethod::Peaks => Method::Peaks,
            CliMethod::SrcSincBestQuality => Method::SrcSincBestQuality,
            CliMethod::SrcSincMediumQuality => Method::SrcSincMediumQuality,
            CliMethod::SrcSincFastest => Method::SrcSincFastest,
            CliMethod::SrcZeroOrderHold => Method::SrcZeroOrderHold,
            CliMethod::SrcLinear => Method::SrcLinear,
        }
    }
}

/// Drive a synthetic signal through `resampler-core` and report frame-accounting drift.
#[derive(Parser, Debug)]
#[command(name = "resampler-check", about = "QA tool for resampler-core")]
struct Cli {
    /// Input sample rate in Hz.
    #[arg(long, default_value_t = 48_000)]
    rate_in: u32,

    /// Output sample rate in Hz.
    #[arg(long, default_value_t = 44_100)]
    rate_out: u32,

    /// Input channel count. Uses the conventional layout for this count unless ambiguous.
    #[arg(long, default_value_t = 2)]
    channels_in: usize,

    /// Output channel count. Uses the conventional layout for this count unless ambiguous.
    #[arg(long, default_value_t = 2)]
    channels_out: usize,

    /// Input sample format.
    #[arg(long, value_enum, default_value_t = CliFormat::S16)]
    format_in: CliFormat,

    /// Output sample format.
    #[arg(long, value_enum, default_value_t = CliFormat::S16)]
    format_out: CliFormat,

    /// Rate-conversion backend to request (subject to fix-up, §4.4).
    #[arg(long, value_enum, default_value_t = CliMethod::Auto)]
    method: CliMethod,

    /// Frequency in Hz of the generated test tone.
    #[arg(long, default_value_t = 1000.0)]
    tone_hz: f64,

    /// Generate silence instead of a tone.
    #[arg(long)]
    silence: bool,

    /// Length of the generated input signal, in seconds.
    #[arg(long, default_value_t = 1.0)]
    duration_secs: f64,

    /// Mark the instance as variable-rate (forces fix-up away from `copy`, §4.4).
    #[arg(long)]
    variable_rate: bool,

    /// Chunk size, in input frames, each `run()` call is fed.
    #[arg(long, default_value_t = 1024)]
    chunk_frames: usize,

    /// Emit a machine-readable JSON summary on stdout instead of the text banner.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(report) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        eprintln!("failed to serialize report: {}", e);
                        return ExitCode::from(2);
                    }
                }
            }
            else {
                report::print_banner(&report);
            }

            if report.passed {
                ExitCode::SUCCESS
            }
            else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("resampler-check: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<RunReport, Error> {
    let in_spec = SampleSpec {
        format: cli.format_in.to_sample_format(),
        rate: cli.rate_in,
        channels: cli.channels_in,
    };
    let out_spec = SampleSpec {
        format: cli.format_out.to_sample_format(),
        rate: cli.rate_out,
        channels: cli.channels_out,
    };

    let mut flags = Flags::empty();
    if cli.variable_rate {
        flags |= Flags::VARIABLE_RATE;
    }

    let pool = Pool::new(1 << 20);
    let mut resampler =
        Resampler::new(pool, in_spec, None, out_spec, None, cli.method.to_method(), flags)?;

    info!(
        "resampler-check: {} Hz/{} ch -> {} Hz/{} ch via {}",
        cli.rate_in,
        cli.channels_in,
        cli.rate_out,
        cli.channels_out,
        resampler.method().name()
    );

    let total_in_frames = (cli.duration_secs * f64::from(cli.rate_in)) as usize;
    let tone = generate_tone(cli, total_in_frames);
    let in_bytes = encode_tone(in_spec, &tone);

    let in_frame_bytes = in_spec.format.byte_width() * in_spec.channels;
    let chunk_bytes = cli.chunk_frames.max(1) * in_frame_bytes;

    let mut out_bytes_total = 0usize;
    let mut peak_abs_sample = 0.0f32;

    for chunk in in_bytes.chunks(chunk_bytes) {
        if chunk.is_empty() {
            continue;
        }
        let out_chunk = resampler.run(chunk)?;
        peak_abs_sample = peak_abs_sample.max(peak_abs_magnitude(out_spec.format, &out_chunk));
        out_bytes_total += out_chunk.len();
    }

    let out_frame_bytes = out_spec.format.byte_width() * out_spec.channels;
    let out_frames = out_bytes_total / out_frame_bytes.max(1);

    Ok(RunReport::new(
        resampler.method().name(),
        cli.rate_in,
        cli.rate_out,
        cli.channels_in,
        cli.channels_out,
        total_in_frames,
        out_frames,
        peak_abs_sample,
        MAX_ALLOWED_DRIFT_FRAMES,
    ))
}

/// Generate `frames` frames of interleaved `f32` samples in `[-1.0, 1.0]`: a sine tone at
/// `cli.tone_hz` replicated identically across every channel, or silence.
fn generate_tone(cli: &Cli, frames: usize) -> Vec<f32> {
    let mut samples = vec![0.0f32; frames * cli.channels_in];
    if cli.silence {
        return samples;
    }

    let step = 2.0 * PI * cli.tone_hz / f64::from(cli.rate_in);
    for frame in 0..frames {
        let v = (step * frame as f64).sin() as f32 * 0.5;
        for ch in 0..cli.channels_in {
            samples[frame * cli.channels_in + ch] = v;
        }
    }
    samples
}

/// Pack interleaved `f32` samples into `spec.format`'s byte representation, reusing the core
/// crate's own conversion thunks rather than duplicating them.
fn encode_tone(spec: SampleSpec, samples: &[f32]) -> Vec<u8> {
    let work = WorkBuf::F32(samples.to_vec());
    let mut bytes = vec![0u8; samples.len() * spec.format.byte_width()];
    convert_from_work(spec.format, &work, &mut bytes);
    bytes
}

/// Largest absolute sample magnitude in an output chunk, normalized to roughly `[0.0, 1.0]` for a
/// quick sanity check that output isn't silent or clipped to garbage.
fn peak_abs_magnitude(format: SampleFormat, bytes: &[u8]) -> f32 {
    match format {
        SampleFormat::S16 => bytes
            .chunks_exact(2)
            .map(|c| (i16::from_ne_bytes([c[0], c[1]]).unsigned_abs()) as f32 / f32::from(i16::MAX))
            .fold(0.0f32, f32::max),
        SampleFormat::F32 => bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]).abs())
            .fold(0.0f32, f32::max),
        SampleFormat::U8 => bytes
            .iter()
            .map(|&b| (f32::from(b) - 128.0).abs() / 128.0)
            .fold(0.0f32, f32::max),
        _ => 0.0,
    }
}
