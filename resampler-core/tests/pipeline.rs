// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end pipeline scenarios exercising `Resampler` through its public API only.

use resampler_core::{ChannelMap, Flags, Method, Pool, Position, Resampler, SampleFormat, SampleSpec};

fn decode_s16(bytes: &[u8]) -> Vec<i16> {
    bytes.chunks_exact(2).map(|c| i16::from_ne_bytes([c[0], c[1]])).collect()
}

fn encode_s16(samples: &[i16]) -> Vec<u8> {
    let mut out = vec![0u8; samples.len() * 2];
    for (chunk, &s) in out.chunks_exact_mut(2).zip(samples.iter()) {
        chunk.copy_from_slice(&s.to_ne_bytes());
    }
    out
}

// E1: trivial downsampling of silence produces silence, with a frame count close to the exact
// rate ratio.
#[test]
fn e1_trivial_downsample_of_silence_stays_silent() {
    let pool = Pool::new(1 << 20);
    let in_spec = SampleSpec { format: SampleFormat::S16, rate: 48_000, channels: 2 };
    let out_spec = SampleSpec { format: SampleFormat::S16, rate: 44_100, channels: 2 };
    let mut r =
        Resampler::new(pool, in_spec, None, out_spec, None, Method::Trivial, Flags::empty()).unwrap();
    assert_eq!(r.method(), Method::Trivial);

    let in_frames = 4800;
    let input = vec![0u8; in_frames * 2 * 2];
    let output = r.run(&input).unwrap();

    let samples = decode_s16(&output);
    assert!(samples.iter().all(|&s| s == 0));

    let out_frames = samples.len() / 2;
    let expected = in_frames * 44_100 / 48_000;
    let drift = (out_frames as i64 - expected as i64).abs();
    assert!(drift < 64, "out_frames={} expected={}", out_frames, expected);
}

// E2: requesting `copy` on a variable-rate instance is rejected by fix-up and silently upgraded to
// the best available real backend, even though the rates happen to match at construction time.
#[test]
fn e2_copy_forced_to_auto_under_variable_rate() {
    let pool = Pool::new(1 << 20);
    let in_spec = SampleSpec { format: SampleFormat::S16, rate: 44_100, channels: 2 };
    let out_spec = SampleSpec { format: SampleFormat::S16, rate: 44_100, channels: 2 };
    let r =
        Resampler::new(pool, in_spec, None, out_spec, None, Method::Copy, Flags::VARIABLE_RATE).unwrap();
    assert_ne!(r.method(), Method::Copy);
    assert_eq!(r.method(), Method::SrcSincBestQuality);
}

// E3: the peaks backend is kept (not fixed up) when actually downsampling, and never reports a
// louder peak than the input it was given.
#[test]
fn e3_peaks_downsample_never_exceeds_input_peak() {
    let pool = Pool::new(1 << 20);
    let in_spec = SampleSpec { format: SampleFormat::S16, rate: 96_000, channels: 1 };
    let out_spec = SampleSpec { format: SampleFormat::S16, rate: 44_100, channels: 1 };
    let mut r =
        Resampler::new(pool, in_spec, None, out_spec, None, Method::Peaks, Flags::empty()).unwrap();
    assert_eq!(r.method(), Method::Peaks);

    let in_frames = 9600;
    let peak_in: i16 = 12_000;
    let tone: Vec<i16> = (0..in_frames)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * 1000.0 * (i as f64) / 96_000.0;
            (phase.sin() * f64::from(peak_in)) as i16
        })
        .collect();
    let input = encode_s16(&tone);

    let output = r.run(&input).unwrap();
    let out = decode_s16(&output);
    assert!(!out.is_empty());
    let peak_out = out.iter().map(|&s| s.unsigned_abs()).max().unwrap_or(0);
    assert!(peak_out as i32 <= peak_in as i32, "peak_out={} peak_in={}", peak_out, peak_in);
}

// E4: equal input/output rates but differing channel maps at the same channel count still force a
// real remix even though the backend method fixes up to `copy`.
#[test]
fn e4_equal_rate_differing_maps_forces_remix_under_copy() {
    let pool = Pool::new(1 << 20);
    let in_map: ChannelMap = [Position::FrontLeft, Position::FrontRight, Position::RearLeft, Position::RearRight]
        .into_iter()
        .collect();
    let out_map: ChannelMap = [Position::FrontLeft, Position::FrontRight, Position::SideLeft, Position::SideRight]
        .into_iter()
        .collect();

    let spec = SampleSpec { format: SampleFormat::S16, rate: 48_000, channels: 4 };
    let mut r = Resampler::new(
        pool,
        spec,
        Some(in_map),
        spec,
        Some(out_map),
        Method::Auto,
        Flags::empty(),
    )
    .unwrap();
    assert_eq!(r.method(), Method::Copy);

    let frame: [i16; 4] = [1000, -2000, 3000, -4000];
    let input_frames = encode_s16(&[frame; 64].concat());
    let output = r.run(&input_frames).unwrap();

    // Same channel count and rate, so a plain copy would reproduce the input byte-for-byte. The
    // differing channel maps mean a real remix ran instead, so the output must differ somewhere.
    assert_eq!(output.len(), input_frames.len());
    assert_ne!(output, input_frames);
}

// E5: after `reset`, the request/result accounting returns to its pre-streaming baseline, proving
// any leftover accumulated by an external (rubato) backend across unaligned chunks was discarded.
#[test]
fn e5_reset_clears_streaming_leftover_accounting() {
    let pool = Pool::new(1 << 20);
    let in_spec = SampleSpec { format: SampleFormat::S16, rate: 44_100, channels: 2 };
    let out_spec = SampleSpec { format: SampleFormat::S16, rate: 48_000, channels: 2 };
    let mut r = Resampler::new(
        pool,
        in_spec,
        None,
        out_spec,
        None,
        Method::SrcSincBestQuality,
        Flags::empty(),
    )
    .unwrap();

    let baseline = r.result(1);

    // Feed several oddly-sized chunks so the external backend's internal buffering leaves
    // leftover frames queued between calls.
    for &frames in &[37usize, 501, 13, 256] {
        let input = vec![0u8; frames * 2 * 2];
        r.run(&input).unwrap();
    }

    r.reset();
    assert_eq!(r.result(1), baseline);
}

// E6: doubling the input rate mid-stream via `set_input_rate` is accepted without error and the
// pipeline keeps producing output afterward.
#[test]
fn e6_set_input_rate_mid_stream_doubling() {
    let pool = Pool::new(1 << 20);
    let in_spec = SampleSpec { format: SampleFormat::S16, rate: 44_100, channels: 2 };
    let out_spec = SampleSpec { format: SampleFormat::S16, rate: 44_100, channels: 2 };
    let mut r = Resampler::new(
        pool,
        in_spec,
        None,
        out_spec,
        None,
        Method::Trivial,
        Flags::VARIABLE_RATE,
    )
    .unwrap();
    assert_eq!(r.method(), Method::Trivial);

    let first = vec![0u8; 512 * 2 * 2];
    r.run(&first).unwrap();

    r.set_input_rate(88_200).unwrap();

    let second_frames = 1024;
    let second = vec![0u8; second_frames * 2 * 2];
    let out = r.run(&second).unwrap();
    assert!(!out.is_empty());

    let out_frames = out.len() / (2 * 2);
    let expected = second_frames * 44_100 / 88_200;
    let drift = (out_frames as i64 - expected as i64).abs();
    assert!(drift < 64, "out_frames={} expected={}", out_frames, expected);
}
