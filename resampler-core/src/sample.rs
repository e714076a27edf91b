// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sample formats, their precision ranking, and the canonical work-format choice rule (§4.1).

use crate::backend::Method;

/// The sample format of a PCM endpoint (the format data arrives in, or must be emitted as).
///
/// Endian is always native (`NE`): a byte-swapping endpoint is outside the scope of this engine
/// and is expected to be normalized by the caller before frames reach `Resampler::run`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer, native-endian.
    S16,
    /// Signed 24-bit integer packed into 3 bytes, native-endian.
    S24,
    /// Signed 24-bit integer sign-extended into 4 bytes, native-endian.
    S24In32,
    /// Signed 32-bit integer, native-endian.
    S32,
    /// 32-bit IEEE-754 float, native-endian.
    F32,
    /// 64-bit IEEE-754 float, native-endian.
    F64,
}

impl SampleFormat {
    /// Size in bytes of one sample in this format.
    pub fn byte_width(self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::S16 => 2,
            SampleFormat::S24 => 3,
            SampleFormat::S24In32 => 4,
            SampleFormat::S32 => 4,
            SampleFormat::F32 => 4,
            SampleFormat::F64 => 8,
        }
    }

    /// Precision rank used by the work-format choice rule (§4.1): low→high is
    /// `{u8} < {s16} < {s24, s24-in-32} < {s32, f32} < {f64}`. Ties within a rank (e.g. S24 vs.
    /// S24In32) are resolved arbitrarily since only relative order against S16NE matters to the
    /// choice rule.
    fn precision_rank(self) -> u8 {
        match self {
            SampleFormat::U8 => 0,
            SampleFormat::S16 => 1,
            SampleFormat::S24 | SampleFormat::S24In32 => 2,
            SampleFormat::S32 | SampleFormat::F32 => 3,
            SampleFormat::F64 => 4,
        }
    }

    /// Whether `self` is strictly more precise than S16.
    fn more_precise_than_s16(self) -> bool {
        self.precision_rank() > SampleFormat::S16.precision_rank()
    }
}

/// The canonical internal PCM encoding the pipeline converts to before remap/resample and back
/// from before emitting output. Always either 16-bit signed integer or 32-bit float, native-endian
/// (§3, invariant 1).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WorkFormat {
    S16NE,
    F32NE,
}

impl WorkFormat {
    pub fn byte_width(self) -> usize {
        match self {
            WorkFormat::S16NE => 2,
            WorkFormat::F32NE => 4,
        }
    }

    pub fn as_sample_format(self) -> SampleFormat {
        match self {
            WorkFormat::S16NE => SampleFormat::S16,
            WorkFormat::F32NE => SampleFormat::F32,
        }
    }
}

/// Apply the work-format choice rule of §4.1.
///
/// `a` and `b` are the input and output endpoint formats (order doesn't matter, the rule is
/// symmetric in its endpoints); `method` is the *already fixed-up* method; `remap_required`
/// reflects whether the instance's channel maps differ.
pub fn choose_work_format(
    a: SampleFormat,
    b: SampleFormat,
    method: Method,
    remap_required: bool,
) -> WorkFormat {
    if method.is_speex_fixed() {
        return WorkFormat::S16NE;
    }

    if matches!(method, Method::Copy | Method::Trivial) && !remap_required && a == b {
        return match a {
            SampleFormat::S16 => WorkFormat::S16NE,
            // Any other matching endpoint format still needs a work format; fall through to the
            // general precision rule below using `a` on both sides.
            _ => precision_rule(a, a),
        };
    }

    if matches!(method, Method::Peaks)
        || (matches!(method, Method::Copy | Method::Trivial) && remap_required)
    {
        return precision_rule(a, b);
    }

    WorkFormat::F32NE
}

fn precision_rule(a: SampleFormat, b: SampleFormat) -> WorkFormat {
    if a == SampleFormat::S16 || b == SampleFormat::S16 {
        WorkFormat::S16NE
    }
    else if a.more_precise_than_s16() || b.more_precise_than_s16() {
        WorkFormat::F32NE
    }
    else {
        WorkFormat::S16NE
    }
}

/// Convert `n_frames * channels` samples from `src` (in format `from`) into work-format samples
/// written to `dst`. Stands in for the assumed external per-format conversion lookup (§1): a real
/// deployment would dispatch through a SIMD-optimized table, but the conversions themselves are
/// pure per-sample arithmetic, so a direct match is both correct and adequately fast here.
pub fn convert_to_work(from: SampleFormat, src: &[u8], dst: &mut WorkBuf) {
    match (from, dst) {
        (SampleFormat::S16, WorkBuf::S16(out)) => {
            decode_s16(src, out);
        }
        (SampleFormat::S16, WorkBuf::F32(out)) => {
            let mut tmp = vec![0i16; out.len()];
            decode_s16(src, &mut tmp);
            for (o, i) in out.iter_mut().zip(tmp.iter()) {
                *o = f32::from(*i) / f32::from(i16::MAX);
            }
        }
        (SampleFormat::U8, WorkBuf::S16(out)) => {
            for (o, &b) in out.iter_mut().zip(src.iter()) {
                *o = (i16::from(b) - 128) << 8;
            }
        }
        (SampleFormat::U8, WorkBuf::F32(out)) => {
            for (o, &b) in out.iter_mut().zip(src.iter()) {
                *o = (f32::from(b) - 128.0) / 128.0;
            }
        }
        (SampleFormat::S24In32, WorkBuf::F32(out)) => {
            for (o, chunk) in out.iter_mut().zip(src.chunks_exact(4)) {
                let v = i32::from_ne_bytes(chunk.try_into().unwrap());
                *o = (v as f32) / (1i32 << 23) as f32;
            }
        }
        (SampleFormat::S24In32, WorkBuf::S16(out)) => {
            for (o, chunk) in out.iter_mut().zip(src.chunks_exact(4)) {
                let v = i32::from_ne_bytes(chunk.try_into().unwrap());
                *o = (v >> 8) as i16;
            }
        }
        (SampleFormat::S32, WorkBuf::F32(out)) => {
            for (o, chunk) in out.iter_mut().zip(src.chunks_exact(4)) {
                let v = i32::from_ne_bytes(chunk.try_into().unwrap());
                *o = (v as f64 / f64::from(i32::MAX)) as f32;
            }
        }
        (SampleFormat::F32, WorkBuf::F32(out)) => {
            for (o, chunk) in out.iter_mut().zip(src.chunks_exact(4)) {
                *o = f32::from_ne_bytes(chunk.try_into().unwrap());
            }
        }
        (SampleFormat::F32, WorkBuf::S16(out)) => {
            for (o, chunk) in out.iter_mut().zip(src.chunks_exact(4)) {
                let v = f32::from_ne_bytes(chunk.try_into().unwrap());
                *o = (v.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            }
        }
        (SampleFormat::F64, WorkBuf::F32(out)) => {
            for (o, chunk) in out.iter_mut().zip(src.chunks_exact(8)) {
                *o = f64::from_ne_bytes(chunk.try_into().unwrap()) as f32;
            }
        }
        (from, dst) => unreachable!(
            "no conversion thunk registered from {:?} to work format {:?}",
            from,
            dst.format()
        ),
    }
}

/// Convert work-format samples back into `to`'s byte representation.
pub fn convert_from_work(to: SampleFormat, src: &WorkBuf, dst: &mut [u8]) {
    match (src, to) {
        (WorkBuf::S16(samples), SampleFormat::S16) => encode_s16(samples, dst),
        (WorkBuf::F32(samples), SampleFormat::F32) => {
            for (chunk, &s) in dst.chunks_exact_mut(4).zip(samples.iter()) {
                chunk.copy_from_slice(&s.to_ne_bytes());
            }
        }
        (WorkBuf::F32(samples), SampleFormat::S16) => {
            let tmp: Vec<i16> =
                samples.iter().map(|&v| (v.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16).collect();
            encode_s16(&tmp, dst);
        }
        (WorkBuf::S16(samples), SampleFormat::F32) => {
            for (chunk, &s) in dst.chunks_exact_mut(4).zip(samples.iter()) {
                let f = f32::from(s) / f32::from(i16::MAX);
                chunk.copy_from_slice(&f.to_ne_bytes());
            }
        }
        (WorkBuf::F32(samples), SampleFormat::U8) => {
            for (b, &s) in dst.iter_mut().zip(samples.iter()) {
                *b = ((s.clamp(-1.0, 1.0) * 128.0) + 128.0) as u8;
            }
        }
        (WorkBuf::S16(samples), SampleFormat::U8) => {
            for (b, &s) in dst.iter_mut().zip(samples.iter()) {
                *b = ((s >> 8) + 128) as u8;
            }
        }
        (WorkBuf::F32(samples), SampleFormat::S24In32) => {
            for (chunk, &s) in dst.chunks_exact_mut(4).zip(samples.iter()) {
                let v = (s.clamp(-1.0, 1.0) * (1i32 << 23) as f32) as i32;
                chunk.copy_from_slice(&v.to_ne_bytes());
            }
        }
        (WorkBuf::F32(samples), SampleFormat::S32) => {
            for (chunk, &s) in dst.chunks_exact_mut(4).zip(samples.iter()) {
                let v = (f64::from(s.clamp(-1.0, 1.0)) * f64::from(i32::MAX)) as i32;
                chunk.copy_from_slice(&v.to_ne_bytes());
            }
        }
        (WorkBuf::F32(samples), SampleFormat::F64) => {
            for (chunk, &s) in dst.chunks_exact_mut(8).zip(samples.iter()) {
                chunk.copy_from_slice(&f64::from(s).to_ne_bytes());
            }
        }
        (src, to) => unreachable!(
            "no conversion thunk registered from work format {:?} to {:?}",
            src.format(),
            to
        ),
    }
}

fn decode_s16(src: &[u8], out: &mut [i16]) {
    for (o, chunk) in out.iter_mut().zip(src.chunks_exact(2)) {
        *o = i16::from_ne_bytes([chunk[0], chunk[1]]);
    }
}

fn encode_s16(samples: &[i16], dst: &mut [u8]) {
    for (chunk, &s) in dst.chunks_exact_mut(2).zip(samples.iter()) {
        chunk.copy_from_slice(&s.to_ne_bytes());
    }
}

/// A typed, owned buffer of work-format samples (interleaved).
#[derive(Debug, Clone)]
pub enum WorkBuf {
    S16(Vec<i16>),
    F32(Vec<f32>),
}

impl WorkBuf {
    pub fn new(format: WorkFormat, len: usize) -> WorkBuf {
        match format {
            WorkFormat::S16NE => WorkBuf::S16(vec![0; len]),
            WorkFormat::F32NE => WorkBuf::F32(vec![0.0; len]),
        }
    }

    pub fn format(&self) -> WorkFormat {
        match self {
            WorkBuf::S16(_) => WorkFormat::S16NE,
            WorkBuf::F32(_) => WorkFormat::F32NE,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            WorkBuf::S16(v) => v.len(),
            WorkBuf::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
