// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The backend interface (§4.4): method identifiers, the method-name string table (§6), the
//! fix-up rules, and the `Backend` trait every rate-conversion kernel implements.

pub mod external;
pub mod peaks;
pub mod trivial;

use crate::error::{config_error, Result};
use crate::flags::Flags;

/// Identifies a rate-conversion backend. Mirrors the vtable lookup of the reference
/// implementation: `init` is folded into each backend's constructor, and `free` into `Drop`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// Plain byte-for-byte copy; valid only when no conversion of any kind is required.
    Copy,
    /// Nearest-neighbor rate conversion (§4.4.1).
    Trivial,
    /// Downsampling envelope follower (§4.4.2).
    Peaks,
    /// Highest-quality sinc interpolation, grounded on the `rubato` adapter (§4.4.3).
    SrcSincBestQuality,
    /// Medium-quality sinc interpolation.
    SrcSincMediumQuality,
    /// Fastest sinc interpolation.
    SrcSincFastest,
    /// Zero-order hold (repeat last sample).
    SrcZeroOrderHold,
    /// Linear interpolation.
    SrcLinear,
    /// Speex fixed-point resampler at the given quality level (0..=10).
    SpeexFixed(u8),
    /// Speex floating-point resampler at the given quality level (0..=10).
    SpeexFloat(u8),
    /// Resolve to the best available backend at fix-up time.
    Auto,
}

impl Method {
    pub fn is_speex_fixed(self) -> bool {
        matches!(self, Method::SpeexFixed(_))
    }

    /// Whether this backend is actually linked into this build. `auto` always "is available" in
    /// the sense that fix-up will always resolve it to something concrete; every other listed
    /// method is available except the Speex family, which this crate does not vendor (§4.4.3
    /// grounds the external backend on `rubato` instead — see `Method::fixup`).
    fn is_compiled_in(self) -> bool {
        !matches!(self, Method::SpeexFixed(_) | Method::SpeexFloat(_))
    }

    /// Parse a method from its stable string name (§6).
    pub fn from_name(name: &str) -> Option<Method> {
        Some(match name {
            "copy" => Method::Copy,
            "trivial" => Method::Trivial,
            "peaks" => Method::Peaks,
            "auto" => Method::Auto,
            "src-sinc-best-quality" => Method::SrcSincBestQuality,
            "src-sinc-medium-quality" => Method::SrcSincMediumQuality,
            "src-sinc-fastest" => Method::SrcSincFastest,
            "src-zero-order-hold" => Method::SrcZeroOrderHold,
            "src-linear" => Method::SrcLinear,
            "speex-fixed" => Method::SpeexFixed(1),
            "speex-float" => Method::SpeexFloat(1),
            name => {
                if let Some(q) = name.strip_prefix("speex-fixed-") {
                    Method::SpeexFixed(q.parse().ok()?)
                }
                else if let Some(q) = name.strip_prefix("speex-float-") {
                    Method::SpeexFloat(q.parse().ok()?)
                }
                else {
                    return None;
                }
            }
        })
    }

    pub fn name(self) -> String {
        match self {
            Method::Copy => "copy".into(),
            Method::Trivial => "trivial".into(),
            Method::Peaks => "peaks".into(),
            Method::Auto => "auto".into(),
            Method::SrcSincBestQuality => "src-sinc-best-quality".into(),
            Method::SrcSincMediumQuality => "src-sinc-medium-quality".into(),
            Method::SrcSincFastest => "src-sinc-fastest".into(),
            Method::SrcZeroOrderHold => "src-zero-order-hold".into(),
            Method::SrcLinear => "src-linear".into(),
            Method::SpeexFixed(q) => format!("speex-fixed-{}", q),
            Method::SpeexFloat(q) => format!("speex-float-{}", q),
        }
    }

    /// Apply the method fix-up rules (§4.4, applied before `init`). Returns the method that will
    /// actually be constructed; logs (via the `log` facade) whenever the requested method was
    /// rewritten.
    pub fn fixup(self, rate_in: u32, rate_out: u32, flags: Flags) -> Method {
        let requested = self;
        let mut method = self;

        if rate_in == rate_out && !flags.contains(Flags::VARIABLE_RATE) {
            method = Method::Copy;
        }
        else if !method.is_compiled_in() {
            method = Method::Auto;
        }
        else if method == Method::Copy && flags.contains(Flags::VARIABLE_RATE) {
            method = Method::Auto;
        }
        else if method == Method::Peaks && rate_in < rate_out {
            method = Method::Auto;
        }

        if method == Method::Auto {
            // Highest-quality backend available, else trivial. This build vendors the `rubato`
            // sinc adapter rather than Speex, so "highest quality available" resolves to it.
            method = Method::SrcSincBestQuality;
        }

        if method != requested {
            log::debug!("resampler: method {} fixed up to {}", requested.name(), method.name());
        }

        method
    }
}

/// The result of one `process` call: how many input frames were consumed and how many output
/// frames were produced. Replaces the reference implementation's `(frames_consumed, frames_produced)`
/// out-parameter pair with an owned return value.
#[derive(Copy, Clone, Debug, Default)]
pub struct ProcessResult {
    pub consumed: usize,
    pub produced: usize,
}

/// A rate-conversion backend (§4.4). `init` is folded into each concrete backend's constructor;
/// `free` is folded into `Drop`. Requires `Send` so a constructed `Resampler` may be handed off to
/// a dedicated audio thread (§5) — every backend here holds only owned, non-shared state, so this
/// is never a real constraint on implementors.
pub trait Backend: Send {
    /// Consume up to `input`'s frame count, write up to `max_output_frames` frames into `output`.
    /// If fewer input frames were consumed than offered, the caller (the pipeline orchestrator)
    /// is responsible for saving the leftover — backends report the consumed count and the
    /// orchestrator diffs it against what was offered.
    fn process(&mut self, input: &crate::sample::WorkBuf, max_output_frames: usize) -> Result<(crate::sample::WorkBuf, ProcessResult)>;

    /// The input/output rates changed; adjust internal ratio.
    fn update_rates(&mut self, rate_in: u32, rate_out: u32) -> Result<()>;

    /// Flush internal filter memory and reset counters.
    fn reset(&mut self);
}

/// Construct the backend for a fixed-up method. `copy`/`trivial`/`peaks` never fail; the external
/// adapter may fail if the requested ratio is degenerate.
pub fn construct(
    method: Method,
    channels: usize,
    rate_in: u32,
    rate_out: u32,
) -> Result<Box<dyn Backend>> {
    match method {
        Method::Copy => Ok(Box::new(trivial::CopyBackend::new(channels))),
        Method::Trivial => {
            let mut backend = trivial::TrivialBackend::new(rate_in, rate_out);
            backend.set_channels(channels);
            Ok(Box::new(backend))
        }
        Method::Peaks => Ok(Box::new(peaks::PeaksBackend::new(channels, rate_in, rate_out))),
        Method::SrcSincBestQuality
        | Method::SrcSincMediumQuality
        | Method::SrcSincFastest
        | Method::SrcZeroOrderHold
        | Method::SrcLinear => {
            external::ExternalBackend::new(method, channels, rate_in, rate_out)
                .map(|b| Box::new(b) as Box<dyn Backend>)
        }
        Method::SpeexFixed(_) | Method::SpeexFloat(_) => {
            config_error("speex backends are not vendored by this build; use `auto` instead")
        }
        Method::Auto => unreachable!("Method::fixup never leaves Auto unresolved"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_name_roundtrip() {
        for name in [
            "copy",
            "trivial",
            "peaks",
            "auto",
            "src-sinc-best-quality",
            "src-sinc-medium-quality",
            "src-sinc-fastest",
            "src-zero-order-hold",
            "src-linear",
            "speex-fixed-0",
            "speex-float-10",
        ] {
            let m = Method::from_name(name).unwrap();
            assert_eq!(m.name(), name);
        }
    }

    #[test]
    fn verify_speex_aliases() {
        assert_eq!(Method::from_name("speex-fixed"), Some(Method::SpeexFixed(1)));
        assert_eq!(Method::from_name("speex-float"), Some(Method::SpeexFloat(1)));
    }

    #[test]
    fn verify_equal_rates_force_copy() {
        let m = Method::SrcSincBestQuality.fixup(48000, 48000, Flags::empty());
        assert_eq!(m, Method::Copy);
    }

    #[test]
    fn verify_copy_with_variable_rate_falls_back_to_auto_resolution() {
        let m = Method::Copy.fixup(44100, 48000, Flags::VARIABLE_RATE);
        assert_eq!(m, Method::SrcSincBestQuality);
    }

    #[test]
    fn verify_peaks_upsampling_falls_back() {
        let m = Method::Peaks.fixup(44100, 48000, Flags::empty());
        assert_eq!(m, Method::SrcSincBestQuality);
    }

    #[test]
    fn verify_peaks_downsampling_is_kept() {
        let m = Method::Peaks.fixup(48000, 44100, Flags::empty());
        assert_eq!(m, Method::Peaks);
    }

    #[test]
    fn verify_uncompiled_speex_falls_back_to_auto() {
        let m = Method::SpeexFloat(5).fixup(44100, 48000, Flags::empty());
        assert_eq!(m, Method::SrcSincBestQuality);
    }
}
