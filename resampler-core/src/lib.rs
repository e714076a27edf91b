// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `resampler-core` is a real-time PCM rate, format, and channel-layout resampling engine.
//!
//! A [`Resampler`] converts a stream of interleaved PCM frames from one `(sample rate, sample
//! format, channel layout)` triple to another: the kind of conversion that sits between a sound
//! producer and consumer whenever their formats don't already match. Construction picks a work
//! format, builds a channel remix matrix from the two channel-position maps, and selects a
//! rate-conversion backend; [`Resampler::run`] then drives one chunk through format conversion,
//! channel remap, and rate conversion (ordered by whether the stream is being upmixed or
//! downmixed), and back to the output format.
//!
//! See [`resampler::Resampler`] for the primary entry point.

pub mod backend;
pub mod buffer;
pub mod channels;
pub mod error;
pub mod flags;
pub mod matrix;
pub mod pool;
pub mod resampler;
pub mod sample;

pub use backend::Method;
pub use channels::{ChannelMap, Position};
pub use error::{Error, Result};
pub use flags::Flags;
pub use pool::Pool;
pub use resampler::{Resampler, SampleSpec};
pub use sample::SampleFormat;
