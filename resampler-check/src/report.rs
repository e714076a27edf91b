// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Result reporting: the terminal "Test Results" banner and the optional JSON summary.

use serde::Serialize;

/// Outcome of one resample run, independent of how it's printed.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub method: String,
    pub rate_in: u32,
    pub rate_out: u32,
    pub channels_in: usize,
    pub channels_out: usize,
    pub in_frames: usize,
    pub out_frames: usize,
    pub expected_out_frames: usize,
    pub drift_frames: i64,
    pub peak_abs_sample: f32,
    pub passed: bool,
}

impl RunReport {
    pub fn new(
        method: String,
        rate_in: u32,
        rate_out: u32,
        channels_in: usize,
        channels_out: usize,
        in_frames: usize,
        out_frames: usize,
        peak_abs_sample: f32,
        max_allowed_drift_frames: u64,
    ) -> RunReport {
        let expected_out_frames =
            ((in_frames as u64 * u64::from(rate_out)) / u64::from(rate_in)) as usize;
        let drift_frames = out_frames as i64 - expected_out_frames as i64;
        let passed = drift_frames.unsigned_abs() <= max_allowed_drift_frames;

        RunReport {
            method,
            rate_in,
            rate_out,
            channels_in,
            channels_out,
            in_frames,
            out_frames,
            expected_out_frames,
            drift_frames,
            peak_abs_sample,
            passed,
        }
    }
}

/// Print the banner the teacher's QA tool used for decode verification, adapted to report
/// resample drift instead of a reference-decoder sample diff.
pub fn print_banner(report: &RunReport) {
    println!();
    println!("Test Results");
    println!("============");
    println!("{:>20}: {}", "Method", report.method);
    println!("{:>20}: {} Hz -> {} Hz", "Rate", report.rate_in, report.rate_out);
    println!("{:>20}: {} ch -> {} ch", "Channels", report.channels_in, report.channels_out);
    println!("{:>20}: {}", "Input frames", report.in_frames);
    println!("{:>20}: {}", "Output frames", report.out_frames);
    println!("{:>20}: {}", "Expected frames", report.expected_out_frames);
    println!("{:>20}: {}", "Drift (frames)", report.drift_frames);
    println!("{:>20}: {:.6}", "Peak abs sample", report.peak_abs_sample);
    println!();
    if report.passed {
        println!("PASSED");
    }
    else {
        println!("FAILED");
    }
}
