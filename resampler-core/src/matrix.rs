// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The channel remix matrix builder (§4.2) and the scalar routine that applies it to an
//! interleaved work buffer (standing in for the assumed external SIMD remix routine, §1).

use smallvec::SmallVec;

use crate::channels::{Position, Region, Side};
use crate::flags::Flags;
use crate::sample::WorkBuf;

/// 16.16 fixed-point scale used for the quantized matrix (§3 invariant 4, §4.2 step 5).
const FIXED_POINT_SHIFT: u32 = 16;

/// An O×I remix matrix, in both float and 16.16 fixed-point form.
#[derive(Debug, Clone)]
pub struct ChannelMatrix {
    /// Output channel count.
    pub rows: usize,
    /// Input channel count.
    pub cols: usize,
    /// `rows` rows of `cols` float weights each.
    float: Vec<SmallVec<[f32; 8]>>,
    /// Same shape, quantized to 16.16 fixed-point by truncation (floor), matching the reference
    /// implementation's `(int32_t)(val * 0x10000)` cast rather than a rounding conversion (Open
    /// Question 2 — the quantization is truncating by design, not a port bug).
    fixed: Vec<SmallVec<[i32; 8]>>,
    /// Whether this matrix differs from the identity mapping on the leading square (i.e. whether
    /// the pipeline must actually run the remix routine at all).
    pub map_required: bool,
}

impl ChannelMatrix {
    pub fn float_row(&self, o: usize) -> &[f32] {
        &self.float[o]
    }

    pub fn fixed_row(&self, o: usize) -> &[i32] {
        &self.fixed[o]
    }
}

/// Build the remix matrix for the given input/output channel maps and flags (§4.2).
pub fn build(in_map: &[Position], out_map: &[Position], flags: Flags) -> ChannelMatrix {
    let ni = in_map.len();
    let no = out_map.len();
    let mut m = vec![vec![0f32; ni]; no];

    if flags.contains(Flags::NO_REMAP) {
        for k in 0..ni.min(no) {
            m[k][k] = 1.0;
        }
    }
    else if flags.contains(Flags::NO_REMIX) {
        for (o, &ob) in out_map.iter().enumerate() {
            for (i, &ib) in in_map.iter().enumerate() {
                if ob == ib {
                    m[o][i] = 1.0;
                }
            }
        }
    }
    else {
        full_remix(in_map, out_map, flags, &mut m);
    }

    let map_required = !is_identity(&m, ni, no);

    normalize_rows(&mut m);

    let fixed = m
        .iter()
        .map(|row| row.iter().map(|&v| (v * (1 << FIXED_POINT_SHIFT) as f32).floor() as i32).collect())
        .collect();
    let float = m.into_iter().map(SmallVec::from_vec).collect();

    ChannelMatrix { rows: no, cols: ni, float, fixed, map_required }
}

fn is_identity(m: &[Vec<f32>], ni: usize, no: usize) -> bool {
    if ni != no {
        return false;
    }
    for (o, row) in m.iter().enumerate() {
        for (i, &v) in row.iter().enumerate() {
            let expect = if i == o { 1.0 } else { 0.0 };
            if (v - expect).abs() > 1e-9 {
                return false;
            }
        }
    }
    true
}

fn full_remix(in_map: &[Position], out_map: &[Position], flags: Flags, m: &mut [Vec<f32>]) {
    let ni = in_map.len();
    let no = out_map.len();

    let mut out_connected = vec![false; no];
    let mut in_connected = vec![false; ni];

    // Direct connect.
    for (o, &b) in out_map.iter().enumerate() {
        for (i, &a) in in_map.iter().enumerate() {
            if a == b || a == Position::Mono {
                m[o][i] = 1.0;
                out_connected[o] = true;
                in_connected[i] = true;
            }
            else if b == Position::Mono {
                m[o][i] = 1.0 / ni as f32;
                out_connected[o] = true;
                in_connected[i] = true;
            }
        }
    }

    // Per-region fallback for unconnected outputs.
    for (o, &b) in out_map.iter().enumerate() {
        if out_connected[o] {
            continue;
        }
        match b.side() {
            Side::Left => average_side(m, o, in_map, Side::Left),
            Side::Right => average_side(m, o, in_map, Side::Right),
            Side::Center => {
                if !average_side(m, o, in_map, Side::Center) {
                    average_any_of(m, o, in_map, &[Side::Left, Side::Right]);
                }
            }
            Side::Lfe => {
                if !flags.contains(Flags::NO_LFE) {
                    let w = 1.0 / ni as f32;
                    for i in 0..ni {
                        m[o][i] = w;
                    }
                }
            }
            Side::Other => {}
        }
    }

    // Unconnected-input fan-in.
    for side in [Side::Left, Side::Right, Side::Center] {
        let unconnected: Vec<usize> =
            (0..ni).filter(|&i| !in_connected[i] && in_map[i].side() == side).collect();
        if unconnected.is_empty() {
            continue;
        }
        let gain = (1.0 / 9.0) / unconnected.len() as f32;
        for o in 0..no {
            if out_map[o].side() == side {
                for &i in &unconnected {
                    m[o][i] += gain;
                }
            }
        }
    }
    if !flags.contains(Flags::NO_LFE) {
        let unconnected_lfe: Vec<usize> =
            (0..ni).filter(|&i| !in_connected[i] && in_map[i].side() == Side::Lfe).collect();
        if !unconnected_lfe.is_empty() {
            let gain = 0.375 / unconnected_lfe.len() as f32;
            for o in 0..no {
                for &i in &unconnected_lfe {
                    m[o][i] += gain;
                }
            }
        }
    }

    // Center rescue.
    let centers_absorbed = out_map.iter().any(|p| p.side() == Side::Center);
    if !centers_absorbed {
        let unconnected_centers: Vec<usize> =
            (0..ni).filter(|&i| !in_connected[i] && in_map[i].side() == Side::Center).collect();
        if !unconnected_centers.is_empty() {
            center_rescue(m, in_map, out_map, &unconnected_centers);
        }
    }
}

/// Average all inputs with the given `side` into output row `o`, weight `1/count`. Returns
/// `false` (leaving the row untouched) if there are no such inputs.
fn average_side(m: &mut [Vec<f32>], o: usize, in_map: &[Position], side: Side) -> bool {
    let inputs: Vec<usize> = (0..in_map.len()).filter(|&i| in_map[i].side() == side).collect();
    if inputs.is_empty() {
        return false;
    }
    let w = 1.0 / inputs.len() as f32;
    for i in inputs {
        m[o][i] = w;
    }
    true
}

fn average_any_of(m: &mut [Vec<f32>], o: usize, in_map: &[Position], sides: &[Side]) -> bool {
    let inputs: Vec<usize> =
        (0..in_map.len()).filter(|&i| sides.contains(&in_map[i].side())).collect();
    if inputs.is_empty() {
        return false;
    }
    let w = 1.0 / inputs.len() as f32;
    for i in inputs {
        m[o][i] = w;
    }
    true
}

/// Distribute unconnected center inputs into L/R outputs (§4.2 "center rescue"). For each source,
/// `found_frs` records whether any L/R destination shares its front/rear/side region; a source
/// with a region match only rescues into same-region destinations, one without a match rescues
/// into every L/R destination. The `0.5` budget is then split per destination — `ncenter[oc]`, the
/// count of sources that actually rescue into that destination — not per source group, so the same
/// source can carry a different gain at two destinations whose `ncenter` counts differ.
fn center_rescue(
    m: &mut [Vec<f32>],
    in_map: &[Position],
    out_map: &[Position],
    unconnected_centers: &[usize],
) {
    let lr_outputs: Vec<usize> =
        (0..out_map.len()).filter(|&o| matches!(out_map[o].side(), Side::Left | Side::Right)).collect();
    if lr_outputs.is_empty() {
        return;
    }

    let rescues_into = |ic: usize, found_frs: bool, oc: usize| -> bool {
        !found_frs || in_map[ic].region() == out_map[oc].region()
    };

    let found_frs: Vec<bool> = unconnected_centers
        .iter()
        .map(|&ic| lr_outputs.iter().any(|&oc| in_map[ic].region() == out_map[oc].region()))
        .collect();

    let mut ncenter = vec![0usize; out_map.len()];
    for &oc in &lr_outputs {
        ncenter[oc] = unconnected_centers
            .iter()
            .zip(found_frs.iter())
            .filter(|&(&ic, &frs)| rescues_into(ic, frs, oc))
            .count();
    }

    for &oc in &lr_outputs {
        if ncenter[oc] == 0 {
            continue;
        }
        let gain = 0.5 / ncenter[oc] as f32;
        for (&ic, &frs) in unconnected_centers.iter().zip(found_frs.iter()) {
            if rescues_into(ic, frs, oc) {
                m[oc][ic] += gain;
            }
        }
    }
}

fn normalize_rows(m: &mut [Vec<f32>]) {
    for row in m.iter_mut() {
        let sum: f32 = row.iter().sum();
        if sum > 1.0 {
            for v in row.iter_mut() {
                *v /= sum;
            }
        }
    }
}

/// Apply the matrix to one frame's worth of input samples, writing one frame of output. Both
/// slices hold exactly `cols`/`rows` samples respectively (one frame, not a whole buffer).
fn apply_frame_f32(matrix: &ChannelMatrix, input: &[f32], output: &mut [f32]) {
    for o in 0..matrix.rows {
        let row = matrix.float_row(o);
        let mut acc = 0f32;
        for (i, &coeff) in row.iter().enumerate() {
            acc += coeff * input[i];
        }
        output[o] = acc;
    }
}

fn apply_frame_s16(matrix: &ChannelMatrix, input: &[i16], output: &mut [i16]) {
    for o in 0..matrix.rows {
        let row = matrix.fixed_row(o);
        let mut acc: i64 = 0;
        for (i, &coeff) in row.iter().enumerate() {
            acc += i64::from(coeff) * i64::from(input[i]);
        }
        output[o] = (acc >> FIXED_POINT_SHIFT).clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16;
    }
}

/// Remix a whole interleaved work buffer of `n_frames` frames through `matrix`. Stands in for the
/// assumed external SIMD-or-scalar remix routine (§1); this is the scalar fallback path such a
/// routine would use when no vectorized kernel is available for the current channel counts.
pub fn remix(matrix: &ChannelMatrix, input: &WorkBuf, n_frames: usize) -> WorkBuf {
    match input {
        WorkBuf::F32(samples) => {
            let mut out = vec![0f32; n_frames * matrix.rows];
            for f in 0..n_frames {
                let in_frame = &samples[f * matrix.cols..(f + 1) * matrix.cols];
                let out_frame = &mut out[f * matrix.rows..(f + 1) * matrix.rows];
                apply_frame_f32(matrix, in_frame, out_frame);
            }
            WorkBuf::F32(out)
        }
        WorkBuf::S16(samples) => {
            let mut out = vec![0i16; n_frames * matrix.rows];
            for f in 0..n_frames {
                let in_frame = &samples[f * matrix.cols..(f + 1) * matrix.cols];
                let out_frame = &mut out[f * matrix.rows..(f + 1) * matrix.rows];
                apply_frame_s16(matrix, in_frame, out_frame);
            }
            WorkBuf::S16(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ChannelMap;

    fn map(positions: &[Position]) -> ChannelMap {
        positions.iter().copied().collect()
    }

    #[test]
    fn scenario_a_stereo_to_mono() {
        let i = map(&[Position::FrontLeft, Position::FrontRight]);
        let o = map(&[Position::Mono]);
        let mat = build(&i, &o, Flags::empty());
        assert_eq!(mat.float_row(0), &[0.5, 0.5]);
    }

    #[test]
    fn scenario_b_mono_to_stereo() {
        let i = map(&[Position::Mono]);
        let o = map(&[Position::FrontLeft, Position::FrontRight]);
        let mat = build(&i, &o, Flags::empty());
        assert_eq!(mat.float_row(0), &[1.0]);
        assert_eq!(mat.float_row(1), &[1.0]);
    }

    #[test]
    fn scenario_c_5point1_to_stereo() {
        let i = map(&[
            Position::FrontLeft,
            Position::FrontRight,
            Position::FrontCenter,
            Position::Lfe,
            Position::RearLeft,
            Position::RearRight,
        ]);
        let o = map(&[Position::FrontLeft, Position::FrontRight]);
        let mat = build(&i, &o, Flags::empty());

        let s = 1.0 + 0.5 + 0.375 + 1.0 / 9.0;
        let fl_expected = [1.0 / s, 0.0, 0.5 / s, 0.375 / s, (1.0 / 9.0) / s, 0.0];
        let row = mat.float_row(0);
        for (got, want) in row.iter().zip(fl_expected.iter()) {
            assert!((got - want).abs() < 1e-4, "{} vs {}", got, want);
        }

        let row_sum: f32 = mat.float_row(0).iter().sum();
        assert!(row_sum <= 1.0 + 1e-6);
    }

    #[test]
    fn scenario_d_no_remix_identity() {
        let i = map(&[Position::FrontLeft, Position::FrontRight]);
        let o = map(&[Position::FrontLeft, Position::FrontRight]);
        let mat = build(&i, &o, Flags::NO_REMIX);
        assert_eq!(mat.float_row(0), &[1.0, 0.0]);
        assert_eq!(mat.float_row(1), &[0.0, 1.0]);
    }

    #[test]
    fn scenario_e_quad_to_5point1() {
        let i = map(&[
            Position::FrontLeft,
            Position::FrontRight,
            Position::RearLeft,
            Position::RearRight,
        ]);
        let o = map(&[
            Position::FrontLeft,
            Position::FrontRight,
            Position::FrontCenter,
            Position::Lfe,
            Position::RearLeft,
            Position::RearRight,
        ]);
        let mat = build(&i, &o, Flags::empty());

        assert_eq!(mat.float_row(0)[0], 1.0);
        assert_eq!(mat.float_row(1)[1], 1.0);
        assert_eq!(mat.float_row(4)[2], 1.0);
        assert_eq!(mat.float_row(5)[3], 1.0);

        let fc = mat.float_row(2);
        assert_eq!(fc, &[0.5, 0.5, 0.0, 0.0]);

        let lfe = mat.float_row(3);
        assert_eq!(lfe, &[0.25, 0.25, 0.25, 0.25]);
    }

    #[test]
    fn center_rescue_gain_is_computed_per_destination_not_per_source_group() {
        // Two unconnected center inputs (front-center, rear-center) feeding a front+side L/R
        // layout. Front-center has a region match at FL/FR, rear-center has none anywhere, so the
        // two sources must NOT be grouped by identical destination set: front-center only rescues
        // into FL/FR (gain split 2 ways there), while rear-center rescues into all four outputs
        // (gain split 2 ways at FL/FR, but alone — gain 0.5 — at SL/SR).
        let i = map(&[Position::FrontCenter, Position::RearCenter]);
        let o = map(&[
            Position::FrontLeft,
            Position::FrontRight,
            Position::SideLeft,
            Position::SideRight,
        ]);
        let mat = build(&i, &o, Flags::empty());

        assert_eq!(mat.float_row(0), &[0.25, 0.25]); // FL: FC and RC share 0.5
        assert_eq!(mat.float_row(1), &[0.25, 0.25]); // FR: FC and RC share 0.5
        assert_eq!(mat.float_row(2), &[0.0, 0.5]); // SL: only RC rescues here
        assert_eq!(mat.float_row(3), &[0.0, 0.5]); // SR: only RC rescues here
    }

    #[test]
    fn property_row_sums_never_exceed_one() {
        let i = map(&[
            Position::FrontLeft,
            Position::FrontRight,
            Position::FrontCenter,
            Position::Lfe,
            Position::RearLeft,
            Position::RearRight,
            Position::SideLeft,
            Position::SideRight,
        ]);
        let o = map(&[Position::FrontLeft, Position::FrontRight, Position::FrontCenter]);
        let mat = build(&i, &o, Flags::empty());
        for row in 0..mat.rows {
            let sum: f32 = mat.float_row(row).iter().sum();
            assert!(sum <= 1.0 + 1e-6, "row {} sums to {}", row, sum);
        }
    }

    #[test]
    fn fixed_point_matches_float_by_truncation() {
        let i = map(&[Position::FrontLeft, Position::FrontRight]);
        let o = map(&[Position::Mono]);
        let mat = build(&i, &o, Flags::empty());
        for (f, fx) in mat.float_row(0).iter().zip(mat.fixed_row(0).iter()) {
            assert_eq!(*fx, (f * 65536.0).floor() as i32);
        }
    }
}
