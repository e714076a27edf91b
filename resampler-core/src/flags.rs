// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction-time flag bits (§6).

use bitflags::bitflags;

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct Flags: u32 {
        /// The input and/or output rate may change after construction via `set_input_rate`/
        /// `set_output_rate`. Forces `copy` to be rejected by the fix-up rules (a plain blit
        /// cannot track a moving rate).
        const VARIABLE_RATE = 1 << 0;
        /// Skip the remix algorithm entirely: build an identity matrix on the leading
        /// `min(Ni, No)` square.
        const NO_REMAP = 1 << 1;
        /// Only connect channels whose positions are exactly equal; never fall back to
        /// region-based averaging or fan-in.
        const NO_REMIX = 1 << 2;
        /// Never synthesize or distribute LFE content.
        const NO_LFE = 1 << 3;
    }
}
