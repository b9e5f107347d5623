// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of NordPeak.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use chrono::{NaiveTime, Timelike};
use nordpeak_types::SolaxRegisters;

/// Timed discharge programme for the EMS1000
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedDischarge {
    pub start: NaiveTime,
    pub duration_min: u16,
}

impl TimedDischarge {
    #[must_use]
    pub fn new(start: NaiveTime, duration_min: u16) -> Self {
        Self {
            start,
            duration_min,
        }
    }

    /// Register writes in the order the EMS expects them.
    /// The work mode goes last so the schedule is complete when it activates.
    #[must_use]
    pub fn writes(&self, map: &SolaxRegisters) -> [(u16, u16); 4] {
        [
            (map.start_hour, self.start.hour() as u16),
            (map.start_minute, self.start.minute() as u16),
            (map.duration_minutes, self.duration_min),
            (map.work_mode, map.timed_discharge_mode),
        ]
    }
}
