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

use nordpeak_types::{DayPrices, PeakSlot, PriceSlot};
use tracing::info;

/// Highest-priced slot at or above `threshold`.
///
/// Ties go to the earliest slot. Returns `None` when no slot qualifies.
#[must_use]
pub fn find_peak(prices: &DayPrices, threshold: f64) -> Option<PeakSlot> {
    if prices.is_empty() {
        info!("No price slots for {}", prices.date);
        return None;
    }

    let mut best: Option<&PriceSlot> = None;
    for slot in prices.slots.iter().filter(|s| s.price >= threshold) {
        match best {
            Some(current) if slot.price <= current.price => {}
            _ => best = Some(slot),
        }
    }

    let Some(slot) = best else {
        info!("No slots above €{threshold} threshold");
        return None;
    };

    let peak = PeakSlot::from_slot(prices.date, slot);
    info!(
        "Peak slot: {}–{} at €{:.2}/MWh",
        peak.start.format("%H:%M"),
        peak.end.format("%H:%M"),
        peak.price
    );
    Some(peak)
}
