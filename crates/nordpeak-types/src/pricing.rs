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

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// One 15-minute delivery slot, in local wall-clock time of the configured zone.
///
/// Field names follow the CSV header written to the saves folder
/// (`StartTime,EndTime,Price`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSlot {
    #[serde(rename = "StartTime", with = "hhmm")]
    pub start: NaiveTime,
    #[serde(rename = "EndTime", with = "hhmm")]
    pub end: NaiveTime,
    /// Price per MWh in the configured currency
    #[serde(rename = "Price")]
    pub price: f64,
}

impl PriceSlot {
    #[must_use]
    pub fn new(start: NaiveTime, end: NaiveTime, price: f64) -> Self {
        Self { start, end, price }
    }
}

/// All price slots published for one delivery date and area
#[derive(Debug, Clone, PartialEq)]
pub struct DayPrices {
    pub date: NaiveDate,
    pub area: String,
    pub slots: Vec<PriceSlot>,
}

impl DayPrices {
    #[must_use]
    pub fn new(date: NaiveDate, area: impl Into<String>, slots: Vec<PriceSlot>) -> Self {
        Self {
            date,
            area: area.into(),
            slots,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// The slot selected for discharge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakSlot {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub price: f64,
}

impl PeakSlot {
    #[must_use]
    pub fn from_slot(date: NaiveDate, slot: &PriceSlot) -> Self {
        Self {
            date,
            start: slot.start,
            end: slot.end,
            price: slot.price,
        }
    }

    /// Revenue estimate for discharging `power_kw` for `duration_min` at this price.
    ///
    /// Price is per MWh, so the result is in the price currency.
    #[must_use]
    pub fn estimated_gain(&self, duration_min: u16, power_kw: f64) -> f64 {
        self.price * (f64::from(duration_min) / 60.0) * power_kw / 1000.0
    }
}

/// Round a price to two decimals (cents per MWh)
#[must_use]
pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(raw.trim(), FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_round_price() {
        assert!((round_price(84.946) - 84.95).abs() < f64::EPSILON);
        assert!((round_price(-3.004) - -3.0).abs() < f64::EPSILON);
        assert!((round_price(120.0) - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_day_length() {
        let day = DayPrices::new(
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            "LV",
            vec![
                PriceSlot::new(t(0, 0), t(0, 15), 10.0),
                PriceSlot::new(t(0, 15), t(0, 30), 30.0),
                PriceSlot::new(t(0, 30), t(0, 45), 20.0),
            ],
        );
        assert_eq!(day.len(), 3);
        assert!(!day.is_empty());
        assert!(DayPrices::new(day.date, "LV", Vec::new()).is_empty());
    }

    #[test]
    fn test_estimated_gain_at_100kw() {
        let peak = PeakSlot {
            date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            start: t(18, 0),
            end: t(18, 15),
            price: 200.0,
        };
        // 200 EUR/MWh * 0.25 h * 0.1 MW
        assert!((peak.estimated_gain(15, 100.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_csv_layout() {
        let slots = vec![
            PriceSlot::new(t(1, 0), t(1, 15), 84.95),
            PriceSlot::new(t(1, 15), t(1, 30), 90.1),
        ];
        let mut writer = csv::Writer::from_writer(Vec::new());
        for slot in &slots {
            writer.serialize(slot).unwrap();
        }
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(
            text,
            "StartTime,EndTime,Price\n01:00,01:15,84.95\n01:15,01:30,90.1\n"
        );

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let parsed: Vec<PriceSlot> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(parsed, slots);
    }

    #[test]
    fn test_csv_rejects_bad_time() {
        let text = "StartTime,EndTime,Price\n25:00,01:15,1.0\n";
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let parsed: Result<Vec<PriceSlot>, _> = reader.deserialize().collect();
        assert!(parsed.is_err());
    }
}
