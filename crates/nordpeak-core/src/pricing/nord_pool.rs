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

//! Nord Pool data portal client.
//!
//! The portal publishes day-ahead results around 13:00 CET. Before that the
//! `DayAheadPrices` endpoint answers 204, or 200 with no entries, which the
//! client reports as `Ok(None)`.

use crate::error::{PricingError, PricingResult};
use crate::traits::PriceSource;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use nordpeak_types::{DayPrices, FetcherConfig, PriceSlot, round_price};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

const USER_AGENT: &str = concat!("nordpeak/", env!("CARGO_PKG_VERSION"));
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DayAheadResponse {
    #[serde(default)]
    multi_area_entries: Option<Vec<MultiAreaEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MultiAreaEntry {
    delivery_start: DateTime<Utc>,
    delivery_end: DateTime<Utc>,
    #[serde(default)]
    entry_per_area: HashMap<String, Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct NordPoolClient {
    client: Client,
    base_url: String,
    delivery_area: String,
    currency: String,
    tz: Tz,
}

impl NordPoolClient {
    pub fn new(config: &FetcherConfig) -> PricingResult<Self> {
        let tz: Tz = config
            .timezone
            .parse()
            .map_err(|e| PricingError::Config(format!("unknown timezone '{}': {e}", config.timezone)))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            delivery_area: config.delivery_area.clone(),
            currency: config.currency.clone(),
            tz,
        })
    }

    /// Fetch and convert all slots for `date`
    pub async fn fetch_day_prices(&self, date: NaiveDate) -> PricingResult<Option<DayPrices>> {
        let url = format!("{}/api/DayAheadPrices", self.base_url);
        let date_str = date.format("%Y-%m-%d").to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("date", date_str.as_str()),
                ("market", "DayAhead"),
                ("deliveryArea", self.delivery_area.as_str()),
                ("currency", self.currency.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        info!("Fetch for {date}: status {}", status.as_u16());

        if status == StatusCode::NO_CONTENT {
            info!("204 No Content for {date} (pre-auction)");
            return Ok(None);
        }

        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_owned());
            let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            warn!("API error: {body}");
            return Err(PricingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: DayAheadResponse = serde_json::from_str(&body)
            .map_err(|e| PricingError::InvalidResponse(e.to_string()))?;

        let Some(entries) = parsed.multi_area_entries.filter(|e| !e.is_empty()) else {
            info!("No multiAreaEntries for {date}");
            return Ok(None);
        };

        let prices = self.convert(date, entries);
        info!(
            "Success: Fetched {} 15-min slots for {date} ({} times)",
            prices.len(),
            self.tz.name()
        );
        Ok(Some(prices))
    }

    fn convert(&self, date: NaiveDate, mut entries: Vec<MultiAreaEntry>) -> DayPrices {
        entries.sort_by_key(|e| e.delivery_start);

        let slots = entries
            .into_iter()
            .map(|entry| {
                let price = match entry.entry_per_area.get(&self.delivery_area).copied().flatten() {
                    Some(price) => round_price(price),
                    None => {
                        warn!(
                            "No {} price for slot starting {}, using 0",
                            self.delivery_area, entry.delivery_start
                        );
                        0.0
                    }
                };
                PriceSlot::new(
                    entry.delivery_start.with_timezone(&self.tz).time(),
                    entry.delivery_end.with_timezone(&self.tz).time(),
                    price,
                )
            })
            .collect();

        DayPrices::new(date, self.delivery_area.clone(), slots)
    }
}

#[async_trait]
impl PriceSource for NordPoolClient {
    async fn fetch_day(&self, date: NaiveDate) -> anyhow::Result<Option<DayPrices>> {
        Ok(self.fetch_day_prices(date).await?)
    }

    fn name(&self) -> &str {
        "Nord Pool"
    }
}
