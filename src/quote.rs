//! # Canonical Quote Model
//! Shared target shape for both vendor adapters and the persisted snapshot row.
//!
//! All prices are expressed in chỉ (1/10 tael). A product missing from a
//! vendor payload is `None` in the [`CanonicalQuoteSet`], which is different
//! from a quote that is present with a zero price.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of chỉ in one tael (lượng).
pub const CHI_PER_TAEL: f64 = 10.0;

/// Convert a per-tael price into the per-chỉ display/storage unit.
pub fn tael_to_chi(price_per_tael: f64) -> f64 {
    price_per_tael / CHI_PER_TAEL
}

/// Vendor the quote came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Vendor A: array-of-objects payload with per-tael prices.
    PhuQuy,
    /// Vendor B: flat row table with index-suffixed field names.
    Btmc,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::PhuQuy, Source::Btmc];

    /// Name shown on the dashboard.
    pub fn label(self) -> &'static str {
        match self {
            Source::PhuQuy => "Phú Quý",
            Source::Btmc => "BTMC",
        }
    }

    /// Stable identifier used in logs and metric labels.
    pub fn id(self) -> &'static str {
        match self {
            Source::PhuQuy => "phu_quy",
            Source::Btmc => "btmc",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Instrument tracked by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    Gold999,
    Sjc,
    Silver,
}

impl Product {
    pub const ALL: [Product; 3] = [Product::Gold999, Product::Sjc, Product::Silver];

    pub fn label(self) -> &'static str {
        match self {
            Product::Gold999 => "Vàng 999.9",
            Product::Sjc => "SJC",
            Product::Silver => "Bạc",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One buy/sell quote in chỉ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalQuote {
    pub buy: f64,
    pub sell: f64,
    pub change_percent: Option<f64>,
}

impl CanonicalQuote {
    pub fn new(buy: f64, sell: f64, change_percent: Option<f64>) -> Self {
        Self {
            buy,
            sell,
            change_percent,
        }
    }

    /// Both prices are real numbers (malformed vendor strings yield NaN).
    pub fn is_finite(&self) -> bool {
        self.buy.is_finite() && self.sell.is_finite()
    }
}

/// Everything one vendor reported in one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalQuoteSet {
    pub gold: Option<CanonicalQuote>,
    pub sjc: Option<CanonicalQuote>,
    pub silver: Option<CanonicalQuote>,
}

impl CanonicalQuoteSet {
    pub fn get(&self, product: Product) -> Option<&CanonicalQuote> {
        match product {
            Product::Gold999 => self.gold.as_ref(),
            Product::Sjc => self.sjc.as_ref(),
            Product::Silver => self.silver.as_ref(),
        }
    }

    /// Present products in fixed order: gold, SJC, silver.
    pub fn present(&self) -> impl Iterator<Item = (Product, &CanonicalQuote)> + '_ {
        Product::ALL
            .into_iter()
            .filter_map(move |p| self.get(p).map(|q| (p, q)))
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}

/// Durable projection of one (source, product) quote at poll time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshotRecord {
    pub timestamp: DateTime<Utc>,
    pub source: Source,
    pub product: Product,
    pub buy_price: f64,
    pub sell_price: f64,
    pub change_percent: Option<f64>,
}

impl PriceSnapshotRecord {
    pub fn from_quote(
        timestamp: DateTime<Utc>,
        source: Source,
        product: Product,
        quote: &CanonicalQuote,
    ) -> Self {
        Self {
            timestamp,
            source,
            product,
            buy_price: quote.buy,
            sell_price: quote.sell,
            change_percent: quote.change_percent,
        }
    }
}
