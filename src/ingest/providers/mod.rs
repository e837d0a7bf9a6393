// src/ingest/providers/mod.rs
pub mod btmc;
pub mod phu_quy;

use anyhow::{Context, Result};
use metrics::histogram;
use reqwest::{header::ACCEPT, Client};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::TrackerConfig;
use crate::ingest::types::{QuoteProvider, SharedProviders};

use btmc::BtmcProvider;
use phu_quy::PhuQuyProvider;

const PHU_QUY_FIXTURE: &str = include_str!("../../../tests/fixtures/phu_quy.json");
const BTMC_FIXTURE: &str = include_str!("../../../tests/fixtures/btmc.json");

/// Where a provider gets its raw JSON payload from.
pub(crate) enum Mode {
    Fixture(Value),
    Http { url: String, client: Client },
}

impl Mode {
    pub(crate) async fn load(&self, provider: &'static str) -> Result<Value> {
        match self {
            Mode::Fixture(v) => Ok(v.clone()),
            Mode::Http { url, client } => {
                let t0 = Instant::now();
                let resp = client
                    .get(url)
                    .header(ACCEPT, "application/json, text/plain, */*")
                    .send()
                    .await
                    .with_context(|| format!("{provider} http get()"))?
                    .error_for_status()
                    .with_context(|| format!("{provider} http status"))?;
                let body: Value = resp
                    .json()
                    .await
                    .with_context(|| format!("{provider} http .json()"))?;
                let ms = t0.elapsed().as_secs_f64() * 1_000.0;
                histogram!("ingest_fetch_ms", "source" => provider).record(ms);
                Ok(body)
            }
        }
    }
}

/// HTTP client with the browser-like user agent both vendors expect.
pub fn http_client(user_agent: &str, timeout: Duration) -> Client {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Build both vendor providers from config. In mock mode they replay the
/// bundled sample payloads instead of calling the vendors.
pub fn build_providers(cfg: &TrackerConfig) -> Result<SharedProviders> {
    let providers: Vec<Box<dyn QuoteProvider>> = if cfg.mock_mode {
        tracing::info!("mock mode: serving bundled vendor payloads");
        vec![
            Box::new(PhuQuyProvider::from_fixture_str(PHU_QUY_FIXTURE)?),
            Box::new(BtmcProvider::from_fixture_str(BTMC_FIXTURE)?),
        ]
    } else {
        let client = http_client(&cfg.user_agent, cfg.request_timeout());
        vec![
            Box::new(PhuQuyProvider::from_url(&cfg.phu_quy_url, client.clone())),
            Box::new(BtmcProvider::from_url(&cfg.btmc_url, client)),
        ]
    };
    Ok(Arc::new(providers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_mode_builds_both_vendors_from_bundled_payloads() {
        let cfg = TrackerConfig {
            mock_mode: true,
            ..TrackerConfig::default()
        };
        let providers = build_providers(&cfg).unwrap();
        assert_eq!(providers.len(), 2);
        for p in providers.iter() {
            let set = p.fetch_latest().await.unwrap().expect("bundled payload parses");
            assert!(set.gold.is_some(), "{} gold missing", p.name());
            assert!(set.sjc.is_some(), "{} sjc missing", p.name());
            assert!(set.silver.is_some(), "{} silver missing", p.name());
        }
    }
}
