//! Scan cycle orchestration
//!
//! Fetches fan out across instruments with bounded concurrency and a
//! per-fetch timeout. Everything that mutates shared state (trade book,
//! alert book) runs afterwards, sequentially, on the runner's own task.

use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ScreenerConfig;
use crate::error::ScanError;
use crate::notify::Notifier;
use crate::providers::{FetchRequest, Lookback, MarketDataProvider, ProviderError};
use crate::report;
use crate::signal_core::{
    has_high_relative_volume, latest_session, scan_symbol, AlertBook, AlertEvent, Bar, ScanResult, TradeBook,
};
use crate::types::Market;

/// Instrument left out of a cycle and why
#[derive(Debug, Clone, Serialize)]
pub struct SkippedInstrument {
    pub symbol: String,
    pub reason: String,
}

/// Output of one scan cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub market: Market,
    pub started_at: DateTime<Utc>,
    pub results: Vec<ScanResult>,
    pub alerts: Vec<AlertEvent>,
    pub skipped: Vec<SkippedInstrument>,
    pub open_positions: usize,
}

/// Owns the cross-cycle state for one market and drives scan cycles
pub struct Screener {
    market: Market,
    config: ScreenerConfig,
    provider: Arc<dyn MarketDataProvider>,
    notifier: Arc<dyn Notifier>,
    trade_book: TradeBook,
    alerts: AlertBook,
    session_date: Option<NaiveDate>,
    deliveries: JoinSet<()>,
}

impl Screener {
    pub fn new(
        market: Market,
        config: ScreenerConfig,
        provider: Arc<dyn MarketDataProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let alerts = AlertBook::new(config.alert_extension_pct);
        Self {
            market,
            config,
            provider,
            notifier,
            trade_book: TradeBook::new(),
            alerts,
            session_date: None,
            deliveries: JoinSet::new(),
        }
    }

    pub fn market(&self) -> Market {
        self.market
    }

    pub fn trade_book(&self) -> &TradeBook {
        &self.trade_book
    }

    pub fn alert_book(&self) -> &AlertBook {
        &self.alerts
    }

    /// Run one full cycle over the market's universe
    pub async fn run_cycle(&mut self) -> CycleReport {
        let started_at = Utc::now();
        self.roll_session(started_at);

        let symbols = self.config.universe.symbols(self.market).to_vec();
        let fetched = self.fetch_all(&symbols).await;

        let mut results = Vec::with_capacity(fetched.len());
        let mut skipped = Vec::new();

        for (symbol, outcome) in fetched {
            let bars = match outcome {
                Ok(Some(bars)) => bars,
                Ok(None) => {
                    debug!("{} filtered out: low relative volume", symbol);
                    skipped.push(SkippedInstrument {
                        symbol,
                        reason: "low relative volume".to_string(),
                    });
                    continue;
                }
                Err(e) => {
                    log_skip(&symbol, &e);
                    skipped.push(SkippedInstrument {
                        symbol,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match scan_symbol(&symbol, self.market, &bars, &mut self.trade_book, &self.config) {
                Ok(result) => results.push(result),
                Err(e) => {
                    log_skip(&symbol, &e);
                    skipped.push(SkippedInstrument {
                        symbol,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let alerts = self.alerts.process(&results);
        self.reap_deliveries();
        self.dispatch(&alerts);

        info!(
            "{} cycle: {} results, {} skipped, {} alerts, {} open positions",
            self.market,
            results.len(),
            skipped.len(),
            alerts.len(),
            self.trade_book.len()
        );

        CycleReport {
            market: self.market,
            started_at,
            results,
            alerts,
            skipped,
            open_positions: self.trade_book.len(),
        }
    }

    /// Refresh on a fixed interval until Ctrl-C. When `csv` is set, each
    /// cycle's batch overwrites that file.
    pub async fn watch(self, csv: Option<PathBuf>) -> anyhow::Result<()> {
        self.watch_until(csv, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Ctrl-C handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Refresh loop that stops when `shutdown` resolves, including in the
    /// middle of a cycle
    pub async fn watch_until<F>(mut self, csv: Option<PathBuf>, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.config.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Watching {} ({} symbols) every {:?}",
            self.market,
            self.config.universe.symbols(self.market).len(),
            self.config.refresh_interval
        );

        tokio::pin!(shutdown);

        // A cycle only awaits during the fetch stage, so dropping it on
        // shutdown never leaves the trade book half updated
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            let cycle = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                cycle = self.run_cycle() => cycle,
            };

            report::log_report(&cycle);
            if let Some(path) = &csv {
                if let Err(e) = report::write_csv_file(path, &cycle) {
                    warn!("Failed to write {}: {:#}", path.display(), e);
                }
            }
        }

        info!("Shutting down, {} open positions discarded", self.trade_book.len());
        self.flush_deliveries(self.config.fetch_timeout).await;
        Ok(())
    }

    /// Clear alert state when the exchange date changes, if configured
    fn roll_session(&mut self, now: DateTime<Utc>) {
        if !self.config.reset_alerts_on_new_session {
            return;
        }
        let today = now.with_timezone(&self.config.exchange_tz).date_naive();
        if self.session_date.is_some_and(|d| d != today) {
            info!("New session {}, clearing alert state", today);
            self.alerts.clear();
        }
        self.session_date = Some(today);
    }

    /// Fetch every symbol concurrently, returned in universe order
    async fn fetch_all(&self, symbols: &[String]) -> Vec<(String, Result<Option<Vec<Bar>>, ScanError>)> {
        let mut fetched: Vec<(usize, String, Result<Option<Vec<Bar>>, ScanError>)> =
            stream::iter(symbols.iter().cloned().enumerate())
                .map(|(idx, symbol)| async move {
                    let outcome = self.fetch_symbol(&symbol).await;
                    (idx, symbol, outcome)
                })
                .buffer_unordered(self.config.concurrency.max(1))
                .collect()
                .await;

        fetched.sort_by_key(|(idx, _, _)| *idx);
        fetched
            .into_iter()
            .map(|(_, symbol, outcome)| (symbol, outcome))
            .collect()
    }

    /// `Ok(None)` means the stocks relative-volume filter rejected the symbol
    async fn fetch_symbol(&self, symbol: &str) -> Result<Option<Vec<Bar>>, ScanError> {
        let tz = self.config.exchange_tz;

        match self.market {
            Market::Commodities => {
                let lookback = Lookback::Bars(self.config.commodity_bar_count);
                Ok(Some(self.fetch_bounded(symbol, lookback).await?))
            }
            Market::Index => {
                let bars = self.fetch_bounded(symbol, Lookback::Days(1)).await?;
                Ok(Some(latest_session(&bars, tz).to_vec()))
            }
            Market::Stocks => {
                let lookback = Lookback::Days(self.config.relative_volume.lookback_days);
                let bars = self.fetch_bounded(symbol, lookback).await?;
                if !has_high_relative_volume(&bars, tz, &self.config.relative_volume) {
                    return Ok(None);
                }
                Ok(Some(latest_session(&bars, tz).to_vec()))
            }
        }
    }

    async fn fetch_bounded(&self, symbol: &str, lookback: Lookback) -> Result<Vec<Bar>, ProviderError> {
        let request = FetchRequest::new(symbol, self.config.interval, lookback);
        let timeout = self.config.fetch_timeout;

        match tokio::time::timeout(timeout, self.provider.fetch(&request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(timeout)),
        }
    }

    /// Wait up to `limit` for alert deliveries still in flight, then abort
    /// the rest. Returns how many were abandoned.
    pub async fn flush_deliveries(&mut self, limit: Duration) -> usize {
        let drained = tokio::time::timeout(limit, async {
            while self.deliveries.join_next().await.is_some() {}
        })
        .await;

        if drained.is_ok() {
            return 0;
        }
        let abandoned = self.deliveries.len();
        warn!("Abandoning {} undelivered alerts", abandoned);
        self.deliveries.abort_all();
        abandoned
    }

    fn reap_deliveries(&mut self) {
        while self.deliveries.try_join_next().is_some() {}
    }

    /// Delivery runs on background tasks; failures are logged only
    fn dispatch(&mut self, events: &[AlertEvent]) {
        for event in events {
            let notifier = Arc::clone(&self.notifier);
            let message = event.message.clone();
            let kind = event.kind;
            self.deliveries.spawn(async move {
                if let Err(e) = notifier.notify(&message).await {
                    warn!("Failed to deliver {} alert: {}", kind, e);
                }
            });
        }
    }
}

fn log_skip(symbol: &str, err: &ScanError) {
    if err.is_data_shortfall() {
        debug!("{} skipped: {}", symbol, err);
    } else {
        warn!("{} skipped: {}", symbol, err);
    }
}
