//! Presentation helpers for a cycle's result batch

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::runner::CycleReport;
use crate::signal_core::ScanResult;
use crate::types::Market;

/// Batch split into the three presentation groups
#[derive(Debug, Default)]
pub struct Partition<'a> {
    /// Fresh confirmations and held positions
    pub confirmed: Vec<&'a ScanResult>,
    pub setup_forming: Vec<&'a ScanResult>,
    pub other: Vec<&'a ScanResult>,
}

pub fn partition(results: &[ScanResult]) -> Partition<'_> {
    let mut groups = Partition::default();
    for result in results {
        if result.state.is_active() {
            groups.confirmed.push(result);
        } else if result.state.is_setup_forming() {
            groups.setup_forming.push(result);
        } else {
            groups.other.push(result);
        }
    }
    groups
}

fn headers(market: Market) -> Vec<&'static str> {
    let mut headers = vec!["Symbol", "Trade State", "Price", "VWAP", "Distance %", "Volume Ratio"];
    if market.supports_option_bias() {
        headers.push("Option Bias");
    }
    headers
}

fn row(result: &ScanResult, market: Market) -> Vec<String> {
    let mut row = vec![
        result.symbol.clone(),
        result.state.to_string(),
        format!("{:.2}", result.price),
        format!("{:.2}", result.vwap),
        format!("{:.2}", result.distance_pct),
        format!("{:.2}", result.volume_ratio),
    ];
    if market.supports_option_bias() {
        row.push(result.option_bias.as_ref().map(|o| o.to_string()).unwrap_or_default());
    }
    row
}

/// Write the batch as CSV; the Option Bias column only exists for index and stocks
pub fn write_csv<W: Write>(writer: W, report: &CycleReport) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(headers(report.market))?;
    for result in &report.results {
        csv.write_record(row(result, report.market))?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_csv_file(path: &Path, report: &CycleReport) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv(file, report)
}

/// Plain-text table grouped by partition, for terminal output
pub fn render_table(report: &CycleReport) -> String {
    let groups = partition(&report.results);
    let mut out = String::new();

    let sections = [
        ("CONFIRMED", &groups.confirmed),
        ("SETUP FORMING", &groups.setup_forming),
        ("OTHER", &groups.other),
    ];

    let header = headers(report.market).join(" | ");
    for (title, rows) in sections {
        if rows.is_empty() {
            continue;
        }
        let _ = writeln!(out, "== {} ({})", title, rows.len());
        let _ = writeln!(out, "{}", header);
        for result in rows.iter() {
            let _ = writeln!(out, "{}", row(result, report.market).join(" | "));
        }
        out.push('\n');
    }

    if report.results.is_empty() {
        out.push_str("No valid VWAP signals at the moment.\n");
    }
    out
}

pub fn log_report(report: &CycleReport) {
    let groups = partition(&report.results);
    info!(
        "{} @ {}: {} confirmed, {} setup forming, {} other",
        report.market,
        report.started_at.format("%H:%M:%S"),
        groups.confirmed.len(),
        groups.setup_forming.len(),
        groups.other.len()
    );
    for result in groups.confirmed.iter().chain(groups.setup_forming.iter()) {
        info!(
            "  {:<14} {:<32} px {:>10.2} vwap {:>10.2} dist {:>6.2}% vol {:>5.2}",
            result.symbol, result.state.to_string(), result.price, result.vwap, result.distance_pct, result.volume_ratio
        );
    }
    for alert in &report.alerts {
        info!("  alert {} {}", alert.kind, alert.symbol);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_core::{Bias, Health, TradeState, Trigger};
    use crate::types::Side;
    use chrono::Utc;

    fn result(symbol: &str, state: TradeState) -> ScanResult {
        ScanResult {
            symbol: symbol.to_string(),
            market: Market::Index,
            state,
            bias: Bias::Bullish,
            price: 22537.0,
            vwap: 22520.0,
            distance_pct: 0.08,
            volume_ratio: 1.4,
            option_bias: None,
            live: true,
        }
    }

    fn report(market: Market, results: Vec<ScanResult>) -> CycleReport {
        CycleReport {
            market,
            started_at: Utc::now(),
            results,
            alerts: Vec::new(),
            skipped: Vec::new(),
            open_positions: 0,
        }
    }

    #[test]
    fn test_partition() {
        let results = vec![
            result("A", TradeState::Entered { side: Side::Long, trigger: Trigger::Pullback }),
            result("B", TradeState::Holding { side: Side::Short, health: Health::Extended }),
            result("C", TradeState::SetupForming { bias: Bias::Bullish }),
            result("D", TradeState::Avoid),
            result("E", TradeState::Exited { side: Side::Long }),
        ];
        let groups = partition(&results);
        assert_eq!(groups.confirmed.len(), 2);
        assert_eq!(groups.setup_forming.len(), 1);
        assert_eq!(groups.other.len(), 2);
    }

    #[test]
    fn test_csv_option_column_per_market() {
        let index = report(Market::Index, vec![result("^NSEI", TradeState::Wait)]);
        let mut buf = Vec::new();
        write_csv(&mut buf, &index).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Symbol,Trade State,Price,VWAP,Distance %,Volume Ratio,Option Bias"
        );
        assert_eq!(lines.next().unwrap(), "^NSEI,WAIT,22537.00,22520.00,0.08,1.40,");

        let commodities = report(Market::Commodities, vec![result("XAUUSD", TradeState::Avoid)]);
        let mut buf = Vec::new();
        write_csv(&mut buf, &commodities).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(!text.contains("Option Bias"));
    }

    #[test]
    fn test_render_empty() {
        let empty = report(Market::Stocks, Vec::new());
        assert!(render_table(&empty).contains("No valid VWAP signals"));
    }
}
