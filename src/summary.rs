//! Per-miner summary statistics and currency conversion.
//!
//! Bids are quoted in a unit worth two satoshis, so sums and means are
//! doubled into satoshi terms before any pricing. Display-currency
//! conversion uses two externally supplied rates and refuses to divide by
//! a rate that is zero, negative, or not finite.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::highlight::HighlightedBid;
use crate::reshape::BidRecord;

/// Satoshis per bid unit.
pub const SATS_PER_BID_UNIT: f64 = 2.0;

/// Anything that looks like one long-form bid row.
///
/// Both the value-indicated long form (`BidRecord`) and the
/// highlight-indicated one (`HighlightedBid`) summarize the same way; the
/// only difference is whether a winner flag is recoverable.
pub trait BidObservation {
    fn miner_id(&self) -> Option<&str>;
    fn bid_amount(&self) -> Option<f64>;
    fn is_winner(&self) -> Option<bool> {
        None
    }
}

impl BidObservation for BidRecord {
    fn miner_id(&self) -> Option<&str> {
        self.miner_id.as_deref()
    }

    fn bid_amount(&self) -> Option<f64> {
        self.bid_amount
    }
}

impl BidObservation for HighlightedBid {
    fn miner_id(&self) -> Option<&str> {
        Some(&self.miner_id)
    }

    fn bid_amount(&self) -> Option<f64> {
        self.bid_amount
    }

    fn is_winner(&self) -> Option<bool> {
        Some(self.is_winner)
    }
}

/// Aggregate statistics for one miner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinerSummary {
    pub miner_id: String,
    /// Number of blocks this miner placed a bid in.
    pub blocks_bid: usize,
    /// Number of those bids that won; absent when the input carries no
    /// winner information.
    pub blocks_won: Option<usize>,
    /// blocks_won / blocks_bid.
    pub win_rate: Option<f64>,
    pub total_bid: f64,
    pub average_bid: f64,
    pub total_sats: f64,
    pub average_sats: f64,
}

/// Group long-form rows by miner and compute sum/mean of bids.
///
/// Rows without a miner id or without a bid amount carry nothing to
/// aggregate and are skipped. Output is sorted by miner id.
pub fn summarize<T: BidObservation>(bids: &[T]) -> Vec<MinerSummary> {
    struct Acc {
        count: usize,
        sum: f64,
        wins: Option<usize>,
    }

    let mut groups: BTreeMap<String, Acc> = BTreeMap::new();
    for bid in bids {
        let (Some(miner), Some(amount)) = (bid.miner_id(), bid.bid_amount()) else {
            continue;
        };
        let acc = groups.entry(miner.to_string()).or_insert(Acc {
            count: 0,
            sum: 0.0,
            wins: None,
        });
        acc.count += 1;
        acc.sum += amount;
        if let Some(won) = bid.is_winner() {
            *acc.wins.get_or_insert(0) += usize::from(won);
        }
    }

    groups
        .into_iter()
        .map(|(miner_id, acc)| {
            let average = acc.sum / acc.count as f64;
            MinerSummary {
                miner_id,
                blocks_bid: acc.count,
                blocks_won: acc.wins,
                win_rate: acc.wins.map(|w| w as f64 / acc.count as f64),
                total_bid: acc.sum,
                average_bid: average,
                total_sats: acc.sum * SATS_PER_BID_UNIT,
                average_sats: average * SATS_PER_BID_UNIT,
            }
        })
        .collect()
}

/// Validated exchange-rate pair: the display-currency price of the base
/// unit and of one satoshi.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeRates {
    base_rate: f64,
    satoshi_rate: f64,
}

impl ExchangeRates {
    /// Both rates must be positive and finite; anything else would turn
    /// the conversion below into a silent infinity.
    pub fn new(base_rate: f64, satoshi_rate: f64) -> Result<ExchangeRates> {
        for rate in [base_rate, satoshi_rate] {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(Error::InvalidRate(rate));
            }
        }
        Ok(ExchangeRates {
            base_rate,
            satoshi_rate,
        })
    }

    /// Convert a satoshi amount into the display currency.
    pub fn sats_to_display(&self, sats: f64) -> f64 {
        sats / self.satoshi_rate * self.base_rate
    }
}

/// A miner summary priced into the display currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedSummary {
    pub miner_id: String,
    pub blocks_bid: usize,
    pub win_rate: Option<f64>,
    pub total_display: f64,
    pub average_display: f64,
}

/// Price every summary with the given rates.
pub fn price_summaries(summaries: &[MinerSummary], rates: &ExchangeRates) -> Vec<PricedSummary> {
    summaries
        .iter()
        .map(|s| PricedSummary {
            miner_id: s.miner_id.clone(),
            blocks_bid: s.blocks_bid,
            win_rate: s.win_rate,
            total_display: rates.sats_to_display(s.total_sats),
            average_display: rates.sats_to_display(s.average_sats),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(miner: &str, bid: f64, won: bool) -> HighlightedBid {
        HighlightedBid {
            block_height: 0,
            miner_id: miner.to_string(),
            bid_amount: Some(bid),
            is_winner: won,
        }
    }

    #[test]
    fn test_summarize_groups_and_doubles_into_sats() {
        let bids = vec![
            observed("A", 1.0, false),
            observed("A", 3.0, true),
            observed("B", 2.0, false),
        ];
        let summaries = summarize(&bids);
        assert_eq!(summaries.len(), 2);

        let a = &summaries[0];
        assert_eq!(a.miner_id, "A");
        assert_eq!(a.blocks_bid, 2);
        assert_eq!(a.blocks_won, Some(1));
        assert_eq!(a.win_rate, Some(0.5));
        assert_eq!(a.total_bid, 4.0);
        assert_eq!(a.average_bid, 2.0);
        assert_eq!(a.total_sats, 8.0);
        assert_eq!(a.average_sats, 4.0);

        let b = &summaries[1];
        assert_eq!(b.miner_id, "B");
        assert_eq!(b.win_rate, Some(0.0));
    }

    #[test]
    fn test_summarize_value_form_has_no_win_rate() {
        let records = vec![BidRecord {
            block_height: 1,
            miner_id: Some("A".to_string()),
            bid_amount: Some(2.0),
            total_bid_for_block: 2.0,
        }];
        let summaries = summarize(&records);
        assert_eq!(summaries[0].blocks_won, None);
        assert_eq!(summaries[0].win_rate, None);
    }

    #[test]
    fn test_summarize_skips_incomplete_rows() {
        let records = vec![
            BidRecord {
                block_height: 1,
                miner_id: Some("A".to_string()),
                bid_amount: None,
                total_bid_for_block: 0.0,
            },
            BidRecord {
                block_height: 1,
                miner_id: None,
                bid_amount: Some(9.0),
                total_bid_for_block: 9.0,
            },
        ];
        assert!(summarize(&records).is_empty());
    }

    #[test]
    fn test_display_conversion_rates() {
        // 100 sats at base=50000, satoshi=1 -> 100 / 1 * 50000
        let rates = ExchangeRates::new(50_000.0, 1.0).unwrap();
        assert_eq!(rates.sats_to_display(100.0), 5_000_000.0);
    }

    #[test]
    fn test_zero_and_negative_rates_rejected() {
        assert!(matches!(
            ExchangeRates::new(50_000.0, 0.0),
            Err(Error::InvalidRate(r)) if r == 0.0
        ));
        assert!(matches!(
            ExchangeRates::new(-1.0, 1.0),
            Err(Error::InvalidRate(_))
        ));
        assert!(matches!(
            ExchangeRates::new(f64::NAN, 1.0),
            Err(Error::InvalidRate(_))
        ));
    }

    #[test]
    fn test_price_summaries() {
        let bids = vec![observed("A", 50.0, true)];
        let summaries = summarize(&bids);
        let rates = ExchangeRates::new(50_000.0, 1.0).unwrap();
        let priced = price_summaries(&summaries, &rates);
        // 50 bid units = 100 sats.
        assert_eq!(priced[0].total_display, 5_000_000.0);
        assert_eq!(priced[0].average_display, 5_000_000.0);
        assert_eq!(priced[0].win_rate, Some(1.0));
    }
}
