//! Retrospective review of past calls.
//!
//! Walks every mint the agent has ever called, compares the market cap at
//! call time (the stored qualification record) with a fresh snapshot, and
//! classifies the outcome: PROFIT, STABLE, or RUG. A pure read/report
//! operation; nothing persisted is touched.
//!
//! Per-mint problems (missing record, malformed record, dead API, zero
//! caps) skip that mint with a warning; only a failure to read the called
//! set itself aborts the scan.

use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

use crate::providers::MarketData;
use crate::store::CallStore;
use crate::types::{format_market_cap, CoinReview, ReviewStatus};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Decline needed to call a rug on coins that entered at ≥ $30K.
const RUG_DECLINE_PCT_HIGH_MC: f64 = 50.0;
/// Decline needed on smaller entries; micro caps swing harder.
const RUG_DECLINE_PCT_LOW_MC: f64 = 70.0;
/// Entry cap separating the two decline thresholds.
const HIGH_MC_FLOOR: f64 = 30_000.0;
/// Below this current cap a coin is a rug regardless of decline.
const RUG_ABSOLUTE_FLOOR: f64 = 15_000.0;

/// Classify one coin's performance against its entry market cap.
///
/// Callers must ensure both caps are positive; zero/absent caps are a
/// skip-with-warning case, not a classification.
pub fn classify(address: &str, symbol: &str, initial: f64, current: f64) -> CoinReview {
    let decline_percentage = (initial - current) / initial * 100.0;

    if current > initial {
        let multiplier = current / initial;
        let profit_percentage = (current - initial) / initial * 100.0;
        return CoinReview {
            address: address.to_string(),
            symbol: symbol.to_string(),
            initial_market_cap: initial,
            current_market_cap: current,
            performance: format!("Profit! +{profit_percentage:.1}%"),
            status: ReviewStatus::Profit,
            multiplier: Some(multiplier),
            decline_percentage: None,
            profit_percentage: Some(profit_percentage),
        };
    }

    let rug_threshold = if initial >= HIGH_MC_FLOOR {
        RUG_DECLINE_PCT_HIGH_MC
    } else {
        RUG_DECLINE_PCT_LOW_MC
    };

    let (status, performance) =
        if decline_percentage >= rug_threshold || current < RUG_ABSOLUTE_FLOOR {
            (ReviewStatus::Rug, "RUG".to_string())
        } else {
            (ReviewStatus::Stable, format!("-{decline_percentage:.1}%"))
        };

    CoinReview {
        address: address.to_string(),
        symbol: symbol.to_string(),
        initial_market_cap: initial,
        current_market_cap: current,
        performance,
        status,
        multiplier: None,
        decline_percentage: Some(decline_percentage),
        profit_percentage: None,
    }
}

/// Sort reviews for presentation: PROFIT first (largest multiplier on top),
/// then STABLE, then RUG. Within STABLE/RUG the scan order is kept (the
/// sort is stable).
pub fn sort_reviews(reviews: &mut [CoinReview]) {
    reviews.sort_by(|a, b| {
        let by_status = a.status.rank().cmp(&b.status.rank());
        if by_status != Ordering::Equal {
            return by_status;
        }
        if a.status == ReviewStatus::Profit {
            b.multiplier
                .unwrap_or(0.0)
                .partial_cmp(&a.multiplier.unwrap_or(0.0))
                .unwrap_or(Ordering::Equal)
        } else {
            Ordering::Equal
        }
    });
}

// ---------------------------------------------------------------------------
// Review report
// ---------------------------------------------------------------------------

/// The outcome of one full review pass, ready for posting.
#[derive(Debug, Clone)]
pub struct ReviewReport {
    /// All classified coins, presentation-sorted.
    pub reviews: Vec<CoinReview>,
}

impl ReviewReport {
    pub fn profit_count(&self) -> usize {
        self.reviews
            .iter()
            .filter(|r| r.status == ReviewStatus::Profit)
            .count()
    }

    /// Social-ready summary of the winning calls.
    pub fn summary(&self) -> String {
        let mut output = String::from("\n📊 Latest Coins Analysis:\n------------------------\n");

        for coin in self
            .reviews
            .iter()
            .filter(|r| r.status == ReviewStatus::Profit)
        {
            output.push_str(&format!(
                "\n     Symbol: {}\n     Entry Call MC: {}\n     Current MC: {}\n     Status: ✅ {}\n     ------------------------\n",
                coin.symbol.to_uppercase(),
                format_market_cap(coin.initial_market_cap),
                format_market_cap(coin.current_market_cap),
                coin.performance,
            ));
        }

        output.push_str("\n-------- 🔥🔥🔥🔥 --------\n");
        output
    }
}

// ---------------------------------------------------------------------------
// Reviewer
// ---------------------------------------------------------------------------

/// Re-evaluates every called coin against current market data.
pub struct Reviewer<M, S> {
    market: Arc<M>,
    store: Arc<S>,
}

impl<M, S> Reviewer<M, S>
where
    M: MarketData,
    S: CallStore,
{
    pub fn new(market: Arc<M>, store: Arc<S>) -> Self {
        Self { market, store }
    }

    /// Review every called coin. Per-mint failures are logged and skipped;
    /// the pass only fails if the called set itself cannot be read.
    pub async fn review_all(&self) -> Result<ReviewReport> {
        let mints = self
            .store
            .tracked_mints()
            .await
            .context("Failed to read called-mint set")?;

        info!(count = mints.len(), "Reviewing past calls");
        let mut reviews = Vec::with_capacity(mints.len());

        for mint in mints {
            let record = match self.store.load_record(&mint).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    warn!(mint = %mint, "No stored record found, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(mint = %mint, error = %e, "Unreadable stored record, skipping");
                    continue;
                }
            };

            let current = match self.market.snapshot(&mint).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(mint = %mint, error = %e, "Market refetch failed, skipping");
                    continue;
                }
            };

            let initial_cap = record.market.current_market_cap;
            let current_cap = current.current_market_cap;
            if initial_cap <= 0.0 || current_cap <= 0.0 {
                warn!(mint = %mint, "Missing market cap data, skipping");
                continue;
            }

            reviews.push(classify(
                &mint,
                &current.token_symbol,
                initial_cap,
                current_cap,
            ));
        }

        sort_reviews(&mut reviews);

        info!(
            reviewed = reviews.len(),
            profits = reviews
                .iter()
                .filter(|r| r.status == ReviewStatus::Profit)
                .count(),
            "Review pass complete"
        );
        Ok(ReviewReport { reviews })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn review(initial: f64, current: f64) -> CoinReview {
        classify("Mint", "$TEST", initial, current)
    }

    // -- Classification boundary tests ------------------------------------

    #[test]
    fn test_profit_classification() {
        let r = review(50_000.0, 60_000.0);
        assert_eq!(r.status, ReviewStatus::Profit);
        assert!((r.multiplier.unwrap() - 1.2).abs() < 1e-10);
        assert!((r.profit_percentage.unwrap() - 20.0).abs() < 1e-10);
        assert_eq!(r.performance, "Profit! +20.0%");
        assert!(r.decline_percentage.is_none());
    }

    #[test]
    fn test_rug_at_exact_high_mc_threshold() {
        // 50% decline on a ≥30K entry is a rug (threshold inclusive).
        let r = review(30_000.0, 15_000.0);
        assert_eq!(r.status, ReviewStatus::Rug);
        assert!((r.decline_percentage.unwrap() - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_rug_at_exact_low_mc_threshold() {
        // 70% decline on a small entry is a rug.
        let r = review(10_000.0, 3_000.0);
        assert_eq!(r.status, ReviewStatus::Rug);
    }

    #[test]
    fn test_rug_absolute_floor_overrides_decline() {
        // 69% decline is under the small-cap threshold, but the coin sits
        // below the absolute floor: still a rug.
        let r = review(10_000.0, 3_100.0);
        assert!(r.decline_percentage.unwrap() < 70.0);
        assert_eq!(r.status, ReviewStatus::Rug);
    }

    #[test]
    fn test_stable_classification() {
        let r = review(30_000.0, 16_000.0);
        assert_eq!(r.status, ReviewStatus::Stable);
        assert_eq!(r.performance, "-46.7%");
        assert!(r.multiplier.is_none());
    }

    #[test]
    fn test_threshold_depends_on_entry_size() {
        // A 60% decline rugs a large entry (threshold 50%)...
        let high = review(100_000.0, 40_000.0);
        assert_eq!(high.status, ReviewStatus::Rug);

        // ...while a small entry tolerates a 43% drift as long as the coin
        // stays above the absolute floor.
        let small = review(28_000.0, 16_000.0);
        assert_eq!(small.status, ReviewStatus::Stable);
    }

    #[test]
    fn test_breakeven_is_stable_not_profit() {
        // current == initial is not strictly greater: no profit.
        let r = review(40_000.0, 40_000.0);
        assert_eq!(r.status, ReviewStatus::Stable);
        assert!((r.decline_percentage.unwrap() - 0.0).abs() < 1e-10);
    }

    // -- Sort tests --------------------------------------------------------

    #[test]
    fn test_sort_profit_first_by_multiplier() {
        let mut reviews = vec![
            review(30_000.0, 16_000.0),  // STABLE
            review(10_000.0, 20_000.0),  // PROFIT ×2
            review(10_000.0, 50_000.0),  // PROFIT ×5
            review(30_000.0, 1_000.0),   // RUG
        ];
        sort_reviews(&mut reviews);

        assert_eq!(reviews[0].status, ReviewStatus::Profit);
        assert!((reviews[0].multiplier.unwrap() - 5.0).abs() < 1e-10);
        assert_eq!(reviews[1].status, ReviewStatus::Profit);
        assert!((reviews[1].multiplier.unwrap() - 2.0).abs() < 1e-10);
        assert_eq!(reviews[2].status, ReviewStatus::Stable);
        assert_eq!(reviews[3].status, ReviewStatus::Rug);
    }

    #[test]
    fn test_sort_is_stable_within_status() {
        let mut a = review(30_000.0, 16_000.0);
        a.address = "First".to_string();
        let mut b = review(29_000.0, 16_000.0);
        b.address = "Second".to_string();

        let mut reviews = vec![a, b];
        sort_reviews(&mut reviews);
        assert_eq!(reviews[0].address, "First");
        assert_eq!(reviews[1].address, "Second");
    }

    // -- Report tests ------------------------------------------------------

    #[test]
    fn test_report_profit_count_and_summary() {
        let mut reviews = vec![
            review(10_000.0, 25_000.0), // PROFIT
            review(30_000.0, 16_000.0), // STABLE
            review(30_000.0, 1_000.0),  // RUG
        ];
        sort_reviews(&mut reviews);
        let report = ReviewReport { reviews };

        assert_eq!(report.profit_count(), 1);
        let summary = report.summary();
        assert!(summary.contains("$TEST"));
        assert!(summary.contains("Entry Call MC: $10.00K"));
        assert!(summary.contains("Current MC: $25.00K"));
        assert!(summary.contains("✅ Profit! +150.0%"));
        // Losers never appear in the posted summary.
        assert!(!summary.contains("RUG"));
    }

    #[test]
    fn test_report_summary_empty_when_no_profits() {
        let report = ReviewReport {
            reviews: vec![review(30_000.0, 1_000.0)],
        };
        assert_eq!(report.profit_count(), 0);
        assert!(!report.summary().contains("✅"));
    }
}
