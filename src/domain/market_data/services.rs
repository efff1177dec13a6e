use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Candle, CandlePage, Timestamp};
use crate::log_warn;
use serde::{Deserialize, Serialize};

/// Upper bound for the next older page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageBoundary {
    /// Request bars strictly older than this instant.
    Before(Timestamp),
    /// The chain is exhausted.
    NoMore,
}

impl PageBoundary {
    pub fn has_more(&self) -> bool {
        matches!(self, PageBoundary::Before(_))
    }
}

/// Cursor over the time axis: one millisecond before the oldest bar held.
pub fn next_boundary(page: &CandlePage) -> PageBoundary {
    match page.oldest_ts {
        Some(oldest) => PageBoundary::Before(oldest.pred()),
        None => PageBoundary::NoMore,
    }
}

/// Same as [`next_boundary`] for a page fetched with bound `requested_to`.
///
/// A server that ignores the bound could hand back a page whose oldest bar is
/// not older than the previous one; taking the minimum keeps the cursor
/// strictly decreasing so paging always terminates.
pub fn next_boundary_after(page: &CandlePage, requested_to: Option<Timestamp>) -> PageBoundary {
    match (next_boundary(page), requested_to) {
        (PageBoundary::Before(from_page), Some(to)) => PageBoundary::Before(from_page.min(to.pred())),
        (boundary, _) => boundary,
    }
}

/// How adjacent pages that overlap in time are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergePolicy {
    /// Concatenate as-is; duplicates from a misbehaving server survive.
    #[default]
    PassThrough,
    /// Drop every bar that is not strictly newer than the bar before it.
    ClampOverlap,
}

/// Result of flattening a page chain.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergedSeries {
    pub candles: Vec<Candle>,
    /// Bars that were not strictly newer than their predecessor.
    pub overlaps: usize,
}

/// Flattens pages, given oldest page first, into one ascending series.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandleSeriesAssembler {
    policy: MergePolicy,
}

impl CandleSeriesAssembler {
    pub fn new(policy: MergePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    pub fn merge<'a, I>(&self, pages: I) -> MergedSeries
    where
        I: IntoIterator<Item = &'a CandlePage>,
    {
        let pages: Vec<&CandlePage> = pages.into_iter().collect();
        let mut candles: Vec<Candle> = Vec::with_capacity(pages.iter().map(|p| p.len()).sum());
        let mut overlaps = 0;

        for candle in pages.into_iter().flat_map(|p| p.candles.iter()) {
            let overlapping = candles.last().is_some_and(|prev| candle.timestamp <= prev.timestamp);
            if overlapping {
                overlaps += 1;
                if self.policy == MergePolicy::ClampOverlap {
                    continue;
                }
            }
            candles.push(candle.clone());
        }

        if overlaps > 0 {
            log_warn!(
                LogComponent::Domain("SeriesAssembler"),
                "{} overlapping bars between pages ({:?})",
                overlaps,
                self.policy
            );
        }

        MergedSeries { candles, overlaps }
    }
}
