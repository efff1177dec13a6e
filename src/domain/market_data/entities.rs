pub use super::value_objects::{InstrumentKey, OHLCV, Price, Timestamp, Volume};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Domain entity - Candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: Timestamp,
    pub ohlcv: OHLCV,
}

impl Candle {
    pub fn new(timestamp: Timestamp, ohlcv: OHLCV) -> Self {
        Self { timestamp, ohlcv }
    }

    /// Close at or above open. Doji bars count as bullish, matching the
    /// colour the chart gives them.
    pub fn is_bullish(&self) -> bool {
        self.ohlcv.close >= self.ohlcv.open
    }
}

/// One fetched batch of candles, ascending by timestamp.
///
/// `oldest_ts` and `newest_ts` mirror the first and last candle and are
/// `None` exactly when the page is empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandlePage {
    pub candles: Vec<Candle>,
    pub oldest_ts: Option<Timestamp>,
    pub newest_ts: Option<Timestamp>,
}

impl CandlePage {
    /// Builds a page from already ascending candles.
    pub fn from_candles(candles: Vec<Candle>) -> Self {
        let oldest_ts = candles.first().map(|c| c.timestamp);
        let newest_ts = candles.last().map(|c| c.timestamp);
        Self { candles, oldest_ts, newest_ts }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

/// What a fetch was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchKind {
    /// Page 0 of a fresh chain.
    #[display(fmt = "initial")]
    Initial,
    /// The next older page.
    #[display(fmt = "trailing")]
    Trailing,
    /// Page 0 again, over a non-empty chain.
    #[display(fmt = "refresh")]
    Refresh,
}

/// Arguments of a single page fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub key: InstrumentKey,
    pub limit: u32,
    /// Exclusive upper bound. `None` lets the server pick the right edge.
    pub to: Option<Timestamp>,
    pub include_partial_latest: bool,
}

impl PageRequest {
    /// Unbounded request for the most recent page.
    pub fn latest(key: InstrumentKey, limit: u32, include_partial_latest: bool) -> Self {
        Self { key, limit, to: None, include_partial_latest }
    }

    /// Request for the page strictly older than `to`. The still-forming bar
    /// can never be older than a held bar, so the flag is not sent.
    pub fn before(key: InstrumentKey, limit: u32, to: Timestamp) -> Self {
        Self { key, limit, to: Some(to), include_partial_latest: false }
    }

    pub fn is_unbounded(&self) -> bool {
        self.to.is_none()
    }
}

/// Pages fetched for one instrument key, newest first.
#[derive(Debug, Clone, Default)]
pub struct PageChain {
    pages: Vec<CandlePage>,
}

impl PageChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Most recent page (index 0).
    pub fn head(&self) -> Option<&CandlePage> {
        self.pages.first()
    }

    /// Oldest page fetched so far; the cursor continues from here.
    pub fn last(&self) -> Option<&CandlePage> {
        self.pages.last()
    }

    /// Appends an older page and returns its index.
    pub fn push_older(&mut self, page: CandlePage) -> usize {
        self.pages.push(page);
        self.pages.len() - 1
    }

    /// Replaces page 0 with `fresh`, keeping the previous head's bars that are
    /// older than anything in `fresh` so no gap opens towards page 1.
    ///
    /// When `fresh` starts after the previous head ends, the bars in between
    /// were never fetched; the chain is then rebuilt from `fresh` alone and
    /// `true` is returned.
    pub fn refresh_head(&mut self, fresh: CandlePage) -> bool {
        let Some(head) = self.pages.first_mut() else {
            self.pages.push(fresh);
            return false;
        };

        if let (Some(fresh_oldest), Some(head_newest)) = (fresh.oldest_ts, head.newest_ts) {
            if fresh_oldest > head_newest {
                self.pages.clear();
                self.pages.push(fresh);
                return true;
            }
        }

        let mut candles: Vec<Candle> = match fresh.oldest_ts {
            Some(oldest) => head.candles.iter().filter(|c| c.timestamp < oldest).cloned().collect(),
            None => head.candles.clone(),
        };
        candles.extend(fresh.candles);
        *head = CandlePage::from_candles(candles);
        false
    }

    /// Pages in ascending time order, oldest page first.
    pub fn display_order(&self) -> impl Iterator<Item = &CandlePage> {
        self.pages.iter().rev()
    }

    pub fn total_candles(&self) -> usize {
        self.pages.iter().map(CandlePage::len).sum()
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64) -> Candle {
        Candle::new(
            Timestamp::from_millis(ts),
            OHLCV::new(Price::from(1.0), Price::from(2.0), Price::from(0.5), Price::from(1.5), Volume::from(10.0)),
        )
    }

    fn page(ts: &[i64]) -> CandlePage {
        CandlePage::from_candles(ts.iter().copied().map(bar).collect())
    }

    #[test]
    fn page_bounds_follow_candles() {
        let p = page(&[100, 200, 300]);
        assert_eq!(p.oldest_ts, Some(Timestamp::from_millis(100)));
        assert_eq!(p.newest_ts, Some(Timestamp::from_millis(300)));
        let empty = CandlePage::empty();
        assert_eq!(empty.oldest_ts, None);
        assert_eq!(empty.newest_ts, None);
    }

    #[test]
    fn refresh_head_keeps_older_bars_of_previous_head() {
        let mut chain = PageChain::new();
        chain.push_older(page(&[100, 200, 300]));
        chain.push_older(page(&[40, 70, 90]));

        assert!(!chain.refresh_head(page(&[200, 300, 400])));

        let head: Vec<i64> = chain.head().unwrap().candles.iter().map(|c| c.timestamp.value()).collect();
        assert_eq!(head, vec![100, 200, 300, 400]);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.last().unwrap().oldest_ts, Some(Timestamp::from_millis(40)));
    }

    #[test]
    fn refresh_head_past_the_previous_head_rebuilds_chain() {
        let mut chain = PageChain::new();
        chain.push_older(page(&[100, 200, 300]));
        chain.push_older(page(&[40, 70, 90]));

        assert!(chain.refresh_head(page(&[500, 600, 700])));

        assert_eq!(chain.len(), 1);
        assert_eq!(chain.head().unwrap().oldest_ts, Some(Timestamp::from_millis(500)));
    }

    #[test]
    fn refresh_head_touching_previous_head_is_kept() {
        let mut chain = PageChain::new();
        chain.push_older(page(&[100, 200, 300]));
        assert!(!chain.refresh_head(page(&[300, 400])));
        let head: Vec<i64> = chain.head().unwrap().candles.iter().map(|c| c.timestamp.value()).collect();
        assert_eq!(head, vec![100, 200, 300, 400]);
    }

    #[test]
    fn refresh_head_on_empty_chain_pushes() {
        let mut chain = PageChain::new();
        assert!(!chain.refresh_head(page(&[1, 2])));
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.total_candles(), 2);
    }

    #[test]
    fn bounded_requests_never_ask_for_partial_bar() {
        let key = InstrumentKey::default();
        assert!(PageRequest::latest(key.clone(), 10, true).include_partial_latest);
        assert!(!PageRequest::before(key, 10, Timestamp::from_millis(5)).include_partial_latest);
    }
}
