mod support;

use candle_viewer_wasm::domain::market_data::{CandlePage, PageBoundary, Timestamp, next_boundary, next_boundary_after};
use quickcheck_macros::quickcheck;
use support::page;

#[test]
fn boundary_is_one_before_oldest() {
    assert_eq!(next_boundary(&page(&[100, 200, 300])), PageBoundary::Before(Timestamp::from_millis(99)));
}

#[test]
fn empty_page_ends_history() {
    assert_eq!(next_boundary(&CandlePage::empty()), PageBoundary::NoMore);
    assert_eq!(next_boundary_after(&CandlePage::empty(), Some(Timestamp::from_millis(99))), PageBoundary::NoMore);
    assert!(!PageBoundary::NoMore.has_more());
}

#[test]
fn bound_ignoring_server_cannot_stall_the_cursor() {
    // asked for bars before 99, got the same page again
    let repeated = page(&[100, 200, 300]);
    assert_eq!(
        next_boundary_after(&repeated, Some(Timestamp::from_millis(99))),
        PageBoundary::Before(Timestamp::from_millis(98))
    );

    let honest = page(&[40, 70, 90]);
    assert_eq!(
        next_boundary_after(&honest, Some(Timestamp::from_millis(99))),
        PageBoundary::Before(Timestamp::from_millis(39))
    );
}

#[test]
fn cursor_at_epoch_goes_negative() {
    assert_eq!(next_boundary(&page(&[0, 1000])), PageBoundary::Before(Timestamp::from_millis(-1)));
}

#[quickcheck]
fn boundary_is_strictly_older_than_every_bar(raw: Vec<i32>) -> bool {
    let mut ts: Vec<i64> = raw.iter().map(|t| i64::from(*t)).collect();
    ts.sort_unstable();
    ts.dedup();
    let page = CandlePage::from_candles(ts.iter().copied().map(support::bar).collect());
    match next_boundary(&page) {
        PageBoundary::Before(boundary) => !ts.is_empty() && ts.iter().all(|t| boundary.value() < *t),
        PageBoundary::NoMore => ts.is_empty(),
    }
}

#[quickcheck]
fn bounded_cursor_strictly_decreases(mut raw: Vec<i32>, to: i32) -> bool {
    raw.sort_unstable();
    let to = Timestamp::from_millis(i64::from(to));
    let page = CandlePage::from_candles(raw.iter().map(|t| support::bar(i64::from(*t))).collect());
    match next_boundary_after(&page, Some(to)) {
        PageBoundary::Before(boundary) => boundary < to,
        PageBoundary::NoMore => raw.is_empty(),
    }
}
