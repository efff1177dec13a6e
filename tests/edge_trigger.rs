mod support;

use candle_viewer_wasm::application::ViewportEdgeTrigger;
use candle_viewer_wasm::config::{ChartTimeUnit, EdgeConfig};
use candle_viewer_wasm::domain::market_data::Timestamp;
use support::{Harness, bar, key, page};

fn minute_bars() -> Vec<candle_viewer_wasm::domain::market_data::Candle> {
    vec![bar(1_000_000), bar(1_060_000), bar(1_120_000)]
}

#[test]
fn threshold_is_lookahead_bars_past_the_oldest() {
    let trigger = ViewportEdgeTrigger::default();
    let candles = minute_bars();
    assert_eq!(trigger.step(&candles), 60);
    assert_eq!(trigger.threshold(&candles), Some(1000 + 600));

    assert!(trigger.should_load_more(1600.0, &candles, true, false));
    assert!(trigger.should_load_more(900.0, &candles, true, false));
    assert!(!trigger.should_load_more(1600.5, &candles, true, false));
}

#[test]
fn never_fires_when_exhausted_or_busy() {
    let trigger = ViewportEdgeTrigger::default();
    let candles = minute_bars();
    assert!(!trigger.should_load_more(0.0, &candles, false, false));
    assert!(!trigger.should_load_more(0.0, &candles, true, true));
    assert!(!trigger.should_load_more(0.0, &[], true, false));
}

#[test]
fn single_bar_uses_default_step() {
    let trigger = ViewportEdgeTrigger::default();
    let candles = vec![bar(1_000_000)];
    assert_eq!(trigger.step(&candles), 60);
    assert_eq!(trigger.threshold(&candles), Some(1600));
}

#[test]
fn sub_second_spacing_rounds_to_at_least_one() {
    let trigger = ViewportEdgeTrigger::default();
    assert_eq!(trigger.step(&[bar(0), bar(400)]), 1);
    assert_eq!(trigger.step(&[bar(0), bar(1_499)]), 1);
    assert_eq!(trigger.step(&[bar(0), bar(1_500)]), 2);
}

#[test]
fn millisecond_axis() {
    let trigger = ViewportEdgeTrigger::new(&EdgeConfig {
        lookahead_bars: 5,
        time_unit: ChartTimeUnit::Milliseconds,
        ..EdgeConfig::default()
    });
    let candles = minute_bars();
    assert_eq!(trigger.step(&candles), 60_000);
    assert_eq!(trigger.threshold(&candles), Some(1_000_000 + 300_000));
}

#[test]
fn visible_range_drives_the_source() {
    let trigger = ViewportEdgeTrigger::default();
    let mut h = Harness::new(3);
    let task = h.source.set_key(key("BTCUSDT"));
    let _first = h.spawn(task);

    // nothing loaded yet
    assert!(trigger.on_visible_range_change(0.0, &h.source).is_none());

    h.respond(Ok(page(&[1_000_000, 1_060_000, 1_120_000])));
    assert!(trigger.on_visible_range_change(5_000.0, &h.source).is_none());

    let task = trigger.on_visible_range_change(1_100.0, &h.source).expect("near the left edge");
    let _older = h.spawn(task);
    assert_eq!(h.fetcher.requests()[1].to, Some(Timestamp::from_millis(999_999)));

    // in flight: further notifications are ignored
    assert!(trigger.on_visible_range_change(1_000.0, &h.source).is_none());
    assert_eq!(h.fetcher.request_count(), 2);
}
