use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use tick_bars::aggregate::AggregationEngine;
use tick_bars::clock::ManualClock;
use tick_bars::event::{AggregateEvent, FeedEvent, WsConnectionStatus};
use tick_bars::feed::decode_ticks;
use tick_bars::model::Tick;
use tick_bars::runtime::run_aggregator;

const RES: u64 = 1_000;

fn collecting_engine(
    clock: ManualClock,
) -> (
    AggregationEngine<impl FnMut(AggregateEvent) + Send + 'static, ManualClock>,
    Arc<Mutex<Vec<AggregateEvent>>>,
) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let engine = AggregationEngine::with_clock(RES, clock, move |e: AggregateEvent| {
        sink.lock().expect("events lock").push(e)
    });
    (engine, events)
}

/// Send a tick as if it arrived `delay_ms` after its timestamp, then let the task run.
async fn deliver(feed_tx: &mpsc::Sender<FeedEvent>, clock: &ManualClock, tick: Tick, delay_ms: u64) {
    clock.set(tick.timestamp_ms + delay_ms);
    feed_tx
        .send(FeedEvent::Tick(tick))
        .await
        .expect("aggregator should be running");
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
/// Verifies the driver end to end:
/// connected passes through, the first boundary initializes, the second closes a bar.
async fn driver_emits_connected_initialized_and_bar() {
    let clock = ManualClock::new(0);
    let (engine, events) = collecting_engine(clock.clone());
    let (feed_tx, feed_rx) = mpsc::channel(64);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run_aggregator(engine, feed_rx, shutdown_rx));

    feed_tx
        .send(FeedEvent::Status(WsConnectionStatus::Connected))
        .await
        .unwrap();
    deliver(&feed_tx, &clock, Tick::new(10_400, 100.0, 1.0), 10).await;
    // Boundary for 10_000 fires ~610ms later.
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(
        *events.lock().unwrap(),
        vec![AggregateEvent::Connected, AggregateEvent::Initialized]
    );

    deliver(&feed_tx, &clock, Tick::new(11_200, 102.0, 2.0), 10).await;
    deliver(&feed_tx, &clock, Tick::new(11_300, 98.0, 1.0), 10).await;
    tokio::time::sleep(Duration::from_millis(1_000)).await;

    drop(feed_tx);
    let engine = task.await.unwrap();
    assert!(engine.next_deadline().is_none());
    assert_eq!(engine.buffered(), 1);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 3);
    let AggregateEvent::Bar(bar) = &events[2] else {
        panic!("expected a bar, got {:?}", events[2]);
    };
    assert_eq!(bar.epoch, 11_000);
    assert!((bar.open - 100.0).abs() < f64::EPSILON);
    assert!((bar.high - 102.0).abs() < f64::EPSILON);
    assert!((bar.low - 98.0).abs() < f64::EPSILON);
    assert!((bar.close - 98.0).abs() < f64::EPSILON);
    assert!((bar.volume - 3.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
/// Verifies the boundary does not fire before the latency-padded deadline.
async fn driver_waits_for_padded_deadline() {
    let clock = ManualClock::new(0);
    let (engine, events) = collecting_engine(clock.clone());
    let (feed_tx, feed_rx) = mpsc::channel(64);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run_aggregator(engine, feed_rx, shutdown_rx));

    // 900ms to the boundary plus 200ms latency padding.
    deliver(&feed_tx, &clock, Tick::new(20_100, 1.0, 1.0), 200).await;
    tokio::time::sleep(Duration::from_millis(1_050)).await;
    assert!(events.lock().unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*events.lock().unwrap(), vec![AggregateEvent::Initialized]);

    drop(feed_tx);
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
/// Verifies teardown:
/// a shutdown signal stops the driver and cancels the armed boundary before it fires.
async fn shutdown_cancels_pending_boundary() {
    let clock = ManualClock::new(0);
    let (engine, events) = collecting_engine(clock.clone());
    let (feed_tx, feed_rx) = mpsc::channel(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run_aggregator(engine, feed_rx, shutdown_rx));

    deliver(&feed_tx, &clock, Tick::new(30_100, 1.0, 1.0), 5).await;
    shutdown_tx.send(true).unwrap();
    let engine = task.await.unwrap();

    assert!(engine.next_deadline().is_none());
    assert_eq!(engine.buffered(), 1);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
/// Verifies decoded feed frames drive the engine: incomplete entries never reach it.
async fn decoded_frames_feed_the_driver() {
    let clock = ManualClock::new(0);
    let (engine, _events) = collecting_engine(clock.clone());
    let (feed_tx, feed_rx) = mpsc::channel(64);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run_aggregator(engine, feed_rx, shutdown_rx));

    let frame = r#"{"table":"trade","action":"insert","data":[
        {"timestamp":"1970-01-01T00:00:40.100Z","price":10.0,"size":1},
        {"timestamp":"1970-01-01T00:00:40.200Z","price":11.0},
        {"timestamp":"1970-01-01T00:00:40.300Z","price":12.0,"size":2}
    ]}"#;
    let ticks = decode_ticks(frame).unwrap();
    assert_eq!(ticks.len(), 2);
    for tick in ticks {
        deliver(&feed_tx, &clock, tick, 10).await;
    }

    drop(feed_tx);
    let engine = task.await.unwrap();
    assert_eq!(engine.buffered(), 2);
    assert_eq!(engine.latency(), 10);
}
