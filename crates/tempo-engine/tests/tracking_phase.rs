//! Two-phase (tick + tracking) scheduling and the flush invariant.
//!
//! Verifies that with fully parallel tracking enabled, every unit's
//! tick-phase work completes before any unit's tracking work begins,
//! and that flush suspension is balanced exactly once per endpoint no
//! matter how the tracking phase ends.

use std::sync::Arc;

use tempo_core::{EndpointId, TickError, TickPhase, UnitId};
use tempo_engine::{SchedulerConfig, TickScheduler};
use tempo_test_utils::{CountingSim, FailingSim, MockNetwork, RecordingSim, StaticRegistry};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn two_phase_config() -> SchedulerConfig {
    SchedulerConfig {
        parallel_units: true,
        fully_parallel_tracking: true,
    }
}

#[test]
fn tick_phase_strictly_precedes_tracking_phase() {
    let backend = Arc::new(RecordingSim::new());
    let registry = Arc::new(StaticRegistry::new(4));
    let network = Arc::new(MockNetwork::new());
    network.connect(EndpointId(1));

    let mut scheduler = TickScheduler::new(
        backend.clone(),
        registry,
        network,
        two_phase_config(),
    )
    .expect("scheduler");

    scheduler.tick().expect("tick");

    let events = backend.events();
    assert_eq!(events.len(), 8, "4 tick + 4 tracking events");

    let last_tick_event = events
        .iter()
        .rposition(|(phase, _)| *phase == TickPhase::Tick)
        .expect("tick events present");
    let first_track_event = events
        .iter()
        .position(|(phase, _)| *phase == TickPhase::Tracking)
        .expect("tracking events present");
    assert!(
        last_tick_event < first_track_event,
        "every tick-phase record must precede every tracking-phase record: {events:?}"
    );

    // Each unit appears exactly once per phase.
    for id in 0..4 {
        let ticks = events
            .iter()
            .filter(|&&(phase, unit)| phase == TickPhase::Tick && unit == UnitId(id))
            .count();
        let tracks = events
            .iter()
            .filter(|&&(phase, unit)| phase == TickPhase::Tracking && unit == UnitId(id))
            .count();
        assert_eq!((ticks, tracks), (1, 1), "unit {id}");
    }
}

#[test]
fn tracking_phase_skipped_with_no_connections() {
    let backend = Arc::new(CountingSim::new());
    let registry = Arc::new(StaticRegistry::new(3));
    let network = Arc::new(MockNetwork::new());

    let mut scheduler = TickScheduler::new(
        backend.clone(),
        registry,
        network.clone(),
        two_phase_config(),
    )
    .expect("scheduler");

    scheduler.tick().expect("tick");

    // No endpoints: the whole suspend/track/resume dance is skipped.
    assert_eq!(network.total_suspends(), 0);
    assert_eq!(network.total_resumes(), 0);
    for id in 0..3 {
        assert_eq!(backend.tick_count(UnitId(id)), 1);
        assert_eq!(backend.track_count(UnitId(id)), 0);
    }
}

#[test]
fn every_endpoint_suspended_and_resumed_exactly_once() {
    let backend = Arc::new(CountingSim::new());
    let registry = Arc::new(StaticRegistry::new(3));
    let network = Arc::new(MockNetwork::new());
    for id in 0..5 {
        network.connect(EndpointId(id));
    }

    let mut scheduler = TickScheduler::new(
        backend.clone(),
        registry,
        network.clone(),
        two_phase_config(),
    )
    .expect("scheduler");

    scheduler.tick().expect("tick");

    for id in 0..5 {
        assert_eq!(network.suspend_count(EndpointId(id)), 1);
        assert_eq!(network.resume_count(EndpointId(id)), 1);
    }
    for id in 0..3 {
        assert_eq!(backend.track_count(UnitId(id)), 1);
    }
}

#[test]
fn flush_resumes_even_when_tracking_fails() {
    init_logs();
    let backend = Arc::new(FailingSim::new().fail_tracking_for(UnitId(1)));
    let registry = Arc::new(StaticRegistry::new(3));
    let network = Arc::new(MockNetwork::new());
    network.connect(EndpointId(7));

    let mut scheduler = TickScheduler::new(
        backend.clone(),
        registry,
        network.clone(),
        two_phase_config(),
    )
    .expect("scheduler");

    let err = scheduler.tick().expect_err("unit 1 tracking fails");
    match err {
        TickError::UnitsFailed(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].unit, UnitId(1));
            assert_eq!(failures[0].phase, TickPhase::Tracking);
        }
        other => panic!("expected UnitsFailed, got {other:?}"),
    }

    // Flush must never remain suspended, failure or not.
    assert_eq!(network.suspend_count(EndpointId(7)), 1);
    assert_eq!(network.resume_count(EndpointId(7)), 1);

    // All three units still ran both phases.
    for id in 0..3 {
        assert_eq!(backend.tick_count(UnitId(id)), 1);
        assert_eq!(backend.track_count(UnitId(id)), 1);
    }
}

#[test]
fn sequential_mode_keeps_tracking_inline() {
    let backend = Arc::new(CountingSim::new());
    let registry = Arc::new(StaticRegistry::new(2));
    let network = Arc::new(MockNetwork::new());
    network.connect(EndpointId(1));

    // Tracking parallelism is inert without parallel units.
    let mut scheduler = TickScheduler::new(
        backend.clone(),
        registry,
        network.clone(),
        SchedulerConfig {
            parallel_units: false,
            fully_parallel_tracking: true,
        },
    )
    .expect("scheduler");

    scheduler.tick().expect("tick");

    for id in 0..2 {
        assert_eq!(backend.tick_count(UnitId(id)), 1);
        assert_eq!(backend.track_count(UnitId(id)), 1);
    }
    assert_eq!(network.total_suspends(), 0);
    assert_eq!(network.total_resumes(), 0);
}

#[test]
fn endpoints_connecting_between_ticks_join_the_next_snapshot() {
    // The suspension set is rebuilt fresh each tracking phase.
    let backend = Arc::new(CountingSim::new());
    let registry = Arc::new(StaticRegistry::new(2));
    let network = Arc::new(MockNetwork::new());
    network.connect(EndpointId(1));

    let mut scheduler = TickScheduler::new(
        backend,
        registry,
        network.clone(),
        two_phase_config(),
    )
    .expect("scheduler");

    scheduler.tick().expect("tick 1");
    network.connect(EndpointId(2));
    scheduler.tick().expect("tick 2");

    // Endpoint 2 existed for exactly one tracking phase.
    assert_eq!(network.suspend_count(EndpointId(1)), 2);
    assert_eq!(network.resume_count(EndpointId(1)), 2);
    assert_eq!(network.suspend_count(EndpointId(2)), 1);
    assert_eq!(network.resume_count(EndpointId(2)), 1);
}
