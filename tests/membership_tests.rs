use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pulse::error::PulseError;
use pulse::heartbeat::HeartbeatMessage;
use pulse::membership::{
    DecaySweeper, HeartbeatIntake, IntakePolicy, MembershipStore, MembershipTable, SweepPolicy,
};
use pulse::presentation::{NoopPresenter, Presenter, WatchPresenter};
use pulse::settings::DetectorSettings;

fn coordinator(
    presenter: Arc<dyn Presenter>,
) -> (
    Arc<MembershipTable>,
    HeartbeatIntake<MembershipTable>,
    DecaySweeper<MembershipTable>,
) {
    let settings = DetectorSettings::default();
    let table = Arc::new(MembershipTable::new());
    let intake = HeartbeatIntake::new(
        table.clone(),
        IntakePolicy::from(&settings),
        presenter.clone(),
    );
    let sweeper = DecaySweeper::new(
        table.clone(),
        SweepPolicy::from(&settings),
        settings.sweep_interval(),
        presenter,
    );
    (table, intake, sweeper)
}

#[test]
fn test_heartbeat_lifecycle_scenarios() {
    let (table, intake, sweeper) = coordinator(Arc::new(NoopPresenter));

    // first heartbeat creates the record
    intake
        .intake(HeartbeatMessage::new("10.0.0.5", 100, 1000))
        .unwrap();
    let snapshot = table.snapshot();
    assert_eq!(snapshot.active_process_count, 1);
    assert_eq!(snapshot.find("10.0.0.5", 100).unwrap().confidence, 0.5);

    // second heartbeat raises confidence
    intake
        .intake(HeartbeatMessage::new("10.0.0.5", 100, 1010))
        .unwrap();
    let snapshot = table.snapshot();
    let row = snapshot.find("10.0.0.5", 100).unwrap();
    assert_eq!(row.confidence, 0.6);
    assert_eq!(row.last_heartbeat_at, 1010);
    assert_eq!(snapshot.active_process_count, 1);

    // 16 seconds of silence against a 15 second threshold
    sweeper.sweep_at(1026).unwrap();
    assert_eq!(table.snapshot().rows[0].confidence, 0.5);
    sweeper.sweep_at(1041).unwrap();
    assert_eq!(table.snapshot().rows[0].confidence, 0.4);
    sweeper.sweep_at(1056).unwrap();
    assert_eq!(table.snapshot().rows[0].confidence, 0.3);

    // 0.3 - 0.1 reaches the failure point
    let report = sweeper.sweep_at(1071).unwrap();
    assert_eq!(report.evicted.len(), 1);
    assert_eq!(table.len(), 0);
    assert_eq!(table.snapshot().active_process_count, 0);
}

#[test]
fn test_stale_sweep_from_initial_confidence() {
    let (table, intake, sweeper) = coordinator(Arc::new(NoopPresenter));
    intake
        .intake(HeartbeatMessage::new("10.0.0.5", 100, 1000))
        .unwrap();

    let report = sweeper.sweep_at(1016).unwrap();
    assert_eq!(report.decayed, 1);
    assert_eq!(table.snapshot().rows[0].confidence, 0.4);
    assert_eq!(table.len(), 1);
}

#[test]
fn test_empty_address_leaves_table_unchanged() {
    let (table, intake, _) = coordinator(Arc::new(NoopPresenter));
    intake
        .intake(HeartbeatMessage::new("10.0.0.5", 100, 1000))
        .unwrap();

    let err = intake
        .intake(HeartbeatMessage::new("", 100, 1000))
        .unwrap_err();
    assert!(matches!(err, PulseError::InvalidRequest(_)));
    assert_eq!(table.len(), 1);
}

#[test]
fn test_heartbeat_after_eviction_starts_over() {
    let (table, intake, sweeper) = coordinator(Arc::new(NoopPresenter));
    intake.intake(HeartbeatMessage::new("10.0.0.5", 1, 0)).unwrap();
    for now in [100, 200, 300] {
        sweeper.sweep_at(now).unwrap();
    }
    assert!(table.is_empty());

    intake
        .intake(HeartbeatMessage::new("10.0.0.5", 1, 400))
        .unwrap();
    assert_eq!(table.snapshot().rows[0].confidence, 0.5);
}

#[test]
fn test_presenter_refreshed_once_per_sweep() {
    let (presenter, mut rx) = WatchPresenter::channel();
    let (_, intake, sweeper) = coordinator(Arc::new(presenter));
    for pid in 0..5 {
        intake
            .intake(HeartbeatMessage::new("10.0.0.5", pid, 0))
            .unwrap();
    }
    assert_eq!(rx.borrow_and_update().active_process_count, 5);

    // three sweeps evict all five records; each sweep publishes one table
    for now in [100, 200, 300] {
        sweeper.sweep_at(now).unwrap();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();
    }
    assert_eq!(rx.borrow().active_process_count, 0);
}

#[test]
fn test_concurrent_intake_distinct_keys() {
    let (table, intake, _) = coordinator(Arc::new(NoopPresenter));
    let threads: Vec<_> = (0..16)
        .map(|t| {
            let intake = intake.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    let pid = t * 50 + i;
                    intake
                        .intake(HeartbeatMessage::new("10.0.0.5", pid, 1000))
                        .unwrap();
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    let snapshot = table.snapshot();
    assert_eq!(snapshot.active_process_count, 800);
    assert!(snapshot.rows.iter().all(|row| row.confidence == 0.5));
}

#[test]
fn test_concurrent_intake_same_key_loses_nothing() {
    let (table, intake, _) = coordinator(Arc::new(NoopPresenter));
    // 1 insert + 4 raises lands exactly on 0.9 only if no raise is lost
    let threads: Vec<_> = (0..5)
        .map(|t| {
            let intake = intake.clone();
            thread::spawn(move || {
                intake
                    .intake(HeartbeatMessage::new("10.0.0.5", 100, 1000 + t))
                    .unwrap();
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    let snapshot = table.snapshot();
    let row = snapshot.find("10.0.0.5", 100).unwrap();
    assert_eq!(row.confidence, 0.9);
    assert_eq!(row.last_heartbeat_at, 1004);
}

#[test]
fn test_intake_racing_sweeps_keeps_invariants() {
    let (table, intake, sweeper) = coordinator(Arc::new(NoopPresenter));
    let sweeper = Arc::new(sweeper);
    for pid in 0..64 {
        intake.intake(HeartbeatMessage::new("10.0.0.5", pid, 0)).unwrap();
    }

    let sweeping = {
        let sweeper = sweeper.clone();
        thread::spawn(move || {
            for round in 0..200 {
                sweeper.sweep_at(1_000 + round).unwrap();
            }
        })
    };
    let beating: Vec<_> = (0..4)
        .map(|t| {
            let intake = intake.clone();
            thread::spawn(move || {
                for round in 0..200 {
                    let pid = (t * 16 + round) % 64;
                    intake
                        .intake(HeartbeatMessage::new("10.0.0.5", pid, 0))
                        .unwrap();
                    if round % 50 == 0 {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
            })
        })
        .collect();

    sweeping.join().unwrap();
    for t in beating {
        t.join().unwrap();
    }

    // a final sweep validates every surviving record
    sweeper.sweep_at(0).unwrap();
    for row in table.snapshot().rows {
        assert!(row.confidence > 0.2 && row.confidence <= 1.0);
    }
}
