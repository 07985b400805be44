//! Whole-run behavioral properties of the simulation engine.
//!
//! Each test drives a real engine against an in-memory sink and checks an
//! invariant over the full snapshot stream.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::arithmetic_side_effects
)]

use std::collections::BTreeMap;

use contagion_agents::Agent;
use contagion_core::{MemorySink, ModelConfig, SimulationEngine, census_by_step, run_model};
use contagion_types::{AgentId, AgentSnapshot, HealthState, Position};
use contagion_world::{Bounds, ToroidalSpace};

fn config(num_agents: u32) -> ModelConfig {
    ModelConfig {
        num_agents,
        width: 200.0,
        height: 100.0,
        p_stationary: 0.5,
        ..ModelConfig::default()
    }
}

/// Records of one stream grouped by agent, each in step order.
fn by_agent(records: &[AgentSnapshot]) -> BTreeMap<AgentId, Vec<AgentSnapshot>> {
    let mut grouped: BTreeMap<AgentId, Vec<AgentSnapshot>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.unique_id).or_default().push(record.clone());
    }
    for history in grouped.values_mut() {
        history.sort_by_key(|r| r.step);
    }
    grouped
}

fn lone_carrier(steps: u64) -> Agent {
    let mut engine = SimulationEngine::from_population(
        ModelConfig {
            num_agents: 1,
            width: 100.0,
            height: 100.0,
            ..ModelConfig::default()
        },
        ToroidalSpace::new(Bounds::new(100.0, 100.0).unwrap()),
        vec![Agent::patient_zero(Position::new(50.0, 50.0), (1.0, 1.0), 5.0)],
    )
    .unwrap();
    let mut sink = MemorySink::new();
    for _ in 0..steps {
        engine.step(&mut sink).unwrap();
    }
    engine.agent(AgentId(0)).cloned().unwrap()
}

#[test]
fn single_carrier_recovers_after_exactly_the_threshold() {
    let agent = lone_carrier(100);
    assert_eq!(agent.state(), HealthState::Recovered);
    assert_eq!(agent.recovery_timer(), 100);

    let agent = lone_carrier(99);
    assert_eq!(agent.state(), HealthState::Infected);
    assert_eq!(agent.recovery_timer(), 99);

    // The timer is frozen once recovered.
    let agent = lone_carrier(130);
    assert_eq!(agent.recovery_timer(), 100);
}

#[test]
fn recovery_timer_increments_iff_infected_at_step_start() {
    let mut sink = MemorySink::new();
    let report = run_model(config(80), 150, &mut sink).unwrap();
    for history in by_agent(sink.records(&report.stream_key)).values() {
        for pair in history.windows(2) {
            let (before, after) = (&pair[0], &pair[1]);
            let expected = if before.state == HealthState::Infected {
                before.recovery_time + 1
            } else {
                before.recovery_time
            };
            assert_eq!(after.recovery_time, expected, "agent {}", before.unique_id);
            if before.state != HealthState::Infected {
                assert!(before.state == HealthState::Recovered || before.recovery_time == 0);
            }
        }
    }
}

#[test]
fn transitions_are_monotonic() {
    let rank = |s: HealthState| match s {
        HealthState::Healthy => 0,
        HealthState::Infected => 1,
        HealthState::Recovered => 2,
    };
    let mut sink = MemorySink::new();
    let report = run_model(config(80), 150, &mut sink).unwrap();
    for history in by_agent(sink.records(&report.stream_key)).values() {
        for pair in history.windows(2) {
            assert!(rank(pair[0].state) <= rank(pair[1].state));
        }
    }
}

#[test]
fn positions_stay_in_bounds() {
    let cfg = ModelConfig {
        speed: 37.5,
        p_stationary: 0.0,
        ..config(60)
    };
    let (width, height) = (cfg.width, cfg.height);
    let mut sink = MemorySink::new();
    let report = run_model(cfg, 120, &mut sink).unwrap();
    for record in sink.records(&report.stream_key) {
        assert!((0.0..width).contains(&record.x), "x = {}", record.x);
        assert!((0.0..height).contains(&record.y), "y = {}", record.y);
    }
}

#[test]
fn every_step_accounts_for_the_whole_population() {
    let mut sink = MemorySink::new();
    let report = run_model(config(120), 60, &mut sink).unwrap();
    let census = census_by_step(sink.records(&report.stream_key));
    assert_eq!(census.len(), 60);
    for (step, counts) in census.iter().enumerate() {
        assert_eq!(counts.step, u64::try_from(step).unwrap());
        assert_eq!(counts.total(), 120);
    }
    assert_eq!(census[0].infected, 1);
    assert_eq!(census[0].healthy, 119);
}

#[test]
fn stationary_agents_never_move() {
    let mut sink = MemorySink::new();
    let report = run_model(config(50), 30, &mut sink).unwrap();
    for history in by_agent(sink.records(&report.stream_key)).values() {
        if history[0].is_stationary() {
            assert!(history.iter().all(|r| r.x == history[0].x && r.y == history[0].y));
        }
    }
}

#[test]
fn identical_seeds_produce_identical_streams() {
    let mut a = MemorySink::new();
    let mut b = MemorySink::new();
    let ra = run_model(config(100), 80, &mut a).unwrap();
    let rb = run_model(config(100), 80, &mut b).unwrap();
    let ja = serde_json::to_string(a.records(&ra.stream_key)).unwrap();
    let jb = serde_json::to_string(b.records(&rb.stream_key)).unwrap();
    assert_eq!(ja, jb);

    let mut c = MemorySink::new();
    let other = ModelConfig {
        seed: 7,
        ..config(100)
    };
    let rc = run_model(other, 80, &mut c).unwrap();
    assert_ne!(a.records(&ra.stream_key), c.records(&rc.stream_key));
}

#[test]
fn default_run_matches_reference_shape() {
    let mut sink = MemorySink::new();
    let report = run_model(ModelConfig::default(), 5, &mut sink).unwrap();
    assert_eq!(
        report.stream_key,
        "num_agents=200,width=800,height=400,p_stationary=0.75,speed=5"
    );
    assert_eq!(sink.records(&report.stream_key).len(), 1000);
}
