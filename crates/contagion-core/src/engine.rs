//! The simulation engine and its phased step.
//!
//! [`SimulationEngine`] owns the population, the spatial index, and the
//! scheduler. Each call to [`SimulationEngine::step`] runs these phases:
//!
//! 1. **Snapshot** -- record every agent and append the batch to the sink
//!    under the engine's stream key. If the sink fails, the step stops here:
//!    no agent is touched and the step counter does not advance.
//!
//! 2. **Schedule** -- draw a fresh random activation order.
//!
//! 3. **Move** -- every non-stationary agent moves along its heading, in
//!    activation order.
//!
//! 4. **Recover** -- every infected agent advances its timer and recovers at
//!    the threshold, in activation order.
//!
//! 5. **Infect** -- every agent that entered the step infected and is still
//!    infected infects the healthy agents within the infection radius of its
//!    post-move position. Agents infected during this phase do not spread
//!    until the next step.
//!
//! The step is deterministic given the configuration (including the seed).

use contagion_agents::{Agent, AgentError};
use contagion_types::{AgentId, AgentSnapshot, StateCounts};
use contagion_world::{Bounds, GridSpace, SpatialIndex, ToroidalSpace, WorldError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::{DEFAULT_STREAM_KEY_FIELDS, ModelConfig, StreamKeyField};
use crate::population::spawn_population;
use crate::scheduler::RandomActivation;
use crate::sink::{SinkError, SnapshotSink};

/// Errors that can occur while building or stepping the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The configuration (or supplied population) is unusable.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong.
        reason: String,
    },

    /// A spatial index operation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying index error.
        #[from]
        source: WorldError,
    },

    /// An agent update failed.
    #[error("agent error for {agent_id}: {source}")]
    Agent {
        /// The agent that caused the error.
        agent_id: AgentId,
        /// The underlying agent error.
        source: AgentError,
    },

    /// The snapshot sink rejected the step's batch.
    #[error("sink error: {source}")]
    Sink {
        /// The underlying sink error.
        #[from]
        source: SinkError,
    },

    /// The step counter cannot advance further.
    #[error("step counter overflow: cannot advance beyond u64::MAX")]
    StepOverflow,
}

impl EngineError {
    /// Attribute an agent failure, surfacing index failures as
    /// [`EngineError::World`].
    fn from_agent(agent_id: AgentId, err: AgentError) -> Self {
        match err {
            AgentError::World { source } => Self::World { source },
            source => Self::Agent { agent_id, source },
        }
    }
}

/// Result of one completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSummary {
    /// The step that was executed (the step number of its snapshots).
    pub step: u64,
    /// Agents that moved.
    pub moved: u32,
    /// Agents that recovered.
    pub recovered: u32,
    /// Agents newly infected.
    pub infected: u32,
    /// Census after the step, labelled with the next step number.
    pub counts: StateCounts,
}

/// Owns and advances one simulation.
#[derive(Debug)]
pub struct SimulationEngine<S: SpatialIndex = ToroidalSpace> {
    config: ModelConfig,
    stream_key: String,
    step: u64,
    agents: Vec<Agent>,
    space: S,
    scheduler: RandomActivation,
}

impl SimulationEngine<ToroidalSpace> {
    /// Build an engine on the scanning index.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: ModelConfig) -> Result<Self, EngineError> {
        let bounds = validated_bounds(&config)?;
        Self::with_space(config, ToroidalSpace::new(bounds))
    }
}

impl SimulationEngine<GridSpace> {
    /// Build an engine on a bucket grid sized to the infection radius.
    ///
    /// Produces exactly the same trajectory as [`SimulationEngine::new`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if `config` fails validation,
    /// or [`EngineError::World`] if the grid cannot be built.
    pub fn with_grid(config: ModelConfig) -> Result<Self, EngineError> {
        let bounds = validated_bounds(&config)?;
        let grid = GridSpace::new(bounds, config.infection_radius)?;
        Self::with_space(config, grid)
    }
}

impl<S: SpatialIndex> SimulationEngine<S> {
    /// Build an engine on a caller-supplied, empty spatial index.
    ///
    /// The population is drawn from a source seeded with `config.seed`; the
    /// scheduler keeps drawing from that same source.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if `config` fails validation,
    /// the index is not empty, or its bounds differ from the configured
    /// plane.
    pub fn with_space(config: ModelConfig, space: S) -> Result<Self, EngineError> {
        check_space(&config, &space)?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let agents = spawn_population(&config, &mut rng);
        Self::assemble(config, space, agents, RandomActivation::from_rng(rng))
    }

    /// Build an engine from an explicit population.
    ///
    /// `agents` must hold exactly `config.num_agents` agents with ids
    /// `0..N` in order. The scheduler is seeded from `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if `config` fails validation,
    /// the index is unusable, or the population does not match.
    pub fn from_population(
        config: ModelConfig,
        space: S,
        agents: Vec<Agent>,
    ) -> Result<Self, EngineError> {
        check_space(&config, &space)?;
        let expected = usize::try_from(config.num_agents).unwrap_or(usize::MAX);
        if agents.len() != expected {
            return Err(EngineError::InvalidConfig {
                reason: format!(
                    "population has {} agents, configuration expects {expected}",
                    agents.len()
                ),
            });
        }
        if let Some((index, agent)) = agents
            .iter()
            .enumerate()
            .find(|(i, agent)| agent.id().index() != *i)
        {
            return Err(EngineError::InvalidConfig {
                reason: format!("agent at index {index} has id {}", agent.id()),
            });
        }
        let scheduler = RandomActivation::new(config.seed);
        Self::assemble(config, space, agents, scheduler)
    }

    fn assemble(
        config: ModelConfig,
        mut space: S,
        mut agents: Vec<Agent>,
        scheduler: RandomActivation,
    ) -> Result<Self, EngineError> {
        for agent in &mut agents {
            agent
                .place(&mut space)
                .map_err(|e| EngineError::from_agent(agent.id(), e))?;
        }
        let stream_key = config.stream_key(&DEFAULT_STREAM_KEY_FIELDS);

        info!(
            agents = agents.len(),
            width = config.width,
            height = config.height,
            seed = config.seed,
            stream_key = %stream_key,
            "Simulation engine initialized"
        );

        Ok(Self {
            config,
            stream_key,
            step: 0,
            agents,
            space,
            scheduler,
        })
    }

    /// Key snapshots under the given parameter list instead of the default.
    #[must_use]
    pub fn with_stream_key(mut self, fields: &[StreamKeyField]) -> Self {
        self.stream_key = self.config.stream_key(fields);
        self
    }

    // -- accessors ------------------------------------------------------

    /// Number of completed steps.
    pub const fn current_step(&self) -> u64 {
        self.step
    }

    /// The model parameters.
    pub const fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Stream key snapshots are appended under.
    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    /// The population, indexed by id.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// One agent by id.
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.index())
    }

    /// The spatial index.
    pub const fn space(&self) -> &S {
        &self.space
    }

    /// Records for every agent at the current step.
    pub fn snapshot(&self) -> Vec<AgentSnapshot> {
        self.agents.iter().map(|a| a.snapshot(self.step)).collect()
    }

    /// State counts at the current step.
    pub fn census(&self) -> StateCounts {
        let mut counts = StateCounts::new(self.step);
        for agent in &self.agents {
            counts.add(agent.state());
        }
        counts
    }

    // -- stepping -------------------------------------------------------

    /// Execute one step.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Sink`] if the snapshot append fails (the
    /// engine is left unchanged), [`EngineError::StepOverflow`] if the step
    /// counter is exhausted, or [`EngineError::World`] /
    /// [`EngineError::Agent`] for internal inconsistencies.
    pub fn step(&mut self, sink: &mut dyn SnapshotSink) -> Result<StepSummary, EngineError> {
        let step = self.step;
        let next_step = step.checked_add(1).ok_or(EngineError::StepOverflow)?;

        // --- Phase 1: Snapshot ---
        let records = self.snapshot();
        sink.append(&self.stream_key, &records)?;

        // --- Phase 2: Schedule ---
        let ids: Vec<AgentId> = self.agents.iter().map(Agent::id).collect();
        let order = self.scheduler.activation_order(&ids);
        let was_infected: Vec<bool> = self.agents.iter().map(Agent::is_infected).collect();

        // --- Phase 3: Move ---
        let mut moved: u32 = 0;
        for &id in &order {
            let agent = agent_slot(&mut self.agents, id)?;
            if agent
                .advance(&mut self.space)
                .map_err(|e| EngineError::from_agent(id, e))?
            {
                moved = moved.saturating_add(1);
            }
        }

        // --- Phase 4: Recover ---
        let mut recovered: u32 = 0;
        for &id in &order {
            let agent = agent_slot(&mut self.agents, id)?;
            if agent
                .recover_check(self.config.recovery_threshold)
                .map_err(|e| EngineError::from_agent(id, e))?
            {
                recovered = recovered.saturating_add(1);
                debug!(step, agent_id = %id, "Agent recovered");
            }
        }

        // --- Phase 5: Infect ---
        let mut infected: u32 = 0;
        for &id in &order {
            if !was_infected.get(id.index()).copied().unwrap_or(false) {
                continue;
            }
            let contacts = match self.agents.get(id.index()) {
                Some(source) if source.is_infected() => {
                    source.contacts(&self.space, self.config.infection_radius)
                }
                Some(_) => continue,
                None => return Err(WorldError::AgentNotFound(id).into()),
            };
            for contact in contacts {
                let target = agent_slot(&mut self.agents, contact)?;
                if target.infect() {
                    infected = infected.saturating_add(1);
                    debug!(step, source = %id, agent_id = %contact, "Agent infected");
                }
            }
        }

        self.step = next_step;
        let counts = self.census();

        debug!(
            step,
            moved,
            recovered,
            infected,
            healthy = counts.healthy,
            infected_total = counts.infected,
            recovered_total = counts.recovered,
            "Step complete"
        );

        Ok(StepSummary {
            step,
            moved,
            recovered,
            infected,
            counts,
        })
    }
}

fn validated_bounds(config: &ModelConfig) -> Result<Bounds, EngineError> {
    config.validate().map_err(|e| EngineError::InvalidConfig {
        reason: e.to_string(),
    })?;
    Ok(Bounds::new(config.width, config.height)?)
}

fn check_space<S: SpatialIndex>(config: &ModelConfig, space: &S) -> Result<(), EngineError> {
    let bounds = validated_bounds(config)?;
    if !space.is_empty() {
        return Err(EngineError::InvalidConfig {
            reason: format!("spatial index already holds {} agents", space.len()),
        });
    }
    if space.bounds() != bounds {
        return Err(EngineError::InvalidConfig {
            reason: format!(
                "spatial index covers {} x {}, configuration expects {} x {}",
                space.bounds().width(),
                space.bounds().height(),
                bounds.width(),
                bounds.height()
            ),
        });
    }
    Ok(())
}

fn agent_slot(agents: &mut [Agent], id: AgentId) -> Result<&mut Agent, EngineError> {
    agents
        .get_mut(id.index())
        .ok_or(EngineError::World {
            source: WorldError::AgentNotFound(id),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use contagion_types::{HealthState, Position};

    use super::*;
    use crate::sink::MemorySink;

    /// Sink that refuses every append.
    struct RejectingSink;

    impl SnapshotSink for RejectingSink {
        fn append(
            &mut self,
            stream_key: &str,
            _records: &[AgentSnapshot],
        ) -> Result<(), SinkError> {
            Err(SinkError::Rejected {
                stream_key: stream_key.to_owned(),
                reason: String::from("closed"),
            })
        }
    }

    fn small_config(num_agents: u32) -> ModelConfig {
        ModelConfig {
            num_agents,
            width: 100.0,
            height: 100.0,
            ..ModelConfig::default()
        }
    }

    fn space() -> ToroidalSpace {
        ToroidalSpace::new(Bounds::new(100.0, 100.0).unwrap())
    }

    fn pair(second: Position) -> SimulationEngine {
        let mut carrier = Agent::new(AgentId(0), Position::new(0.0, 0.0), (1.0, 0.0), 5.0, true);
        carrier.infect();
        let other = Agent::new(AgentId(1), second, (1.0, 0.0), 5.0, true);
        SimulationEngine::from_population(small_config(2), space(), vec![carrier, other]).unwrap()
    }

    #[test]
    fn new_rejects_invalid_configs() {
        let err = SimulationEngine::new(ModelConfig {
            num_agents: 0,
            ..ModelConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
        assert!(SimulationEngine::new(ModelConfig {
            width: -1.0,
            ..ModelConfig::default()
        })
        .is_err());
    }

    #[test]
    fn new_engine_places_every_agent() {
        let engine = SimulationEngine::new(ModelConfig::default()).unwrap();
        assert_eq!(engine.current_step(), 0);
        assert_eq!(engine.space().len(), 200);
        assert_eq!(
            engine.stream_key(),
            "num_agents=200,width=800,height=400,p_stationary=0.75,speed=5"
        );
        let counts = engine.census();
        assert_eq!((counts.healthy, counts.infected, counts.recovered), (199, 1, 0));
    }

    #[test]
    fn with_space_rejects_mismatched_bounds() {
        let err = SimulationEngine::with_space(ModelConfig::default(), space()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
    }

    #[test]
    fn with_space_rejects_populated_index() {
        let mut s = space();
        s.place_agent(AgentId(0), Position::default()).unwrap();
        let err = SimulationEngine::with_space(small_config(1), s).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
    }

    #[test]
    fn from_population_checks_ids_and_size() {
        let a = Agent::new(AgentId(1), Position::default(), (1.0, 0.0), 1.0, true);
        let err = SimulationEngine::from_population(small_config(1), space(), vec![a]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));

        let b = Agent::new(AgentId(0), Position::default(), (1.0, 0.0), 1.0, true);
        let err = SimulationEngine::from_population(small_config(2), space(), vec![b]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
    }

    #[test]
    fn close_neighbor_is_infected_after_one_step() {
        let mut engine = pair(Position::new(5.0, 5.0));
        let mut sink = MemorySink::new();
        let summary = engine.step(&mut sink).unwrap();
        assert_eq!(summary.step, 0);
        assert_eq!(summary.infected, 1);
        assert_eq!(engine.current_step(), 1);
        let agent = engine.agent(AgentId(1)).unwrap();
        assert_eq!(agent.state(), HealthState::Infected);
        assert_eq!(agent.recovery_timer(), 0);
    }

    #[test]
    fn distant_neighbor_stays_healthy() {
        let mut engine = pair(Position::new(50.0, 50.0));
        let mut sink = MemorySink::new();
        for _ in 0..10 {
            engine.step(&mut sink).unwrap();
        }
        assert_eq!(
            engine.agent(AgentId(1)).map(Agent::state),
            Some(HealthState::Healthy)
        );
    }

    #[test]
    fn newly_infected_agents_do_not_spread_in_the_same_step() {
        // 0 reaches 1, 1 reaches 2, 0 does not reach 2.
        let mut carrier = Agent::new(AgentId(0), Position::new(0.0, 0.0), (1.0, 0.0), 0.0, true);
        carrier.infect();
        let agents = vec![
            carrier,
            Agent::new(AgentId(1), Position::new(8.0, 0.0), (1.0, 0.0), 0.0, true),
            Agent::new(AgentId(2), Position::new(16.0, 0.0), (1.0, 0.0), 0.0, true),
        ];
        let mut engine =
            SimulationEngine::from_population(small_config(3), space(), agents).unwrap();
        let mut sink = MemorySink::new();

        engine.step(&mut sink).unwrap();
        assert_eq!(engine.agent(AgentId(1)).map(Agent::state), Some(HealthState::Infected));
        assert_eq!(engine.agent(AgentId(2)).map(Agent::state), Some(HealthState::Healthy));

        engine.step(&mut sink).unwrap();
        assert_eq!(engine.agent(AgentId(2)).map(Agent::state), Some(HealthState::Infected));
        assert_eq!(engine.agent(AgentId(1)).map(Agent::recovery_timer), Some(1));
    }

    #[test]
    fn infection_uses_post_move_positions() {
        // 22 apart before the move, 7 apart after it.
        let mut carrier = Agent::new(AgentId(0), Position::new(0.0, 0.0), (1.0, 0.0), 15.0, false);
        carrier.infect();
        let target = Agent::new(AgentId(1), Position::new(22.0, 0.0), (1.0, 0.0), 0.0, true);
        let mut engine =
            SimulationEngine::from_population(small_config(2), space(), vec![carrier, target])
                .unwrap();
        let mut sink = MemorySink::new();

        let summary = engine.step(&mut sink).unwrap();
        assert_eq!(summary.moved, 1);
        assert_eq!(summary.infected, 1);
        assert_eq!(engine.agent(AgentId(1)).map(Agent::state), Some(HealthState::Infected));
    }

    /// A carrier at the origin and a healthy agent closing in from x = 30 at
    /// 12 per step, reaching x = 6 on the second step.
    fn approach(recovery_threshold: u32) -> SimulationEngine {
        let mut carrier = Agent::new(AgentId(0), Position::new(0.0, 0.0), (1.0, 0.0), 0.0, true);
        carrier.infect();
        let target = Agent::new(AgentId(1), Position::new(30.0, 0.0), (-1.0, 0.0), 12.0, false);
        let config = ModelConfig {
            recovery_threshold,
            ..small_config(2)
        };
        let mut engine =
            SimulationEngine::from_population(config, space(), vec![carrier, target]).unwrap();
        let mut sink = MemorySink::new();
        engine.step(&mut sink).unwrap();
        engine.step(&mut sink).unwrap();
        engine
    }

    #[test]
    fn carrier_recovering_this_step_does_not_infect() {
        let engine = approach(2);
        assert_eq!(engine.agent(AgentId(0)).map(Agent::state), Some(HealthState::Recovered));
        assert_eq!(engine.agent(AgentId(1)).map(Agent::state), Some(HealthState::Healthy));

        let engine = approach(3);
        assert_eq!(engine.agent(AgentId(0)).map(Agent::state), Some(HealthState::Infected));
        assert_eq!(engine.agent(AgentId(1)).map(Agent::state), Some(HealthState::Infected));
    }

    #[test]
    fn overlapping_sources_infect_once() {
        let mut a = Agent::new(AgentId(0), Position::new(0.0, 0.0), (1.0, 0.0), 0.0, true);
        let mut b = Agent::new(AgentId(1), Position::new(4.0, 0.0), (1.0, 0.0), 0.0, true);
        a.infect();
        b.infect();
        let target = Agent::new(AgentId(2), Position::new(2.0, 0.0), (1.0, 0.0), 0.0, true);
        let mut engine =
            SimulationEngine::from_population(small_config(3), space(), vec![a, b, target])
                .unwrap();
        let mut sink = MemorySink::new();

        let summary = engine.step(&mut sink).unwrap();
        assert_eq!(summary.infected, 1);
        assert_eq!(summary.counts.infected, 3);
        let target = engine.agent(AgentId(2)).unwrap();
        assert_eq!(target.state(), HealthState::Infected);
        assert_eq!(target.recovery_timer(), 0);
    }

    #[test]
    fn sink_failure_leaves_engine_untouched() {
        let mut engine = SimulationEngine::new(small_config(20)).unwrap();
        let before: Vec<Agent> = engine.agents().to_vec();
        let err = engine.step(&mut RejectingSink).unwrap_err();
        assert!(matches!(err, EngineError::Sink { .. }));
        assert_eq!(engine.current_step(), 0);
        assert_eq!(engine.agents(), before.as_slice());

        // The next successful step matches a fresh engine's first step.
        let mut fresh = SimulationEngine::new(small_config(20)).unwrap();
        let mut a = MemorySink::new();
        let mut b = MemorySink::new();
        engine.step(&mut a).unwrap();
        fresh.step(&mut b).unwrap();
        assert_eq!(engine.agents(), fresh.agents());
    }

    #[test]
    fn snapshots_are_taken_before_the_step() {
        let mut engine = SimulationEngine::new(small_config(10)).unwrap();
        let expected = engine.snapshot();
        let mut sink = MemorySink::new();
        engine.step(&mut sink).unwrap();
        assert_eq!(sink.records(engine.stream_key()), expected.as_slice());
        assert!(expected.iter().all(|r| r.step == 0));
    }

    #[test]
    fn custom_stream_key() {
        let engine = SimulationEngine::new(small_config(3))
            .unwrap()
            .with_stream_key(&[StreamKeyField::NumAgents, StreamKeyField::Seed]);
        assert_eq!(engine.stream_key(), "num_agents=3,seed=42");
    }

    #[test]
    fn grid_engine_matches_scanning_engine() {
        let config = ModelConfig {
            num_agents: 150,
            p_stationary: 0.2,
            ..ModelConfig::default()
        };
        let mut scan = SimulationEngine::new(config.clone()).unwrap();
        let mut grid = SimulationEngine::with_grid(config).unwrap();
        let mut a = MemorySink::new();
        let mut b = MemorySink::new();
        for _ in 0..60 {
            let sa = scan.step(&mut a).unwrap();
            let sb = grid.step(&mut b).unwrap();
            assert_eq!(sa, sb);
        }
        assert_eq!(a.records(scan.stream_key()), b.records(grid.stream_key()));
    }
}
