//! Seeded creation of the initial population.
//!
//! Agents are drawn in id order from a single random source. Each agent
//! consumes exactly five draws, in this order:
//!
//! 1. `x` uniform in `[0, width)`
//! 2. `y` uniform in `[0, height)`
//! 3. heading `x` component uniform in `[-1, 1)`
//! 4. heading `y` component uniform in `[-1, 1)`
//! 5. stationary roll: stationary iff the draw is below `p_stationary`
//!
//! Agent `0` is the seed carrier: its draws are consumed like everyone
//! else's, but it starts infected and is never stationary.

use contagion_agents::Agent;
use contagion_types::{AgentId, Position};
use rand::Rng;
use tracing::info;

use crate::config::ModelConfig;

/// Build the starting population for `config`.
///
/// The agents are not yet registered in any spatial index.
pub fn spawn_population<R: Rng + ?Sized>(config: &ModelConfig, rng: &mut R) -> Vec<Agent> {
    let mut agents = Vec::with_capacity(usize::try_from(config.num_agents).unwrap_or(0));

    for i in 0..config.num_agents {
        let x = rng.random::<f64>() * config.width;
        let y = rng.random::<f64>() * config.height;
        let hx = rng.random::<f64>().mul_add(2.0, -1.0);
        let hy = rng.random::<f64>().mul_add(2.0, -1.0);
        let stationary = rng.random::<f64>() < config.p_stationary;

        let position = Position::new(x, y);
        let agent = if i == 0 {
            Agent::patient_zero(position, (hx, hy), config.speed)
        } else {
            Agent::new(AgentId(i), position, (hx, hy), config.speed, stationary)
        };
        agents.push(agent);
    }

    let stationary = agents.iter().filter(|a| a.is_stationary()).count();
    info!(
        agents = agents.len(),
        stationary,
        seed = config.seed,
        "Population spawned"
    );

    agents
}
