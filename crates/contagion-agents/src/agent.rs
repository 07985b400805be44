//! The agent record and its per-step behavior.
//!
//! An [`Agent`] carries its own kinematics (position, fixed unit heading,
//! speed, stationary flag) and its epidemiological state. The engine drives
//! each agent through three phases every step:
//!
//! 1. [`Agent::advance`] -- move along the heading, wrapped by the index
//! 2. [`Agent::recover_check`] -- tick the infection timer, maybe recover
//! 3. [`Agent::contacts`] + [`Agent::infect`] -- spread to healthy neighbors
//!
//! State changes go through [`Agent::transition_to`], which only permits the
//! single forward steps `Healthy -> Infected -> Recovered`.

use contagion_types::{AgentId, AgentSnapshot, HealthState, Heading, Position};
use contagion_world::SpatialIndex;
use tracing::warn;

use crate::error::AgentError;

/// A single mobile agent.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    id: AgentId,
    position: Position,
    heading: Heading,
    speed: f64,
    state: HealthState,
    recovery_timer: u32,
    stationary: bool,
}

impl Agent {
    /// Create a healthy agent.
    ///
    /// `raw_heading` is normalized into a unit vector. A zero-length or
    /// non-finite direction falls back to [`Heading::EAST`] and logs a
    /// warning. A negative or non-finite `speed` is clamped to `0.0`.
    pub fn new(
        id: AgentId,
        position: Position,
        raw_heading: (f64, f64),
        speed: f64,
        stationary: bool,
    ) -> Self {
        let (hx, hy) = raw_heading;
        let heading = Heading::from_components(hx, hy).unwrap_or_else(|| {
            warn!(
                agent_id = %id,
                raw_x = hx,
                raw_y = hy,
                "Degenerate heading, falling back to (1, 0)"
            );
            Heading::EAST
        });
        let speed = if speed.is_finite() && speed > 0.0 {
            speed
        } else {
            0.0
        };

        Self {
            id,
            position,
            heading,
            speed,
            state: HealthState::Healthy,
            recovery_timer: 0,
            stationary,
        }
    }

    /// Create the seed carrier: id `0`, already infected, never stationary.
    pub fn patient_zero(position: Position, raw_heading: (f64, f64), speed: f64) -> Self {
        let mut agent = Self::new(AgentId(0), position, raw_heading, speed, false);
        agent.state = HealthState::Infected;
        agent
    }

    // -- accessors ------------------------------------------------------

    /// The agent's id.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Current (wrapped, once placed) position.
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Fixed unit heading.
    pub const fn heading(&self) -> Heading {
        self.heading
    }

    /// Distance covered per step when not stationary.
    pub const fn speed(&self) -> f64 {
        self.speed
    }

    /// Current epidemiological state.
    pub const fn state(&self) -> HealthState {
        self.state
    }

    /// Steps spent infected so far.
    pub const fn recovery_timer(&self) -> u32 {
        self.recovery_timer
    }

    /// Whether the agent never moves.
    pub const fn is_stationary(&self) -> bool {
        self.stationary
    }

    /// Whether the agent is currently infected.
    pub const fn is_infected(&self) -> bool {
        matches!(self.state, HealthState::Infected)
    }

    // -- index registration ---------------------------------------------

    /// Register this agent in `space` at its current position.
    ///
    /// The stored (wrapped) position is written back into the agent.
    ///
    /// # Errors
    ///
    /// Propagates [`contagion_world::WorldError`] from the index, e.g. a
    /// duplicate id or a non-finite position.
    pub fn place(&mut self, space: &mut dyn SpatialIndex) -> Result<(), AgentError> {
        self.position = space.place_agent(self.id, self.position)?;
        Ok(())
    }

    // -- per-step behavior ----------------------------------------------

    /// Move one step along the heading, wrapping through `space`.
    ///
    /// Stationary agents do not move and the index is left untouched.
    /// Returns `true` if the agent moved.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::World`] if the agent is not registered in
    /// `space` or the target position is not finite.
    pub fn advance(&mut self, space: &mut dyn SpatialIndex) -> Result<bool, AgentError> {
        if self.stationary {
            return Ok(false);
        }
        let target = self.position.advanced(self.heading, self.speed);
        self.position = space.move_agent(self.id, target)?;
        Ok(true)
    }

    /// Advance the infection timer and recover once it reaches `threshold`.
    ///
    /// Does nothing unless the agent is infected. Returns `true` if the agent
    /// recovered during this call.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ArithmeticOverflow`] if the timer would exceed
    /// `u32::MAX`.
    pub fn recover_check(&mut self, threshold: u32) -> Result<bool, AgentError> {
        if self.state != HealthState::Infected {
            return Ok(false);
        }
        self.recovery_timer =
            self.recovery_timer
                .checked_add(1)
                .ok_or_else(|| AgentError::ArithmeticOverflow {
                    agent: self.id,
                    context: String::from("recovery timer increment overflow"),
                })?;
        if self.recovery_timer >= threshold {
            self.transition_to(HealthState::Recovered)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Ids of every other agent within `radius` of this agent's position.
    ///
    /// Ascending id order; the agent itself is excluded.
    pub fn contacts(&self, space: &dyn SpatialIndex, radius: f64) -> Vec<AgentId> {
        space
            .neighbors_within(self.position, radius)
            .into_iter()
            .filter(|other| *other != self.id)
            .collect()
    }

    /// Infect this agent if it is healthy.
    ///
    /// Returns `true` if the state changed; infecting an infected or
    /// recovered agent is a no-op.
    pub const fn infect(&mut self) -> bool {
        if !matches!(self.state, HealthState::Healthy) {
            return false;
        }
        self.state = HealthState::Infected;
        true
    }

    /// Move to `next`, enforcing the one-way progression.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::IllegalTransition`] unless `next` is the single
    /// forward step from the current state.
    pub const fn transition_to(&mut self, next: HealthState) -> Result<(), AgentError> {
        if !self.state.can_become(next) {
            return Err(AgentError::IllegalTransition {
                agent: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Observable record of this agent at `step`.
    pub fn snapshot(&self, step: u64) -> AgentSnapshot {
        AgentSnapshot {
            unique_id: self.id,
            step,
            state: self.state,
            x: self.position.x,
            y: self.position.y,
            social_distancing: u8::from(self.stationary),
            recovery_time: self.recovery_timer,
        }
    }
}
