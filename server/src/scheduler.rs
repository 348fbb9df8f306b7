//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The shared tick loop
//!
//! Every tick visits a snapshot of the registry. Each agent decides its own
//! cadence: it is skipped until enough time has passed for its current
//! activity, so walking and casting are not interrupted by fresh commands.
//! A failing or panicking agent is logged and counted; the rest of the tick
//! goes on.

use crate::ai::ThinkOutcome;
use crate::config::ThinkIntervals;
use crate::registry::AgentRegistry;
use crate::world::ActorStatus;
use autobot_common::{AgentSnapshot, AgentState};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Extension point for group behavior, fed read-only snapshots every tick
pub trait Coordinator: Send + Sync {
    fn coordinate(&self, agents: &[AgentSnapshot]);
}

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub visited: usize,
    pub thought: usize,
    pub not_due: usize,
    /// Skipped because another think held the agent
    pub busy: usize,
    pub offline: usize,
    pub failed: usize,
    pub panicked: usize,
    pub died: usize,
}

/// Minimum time between two thinks for an agent in this situation
pub fn think_interval(status: &ActorStatus, state: AgentState, intervals: &ThinkIntervals) -> Duration {
    if status.moving {
        intervals.moving()
    } else if state == AgentState::Combat || status.casting || status.attacking {
        intervals.combat()
    } else {
        intervals.idle()
    }
}

pub struct Scheduler {
    registry: Arc<AgentRegistry>,
    coordinator: Option<Arc<dyn Coordinator>>,
}

impl Scheduler {
    /// Create a new scheduler over `registry`
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            registry,
            coordinator: None,
        }
    }

    pub fn with_coordinator(mut self, coordinator: Arc<dyn Coordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Run one tick at `now`. Must be called from within a Tokio runtime,
    /// since deaths and cosmetic actions schedule timers.
    pub fn tick(&self, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        let context = self.registry.context();
        if !context.ai_enabled() {
            return report;
        }
        let intervals = &context.config().think;
        let mut rng = rand::rng();

        for handle in self.registry.handles() {
            report.visited += 1;
            let Some(mut agent) = handle.try_lock() else {
                report.busy += 1;
                continue;
            };
            if !agent.is_online() {
                report.offline += 1;
                continue;
            }
            let interval = context
                .actors()
                .status(agent.actor())
                .map(|status| think_interval(&status, agent.state(), intervals))
                .unwrap_or_else(|| intervals.idle());
            if !agent.is_due(now, interval) {
                report.not_due += 1;
                continue;
            }

            report.thought += 1;
            metrics::counter!("autobot_think_total").increment(1);
            let span = tracing::info_span!("think", agent = %handle.name());
            let _entered = span.enter();

            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                agent.think(context, &mut rng, now)
            }));
            drop(agent);

            match result {
                Ok(Ok(ThinkOutcome::Continue)) => {}
                Ok(Ok(ThinkOutcome::Sat)) => {
                    self.registry.schedule_stand_up(handle.name(), handle.id());
                }
                Ok(Ok(ThinkOutcome::Died)) => {
                    report.died += 1;
                    self.registry.schedule_despawn(handle.name(), handle.id());
                }
                Ok(Err(e)) => {
                    report.failed += 1;
                    metrics::counter!("autobot_think_failures_total").increment(1);
                    tracing::warn!("Think failed for {}: {}", handle.name(), e);
                }
                Err(panic) => {
                    report.panicked += 1;
                    metrics::counter!("autobot_think_panics_total").increment(1);
                    tracing::error!("Think panicked for {}: {}", handle.name(), panic_message(&*panic));
                }
            }
        }

        if let Some(coordinator) = &self.coordinator {
            coordinator.coordinate(&self.registry.list_active());
        }
        tracing::trace!("Tick complete: {:?}", report);
        report
    }

    /// Run the tick loop until `shutdown` turns true or its sender is dropped
    pub fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.registry.context().config().tick();
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!("Autobot scheduler started with a {:?} tick", period);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick(Instant::now());
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("Autobot scheduler stopped");
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Intention;
    use autobot_common::Location;

    fn status() -> ActorStatus {
        ActorStatus {
            location: Location::default(),
            health: 1.0,
            mana: 100.0,
            max_mana: 100.0,
            level: 10,
            alive: true,
            moving: false,
            casting: false,
            attacking: false,
            sitting: false,
            intention: Intention::Idle,
            target: None,
            destination: None,
            attack_range: 60.0,
            last_attacker: None,
        }
    }

    #[test]
    fn test_think_interval() {
        let intervals = ThinkIntervals::default();
        assert_eq!(
            think_interval(&status(), AgentState::Idle, &intervals),
            Duration::from_millis(2500)
        );
        assert_eq!(
            think_interval(&status(), AgentState::Combat, &intervals),
            Duration::from_millis(800)
        );
        let casting = ActorStatus {
            casting: true,
            ..status()
        };
        assert_eq!(
            think_interval(&casting, AgentState::Farming, &intervals),
            Duration::from_millis(800)
        );
        let moving = ActorStatus {
            moving: true,
            attacking: true,
            ..status()
        };
        assert_eq!(
            think_interval(&moving, AgentState::Combat, &intervals),
            Duration::from_millis(5000)
        );
    }

    #[test]
    fn test_panic_message() {
        let panic: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*panic), "boom");
        let panic: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*panic), "bang");
        let panic: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*panic), "unknown panic");
    }
}
