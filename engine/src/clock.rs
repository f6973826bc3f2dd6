//! The authoritative clock: the sole writer of round phase and multiplier.
//!
//! The state machine is steppable: `tick(now)` performs exactly one
//! transition check and returns the events it published plus the next sleep,
//! so the long-lived task is a thin loop and tests drive rounds without
//! real time. A leader guard makes starting the clock idempotent, and a
//! panicked step backs off and retries instead of killing the game.

use aviator_types::{now_ms, Event, Phase};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::backoff::jittered_backoff;
use crate::round::{pace, ActiveRound};
use crate::store::ArchivedRound;
use crate::{Engine, EngineState};

const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// One clock step: the events published during it and how long to sleep
/// before the next step.
#[derive(Debug)]
pub struct Tick {
    pub events: Vec<Event>,
    pub next: Duration,
}

impl Tick {
    fn idle() -> Self {
        Self {
            events: Vec::new(),
            next: Duration::from_millis(25),
        }
    }
}

impl Engine {
    /// Starts the clock task. Idempotent: exactly one clock runs per
    /// engine; later requests are no-ops and return false.
    pub fn spawn_clock(self: &Arc<Self>) -> bool {
        if self
            .clock_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("clock already running; ignoring start request");
            return false;
        }
        let engine = Arc::clone(self);
        tokio::spawn(engine.run_clock());
        true
    }

    async fn run_clock(self: Arc<Self>) {
        info!("round clock started");
        let mut rng = StdRng::from_entropy();
        loop {
            let step = std::panic::catch_unwind(AssertUnwindSafe(|| self.tick(Instant::now())));
            match step {
                Ok(tick) => tokio::time::sleep(tick.next).await,
                Err(_) => {
                    error!("clock step panicked; backing off before retry");
                    tokio::time::sleep(jittered_backoff(&mut rng, ERROR_BACKOFF)).await;
                }
            }
        }
    }

    /// Advances the state machine by at most one transition. Exposed so the
    /// clock task and tests share one code path.
    pub fn tick(&self, now: Instant) -> Tick {
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.state();
        let state = &mut *guard;
        match state.active.as_ref().map(|round| round.phase) {
            None => self.open_round(state, now),
            Some(Phase::Betting) => self.tick_betting(state, now),
            Some(Phase::Running) => self.tick_running(state, now),
            Some(Phase::Crashed) => self.tick_crashed(state, now),
        }
    }

    /// Creates the next round: claims the crash value (override or sample)
    /// before any client can observe the round.
    fn open_round(&self, state: &mut EngineState, now: Instant) -> Tick {
        let crash_multiplier = self.source.next_value();
        let round_id = state.next_round_id;
        state.next_round_id += 1;
        let window = self.config.betting_window_ms;
        state.active = Some(ActiveRound::open(round_id, crash_multiplier, window, now));
        self.counters.rounds_opened.fetch_add(1, Ordering::Relaxed);
        info!(round_id, "betting open");

        let event = Event::BettingOpen {
            round_id,
            countdown_ms: window,
        };
        self.hub.publish(event.clone());
        Tick {
            events: vec![event],
            next: Duration::from_millis(window),
        }
    }

    fn tick_betting(&self, state: &mut EngineState, now: Instant) -> Tick {
        let Some(round) = state.active.as_mut() else {
            return Tick::idle();
        };
        let remaining = round.betting_ends_at.saturating_duration_since(now);
        if !remaining.is_zero() {
            return Tick {
                events: Vec::new(),
                next: remaining,
            };
        }

        round.phase = Phase::Running;
        round.current_multiplier = Decimal::ONE;
        info!(round_id = round.id, "round started");
        let event = Event::RoundStarted { round_id: round.id };
        self.hub.publish(event.clone());
        Tick {
            events: vec![event],
            next: pace(Decimal::ONE).1,
        }
    }

    fn tick_running(&self, state: &mut EngineState, now: Instant) -> Tick {
        let EngineState {
            active,
            recent_crashes,
            ..
        } = state;
        let Some(round) = active.as_mut() else {
            return Tick::idle();
        };

        let (step, delay) = pace(round.current_multiplier);
        let next_value = aviator_types::round2(round.current_multiplier + step);
        if next_value >= round.crash_multiplier {
            // Clamp to the pre-committed crash point and finalize.
            round.current_multiplier = round.crash_multiplier;
            round.phase = Phase::Crashed;
            round.crashed_at = Some(now);
            round.ended_at_ms = Some(now_ms());
            for bet in round.bets.values_mut() {
                if bet.is_pending() {
                    bet.outcome = aviator_types::BetOutcome::Lost;
                }
            }
            recent_crashes.push_front(round.crash_multiplier);
            recent_crashes.truncate(self.config.history_len);
            self.counters.rounds_crashed.fetch_add(1, Ordering::Relaxed);
            info!(
                round_id = round.id,
                crash = %round.crash_multiplier,
                bets = round.bets.len(),
                "round crashed"
            );

            let event = Event::RoundCrashed {
                round_id: round.id,
                crash_multiplier: round.crash_multiplier,
            };
            self.hub.publish(event.clone());
            if let Some(archive) = &self.archive {
                archive.archive(ArchivedRound {
                    round: round.record(),
                    bets: round.bets.values().cloned().collect(),
                });
            }
            return Tick {
                events: vec![event],
                next: Duration::from_millis(self.config.intermission_ms),
            };
        }

        round.current_multiplier = next_value;
        round.sequence += 1;
        let mut events = self.sweep_auto_cashouts(round);
        let tick_event = Event::MultiplierTick {
            round_id: round.id,
            multiplier: round.current_multiplier,
            sequence: round.sequence,
        };
        self.hub.publish(tick_event.clone());
        events.push(tick_event);
        Tick {
            events,
            next: delay,
        }
    }

    fn tick_crashed(&self, state: &mut EngineState, now: Instant) -> Tick {
        let intermission = Duration::from_millis(self.config.intermission_ms);
        let remaining = state
            .active
            .as_ref()
            .and_then(|round| round.crashed_at)
            .map(|crashed_at| {
                intermission.saturating_sub(now.saturating_duration_since(crashed_at))
            })
            .unwrap_or(Duration::ZERO);
        if remaining.is_zero() {
            self.open_round(state, now)
        } else {
            Tick {
                events: Vec::new(),
                next: remaining,
            }
        }
    }
}
