//! The negotiation sequencer.
//!
//! A pure state machine: every [`Sequencer::advance`] call performs one step
//! of the script and returns the events it produced together with how long
//! the driver should wait before the next call. The sequencer itself never
//! sleeps, spawns, or reads the clock except through its injected clock, so
//! tests can drive a whole run synchronously.
//!
//! # Script
//!
//! 1. Opening block: document analysis banner and the arena introduction.
//! 2. Rounds, `duration / rounds` apart. Each round a random 3–5 agents each
//!    undercut the current board minimum by 2%, never going below the
//!    target amount. The loop stops after the last round or once the offer
//!    cap is reached, whichever comes first.
//! 3. Final block with the negotiated terms, then a pause.
//! 4. The [`FinalResult`], after which the run is over.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::ArenaConfig;
use crate::error::Result;
use crate::model::{Agent, FinalResult, RunInput};
use crate::money::{format_inr, format_lakhs, format_percent, savings_percent};
use crate::random::RandomSource;
use crate::terms::{Terms, resolve_terms};

/// Shown once while "connecting" and once after the last round.
pub const PROGRESS_BAR: &str = "[████████████████████████████████] 100%";

/// Something the front end should show.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// A terminal line (may be empty).
    Line(String),
    RoundStarted { round: u32, total: u32 },
    Offer {
        agent_id: u32,
        agent: String,
        amount: u64,
        /// One-decimal text, e.g. `"4.0"`.
        savings_percent: String,
    },
    /// The lowest offer on the board after a round.
    BestOffer { amount: u64, agent: Option<String> },
    /// Agent board after a round.
    Standings(Vec<Agent>),
    Progress { percent: f64 },
    Completed(FinalResult),
}

/// Output of one [`Sequencer::advance`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub events: Vec<RunEvent>,
    /// How long to suspend before advancing again; `None` once the run is over.
    pub pause: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Opening,
    Rounds,
    Complete,
    Done,
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct Sequencer {
    config: ArenaConfig,
    file_name: String,
    terms: Terms,
    agents: Vec<Agent>,
    /// Next round to play, 1-based.
    round: u32,
    offers_emitted: u32,
    best_agent: Option<String>,
    log: Vec<String>,
    phase: Phase,
    clock: Clock,
}

impl Sequencer {
    /// Validate the run parameters and resolve the terms to steer toward.
    pub fn new<S: RandomSource + ?Sized>(
        input: &RunInput,
        config: ArenaConfig,
        source: &mut S,
    ) -> Result<Self> {
        config.validate()?;
        let terms = resolve_terms(input, source)?;
        let agents = Agent::roster(config.agent_count, terms.original_amount);
        info!(
            file = %input.file_name,
            original = terms.original_amount,
            target = terms.new_amount,
            agents = agents.len(),
            rounds = config.total_rounds,
            "negotiation run prepared"
        );
        Ok(Self {
            config,
            file_name: input.file_name.clone(),
            terms,
            agents,
            round: 1,
            offers_emitted: 0,
            best_agent: None,
            log: Vec::new(),
            phase: Phase::Opening,
            clock: Box::new(Utc::now),
        })
    }

    /// Replace the clock used to stamp the result.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn terms(&self) -> &Terms {
        &self.terms
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Every line emitted so far, in order.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn rounds_played(&self) -> u32 {
        self.round - 1
    }

    pub fn offers_emitted(&self) -> u32 {
        self.offers_emitted
    }

    /// Lowest offer any agent has made so far.
    pub fn best_offer(&self) -> u64 {
        self.agents
            .iter()
            .map(|a| a.best_offer)
            .min()
            .unwrap_or(self.terms.original_amount)
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Perform the next step of the script.
    pub fn advance<S: RandomSource>(&mut self, source: &mut S) -> Step {
        match self.phase {
            Phase::Opening => {
                let events = self.opening();
                self.phase = Phase::Rounds;
                Step {
                    events,
                    pause: Some(Duration::ZERO),
                }
            }
            Phase::Rounds if self.rounds_remain() => {
                let events = self.play_round(source);
                Step {
                    events,
                    pause: Some(self.config.round_delay()),
                }
            }
            Phase::Rounds => {
                let events = self.reveal();
                self.phase = Phase::Complete;
                Step {
                    events,
                    pause: Some(self.config.reveal_delay()),
                }
            }
            Phase::Complete => {
                let result = self.terms.clone().into_result((self.clock)());
                info!(
                    rounds = self.rounds_played(),
                    offers = self.offers_emitted,
                    new_amount = result.new_amount,
                    savings = result.savings,
                    "negotiation complete"
                );
                self.phase = Phase::Done;
                Step {
                    events: vec![RunEvent::Completed(result)],
                    pause: None,
                }
            }
            Phase::Done => Step {
                events: Vec::new(),
                pause: None,
            },
        }
    }

    fn rounds_remain(&self) -> bool {
        self.round <= self.config.total_rounds && self.offers_emitted < self.config.max_offers
    }

    fn opening(&mut self) -> Vec<RunEvent> {
        let terms = &self.terms;
        let lines = vec![
            format!("> Analyzing {}...", self.file_name),
            "> Document parsed successfully.".to_string(),
            "> Extracting loan offer details...".to_string(),
            format!(
                "> Current loan amount: {} detected",
                format_lakhs(terms.original_amount)
            ),
            format!("> Interest rate: {}", terms.interest_rate),
            format!("> Tenure: {}", terms.tenure),
            String::new(),
            "> Preparing for LOAN ARENA BATTLE...".to_string(),
            "> Loading negotiation protocols...".to_string(),
            "> Initializing AI agents...".to_string(),
            "> Connecting to lender network...".to_string(),
            format!("> {PROGRESS_BAR}"),
            String::new(),
            "> LOAN ARENA BATTLE INITIATED".to_string(),
            format!("> {} agents entering the arena...", self.agents.len()),
            format!("> Original offer: {}", format_inr(terms.original_amount)),
            String::new(),
            "> ROUND 1: Initial Offers".to_string(),
        ];
        let mut events = Vec::with_capacity(lines.len() + 3);
        events.push(RunEvent::Progress { percent: 0.0 });
        events.push(RunEvent::BestOffer {
            amount: self.terms.original_amount,
            agent: None,
        });
        events.push(RunEvent::Standings(self.agents.clone()));
        for line in lines {
            self.emit(&mut events, line);
        }
        events
    }

    fn play_round<S: RandomSource>(&mut self, source: &mut S) -> Vec<RunEvent> {
        let round = self.round;
        let total = self.config.total_rounds;
        let original = self.terms.original_amount;
        let target = self.terms.new_amount;

        let mut events = vec![RunEvent::RoundStarted { round, total }];
        self.emit(&mut events, format!("> ROUND {round}: Negotiation Phase"));

        let mut active: Vec<usize> = (0..self.agents.len())
            .filter(|&i| self.agents[i].is_active)
            .collect();
        let budget = (self.config.max_offers - self.offers_emitted) as usize;
        let count = source
            .next_in(
                self.config.min_agents_per_round,
                self.config.max_agents_per_round,
            )
            .min(active.len())
            .min(budget);
        source.shuffle(&mut active);

        for &idx in active.iter().take(count) {
            let board_best = self.best_offer();
            let offer = next_offer(board_best, target);
            self.agents[idx].record_offer(offer);
            if offer < board_best {
                self.best_agent = Some(self.agents[idx].name.clone());
            }

            let agent = &self.agents[idx];
            let percent = savings_percent(original, offer);
            let line = format!(
                "> {}: {} ({}% savings)",
                agent.name,
                format_inr(offer),
                percent
            );
            let event = RunEvent::Offer {
                agent_id: agent.id,
                agent: agent.name.clone(),
                amount: offer,
                savings_percent: percent,
            };
            self.emit(&mut events, line);
            events.push(event);
            self.offers_emitted += 1;
        }

        let best = self.best_offer();
        self.emit(
            &mut events,
            format!(
                "> Best offer so far: {} ({}% savings)",
                format_inr(best),
                savings_percent(original, best)
            ),
        );
        self.emit(&mut events, String::new());
        events.push(RunEvent::BestOffer {
            amount: best,
            agent: self.best_agent.clone(),
        });
        events.push(RunEvent::Standings(self.agents.clone()));
        events.push(RunEvent::Progress {
            percent: f64::from(round) / f64::from(total) * 100.0,
        });

        debug!(
            round,
            selected = count,
            offers = self.offers_emitted,
            best,
            "round played"
        );
        self.round += 1;
        events
    }

    fn reveal(&mut self) -> Vec<RunEvent> {
        let terms = &self.terms;
        let lines = vec![
            String::new(),
            "> NEGOTIATION COMPLETE".to_string(),
            "> Processing final results...".to_string(),
            format!("> {PROGRESS_BAR}"),
            String::new(),
            "> FINAL RESULT REVEALED".to_string(),
            format!("> Original offer: {}", format_inr(terms.original_amount)),
            format!("> Negotiated offer: {}", format_inr(terms.new_amount)),
            format!(
                "> Total savings: {} ({}%)",
                format_inr(terms.savings),
                format_percent(terms.savings_percentage)
            ),
            format!("> Interest rate: {}", terms.interest_rate),
            format!("> Tenure: {}", terms.tenure),
            format!("> Provider: {}", terms.provider),
            String::new(),
            "> LOAN ARENA BATTLE VICTORY ACHIEVED!".to_string(),
            "> Processing results...".to_string(),
        ];
        let mut events = Vec::with_capacity(lines.len() + 1);
        for line in lines {
            self.emit(&mut events, line);
        }
        events.push(RunEvent::Progress { percent: 100.0 });
        events
    }

    fn emit(&mut self, events: &mut Vec<RunEvent>, line: String) {
        self.log.push(line.clone());
        events.push(RunEvent::Line(line));
    }
}

/// Undercut `current_best` by 2%, never going below `target`.
pub fn next_offer(current_best: u64, target: u64) -> u64 {
    let factor = (1.0 - (target as f64 / current_best as f64) * 0.02).min(0.98);
    let candidate = (current_best as f64 * factor).round() as u64;
    candidate.max(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{ScriptedSource, seeded};
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn backend_input() -> RunInput {
        RunInput {
            original_amount: Some(2_000_000),
            new_amount: Some(1_560_000),
            savings_percentage: Some(22.0),
            ..RunInput::new("offer.pdf")
        }
    }

    fn sequencer<S: RandomSource>(input: &RunInput, config: ArenaConfig, source: &mut S) -> Sequencer {
        Sequencer::new(input, config, source)
            .unwrap()
            .with_clock(fixed_time)
    }

    /// Drive a run to the end, ignoring pauses.
    fn drain<S: RandomSource>(seq: &mut Sequencer, source: &mut S) -> Vec<RunEvent> {
        let mut events = Vec::new();
        loop {
            let step = seq.advance(source);
            events.extend(step.events);
            if step.pause.is_none() {
                return events;
            }
        }
    }

    fn lines(events: &[RunEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Line(l) => Some(l.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn next_offer_undercuts_by_two_percent() {
        assert_eq!(next_offer(2_000_000, 1_560_000), 1_960_000);
        assert_eq!(next_offer(1_960_000, 1_560_000), 1_920_800);
    }

    #[test]
    fn next_offer_clamps_to_target() {
        assert_eq!(next_offer(1_570_000, 1_560_000), 1_560_000);
        assert_eq!(next_offer(1_560_000, 1_560_000), 1_560_000);
    }

    #[test]
    fn opening_block_text() {
        let mut source = ScriptedSource::new([0.0]);
        let mut seq = sequencer(&backend_input(), ArenaConfig::default(), &mut source);
        let step = seq.advance(&mut source);
        assert_eq!(step.pause, Some(Duration::ZERO));
        let text = lines(&step.events);
        assert_eq!(text[0], "> Analyzing offer.pdf...");
        assert_eq!(text[3], "> Current loan amount: ₹20.0L detected");
        assert_eq!(text[4], "> Interest rate: 12.5%");
        assert_eq!(text[5], "> Tenure: 36 months");
        assert_eq!(text[11], "> [████████████████████████████████] 100%");
        assert_eq!(text[14], "> 12 agents entering the arena...");
        assert_eq!(text[15], "> Original offer: ₹20,00,000");
        assert_eq!(text[17], "> ROUND 1: Initial Offers");
        assert_eq!(text.len(), 18);
    }

    #[test]
    fn scripted_first_round() {
        // All-zero samples: 3 agents, and the shuffle rotates the roster left.
        let mut source = ScriptedSource::new([0.0]);
        let mut seq = sequencer(&backend_input(), ArenaConfig::default(), &mut source);
        seq.advance(&mut source);
        let step = seq.advance(&mut source);
        assert_eq!(step.pause, Some(ArenaConfig::default().round_delay()));
        assert_eq!(
            lines(&step.events),
            vec![
                "> ROUND 1: Negotiation Phase",
                "> Agent_Beta: ₹19,60,000 (2.0% savings)",
                "> Agent_Gamma: ₹19,20,800 (4.0% savings)",
                "> Agent_Delta: ₹18,82,384 (5.9% savings)",
                "> Best offer so far: ₹18,82,384 (5.9% savings)",
                "",
            ]
        );
        assert!(step.events.contains(&RunEvent::BestOffer {
            amount: 1_882_384,
            agent: Some("Agent_Delta".into()),
        }));
        assert_eq!(seq.offers_emitted(), 3);
        assert_eq!(seq.rounds_played(), 1);
        assert_eq!(seq.agents()[1].best_offer, 1_960_000);
        assert_eq!(seq.agents()[0].best_offer, 2_000_000);
    }

    #[test]
    fn final_block_and_result() {
        let mut source = seeded(3);
        let mut seq = sequencer(&backend_input(), ArenaConfig::default(), &mut source);
        let events = drain(&mut seq, &mut source);
        let text = lines(&events);
        let tail = &text[text.len() - 15..];
        assert_eq!(
            tail,
            [
                "",
                "> NEGOTIATION COMPLETE",
                "> Processing final results...",
                "> [████████████████████████████████] 100%",
                "",
                "> FINAL RESULT REVEALED",
                "> Original offer: ₹20,00,000",
                "> Negotiated offer: ₹15,60,000",
                "> Total savings: ₹4,40,000 (22%)",
                "> Interest rate: 12.5%",
                "> Tenure: 36 months",
                "> Provider: AI Negotiated Lender",
                "",
                "> LOAN ARENA BATTLE VICTORY ACHIEVED!",
                "> Processing results...",
            ]
        );

        let Some(RunEvent::Completed(result)) = events.last() else {
            panic!("run must end with the final result");
        };
        assert_eq!(result.savings, 440_000);
        assert_eq!(result.savings_percentage, 22.0);
        assert_eq!(format_lakhs(result.new_amount), "₹15.6L");
        assert_eq!(result.processed_at, "2026-10-18T12:00:00.000Z");
        assert_eq!(result.file_name, "offer.pdf");
    }

    #[test]
    fn exactly_one_result_then_silence() {
        let mut source = seeded(11);
        let mut seq = sequencer(&RunInput::new("offer.pdf"), ArenaConfig::default(), &mut source);
        let events = drain(&mut seq, &mut source);
        let completed = events
            .iter()
            .filter(|e| matches!(e, RunEvent::Completed(_)))
            .count();
        assert_eq!(completed, 1);
        assert!(matches!(events.last(), Some(RunEvent::Completed(_))));
        assert!(seq.is_finished());

        for _ in 0..3 {
            let step = seq.advance(&mut source);
            assert!(step.events.is_empty());
            assert_eq!(step.pause, None);
        }
    }

    #[test]
    fn termination_bounds_hold() {
        for seed in 0..40 {
            let mut source = seeded(seed);
            let config = ArenaConfig::default();
            let mut seq = sequencer(&RunInput::new("offer.pdf"), config.clone(), &mut source);
            let events = drain(&mut seq, &mut source);

            let offers = events
                .iter()
                .filter(|e| matches!(e, RunEvent::Offer { .. }))
                .count() as u32;
            let rounds = events
                .iter()
                .filter(|e| matches!(e, RunEvent::RoundStarted { .. }))
                .count() as u32;
            assert_eq!(offers, seq.offers_emitted());
            assert_eq!(rounds, seq.rounds_played());
            assert!(offers <= config.max_offers, "seed {seed}: {offers} offers");
            assert!(rounds <= config.total_rounds, "seed {seed}: {rounds} rounds");
            assert!(offers == config.max_offers || rounds == config.total_rounds);
        }
    }

    #[test]
    fn round_cap_binds_when_offer_cap_is_loose() {
        let config = ArenaConfig {
            total_rounds: 8,
            max_offers: 1_000,
            ..Default::default()
        };
        let mut source = seeded(2);
        let mut seq = sequencer(&backend_input(), config, &mut source);
        drain(&mut seq, &mut source);
        assert_eq!(seq.rounds_played(), 8);
        assert!(seq.offers_emitted() >= 24);
        assert!(seq.offers_emitted() <= 40);
    }

    #[test]
    fn offer_cap_clips_last_round() {
        let config = ArenaConfig {
            max_offers: 7,
            ..Default::default()
        };
        // Always five agents per round: 5, then only 2 remain in the budget.
        let mut source = ScriptedSource::new([0.99]);
        let mut seq = sequencer(&backend_input(), config, &mut source);
        drain(&mut seq, &mut source);
        assert_eq!(seq.offers_emitted(), 7);
        assert_eq!(seq.rounds_played(), 2);
    }

    #[test]
    fn best_offer_never_rises_and_respects_target() {
        for seed in 0..20 {
            let mut source = seeded(seed);
            let mut seq = sequencer(&RunInput::new("offer.pdf"), ArenaConfig::default(), &mut source);
            let target = seq.terms().new_amount;
            let events = drain(&mut seq, &mut source);

            let mut last_best = u64::MAX;
            for event in &events {
                match event {
                    RunEvent::BestOffer { amount, .. } => {
                        assert!(*amount <= last_best);
                        last_best = *amount;
                    }
                    RunEvent::Offer { amount, .. } => assert!(*amount >= target),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn narrow_target_pins_every_offer() {
        let input = RunInput {
            original_amount: Some(2_000_000),
            new_amount: Some(1_990_000),
            ..RunInput::new("offer.pdf")
        };
        let mut source = seeded(4);
        let mut seq = sequencer(&input, ArenaConfig::default(), &mut source);
        let events = drain(&mut seq, &mut source);
        assert!(events.iter().all(|e| match e {
            RunEvent::Offer { amount, .. } => *amount == 1_990_000,
            _ => true,
        }));
        assert_eq!(seq.best_offer(), 1_990_000);
    }

    #[test]
    fn pauses_follow_the_script() {
        let config = ArenaConfig::default();
        let mut source = seeded(8);
        let mut seq = sequencer(&backend_input(), config.clone(), &mut source);
        let mut pauses = Vec::new();
        loop {
            let step = seq.advance(&mut source);
            pauses.push(step.pause);
            if step.pause.is_none() {
                break;
            }
        }
        let rounds = seq.rounds_played() as usize;
        assert_eq!(pauses[0], Some(Duration::ZERO));
        assert!(pauses[1..=rounds].iter().all(|p| *p == Some(config.round_delay())));
        assert_eq!(pauses[rounds + 1], Some(config.reveal_delay()));
        assert_eq!(pauses[rounds + 2], None);
        assert_eq!(pauses.len(), rounds + 3);
    }

    #[test]
    fn log_matches_emitted_lines() {
        let mut source = seeded(21);
        let mut seq = sequencer(&backend_input(), ArenaConfig::default(), &mut source);
        let events = drain(&mut seq, &mut source);
        assert_eq!(lines(&events), seq.log().iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn progress_reaches_one_hundred() {
        let mut source = seeded(13);
        let mut seq = sequencer(&backend_input(), ArenaConfig::default(), &mut source);
        let events = drain(&mut seq, &mut source);
        let progress: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Progress { percent } => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(progress.first(), Some(&0.0));
        assert_eq!(progress.last(), Some(&100.0));
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn same_seed_same_run() {
        let run = |seed| {
            let mut source = seeded(seed);
            let mut seq = sequencer(&RunInput::new("offer.pdf"), ArenaConfig::default(), &mut source);
            drain(&mut seq, &mut source)
        };
        assert_eq!(run(17), run(17));
    }

    #[test]
    fn smaller_roster() {
        let config = ArenaConfig {
            agent_count: 2,
            ..Default::default()
        };
        let mut source = seeded(1);
        let mut seq = sequencer(&backend_input(), config, &mut source);
        let events = drain(&mut seq, &mut source);
        assert!(lines(&events).contains(&"> 2 agents entering the arena..."));
        // Two offers per round, so the offer cap is hit after 25 rounds.
        assert_eq!(seq.rounds_played(), 25);
        assert_eq!(seq.offers_emitted(), 50);
    }

    #[test]
    fn invalid_input_refuses_to_start() {
        let input = RunInput {
            original_amount: Some(1_000_000),
            new_amount: Some(2_000_000),
            ..RunInput::new("offer.pdf")
        };
        assert!(Sequencer::new(&input, ArenaConfig::default(), &mut seeded(1)).is_err());

        let config = ArenaConfig {
            total_rounds: 0,
            ..Default::default()
        };
        assert!(Sequencer::new(&backend_input(), config, &mut seeded(1)).is_err());
    }
}
