//! Arena driver: plays a [`Sequencer`] on a wall-clock cadence.
//!
//! The sequencer decides what happens and how long to wait; this crate only
//! waits. A run is a lazy [`Stream`] of [`RunEvent`]s: nothing is computed
//! until the stream is polled, and dropping it cancels the run without
//! leaving a timer or task behind.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use fixr_core::{Agent, FinalResult, RandomSource, RunEvent, Sequencer};
use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, info};

struct Driver<S> {
    sequencer: Sequencer,
    source: S,
    pending: VecDeque<RunEvent>,
    pause: Duration,
    finished: bool,
}

/// Play `sequencer` to the end, suspending between steps.
///
/// The stream ends right after [`RunEvent::Completed`].
pub fn negotiate<S>(sequencer: Sequencer, source: S) -> impl Stream<Item = RunEvent> + Send
where
    S: RandomSource + Send + 'static,
{
    let driver = Driver {
        sequencer,
        source,
        pending: VecDeque::new(),
        pause: Duration::ZERO,
        finished: false,
    };
    stream::unfold(driver, |mut driver| async move {
        loop {
            if let Some(event) = driver.pending.pop_front() {
                return Some((event, driver));
            }
            if driver.finished {
                return None;
            }
            if !driver.pause.is_zero() {
                tokio::time::sleep(driver.pause).await;
            }
            let step = driver.sequencer.advance(&mut driver.source);
            driver.pending.extend(step.events);
            match step.pause {
                Some(pause) => driver.pause = pause,
                None => driver.finished = true,
            }
        }
    })
}

/// Like [`negotiate`], but the run is abandoned as soon as `cancel` resolves.
///
/// Once cancelled the stream yields `None`; no further event is produced and
/// no further suspension is scheduled.
pub fn negotiate_until<S, F>(
    sequencer: Sequencer,
    source: S,
    cancel: F,
) -> impl Stream<Item = RunEvent> + Send
where
    S: RandomSource + Send + 'static,
    F: Future + Send,
    F::Output: Send,
{
    negotiate(sequencer, source).take_until(cancel)
}

/// Everything a run showed, accumulated event by event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTranscript {
    pub lines: Vec<String>,
    pub offers: Vec<u64>,
    /// Board minimum after each round (and the opening offer).
    pub best_offers: Vec<u64>,
    pub rounds: u32,
    pub standings: Vec<Agent>,
    pub progress: f64,
    pub result: Option<FinalResult>,
}

impl RunTranscript {
    pub fn record(&mut self, event: &RunEvent) {
        match event {
            RunEvent::Line(line) => self.lines.push(line.clone()),
            RunEvent::RoundStarted { round, .. } => self.rounds = *round,
            RunEvent::Offer { amount, .. } => self.offers.push(*amount),
            RunEvent::BestOffer { amount, .. } => self.best_offers.push(*amount),
            RunEvent::Standings(agents) => self.standings = agents.clone(),
            RunEvent::Progress { percent } => self.progress = *percent,
            RunEvent::Completed(result) => self.result = Some(result.clone()),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }
}

/// Play a run to the end and collect what it showed.
pub async fn run_to_completion<S>(sequencer: Sequencer, source: S) -> RunTranscript
where
    S: RandomSource + Send + 'static,
{
    let events = negotiate(sequencer, source);
    futures::pin_mut!(events);
    let mut transcript = RunTranscript::default();
    while let Some(event) = events.next().await {
        if let RunEvent::RoundStarted { round, total } = &event {
            debug!(round, total, "round started");
        }
        transcript.record(&event);
    }
    info!(
        rounds = transcript.rounds,
        offers = transcript.offers.len(),
        complete = transcript.is_complete(),
        "run finished"
    );
    transcript
}
