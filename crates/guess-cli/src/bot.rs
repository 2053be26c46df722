//! Headless players: answer every prompt on their own.

use std::collections::HashSet;
use std::time::Duration;

use guess_protocol::{GameChannels, GameEvent, Prompt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Bot behaviour knobs.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Pause before each answer.
    pub delay: Duration,
    /// Upper bound for the ranges a bot master announces.
    pub max_range: i64,
    pub rng_seed: u64,
}

/// Drive one game runtime until it stops.
pub async fn run_bot(channels: GameChannels, config: BotConfig) -> anyhow::Result<()> {
    let GameChannels {
        handle,
        mut prompts,
        mut events,
        task,
    } = channels;
    let name = handle.local_id().clone();
    let mut rng = StdRng::seed_from_u64(config.rng_seed);

    let mut guessing = false;
    let mut guesser = Guesser::default();
    let mut guess_timer = tokio::time::interval(config.delay.max(Duration::from_millis(1)));
    guess_timer.tick().await;

    tracing::info!(bot = %name, "bot started");

    loop {
        tokio::select! {
            prompt = prompts.recv() => {
                let Some(prompt) = prompt else { break };
                guessing = false;
                match prompt {
                    Prompt::Ready => {
                        tokio::time::sleep(config.delay).await;
                        handle.ready().await?;
                    }
                    Prompt::Puzzle => {
                        tokio::time::sleep(config.delay).await;
                        let (secret, low, high) = pick_puzzle(&mut rng, config.max_range);
                        tracing::info!(bot = %name, low, high, "bot thought of a number");
                        handle.puzzle(secret, low, high).await?;
                    }
                    Prompt::Guess { low, high } => {
                        // Re-sent after every guess; keep what was tried.
                        guesser.set_range(low, high);
                        guessing = true;
                    }
                    Prompt::Wait(_) => {}
                }
            }

            _ = guess_timer.tick(), if guessing => {
                match guesser.next(&mut rng) {
                    Some(n) => handle.guess(n).await?,
                    None => {
                        tracing::debug!(bot = %name, "range exhausted");
                        guessing = false;
                    }
                }
            }

            event = events.recv() => match event {
                Some(GameEvent::Stopped { reason }) => {
                    tracing::info!(bot = %name, "bot stopped: {reason}");
                }
                Some(event @ (GameEvent::RoundEnded { .. } | GameEvent::RoundAborted { .. })) => {
                    tracing::debug!(bot = %name, "{event}");
                    guesser.reset();
                }
                Some(event) => tracing::debug!(bot = %name, "{event}"),
                None => break,
            },
        }
    }

    task.await?;
    Ok(())
}

/// A secret and a range that contains it, all within `1..=max_range`.
fn pick_puzzle(rng: &mut impl Rng, max_range: i64) -> (i64, i64, i64) {
    let max_range = max_range.max(2);
    let low = rng.random_range(1..max_range);
    let high = rng.random_range(low + 1..=max_range);
    let secret = rng.random_range(low..=high);
    (secret, low, high)
}

/// Guesses for one round: never repeats a number within the same range.
#[derive(Debug, Default)]
struct Guesser {
    range: Option<(i64, i64)>,
    tried: HashSet<i64>,
}

impl Guesser {
    /// Start guessing in `low..=high`. Same range keeps the history.
    fn set_range(&mut self, low: i64, high: i64) {
        if self.range != Some((low, high)) {
            self.range = Some((low, high));
            self.tried.clear();
        }
    }

    fn reset(&mut self) {
        self.range = None;
        self.tried.clear();
    }

    /// Next untried number, or None once the range is exhausted.
    fn next(&mut self, rng: &mut impl Rng) -> Option<i64> {
        let (low, high) = self.range?;
        let n = pick_guess(rng, low, high, &self.tried)?;
        self.tried.insert(n);
        Some(n)
    }
}

/// A number in range not tried yet, if any remain.
fn pick_guess(rng: &mut impl Rng, low: i64, high: i64, tried: &HashSet<i64>) -> Option<i64> {
    let span = u64::try_from(high.checked_sub(low)?).ok()?.saturating_add(1);
    if tried.len() as u64 >= span {
        return None;
    }
    loop {
        let n = rng.random_range(low..=high);
        if !tried.contains(&n) {
            return Some(n);
        }
    }
}
