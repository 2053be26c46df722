/// Console front end: turns prompts into questions and typed lines into intents.
///
/// Generic over the reader and writer so tests can script a whole session.
/// A newer prompt always replaces the one being answered; half-typed puzzle
/// answers are discarded with it.
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::GameError;

use super::{GameHandle, Prompt};

const LOWEST_QUESTION: &str = "Think of a range. Lowest";
const HIGHEST_QUESTION: &str = "Think of a range. Highest";

/// Where we are in the master's three-answer puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PuzzleStep {
    Secret,
    Lowest { secret: i64 },
    Highest { secret: i64, low: i64 },
}

/// Run the console until the player quits, input ends or the runtime stops.
///
/// End of input and read errors are reported to the runtime as
/// `InputClosed` so it can leave the group. A read error is also returned.
pub async fn run_console<R, W>(
    reader: R,
    mut writer: W,
    mut prompts: mpsc::Receiver<Prompt>,
    handle: GameHandle,
) -> Result<(), GameError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut current: Option<Prompt> = None;
    let mut step = PuzzleStep::Secret;

    loop {
        tokio::select! {
            prompt = prompts.recv() => {
                let Some(prompt) = prompt else {
                    // Runtime is gone.
                    return Ok(());
                };
                current = Some(prompt);
                step = PuzzleStep::Secret;
                write_line(&mut writer, &prompt.to_string()).await?;
            }

            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        tracing::debug!(local = %handle.local_id(), "input reached end of stream");
                        return ignore_stopped(handle.input_closed("end of input").await);
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        tracing::warn!(local = %handle.local_id(), "input failed: {reason}");
                        let _ = handle.input_closed(reason.clone()).await;
                        return Err(GameError::InputClosed(reason));
                    }
                };

                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input.eq_ignore_ascii_case("x") || input.eq_ignore_ascii_case("quit") {
                    write_line(&mut writer, "Exiting.").await?;
                    return ignore_stopped(handle.quit().await);
                }

                let submitted = match current {
                    Some(Prompt::Ready) => {
                        if input.eq_ignore_ascii_case("ready") {
                            handle.ready().await
                        } else {
                            write_line(&mut writer, &Prompt::Ready.to_string()).await?;
                            Ok(())
                        }
                    }
                    Some(Prompt::Puzzle) => match parse_number(input) {
                        Ok(n) => {
                            let (next, submit) = advance_puzzle(step, n);
                            step = next;
                            match submit {
                                Some((secret, low, high)) => handle.puzzle(secret, low, high).await,
                                None => {
                                    write_line(&mut writer, question(step)).await?;
                                    Ok(())
                                }
                            }
                        }
                        Err(e) => {
                            write_line(&mut writer, &e.to_string()).await?;
                            write_line(&mut writer, question(step)).await?;
                            Ok(())
                        }
                    },
                    Some(prompt @ Prompt::Guess { .. }) => match parse_number(input) {
                        Ok(n) => handle.guess(n).await,
                        Err(e) => {
                            write_line(&mut writer, &e.to_string()).await?;
                            write_line(&mut writer, &prompt.to_string()).await?;
                            Ok(())
                        }
                    },
                    Some(Prompt::Wait(_)) | None => {
                        tracing::debug!(local = %handle.local_id(), "input while waiting: {input:?}");
                        Ok(())
                    }
                };

                if let Err(GameError::RuntimeStopped) = submitted {
                    return Ok(());
                }
                submitted?;
            }
        }
    }
}

fn parse_number(input: &str) -> Result<i64, GameError> {
    input.parse::<i64>().map_err(|_| GameError::InvalidInput {
        reason: format!("{input:?} is not a whole number"),
    })
}

/// Feed one answer into the puzzle. Returns the next step and, after the
/// third answer, the complete puzzle.
fn advance_puzzle(step: PuzzleStep, n: i64) -> (PuzzleStep, Option<(i64, i64, i64)>) {
    match step {
        PuzzleStep::Secret => (PuzzleStep::Lowest { secret: n }, None),
        PuzzleStep::Lowest { secret } => (PuzzleStep::Highest { secret, low: n }, None),
        PuzzleStep::Highest { secret, low } => (PuzzleStep::Secret, Some((secret, low, n))),
    }
}

fn question(step: PuzzleStep) -> &'static str {
    match step {
        PuzzleStep::Secret => "Think of a number",
        PuzzleStep::Lowest { .. } => LOWEST_QUESTION,
        PuzzleStep::Highest { .. } => HIGHEST_QUESTION,
    }
}

fn ignore_stopped(result: Result<(), GameError>) -> Result<(), GameError> {
    match result {
        Err(GameError::RuntimeStopped) => Ok(()),
        other => other,
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> Result<(), GameError> {
    let mut out = String::with_capacity(text.len() + 1);
    out.push_str(text);
    out.push('\n');
    writer
        .write_all(out.as_bytes())
        .await
        .map_err(|e| GameError::InputClosed(format!("console write failed: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| GameError::InputClosed(format!("console write failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Intent;
    use crate::types::NodeId;

    fn handle() -> (GameHandle, mpsc::Receiver<Intent>) {
        let (intent_tx, intent_rx) = mpsc::channel(16);
        let local_id: NodeId = "alice".parse().unwrap();
        (GameHandle { intent_tx, local_id }, intent_rx)
    }

    async fn run(script: &str, prompts: &[Prompt]) -> (Vec<Intent>, String) {
        let (handle, mut intent_rx) = handle();
        let (prompt_tx, prompt_rx) = mpsc::channel(16);
        for p in prompts {
            prompt_tx.try_send(*p).unwrap();
        }

        // Prompts first, then the script.
        let (reader, mut feeder) = tokio::io::duplex(1024);
        let mut output = Vec::new();
        let console = run_console(tokio::io::BufReader::new(reader), &mut output, prompt_rx, handle);
        let feed = async {
            tokio::task::yield_now().await;
            feeder.write_all(script.as_bytes()).await.unwrap();
            drop(feeder);
        };
        let (result, ()) = tokio::join!(console, feed);
        result.unwrap();
        drop(prompt_tx);

        let intents = std::iter::from_fn(|| intent_rx.try_recv().ok()).collect();
        (intents, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn ready_is_case_insensitive() {
        let (intents, output) = run("ReAdY\n", &[Prompt::Ready]).await;
        assert_eq!(intents[0], Intent::Ready);
        assert!(output.starts_with("Print READY to start a game\n"));
    }

    #[tokio::test]
    async fn puzzle_takes_three_answers() {
        let (intents, output) = run("7\n1\n10\n", &[Prompt::Puzzle]).await;
        assert_eq!(
            intents[0],
            Intent::Puzzle {
                secret: 7,
                low: 1,
                high: 10
            }
        );
        assert!(output.contains("Think of a number\n"));
        assert!(output.contains("Think of a range. Lowest\n"));
        assert!(output.contains("Think of a range. Highest\n"));
    }

    #[tokio::test]
    async fn bad_number_reprompts_same_step() {
        let (intents, output) = run("7\nabc\n1\n10\n", &[Prompt::Puzzle]).await;
        assert_eq!(
            intents[0],
            Intent::Puzzle {
                secret: 7,
                low: 1,
                high: 10
            }
        );
        assert_eq!(output.matches("Think of a range. Lowest\n").count(), 2);
        assert!(output.contains("is not a whole number"));
    }

    #[tokio::test]
    async fn guess_is_submitted() {
        let (intents, _) = run("5\n", &[Prompt::Guess { low: 1, high: 10 }]).await;
        assert_eq!(intents[0], Intent::Guess(5));
    }

    #[tokio::test]
    async fn x_quits() {
        let (intents, output) = run("x\nready\n", &[Prompt::Ready]).await;
        assert_eq!(intents, vec![Intent::Quit]);
        assert!(output.ends_with("Exiting.\n"));
    }

    #[tokio::test]
    async fn end_of_input_closes() {
        let (intents, _) = run("", &[Prompt::Ready]).await;
        assert!(matches!(intents.as_slice(), [Intent::InputClosed { .. }]));
    }

    #[tokio::test]
    async fn input_while_waiting_is_ignored() {
        let (intents, _) = run(
            "ready\n",
            &[Prompt::Wait(crate::runtime::WaitReason::MasterThinking)],
        )
        .await;
        assert!(matches!(intents.as_slice(), [Intent::InputClosed { .. }]));
    }

    #[test]
    fn puzzle_steps() {
        let (step, done) = advance_puzzle(PuzzleStep::Secret, 4);
        assert_eq!(step, PuzzleStep::Lowest { secret: 4 });
        assert!(done.is_none());
        let (step, _) = advance_puzzle(step, 1);
        let (step, done) = advance_puzzle(step, 9);
        assert_eq!(step, PuzzleStep::Secret);
        assert_eq!(done, Some((4, 1, 9)));
    }
}
