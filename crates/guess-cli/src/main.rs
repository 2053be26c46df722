/// guess-game: play the number-guessing game in a terminal.
///
/// Usage:
///   guess-game --user alice --bots 1        # you + one bot
///   guess-game --user alice --bots 2 --players 3
///   RUST_LOG=guess_protocol=debug guess-game --user alice --bots 1
///
/// Type READY to join a round, numbers to answer, `x` or `quit` to leave.
mod bot;

use std::time::Duration;

use clap::Parser;
use guess_protocol::{run_console, GameConfig, GameEvent, GameRuntime, RuntimeConfig};
use guess_transport::{LocalGroup, NodeId};

use bot::{run_bot, BotConfig};

#[derive(Parser)]
#[command(name = "guess-game", about = "Turn-based number guessing over a member group")]
struct Cli {
    /// Your player name (unique within the group).
    #[arg(short, long)]
    user: String,

    /// Group to join.
    #[arg(long, default_value = "guess-game")]
    cluster: String,

    /// Players needed before a round starts.
    #[arg(long, default_value = "2")]
    players: usize,

    /// Start rounds with more than --players members too.
    #[arg(long)]
    allow_extra_players: bool,

    /// Number of bot players to add.
    #[arg(long, default_value = "1")]
    bots: usize,

    /// Seed for master selection and bot decisions.
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Round-start scheduling interval in ms.
    #[arg(long, default_value = "500")]
    tick_ms: u64,

    /// Pause before each bot answer in ms.
    #[arg(long, default_value = "400")]
    bot_delay_ms: u64,

    /// Upper bound of the ranges bot masters announce.
    #[arg(long, default_value = "100")]
    bot_max_range: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let user: NodeId = cli.user.parse()?;

    let runtime_config = RuntimeConfig {
        game: GameConfig {
            required_players: cli.players.max(1),
            allow_extra_players: cli.allow_extra_players,
            master_seed: cli.seed,
        },
        tick_interval: Duration::from_millis(cli.tick_ms.max(1)),
        ..RuntimeConfig::default()
    };

    let group = LocalGroup::new(cli.cluster.clone());
    eprintln!("guess-game v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("Group: {}", group.name());

    // ── Human player ─────────────────────────────────────────────────
    let (member, transport_events) = group.connect(user.clone()).await?;
    let channels = GameRuntime::spawn(member, transport_events, runtime_config.clone());
    let handle = channels.handle;
    let prompts = channels.prompts;
    let mut events = channels.events;
    let task = channels.task;

    // ── Bots ─────────────────────────────────────────────────────────
    let mut bots = Vec::with_capacity(cli.bots);
    for i in 1..=cli.bots {
        let name: NodeId = format!("bot-{i}").parse()?;
        if name == user {
            anyhow::bail!("player name {name} is reserved for a bot");
        }
        let (member, transport_events) = group.connect(name.clone()).await?;
        let channels = GameRuntime::spawn(member, transport_events, runtime_config.clone());
        let config = BotConfig {
            delay: Duration::from_millis(cli.bot_delay_ms),
            max_range: cli.bot_max_range,
            rng_seed: cli.seed.wrapping_add(i as u64),
        };
        bots.push(tokio::spawn(async move {
            if let Err(e) = run_bot(channels, config).await {
                tracing::warn!(bot = %name, "bot failed: {e}");
            }
        }));
    }

    // ── Event display ────────────────────────────────────────────────
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                GameEvent::Ignored { .. } | GameEvent::GuessSent { .. } => {
                    tracing::debug!("{event}");
                }
                other => println!("{other}"),
            }
        }
    });

    let console = run_console(
        tokio::io::BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        prompts,
        handle,
    )
    .await;

    task.await?;
    let _ = printer.await;
    for bot in bots {
        bot.abort();
    }

    console?;
    Ok(())
}
