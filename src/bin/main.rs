use clap::{Parser, Subcommand};
use std::sync::Arc;
use swipe_review::{
    coach,
    config::AppConfig,
    controller::{ReviewController, ReviewState},
    dispatch::NotificationDispatcher,
    emoji::EmojiCache,
    journal::SessionJournal,
    models::Outcome,
    remote::{
        ClassificationSink, LoggingSink, StaticTransactionSource, SwipeApiClient,
        TransactionSource,
    },
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "swipe",
    version,
    about = "Review recent transactions one card at a time",
    long_about = "Swipe through unclassified transactions and mark each one as \
                  aligned with your goals or a regret. Settings not given on the \
                  command line come from the environment (or a .env file)."
)]
struct Cli {
    /// Finance API base URL
    #[arg(long, global = true, env = "SWIPE_API_BASE_URL")]
    base_url: Option<String>,

    /// User whose transactions are reviewed
    #[arg(long, global = true, env = "SWIPE_USER_ID")]
    user_id: Option<i64>,

    /// Use the bundled sample transactions instead of the remote service
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Classify transactions interactively (default)
    Review {
        /// Drag distance a numeric gesture must exceed to commit
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// List transactions with their category emoji
    #[command(alias = "ls")]
    List,
    /// Show goal progress and saving opportunities
    Coach,
    /// Create a goal from a free-text description
    Goal {
        /// What you want to save for, e.g. "trip to Cancun in June"
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
}

impl Cli {
    /// Command-line values win over the environment.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(user_id) = self.user_id {
            config.user_id = user_id;
        }
        if self.offline {
            config.offline = true;
        }
        if let Some(Command::Review {
            threshold: Some(threshold),
        }) = self.command
        {
            config.swipe_threshold = threshold;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    cli.apply(&mut config);

    let command = cli.command.unwrap_or(Command::Review { threshold: None });
    info!(?command, user_id = config.user_id, "Swipe Review starting");

    match command {
        Command::Review { .. } => review(&config).await,
        Command::List => list(&config).await,
        Command::Coach => show_coach(&config).await,
        Command::Goal { prompt } => create_goal(&config, &prompt.join(" ")).await,
    }
}

async fn review(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (source, sink): (Arc<dyn TransactionSource>, Arc<dyn ClassificationSink>) =
        if config.offline {
            (Arc::new(StaticTransactionSource::demo()), Arc::new(LoggingSink))
        } else {
            let client = Arc::new(SwipeApiClient::from_config(config)?);
            (client.clone(), client)
        };

    let (dispatcher, worker) = NotificationDispatcher::spawn(sink);
    let controller = ReviewController::new(
        source,
        dispatcher,
        Arc::new(SessionJournal::new()),
        config.user_id,
        config.swipe_threshold,
    );

    println!("Loading transactions...");
    controller.load().await;
    render(&controller).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "q" | "quit" => break,
            "a" | "right" => {
                controller.commit(Outcome::Aligned).await;
            }
            "r" | "left" => {
                controller.commit(Outcome::Regret).await;
            }
            "u" | "undo" => {
                controller.undo().await;
            }
            "reset" => {
                controller.reset().await;
            }
            "retry" | "load" => {
                println!("Loading transactions...");
                controller.load().await;
            }
            "" => {}
            other => match other.parse::<f64>() {
                Ok(displacement) => {
                    controller.apply_gesture(displacement).await;
                }
                Err(_) => println!(
                    "Commands: a (aligned), r (regret), <displacement>, u (undo), reset, retry, q"
                ),
            },
        }
        render(&controller).await;
    }

    // Let queued notifications drain before exiting
    drop(controller);
    worker.await?;

    Ok(())
}

async fn render(controller: &ReviewController) {
    let snapshot = controller.snapshot().await;

    match &snapshot.state {
        ReviewState::Loading => println!("Loading..."),
        ReviewState::LoadError(message) => {
            println!("\n⚠️  {}", message);
            println!("Type 'retry' to try again.");
        }
        ReviewState::Empty => println!("\nNo transactions to review."),
        ReviewState::Reviewing => {
            println!("\n=== REVIEW TRANSACTIONS ===");
            println!("{} transactions remaining", snapshot.remaining);
            if let Some(card) = snapshot.cards.first() {
                println!("  {}  ${:.2}", card.charge_name, card.amount);
                println!("  {}", card.timestamp.format("%b %d, %Y %H:%M"));
                if let Some(location) = &card.location {
                    println!("  {}", location);
                }
            }
            print!("← regret (r)   aligned (a) →");
            if snapshot.can_undo {
                print!("   undo (u)");
            }
            println!();
        }
        ReviewState::Completed => {
            let summary = controller.summarize().await;
            println!("\n=== WELL DONE! ===");
            println!("Regrets: {}   Aligned: {}", summary.regret, summary.aligned);
            println!("Type 'reset' to start a new session or 'q' to quit.");
        }
    }
}

async fn list(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (transactions, emojis) = if config.offline {
        let source = StaticTransactionSource::demo();
        (
            source.fetch_unclassified(config.user_id).await?,
            EmojiCache::offline(),
        )
    } else {
        let client = Arc::new(SwipeApiClient::from_config(config)?);
        (
            client.unclassified(config.user_id).await?,
            EmojiCache::with_source(client),
        )
    };

    println!("=== TRANSACTIONS ===");
    for row in emojis.decorate(&transactions).await {
        let tx = &row.transaction;
        println!(
            "{}  {:<24} ${:>8.2}  {:<16} {}",
            row.emoji,
            tx.charge_name,
            tx.amount,
            tx.category.as_deref().unwrap_or("-"),
            tx.utility
        );
    }

    Ok(())
}

async fn show_coach(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = SwipeApiClient::from_config(config)?;
    let feed = coach::load_feed(&client, config.user_id).await?;
    let today = chrono::Local::now().date_naive();

    println!("=== COACH ===");
    match feed.goal_progress(today) {
        Some(goal) => {
            println!("Goal: {} ({:.0}% reached)", goal.name, goal.progress * 100.0);
            println!("Days remaining: {}", goal.days_remaining(today));
            println!("Suggested daily saving: ${}", goal.suggested_daily_amount(today));
        }
        None => println!("No active goal."),
    }
    if let Some(cap) = feed.metrics.cap_semanal {
        println!("Weekly spending cap: ${:.0}", cap);
    }

    if !feed.opportunities.is_empty() {
        println!("\nOpportunities:");
        for (i, opportunity) in feed.opportunities.iter().enumerate() {
            println!("  {}: {} - {}", i + 1, opportunity.title, opportunity.description);
        }
    }

    Ok(())
}

async fn create_goal(config: &AppConfig, prompt: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = SwipeApiClient::from_config(config)?;
    let created = client.create_goal(prompt, config.user_id).await?;
    let goal = created.goal;

    println!("{}", created.message);
    println!(
        "Goal: {} - ${:.2} ({} → {})",
        goal.name, goal.target_amount, goal.start_date, goal.end_date
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_review_is_the_default_command() {
        let cli = Cli::try_parse_from(["swipe"]).unwrap();
        assert_eq!(cli.command, None);

        let cli = Cli::try_parse_from(["swipe", "review", "--threshold", "80"]).unwrap();
        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.swipe_threshold, 80.0);
    }

    #[test]
    fn test_goal_joins_prompt_words() {
        let cli = Cli::try_parse_from(["swipe", "goal", "save", "for", "a", "bike"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Goal {
                prompt: vec!["save".into(), "for".into(), "a".into(), "bike".into()],
            })
        );

        assert!(Cli::try_parse_from(["swipe", "goal"]).is_err());
    }

    #[test]
    fn test_global_options_override_config() {
        let cli = Cli::try_parse_from([
            "swipe",
            "list",
            "--offline",
            "--user-id",
            "7",
            "--base-url",
            "http://localhost:9000/",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Command::List));

        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert!(config.offline);
        assert_eq!(config.user_id, 7);
        assert_eq!(config.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_unknown_command_and_bad_values_are_rejected() {
        assert!(Cli::try_parse_from(["swipe", "dance"]).is_err());
        assert!(Cli::try_parse_from(["swipe", "--user-id", "abc"]).is_err());
    }
}
