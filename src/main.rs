// Followback CLI.
// Prints follow status for viewer/target pairs, a viewer's follower lists, or the rate limit.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use followback::{App, Config, PairVerdict};
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Follow-back status for GitHub users
#[derive(Parser, Debug)]
#[command(name = "followback")]
#[command(about = "Check whether GitHub users follow you back")]
struct Cli {
    /// Viewer whose relationship to each target is resolved
    #[arg(required_unless_present_any = ["lists", "rate_limit"], requires = "targets")]
    viewer: Option<String>,

    /// Users to check against the viewer
    targets: Vec<String>,

    /// Print the cached or fetched follower lists of a viewer
    #[arg(long, value_name = "VIEWER", conflicts_with_all = ["viewer", "rate_limit"])]
    lists: Option<String>,

    /// Print the core rate limit bucket
    #[arg(long, conflicts_with = "viewer")]
    rate_limit: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "FOLLOWBACK_LOG", default_value = "followback=info")]
    log_level: String,
}

#[derive(Debug, PartialEq)]
enum Action {
    Resolve { viewer: String, targets: Vec<String> },
    Lists(String),
    RateLimit,
}

impl Cli {
    fn action(self) -> Option<Action> {
        if self.rate_limit {
            return Some(Action::RateLimit);
        }
        if let Some(viewer) = self.lists {
            return Some(Action::Lists(viewer));
        }
        self.viewer.map(|viewer| Action::Resolve {
            viewer,
            targets: self.targets,
        })
    }
}

fn describe(verdict: Option<PairVerdict>) -> String {
    let Some(verdict) = verdict else {
        return "unknown".to_string();
    };
    let follows_you = if verdict.target_follows_viewer {
        "follows you"
    } else {
        "does not follow you"
    };
    match verdict.viewer_follows_target {
        Some(true) if verdict.target_follows_viewer => "mutual".to_string(),
        Some(true) => format!("{}, you follow them", follows_you),
        Some(false) => format!("{}, you do not follow them", follows_you),
        None => follows_you.to_string(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_level.as_str().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(action) = cli.action() else {
        let _ = Cli::command().print_help();
        return ExitCode::from(2);
    };

    let config = Config::from_env();
    let app = match App::start(&config) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "Failed to start");
            return ExitCode::FAILURE;
        }
    };

    let status = match action {
        Action::Resolve { viewer, targets } => {
            for target in &targets {
                let verdict = app.resolve(&viewer, target).await;
                println!("{}: {}", target, describe(verdict));
            }
            ExitCode::SUCCESS
        }
        Action::Lists(viewer) => match app.lists(&viewer).await {
            Some(lists) => match serde_json::to_string_pretty(&lists) {
                Ok(json) => {
                    println!("{}", json);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!(error = %e, "Failed to encode lists");
                    ExitCode::FAILURE
                }
            },
            None => {
                eprintln!("no lists available for {}", viewer);
                ExitCode::FAILURE
            }
        },
        Action::RateLimit => match app.rate_limit().await {
            Ok(limit) => {
                println!("{}/{} remaining, resets at {}", limit.remaining, limit.limit, limit.reset);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "Failed to read rate limit");
                ExitCode::FAILURE
            }
        },
    };

    app.shutdown().await;
    status
}
