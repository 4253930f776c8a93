use clap::Parser;
use es6_rest_demo::client::session_client;
use es6_rest_demo::{ClickOutcome, CounterWidget};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Press the counter button on a running demo page.
#[derive(Debug, Parser)]
#[command(name = "es6demo-click", version)]
struct Cli {
    /// Page that embeds the counter fragment.
    #[arg(long, env = "ES6DEMO_PAGE_URL", default_value = "http://127.0.0.1:8080/")]
    url: String,

    /// Number of presses.
    #[arg(short = 'n', long, default_value_t = 1)]
    clicks: usize,

    /// Fire all presses at once instead of waiting for each response.
    #[arg(long)]
    overlap: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let Some(widget) = CounterWidget::load(session_client()?, &cli.url).await? else {
        warn!("no counter on {}", cli.url);
        return Ok(());
    };
    info!("bound to counter showing {}", widget.snapshot().output);

    let widget = Arc::new(widget);
    let mut tally = Tally::default();
    if cli.overlap {
        let mut presses = JoinSet::new();
        for _ in 0..cli.clicks {
            let widget = Arc::clone(&widget);
            presses.spawn(async move { widget.click().await });
        }
        while let Some(outcome) = presses.join_next().await {
            tally.record(&outcome?);
        }
    } else {
        for _ in 0..cli.clicks {
            tally.record(&widget.click().await);
        }
    }

    println!("{}", tally.summary(&widget.snapshot().output));
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
    applied: usize,
    not_applied: usize,
}

impl Tally {
    fn record(&mut self, outcome: &ClickOutcome) {
        match outcome {
            ClickOutcome::Applied(value) => {
                self.applied += 1;
                info!("counter now {value}");
            }
            ClickOutcome::Rejected(_) | ClickOutcome::Failed(_) => self.not_applied += 1,
        }
    }

    fn summary(&self, shown: &str) -> String {
        if self.not_applied == 0 {
            shown.to_string()
        } else {
            let total = self.applied + self.not_applied;
            format!("{shown} ({} of {total} presses not applied)", self.not_applied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn all_applied_prints_only_the_value() {
        let mut tally = Tally::default();
        tally.record(&ClickOutcome::Applied("5".to_string()));
        tally.record(&ClickOutcome::Applied("6".to_string()));
        assert_eq!(tally.summary("6"), "6");
    }

    #[test]
    fn failed_presses_are_counted() {
        let mut tally = Tally::default();
        tally.record(&ClickOutcome::Applied("5".to_string()));
        tally.record(&ClickOutcome::Failed("connection refused".to_string()));
        tally.record(&ClickOutcome::Rejected(json!({ "code": "rest_cookie_invalid_nonce" })));
        assert_eq!(tally, Tally { applied: 1, not_applied: 2 });
        assert_eq!(tally.summary("5"), "5 (2 of 3 presses not applied)");
    }
}
