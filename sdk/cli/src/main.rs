mod http;

use anyhow::Context;
use clap::{Parser, Subcommand};
use flow::{
    spawn_deposit, spawn_key_generation, spawn_kyc, spawn_wallet_connection, spawn_withdrawal,
    FlowExit, FlowHandle, FlowOutcome, FlowSettings, FlowSnapshot, KycForm, MixerBackend,
    OnboardingNavigator, OnboardingTimings, SimulatedOnboarding, Stage, WalletKind,
};
use ledger::{ActivityItem, InMemoryLedger, MixerService, PrivacyMetrics, Timings};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::http::HttpBackend;

#[derive(Parser, Debug)]
#[command(name = "zkether-cli")]
#[command(about = "Drive the zkETHer mixer demo flows from a terminal", long_about = None)]
struct Cli {
    /// API base URL (e.g., http://localhost:5000). Runs in-process when unset.
    #[arg(long, env = "ZKETHER_API")]
    api: Option<String>,

    /// Seed for display tokens and progress
    #[arg(long, env = "ZKETHER_SEED")]
    seed: Option<u64>,

    /// Skip the simulated latencies of the in-process ledger
    #[arg(long)]
    instant: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deposit 1 ETH to a zkETHer public key
    Deposit {
        #[arg(long)]
        recipient: String,
    },
    /// Scan for notes and withdraw one through the relayer.
    ///
    /// Without --api every run starts from a fresh in-process ledger, so
    /// there are no notes to find; point it at a server that has seen a
    /// deposit.
    Withdraw,
    /// Show anonymity set size and unlinkability score
    Metrics,
    /// Show the five most recent deposits and withdrawals
    Activity,
    /// Show the shielded balance
    Balance,
    /// Connect a wallet, optionally verify KYC, then generate keys
    Onboard {
        #[arg(long, default_value = "metamask")]
        wallet: WalletKind,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        aadhaar: Option<String>,
        #[arg(long)]
        pan: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
}

/// Where mixer calls go.
enum Target {
    Remote(HttpBackend),
    Local(MixerService<InMemoryLedger>),
}

impl Target {
    fn backend(&self) -> Arc<dyn MixerBackend> {
        match self {
            Target::Remote(http) => Arc::new(http.clone()),
            Target::Local(service) => Arc::new(service.clone()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let settings = FlowSettings {
        seed: cli.seed,
        ..FlowSettings::default()
    };
    let target = match &cli.api {
        Some(url) => Target::Remote(HttpBackend::new(url)),
        None => {
            let timings = if cli.instant {
                Timings::instant()
            } else {
                Timings::default()
            };
            info!("no --api given, using an in-process ledger");
            Target::Local(MixerService::new(InMemoryLedger::with_demo_seed(), timings))
        }
    };

    match cli.command {
        Commands::Deposit { recipient } => {
            let handle = spawn_deposit(target.backend(), settings, recipient);
            report(follow(handle).await)
        }
        Commands::Withdraw => {
            if let Some(hint) = withdraw_hint(&target) {
                eprintln!("{hint}");
            }
            let handle = spawn_withdrawal(target.backend(), settings);
            report(follow(handle).await)
        }
        Commands::Metrics => {
            let metrics = match &target {
                Target::Remote(http) => http.privacy_metrics().await?,
                Target::Local(service) => service.privacy_metrics().await?,
            };
            print_metrics(&metrics)
        }
        Commands::Activity => {
            let activity = match &target {
                Target::Remote(http) => http.recent_activity().await?,
                Target::Local(service) => service.recent_activity().await?,
            };
            print_activity(&activity)
        }
        Commands::Balance => match &target {
            Target::Remote(http) => print_json(&http.balance().await?),
            Target::Local(service) => print_json(&ledger::Balance {
                balance: service.balance().await?,
            }),
        },
        Commands::Onboard {
            wallet,
            name,
            aadhaar,
            pan,
            phone,
        } => {
            let kyc = name.map(|full_name| KycForm {
                full_name,
                aadhaar_number: aadhaar.unwrap_or_default(),
                pan_number: pan.unwrap_or_default(),
                phone_number: phone.unwrap_or_default(),
            });
            onboard(settings, wallet, kyc).await
        }
    }
}

async fn onboard(
    settings: FlowSettings,
    wallet: WalletKind,
    kyc: Option<KycForm>,
) -> anyhow::Result<()> {
    let onboarding = Arc::new(SimulatedOnboarding::new(OnboardingTimings::default()));
    let mut nav = OnboardingNavigator::new();
    nav.get_started()?;

    let handle = spawn_wallet_connection(onboarding.clone(), settings.clone(), wallet);
    report(follow(handle).await)?;
    nav.wallet_connected()?;

    if let Some(form) = kyc {
        let handle = spawn_kyc(onboarding.clone(), settings.clone(), form);
        report(follow(handle).await)?;
    }

    let handle = spawn_key_generation(onboarding.clone(), settings);
    report(follow(handle).await)?;
    nav.keys_generated()?;

    print_json(&onboarding.profile())
}

/// Prints every stage change and progress update until the flow exits.
async fn follow<S: Stage>(handle: FlowHandle<S>) -> FlowOutcome {
    let mut rx = handle.subscribe();
    let printer = tokio::spawn(async move {
        let mut shown: Option<S> = None;
        loop {
            let snapshot = rx.borrow_and_update().clone();
            render(&snapshot, &mut shown);
            if rx.changed().await.is_err() {
                break;
            }
        }
    });
    let outcome = handle.finish().await;
    // the printer ends once the flow drops its sender
    join_printer(printer).await;
    outcome
}

/// Waits for the snapshot printer; a panic there is logged, not propagated.
async fn join_printer(printer: JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(err) => {
            warn!("progress printer stopped: {err}");
            false
        }
    }
}

fn withdraw_hint(target: &Target) -> Option<&'static str> {
    match target {
        Target::Local(_) => Some(
            "note: the in-process ledger starts with no notes; \
             pass --api to withdraw a deposit made against a running server",
        ),
        Target::Remote(_) => None,
    }
}

fn render<S: Stage>(snapshot: &FlowSnapshot<S>, shown: &mut Option<S>) {
    if *shown != Some(snapshot.stage) {
        *shown = Some(snapshot.stage);
        println!("==> {}", snapshot.stage.label());
        if let Ok(tokens) = serde_json::to_string(&snapshot.tokens) {
            if tokens != "{}" {
                println!("    {tokens}");
            }
        }
    }
    if snapshot.progress > 0.0 {
        let filled = (snapshot.progress / 5.0) as usize;
        println!(
            "    [{:<20}] {:>5.1}% {}",
            "#".repeat(filled.min(20)),
            snapshot.progress,
            snapshot.detail.as_deref().unwrap_or("")
        );
    }
}

fn report(outcome: FlowOutcome) -> anyhow::Result<()> {
    if let Some(notice) = &outcome.notice {
        println!("{}: {}", notice.title, notice.description);
    }
    match outcome.exit {
        FlowExit::Completed | FlowExit::Aborted => Ok(()),
        FlowExit::Failed => anyhow::bail!("flow failed"),
        FlowExit::Cancelled => anyhow::bail!("flow cancelled"),
    }
}

fn print_metrics(metrics: &PrivacyMetrics) -> anyhow::Result<()> {
    println!("Anonymity set:  {}", metrics.anonymity_set_size);
    println!("Unlinkability:  {:.1}%", metrics.unlinkability_score);
    println!("Privacy level:  {}", metrics.privacy_level());
    println!("Linkability:    {}%", metrics.linkability_percentage());
    println!("{}", metrics.status_line());
    print_json(metrics)
}

fn print_activity(activity: &[ActivityItem]) -> anyhow::Result<()> {
    if activity.is_empty() {
        println!("No recent activity");
    }
    for item in activity {
        println!("{}  {}", item.timestamp.format("%Y-%m-%d %H:%M:%S"), item.summary());
    }
    print_json(&activity)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("rendering output")?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn withdraw_help_points_at_api() {
        let mut cmd = Cli::command();
        let help = cmd
            .find_subcommand_mut("withdraw")
            .unwrap()
            .render_long_help()
            .to_string();
        assert!(help.contains("--api"), "{help}");
    }

    #[test]
    fn only_in_process_withdrawals_get_a_hint() {
        let local = Target::Local(MixerService::new(InMemoryLedger::new(), Timings::instant()));
        assert!(withdraw_hint(&local).unwrap().contains("--api"));
        let remote = Target::Remote(HttpBackend::new("http://127.0.0.1:1"));
        assert_eq!(withdraw_hint(&remote), None);
    }

    #[tokio::test]
    async fn printer_panic_is_reported_not_swallowed() {
        let printer = tokio::spawn(async { panic!("render blew up") });
        assert!(!join_printer(printer).await);
        assert!(join_printer(tokio::spawn(async {})).await);
    }
}
