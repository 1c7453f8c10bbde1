//! ClubCtl - Command line tool for driving a clubsync server
//!
//! Usage:
//!   clubctl check            - Probe the server and show collection counts
//!   clubctl load             - Fetch all collections and show a summary
//!   clubctl sync             - Run one synchronization pass
//!   clubctl watch            - Keep syncing periodically until interrupted
//!   clubctl seed             - Create sample data through the sync engine

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration as ChronoDuration, Local};
use clap::{Parser, Subcommand};

use clubsync::client::{Resources, Transport};
use clubsync::config::ClubsyncConfig;
use clubsync::model::{
    Activity, Donation, Expense, Experience, GalleryItem, Member, Payment, PaymentStatus,
};
use clubsync::notify::{MessageLevel, Notifier};
use clubsync::prelude::AppData;
use clubsync::sync::{PassOutcome, SyncEngine, SyncScheduler};

/// Clubsync Control Tool
#[derive(Parser)]
#[command(name = "clubctl")]
#[command(about = "Control and monitor a clubsync server", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "clubsync.toml")]
    config: PathBuf,

    /// Server endpoint to connect to (overrides config)
    #[arg(short, long)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the server and show collection counts
    Check,
    /// Fetch all collections into a local cache and show a summary
    Load,
    /// Run one synchronization pass
    Sync,
    /// Keep syncing on the configured cadence until interrupted
    Watch {
        /// Minutes between passes (overrides config)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Create sample data through the sync engine
    Seed,
}

/// Notifier that prints sync messages to the terminal.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: MessageLevel, message: &str) {
        match level {
            MessageLevel::Info => println!("  - {message}"),
            MessageLevel::Success => println!("  ✓ {message}"),
            MessageLevel::Error => eprintln!("  ✗ {message}"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Resolve configuration: file if present, defaults otherwise.
    let mut config = if cli.config.exists() {
        ClubsyncConfig::from_file(&cli.config)
            .with_context(|| format!("loading config from {}", cli.config.display()))?
    } else {
        ClubsyncConfig::default()
    };
    if let Some(endpoint) = &cli.endpoint {
        config.remote.base_url = endpoint.clone();
    }

    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let transport = Arc::new(Transport::new(&config.remote, Arc::clone(&notifier))?);
    let resources = Arc::new(Resources::new(transport));
    let engine = Arc::new(SyncEngine::new(
        AppData::shared(),
        Arc::clone(&resources),
        notifier,
    ));

    match cli.command {
        Commands::Check => run_check(&resources).await,
        Commands::Load => run_load(&engine).await,
        Commands::Sync => run_sync(&engine).await,
        Commands::Watch { interval } => run_watch(engine, &config, interval).await,
        Commands::Seed => run_seed(&engine).await,
    }
}

/// Probe the server and count every collection
async fn run_check(resources: &Resources) -> anyhow::Result<()> {
    let health = resources
        .health_check()
        .await
        .context("server is unreachable")?;
    println!("Server:   {}", health.server);
    println!("Database: {} (state {})", health.database, health.db_state);

    if !health.database_connected() {
        anyhow::bail!("backing store is disconnected");
    }

    println!();
    println!("Collections:");
    println!("  hero-slides  {}", resources.hero_slides.list_all().await?.len());
    println!("  activities   {}", resources.activities.list_all().await?.len());
    println!("  members      {}", resources.members.list_all().await?.len());
    println!("  donations    {}", resources.donations.list_all().await?.len());
    println!("  expenses     {}", resources.expenses.list_all().await?.len());
    println!("  experiences  {}", resources.experiences.list_all().await?.len());
    println!("  weekly-fees  {}", resources.weekly_fees.list_all().await?.len());
    println!("  gallery      {}", resources.gallery.items.list_all().await?.len());

    Ok(())
}

/// Load everything and print the dashboard
async fn run_load(engine: &SyncEngine) -> anyhow::Result<()> {
    engine.load_all().await.context("initial load failed")?;

    let cache = engine.cache();
    let data = cache.read().await;
    println!();
    println!("Dashboard");
    println!("=========");
    println!("Members:      {}", data.dashboard.total_members);
    println!("Activities:   {}", data.dashboard.total_activities);
    println!("Experiences:  {}", data.dashboard.total_experiences);
    println!("Donations:    {:.2}", data.dashboard.total_donations);
    println!("Expenses:     {:.2}", data.dashboard.total_expenses);
    println!("Net balance:  {:.2}", data.dashboard.net_balance);
    println!("Fees paid:    {:.2}", data.dashboard.fees_collected);
    println!("Fees pending: {:.2}", data.dashboard.fees_pending);
    println!("Fees overdue: {:.2}", data.dashboard.fees_overdue);

    Ok(())
}

/// Run a single pass
async fn run_sync(engine: &SyncEngine) -> anyhow::Result<()> {
    engine.load_all().await.context("initial load failed")?;
    let report = engine.run_pass().await;
    print_report(&report);
    if report.outcome == PassOutcome::Aborted {
        anyhow::bail!("synchronization pass aborted");
    }
    Ok(())
}

/// Load, then sync periodically until Ctrl+C
async fn run_watch(
    engine: Arc<SyncEngine>,
    config: &ClubsyncConfig,
    interval_override: Option<u64>,
) -> anyhow::Result<()> {
    let initial_ok = engine.load_all().await.is_ok();

    tokio::time::sleep(config.initial_sync_delay()).await;
    let first_pass_ok = if initial_ok {
        engine.run_pass().await.outcome == PassOutcome::Success
    } else {
        false
    };

    // A failed initial sync gets the faster retry cadence.
    let interval = match interval_override {
        Some(minutes) => std::time::Duration::from_secs(minutes.max(1) * 60),
        None if first_pass_ok => config.sync_interval(),
        None => config.retry_interval(),
    };
    println!(
        "Watching: one pass every {}s (Ctrl+C to stop)",
        interval.as_secs()
    );

    let scheduler = SyncScheduler::new();
    let pass_engine = Arc::clone(&engine);
    scheduler.start(interval, move || {
        let engine = Arc::clone(&pass_engine);
        async move {
            let report = engine.run_pass().await;
            print_report(&report);
        }
    });

    tokio::signal::ctrl_c().await?;
    scheduler.stop();
    println!("Stopped.");

    Ok(())
}

/// Create sample data through the sync engine
async fn run_seed(engine: &SyncEngine) -> anyhow::Result<()> {
    engine.load_all().await.context("initial load failed")?;
    let today = Local::now().date_naive();

    for (name, role) in [
        ("John Doe", Member::STUDENT_ROLE),
        ("Emily Williams", Member::STUDENT_ROLE),
        ("Jane Smith", "Coach"),
    ] {
        let handle = name.to_lowercase().replace(' ', ".");
        engine
            .create_entity(Member {
                name: name.to_string(),
                contact: format!("{handle}@example.com"),
                phone: "+1-555-0100".to_string(),
                join_date: today - ChronoDuration::days(90),
                role: role.to_string(),
                image: String::new(),
            })
            .await;
    }

    engine
        .create_entity(Activity {
            title: "Weekend Football Tournament".to_string(),
            date: today + ChronoDuration::days(7),
            time: "09:00 - 17:00".to_string(),
            description: "A friendly football tournament for all age groups".to_string(),
            image: String::new(),
            status: "upcoming".to_string(),
            kind: "tournament".to_string(),
        })
        .await;
    engine
        .create_entity(Activity {
            title: "Swimming Competition".to_string(),
            date: today - ChronoDuration::days(14),
            time: "10:00 - 15:00".to_string(),
            description: "Annual swimming competition with multiple categories".to_string(),
            image: String::new(),
            status: "completed".to_string(),
            kind: "event".to_string(),
        })
        .await;

    engine
        .create_entity(Donation {
            donor_name: "Community Sports Foundation".to_string(),
            amount: 2500.0,
            date: today - ChronoDuration::days(30),
            purpose: "Equipment".to_string(),
            notes: "Annual donation for sports equipment".to_string(),
        })
        .await;
    engine
        .create_entity(Expense {
            description: "New training equipment".to_string(),
            amount: 1500.0,
            date: today - ChronoDuration::days(21),
            category: "Equipment".to_string(),
            vendor: "Sports Gear Ltd.".to_string(),
            payment_method: "Bank Transfer".to_string(),
        })
        .await;
    engine
        .create_entity(Experience {
            title: "Regional Championship Win".to_string(),
            date: today - ChronoDuration::days(60),
            description: "Our basketball team won the regional championship".to_string(),
            image: String::new(),
        })
        .await;

    // Gallery items, the first two promoted into the top five so the
    // hero-slide cascade has something to build from.
    let mut gallery_handles = Vec::new();
    for title in ["Championship Final", "Training Camp", "Sports Day"] {
        let (local, _) = engine
            .create_entity(GalleryItem {
                title: title.to_string(),
                description: Some(format!("{title} highlights")),
                image_url: format!(
                    "https://images.example.com/{}.jpg",
                    title.to_lowercase().replace(' ', "-")
                ),
                is_top_five: false,
                top_five_order: 0,
            })
            .await;
        gallery_handles.push(local);
    }
    for local in &gallery_handles[..2] {
        engine.toggle_gallery_top_five(*local).await;
    }

    // Reload to pick up the server-created fee records, then record one
    // payment against the first student.
    engine.load_all().await?;
    let fee_local = {
        let cache = engine.cache();
        let data = cache.read().await;
        data.weekly_fees.first().map(|f| f.identity.local())
    };
    if let Some(fee_local) = fee_local {
        engine
            .record_payment(
                fee_local,
                Payment {
                    date: today,
                    amount: 20.0,
                    status: PaymentStatus::Paid,
                },
            )
            .await;
    }

    println!("Seed data created.");
    Ok(())
}

fn print_report(report: &clubsync::sync::PassReport) {
    match report.outcome {
        PassOutcome::Success => println!(
            "Pass complete: {} task(s), {} failed, {} resolved",
            report.attempted(),
            report.failed,
            report.resolved
        ),
        PassOutcome::Aborted => println!("Pass aborted: server unreachable"),
    }
}
