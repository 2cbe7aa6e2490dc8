mod config;
mod context;
mod db;
mod manager;
mod models;
mod notify;
mod storage;
mod store;
mod tui;
mod views;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use context::AppContext;
use db::Database;
use models::{sample_applications, ApplicationPatch, ApplicationRecord, Status};
use storage::{MemoryStorage, SlotStorage};
use views::Filter;

#[derive(Parser)]
#[command(name = "jobflow")]
#[command(about = "Track job applications - add, move through stages, and see how it's going")]
struct Cli {
    /// Database file (overrides JOBFLOW_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Storage key holding the application list (overrides JOBFLOW_STORAGE_KEY)
    #[arg(long, global = true)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an application
    Add {
        /// Company name
        #[arg(short, long)]
        company: String,

        /// Job title
        #[arg(short, long)]
        title: String,

        #[command(flatten)]
        details: DetailArgs,
    },

    /// List applications
    List {
        /// Filter by status (Applied, Shortlisted, Interview, Offered, Rejected)
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by platform ("Unknown" matches applications without one)
        #[arg(short, long)]
        platform: Option<String>,

        /// Search title, company and notes
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Seed sample applications if nothing is stored yet
        #[arg(long)]
        demo: bool,
    },

    /// Show application details
    Show {
        /// Application ID
        id: i64,
    },

    /// Edit an application (only the given fields change)
    Edit {
        /// Application ID
        id: i64,

        /// Company name
        #[arg(short, long)]
        company: Option<String>,

        /// Job title
        #[arg(short, long)]
        title: Option<String>,

        #[command(flatten)]
        details: DetailArgs,
    },

    /// Delete an application
    Delete {
        /// Application ID
        id: i64,
    },

    /// Show analytics
    Stats {
        /// Number of months in the per-month histogram (1-120)
        #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u16).range(1..=120))]
        months: u16,
    },

    /// Open the kanban board
    Board {
        /// Seed sample applications if nothing is stored yet
        #[arg(long)]
        demo: bool,
    },

    /// Remove every stored application
    Clear,
}

#[derive(Args)]
struct DetailArgs {
    /// Where the job was found (LinkedIn, Referral, ...)
    #[arg(short, long)]
    platform: Option<String>,

    /// Application status
    #[arg(short, long)]
    status: Option<String>,

    /// Date applied (YYYY-MM-DD)
    #[arg(long)]
    applied: Option<String>,

    /// Date of offer (YYYY-MM-DD)
    #[arg(long)]
    offered: Option<String>,

    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    salary: Option<String>,

    /// Resume sent
    #[arg(long)]
    resume: Option<String>,

    #[arg(short, long)]
    notes: Option<String>,
}

impl DetailArgs {
    fn into_patch(self, company: Option<String>, job_title: Option<String>) -> ApplicationPatch {
        ApplicationPatch {
            company,
            job_title,
            platform: self.platform,
            status: self.status,
            applied_date: self.applied,
            offered_date: self.offered,
            location: self.location,
            salary: self.salary,
            resume: self.resume,
            notes: self.notes,
            ..Default::default()
        }
    }
}

fn open_storage(path: &Path) -> Rc<dyn SlotStorage> {
    match Database::open(path) {
        Ok(db) => {
            debug!(path = %db.path().display(), "opened storage");
            Rc::new(db)
        }
        Err(e) => {
            warn!(error = %e, "storage unavailable, changes will not be saved");
            Rc::new(MemoryStorage::new())
        }
    }
}

fn warn_unknown_status(patch: &ApplicationPatch) {
    if let Some(status) = patch.status.as_deref() {
        if !status.is_empty() && Status::parse(status).is_none() {
            println!(
                "Note: '{}' is not a board column; it will show under Applied.",
                status
            );
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_directive())))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let db_path = cli.db.unwrap_or_else(|| config.db_path.clone());
    let key = cli.key.unwrap_or_else(|| config.storage_key.clone());
    let ctx = AppContext::new(open_storage(&db_path), &key);

    match cli.command {
        Commands::Add {
            company,
            title,
            details,
        } => {
            if company.trim().is_empty() || title.trim().is_empty() {
                return Err(anyhow!("Please fill company and job title."));
            }
            let patch = details.into_patch(Some(company), Some(title));
            warn_unknown_status(&patch);

            let mut manager = ctx.manager();
            manager.initialize(&[]);
            let id = manager.add(patch);
            println!("Added application #{}", id);
        }

        Commands::List {
            status,
            platform,
            search,
            demo,
        } => {
            let mut manager = ctx.manager();
            if demo {
                manager.initialize(&sample_applications());
            } else {
                manager.initialize(&[]);
            }

            let filter = Filter {
                search,
                status,
                platform,
            };
            let all = manager.records();
            let records = filter.apply(&all);
            if records.is_empty() {
                println!("No applications found.");
                if filter.platform.is_some() && !all.is_empty() {
                    println!("Known platforms: {}", views::platform_options(&all).join(", "));
                }
            } else {
                println!(
                    "{:<5} {:<12} {:<24} {:<28} {:<16} {:<12}",
                    "ID", "STATUS", "COMPANY", "TITLE", "PLATFORM", "APPLIED"
                );
                println!("{}", "-".repeat(100));
                for r in &records {
                    println!(
                        "{:<5} {:<12} {:<24} {:<28} {:<16} {:<12}",
                        r.id,
                        truncate(r.effective_status(), 12),
                        truncate(&r.company, 22),
                        truncate(&r.job_title, 26),
                        truncate(&r.normalized_platform(), 16),
                        r.applied_date.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        Commands::Show { id } => {
            let mut manager = ctx.manager();
            manager.initialize(&[]);
            let record = manager
                .get(id)
                .ok_or_else(|| anyhow!("Application #{} not found", id))?;
            print_record(&record);
        }

        Commands::Edit {
            id,
            company,
            title,
            details,
        } => {
            if company.as_deref().is_some_and(|c| c.trim().is_empty())
                || title.as_deref().is_some_and(|t| t.trim().is_empty())
            {
                return Err(anyhow!("Company and job title can't be blank."));
            }
            let patch = details.into_patch(company, title);
            if patch.is_empty() {
                println!("Nothing to change.");
                return Ok(());
            }
            warn_unknown_status(&patch);

            let mut manager = ctx.manager();
            manager.initialize(&[]);
            if !manager.update(id, &patch) {
                return Err(anyhow!("Application #{} not found", id));
            }
            println!("Updated application #{}", id);
        }

        Commands::Delete { id } => {
            let mut manager = ctx.manager();
            manager.initialize(&[]);
            if manager.remove(id) {
                println!("Deleted application #{}", id);
            } else {
                println!("Application #{} not found.", id);
            }
        }

        Commands::Stats { months } => {
            let mut manager = ctx.manager();
            manager.initialize(&[]);
            print_stats(&manager.records(), months);
        }

        Commands::Board { demo } => {
            tui::run_board(&ctx, demo, config.poll_interval)?;
        }

        Commands::Clear => {
            if ctx.clear() {
                println!("Cleared all applications.");
            } else {
                println!("Could not clear storage; see log output.");
            }
        }
    }

    Ok(())
}

fn print_record(r: &ApplicationRecord) {
    println!("Application #{}", r.id);
    println!("Company: {}", r.company);
    println!("Title: {}", r.job_title);
    println!("Status: {}", r.effective_status());
    let fields = [
        ("Platform", &r.platform),
        ("Applied", &r.applied_date),
        ("Offered", &r.offered_date),
        ("Location", &r.location),
        ("Salary", &r.salary),
        ("Resume", &r.resume),
    ];
    for (label, value) in fields {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            println!("{}: {}", label, value);
        }
    }
    if let Some(notes) = r.notes.as_deref().filter(|n| !n.is_empty()) {
        println!("\n--- Notes ---\n{}", textwrap::fill(notes, 80));
    }
}

fn print_stats(records: &[ApplicationRecord], months: u16) {
    let total = records.len();
    let counts = views::status_counts(records);

    println!("Total applications: {}", counts.total());
    for status in Status::ALL {
        println!("  {:<12} {}", status, counts.get(status));
    }
    if counts.other > 0 {
        println!("  {:<12} {}", "Other", counts.other);
    }

    println!(
        "\nSuccess rate: {:.1}% (Offered: {}, {}%)",
        views::success_rate(records),
        counts.offered,
        views::percent_of(counts.offered, total)
    );
    println!(
        "Active applications: {} (Rejected: {})",
        views::active_count(records),
        counts.rejected
    );
    match views::average_time_to_offer(records) {
        Some(days) => println!("Avg time to offer: {}d", days),
        None => println!("Avg time to offer: -"),
    }

    let today = chrono::Local::now().date_naive();
    println!("\nApplications per month:");
    for bucket in views::monthly_histogram(records, today, months) {
        println!(
            "  {} {}  {:<20} {}",
            bucket.label(),
            bucket.year,
            "#".repeat(bucket.count.min(20)),
            bucket.count
        );
    }

    let platforms = views::platform_histogram(records);
    if !platforms.is_empty() {
        println!("\nPlatforms:");
        for (name, count) in platforms {
            println!(
                "  {:<20} {:>4} ({}%)",
                truncate(&name, 20),
                count,
                views::percent_of(count, total)
            );
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Zürich Versicherung AG", 10), "Zürich ...");
    }

    #[test]
    fn test_add_arguments_build_patch() {
        let cli = Cli::try_parse_from([
            "jobflow", "add", "-c", "Acme", "-t", "Engineer", "-p", "Referral", "--applied",
            "2024-01-15",
        ])
        .unwrap();
        let Commands::Add { company, title, details } = cli.command else {
            panic!("expected add");
        };
        let patch = details.into_patch(Some(company), Some(title));
        assert_eq!(patch.company.as_deref(), Some("Acme"));
        assert_eq!(patch.platform.as_deref(), Some("Referral"));
        assert_eq!(patch.applied_date.as_deref(), Some("2024-01-15"));
        assert_eq!(patch.status, None);
    }

    #[test]
    fn test_stats_months_is_bounded() {
        let cli = Cli::try_parse_from(["jobflow", "stats"]).unwrap();
        assert!(matches!(cli.command, Commands::Stats { months: 6 }));
        let cli = Cli::try_parse_from(["jobflow", "stats", "--months", "120"]).unwrap();
        assert!(matches!(cli.command, Commands::Stats { months: 120 }));

        for bad in ["0", "121", "2000000000", "-1"] {
            assert!(
                Cli::try_parse_from(["jobflow", "stats", "--months", bad]).is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_edit_without_fields_is_empty_patch() {
        let cli = Cli::try_parse_from(["jobflow", "--db", "/tmp/x.db", "edit", "3"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        let Commands::Edit { id, company, title, details } = cli.command else {
            panic!("expected edit");
        };
        assert_eq!(id, 3);
        assert!(details.into_patch(company, title).is_empty());
    }
}
