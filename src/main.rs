// src/main.rs

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod dedup;
mod fitness;
mod indicators;
mod projection;
mod reconcile;
mod roster_client;
mod timegrid;
mod week;

mod indicator_tests;

use fitness::{overall_score, score_to_tone, SkillWeightScorer};
use indicators::{build_week_indicators, IndicatorCache};
use projection::{build_day_slots, slot_tone};
use reconcile::{assignments_for_day, day_mode, DayModeReconciler, ReconcileOutcome, SlotEdit};
use roster_client::{RosterClient, RosterConfig, SchedulerApi};
use timegrid::GridConfig;
use week::{week_dates, week_id};

#[derive(Parser)]
#[command(
    name = "rostretto-core",
    about = "Roster indicators and assignment reconciliation against the Rostretto scheduling service"
)]
struct Cli {
    /// Base URL of the scheduling service (overrides ROSTER_API_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print per-day indicators for a week (defaults to the current week)
    Indicators { week: Option<String> },
    /// List employees ranked by overall score, weights from /config
    Staff,
    /// Print the rendered slot grid for one day
    Day { week: String, date: NaiveDate },
    /// Run the external auto-scheduler for a week, or one day with --date
    Auto {
        week: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Assign an employee to a single slot (converts an auto day to manual)
    Assign {
        week: String,
        date: NaiveDate,
        #[arg(long)]
        shift: i64,
        #[arg(long)]
        employee: i64,
        #[arg(long)]
        role: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Remove an employee from a single slot (converts an auto day to manual)
    Remove {
        week: String,
        date: NaiveDate,
        #[arg(long)]
        shift: i64,
        #[arg(long)]
        employee: i64,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Delete every assignment on a date
    ClearDay { week: String, date: NaiveDate },
    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = match &cli.base_url {
        Some(url) => RosterConfig::new(url)?,
        None => RosterConfig::from_env()?,
    };
    let client = Arc::new(RosterClient::new(config)?);

    match cli.command {
        Command::Indicators { week } => {
            let week = week.unwrap_or_else(|| week_id(Local::now().date_naive()));
            print_indicators(&client, &week).await
        }
        Command::Staff => print_staff(&client).await,
        Command::Day { week, date } => print_day(&client, &week, date).await,
        Command::Auto { week, date } => run_auto(&client, &week, date).await,
        Command::Assign {
            week,
            date,
            shift,
            employee,
            role,
            start,
            end,
        } => {
            let edit = SlotEdit::Add {
                shift_id: shift,
                employee_id: employee,
                role,
                start_time: start,
                end_time: end,
            };
            run_edit(client, &week, date, edit).await
        }
        Command::Remove {
            week,
            date,
            shift,
            employee,
            start,
            end,
        } => {
            let edit = SlotEdit::Remove {
                shift_id: shift,
                employee_id: employee,
                start_time: start,
                end_time: end,
            };
            run_edit(client, &week, date, edit).await
        }
        Command::ClearDay { week, date } => {
            let deleted = client.clear_day(&week, date).await?;
            println!("cleared {} assignment(s) on {}", deleted, date);
            Ok(())
        }
        Command::Health => {
            let health = client.health().await?;
            println!("service ok: {}", health.ok);
            Ok(())
        }
    }
}

async fn print_indicators(client: &Arc<RosterClient>, week: &str) -> Result<()> {
    let dates = week_dates(week).with_context(|| format!("invalid week id '{}'", week))?;
    let bundle = client.fetch_week_bundle(week).await?;
    let scorer = SkillWeightScorer;
    let fresh = build_week_indicators(
        &bundle.shifts,
        &bundle.assignments,
        &bundle.employees,
        &scorer,
    );
    let mut cache = IndicatorCache::new();
    let days = cache.apply(week, fresh);

    println!("Week {}", week);
    for date in dates {
        match days.get(&date) {
            Some(indicator) => println!(
                "  {}  demand={:<8} traffic={:<6} mismatches={}",
                date,
                indicator.demand.to_string(),
                indicator.traffic.to_string(),
                indicator.mismatches
            ),
            None => println!("  {}  no shifts", date),
        }
    }
    Ok(())
}

async fn print_staff(client: &Arc<RosterClient>) -> Result<()> {
    let (employees, config) = tokio::try_join!(client.fetch_employees(), client.fetch_config())?;
    let mut ranked: Vec<_> = employees
        .iter()
        .map(|e| (overall_score(e, &config.weights), e))
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    if !config.scheduler_order.is_empty() {
        println!("scheduler order: {}", config.scheduler_order.join(" > "));
    }
    for (score, employee) in ranked {
        println!(
            "  {:<24} {:>5.1}  [{}]",
            employee.display_name(),
            score,
            score_to_tone(score)
        );
    }
    Ok(())
}

async fn print_day(client: &Arc<RosterClient>, week: &str, date: NaiveDate) -> Result<()> {
    let bundle = client.fetch_week_bundle(week).await?;
    let scorer = SkillWeightScorer;
    let indicators = build_week_indicators(
        &bundle.shifts,
        &bundle.assignments,
        &bundle.employees,
        &scorer,
    );
    let demand = indicators.get(&date).map(|i| i.demand);
    let slots = build_day_slots(date, &bundle, demand, &scorer, &GridConfig::default());

    match demand {
        Some(d) => println!("{}  demand={}", date, d),
        None => println!("{}  (no shifts, default window)", date),
    }
    for slot in &slots {
        println!(
            "  {:>8} - {:<8} [{}]",
            slot.start_time,
            slot.end_time,
            slot_tone(slot)
        );
        for staff in &slot.assigned_staff {
            println!("      {} ({}) {}", staff.name, staff.role, staff.tone);
        }
    }
    Ok(())
}

async fn run_auto(client: &Arc<RosterClient>, week: &str, date: Option<NaiveDate>) -> Result<()> {
    match date {
        Some(date) => {
            let response = client.run_auto_schedule_day(week, date).await?;
            println!(
                "created {} assignment(s) on {}",
                response.created, response.date
            );
        }
        None => {
            let response = client.run_auto_schedule(week).await?;
            println!(
                "created {} assignment(s) in {}",
                response.created, response.week
            );
        }
    }
    Ok(())
}

async fn run_edit(
    client: Arc<RosterClient>,
    week: &str,
    date: NaiveDate,
    edit: SlotEdit,
) -> Result<()> {
    let scorer = SkillWeightScorer;
    let bundle = client.fetch_week_bundle(week).await?;
    let indicators = build_week_indicators(
        &bundle.shifts,
        &bundle.assignments,
        &bundle.employees,
        &scorer,
    );
    let demand = indicators.get(&date).map(|i| i.demand);
    let rendered = build_day_slots(date, &bundle, demand, &scorer, &GridConfig::default());

    let reconciler = DayModeReconciler::new(client.clone());
    let outcome = reconciler
        .edit_slot(week, date, &bundle, &rendered, edit)
        .await?;
    match outcome {
        ReconcileOutcome::Created { assignment_id } => {
            println!("created manual assignment {}", assignment_id)
        }
        ReconcileOutcome::Deleted { count } => println!("deleted {} manual assignment(s)", count),
        ReconcileOutcome::ConvertedToManual { cleared, restored } => println!(
            "day converted to manual: cleared {}, restored {} assignment(s)",
            cleared, restored
        ),
    }

    // The edit only counts once a fresh fetch reflects it; stale views are
    // never fed back into another mutation.
    let fresh = client.fetch_week_bundle(week).await?;
    let day = assignments_for_day(&fresh, date);
    info!(count = day.len(), "refetched day after edit");
    println!("day mode after edit: {:?}", day_mode(day.into_iter()));
    Ok(())
}
