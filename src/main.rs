use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};

use daypart_guide::config::Profile;
use daypart_guide::gauge::ticks;
use daypart_guide::input::{format_currency, parse_stored_number};
use daypart_guide::log::ObservationLog;
use daypart_guide::logging::init_logging;
use daypart_guide::models::{draft_has_data, CombinedPeriod, Daypart, DraftDay, SavedBy, Tier};
use daypart_guide::performance::{build_report, collect_shifts, sort_shifts, SortKey};
use daypart_guide::report::{export_range, export_weekly, from_delimited_text, Quoting, ReportFormat};
use daypart_guide::store::SqliteStore;
use daypart_guide::target::TargetStatus;
use daypart_guide::zone::{classify, labor_delta};

const DEFAULT_STORE: &str = "daypart-guide.sqlite3";

#[derive(Parser)]
#[command(name = "daypart-guide")]
#[command(about = "Daypart labor productivity targets, zones and reports", long_about = None)]
struct Cli {
    /// Built-in profile preset (default, forsyth, tiered)
    #[arg(long, global = true, default_value = "default")]
    profile: String,
    /// Load the profile from a JSON file; takes precedence over --profile
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

/// Values entered for the current business day.
#[derive(Args)]
struct DayArgs {
    /// Daypart sales, e.g. breakfast=6000 or lunch='$10,500'
    #[arg(long = "sales", value_parser = daypart_number)]
    sales: Vec<(Daypart, f64)>,
    /// Actual productivity, e.g. breakfast=66
    #[arg(long = "actual", value_parser = daypart_number)]
    actual: Vec<(Daypart, f64)>,
    /// Person in charge, e.g. breakfast="Sarah Chen"
    #[arg(long = "pic", value_parser = daypart_text)]
    pic: Vec<(Daypart, String)>,
    /// Tier to use with tier-weighted profiles
    #[arg(long)]
    tier: Option<Tier>,
    /// Daypart weight override for tier-weighted profiles, e.g. lunch=1.3
    #[arg(long = "weight", value_parser = daypart_number)]
    weights: Vec<(Daypart, f64)>,
}

impl DayArgs {
    fn draft(&self) -> DraftDay {
        let mut draft = DraftDay::default();
        for (daypart, value) in &self.sales {
            draft.get_mut(*daypart).sales = Some(*value);
        }
        for (daypart, value) in &self.actual {
            draft.get_mut(*daypart).actual_productivity = Some(*value);
        }
        for (daypart, name) in &self.pic {
            draft.get_mut(*daypart).person_in_charge = name.clone();
        }
        draft
    }

    fn apply(&self, profile: &mut Profile) -> anyhow::Result<()> {
        if let Some(tier) = self.tier {
            profile.calculator.set_tier(tier)?;
        }
        for (daypart, weight) in &self.weights {
            profile.calculator.set_weight(*daypart, *weight)?;
        }
        Ok(())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show target productivity for each daypart
    Target {
        #[command(flatten)]
        day: DayArgs,
    },
    /// Classify a daypart's actual productivity against its target
    Classify {
        #[arg(long)]
        daypart: Daypart,
        /// Use this target instead of the one computed from sales
        #[arg(long)]
        target: Option<f64>,
        #[command(flatten)]
        day: DayArgs,
    },
    /// Save the entered day to the observation log
    Save {
        /// Business day to record (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        day: DayArgs,
    },
    /// Run one autosave poll for the entered day
    Tick {
        #[command(flatten)]
        day: DayArgs,
        /// Poll time, e.g. 2026-02-07T23:05:00 (defaults to now)
        #[arg(long)]
        at: Option<NaiveDateTime>,
    },
    /// Export saved observations as delimited text
    Export {
        /// First day of the window; without it the last week is exported
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        #[arg(long, default_value_t = ',')]
        delimiter: char,
        /// Fail instead of quoting values that contain the delimiter
        #[arg(long)]
        no_quote: bool,
    },
    /// Import a previously exported report into the log
    Import {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },
    /// Generate a markdown team performance report
    Report {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value = "performance")]
        sort: SortKey,
        #[arg(long, default_value = "performance-report.md")]
        out: PathBuf,
    },
    /// Show gauge geometry for one daypart
    Gauge {
        #[arg(long)]
        daypart: Daypart,
        #[arg(long = "ticks", default_value_t = 5)]
        tick_count: usize,
        #[command(flatten)]
        day: DayArgs,
    },
}

fn split_assignment(raw: &str) -> Result<(Daypart, &str), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected daypart=value, got {raw:?}"))?;
    Ok((key.parse::<Daypart>()?, value))
}

fn daypart_number(raw: &str) -> Result<(Daypart, f64), String> {
    let (daypart, value) = split_assignment(raw)?;
    let number = parse_stored_number(value).ok_or_else(|| format!("{value:?} is not a number"))?;
    Ok((daypart, number))
}

fn daypart_text(raw: &str) -> Result<(Daypart, String), String> {
    let (daypart, value) = split_assignment(raw)?;
    Ok((daypart, value.trim().to_string()))
}

fn delimiter_byte(delimiter: char) -> anyhow::Result<u8> {
    if !delimiter.is_ascii() || matches!(delimiter, '"' | '\n' | '\r') {
        bail!("delimiter {delimiter:?} must be a single ASCII character other than a quote or line break");
    }
    Ok(delimiter as u8)
}

fn load_profile(cli: &Cli) -> anyhow::Result<Profile> {
    match &cli.config {
        Some(path) => Profile::load(path)
            .with_context(|| format!("failed to load profile from {}", path.display())),
        None => Profile::preset(&cli.profile).context("failed to select profile preset"),
    }
}

fn open_log(profile: &Profile) -> anyhow::Result<ObservationLog<SqliteStore>> {
    let path = std::env::var("DAYPART_STORE").unwrap_or_else(|_| DEFAULT_STORE.to_string());
    let store = SqliteStore::open(&path).with_context(|| format!("failed to open store at {path}"))?;
    ObservationLog::open(store, profile.id.clone(), profile.autosave_hour)
        .context("failed to load the observation log")
}

fn describe(status: TargetStatus) -> &'static str {
    match status {
        TargetStatus::NoSales => "enter sales",
        TargetStatus::IncompleteDay => "waiting for every daypart's sales",
        TargetStatus::BelowRange => "sales below range",
        TargetStatus::AboveRange => "sales above range",
        TargetStatus::Baseline | TargetStatus::InRange => "not available",
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let mut profile = load_profile(&cli)?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Target { day } => {
            day.apply(&mut profile)?;
            let sales = day.draft().map(|_, entry| entry.sales);
            let targets = profile.calculator.targets(&sales)?;

            println!("Targets for profile {}:", profile.id);
            for (daypart, target) in targets.iter() {
                let sales_text = (*sales.get(daypart))
                    .map(format_currency)
                    .unwrap_or_else(|| "no sales".to_string());
                match target.displayed() {
                    Some(value) => println!("- {daypart}: {value:.1} ({sales_text})"),
                    None => println!("- {daypart}: {} ({sales_text})", describe(target.status)),
                }
            }
            if profile.combined_periods {
                for period in CombinedPeriod::ALL {
                    match profile.calculator.combined(period, &sales)? {
                        Some(value) => println!("- {}: {value:.1}", period.label()),
                        None => println!("- {}: not available", period.label()),
                    }
                }
            }
        }
        Commands::Classify { daypart, target, day } => {
            day.apply(&mut profile)?;
            let draft = day.draft();
            let sales = draft.map(|_, entry| entry.sales);
            let target = match target {
                Some(value) => Some(value),
                None => profile.calculator.target(daypart, &sales)?.value,
            };
            let actual = draft.get(daypart).actual_productivity;

            let Some(result) = classify(actual, target, &profile.zone_bands) else {
                println!("Enter actual productivity and a target for {daypart} to classify it.");
                return Ok(());
            };
            println!(
                "{daypart}: {} zone ({}), {:+.1} vs target {:.1}",
                result.zone,
                result.action,
                result.diff,
                target.unwrap_or_default()
            );
            if let Some(delta) = labor_delta(*sales.get(daypart), actual, target) {
                println!("Labor hours vs target: {delta:+.1}");
            }
        }
        Commands::Save { date, day } => {
            day.apply(&mut profile)?;
            let draft = day.draft();
            if !draft_has_data(&draft) {
                bail!("nothing to save: enter sales, actual productivity or a PIC");
            }
            let date = date.unwrap_or(today);
            let observation = profile
                .calculator
                .observation(&draft, date, Local::now().time(), SavedBy::Manual)?;
            let mut log = open_log(&profile)?;
            log.append(observation)?;
            println!("Saved {} for {} ({} records).", date, profile.id, log.len());
        }
        Commands::Tick { day, at } => {
            day.apply(&mut profile)?;
            let now = at.unwrap_or_else(|| Local::now().naive_local());
            let draft = day.draft();
            let mut log = open_log(&profile)?;
            let calculator = &profile.calculator;
            let saved = log.maybe_auto_save(now, draft_has_data(&draft), |date, time| {
                calculator.observation(&draft, date, time, SavedBy::Auto)
            })?;
            if saved {
                println!("Autosaved {} for {}.", now.date(), profile.id);
            } else {
                println!("No autosave at {}.", now.format("%Y-%m-%d %H:%M"));
            }
        }
        Commands::Export {
            start,
            end,
            out_dir,
            delimiter,
            no_quote,
        } => {
            let format = ReportFormat {
                delimiter: delimiter_byte(delimiter)?,
                quoting: if no_quote { Quoting::Never } else { Quoting::Necessary },
            };
            let log = open_log(&profile)?;
            let end = end.unwrap_or(today);
            let report = match start {
                Some(start) => export_range(&log, &profile.report_prefix, start, end, &format)?,
                None => export_weekly(&log, &profile.report_prefix, end, &format)?,
            };
            fs::create_dir_all(&out_dir)
                .with_context(|| format!("failed to create {}", out_dir.display()))?;
            let path = out_dir.join(&report.filename);
            fs::write(&path, &report.contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported {} observations to {}.", report.rows, path.display());
        }
        Commands::Import { csv, delimiter } => {
            let text = fs::read_to_string(&csv)
                .with_context(|| format!("failed to read {}", csv.display()))?;
            let format = ReportFormat {
                delimiter: delimiter_byte(delimiter)?,
                ..ReportFormat::default()
            };
            let observations = from_delimited_text(&text, &format)?;
            let mut log = open_log(&profile)?;
            let added = log.append_all(observations)?;
            println!("Imported {added} observations from {}.", csv.display());
        }
        Commands::Report {
            start,
            end,
            sort,
            out,
        } => {
            let end = end.unwrap_or(today);
            let start = start.unwrap_or(end - Duration::days(7));
            if start > end {
                bail!("report window starts after it ends ({start} > {end})");
            }
            let log = open_log(&profile)?;
            let mut shifts = collect_shifts(log.filter_by_date_range(start, end), &profile.zone_bands);
            sort_shifts(&mut shifts, sort);
            let report = build_report(&profile.id, start, end, &shifts);
            fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Gauge {
            daypart,
            tick_count,
            day,
        } => {
            day.apply(&mut profile)?;
            let draft = day.draft();
            let sales = draft.map(|_, entry| entry.sales);
            let target = profile.calculator.target(daypart, &sales)?;
            let Some(scale) = profile.dial_scale(daypart, target.value)? else {
                println!("No target for {daypart} yet: {}.", describe(target.status));
                return Ok(());
            };
            let geometry = profile.gauge;

            println!(
                "{daypart} gauge {:.1} to {:.1}, dial from {:.1} to {:.1} degrees",
                scale.min,
                scale.max,
                geometry.start_angle.rem_euclid(360.0),
                geometry.end_angle()
            );
            let labels: Vec<String> = ticks(scale.min, scale.max, tick_count)
                .into_iter()
                .map(|value| format!("{value:.1}"))
                .collect();
            println!("Ticks: {}", labels.join(", "));

            if let Some(value) = target.value {
                println!("Target {value:.1} at {:.1} degrees", geometry.angle(value, &scale)?);
                for (zone, arc) in geometry.zone_arcs(value, &profile.zone_bands, &scale)? {
                    println!(
                        "- {zone}: {:.1} to {:.1} degrees ({:.1}{})",
                        arc.start,
                        arc.end,
                        arc.sweep,
                        if arc.large_arc { ", large arc" } else { "" }
                    );
                }
            }
            match geometry.needle(draft.get(daypart).actual_productivity, &scale)? {
                Some(angle) => println!("Needle at {angle:.1} degrees"),
                None => println!("No actual productivity entered; needle hidden."),
            }
        }
    }

    Ok(())
}
