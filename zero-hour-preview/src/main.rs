mod runner;
mod terminal;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use thiserror::Error;

use zero_hour_core::constants::{
    ATTR_AUTOSTART, ATTR_DATE, ATTR_DIGITS_URL, ATTR_MODE, ATTR_SEPARATOR_URL, ATTR_TIME,
    ATTR_UNITS, ATTR_UTC,
};
use zero_hour_core::{Clock, Configuration, Countdown, CountdownEvent, SystemClock};

use runner::{Preview, QueueScheduler, deliver_due, settle_scrolls, sleep_for};
use terminal::TerminalSurface;

#[derive(Debug, Parser)]
#[command(name = "zero-hour-preview", version)]
#[command(about = "Preview a countdown-timer configuration in the terminal")]
struct Args {
    /// Value of the digits-url attribute; empty shows the text fallback
    #[arg(long, default_value = "terminal")]
    digits_url: String,

    /// Value of the separator-url attribute
    #[arg(long)]
    separator_url: Option<String>,

    /// Value of the autostart attribute
    #[arg(long)]
    autostart: Option<String>,

    /// Target date (YYYY-MM-DD)
    #[arg(long)]
    date: Option<String>,

    /// Target time of day (H[H]:MM[:SS])
    #[arg(long)]
    time: Option<String>,

    /// UTC offset of the target, e.g. `utc+2` or `-5:30`
    #[arg(long)]
    utc: Option<String>,

    /// Visible units, e.g. `d:h:m:s` or `h:m`
    #[arg(long)]
    units: Option<String>,

    /// Digit transition mode: static or scroll
    #[arg(long)]
    mode: Option<String>,

    /// Query-string override as key=value (repeatable)
    #[arg(long = "query", value_name = "KEY=VALUE")]
    query: Vec<String>,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<usize>,

    /// Print the initial render and exit
    #[arg(long)]
    once: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("query entry {0:?} is not in key=value form")]
struct QueryEntryError(String);

fn attributes(args: &Args) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    attrs.insert(ATTR_DIGITS_URL.to_string(), args.digits_url.clone());
    let optional = [
        (ATTR_SEPARATOR_URL, &args.separator_url),
        (ATTR_AUTOSTART, &args.autostart),
        (ATTR_DATE, &args.date),
        (ATTR_TIME, &args.time),
        (ATTR_UTC, &args.utc),
        (ATTR_UNITS, &args.units),
        (ATTR_MODE, &args.mode),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            attrs.insert(name.to_string(), value.clone());
        }
    }
    attrs
}

fn query(args: &Args) -> Result<BTreeMap<String, String>> {
    args.query
        .iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.to_string()))
                .ok_or_else(|| QueryEntryError(entry.clone()))
                .context("Failed to parse --query")
        })
        .collect()
}

fn describe(config: &Configuration) -> String {
    let target = config
        .target
        .and_then(|target| chrono::DateTime::from_timestamp_millis(target.epoch_ms()))
        .map_or_else(
            || String::from("none"),
            |at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
    let units: Vec<&str> = config
        .units
        .visible_groups()
        .map(zero_hour_core::UnitGroup::as_str)
        .collect();
    format!(
        "target {target} | units {} | mode {} | autostart {}",
        if units.is_empty() {
            String::from("none")
        } else {
            units.join(":")
        },
        config.mode.as_str(),
        config.autostart,
    )
}

fn print_events(events: &[CountdownEvent]) {
    for event in events {
        match event {
            CountdownEvent::Done => println!("{}", "done".bright_magenta().bold()),
        }
    }
}

async fn run<C: Clock>(countdown: &mut Preview<C>, max_ticks: Option<usize>) {
    let mut ticks = 0;
    while let Some(wait) = sleep_for(countdown) {
        if max_ticks.is_some_and(|max| ticks >= max) {
            log::info!("tick limit reached after {ticks} ticks");
            break;
        }
        tokio::time::sleep(wait).await;
        let round = deliver_due(countdown);
        ticks += round.ticks;
        if round.redraw {
            println!("{}", countdown.surface().render_line());
        }
        print_events(&round.events);
    }
    countdown.stop();
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    println!("{}", "⏳ Zero Hour Preview".bright_cyan().bold());

    let attrs = attributes(&args);
    let overrides = query(&args)?;
    let config = Configuration::resolve(&attrs, &overrides);
    println!("{}", describe(&config).dimmed());

    let clock = SystemClock;
    let mut countdown = Countdown::new(clock, QueueScheduler::new(clock), TerminalSurface::new());
    countdown.connect(config);
    settle_scrolls(&mut countdown);

    if countdown.surface_mut().take_dirty() {
        println!("{}", countdown.surface().render_line());
    }
    print_events(&countdown.drain_events());

    if args.once {
        countdown.stop();
        return Ok(());
    }

    if !countdown.is_running() {
        println!("{}", "not running".yellow());
        return Ok(());
    }

    run(&mut countdown, args.ticks).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("zero-hour-preview").chain(argv.iter().copied()))
            .unwrap()
    }

    #[test]
    fn flags_become_attributes() {
        let args = parse(&["--date", "2099-01-01", "--units", "h:m", "--mode", "scroll"]);
        let attrs = attributes(&args);
        assert_eq!(attrs.get(ATTR_DATE).map(String::as_str), Some("2099-01-01"));
        assert_eq!(attrs.get(ATTR_UNITS).map(String::as_str), Some("h:m"));
        assert_eq!(attrs.get(ATTR_DIGITS_URL).map(String::as_str), Some("terminal"));
        assert!(!attrs.contains_key(ATTR_TIME));
    }

    #[test]
    fn query_entries_split_on_first_equals() {
        let args = parse(&["--query", "time=10:30", "--query", "utc=+2"]);
        let overrides = query(&args).unwrap();
        assert_eq!(overrides.get("time").map(String::as_str), Some("10:30"));
        assert_eq!(overrides.get("utc").map(String::as_str), Some("+2"));
    }

    #[test]
    fn query_entries_without_equals_are_rejected() {
        let args = parse(&["--query", "date"]);
        let err = query(&args).unwrap_err();
        assert!(err.to_string().contains("--query"));
        assert_eq!(
            err.downcast_ref::<QueryEntryError>(),
            Some(&QueryEntryError(String::from("date")))
        );
    }

    #[test]
    fn query_overrides_attribute_date() {
        let args = parse(&["--date", "2099-01-01", "--query", "date=2098-06-01"]);
        let config = Configuration::resolve(&attributes(&args), &query(&args).unwrap());
        let expected = chrono::NaiveDate::from_ymd_opt(2098, 6, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|at| at.and_utc().timestamp_millis());
        assert_eq!(config.target.map(|target| target.epoch_ms()), expected);
    }

    #[test]
    fn description_lists_units_and_target() {
        let args = parse(&["--date", "2099-01-01", "--units", "h:m"]);
        let config = Configuration::resolve(&attributes(&args), &query(&args).unwrap());
        let text = describe(&config);
        assert!(text.contains("2099-01-01 00:00:00 UTC"));
        assert!(text.contains("units hours:minutes"));
    }
}
