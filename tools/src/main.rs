//! signal-runner: headless batch classifier for SpendSense.
//!
//! Usage:
//!   signal-runner --db signals.db --anchor 2025-06-01
//!   signal-runner --import histories.json --data-dir ./data
//!   signal-runner --db signals.db --ipc-mode

use anyhow::{Context, Result};
use chrono::NaiveDate;
use spendsense_core::{
    assignment::PersonaAssignment,
    clock::EvalContext,
    config::EngineConfig,
    engine::SignalEngine,
    model::SubjectHistory,
    persona::Persona,
    store::{SignalStore, StoreTable},
    window::{DataAvailability, WindowType},
};
use std::collections::BTreeMap;
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetSignals {
        subject_id:  String,
        window_type: String,
    },
    GetPersona {
        subject_id: String,
    },
    Invalidate {
        subject_id: String,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let import = flag_value(&args, "--import");
    let anchor = flag_value(&args, "--anchor")
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("--anchor expects YYYY-MM-DD, got '{s}'"))
        })
        .transpose()?;
    let ctx = eval_context(anchor);

    if !ipc_mode {
        println!("SpendSense signal-runner");
        println!("  anchor:    {}", ctx.anchor_date);
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let config = EngineConfig::load(data_dir)?;

    // For :memory: use a shared-memory URI so the data source connection and
    // the journal connection see the same database.
    let db_effective: String = if db == ":memory:" {
        format!("file:signalrun_{}?mode=memory&cache=shared", std::process::id())
    } else {
        db.to_string()
    };
    let store = SignalStore::open(&db_effective)?;
    store.migrate()?;

    if let Some(path) = import {
        let n = import_histories(&store, path)?;
        log::info!("imported {n} subject histories from {path}");
    }

    let journal = store.reopen()?;
    let mut engine = SignalEngine::new(store, config).with_journal(journal);

    if ipc_mode {
        run_ipc_loop(&mut engine, anchor)?;
    } else {
        let assignments = engine.assign_all(&ctx)?;
        print_summary(&engine, &assignments)?;
    }

    Ok(())
}

fn import_histories(store: &SignalStore, path: &str) -> Result<usize> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Cannot read {path}"))?;
    let histories: Vec<SubjectHistory> =
        serde_json::from_str(&content).with_context(|| format!("Cannot parse {path}"))?;
    for h in &histories {
        store.import_history(h)?;
    }
    Ok(histories.len())
}

/// A fixed `--anchor` pins the context. Without one, every call reads the
/// clock again so a long session rolls over to the next day.
fn eval_context(anchor: Option<NaiveDate>) -> EvalContext {
    match anchor {
        Some(date) => EvalContext::at_anchor(date),
        None => EvalContext::today(),
    }
}

fn run_ipc_loop(engine: &mut SignalEngine<SignalStore>, anchor: Option<NaiveDate>) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Unparseable command: {}", buffer.trim());
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        let ctx = &eval_context(anchor);
        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetSignals { subject_id, window_type } => window_type
                .parse::<WindowType>()
                .and_then(|wt| engine.get_signals(&subject_id, wt, ctx))
                .map_err(anyhow::Error::from)
                .and_then(|r| Ok(serde_json::to_value(r.as_ref())?)),
            IpcCommand::GetPersona { subject_id } => engine
                .get_persona(&subject_id, ctx)
                .map_err(anyhow::Error::from)
                .and_then(|a| Ok(serde_json::to_value(&a)?)),
            IpcCommand::Invalidate { subject_id } => engine
                .invalidate(&subject_id, ctx)
                .map(|removed| serde_json::json!({ "invalidated": subject_id, "entries_removed": removed }))
                .map_err(anyhow::Error::from),
        };
        // The journal already holds every event.
        engine.drain_events();

        let line = match reply {
            Ok(value) => value,
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        writeln!(stdout, "{line}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(engine: &SignalEngine<SignalStore>, assignments: &[PersonaAssignment]) -> Result<()> {
    let mut by_persona: BTreeMap<Persona, usize> = BTreeMap::new();
    let mut by_tier: BTreeMap<DataAvailability, usize> = BTreeMap::new();
    let mut fallbacks = 0usize;
    for a in assignments {
        *by_persona.entry(a.persona).or_default() += 1;
        *by_tier.entry(a.decision_trace.data_availability).or_default() += 1;
        if a.decision_trace.empty_match_fallback {
            fallbacks += 1;
        }
        log::debug!("{}", a.decision_trace.summary());
    }

    println!("=== RUN SUMMARY ===");
    println!("  subjects:        {}", assignments.len());
    println!("  cached records:  {}", engine.cached_records());
    println!("  fallbacks:       {fallbacks}");
    if let Some(journal) = engine.journal() {
        println!("  signal rows:     {}", journal.table_count(StoreTable::SignalRecord)?);
        println!("  events logged:   {}", journal.table_count(StoreTable::EventLog)?);
    }

    println!();
    println!("=== PERSONAS ===");
    if by_persona.is_empty() {
        println!("  (No subjects classified)");
    }
    for (persona, count) in &by_persona {
        println!("  {:<20} {count}", persona.display_name());
    }

    println!();
    println!("=== DATA AVAILABILITY ===");
    for (tier, count) in &by_tier {
        println!("  {:<20} {count}", tier.as_str());
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn fixed_anchor_pins_the_context() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(eval_context(Some(date)), eval_context(Some(date)));
        assert_eq!(eval_context(Some(date)).anchor_date, date);
    }

    #[test]
    fn unpinned_context_follows_the_clock() {
        let before = Utc::now();
        let first = eval_context(None);
        let second = eval_context(None);
        assert!(first.now >= before);
        assert!(second.now >= first.now);
        assert_eq!(second.anchor_date, second.now.date_naive());
    }
}
