use anyhow::Result;
use std::io::{BufRead, Write};

use super::{as_cli, Context};
use crate::analytics;
use crate::report::render;

/// Interactive session. Commands are the CLI commands; failures are shown
/// and the session continues. The dashboard status is re-rendered whenever
/// the live subscription delivers a new snapshot.
pub(crate) fn as_shell(ctx: &mut Context, input: &mut dyn BufRead, out: &mut dyn Write) -> Result<()> {
    writeln!(
        out,
        "BudgetWiz {}: type `help` for commands, `quit` to leave",
        env!("CARGO_PKG_VERSION")
    )?;
    if ctx.user().is_some() {
        start_watching(ctx, out)?;
    }

    loop {
        write!(out, "budgetwiz> ")?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }

        let words = split_words(&line);
        match words.first().map(String::as_str) {
            None => continue,
            Some("quit" | "exit" | "q") => break,
            Some("shell") => {
                writeln!(out, "Already in the shell")?;
                continue;
            }
            Some("dashboard" | "d") => {
                ctx.refresh();
                print_dashboard(ctx, out)?;
                continue;
            }
            _ => {}
        }

        let user_before = ctx.user().map(str::to_string);
        if let Err(err) = as_cli(&words, ctx, input, out) {
            tracing::error!("command failed: {err:#}");
            writeln!(out, "Error: {err:#}")?;
        }

        // A login inside the session switches the watched identity.
        if ctx.user() != user_before.as_deref() {
            start_watching(ctx, out)?;
        } else if ctx.refresh() {
            print_status(ctx, out)?;
        }
    }
    Ok(())
}

fn start_watching(ctx: &mut Context, out: &mut dyn Write) -> Result<()> {
    match ctx.watch() {
        Ok(()) => print_status(ctx, out),
        Err(err) => {
            writeln!(out, "{err:#}")?;
            Ok(())
        }
    }
}

fn print_status(ctx: &Context, out: &mut dyn Write) -> Result<()> {
    if let Some(entries) = ctx.live_snapshot() {
        let summary = analytics::summarize(entries);
        writeln!(
            out,
            "[{}]",
            render::status_line(&summary, entries.len(), &ctx.settings.currency_symbol)
        )?;
    }
    Ok(())
}

fn print_dashboard(ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let Some(entries) = ctx.live_snapshot() else {
        writeln!(out, "Not signed in")?;
        return Ok(());
    };
    write!(
        out,
        "{}",
        render::dashboard(
            "Dashboard",
            &analytics::summarize(entries),
            &analytics::category_series(entries),
            &analytics::monthly_series(entries),
            &ctx.settings.currency_symbol,
        )
    )?;
    Ok(())
}

/// Split on whitespace, keeping double-quoted runs together.
pub(crate) fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut has_word = false;
    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                has_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if has_word {
                    words.push(std::mem::take(&mut current));
                    has_word = false;
                }
            }
            c => {
                current.push(c);
                has_word = true;
            }
        }
    }
    if has_word {
        words.push(current);
    }
    words
}
