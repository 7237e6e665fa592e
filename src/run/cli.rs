use anyhow::Result;
use chrono::Utc;
use std::io::{BufRead, Write};

use super::Context;
use crate::analytics::{self, YearMonth};
use crate::auth::{GatewayReply, LoginError, OtpVerifier};
use crate::models::{CategoryList, EntryDraft, EntryType};
use crate::report::render;

const FEEDBACK_SUBJECT: &str = "BudgetWiz Feedback";

pub(crate) fn as_cli(
    args: &[String],
    ctx: &mut Context,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<()> {
    let Some(command) = args.first() else {
        print_usage(out)?;
        return Ok(());
    };
    let rest = &args[1..];
    match command.as_str() {
        "login" => cli_login(rest, ctx, input, out),
        "add" | "a" => cli_add(rest, ctx, out),
        "edit" | "e" => cli_edit(rest, ctx, out),
        "delete" | "rm" => cli_delete(rest, ctx, out),
        "list" | "ls" => cli_list(rest, ctx, out),
        "summary" | "s" => cli_summary(rest, ctx, out),
        "months" => cli_months(ctx, out),
        "categories" | "c" => cli_categories(rest, ctx, out),
        "export" => cli_export(rest, ctx, out),
        "profile" => cli_profile(rest, ctx, out),
        "feedback" => cli_feedback(rest, ctx, out),
        "--help" | "-h" | "help" => print_usage(out),
        "--version" | "-V" | "version" => {
            writeln!(out, "budgetwiz {}", env!("CARGO_PKG_VERSION"))?;
            Ok(())
        }
        other => {
            print_usage(out)?;
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

fn print_usage(out: &mut dyn Write) -> Result<()> {
    const USAGE: &str = "\
BudgetWiz: income and expense tracker

Usage: budgetwiz [--user <email>] [--db <path>] [command]

Commands:
  (none), shell                 Start an interactive session
  login <email>                 Sign in with a passcode sent by email
  add <income|expense> <amount> <category>
    --date <YYYY-MM-DD>         Entry date (default: today)
    --remarks <text>            Free-text note
  edit <id>                     Replace fields of an entry
    --type, --amount, --category, --date, --remarks
  delete <id>                   Delete an entry
  list [--month <M>]            Show entries, optionally for one month
  summary [--month <M>]         Totals, breakdown and trends
  months                        Months that have entries
  categories [income|expense]   Show category lists
  categories add <type> <name>  Add a category
  categories remove <type> <name>
  export [path] [--month <M>]   Export entries to CSV
  profile [--name <name>]       Show or update your profile
  feedback <message>            Send feedback by email
  --help, -h                    Show this help
  --version, -V                 Show version

Months: YYYY-MM, \"Jan 24\" or \"January 2024\".";
    writeln!(out, "{USAGE}")?;
    Ok(())
}

// ── Argument helpers ─────────────────────────────────────────

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

/// Arguments that are neither `--flags` nor their values.
fn positionals(args: &[String]) -> Vec<&str> {
    let mut found = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
        } else if arg.starts_with("--") {
            skip_next = true;
        } else {
            found.push(arg.as_str());
        }
    }
    found
}

fn month_flag(args: &[String]) -> Result<Option<YearMonth>> {
    flag(args, "--month")
        .map(|raw| {
            YearMonth::parse(raw)
                .ok_or_else(|| anyhow::anyhow!("Unrecognised month '{raw}': use YYYY-MM or \"Jan 24\""))
        })
        .transpose()
}

fn kind_arg(raw: &str) -> Result<EntryType> {
    EntryType::parse(raw)
        .ok_or_else(|| anyhow::anyhow!("Unknown entry type '{raw}': use income or expense"))
}

/// Snap the typed category to the stored spelling; unknown names are kept
/// as typed with a notice.
fn resolve_category(
    list: &CategoryList,
    typed: &str,
    out: &mut dyn Write,
) -> Result<String> {
    if let Some(known) = list.find_by_name(typed.trim()) {
        return Ok(known.to_string());
    }
    tracing::warn!(category = typed, kind = %list.kind, "category not in list");
    writeln!(
        out,
        "Note: '{}' is not one of your {} categories",
        typed.trim(),
        list.kind
    )?;
    Ok(typed.trim().to_string())
}

// ── Login ────────────────────────────────────────────────────

fn cli_login(
    args: &[String],
    ctx: &mut Context,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<()> {
    let email = positionals(args)
        .first()
        .map(|e| e.to_string())
        .or_else(|| ctx.user().map(str::to_string));
    let Some(email) = email else {
        anyhow::bail!("Usage: budgetwiz login <email>");
    };

    let mut verifier = OtpVerifier::new(ctx.settings.otp_policy());
    verifier.request(ctx.gateway, &email, Utc::now())?;
    if let Some(pending) = verifier.pending_email() {
        writeln!(out, "A passcode was sent to {pending}")?;
    }

    let verified = loop {
        write!(out, "Passcode: ")?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            anyhow::bail!("Login cancelled");
        }
        match verifier.verify(&line, Utc::now()) {
            Ok(email) => break email,
            Err(err @ (LoginError::MissingCode | LoginError::Mismatch { .. })) => {
                writeln!(out, "{err}")?;
            }
            Err(err) => return Err(err.into()),
        }
    };

    let profile = ctx
        .db
        .record_login(&verified, Utc::now().timestamp_millis())?;
    ctx.db.ensure_category_lists(&verified)?;
    ctx.set_user(&verified);
    writeln!(out, "Signed in as {}", profile.display_name())?;
    Ok(())
}

// ── Entries ──────────────────────────────────────────────────

fn cli_add(args: &[String], ctx: &mut Context, out: &mut dyn Write) -> Result<()> {
    let user = ctx.require_user()?;
    let pos = positionals(args);
    if pos.len() < 3 {
        anyhow::bail!(
            "Usage: budgetwiz add <income|expense> <amount> <category> [--date D] [--remarks R]"
        );
    }
    let kind = kind_arg(pos[0])?;
    let list = ctx.db.get_category_list(&user, kind)?;
    let category = resolve_category(&list, &pos[2..].join(" "), out)?;

    let draft = EntryDraft {
        kind,
        amount: pos[1].to_string(),
        category,
        remarks: flag(args, "--remarks").unwrap_or_default().to_string(),
        date: flag(args, "--date")
            .map(str::to_string)
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string()),
    };
    let doc = draft.validate()?;
    let id = ctx.db.insert_entry(&user, &doc)?;
    writeln!(
        out,
        "Added {} {} ({}) on {} [{id}]",
        doc.kind, doc.amount, doc.category, doc.date
    )?;
    Ok(())
}

fn cli_edit(args: &[String], ctx: &mut Context, out: &mut dyn Write) -> Result<()> {
    let user = ctx.require_user()?;
    let Some(id) = positionals(args).first().map(|s| s.to_string()) else {
        anyhow::bail!("Usage: budgetwiz edit <id> [--type T] [--amount A] [--category C] [--date D] [--remarks R]");
    };
    let Some(existing) = ctx.db.get_entry(&user, &id)? else {
        anyhow::bail!("Entry not found: {id}");
    };

    let mut draft = EntryDraft::from_entry(&existing);
    if let Some(kind) = flag(args, "--type") {
        draft.kind = kind_arg(kind)?;
    }
    if let Some(amount) = flag(args, "--amount") {
        draft.amount = amount.to_string();
    }
    if let Some(category) = flag(args, "--category") {
        let list = ctx.db.get_category_list(&user, draft.kind)?;
        draft.category = resolve_category(&list, category, out)?;
    }
    if let Some(date) = flag(args, "--date") {
        draft.date = date.to_string();
    }
    if let Some(remarks) = flag(args, "--remarks") {
        draft.remarks = remarks.to_string();
    }

    let doc = draft.validate()?;
    if doc == existing.to_document() {
        writeln!(out, "Nothing to change")?;
        return Ok(());
    }
    ctx.db.replace_entry(&user, &id, &doc)?;
    writeln!(out, "Updated {id}")?;
    Ok(())
}

fn cli_delete(args: &[String], ctx: &mut Context, out: &mut dyn Write) -> Result<()> {
    let user = ctx.require_user()?;
    let Some(id) = positionals(args).first().map(|s| s.to_string()) else {
        anyhow::bail!("Usage: budgetwiz delete <id>");
    };
    if ctx.db.delete_entry(&user, &id)? {
        writeln!(out, "Deleted {id}")?;
        Ok(())
    } else {
        anyhow::bail!("Entry not found: {id}")
    }
}

// ── Reports ──────────────────────────────────────────────────

fn cli_list(args: &[String], ctx: &mut Context, out: &mut dyn Write) -> Result<()> {
    let user = ctx.require_user()?;
    let month = month_flag(args)?;
    let all = ctx.entries(&user)?;
    let (heading, entries) = match month {
        Some(m) => (m.long_label(), analytics::entries_in_month(&all, m)),
        None => ("All entries".to_string(), all),
    };
    write!(
        out,
        "{}",
        render::entries(&heading, &entries, &ctx.settings.currency_symbol)
    )?;
    Ok(())
}

fn cli_summary(args: &[String], ctx: &mut Context, out: &mut dyn Write) -> Result<()> {
    let user = ctx.require_user()?;
    let month = month_flag(args)?;
    let all = ctx.entries(&user)?;
    let (heading, entries) = match month {
        Some(m) => (m.long_label(), analytics::entries_in_month(&all, m)),
        None => ("All time".to_string(), all),
    };
    write!(
        out,
        "{}",
        render::dashboard(
            &heading,
            &analytics::summarize(&entries),
            &analytics::category_series(&entries),
            &analytics::monthly_series(&entries),
            &ctx.settings.currency_symbol,
        )
    )?;
    Ok(())
}

fn cli_months(ctx: &mut Context, out: &mut dyn Write) -> Result<()> {
    let user = ctx.require_user()?;
    let entries = ctx.entries(&user)?;
    write!(out, "{}", render::months(&analytics::available_months(&entries)))?;
    Ok(())
}

fn cli_export(args: &[String], ctx: &mut Context, out: &mut dyn Write) -> Result<()> {
    let user = ctx.require_user()?;
    let month = month_flag(args)?;
    let path = positionals(args)
        .first()
        .map(|p| crate::export::shellexpand(p))
        .unwrap_or_else(|| crate::export::default_path(month));

    let all = ctx.entries(&user)?;
    let entries = match month {
        Some(m) => analytics::entries_in_month(&all, m),
        None => all,
    };
    if entries.is_empty() {
        writeln!(out, "No entries to export")?;
        return Ok(());
    }
    let count = crate::export::export_to_file(&path, &entries)?;
    writeln!(out, "Exported {count} entries to {}", path.display())?;
    Ok(())
}

// ── Categories ───────────────────────────────────────────────

fn cli_categories(args: &[String], ctx: &mut Context, out: &mut dyn Write) -> Result<()> {
    let user = ctx.require_user()?;
    let pos = positionals(args);
    match pos.first().copied() {
        Some("add") => {
            if pos.len() < 3 {
                anyhow::bail!("Usage: budgetwiz categories add <income|expense> <name>");
            }
            let kind = kind_arg(pos[1])?;
            let added = ctx.db.add_category(&user, kind, &pos[2..].join(" "))?;
            writeln!(out, "Added {kind} category '{added}'")?;
        }
        Some("remove" | "rm") => {
            if pos.len() < 3 {
                anyhow::bail!("Usage: budgetwiz categories remove <income|expense> <name>");
            }
            let kind = kind_arg(pos[1])?;
            let name = pos[2..].join(" ");
            if ctx.db.remove_category(&user, kind, &name)? {
                writeln!(out, "Removed {kind} category '{name}'")?;
            } else {
                anyhow::bail!("No {kind} category named '{name}'");
            }
        }
        Some(kind) => {
            let list = ctx.db.get_category_list(&user, kind_arg(kind)?)?;
            write!(out, "{}", render::categories(&[list]))?;
        }
        None => {
            let lists = EntryType::all()
                .iter()
                .map(|kind| ctx.db.get_category_list(&user, *kind))
                .collect::<Result<Vec<_>>>()?;
            write!(out, "{}", render::categories(&lists))?;
        }
    }
    Ok(())
}

// ── Profile & feedback ───────────────────────────────────────

fn cli_profile(args: &[String], ctx: &mut Context, out: &mut dyn Write) -> Result<()> {
    let user = ctx.require_user()?;
    if let Some(name) = flag(args, "--name") {
        if name.trim().is_empty() {
            anyhow::bail!("Name cannot be empty");
        }
        ctx.db
            .update_profile_name(&user, name, Utc::now().timestamp_millis())?;
        writeln!(out, "Profile updated")?;
    }

    let profile = ctx.db.get_profile(&user)?.unwrap_or_default();
    writeln!(out, "Email:   {user}")?;
    writeln!(out, "Name:    {}", profile.name)?;
    if let Some(created) = chrono::DateTime::from_timestamp_millis(profile.creation_date)
        .filter(|_| profile.creation_date > 0)
    {
        writeln!(out, "Since:   {}", created.format("%Y-%m-%d"))?;
    }
    Ok(())
}

fn cli_feedback(args: &[String], ctx: &mut Context, out: &mut dyn Write) -> Result<()> {
    let user = ctx.require_user()?;
    let message = positionals(args).join(" ");
    if message.trim().is_empty() {
        anyhow::bail!("Usage: budgetwiz feedback <message>");
    }
    let profile = ctx.db.get_profile(&user)?.unwrap_or_default();
    let name = if profile.name.trim().is_empty() {
        user.as_str()
    } else {
        profile.name.as_str()
    };
    let body = format!("User Name: {name}\nUser Email: {user}\n\nFeedback:\n{}", message.trim());

    let reply: GatewayReply = ctx.gateway.send_email(&user, FEEDBACK_SUBJECT, &body).map_err(|err| {
        tracing::error!("feedback delivery failed: {err:#}");
        err
    })?;
    if !reply.success {
        anyhow::bail!(
            "Failed to send feedback: {}",
            reply.message.unwrap_or_else(|| "no reason given".into())
        );
    }
    writeln!(out, "Thank you for your feedback!")?;
    Ok(())
}
