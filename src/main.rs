mod analytics;
mod auth;
mod db;
mod export;
mod models;
mod report;
mod run;
mod settings;

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Flags accepted before the command name.
#[derive(Debug, Default, PartialEq)]
struct GlobalArgs {
    user: Option<String>,
    db: Option<PathBuf>,
}

fn split_globals(args: &[String]) -> Result<(GlobalArgs, &[String])> {
    let mut globals = GlobalArgs::default();
    let mut rest = args;
    while let Some(first) = rest.first() {
        let slot = match first.as_str() {
            "--user" | "-u" => "user",
            "--db" => "db",
            _ => break,
        };
        let Some(value) = rest.get(1) else {
            anyhow::bail!("{first} needs a value");
        };
        match slot {
            "user" if !auth::is_valid_email(value) => {
                anyhow::bail!("'{value}' is not a valid email address");
            }
            "user" => globals.user = Some(value.clone()),
            _ => globals.db = Some(PathBuf::from(value)),
        }
        rest = &rest[2..];
    }
    Ok((globals, rest))
}

fn init_logging(default_level: &str) {
    // RUST_LOG wins over the configured level.
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(default_level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (globals, command) = split_globals(&args)?;

    let mut settings = settings::Settings::load()?;
    init_logging(&settings.log_level);
    if let Some(path) = globals.db {
        settings.database = Some(path);
    }
    let user = globals.user.or_else(|| settings.user.clone());

    let mut db = db::Database::open(&settings.db_path()?)?;
    let gateway = auth::HttpGateway::new(&settings.otp_url, &settings.mail_url)?;
    let mut ctx = run::Context::new(&mut db, &settings, &gateway, user);

    let mut input = std::io::stdin().lock();
    let mut out = std::io::stdout().lock();
    match command.first().map(String::as_str) {
        None | Some("shell") => run::as_shell(&mut ctx, &mut input, &mut out),
        Some(_) => run::as_cli(command, &mut ctx, &mut input, &mut out),
    }
}
