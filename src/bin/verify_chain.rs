//! Chain verification CLI.
//!
//! Replays an audit chain straight from the database and reports the
//! first break, for periodic integrity jobs and on-demand audits.
//! Exits non-zero when the chain is broken.

use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use tracing::info;

use audit_chain::{AuditChain, AuditConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("verify-chain")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Verify audit chain integrity")
        .arg(
            Arg::new("database-url")
                .short('d')
                .long("database-url")
                .value_name("URL")
                .help("Database URL (defaults to AUDIT_DATABASE_URL)"),
        )
        .arg(
            Arg::new("chain")
                .short('c')
                .long("chain")
                .value_name("ID")
                .help("Chain to verify (defaults to AUDIT_CHAIN_ID)"),
        )
        .arg(
            Arg::new("from")
                .long("from")
                .value_name("SEQ")
                .value_parser(clap::value_parser!(i64))
                .help("First sequence to verify (anchors on the entry before it)"),
        )
        .arg(
            Arg::new("to")
                .long("to")
                .value_name("SEQ")
                .value_parser(clap::value_parser!(i64))
                .help("Last sequence to verify"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Suppress output except errors"),
        )
        .get_matches();

    let quiet = matches.get_flag("quiet");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                if quiet { "error".into() } else { "audit_chain=info".into() }
            }),
        )
        .init();

    let mut config = AuditConfig::load()?;
    if let Some(url) = matches.get_one::<String>("database-url") {
        config.database_url = url.clone();
    }
    if let Some(chain) = matches.get_one::<String>("chain") {
        config.chain_id = chain.clone();
    }
    let from = matches.get_one::<i64>("from").copied();
    let to = matches.get_one::<i64>("to").copied();

    info!("Verifying chain '{}' at {}", config.chain_id, config.database_url);

    let chain = AuditChain::from_config(&config).await?;
    let report = chain.verify(from, to).await?;

    if !quiet {
        println!("{}", report.summary());
    }

    if !report.valid {
        std::process::exit(1);
    }
    Ok(())
}
