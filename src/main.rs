//! RusterScore CLI
//!
//! One-shot token scoring from the command line:
//!   cargo run -- 0xTOKEN [auto|fast|deep]
//!
//! Environment:
//!   SCORE_RPC_URL          - JSON-RPC endpoint (deep path + permissions)
//!   SCORE_INDEXER_API_KEY  - indexed provider key (enables fast mode)
//!   RUST_LOG               - log level (default: info)

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use ruster_score::models::types::ScoreMode;
use ruster_score::{ScoreResult, ScorerConfig, TokenScorer};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .compact()
        .init();

    print_banner();

    let mut args = std::env::args().skip(1);
    let token = match args.next() {
        Some(token) => token,
        None => {
            eprintln!("Usage: ruster_score <token_address> [auto|fast|deep]");
            std::process::exit(2);
        }
    };
    let mode = args
        .next()
        .and_then(|m| ScoreMode::parse(&m))
        .unwrap_or(ScoreMode::Auto);

    let scorer = Arc::new(TokenScorer::new(ScorerConfig::default())?);
    let result = scorer.score_token(&token, mode, 1, 1000).await?;

    print_summary(&result);
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ============================================================
       R U S T E R   S C O R E
       Multi-source token risk scoring (EOA / holders / perms)
    ============================================================
    "#
    );
}

fn print_summary(result: &ScoreResult) {
    println!("\n{}", "=".repeat(60));
    println!("  SCORING SUMMARY - {}", result.token_address);
    println!("{}", "=".repeat(60));
    println!(
        "\n  EOA Activity:        {:>5.1} / {:<3} [{}]",
        result.eoa.score,
        result.eoa.max_score,
        result.data_sources.eoa.as_str()
    );
    println!(
        "  Holder Analysis:     {:>5.1} / {:<3} [{}]",
        result.holder.score,
        result.holder.max_score,
        result.data_sources.holder.as_str()
    );
    println!(
        "  Permission Analysis: {:>5.1} / {:<3} [{}]",
        result.permission.score,
        result.permission.max_score,
        result.data_sources.permission.as_str()
    );
    println!("  {}", "-".repeat(40));
    println!("  TOTAL SCORE:         {:>5.1} / 100", result.total_score);
    println!(
        "\n  Risk Level: {} {}",
        result.risk_level.emoji(),
        result.risk_level.label()
    );

    if !result.risk_tags.is_empty() {
        println!("\n  Risk Tags:");
        for tag in &result.risk_tags {
            let marker = match tag.tag_type() {
                "success" => "[OK]",
                "warning" => "[!]",
                _ => "[X]",
            };
            println!("    {} {}", marker, tag.label());
        }
    }
    println!("\n{}\n", "=".repeat(60));
}
