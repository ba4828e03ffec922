//! TokenPulse CLI
//!
//! Command-line client for a running TokenPulse daemon:
//! - Leaderboards and trending tokens
//! - Sentiment distributions
//! - Token search
//! - Status and config generation

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tokenpulse-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query a running TokenPulse daemon")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8090", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Top tokens by a field
    Tokens {
        /// Ranking field (market_cap, volume, sentiment, liquidity, makers, age_hours)
        #[arg(short = 'F', long, default_value = "market_cap")]
        field: String,
        /// Number of tokens
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Tokens with the most tweets in a trailing window
    Trending {
        #[arg(short, long, default_value = "5")]
        limit: usize,
        /// Window length in hours
        #[arg(long, default_value = "24")]
        hours: i64,
    },

    /// Per-token sentiment box plots
    Distribution,

    /// Look up a token by symbol or address
    Search {
        query: String,
    },

    /// Show daemon status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Tokens { ref field, limit } => {
            let url = format!(
                "{}/api/v1/leaderboard?field={}&limit={}",
                cli.api_url,
                urlencoding::encode(field),
                limit
            );
            let data = get_json(&client, &url).await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                print_tokens(&data["tokens"], None);
            }
        }

        Commands::Trending { limit, hours } => {
            let url = format!(
                "{}/api/v1/trending?limit={}&hours={}",
                cli.api_url, limit, hours
            );
            let data = get_json(&client, &url).await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!("Trending over the last {}h", hours);
                println!();
                print_tokens(&data["tokens"], Some("tweet_count"));
            }
        }

        Commands::Distribution => {
            let data = get_json(&client, &format!("{}/api/v1/distribution", cli.api_url)).await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                print_distribution(&data["tokens"]);
            }
        }

        Commands::Search { ref query } => {
            let url = format!(
                "{}/api/v1/search?q={}",
                cli.api_url,
                urlencoding::encode(query)
            );
            let data = get_json(&client, &url).await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                let results = data["results"].as_array().cloned().unwrap_or_default();
                if results.is_empty() {
                    println!("No match for '{}'", query);
                }
                for profile in results {
                    println!(
                        "{:<10} {:<24} {:>14} {}",
                        profile["symbol"].as_str().unwrap_or("-"),
                        profile["name"].as_str().unwrap_or("-"),
                        format_number(&profile["market_cap"]),
                        profile["address"].as_str().unwrap_or("-"),
                    );
                }
            }
        }

        Commands::Status => {
            let response = client
                .get(format!("{}/health", cli.api_url))
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let health: Value = resp.json().await?;

                    if cli.format == "json" {
                        println!("{}", serde_json::to_string_pretty(&health)?);
                        return Ok(());
                    }

                    println!("TokenPulse v{}", health["version"].as_str().unwrap_or("?"));
                    println!();
                    println!("Status: {}", health["status"].as_str().unwrap_or("unknown"));
                    for name in ["tokens", "tweets"] {
                        let store = &health[name];
                        println!(
                            "  {:<7} {:<8} {:>6} records  live={}  realtime={}",
                            name,
                            store["load_state"]["state"].as_str().unwrap_or("unknown"),
                            store["count"].as_u64().unwrap_or(0),
                            store["live"].as_bool().unwrap_or(false),
                            store["realtime"].as_str().unwrap_or("unknown"),
                        );
                    }
                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Err(e) => {
                    eprintln!("Cannot connect to TokenPulse at {}", cli.api_url);
                    eprintln!();
                    eprintln!("Make sure the daemon is running:");
                    eprintln!("  cargo run --bin tokenpulse");
                    return Err(e.into());
                }
            }
        }

        Commands::Config { output } => {
            let config = tokenpulse::config::generate_default_config();

            if let Some(path) = output {
                std::fs::write(&path, config)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Config written to: {}", path.display());
            } else {
                println!("{}", config);
            }
        }
    }

    Ok(())
}

async fn get_json(client: &reqwest::Client, url: &str) -> anyhow::Result<Value> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?;

    if !response.status().is_success() {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or_default();
        let message = body["error"]["message"].as_str().unwrap_or("no details");
        bail!("API returned {}: {}", status, message);
    }

    Ok(response.json().await?)
}

fn print_tokens(tokens: &Value, extra: Option<&str>) {
    let tokens = match tokens.as_array() {
        Some(t) if !t.is_empty() => t,
        _ => {
            println!("No tokens");
            return;
        }
    };

    print!(
        "{:<4} {:<10} {:<20} {:>14} {:>14} {:>9}",
        "#", "Symbol", "Name", "Market Cap", "Volume", "Sentiment"
    );
    if let Some(column) = extra {
        print!(" {:>8}", column);
    }
    println!();
    println!("{}", "-".repeat(if extra.is_some() { 85 } else { 76 }));

    for (rank, token) in tokens.iter().enumerate() {
        print!(
            "{:<4} {:<10} {:<20} {:>14} {:>14} {:>9}",
            rank + 1,
            token["symbol"].as_str().unwrap_or("-"),
            truncate(token["name"].as_str().unwrap_or("-"), 20),
            format_number(&token["market_cap"]),
            format_number(&token["volume"]),
            token["sentiment_score"]
                .as_f64()
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "-".to_string()),
        );
        if let Some(column) = extra {
            print!(" {:>8}", token[column].as_u64().unwrap_or(0));
        }
        println!();
    }
}

fn print_distribution(tokens: &Value) {
    let tokens = match tokens.as_array() {
        Some(t) if !t.is_empty() => t,
        _ => {
            println!("No sentiment data yet");
            return;
        }
    };

    println!(
        "{:<10} {:>7} {:>7} {:>7} {:>7} {:>7} {:>6} {:>8}",
        "Symbol", "Min", "Q1", "Median", "Q3", "Max", "Count", "Outliers"
    );
    println!("{}", "-".repeat(66));

    for token in tokens {
        let stat = |key: &str| {
            token[key]
                .as_f64()
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "{:<10} {:>7} {:>7} {:>7} {:>7} {:>7} {:>6} {:>8}",
            token["symbol"].as_str().unwrap_or("-"),
            stat("min"),
            stat("q1"),
            stat("median"),
            stat("q3"),
            stat("max"),
            token["count"].as_u64().unwrap_or(0),
            token["outliers"].as_array().map(|o| o.len()).unwrap_or(0),
        );
    }
}

fn format_number(value: &Value) -> String {
    match value.as_f64() {
        Some(v) if v >= 1e9 => format!("{:.2}B", v / 1e9),
        Some(v) if v >= 1e6 => format!("{:.2}M", v / 1e6),
        Some(v) if v >= 1e3 => format!("{:.1}K", v / 1e3),
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{}…", cut)
    }
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}
