use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use imagecompare::loadgen::{self, LoadTestConfig, WaitTime};

/// Replay `POST /compare` under simulated concurrent users.
#[derive(Parser, Debug)]
#[command(name = "loadgen", version, about)]
struct Args {
    /// Base URL of the image comparison service
    #[arg(long, default_value = "http://localhost:8000")]
    host: String,

    /// Number of simulated users
    #[arg(short, long, default_value_t = 10)]
    users: usize,

    /// Users started per second
    #[arg(short = 'r', long, default_value_t = 1.0)]
    spawn_rate: f64,

    /// Minimum pause between a user's requests, in seconds
    #[arg(long, default_value_t = 1.0)]
    min_wait: f64,

    /// Maximum pause between a user's requests, in seconds
    #[arg(long, default_value_t = 3.0)]
    max_wait: f64,

    /// Stop after this many seconds
    #[arg(short = 't', long, default_value_t = 60)]
    run_time: u64,

    /// Stop each user after this many requests
    #[arg(short = 'n', long)]
    iterations: Option<usize>,

    /// First image file (a placeholder is used if unreadable)
    #[arg(long)]
    image1: Option<PathBuf>,

    /// Second image file (a placeholder is used if unreadable)
    #[arg(long)]
    image2: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    imagecompare::init()?;
    let args = Args::parse();

    let config = LoadTestConfig {
        host: args.host,
        users: args.users,
        spawn_rate: args.spawn_rate,
        wait: WaitTime::between(args.min_wait, args.max_wait)?,
        run_time: Some(Duration::from_secs(args.run_time)),
        iterations: args.iterations,
        image1: args.image1,
        image2: args.image2,
    };

    let report = loadgen::run(config).await?;
    println!("{}", report);

    if report.failure_count() > 0 {
        std::process::exit(1);
    }
    Ok(())
}
