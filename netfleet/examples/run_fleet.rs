//! Fleet example: run a command catalog across an inventory file
//!
//! Reads hosts and commands from JSON, runs them with bounded concurrency
//! and writes one transcript per device.
//!
//! # Inventory format
//!
//! ```json
//! [
//!   {
//!     "name": "R1",
//!     "hostname": "10.0.0.1",
//!     "platform": "cisco",
//!     "groups": ["cisco"],
//!     "credentials": {"username": "admin", "password": "secret", "enable_secret": "enable"}
//!   }
//! ]
//! ```
//!
//! # Catalog format
//!
//! ```json
//! {"cisco": ["show version", "show ip interface brief"]}
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --example run_fleet -- --inventory hosts.json --commands commands.json \
//!     --workers 50 --deadline 600 --out output
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use netfleet::{
    CommandCatalog, DriverOptions, FleetConfig, FleetScheduler, Host, HostKeyVerification,
    TranscriptWriter,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let hosts: Vec<Host> = serde_json::from_str(&std::fs::read_to_string(&args.inventory)?)?;
    let catalog: CommandCatalog = serde_json::from_str(&std::fs::read_to_string(&args.commands)?)?;
    println!(
        "Loaded {} hosts and {} command groups",
        hosts.len(),
        catalog.len()
    );

    let mut config = FleetConfig::default()
        .with_workers(args.workers)
        .with_driver_options(
            DriverOptions::default()
                .with_command_timeout(Duration::from_secs(args.timeout))
                .with_host_key_verification(HostKeyVerification::AcceptNew),
        );
    if let Some(deadline) = args.deadline {
        config = config.with_deadline(Duration::from_secs(deadline));
    }

    let scheduler = FleetScheduler::new(config);
    for host in hosts.iter().filter(|h| !scheduler.registry().contains(&h.platform)) {
        eprintln!("Warning: {} has unsupported platform '{}'", host.name, host.platform);
    }

    let report = scheduler
        .run(hosts.into_iter().map(Arc::new), Arc::new(catalog))
        .await;

    println!("{}", "-".repeat(50));
    for result in &report.results {
        match &result.overall_error {
            Some(error) => println!("{:<24} {:<18} {}", result.host.name, result.stage, error),
            None => println!(
                "{:<24} {:<18} {} commands",
                result.host.name,
                result.stage,
                result.outcomes.len()
            ),
        }
    }
    println!("{}", "-".repeat(50));
    println!("{}", report.summary());

    let writer = TranscriptWriter::new(&args.out);
    let written = writer.write_all(&report).await;
    println!("Wrote {} transcripts to {}", written.len(), writer.dir().display());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    inventory: PathBuf,
    commands: PathBuf,
    out: PathBuf,
    workers: usize,
    deadline: Option<u64>,
    timeout: u64,
    json: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut inventory = PathBuf::from("hosts.json");
        let mut commands = PathBuf::from("commands.json");
        let mut out = PathBuf::from("output");
        let mut workers = 100usize;
        let mut deadline = None;
        let mut timeout = 60u64;
        let mut json = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--inventory" | "-i" => {
                    i += 1;
                    if i < args.len() {
                        inventory = PathBuf::from(&args[i]);
                    }
                }
                "--commands" | "-c" => {
                    i += 1;
                    if i < args.len() {
                        commands = PathBuf::from(&args[i]);
                    }
                }
                "--out" | "-o" => {
                    i += 1;
                    if i < args.len() {
                        out = PathBuf::from(&args[i]);
                    }
                }
                "--workers" | "-w" => {
                    i += 1;
                    if i < args.len() {
                        workers = args[i].parse().unwrap_or(100);
                    }
                }
                "--deadline" | "-d" => {
                    i += 1;
                    if i < args.len() {
                        deadline = args[i].parse().ok();
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(60);
                    }
                }
                "--json" => json = true,
                "--help" => {
                    println!("Usage: run_fleet [OPTIONS]");
                    println!();
                    println!("Options:");
                    println!("  -i, --inventory <FILE>  Inventory JSON [default: hosts.json]");
                    println!("  -c, --commands <FILE>   Command catalog JSON [default: commands.json]");
                    println!("  -o, --out <DIR>         Transcript directory [default: output]");
                    println!("  -w, --workers <N>       Concurrent sessions [default: 100]");
                    println!("  -d, --deadline <SECS>   Deadline for the whole run");
                    println!("  -t, --timeout <SECS>    Per-command timeout [default: 60]");
                    println!("      --json              Print the report as JSON");
                    std::process::exit(0);
                }
                _ => {}
            }
            i += 1;
        }

        Self {
            inventory,
            commands,
            out,
            workers,
            deadline,
            timeout,
            json,
        }
    }
}
