//! Tor v3 Onion Vanity Address Generator CLI
//!
//! Usage:
//!   onion-vanity -e '^abc'                  # Address starting with "abc"
//!   onion-vanity -e 'dead' -w 4             # Address containing "dead", 4 workers
//!   onion-vanity -e '^ab' -o ./keys         # Also write a hidden service directory

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::warn;

use onion_vanity::worker::format_number;
use onion_vanity::{write_hidden_service, Config, SearchResult, WorkerPool};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    // Validate configuration before any worker starts
    let search_config = match config.search_config() {
        Ok(search_config) => search_config,
        Err(e) => fail(&e),
    };

    if let Some(dir) = &config.out_dir {
        if !dir.is_dir() {
            fail(&format!("'{}' is not a directory", dir.display()));
        }
    }

    println!("Tor v3 Onion Vanity Address Generator");
    println!("=====================================");
    println!("Pattern:    {}", search_config.pattern());
    println!("Workers:    {}", search_config.workers());
    println!();

    let stop_flag = Arc::new(AtomicBool::new(false));
    ctrlc_handler(stop_flag.clone());

    println!("Searching... (Press Ctrl+C to stop)\n");

    let result = match WorkerPool::new(search_config).with_stop_flag(stop_flag).run() {
        Ok(result) => result,
        Err(e) => fail(&e),
    };

    print_result(&result);

    if let Some(dir) = &config.out_dir {
        match write_hidden_service(dir, &result.address, &result.keypair) {
            Ok(path) => println!("Saved to:    {}", path.display()),
            Err(e) => fail(&e),
        }
    }
}

fn print_result(result: &SearchResult) {
    println!("=== Match ===");
    println!("Address:     {}", result.address);
    println!("Private Key: {}", result.private_key_hex());
    println!("Worker:      {}", result.worker_id);
    println!();
    println!("--- Statistics ---");
    println!("Total keys generated: {}", format_number(result.keys_tried));
    println!("Time elapsed:         {:.2}s", result.elapsed.as_secs_f64());
    println!(
        "Average speed:        {}/s",
        format_number(result.keys_per_second() as u64)
    );
}

fn fail(error: &dyn std::fmt::Display) -> ! {
    eprintln!("Error: {}", error);
    process::exit(1);
}

fn ctrlc_handler(stop_flag: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        stop_flag.store(true, Ordering::Release);
    }) {
        warn!("failed to install Ctrl-C handler: {}", e);
    }
}
