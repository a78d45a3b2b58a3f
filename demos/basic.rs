//! Basic example: set up the global logger, throttle a noisy message and
//! tag lines with a context prefix.
//!
//! Run with `cargo run --example basic`. Lines go to stderr.

use throttle_log::{global, Context, Severity};

fn main() {
    let logger = global();

    // Primary sink on stderr, admitting DEBUG and above
    logger.setup_logging("debug");

    println!("=== Basic Example ===\n");

    throttle_log::info!("starting up, pid {}", std::process::id());
    throttle_log::debug!("debug lines pass the threshold too");

    // Raise the threshold at runtime; DEBUG is now dropped
    logger.set_level(Severity::Info);
    throttle_log::debug!("this line is dropped");

    println!("\nEmitting 10 refused connections, at most 3 per hour:");
    for port in 8000..8010 {
        throttle_log::log_throttle!(Severity::Warn, 3, "connection to port {} refused", port);
    }

    println!("\nExplicit keys have independent budgets:");
    for attempt in 1..=5 {
        throttle_log::log_throttle_key!(Severity::Error, 2, "db-primary", "primary unreachable, attempt {}", attempt);
        throttle_log::log_throttle_key!(Severity::Error, 2, "db-replica", "replica unreachable, attempt {}", attempt);
    }

    println!("\nContext prefixes nest:");
    let request = Context::background().with_prefix("req=7");
    let user = request.extend_prefix("user=alice");
    throttle_log::info_ctx!(request, "request accepted");
    throttle_log::warn_ctx!(user, "quota at {}%", 91);

    let snapshot = logger.metrics().snapshot();
    println!("\n=== Example Complete ===");
    println!(
        "written: {}, throttled away: {}, suppression rate: {:.0}%",
        snapshot.lines_written,
        snapshot.throttle_suppressed,
        snapshot.suppression_rate() * 100.0
    );
}
