//! expiremap - Demonstration Driver
//!
//! Runs a fixed set of scenarios against an [`ExpiringMap`] from several
//! threads and reports PASS/FAIL for each. Exits non-zero if any fail.

use anyhow::Context;
use expiremap::ExpiringMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

type DemoMap = Arc<ExpiringMap<String, String>>;

/// Driver configuration
#[derive(Default)]
struct Config {
    /// Log at debug level
    verbose: bool,
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();

        for arg in std::env::args().skip(1) {
            match arg.as_str() {
                "--verbose" | "-v" => config.verbose = true,
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-V" => {
                    println!("expiremap version {}", expiremap::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", arg);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }
}

fn print_help() {
    println!(
        r#"
expiremap - Concurrent Map With Per-Entry Expiry (demo driver)

USAGE:
    expiremap [OPTIONS]

OPTIONS:
    -v, --verbose        Log reclaimer activity at debug level
    -V, --version        Print version information
        --help           Print this help message

ENVIRONMENT:
    RUST_LOG             Log filter directives (overrides --verbose)
"#
    );
}

fn s(value: &str) -> String {
    value.to_string()
}

fn sleep_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}

/// Joins a scenario thread, turning a panic into a failed check.
fn join<T>(handle: thread::JoinHandle<T>) -> Option<T> {
    handle.join().ok()
}

fn basic_put_get(map: &DemoMap) -> bool {
    map.put_millis(s("key1"), s("value1"), 1000);
    let value = map.get("key1");
    debug!(?value, "key1 read back");
    value.as_deref() == Some("value1")
}

fn expiration(map: &DemoMap) -> bool {
    map.put_millis(s("key2"), s("value2"), 500);
    let before = map.get("key2");
    sleep_ms(600);
    let after = map.get("key2");
    debug!(?before, ?after, "key2 around its deadline");
    before.is_some() && after.is_none()
}

fn remove(map: &DemoMap) -> bool {
    map.put_millis(s("key3"), s("value3"), 1000);
    let before = map.get("key3");
    map.remove("key3");
    before.is_some() && map.get("key3").is_none()
}

fn concurrent_put_get(map: &DemoMap) -> bool {
    let writer = {
        let map = Arc::clone(map);
        thread::spawn(move || map.put_millis(s("key4"), s("value4"), 1000))
    };
    let writer_ok = join(writer).is_some();

    let reader = {
        let map = Arc::clone(map);
        thread::spawn(move || map.get("key4"))
    };
    writer_ok && join(reader).flatten().as_deref() == Some("value4")
}

fn concurrent_put_expiration(map: &DemoMap) -> bool {
    let writer = {
        let map = Arc::clone(map);
        thread::spawn(move || map.put_millis(s("key6"), s("value6"), 500))
    };
    let reader = {
        let map = Arc::clone(map);
        thread::spawn(move || {
            sleep_ms(600);
            map.get("key6")
        })
    };
    join(writer).is_some() && matches!(join(reader), Some(None))
}

fn concurrent_put_remove(map: &DemoMap) -> bool {
    let writer = {
        let map = Arc::clone(map);
        thread::spawn(move || map.put_millis(s("key5"), s("value5"), 1000))
    };
    let writer_ok = join(writer).is_some();

    let remover = {
        let map = Arc::clone(map);
        thread::spawn(move || {
            map.remove("key5");
        })
    };
    writer_ok && join(remover).is_some() && map.get("key5").is_none()
}

fn concurrent_put_expiration_remove(map: &DemoMap) -> bool {
    let writer = {
        let map = Arc::clone(map);
        thread::spawn(move || map.put_millis(s("key7"), s("value7"), 500))
    };
    let remover = {
        let map = Arc::clone(map);
        thread::spawn(move || {
            sleep_ms(600);
            map.remove("key7");
        })
    };
    join(writer).is_some() && join(remover).is_some() && map.get("key7").is_none()
}

fn replace_existing(map: &DemoMap) -> bool {
    map.put_millis(s("key8"), s("initialValue"), 1000);
    let initial = map.get("key8");
    let len = map.len();
    map.put_millis(s("key8"), s("newValue"), 1000);
    debug!(?initial, "key8 before replacement");
    map.get("key8").as_deref() == Some("newValue") && map.len() == len
}

fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    // Set up logging; RUST_LOG overrides the level picked by --verbose
    let level = if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let map: DemoMap = Arc::new(ExpiringMap::new().context("failed to create map")?);
    info!("Map created with {} buckets", map.bucket_count());

    let scenarios: [(&str, fn(&DemoMap) -> bool); 8] = [
        ("Basic put and get", basic_put_get),
        ("Expiration", expiration),
        ("Remove", remove),
        ("Concurrent put and get", concurrent_put_get),
        ("Concurrent put and expiration", concurrent_put_expiration),
        ("Concurrent put and remove", concurrent_put_remove),
        (
            "Concurrent put, expiration and remove",
            concurrent_put_expiration_remove,
        ),
        ("Replace existing entry", replace_existing),
    ];

    let mut failed = 0;
    for (i, (name, scenario)) in scenarios.iter().enumerate() {
        let passed = scenario(&map);
        if !passed {
            failed += 1;
        }
        println!(
            "Test {}: {} test {}",
            i + 1,
            name,
            if passed { "PASSED" } else { "FAILED" }
        );
    }

    let stats = map.stats();
    info!(
        entries = stats.entries,
        puts = stats.puts,
        gets = stats.gets,
        expired = stats.expired,
        "Scenarios finished"
    );

    if failed > 0 {
        anyhow::bail!("{} of {} scenarios failed", failed, scenarios.len());
    }
    Ok(())
}
