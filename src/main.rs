//! termcursor - terminal cursor probe and progress demo
//!
//! Runs a handful of worker threads that each redraw their own progress bar
//! row on standard output through one shared cursor. Also reports what the
//! library detected about the current terminal.
//!
//! # Quick Start
//!
//! ```text
//! termcursor                 # 4 concurrent progress bars
//! termcursor -t 10           # 10 bars
//! termcursor --info          # detection report for stdout and stderr
//! termcursor --query         # raw reply to the position query
//! ```

use std::env;
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use termcursor::core::env::CONSULTED;
use termcursor::core::raw_input::StdinChannel;
use termcursor::cursor::ansi::{self, QuerySettings};
use termcursor::{
    ColorAttribute, Config, Cursor, CursorError, CursorRegistry, StreamHandle, TerminalKind,
};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long `--query` waits when the config sets no timeout
const DEFAULT_QUERY_WAIT: Duration = Duration::from_secs(1);

/// One bar per terminal row, and rows are `u16`
const MAX_THREADS: usize = u16::MAX as usize;

const BAR_COLORS: [ColorAttribute; 6] = [
    ColorAttribute::FOREGROUND_DARK_GREEN,
    ColorAttribute::FOREGROUND_DARK_CYAN,
    ColorAttribute::FOREGROUND_DARK_YELLOW,
    ColorAttribute::FOREGROUND_DARK_MAGENTA,
    ColorAttribute::FOREGROUND_DARK_BLUE,
    ColorAttribute::FOREGROUND_DARK_RED,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Demo,
    Info,
    Query,
}

/// Command line options
#[derive(Debug)]
struct Options {
    mode: Mode,
    threads: usize,
    steps: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mode: Mode::Demo,
            threads: 4,
            steps: 40,
        }
    }
}

fn print_version() {
    eprintln!("termcursor {}", VERSION);
}

fn print_help() {
    eprintln!("termcursor {} - terminal cursor probe and progress demo", VERSION);
    eprintln!();
    eprintln!("Usage: termcursor [OPTIONS]");
    eprintln!();
    eprintln!("Mode options:");
    eprintln!("  (default)             Concurrent progress bars on stdout");
    eprintln!("  --info                Report terminal kind, size and position");
    eprintln!("  --query               Send the position query and dump the raw reply");
    eprintln!();
    eprintln!("Demo options:");
    eprintln!("  -t, --threads <N>     Number of progress bars (default: 4)");
    eprintln!("  --steps <N>           Steps per bar (default: 40)");
    eprintln!();
    eprintln!("Other options:");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Configuration: ~/.termcursor/config.toml (override with TERMCURSOR_CONFIG)");
    eprintln!("Log file:      ~/.termcursor/termcursor.log");
}

fn parse_count(args: &[String], i: usize, flag: &str, max: usize) -> Result<usize, String> {
    let value = args
        .get(i)
        .ok_or_else(|| format!("Missing value for {}", flag))?;
    match value.parse::<usize>() {
        Ok(n) if n > 0 && n <= max => Ok(n),
        _ => Err(format!("Invalid value for {}: {}", flag, value)),
    }
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "--info" => {
                options.mode = Mode::Info;
            }
            "--query" => {
                options.mode = Mode::Query;
            }
            "-t" | "--threads" => {
                i += 1;
                options.threads = parse_count(&args, i, "--threads", MAX_THREADS)?;
            }
            "--steps" => {
                i += 1;
                options.steps = parse_count(&args, i, "--steps", usize::MAX)?;
            }
            arg => {
                return Err(format!("Unknown option: {}", arg));
            }
        }
        i += 1;
    }

    Ok(options)
}

fn init_logging(config: &Config) {
    let log_path = config.log_path();

    // Create log directory if needed
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        // RUST_LOG wins over the config file
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.log.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let config = Config::load();
    init_logging(&config);
    info!("termcursor {} starting ({:?})", VERSION, options.mode);

    let registry = CursorRegistry::new(config);
    let result = match options.mode {
        Mode::Info => run_info(&registry),
        Mode::Query => run_query(&registry),
        Mode::Demo => run_demo(&registry, options.threads, options.steps),
    };

    if let Err(e) = &result {
        warn!("termcursor exiting with error: {:#}", e);
    }
    info!("termcursor exiting");
    result
}

fn describe(name: &str, cursor: &Cursor) {
    println!("{}:", name);
    println!("  kind:        {}", cursor.kind());
    println!("  terminal:    {}", cursor.is_terminal());
    match cursor.descriptor() {
        Some(fd) => println!("  descriptor:  {}", fd),
        None => println!("  descriptor:  -"),
    }
    let size = cursor.size();
    println!(
        "  size:        {}x{} ({})",
        size.width,
        size.height,
        cursor.size_strategy().unwrap_or("fallback")
    );
}

fn run_info(registry: &CursorRegistry) -> anyhow::Result<()> {
    let stdout = registry.get_or_create(StreamHandle::Stdout);
    let stderr = registry.get_or_create(StreamHandle::Stderr);

    println!("termcursor {}", VERSION);
    println!();
    describe("stdout", &stdout);
    describe("stderr", &stderr);

    // Position last: the query itself writes to the terminal.
    match stdout.try_position() {
        Ok(Some(p)) => println!("  position:    column {}, row {}", p.x, p.y),
        Ok(None) => println!("  position:    -"),
        Err(e) => println!("  position:    unavailable ({})", e),
    }

    println!();
    println!("environment:");
    let env = registry.environment();
    for name in CONSULTED {
        println!("  {:<16} {}", name, env.get(name).unwrap_or("-"));
    }
    Ok(())
}

fn run_query(registry: &CursorRegistry) -> anyhow::Result<()> {
    let stdout = registry.get_or_create(StreamHandle::Stdout);
    if stdout.kind() != TerminalKind::Ansi || !stdout.is_terminal() {
        anyhow::bail!("stdout is not an ANSI terminal ({})", stdout.kind());
    }
    let settings = QuerySettings {
        timeout: Some(registry.config().query.timeout().unwrap_or(DEFAULT_QUERY_WAIT)),
        poll_interval: registry.config().query.poll_interval().max(Duration::from_millis(1)),
    };

    let mut channel = StdinChannel::new();
    match ansi::read_reply(stdout.handle(), &mut channel, settings) {
        Ok(reply) => println!("reply: {}", reply.escape_ascii()),
        Err(CursorError::Timeout(limit)) => println!("no reply within {:?}", limit),
        Err(e) => return Err(e).context("Position query failed"),
    }
    Ok(())
}

fn render_bar(worker: usize, done: usize, total: usize, width: usize) -> String {
    let label = format!("worker {:>2} ", worker);
    let counter = format!(" {:>3}%", done * 100 / total);
    let room = width.saturating_sub(label.len() + counter.len() + 2).max(1);
    let filled = room * done / total;
    format!(
        "{}[{}{}]{}",
        label,
        "#".repeat(filled),
        " ".repeat(room - filled),
        counter
    )
}

fn run_demo(registry: &CursorRegistry, threads: usize, steps: usize) -> anyhow::Result<()> {
    let cursor = registry.get_or_create(StreamHandle::Stdout);
    info!(
        "Demo: {} bars x {} steps on {} stream",
        threads,
        steps,
        cursor.kind()
    );

    // Reserve one row per bar, then find out where the first one is.
    let rows = u16::try_from(threads).unwrap_or(u16::MAX);
    cursor.print(&"\n".repeat(threads))?;
    let top = cursor
        .y()
        .map(|bottom| bottom.saturating_sub(rows).max(1));
    let width = usize::from(cursor.width());

    let workers: Vec<_> = (0..threads)
        .map(|worker| {
            let cursor = Arc::clone(&cursor);
            thread::spawn(move || -> std::io::Result<()> {
                let color = BAR_COLORS[worker % BAR_COLORS.len()];
                let offset = u16::try_from(worker).unwrap_or(u16::MAX);
                let row = top.map(|top| top.saturating_add(offset));
                for done in 1..=steps {
                    let bar = render_bar(worker, done, steps, width);
                    match row {
                        Some(row) => cursor.write(&bar, Some(1), Some(row), Some(color))?,
                        None if done == steps => cursor.print(&format!("{}\n", bar))?,
                        None => {}
                    }
                    let jitter = (worker * 37 + done * 11) % 40;
                    thread::sleep(Duration::from_millis(20 + jitter as u64));
                }
                Ok(())
            })
        })
        .collect();

    for worker in workers {
        match worker.join() {
            Ok(result) => result?,
            Err(_) => anyhow::bail!("progress worker panicked"),
        }
    }

    if let Some(top) = top {
        cursor.set_position(Some(1), Some(top.saturating_add(rows)))?;
    }
    cursor.flush()?;
    std::io::stdout().flush()?;
    Ok(())
}
