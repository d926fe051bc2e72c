use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use bootcommand::config::{BootConfig, RawBootConfig};
use bootcommand::drivers::{KeyEventSink, KeysymDriver, ScancodeDriver, ScancodeSink};
use bootcommand::expressions::sleep_or_cancel;
use bootcommand::{Driver, ExpressionSequence};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "bootcommand",
    about = "Type a boot command on an emulated VM console and print what would be sent",
    version
)]
struct Args {
    /// JSON build recipe to read the boot settings from
    #[arg(short, long)]
    recipe: Option<PathBuf>,

    /// Boot command line; repeat to add lines (replaces the recipe's boot_command)
    #[arg(short = 'c', long = "command")]
    commands: Vec<String>,

    /// Console transport to type on
    #[arg(long, value_enum, default_value_t = Console::Scancode)]
    console: Console,

    /// Time to wait for the guest before typing (e.g. 10s)
    #[arg(long)]
    boot_wait: Option<String>,

    /// Start typing immediately
    #[arg(long)]
    no_boot_wait: bool,

    /// Maximum scancodes per batch, -1 for no limit
    #[arg(long, allow_negative_numbers = true)]
    chunk_size: Option<i64>,

    /// Pause after each scancode batch (e.g. 100ms)
    #[arg(long)]
    group_interval: Option<String>,

    /// Pause after each RFB key event (e.g. 100ms)
    #[arg(long)]
    key_interval: Option<String>,

    /// Only parse and validate the boot command
    #[arg(long)]
    check: bool,

    /// Log every key sent
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Console {
    /// Raw PC/AT scancodes, one line of hex codes per batch
    Scancode,
    /// RFB key events, one line per event
    Rfb,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("bootcommand=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bootcommand=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;

    if args.check {
        println!("boot command OK: {} expressions", config.sequence.len());
        return Ok(());
    }
    if config.sequence.is_empty() {
        bail!("No boot command given; use --command or a recipe with boot_command");
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    if !args.no_boot_wait {
        tracing::info!(boot_wait = ?config.boot_wait, "waiting for boot");
        sleep_or_cancel(config.boot_wait, &cancel)
            .await
            .context("Interrupted during boot wait")?;
    }

    match args.console {
        Console::Scancode => {
            let mut driver = ScancodeDriver::new(PrintScancodes)
                .with_chunk_size(config.chunk_size)
                .with_group_interval(config.group_interval);
            type_boot_command(&config.sequence, &cancel, &mut driver).await
        }
        Console::Rfb => {
            let mut driver = KeysymDriver::new(PrintKeyEvents, config.key_interval());
            type_boot_command(&config.sequence, &cancel, &mut driver).await
        }
    }
}

/// Merge the recipe with command-line overrides and validate the result.
fn load_config(args: &Args) -> Result<BootConfig> {
    let mut raw = match &args.recipe {
        Some(path) => RawBootConfig::from_file(path)?,
        None => RawBootConfig::default(),
    };
    if !args.commands.is_empty() {
        raw.boot_command = args.commands.clone();
    }
    if args.boot_wait.is_some() {
        raw.boot_wait = args.boot_wait.clone();
    }
    if args.chunk_size.is_some() {
        raw.scancode_chunk_size = args.chunk_size;
    }
    if args.group_interval.is_some() {
        raw.boot_keygroup_interval = args.group_interval.clone();
    }
    if args.key_interval.is_some() {
        raw.boot_key_interval = args.key_interval.clone();
    }

    BootConfig::prepare(raw).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow!("Invalid boot configuration:\n  {}", messages.join("\n  "))
    })
}

async fn type_boot_command<D: Driver>(
    sequence: &ExpressionSequence,
    cancel: &CancellationToken,
    driver: &mut D,
) -> Result<()> {
    sequence
        .execute(cancel, driver)
        .await
        .context("Failed to type boot command")
}

struct PrintScancodes;

#[async_trait(?Send)]
impl ScancodeSink for PrintScancodes {
    async fn send_codes(&mut self, codes: &[String]) -> Result<()> {
        println!("{}", codes.join(" "));
        Ok(())
    }
}

struct PrintKeyEvents;

#[async_trait(?Send)]
impl KeyEventSink for PrintKeyEvents {
    async fn key_event(&mut self, keysym: u32, down: bool) -> Result<()> {
        println!("0x{keysym:04X} {}", if down { "down" } else { "up" });
        Ok(())
    }
}
