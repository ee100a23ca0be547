// rigsync-cli -- bench tool for exercising every rig-control back end
// against a real rig or daemon.
//
// Usage:
//   rigsync-cli --driver rigctld --host localhost --port 4532 get
//   rigsync-cli --driver flrig freq 14025000
//   rigsync-cli --driver hamlib --model 3073 --serial /dev/ttyUSB0 --baud 19200 monitor
//   rigsync-cli --driver omnirig --model 1 mode CW
//   rigsync-cli --driver omnirig2 --model 3 get
//   rigsync-cli --driver rigctld cw "CQ TEST"
//   rigsync-cli --driver rigctld stress --count 50
//
// Set RUST_LOG=rigsync=debug to see wire traffic.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use rand::Rng;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

use rigsync::{
    Capabilities, ConnectionState, DriverKind, Mode, RigControl, RigEvent, RigProfile, RigState,
    SerialParams, Vfo, format_freq_mhz,
};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// rigsync-cli -- drives a rig through the rigsync facade.
#[derive(Parser)]
#[command(name = "rigsync-cli", version, about)]
struct Cli {
    /// Back end to use.
    #[arg(long, value_enum, default_value = "rigctld")]
    driver: DriverArg,

    /// Daemon host (rigctld, flrig, or Hamlib's network rig path).
    #[arg(long)]
    host: Option<String>,

    /// Daemon port. Defaults to the back end's standard port.
    #[arg(long)]
    port: Option<u16>,

    /// Serial port path for Hamlib (e.g. /dev/ttyUSB0, COM3).
    #[arg(long, conflicts_with = "host")]
    serial: Option<String>,

    /// Serial baud rate.
    #[arg(long, default_value_t = 9600)]
    baud: u32,

    /// Hamlib model number, or OmniRig rig slot (1-2, 1-4 for omnirig2).
    #[arg(long)]
    model: Option<u32>,

    /// Poll interval in milliseconds.
    #[arg(long, default_value_t = 500)]
    poll_ms: u64,

    /// Enable CW keying through the back end.
    #[arg(long)]
    morse: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DriverArg {
    Hamlib,
    Rigctld,
    Flrig,
    Omnirig,
    /// Omni-Rig V2.
    Omnirig2,
}

impl From<DriverArg> for DriverKind {
    fn from(arg: DriverArg) -> Self {
        match arg {
            DriverArg::Hamlib => DriverKind::Hamlib,
            DriverArg::Rigctld => DriverKind::Rigctld,
            DriverArg::Flrig => DriverKind::Flrig,
            DriverArg::Omnirig => DriverKind::OmniRig,
            DriverArg::Omnirig2 => DriverKind::OmniRigV2,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VfoArg {
    Current,
    A,
    B,
}

impl From<VfoArg> for Vfo {
    fn from(arg: VfoArg) -> Self {
        match arg {
            VfoArg::Current => Vfo::Current,
            VfoArg::A => Vfo::A,
            VfoArg::B => Vfo::B,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[derive(Subcommand)]
enum Command {
    /// Print the effective capabilities of the connection.
    Info,

    /// Print the first complete state snapshot.
    Get,

    /// Print every state change and error.
    Monitor {
        /// Duration in seconds (0 = run until Ctrl-C).
        #[arg(long, default_value_t = 0)]
        duration: u64,
    },

    /// Tune a VFO.
    Freq {
        /// Frequency in hertz (e.g. 14025000).
        freq_hz: u64,

        #[arg(long, value_enum, default_value = "current")]
        vfo: VfoArg,
    },

    /// Change the operating mode.
    Mode {
        /// Mode name (e.g. USB, LSB, CW, CWR, AM, FM, RTTY, DATA-USB).
        mode: String,
    },

    /// Key or unkey the transmitter.
    Ptt {
        #[arg(value_enum)]
        state: Switch,
    },

    /// Send text as CW.
    Cw { text: String },

    /// Abort CW in progress.
    StopCw,

    /// Set the keyer speed.
    Wpm { wpm: u16 },

    /// Rapid-fire set-frequency commands, each confirmed by a poll.
    Stress {
        #[arg(long, default_value_t = 100)]
        count: u32,
    },
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Prompt the user for y/N confirmation. Returns true only if "y" or "Y" entered.
fn confirm(prompt: &str) -> bool {
    print!("{prompt}");
    io::stdout().flush().ok();
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    matches!(input.trim(), "y" | "Y")
}

fn build_profile(cli: &Cli) -> Result<RigProfile> {
    let kind = DriverKind::from(cli.driver);
    let mut builder = RigProfile::builder(kind)
        .name(kind.name())
        .poll_interval(Duration::from_millis(cli.poll_ms))
        .capabilities(Capabilities {
            morse: cli.morse,
            ..Capabilities::ALL
        });

    if let Some(model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(port) = &cli.serial {
        let mut params = SerialParams::new(port);
        params.baud_rate = cli.baud;
        builder = builder.serial(params);
    } else if cli.host.is_some() || cli.port.is_some() {
        let host = cli.host.as_deref().unwrap_or("localhost");
        let Some(port) = cli.port.or(kind.default_port()) else {
            bail!("--port is required for {kind}");
        };
        builder = builder.network(host, port);
    }

    builder.build().context("invalid rig profile")
}

/// Wait until a poll cycle has filled in the frequency.
async fn first_snapshot(
    events: &mut UnboundedReceiver<RigEvent>,
    timeout: Duration,
) -> Result<RigState> {
    tokio::time::timeout(timeout, async {
        while let Some(event) = events.recv().await {
            match event {
                RigEvent::StateChanged(change) if change.state.transmit_frequency_hz != 0 => {
                    return Ok(change.state);
                }
                RigEvent::Error(err) => return Err(anyhow::Error::new(err)),
                _ => {}
            }
        }
        bail!("event stream closed")
    })
    .await
    .context("no state received from rig")?
}

fn print_state(state: &RigState) {
    println!("Rig State");
    println!("  Connection:     {}", state.connection_state);
    println!("  RX frequency:   {}", format_freq_mhz(state.receive_frequency_hz));
    println!("  TX frequency:   {}", format_freq_mhz(state.transmit_frequency_hz));
    println!(
        "  Band:           {}",
        state.band().map_or("-", |b| b.name())
    );
    println!("  Mode:           {}", state.mode);
    println!("  VFO:            {}", state.active_vfo);
    println!("  PTT:            {}", if state.ptt { "TX" } else { "RX" });
    println!("  Split:          {}", state.split);
    println!("  RIT:            {:+} Hz", state.rit_offset_hz);
    println!("  XIT:            {:+} Hz", state.xit_offset_hz);
    match state.power_watts {
        Some(watts) => println!("  Power:          {watts:.0} W"),
        None => println!("  Power:          -"),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_info(rig: &RigControl) -> Result<()> {
    let caps = rig.capabilities().await;
    let profile = rig.profile().await.context("not connected")?;
    println!("Connection");
    println!("  Driver:         {}", profile.driver);
    println!("  Model:          {}", profile.model);
    println!("  Address:        {}", profile.connection.address().unwrap_or_default());
    println!("  Poll interval:  {:?}", profile.poll_interval);
    println!();
    println!("Capabilities");
    println!("  PTT:            {}", caps.ptt);
    println!("  Split:          {}", caps.split);
    println!("  Morse:          {}", caps.morse);
    println!("  RIT/XIT:        {}", caps.rit_xit);
    println!("  Power:          {}", caps.power);
    Ok(())
}

async fn cmd_monitor(
    rig: &RigControl,
    events: &mut UnboundedReceiver<RigEvent>,
    duration_secs: u64,
) -> Result<()> {
    println!("Monitoring rig events (Ctrl-C to stop)...");

    let deadline = (duration_secs > 0).then(|| Instant::now() + Duration::from_secs(duration_secs));

    loop {
        let timeout = match deadline {
            Some(dl) => {
                let remaining = dl.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    println!("Monitor duration elapsed.");
                    break;
                }
                remaining
            }
            None => Duration::from_secs(3600),
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = tokio::time::timeout(timeout, events.recv()) => match event {
                Ok(Some(RigEvent::StateChanged(change))) => {
                    let fields: Vec<_> = change.changed.names().collect();
                    let state = &change.state;
                    println!(
                        "[{}] {} {} {} ptt={} [{}]",
                        state.connection_state,
                        format_freq_mhz(state.transmit_frequency_hz),
                        state.band().map_or("-", |b| b.name()),
                        state.mode,
                        state.ptt,
                        fields.join(",")
                    );
                    if state.connection_state == ConnectionState::Disconnected {
                        break;
                    }
                }
                Ok(Some(RigEvent::Error(err))) => println!("[error] {err}"),
                Ok(None) => break,
                Err(_) => {
                    if deadline.is_some() {
                        println!("Monitor duration elapsed.");
                    }
                    break;
                }
            },
        }
    }

    println!("{:?}", rig.current_state());
    Ok(())
}

async fn cmd_ptt(rig: &RigControl, state: Switch) -> Result<()> {
    match state {
        Switch::On => {
            println!("WARNING: This will key the transmitter.");
            println!("Ensure an antenna or dummy load is connected.");
            if !confirm("Continue? [y/N] ") {
                println!("Aborted.");
                return Ok(());
            }
            rig.set_ptt(true).await?;
            println!("PTT: ON");
        }
        Switch::Off => {
            rig.set_ptt(false).await?;
            println!("PTT: OFF");
        }
    }
    Ok(())
}

async fn cmd_stress(
    rig: &RigControl,
    events: &mut UnboundedReceiver<RigEvent>,
    count: u32,
) -> Result<()> {
    let base = first_snapshot(events, Duration::from_secs(5)).await?;
    let base_freq = base
        .receive_frequency_hz
        .saturating_add_signed(-i64::from(base.rit_offset_hz));
    println!("Stress test: {count} cycles");
    println!("Base frequency: {}", format_freq_mhz(base_freq));

    let mut rng = rand::thread_rng();
    let mut success = 0u32;
    let mut failures = 0u32;
    let start = Instant::now();

    for i in 1..=count {
        // Random offset within +/- 5 kHz keeps the rig on the same band.
        let offset: i64 = rng.gen_range(-5_000..=5_000);
        let target = base_freq.saturating_add_signed(offset);

        if let Err(e) = rig.set_frequency(Vfo::Current, target).await {
            eprintln!("[{i}/{count}] set_frequency failed: {e}");
            failures += 1;
            continue;
        }

        let confirmed = tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(event) = events.recv().await {
                if let RigEvent::StateChanged(change) = event {
                    if change.state.receive_frequency_hz
                        == target.saturating_add_signed(i64::from(change.state.rit_offset_hz))
                    {
                        return true;
                    }
                }
            }
            false
        })
        .await
        .unwrap_or(false);

        if confirmed {
            success += 1;
        } else {
            eprintln!("[{i}/{count}] poll never showed {}", format_freq_mhz(target));
            failures += 1;
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("Results:");
    println!("  Total cycles:   {count}");
    println!("  Successes:      {success}");
    println!("  Failures:       {failures}");
    println!("  Elapsed:        {:.3} s", elapsed.as_secs_f64());

    if let Err(e) = rig.set_frequency(Vfo::Current, base_freq).await {
        eprintln!("Warning: failed to restore base frequency: {e}");
    } else {
        println!("  Restored:       {}", format_freq_mhz(base_freq));
    }

    if failures > 0 {
        bail!("{failures} out of {count} stress test cycles failed");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = build_profile(&cli)?;

    let rig = RigControl::new();
    let mut events = rig.subscribe();
    rig.connect(profile)
        .await
        .with_context(|| format!("could not connect through {}", DriverKind::from(cli.driver)))?;

    let result = match &cli.command {
        Command::Info => cmd_info(&rig).await,
        Command::Get => first_snapshot(&mut events, Duration::from_secs(5))
            .await
            .map(|state| print_state(&state)),
        Command::Monitor { duration } => cmd_monitor(&rig, &mut events, *duration).await,
        Command::Freq { freq_hz, vfo } => {
            let vfo = Vfo::from(*vfo);
            rig.set_frequency(vfo, *freq_hz).await.map_err(anyhow::Error::from).map(|()| {
                println!("{vfo}: set to {}", format_freq_mhz(*freq_hz));
            })
        }
        Command::Mode { mode } => match mode.parse::<Mode>() {
            Ok(mode) => rig.set_mode(mode).await.map_err(anyhow::Error::from).map(|()| {
                println!("Mode set to {mode}");
            }),
            Err(e) => Err(anyhow::anyhow!("{e}")),
        },
        Command::Ptt { state } => cmd_ptt(&rig, *state).await,
        Command::Cw { text } => rig.send_morse(text).await.map_err(anyhow::Error::from),
        Command::StopCw => rig.stop_morse().await.map_err(anyhow::Error::from),
        Command::Wpm { wpm } => rig.set_key_speed(*wpm).await.map_err(anyhow::Error::from),
        Command::Stress { count } => cmd_stress(&rig, &mut events, *count).await,
    };

    rig.disconnect().await;
    result
}
