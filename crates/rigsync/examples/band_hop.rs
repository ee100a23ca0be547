//! Hop across the HF contest bands through flrig.
//!
//! Tunes to the CW segment of each band in turn and waits for the next
//! poll to confirm the move, then restores the original frequency and mode.
//!
//! # Requirements
//!
//! - flrig running with its XML-RPC server on localhost:12345
//!
//! # Usage
//!
//! ```sh
//! cargo run -p rigsync --example band_hop
//! ```

use std::time::Duration;

use rigsync::{
    ChangedFields, DriverKind, Mode, RigControl, RigEvent, RigProfile, Vfo, format_freq_mhz,
};

const STOPS: [u64; 6] = [
    1_820_000, 3_520_000, 7_020_000, 14_020_000, 21_020_000, 28_020_000,
];
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let profile = RigProfile::builder(DriverKind::Flrig)
        .name("flrig")
        .build()?;

    let rig = RigControl::new();
    let mut events = rig.subscribe();
    rig.connect(profile).await?;

    // Let the first poll land so there is something to restore.
    tokio::time::sleep(Duration::from_secs(1)).await;
    let original = rig.current_state();
    println!(
        "Starting on {} {}\n",
        format_freq_mhz(original.receive_frequency_hz),
        original.mode
    );

    rig.set_mode(Mode::CW).await?;
    for freq_hz in STOPS {
        rig.set_frequency(Vfo::Current, freq_hz).await?;

        let confirmed = tokio::time::timeout(CONFIRM_TIMEOUT, async {
            while let Some(event) = events.recv().await {
                if let RigEvent::StateChanged(change) = event {
                    if change.changed.intersects(ChangedFields::FREQUENCY)
                        && change.state.receive_frequency_hz == freq_hz
                    {
                        return Some(change.state);
                    }
                }
            }
            None
        })
        .await;

        match confirmed {
            Ok(Some(state)) => println!(
                "{:>6}  {}",
                state.band().map_or("?", |b| b.name()),
                format_freq_mhz(state.transmit_frequency_hz)
            ),
            _ => println!("{:>6}  no confirmation", format_freq_mhz(freq_hz)),
        }
    }

    if original.receive_frequency_hz != 0 {
        rig.set_frequency(Vfo::Current, original.receive_frequency_hz)
            .await?;
    }
    if original.mode != Mode::Unknown {
        rig.set_mode(original.mode).await?;
    }
    rig.disconnect().await;
    Ok(())
}
