//! Monitor real-time rig events.
//!
//! Connects to a rigctld daemon, subscribes to the event stream, and prints
//! every state change as it arrives for 60 seconds. Turn the VFO knob,
//! change modes, or key PTT to generate events.
//!
//! # Requirements
//!
//! - `rigctld` running on localhost:4532 (e.g. `rigctld -m 1` for the dummy rig)
//!
//! # Usage
//!
//! ```sh
//! cargo run -p rigsync --example monitor_events
//! ```

use std::time::Duration;

use rigsync::{ChangedFields, DriverKind, RigControl, RigEvent, RigProfile, format_freq_mhz};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let profile = RigProfile::builder(DriverKind::Rigctld)
        .name("rigctld")
        .network("localhost", 4532)
        .poll_interval(Duration::from_millis(250))
        .build()?;

    let rig = RigControl::new();
    let mut events = rig.subscribe();

    println!("Connecting to rigctld on localhost:4532...");
    rig.connect(profile).await?;
    println!("Connected. Capabilities: {:?}\n", rig.capabilities().await);

    println!("{:<12} Event", "Timestamp");
    println!("{:-<12} {:-<50}", "", "");

    let start = tokio::time::Instant::now();
    let deadline = start + Duration::from_secs(60);

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }

        let event = match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) | Err(_) => break,
        };
        let elapsed = start.elapsed();
        let timestamp = format!("{:>6}.{:03}s", elapsed.as_secs(), elapsed.subsec_millis());

        match event {
            RigEvent::StateChanged(change) => {
                let state = &change.state;
                let fields: Vec<_> = change.changed.names().collect();
                if change.changed.intersects(ChangedFields::FREQUENCY) {
                    println!(
                        "{} Frequency         RX {} TX {} ({})",
                        timestamp,
                        format_freq_mhz(state.receive_frequency_hz),
                        format_freq_mhz(state.transmit_frequency_hz),
                        state
                            .band()
                            .map_or_else(|| "out of band".to_string(), |b| b.to_string())
                    );
                }
                if change.changed.contains(ChangedFields::MODE) {
                    println!("{} Mode              -> {}", timestamp, state.mode);
                }
                if change.changed.contains(ChangedFields::PTT) {
                    let ptt = if state.ptt { "TX" } else { "RX" };
                    println!("{} Ptt               -> {}", timestamp, ptt);
                }
                if change.changed.contains(ChangedFields::CONNECTION) {
                    println!("{} Connection        -> {}", timestamp, state.connection_state);
                }
                println!("{} Changed           [{}]", timestamp, fields.join(", "));
            }
            RigEvent::Error(err) => {
                println!("{} Error             {}", timestamp, err);
            }
        }
    }

    rig.disconnect().await;
    println!("\nMonitoring complete.");
    Ok(())
}
