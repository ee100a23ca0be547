//! Commands a consumer can send to the rig.

use std::fmt;

use rigsync_core::driver::RigDriver;
use rigsync_core::error::{Operation, Result};
use rigsync_core::types::{Mode, Vfo};

/// A state-changing request, executed by the connection's worker between
/// poll cycles.
#[derive(Debug, Clone, PartialEq)]
pub enum RigCommand {
    SetFrequency { vfo: Vfo, freq_hz: u64 },
    SetMode(Mode),
    SetPtt(bool),
    SendMorse(String),
    StopMorse,
    /// Keyer speed in words per minute.
    SetKeySpeed(u16),
}

impl RigCommand {
    pub fn operation(&self) -> Operation {
        match self {
            RigCommand::SetFrequency { .. } => Operation::SetFrequency,
            RigCommand::SetMode(_) => Operation::SetMode,
            RigCommand::SetPtt(_) => Operation::SetPtt,
            RigCommand::SendMorse(_) => Operation::SendMorse,
            RigCommand::StopMorse => Operation::StopMorse,
            RigCommand::SetKeySpeed(_) => Operation::SetKeySpeed,
        }
    }

    pub(crate) async fn execute(&self, driver: &mut dyn RigDriver) -> Result<()> {
        match self {
            RigCommand::SetFrequency { vfo, freq_hz } => {
                driver.set_frequency(*vfo, *freq_hz).await
            }
            RigCommand::SetMode(mode) => driver.set_mode(*mode).await,
            RigCommand::SetPtt(on) => driver.set_ptt(*on).await,
            RigCommand::SendMorse(text) => driver.send_morse(text).await,
            RigCommand::StopMorse => driver.stop_morse().await,
            RigCommand::SetKeySpeed(wpm) => driver.set_key_speed(*wpm).await,
        }
    }
}

impl fmt::Display for RigCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RigCommand::SetFrequency { vfo, freq_hz } => {
                write!(f, "set_frequency({vfo}, {freq_hz})")
            }
            RigCommand::SetMode(mode) => write!(f, "set_mode({mode})"),
            RigCommand::SetPtt(on) => write!(f, "set_ptt({on})"),
            RigCommand::SendMorse(text) => write!(f, "send_morse({text:?})"),
            RigCommand::StopMorse => write!(f, "stop_morse"),
            RigCommand::SetKeySpeed(wpm) => write!(f, "set_key_speed({wpm})"),
        }
    }
}
