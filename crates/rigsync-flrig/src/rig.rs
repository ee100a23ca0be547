//! [`FlrigDriver`]: the `RigDriver` over flrig's XML-RPC interface.

use async_trait::async_trait;

use rigsync_core::driver::RigDriver;
use rigsync_core::error::{ConnectFailureReason, Error, Result};
use rigsync_core::profile::{Capabilities, RigProfile};
use rigsync_core::types::{Mode, Vfo};

use crate::modes::{mode_from_flrig, mode_to_flrig};
use crate::xmlrpc::{self, Value};

/// flrig serves XML-RPC on this path only.
const RPC_PATH: &str = "/RPC2";

/// What flrig can do for any rig it drives. RIT/XIT are not exposed.
const FLRIG_CAPABILITIES: Capabilities = Capabilities {
    ptt: true,
    split: true,
    morse: true,
    rit_xit: false,
    power: true,
};

pub struct FlrigDriver {
    /// Built at open with the profile's timeouts; `None` while closed.
    client: Option<reqwest::Client>,
    url: String,
    /// The rig's own mode names, from `rig.get_modes`.
    modes: Vec<String>,
    version: Option<String>,
}

impl FlrigDriver {
    pub fn new() -> Self {
        FlrigDriver {
            client: None,
            url: String::new(),
            modes: Vec::new(),
            version: None,
        }
    }

    /// flrig's version string, once open.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The mode names the rig reported at open.
    pub fn rig_modes(&self) -> &[String] {
        &self.modes
    }

    async fn post(&self, client: &reqwest::Client, body: &str) -> Result<Value> {
        let response = client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(body.to_string())
            .send()
            .await
            .map_err(http_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Protocol(format!("flrig answered HTTP {status}")));
        }
        let text = response.text().await.map_err(http_error)?;
        xmlrpc::decode_response(&text)
    }

    /// Call `method`. A request the server dropped mid-exchange (flrig
    /// restarting, a keep-alive socket it has since closed) is replayed once.
    async fn call(&mut self, method: &str, params: &[Value]) -> Result<Value> {
        let client = self.client.clone().ok_or(Error::NotConnected)?;
        let body = xmlrpc::encode_call(method, params);

        match self.post(&client, &body).await {
            Err(e) if e.is_transport_fatal() => {
                tracing::debug!(url = %self.url, method, "flrig request dropped, retrying: {}", e);
                self.post(&client, &body).await.map_err(|e| match e {
                    Error::Connect(_) => e,
                    e if e.is_transport_fatal() => {
                        tracing::warn!(url = %self.url, "Lost connection to flrig: {}", e);
                        Error::ConnectionLost
                    }
                    e => e,
                })
            }
            other => other,
        }
    }

    async fn call_i64(&mut self, method: &str, params: &[Value]) -> Result<i64> {
        let value = self.call(method, params).await?;
        value.as_i64().ok_or_else(|| not_a_number(method, &value))
    }

    async fn call_text(&mut self, method: &str) -> Result<String> {
        let value = self.call(method, &[]).await?;
        value
            .to_text()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| Error::Protocol(format!("{method} returned {value:?}")))
    }

    async fn active_vfo(&mut self) -> Result<Vfo> {
        match self.call_text("rig.get_AB").await?.as_str() {
            "A" => Ok(Vfo::A),
            "B" => Ok(Vfo::B),
            other => Err(Error::Protocol(format!("rig.get_AB returned {other:?}"))),
        }
    }
}

/// Map a client failure onto the driver vocabulary. Timeouts stay
/// transient; a refused or dropped connection is fatal.
fn http_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else if e.is_connect() {
        Error::Connect(ConnectFailureReason::Refused)
    } else if e.is_decode() {
        Error::Protocol(format!("unreadable flrig reply: {e}"))
    } else {
        Error::Transport(e.to_string())
    }
}

/// flrig answers with an empty or placeholder string while the rig is not
/// responding; the request itself was understood.
fn not_a_number(method: &str, value: &Value) -> Error {
    Error::Rejected(format!("{method} returned no usable value ({value:?})"))
}

impl Default for FlrigDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RigDriver for FlrigDriver {
    fn name(&self) -> &'static str {
        "flrig"
    }

    async fn open(&mut self, profile: &RigProfile) -> Result<()> {
        self.close().await;

        let addr = profile.connection.address().ok_or_else(|| {
            Error::Connect(ConnectFailureReason::InvalidProfile(
                "flrig needs a network connection".into(),
            ))
        })?;
        self.url = format!("http://{addr}{RPC_PATH}");
        let client = reqwest::Client::builder()
            .timeout(profile.command_timeout)
            .connect_timeout(profile.connect_timeout)
            .build()
            .map_err(|e| Error::Connect(ConnectFailureReason::Other(e.to_string())))?;
        self.client = Some(client);

        let handshake = async {
            let version = self.call_text("main.get_version").await?;
            let modes = match self.call("rig.get_modes", &[]).await {
                Ok(Value::Array(items)) => items.iter().filter_map(Value::to_text).collect(),
                Ok(_) => Vec::new(),
                Err(e) if e.is_transport_fatal() => return Err(e),
                Err(e) => {
                    tracing::debug!("rig.get_modes failed: {}", e);
                    Vec::new()
                }
            };
            Ok::<_, Error>((version, modes))
        };

        match handshake.await {
            Ok((version, modes)) => {
                tracing::info!(url = %self.url, version = %version, modes = modes.len(), "Connected to flrig");
                self.version = Some(version);
                self.modes = modes;
                Ok(())
            }
            Err(e) => {
                self.close().await;
                Err(match e {
                    Error::Timeout => Error::Connect(ConnectFailureReason::Timeout),
                    Error::Connect(reason) => Error::Connect(reason),
                    Error::ConnectionLost => Error::Connect(ConnectFailureReason::Other(
                        "flrig closed the connection".into(),
                    )),
                    other => Error::Connect(ConnectFailureReason::Other(format!(
                        "not an flrig server: {other}"
                    ))),
                })
            }
        }
    }

    async fn close(&mut self) {
        if self.client.take().is_some() {
            tracing::debug!(url = %self.url, "flrig connection closed");
        }
        self.version = None;
        self.modes.clear();
    }

    fn capabilities(&self) -> Capabilities {
        FLRIG_CAPABILITIES
    }

    async fn query_frequency(&mut self, vfo: Vfo) -> Result<u64> {
        let method = match vfo {
            Vfo::Current => "rig.get_vfo",
            Vfo::A => "rig.get_vfoA",
            Vfo::B => "rig.get_vfoB",
        };
        let hz = self.call_i64(method, &[]).await?;
        u64::try_from(hz).map_err(|_| Error::Protocol(format!("{method} returned {hz}")))
    }

    async fn query_mode(&mut self) -> Result<Mode> {
        let name = self.call_text("rig.get_mode").await?;
        Ok(mode_from_flrig(&name))
    }

    async fn query_vfo(&mut self) -> Result<Vfo> {
        self.active_vfo().await
    }

    async fn query_ptt(&mut self) -> Result<bool> {
        Ok(self.call_i64("rig.get_ptt", &[]).await? != 0)
    }

    /// flrig reports split on/off only; the transmit VFO is the one not
    /// selected for receive.
    async fn query_split(&mut self) -> Result<(bool, Option<Vfo>)> {
        let on = self.call_i64("rig.get_split", &[]).await? != 0;
        if !on {
            return Ok((false, None));
        }
        let tx = match self.active_vfo().await? {
            Vfo::B => Vfo::A,
            _ => Vfo::B,
        };
        Ok((true, Some(tx)))
    }

    async fn query_power(&mut self) -> Result<f32> {
        Ok(self.call_i64("rig.get_power", &[]).await? as f32)
    }

    async fn set_frequency(&mut self, vfo: Vfo, freq_hz: u64) -> Result<()> {
        let method = match vfo {
            Vfo::Current => "rig.set_frequency",
            Vfo::A => "rig.set_vfoA",
            Vfo::B => "rig.set_vfoB",
        };
        self.call(method, &[Value::Double(freq_hz as f64)])
            .await
            .map(|_| ())
    }

    async fn set_mode(&mut self, mode: Mode) -> Result<()> {
        let name = mode_to_flrig(mode, &self.modes).ok_or_else(|| {
            Error::InvalidParameter(format!("rig has no mode matching {mode}"))
        })?;
        self.call("rig.set_mode", &[Value::Str(name)]).await.map(|_| ())
    }

    async fn set_ptt(&mut self, on: bool) -> Result<()> {
        self.call("rig.set_ptt", &[Value::Int(i64::from(on))])
            .await
            .map(|_| ())
    }

    async fn send_morse(&mut self, text: &str) -> Result<()> {
        self.call("rig.cwio_text", &[Value::Str(text.to_string())])
            .await?;
        self.call("rig.cwio_send", &[Value::Int(1)]).await.map(|_| ())
    }

    async fn stop_morse(&mut self) -> Result<()> {
        self.call("rig.cwio_send", &[Value::Int(0)]).await.map(|_| ())
    }

    async fn set_key_speed(&mut self, wpm: u16) -> Result<()> {
        self.call("rig.cwio_set_wpm", &[Value::Int(i64::from(wpm))])
            .await
            .map(|_| ())
    }

    /// `rig.get_xcvr` names the rig flrig is driving; empty means flrig is
    /// running without a rig.
    async fn probe(&mut self) -> Result<()> {
        let xcvr = self.call_text("rig.get_xcvr").await?;
        if xcvr.is_empty() {
            Err(Error::Rejected("flrig has no transceiver connected".into()))
        } else {
            Ok(())
        }
    }
}
