use anyhow::{anyhow, bail, Context, Result};
use log::*;
use parking_lot::Mutex;
use rgb::RGB8;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::status::StatusEvent;
use still_control::heater::format_power;
use still_control::{HeaterCommand, HeaterConfig, HeaterStatus, Kilowatts};

/// Operator input for the heater panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeaterControlEvent {
    Set(f32),
    Off,
    Status,
    Quit,
}

impl FromStr for HeaterControlEvent {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default().to_ascii_lowercase();

        let event = match command.as_str() {
            "set" => {
                let value = words.next().ok_or_else(|| anyhow!("Missing power in kW"))?;
                let power = value
                    .trim_end_matches(|c: char| c.eq_ignore_ascii_case(&'k') || c.eq_ignore_ascii_case(&'w'))
                    .parse::<f32>()
                    .with_context(|| format!("Invalid power {:?}", value))?;
                if !power.is_finite() {
                    bail!("Invalid power {:?}", value);
                }
                HeaterControlEvent::Set(power)
            }
            "off" => HeaterControlEvent::Off,
            "status" => HeaterControlEvent::Status,
            "quit" | "exit" => HeaterControlEvent::Quit,
            "" => bail!("Empty command"),
            other => bail!("Unknown command {:?}", other),
        };
        Ok(event)
    }
}

/// Connectivity change seen by the status poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
}

impl From<ConnectionEvent> for StatusEvent {
    fn from(event: ConnectionEvent) -> StatusEvent {
        match event {
            ConnectionEvent::Connected => StatusEvent::DeviceConnected,
            ConnectionEvent::Disconnected => StatusEvent::DeviceDisconnected,
        }
    }
}

pub struct HeaterClient {
    client: reqwest::blocking::Client,
    base_url: String,
    config: HeaterConfig,
}

impl HeaterClient {
    pub fn new(base_url: &str, timeout: Duration, config: HeaterConfig) -> Result<HeaterClient> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HeaterClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    pub fn config(&self) -> &HeaterConfig {
        &self.config
    }

    pub fn status_url(&self) -> String {
        format!("{}/current", self.base_url)
    }

    pub fn power_url(&self, command: &HeaterCommand) -> String {
        format!("{}/power?p={}", self.base_url, command.query_value(&self.config))
    }

    fn get(&self, url: &str) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Request to {} failed", url))?;
        if !response.status().is_success() {
            bail!("{} returned {}", url, response.status());
        }
        Ok(())
    }

    /// Any failure counts as unreachable.
    pub fn is_reachable(&self) -> bool {
        match self.get(&self.status_url()) {
            Ok(()) => true,
            Err(err) => {
                debug!("Heater status check failed: {:#}", err);
                false
            }
        }
    }

    pub fn send(&self, command: &HeaterCommand) -> Result<()> {
        self.get(&self.power_url(command))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaterPanelState {
    pub power: Kilowatts,
    pub connected: bool,
}

impl Default for HeaterPanelState {
    fn default() -> Self {
        HeaterPanelState {
            power: Kilowatts::new(0.0),
            connected: false,
        }
    }
}

#[derive(Clone)]
pub struct SharedHeater {
    client: Arc<HeaterClient>,
    state: Arc<Mutex<HeaterPanelState>>,
}

impl SharedHeater {
    pub fn new(client: HeaterClient) -> SharedHeater {
        SharedHeater {
            client: Arc::new(client),
            state: Arc::new(Mutex::new(HeaterPanelState::default())),
        }
    }

    pub fn state(&self) -> HeaterPanelState {
        *self.state.lock()
    }

    /// Check the device once. Returns an event only when connectivity changed.
    pub fn poll(&self) -> Option<ConnectionEvent> {
        let reachable = self.client.is_reachable();
        self.record_connectivity(reachable)
    }

    fn record_connectivity(&self, reachable: bool) -> Option<ConnectionEvent> {
        let mut state = self.state.lock();
        if state.connected == reachable {
            return None;
        }
        state.connected = reachable;
        if reachable {
            Some(ConnectionEvent::Connected)
        } else {
            Some(ConnectionEvent::Disconnected)
        }
    }

    /// Apply an operator command. Power changes are skipped while the device
    /// is unreachable; a failed request is logged and the panel keeps the
    /// requested power.
    pub fn command(&self, event: &HeaterControlEvent) -> Option<HeaterPanelState> {
        let command = match *event {
            HeaterControlEvent::Set(requested) => {
                HeaterCommand::Power(self.client.config().snap(requested))
            }
            HeaterControlEvent::Off => HeaterCommand::Off,
            HeaterControlEvent::Status | HeaterControlEvent::Quit => return None,
        };

        {
            let mut state = self.state.lock();
            if !state.connected {
                warn!("No device detected, ignoring {:?}", event);
                return None;
            }
            state.power = command.power();
        }

        info!("Setting heater to {}", format_power(command.power()));
        if let Err(err) = self.client.send(&command) {
            error!("Failed to update heater power: {:#}", err);
        }
        Some(self.state())
    }

    pub fn status(&self) -> HeaterStatus {
        let state = self.state();
        HeaterStatus::classify(self.client.config(), state.connected, state.power)
    }

    pub fn colour(&self) -> RGB8 {
        self.client.config().status_colour(self.state().power)
    }

    pub fn summary(&self) -> String {
        let state = self.state();
        let config = self.client.config();
        let mut summary = format!(
            "{} [{:.0}% of rated power] {}",
            format_power(state.power),
            config.bar_percentage(state.power),
            self.status().message()
        );
        if state.connected && config.is_danger(state.power) {
            summary.push_str(" Danger Zone");
        }
        summary
    }
}

impl fmt::Debug for SharedHeater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SharedHeater")
            .field("base_url", &self.client.base_url)
            .field("state", &*state)
            .finish()
    }
}
