use core::time::Duration;
use std::path::PathBuf;

use still_control::{
    HeaterConfig, Power, SimulationConfig, SimulationState, Temperature, Viewport,
};

#[toml_cfg::toml_config]
pub struct TomlConfig {
    #[default(1000)]
    tick_interval_ms: u64,
    #[default(75.0)]
    temperature_setpoint: f32,
    #[default(50.0)]
    power_setpoint: f32,
    #[default("http://heater.local/heater")]
    heater_url: &'static str,
    #[default(1000)]
    poll_interval_ms: u64,
    #[default(2000)]
    request_timeout_ms: u64,
    #[default(300.0)]
    gauge_width: f32,
    #[default(160.0)]
    gauge_height: f32,
    #[default("")]
    output_dir: &'static str,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub tick_interval: Duration,
    pub simulation: SimulationConfig,
    pub initial_state: SimulationState,
    pub heater: HeaterConfig,
    pub heater_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub viewport: Viewport,
    // Where PNG gauges are written; logging only when unset
    pub output_dir: Option<PathBuf>,
}

impl Config {
    pub fn read() -> Self {
        Config::from(TOML_CONFIG)
    }

    /// Tick length in the units the simulator works in.
    pub fn tick_seconds(&self) -> f32 {
        self.tick_interval.as_secs_f32()
    }

    pub fn with_setpoints(mut self, temperature: Option<f32>, power: Option<f32>) -> Self {
        if let Some(temperature) = temperature {
            self.initial_state.temperature_setpoint = self.simulation.clamp_setpoint(temperature);
        }
        if let Some(power) = power {
            self.initial_state.power_setpoint = self.simulation.clamp_power(power);
        }
        self
    }
}

impl From<TomlConfig> for Config {
    fn from(config: TomlConfig) -> Self {
        let defaults = Config::default();
        let output_dir = match config.output_dir {
            "" => None,
            dir => Some(PathBuf::from(dir)),
        };
        Config {
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            heater_url: config.heater_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            viewport: Viewport::new(config.gauge_width, config.gauge_height),
            output_dir,
            ..defaults
        }
        .with_setpoints(Some(config.temperature_setpoint), Some(config.power_setpoint))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tick_interval: Duration::from_secs(1),
            simulation: SimulationConfig::default(),
            initial_state: SimulationState {
                temperature_setpoint: Temperature::new(75.0),
                power_setpoint: Power::new(50.0),
                ..SimulationState::default()
            },
            heater: HeaterConfig::default(),
            heater_url: String::from("http://heater.local/heater"),
            poll_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(2),
            viewport: Viewport::new(300.0, 160.0),
            output_dir: None,
        }
    }
}
