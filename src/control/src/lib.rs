#![no_std]

extern crate alloc;

mod config;
pub mod gauge;
pub mod heater;
mod simulator;
mod state;

pub use config::SimulationConfig;
pub use gauge::{render, ColorBand, GaugeRendering, GaugeSpec, Viewport};
pub use heater::{HeaterCommand, HeaterConfig, HeaterStatus, Kilowatts};
pub use simulator::{heat_balance, step};
pub use state::{ControlMode, Power, SimulationState, Temperature};

pub const TEMPERATURE_GAUGE_MAX: f32 = 150.0;
pub const POWER_GAUGE_MAX: f32 = 100.0;

/// Gauge inputs for the two dials of the simulated panel.
pub fn gauges(state: &SimulationState) -> [GaugeSpec; 2] {
    [
        GaugeSpec::new(
            f32::from(state.temperature),
            TEMPERATURE_GAUGE_MAX,
            "Temperature",
            "°C",
        ),
        GaugeSpec::new(f32::from(state.power), POWER_GAUGE_MAX, "Power", "%"),
    ]
}
