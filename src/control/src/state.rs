use serde::{Deserialize, Serialize};

// Temperature in degrees celcius
#[derive(Debug, PartialEq, PartialOrd, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Temperature(pub f32);

impl Temperature {
    pub fn new(value: f32) -> Self {
        Self(value)
    }
}

impl From<Temperature> for f32 {
    fn from(value: Temperature) -> f32 {
        value.0
    }
}

// Heating power as a duty cycle, in percent of full output
#[derive(Debug, PartialEq, PartialOrd, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Power(pub f32);

impl Power {
    pub fn new(value: f32) -> Self {
        Self(value)
    }
}

impl From<Power> for f32 {
    fn from(value: Power) -> f32 {
        value.0
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// Track `temperature_setpoint` by nudging power up or down each tick.
    Temperature,
    /// Hold power at `power_setpoint` and let temperature follow.
    Power,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationState {
    pub temperature: Temperature,
    pub power: Power,
    pub running: bool,
    pub mode: ControlMode,
    pub temperature_setpoint: Temperature,
    pub power_setpoint: Power,
}

impl SimulationState {
    /// True once a stopped system has cooled to ambient; further ticks are no-ops.
    pub fn is_settled(&self, ambient: Temperature) -> bool {
        !self.running && self.temperature <= ambient && self.power == Power::new(0.0)
    }
}

impl Default for SimulationState {
    fn default() -> Self {
        SimulationState {
            temperature: Temperature::new(22.0),
            power: Power::new(0.0),
            running: true,
            mode: ControlMode::Temperature,
            temperature_setpoint: Temperature::new(75.0),
            power_setpoint: Power::new(50.0),
        }
    }
}
