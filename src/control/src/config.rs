use crate::state::{Power, Temperature};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    // Room temperature; the still never cools below this
    pub ambient_temperature: Temperature,

    // Upper bound of the thermal model
    pub maximum_temperature: Temperature,

    // Legal range of the temperature set point
    pub minimum_setpoint: Temperature,
    pub maximum_setpoint: Temperature,

    // Full heating output
    pub maximum_power: Power,

    // Degrees gained per tick at 100% power
    pub heating_rate: f32,

    // Degrees lost to the room per tick while running
    pub ambient_loss: f32,

    // Percentage points the temperature controller moves power per tick
    pub power_step: f32,

    // Degrees lost per tick once the heater is off
    pub cooldown_rate: f32,
}

// `max`/`min` rather than `clamp`: a NaN input lands on the lower bound
// instead of escaping the range
fn bound(value: f32, lower: f32, upper: f32) -> f32 {
    value.max(lower).min(upper)
}

impl SimulationConfig {
    pub fn clamp_temperature(&self, value: f32) -> Temperature {
        Temperature::new(bound(
            value,
            f32::from(self.ambient_temperature),
            f32::from(self.maximum_temperature),
        ))
    }

    pub fn clamp_power(&self, value: f32) -> Power {
        Power::new(bound(value, 0.0, f32::from(self.maximum_power)))
    }

    pub fn clamp_setpoint(&self, value: f32) -> Temperature {
        Temperature::new(bound(
            value,
            f32::from(self.minimum_setpoint),
            f32::from(self.maximum_setpoint),
        ))
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            ambient_temperature: Temperature::new(22.0),
            maximum_temperature: Temperature::new(150.0),
            minimum_setpoint: Temperature::new(25.0),
            maximum_setpoint: Temperature::new(150.0),
            maximum_power: Power::new(100.0),
            heating_rate: 0.5,
            ambient_loss: 0.1,
            power_step: 2.0,
            cooldown_rate: 0.5,
        }
    }
}
