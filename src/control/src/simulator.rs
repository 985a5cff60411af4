use crate::config::SimulationConfig;
use crate::state::{ControlMode, Power, SimulationState, Temperature};

/// Net temperature change over one tick at a given power.
///
/// Heating is proportional to the duty cycle; the room takes a constant
/// `ambient_loss` back.
pub fn heat_balance(config: &SimulationConfig, power: Power) -> f32 {
    let duty_cycle = f32::from(power) / f32::from(config.maximum_power);
    duty_cycle * config.heating_rate - config.ambient_loss
}

/// Advance the thermal model by one tick.
///
/// Every rate in `SimulationConfig` is per tick, whatever the caller's tick
/// length, so `_tick_seconds` only documents the cadence. Power is settled
/// first and then drives the temperature, never the other way round. Set
/// points and mode pass through untouched.
pub fn step(config: &SimulationConfig, state: &SimulationState, _tick_seconds: f32) -> SimulationState {
    let temperature = f32::from(state.temperature);

    if !state.running {
        // Heater off: cool towards the room and stay there
        let cooled = temperature - config.cooldown_rate;
        return SimulationState {
            temperature: config.clamp_temperature(cooled),
            power: Power::new(0.0),
            ..*state
        };
    }

    let power = match state.mode {
        ControlMode::Temperature => {
            // Bang-bang: no dead-band, so this never settles on the set point
            let diff = f32::from(state.temperature_setpoint) - temperature;
            let direction = if diff > 0.0 { 1.0 } else { -1.0 };
            config.clamp_power(f32::from(state.power) + direction * config.power_step)
        }
        ControlMode::Power => config.clamp_power(f32::from(state.power_setpoint)),
    };

    let temperature = config.clamp_temperature(temperature + heat_balance(config, power));

    SimulationState {
        temperature,
        power,
        ..*state
    }
}
