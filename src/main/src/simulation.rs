use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::bounded;
use log::*;
use parking_lot::Mutex;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::Config;
use crate::display::{GaugePanel, Surface};
use crate::eventloop::EventLoop;
use crate::status::StatusEvent;
use crate::timer::TimerService;
use still_control::{step, ControlMode, SimulationConfig, SimulationState};

/// Posted by the tick timer; `count` starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEvent {
    pub count: u64,
}

/// State-change notification for anything drawing the panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateEvent(pub SimulationState);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownEvent;

/// Operator input for the simulated panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    EmergencyOff,
    Restart,
    SetMode(ControlMode),
    SetTemperature(f32),
    SetPower(f32),
    Status,
    Quit,
}

fn parse_number(argument: Option<&str>, what: &str) -> Result<f32> {
    let argument = argument.ok_or_else(|| anyhow!("Missing {} value", what))?;
    let value = argument
        .parse::<f32>()
        .with_context(|| format!("Invalid {} value {:?}", what, argument))?;
    if !value.is_finite() {
        bail!("Invalid {} value {:?}", what, argument);
    }
    Ok(value)
}

impl FromStr for ControlEvent {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default().to_ascii_lowercase();
        let argument = words.next();

        let event = match command.as_str() {
            "off" | "stop" => ControlEvent::EmergencyOff,
            "on" | "restart" => ControlEvent::Restart,
            "mode" => match argument.map(str::to_ascii_lowercase).as_deref() {
                Some("temperature") | Some("temp") => ControlEvent::SetMode(ControlMode::Temperature),
                Some("power") => ControlEvent::SetMode(ControlMode::Power),
                Some(other) => bail!("Unknown mode {:?}", other),
                None => bail!("Missing mode, expected temperature or power"),
            },
            "temp" | "temperature" => ControlEvent::SetTemperature(parse_number(argument, "temperature")?),
            "power" => ControlEvent::SetPower(parse_number(argument, "power")?),
            "status" => ControlEvent::Status,
            "quit" | "exit" => ControlEvent::Quit,
            "" => bail!("Empty command"),
            other => bail!("Unknown command {:?}", other),
        };
        Ok(event)
    }
}

/// Simulation state shared between the tick handler and the console.
#[derive(Clone)]
pub struct SharedSimulation {
    config: SimulationConfig,
    state: Arc<Mutex<SimulationState>>,
}

impl SharedSimulation {
    pub fn new(config: SimulationConfig, initial: SimulationState) -> SharedSimulation {
        SharedSimulation {
            config,
            state: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn state(&self) -> SimulationState {
        *self.state.lock()
    }

    /// Advance one tick. Returns the new state only if anything changed.
    pub fn tick(&self, tick_seconds: f32) -> Option<SimulationState> {
        let mut state = self.state.lock();
        let next = step(&self.config, &state, tick_seconds);
        if next == *state {
            return None;
        }
        if next.is_settled(self.config.ambient_temperature) {
            info!("Cooled down to ambient");
        }
        *state = next;
        Some(next)
    }

    /// Apply an operator command. Returns the new state if it changed.
    pub fn apply(&self, event: &ControlEvent) -> Option<SimulationState> {
        let mut state = self.state.lock();
        let previous = *state;

        match *event {
            ControlEvent::EmergencyOff => {
                if state.running {
                    warn!("Emergency off");
                }
                state.running = false;
            }
            ControlEvent::Restart => {
                if !state.running {
                    info!("Restarting system");
                }
                state.running = true;
            }
            ControlEvent::SetMode(_) | ControlEvent::SetTemperature(_) | ControlEvent::SetPower(_)
                if !state.running =>
            {
                warn!("System is offline, ignoring {:?}", event);
            }
            ControlEvent::SetMode(mode) => {
                info!("Switching to {:?} mode", mode);
                state.mode = mode;
            }
            ControlEvent::SetTemperature(value) => {
                state.temperature_setpoint = self.config.clamp_setpoint(value);
                info!("Temperature set point {:.0}°C", f32::from(state.temperature_setpoint));
            }
            ControlEvent::SetPower(value) => {
                state.power_setpoint = self.config.clamp_power(value);
                info!("Power set point {:.0}%", f32::from(state.power_setpoint));
            }
            ControlEvent::Status | ControlEvent::Quit => {}
        }

        if *state == previous {
            None
        } else {
            Some(*state)
        }
    }
}

pub fn describe(state: &SimulationState) -> String {
    let setpoint = match state.mode {
        ControlMode::Temperature => format!("{:.0}°C", f32::from(state.temperature_setpoint)),
        ControlMode::Power => format!("{:.0}%", f32::from(state.power_setpoint)),
    };
    format!(
        "{:.1}°C at {:.0}% power, {:?} mode, set point {}, {}",
        f32::from(state.temperature),
        f32::from(state.power),
        state.mode,
        setpoint,
        if state.running { "running" } else { "stopped" }
    )
}

fn write_json(out: &mut dyn Write, state: &SimulationState) -> Result<()> {
    let line = serde_json::to_string(state)?;
    writeln!(out, "{}", line)?;
    out.flush()?;
    Ok(())
}

/// Drive the simulated panel until `quit`, or until `ticks` ticks have run.
///
/// Every state change is drawn onto `surface` and, with `json`, written as
/// one JSON line. Returns the final state.
pub fn run(
    event_loop: &EventLoop,
    config: &Config,
    surface: Box<dyn Surface + Send>,
    ticks: Option<u64>,
    mut json: Option<Box<dyn Write + Send>>,
) -> Result<SimulationState> {
    let timer_service = TimerService::new()?;
    let simulation = SharedSimulation::new(config.simulation, config.initial_state);
    let (shutdown_tx, shutdown_rx) = bounded(1);
    let mut panel = GaugePanel::new(surface, config.viewport);

    let tick_timer = {
        // Avoid move of event loop into closure
        let localloop = event_loop.clone();
        let mut count = 0;
        timer_service.timer(move || {
            count += 1;
            if let Err(err) = localloop.post(&TickEvent { count }) {
                error!("Failed to post tick: {:#}", err);
            }
        })?
    };

    let _tick_handler = {
        let localloop = event_loop.clone();
        let simulation = simulation.clone();
        let tick_seconds = config.tick_seconds();
        event_loop.subscribe::<TickEvent, _>(move |tick| {
            // Ticks already queued when the budget ran out
            if ticks.is_some_and(|limit| tick.count > limit) {
                return;
            }
            if let Some(state) = simulation.tick(tick_seconds) {
                if let Err(err) = localloop.post(&StateEvent(state)) {
                    error!("Failed to post state: {:#}", err);
                }
            }
            if ticks == Some(tick.count) {
                info!("Completed {} ticks", tick.count);
                let _ = localloop.post(&ShutdownEvent);
            }
        })?
    };

    let _control_handler = {
        let localloop = event_loop.clone();
        let simulation = simulation.clone();
        event_loop.subscribe::<ControlEvent, _>(move |event| match event {
            ControlEvent::Quit => {
                let _ = localloop.post(&ShutdownEvent);
            }
            ControlEvent::Status => info!("{}", describe(&simulation.state())),
            _ => {
                if let Some(state) = simulation.apply(event) {
                    if let Err(err) = localloop.post(&StateEvent(state)) {
                        error!("Failed to post state: {:#}", err);
                    }
                }
            }
        })?
    };

    let _display_handler = {
        let localloop = event_loop.clone();
        let ambient = config.simulation.ambient_temperature;
        let mut last_status = StatusEvent::Initializing;
        event_loop.subscribe::<StateEvent, _>(move |event| {
            let StateEvent(state) = event;
            if let Err(err) = panel.redraw(state) {
                error!("Failed to draw gauges: {:#}", err);
            }
            if let Some(out) = json.as_mut() {
                if let Err(err) = write_json(out.as_mut(), state) {
                    error!("Failed to write state: {:#}", err);
                }
            }
            let status = StatusEvent::from_state(state, ambient);
            if status != last_status {
                last_status = status;
                let _ = localloop.post(&status);
            }
        })?
    };

    let _shutdown_handler = event_loop.subscribe::<ShutdownEvent, _>(move |_| {
        let _ = shutdown_tx.try_send(());
    })?;

    event_loop.post(&StatusEvent::Initializing)?;
    event_loop.post(&StateEvent(simulation.state()))?;

    tick_timer.every(config.tick_interval)?;

    // Block until quit or the tick budget runs out
    shutdown_rx.recv().context("Event loop stopped")?;
    tick_timer.cancel();

    Ok(simulation.state())
}
