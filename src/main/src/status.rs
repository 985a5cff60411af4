use crossterm::style::{Color, Stylize};
use rgb::RGB8;

use still_control::{SimulationState, Temperature};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    Initializing,
    Running,
    CoolingDown,
    Offline,
    DeviceConnected,
    DeviceDisconnected,
}

impl StatusEvent {
    pub fn from_state(state: &SimulationState, ambient: Temperature) -> StatusEvent {
        if state.running {
            StatusEvent::Running
        } else if state.is_settled(ambient) {
            StatusEvent::Offline
        } else {
            StatusEvent::CoolingDown
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StatusEvent::Initializing => "Starting up",
            StatusEvent::Running => "System is operational",
            StatusEvent::CoolingDown => "Heater off, cooling down",
            StatusEvent::Offline => "System is currently offline",
            StatusEvent::DeviceConnected => "Heater connected",
            StatusEvent::DeviceDisconnected => "No device detected",
        }
    }
}

impl From<StatusEvent> for RGB8 {
    fn from(status: StatusEvent) -> RGB8 {
        match status {
            StatusEvent::Initializing => RGB8::new(200, 200, 0),
            StatusEvent::Running => RGB8::new(0, 200, 0),
            StatusEvent::CoolingDown => RGB8::new(0, 120, 220),
            StatusEvent::Offline => RGB8::new(150, 150, 150),
            StatusEvent::DeviceConnected => RGB8::new(0, 200, 0),
            StatusEvent::DeviceDisconnected => RGB8::new(220, 0, 0),
        }
    }
}

/// Colour `text` for the terminal. Plain text when `NO_COLOR` is set.
pub fn paint(text: &str, colour: RGB8) -> String {
    let colour = Color::Rgb {
        r: colour.r,
        g: colour.g,
        b: colour.b,
    };
    text.with(colour).to_string()
}
