use alloc::format;
use alloc::string::String;

use rgb::RGB8;

// Heater output in kilowatts
#[derive(Debug, PartialEq, PartialOrd, Clone, Copy)]
pub struct Kilowatts(pub f32);

impl Kilowatts {
    pub fn new(value: f32) -> Self {
        Self(value)
    }
}

impl From<Kilowatts> for f32 {
    fn from(value: Kilowatts) -> f32 {
        value.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HeaterConfig {
    // Rated output of the element
    pub maximum_power: Kilowatts,

    // Anything above this is flagged to the operator
    pub danger_threshold: Kilowatts,

    // Resolution of the power control
    pub power_step: Kilowatts,
}

impl HeaterConfig {
    /// Fraction of full output the device expects on the wire.
    pub fn fraction(&self, power: Kilowatts) -> f32 {
        f32::from(power) / f32::from(self.maximum_power)
    }

    pub fn is_danger(&self, power: Kilowatts) -> bool {
        power > self.danger_threshold
    }

    /// Fill of the power bar, in percent.
    pub fn bar_percentage(&self, power: Kilowatts) -> f32 {
        self.fraction(power) * 100.0
    }

    /// Width of the danger zone marker at the top end of the bar, in percent.
    pub fn danger_zone_width(&self) -> f32 {
        (1.0 - self.fraction(self.danger_threshold)) * 100.0
    }

    /// Snap a requested power onto the control resolution and the legal range.
    pub fn snap(&self, requested: f32) -> Kilowatts {
        let step = f32::from(self.power_step);
        let steps = (requested / step + 0.5) as i32;
        let snapped = steps as f32 * step;
        Kilowatts::new(snapped.clamp(0.0, f32::from(self.maximum_power)))
    }

    pub fn status_colour(&self, power: Kilowatts) -> RGB8 {
        if self.is_danger(power) {
            RGB8::new(0xef, 0x44, 0x44)
        } else {
            RGB8::new(0xfb, 0x92, 0x3c)
        }
    }
}

impl Default for HeaterConfig {
    fn default() -> Self {
        HeaterConfig {
            maximum_power: Kilowatts::new(7.2),
            danger_threshold: Kilowatts::new(5.0),
            power_step: Kilowatts::new(0.1),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum HeaterCommand {
    Off,
    Power(Kilowatts),
}

impl HeaterCommand {
    /// Value of the `p` query parameter understood by the device.
    pub fn query_value(&self, config: &HeaterConfig) -> String {
        match self {
            HeaterCommand::Off => String::from("off"),
            HeaterCommand::Power(power) => format!("{}", config.fraction(*power)),
        }
    }

    /// Power the panel shows once the command is sent.
    pub fn power(&self) -> Kilowatts {
        match self {
            HeaterCommand::Off => Kilowatts::new(0.0),
            HeaterCommand::Power(power) => *power,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum HeaterStatus {
    WaitingForDevice,
    Off,
    HighConsumption,
    Running,
}

impl HeaterStatus {
    pub fn classify(config: &HeaterConfig, connected: bool, power: Kilowatts) -> HeaterStatus {
        if !connected {
            HeaterStatus::WaitingForDevice
        } else if f32::from(power) == 0.0 {
            HeaterStatus::Off
        } else if config.is_danger(power) {
            HeaterStatus::HighConsumption
        } else {
            HeaterStatus::Running
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            HeaterStatus::WaitingForDevice => "Waiting for device connection...",
            HeaterStatus::Off => "Heater is off",
            HeaterStatus::HighConsumption => "High power consumption!",
            HeaterStatus::Running => "Heater is running efficiently",
        }
    }
}

pub fn format_power(power: Kilowatts) -> String {
    format!("{:.1}KW", f32::from(power))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_of_rated_power() {
        let config = HeaterConfig::default();
        assert_eq!(config.fraction(Kilowatts::new(0.0)), 0.0);
        assert_eq!(config.fraction(Kilowatts::new(7.2)), 1.0);
        assert_eq!(config.fraction(Kilowatts::new(3.6)), 0.5);
    }

    #[test]
    fn test_query_value() {
        let config = HeaterConfig::default();
        assert_eq!(HeaterCommand::Off.query_value(&config), "off");
        assert_eq!(
            HeaterCommand::Power(Kilowatts::new(3.6)).query_value(&config),
            "0.5"
        );
        assert_eq!(
            HeaterCommand::Power(Kilowatts::new(7.2)).query_value(&config),
            "1"
        );
        assert_eq!(HeaterCommand::Off.power(), Kilowatts::new(0.0));
    }

    #[test]
    fn test_danger_zone() {
        let config = HeaterConfig::default();
        assert!(!config.is_danger(Kilowatts::new(5.0)));
        assert!(config.is_danger(Kilowatts::new(5.1)));

        let width = config.danger_zone_width();
        let min = 30.5;
        let max = 30.6;
        assert!(min < width, "{:?} < {:?}", min, width);
        assert!(width < max, "{:?} < {:?}", width, max);
    }

    #[test]
    fn test_snap_to_step() {
        let config = HeaterConfig::default();
        let snapped = f32::from(config.snap(3.14));
        assert!((snapped - 3.1).abs() < 1e-4, "{}", snapped);
        let snapped = f32::from(config.snap(3.16));
        assert!((snapped - 3.2).abs() < 1e-4, "{}", snapped);
        assert_eq!(config.snap(-1.0), Kilowatts::new(0.0));
        assert_eq!(config.snap(9.0), Kilowatts::new(7.2));
    }

    #[test]
    fn test_status_classification() {
        let config = HeaterConfig::default();
        assert_eq!(
            HeaterStatus::classify(&config, false, Kilowatts::new(6.0)),
            HeaterStatus::WaitingForDevice
        );
        assert_eq!(
            HeaterStatus::classify(&config, true, Kilowatts::new(0.0)),
            HeaterStatus::Off
        );
        assert_eq!(
            HeaterStatus::classify(&config, true, Kilowatts::new(6.0)),
            HeaterStatus::HighConsumption
        );
        assert_eq!(
            HeaterStatus::classify(&config, true, Kilowatts::new(2.5)),
            HeaterStatus::Running
        );
        assert_eq!(HeaterStatus::Off.message(), "Heater is off");
    }

    #[test]
    fn test_format_power() {
        assert_eq!(format_power(Kilowatts::new(3.0)), "3.0KW");
        assert_eq!(format_power(Kilowatts::new(7.2)), "7.2KW");
    }
}
