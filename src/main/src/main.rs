use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use crossbeam_channel::bounded;
use log::*;
use rgb::RGB8;
use std::io::{self, Write};
use std::path::PathBuf;

mod config;
mod console;
mod display;
mod eventloop;
mod heater;
mod simulation;
mod status;
mod timer;

use config::Config;
use display::{LogSurface, PngSurface, Surface};
use eventloop::EventLoop;
use heater::{ConnectionEvent, HeaterClient, HeaterControlEvent, SharedHeater};
use simulation::{describe, ControlEvent, ShutdownEvent};
use status::{paint, StatusEvent};
use still_control::ControlMode;
use timer::TimerService;

/// Set points from the command line must be real numbers.
fn finite(value: &str) -> Result<f32, String> {
    match value.parse::<f32>() {
        Ok(number) if number.is_finite() => Ok(number),
        Ok(_) => Err(format!("{} is not a finite number", value)),
        Err(err) => Err(err.to_string()),
    }
}

#[derive(Parser)]
#[command(name = "still-panel")]
#[command(about = "Control panels for the still: simulated thermal model and network heater")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Temperature,
    Power,
}

impl From<ModeArg> for ControlMode {
    fn from(mode: ModeArg) -> ControlMode {
        match mode {
            ModeArg::Temperature => ControlMode::Temperature,
            ModeArg::Power => ControlMode::Power,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulated control panel; commands are read from stdin
    Simulate {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,

        /// Write gauges as PNG files into this directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Initial control mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Initial temperature set point in °C
        #[arg(long, value_parser = finite)]
        temperature_setpoint: Option<f32>,

        /// Initial power set point in %
        #[arg(long, value_parser = finite)]
        power_setpoint: Option<f32>,

        /// Print every state change as a JSON line on stdout
        #[arg(long)]
        json: bool,
    },

    /// Poll and drive the network heater; commands are read from stdin
    Heater {
        /// Base URL of the heater API
        #[arg(long)]
        url: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::read();

    match cli.command {
        Commands::Simulate {
            ticks,
            output,
            mode,
            temperature_setpoint,
            power_setpoint,
            json,
        } => {
            let mut config = config.with_setpoints(temperature_setpoint, power_setpoint);
            if let Some(mode) = mode {
                config.initial_state.mode = ControlMode::from(mode);
            }
            if output.is_some() {
                config.output_dir = output;
            }
            run_simulation(config, ticks, json)
        }
        Commands::Heater { url } => {
            let mut config = config;
            if let Some(url) = url {
                config.heater_url = url;
            }
            run_heater(config)
        }
    }
}

fn subscribe_status(event_loop: &EventLoop) -> Result<eventloop::Subscription> {
    event_loop.subscribe::<StatusEvent, _>(move |event| {
        let colour = RGB8::from(*event);
        info!("{}", paint(event.description(), colour));
    })
}

fn run_simulation(config: Config, ticks: Option<u64>, json: bool) -> Result<()> {
    let event_loop = EventLoop::take()?;

    let surface: Box<dyn Surface + Send> = match &config.output_dir {
        Some(dir) => {
            let surface = PngSurface::new(dir)?;
            info!("Writing gauges to {}", dir.display());
            Box::new(surface)
        }
        None => Box::new(LogSurface),
    };
    let json = json.then(|| Box::new(io::stdout()) as Box<dyn Write + Send>);

    let _status_handler = subscribe_status(&event_loop)?;
    console::spawn::<ControlEvent>(event_loop.clone())?;

    // Blocks until quit or the tick budget runs out
    let state = simulation::run(&event_loop, &config, surface, ticks, json)?;
    info!("Final state: {}", describe(&state));

    Ok(())
}

fn run_heater(config: Config) -> Result<()> {
    let event_loop = EventLoop::take()?;
    let timer_service = TimerService::new()?;
    let client = HeaterClient::new(&config.heater_url, config.request_timeout, config.heater)?;
    let heater = SharedHeater::new(client);
    let (shutdown_tx, shutdown_rx) = bounded(1);

    info!("Heater panel for {}", config.heater_url);

    let poll_timer = {
        // Avoid move of event loop into closure
        let localloop = event_loop.clone();
        let heater = heater.clone();
        timer_service.timer(move || {
            if let Some(event) = heater.poll() {
                if let Err(err) = localloop.post(&event) {
                    error!("Failed to post connection change: {:#}", err);
                }
            }
        })?
    };

    let _connection_handler = {
        let localloop = event_loop.clone();
        event_loop.subscribe::<ConnectionEvent, _>(move |event| {
            let _ = localloop.post(&StatusEvent::from(*event));
        })?
    };

    let _control_handler = {
        let localloop = event_loop.clone();
        let heater = heater.clone();
        event_loop.subscribe::<HeaterControlEvent, _>(move |event| match event {
            HeaterControlEvent::Quit => {
                let _ = localloop.post(&ShutdownEvent);
            }
            HeaterControlEvent::Status => info!("{}", paint(&heater.summary(), heater.colour())),
            _ => {
                if heater.command(event).is_some() {
                    info!("{}", paint(&heater.summary(), heater.colour()));
                }
            }
        })?
    };

    let _status_handler = subscribe_status(&event_loop)?;

    let _shutdown_handler = event_loop.subscribe::<ShutdownEvent, _>(move |_| {
        let _ = shutdown_tx.try_send(());
    })?;

    // Initial check before the first poll interval
    match heater.poll() {
        Some(event) => event_loop.post(&event)?,
        None => event_loop.post(&ConnectionEvent::Disconnected)?,
    }
    console::spawn::<HeaterControlEvent>(event_loop.clone())?;

    poll_timer.every(config.poll_interval)?;

    let _ = shutdown_rx.recv();
    poll_timer.cancel();
    info!("Heater panel closed");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setpoint_arguments_must_be_finite() {
        assert_eq!(finite("80.5"), Ok(80.5));
        assert!(finite("NaN").is_err());
        assert!(finite("inf").is_err());
        assert!(finite("warm").is_err());
    }

    #[test]
    fn test_cli_rejects_non_finite_setpoints() {
        assert!(Cli::try_parse_from(["still-panel", "simulate", "--temperature-setpoint", "nan"]).is_err());
        assert!(Cli::try_parse_from(["still-panel", "simulate", "--power-setpoint", "inf"]).is_err());
        assert!(Cli::try_parse_from(["still-panel", "simulate", "--power-setpoint", "80"]).is_ok());
    }
}
