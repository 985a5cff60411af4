use anyhow::{Context, Result};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay};
use log::*;
use std::fs;
use std::path::{Path, PathBuf};

use still_control::{gauges, render, GaugeRendering, SimulationState, Viewport};

const BACKGROUND: Rgb888 = Rgb888::WHITE;

/// Anything a rendered gauge can be drawn onto.
pub trait Surface {
    fn draw(&mut self, name: &str, rendering: &GaugeRendering) -> Result<()>;
}

/// Rasterises each gauge into `<dir>/<name>.png`, replacing the previous frame.
pub struct PngSurface {
    dir: PathBuf,
}

impl PngSurface {
    pub fn new(dir: &Path) -> Result<PngSurface> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(PngSurface {
            dir: dir.to_path_buf(),
        })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.png", name.to_lowercase()))
    }
}

impl Surface for PngSurface {
    fn draw(&mut self, name: &str, rendering: &GaugeRendering) -> Result<()> {
        let mut display = SimulatorDisplay::<Rgb888>::new(rendering.viewport.size());
        display
            .clear(BACKGROUND)
            .and_then(|()| rendering.draw(&mut display))
            .with_context(|| format!("Failed to draw {}", name))?;

        let path = self.path(name);
        display
            .to_rgb_output_image(&OutputSettingsBuilder::new().build())
            .save_png(&path)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

pub struct LogSurface;

impl Surface for LogSurface {
    fn draw(&mut self, name: &str, rendering: &GaugeRendering) -> Result<()> {
        info!(
            "{}: {} ({:.0}% of scale, {:?})",
            name,
            rendering.value_text,
            rendering.percentage * 100.0,
            rendering.band
        );
        Ok(())
    }
}

/// The two dials of the simulated panel.
pub struct GaugePanel {
    surface: Box<dyn Surface + Send>,
    viewport: Viewport,
}

impl GaugePanel {
    pub fn new(surface: Box<dyn Surface + Send>, viewport: Viewport) -> GaugePanel {
        GaugePanel { surface, viewport }
    }

    pub fn redraw(&mut self, state: &SimulationState) -> Result<()> {
        for spec in gauges(state) {
            let rendering = render(&spec, self.viewport);
            self.surface.draw(&spec.label, &rendering)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use still_control::{ColorBand, Power, Temperature};

    #[derive(Clone, Default)]
    struct Recorder {
        frames: Arc<Mutex<Vec<(String, GaugeRendering)>>>,
    }

    impl Surface for Recorder {
        fn draw(&mut self, name: &str, rendering: &GaugeRendering) -> Result<()> {
            self.frames.lock().push((name.to_string(), rendering.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_redraw_renders_both_gauges() {
        let recorder = Recorder::default();
        let mut panel = GaugePanel::new(Box::new(recorder.clone()), Viewport::new(300.0, 160.0));
        let state = SimulationState {
            temperature: Temperature::new(120.0),
            power: Power::new(10.0),
            ..SimulationState::default()
        };

        panel.redraw(&state).unwrap();

        let frames = recorder.frames.lock();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].0, "Temperature");
        assert_eq!(frames[0].1.band, ColorBand::Red);
        assert_eq!(frames[0].1.value_text, "120.0°C");
        assert_eq!(frames[1].0, "Power");
        assert_eq!(frames[1].1.band, ColorBand::Green);
    }

    #[test]
    fn test_png_surface_overwrites_frames() {
        let dir = tempfile::tempdir().unwrap();
        let surface = PngSurface::new(&dir.path().join("gauges")).unwrap();
        let path = surface.path("Temperature");
        let mut panel = GaugePanel::new(Box::new(surface), Viewport::new(300.0, 160.0));

        panel.redraw(&SimulationState::default()).unwrap();
        let first = fs::read(&path).unwrap();
        assert!(first.starts_with(b"\x89PNG\r\n"));

        let state = SimulationState {
            temperature: Temperature::new(123.5),
            ..SimulationState::default()
        };
        panel.redraw(&state).unwrap();
        let second = fs::read(&path).unwrap();
        assert!(second.starts_with(b"\x89PNG\r\n"));
        assert_ne!(first, second);
        assert!(dir.path().join("gauges").join("power.png").exists());
    }
}
