use anyhow::{Context, Result};
use log::*;
use std::any::Any;
use std::io::{self, BufRead};
use std::str::FromStr;
use std::thread;

use crate::eventloop::EventLoop;

/// Parse one operator line. Blank lines are skipped, anything unparseable is
/// reported and dropped.
pub fn parse_line<C>(line: &str) -> Option<C>
where
    C: FromStr<Err = anyhow::Error>,
{
    if line.trim().is_empty() {
        return None;
    }
    match line.parse::<C>() {
        Ok(command) => Some(command),
        Err(err) => {
            warn!("Ignoring {:?}: {:#}", line.trim(), err);
            None
        }
    }
}

/// Read operator commands from `input` and post them until it closes.
pub fn forward<C, R>(event_loop: &EventLoop, input: R) -> Result<()>
where
    C: FromStr<Err = anyhow::Error> + Any + Clone + Send,
    R: BufRead,
{
    for line in input.lines() {
        let line = line.context("Failed to read operator input")?;
        if let Some(command) = parse_line::<C>(&line) {
            event_loop.post(&command)?;
        }
    }
    Ok(())
}

/// Forward stdin on a background thread.
pub fn spawn<C>(event_loop: EventLoop) -> Result<()>
where
    C: FromStr<Err = anyhow::Error> + Any + Clone + Send,
{
    thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            if let Err(err) = forward::<C, _>(&event_loop, io::stdin().lock()) {
                error!("Console stopped: {:#}", err);
            }
            debug!("Operator input closed");
        })
        .context("Failed to spawn console thread")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::ControlEvent;
    use std::io::Cursor;
    use crossbeam_channel::unbounded;
    use std::time::Duration;
    use still_control::ControlMode;

    #[test]
    fn test_parse_line_skips_blank_and_bad_input() {
        assert_eq!(parse_line::<ControlEvent>("   "), None);
        assert_eq!(parse_line::<ControlEvent>("fly"), None);
        assert_eq!(
            parse_line::<ControlEvent>("power 20"),
            Some(ControlEvent::SetPower(20.0))
        );
    }

    #[test]
    fn test_forward_posts_commands_in_order() {
        let event_loop = EventLoop::take().unwrap();
        let (tx, rx) = unbounded();
        let _subscription = event_loop
            .subscribe::<ControlEvent, _>(move |event| tx.send(*event).unwrap())
            .unwrap();

        let input = Cursor::new("mode power\n\nnonsense\npower 65\nquit\n");
        forward::<ControlEvent, _>(&event_loop, input).unwrap();

        let timeout = Duration::from_secs(2);
        assert_eq!(
            rx.recv_timeout(timeout).unwrap(),
            ControlEvent::SetMode(ControlMode::Power)
        );
        assert_eq!(rx.recv_timeout(timeout).unwrap(), ControlEvent::SetPower(65.0));
        assert_eq!(rx.recv_timeout(timeout).unwrap(), ControlEvent::Quit);
    }
}
