//! Docent session: the navigation controller, target availability and the
//! console loop that drives them.

use crate::commands::{ConsoleCommand, HELP};
use crate::error::KioskError;

use sync_core::navigation::{NavigationController, Transition};
use sync_core::sync::AvailabilityMonitor;

use models::SetVolumeBody;

use std::fmt::Write as _;

use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleReply {
    Continue(String),
    Quit,
}

pub struct DocentSession {
    controller: NavigationController,
    availability: AvailabilityMonitor,
}

impl DocentSession {
    /// Attaches the controller and the availability monitor.
    pub fn new(controller: NavigationController, availability: AvailabilityMonitor) -> Self {
        controller.attach();
        availability.attach();
        Self {
            controller,
            availability,
        }
    }

    pub fn controller(&self) -> &NavigationController {
        &self.controller
    }

    pub fn availability(&self) -> &AvailabilityMonitor {
        &self.availability
    }

    pub fn execute(&self, command: ConsoleCommand) -> ConsoleReply {
        debug!("Console command: {command:?}");

        let text = match command {
            ConsoleCommand::Next => self.describe_move(self.controller.next(), "the last beat"),
            ConsoleCommand::Previous => {
                self.describe_move(self.controller.previous(), "the first beat")
            }
            ConsoleCommand::Goto(beat_id) => match self.controller.goto_beat_id(&beat_id) {
                Ok(transition) => self.describe_move(transition, "that beat"),
                Err(e) => {
                    warn!("Console goto {beat_id} failed: {e}");
                    format!("no beat '{beat_id}' in this sequence")
                }
            },
            ConsoleCommand::Volume(level) => self.volume(SetVolumeBody {
                level: Some(level),
                muted: None,
            }),
            ConsoleCommand::Mute => self.volume(SetVolumeBody {
                level: None,
                muted: Some(true),
            }),
            ConsoleCommand::Unmute => self.volume(SetVolumeBody {
                level: None,
                muted: Some(false),
            }),
            ConsoleCommand::Status => self.status(),
            ConsoleCommand::Help => HELP.to_string(),
            ConsoleCommand::Quit => return ConsoleReply::Quit,
        };

        ConsoleReply::Continue(text)
    }

    fn describe_move(&self, transition: Transition, end: &str) -> String {
        match transition {
            Transition::Moved { to, .. } => {
                let (index, total) = self.controller.progress();
                format!("now at {} ({}/{total})", to.beat_id(), index + 1)
            }
            Transition::Disabled => format!("already at {end}"),
        }
    }

    fn volume(&self, update: SetVolumeBody) -> String {
        let sent = self.controller.send_volume(update);
        let total = self.controller.targets().len();
        if sent < total {
            warn!("Volume update reached {sent} of {total} exhibits");
        }
        format!("volume update sent to {sent} of {total} exhibits")
    }

    /// Current beat, then one line per target exhibit.
    pub fn status(&self) -> String {
        let (index, total) = self.controller.progress();
        let mut text = format!(
            "at {} ({}/{total}), {}",
            self.controller.current_beat_id(),
            index + 1,
            if self.controller.is_synchronized() {
                "all exhibits confirmed"
            } else {
                "waiting for exhibits"
            }
        );

        for exhibit in self.controller.targets() {
            let availability = self
                .availability
                .status(exhibit)
                .map(|status| status.as_str())
                .unwrap_or("unknown");
            let beat = self
                .controller
                .confirmed_beat(exhibit)
                .unwrap_or_else(|| String::from("no report"));
            let _ = write!(text, "\n  {exhibit}: {availability}, {beat}");
        }

        text
    }

    /// Read commands line by line until `quit` or end of input.
    ///
    /// Invalid lines are answered with an error and do not end the loop.
    ///
    /// # Errors
    ///
    /// Returns [`KioskError::Kiosk`] if reading input or writing output fails.
    pub async fn run_console<R, W>(&self, reader: R, writer: &mut W) -> Result<(), KioskError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        writer.write_all(format!("{HELP}\n").as_bytes()).await?;
        writer.flush().await?;

        while let Some(line) = lines.next_line().await? {
            let reply = match ConsoleCommand::parse(&line) {
                Ok(None) => continue,
                Ok(Some(command)) => self.execute(command),
                Err(KioskError::Console { message, .. }) => {
                    ConsoleReply::Continue(format!("error: {message}"))
                }
                Err(e) => return Err(e),
            };

            match reply {
                ConsoleReply::Continue(text) => {
                    writer.write_all(format!("{text}\n").as_bytes()).await?;
                    writer.flush().await?;
                }
                ConsoleReply::Quit => {
                    info!("Console quit");
                    return Ok(());
                }
            }
        }

        info!("Console input closed");
        Ok(())
    }
}
