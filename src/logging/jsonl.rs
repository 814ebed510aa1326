//! JSONL event journal with daily file rotation.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::alarm::AutoMoveReport;
use crate::pointer::Position;

/// One journal line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum SessionEvent {
    #[serde(rename = "session_start")]
    SessionStart {
        timestamp: DateTime<Utc>,
        version: String,
    },
    #[serde(rename = "session_end")]
    SessionEnd {
        timestamp: DateTime<Utc>,
        checks: u64,
        auto_moves: u64,
    },
    #[serde(rename = "human_movement")]
    HumanMovement {
        timestamp: DateTime<Utc>,
        distance_px: u32,
    },
    #[serde(rename = "auto_move")]
    AutoMove {
        timestamp: DateTime<Utc>,
        from: Position,
        to: Position,
    },
    #[serde(rename = "alarm")]
    Alarm {
        timestamp: DateTime<Utc>,
        idle_seconds: u64,
        sounded: bool,
    },
    #[serde(rename = "dings")]
    Dings {
        timestamp: DateTime<Utc>,
        cycle: u32,
        requested: u32,
        played: u32,
    },
}

/// JSONL logger for watcher events.
pub struct JsonlLogger {
    logs_dir: PathBuf,
    current_file: Option<BufWriter<File>>,
    current_date: Option<String>,
}

impl JsonlLogger {
    /// Create a new JSONL logger.
    pub fn new(logs_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&logs_dir)
            .with_context(|| format!("Failed to create logs directory: {:?}", logs_dir))?;

        Ok(Self {
            logs_dir,
            current_file: None,
            current_date: None,
        })
    }

    /// Path of the journal file for `date` (`YYYY-MM-DD`).
    pub fn path_for(&self, date: &str) -> PathBuf {
        self.logs_dir.join(format!("{}.jsonl", date))
    }

    /// Get or create the log file for today.
    fn get_writer(&mut self) -> Result<&mut BufWriter<File>> {
        let today = Local::now().format("%Y-%m-%d").to_string();

        if self.current_date.as_ref() != Some(&today) {
            let log_path = self.path_for(&today);

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .with_context(|| format!("Failed to open log file: {:?}", log_path))?;

            self.current_file = Some(BufWriter::new(file));
            self.current_date = Some(today);

            debug!("Opened journal file: {:?}", log_path);
        }

        self.current_file
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("No log file available"))
    }

    /// Write a line to the JSONL log.
    fn write_line<T: Serialize>(&mut self, entry: &T) -> Result<()> {
        let line = serde_json::to_string(entry)?;
        let writer = self.get_writer()?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    pub fn log_session_start(&mut self, version: &str) -> Result<()> {
        let event = SessionEvent::SessionStart {
            timestamp: Utc::now(),
            version: version.to_string(),
        };
        info!("Session started");
        self.write_line(&event)
    }

    pub fn log_session_end(&mut self, checks: u64, auto_moves: u64) -> Result<()> {
        let event = SessionEvent::SessionEnd {
            timestamp: Utc::now(),
            checks,
            auto_moves,
        };
        self.write_line(&event)
    }

    pub fn log_human_movement(&mut self, distance: f64) -> Result<()> {
        self.write_line(&SessionEvent::HumanMovement {
            timestamp: Utc::now(),
            distance_px: distance.round() as u32,
        })
    }

    pub fn log_auto_move(&mut self, from: Position, to: Position) -> Result<()> {
        self.write_line(&SessionEvent::AutoMove {
            timestamp: Utc::now(),
            from,
            to,
        })
    }

    /// Journal whatever an auto-move cycle escalated: the alarm, the dings,
    /// or nothing.
    pub fn log_escalation(&mut self, report: &AutoMoveReport) -> Result<()> {
        let timestamp = Utc::now();
        if report.alarm_fired {
            self.write_line(&SessionEvent::Alarm {
                timestamp,
                idle_seconds: report.idle_for.as_secs(),
                sounded: report.alarm_sounded,
            })?;
        }
        if report.dings_requested > 0 {
            self.write_line(&SessionEvent::Dings {
                timestamp,
                cycle: report.cycle,
                requested: report.dings_requested,
                played: report.dings_played,
            })?;
        }
        Ok(())
    }
}

impl Drop for JsonlLogger {
    fn drop(&mut self) {
        if let Some(ref mut writer) = self.current_file {
            let _ = writer.flush();
        }
    }
}
