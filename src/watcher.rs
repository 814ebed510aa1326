//! Poll loop: samples the pointer, nudges it when nobody moved it, and feeds
//! the escalation engine.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::alarm::{AutoMoveReport, Clock, EscalationEngine};
use crate::config::Config;
use crate::logging::JsonlLogger;
use crate::notify::Notifier;
use crate::pointer::{nudge, MoveSettings, Pointer, Position};

/// Poll loop parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchSettings {
    pub interval: Duration,
    /// Displacement in pixels above which a sample counts as human movement.
    pub movement_threshold: f64,
    pub movement: MoveSettings,
}

impl WatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll.interval(),
            movement_threshold: config.poll.movement_threshold_px as f64,
            movement: config.move_settings(),
        }
    }
}

/// What one poll cycle did.
#[derive(Debug)]
pub enum CycleOutcome {
    HumanMoved {
        distance: f64,
    },
    AutoMoved {
        from: Position,
        to: Position,
        report: AutoMoveReport,
    },
    /// The pointer could not be read; try again next cycle.
    Skipped,
}

pub struct Watcher<P, N, C> {
    pointer: P,
    engine: EscalationEngine<N, C>,
    clock: C,
    settings: WatchSettings,
    journal: Option<JsonlLogger>,
    rng: StdRng,
    previous: Option<Position>,
    checks: u64,
    auto_moves: u64,
}

impl<P: Pointer, N: Notifier, C: Clock> Watcher<P, N, C> {
    pub fn new(
        pointer: P,
        engine: EscalationEngine<N, C>,
        clock: C,
        settings: WatchSettings,
        journal: Option<JsonlLogger>,
    ) -> Self {
        Self {
            pointer,
            engine,
            clock,
            settings,
            journal,
            rng: StdRng::from_entropy(),
            previous: None,
            checks: 0,
            auto_moves: 0,
        }
    }

    /// Run cycles until `cancel` fires. Blocks the calling thread, which
    /// must not be a runtime worker.
    pub fn run(&mut self, handle: &Handle, cancel: &CancellationToken) {
        self.log_banner();

        match self.pointer.position() {
            Ok(position) => {
                info!("Initial pointer position: {}", position);
                self.previous = Some(position);
            }
            Err(e) => warn!("Could not read initial pointer position: {}", e),
        }
        self.journal(|j| j.log_session_start(crate::VERSION));

        while !handle.block_on(wait_for_next_cycle(cancel, self.settings.interval)) {
            self.cycle();
        }

        let (checks, auto_moves) = (self.checks, self.auto_moves);
        info!(
            "Stopped after {} checks ({} auto-moves), final consecutive auto-move count: {}",
            checks,
            auto_moves,
            self.engine.status_snapshot().consecutive_auto_moves
        );
        self.journal(|j| j.log_session_end(checks, auto_moves));
    }

    /// Sample the pointer once and react.
    pub fn cycle(&mut self) -> CycleOutcome {
        self.checks += 1;
        let check = self.checks;

        let current = match self.pointer.position() {
            Ok(position) => position,
            Err(e) => {
                warn!("[Check #{}] Skipping: {}", check, e);
                return CycleOutcome::Skipped;
            }
        };
        let previous = *self.previous.get_or_insert(current);
        let distance = previous.distance_to(current);

        if distance > self.settings.movement_threshold {
            info!(
                "[Check #{}] Pointer moved {}px {} -> {}",
                check, distance as u32, previous, current
            );
            self.engine.on_human_movement();
            self.previous = Some(current);
            self.journal(|j| j.log_human_movement(distance));
            return CycleOutcome::HumanMoved { distance };
        }

        info!(
            "[Check #{}] Pointer barely moved ({}px <= {}px threshold) at {}",
            check, distance as u32, self.settings.movement_threshold, current
        );

        let moved_to = match nudge(
            &mut self.pointer,
            current,
            &self.settings.movement,
            &mut self.rng,
            &self.clock,
        ) {
            Ok(target) => {
                self.auto_moves += 1;
                info!(
                    "Moved pointer {} -> {} ({}px)",
                    current,
                    target,
                    current.distance_to(target) as u32
                );
                self.journal(|j| j.log_auto_move(current, target));
                Some(target)
            }
            Err(e) => {
                warn!("Failed to move pointer: {}", e);
                None
            }
        };

        // Re-sample before the dings so a human grabbing the pointer during
        // the batch is seen next cycle. If the read fails, the pointer is
        // assumed to be where it was sent.
        let after = match self.pointer.position() {
            Ok(position) => position,
            Err(e) => {
                let assumed = moved_to.unwrap_or(current);
                warn!("Could not re-read pointer after move, assuming {}: {}", assumed, e);
                assumed
            }
        };
        self.previous = Some(after);

        let report = self.engine.on_auto_move();
        self.journal(|j| j.log_escalation(&report));

        CycleOutcome::AutoMoved {
            from: current,
            to: after,
            report,
        }
    }

    fn journal(&mut self, write: impl FnOnce(&mut JsonlLogger) -> anyhow::Result<()>) {
        if let Some(journal) = self.journal.as_mut() {
            if let Err(e) = write(journal) {
                warn!("Failed to write journal entry: {}", e);
            }
        }
    }

    fn log_banner(&self) {
        let status = self.engine.status_snapshot();
        let movement = &self.settings.movement;
        info!("=== mousewake started ===");
        info!(
            "  Check interval: {}",
            humantime::format_duration(self.settings.interval)
        );
        info!(
            "  Movement threshold: {}px",
            self.settings.movement_threshold
        );
        info!(
            "  Random move distance: {}-{}px ({})",
            movement.min_distance,
            movement.max_distance,
            if movement.smooth { "glide" } else { "jump" }
        );
        info!(
            "  Alarm timeout: {}",
            humantime::format_duration(status.alarm_timeout)
        );
        info!(
            "  Max dings per cycle: {} (min(20, interval / ding unit))",
            status.max_ding_count
        );
        if let Ok((width, height)) = self.pointer.screen_size() {
            info!("  Screen size: {}x{}", width, height);
        }
        info!("Press Ctrl+C to stop");
    }
}

/// Sleep one poll interval. Returns `true` if `cancel` fired first.
pub async fn wait_for_next_cycle(cancel: &CancellationToken, interval: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(interval) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{EngineSettings, ManualClock};
    use crate::notify::testing::RecordingNotifier;
    use crate::pointer::testing::FakePointer;
    use std::sync::Arc;
    use tempfile::tempdir;

    type TestWatcher = Watcher<FakePointer, Arc<RecordingNotifier>, Arc<ManualClock>>;

    struct Harness {
        watcher: TestWatcher,
        pointer: FakePointer,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<ManualClock>,
    }

    fn harness(journal: Option<JsonlLogger>) -> Harness {
        let pointer = FakePointer::new(Position::new(960, 540), (1920, 1080));
        let notifier = RecordingNotifier::new();
        let clock = ManualClock::new();
        let engine = EscalationEngine::new(
            EngineSettings {
                alarm_timeout: Duration::from_secs(10),
                poll_interval: Duration::from_secs(5),
                ding_unit: Duration::from_secs(1),
            },
            notifier.clone(),
            clock.clone(),
        )
        .unwrap();
        let settings = WatchSettings {
            interval: Duration::from_secs(5),
            movement_threshold: 10.0,
            movement: MoveSettings {
                min_distance: 100,
                max_distance: 500,
                margin: 50,
                smooth: false,
            },
        };

        let mut watcher = Watcher::new(pointer.clone(), engine, clock.clone(), settings, journal);
        watcher.rng = StdRng::seed_from_u64(17);

        Harness {
            watcher,
            pointer,
            notifier,
            clock,
        }
    }

    fn cycle_at(h: &mut Harness, secs: u64) -> CycleOutcome {
        h.clock.set_secs(secs);
        h.watcher.cycle()
    }

    #[test]
    fn test_still_pointer_gets_nudged() {
        let mut h = harness(None);

        let outcome = cycle_at(&mut h, 5);

        match outcome {
            CycleOutcome::AutoMoved { from, to, report } => {
                assert_eq!(from, Position::new(960, 540));
                assert_eq!(to, h.pointer.current());
                assert_ne!(to, from);
                assert!(!report.alarm_fired);
            }
            other => panic!("expected auto move, got {:?}", other),
        }
        assert_eq!(h.pointer.moves().len(), 1);
    }

    #[test]
    fn test_jitter_below_threshold_is_not_human() {
        let mut h = harness(None);
        cycle_at(&mut h, 5);

        let here = h.pointer.current();
        h.pointer.human_move(Position::new(here.x + 6, here.y + 8));

        assert!(matches!(cycle_at(&mut h, 10), CycleOutcome::AutoMoved { .. }));
    }

    #[test]
    fn test_human_movement_resets_engine() {
        let mut h = harness(None);
        cycle_at(&mut h, 5);
        cycle_at(&mut h, 10);
        assert!(h.watcher.engine.status_snapshot().alarm_triggered);

        let here = h.pointer.current();
        h.pointer.human_move(Position::new(here.x + 30, here.y + 40));
        let outcome = cycle_at(&mut h, 15);

        match outcome {
            CycleOutcome::HumanMoved { distance } => assert_eq!(distance, 50.0),
            other => panic!("expected human movement, got {:?}", other),
        }
        let status = h.watcher.engine.status_snapshot();
        assert!(!status.alarm_triggered);
        assert_eq!(status.consecutive_auto_moves, 0);

        // the pointer stayed where the human left it
        assert!(matches!(cycle_at(&mut h, 20), CycleOutcome::AutoMoved { .. }));
    }

    #[test]
    fn test_escalation_through_poll_loop() {
        let mut h = harness(None);

        let dings: Vec<u32> = [5, 10, 15, 20]
            .into_iter()
            .map(|t| match cycle_at(&mut h, t) {
                CycleOutcome::AutoMoved { report, .. } => report.dings_requested,
                other => panic!("expected auto move, got {:?}", other),
            })
            .collect();

        assert_eq!(dings, vec![0, 1, 2, 3]);
        // alarms at 10s and 20s plus 1 + 2 + 3 dings
        assert_eq!(h.notifier.plays(), 8);
    }

    #[test]
    fn test_failed_resample_keeps_nudge_target_as_baseline() {
        let mut h = harness(None);
        cycle_at(&mut h, 5);
        h.pointer.fail_query_after_next_move();

        let outcome = cycle_at(&mut h, 10);
        let target = h.pointer.current();
        match outcome {
            CycleOutcome::AutoMoved { to, report, .. } => {
                assert_eq!(to, target);
                assert!(report.alarm_fired);
            }
            other => panic!("expected auto move, got {:?}", other),
        }
        assert!(h.watcher.engine.status_snapshot().alarm_triggered);

        // nobody touched the pointer: still an auto cycle, alarm epoch intact
        match cycle_at(&mut h, 15) {
            CycleOutcome::AutoMoved { report, .. } => assert_eq!(report.dings_requested, 2),
            other => panic!("expected auto move, got {:?}", other),
        }
        let status = h.watcher.engine.status_snapshot();
        assert!(status.alarm_triggered);
        assert_eq!(status.consecutive_auto_moves, 3);
    }

    #[test]
    fn test_unreadable_pointer_skips_cycle() {
        let mut h = harness(None);
        h.pointer.set_fail_queries(true);

        assert!(matches!(cycle_at(&mut h, 5), CycleOutcome::Skipped));
        assert!(matches!(cycle_at(&mut h, 15), CycleOutcome::Skipped));
        assert!(h.pointer.moves().is_empty());
        assert_eq!(h.notifier.plays(), 0);
        assert_eq!(h.watcher.checks, 2);

        h.pointer.set_fail_queries(false);
        assert!(matches!(cycle_at(&mut h, 20), CycleOutcome::AutoMoved { .. }));
    }

    #[test]
    fn test_cycles_are_journaled() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let journal = JsonlLogger::new(dir.path().to_path_buf())?;
        let mut h = harness(Some(journal));

        cycle_at(&mut h, 5);
        cycle_at(&mut h, 10);
        let here = h.pointer.current();
        h.pointer.human_move(Position::new(here.x + 100, here.y));
        cycle_at(&mut h, 15);

        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        let content = std::fs::read_to_string(dir.path().join(format!("{}.jsonl", today)))?;
        let kinds: Vec<String> = content
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["event"].as_str().unwrap().to_string()
            })
            .collect();

        assert_eq!(
            kinds,
            vec!["auto_move", "auto_move", "alarm", "dings", "human_movement"]
        );
        Ok(())
    }

    #[test]
    fn test_wait_for_next_cycle() {
        let cancel = CancellationToken::new();
        assert!(!tokio_test::block_on(wait_for_next_cycle(
            &cancel,
            Duration::from_millis(10)
        )));

        cancel.cancel();
        assert!(tokio_test::block_on(wait_for_next_cycle(
            &cancel,
            Duration::from_secs(3600)
        )));
    }

    #[test]
    fn test_run_stops_when_cancelled() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let journal = JsonlLogger::new(dir.path().to_path_buf())?;
        let mut h = harness(Some(journal));
        let runtime = tokio::runtime::Runtime::new()?;
        let cancel = CancellationToken::new();
        cancel.cancel();

        h.watcher.run(runtime.handle(), &cancel);

        assert_eq!(h.watcher.checks, 0);
        assert!(h.pointer.moves().is_empty());
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        let content = std::fs::read_to_string(dir.path().join(format!("{}.jsonl", today)))?;
        assert_eq!(content.lines().count(), 2);
        Ok(())
    }
}
