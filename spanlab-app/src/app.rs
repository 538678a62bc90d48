use anyhow::{Context, Result};
use rand::Rng;
use rand::rngs::StdRng;
use spanlab_core::{PresentationObserver, TrialStimulus};
use spanlab_experiment::{EngineError, SessionSummary, TaskConfig, TrialEngine};
use spanlab_timing::{HighPrecisionTimer, Timer};
use std::io::{self, BufRead, Stdout, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use crate::response::{parse_response, prompt};
use crate::terminal::TerminalObserver;

type TerminalEngine = TrialEngine<HighPrecisionTimer, StdRng, TerminalObserver<Stdout>>;

/// Lines read from the participant, in order. Closed at end of input.
pub type LineFeed = Receiver<io::Result<String>>;

/// Reads `input` on a helper thread so timed cues keep firing while the
/// participant is not typing.
pub fn spawn_line_reader<I>(input: I) -> LineFeed
where
    I: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in input.lines() {
            let failed = line.is_err();
            if tx.send(line).is_err() || failed {
                break;
            }
        }
        debug!("input closed");
    });
    rx
}

/// Interactive session: stimuli on stdout, answers from a line feed.
pub struct App {
    engine: TerminalEngine,
    lines: LineFeed,
}

impl App {
    pub fn new<I>(config: TaskConfig, rng: StdRng, input: I) -> Result<Self>
    where
        I: BufRead + Send + 'static,
    {
        let task_id = config.task_id.clone();
        let engine = TrialEngine::new(
            config,
            HighPrecisionTimer::new(),
            rng,
            TerminalObserver::new(io::stdout()),
        )
        .with_context(|| format!("invalid configuration for {task_id}"))?;
        Ok(Self {
            engine,
            lines: spawn_line_reader(input),
        })
    }

    pub fn engine(&self) -> &TerminalEngine {
        &self.engine
    }

    /// Runs trials until the staircase terminates or input ends.
    pub fn run(&mut self) -> Result<SessionSummary> {
        println!("=== {} ===", self.engine.config().task_id);
        println!("Press Enter to begin, Ctrl-D to stop.");
        if self.read_line()?.is_none() {
            return Ok(self.engine.summary());
        }

        while !self.engine.is_terminal() {
            self.engine.start_trial()?;
            let state = self.engine.staircase_state();
            info!(level = state.level, attempt = state.attempt, "presenting");
            if let Some(TrialStimulus::Cards(problem)) = self.engine.current_stimulus() {
                println!("Rule: {}", problem.rule);
            }

            if !study(&mut self.engine, &self.lines)? {
                break;
            }
            self.engine.run_until_input();

            let mode = self.engine.config().mode;
            let categories = self.engine.config().stimuli.categories.clone();
            println!("\n{}", prompt(mode, &categories));
            let Some(line) = self.read_line()? else {
                break;
            };
            let response = parse_response(mode, &line, &categories);
            let outcome = self.engine.submit_response(response)?;
            println!("{}", if outcome.evaluation.correct { "Correct." } else { "Incorrect." });
        }

        self.engine.teardown();
        Ok(self.engine.summary())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        io::stdout().flush().context("flushing stdout")?;
        match self.lines.recv() {
            Ok(line) => Ok(Some(line.context("reading input")?)),
            Err(_) => Ok(None),
        }
    }
}

/// Runs a study window to its end: expiry, or an accepted early exit.
///
/// Cues keep firing while waiting for input, so the countdown stays live and
/// the window closes on time without a keypress. Returns false when input
/// ends first.
pub fn study<T, R, O>(engine: &mut TrialEngine<T, R, O>, lines: &LineFeed) -> Result<bool>
where
    T: Timer,
    R: Rng,
    O: PresentationObserver,
{
    loop {
        engine.update();
        if !engine.current_trial().is_some_and(|t| t.is_studying()) {
            return Ok(true);
        }
        let Some(due) = engine.next_due() else {
            return Ok(true);
        };
        let wait = due.saturating_sub(engine.timer().now_ms());

        match lines.recv_timeout(Duration::from_millis(wait)) {
            Ok(line) => {
                line.context("reading input")?;
                match engine.request_early_exit() {
                    Ok(()) | Err(EngineError::NoStudyInProgress) => return Ok(true),
                    Err(EngineError::EarlyExitUnavailable { remaining_ms }) => {
                        println!("Keep studying for another {}s.", remaining_ms.div_ceil(1000));
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            // the wall clock has reached `due`; virtual clocks are moved there
            Err(RecvTimeoutError::Timeout) => engine.timer().sleep_until(due),
            Err(RecvTimeoutError::Disconnected) => return Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use spanlab_core::{PresentationPhase, RecordingObserver};
    use spanlab_timing::ManualTimer;

    type TestEngine = TrialEngine<ManualTimer, StdRng, RecordingObserver>;

    /// Change detection with a short study window: ticks every 20ms, early
    /// exit from 40ms, expiry at 100ms.
    fn studying_engine() -> TestEngine {
        let mut config = TaskConfig::change_detection();
        config.timing.study_ms = Some(100);
        config.timing.min_ready_ms = Some(40);
        config.timing.countdown_step_ms = 20;
        let mut engine = TrialEngine::new(
            config,
            ManualTimer::new(),
            StdRng::seed_from_u64(5),
            RecordingObserver::new(),
        )
        .unwrap();
        engine.start_trial().unwrap();
        assert!(engine.current_trial().unwrap().is_studying());
        engine
    }

    fn countdowns(engine: &TestEngine) -> Vec<u64> {
        engine
            .observer()
            .transitions
            .iter()
            .filter_map(|t| t.remaining_ms)
            .collect()
    }

    #[test]
    fn study_window_expires_without_input() {
        let mut engine = studying_engine();
        let (_tx, rx) = mpsc::channel::<io::Result<String>>();

        assert!(study(&mut engine, &rx).unwrap());
        assert_eq!(engine.timer().now_ms(), 100);
        assert_eq!(engine.phase(), PresentationPhase::AwaitingResponse);
        // every tick was shown as it came due; the ready point repeats 60
        assert_eq!(countdowns(&engine), vec![100, 80, 60, 60, 40, 20]);
    }

    #[test]
    fn line_after_ready_point_ends_study_early() {
        let mut engine = studying_engine();
        engine.timer().advance(50);
        let (tx, rx) = mpsc::channel();
        tx.send(Ok(String::new())).unwrap();

        assert!(study(&mut engine, &rx).unwrap());
        assert_eq!(engine.timer().now_ms(), 50);
        assert_eq!(engine.phase(), PresentationPhase::AwaitingResponse);
        assert!(engine.next_due().is_none());
    }

    #[test]
    fn early_line_is_refused_and_study_continues() {
        let mut engine = studying_engine();
        let (tx, rx) = mpsc::channel();
        tx.send(Ok(String::new())).unwrap();

        assert!(study(&mut engine, &rx).unwrap());
        // the refused request changed nothing; expiry still closed the window
        assert_eq!(engine.timer().now_ms(), 100);
        assert_eq!(engine.phase(), PresentationPhase::AwaitingResponse);
    }

    #[test]
    fn closed_input_abandons_study() {
        let mut engine = studying_engine();
        let (tx, rx) = mpsc::channel::<io::Result<String>>();
        drop(tx);

        assert!(!study(&mut engine, &rx).unwrap());
        assert!(engine.current_trial().unwrap().is_studying());
    }

    #[test]
    fn reader_thread_forwards_lines_then_closes() {
        let rx = spawn_line_reader(io::Cursor::new("3 8 5\n\nlast"));
        let lines: Vec<String> = rx.iter().map(|l| l.unwrap()).collect();
        assert_eq!(lines, ["3 8 5", "", "last"]);
    }
}
