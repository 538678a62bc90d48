//! Turns a timing plan into cues on the shared scheduler.
//!
//! Each call that starts something (a sequence, a study window, an
//! inter-trial wait) opens a new scheduler group, which drops whatever the
//! previous group still had pending.

use spanlab_timing::{CancellationToken, Fired, Scheduler, TimerId};
use tracing::debug;

use crate::config::TimingPlan;
use crate::error::EngineError;

/// Timed transitions produced by the presentation scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Show(usize),
    Clear(usize),
    SequenceFinished,
    CountdownTick { remaining_ms: u64 },
    EarlyExitAvailable,
    StudyExpired,
    NextTrial,
}

#[derive(Debug, Clone, Copy)]
struct StudyWindow {
    started_ms: u64,
    expiry: TimerId,
}

#[derive(Debug)]
pub struct PresentationScheduler {
    timing: TimingPlan,
    scheduler: Scheduler<Cue>,
    study: Option<StudyWindow>,
}

impl PresentationScheduler {
    pub fn new(timing: TimingPlan) -> Self {
        Self {
            timing,
            scheduler: Scheduler::new(),
            study: None,
        }
    }

    pub fn timing(&self) -> &TimingPlan {
        &self.timing
    }

    /// Schedules show/clear cues for `len` items starting at `now_ms`.
    ///
    /// Item `i` shows at `i * (display + blank)` and clears `display` later;
    /// the sequence finishes at `len * (display + blank) + finish_buffer`.
    pub fn start_sequence(&mut self, now_ms: u64, len: usize) -> CancellationToken {
        let token = self.begin();
        let period = self.timing.item_period_ms();
        for i in 0..len {
            let onset = now_ms + i as u64 * period;
            self.scheduler.schedule_at(&token, onset, Cue::Show(i));
            self.scheduler
                .schedule_at(&token, onset + self.timing.display_ms, Cue::Clear(i));
        }
        self.scheduler.schedule_at(
            &token,
            now_ms + self.timing.sequence_duration_ms(len),
            Cue::SequenceFinished,
        );
        debug!(len, period, "sequence scheduled");
        token
    }

    /// Starts a study countdown. Expiry and an early exit race to the same
    /// transition; whichever comes first retracts the other.
    pub fn start_study(&mut self, now_ms: u64) -> CancellationToken {
        let token = self.begin();
        let study_ms = self.study_ms();
        let step = self.timing.countdown_step_ms.max(1);

        let mut elapsed = step;
        while elapsed < study_ms {
            self.scheduler.schedule_at(
                &token,
                now_ms + elapsed,
                Cue::CountdownTick {
                    remaining_ms: study_ms - elapsed,
                },
            );
            elapsed += step;
        }
        if let Some(min_ready_ms) = self.timing.min_ready_ms {
            self.scheduler
                .schedule_at(&token, now_ms + min_ready_ms, Cue::EarlyExitAvailable);
        }
        let expiry = self
            .scheduler
            .schedule_at(&token, now_ms + study_ms, Cue::StudyExpired);

        if let Some(expiry) = expiry {
            self.study = Some(StudyWindow {
                started_ms: now_ms,
                expiry,
            });
        }
        debug!(study_ms, "study window scheduled");
        token
    }

    /// Ends the study window early, if the minimum study time has passed.
    pub fn request_early_exit(&mut self, now_ms: u64) -> Result<(), EngineError> {
        let window = self.study.ok_or(EngineError::NoStudyInProgress)?;
        let elapsed = now_ms.saturating_sub(window.started_ms);
        let ready_at = self.timing.min_ready_ms.unwrap_or(self.study_ms());
        if elapsed < ready_at {
            return Err(EngineError::EarlyExitUnavailable {
                remaining_ms: ready_at - elapsed,
            });
        }
        self.scheduler.cancel(window.expiry);
        self.cancel_all();
        debug!(elapsed, "study ended early");
        Ok(())
    }

    pub fn is_studying(&self) -> bool {
        self.study.is_some()
    }

    /// Time left in the current study window.
    pub fn study_remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.study.map(|w| {
            let elapsed = now_ms.saturating_sub(w.started_ms);
            self.study_ms().saturating_sub(elapsed)
        })
    }

    pub fn schedule_next_trial(&mut self, now_ms: u64) -> CancellationToken {
        let token = self.begin();
        self.scheduler
            .schedule_at(&token, now_ms + self.timing.inter_trial_ms, Cue::NextTrial);
        token
    }

    /// Drops every pending cue.
    pub fn cancel_all(&mut self) {
        self.study = None;
        self.scheduler.cancel_group();
    }

    /// Pops the next cue due at `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<Fired<Cue>> {
        let fired = self.scheduler.pop_due(now_ms)?;
        if fired.event == Cue::StudyExpired {
            // retracts the early-exit affordance and any ticks left at this instant
            self.cancel_all();
        }
        Some(fired)
    }

    pub fn next_due(&self) -> Option<u64> {
        self.scheduler.next_due()
    }

    pub fn pending(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn active_generation(&self) -> Option<u64> {
        self.scheduler.active_generation()
    }

    fn begin(&mut self) -> CancellationToken {
        self.study = None;
        self.scheduler.begin_group()
    }

    fn study_ms(&self) -> u64 {
        self.timing.study_ms.unwrap_or(0)
    }
}
