use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::StudySessionDraft;

pub const STUDY_SECS: u32 = 25 * 60;
pub const BREAK_SECS: u32 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Study,
    Break,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("select a course before starting a study session")]
    NoCourseSelected,

    #[error("cannot change course while the timer is running")]
    Running,
}

/// A finished study phase, ready to be stored as a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedStudy {
    pub course_id: i64,
    pub duration: u32,
    pub date: DateTime<Utc>,
}

impl From<CompletedStudy> for StudySessionDraft {
    fn from(done: CompletedStudy) -> Self {
        StudySessionDraft {
            course_id: done.course_id,
            duration: done.duration,
            date: done.date,
            notes: String::new(),
        }
    }
}

/// Point-in-time view of a [`StudyTimer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatus {
    pub phase: TimerPhase,
    pub course_id: Option<i64>,
    pub running: bool,
    pub remaining: u32,
    pub display: String,
    pub progress: f64,
}

/// Pomodoro cycle: a study phase followed by a break, repeated.
///
/// The timer never reads the clock; callers feed elapsed seconds through
/// [`StudyTimer::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyTimer {
    course_id: Option<i64>,
    phase: TimerPhase,
    remaining: u32,
    running: bool,
    study_secs: u32,
    break_secs: u32,
}

impl Default for StudyTimer {
    fn default() -> Self {
        Self::new(STUDY_SECS, BREAK_SECS)
    }
}

impl StudyTimer {
    pub fn new(study_secs: u32, break_secs: u32) -> Self {
        Self {
            course_id: None,
            phase: TimerPhase::Study,
            remaining: study_secs,
            running: false,
            study_secs,
            break_secs,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn course_id(&self) -> Option<i64> {
        self.course_id
    }

    pub fn select_course(&mut self, course_id: Option<i64>) -> Result<(), TimerError> {
        if self.running {
            return Err(TimerError::Running);
        }
        self.course_id = course_id;
        Ok(())
    }

    /// Starts or pauses. Returns whether the timer is now running.
    pub fn toggle(&mut self) -> Result<bool, TimerError> {
        if !self.running && self.phase == TimerPhase::Study && self.course_id.is_none() {
            return Err(TimerError::NoCourseSelected);
        }
        self.running = !self.running;
        Ok(self.running)
    }

    /// Stops and rewinds the current phase.
    pub fn reset(&mut self) {
        self.running = false;
        self.remaining = self.phase_length();
    }

    /// Advances a running timer. Time past the end of a phase is dropped and
    /// the timer stops at the start of the next phase.
    pub fn tick(&mut self, elapsed_secs: u32, now: DateTime<Utc>) -> Option<CompletedStudy> {
        if !self.running {
            return None;
        }
        if elapsed_secs < self.remaining {
            self.remaining -= elapsed_secs;
            return None;
        }

        self.running = false;
        match self.phase {
            TimerPhase::Study => {
                self.phase = TimerPhase::Break;
                self.remaining = self.break_secs;
                self.course_id.map(|course_id| CompletedStudy {
                    course_id,
                    duration: self.study_secs,
                    date: now,
                })
            }
            TimerPhase::Break => {
                self.phase = TimerPhase::Study;
                self.remaining = self.study_secs;
                None
            }
        }
    }

    fn phase_length(&self) -> u32 {
        match self.phase {
            TimerPhase::Study => self.study_secs,
            TimerPhase::Break => self.break_secs,
        }
    }

    /// Percent of the current phase already elapsed.
    pub fn progress(&self) -> f64 {
        let total = self.phase_length();
        if total == 0 {
            return 100.0;
        }
        f64::from(total - self.remaining) / f64::from(total) * 100.0
    }

    /// `MM:SS`.
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.remaining / 60, self.remaining % 60)
    }

    pub fn status(&self) -> TimerStatus {
        TimerStatus {
            phase: self.phase,
            course_id: self.course_id,
            running: self.running,
            remaining: self.remaining,
            display: self.display(),
            progress: self.progress(),
        }
    }
}
