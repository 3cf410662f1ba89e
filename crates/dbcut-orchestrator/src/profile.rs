use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::state::RunState;

/// Start/stop timing per phase transition, grounded on the original's
/// `before_cursor_execute`/`after_cursor_execute` query-timing hooks but
/// recorded once per orchestrator phase rather than per SQL statement —
/// there is no live event bus to hang a per-statement hook off of here.
#[derive(Debug, Default)]
pub struct RunProfile {
    phases: BTreeMap<&'static str, Duration>,
    current: Option<(&'static str, Instant)>,
}

impl RunProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, phase_name: &'static str, at: Instant) {
        self.close_current(at);
        self.current = Some((phase_name, at));
    }

    pub fn finish(&mut self, at: Instant) {
        self.close_current(at);
    }

    fn close_current(&mut self, at: Instant) {
        if let Some((name, started)) = self.current.take() {
            *self.phases.entry(name).or_insert(Duration::ZERO) += at.duration_since(started);
        }
    }

    pub fn elapsed(&self, phase_name: &str) -> Option<Duration> {
        self.phases.get(phase_name).copied()
    }

    pub fn total(&self) -> Duration {
        self.phases.values().sum()
    }

    pub fn phases(&self) -> impl Iterator<Item = (&'static str, Duration)> + '_ {
        self.phases.iter().map(|(name, duration)| (*name, *duration))
    }
}

pub fn phase_name(state: RunState) -> &'static str {
    match state {
        RunState::Init => "init",
        RunState::Reflecting => "reflecting",
        RunState::SchemaReady => "schema_ready",
        RunState::Compiling => "compiling",
        RunState::CacheHit => "cache_hit",
        RunState::Extracting => "extracting",
        RunState::Caching => "caching",
        RunState::Loading => "loading",
        RunState::Done => "done",
        RunState::Error => "error",
    }
}
