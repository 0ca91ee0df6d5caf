use std::fmt;

/// Lifecycle of one patient run.
///
/// Starts `Running`; each of the other states is terminal.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum RunState {
    #[default]
    Running,
    /// The configured stopping condition holds.
    StoppedCondition,
    /// The patient died.
    StoppedDeath,
    /// `hard_stop` steps completed without either of the above.
    StoppedHardLimit,
}

impl RunState {
    #[inline]
    pub fn is_running(self) -> bool {
        self == RunState::Running
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Running          => "running",
            RunState::StoppedCondition => "stopped_condition",
            RunState::StoppedDeath     => "stopped_death",
            RunState::StoppedHardLimit => "stopped_hard_limit",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
