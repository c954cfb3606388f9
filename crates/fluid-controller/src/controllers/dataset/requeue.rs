use std::fmt;
use std::time::Duration;

/// scheduling instruction returned by a reconciliation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
    #[default]
    None,
    Immediate,
    After(Duration),
}

impl Requeue {
    /// resync after `period` if requested, otherwise nothing
    pub fn resync_if(needed: bool, period: Duration) -> Self {
        if needed { Self::After(period) } else { Self::None }
    }
}

impl fmt::Display for Requeue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::None => write!(f, "no requeue"),
            Self::Immediate => write!(f, "requeue immediately"),
            Self::After(delay) => write!(f, "requeue after {}", humantime::format_duration(*delay)),
        }
    }
}
