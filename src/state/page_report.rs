/// Outcome tracking for individual page tasks
use crate::HarvestError;
use std::fmt;

/// How a page task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was fetched and this many records were extracted from it
    Harvested { records: usize },

    /// The transport failed (connection error, timeout, non-2xx status)
    Unavailable { error: String },

    /// Every attempt returned a soft-failure page
    Exhausted { error: String },

    /// The task panicked before reporting
    Crashed { error: String },

    /// The task was cancelled before it finished (early-termination mode)
    Aborted,
}

impl PageOutcome {
    /// Classifies the error that ended a page task
    pub fn from_error(error: &HarvestError) -> Self {
        if error.is_transport() {
            Self::Unavailable {
                error: error.to_string(),
            }
        } else {
            Self::Exhausted {
                error: error.to_string(),
            }
        }
    }

    /// Returns true if the page yielded its records
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Harvested { .. })
    }

    /// Returns true if the page failed permanently for this run
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Exhausted { .. } | Self::Crashed { .. }
        )
    }

    /// The error message of a failed page
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Unavailable { error } | Self::Exhausted { error } | Self::Crashed { error } => {
                Some(error)
            }
            Self::Harvested { .. } | Self::Aborted => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Harvested { .. } => "harvested",
            Self::Unavailable { .. } => "unavailable",
            Self::Exhausted { .. } => "exhausted",
            Self::Crashed { .. } => "crashed",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The result of one page task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    pub page: u32,
    pub url: String,
    pub outcome: PageOutcome,
}

impl PageReport {
    pub fn new(page: u32, url: impl Into<String>, outcome: PageOutcome) -> Self {
        Self {
            page,
            url: url.into(),
            outcome,
        }
    }

    /// Records contributed by this page (0 unless harvested)
    pub fn records(&self) -> usize {
        match self.outcome {
            PageOutcome::Harvested { records } => records,
            _ => 0,
        }
    }
}
