//! Live/demo mode control.
//!
//! The controller stores only the operator's `force_demo` flag. Whether live
//! calls are possible comes from a [`Readiness`] snapshot supplied by the
//! caller on every read, so the reported mode always reflects the toolkit
//! as it is now.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::errors::ModeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Demo,
    Live,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Demo => "demo",
            Self::Live => "live",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "demo" => Some(Self::Demo),
            "live" => Some(Self::Live),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally reported status; `Unavailable` means live calls are impossible
/// regardless of what the operator asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingStatus {
    Unavailable,
    Demo,
    Live,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Readiness {
    pub toolkit_available: bool,
    pub tools_registered: usize,
    pub credentials_configured: bool,
}

impl Readiness {
    pub fn can_go_live(&self) -> bool {
        self.toolkit_available && self.tools_registered > 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeSnapshot {
    pub current_mode: Mode,
    #[serde(rename = "forceDemoMode")]
    pub force_demo: bool,
    pub can_go_live: bool,
    pub toolkit_available: bool,
    pub credentials_configured: bool,
}

impl ModeSnapshot {
    pub fn status(&self) -> OperatingStatus {
        if !self.can_go_live {
            OperatingStatus::Unavailable
        } else if self.force_demo {
            OperatingStatus::Demo
        } else {
            OperatingStatus::Live
        }
    }

    pub fn is_live(&self) -> bool {
        self.current_mode == Mode::Live
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModeTransition {
    pub previous: Mode,
    pub current: Mode,
}

#[derive(Debug, Default)]
pub struct ModeController {
    force_demo: AtomicBool,
}

impl ModeController {
    pub fn new(force_demo: bool) -> Self {
        Self { force_demo: AtomicBool::new(force_demo) }
    }

    pub fn force_demo(&self) -> bool {
        self.force_demo.load(Ordering::SeqCst)
    }

    pub fn effective_mode(&self, readiness: &Readiness) -> Mode {
        if readiness.can_go_live() && !self.force_demo() {
            Mode::Live
        } else {
            Mode::Demo
        }
    }

    pub fn snapshot(&self, readiness: &Readiness) -> ModeSnapshot {
        ModeSnapshot {
            current_mode: self.effective_mode(readiness),
            force_demo: self.force_demo(),
            can_go_live: readiness.can_go_live(),
            toolkit_available: readiness.toolkit_available,
            credentials_configured: readiness.credentials_configured,
        }
    }

    /// Requesting live while the toolkit cannot serve it leaves the flag
    /// untouched.
    pub fn set_mode(
        &self,
        requested: Mode,
        readiness: &Readiness,
    ) -> Result<ModeTransition, ModeError> {
        if requested == Mode::Live && !readiness.can_go_live() {
            return Err(ModeError::InvalidTransition {
                requested,
                toolkit_available: readiness.toolkit_available,
                credentials_configured: readiness.credentials_configured,
            });
        }

        let previous = self.effective_mode(readiness);
        self.force_demo.store(requested == Mode::Demo, Ordering::SeqCst);

        Ok(ModeTransition { previous, current: self.effective_mode(readiness) })
    }
}
