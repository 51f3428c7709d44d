//! Lifecycle states and transitions
//!
//! A module moves forward through a fixed sequence of states during a run:
//!
//! ```text
//! Declared -> Configured -> Built -> Verified -> Published
//! ```
//!
//! States are totally ordered, so "at least as advanced as" is a plain `>=`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lifecycle state of a module within one orchestration run
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    /// Registered from declarations, nothing applied yet
    #[default]
    Declared,
    /// Capabilities bound and effective configuration resolved
    Configured,
    /// Compiled into an artifact
    Built,
    /// Tests run and verification gates passed
    Verified,
    /// Artifact handed to the publisher
    Published,
}

impl LifecycleState {
    /// Every state, in lifecycle order
    pub const ALL: [LifecycleState; 5] = [
        Self::Declared,
        Self::Configured,
        Self::Built,
        Self::Verified,
        Self::Published,
    ];

    /// The immediate next state, or `None` for `Published`
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Declared => Some(Self::Configured),
            Self::Configured => Some(Self::Built),
            Self::Built => Some(Self::Verified),
            Self::Verified => Some(Self::Published),
            Self::Published => None,
        }
    }

    /// Whether this is the final state of the lifecycle
    pub fn is_final(self) -> bool {
        self == Self::Published
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Declared => "declared",
            Self::Configured => "configured",
            Self::Built => "built",
            Self::Verified => "verified",
            Self::Published => "published",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidLifecycle {
                value: s.to_string(),
            })
    }
}

/// An edge of the lifecycle state machine
///
/// Written as `"from->to"` in declarations, e.g. `"built->verified"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Transition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

impl Transition {
    pub fn new(from: LifecycleState, to: LifecycleState) -> Self {
        Self { from, to }
    }

    /// The transition leaving `from` towards its successor
    pub fn forward_from(from: LifecycleState) -> Option<Self> {
        from.successor().map(|to| Self { from, to })
    }

    /// Whether `to` is the immediate successor of `from`
    pub fn is_forward_step(&self) -> bool {
        self.from.successor() == Some(self.to)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

impl FromStr for Transition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (from, to) = s.split_once("->").ok_or_else(|| Error::InvalidLifecycle {
            value: s.to_string(),
        })?;
        Ok(Self {
            from: from.parse()?,
            to: to.parse()?,
        })
    }
}

impl TryFrom<String> for Transition {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Transition> for String {
    fn from(value: Transition) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn states_are_ordered() {
        assert!(LifecycleState::Declared < LifecycleState::Configured);
        assert!(LifecycleState::Verified < LifecycleState::Published);
        assert!(LifecycleState::Built >= LifecycleState::Built);
    }

    #[test]
    fn successor_walks_the_whole_lifecycle() {
        let mut state = LifecycleState::Declared;
        let mut seen = vec![state];
        while let Some(next) = state.successor() {
            seen.push(next);
            state = next;
        }
        assert_eq!(seen, LifecycleState::ALL.to_vec());
        assert!(state.is_final());
    }

    #[rstest]
    #[case("built->verified", LifecycleState::Built, LifecycleState::Verified)]
    #[case("Declared->Configured", LifecycleState::Declared, LifecycleState::Configured)]
    #[case(" verified -> published ", LifecycleState::Verified, LifecycleState::Published)]
    fn parses_transitions(
        #[case] input: &str,
        #[case] from: LifecycleState,
        #[case] to: LifecycleState,
    ) {
        let transition: Transition = input.parse().unwrap();
        assert_eq!(transition, Transition::new(from, to));
    }

    #[test]
    fn rejects_malformed_transition() {
        assert!("built".parse::<Transition>().is_err());
        assert!("built->shipped".parse::<Transition>().is_err());
    }

    #[test]
    fn skipping_a_state_is_not_a_forward_step() {
        let skip = Transition::new(LifecycleState::Configured, LifecycleState::Verified);
        assert!(!skip.is_forward_step());
        let step = Transition::forward_from(LifecycleState::Configured).unwrap();
        assert!(step.is_forward_step());
        assert_eq!(step.to_string(), "configured->built");
    }

    #[test]
    fn state_serializes_kebab_case() {
        let json = serde_json::to_string(&LifecycleState::Published).unwrap();
        assert_eq!(json, "\"published\"");
    }
}
