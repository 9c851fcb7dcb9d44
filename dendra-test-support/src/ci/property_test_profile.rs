//! Property-test run profile shared by every proptest suite.
//!
//! CI raises the case count for nightly jobs and may ask proptest to fork
//! each case into a subprocess. Invalid overrides are logged and ignored.

use std::{env, fmt::Display};

/// Environment variable overriding the number of cases per property.
pub const PROGTEST_CASES_ENV_KEY: &str = "PROGTEST_CASES";
/// Environment variable enabling forked case execution.
pub const DENDRA_PBT_FORK_ENV_KEY: &str = "DENDRA_PBT_FORK";

/// Case count and fork mode for a property suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProptestRunProfile {
    cases: u32,
    fork: bool,
}

impl ProptestRunProfile {
    /// Reads the overrides from the environment, falling back to the given
    /// defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use dendra_test_support::ci::property_test_profile::ProptestRunProfile;
    ///
    /// let profile = ProptestRunProfile::load(32, false);
    /// assert!(profile.cases() > 0);
    /// ```
    #[must_use]
    pub fn load(default_cases: u32, default_fork: bool) -> Self {
        Self {
            cases: override_or(PROGTEST_CASES_ENV_KEY, default_cases, parse_cases),
            fork: override_or(DENDRA_PBT_FORK_ENV_KEY, default_fork, parse_switch),
        }
    }

    /// Number of cases to run per property.
    #[must_use]
    pub fn cases(&self) -> u32 {
        self.cases
    }

    /// Whether each case runs in a forked subprocess.
    #[must_use]
    pub fn fork(&self) -> bool {
        self.fork
    }
}

fn override_or<T, E>(key: &'static str, default: T, parse: fn(&str) -> Result<T, E>) -> T
where
    E: Display,
{
    let Ok(raw) = env::var(key) else {
        return default;
    };
    parse(raw.trim()).unwrap_or_else(|reason| {
        tracing::warn!(
            env = key,
            raw = %raw,
            reason = %reason,
            "ignoring invalid property-test override",
        );
        default
    })
}

fn parse_cases(raw: &str) -> Result<u32, String> {
    match raw.parse::<u32>() {
        Ok(0) => Err("cases must be positive".to_owned()),
        Ok(cases) => Ok(cases),
        Err(error) => Err(error.to_string()),
    }
}

fn parse_switch(raw: &str) -> Result<bool, &'static str> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err("expected true/false, 1/0, yes/no, or on/off"),
    }
}
