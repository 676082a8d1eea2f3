//! Property-test run profile shared by the resolver and merge suites.
//!
//! CI raises the case count through `PROGTEST_CASES` and may widen the
//! generated instances through `GEOTAXSEL_PBT_MAX_LABELS`; forking is opt-in
//! via `GEOTAXSEL_PBT_FORK`.

use std::env;

/// Environment variable controlling proptest case counts.
pub const PROGTEST_CASES_ENV_KEY: &str = "PROGTEST_CASES";
/// Environment variable controlling proptest process forking.
pub const GEOTAXSEL_PBT_FORK_ENV_KEY: &str = "GEOTAXSEL_PBT_FORK";
/// Environment variable bounding the label count of generated instances.
pub const GEOTAXSEL_PBT_MAX_LABELS_ENV_KEY: &str = "GEOTAXSEL_PBT_MAX_LABELS";

/// Largest label count the brute-force oracles can enumerate in reasonable
/// time.
pub const MAX_ORACLE_LABELS: usize = 10;

/// Runtime profile for property-test execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProptestRunProfile {
    cases: u32,
    fork: bool,
    max_labels: usize,
}

impl ProptestRunProfile {
    /// Load a profile from environment variables with provided defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use geotaxsel_test_support::ci::property_test_profile::ProptestRunProfile;
    ///
    /// let profile = ProptestRunProfile::load(64, false);
    /// assert!(profile.cases() > 0);
    /// assert!(profile.max_labels() >= 1);
    /// ```
    #[must_use]
    pub fn load(default_cases: u32, default_fork: bool) -> Self {
        Self {
            cases: read_env_or_default(PROGTEST_CASES_ENV_KEY, default_cases, parse_cases),
            fork: read_env_or_default(GEOTAXSEL_PBT_FORK_ENV_KEY, default_fork, parse_bool),
            max_labels: read_env_or_default(GEOTAXSEL_PBT_MAX_LABELS_ENV_KEY, 6, parse_labels),
        }
    }

    /// Number of cases to run per property.
    #[must_use]
    pub fn cases(&self) -> u32 {
        self.cases
    }

    /// Whether to run proptest cases in forked subprocesses.
    #[must_use]
    pub fn fork(&self) -> bool {
        self.fork
    }

    /// Upper bound on the labels in a generated instance.
    #[must_use]
    pub fn max_labels(&self) -> usize {
        self.max_labels
    }
}

fn read_env_or_default<T>(
    key: &'static str,
    default: T,
    parser: fn(&str) -> Result<T, String>,
) -> T
where
    T: Copy,
{
    let Ok(raw) = env::var(key) else {
        return default;
    };
    parser(&raw).unwrap_or_else(|reason| {
        tracing::warn!(
            env = key,
            raw = %raw,
            reason = %reason,
            "ignoring invalid property-test override",
        );
        default
    })
}

fn parse_positive(raw: &str) -> Result<u64, String> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err("value must be > 0".to_owned()),
        Ok(value) => Ok(value),
        Err(error) => Err(format!("parse error: {error}")),
    }
}

fn parse_cases(raw: &str) -> Result<u32, String> {
    let value = parse_positive(raw)?;
    u32::try_from(value).map_err(|_| format!("{value} cases exceed u32"))
}

fn parse_labels(raw: &str) -> Result<usize, String> {
    let value = parse_positive(raw)?;
    match usize::try_from(value) {
        Ok(labels) if labels <= MAX_ORACLE_LABELS => Ok(labels),
        _ => Err(format!("at most {MAX_ORACLE_LABELS} labels are supported")),
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err("expected one of: true/false/1/0/yes/no/on/off".to_owned()),
    }
}
