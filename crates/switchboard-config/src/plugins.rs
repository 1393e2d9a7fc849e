use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Requested activation state for a plugin.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PluginState {
    /// The plugin may be activated.
    #[strum(serialize = "enabled", serialize = "on", serialize = "true")]
    Enabled,
    /// The plugin must never be activated.
    #[strum(serialize = "disabled", serialize = "off", serialize = "false")]
    Disabled,
}

impl PluginState {
    /// Returns `true` for [`PluginState::Enabled`].
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Errors produced when parsing [`PluginDirective`] values.
#[derive(Debug, Error)]
pub enum PluginDirectiveParseError {
    /// The state assignment (`=`) was missing from the directive.
    #[error("directive '{0}' is missing the state assignment '='")]
    MissingState(String),
    /// The plugin identifier was empty.
    #[error("directive '{0}' does not name a plugin")]
    MissingPlugin(String),
    /// The state could not be parsed.
    #[error("unsupported plugin state '{0}'")]
    InvalidState(String),
}

/// Enablement override for a single plugin, written `<plugin>=<state>`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PluginDirective {
    /// Plugin identifier such as `switchboard.rpclogging`.
    pub plugin: String,
    /// State applied to the plugin.
    pub state: PluginState,
}

impl PluginDirective {
    /// Creates a new directive.
    #[must_use]
    pub fn new(plugin: impl Into<String>, state: PluginState) -> Self {
        Self {
            plugin: plugin.into(),
            state,
        }
    }

    /// Returns `true` when this directive names `plugin`.
    #[must_use]
    pub fn matches(&self, plugin: &str) -> bool {
        normalise_key(&self.plugin) == normalise_key(plugin)
    }
}

impl fmt::Display for PluginDirective {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}={}", self.plugin, self.state)
    }
}

impl FromStr for PluginDirective {
    type Err = PluginDirectiveParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (plugin, state) = input
            .split_once('=')
            .ok_or_else(|| PluginDirectiveParseError::MissingState(input.to_owned()))?;
        if plugin.trim().is_empty() {
            return Err(PluginDirectiveParseError::MissingPlugin(input.to_owned()));
        }
        let parsed = PluginState::from_str(state.trim())
            .map_err(|_| PluginDirectiveParseError::InvalidState(state.to_owned()))?;
        Ok(Self::new(plugin.trim(), parsed))
    }
}

/// Deduplicates plugin directives in-place, keeping the last directive per plugin.
pub fn deduplicate_directives(directives: &mut Vec<PluginDirective>) {
    let mut merged: BTreeMap<String, PluginDirective> = BTreeMap::new();
    for mut directive in directives.drain(..) {
        let key = normalise_key(&directive.plugin);
        directive.plugin.clone_from(&key);
        merged.insert(key, directive);
    }
    *directives = merged.into_values().collect();
}

fn normalise_key(key: &str) -> String {
    key.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::enabled("switchboard.rpclogging=enabled", PluginState::Enabled)]
    #[case::off("acme.files=off", PluginState::Disabled)]
    #[case::mixed_case("acme.files=Disabled", PluginState::Disabled)]
    fn parses_directives(#[case] input: &str, #[case] expected: PluginState) {
        let directive: PluginDirective = input.parse().expect("parse directive");
        assert_eq!(directive.state, expected);
    }

    #[test]
    fn rejects_missing_assignment() {
        let error = "switchboard.rpclogging"
            .parse::<PluginDirective>()
            .expect_err("directive without '=' must fail");
        assert!(matches!(error, PluginDirectiveParseError::MissingState(_)));
    }

    #[test]
    fn rejects_unknown_state() {
        let error = "acme.files=maybe"
            .parse::<PluginDirective>()
            .expect_err("unknown state must fail");
        assert!(matches!(error, PluginDirectiveParseError::InvalidState(_)));
    }

    #[test]
    fn deduplicates_directives_preferring_latest() {
        let mut directives = vec![
            PluginDirective::new("acme.files", PluginState::Enabled),
            PluginDirective::new("ACME.files", PluginState::Disabled),
        ];
        deduplicate_directives(&mut directives);

        assert_eq!(directives.len(), 1);
        let directive = directives.first().expect("one directive");
        assert_eq!(directive.state, PluginState::Disabled);
        assert_eq!(directive.plugin, "acme.files");
    }

    #[test]
    fn display_round_trips() {
        let directive = PluginDirective::new("acme.files", PluginState::Enabled);
        let parsed: PluginDirective = directive.to_string().parse().expect("reparse");
        assert_eq!(parsed, directive);
    }
}
