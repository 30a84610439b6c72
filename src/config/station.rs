//! Dispenser station run configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::{Client, SimError, Temperature};

/// One client entry: an id whose first character names the class, and a brew duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSpec {
    /// Client id such as `H1` or `C3`.
    pub id: String,
    /// Brew duration in time units.
    pub brew: u32,
}

impl ClientSpec {
    /// Class of the client, if the id names one.
    #[must_use]
    pub fn temperature(&self) -> Option<Temperature> {
        Temperature::from_client_id(&self.id)
    }
}

/// Clients of one station run, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationConfig {
    /// Client entries in input order.
    pub clients: Vec<ClientSpec>,
}

impl StationConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::with_capacity(self.clients.len());
        for spec in &self.clients {
            if spec.temperature().is_none() {
                return Err(format!("client id `{}` must start with H or C", spec.id));
            }
            if spec.brew == 0 {
                return Err(format!("client `{}` has a zero brew duration", spec.id));
            }
            if !seen.insert(spec.id.as_str()) {
                return Err(format!("client id `{}` appears more than once", spec.id));
            }
        }
        Ok(())
    }

    /// Parse the line-oriented input: a client count, then one `ID BREW` line per client.
    ///
    /// Blank lines are skipped and lines past the announced count are ignored.
    ///
    /// # Errors
    ///
    /// `SimError::Configuration` when the count is missing or not a number, fewer client
    /// lines than announced are present, a line is malformed, or the result fails
    /// [`StationConfig::validate`].
    pub fn from_input_str(input: &str) -> Result<Self, SimError> {
        let mut lines = input.lines().map(str::trim).filter(|line| !line.is_empty());

        let count = lines
            .next()
            .ok_or_else(|| SimError::Configuration("input is empty".into()))?
            .parse::<usize>()
            .map_err(|e| SimError::Configuration(format!("invalid client count: {e}")))?;

        let mut clients = Vec::new();
        for index in 0..count {
            let line = lines.next().ok_or_else(|| {
                SimError::Configuration(format!(
                    "expected {count} clients, found {index}"
                ))
            })?;
            let mut fields = line.split_whitespace();
            let (Some(id), Some(brew), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(SimError::Configuration(format!(
                    "expected `ID BREW`, found `{line}`"
                )));
            };
            let brew = brew.parse::<u32>().map_err(|e| {
                SimError::Configuration(format!("invalid brew time for {id}: {e}"))
            })?;
            clients.push(ClientSpec {
                id: id.to_owned(),
                brew,
            });
        }

        let cfg = Self { clients };
        cfg.validate().map_err(SimError::Configuration)?;
        Ok(cfg)
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build the clients, positioned by input order.
    ///
    /// # Errors
    ///
    /// `SimError::Configuration` if an id does not name a class.
    pub fn clients(&self) -> Result<Vec<Client>, SimError> {
        self.clients
            .iter()
            .enumerate()
            .map(|(position, spec)| Client::new(spec.id.clone(), spec.brew, position))
            .collect()
    }

    /// Number of clients of each class, as `(hot, cold)`.
    #[must_use]
    pub fn class_counts(&self) -> (usize, usize) {
        self.clients
            .iter()
            .fold((0, 0), |(hot, cold), spec| match spec.temperature() {
                Some(Temperature::Hot) => (hot + 1, cold),
                Some(Temperature::Cold) => (hot, cold + 1),
                None => (hot, cold),
            })
    }
}
