//! Intersection run configuration.

use serde::{Deserialize, Serialize};

use crate::core::{Cart, Location, Route, RouteCounts, SimError};

/// Carts per starting location and the number of crossings each cart performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossingConfig {
    /// Carts starting at CSR1.
    pub csr1: u32,
    /// Carts starting at CSR2.
    pub csr2: u32,
    /// Carts starting at ED1.
    pub ed1: u32,
    /// Carts starting at ED2.
    pub ed2: u32,
    /// Crossings per cart (`N`).
    pub repetitions: u32,
}

impl CrossingConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.cart_count() == 0 {
            return Err("at least one cart must be configured".into());
        }
        Ok(())
    }

    /// Parse the input line `CSR1=1, CSR2=2, ED1=1, ED2=1, N=2` and validate.
    ///
    /// Keys may appear in any order and are case-insensitive; each must appear once.
    ///
    /// # Errors
    ///
    /// `SimError::Configuration` on a missing, unknown or repeated key, a non-numeric
    /// value, or a configuration that fails [`CrossingConfig::validate`].
    pub fn from_input_str(input: &str) -> Result<Self, SimError> {
        let line = input
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| SimError::Configuration("input is empty".into()))?;

        let mut values: [Option<u32>; 5] = [None; 5];
        for field in line.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            let (key, value) = field.split_once('=').ok_or_else(|| {
                SimError::Configuration(format!("expected KEY=VALUE, found `{field}`"))
            })?;
            let key = key.trim().to_ascii_uppercase();
            let index = match key.as_str() {
                "CSR1" => 0,
                "CSR2" => 1,
                "ED1" => 2,
                "ED2" => 3,
                "N" => 4,
                _ => return Err(SimError::Configuration(format!("unknown key `{key}`"))),
            };
            let value = value.trim().parse::<u32>().map_err(|e| {
                SimError::Configuration(format!("invalid value for {key}: {e}"))
            })?;
            if values[index].replace(value).is_some() {
                return Err(SimError::Configuration(format!("{key} given more than once")));
            }
        }

        let take = |index: usize, key: &str| {
            values[index].ok_or_else(|| SimError::Configuration(format!("missing key {key}")))
        };
        let cfg = Self {
            csr1: take(0, "CSR1")?,
            csr2: take(1, "CSR2")?,
            ed1: take(2, "ED1")?,
            ed2: take(3, "ED2")?,
            repetitions: take(4, "N")?,
        };
        cfg.validate().map_err(SimError::Configuration)?;
        Ok(cfg)
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Carts starting at `location`.
    #[must_use]
    pub const fn count(&self, location: Location) -> u32 {
        match location {
            Location::Csr1 => self.csr1,
            Location::Csr2 => self.csr2,
            Location::Ed1 => self.ed1,
            Location::Ed2 => self.ed2,
        }
    }

    /// Total number of carts.
    #[must_use]
    pub fn cart_count(&self) -> u64 {
        Location::ALL
            .iter()
            .map(|location| u64::from(self.count(*location)))
            .sum()
    }

    /// Crossings the whole run performs.
    #[must_use]
    pub fn total_crossings(&self) -> u64 {
        self.cart_count() * u64::from(self.repetitions)
    }

    /// Carts per starting route.
    #[must_use]
    pub fn route_counts(&self) -> RouteCounts {
        Location::ALL
            .iter()
            .map(|location| (Route::from_origin(*location), self.count(*location)))
            .collect()
    }

    /// Build the carts, numbered from 1 in CSR1, CSR2, ED1, ED2 order.
    #[must_use]
    pub fn carts(&self) -> Vec<Cart> {
        let mut carts = Vec::new();
        let mut next_id = 1;
        for location in Location::ALL {
            for _ in 0..self.count(location) {
                carts.push(Cart::new(next_id, location, self.repetitions));
                next_id += 1;
            }
        }
        carts
    }
}
