use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("`{field}` must be {requirement}, got {value}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },

    #[error("Invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Budget and scheduling knobs of a [`FrustumQuerier`](super::FrustumQuerier).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Number of nodes a completed query should settle around.
    pub desired_node_count: usize,
    /// Factor the resolution threshold is multiplied or divided by per adaptation.
    pub resolution_step: f64,
    /// Smallest feature size per unit of distance the threshold may reach.
    pub min_feature_size: f64,
    /// A query holding more than `desired_node_count * budget_tolerance` nodes
    /// (counting requests in flight) aborts and retries coarser.
    pub budget_tolerance: f64,
    /// Extra slack on top of `resolution_step` before the threshold adapts.
    pub adapt_hysteresis: f64,
    /// Nodes processed before yielding back to the executor.
    pub yield_batch_size: usize,
    pub cache_capacity: usize,
    /// Only serve nodes already in the cache, never fetch.
    pub cache_only: bool,
    /// Self-induced re-triggers allowed between two external queries.
    pub max_chained_retriggers: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            desired_node_count: 1000,
            resolution_step: 1.2,
            min_feature_size: 1e-4,
            budget_tolerance: 1.5,
            adapt_hysteresis: 1.1,
            yield_batch_size: 50,
            cache_capacity: 10_000,
            cache_only: false,
            max_chained_retriggers: 64,
        }
    }
}

impl QueryConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: QueryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn check(
            ok: bool,
            field: &'static str,
            requirement: &'static str,
            value: f64,
        ) -> Result<(), ConfigError> {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::OutOfRange {
                    field,
                    requirement,
                    value,
                })
            }
        }

        check(
            self.desired_node_count > 0,
            "desired_node_count",
            "positive",
            self.desired_node_count as f64,
        )?;
        check(
            self.resolution_step.is_finite() && self.resolution_step > 1.0,
            "resolution_step",
            "greater than 1",
            self.resolution_step,
        )?;
        check(
            self.min_feature_size.is_finite() && self.min_feature_size >= 0.0,
            "min_feature_size",
            "finite and non-negative",
            self.min_feature_size,
        )?;
        check(
            self.budget_tolerance.is_finite() && self.budget_tolerance > 1.0,
            "budget_tolerance",
            "greater than 1",
            self.budget_tolerance,
        )?;
        check(
            self.adapt_hysteresis.is_finite() && self.adapt_hysteresis >= 1.0,
            "adapt_hysteresis",
            "at least 1",
            self.adapt_hysteresis,
        )?;
        check(
            self.yield_batch_size > 0,
            "yield_batch_size",
            "positive",
            self.yield_batch_size as f64,
        )?;
        check(
            self.cache_capacity > 0,
            "cache_capacity",
            "positive",
            self.cache_capacity as f64,
        )?;
        Ok(())
    }

    pub(crate) fn cache_capacity(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.cache_capacity).ok_or(ConfigError::OutOfRange {
            field: "cache_capacity",
            requirement: "positive",
            value: 0.0,
        })
    }

    /// Node count above which the next query coarsens.
    pub fn upper_adapt_bound(&self) -> f64 {
        self.desired_node_count as f64 * self.resolution_step * self.adapt_hysteresis
    }

    /// Node count below which the next query refines.
    pub fn lower_adapt_bound(&self) -> f64 {
        self.desired_node_count as f64 / self.resolution_step / self.adapt_hysteresis
    }

    /// Node count (including requests in flight) at which a query aborts.
    pub fn abort_bound(&self) -> f64 {
        self.desired_node_count as f64 * self.budget_tolerance
    }

    /// Completed queries below this count schedule a finer re-query.
    pub fn refine_bound(&self) -> f64 {
        self.desired_node_count as f64 / self.budget_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        QueryConfig::default().validate().unwrap();
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config =
            QueryConfig::from_json(r#"{ "desired_node_count": 250, "cache_only": true }"#).unwrap();
        assert_eq!(config.desired_node_count, 250);
        assert!(config.cache_only);
        assert_eq!(config.resolution_step, 1.2);
        assert_eq!(config.yield_batch_size, 50);
    }

    #[test]
    fn rejects_invariant_violations() {
        for json in [
            r#"{ "resolution_step": 1.0 }"#,
            r#"{ "cache_capacity": 0 }"#,
            r#"{ "budget_tolerance": 0.5 }"#,
            r#"{ "desired_node_count": 0 }"#,
            r#"{ "yield_batch_size": 0 }"#,
        ] {
            assert!(
                matches!(QueryConfig::from_json(json), Err(ConfigError::OutOfRange { .. })),
                "{json}"
            );
        }
        assert!(matches!(
            QueryConfig::from_json("{ nope"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn bounds_follow_the_budget() {
        let config = QueryConfig {
            desired_node_count: 1200,
            ..QueryConfig::default()
        };
        assert!((config.upper_adapt_bound() - 1584.0).abs() < 1e-9);
        assert!((config.lower_adapt_bound() - 1200.0 / 1.32).abs() < 1e-9);
        assert_eq!(config.abort_bound(), 1800.0);
        assert_eq!(config.refine_bound(), 800.0);
    }
}
