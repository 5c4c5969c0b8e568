use core_config::{ConfigError, FromEnv, env_parse};

/// Tuning for the search fallback chain and method limits.
///
/// The relaxation schedule is explicit configuration: attempt `k` (1-based) runs at
/// `primary_threshold - k * relaxation_step`, stopping at `max_relaxations` or at 0.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Similarity threshold of the primary vector tier, in [0, 1]
    pub primary_threshold: f64,
    /// Threshold decrement per relaxed attempt, > 0
    pub relaxation_step: f64,
    pub max_relaxations: u32,
    /// A vector tier that returns fewer results than this triggers the next tier
    pub min_results: usize,
    /// Weight of the similarity (or overlap, or text rank) component of a score
    pub vector_weight: f64,
    /// Weight of the featured-listing boost
    pub featured_weight: f64,
    pub default_max_results: usize,
    /// Upper bound accepted for `maxResults`
    pub max_results_cap: usize,
    /// Candidates fetched for the lexical tier before ranking
    pub lexical_candidates: usize,
    pub default_radius_km: f64,
    pub max_radius_km: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            primary_threshold: 0.3,
            relaxation_step: 0.1,
            max_relaxations: 2,
            min_results: 1,
            vector_weight: 0.8,
            featured_weight: 0.2,
            default_max_results: 10,
            max_results_cap: 50,
            lexical_candidates: 100,
            default_radius_km: 50.0,
            max_radius_km: 500.0,
        }
    }
}

impl SearchConfig {
    /// Thresholds for the relaxed attempts, strictly decreasing and never below 0.
    pub fn relaxed_thresholds(&self, primary: f64) -> Vec<f64> {
        let mut thresholds = Vec::new();
        let mut previous = primary;

        for attempt in 1..=self.max_relaxations {
            let next = (primary - attempt as f64 * self.relaxation_step).max(0.0);
            if next >= previous {
                break;
            }
            thresholds.push(next);
            previous = next;
        }

        thresholds
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(key: &str, details: &str) -> ConfigError {
            ConfigError::Invalid {
                key: key.to_string(),
                details: details.to_string(),
            }
        }

        if !(0.0..=1.0).contains(&self.primary_threshold) {
            return Err(invalid("SEARCH_PRIMARY_THRESHOLD", "must be within [0, 1]"));
        }
        if !(self.relaxation_step > 0.0 && self.relaxation_step <= 1.0) {
            return Err(invalid("SEARCH_RELAXATION_STEP", "must be within (0, 1]"));
        }
        if self.vector_weight < 0.0 || self.featured_weight < 0.0 {
            return Err(invalid("SEARCH_VECTOR_WEIGHT", "weights must not be negative"));
        }
        if self.max_results_cap == 0 || self.default_max_results == 0 {
            return Err(invalid("SEARCH_MAX_RESULTS_CAP", "must be greater than zero"));
        }
        if self.lexical_candidates == 0 {
            return Err(invalid("SEARCH_LEXICAL_CANDIDATES", "must be greater than zero"));
        }
        if self.default_max_results > self.max_results_cap {
            return Err(invalid(
                "SEARCH_DEFAULT_MAX_RESULTS",
                "must not exceed SEARCH_MAX_RESULTS_CAP",
            ));
        }
        if !(self.default_radius_km > 0.0 && self.default_radius_km <= self.max_radius_km) {
            return Err(invalid(
                "SEARCH_DEFAULT_RADIUS_KM",
                "must be positive and not exceed SEARCH_MAX_RADIUS_KM",
            ));
        }
        Ok(())
    }
}

impl FromEnv for SearchConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let d = Self::default();
        let config = Self {
            primary_threshold: env_parse("SEARCH_PRIMARY_THRESHOLD", d.primary_threshold)?,
            relaxation_step: env_parse("SEARCH_RELAXATION_STEP", d.relaxation_step)?,
            max_relaxations: env_parse("SEARCH_MAX_RELAXATIONS", d.max_relaxations)?,
            min_results: env_parse("SEARCH_MIN_RESULTS", d.min_results)?,
            vector_weight: env_parse("SEARCH_VECTOR_WEIGHT", d.vector_weight)?,
            featured_weight: env_parse("SEARCH_FEATURED_WEIGHT", d.featured_weight)?,
            default_max_results: env_parse("SEARCH_DEFAULT_MAX_RESULTS", d.default_max_results)?,
            max_results_cap: env_parse("SEARCH_MAX_RESULTS_CAP", d.max_results_cap)?,
            lexical_candidates: env_parse("SEARCH_LEXICAL_CANDIDATES", d.lexical_candidates)?,
            default_radius_km: env_parse("SEARCH_DEFAULT_RADIUS_KM", d.default_radius_km)?,
            max_radius_km: env_parse("SEARCH_MAX_RADIUS_KM", d.max_radius_km)?,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_relaxation_schedule() {
        let thresholds = SearchConfig::default().relaxed_thresholds(0.3);
        assert_eq!(thresholds.len(), 2);
        assert!((thresholds[0] - 0.2).abs() < 1e-9);
        assert!((thresholds[1] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_schedule_stops_at_zero() {
        let config = SearchConfig {
            max_relaxations: 5,
            ..SearchConfig::default()
        };
        let thresholds = config.relaxed_thresholds(0.15);
        assert_eq!(thresholds.len(), 2);
        assert_eq!(thresholds[1], 0.0);
        assert!(thresholds.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_no_relaxation_from_zero() {
        assert!(SearchConfig::default().relaxed_thresholds(0.0).is_empty());
    }

    #[test]
    fn test_from_env_defaults() {
        temp_env::with_vars(
            [
                ("SEARCH_PRIMARY_THRESHOLD", None::<&str>),
                ("SEARCH_RELAXATION_STEP", None),
                ("SEARCH_MAX_RESULTS_CAP", None),
            ],
            || {
                assert_eq!(SearchConfig::from_env().unwrap(), SearchConfig::default());
            },
        );
    }

    #[test]
    fn test_from_env_overrides() {
        temp_env::with_vars(
            [
                ("SEARCH_PRIMARY_THRESHOLD", Some("0.5")),
                ("SEARCH_MAX_RELAXATIONS", Some("3")),
                ("SEARCH_DEFAULT_RADIUS_KM", Some("25")),
            ],
            || {
                let config = SearchConfig::from_env().unwrap();
                assert_eq!(config.primary_threshold, 0.5);
                assert_eq!(config.max_relaxations, 3);
                assert_eq!(config.default_radius_km, 25.0);
            },
        );
    }

    #[test]
    fn test_from_env_rejects_out_of_range_threshold() {
        temp_env::with_var("SEARCH_PRIMARY_THRESHOLD", Some("1.5"), || {
            let err = SearchConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("SEARCH_PRIMARY_THRESHOLD"));
        });
    }

    #[test]
    fn test_rejects_zero_step() {
        let config = SearchConfig {
            relaxation_step: 0.0,
            ..SearchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env_rejects_zero_lexical_candidates() {
        temp_env::with_var("SEARCH_LEXICAL_CANDIDATES", Some("0"), || {
            let err = SearchConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("SEARCH_LEXICAL_CANDIDATES"));
        });
    }
}
