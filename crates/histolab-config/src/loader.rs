//! Config document loading.

use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::schema::Config;

impl Config {
    /// Parses and validates a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ConfigError;
    use crate::samples::sample_config;
    use crate::schema::*;

    #[test]
    fn json_round_trip_preserves_validation() {
        let config = sample_config();
        let text = serde_json::to_string(&config).unwrap();
        let back = Config::from_json(&text).unwrap();
        assert_eq!(back.num_reps, 1);
        assert_eq!(back.arrivals.cancer.rates.len(), 168);
        assert_eq!(back.runner_times.speed, 1.0);
    }

    #[test]
    fn speed_defaults_to_one() {
        let mut value = serde_json::to_value(sample_config()).unwrap();
        value["runner_times"]
            .as_object_mut()
            .unwrap()
            .remove("speed");
        let config: Config = serde_json::from_value(value).unwrap();
        assert_eq!(config.runner_times.speed, 1.0);
    }

    #[test]
    fn kind_strings_match_the_workbook_vocabulary() {
        let text = serde_json::to_string(&sample_config()).unwrap();
        assert!(text.contains("\"type\":\"Constant\""));
        assert!(text.contains("\"type\":\"staff\""));
        let pert = DistributionInfo {
            kind: DistKind::Pert,
            low: 1.0,
            mode: 2.0,
            high: 3.0,
            time_unit: "h".into(),
        };
        assert!(serde_json::to_string(&pert).unwrap().contains("\"PERT\""));
    }

    #[test]
    fn short_rate_vector_is_rejected_with_path() {
        let mut config = sample_config();
        config.arrivals.cancer.rates.truncate(167);
        let err = config.validate().unwrap_err();
        match err {
            ConfigError::Field { path, .. } => assert_eq!(path, "arrivals.cancer.rates"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let mut config = sample_config();
        config.global_vars.prob_prebook = 1.5;
        let err = config.validate().unwrap_err();
        match err {
            ConfigError::Field { path, .. } => assert_eq!(path, "global_vars.prob_prebook"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn non_monotone_duration_triple_is_rejected() {
        let mut config = sample_config();
        config.task_durations.decalc = DistributionInfo {
            kind: DistKind::Triangular,
            low: 5.0,
            mode: 2.0,
            high: 8.0,
            time_unit: "hours".into(),
        };
        let err = config.validate().unwrap_err();
        match err {
            ConfigError::Field { path, .. } => assert_eq!(path, "task_durations.decalc"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn time_unit_accepts_any_smh_spelling() {
        let mut config = sample_config();
        config.task_durations.decalc.time_unit = "hxar".into();
        config.validate().unwrap();
        assert_eq!(config.task_durations.decalc.unit_factor(), 1.0);
        config.task_durations.decalc.time_unit = "weeks".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut config = sample_config();
        config.batch_sizes.bone_station = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Field { path, .. } if path == "batch_sizes.bone_station"
        ));
    }

    #[test]
    fn bad_schedule_shapes_are_rejected() {
        let mut config = sample_config();
        config.resources.bms.schedule.day_flags.pop();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Field { path, .. } if path == "resources.bms.schedule.day_flags"
        ));
        let mut config = sample_config();
        config.resources.bone_station.schedule.allocation.push(2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_horizon_and_reps_are_rejected() {
        let mut config = sample_config();
        config.sim_hours = 0.0;
        assert!(config.validate().is_err());
        let mut config = sample_config();
        config.num_reps = 0;
        assert!(config.validate().is_err());
    }
}
