use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

const LMR_SIZE: usize = 256;

fn empty_lmr_table() -> Vec<[i32; LMR_SIZE]> {
    vec![[0; LMR_SIZE]; LMR_SIZE]
}

/// Every search tunable. Missing JSON fields fall back to the defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParameters {
    // Aspiration windows
    pub min_asp_depth: i32,
    pub initial_asp_window: i32,
    pub max_asp_window: i32,
    pub max_asp_reduction: i32,

    // IIR
    pub min_iir_depth: i32,

    // RFP
    pub max_rfp_depth: i32,
    pub rfp_margin: i32,

    // NMP
    pub min_nmp_depth: i32,
    pub nmp_base: i32,
    pub nmp_depth_scale: i32,
    pub nmp_eval_scale: i32,
    pub nmp_max_eval_reduction: i32,

    // Futility
    pub max_fp_depth: i32,
    pub fp_margin: i32,
    pub fp_scale: i32,

    // SEE pruning (thresholds per ply of depth)
    pub max_see_depth: i32,
    pub quiet_see_threshold: i32,
    pub noisy_see_threshold: i32,

    // LMR
    pub min_lmr_depth: i32,
    pub lmr_base: f64,
    pub lmr_divisor: f64,

    // Singular extensions
    pub min_singular_depth: i32,

    pub move_overhead_ms: u64,

    #[serde(skip, default = "empty_lmr_table")]
    lmr_table: Vec<[i32; LMR_SIZE]>,
}

impl Default for SearchParameters {
    fn default() -> Self {
        let mut params = Self {
            min_asp_depth: 6,
            initial_asp_window: 10,
            max_asp_window: 500,
            max_asp_reduction: 3,

            min_iir_depth: 4,

            max_rfp_depth: 8,
            rfp_margin: 75,

            min_nmp_depth: 3,
            nmp_base: 3,
            nmp_depth_scale: 3,
            nmp_eval_scale: 200,
            nmp_max_eval_reduction: 3,

            max_fp_depth: 8,
            fp_margin: 250,
            fp_scale: 60,

            max_see_depth: 8,
            quiet_see_threshold: -50,
            noisy_see_threshold: -90,

            min_lmr_depth: 3,
            lmr_base: 0.77,
            lmr_divisor: 2.36,

            min_singular_depth: 8,

            move_overhead_ms: 10,

            lmr_table: empty_lmr_table(),
        };
        params.recalculate_tables();
        params
    }
}

impl SearchParameters {
    pub fn recalculate_tables(&mut self) {
        if self.lmr_table.len() != LMR_SIZE {
            self.lmr_table = empty_lmr_table();
        }
        for d in 1..LMR_SIZE {
            for m in 1..LMR_SIZE {
                let lmr = self.lmr_base + (d as f64).ln() * (m as f64).ln() / self.lmr_divisor;
                self.lmr_table[d][m] = lmr.max(0.0) as i32;
            }
        }
    }

    /// Base late-move reduction for `depth` after `moves` moves.
    #[inline(always)]
    pub fn lmr(&self, depth: i32, moves: i32) -> i32 {
        let d = depth.clamp(0, LMR_SIZE as i32 - 1) as usize;
        let m = moves.clamp(0, LMR_SIZE as i32 - 1) as usize;
        self.lmr_table[d][m]
    }

    /// Rejects values the search cannot run with.
    pub fn validate(&self) -> Result<(), SearchError> {
        let invalid = |what: &str| Err(SearchError::InvalidParameter(what.to_string()));

        if self.min_lmr_depth < 2 {
            return invalid("min_lmr_depth must be at least 2");
        }
        if self.nmp_eval_scale <= 0 {
            return invalid("nmp_eval_scale must be positive");
        }
        if self.nmp_depth_scale <= 0 {
            return invalid("nmp_depth_scale must be positive");
        }
        if self.nmp_max_eval_reduction < 0 {
            return invalid("nmp_max_eval_reduction must not be negative");
        }
        if self.initial_asp_window < 1 {
            return invalid("initial_asp_window must be positive");
        }
        if self.max_asp_reduction < 0 {
            return invalid("max_asp_reduction must not be negative");
        }
        if self.lmr_divisor.is_nan() || self.lmr_divisor <= 0.0 || !self.lmr_base.is_finite() {
            return invalid("lmr_divisor must be positive and lmr_base finite");
        }
        Ok(())
    }

    pub fn save_to_json(&self, path: impl AsRef<Path>) -> Result<(), SearchError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    pub fn load_from_json(path: impl AsRef<Path>) -> Result<Self, SearchError> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let mut params: SearchParameters = serde_json::from_reader(reader)?;
        params.validate()?;
        params.recalculate_tables();
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lmr_table_formula() {
        let params = SearchParameters::default();
        assert_eq!(params.lmr(1, 1), 0);
        assert_eq!(params.lmr(0, 10), 0);
        // 0.77 + ln(10) * ln(10) / 2.36 = 3.01
        assert_eq!(params.lmr(10, 10), 3);
        assert_eq!(params.lmr(1000, 1000), params.lmr(255, 255));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params: SearchParameters = serde_json::from_str(r#"{ "rfp_margin": 90 }"#).expect("valid json");
        assert_eq!(params.rfp_margin, 90);
        assert_eq!(params.min_asp_depth, 6);
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("aether_params_{}.json", std::process::id()));
        let mut params = SearchParameters::default();
        params.min_asp_depth = 9;
        params.lmr_divisor = 3.0;
        params.save_to_json(&path).expect("save");

        let loaded = SearchParameters::load_from_json(&path).expect("load");
        assert_eq!(loaded.min_asp_depth, 9);
        assert_eq!(loaded.lmr(10, 10), (0.77 + 10f64.ln() * 10f64.ln() / 3.0) as i32);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(SearchParameters::default().validate().is_ok());
    }

    #[test]
    fn test_unusable_values_are_rejected() {
        let cases: [fn(&mut SearchParameters); 5] = [
            |params| params.min_lmr_depth = 1,
            |params| params.nmp_eval_scale = 0,
            |params| params.nmp_depth_scale = 0,
            |params| params.nmp_max_eval_reduction = -1,
            |params| params.initial_asp_window = 0,
        ];
        for set in cases {
            let mut params = SearchParameters::default();
            set(&mut params);
            assert!(matches!(params.validate(), Err(SearchError::InvalidParameter(_))));
        }
    }

    #[test]
    fn test_invalid_json_values_fail_to_load() {
        let path = std::env::temp_dir().join(format!("aether_bad_params_{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "nmp_eval_scale": 0 }"#).expect("write");
        let err = SearchParameters::load_from_json(&path).unwrap_err();
        assert!(matches!(err, SearchError::InvalidParameter(_)));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = SearchParameters::load_from_json("/nonexistent/aether/params.json").unwrap_err();
        assert!(matches!(err, SearchError::Io(_)));
    }
}
