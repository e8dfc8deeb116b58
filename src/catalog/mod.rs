//! Target catalog records and the reader boundary.

mod file_catalog;

pub use file_catalog::FileCatalog;

use strum_macros::Display;

/// One pre-planned observation, as recorded in the run catalog.
///
/// Angles are degrees; durations are seconds. The record is immutable once
/// read; the sequence index doubles as the target identifier.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Target {
    /// Sequence index within the catalog, assigned by the reader.
    #[serde(default)]
    pub id: usize,
    /// Catalog right ascension of the field (deg).
    #[serde(rename = "fieldRA")]
    pub ra_deg: f64,
    /// Catalog declination of the field (deg).
    #[serde(rename = "fieldDec")]
    pub dec_deg: f64,
    /// Local sidereal time at the planned observation start (deg).
    #[serde(rename = "observationStartLST")]
    pub observation_lst_deg: f64,
    /// Predicted slew duration to reach this field (s).
    #[serde(rename = "slewTime")]
    pub slew_time_s: f64,
    /// Predicted exposure duration for the visit (s).
    #[serde(rename = "visitExposureTime")]
    pub visit_exp_time_s: f64,
}

impl Target {
    /// A record is usable when every numeric field is finite and the
    /// predicted durations are non-negative.
    pub fn is_well_formed(&self) -> bool {
        [self.ra_deg, self.dec_deg, self.observation_lst_deg].iter().all(|v| v.is_finite())
            && self.slew_time_s >= 0.0
            && self.slew_time_s.is_finite()
            && self.visit_exp_time_s >= 0.0
            && self.visit_exp_time_s.is_finite()
    }
}

#[derive(Debug, Display)]
pub enum CatalogError {
    /// The catalog file is missing or unreadable.
    #[strum(to_string = "catalog not found: {0}")]
    NotFound(String),
    /// The catalog contents could not be parsed into target rows.
    #[strum(to_string = "malformed catalog: {0}")]
    Malformed(String),
}

impl std::error::Error for CatalogError {}

/// Abstract reader over a persisted target table.
pub trait TargetCatalog {
    /// Returns every target in catalog order, with sequence indices assigned.
    fn read_all(&self) -> Result<Vec<Target>, CatalogError>;
}

/// Catalog backed by an already-materialized target list, used by tests and
/// the built-in demo run.
pub struct InMemoryCatalog {
    targets: Vec<Target>,
}

impl InMemoryCatalog {
    pub fn new(targets: Vec<Target>) -> Self { Self { targets } }
}

impl TargetCatalog for InMemoryCatalog {
    fn read_all(&self) -> Result<Vec<Target>, CatalogError> {
        let mut targets = self.targets.clone();
        for (i, t) in targets.iter_mut().enumerate() {
            t.id = i;
        }
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_catalog_assigns_indices() {
        let row = Target {
            id: 99,
            ra_deg: 10.0,
            dec_deg: -5.0,
            observation_lst_deg: 40.0,
            slew_time_s: 3.0,
            visit_exp_time_s: 15.0,
        };
        let targets = InMemoryCatalog::new(vec![row.clone(), row]).read_all().unwrap();
        assert_eq!(targets[0].id, 0);
        assert_eq!(targets[1].id, 1);
    }

    #[test]
    fn test_well_formedness_rejects_negative_durations() {
        let mut t = Target {
            id: 0,
            ra_deg: 10.0,
            dec_deg: -5.0,
            observation_lst_deg: 40.0,
            slew_time_s: 3.0,
            visit_exp_time_s: 15.0,
        };
        assert!(t.is_well_formed());
        t.slew_time_s = -1.0;
        assert!(!t.is_well_formed());
    }
}
