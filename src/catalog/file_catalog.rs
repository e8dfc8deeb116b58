use super::{CatalogError, Target, TargetCatalog};
use std::fs;
use std::path::PathBuf;

/// Reader for a JSON catalog file holding an array of target rows keyed by
/// the run-table column names (`fieldRA`, `fieldDec`, `observationStartLST`,
/// `slewTime`, `visitExposureTime`).
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
}

impl TargetCatalog for FileCatalog {
    fn read_all(&self) -> Result<Vec<Target>, CatalogError> {
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| CatalogError::NotFound(format!("{}: {e}", self.path.display())))?;
        let mut targets: Vec<Target> = serde_json::from_str(&raw)
            .map_err(|e| CatalogError::Malformed(format!("{}: {e}", self.path.display())))?;
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
    fn test_missing_file_is_not_found() {
        let catalog = FileCatalog::new("/nonexistent/run.json");
        match catalog.read_all() {
            Err(CatalogError::NotFound(msg)) => assert!(msg.contains("/nonexistent/run.json")),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_rows_get_sequence_indices() {
        let dir = std::env::temp_dir().join("visit_seq_catalog_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("run.json");
        fs::write(
            &path,
            r#"[
                {"fieldRA": 10.0, "fieldDec": -30.0, "observationStartLST": 15.0,
                 "slewTime": 5.0, "visitExposureTime": 30.0},
                {"fieldRA": 20.0, "fieldDec": -31.0, "observationStartLST": 25.0,
                 "slewTime": 4.0, "visitExposureTime": 30.0}
            ]"#,
        )
        .unwrap();
        let targets = FileCatalog::new(&path).read_all().unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].id, 0);
        assert_eq!(targets[1].id, 1);
        assert!(targets.iter().all(Target::is_well_formed));
    }
}
