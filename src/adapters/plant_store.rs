use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapters::json_file::{read_or_default, write_atomic};
use crate::domain::models::PlantConfig;
use crate::domain::numeric::{extract_rows, find_text};
use crate::domain::ports::{PlantConfigStore, StoreError};

pub const PLANTS_FILE_NAME: &str = "plants.json";

const LISTING_ENVELOPE_KEYS: &[&str] = &["plants", "list"];
const LISTING_ID_KEYS: &[&str] = &["plant_id", "id"];
const LISTING_NAME_KEYS: &[&str] = &["plant_name", "name"];

#[derive(Debug, Default, Serialize, Deserialize)]
struct PlantsFile {
    #[serde(default)]
    plants: Vec<PlantConfig>,
}

/// `{"plants": [...]}` document on disk.
#[derive(Debug, Clone)]
pub struct JsonPlantStore {
    path: PathBuf,
}

impl JsonPlantStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(PLANTS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PlantConfigStore for JsonPlantStore {
    fn load(&self) -> Result<Vec<PlantConfig>, StoreError> {
        let file: PlantsFile = read_or_default(&self.path)?;
        Ok(file.plants)
    }

    fn save(&self, plants: &[PlantConfig]) -> Result<(), StoreError> {
        write_atomic(
            &self.path,
            &PlantsFile {
                plants: plants.to_vec(),
            },
        )
    }
}

/// Plant entries for a fresh `plants.json` from a monitoring plant listing.
///
/// Only the first plant starts active; the rest must be switched on by hand.
pub fn plants_from_listing(listing: &Value) -> Vec<PlantConfig> {
    extract_rows(listing, LISTING_ENVELOPE_KEYS)
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|row| {
            let plant_id = find_text(row, LISTING_ID_KEYS)?;
            let name = find_text(row, LISTING_NAME_KEYS)
                .map(|name| name.split_whitespace().collect::<Vec<_>>().join(" "))
                .unwrap_or_default();
            Some(PlantConfig {
                plant_id,
                plant_name: name.clone(),
                client_name: name,
                system_size_kwp: None,
                active: false,
                timezone: None,
            })
        })
        .enumerate()
        .map(|(index, plant)| PlantConfig {
            active: index == 0,
            ..plant
        })
        .collect()
}
