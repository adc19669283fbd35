use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::ports::StoreError;

/// Reads `path`, treating a missing file as `T::default()`.
pub fn read_or_default<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if content.trim().is_empty() {
        return Ok(T::default());
    }

    serde_json::from_str(&content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Pretty-printed write through a sibling temp file and rename.
pub fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_error = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let content = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = PathBuf::from(temp_path);

    fs::write(&temp_path, content).map_err(io_error)?;
    fs::rename(&temp_path, path).map_err(io_error)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{read_or_default, write_atomic};
    use crate::domain::ports::StoreError;

    #[test]
    fn missing_file_reads_as_default() {
        let dir = tempfile::tempdir().expect("tempdir should be created");

        let value: BTreeMap<String, u32> =
            read_or_default(&dir.path().join("absent.json")).expect("read should succeed");

        assert!(value.is_empty());
    }

    #[test]
    fn writes_and_reads_back_creating_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("nested").join("store.json");
        let mut value = BTreeMap::new();
        value.insert("answer".to_string(), 42_u32);

        write_atomic(&path, &value).expect("write should succeed");
        let read: BTreeMap<String, u32> = read_or_default(&path).expect("read should succeed");

        assert_eq!(read, value);
        assert!(!dir.path().join("nested").join("store.json.tmp").exists());
    }

    #[test]
    fn reports_corrupt_json() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").expect("fixture should be written");

        let result: Result<BTreeMap<String, u32>, _> = read_or_default(&path);

        assert!(matches!(result, Err(StoreError::Json { .. })));
    }
}
