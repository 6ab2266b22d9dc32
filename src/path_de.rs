use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::LoadError;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, LoadError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(path_error)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LoadError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(path_error)
}

/// Read a file and deserialize it, keeping both the file and the JSON path in errors.
pub fn from_file_with_path<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    from_slice_with_path(&bytes)
}

fn path_error(err: serde_path_to_error::Error<serde_json::Error>) -> LoadError {
    let path = err.path().to_string();
    LoadError::Json { path, message: err.into_inner().to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Outer {
        inner: Vec<Inner>,
    }

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Inner {
        n: u32,
    }

    #[test]
    fn error_carries_json_path() {
        let err = from_str_with_path::<Outer>(r#"{"inner":[{"n":1},{"n":"x"}]}"#).unwrap_err();
        match err {
            LoadError::Json { path, .. } => assert_eq!(path, "inner[1].n"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
