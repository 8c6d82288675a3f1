use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

/// Returns the path if it is absolute, otherwise transform it into an
/// absolute path by appending it to the current working directory.
pub fn abs_or_relative(path: &Path) -> std::io::Result<PathBuf> {
    abs_or_relative_to(&std::env::current_dir()?, path)
}

pub fn abs_or_relative_to(dir: &Path, path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    Ok(dir.join(path))
}

/// Deserialize data from a toml file.
pub fn import_toml<T: DeserializeOwned>(path: &Path) -> std::io::Result<T> {
    let string = std::fs::read_to_string(path)?;
    toml::from_str(&string).map_err(std::io::Error::other)
}

/// Serialize data to a toml file, creating its parent directory if needed.
pub fn export_toml<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let string = toml::to_string_pretty(value).map_err(std::io::Error::other)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Run {
        name: String,
        steps: usize,
        cells: [usize; 3],
    }

    #[test]
    fn relative_paths() {
        let dir = Path::new("/tmp/runs");
        assert_eq!(
            abs_or_relative_to(dir, Path::new("wave.toml")).unwrap(),
            PathBuf::from("/tmp/runs/wave.toml")
        );
        assert_eq!(
            abs_or_relative_to(dir, Path::new("/etc/wave.toml")).unwrap(),
            PathBuf::from("/etc/wave.toml")
        );
    }

    #[test]
    fn toml_files() {
        let dir = std::env::temp_dir().join(format!("strata_app_{}", std::process::id()));
        let path = dir.join("runs").join("wave.toml");
        let run = Run {
            name: "wave".into(),
            steps: 12,
            cells: [32, 4, 4],
        };

        export_toml(&path, &run).unwrap();
        let loaded: Run = import_toml(&path).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
        assert_eq!(loaded, run);

        let missing = import_toml::<Run>(&std::env::temp_dir().join("strata_app_missing.toml"));
        assert!(missing.is_err());
    }
}
