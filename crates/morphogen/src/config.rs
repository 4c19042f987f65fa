//! Run configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `morphogen.ron` in the working directory (if exists), or the file
//!    passed with `--config`
//! 3. Environment variables prefixed with `MORPHOGEN_`
//!
//! Example environment variable: `MORPHOGEN_EVOLUTION__POPULATION_SIZE=50`

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use morphogen_core::{Hyperparams, KinematicSettings};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};

/// File looked up in the working directory when no `--config` is given
pub const CONFIG_FILE: &str = "morphogen.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MorphogenConfig {
    #[serde(default)]
    pub evolution: Hyperparams,

    #[serde(default)]
    pub simulation: KinematicSettings,

    #[serde(default)]
    pub paths: PathsConfig,
}

/// Where DNA files, URDF documents and snapshots live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Folder for `<species>.dna` and `<species>.urdf`
    pub robots: PathBuf,
    /// Folder for `generation-<id>.json` snapshots
    pub generations: PathBuf,
    /// Species whose DNA file collects each generation's elite
    pub elite_species: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            robots: PathBuf::from("robots"),
            generations: PathBuf::from("generations"),
            elite_species: "elite".to_string(),
        }
    }
}

impl MorphogenConfig {
    /// Load with `morphogen.ron` from the working directory as the file layer
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load with `path` as the file layer. An explicit path must exist.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .set_default("paths.robots", "robots")?
            .set_default("paths.generations", "generations")?
            .set_default("paths.elite_species", "elite")?
            .set_default("evolution.population_size", 10_i64)?
            .set_default("evolution.genesis_population_size", 2_i64)?
            .set_default("evolution.simulation_steps", 2400_i64)?
            .set_default("evolution.expression_threshold", 0.5)?;

        // Layer 2: Config file
        let builder = match path {
            Some(path) => builder.add_source(File::from(path).format(FileFormat::Ron).required(true)),
            None => builder.add_source(
                File::with_name(CONFIG_FILE.trim_end_matches(".ron"))
                    .format(FileFormat::Ron)
                    .required(false),
            ),
        };

        // Layer 3: Environment variables (MORPHOGEN_EVOLUTION__SEED, etc.)
        let builder = builder.add_source(
            Environment::with_prefix("MORPHOGEN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;
        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if let Err(reason) = config.evolution.validate() {
            bail!("Invalid evolution settings: {}", reason);
        }
        Ok(config)
    }

    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, PrettyConfig::default())
            .context("Failed to serialize configuration")
    }

    /// Write this configuration to `path`, refusing to replace an existing
    /// file unless `force` is set
    pub fn write_to(&self, path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!("{} already exists, pass --force to replace it", path.display());
        }
        fs::write(path, self.to_ron()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Wrote configuration to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = MorphogenConfig::default();
        assert_eq!(config.evolution.population_size, 10);
        assert_eq!(config.evolution.genesis_population_size, 2);
        assert_eq!(config.paths.robots, PathBuf::from("robots"));
        assert_eq!(config.paths.elite_species, "elite");
        assert_eq!(config.simulation, KinematicSettings::default());
    }

    #[test]
    fn test_load_config_with_defaults() {
        // No morphogen.ron next to the crate manifest
        let config = MorphogenConfig::load().expect("Failed to load config");
        assert_eq!(config.evolution.simulation_steps, 2400);
        assert_eq!(config.paths.generations, PathBuf::from("generations"));
    }

    #[test]
    fn test_partial_file_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.ron");
        fs::write(
            &path,
            r#"(
                evolution: (population_size: 25, seed: Some(7)),
                paths: (robots: "bots"),
            )"#,
        )
        .unwrap();

        let config = MorphogenConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.evolution.population_size, 25);
        assert_eq!(config.evolution.seed, Some(7));
        assert_eq!(config.evolution.gene_count, 3);
        assert_eq!(config.paths.robots, PathBuf::from("bots"));
        assert_eq!(config.paths.generations, PathBuf::from("generations"));
    }

    #[test]
    fn test_written_default_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        MorphogenConfig::default().write_to(&path, false).unwrap();

        let loaded = MorphogenConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.evolution, Hyperparams::default());
        assert_eq!(loaded.paths, PathsConfig::default());
    }

    #[test]
    fn test_write_refuses_to_clobber() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "()").unwrap();

        assert!(MorphogenConfig::default().write_to(&path, false).is_err());
        assert!(MorphogenConfig::default().write_to(&path, true).is_ok());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.ron");
        assert!(MorphogenConfig::load_from(Some(&path)).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.ron");
        fs::write(&path, "(evolution: (population_size: 0))").unwrap();
        assert!(MorphogenConfig::load_from(Some(&path)).is_err());
    }
}
