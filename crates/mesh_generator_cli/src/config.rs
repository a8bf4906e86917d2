//! Launcher configuration loaded from a TOML file.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use mesh_generator::prelude::Parameters;
use serde::{Deserialize, Serialize};

fn default_image_resolution() -> u32 {
    6000
}

/// Configuration record of one launcher run.
///
/// `save_path` and `img_path` are mandatory; every other key falls back to its default. The
/// library parameters are flattened into the same table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Directory receiving all artifacts.
    #[serde(alias = "savePath")]
    pub save_path: PathBuf,
    /// Density image.
    #[serde(alias = "imgPath")]
    pub img_path: PathBuf,
    /// Also render the mesh over the density image.
    #[serde(default, alias = "saveImage")]
    pub save_image: bool,
    /// Pixels along the longer side of the rendered image.
    #[serde(default = "default_image_resolution", alias = "imageResolution")]
    pub image_resolution: u32,
    /// Write intermediate snapshots.
    #[serde(default)]
    pub debug: bool,
    #[serde(flatten)]
    pub params: Parameters,
}

impl MeshConfig {
    /// Reads, parses and validates a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("invalid config file '{}'", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: MeshConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.save_path.as_os_str().is_empty() {
            bail!("save_path must not be empty");
        }
        if self.img_path.as_os_str().is_empty() {
            bail!("img_path must not be empty");
        }
        if self.image_resolution == 0 {
            bail!("image_resolution must be > 0");
        }
        self.params.validate()?;
        Ok(())
    }

    /// The effective configuration with defaults filled in.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.save_path.join("snapshots")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_takes_defaults() {
        let cfg = MeshConfig::from_toml_str(
            r#"
            save_path = "out"
            img_path = "density.png"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.save_path, PathBuf::from("out"));
        assert!(!cfg.save_image);
        assert_eq!(cfg.image_resolution, 6000);
        assert_eq!(cfg.params, Parameters::default());
    }

    #[test]
    fn legacy_keys_are_accepted() {
        let cfg = MeshConfig::from_toml_str(
            r#"
            savePath = "out"
            imgPath = "density.png"
            saveImage = true
            imageResolution = 800
            nParticles = 5000
            multiplicationFactor = 4
            threshold = 12.0
            redistributionFrequency = 7
            nRedistributedPoints = 50
            openmp_threads = 8
            testSaveFreq = 3
            X = [0.0, 2.0]
            Y = [-1.0, 1.0]
            periodic_x = true
            "#,
        )
        .unwrap();
        assert!(cfg.save_image);
        assert_eq!(cfg.image_resolution, 800);
        let p = &cfg.params;
        assert_eq!(p.n_particles, 5000);
        assert_eq!(p.multiplication_factor, 4);
        assert_eq!(p.threshold, 12.0);
        assert_eq!(p.redistribution_passes, 7);
        assert_eq!(p.redistributed_points, 50);
        assert_eq!(p.threads, 8);
        assert_eq!(p.snapshot_interval, 3);
        assert_eq!(p.x_bounds, Some([0.0, 2.0]));
        assert_eq!(p.y_bounds, Some([-1.0, 1.0]));
        assert!(p.periodic_x && !p.periodic_y);
    }

    #[test]
    fn missing_mandatory_keys_are_rejected() {
        assert!(MeshConfig::from_toml_str(r#"img_path = "a.png""#).is_err());
        assert!(MeshConfig::from_toml_str(r#"save_path = "out""#).is_err());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let err = MeshConfig::from_toml_str(
            r#"
            save_path = "out"
            img_path = "a.png"
            n_particles = 0
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("n_particles"));
    }

    #[test]
    fn effective_configuration_round_trips() {
        let cfg = MeshConfig::from_toml_str(
            r#"
            save_path = "out"
            img_path = "a.png"
            n_particles = 64
            seed = 9
            "#,
        )
        .unwrap();
        let text = cfg.to_toml_string().unwrap();
        assert!(text.contains("n_particles = 64"));
        assert!(text.contains("image_resolution = 6000"));
        let back = MeshConfig::from_toml_str(&text).unwrap();
        assert_eq!(back.params, cfg.params);
        assert_eq!(back.save_path, cfg.save_path);
    }

    #[test]
    fn unreadable_file_reports_path() {
        let err = MeshConfig::load("/nonexistent/mesh.toml").unwrap_err();
        assert!(format!("{err}").contains("/nonexistent/mesh.toml"));
    }
}
