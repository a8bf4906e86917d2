//! Artifact writers rooted at the configured save path.
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glam::DVec2;
use mesh_generator::prelude::{
    EventSink, ImageDensityField, Mesh, MeshEvent, MeshEventKind, RadialDistribution,
};
use tracing::{debug, info};

use crate::config::MeshConfig;
use crate::imaging::save_mesh_png;

pub const MESH_FILE: &str = "mesh.txt";
pub const MESH_IMAGE_FILE: &str = "mesh.png";
pub const RDF_FILE: &str = "radial_distribution.txt";
pub const CONFIG_FILE: &str = "configuration.toml";

/// One `x y` line per particle.
pub fn write_positions<W: Write>(mut w: W, positions: &[DVec2]) -> io::Result<()> {
    for p in positions {
        writeln!(w, "{} {}", p.x, p.y)?;
    }
    w.flush()
}

/// `r g` lines with the peak recorded in a header comment.
pub fn write_rdf<W: Write>(mut w: W, rdf: &RadialDistribution) -> io::Result<()> {
    writeln!(w, "# r g(r)")?;
    if let Some((r, g)) = rdf.peak() {
        writeln!(w, "# peak r = {r} g = {g}")?;
    }
    for (r, g) in rdf.iter() {
        writeln!(w, "{r} {g}")?;
    }
    w.flush()
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("failed to create '{}'", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Creates the save directory if needed.
pub fn prepare_save_dir(config: &MeshConfig) -> Result<()> {
    if !config.save_path.is_dir() {
        fs::create_dir_all(&config.save_path).with_context(|| {
            format!("failed to create directory '{}'", config.save_path.display())
        })?;
        info!("Directory created: {}", config.save_path.display());
    }
    if config.debug {
        fs::create_dir_all(config.snapshot_dir())?;
    }
    Ok(())
}

/// Writes every artifact of a finished run.
pub fn save_artifacts(config: &MeshConfig, mesh: &Mesh, field: &ImageDensityField) -> Result<()> {
    let dir = &config.save_path;

    let path = dir.join(MESH_FILE);
    write_positions(create(&path)?, &mesh.positions)
        .with_context(|| format!("failed to write '{}'", path.display()))?;

    let path = dir.join(RDF_FILE);
    write_rdf(create(&path)?, &mesh.rdf)
        .with_context(|| format!("failed to write '{}'", path.display()))?;

    let path = dir.join(CONFIG_FILE);
    fs::write(&path, config.to_toml_string()?)
        .with_context(|| format!("failed to write '{}'", path.display()))?;

    if config.save_image {
        save_mesh_png(
            field,
            &mesh.positions,
            config.image_resolution,
            &dir.join(MESH_IMAGE_FILE),
        )?;
    }
    info!("Artifacts written to {}", dir.display());
    Ok(())
}

/// Event sink writing every snapshot to `<dir>/<stage>_<step>.txt`.
///
/// Sinks cannot fail, so the first write error is kept and reported by [`SnapshotWriter::finish`].
pub struct SnapshotWriter {
    dir: PathBuf,
    written: usize,
    error: Option<anyhow::Error>,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: 0,
            error: None,
        }
    }

    pub fn file_name(stage: &str, step: usize) -> String {
        format!("{stage}_{step:05}.txt")
    }

    /// Number of snapshot files written, or the first write error.
    pub fn finish(self) -> Result<usize> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.written),
        }
    }

    fn write(&self, stage: &str, step: usize, positions: &[DVec2]) -> Result<()> {
        let path = self.dir.join(Self::file_name(stage, step));
        write_positions(create(&path)?, positions)
            .with_context(|| format!("failed to write '{}'", path.display()))
    }
}

impl EventSink for SnapshotWriter {
    fn send(&mut self, event: MeshEvent) {
        let MeshEvent::Snapshot {
            stage,
            step,
            positions,
        } = event
        else {
            return;
        };
        if self.error.is_some() {
            return;
        }
        match self.write(stage.label(), step, &positions) {
            Ok(()) => {
                self.written += 1;
                debug!("Snapshot {} step {} written.", stage.label(), step);
            }
            Err(err) => self.error = Some(err),
        }
    }

    fn wants(&self, kind: MeshEventKind) -> bool {
        kind == MeshEventKind::Snapshot
    }
}
