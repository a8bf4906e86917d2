use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use mesh_generator::prelude::{EventSink, MeshGenerator};
use mesh_generator_cli::{
    init_tracing, load_density_field, prepare_save_dir, save_artifacts, MeshConfig,
    SnapshotWriter,
};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "mesh-generator", version)]
#[command(about = "Generate a particle mesh following the density of an image", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    config: PathBuf,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // help and version requests are not failures
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };
    init_tracing();

    match run(&args.config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(config_path: &Path) -> Result<()> {
    let started = Instant::now();
    let config = MeshConfig::load(config_path)?;
    prepare_save_dir(&config)?;

    let field = Arc::new(load_density_field(&config.img_path, &config.params)?);
    let (w, h) = field.size();
    info!(
        "Density image {} loaded: {}x{} pixels, {:.1}% admissible.",
        config.img_path.display(),
        w,
        h,
        100.0 * field.admissible_fraction()
    );

    let generator = MeshGenerator::try_new(&config.params, *field.domain(), field.clone())?;
    let mut snapshots = config
        .debug
        .then(|| SnapshotWriter::new(config.snapshot_dir()));
    let mut silent = ();
    let sink: &mut dyn EventSink = match snapshots.as_mut() {
        Some(writer) => writer,
        None => &mut silent,
    };
    let mesh = generator.run_with_events(sink)?;
    if let Some(writer) = snapshots {
        let written = writer.finish()?;
        info!("{} snapshots written.", written);
    }
    info!(
        "Geometry computed in {:.3} seconds.",
        started.elapsed().as_secs_f64()
    );

    save_artifacts(&config, &mesh, &field)?;
    info!("Complete ({:.3} s).", started.elapsed().as_secs_f64());
    Ok(())
}
