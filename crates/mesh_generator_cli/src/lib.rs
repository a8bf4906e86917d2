#![forbid(unsafe_code)]

pub mod config;
pub mod imaging;
pub mod output;

use tracing_subscriber::EnvFilter;

pub use config::MeshConfig;
pub use imaging::{field_from_image, load_density_field, render_mesh, save_mesh_png};
pub use output::{prepare_save_dir, save_artifacts, write_positions, write_rdf, SnapshotWriter};

/// Installs a stdout subscriber filtered by `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .with_target(false)
        .try_init();
}
