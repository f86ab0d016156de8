use clap::Parser;
use std::path::PathBuf;

use cloudless::CompositeKind;

#[derive(Parser)]
#[command(name = "cloudless", version, about = "Cloud-free Sentinel-1/2 composites")]
pub struct CliArgs {
    /// Pipeline configuration (JSON)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Scene manifest (JSON) listing scenes and their band rasters
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// Directory for the exported GeoTIFFs
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Composite to build; repeat for several. Defaults to all three
    #[arg(long = "composite", value_enum)]
    pub composites: Vec<CompositeKind>,

    /// Override the site suffix of export names
    #[arg(long)]
    pub site: Option<String>,

    /// Rows per reduction tile (overrides the configuration)
    #[arg(long)]
    pub tile_rows: Option<usize>,

    /// Skip the JSON metadata sidecars
    #[arg(long, default_value_t = false)]
    pub no_sidecar: bool,

    /// Keep exporting the remaining composites after a failed export
    #[arg(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// Enable logging (RUST_LOG overrides the default debug level)
    #[arg(long, default_value_t = false)]
    pub log: bool,
}
