use tracing::info;
use tracing_subscriber::EnvFilter;

use cloudless::api::{build_composites, executor_for, export_composites};
use cloudless::{CompositeKind, GeoTiffExporter, ManifestCatalog, PipelineConfig};

use super::args::CliArgs;
use super::errors::AppError;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(args: &CliArgs) -> Result<PipelineConfig, AppError> {
    let mut config = PipelineConfig::from_json_file(&args.config)?;
    if let Some(site) = &args.site {
        config.site = site.clone();
    }
    if let Some(rows) = args.tile_rows {
        if rows == 0 {
            return Err(AppError::ZeroTileRows { rows });
        }
        config.execution.tile_rows = rows;
    }
    if args.no_sidecar {
        config.export.write_sidecar = false;
    }
    Ok(config)
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        init_logging();
    }

    let config = load_config(&args)?;
    let kinds = if args.composites.is_empty() {
        CompositeKind::ALL.to_vec()
    } else {
        args.composites.clone()
    };

    info!("Site: {} ({} to {})", config.site, config.dates.start, config.dates.end);
    info!("Manifest: {:?}", args.manifest);
    info!("Output directory: {:?}", args.output_dir);

    let catalog = ManifestCatalog::open(&args.manifest).map_err(AppError::from)?;
    let exec = executor_for(&config).map_err(AppError::from)?;
    let composites = build_composites(&catalog, &config, &kinds, &exec).map_err(AppError::from)?;

    let exporter = GeoTiffExporter::new(&args.output_dir).with_sidecar(config.export.write_sidecar);
    let report =
        export_composites(&composites, &exporter, &config, args.continue_on_error).map_err(AppError::from)?;

    for (kind, path) in &report.exported {
        info!("{}: {:?}", kind, path);
    }
    if !report.failed.is_empty() {
        return Err(AppError::ExportsFailed {
            failed: report.failed.len(),
            total: composites.len(),
        }
        .into());
    }
    info!("Done: {} composites exported", report.exported.len());
    Ok(())
}
