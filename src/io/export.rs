//! Composite export: region/scale/CRS handling, pixel ceiling, GeoTIFF
//! output with embedded metadata and an optional JSON sidecar.
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::params::ExportParams;
use crate::core::processing::composite::Composite;
use crate::core::raster::{Band, Bounds, GeoTransform, Grid, Raster};
use crate::error::{Error, Result};
use crate::io::writers::metadata::{export_metadata_fields, write_metadata_sidecar};
use crate::io::writers::tiff::write_geotiff_f32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Output name, also the file stem
    pub description: String,
    pub region: Bounds,
    /// Output pixel size in CRS units
    pub scale: f64,
    pub crs: String,
    pub max_pixels: u64,
}

impl ExportRequest {
    pub fn new(description: impl Into<String>, region: Bounds, params: &ExportParams) -> Self {
        Self {
            description: description.into(),
            region,
            scale: params.scale,
            crs: params.crs.clone(),
            max_pixels: params.max_pixels,
        }
    }

    /// (rows, cols) of the output grid covering `region` at `scale`
    pub fn output_shape(&self) -> (usize, usize) {
        let cells = |extent: f64| ((extent / self.scale) - 1e-9).ceil().max(0.0) as usize;
        (cells(self.region.height()), cells(self.region.width()))
    }

    pub fn pixel_count(&self) -> u64 {
        let (rows, cols) = self.output_shape();
        rows as u64 * cols as u64
    }

    pub fn output_grid(&self) -> Grid {
        let (rows, cols) = self.output_shape();
        Grid::new(
            rows,
            cols,
            GeoTransform {
                origin_x: self.region.min_x,
                origin_y: self.region.max_y,
                pixel_size: self.scale,
            },
            self.crs.clone(),
        )
    }

    /// Rejects requests the exporter cannot honour before any work is done
    pub fn check(&self, grid: &Grid) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::InvalidArgument {
                arg: "scale",
                value: self.scale.to_string(),
            });
        }
        if !self.crs.eq_ignore_ascii_case(&grid.crs) {
            return Err(Error::UnsupportedCrs {
                requested: self.crs.clone(),
                grid: grid.crs.clone(),
            });
        }
        let pixels = self.pixel_count();
        if pixels > self.max_pixels {
            return Err(Error::PixelCeiling {
                pixels,
                max_pixels: self.max_pixels,
            });
        }
        Ok(())
    }
}

/// Persists a composite under the supplied geometry/scale/CRS
pub trait Exporter {
    fn export(&self, composite: &Composite, request: &ExportRequest) -> Result<PathBuf>;
}

/// Nearest-neighbour source index per output cell along one axis
fn axis_lookup(count: usize, out_start: f64, out_step: f64, src_start: f64, src_step: f64, src_len: usize) -> Vec<Option<usize>> {
    (0..count)
        .map(|i| {
            let centre = out_start + (i as f64 + 0.5) * out_step;
            let pos = ((centre - src_start) / src_step).floor();
            (pos >= 0.0 && pos < src_len as f64).then_some(pos as usize)
        })
        .collect()
}

/// Samples `raster` onto `target` by nearest neighbour; cells outside the
/// source grid are no-data.
pub fn resample_to_grid(raster: &Raster, target: &Grid) -> Result<Raster> {
    let src = &raster.grid;
    if src.shape() == target.shape() && src.transform == target.transform {
        return Ok(raster.clone());
    }
    let st = &src.transform;
    let tt = &target.transform;
    let cols = axis_lookup(target.cols, tt.origin_x, tt.pixel_size, st.origin_x, st.pixel_size, src.cols);
    // rows run southwards: flip the y axis
    let rows = axis_lookup(target.rows, -tt.origin_y, tt.pixel_size, -st.origin_y, st.pixel_size, src.rows);

    let bands = raster
        .bands()
        .iter()
        .map(|band| {
            let data = Array2::from_shape_fn(target.shape(), |(r, c)| match (rows[r], cols[c]) {
                (Some(sr), Some(sc)) => band.data[[sr, sc]],
                _ => f32::NAN,
            });
            Band::new(band.name.clone(), data)
        })
        .collect();
    Raster::from_bands(target.clone(), bands)
}

/// Writes `<output_dir>/<description>.tif`, plus `<description>.json` when
/// `write_sidecar` is set.
#[derive(Debug, Clone)]
pub struct GeoTiffExporter {
    pub output_dir: PathBuf,
    pub write_sidecar: bool,
}

impl GeoTiffExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            write_sidecar: true,
        }
    }

    pub fn with_sidecar(mut self, write_sidecar: bool) -> Self {
        self.write_sidecar = write_sidecar;
        self
    }

    pub fn output_path(&self, description: &str) -> PathBuf {
        self.output_dir.join(Path::new(description).with_extension("tif"))
    }
}

impl Exporter for GeoTiffExporter {
    fn export(&self, composite: &Composite, request: &ExportRequest) -> Result<PathBuf> {
        request.check(composite.grid())?;
        let target = request.output_grid();
        debug!(
            "Exporting {} as {}: {}x{} at {} {}",
            composite.name(),
            request.description,
            target.rows,
            target.cols,
            request.scale,
            request.crs
        );

        let raster = resample_to_grid(composite.raster(), &target)?;
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_path(&request.description);

        let metadata = export_metadata_fields(composite, &request.description, &target);
        write_geotiff_f32(&path, &target, raster.bands(), &metadata)?;
        if self.write_sidecar {
            write_metadata_sidecar(&path, &metadata, composite, &target)?;
        }

        info!("Exported {} ({} bands) to {:?}", request.description, raster.band_count(), path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::raster::Geometry;
    use crate::core::test_support::grid;
    use crate::io::reader::read_raster;

    fn composite() -> Composite {
        let g = grid(4, 4);
        let data = Array2::from_shape_fn((4, 4), |(r, c)| (r * 4 + c) as f32);
        let raster = Raster::from_bands(g.clone(), vec![Band::new("v_p50", data)]).unwrap();
        Composite::assemble("test", &[raster], &Geometry::rectangle(g.bounds())).unwrap()
    }

    fn request(scale: f64) -> ExportRequest {
        ExportRequest::new("test_site", grid(4, 4).bounds(), &ExportParams { scale, ..ExportParams::default() })
    }

    #[test]
    fn test_pixel_ceiling() {
        let mut req = request(20.0);
        assert_eq!(req.pixel_count(), 16);
        req.max_pixels = 15;
        assert!(matches!(
            req.check(composite().grid()),
            Err(Error::PixelCeiling { pixels: 16, max_pixels: 15 })
        ));
    }

    #[test]
    fn test_crs_mismatch_rejected() {
        let mut req = request(20.0);
        req.crs = "EPSG:4326".to_string();
        assert!(matches!(req.check(composite().grid()), Err(Error::UnsupportedCrs { .. })));
    }

    #[test]
    fn test_resample_nearest() {
        let c = composite();
        let coarse = resample_to_grid(c.raster(), &request(40.0).output_grid()).unwrap();
        assert_eq!(coarse.grid.shape(), (2, 2));
        // 40 m cell centres fall in source pixels (1,1), (1,3), (3,1), (3,3)
        assert_eq!(coarse.value("v_p50", 0, 0), Some(5.0));
        assert_eq!(coarse.value("v_p50", 1, 1), Some(15.0));

        let wider = ExportRequest::new(
            "w",
            Bounds {
                min_x: -20.0,
                min_y: 0.0,
                max_x: 80.0,
                max_y: 80.0,
            },
            &ExportParams::default(),
        );
        let padded = resample_to_grid(c.raster(), &wider.output_grid()).unwrap();
        assert_eq!(padded.grid.shape(), (4, 5));
        assert_eq!(padded.value("v_p50", 0, 0), None);
        assert_eq!(padded.value("v_p50", 0, 1), Some(0.0));
    }

    #[test]
    fn test_export_writes_tiff_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = GeoTiffExporter::new(dir.path());
        let path = exporter.export(&composite(), &request(20.0)).unwrap();
        assert_eq!(path, dir.path().join("test_site.tif"));

        let written = read_raster(&path).unwrap();
        assert_eq!(written.band_names(), vec!["v_p50"]);
        assert_eq!(written.grid, request(20.0).output_grid());
        assert_eq!(written.value("v_p50", 3, 2), Some(14.0));

        let sidecar: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path.with_extension("json")).unwrap()).unwrap();
        assert_eq!(sidecar["composite"], "test");
        assert_eq!(sidecar["crs"], "EPSG:25831");
        assert_eq!(sidecar["bands"][0], "v_p50");
        assert_eq!(sidecar["geotransform"][1], 20.0);
    }
}
