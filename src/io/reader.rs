//! Raster input through GDAL.
use std::path::Path;

use gdal::{Dataset, Metadata};
use ndarray::Array2;
use tracing::debug;

use crate::core::raster::{Band, GeoTransform, Grid, Raster};
use crate::error::{Error, Result};

// EPSG code from the outermost WKT authority tag
fn parse_epsg(wkt: &str) -> Option<String> {
    const KEY: &str = "AUTHORITY[\"EPSG\",\"";
    let start = wkt.rfind(KEY)? + KEY.len();
    let end = wkt[start..].find('"')?;
    Some(format!("EPSG:{}", &wkt[start..start + end]))
}

fn read_data(dataset: &Dataset, index: usize, path: &Path) -> Result<Array2<f32>> {
    let count = dataset.raster_count() as usize;
    if index == 0 || index > count {
        return Err(Error::Catalog(format!(
            "{}: band {} out of range (1..={})",
            path.display(),
            index,
            count
        )));
    }
    let band = dataset.rasterband(index)?;
    let (size_x, size_y) = dataset.raster_size();
    let window = (size_x as usize, size_y as usize);
    let buf = band.read_as::<f32>((0, 0), window, window, None)?;
    let mut data = Array2::from_shape_vec((window.1, window.0), buf.data().to_vec()).map_err(Error::external)?;

    // integer inputs declare a sentinel; carry it as NaN
    if let Some(nodata) = band.no_data_value().filter(|v| !v.is_nan()) {
        let nodata = nodata as f32;
        data.mapv_inplace(|v| if v == nodata { f32::NAN } else { v });
    }
    Ok(data)
}

/// Reads band `index` (1-based) of a GDAL raster as `f32`. Integer samples
/// are converted as-is.
pub fn read_band(path: &Path, index: usize) -> Result<Array2<f32>> {
    let dataset = Dataset::open(path)?;
    let data = read_data(&dataset, index, path)?;
    debug!("Read {:?} band {} ({}x{})", path, index, data.nrows(), data.ncols());
    Ok(data)
}

/// Reads every band with its grid. Bands are named by their description,
/// which the exporter sets to the band name, or `band_<n>` without one.
pub fn read_raster(path: &Path) -> Result<Raster> {
    let dataset = Dataset::open(path)?;
    let (size_x, size_y) = dataset.raster_size();
    let gt = dataset.geo_transform()?;
    if gt[2] != 0.0 || gt[4] != 0.0 || gt[1] != -gt[5] {
        return Err(Error::Catalog(format!(
            "{}: rotated or non-square pixels are not supported ({:?})",
            path.display(),
            gt
        )));
    }
    let projection = dataset.projection();
    let crs = parse_epsg(&projection).unwrap_or(projection);
    let grid = Grid::new(
        size_y as usize,
        size_x as usize,
        GeoTransform {
            origin_x: gt[0],
            origin_y: gt[3],
            pixel_size: gt[1],
        },
        crs,
    );

    let bands = (1..=dataset.raster_count() as usize)
        .map(|i| -> Result<Band> {
            let name = dataset.rasterband(i)?.description().unwrap_or_default();
            let name = if name.is_empty() { format!("band_{}", i) } else { name };
            Ok(Band::new(name, read_data(&dataset, i, path)?))
        })
        .collect::<Result<Vec<_>>>()?;
    Raster::from_bands(grid, bands)
}
