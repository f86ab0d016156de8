//! Float32 GeoTIFF output through GDAL: one dataset with a band per
//! composite band, `NaN` declared as no-data.
use std::collections::BTreeMap;
use std::path::Path;

use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{DriverManager, Metadata};
use tracing::debug;

use crate::core::raster::{Band, Grid};
use crate::error::{Error, Result};

/// Spatial reference for a CRS identifier such as `EPSG:25831`
fn spatial_ref(crs: &str) -> Result<SpatialRef> {
    SpatialRef::from_definition(crs).map_err(|_| Error::UnsupportedCrs {
        requested: crs.to_string(),
        grid: crs.to_string(),
    })
}

/// Writes `bands` (all on `grid`) as one N-band float32 GTiff. Band
/// descriptions carry the band names; `metadata` goes to the default domain.
pub fn write_geotiff_f32(
    path: &Path,
    grid: &Grid,
    bands: &[Band],
    metadata: &BTreeMap<String, String>,
) -> Result<()> {
    if bands.is_empty() {
        return Err(Error::InvalidArgument {
            arg: "bands",
            value: "0".to_string(),
        });
    }
    for band in bands {
        grid.check_shape(&band.data)?;
    }
    let srs = spatial_ref(&grid.crs)?;
    let (rows, cols) = grid.shape();

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut ds = driver.create_with_band_type::<f32, _>(path, cols, rows, bands.len())?;
    ds.set_geo_transform(&grid.transform.to_gdal())?;
    ds.set_spatial_ref(&srs)?;
    for (key, value) in metadata {
        ds.set_metadata_item(key, value, "")?;
    }

    for (i, band) in bands.iter().enumerate() {
        let mut handle = ds.rasterband(i + 1)?;
        handle.set_no_data_value(Some(f64::NAN))?;
        handle.set_description(&band.name)?;
        let mut buf = Buffer::new((cols, rows), band.data.iter().copied().collect());
        handle.write((0, 0), (cols, rows), &mut buf)?;
    }
    debug!("Wrote {} bands ({}x{}, {}) to {:?}", bands.len(), rows, cols, grid.crs, path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::raster::GeoTransform;
    use crate::core::test_support::grid;
    use crate::io::reader::{read_band, read_raster};
    use gdal::Dataset;
    use ndarray::Array2;

    #[test]
    fn test_bands_keep_names_values_and_nodata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two.tif");
        let g = grid(2, 3);
        let a = Array2::from_shape_vec((2, 3), vec![1.0, 2.0, 3.0, 4.0, f32::NAN, 6.0]).unwrap();
        let b = Array2::from_elem((2, 3), -0.5);
        write_geotiff_f32(
            &path,
            &g,
            &[Band::new("a_p50", a), Band::new("b_stdDev", b)],
            &BTreeMap::new(),
        )
        .unwrap();

        let raster = read_raster(&path).unwrap();
        assert_eq!(raster.band_names(), vec!["a_p50", "b_stdDev"]);
        assert_eq!(raster.grid, g);
        assert_eq!(raster.value("a_p50", 1, 2), Some(6.0));
        assert_eq!(raster.value("a_p50", 1, 1), None);

        let second = read_band(&path, 2).unwrap();
        assert_eq!(second.dim(), (2, 3));
        assert_eq!(second[[0, 0]], -0.5);
        assert!(read_band(&path, 3).is_err());
    }

    #[test]
    fn test_geographic_crs_writes_one_multiband_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ed50.tif");
        let g = Grid::new(
            2,
            2,
            GeoTransform {
                origin_x: 4.5,
                origin_y: 53.5,
                pixel_size: 0.001,
            },
            "EPSG:4230",
        );
        let bands: Vec<Band> = ["NDBI_p90", "NDVI_p90", "NDWI_p90"]
            .iter()
            .enumerate()
            .map(|(i, name)| Band::new(*name, Array2::from_elem((2, 2), i as f32)))
            .collect();
        let mut metadata = BTreeMap::new();
        metadata.insert("COMPOSITE".to_string(), "NDBVWI_90_50".to_string());
        write_geotiff_f32(&path, &g, &bands, &metadata).unwrap();

        let ds = Dataset::open(&path).unwrap();
        assert_eq!(ds.raster_count() as usize, 3);
        let names: Vec<String> = (1..=3)
            .map(|i| ds.rasterband(i).unwrap().description().unwrap())
            .collect();
        assert_eq!(names, vec!["NDBI_p90", "NDVI_p90", "NDWI_p90"]);
        assert!(ds.rasterband(1).unwrap().no_data_value().unwrap().is_nan());
        // ED50 is geographic, never a projected CRS
        let wkt = ds.projection();
        assert!(wkt.starts_with("GEOGCS"), "{}", wkt);
        assert!(!wkt.contains("PROJCS"), "{}", wkt);
        assert_eq!(
            ds.metadata_item("COMPOSITE", "").as_deref(),
            Some("NDBVWI_90_50")
        );

        let raster = read_raster(&path).unwrap();
        assert_eq!(raster.grid.crs, "EPSG:4230");
        assert_eq!(raster.value("NDWI_p90", 1, 1), Some(2.0));
    }

    #[test]
    fn test_unknown_crs_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = grid(1, 1);
        g.crs = "not a crs".to_string();
        let band = Band::new("v", Array2::zeros((1, 1)));
        let err = write_geotiff_f32(&dir.path().join("x.tif"), &g, &[band], &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedCrs { .. }));
    }
}
