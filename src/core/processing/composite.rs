use ndarray::{Array2, Zip};
use tracing::debug;

use crate::core::raster::{Band, Geometry, Grid, Mask, Raster};
use crate::error::{Error, Result};

/// Named multi-band statistical raster clipped to a study geometry
#[derive(Debug, Clone)]
pub struct Composite {
    name: String,
    raster: Raster,
    region: Geometry,
}

impl Composite {
    /// Stacks `parts` in order and clips the result to `region`.
    ///
    /// Band names must be unique across all parts; a duplicate is a
    /// configuration error, never silently renamed.
    pub fn assemble(name: impl Into<String>, parts: &[Raster], region: &Geometry) -> Result<Self> {
        let name = name.into();
        let first = parts
            .first()
            .ok_or_else(|| Error::EmptyCollection(format!("composite `{}` has no parts", name)))?;
        for part in &parts[1..] {
            first.grid.check_same(&part.grid)?;
        }

        let bands: Vec<Band> = parts.iter().flat_map(|p| p.bands().iter().cloned()).collect();
        let stacked = Raster::from_bands(first.grid.clone(), bands)?;
        let raster = clip(&stacked, region)?;
        debug!("Assembled {} with bands {:?}", name, raster.band_names());

        Ok(Self {
            name,
            raster,
            region: region.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn grid(&self) -> &Grid {
        &self.raster.grid
    }

    pub fn region(&self) -> &Geometry {
        &self.region
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.raster.band_names()
    }

    /// New composite holding only `names`, in that order
    pub fn select(&self, names: &[&str]) -> Result<Composite> {
        let bands = names
            .iter()
            .map(|&n| {
                self.raster.band(n).cloned().ok_or_else(|| Error::MissingBand {
                    scene: self.name.clone(),
                    band: n.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Composite {
            name: self.name.clone(),
            raster: Raster::from_bands(self.raster.grid.clone(), bands)?,
            region: self.region.clone(),
        })
    }
}

/// Pixels whose centre lies inside `region`
pub fn region_mask(grid: &Grid, region: &Geometry) -> Mask {
    Array2::from_shape_fn(grid.shape(), |(r, c)| {
        let (x, y) = grid.pixel_center(r, c);
        region.contains(x, y)
    })
}

/// Sets every pixel outside `region` to no-data
pub fn clip(raster: &Raster, region: &Geometry) -> Result<Raster> {
    let inside = region_mask(&raster.grid, region);
    let bands = raster
        .bands()
        .iter()
        .map(|band| {
            let data = Zip::from(band.data.as_ref())
                .and(&inside)
                .par_map_collect(|&v, &keep| if keep { v } else { f32::NAN });
            Band::new(band.name.clone(), data)
        })
        .collect();
    Raster::from_bands(raster.grid.clone(), bands)
}
