//! Shared types and enums used across cloudless.
//! Includes `Sensor`, `Polarization`, `OrbitPass`, `SpectralIndex`,
//! the reducer variant `Statistic`, and `CompositeKind`.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensor {
    /// Multispectral imager (Sentinel-2 MSI)
    Optical,
    /// C-band SAR (Sentinel-1 GRD)
    Radar,
}

impl std::fmt::Display for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sensor::Optical => write!(f, "optical"),
            Sensor::Radar => write!(f, "radar"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Polarization {
    Vv,
    Vh,
    Hh,
    Hv,
}

impl Polarization {
    /// Band name used for this polarization in radar scenes
    pub fn band_name(&self) -> &'static str {
        match self {
            Polarization::Vv => "VV",
            Polarization::Vh => "VH",
            Polarization::Hh => "HH",
            Polarization::Hv => "HV",
        }
    }
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.band_name())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrbitPass {
    Ascending,
    Descending,
}

impl std::fmt::Display for OrbitPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrbitPass::Ascending => write!(f, "ASCENDING"),
            OrbitPass::Descending => write!(f, "DESCENDING"),
        }
    }
}

/// Normalized difference indices derived from calibrated reflectance
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SpectralIndex {
    /// Vegetation: (NIR - red) / (NIR + red)
    Ndvi,
    /// Water: (green - NIR) / (green + NIR)
    Ndwi,
    /// Built-up: (SWIR1 - NIR) / (SWIR1 + NIR)
    Ndbi,
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 3] = [SpectralIndex::Ndbi, SpectralIndex::Ndvi, SpectralIndex::Ndwi];

    /// Output band name
    pub fn name(&self) -> &'static str {
        match self {
            SpectralIndex::Ndvi => "NDVI",
            SpectralIndex::Ndwi => "NDWI",
            SpectralIndex::Ndbi => "NDBI",
        }
    }

    /// (A, B) in (A - B) / (A + B). NIR is the narrow NIR band `red4` (B8A).
    pub fn bands(&self) -> (&'static str, &'static str) {
        match self {
            SpectralIndex::Ndvi => ("red4", "red"),
            SpectralIndex::Ndwi => ("green", "red4"),
            SpectralIndex::Ndbi => ("swir1", "red4"),
        }
    }
}

impl std::fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Temporal reducer applied per pixel over the valid observations
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    /// Linearly interpolated percentiles, each in [0, 100]
    Percentile(Vec<f64>),
    /// Population standard deviation (divisor N)
    StdDev,
}

impl Statistic {
    pub fn percentile(p: f64) -> Self {
        Statistic::Percentile(vec![p])
    }

    /// Names of the output bands produced for `band`, in output order.
    pub fn output_names(&self, band: &str) -> Vec<String> {
        match self {
            Statistic::Percentile(ps) => ps
                .iter()
                .map(|&p| format!("{}_p{}", band, format_percentile(p)))
                .collect(),
            Statistic::StdDev => vec![format!("{}_stdDev", band)],
        }
    }

    /// Number of output bands
    pub fn width(&self) -> usize {
        match self {
            Statistic::Percentile(ps) => ps.len(),
            Statistic::StdDev => 1,
        }
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statistic::Percentile(ps) => {
                let list: Vec<String> = ps.iter().map(|&p| format_percentile(p)).collect();
                write!(f, "Percentile([{}])", list.join(", "))
            }
            Statistic::StdDev => write!(f, "StdDev"),
        }
    }
}

// 90.0 -> "90", 2.5 -> "2.5"
fn format_percentile(p: f64) -> String {
    if p.fract() == 0.0 {
        format!("{}", p as i64)
    } else {
        format!("{}", p)
    }
}

/// The three composites of the output contract
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeKind {
    /// NDBI/NDVI/NDWI at the 90th and 50th percentile
    Indices,
    /// VV/VH percentiles and standard deviations
    Radar,
    /// Ten reflectance bands at the 50th percentile
    Reflectance,
}

impl CompositeKind {
    pub const ALL: [CompositeKind; 3] = [CompositeKind::Indices, CompositeKind::Radar, CompositeKind::Reflectance];

    /// Export description prefix; the site name is appended on export
    pub fn export_name(&self) -> &'static str {
        match self {
            CompositeKind::Indices => "NDBVWI_90_50",
            CompositeKind::Radar => "S1_VV_VH_95_50_5_SDs",
            CompositeKind::Reflectance => "S2_perc50",
        }
    }

    /// Sensor whose scenes feed this composite
    pub fn sensor(&self) -> Sensor {
        match self {
            CompositeKind::Radar => Sensor::Radar,
            CompositeKind::Indices | CompositeKind::Reflectance => Sensor::Optical,
        }
    }
}

impl std::fmt::Display for CompositeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompositeKind::Indices => write!(f, "Indices"),
            CompositeKind::Radar => write!(f, "Radar"),
            CompositeKind::Reflectance => write!(f, "Reflectance"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_names() {
        let stat = Statistic::Percentile(vec![95.0, 50.0, 5.0]);
        assert_eq!(stat.output_names("VV"), vec!["VV_p95", "VV_p50", "VV_p5"]);
        assert_eq!(Statistic::StdDev.output_names("VH"), vec!["VH_stdDev"]);
        assert_eq!(Statistic::percentile(2.5).output_names("NDVI"), vec!["NDVI_p2.5"]);
    }

    #[test]
    fn test_statistic_json_shape() {
        let stat: Statistic = serde_json::from_str(r#"{"percentile":[90,50]}"#).unwrap();
        assert_eq!(stat, Statistic::Percentile(vec![90.0, 50.0]));
        let stat: Statistic = serde_json::from_str(r#""std_dev""#).unwrap();
        assert_eq!(stat, Statistic::StdDev);
    }
}
