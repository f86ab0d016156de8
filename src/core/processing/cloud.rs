use serde::{Deserialize, Serialize};

use crate::core::raster::{Mask, Scene};
use crate::error::{Error, Result};

/// QA bitmask decoding parameters (Sentinel-2 `QA60`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudMaskParams {
    pub qa_band: String,
    /// Opaque cloud flag
    pub cloud_bit: u32,
    /// Cirrus flag
    pub cirrus_bit: u32,
}

impl Default for CloudMaskParams {
    fn default() -> Self {
        Self {
            qa_band: "QA60".to_string(),
            cloud_bit: 10,
            cirrus_bit: 11,
        }
    }
}

impl CloudMaskParams {
    fn validate(&self) -> Result<()> {
        for (arg, bit) in [("cloud_bit", self.cloud_bit), ("cirrus_bit", self.cirrus_bit)] {
            if bit >= u32::BITS {
                return Err(Error::InvalidArgument {
                    arg,
                    value: bit.to_string(),
                });
            }
        }
        Ok(())
    }

    fn bits(&self) -> u32 {
        (1u32 << self.cloud_bit) | (1u32 << self.cirrus_bit)
    }
}

/// Cloudy iff either flag bit is set; clear requires both zero.
#[inline]
pub fn is_cloud(qa: u32, params: &CloudMaskParams) -> bool {
    qa & params.bits() != 0
}

/// Decodes the QA band of `scene` into a cloud mask (`true` = cloudy).
///
/// No-data QA pixels are reported cloudy so they drop out of the valid mask.
/// Negative or fractional QA values are a malformed bitmask.
pub fn decode_cloud_mask(scene: &Scene, params: &CloudMaskParams) -> Result<Mask> {
    params.validate()?;
    let qa = scene.band_data(&params.qa_band)?;

    if let Some(&bad) = qa
        .iter()
        .find(|v| v.is_finite() && (**v < 0.0 || v.fract() != 0.0 || **v > u32::MAX as f32))
    {
        return Err(Error::MalformedBitmask {
            scene: scene.id.clone(),
            band: params.qa_band.clone(),
            value: bad,
        });
    }

    Ok(qa.mapv(|v| !v.is_finite() || is_cloud(v as u32, params)))
}
