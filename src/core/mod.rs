//! Core building blocks: the raster data model, pipeline parameters, and the
//! per-scene masking / temporal reduction stages. These are the primitives
//! consumed by the high-level `api` module.
pub mod params;
pub mod processing;
pub mod raster;

#[cfg(test)]
pub(crate) mod test_support;
