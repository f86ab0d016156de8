//! Scene-level transforms and temporal reductions, leaf first:
//! calibration, spectral indices, cloud and shadow masking, radar edge
//! denoising, per-pixel statistics, execution and composite assembly.
pub mod calibrate;
pub mod cloud;
pub mod composite;
pub mod edge;
pub mod executor;
pub mod indices;
pub mod masking;
pub mod pipeline;
pub mod reduce;
pub mod shadow;
