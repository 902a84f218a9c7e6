pub mod camera;
pub mod landmarks;
pub mod rgba_converter;
pub mod skeleton;

pub use camera::{CaptureSettings, start_camera_stream};
pub use landmarks::{LandmarkSource, LandmarkSourceConfig, OrtLandmarkSource};
