pub mod cloudcontrol;
pub mod error;

pub use cloudcontrol::{CloudControlApi, CloudControlClient, ProgressEvent, ResourceDescription};
pub use error::ApiError;
