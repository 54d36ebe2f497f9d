// Every variant states *where* things went wrong.
// End of stream is not here: the frame source reports it as `None`.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Creating or opening the camera failed (fatal at startup).
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// The camera opened but never delivered a first frame.
    #[error("Camera delivered no initial frame")]
    NoInitialFrame,

    #[error("Window init error: {0}")]
    WindowInit(String),

    #[error("Window update error: {0}")]
    WindowUpdate(String),
}
