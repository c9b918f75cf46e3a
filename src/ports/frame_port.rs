//! Table sink port trait.

use crate::domain::error::NeozorkError;
use crate::domain::frame::OhlcvFrame;

/// Port for persisting a frame together with its derived columns.
pub trait FramePort {
    fn write(&self, frame: &OhlcvFrame) -> Result<(), NeozorkError>;
}
