//! Chart rendering port trait.

use crate::domain::error::NeozorkError;
use crate::domain::frame::OhlcvFrame;

/// Port for plotting price plus selected derived columns.
pub trait ChartPort {
    fn render(
        &self,
        frame: &OhlcvFrame,
        columns: &[String],
        title: &str,
    ) -> Result<(), NeozorkError>;
}
