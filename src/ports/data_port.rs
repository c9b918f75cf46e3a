//! OHLCV data source port trait.

use crate::domain::error::NeozorkError;
use crate::domain::ohlcv::OhlcvBar;

pub trait DataPort {
    /// Load every bar from the source, sorted ascending by timestamp.
    fn load(&self) -> Result<Vec<OhlcvBar>, NeozorkError>;
}
