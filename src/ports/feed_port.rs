//! Market data feed port trait.

use crate::domain::error::MoneybinError;
use crate::domain::market::PriceTick;

/// Supplies batched price updates in timestamp order. The core never
/// initiates fetches; a driver pulls ticks and applies them.
pub trait FeedPort {
    fn load_ticks(&self) -> Result<Vec<PriceTick>, MoneybinError>;
}
