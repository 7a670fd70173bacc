pub mod gateway;
pub mod kite;
pub mod types;

pub use gateway::{GatewayError, MarketDataGateway};
pub use kite::{parse_instruments, InstrumentRecord, KiteClient, KiteCredentials};
pub use types::{Candle, InstrumentToken, OptionContract, OptionType};
