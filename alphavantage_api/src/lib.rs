mod client;
mod errors;
mod query;
pub mod types;
pub use self::client::Client;
pub use self::errors::Error;
pub use self::query::{DailyAdjustedQuery, OutputSize};
pub use self::types::RawPayload;
