//! IRCv3 extension helpers: batches, server-time and probe tokens.

pub mod batch;
pub mod server_time;
pub mod token;

pub use self::batch::{ActiveBatch, BatchTable};
pub use self::server_time::{format_server_time, parse_server_time, parse_timestamp};
pub use self::token::generate_ping_token;
