pub mod ardent;
pub mod cache;

#[allow(unused_imports)]
pub use ardent::{ArdentClient, ArdentClientError, CONCURRENCY_LIMIT};
#[allow(unused_imports)]
pub use cache::{
    default_snapshot_path, load_market_snapshot, save_market_snapshot, LocalMarketSnapshot,
};
