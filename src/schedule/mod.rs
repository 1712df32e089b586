pub mod cache;
pub mod channels;
pub mod config;
pub mod merge;
pub mod oqee;
pub mod source;

pub use cache::{AdCache, CacheEntry, RefreshReason};
pub use channels::ChannelMap;
pub use config::CacheConfig;
pub use merge::merge;
pub use oqee::OqeeClient;
pub use source::ScheduleSource;
