pub mod broadcast;
pub mod invalidating;
pub mod locks;
pub mod stores;

pub use broadcast::{ClearCacheSignal, listen_for_clear_cache, publish_clear_cache};
pub use invalidating::{CacheStats, InvalidatingCache};
pub use locks::KeyedLocks;
pub use stores::{CachingAssignableSchemeStore, CachingDraftSchemeStore};
