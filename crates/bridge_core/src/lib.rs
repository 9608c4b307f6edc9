pub mod config;
pub mod kind;
pub mod kv_store;
pub mod logging;
pub mod notifications;

pub use config::{BridgeConfig, RouteConfig, SolanaCluster, validate_url};
pub use kind::WalletKind;
pub use kv_store::{FileKvStore, KvStore, MemoryKvStore, StoredValue};
pub use notifications::{Notification, NotificationType, Notifier};
