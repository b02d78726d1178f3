pub mod store;
pub mod types;
pub mod validation;

pub use store::{ConfigStore, PoolSnapshot};
pub use types::{
    ClusteringConfig, CoinProfile, DaemonEndpoint, Forks, PoolConfig, PoolDefinition,
    PortalConfig, RedisConfig,
};
pub use validation::build_pool_configs;
