pub mod aggregate;
pub mod classify;
pub mod config;
pub mod keyspace;
pub mod lifecycle;
pub mod probe;
pub mod query;
pub mod store;
pub mod testing;
pub mod worker;

pub use aggregate::{AggregateError, Aggregator, ResultSet, StoreStatus};
pub use classify::ClassifierTable;
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, StoreConfig,
};
pub use keyspace::{ItemState, KeyCodec, KeyError, OutcomeFilter};
pub use lifecycle::{EnrollReport, LifecycleEngine, LifecycleError};
pub use probe::{CommandProbe, Outcome, Probe, ProbeCommandConfig, ProbeError, ReasonCode};
pub use query::{QueryEngine, QueryError};
pub use store::{ObjectStore, RetryPolicy, S3ObjectStore, StoreError};
pub use worker::{BatchReport, WorkerConfig, WorkerDriver, WorkerError};
