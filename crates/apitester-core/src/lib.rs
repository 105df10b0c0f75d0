pub mod aggregator;
pub mod assertion;
pub mod broadcast;
pub mod cancel;
pub mod config;
pub mod manager;
pub mod results;
pub mod runner;
pub mod storage;
pub mod suite;
pub mod transport;

pub use aggregator::{AggregationError, ResultsAggregator};
pub use assertion::{Assertion, Operator};
pub use broadcast::{Broadcaster, ChannelKey, Subscription};
pub use cancel::{CancelRegistry, CancelToken, RunGuard};
pub use config::{Config, ConfigError, RunnerConfig, ServerConfig, StorageConfig};
pub use manager::{ManagerError, SuiteManager};
pub use results::{
    AssertionOutcome, AssertionStatus, CaseResult, CaseResultDocument, ResultSet,
    SuiteResultDocument, Summary,
};
pub use runner::{CaseExecutor, ResultSink, SuiteRun, SuiteRunner};
pub use storage::{FileStorage, Storage, StorageError};
pub use suite::{RequestBody, SuiteError, SuiteSummary, TestCase, TestSuite, Verb};
pub use transport::{HttpTransport, PreparedRequest, ReqwestTransport, ResponseSnapshot, TransportError};
