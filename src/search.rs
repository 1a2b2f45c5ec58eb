//! Background search: an isolated worker task holding its own index, and the coordinator
//! that gates, dispatches and filters its replies.

pub mod coordinator;
pub mod debounce;
pub mod protocol;
pub mod worker;

pub use coordinator::{IndexStatus, SearchCoordinator};
pub use debounce::Debouncer;
pub use protocol::{Generation, RecordSet, RequestId, WorkerRequest, WorkerResponse};
pub use worker::{search_worker_loop, SearchIndex, SearchIndexEntry};
