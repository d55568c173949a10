// zn-core: Operator workflows on top of zn-api.

pub mod batch;
pub mod breakglass;
pub mod csv;
pub mod entity_id;
pub mod error;
pub mod gate;
pub mod hunt;
pub mod pinning;
pub mod pool;

// ── Primary re-exports ──────────────────────────────────────────────
pub use batch::{BatchOptions, BatchReport, ChunkFailure, chunk_ids, submit_batches};
pub use breakglass::{
    BreakGlassOptions, BreakGlassReport, CommandTemplate, ResolvedTargets, Target, TargetSource,
};
pub use entity_id::{EntityId, EntityKind, GroupSource};
pub use error::CoreError;
pub use gate::{GateCheck, GateContext, GateFailure, GateOp, evaluate};
pub use pinning::{PinFailure, PinOptions, PinReport, PinRequest};
pub use pool::{JobLog, JobOutcome, WorkerPool};

// Transport types callers need alongside the workflows.
pub use zn_api::{RetryPolicy, TransportConfig, ZnClient};
