//! Background transcode execution.
//!
//! A [`JobScheduler`] polls persistent job storage and feeds a bounded
//! queue; a fixed set of [`TranscodeWorker`]s consume it. The
//! [`WorkerPool`] owns the lifecycle: the scheduler exits on cancellation
//! and closes the queue, the workers drain what is in flight and exit, and
//! `wait` joins everything within a bounded timeout.

pub mod pool;
pub mod scheduler;
pub mod worker;

pub use pool::{PoolConfig, WorkerPool};
pub use scheduler::JobScheduler;
pub use worker::TranscodeWorker;
