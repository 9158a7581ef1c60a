//! `plainjob-jobs` — units of work carrying normalized payloads.
//!
//! A [`Job`] normalizes its payload exactly once, when it is constructed. The
//! stored `data` is plain JSON from then on; readers never re-normalize.

pub mod error;
pub mod job;

pub use error::{JobError, JobResult};
pub use job::{Job, JobConfig, JobId, JobState};
