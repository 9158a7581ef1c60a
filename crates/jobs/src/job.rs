//! Job type and its state bookkeeping.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use plainjob_core::{Normalizer, NormalizerConfig, Value};

use crate::error::{JobError, JobResult};

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for JobId {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s).map_err(|e| JobError::InvalidId(format!("JobId: {e}")))?;
        Ok(Self(uuid))
    }
}

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Created, waiting to be picked up
    Pending,
    /// Currently being processed
    Running,
    /// Finished successfully
    Completed,
    /// Failed, has retries left
    Retrying,
    /// Failed with no retries left
    Failed,
    /// Cancelled before settling
    Cancelled,
}

impl JobState {
    /// A settled job will not change state again.
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Retrying => "retrying",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Everything a producer supplies to create a job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub queue_name: String,
    /// Arbitrary payload; normalized when the job is built.
    pub data: Value,
    /// Reuse an existing identifier (e.g. when rehydrating); fresh UUIDv7 otherwise.
    pub id: Option<JobId>,
    /// How many times a failed job may be run again.
    pub retries: u32,
    pub normalizer: NormalizerConfig,
}

impl JobConfig {
    pub fn new(queue_name: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            queue_name: queue_name.into(),
            data: data.into(),
            id: None,
            retries: 0,
            normalizer: NormalizerConfig::default(),
        }
    }

    /// Build from any `Serialize` payload.
    pub fn from_serialize<T: Serialize + ?Sized>(
        queue_name: impl Into<String>,
        data: &T,
    ) -> JobResult<Self> {
        Ok(Self::new(queue_name, Value::from_serialize(data)?))
    }

    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_normalizer(mut self, config: NormalizerConfig) -> Self {
        self.normalizer = config;
        self
    }
}

/// A unit of work with a plain, JSON-safe payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    queue_name: String,
    /// Normalized payload
    data: serde_json::Value,
    state: JobState,
    progress: u8,
    /// Normalized output of a completed job
    result: Option<serde_json::Value>,
    error: Option<String>,
    retries: u32,
    attempts: u32,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    settled_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    normalizer: NormalizerConfig,
}

impl Job {
    /// Create a job, normalizing its payload.
    pub fn new(config: JobConfig) -> JobResult<Self> {
        if config.queue_name.trim().is_empty() {
            return Err(JobError::EmptyQueueName);
        }

        let data = Normalizer::new(config.normalizer.clone()).normalize(&config.data);
        let job = Self {
            id: config.id.unwrap_or_default(),
            queue_name: config.queue_name,
            data,
            state: JobState::Pending,
            progress: 0,
            result: None,
            error: None,
            retries: config.retries,
            attempts: 0,
            created_at: Utc::now(),
            started_at: None,
            settled_at: None,
            normalizer: config.normalizer,
        };

        debug!(job_id = %job.id, queue = %job.queue_name, "job created");
        Ok(job)
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// The payload as normalized at construction.
    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        self.settled_at
    }

    pub fn is_settled(&self) -> bool {
        self.state.is_settled()
    }

    /// Time between the latest start and settlement, or until now if still running.
    pub fn duration(&self) -> Option<chrono::Duration> {
        let started = self.started_at?;
        let end = self.settled_at.unwrap_or_else(Utc::now);
        Some(end - started)
    }

    /// Begin (or resume after a failure) processing.
    pub fn start(&mut self) -> JobResult<()> {
        match self.state {
            JobState::Pending | JobState::Retrying => {
                self.state = JobState::Running;
                self.attempts += 1;
                self.started_at = Some(Utc::now());
                debug!(job_id = %self.id, attempt = self.attempts, "job started");
                Ok(())
            }
            from => Err(JobError::invalid_transition(from, JobState::Running)),
        }
    }

    /// Finish successfully. The result is normalized like the payload.
    pub fn complete(&mut self, result: impl Into<Value>) -> JobResult<()> {
        self.require_running(JobState::Completed)?;
        let result = Normalizer::new(self.normalizer.clone()).normalize(&result.into());
        self.result = Some(result);
        self.progress = 100;
        self.settle(JobState::Completed);
        info!(job_id = %self.id, queue = %self.queue_name, "job completed");
        Ok(())
    }

    /// Record a failure. Moves to `Retrying` while attempts remain, else `Failed`.
    pub fn fail(&mut self, error: impl Into<String>) -> JobResult<()> {
        self.require_running(JobState::Failed)?;
        let error = error.into();
        self.error = Some(error.clone());
        self.progress = 0;

        if self.attempts <= self.retries {
            self.state = JobState::Retrying;
            warn!(job_id = %self.id, attempt = self.attempts, %error, "job failed, will retry");
        } else {
            self.settle(JobState::Failed);
            warn!(job_id = %self.id, attempts = self.attempts, %error, "job failed");
        }
        Ok(())
    }

    pub fn cancel(&mut self) -> JobResult<()> {
        if self.state.is_settled() {
            return Err(JobError::invalid_transition(self.state, JobState::Cancelled));
        }
        self.settle(JobState::Cancelled);
        info!(job_id = %self.id, "job cancelled");
        Ok(())
    }

    pub fn set_progress(&mut self, percent: u8) -> JobResult<()> {
        if percent > 100 {
            return Err(JobError::InvalidProgress(percent));
        }
        self.progress = percent;
        Ok(())
    }

    fn require_running(&self, to: JobState) -> JobResult<()> {
        if self.state == JobState::Running {
            Ok(())
        } else {
            Err(JobError::invalid_transition(self.state, to))
        }
    }

    fn settle(&mut self, state: JobState) {
        self.state = state;
        self.settled_at = Some(Utc::now());
    }
}
