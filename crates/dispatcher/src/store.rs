//! MemoryJobStore - in-memory reference implementation of the store contract
//!
//! Per-id atomicity comes from the single map lock. An optional removal hook
//! stands in for the downstream propagation a real store would perform; the
//! notify-serving loop removes records with that hook suppressed.

use std::collections::HashMap;
use std::sync::Mutex;

use contracts::{
    JobRecord, JobStore, JobUpdate, NewJob, QueueError, RemoveOptions,
};

type RemoveHook = Box<dyn Fn(&JobRecord) + Send + Sync>;

/// In-memory job record store
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, JobRecord>>,
    remove_hook: Option<RemoveHook>,
}

impl MemoryJobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with a removal hook
    ///
    /// The hook observes each removed record unless removal was requested
    /// with hooks suppressed.
    pub fn with_remove_hook<F>(hook: F) -> Self
    where
        F: Fn(&JobRecord) + Send + Sync + 'static,
    {
        Self {
            jobs: Mutex::new(HashMap::new()),
            remove_hook: Some(Box::new(hook)),
        }
    }

    /// Look up a record by id
    pub fn get(&self, id: &str) -> Option<JobRecord> {
        self.jobs.lock().expect("job map poisoned").get(id).cloned()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.jobs.lock().expect("job map poisoned").len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: NewJob) -> Result<JobRecord, QueueError> {
        let record = JobRecord {
            id: uuid::Uuid::new_v4().to_string(),
            status: job.status,
            result: None,
            created_at: chrono::Utc::now(),
            max_age: job.max_age,
        };
        self.jobs
            .lock()
            .expect("job map poisoned")
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, update: JobUpdate) -> Result<(), QueueError> {
        let mut jobs = self.jobs.lock().expect("job map poisoned");
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| QueueError::store(format!("unknown job id: {id}")))?;
        record.status = update.status;
        record.result = update.result;
        Ok(())
    }

    async fn remove(&self, id: &str, options: RemoveOptions) -> Result<(), QueueError> {
        let record = self
            .jobs
            .lock()
            .expect("job map poisoned")
            .remove(id)
            .ok_or_else(|| QueueError::store(format!("unknown job id: {id}")))?;

        if !options.suppress_hooks {
            if let Some(hook) = &self.remove_hook {
                hook(&record);
            }
        }
        Ok(())
    }
}
