use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use serde::{Deserialize, Serialize};

use crate::arrange::SortKey;
use crate::event::RecordEvent;
use crate::record::AnalysisRecord;
use crate::view_model::AppViewModel;

/// Local handle for one started job; never reused within a process.
pub type JobKey = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Starting,
    Running,
    Paused,
    Terminated,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Terminated | JobStatus::Completed | JobStatus::Failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Pause,
    Resume,
    Terminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-facing message about the last thing that happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JobState {
    pub(crate) key: JobKey,
    pub(crate) job_id: Option<String>,
    pub(crate) status: JobStatus,
    pub(crate) total: usize,
    /// False once the result stream has ended while the job was paused.
    pub(crate) stream_open: bool,
    pub(crate) pending_control: Option<ControlAction>,
}

/// Results of one job in a form suitable for saving and reloading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: Option<String>,
    pub status: JobStatus,
    pub total: usize,
    pub records: Vec<AnalysisRecord>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    job: Option<JobState>,
    last_key: JobKey,
    records: Arc<Vec<AnalysisRecord>>,
    sort: SortKey,
    query: String,
    notice: Option<Notice>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel::build(
            self.job.as_ref(),
            self.records.clone(),
            self.sort,
            &self.query,
            self.notice.clone(),
            self.dirty,
        )
    }

    /// Returns whether the state changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn job_status(&self) -> Option<JobStatus> {
        self.job.as_ref().map(|job| job.status)
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job.as_ref().and_then(|job| job.job_id.as_deref())
    }

    pub fn job_key(&self) -> Option<JobKey> {
        self.job.as_ref().map(|job| job.key)
    }

    /// Immutable view of the canonical (arrival-ordered) result collection.
    pub fn records(&self) -> Arc<Vec<AnalysisRecord>> {
        self.records.clone()
    }

    pub fn snapshot(&self) -> Option<JobSnapshot> {
        self.job.as_ref().map(|job| JobSnapshot {
            job_id: job.job_id.clone(),
            status: job.status,
            total: job.total,
            records: self.records.as_ref().clone(),
        })
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.mark_dirty();
    }

    pub(crate) fn set_sort(&mut self, sort: SortKey) {
        if self.sort != sort {
            self.sort = sort;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_query(&mut self, query: String) {
        if self.query != query {
            self.query = query;
            self.mark_dirty();
        }
    }

    pub(crate) fn has_active_job(&self) -> bool {
        self.job_status().is_some_and(|status| !status.is_terminal())
    }

    /// Installs a fresh job and drops the previous job's results.
    pub(crate) fn begin_job(&mut self, total: usize) -> JobKey {
        self.last_key += 1;
        let key = self.last_key;
        self.job = Some(JobState {
            key,
            job_id: None,
            status: JobStatus::Starting,
            total,
            stream_open: true,
            pending_control: None,
        });
        self.records = Arc::new(Vec::new());
        self.notice = None;
        self.mark_dirty();
        engine_info!("Job {} starting, expecting {} records", key, total);
        key
    }

    /// Job state for `key` if it is still the current job.
    pub(crate) fn current_job_mut(&mut self, key: JobKey) -> Option<&mut JobState> {
        match self.job.as_mut() {
            Some(job) if job.key == key => Some(job),
            Some(job) => {
                engine_debug!("Ignoring event for stale job {} (current {})", key, job.key);
                None
            }
            None => None,
        }
    }

    pub(crate) fn job_mut(&mut self) -> Option<&mut JobState> {
        self.job.as_mut()
    }

    pub(crate) fn apply_job_id(&mut self, key: JobKey, job_id: String) {
        let Some(job) = self.current_job_mut(key) else {
            return;
        };
        if job.status.is_terminal() {
            engine_info!("Job {} ignoring job id {} after {:?}", key, job_id, job.status);
            return;
        }
        match job.job_id.as_deref() {
            Some(known) if known == job_id => return,
            Some(known) => {
                engine_warn!("Job {} already has id {}, ignoring {}", key, known, job_id);
                return;
            }
            None => {}
        }
        engine_info!("Job {} assigned id {}", key, job_id);
        job.job_id = Some(job_id);
        if job.status == JobStatus::Starting {
            job.status = JobStatus::Running;
        }
        self.mark_dirty();
    }

    /// Replaces the record with the same id in place, or appends it with the
    /// next rank.
    pub(crate) fn upsert_record(&mut self, key: JobKey, event: RecordEvent) {
        let Some(job) = self.current_job_mut(key) else {
            return;
        };
        if job.status.is_terminal() {
            engine_debug!(
                "Job {} dropping record {} after {:?}",
                key,
                event.record_id,
                job.status
            );
            return;
        }

        let records = Arc::make_mut(&mut self.records);
        match records
            .iter_mut()
            .find(|record| record.record_id == event.record_id)
        {
            Some(existing) => {
                engine_debug!("Job {} replacing record {}", key, event.record_id);
                *existing = AnalysisRecord::from_fields(event.record_id, existing.rank, event.fields);
            }
            None => {
                let rank = records.len() as u32 + 1;
                records.push(AnalysisRecord::from_fields(event.record_id, rank, event.fields));
            }
        }
        self.mark_dirty();
    }

    pub(crate) fn processed(&self) -> usize {
        self.records.len()
    }
}
