use std::sync::Arc;

use crate::arrange::arrange;
use crate::record::{AnalysisRecord, Completeness, RiskBand};
use crate::state::JobState;
use crate::{JobStatus, Notice, ProgressSnapshot, SortKey};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub status: Option<JobStatus>,
    pub job_id: Option<String>,
    pub progress: ProgressSnapshot,
    /// Canonical arrival-ordered results.
    pub records: Arc<Vec<AnalysisRecord>>,
    /// Results after the current sort and search.
    pub rows: Vec<RecordRowView>,
    pub sort: SortKey,
    pub query: String,
    pub notice: Option<Notice>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRowView {
    pub record_id: String,
    pub rank: u32,
    pub name: String,
    pub score: u8,
    pub financing: String,
    pub employees: String,
    pub founded: String,
    pub risk: RiskBand,
    pub completeness: Completeness,
    pub tags: Vec<String>,
}

impl AppViewModel {
    pub(crate) fn build(
        job: Option<&JobState>,
        records: Arc<Vec<AnalysisRecord>>,
        sort: SortKey,
        query: &str,
        notice: Option<Notice>,
        dirty: bool,
    ) -> Self {
        let progress = job.map_or_else(ProgressSnapshot::default, |job| {
            ProgressSnapshot::compute(records.len(), job.total)
        });
        let rows = arrange(&records, sort, query)
            .into_iter()
            .map(RecordRowView::from)
            .collect();

        Self {
            status: job.map(|job| job.status),
            job_id: job.and_then(|job| job.job_id.clone()),
            progress,
            records,
            rows,
            sort,
            query: query.to_string(),
            notice,
            dirty,
        }
    }
}

impl From<&AnalysisRecord> for RecordRowView {
    fn from(record: &AnalysisRecord) -> Self {
        Self {
            record_id: record.record_id.clone(),
            rank: record.rank,
            name: record.name.clone(),
            score: record.score,
            financing: record.financing.clone(),
            employees: record.employees.clone(),
            founded: record.founded.clone(),
            risk: record.risk,
            completeness: record.completeness,
            tags: record.tags.iter().map(|tag| tag.text.clone()).collect(),
        }
    }
}
