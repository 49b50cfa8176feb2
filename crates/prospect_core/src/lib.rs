//! Prospect core: pure job state machine, result reducer and view-model helpers.
mod arrange;
mod effect;
mod event;
mod input;
mod msg;
mod progress;
mod record;
mod state;
mod update;
mod view_model;

pub use arrange::{arrange, SortKey};
pub use effect::Effect;
pub use event::{classify, EventParseError, JobEvent, RecordEvent, JOB_ID_MARKER};
pub use input::{DataItem, FieldRef, JobInput, RecordField, DEFAULT_EXPECTED_TOTAL};
pub use msg::{ControlOutcome, Msg, StreamFailure};
pub use progress::{ProgressSnapshot, PHASE_WINDOW};
pub use record::{field_text, AnalysisRecord, Completeness, KnownField, RiskBand, Tag, TagKind};
pub use state::{
    AppState, ControlAction, JobKey, JobSnapshot, JobStatus, Notice, NoticeLevel,
};
pub use update::update;
pub use view_model::{AppViewModel, RecordRowView};
