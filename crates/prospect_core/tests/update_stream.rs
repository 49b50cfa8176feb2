use std::sync::Once;

use pretty_assertions::assert_eq;
use prospect_core::{
    update, AppState, DataItem, Effect, JobInput, JobKey, JobStatus, Msg, NoticeLevel,
    StreamFailure,
};
use serde_json::json;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn input_with(records: usize) -> JobInput {
    JobInput {
        table_id: "tbl".to_string(),
        data_items: (0..records)
            .map(|i| DataItem {
                record_id: format!("rec{i}"),
                fields: Vec::new(),
            })
            .collect(),
        ..JobInput::default()
    }
}

fn start(records: usize) -> (AppState, JobKey) {
    let (state, effects) = update(AppState::new(), Msg::StartRequested(input_with(records)));
    let job_key = match effects.as_slice() {
        [Effect::OpenStream { job_key, .. }] => *job_key,
        other => panic!("expected a single OpenStream effect, got {other:?}"),
    };
    (state, job_key)
}

fn job_id_payload(id: &str) -> String {
    json!({ "event": "REQUEST_ID", "data": id }).to_string()
}

fn record_payload(record_id: &str, name: &str, score: u8) -> String {
    json!({
        "data": {
            "recordId": record_id,
            "fields": [
                { "fieldId": "f1", "fieldName": "企业名称", "fieldValue": name },
                { "fieldId": "f2", "fieldName": "综合评分", "fieldValue": score }
            ]
        }
    })
    .to_string()
}

fn deliver(state: AppState, job_key: JobKey, payload: String) -> AppState {
    let (state, effects) = update(state, Msg::StreamMessage { job_key, payload });
    assert!(effects.is_empty());
    state
}

#[test]
fn happy_path_completes_in_arrival_order() {
    init_logging();
    let (state, key) = start(3);
    assert_eq!(state.job_status(), Some(JobStatus::Starting));

    let state = deliver(state, key, job_id_payload("job-1"));
    assert_eq!(state.job_status(), Some(JobStatus::Running));
    assert_eq!(state.job_id(), Some("job-1"));

    let state = deliver(state, key, record_payload("A", "Alpha", 90));
    let state = deliver(state, key, record_payload("B", "Beta", 70));
    let state = deliver(state, key, record_payload("C", "Gamma", 50));
    let (state, effects) = update(state, Msg::StreamCompleted { job_key: key });
    assert!(effects.is_empty());

    let view = state.view();
    assert_eq!(view.status, Some(JobStatus::Completed));
    assert_eq!(view.progress.processed, 3);
    assert!(view.progress.all_processed);
    let canonical: Vec<(&str, u8, u32)> = view
        .records
        .iter()
        .map(|r| (r.record_id.as_str(), r.score, r.rank))
        .collect();
    assert_eq!(canonical, vec![("A", 90, 1), ("B", 70, 2), ("C", 50, 3)]);
}

#[test]
fn repeated_record_replaces_in_place() {
    init_logging();
    let (state, key) = start(5);
    let state = deliver(state, key, record_payload("R1", "First", 40));
    let state = deliver(state, key, record_payload("R2", "Second", 60));
    let state = deliver(state, key, record_payload("R1", "First v2", 95));

    let records = state.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].record_id, "R1");
    assert_eq!(records[0].name, "First v2");
    assert_eq!(records[0].score, 95);
    assert_eq!(records[0].rank, 1);
    assert_eq!(records[1].rank, 2);
    assert_eq!(state.view().progress.processed, 2);
}

#[test]
fn malformed_payloads_are_skipped() {
    init_logging();
    let (state, key) = start(2);
    let state = deliver(state, key, "{broken".to_string());
    let state = deliver(state, key, json!({ "event": "ping" }).to_string());
    let state = deliver(state, key, json!({ "data": { "fields": [] } }).to_string());

    assert!(state.records().is_empty());
    assert_eq!(state.job_status(), Some(JobStatus::Starting));
}

#[test]
fn terminate_mid_stream_keeps_records_and_drops_late_events() {
    init_logging();
    let (state, key) = start(5);
    let state = deliver(state, key, job_id_payload("job-9"));
    let state = deliver(state, key, record_payload("A", "Alpha", 80));
    let state = deliver(state, key, record_payload("B", "Beta", 60));

    let (state, effects) = update(state, Msg::TerminateRequested);
    assert_eq!(state.job_status(), Some(JobStatus::Terminated));
    assert_eq!(
        effects,
        vec![
            Effect::TerminateJob {
                job_key: key,
                job_id: "job-9".to_string()
            },
            Effect::CancelStream { job_key: key },
        ]
    );

    // A frame the transport had already buffered still arrives.
    let state = deliver(state, key, record_payload("C", "Gamma", 40));
    let (state, _) = update(state, Msg::StreamCompleted { job_key: key });

    let view = state.view();
    assert_eq!(view.status, Some(JobStatus::Terminated));
    assert_eq!(view.records.len(), 2);
    assert_eq!(view.notice.unwrap().level, NoticeLevel::Info);
}

#[test]
fn terminate_before_job_id_skips_server_notification() {
    init_logging();
    let (state, key) = start(5);
    let (state, effects) = update(state, Msg::TerminateRequested);
    assert_eq!(effects, vec![Effect::CancelStream { job_key: key }]);

    // The id event raced with the terminate and lost.
    let state = deliver(state, key, job_id_payload("job-late"));
    assert_eq!(state.job_status(), Some(JobStatus::Terminated));
    assert_eq!(state.job_id(), None);

    let (_state, effects) = update(state, Msg::TerminateRequested);
    assert!(effects.is_empty());
}

#[test]
fn job_id_first_then_terminate_notifies_server() {
    init_logging();
    let (state, key) = start(5);
    let state = deliver(state, key, job_id_payload("job-early"));
    let (state, effects) = update(state, Msg::TerminateRequested);

    assert_eq!(state.job_status(), Some(JobStatus::Terminated));
    assert_eq!(state.job_id(), Some("job-early"));
    assert!(effects.contains(&Effect::TerminateJob {
        job_key: key,
        job_id: "job-early".to_string()
    }));
}

#[test]
fn job_id_is_assigned_once() {
    init_logging();
    let (state, key) = start(2);
    let state = deliver(state, key, job_id_payload("first"));
    let state = deliver(
        state,
        key,
        json!({ "event": "request_id", "data": "second" }).to_string(),
    );
    assert_eq!(state.job_id(), Some("first"));
}

#[test]
fn timeout_and_network_failures_fail_the_job_with_distinct_notices() {
    init_logging();
    let (state, key) = start(3);
    let state = deliver(state, key, record_payload("A", "Alpha", 80));
    let (state, _) = update(
        state,
        Msg::StreamFailed {
            job_key: key,
            failure: StreamFailure::Timeout,
        },
    );
    let view = state.view();
    assert_eq!(view.status, Some(JobStatus::Failed));
    assert_eq!(view.records.len(), 1);
    assert_eq!(view.notice.unwrap().message, "connection timed out");

    let (state, key) = start(3);
    let (state, _) = update(
        state,
        Msg::StreamFailed {
            job_key: key,
            failure: StreamFailure::Network("connection reset".to_string()),
        },
    );
    let view = state.view();
    assert_eq!(view.status, Some(JobStatus::Failed));
    assert_eq!(view.notice.unwrap().message, "network error");
}

#[test]
fn stream_ending_short_of_total_fails() {
    init_logging();
    let (state, key) = start(3);
    let state = deliver(state, key, job_id_payload("job-1"));
    let state = deliver(state, key, record_payload("A", "Alpha", 80));
    let (state, _) = update(state, Msg::StreamCompleted { job_key: key });

    assert_eq!(state.job_status(), Some(JobStatus::Failed));
    assert_eq!(state.records().len(), 1);
}

#[test]
fn events_from_a_previous_job_are_ignored() {
    init_logging();
    let (state, old_key) = start(1);
    let (state, _) = update(state, Msg::TerminateRequested);
    let (state, effects) = update(state, Msg::StartRequested(input_with(2)));
    let new_key = match effects.as_slice() {
        [Effect::OpenStream { job_key, .. }] => *job_key,
        other => panic!("unexpected effects {other:?}"),
    };
    assert_ne!(old_key, new_key);

    let state = deliver(state, old_key, record_payload("X", "Stale", 10));
    let (state, _) = update(state, Msg::StreamCompleted { job_key: old_key });

    assert!(state.records().is_empty());
    assert_eq!(state.job_status(), Some(JobStatus::Starting));
}

#[test]
fn second_start_while_running_is_refused() {
    init_logging();
    let (state, _key) = start(2);
    let (state, effects) = update(state, Msg::StartRequested(input_with(2)));
    assert!(effects.is_empty());
    assert_eq!(state.view().notice.unwrap().level, NoticeLevel::Warning);
}

#[test]
fn view_snapshot_is_unaffected_by_later_upserts() {
    init_logging();
    let (state, key) = start(3);
    let state = deliver(state, key, record_payload("A", "Alpha", 80));
    let before = state.view();

    let state = deliver(state, key, record_payload("A", "Alpha v2", 10));
    let state = deliver(state, key, record_payload("B", "Beta", 20));

    assert_eq!(before.records.len(), 1);
    assert_eq!(before.records[0].score, 80);
    assert_eq!(state.records().len(), 2);
}

#[test]
fn progress_bands_follow_processed_records() {
    init_logging();
    let (mut state, key) = start(20);
    for i in 0..16 {
        state = deliver(state, key, record_payload(&format!("R{i}"), "Co", 50));
    }
    let progress = state.view().progress;
    assert_eq!(progress.processed, 16);
    assert_eq!(progress.phases, [100, 100, 100, 20]);
    assert!(!progress.all_processed);
}
