use prospect_core::{
    AppViewModel, Completeness, JobStatus, NoticeLevel, ProgressSnapshot, RecordRowView, RiskBand,
};

pub fn status_label(status: Option<JobStatus>) -> &'static str {
    match status {
        None => "Idle",
        Some(JobStatus::Starting) => "Starting",
        Some(JobStatus::Running) => "Running",
        Some(JobStatus::Paused) => "Paused",
        Some(JobStatus::Terminated) => "Terminated",
        Some(JobStatus::Completed) => "Completed",
        Some(JobStatus::Failed) => "Failed",
    }
}

fn risk_label(risk: RiskBand) -> &'static str {
    match risk {
        RiskBand::Low => "low",
        RiskBand::Medium => "medium",
        RiskBand::High => "high",
    }
}

fn completeness_label(completeness: Completeness) -> &'static str {
    match completeness {
        Completeness::Complete => "complete",
        Completeness::Partial => "partial",
        Completeness::Missing => "missing",
    }
}

pub fn progress_text(progress: &ProgressSnapshot) -> String {
    let [p1, p2, p3, p4] = progress.phases;
    format!(
        "{}/{} records ({}%) | phases {}/{}/{}/{}",
        progress.processed, progress.total, progress.overall_percent, p1, p2, p3, p4
    )
}

/// One line summarising the job; printed whenever it changes.
pub fn status_line(view: &AppViewModel) -> String {
    let mut line = format!("[{}]", status_label(view.status));
    if let Some(job_id) = &view.job_id {
        line.push_str(&format!(" job {job_id}"));
    }
    if view.status.is_some() {
        line.push_str(&format!(" | {}", progress_text(&view.progress)));
    }
    if let Some(notice) = &view.notice {
        let level = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        line.push_str(&format!(" | {level}: {}", notice.message));
    }
    line
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        text.to_string()
    } else {
        format!("{text}{}", " ".repeat(width - len))
    }
}

const HEADERS: [&str; 9] = [
    "#", "name", "score", "financing", "employees", "founded", "risk", "data", "tags",
];

pub fn table(rows: &[RecordRowView]) -> String {
    if rows.is_empty() {
        return "(no records)".to_string();
    }
    let cells: Vec<[String; 9]> = rows
        .iter()
        .map(|row| {
            [
                row.rank.to_string(),
                row.name.clone(),
                row.score.to_string(),
                row.financing.clone(),
                row.employees.clone(),
                row.founded.clone(),
                risk_label(row.risk).to_string(),
                completeness_label(row.completeness).to_string(),
                row.tags.join(", "),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |row: &[String]| -> String {
        row.iter()
            .zip(widths.iter())
            .map(|(cell, width)| pad(cell, *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    let mut out = vec![format_row(&header)];
    out.extend(cells.iter().map(|row| format_row(row)));
    out.join("\n")
}
