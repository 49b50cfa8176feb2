use std::cmp::Ordering;

use crate::record::{AnalysisRecord, Completeness, RiskBand};

/// Ordering applied to the result list for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Canonical arrival order.
    #[default]
    Arrival,
    Score,
    Completeness,
    Financing,
    Employees,
    Risk,
    Founded,
}

impl SortKey {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "arrival" | "rank" => Some(Self::Arrival),
            "score" => Some(Self::Score),
            "completeness" => Some(Self::Completeness),
            "financing" => Some(Self::Financing),
            "employees" => Some(Self::Employees),
            "risk" => Some(Self::Risk),
            "founded" => Some(Self::Founded),
            _ => None,
        }
    }
}

const FINANCING_ORDER: [(&str, u8); 6] = [
    ("已上市", 5),
    ("D轮", 4),
    ("C轮", 3),
    ("B轮", 2),
    ("A轮", 1),
    ("天使", 0),
];

const EMPLOYEE_ORDER: [(&str, u8); 5] = [
    ("10000+人", 5),
    ("5000-9999人", 4),
    ("1000-4999人", 3),
    ("500-999人", 2),
    ("50-99人", 1),
];

fn lookup(table: &[(&str, u8)], value: &str) -> u8 {
    table
        .iter()
        .find(|(name, _)| *name == value.trim())
        .map_or(0, |(_, weight)| *weight)
}

fn completeness_weight(completeness: Completeness) -> u8 {
    match completeness {
        Completeness::Complete => 3,
        Completeness::Partial => 2,
        Completeness::Missing => 1,
    }
}

fn risk_weight(risk: RiskBand) -> u8 {
    match risk {
        RiskBand::Low => 3,
        RiskBand::Medium => 2,
        RiskBand::High => 1,
    }
}

fn leading_year(founded: &str) -> u32 {
    let digits: String = founded
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}

fn compare(key: SortKey, a: &AnalysisRecord, b: &AnalysisRecord) -> Ordering {
    match key {
        SortKey::Arrival => a.rank.cmp(&b.rank),
        SortKey::Score => b.score.cmp(&a.score),
        SortKey::Completeness => {
            completeness_weight(b.completeness).cmp(&completeness_weight(a.completeness))
        }
        SortKey::Financing => {
            lookup(&FINANCING_ORDER, &b.financing).cmp(&lookup(&FINANCING_ORDER, &a.financing))
        }
        SortKey::Employees => {
            lookup(&EMPLOYEE_ORDER, &b.employees).cmp(&lookup(&EMPLOYEE_ORDER, &a.employees))
        }
        SortKey::Risk => risk_weight(b.risk).cmp(&risk_weight(a.risk)),
        SortKey::Founded => leading_year(&b.founded).cmp(&leading_year(&a.founded)),
    }
}

/// Returns a filtered, sorted view over `records` without touching their order.
///
/// Filtering is a case-insensitive substring match on the company name; ties
/// keep arrival order.
pub fn arrange<'a>(records: &'a [AnalysisRecord], key: SortKey, query: &str) -> Vec<&'a AnalysisRecord> {
    let needle = query.trim().to_lowercase();
    let mut view: Vec<&AnalysisRecord> = records
        .iter()
        .filter(|record| needle.is_empty() || record.name.to_lowercase().contains(&needle))
        .collect();
    view.sort_by(|a, b| compare(key, a, b));
    view
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rank: u32, name: &str, score: u8, financing: &str) -> AnalysisRecord {
        let mut record = AnalysisRecord::from_fields(format!("R{rank}"), rank, Vec::new());
        record.name = name.to_string();
        record.score = score;
        record.financing = financing.to_string();
        record
    }

    #[test]
    fn sorting_leaves_canonical_order_untouched() {
        let records = vec![
            record(1, "Alpha", 50, "A轮"),
            record(2, "Beta", 90, "已上市"),
            record(3, "Gamma", 70, "mystery"),
        ];
        let before = records.clone();

        let by_score: Vec<u32> = arrange(&records, SortKey::Score, "").iter().map(|r| r.rank).collect();
        assert_eq!(by_score, vec![2, 3, 1]);

        let by_financing: Vec<u32> = arrange(&records, SortKey::Financing, "")
            .iter()
            .map(|r| r.rank)
            .collect();
        assert_eq!(by_financing, vec![2, 1, 3]);

        assert_eq!(records, before);
    }

    #[test]
    fn name_filter_is_case_insensitive() {
        let records = vec![record(1, "Alpha Labs", 50, ""), record(2, "beta", 60, "")];
        let hits: Vec<&str> = arrange(&records, SortKey::Arrival, "ALPHA")
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(hits, vec!["Alpha Labs"]);
    }

    #[test]
    fn founded_sorts_by_leading_year() {
        let mut older = record(1, "Old", 0, "");
        older.founded = "1998年4月".to_string();
        let mut newer = record(2, "New", 0, "");
        newer.founded = "2021年1月".to_string();
        let records = vec![older, newer];
        let order: Vec<u32> = arrange(&records, SortKey::Founded, "").iter().map(|r| r.rank).collect();
        assert_eq!(order, vec![2, 1]);
    }

    #[test]
    fn sort_keys_parse() {
        assert_eq!(SortKey::parse("Score"), Some(SortKey::Score));
        assert_eq!(SortKey::parse("rank"), Some(SortKey::Arrival));
        assert_eq!(SortKey::parse("colour"), None);
    }
}
