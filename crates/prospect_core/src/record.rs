use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::input::RecordField;

/// Field names the analysis service writes back, as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownField {
    CompanyName,
    CompanyStatus,
    Founded,
    EmployeeBand,
    RegisteredCapital,
    FinancingRound,
    Listed,
    LegalRepresentative,
    Phone,
    Website,
    Email,
    FinancingTime,
    FinancingHeatScore,
    CompositeScore,
    CustomerPriority,
    FinancingHeat,
    GrowthHeat,
    RiskRating,
    CoreConclusion,
    SalesAdvice,
}

impl KnownField {
    pub const ALL: [KnownField; 20] = [
        KnownField::CompanyName,
        KnownField::CompanyStatus,
        KnownField::Founded,
        KnownField::EmployeeBand,
        KnownField::RegisteredCapital,
        KnownField::FinancingRound,
        KnownField::Listed,
        KnownField::LegalRepresentative,
        KnownField::Phone,
        KnownField::Website,
        KnownField::Email,
        KnownField::FinancingTime,
        KnownField::FinancingHeatScore,
        KnownField::CompositeScore,
        KnownField::CustomerPriority,
        KnownField::FinancingHeat,
        KnownField::GrowthHeat,
        KnownField::RiskRating,
        KnownField::CoreConclusion,
        KnownField::SalesAdvice,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            KnownField::CompanyName => "企业名称",
            KnownField::CompanyStatus => "企业状态",
            KnownField::Founded => "成立时间",
            KnownField::EmployeeBand => "当前员工规模",
            KnownField::RegisteredCapital => "注册资本",
            KnownField::FinancingRound => "融资轮次",
            KnownField::Listed => "是否上市",
            KnownField::LegalRepresentative => "法人",
            KnownField::Phone => "企业电话",
            KnownField::Website => "官网链接",
            KnownField::Email => "企业邮箱",
            KnownField::FinancingTime => "融资时间",
            KnownField::FinancingHeatScore => "融资热度评分",
            KnownField::CompositeScore => "综合评分",
            KnownField::CustomerPriority => "客户优先级",
            KnownField::FinancingHeat => "融资热度",
            KnownField::GrowthHeat => "增长热度",
            KnownField::RiskRating => "风险评级",
            KnownField::CoreConclusion => "核心结论",
            KnownField::SalesAdvice => "销售建议",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|field| field.wire_name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completeness {
    Complete,
    Partial,
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagKind {
    Positive,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub text: String,
    pub kind: TagKind,
}

/// One enriched and scored record as shown in the result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub record_id: String,
    /// 1-based arrival position.
    pub rank: u32,
    pub score: u8,
    pub name: String,
    pub financing: String,
    pub employees: String,
    pub founded: String,
    pub risk: RiskBand,
    pub completeness: Completeness,
    pub tags: Vec<Tag>,
    /// Every field as received, including names outside [`KnownField`].
    pub fields: Vec<RecordField>,
}

const DEFAULT_SCORE: u8 = 50;

impl AnalysisRecord {
    pub fn from_fields(record_id: impl Into<String>, rank: u32, fields: Vec<RecordField>) -> Self {
        let lookup = |known: KnownField| -> Option<String> {
            fields
                .iter()
                .find(|field| KnownField::from_wire_name(&field.field_name) == Some(known))
                .and_then(|field| field_text(&field.field_value))
                .filter(|text| !text.trim().is_empty())
        };

        let name = lookup(KnownField::CompanyName).unwrap_or_else(|| "Unknown company".to_string());
        let score = lookup(KnownField::CompositeScore)
            .map(|text| parse_score(&text))
            .unwrap_or(DEFAULT_SCORE);
        let financing = lookup(KnownField::FinancingRound).unwrap_or_else(|| "unknown".to_string());
        let employees = lookup(KnownField::EmployeeBand).unwrap_or_else(|| "unknown".to_string());
        let founded = lookup(KnownField::Founded)
            .map(|text| format_month(&text))
            .unwrap_or_default();
        let risk_text = lookup(KnownField::RiskRating);
        let risk = risk_text.as_deref().and_then(parse_band).unwrap_or(RiskBand::Medium);

        let missing = [KnownField::CompanyName, KnownField::Founded, KnownField::FinancingRound]
            .into_iter()
            .filter(|known| lookup(*known).is_none())
            .count();
        let completeness = match missing {
            0 => Completeness::Complete,
            1 | 2 => Completeness::Partial,
            _ => Completeness::Missing,
        };

        let mut tags = Vec::new();
        let is_high = |known: KnownField| {
            lookup(known).and_then(|text| parse_band(&text)) == Some(RiskBand::High)
        };
        if is_high(KnownField::FinancingHeat) {
            tags.push(tag("strong financing", TagKind::Positive));
        }
        if is_high(KnownField::GrowthHeat) {
            tags.push(tag("fast growth", TagKind::Positive));
        }
        match risk_text.as_deref().and_then(parse_band) {
            Some(RiskBand::Low) => tags.push(tag("low risk", TagKind::Positive)),
            Some(RiskBand::High) => tags.push(tag("high risk", TagKind::Danger)),
            _ => {}
        }
        if completeness == Completeness::Partial {
            tags.push(tag("data missing", TagKind::Warning));
        }
        if tags.is_empty() {
            tags.push(tag("company info", TagKind::Positive));
        }

        Self {
            record_id: record_id.into(),
            rank,
            score,
            name,
            financing,
            employees,
            founded,
            risk,
            completeness,
            tags,
            fields,
        }
    }

    /// Display text of a field by wire name, known or not.
    pub fn field(&self, field_name: &str) -> Option<String> {
        self.fields
            .iter()
            .find(|field| field.field_name == field_name)
            .and_then(|field| field_text(&field.field_value))
    }
}

fn tag(text: &str, kind: TagKind) -> Tag {
    Tag {
        text: text.to_string(),
        kind,
    }
}

/// Flattens a table cell value into display text.
///
/// Plain strings, numbers and booleans render directly; `{ "type": "text",
/// "text": .. }` segments and arrays of segments are concatenated.
pub fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(segment_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.concat())
            }
        }
        Value::Object(_) => segment_text(value),
    }
}

fn segment_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map
            .get("text")
            .or_else(|| map.get("name"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        Value::Null => None,
        other => field_text(other),
    }
}

/// Numeric scores are clamped to 0..=100; text scores map by band.
fn parse_score(text: &str) -> u8 {
    if let Ok(number) = text.trim().parse::<f64>() {
        if number.is_finite() {
            return number.round().clamp(0.0, 100.0) as u8;
        }
    }
    let lower = text.to_lowercase();
    if text.contains('高') || lower.contains("high") {
        85
    } else if text.contains('中') || lower.contains("medium") {
        65
    } else if text.contains('低') || lower.contains("low") {
        45
    } else {
        DEFAULT_SCORE
    }
}

fn parse_band(text: &str) -> Option<RiskBand> {
    let lower = text.to_lowercase();
    if text.contains('低') || lower.contains("low") {
        Some(RiskBand::Low)
    } else if text.contains('中') || lower.contains("medium") {
        Some(RiskBand::Medium)
    } else if text.contains('高') || lower.contains("high") {
        Some(RiskBand::High)
    } else {
        None
    }
}

/// `YYYY-MM-DD` and `YYYY-MM` become `YYYY年M月`; anything else is kept.
fn format_month(text: &str) -> String {
    let text = text.trim();
    let parts: Vec<&str> = text.split('-').collect();
    let is_digits = |part: &str, len: usize| part.len() == len && part.bytes().all(|b| b.is_ascii_digit());
    let shaped = match parts.as_slice() {
        [year, month] => is_digits(year, 4) && is_digits(month, 2),
        [year, month, day] => is_digits(year, 4) && is_digits(month, 2) && is_digits(day, 2),
        _ => false,
    };
    if !shaped {
        return text.to_string();
    }
    let month: u32 = parts[1].parse().unwrap_or_default();
    format!("{}年{}月", parts[0], month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(name: &str, value: Value) -> RecordField {
        RecordField {
            field_id: format!("fld-{name}"),
            field_name: name.to_string(),
            field_value: value,
        }
    }

    #[test]
    fn maps_known_fields() {
        let record = AnalysisRecord::from_fields(
            "R1",
            1,
            vec![
                field("企业名称", json!("Acme")),
                field("综合评分", json!("高")),
                field("融资轮次", json!("C轮")),
                field("成立时间", json!("2015-03-01")),
                field("风险评级", json!("低风险")),
                field("融资热度", json!("高")),
                field("自定义", json!("kept")),
            ],
        );

        assert_eq!(record.name, "Acme");
        assert_eq!(record.score, 85);
        assert_eq!(record.financing, "C轮");
        assert_eq!(record.founded, "2015年3月");
        assert_eq!(record.risk, RiskBand::Low);
        assert_eq!(record.completeness, Completeness::Complete);
        let tags: Vec<_> = record.tags.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(tags, vec!["strong financing", "low risk"]);
        assert_eq!(record.field("自定义").as_deref(), Some("kept"));
    }

    #[test]
    fn numeric_scores_are_clamped() {
        let record = AnalysisRecord::from_fields("R1", 1, vec![field("综合评分", json!(142))]);
        assert_eq!(record.score, 100);
        let record = AnalysisRecord::from_fields("R1", 1, vec![field("综合评分", json!("72.4"))]);
        assert_eq!(record.score, 72);
    }

    #[test]
    fn defaults_apply_when_fields_are_absent() {
        let record = AnalysisRecord::from_fields("R1", 3, Vec::new());
        assert_eq!(record.rank, 3);
        assert_eq!(record.score, DEFAULT_SCORE);
        assert_eq!(record.risk, RiskBand::Medium);
        assert_eq!(record.completeness, Completeness::Missing);
        assert_eq!(record.tags[0].text, "company info");
    }

    #[test]
    fn partial_records_get_warning_tag() {
        let record = AnalysisRecord::from_fields("R1", 1, vec![field("企业名称", json!("Acme"))]);
        assert_eq!(record.completeness, Completeness::Partial);
        assert!(record.tags.iter().any(|t| t.kind == TagKind::Warning));
    }

    #[test]
    fn cell_segments_are_flattened() {
        let value = json!([{ "type": "text", "text": "Ac" }, { "type": "text", "text": "me" }]);
        assert_eq!(field_text(&value).as_deref(), Some("Acme"));
        assert_eq!(field_text(&json!({ "type": "text", "text": "x" })).as_deref(), Some("x"));
        assert_eq!(field_text(&json!(null)), None);
        assert_eq!(field_text(&json!([])), None);
    }

    #[test]
    fn month_formatting_keeps_unknown_shapes() {
        assert_eq!(format_month("2020-11"), "2020年11月");
        assert_eq!(format_month("2020年11月"), "2020年11月");
        assert_eq!(format_month("1700000000000"), "1700000000000");
    }
}
