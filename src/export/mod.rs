// src/export/mod.rs — CSV export for accepted conversations

use crate::core::types::{ConversationScores, GeneratedConversation};
use crate::infra::errors::ConvoGenError;

pub const CSV_HEADER: &str =
    "chatlog,scenario,shift,dateTime,customerName,coherence,politeness,relevance,resolution,escalated";

/// Render accepted conversations as CSV, one row per item.
/// Score columns are empty for unevaluated items.
pub fn to_csv(items: &[GeneratedConversation]) -> String {
    let mut out = String::with_capacity(items.len() * 256);
    out.push_str(CSV_HEADER);
    out.push('\n');

    for item in items {
        let scores = item.scores;
        let row = [
            csv_field(&item.text),
            csv_field(&item.scenario),
            item.shift.as_str().to_string(),
            item.scheduled_at.to_rfc3339(),
            csv_field(&item.customer_name),
            score_field(scores, |s| s.coherence),
            score_field(scores, |s| s.politeness),
            score_field(scores, |s| s.relevance),
            score_field(scores, |s| s.resolution),
            item.escalated().to_string(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

fn score_field(scores: Option<ConversationScores>, pick: impl Fn(&ConversationScores) -> u8) -> String {
    scores.map(|s| pick(&s).to_string()).unwrap_or_default()
}

/// Quote a field when needed; internal quotes are doubled (RFC4180).
fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// One parsed CSV row, field-for-field with the export format.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub chatlog: String,
    pub scenario: String,
    pub shift: String,
    pub date_time: String,
    pub customer_name: String,
    pub coherence: Option<u8>,
    pub politeness: Option<u8>,
    pub relevance: Option<u8>,
    pub resolution: Option<u8>,
    pub escalated: bool,
}

/// Parse CSV produced by `to_csv` back into rows. Validates the header
/// and the column count of every record.
pub fn parse_csv(input: &str) -> Result<Vec<CsvRow>, ConvoGenError> {
    let records = split_records(input);
    let mut iter = records.into_iter();

    let header = iter
        .next()
        .ok_or_else(|| ConvoGenError::Export("empty CSV input".into()))?;
    if header.join(",") != CSV_HEADER {
        return Err(ConvoGenError::Export(format!(
            "unexpected header: {}",
            header.join(",")
        )));
    }

    let mut rows = Vec::new();
    for (i, record) in iter.enumerate() {
        if record.len() != 10 {
            return Err(ConvoGenError::Export(format!(
                "row {} has {} fields, expected 10",
                i + 1,
                record.len()
            )));
        }
        rows.push(CsvRow {
            chatlog: record[0].clone(),
            scenario: record[1].clone(),
            shift: record[2].clone(),
            date_time: record[3].clone(),
            customer_name: record[4].clone(),
            coherence: opt_score(&record[5]),
            politeness: opt_score(&record[6]),
            relevance: opt_score(&record[7]),
            resolution: opt_score(&record[8]),
            escalated: record[9] == "true",
        });
    }
    Ok(rows)
}

fn opt_score(field: &str) -> Option<u8> {
    if field.is_empty() {
        None
    } else {
        field.parse().ok()
    }
}

/// Split CSV text into records of unquoted fields, honoring quoted
/// fields with doubled quotes and embedded newlines.
fn split_records(input: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    // Trailing record without a final newline
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Shift;
    use chrono::{TimeZone, Utc};

    fn item(text: &str, evaluated: bool) -> GeneratedConversation {
        GeneratedConversation {
            id: "i".into(),
            text: text.into(),
            customer_name: "Dana Reyes".into(),
            scenario: "refund request".into(),
            behavior_pattern: "impatient".into(),
            shift: Shift::Evening,
            scheduled_at: Utc.with_ymd_and_hms(2026, 3, 2, 14, 30, 0).unwrap(),
            scores: evaluated.then_some(ConversationScores {
                coherence: 4,
                politeness: 5,
                relevance: 3,
                resolution: 0,
            }),
            evaluated,
        }
    }

    #[test]
    fn test_header_first_line() {
        let csv = to_csv(&[]);
        assert_eq!(csv.lines().next().unwrap(), CSV_HEADER);
    }

    #[test]
    fn test_quoting_with_commas_and_quotes() {
        let conv = item("Customer: it says \"error, try again\"\nAgent: on it", true);
        let csv = to_csv(&[conv]);
        // Doubled quotes, field wrapped
        assert!(csv.contains("\"Customer: it says \"\"error, try again\"\"\nAgent: on it\""));
    }

    #[test]
    fn test_roundtrip_evaluated() {
        let conv = item("Customer: hello, I need a refund\nAgent: sure", true);
        let rows = parse_csv(&to_csv(&[conv.clone()])).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.chatlog, conv.text);
        assert_eq!(row.scenario, "refund request");
        assert_eq!(row.shift, "evening");
        assert_eq!(row.customer_name, "Dana Reyes");
        assert_eq!(row.coherence, Some(4));
        assert_eq!(row.politeness, Some(5));
        assert_eq!(row.relevance, Some(3));
        assert_eq!(row.resolution, Some(0));
        assert!(row.escalated);
    }

    #[test]
    fn test_roundtrip_unevaluated() {
        let rows = parse_csv(&to_csv(&[item("Customer: hi", false)])).unwrap();
        let row = &rows[0];
        assert_eq!(row.coherence, None);
        assert_eq!(row.resolution, None);
        assert!(!row.escalated);
    }

    #[test]
    fn test_roundtrip_many_rows() {
        let items = vec![
            item("Customer: first, with a comma", true),
            item("Customer: second", false),
            item("Customer: \"quoted\" third", true),
        ];
        let rows = parse_csv(&to_csv(&items)).unwrap();
        assert_eq!(rows.len(), 3);
        for (row, conv) in rows.iter().zip(&items) {
            assert_eq!(row.chatlog, conv.text);
            assert_eq!(
                row.date_time,
                conv.scheduled_at.to_rfc3339()
            );
        }
    }

    #[test]
    fn test_bad_header_rejected() {
        assert!(parse_csv("a,b,c\n1,2,3\n").is_err());
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(parse_csv("").is_err());
    }

    #[test]
    fn test_wrong_field_count_rejected() {
        let bad = format!("{}\nonly,three,fields\n", CSV_HEADER);
        assert!(parse_csv(&bad).is_err());
    }
}
