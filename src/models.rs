use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "present" | "p" => Ok(AttendanceStatus::Present),
            "absent" | "a" => Ok(AttendanceStatus::Absent),
            other => anyhow::bail!("unknown attendance status `{other}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub subject_id: Uuid,
    pub student_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

/// A subject the student is enrolled in, already joined with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolledSubject {
    pub subject_id: Uuid,
    pub subject_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTier {
    Neutral,
    Warning,
    Ok,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectStats {
    pub subject_id: Uuid,
    pub subject_name: String,
    pub total_classes: usize,
    pub attended_classes: usize,
    pub percentage: f64,
    pub advisory_message: String,
    pub status_tier: StatusTier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalStats {
    pub total_subjects: usize,
    pub total_classes_held: usize,
    pub total_classes_attended: usize,
    pub overall_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendDataset {
    pub subject_id: Uuid,
    pub label: String,
    /// 1 for Present, 0 for Absent, `None` when the subject held no class that day.
    pub points: Vec<Option<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub labels: Vec<NaiveDate>,
    pub datasets: Vec<TrendDataset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateSummary {
    pub date: NaiveDate,
    pub present: usize,
    pub absent: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRate {
    pub date: NaiveDate,
    pub present: usize,
    pub total: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roll_no: String,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub teacher_id: Option<Uuid>,
}

/// One row of a class attendance sheet as handed to the spreadsheet export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Roll No")]
    pub roll_no: String,
    #[serde(rename = "Student Name")]
    pub student_name: String,
    #[serde(rename = "Status")]
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeaveStatus::Pending => "Pending",
            LeaveStatus::Approved => "Approved",
            LeaveStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaveStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(LeaveStatus::Pending),
            "approved" => Ok(LeaveStatus::Approved),
            "rejected" => Ok(LeaveStatus::Rejected),
            other => anyhow::bail!("unknown leave status `{other}`"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaveRequest {
    pub id: Uuid,
    pub student_name: String,
    pub roll_no: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub teacher_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminCounts {
    pub students: i64,
    pub teachers: i64,
    pub subjects: i64,
}

/// A joined relation as the hosted backend returns it: a single row for a
/// to-one foreign key, or a list when the join shape is ambiguous.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Related<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Related<T> {
    /// Exactly one related row is expected; a collection yields its first element.
    pub fn into_single(self) -> Option<T> {
        match self {
            Related::One(value) => Some(value),
            Related::Many(values) => values.into_iter().next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct StudentRef {
        name: String,
        roll_no: String,
    }

    #[test]
    fn related_object_passes_through() {
        let related: Related<StudentRef> =
            serde_json::from_str(r#"{"name": "Avery Lee", "roll_no": "CS-01"}"#).unwrap();
        let student = related.into_single().unwrap();
        assert_eq!(student.roll_no, "CS-01");
    }

    #[test]
    fn related_array_takes_first_row() {
        let related: Related<StudentRef> = serde_json::from_str(
            r#"[
                {"name": "Jules Moreno", "roll_no": "CS-02"},
                {"name": "Kiara Patel", "roll_no": "CS-03"}
            ]"#,
        )
        .unwrap();
        assert_eq!(related.into_single().unwrap().name, "Jules Moreno");
    }

    #[test]
    fn related_empty_array_is_none() {
        let related: Related<StudentRef> = serde_json::from_str("[]").unwrap();
        assert!(related.into_single().is_none());
    }

    #[test]
    fn statuses_parse_case_insensitively() {
        assert_eq!("present".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Present);
        assert_eq!(" ABSENT ".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Absent);
        assert!("late".parse::<AttendanceStatus>().is_err());
        assert_eq!("Approved".parse::<LeaveStatus>().unwrap(), LeaveStatus::Approved);
        assert!("maybe".parse::<LeaveStatus>().is_err());
    }
}
