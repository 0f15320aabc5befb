use std::fmt::Write;
use std::path::Path;

use anyhow::Context;

use crate::models::{
    DailyRate, DateSummary, ExportRow, GlobalStats, LeaveRequest, LeaveStatus, StatusTier,
    Student, SubjectStats, TrendSeries,
};

fn tier_marker(tier: StatusTier) -> &'static str {
    match tier {
        StatusTier::Neutral => "·",
        StatusTier::Warning => "!",
        StatusTier::Ok => "✓",
    }
}

pub fn build_dashboard_report(
    student: Option<&Student>,
    stats: &[SubjectStats],
    global: &GlobalStats,
    trend: &TrendSeries,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Dashboard");
    if let Some(student) = student {
        let _ = writeln!(output, "Prepared for {} ({})", student.name, student.roll_no);
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(
        output,
        "- Overall attendance: {:.1}%",
        global.overall_percentage
    );
    let _ = writeln!(
        output,
        "- Classes attended: {} of {}",
        global.total_classes_attended, global.total_classes_held
    );
    let _ = writeln!(output, "- Subjects: {}", global.total_subjects);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");

    if stats.is_empty() {
        let _ = writeln!(output, "Not enrolled in any subjects.");
    } else {
        for stat in stats {
            let _ = writeln!(
                output,
                "- [{}] {}: {:.1}% ({} / {} attended), {}",
                tier_marker(stat.status_tier),
                stat.subject_name,
                stat.percentage,
                stat.attended_classes,
                stat.total_classes,
                stat.advisory_message
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Trend");
    let _ = write!(output, "{}", render_trend_table(trend));

    output
}

/// One row per date, one column per subject; blank cells mean no class was held.
pub fn render_trend_table(trend: &TrendSeries) -> String {
    let mut output = String::new();

    if trend.labels.is_empty() {
        let _ = writeln!(output, "No attendance recorded yet.");
        return output;
    }

    let _ = write!(output, "| Date |");
    for dataset in &trend.datasets {
        let _ = write!(output, " {} |", dataset.label);
    }
    let _ = writeln!(output);
    let _ = write!(output, "| --- |");
    for _ in &trend.datasets {
        let _ = write!(output, " --- |");
    }
    let _ = writeln!(output);

    for (index, date) in trend.labels.iter().enumerate() {
        let _ = write!(output, "| {date} |");
        for dataset in &trend.datasets {
            let cell = match dataset.points.get(index).copied().flatten() {
                Some(1) => "Present",
                Some(_) => "Absent",
                None => "",
            };
            let _ = write!(output, " {cell} |");
        }
        let _ = writeln!(output);
    }

    output
}

pub fn render_daily_rates(rates: &[DailyRate]) -> String {
    let mut output = String::new();

    if rates.is_empty() {
        let _ = writeln!(output, "No attendance recorded yet.");
        return output;
    }

    for rate in rates {
        let _ = writeln!(
            output,
            "- {}: {:.1}% ({} of {} present)",
            rate.date, rate.percentage, rate.present, rate.total
        );
    }

    output
}

pub fn write_sheet_csv(path: &Path, rows: &[ExportRow]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_summary_csv(path: &Path, summaries: &[DateSummary]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(["Date", "Present Count", "Absent Count"])?;
    for summary in summaries {
        writer.write_record([
            summary.date.to_string(),
            summary.present.to_string(),
            summary.absent.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Narrows a leave list by status and by a case-insensitive name or roll number match.
pub fn filter_leaves(
    leaves: Vec<LeaveRequest>,
    status: Option<LeaveStatus>,
    search: Option<&str>,
) -> Vec<LeaveRequest> {
    let needle = search
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty());

    leaves
        .into_iter()
        .filter(|leave| status.map_or(true, |wanted| leave.status == wanted))
        .filter(|leave| match &needle {
            Some(term) => {
                leave.student_name.to_lowercase().contains(term)
                    || leave.roll_no.to_lowercase().contains(term)
            }
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceStatus, TrendDataset};
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, day).unwrap()
    }

    fn leave(name: &str, roll_no: &str, status: LeaveStatus) -> LeaveRequest {
        LeaveRequest {
            id: Uuid::new_v4(),
            student_name: name.to_string(),
            roll_no: roll_no.to_string(),
            start_date: date(1),
            end_date: date(2),
            reason: "family event".to_string(),
            status,
            teacher_note: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn trend_table_leaves_blank_cells_for_gaps() {
        let trend = TrendSeries {
            labels: vec![date(1), date(2)],
            datasets: vec![
                TrendDataset {
                    subject_id: Uuid::new_v4(),
                    label: "Networks".to_string(),
                    points: vec![Some(1), None],
                },
                TrendDataset {
                    subject_id: Uuid::new_v4(),
                    label: "Compilers".to_string(),
                    points: vec![Some(0), Some(1)],
                },
            ],
        };

        let table = render_trend_table(&trend);
        assert!(table.contains("| Date | Networks | Compilers |"));
        assert!(table.contains("| 2026-04-01 | Present | Absent |"));
        assert!(table.contains("| 2026-04-02 |  | Present |"));
    }

    #[test]
    fn dashboard_mentions_every_subject() {
        let stats = vec![SubjectStats {
            subject_id: Uuid::new_v4(),
            subject_name: "Networks".to_string(),
            total_classes: 4,
            attended_classes: 2,
            percentage: 50.0,
            advisory_message: "need 1 more classes to reach 75%".to_string(),
            status_tier: StatusTier::Warning,
        }];
        let global = GlobalStats {
            total_subjects: 1,
            total_classes_held: 4,
            total_classes_attended: 2,
            overall_percentage: 50.0,
        };
        let trend = TrendSeries {
            labels: Vec::new(),
            datasets: Vec::new(),
        };

        let report = build_dashboard_report(None, &stats, &global, &trend);
        assert!(report.contains("Overall attendance: 50.0%"));
        assert!(report.contains(
            "- [!] Networks: 50.0% (2 / 4 attended), need 1 more classes to reach 75%"
        ));
        assert!(report.contains("No attendance recorded yet."));
    }

    #[test]
    fn sheet_export_uses_spreadsheet_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.csv");
        let rows = vec![ExportRow {
            date: date(3),
            roll_no: "CS-2026-01".to_string(),
            student_name: "Avery Lee".to_string(),
            status: AttendanceStatus::Present,
        }];

        write_sheet_csv(&path, &rows).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let mut lines = written.lines();
        assert_eq!(lines.next(), Some("Date,Roll No,Student Name,Status"));
        assert_eq!(lines.next(), Some("2026-04-03,CS-2026-01,Avery Lee,Present"));
    }

    #[test]
    fn summary_export_lists_counts_per_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let summaries = vec![DateSummary {
            date: date(5),
            present: 27,
            absent: 3,
        }];

        write_summary_csv(&path, &summaries).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines, vec!["Date,Present Count,Absent Count", "2026-04-05,27,3"]);
    }

    #[test]
    fn leaves_filter_by_status_and_search() {
        let leaves = vec![
            leave("Avery Lee", "CS-2026-01", LeaveStatus::Pending),
            leave("Jules Moreno", "CS-2026-02", LeaveStatus::Approved),
            leave("Kiara Patel", "EE-2026-07", LeaveStatus::Pending),
        ];

        let pending = filter_leaves(leaves.clone(), Some(LeaveStatus::Pending), None);
        assert_eq!(pending.len(), 2);

        let by_roll = filter_leaves(leaves.clone(), None, Some("ee-2026"));
        assert_eq!(by_roll.len(), 1);
        assert_eq!(by_roll[0].student_name, "Kiara Patel");

        let by_name = filter_leaves(leaves.clone(), Some(LeaveStatus::Pending), Some("JULES"));
        assert!(by_name.is_empty());

        assert_eq!(filter_leaves(leaves, None, Some("  ")).len(), 3);
    }
}
