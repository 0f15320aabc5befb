use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    AttendanceRecord, AttendanceStatus, DailyRate, DateSummary, EnrolledSubject, GlobalStats,
    StatusTier, SubjectStats, TrendDataset, TrendSeries,
};

/// Minimum attendance ratio a student must hold in every subject.
pub const ATTENDANCE_THRESHOLD: f64 = 0.75;

pub fn percentage(attended: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        attended as f64 / total as f64 * 100.0
    }
}

/// Advisory message and tier for one subject under the 75% rule.
///
/// Shortfalls round up and surpluses round down, so acting on the advice never
/// leaves the student below the threshold.
pub fn advise(total: usize, attended: usize) -> (String, StatusTier) {
    if total == 0 {
        return ("no attendance recorded yet".to_string(), StatusTier::Neutral);
    }

    let floor_line = ATTENDANCE_THRESHOLD * total as f64;
    if percentage(attended, total) < ATTENDANCE_THRESHOLD * 100.0 {
        let required = (floor_line - attended as f64).ceil() as i64;
        (
            format!("need {required} more classes to reach 75%"),
            StatusTier::Warning,
        )
    } else {
        let safe = (attended as f64 - floor_line).floor() as i64;
        (format!("can skip {safe} classes safely"), StatusTier::Ok)
    }
}

pub fn compute_subject_stats(
    enrollments: &[EnrolledSubject],
    records: &[AttendanceRecord],
) -> Vec<SubjectStats> {
    let mut counts: HashMap<Uuid, (usize, usize)> = HashMap::new();

    for record in records {
        let entry = counts.entry(record.subject_id).or_insert((0, 0));
        entry.0 += 1;
        if record.status == AttendanceStatus::Present {
            entry.1 += 1;
        }
    }

    enrollments
        .iter()
        .map(|subject| {
            let (total, attended) = counts.get(&subject.subject_id).copied().unwrap_or((0, 0));
            let (advisory_message, status_tier) = advise(total, attended);
            SubjectStats {
                subject_id: subject.subject_id,
                subject_name: subject.subject_name.clone(),
                total_classes: total,
                attended_classes: attended,
                percentage: percentage(attended, total),
                advisory_message,
                status_tier,
            }
        })
        .collect()
}

pub fn compute_global_stats(stats: &[SubjectStats]) -> GlobalStats {
    let total_held: usize = stats.iter().map(|s| s.total_classes).sum();
    let total_attended: usize = stats.iter().map(|s| s.attended_classes).sum();

    GlobalStats {
        total_subjects: stats.len(),
        total_classes_held: total_held,
        total_classes_attended: total_attended,
        overall_percentage: percentage(total_attended, total_held),
    }
}

pub fn build_trend_series(
    enrollments: &[EnrolledSubject],
    records: &[AttendanceRecord],
) -> TrendSeries {
    let labels: Vec<NaiveDate> = records
        .iter()
        .map(|r| r.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // first record wins when a (subject, date) pair was recorded twice
    let mut lookup: HashMap<(Uuid, NaiveDate), AttendanceStatus> = HashMap::new();
    for record in records {
        lookup
            .entry((record.subject_id, record.date))
            .or_insert(record.status);
    }

    let datasets = enrollments
        .iter()
        .map(|subject| TrendDataset {
            subject_id: subject.subject_id,
            label: subject.subject_name.clone(),
            points: labels
                .iter()
                .map(|date| {
                    lookup
                        .get(&(subject.subject_id, *date))
                        .map(|status| match status {
                            AttendanceStatus::Present => 1,
                            AttendanceStatus::Absent => 0,
                        })
                })
                .collect(),
        })
        .collect();

    TrendSeries { labels, datasets }
}

/// Present/absent counts per date for a class sheet, newest date first.
pub fn summarize_by_date(records: &[AttendanceRecord]) -> Vec<DateSummary> {
    let mut map: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();

    for record in records {
        let entry = map.entry(record.date).or_insert((0, 0));
        match record.status {
            AttendanceStatus::Present => entry.0 += 1,
            AttendanceStatus::Absent => entry.1 += 1,
        }
    }

    map.into_iter()
        .rev()
        .map(|(date, (present, absent))| DateSummary {
            date,
            present,
            absent,
        })
        .collect()
}

/// Share of present records per date across every subject, oldest date first.
pub fn daily_rates(records: &[AttendanceRecord]) -> Vec<DailyRate> {
    summarize_by_date(records)
        .into_iter()
        .rev()
        .map(|day| {
            let total = day.present + day.absent;
            DailyRate {
                date: day.date,
                present: day.present,
                total,
                percentage: percentage(day.present, total),
            }
        })
        .collect()
}

pub fn overall_rate(records: &[AttendanceRecord]) -> f64 {
    let present = records
        .iter()
        .filter(|r| r.status == AttendanceStatus::Present)
        .count();
    percentage(present, records.len())
}
