use std::collections::HashSet;

use anyhow::Context;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::access::{self, Identity, Role, RoleMembership};
use crate::models::{
    AdminCounts, AttendanceRecord, AttendanceStatus, EnrolledSubject, ExportRow, LeaveRequest,
    LeaveStatus, Related, Student, Subject,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let admin_id = Uuid::parse_str("9b1f6c3e-5a0d-4c47-9d8e-2f4a6b7c8d90")?;
    let teacher_id = Uuid::parse_str("5e2c8a14-7b3f-4d6e-a1c9-0f8e7d6c5b4a")?;

    sqlx::query(
        r#"
        INSERT INTO attendance.admins (id, name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(admin_id)
    .bind("Registrar Office")
    .bind("registrar@campus.edu")
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO attendance.teachers (id, name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name
        "#,
    )
    .bind(teacher_id)
    .bind("Dr. Imani Okafor")
    .bind("imani.okafor@campus.edu")
    .execute(pool)
    .await?;

    let students = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Avery Lee",
            "avery.lee@campus.edu",
            "CS-2026-01",
            2,
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Jules Moreno",
            "jules.moreno@campus.edu",
            "CS-2026-02",
            2,
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara Patel",
            "kiara.patel@campus.edu",
            "CS-2026-03",
            2,
        ),
    ];

    for (id, name, email, roll_no, year) in &students {
        sqlx::query(
            r#"
            INSERT INTO attendance.students (id, name, email, roll_no, year)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name, roll_no = EXCLUDED.roll_no, year = EXCLUDED.year
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(roll_no)
        .bind(year)
        .execute(pool)
        .await?;
    }

    let subjects = vec![
        (
            Uuid::parse_str("a4c1e2f3-0b9d-4e8a-8f7c-6d5e4b3a2c10")?,
            "Data Structures",
        ),
        (
            Uuid::parse_str("b7d2f3a4-1c0e-4f9b-9a8d-7e6f5c4b3d21")?,
            "Operating Systems",
        ),
    ];

    for (id, name) in &subjects {
        sqlx::query(
            r#"
            INSERT INTO attendance.subjects (id, name, teacher_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(teacher_id)
        .execute(pool)
        .await?;

        for (student_id, ..) in &students {
            sqlx::query(
                r#"
                INSERT INTO attendance.enrollments (id, student_id, subject_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (student_id, subject_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(student_id)
            .bind(id)
            .execute(pool)
            .await?;
        }
    }

    let already_seeded: i64 =
        sqlx::query("SELECT COUNT(*) AS count FROM attendance.records WHERE subject_id = $1")
            .bind(subjects[0].0)
            .fetch_one(pool)
            .await?
            .get("count");
    if already_seeded > 0 {
        log::info!("attendance records already seeded, skipping");
        return Ok(());
    }

    let first_day = NaiveDate::from_ymd_opt(2026, 2, 2).context("invalid date")?;
    // (student index, subject index, session offset) marked absent
    let absences: &[(usize, usize, i64)] = &[
        (0, 0, 1),
        (0, 0, 3),
        (1, 1, 0),
        (1, 1, 1),
        (1, 1, 2),
        (2, 0, 4),
    ];

    let mut tx = pool.begin().await?;
    for (subject_index, (subject_id, _)) in subjects.iter().enumerate() {
        for offset in 0..5i64 {
            let date = first_day + Duration::days(offset * 2 + subject_index as i64);
            for (student_index, (student_id, ..)) in students.iter().enumerate() {
                let status = if absences.contains(&(student_index, subject_index, offset)) {
                    AttendanceStatus::Absent
                } else {
                    AttendanceStatus::Present
                };
                insert_record(&mut *tx, *subject_id, *student_id, date, status).await?;
            }
        }
    }
    tx.commit().await?;

    Ok(())
}

async fn insert_record<'e, E>(
    executor: E,
    subject_id: Uuid,
    student_id: Uuid,
    date: NaiveDate,
    status: AttendanceStatus,
) -> anyhow::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO attendance.records (id, student_id, subject_id, date, status)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(subject_id)
    .bind(date)
    .bind(status.as_str())
    .execute(executor)
    .await?;
    Ok(())
}

fn record_from_row(row: &PgRow) -> anyhow::Result<AttendanceRecord> {
    let status: String = row.get("status");
    Ok(AttendanceRecord {
        subject_id: row.get("subject_id"),
        student_id: row.get("student_id"),
        date: row.get("date"),
        status: status.parse()?,
    })
}

pub async fn role_membership(pool: &PgPool, id: Uuid) -> anyhow::Result<RoleMembership> {
    let row = sqlx::query(
        r#"
        SELECT
            EXISTS (SELECT 1 FROM attendance.admins WHERE id = $1) AS is_admin,
            EXISTS (SELECT 1 FROM attendance.teachers WHERE id = $1) AS is_teacher,
            EXISTS (SELECT 1 FROM attendance.students WHERE id = $1) AS is_student
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(RoleMembership {
        admin: row.get("is_admin"),
        teacher: row.get("is_teacher"),
        student: row.get("is_student"),
    })
}

/// Resolves the caller once and rejects it unless it holds `required`.
pub async fn require_role(
    pool: &PgPool,
    caller: Option<Uuid>,
    required: Role,
) -> anyhow::Result<Identity> {
    let membership = match caller {
        Some(id) => role_membership(pool, id).await?,
        None => RoleMembership::default(),
    };
    let identity = access::authorize(caller, membership, required)?;
    log::debug!("authorized {} as {}", identity.id, identity.role);
    Ok(identity)
}

pub async fn create_teacher(pool: &PgPool, name: &str, email: &str) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO attendance.teachers (id, name, email) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(email)
        .execute(pool)
        .await
        .with_context(|| format!("failed to create teacher {email}"))?;
    log::info!("created teacher {id} ({email})");
    Ok(id)
}

pub async fn create_student(
    pool: &PgPool,
    name: &str,
    email: &str,
    roll_no: &str,
    year: i32,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO attendance.students (id, name, email, roll_no, year)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(roll_no)
    .bind(year)
    .execute(pool)
    .await
    .with_context(|| format!("failed to create student {roll_no}"))?;
    log::info!("created student {id} ({roll_no})");
    Ok(id)
}

pub async fn create_subject(
    pool: &PgPool,
    name: &str,
    teacher_id: Option<Uuid>,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO attendance.subjects (id, name, teacher_id) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(teacher_id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to create subject {name}"))?;
    log::info!("created subject {id} ({name})");
    Ok(id)
}

pub async fn enroll(pool: &PgPool, student_id: Uuid, subject_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance.enrollments (id, student_id, subject_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (student_id, subject_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(subject_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn unenroll(pool: &PgPool, student_id: Uuid, subject_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "DELETE FROM attendance.enrollments WHERE student_id = $1 AND subject_id = $2",
    )
    .bind(student_id)
    .bind(subject_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Clone, Copy)]
pub enum Entity {
    Teacher,
    Student,
    Subject,
}

impl Entity {
    fn table(self) -> &'static str {
        match self {
            Entity::Teacher => "attendance.teachers",
            Entity::Student => "attendance.students",
            Entity::Subject => "attendance.subjects",
        }
    }
}

pub async fn delete_entity(pool: &PgPool, entity: Entity, id: Uuid) -> anyhow::Result<bool> {
    let query = format!("DELETE FROM {} WHERE id = $1", entity.table());
    let result = sqlx::query(&query).bind(id).execute(pool).await?;
    if result.rows_affected() > 0 {
        log::info!("deleted {} {id}", entity.table());
    }
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_student(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Student>> {
    let row = sqlx::query(
        "SELECT id, name, email, roll_no, year FROM attendance.students WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| student_from_row(&row)))
}

fn student_from_row(row: &PgRow) -> Student {
    Student {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        roll_no: row.get("roll_no"),
        year: row.get("year"),
    }
}

pub async fn fetch_enrolled_subjects(
    pool: &PgPool,
    student_id: Uuid,
) -> anyhow::Result<Vec<EnrolledSubject>> {
    let rows = sqlx::query(
        r#"
        SELECT s.id, s.name
        FROM attendance.enrollments e
        JOIN attendance.subjects s ON s.id = e.subject_id
        WHERE e.student_id = $1
        ORDER BY s.name
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| EnrolledSubject {
            subject_id: row.get("id"),
            subject_name: row.get("name"),
        })
        .collect())
}

pub async fn fetch_student_records(
    pool: &PgPool,
    student_id: Uuid,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT subject_id, student_id, date, status
        FROM attendance.records
        WHERE student_id = $1
        ORDER BY date
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

pub async fn fetch_teacher_subjects(
    pool: &PgPool,
    teacher_id: Uuid,
) -> anyhow::Result<Vec<Subject>> {
    let rows = sqlx::query(
        "SELECT id, name, teacher_id FROM attendance.subjects WHERE teacher_id = $1 ORDER BY name",
    )
    .bind(teacher_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Subject {
            id: row.get("id"),
            name: row.get("name"),
            teacher_id: row.get("teacher_id"),
        })
        .collect())
}

pub async fn ensure_teaches(
    pool: &PgPool,
    teacher: &Identity,
    subject_id: Uuid,
) -> anyhow::Result<()> {
    let teaches: bool = sqlx::query(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM attendance.subjects WHERE id = $1 AND teacher_id = $2
        ) AS teaches
        "#,
    )
    .bind(subject_id)
    .bind(teacher.id)
    .fetch_one(pool)
    .await?
    .get("teaches");

    anyhow::ensure!(teaches, "subject {subject_id} is not taught by {}", teacher.id);
    Ok(())
}

pub async fn fetch_class_roster(pool: &PgPool, subject_id: Uuid) -> anyhow::Result<Vec<Student>> {
    let rows = sqlx::query(
        r#"
        SELECT st.id, st.name, st.email, st.roll_no, st.year
        FROM attendance.enrollments e
        JOIN attendance.students st ON st.id = e.student_id
        WHERE e.subject_id = $1
        ORDER BY st.roll_no
        "#,
    )
    .bind(subject_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(student_from_row).collect())
}

/// Builds one session's sheet: every enrolled student is Present unless listed absent.
/// Listed roll numbers are trimmed; blanks and repeats are ignored.
pub fn session_records(
    subject_id: Uuid,
    date: NaiveDate,
    roster: &[Student],
    absent_roll_nos: &[String],
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let absent: HashSet<&str> = absent_roll_nos
        .iter()
        .map(|roll_no| roll_no.trim())
        .filter(|roll_no| !roll_no.is_empty())
        .collect();

    for roll_no in &absent {
        anyhow::ensure!(
            roster.iter().any(|s| s.roll_no == *roll_no),
            "roll number {roll_no} is not enrolled in subject {subject_id}"
        );
    }

    Ok(roster
        .iter()
        .map(|student| AttendanceRecord {
            subject_id,
            student_id: student.id,
            date,
            status: if absent.contains(student.roll_no.as_str()) {
                AttendanceStatus::Absent
            } else {
                AttendanceStatus::Present
            },
        })
        .collect())
}

/// Records one class session: every row lands or none do.
pub async fn insert_attendance_batch(
    pool: &PgPool,
    records: &[AttendanceRecord],
) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;
    for record in records {
        insert_record(
            &mut *tx,
            record.subject_id,
            record.student_id,
            record.date,
            record.status,
        )
        .await?;
    }
    tx.commit().await?;
    log::info!("inserted {} attendance records", records.len());
    Ok(records.len())
}

pub async fn fetch_subject_records(
    pool: &PgPool,
    subject_id: Uuid,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT subject_id, student_id, date, status
        FROM attendance.records
        WHERE subject_id = $1
        ORDER BY date DESC
        "#,
    )
    .bind(subject_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

pub async fn fetch_all_records(pool: &PgPool) -> anyhow::Result<Vec<AttendanceRecord>> {
    let rows = sqlx::query("SELECT subject_id, student_id, date, status FROM attendance.records")
        .fetch_all(pool)
        .await?;

    rows.iter().map(record_from_row).collect()
}

pub async fn fetch_export_rows(
    pool: &PgPool,
    subject_id: Uuid,
    date: Option<NaiveDate>,
) -> anyhow::Result<Vec<ExportRow>> {
    let mut query = String::from(
        "SELECT r.date, r.status, st.roll_no, st.name \
         FROM attendance.records r \
         JOIN attendance.students st ON st.id = r.student_id \
         WHERE r.subject_id = $1",
    );

    if date.is_some() {
        query.push_str(" AND r.date = $2");
    }
    query.push_str(" ORDER BY r.date DESC, st.roll_no");

    let mut rows = sqlx::query(&query).bind(subject_id);
    if let Some(value) = date {
        rows = rows.bind(value);
    }

    let mut export = Vec::new();
    for row in rows.fetch_all(pool).await? {
        let status: String = row.get("status");
        export.push(ExportRow {
            date: row.get("date"),
            roll_no: row.get("roll_no"),
            student_name: row.get("name"),
            status: status.parse()?,
        });
    }

    Ok(export)
}

pub async fn apply_leave(
    pool: &PgPool,
    student_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: &str,
) -> anyhow::Result<Uuid> {
    anyhow::ensure!(
        end_date >= start_date,
        "leave ends ({end_date}) before it starts ({start_date})"
    );

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO attendance.leaves (id, student_id, start_date, end_date, reason, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(student_id)
    .bind(start_date)
    .bind(end_date)
    .bind(reason)
    .bind(LeaveStatus::Pending.as_str())
    .execute(pool)
    .await?;
    log::info!("student {student_id} applied for leave {id}");
    Ok(id)
}

pub async fn fetch_leaves(
    pool: &PgPool,
    student_id: Option<Uuid>,
) -> anyhow::Result<Vec<LeaveRequest>> {
    let mut query = String::from(
        "SELECT l.id, l.start_date, l.end_date, l.reason, l.status, l.teacher_note, l.created_at, \
         st.name, st.roll_no \
         FROM attendance.leaves l \
         JOIN attendance.students st ON st.id = l.student_id",
    );
    if student_id.is_some() {
        query.push_str(" WHERE l.student_id = $1");
    }
    query.push_str(" ORDER BY l.created_at DESC");

    let mut rows = sqlx::query(&query);
    if let Some(value) = student_id {
        rows = rows.bind(value);
    }

    let mut leaves = Vec::new();
    for row in rows.fetch_all(pool).await? {
        let status: String = row.get("status");
        leaves.push(LeaveRequest {
            id: row.get("id"),
            student_name: row.get("name"),
            roll_no: row.get("roll_no"),
            start_date: row.get("start_date"),
            end_date: row.get("end_date"),
            reason: row.get("reason"),
            status: status.parse()?,
            teacher_note: row.get("teacher_note"),
            created_at: row.get("created_at"),
        });
    }

    Ok(leaves)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    Settled,
    AlreadyDecided(LeaveStatus),
    NotFound,
}

fn classify_review(
    rows_updated: u64,
    current_status: Option<&str>,
) -> anyhow::Result<ReviewOutcome> {
    if rows_updated > 0 {
        return Ok(ReviewOutcome::Settled);
    }
    match current_status {
        Some(status) => Ok(ReviewOutcome::AlreadyDecided(status.parse()?)),
        None => Ok(ReviewOutcome::NotFound),
    }
}

/// Settles a pending leave request. Decided or missing requests are left untouched.
pub async fn review_leave(
    pool: &PgPool,
    leave_id: Uuid,
    decision: LeaveStatus,
    note: Option<&str>,
) -> anyhow::Result<ReviewOutcome> {
    anyhow::ensure!(
        decision != LeaveStatus::Pending,
        "a review must approve or reject the request"
    );

    let result = sqlx::query(
        r#"
        UPDATE attendance.leaves
        SET status = $2, teacher_note = $3
        WHERE id = $1 AND status = $4
        "#,
    )
    .bind(leave_id)
    .bind(decision.as_str())
    .bind(note)
    .bind(LeaveStatus::Pending.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        log::info!("leave {leave_id} marked {decision}");
        return classify_review(result.rows_affected(), None);
    }

    let current: Option<String> =
        sqlx::query("SELECT status FROM attendance.leaves WHERE id = $1")
            .bind(leave_id)
            .fetch_optional(pool)
            .await?
            .map(|row| row.get("status"));

    classify_review(0, current.as_deref())
}

pub async fn fetch_admin_counts(pool: &PgPool) -> anyhow::Result<AdminCounts> {
    let row = sqlx::query(
        r#"
        SELECT
            (SELECT COUNT(*) FROM attendance.students) AS students,
            (SELECT COUNT(*) FROM attendance.teachers) AS teachers,
            (SELECT COUNT(*) FROM attendance.subjects) AS subjects
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(AdminCounts {
        students: row.get("students"),
        teachers: row.get("teachers"),
        subjects: row.get("subjects"),
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StudentRef {
    pub roll_no: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One attendance row of a hosted-backend JSON export with its student join.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportedAttendance {
    pub subject_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub students: Option<Related<StudentRef>>,
}

pub fn parse_json_export(
    raw: &str,
) -> anyhow::Result<Vec<(ExportedAttendance, Option<StudentRef>)>> {
    let rows: Vec<ExportedAttendance> =
        serde_json::from_str(raw).context("attendance export is not a JSON array of rows")?;

    Ok(rows
        .into_iter()
        .map(|mut row| {
            let student = row.students.take().and_then(Related::into_single);
            (row, student)
        })
        .collect())
}

pub async fn import_json(pool: &PgPool, path: &std::path::Path) -> anyhow::Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let rows = parse_json_export(&raw)?;

    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for (row, student) in rows {
        let Some(student) = student else {
            log::warn!("skipping {} row on {} without a student", row.subject_id, row.date);
            continue;
        };

        let student_id: Option<Uuid> =
            sqlx::query("SELECT id FROM attendance.students WHERE roll_no = $1")
                .bind(&student.roll_no)
                .fetch_optional(&mut *tx)
                .await?
                .map(|r| r.get("id"));

        let Some(student_id) = student_id else {
            log::warn!("skipping row for unknown roll number {}", student.roll_no);
            continue;
        };

        insert_record(&mut *tx, row.subject_id, student_id, row.date, row.status).await?;
        inserted += 1;
    }

    tx.commit().await?;
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Student> {
        ["CS-2026-01", "CS-2026-02", "CS-2026-03"]
            .iter()
            .map(|roll_no| Student {
                id: Uuid::new_v4(),
                name: format!("Student {roll_no}"),
                email: format!("{roll_no}@campus.edu"),
                roll_no: roll_no.to_string(),
                year: 2,
            })
            .collect()
    }

    #[test]
    fn session_defaults_to_present() {
        let subject_id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        let roster = roster();

        let records =
            session_records(subject_id, date, &roster, &["CS-2026-02".to_string()]).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].status, AttendanceStatus::Present);
        assert_eq!(records[1].status, AttendanceStatus::Absent);
        assert_eq!(records[1].student_id, roster[1].id);
        assert!(records.iter().all(|r| r.subject_id == subject_id && r.date == date));
    }

    #[test]
    fn session_trims_and_deduplicates_absentees() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        let absent = vec![
            "CS-2026-01".to_string(),
            " CS-2026-03".to_string(),
            "CS-2026-01".to_string(),
            "".to_string(),
        ];

        let records = session_records(Uuid::new_v4(), date, &roster(), &absent).unwrap();
        let statuses: Vec<AttendanceStatus> = records.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                AttendanceStatus::Absent,
                AttendanceStatus::Present,
                AttendanceStatus::Absent,
            ]
        );
        let absentees = records
            .iter()
            .filter(|r| r.status == AttendanceStatus::Absent)
            .count();
        assert_eq!(absentees, 2);
    }

    #[test]
    fn review_distinguishes_missing_from_decided() {
        assert_eq!(classify_review(1, None).unwrap(), ReviewOutcome::Settled);
        assert_eq!(
            classify_review(0, Some("Approved")).unwrap(),
            ReviewOutcome::AlreadyDecided(LeaveStatus::Approved)
        );
        assert_eq!(classify_review(0, None).unwrap(), ReviewOutcome::NotFound);
        assert!(classify_review(0, Some("Lost")).is_err());
    }

    #[test]
    fn session_rejects_unknown_roll_numbers() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        let result = session_records(Uuid::new_v4(), date, &roster(), &["CS-1999-99".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn json_export_normalizes_student_relation() {
        let raw = r#"[
            {"subject_id": "a4c1e2f3-0b9d-4e8a-8f7c-6d5e4b3a2c10", "date": "2026-02-02",
             "status": "Present", "students": {"roll_no": "CS-2026-01", "name": "Avery Lee"}},
            {"subject_id": "a4c1e2f3-0b9d-4e8a-8f7c-6d5e4b3a2c10", "date": "2026-02-02",
             "status": "Absent", "students": [{"roll_no": "CS-2026-02"}]},
            {"subject_id": "a4c1e2f3-0b9d-4e8a-8f7c-6d5e4b3a2c10", "date": "2026-02-03",
             "status": "Present", "students": null}
        ]"#;

        let rows = parse_json_export(raw).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].1.as_ref().unwrap().roll_no, "CS-2026-01");
        assert_eq!(rows[1].0.status, AttendanceStatus::Absent);
        assert_eq!(rows[1].1.as_ref().unwrap().roll_no, "CS-2026-02");
        assert!(rows[1].1.as_ref().unwrap().name.is_none());
        assert!(rows[2].1.is_none());
    }

    #[test]
    fn json_export_rejects_non_arrays() {
        assert!(parse_json_export(r#"{"subject_id": "x"}"#).is_err());
    }
}
