use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

mod access;
mod config;
mod db;
mod models;
mod report;
mod stats;

use access::Role;
use models::LeaveStatus;

#[derive(Parser)]
#[command(name = "attendance-tracker")]
#[command(about = "Role-based class attendance tracker", long_about = None)]
struct Cli {
    /// Identity to act as
    #[arg(long = "as", global = true, env = "ATTENDANCE_USER_ID")]
    caller: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Manage people, subjects and enrollments
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
    /// Take attendance and review leave requests
    Teacher {
        #[command(subcommand)]
        command: TeacherCommand,
    },
    /// View attendance and apply for leave
    Student {
        #[command(subcommand)]
        command: StudentCommand,
    },
    /// Import attendance rows from a hosted-backend JSON export
    ImportJson {
        #[arg(long)]
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum AdminCommand {
    AddTeacher {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    RemoveTeacher {
        id: Uuid,
    },
    AddStudent {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        roll_no: String,
        #[arg(long)]
        year: i32,
    },
    RemoveStudent {
        id: Uuid,
    },
    AddSubject {
        #[arg(long)]
        name: String,
        #[arg(long)]
        teacher: Option<Uuid>,
    },
    RemoveSubject {
        id: Uuid,
    },
    Enroll {
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        subject: Uuid,
    },
    Unenroll {
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        subject: Uuid,
    },
    /// Institution-wide counts and daily attendance rates
    Overview,
    Leaves {
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Subcommand)]
enum TeacherCommand {
    /// List the subjects you teach
    Subjects,
    /// Record today's session; everyone is present unless listed
    Mark {
        #[arg(long)]
        subject: Uuid,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, value_delimiter = ',')]
        absent: Vec<String>,
    },
    /// Per-date present/absent counts for a subject
    History {
        #[arg(long)]
        subject: Uuid,
        /// Write the full sheet (date, roll no, name, status) as CSV
        #[arg(long)]
        export: Option<PathBuf>,
        /// Write the per-date counts as CSV
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Attendance detail for one session
    Day {
        #[arg(long)]
        subject: Uuid,
        #[arg(long)]
        date: NaiveDate,
    },
    Leaves {
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
        #[arg(long)]
        search: Option<String>,
    },
    ReviewLeave {
        id: Uuid,
        #[arg(long, value_enum)]
        decision: Decision,
        #[arg(long)]
        note: Option<String>,
    },
}

#[derive(Subcommand)]
enum StudentCommand {
    /// Per-subject attendance with 75% rule advisories
    Dashboard {
        #[arg(long)]
        json: bool,
        /// Write a markdown copy of the dashboard
        #[arg(long)]
        out: Option<PathBuf>,
    },
    ApplyLeave {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        reason: String,
    },
    Leaves,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusFilter {
    Pending,
    Approved,
    Rejected,
}

impl From<StatusFilter> for LeaveStatus {
    fn from(value: StatusFilter) -> Self {
        match value {
            StatusFilter::Pending => LeaveStatus::Pending,
            StatusFilter::Approved => LeaveStatus::Approved,
            StatusFilter::Rejected => LeaveStatus::Rejected,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Decision {
    Approve,
    Reject,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = config::Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportJson { path } => {
            db::require_role(&pool, cli.caller, Role::Admin).await?;
            let inserted = db::import_json(&pool, &path).await?;
            println!("Inserted {inserted} attendance records from {}.", path.display());
        }
        Commands::Admin { command } => {
            db::require_role(&pool, cli.caller, Role::Admin).await?;
            run_admin(&pool, command).await?;
        }
        Commands::Teacher { command } => {
            let teacher = db::require_role(&pool, cli.caller, Role::Teacher).await?;
            run_teacher(&pool, &teacher, command).await?;
        }
        Commands::Student { command } => {
            let student = db::require_role(&pool, cli.caller, Role::Student).await?;
            run_student(&pool, &student, command).await?;
        }
    }

    Ok(())
}

async fn run_admin(pool: &PgPool, command: AdminCommand) -> anyhow::Result<()> {
    match command {
        AdminCommand::AddTeacher { name, email } => {
            let id = db::create_teacher(pool, &name, &email).await?;
            println!("Teacher created: {id}");
        }
        AdminCommand::AddStudent {
            name,
            email,
            roll_no,
            year,
        } => {
            let id = db::create_student(pool, &name, &email, &roll_no, year).await?;
            println!("Student created: {id}");
        }
        AdminCommand::AddSubject { name, teacher } => {
            let id = db::create_subject(pool, &name, teacher).await?;
            println!("Subject created: {id}");
        }
        AdminCommand::RemoveTeacher { id } => {
            report_deleted("Teacher", db::delete_entity(pool, db::Entity::Teacher, id).await?)
        }
        AdminCommand::RemoveStudent { id } => {
            report_deleted("Student", db::delete_entity(pool, db::Entity::Student, id).await?)
        }
        AdminCommand::RemoveSubject { id } => {
            report_deleted("Subject", db::delete_entity(pool, db::Entity::Subject, id).await?)
        }
        AdminCommand::Enroll { student, subject } => {
            if db::enroll(pool, student, subject).await? {
                println!("Enrollment created.");
            } else {
                println!("Student is already enrolled in that subject.");
            }
        }
        AdminCommand::Unenroll { student, subject } => {
            report_deleted("Enrollment", db::unenroll(pool, student, subject).await?)
        }
        AdminCommand::Overview => {
            let counts = db::fetch_admin_counts(pool).await?;
            let records = db::fetch_all_records(pool).await?;

            println!("Students: {}", counts.students);
            println!("Teachers: {}", counts.teachers);
            println!("Subjects: {}", counts.subjects);
            println!("Attendance rows: {}", records.len());
            println!("Average attendance: {:.1}%", stats::overall_rate(&records));
            println!();
            println!("Daily attendance:");
            print!("{}", report::render_daily_rates(&stats::daily_rates(&records)));
        }
        AdminCommand::Leaves { status, search } => {
            let leaves = db::fetch_leaves(pool, None).await?;
            print_leaves(&report::filter_leaves(
                leaves,
                status.map(LeaveStatus::from),
                search.as_deref(),
            ));
        }
    }

    Ok(())
}

async fn run_teacher(
    pool: &PgPool,
    teacher: &access::Identity,
    command: TeacherCommand,
) -> anyhow::Result<()> {
    match command {
        TeacherCommand::Subjects => {
            let subjects = db::fetch_teacher_subjects(pool, teacher.id).await?;
            if subjects.is_empty() {
                println!("No subjects assigned.");
            }
            for subject in subjects {
                println!("- {} ({})", subject.name, subject.id);
            }
        }
        TeacherCommand::Mark {
            subject,
            date,
            absent,
        } => {
            db::ensure_teaches(pool, teacher, subject).await?;
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let roster = db::fetch_class_roster(pool, subject).await?;
            if roster.is_empty() {
                println!("No students enrolled in this subject.");
                return Ok(());
            }

            let records = db::session_records(subject, date, &roster, &absent)?;
            let absentees = records
                .iter()
                .filter(|r| r.status == models::AttendanceStatus::Absent)
                .count();
            let inserted = db::insert_attendance_batch(pool, &records).await?;
            println!("Recorded {inserted} students for {date} ({absentees} absent).");
        }
        TeacherCommand::History {
            subject,
            export,
            summary,
        } => {
            db::ensure_teaches(pool, teacher, subject).await?;
            let records = db::fetch_subject_records(pool, subject).await?;
            let summaries = stats::summarize_by_date(&records);

            if summaries.is_empty() {
                println!("No sessions recorded for this subject.");
            }
            for day in &summaries {
                println!("- {}: {} present, {} absent", day.date, day.present, day.absent);
            }

            if let Some(path) = export {
                let rows = db::fetch_export_rows(pool, subject, None).await?;
                report::write_sheet_csv(&path, &rows)?;
                println!("Sheet written to {}.", path.display());
            }
            if let Some(path) = summary {
                report::write_summary_csv(&path, &summaries)?;
                println!("Summary written to {}.", path.display());
            }
        }
        TeacherCommand::Day { subject, date } => {
            db::ensure_teaches(pool, teacher, subject).await?;
            let rows = db::fetch_export_rows(pool, subject, Some(date)).await?;
            if rows.is_empty() {
                println!("No attendance recorded on {date}.");
            }
            for row in rows {
                println!("- {} {}: {}", row.roll_no, row.student_name, row.status);
            }
        }
        TeacherCommand::Leaves { status, search } => {
            let leaves = db::fetch_leaves(pool, None).await?;
            print_leaves(&report::filter_leaves(
                leaves,
                status.map(LeaveStatus::from),
                search.as_deref(),
            ));
        }
        TeacherCommand::ReviewLeave { id, decision, note } => {
            let decision = match decision {
                Decision::Approve => LeaveStatus::Approved,
                Decision::Reject => LeaveStatus::Rejected,
            };
            match db::review_leave(pool, id, decision, note.as_deref()).await? {
                db::ReviewOutcome::Settled => {
                    println!("Leave {id} {}.", decision.as_str().to_lowercase())
                }
                db::ReviewOutcome::AlreadyDecided(status) => {
                    println!("Leave {id} was already {}.", status.as_str().to_lowercase())
                }
                db::ReviewOutcome::NotFound => anyhow::bail!("leave {id} does not exist"),
            }
        }
    }

    Ok(())
}

async fn run_student(
    pool: &PgPool,
    student: &access::Identity,
    command: StudentCommand,
) -> anyhow::Result<()> {
    match command {
        StudentCommand::Dashboard { json, out } => {
            let profile = db::fetch_student(pool, student.id).await?;
            let enrollments = db::fetch_enrolled_subjects(pool, student.id).await?;
            let records = db::fetch_student_records(pool, student.id).await?;

            let subject_stats = stats::compute_subject_stats(&enrollments, &records);
            let global = stats::compute_global_stats(&subject_stats);
            let trend = stats::build_trend_series(&enrollments, &records);

            let markdown =
                report::build_dashboard_report(profile.as_ref(), &subject_stats, &global, &trend);

            if json {
                let payload = json!({
                    "student": profile,
                    "subjects": subject_stats,
                    "global": global,
                    "trend": trend,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print!("{markdown}");
            }

            if let Some(path) = out {
                std::fs::write(&path, markdown)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Dashboard written to {}.", path.display());
            }
        }
        StudentCommand::ApplyLeave { start, end, reason } => {
            let id = db::apply_leave(pool, student.id, start, end, &reason).await?;
            println!("Leave application {id} submitted.");
        }
        StudentCommand::Leaves => {
            print_leaves(&db::fetch_leaves(pool, Some(student.id)).await?);
        }
    }

    Ok(())
}

fn report_deleted(what: &str, deleted: bool) {
    if deleted {
        println!("{what} deleted.");
    } else {
        println!("{what} not found.");
    }
}

fn print_leaves(leaves: &[models::LeaveRequest]) {
    if leaves.is_empty() {
        println!("No leave applications.");
        return;
    }

    for leave in leaves {
        println!(
            "- {} {} ({}) {} to {}: {} [{}]",
            leave.id,
            leave.student_name,
            leave.roll_no,
            leave.start_date,
            leave.end_date,
            leave.reason,
            leave.status
        );
        if let Some(note) = &leave.teacher_note {
            println!("    note: {note}");
        }
    }
}
