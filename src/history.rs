use std::io::Write;

use chrono::{DateTime, Local};
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::scoring::QuizResult;

const CSV_HEADER: [&str; 7] = [
    "completed_at",
    "quiz_id",
    "user_id",
    "score",
    "total_questions",
    "points_earned",
    "time_taken_secs",
];

/// Write results as CSV, header first
pub fn export_csv<W: Write>(results: &[QuizResult], writer: W) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(CSV_HEADER)?;
    for r in results {
        wtr.serialize((
            r.completed_at.to_rfc3339(),
            &r.quiz_id,
            &r.user_id,
            r.score,
            r.total_questions,
            r.points_earned,
            r.time_taken_secs,
        ))?;
    }
    wtr.flush()?;
    Ok(())
}

/// "5 minutes ago" style age of a result
pub fn describe_age(completed_at: DateTime<Local>, now: DateTime<Local>) -> String {
    let elapsed = (now - completed_at).to_std().unwrap_or_default();
    HumanTime::from(elapsed).to_text_en(Accuracy::Rough, Tense::Past)
}

/// `m:ss`
pub fn format_duration(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn result(quiz_id: &str) -> QuizResult {
        QuizResult {
            quiz_id: quiz_id.into(),
            user_id: "ada".into(),
            score: 2,
            total_questions: 3,
            points_earned: 33,
            time_taken_secs: 95,
            completed_at: Local.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap(),
        }
    }

    #[test]
    fn export_writes_header_and_rows() {
        let mut out = Vec::new();
        export_csv(&[result("1"), result("3")], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "completed_at,quiz_id,user_id,score,total_questions,points_earned,time_taken_secs"
        );
        assert!(lines[1].ends_with(",1,ada,2,3,33,95"));
        assert!(lines[2].ends_with(",3,ada,2,3,33,95"));
    }

    #[test]
    fn export_of_nothing_is_just_header() {
        let mut out = Vec::new();
        export_csv(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn age_reads_in_the_past() {
        let then = Local.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap();
        let text = describe_age(then, then + Duration::minutes(5));
        assert!(text.contains("minute"), "got {text}");
    }

    #[test]
    fn duration_formats_minutes_and_seconds() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(95), "1:35");
        assert_eq!(format_duration(600), "10:00");
    }
}
