use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::quiz::Quiz;
use crate::user::User;

/// Immutable scored outcome of a finished session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub quiz_id: String,
    pub user_id: String,
    pub score: usize,
    pub total_questions: usize,
    pub points_earned: u32,
    pub time_taken_secs: u32,
    pub completed_at: DateTime<Local>,
}

impl QuizResult {
    /// Percentage of questions answered correctly, rounded
    pub fn accuracy(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        ((self.score as f64 / self.total_questions as f64) * 100.0).round()
    }

    pub fn is_perfect(&self) -> bool {
        self.total_questions > 0 && self.score == self.total_questions
    }
}

/// Number of questions whose recorded answer matches the correct option.
/// Unanswered questions never count.
pub fn score(quiz: &Quiz, answers: &BTreeMap<usize, usize>) -> usize {
    quiz.questions
        .iter()
        .enumerate()
        .filter(|(idx, q)| answers.get(idx).is_some_and(|&answer| q.is_correct(answer)))
        .count()
}

/// `floor(score / total * reward)`, truncating partial credit
pub fn points_earned(score: usize, total: usize, reward: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let earned = (score.min(total) as u64 * reward as u64) / total as u64;
    earned as u32
}

/// Seconds spent, clamped to `[0, budget]`
pub fn time_taken(budget_secs: u32, time_left_secs: u32) -> u32 {
    budget_secs.saturating_sub(time_left_secs)
}

/// Fold a result into a user record. The input is left untouched.
pub fn apply_result_to_user(user: &User, result: &QuizResult) -> User {
    User {
        points: user.points + result.points_earned as u64,
        total_quizzes: user.total_quizzes + 1,
        ..user.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::fixtures::sample_quiz;
    use chrono::TimeZone;

    fn answers(pairs: &[(usize, usize)]) -> BTreeMap<usize, usize> {
        pairs.iter().copied().collect()
    }

    fn result(points: u32) -> QuizResult {
        QuizResult {
            quiz_id: "1".into(),
            user_id: "u1".into(),
            score: 2,
            total_questions: 3,
            points_earned: points,
            time_taken_secs: 42,
            completed_at: Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn score_counts_matching_positions() {
        let quiz = sample_quiz();
        assert_eq!(score(&quiz, &answers(&[(0, 2), (1, 1), (2, 0)])), 2);
        assert_eq!(score(&quiz, &answers(&[(0, 2), (1, 1), (2, 2)])), 3);
    }

    #[test]
    fn unanswered_questions_never_count() {
        let quiz = sample_quiz();
        assert_eq!(score(&quiz, &answers(&[])), 0);
        assert_eq!(score(&quiz, &answers(&[(1, 1)])), 1);
    }

    #[test]
    fn answers_past_the_last_question_are_ignored() {
        let quiz = sample_quiz();
        assert_eq!(score(&quiz, &answers(&[(7, 2)])), 0);
        assert_eq!(score(&quiz, &answers(&[(0, 9), (1, 1)])), 1);
    }

    #[test]
    fn partial_credit_truncates() {
        assert_eq!(points_earned(2, 3, 50), 33);
        assert_eq!(points_earned(1, 3, 50), 16);
        assert_eq!(points_earned(3, 3, 50), 50);
        assert_eq!(points_earned(0, 3, 50), 0);
    }

    #[test]
    fn points_for_empty_quiz_are_zero() {
        assert_eq!(points_earned(0, 0, 50), 0);
    }

    #[test]
    fn time_taken_is_clamped() {
        assert_eq!(time_taken(600, 540), 60);
        assert_eq!(time_taken(600, 0), 600);
        assert_eq!(time_taken(600, 700), 0);
    }

    #[test]
    fn apply_result_is_pure() {
        let user = User::new("u1", "Ada");
        let before = user.clone();
        let r = result(33);

        let first = apply_result_to_user(&user, &r);
        let second = apply_result_to_user(&user, &r);

        assert_eq!(user, before);
        assert_eq!(first, second);
        assert_eq!(first.points, 33);
        assert_eq!(first.total_quizzes, 1);
        assert_eq!(first.name, user.name);
        assert_eq!(first.referral_code, user.referral_code);
    }

    #[test]
    fn accuracy_rounds_percentage() {
        assert_eq!(result(33).accuracy(), 67.0);
        assert!(!result(33).is_perfect());
    }
}
