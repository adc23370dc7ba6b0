use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// A single multiple-choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(alias = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_answer_index
    }

    pub fn correct_option(&self) -> Option<&str> {
        self.options
            .get(self.correct_answer_index)
            .map(String::as_str)
    }
}

/// A named, ordered set of questions with a time budget and a point reward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: String,
    pub questions: Vec<Question>,
    #[serde(rename = "timeLimit")]
    pub time_limit_minutes: u32,
    pub points_reward: u32,
}

impl Quiz {
    /// Whole session budget in seconds
    pub fn time_budget_secs(&self) -> u32 {
        self.time_limit_minutes.saturating_mul(60)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Check every question invariant.
    ///
    /// An empty question list passes here; sessions reject it at start.
    pub fn validate(&self) -> CatalogResult<()> {
        for (idx, question) in self.questions.iter().enumerate() {
            if question.options.len() < 2 {
                return Err(self.invalid(format!(
                    "question {} ({}) needs at least two options",
                    idx, question.id
                )));
            }
            if question.correct_answer_index >= question.options.len() {
                return Err(self.invalid(format!(
                    "question {} ({}) marks option {} correct but has {} options",
                    idx,
                    question.id,
                    question.correct_answer_index,
                    question.options.len()
                )));
            }
        }
        Ok(())
    }

    /// Copy of this quiz with the question order shuffled
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Quiz {
        let mut quiz = self.clone();
        quiz.questions.shuffle(rng);
        quiz
    }

    fn invalid(&self, reason: String) -> CatalogError {
        CatalogError::Invalid {
            quiz: self.id.clone(),
            reason,
        }
    }
}

/// A browsable group of quizzes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
}

impl Category {
    /// Validate every quiz and stamp it with this category's id
    pub fn normalize(mut self) -> CatalogResult<Self> {
        for quiz in &mut self.quizzes {
            quiz.validate()?;
            if quiz.category_id.is_empty() {
                quiz.category_id = self.id.clone();
            }
        }
        Ok(self)
    }
}
