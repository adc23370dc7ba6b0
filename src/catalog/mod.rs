use std::fs;
use std::path::Path;

use include_dir::{include_dir, Dir};
use serde::Deserialize;
use tracing::debug;

use crate::error::{CatalogError, CatalogResult};
use crate::quiz::{Category, Quiz};

static CATALOG_DIR: Dir = include_dir!("src/catalog/data");

/// Where quizzes come from. The session engine does not care which.
pub trait QuizSource {
    fn categories(&self) -> CatalogResult<Vec<Category>>;

    fn quiz(&self, id: &str) -> CatalogResult<Quiz> {
        self.categories()?
            .into_iter()
            .flat_map(|c| c.quizzes)
            .find(|q| q.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }
}

/// Either a single category or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Many(Vec<Category>),
    One(Category),
}

impl CatalogFile {
    fn into_categories(self) -> Vec<Category> {
        match self {
            CatalogFile::Many(categories) => categories,
            CatalogFile::One(category) => vec![category],
        }
    }
}

fn parse_categories(contents: &str) -> CatalogResult<Vec<Category>> {
    let file: CatalogFile = serde_json::from_str(contents)?;
    file.into_categories()
        .into_iter()
        .map(Category::normalize)
        .collect()
}

/// Quizzes compiled into the binary
#[derive(Debug, Clone)]
pub struct BundledCatalog {
    categories: Vec<Category>,
}

impl BundledCatalog {
    pub fn load() -> CatalogResult<Self> {
        let mut categories = Vec::new();
        for file in CATALOG_DIR.files() {
            if file.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = file.contents_utf8().ok_or_else(|| CatalogError::Invalid {
                quiz: file.path().display().to_string(),
                reason: "not valid UTF-8".to_string(),
            })?;
            categories.extend(parse_categories(contents)?);
        }
        categories.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(categories = categories.len(), "bundled catalog loaded");
        Ok(Self { categories })
    }
}

impl QuizSource for BundledCatalog {
    fn categories(&self) -> CatalogResult<Vec<Category>> {
        Ok(self.categories.clone())
    }
}

/// Quizzes read from a JSON file on disk
#[derive(Debug, Clone)]
pub struct JsonFileCatalog {
    categories: Vec<Category>,
}

impl JsonFileCatalog {
    pub fn open<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let categories = parse_categories(&contents)?;
        debug!(path = %path.display(), categories = categories.len(), "quiz file loaded");
        Ok(Self { categories })
    }
}

impl QuizSource for JsonFileCatalog {
    fn categories(&self) -> CatalogResult<Vec<Category>> {
        Ok(self.categories.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn bundled_catalog_loads_and_validates() {
        let catalog = BundledCatalog::load().unwrap();
        let categories = catalog.categories().unwrap();
        assert!(!categories.is_empty());
        for category in &categories {
            for quiz in &category.quizzes {
                assert!(!quiz.questions.is_empty());
                assert_eq!(quiz.category_id, category.id);
                quiz.validate().unwrap();
            }
        }
    }

    #[test]
    fn bundled_catalog_finds_quiz_by_id() {
        let catalog = BundledCatalog::load().unwrap();
        let quiz = catalog.quiz("1").unwrap();
        assert_eq!(quiz.points_reward, 50);
        assert_eq!(quiz.time_limit_minutes, 10);
        assert_matches!(catalog.quiz("nope"), Err(CatalogError::NotFound(id)) if id == "nope");
    }

    #[test]
    fn file_catalog_accepts_single_category() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"id":"c","name":"Custom","quizzes":[{{"id":"x","title":"X","timeLimit":1,"pointsReward":10,
               "questions":[{{"id":"q","prompt":"?","options":["a","b"],"correctAnswerIndex":0}}]}}]}}"#
        )
        .unwrap();

        let catalog = JsonFileCatalog::open(file.path()).unwrap();
        let quiz = catalog.quiz("x").unwrap();
        assert_eq!(quiz.category_id, "c");
        assert_eq!(catalog.categories().unwrap()[0].quizzes.len(), 1);
    }

    #[test]
    fn file_catalog_accepts_category_list() {
        let categories = parse_categories(
            r#"[{"id":"a","name":"A"},{"id":"b","name":"B","quizzes":[]}]"#,
        )
        .unwrap();
        assert_eq!(categories.len(), 2);
    }

    #[test]
    fn file_catalog_rejects_invalid_question() {
        let err = parse_categories(
            r#"{"id":"c","name":"C","quizzes":[{"id":"bad","title":"Bad","timeLimit":1,"pointsReward":1,
                "questions":[{"id":"q","prompt":"?","options":["a","b"],"correctAnswerIndex":5}]}]}"#,
        )
        .unwrap_err();
        assert_matches!(err, CatalogError::Invalid { quiz, .. } if quiz == "bad");
    }

    #[test]
    fn missing_file_is_io_error() {
        assert_matches!(
            JsonFileCatalog::open("/definitely/not/here.json"),
            Err(CatalogError::Io(_))
        );
    }
}
