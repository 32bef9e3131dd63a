//! Loading question banks from JSON files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{QuizError, QuizResult};
use crate::types::NewQuestion;

/// Read every `*.json` file in `dir`, in file name order.
///
/// Each file holds an array of questions. Files that cannot be read or
/// parsed are skipped with a warning so one bad file does not block the rest.
pub fn load_question_files(dir: &Path) -> QuizResult<Vec<NewQuestion>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| QuizError::Seed(format!("cannot read {}: {}", dir.display(), e)))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let mut questions = Vec::new();
    for path in files {
        match load_file(&path) {
            Ok(mut batch) => {
                tracing::debug!("Loaded {} questions from {}", batch.len(), path.display());
                questions.append(&mut batch);
            }
            Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    tracing::info!("Loaded {} questions from {}", questions.len(), dir.display());
    Ok(questions)
}

fn load_file(path: &Path) -> QuizResult<Vec<NewQuestion>> {
    let content = fs::read_to_string(path).map_err(|e| QuizError::Seed(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| QuizError::Seed(e.to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::AnswerOption;

    const GEOGRAPHY: &str = r#"[
        {"prompt": "Capital of Italy?", "option_a": "Milan", "option_b": "Turin",
         "option_c": "Rome", "option_d": "Naples", "correct_option": "c"}
    ]"#;

    const CLIMATE: &str = r#"[
        {"prompt": "Unit of pressure?", "option_a": "hPa", "option_b": "km",
         "option_c": "kg", "option_d": "lux", "correct_option": "A"},
        {"prompt": "Wettest season in Milan?", "option_a": "Winter", "option_b": "Autumn",
         "option_c": "Summer", "option_d": "Spring", "correct_option": "b"}
    ]"#;

    #[test]
    fn test_load_sorted_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b_geography.json"), GEOGRAPHY).unwrap();
        fs::write(dir.path().join("a_climate.json"), CLIMATE).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let questions = load_question_files(dir.path()).unwrap();
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].prompt, "Unit of pressure?");
        assert_eq!(questions[0].correct_option, AnswerOption::A);
        assert_eq!(questions[2].correct_option, AnswerOption::C);
    }

    #[test]
    fn test_bad_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.json"), GEOGRAPHY).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(
            dir.path().join("bad_option.json"),
            r#"[{"prompt": "?", "option_a": "1", "option_b": "2", "option_c": "3",
                "option_d": "4", "correct_option": "e"}]"#,
        )
        .unwrap();

        let questions = load_question_files(dir.path()).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].prompt, "Capital of Italy?");
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_question_files(&dir.path().join("nope"));
        assert!(matches!(result, Err(QuizError::Seed(_))));
    }
}
