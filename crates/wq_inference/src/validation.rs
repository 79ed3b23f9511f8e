//! Field-by-field checks on the model's JSON output. Nothing is coerced: a
//! value of the wrong shape is a generation failure.

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};
use wq_core::{Difficulty, Error, GeneratedQuiz, QuizQuestion, Result};

pub const MIN_QUESTIONS: usize = 5;
pub const MAX_QUESTIONS: usize = 10;
pub const OPTIONS_PER_QUESTION: usize = 4;
pub const MIN_RELATED_TOPICS: usize = 3;
pub const MAX_RELATED_TOPICS: usize = 5;

fn invalid(message: String) -> Error {
    Error::Generation(format!("Model output rejected: {}", message))
}

fn field<'a>(object: &'a Map<String, Value>, name: &str, path: &str) -> Result<&'a Value> {
    object
        .get(name)
        .ok_or_else(|| invalid(format!("{}{} is missing", path, name)))
}

fn non_empty_string(value: &Value, path: &str) -> Result<String> {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        Some(_) => Err(invalid(format!("{} is empty", path))),
        None => Err(invalid(format!("{} is not a string", path))),
    }
}

fn string_list(value: &Value, path: &str) -> Result<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid(format!("{} is not an array", path)))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| non_empty_string(item, &format!("{}[{}]", path, i)))
        .collect()
}

fn validate_question(value: &Value, index: usize) -> Result<QuizQuestion> {
    let path = format!("quiz[{}]", index);
    let object = value
        .as_object()
        .ok_or_else(|| invalid(format!("{} is not an object", path)))?;
    let prefix = format!("{}.", path);

    let question = non_empty_string(field(object, "question", &prefix)?, &format!("{}question", prefix))?;

    let options = string_list(field(object, "options", &prefix)?, &format!("{}options", prefix))?;
    if options.len() != OPTIONS_PER_QUESTION {
        return Err(invalid(format!(
            "{} has {} options, expected exactly {}",
            path,
            options.len(),
            OPTIONS_PER_QUESTION
        )));
    }
    let distinct: HashSet<&str> = options.iter().map(String::as_str).collect();
    if distinct.len() != options.len() {
        return Err(invalid(format!("{} has duplicate options", path)));
    }

    let answer = non_empty_string(field(object, "answer", &prefix)?, &format!("{}answer", prefix))?;
    if !options.contains(&answer) {
        return Err(invalid(format!(
            "{} answer \"{}\" is not one of its options",
            path, answer
        )));
    }

    let difficulty_raw = field(object, "difficulty", &prefix)?
        .as_str()
        .ok_or_else(|| invalid(format!("{}difficulty is not a string", prefix)))?;
    let difficulty = Difficulty::parse(difficulty_raw).ok_or_else(|| {
        invalid(format!(
            "{}difficulty \"{}\" is not easy, medium or hard",
            prefix, difficulty_raw
        ))
    })?;

    let explanation = non_empty_string(
        field(object, "explanation", &prefix)?,
        &format!("{}explanation", prefix),
    )?;

    Ok(QuizQuestion {
        question,
        options,
        answer,
        difficulty,
        explanation,
    })
}

fn validate_key_entities(value: &Value) -> Result<BTreeMap<String, Vec<String>>> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid("key_entities is not an object".to_string()))?;
    object
        .iter()
        .map(|(category, names)| {
            let names = names.as_array().ok_or_else(|| {
                invalid(format!("key_entities.{} is not an array", category))
            })?;
            let names = names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    name.as_str().map(str::to_string).ok_or_else(|| {
                        invalid(format!("key_entities.{}[{}] is not a string", category, i))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok((category.clone(), names))
        })
        .collect()
}

/// Check a raw model response against the quiz contract and convert it into
/// typed data.
pub fn validate_quiz(value: &Value) -> Result<GeneratedQuiz> {
    let root = value
        .as_object()
        .ok_or_else(|| invalid("output is not a JSON object".to_string()))?;

    let questions = field(root, "quiz", "")?
        .as_array()
        .ok_or_else(|| invalid("quiz is not an array".to_string()))?;
    if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&questions.len()) {
        return Err(invalid(format!(
            "quiz has {} questions, expected between {} and {}",
            questions.len(),
            MIN_QUESTIONS,
            MAX_QUESTIONS
        )));
    }
    let quiz = questions
        .iter()
        .enumerate()
        .map(|(i, q)| validate_question(q, i))
        .collect::<Result<Vec<_>>>()?;

    let related_topics = string_list(field(root, "related_topics", "")?, "related_topics")?;
    if !(MIN_RELATED_TOPICS..=MAX_RELATED_TOPICS).contains(&related_topics.len()) {
        return Err(invalid(format!(
            "related_topics has {} entries, expected between {} and {}",
            related_topics.len(),
            MIN_RELATED_TOPICS,
            MAX_RELATED_TOPICS
        )));
    }

    let key_entities = validate_key_entities(field(root, "key_entities", "")?)?;

    Ok(GeneratedQuiz {
        quiz,
        related_topics,
        key_entities,
    })
}
