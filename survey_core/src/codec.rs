//! Conversion between in-memory answers and the single string stored per
//! question.
//!
//! Ranked choices are stored as their rank positions (`"1,2,3"`), not as the
//! ranked options. Once encoded, only the number of ranked options can be
//! recovered. Aggregation relies on this shape, so it is kept as is.

use crate::model::{AnswerValue, QuestionType};

/// Separator between the items of list answers.
pub const SEPARATOR: char = ',';

/// Encodes an answer into its stored form.
///
/// Values are not checked against the declared options.
pub fn encode(question_type: QuestionType, value: &AnswerValue) -> String {
    match question_type {
        QuestionType::SingleChoice
        | QuestionType::DropdownChoice
        | QuestionType::ShortText
        | QuestionType::LongText => match value {
            AnswerValue::Single(s) | AnswerValue::Text(s) => s.trim().to_string(),
            AnswerValue::Multi(items) => join(items).trim().to_string(),
        },
        QuestionType::MultiChoice | QuestionType::MultiText => match value {
            AnswerValue::Single(s) | AnswerValue::Text(s) => s.clone(),
            AnswerValue::Multi(items) => join(items),
        },
        QuestionType::RankedChoice => match value {
            // Already in rank-position form.
            AnswerValue::Single(s) | AnswerValue::Text(s) => s.trim().to_string(),
            // Blank entries are not ranked.
            AnswerValue::Multi(items) => (1..=items.iter().filter(|s| !s.trim().is_empty()).count())
                .map(|rank| rank.to_string())
                .collect::<Vec<String>>()
                .join(","),
        },
    }
}

/// Decodes a stored answer.
///
/// For ranked choices the result holds rank positions, not options.
pub fn decode(question_type: QuestionType, encoded: &str) -> AnswerValue {
    match question_type {
        QuestionType::SingleChoice | QuestionType::DropdownChoice => {
            AnswerValue::Single(encoded.to_string())
        }
        QuestionType::ShortText | QuestionType::LongText => AnswerValue::Text(encoded.to_string()),
        QuestionType::MultiChoice => AnswerValue::Multi(
            split(encoded)
                .into_iter()
                .map(|s| s.trim().to_string())
                .collect(),
        ),
        QuestionType::RankedChoice => AnswerValue::Multi(
            split(encoded)
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        ),
        QuestionType::MultiText => {
            AnswerValue::Multi(split(encoded).into_iter().map(|s| s.to_string()).collect())
        }
    }
}

/// The number of options ranked in an encoded ranked-choice answer.
pub fn ranked_count(encoded: &str) -> usize {
    encoded
        .split(SEPARATOR)
        .filter(|s| !s.trim().is_empty())
        .count()
}

fn join(items: &[String]) -> String {
    items.join(&SEPARATOR.to_string())
}

fn split(encoded: &str) -> Vec<&str> {
    if encoded.is_empty() {
        Vec::new()
    } else {
        encoded.split(SEPARATOR).collect()
    }
}
