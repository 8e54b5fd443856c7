use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use snafu::{ensure, OptionExt};

use crate::codec::{encode, ranked_count};
use crate::model::*;
use crate::resolve_visible_questions;

/// Checks the structure of a survey before it gets persisted.
///
/// Stops at the first problem found.
pub fn validate_survey(survey: &Survey) -> SurveyResult<()> {
    check_survey(survey, true)
}

/// Checks a survey read back from storage.
///
/// Storage does not keep branches consistent with the questions, so branches
/// on unknown options or to unknown questions are only logged. The resolver
/// stops at such branches. The other checks are the ones of
/// [`validate_survey`].
pub fn validate_stored_survey(survey: &Survey) -> SurveyResult<()> {
    check_survey(survey, false)
}

fn check_survey(survey: &Survey, strict_branches: bool) -> SurveyResult<()> {
    ensure!(
        !survey.title.trim().is_empty(),
        BlankTitleSnafu {
            survey_id: survey.id.clone()
        }
    );
    ensure!(
        !survey.questions.is_empty(),
        EmptySurveySnafu {
            survey_id: survey.id.clone()
        }
    );

    let mut ids: HashSet<&str> = HashSet::new();
    for q in survey.questions.iter() {
        ensure!(
            ids.insert(q.id.as_str()),
            DuplicateQuestionIdSnafu {
                question_id: q.id.clone()
            }
        );
    }

    for (idx, q) in survey.questions.iter().enumerate() {
        ensure!(
            !q.prompt.trim().is_empty(),
            BlankPromptSnafu {
                question_id: q.id.clone(),
                position: idx + 1,
            }
        );
        if q.question_type.is_choice() {
            // The authoring tool seeds ranked questions itself, one option is enough.
            let required = if q.question_type == QuestionType::RankedChoice {
                1
            } else {
                2
            };
            let found = q.non_blank_options();
            ensure!(
                found >= required,
                NotEnoughOptionsSnafu {
                    question_id: q.id.clone(),
                    required,
                    found,
                }
            );
        }
        for (option, target) in q.conditional_logic.iter() {
            if !strict_branches {
                if !q.options.contains(option) {
                    warn!(
                        "validate_stored_survey: question {} branches on unknown option {:?}",
                        q.id, option
                    );
                } else if !ids.contains(target.as_str()) {
                    warn!(
                        "validate_stored_survey: question {} branches on {:?} to unknown question {}",
                        q.id, option, target
                    );
                }
                continue;
            }
            ensure!(
                q.options.contains(option),
                UnknownBranchOptionSnafu {
                    question_id: q.id.clone(),
                    option: option.clone(),
                }
            );
            ensure!(
                ids.contains(target.as_str()),
                UnknownBranchTargetSnafu {
                    question_id: q.id.clone(),
                    option: option.clone(),
                    target: target.clone(),
                }
            );
        }
    }
    Ok(())
}

/// Checks a respondent's answers and returns the encoded answers to persist.
///
/// Every question on the resolved path must be answered, including the gate
/// at which resolution stopped. Answers to questions outside the path are
/// dropped.
pub fn validate_submission(
    survey: &Survey,
    answers: &AnswerSheet,
) -> SurveyResult<BTreeMap<String, String>> {
    let visible = resolve_visible_questions(survey, answers)?;
    let mut encoded: BTreeMap<String, String> = BTreeMap::new();
    for q in visible {
        let value = answers
            .get(&q.id)
            .filter(|v| v.has_answer())
            .context(MissingAnswerSnafu {
                question_id: q.id.clone(),
                prompt: q.prompt.clone(),
            })?;
        if let Some(max) = q.selection_limit() {
            let found = value.selection_count();
            ensure!(
                found <= max,
                TooManySelectionsSnafu {
                    question_id: q.id.clone(),
                    max,
                    found,
                }
            );
        }
        if let Some(max) = q.rank_limit() {
            let found = match value {
                AnswerValue::Single(s) | AnswerValue::Text(s) => ranked_count(s),
                AnswerValue::Multi(_) => value.selection_count(),
            };
            ensure!(
                found <= max,
                TooManyRanksSnafu {
                    question_id: q.id.clone(),
                    max,
                    found,
                }
            );
        }
        encoded.insert(q.id.clone(), encode(q.question_type, value));
    }
    let dropped = answers.keys().filter(|k| !encoded.contains_key(*k)).count();
    if dropped > 0 {
        debug!(
            "validate_submission: survey {}: dropped {} answers outside the resolved path",
            survey.id, dropped
        );
    }
    Ok(encoded)
}

impl Response {
    /// Builds the immutable response of a submission, after validation.
    pub fn from_submission(
        id: &str,
        survey: &Survey,
        employee_id: &str,
        submitted_at: DateTime<Utc>,
        answers: &AnswerSheet,
    ) -> SurveyResult<Response> {
        let encoded = validate_submission(survey, answers)?;
        Ok(Response {
            id: id.to_string(),
            survey_id: survey.id.clone(),
            employee_id: employee_id.to_string(),
            submitted_at,
            answers: encoded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    fn branching_survey() -> Survey {
        let mut b = Builder::new("s1", "Lunch");
        b.add_choice_question("q1", "Did you eat?", QuestionType::SingleChoice, &["Yes", "No"])
            .unwrap();
        b.add_question("q2", "Why not?", QuestionType::ShortText)
            .unwrap();
        b.add_choice_question(
            "q3",
            "What did you eat?",
            QuestionType::MultiChoice,
            &["Rice", "Noodles", "Bread"],
        )
        .unwrap();
        b.add_branch("q1", "Yes", "q3").unwrap();
        b.add_branch("q1", "No", "q2").unwrap();
        b.max_selected("q3", 2).unwrap();
        b.build().unwrap()
    }

    fn sheet(entries: &[(&str, AnswerValue)]) -> AnswerSheet {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn single(s: &str) -> AnswerValue {
        AnswerValue::Single(s.to_string())
    }

    fn multi(items: &[&str]) -> AnswerValue {
        AnswerValue::Multi(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn accepts_valid_survey() {
        assert!(validate_survey(&branching_survey()).is_ok());
    }

    #[test]
    fn rejects_empty_survey() {
        let s = Survey::new("s1", "Nothing");
        assert!(matches!(
            validate_survey(&s),
            Err(SurveyError::EmptySurvey { .. })
        ));
    }

    #[test]
    fn rejects_blank_title() {
        let mut s = branching_survey();
        s.title = " ".to_string();
        assert!(matches!(
            validate_survey(&s),
            Err(SurveyError::BlankTitle { .. })
        ));
    }

    #[test]
    fn rejects_blank_prompt_with_position() {
        let mut s = branching_survey();
        s.questions[1].prompt = "".to_string();
        match validate_survey(&s) {
            Err(SurveyError::BlankPrompt {
                question_id,
                position,
            }) => {
                assert_eq!(question_id, "q2");
                assert_eq!(position, 2);
            }
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn rejects_choice_with_one_option() {
        let mut s = branching_survey();
        s.questions[2].options = vec!["Rice".to_string(), " ".to_string()];
        s.questions[2].max_selected = None;
        match validate_survey(&s) {
            Err(SurveyError::NotEnoughOptions {
                question_id, found, ..
            }) => {
                assert_eq!(question_id, "q3");
                assert_eq!(found, 1);
            }
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn ranked_choice_needs_one_option() {
        let mut s = branching_survey();
        s.questions.push(Question::new("q4", "Rank", QuestionType::RankedChoice));
        assert!(matches!(
            validate_survey(&s),
            Err(SurveyError::NotEnoughOptions { required: 1, .. })
        ));
        s.questions[3].options.push("Only".to_string());
        assert!(validate_survey(&s).is_ok());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut s = branching_survey();
        s.questions[1].id = "q1".to_string();
        assert!(matches!(
            validate_survey(&s),
            Err(SurveyError::DuplicateQuestionId { .. })
        ));
    }

    #[test]
    fn rejects_branch_on_unknown_option() {
        let mut s = branching_survey();
        s.questions[0]
            .conditional_logic
            .insert("Maybe".to_string(), "q2".to_string());
        assert!(matches!(
            validate_survey(&s),
            Err(SurveyError::UnknownBranchOption { .. })
        ));
    }

    #[test]
    fn rejects_branch_to_unknown_question() {
        let mut s = branching_survey();
        s.questions[0]
            .conditional_logic
            .insert("Yes".to_string(), "q9".to_string());
        match validate_survey(&s) {
            Err(SurveyError::UnknownBranchTarget { target, .. }) => assert_eq!(target, "q9"),
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn submission_encodes_visible_answers_only() {
        let s = branching_survey();
        let answers = sheet(&[
            ("q1", single("Yes")),
            ("q2", AnswerValue::Text("ignored".to_string())),
            ("q3", multi(&["Bread", "Rice"])),
        ]);
        let encoded = validate_submission(&s, &answers).unwrap();
        assert_eq!(encoded.len(), 2);
        assert_eq!(encoded["q1"], "Yes");
        assert_eq!(encoded["q3"], "Bread,Rice");
    }

    #[test]
    fn unanswered_gate_is_reported() {
        let s = branching_survey();
        match validate_submission(&s, &AnswerSheet::new()) {
            Err(SurveyError::MissingAnswer { question_id, .. }) => assert_eq!(question_id, "q1"),
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn missing_answer_on_path_is_reported() {
        let s = branching_survey();
        let answers = sheet(&[("q1", single("No")), ("q2", AnswerValue::Text("  ".into()))]);
        match validate_submission(&s, &answers) {
            Err(SurveyError::MissingAnswer { question_id, .. }) => assert_eq!(question_id, "q2"),
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn selection_limit_is_enforced() {
        let s = branching_survey();
        let answers = sheet(&[
            ("q1", single("Yes")),
            ("q3", multi(&["Bread", "Rice", "Noodles"])),
        ]);
        assert!(matches!(
            validate_submission(&s, &answers),
            Err(SurveyError::TooManySelections { max: 2, found: 3, .. })
        ));
    }

    #[test]
    fn rank_limit_is_enforced() {
        let mut b = Builder::new("s2", "Ranking");
        b.add_choice_question("r1", "Rank these", QuestionType::RankedChoice, &["X", "Y", "Z"])
            .unwrap();
        b.max_rank("r1", 2).unwrap();
        let s = b.build().unwrap();
        let ok = sheet(&[("r1", multi(&["Y", "X"]))]);
        assert_eq!(validate_submission(&s, &ok).unwrap()["r1"], "1,2");
        let too_many = sheet(&[("r1", single("1,2,3"))]);
        assert!(matches!(
            validate_submission(&s, &too_many),
            Err(SurveyError::TooManyRanks { max: 2, found: 3, .. })
        ));
    }

    #[test]
    fn response_from_submission() {
        let s = branching_survey();
        let answers = sheet(&[
            ("q1", single("No")),
            ("q2", AnswerValue::Text(" late ".into())),
            ("q3", multi(&["Rice"])),
        ]);
        let at = "2024-03-01T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let r = Response::from_submission("r1", &s, "emp-7", at, &answers).unwrap();
        assert_eq!(r.survey_id, "s1");
        assert_eq!(r.employee_id, "emp-7");
        assert_eq!(r.answer("q2"), Some("late"));
        assert_eq!(r.answer("q3"), Some("Rice"));
        assert_eq!(r.answer_rows().len(), 3);
    }

    #[test]
    fn branch_target_falls_through_to_next_question() {
        // q1 = No leads to q2, which has no branches, so q3 follows in base order.
        let s = branching_survey();
        let answers = sheet(&[("q1", single("No")), ("q2", AnswerValue::Text("late".into()))]);
        match validate_submission(&s, &answers) {
            Err(SurveyError::MissingAnswer { question_id, .. }) => assert_eq!(question_id, "q3"),
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn ranked_blanks_do_not_count_against_limit() {
        let mut b = Builder::new("s2", "Ranking");
        b.add_choice_question("r1", "Rank these", QuestionType::RankedChoice, &["A", "B"])
            .unwrap();
        b.max_rank("r1", 1).unwrap();
        let s = b.build().unwrap();
        let answers = sheet(&[("r1", multi(&["B", ""]))]);
        assert_eq!(validate_submission(&s, &answers).unwrap()["r1"], "1");
    }

    #[test]
    fn stored_survey_tolerates_dangling_branches() {
        let mut s = branching_survey();
        s.questions[0]
            .conditional_logic
            .insert("Yes".to_string(), "q9".to_string());
        s.questions[0]
            .conditional_logic
            .insert("Maybe".to_string(), "q2".to_string());
        assert!(validate_survey(&s).is_err());
        assert!(validate_stored_survey(&s).is_ok());
        s.questions[1].prompt = " ".to_string();
        assert!(matches!(
            validate_stored_survey(&s),
            Err(SurveyError::BlankPrompt { .. })
        ));
    }
}
