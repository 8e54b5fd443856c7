/*!
Core logic of a branching survey: which questions a respondent gets to see,
how answers are stored, and how stored responses are tabulated.

The main entry points are:
* [`resolve_visible_questions`] to compute the questions presented to a
  respondent given the answers collected so far
* [`codec::encode`] and [`codec::decode`] to convert answers to and from
  their stored form
* [`aggregate`] to compute the statistics of a set of responses

All the functions are pure: they take the survey and the answers as
arguments and keep no state between calls.
*/

mod aggregate;
pub mod builder;
pub mod codec;
pub mod manual;
mod model;
mod revise;
mod template;
mod validate;

use log::{debug, info, warn};

use std::collections::{HashMap, HashSet};

use snafu::{ensure, OptionExt};

pub use crate::aggregate::*;
pub use crate::model::*;
pub use crate::revise::*;
pub use crate::template::*;
pub use crate::validate::*;

/// Computes the questions shown to a respondent, in presentation order.
///
/// Resolution starts at the first question of the base order and follows the
/// answers:
/// * a choice question with branches must be answered before anything past
///   it is shown
/// * an answered question with branches continues at the target of its first
///   selected option, or at the next question in base order if that option
///   has no branch
/// * a branch to a question that does not exist ends the sequence
/// * reaching a question already shown ends the sequence, so the output never
///   holds more questions than the survey
///
/// Arguments:
/// * `survey` the survey to present
/// * `answers` the raw answers collected so far
pub fn resolve_visible_questions<'a>(
    survey: &'a Survey,
    answers: &AnswerSheet,
) -> SurveyResult<Vec<&'a Question>> {
    let order = survey.sorted_questions();
    ensure!(
        !order.is_empty(),
        EmptySurveySnafu {
            survey_id: survey.id.clone()
        }
    );
    let positions = positions_by_id(&order);

    let mut visited: HashSet<&str> = HashSet::new();
    let mut visible: Vec<&'a Question> = Vec::new();
    let mut cursor: Option<usize> = Some(0);
    while let Some(pos) = cursor {
        let question = order[pos];
        if !visited.insert(question.id.as_str()) {
            debug!(
                "resolve_visible_questions: {} already visited, stopping",
                question.id
            );
            break;
        }
        visible.push(question);
        cursor = advance(question, pos, order.len(), &positions, answers);
    }
    info!(
        "resolve_visible_questions: survey {}: {} of {} questions visible",
        survey.id,
        visible.len(),
        order.len()
    );
    Ok(visible)
}

/// The ids of [`resolve_visible_questions`].
pub fn resolve_visible_ids(survey: &Survey, answers: &AnswerSheet) -> SurveyResult<Vec<String>> {
    Ok(resolve_visible_questions(survey, answers)?
        .iter()
        .map(|q| q.id.clone())
        .collect())
}

/// The question that follows `question_id`, given the answers so far.
///
/// Returns None when the question is an unanswered gate or the last one of
/// its path. Unlike [`resolve_visible_questions`], this does not track
/// questions already visited.
pub fn next_question<'a>(
    survey: &'a Survey,
    question_id: &str,
    answers: &AnswerSheet,
) -> SurveyResult<Option<&'a Question>> {
    let order = survey.sorted_questions();
    let positions = positions_by_id(&order);
    let pos = *positions
        .get(question_id)
        .context(UnknownQuestionSnafu {
            survey_id: survey.id.clone(),
            question_id,
        })?;
    Ok(advance(order[pos], pos, order.len(), &positions, answers).map(|p| order[p]))
}

// Position of each id in the base order. The first occurrence wins.
fn positions_by_id<'a>(order: &[&'a Question]) -> HashMap<&'a str, usize> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (idx, q) in order.iter().enumerate() {
        positions.entry(q.id.as_str()).or_insert(idx);
    }
    positions
}

fn advance(
    question: &Question,
    pos: usize,
    num_questions: usize,
    positions: &HashMap<&str, usize>,
    answers: &AnswerSheet,
) -> Option<usize> {
    let answer = answers.get(&question.id).filter(|a| a.has_answer());
    if question.has_branching() {
        match answer {
            None if question.question_type.is_choice() => {
                debug!("advance: {} is an unanswered gate", question.id);
                return None;
            }
            None => {}
            Some(a) => {
                // Only the first selection is consulted, even for multiple choices.
                if let Some(target) = a.first_selection().and_then(|o| question.branch_target(o)) {
                    let next = positions.get(target).copied();
                    if next.is_none() {
                        warn!(
                            "advance: {} branches to unknown question {}",
                            question.id, target
                        );
                    }
                    return next;
                }
            }
        }
    }
    if pos + 1 < num_questions {
        Some(pos + 1)
    } else {
        None
    }
}
