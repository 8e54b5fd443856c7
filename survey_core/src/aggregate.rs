use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use snafu::ensure;

use crate::codec::{decode, ranked_count};
use crate::model::*;

// ******** Output data structures *********

/// Counts for one choice question.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Tally {
    /// One counter per declared option, in declaration order.
    Options(Vec<(String, u64)>),
    /// Ranked answers do not record which option got which rank, so only
    /// aggregate counters are available.
    Ranked {
        /// Responses that ranked at least one option.
        responses_ranked: u64,
        /// Ranked options summed over all responses.
        total_ranked: u64,
    },
}

impl Tally {
    pub fn count_for(&self, option: &str) -> Option<u64> {
        match self {
            Tally::Options(counts) => counts.iter().find(|(o, _)| o == option).map(|(_, c)| *c),
            Tally::Ranked { .. } => None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuestionTally {
    pub question_id: String,
    pub prompt: String,
    pub question_type: QuestionType,
    pub tally: Tally,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FreeTextEntry {
    pub respondent_id: String,
    pub text: String,
    pub submitted_at: DateTime<Utc>,
}

/// The free-text answers of one question, oldest first.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FreeTextCollection {
    pub question_id: String,
    pub prompt: String,
    pub question_type: QuestionType,
    pub entries: Vec<FreeTextEntry>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SurveyReport {
    pub survey_id: String,
    pub response_count: u64,
    /// Responses per respondent, ordered by respondent id.
    pub respondent_counts: Vec<(String, u64)>,
    /// Choice questions, in presentation order.
    pub question_tallies: Vec<QuestionTally>,
    /// Text questions that received at least one non-blank answer, in
    /// presentation order.
    pub free_text: Vec<FreeTextCollection>,
}

impl SurveyReport {
    pub fn tally_for(&self, question_id: &str) -> Option<&QuestionTally> {
        self.question_tallies
            .iter()
            .find(|t| t.question_id == question_id)
    }

    pub fn free_text_for(&self, question_id: &str) -> Option<&FreeTextCollection> {
        self.free_text.iter().find(|t| t.question_id == question_id)
    }
}

/// Tabulates the responses of a survey.
///
/// Arguments:
/// * `survey` the survey the responses were collected for
/// * `responses` the stored responses. Responses recorded against another
///   survey are skipped.
///
/// Answers that match none of the declared options are not counted.
pub fn aggregate(survey: &Survey, responses: &[Response]) -> SurveyResult<SurveyReport> {
    ensure!(
        !survey.questions.is_empty(),
        EmptySurveySnafu {
            survey_id: survey.id.clone()
        }
    );
    let relevant: Vec<&Response> = responses
        .iter()
        .filter(|r| {
            if r.survey_id != survey.id {
                warn!(
                    "aggregate: skipping response {} recorded for survey {} instead of {}",
                    r.id, r.survey_id, survey.id
                );
                false
            } else {
                true
            }
        })
        .collect();
    info!(
        "aggregate: survey {}: processing {} responses",
        survey.id,
        relevant.len()
    );

    let mut respondent_counts: BTreeMap<String, u64> = BTreeMap::new();
    for r in relevant.iter() {
        *respondent_counts.entry(r.employee_id.clone()).or_insert(0) += 1;
    }

    let mut question_tallies: Vec<QuestionTally> = Vec::new();
    let mut free_text: Vec<FreeTextCollection> = Vec::new();
    for q in survey.sorted_questions() {
        if q.question_type.is_choice() && !q.options.is_empty() {
            let tally = if q.question_type == QuestionType::RankedChoice {
                tally_ranked(q, &relevant)
            } else {
                tally_options(q, &relevant)
            };
            debug!("aggregate: question {}: {:?}", q.id, tally);
            question_tallies.push(QuestionTally {
                question_id: q.id.clone(),
                prompt: q.prompt.clone(),
                question_type: q.question_type,
                tally,
            });
        } else if q.question_type.is_free_text() {
            let entries = collect_free_text(q, &relevant);
            if !entries.is_empty() {
                free_text.push(FreeTextCollection {
                    question_id: q.id.clone(),
                    prompt: q.prompt.clone(),
                    question_type: q.question_type,
                    entries,
                });
            }
        }
    }

    Ok(SurveyReport {
        survey_id: survey.id.clone(),
        response_count: relevant.len() as u64,
        respondent_counts: respondent_counts.into_iter().collect(),
        question_tallies,
        free_text,
    })
}

/// Tabulates only the responses of one respondent.
pub fn aggregate_for_respondent(
    survey: &Survey,
    responses: &[Response],
    employee_id: &str,
) -> SurveyResult<SurveyReport> {
    let selected: Vec<Response> = responses
        .iter()
        .filter(|r| r.employee_id == employee_id)
        .cloned()
        .collect();
    aggregate(survey, &selected)
}

fn tally_options(q: &Question, responses: &[&Response]) -> Tally {
    // Duplicate options share the counter of their first occurrence.
    let mut counts: Vec<(String, u64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for opt in q.options.iter() {
        if !index.contains_key(opt.as_str()) {
            index.insert(opt.as_str(), counts.len());
            counts.push((opt.clone(), 0));
        }
    }

    for r in responses.iter() {
        let encoded = match r.answer(&q.id) {
            Some(a) if !a.is_empty() => a,
            _ => continue,
        };
        let picked: Vec<String> = match q.question_type {
            QuestionType::MultiChoice => match decode(q.question_type, encoded) {
                AnswerValue::Multi(items) => items,
                _ => Vec::new(),
            },
            _ => vec![encoded.trim().to_string()],
        };
        // A response counts at most once per option.
        let mut seen: HashSet<usize> = HashSet::new();
        for p in picked.iter() {
            match index.get(p.as_str()) {
                Some(idx) if seen.insert(*idx) => counts[*idx].1 += 1,
                Some(_) => {}
                None => debug!(
                    "tally_options: question {}: response {}: ignoring unknown value {:?}",
                    q.id, r.id, p
                ),
            }
        }
    }
    Tally::Options(counts)
}

fn tally_ranked(q: &Question, responses: &[&Response]) -> Tally {
    let mut responses_ranked: u64 = 0;
    let mut total_ranked: u64 = 0;
    for r in responses.iter() {
        let n = r.answer(&q.id).map(ranked_count).unwrap_or(0) as u64;
        if n > 0 {
            responses_ranked += 1;
            total_ranked += n;
        }
    }
    Tally::Ranked {
        responses_ranked,
        total_ranked,
    }
}

fn collect_free_text(q: &Question, responses: &[&Response]) -> Vec<FreeTextEntry> {
    let mut entries: Vec<FreeTextEntry> = responses
        .iter()
        .filter_map(|r| {
            let text = r.answer(&q.id)?.trim();
            if text.is_empty() {
                None
            } else {
                Some(FreeTextEntry {
                    respondent_id: r.employee_id.clone(),
                    text: text.to_string(),
                    submitted_at: r.submitted_at,
                })
            }
        })
        .collect();
    entries.sort_by_key(|e| e.submitted_at);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse::<DateTime<Utc>>().unwrap()
    }

    fn response(id: &str, employee: &str, time: &str, answers: &[(&str, &str)]) -> Response {
        Response {
            id: id.to_string(),
            survey_id: "s1".to_string(),
            employee_id: employee.to_string(),
            submitted_at: at(time),
            answers: answers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn survey() -> Survey {
        let mut b = Builder::new("s1", "Office survey");
        b.add_choice_question("q1", "Happy?", QuestionType::SingleChoice, &["Yes", "No"])
            .unwrap();
        b.add_choice_question(
            "q2",
            "Drinks",
            QuestionType::MultiChoice,
            &["Coffee", "Tea", "Water"],
        )
        .unwrap();
        b.add_choice_question("q3", "Rank", QuestionType::RankedChoice, &["X", "Y", "Z"])
            .unwrap();
        b.add_question("q4", "Comments", QuestionType::LongText)
            .unwrap();
        b.add_question("q5", "Nickname", QuestionType::ShortText)
            .unwrap();
        b.build().unwrap()
    }

    #[test]
    fn counts_single_choice() {
        let responses = vec![
            response("r1", "a", "2024-01-01T10:00:00Z", &[("q1", "Yes")]),
            response("r2", "b", "2024-01-01T11:00:00Z", &[("q1", " No ")]),
            response("r3", "c", "2024-01-01T12:00:00Z", &[("q1", "Yes")]),
        ];
        let report = aggregate(&survey(), &responses).unwrap();
        let t = &report.tally_for("q1").unwrap().tally;
        assert_eq!(t.count_for("Yes"), Some(2));
        assert_eq!(t.count_for("No"), Some(1));
        assert_eq!(report.response_count, 3);
    }

    #[test]
    fn single_choice_totals_bounded_by_responses() {
        let responses = vec![
            response("r1", "a", "2024-01-01T10:00:00Z", &[("q1", "Yes")]),
            response("r2", "b", "2024-01-01T11:00:00Z", &[("q1", "Maybe")]),
            response("r3", "c", "2024-01-01T12:00:00Z", &[]),
        ];
        let report = aggregate(&survey(), &responses).unwrap();
        let total: u64 = match &report.tally_for("q1").unwrap().tally {
            Tally::Options(counts) => counts.iter().map(|(_, c)| *c).sum(),
            _ => panic!("not an option tally"),
        };
        assert_eq!(total, 1);
        assert!(total <= report.response_count);

        let all_answered = vec![
            response("r1", "a", "2024-01-01T10:00:00Z", &[("q1", "Yes")]),
            response("r2", "b", "2024-01-01T11:00:00Z", &[("q1", "No")]),
        ];
        let report = aggregate(&survey(), &all_answered).unwrap();
        let total: u64 = match &report.tally_for("q1").unwrap().tally {
            Tally::Options(counts) => counts.iter().map(|(_, c)| *c).sum(),
            _ => panic!("not an option tally"),
        };
        assert_eq!(total, report.response_count);
    }

    #[test]
    fn counts_multi_choice_once_per_response() {
        let responses = vec![
            response("r1", "a", "2024-01-01T10:00:00Z", &[("q2", "Tea, Coffee")]),
            response("r2", "b", "2024-01-01T11:00:00Z", &[("q2", "Tea,Tea,Juice")]),
        ];
        let report = aggregate(&survey(), &responses).unwrap();
        let t = &report.tally_for("q2").unwrap().tally;
        assert_eq!(
            t,
            &Tally::Options(vec![
                ("Coffee".to_string(), 1),
                ("Tea".to_string(), 2),
                ("Water".to_string(), 0),
            ])
        );
    }

    #[test]
    fn ranked_choice_reports_aggregate_counters() {
        let responses = vec![
            response("r1", "a", "2024-01-01T10:00:00Z", &[("q3", "1,2")]),
            response("r2", "b", "2024-01-01T11:00:00Z", &[("q3", "1,2")]),
            response("r3", "c", "2024-01-01T12:00:00Z", &[("q3", "")]),
        ];
        let report = aggregate(&survey(), &responses).unwrap();
        assert_eq!(
            report.tally_for("q3").unwrap().tally,
            Tally::Ranked {
                responses_ranked: 2,
                total_ranked: 4
            }
        );
    }

    #[test]
    fn free_text_is_ordered_by_submission() {
        let responses = vec![
            response("r1", "late", "2024-01-03T10:00:00Z", &[("q4", " third ")]),
            response("r2", "early", "2024-01-01T10:00:00Z", &[("q4", "first")]),
            response("r3", "blank", "2024-01-02T10:00:00Z", &[("q4", "   ")]),
        ];
        let report = aggregate(&survey(), &responses).unwrap();
        let texts = report.free_text_for("q4").unwrap();
        let got: Vec<(&str, &str)> = texts
            .entries
            .iter()
            .map(|e| (e.respondent_id.as_str(), e.text.as_str()))
            .collect();
        assert_eq!(got, vec![("early", "first"), ("late", "third")]);
        // Nobody answered q5.
        assert!(report.free_text_for("q5").is_none());
    }

    #[test]
    fn counts_per_respondent() {
        let responses = vec![
            response("r1", "bob", "2024-01-01T10:00:00Z", &[]),
            response("r2", "alice", "2024-01-01T11:00:00Z", &[]),
            response("r3", "bob", "2024-01-01T12:00:00Z", &[]),
        ];
        let report = aggregate(&survey(), &responses).unwrap();
        assert_eq!(
            report.respondent_counts,
            vec![("alice".to_string(), 1), ("bob".to_string(), 2)]
        );
    }

    #[test]
    fn skips_other_surveys_and_filters_respondents() {
        let mut other = response("r9", "bob", "2024-01-01T10:00:00Z", &[("q1", "Yes")]);
        other.survey_id = "s2".to_string();
        let responses = vec![
            other,
            response("r1", "bob", "2024-01-01T10:00:00Z", &[("q1", "No")]),
            response("r2", "alice", "2024-01-01T11:00:00Z", &[("q1", "Yes")]),
        ];
        let report = aggregate(&survey(), &responses).unwrap();
        assert_eq!(report.response_count, 2);
        let bob = aggregate_for_respondent(&survey(), &responses, "bob").unwrap();
        assert_eq!(bob.response_count, 1);
        assert_eq!(bob.tally_for("q1").unwrap().tally.count_for("No"), Some(1));
        assert_eq!(bob.tally_for("q1").unwrap().tally.count_for("Yes"), Some(0));
    }

    #[test]
    fn aggregation_is_repeatable() {
        let responses = vec![response(
            "r1",
            "a",
            "2024-01-01T10:00:00Z",
            &[("q1", "Yes"), ("q2", "Water"), ("q4", "ok")],
        )];
        let s = survey();
        assert_eq!(
            aggregate(&s, &responses).unwrap(),
            aggregate(&s, &responses).unwrap()
        );
    }

    #[test]
    fn empty_survey_fails() {
        let s = Survey::new("s1", "Empty");
        assert!(matches!(
            aggregate(&s, &[]),
            Err(SurveyError::EmptySurvey { .. })
        ));
    }
}
