// ********* Input data structures ***********

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use snafu::Snafu;

/// The kinds of questions a survey may contain.
///
/// The serialized names are the snake case variants. The labels used by the
/// historical authoring tool are accepted when reading, so that exported
/// surveys can be loaded as they are.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[serde(alias = "객관식(단일)", alias = "객관식")]
    SingleChoice,
    #[serde(alias = "객관식(다중선택)")]
    MultiChoice,
    #[serde(alias = "객관식(드롭다운)")]
    DropdownChoice,
    #[serde(alias = "객관식(순위선택)")]
    RankedChoice,
    #[serde(alias = "단답형", alias = "주관식")]
    ShortText,
    #[serde(alias = "서술형")]
    LongText,
    /// Several free-text fields, one per entry in `options`.
    #[serde(alias = "복수형 주관식")]
    MultiText,
}

impl QuestionType {
    /// True for the four types that present a list of options to pick from.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            QuestionType::SingleChoice
                | QuestionType::MultiChoice
                | QuestionType::DropdownChoice
                | QuestionType::RankedChoice
        )
    }

    /// The types whose answers are collected verbatim in reports.
    pub fn is_free_text(&self) -> bool {
        matches!(self, QuestionType::ShortText | QuestionType::LongText)
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultiChoice => "multi_choice",
            QuestionType::DropdownChoice => "dropdown_choice",
            QuestionType::RankedChoice => "ranked_choice",
            QuestionType::ShortText => "short_text",
            QuestionType::LongText => "long_text",
            QuestionType::MultiText => "multi_text",
        }
    }
}

impl Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// The storage layer writes null for empty options and branch maps.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(|o| o.unwrap_or_default())
}

/// One item of a survey.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<String>,
    #[serde(rename = "sortOrder", default)]
    pub sort_order: i64,
    /// Maps a literal option value to the id of the question shown next.
    #[serde(
        rename = "conditionalLogic",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub conditional_logic: BTreeMap<String, String>,
    #[serde(
        rename = "maxSelected",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max_selected: Option<u32>,
    #[serde(rename = "maxRank", default, skip_serializing_if = "Option::is_none")]
    pub max_rank: Option<u32>,
}

impl Question {
    pub fn new(id: &str, prompt: &str, question_type: QuestionType) -> Question {
        Question {
            id: id.to_string(),
            prompt: prompt.to_string(),
            question_type,
            options: Vec::new(),
            sort_order: 0,
            conditional_logic: BTreeMap::new(),
            max_selected: None,
            max_rank: None,
        }
    }

    /// A question only branches when it has both options and a branch map.
    pub fn has_branching(&self) -> bool {
        !self.options.is_empty() && !self.conditional_logic.is_empty()
    }

    pub fn branch_target(&self, option: &str) -> Option<&str> {
        self.conditional_logic.get(option).map(|s| s.as_str())
    }

    pub fn non_blank_options(&self) -> usize {
        self.options.iter().filter(|o| !o.trim().is_empty()).count()
    }

    /// The maximum number of simultaneous selections, if bounded.
    pub fn selection_limit(&self) -> Option<usize> {
        match self.max_selected {
            Some(n) if n > 0 && self.question_type == QuestionType::MultiChoice => {
                Some(n as usize)
            }
            _ => None,
        }
    }

    /// The maximum number of ranked options, if bounded.
    pub fn rank_limit(&self) -> Option<usize> {
        match self.max_rank {
            Some(n) if n > 0 && self.question_type == QuestionType::RankedChoice => {
                Some(n as usize)
            }
            _ => None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Survey {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub questions: Vec<Question>,
    /// Set when the survey sits in the trash. None means active.
    #[serde(rename = "deletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdBy", default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl Survey {
    pub fn new(id: &str, title: &str) -> Survey {
        Survey {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            image_url: None,
            questions: Vec::new(),
            deleted_at: None,
            created_at: None,
            created_by: None,
        }
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// The questions in their base presentation order.
    ///
    /// Ties on `sort_order` keep the order of the `questions` array.
    pub fn sorted_questions(&self) -> Vec<&Question> {
        let mut sorted: Vec<&Question> = self.questions.iter().collect();
        sorted.sort_by_key(|q| q.sort_order);
        sorted
    }
}

/// An answer as held in memory, before encoding.
///
/// In JSON, a string reads as `Single` and an array as `Multi`. `Text` is
/// never produced when reading: it serializes as a plain string and reads
/// back as `Single`. The codec and the resolver treat both the same way, so
/// the question type, not the variant, decides how a string is handled.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// One chosen option.
    Single(String),
    /// Selected options in selection order, ranked options in rank order, or
    /// the lines of a multi-field text answer.
    Multi(Vec<String>),
    /// A free-text answer.
    Text(String),
}

impl AnswerValue {
    pub fn has_answer(&self) -> bool {
        match self {
            AnswerValue::Single(s) | AnswerValue::Text(s) => !s.trim().is_empty(),
            AnswerValue::Multi(items) => items.iter().any(|s| !s.trim().is_empty()),
        }
    }

    /// The option consulted for branching: the first one selected.
    pub fn first_selection(&self) -> Option<&str> {
        match self {
            AnswerValue::Single(s) | AnswerValue::Text(s) => Some(s.as_str()),
            AnswerValue::Multi(items) => items.first().map(|s| s.as_str()),
        }
    }

    /// Number of non-blank entries.
    pub fn selection_count(&self) -> usize {
        match self {
            AnswerValue::Single(s) | AnswerValue::Text(s) => usize::from(!s.trim().is_empty()),
            AnswerValue::Multi(items) => items.iter().filter(|s| !s.trim().is_empty()).count(),
        }
    }
}

/// Raw answers collected so far, keyed by question id.
pub type AnswerSheet = BTreeMap<String, AnswerValue>;

/// One respondent's completed pass through a survey.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    #[serde(rename = "surveyId")]
    pub survey_id: String,
    #[serde(rename = "employeeId")]
    pub employee_id: String,
    #[serde(rename = "submittedAt")]
    pub submitted_at: DateTime<Utc>,
    /// Encoded answers keyed by question id.
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
}

impl Response {
    pub fn answer(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).map(|s| s.as_str())
    }

    /// Flattens the response into the rows persisted next to its header.
    pub fn answer_rows(&self) -> Vec<AnswerRow> {
        self.answers
            .iter()
            .map(|(question_id, answer_text)| AnswerRow {
                response_id: self.id.clone(),
                question_id: question_id.clone(),
                answer_text: answer_text.clone(),
            })
            .collect()
    }
}

/// The persisted shape of a single answer: `(responseId, questionId) -> answerText`.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRow {
    #[serde(rename = "responseId")]
    pub response_id: String,
    #[serde(rename = "questionId")]
    pub question_id: String,
    #[serde(rename = "answerText")]
    pub answer_text: String,
}

/// Rebuilds responses from their headers and the answer rows stored apart.
///
/// Rows of unknown responses are dropped. A later row for the same question
/// replaces an earlier one.
pub fn assemble_responses(headers: Vec<Response>, rows: &[AnswerRow]) -> Vec<Response> {
    let mut responses = headers;
    let index: HashMap<String, usize> = responses
        .iter()
        .enumerate()
        .map(|(idx, r)| (r.id.clone(), idx))
        .collect();
    for row in rows.iter() {
        match index.get(&row.response_id) {
            Some(idx) => {
                responses[*idx]
                    .answers
                    .insert(row.question_id.clone(), row.answer_text.clone());
            }
            None => warn!(
                "assemble_responses: dropping answer to {} for unknown response {}",
                row.question_id, row.response_id
            ),
        }
    }
    responses
}

/// Errors reported by the survey core. Each names the survey, question or
/// template at fault.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SurveyError {
    #[snafu(display("survey {survey_id} has no questions"))]
    EmptySurvey { survey_id: String },

    #[snafu(display("survey {survey_id} has a blank title"))]
    BlankTitle { survey_id: String },

    #[snafu(display("question id {question_id} is used more than once"))]
    DuplicateQuestionId { question_id: String },

    #[snafu(display("question #{position} ({question_id}) has a blank prompt"))]
    BlankPrompt { question_id: String, position: usize },

    #[snafu(display(
        "question {question_id} needs at least {required} non-blank options, found {found}"
    ))]
    NotEnoughOptions {
        question_id: String,
        required: usize,
        found: usize,
    },

    #[snafu(display("question {question_id} branches on {option:?}, which is not one of its options"))]
    UnknownBranchOption { question_id: String, option: String },

    #[snafu(display("question {question_id} branches on {option:?} to unknown question {target}"))]
    UnknownBranchTarget {
        question_id: String,
        option: String,
        target: String,
    },

    #[snafu(display("no question {question_id} in survey {survey_id}"))]
    UnknownQuestion {
        survey_id: String,
        question_id: String,
    },

    #[snafu(display("question {question_id} ({prompt:?}) requires an answer"))]
    MissingAnswer { question_id: String, prompt: String },

    #[snafu(display("question {question_id} allows at most {max} selections, got {found}"))]
    TooManySelections {
        question_id: String,
        max: usize,
        found: usize,
    },

    #[snafu(display("question {question_id} allows at most {max} ranked options, got {found}"))]
    TooManyRanks {
        question_id: String,
        max: usize,
        found: usize,
    },

    #[snafu(display("template {template_id} has a blank name"))]
    BlankTemplateName { template_id: String },

    #[snafu(display("template {template_id} has no options"))]
    EmptyTemplate { template_id: String },

    #[snafu(display("template {template_id} is for {template_type}, which is not a choice type"))]
    TemplateNotChoice {
        template_id: String,
        template_type: QuestionType,
    },

    #[snafu(display(
        "template {template_id} is for {template_type} but question {question_id} is {question_type}"
    ))]
    TemplateTypeMismatch {
        template_id: String,
        template_type: QuestionType,
        question_id: String,
        question_type: QuestionType,
    },
}

pub type SurveyResult<T> = Result<T, SurveyError>;
