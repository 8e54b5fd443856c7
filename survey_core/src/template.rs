use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::model::*;

/// A named set of options that can be loaded into a choice question.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuestionTemplate {
    pub id: String,
    pub name: String,
    #[serde(rename = "questionType")]
    pub question_type: QuestionType,
    pub options: Vec<String>,
}

impl QuestionTemplate {
    pub fn validate(&self) -> SurveyResult<()> {
        ensure!(
            !self.name.trim().is_empty(),
            BlankTemplateNameSnafu {
                template_id: self.id.clone()
            }
        );
        ensure!(
            self.question_type.is_choice(),
            TemplateNotChoiceSnafu {
                template_id: self.id.clone(),
                template_type: self.question_type,
            }
        );
        ensure!(
            !self.options.is_empty(),
            EmptyTemplateSnafu {
                template_id: self.id.clone()
            }
        );
        Ok(())
    }

    /// Replaces the options of the question with the ones of the template.
    ///
    /// Only questions of the same type accept a template. Branches keyed on
    /// options that no longer exist are dropped.
    pub fn apply_to(&self, question: &mut Question) -> SurveyResult<()> {
        self.validate()?;
        ensure!(
            question.question_type == self.question_type,
            TemplateTypeMismatchSnafu {
                template_id: self.id.clone(),
                template_type: self.question_type,
                question_id: question.id.clone(),
                question_type: question.question_type,
            }
        );
        question.options = self.options.clone();
        let options = &question.options;
        question
            .conditional_logic
            .retain(|option, _| options.contains(option));
        Ok(())
    }
}

const SATISFACTION_SCALE: [&str; 6] = [
    "Very dissatisfied",
    "Dissatisfied",
    "Somewhat dissatisfied",
    "Somewhat satisfied",
    "Satisfied",
    "Very satisfied",
];

/// The options a new question starts with in the authoring tool.
pub fn default_options(question_type: QuestionType) -> Vec<String> {
    match question_type {
        QuestionType::RankedChoice => (1..=3).map(|i| format!("Option {}", i)).collect(),
        QuestionType::SingleChoice | QuestionType::MultiChoice | QuestionType::DropdownChoice => {
            SATISFACTION_SCALE.iter().map(|s| s.to_string()).collect()
        }
        QuestionType::MultiText => vec!["Item 1".to_string()],
        QuestionType::ShortText | QuestionType::LongText => Vec::new(),
    }
}
