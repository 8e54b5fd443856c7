pub use crate::model::*;

use snafu::{ensure, OptionExt};

use crate::template::default_options;
use crate::validate::validate_survey;

/// A builder for assembling surveys question by question.
///
/// Questions are presented in the order they are added.
///
/// ```
/// use survey_core::builder::Builder;
/// use survey_core::{QuestionType, SurveyError};
///
/// let mut builder = Builder::new("s1", "Team lunch").description("Sent after the monthly lunch");
/// builder.add_choice_question("q1", "Did you join?", QuestionType::SingleChoice, &["Yes", "No"])?;
/// builder.add_question("q2", "Any comment?", QuestionType::LongText)?;
/// builder.add_branch("q1", "No", "q2")?;
///
/// let survey = builder.build()?;
/// assert_eq!(survey.questions.len(), 2);
/// assert_eq!(survey.description.as_deref(), Some("Sent after the monthly lunch"));
///
/// # Ok::<(), SurveyError>(())
/// ```
pub struct Builder {
    pub(crate) _survey: Survey,
}

impl Builder {
    pub fn new(id: &str, title: &str) -> Builder {
        Builder {
            _survey: Survey::new(id, title),
        }
    }

    pub fn description(self, description: &str) -> Builder {
        let mut survey = self._survey;
        survey.description = Some(description.to_string());
        Builder { _survey: survey }
    }

    /// Adds a question with the default options of its type.
    pub fn add_question(
        &mut self,
        id: &str,
        prompt: &str,
        question_type: QuestionType,
    ) -> SurveyResult<()> {
        let mut q = Question::new(id, prompt, question_type);
        q.options = default_options(question_type);
        self.push(q)
    }

    /// Adds a question with explicit options.
    pub fn add_choice_question(
        &mut self,
        id: &str,
        prompt: &str,
        question_type: QuestionType,
        options: &[&str],
    ) -> SurveyResult<()> {
        let mut q = Question::new(id, prompt, question_type);
        q.options = options.iter().map(|s| s.to_string()).collect();
        self.push(q)
    }

    /// Shows the question `target` next when `option` is picked on `question_id`.
    ///
    /// The target does not need to exist yet; `build` checks it.
    pub fn add_branch(&mut self, question_id: &str, option: &str, target: &str) -> SurveyResult<()> {
        let q = self.question_mut(question_id)?;
        q.conditional_logic
            .insert(option.to_string(), target.to_string());
        Ok(())
    }

    pub fn max_selected(&mut self, question_id: &str, max: u32) -> SurveyResult<()> {
        self.question_mut(question_id)?.max_selected = Some(max);
        Ok(())
    }

    pub fn max_rank(&mut self, question_id: &str, max: u32) -> SurveyResult<()> {
        self.question_mut(question_id)?.max_rank = Some(max);
        Ok(())
    }

    /// Validates and returns the survey.
    pub fn build(self) -> SurveyResult<Survey> {
        validate_survey(&self._survey)?;
        Ok(self._survey)
    }

    /// Returns the survey as assembled, without validation.
    pub fn build_unchecked(self) -> Survey {
        self._survey
    }

    fn push(&mut self, mut question: Question) -> SurveyResult<()> {
        ensure!(
            self._survey.question(&question.id).is_none(),
            DuplicateQuestionIdSnafu {
                question_id: question.id.clone()
            }
        );
        question.sort_order = self._survey.questions.len() as i64;
        self._survey.questions.push(question);
        Ok(())
    }

    fn question_mut(&mut self, question_id: &str) -> SurveyResult<&mut Question> {
        let survey_id = self._survey.id.clone();
        self._survey
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .context(UnknownQuestionSnafu {
                survey_id,
                question_id,
            })
    }
}
