use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::model::*;

/// A question as submitted by the authoring tool when a survey is saved.
///
/// `id` is either the id of a question already stored, or a provisional id
/// only meaningful within the submission (new questions, possibly targeted by
/// branches of other drafts), or absent.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub prompt: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(rename = "conditionalLogic", default)]
    pub conditional_logic: BTreeMap<String, String>,
    #[serde(rename = "maxSelected", default)]
    pub max_selected: Option<u32>,
    #[serde(rename = "maxRank", default)]
    pub max_rank: Option<u32>,
}

impl QuestionDraft {
    pub fn from_question(q: &Question) -> QuestionDraft {
        QuestionDraft {
            id: Some(q.id.clone()),
            prompt: q.prompt.clone(),
            question_type: q.question_type,
            options: q.options.clone(),
            conditional_logic: q.conditional_logic.clone(),
            max_selected: q.max_selected,
            max_rank: q.max_rank,
        }
    }
}

/// What a full question-set replacement did, by question id.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ReplacementPlan {
    pub inserted: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
}

impl Survey {
    /// Replaces the whole question set of the survey.
    ///
    /// Drafts carrying the id of a stored question update it in place. Other
    /// drafts become new questions with an id from `next_id`; branches that
    /// pointed at their provisional id are rewritten. Stored questions left
    /// out of `drafts` are deleted. The sort order follows the draft order.
    ///
    /// Branches to deleted questions are kept as is; `validate_survey`
    /// reports them.
    pub fn replace_questions<F>(&mut self, drafts: Vec<QuestionDraft>, mut next_id: F) -> ReplacementPlan
    where
        F: FnMut() -> String,
    {
        let existing: HashSet<String> = self.questions.iter().map(|q| q.id.clone()).collect();
        let mut plan = ReplacementPlan::default();
        let mut renamed: HashMap<String, String> = HashMap::new();
        let mut kept: HashSet<String> = HashSet::new();
        let mut questions: Vec<Question> = Vec::new();

        for (idx, draft) in drafts.into_iter().enumerate() {
            let id = match draft.id {
                Some(id) if existing.contains(&id) && !kept.contains(&id) => {
                    plan.updated.push(id.clone());
                    id
                }
                provisional => {
                    let id = next_id();
                    if let Some(p) = provisional {
                        debug!("replace_questions: {} is stored as {}", p, id);
                        renamed.insert(p, id.clone());
                    }
                    plan.inserted.push(id.clone());
                    id
                }
            };
            kept.insert(id.clone());
            questions.push(Question {
                id,
                prompt: draft.prompt,
                question_type: draft.question_type,
                options: draft.options,
                sort_order: idx as i64,
                conditional_logic: draft.conditional_logic,
                max_selected: draft.max_selected,
                max_rank: draft.max_rank,
            });
        }

        for q in questions.iter_mut() {
            for target in q.conditional_logic.values_mut() {
                if let Some(stored) = renamed.get(target.as_str()) {
                    *target = stored.clone();
                }
            }
        }

        plan.deleted = self
            .questions
            .iter()
            .filter(|q| !kept.contains(&q.id))
            .map(|q| q.id.clone())
            .collect();
        info!(
            "replace_questions: survey {}: {} inserted, {} updated, {} deleted",
            self.id,
            plan.inserted.len(),
            plan.updated.len(),
            plan.deleted.len()
        );
        self.questions = questions;
        plan
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Moves the survey to the trash.
    pub fn soft_delete(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
    }

    pub fn restore(&mut self) {
        self.deleted_at = None;
    }
}

/// Splits surveys into the active ones and the ones in the trash.
pub fn partition_by_status(surveys: Vec<Survey>) -> (Vec<Survey>, Vec<Survey>) {
    surveys.into_iter().partition(|s| s.is_active())
}
