use std::collections::HashMap;

use csv::StringRecord;

use crate::tab::io_common::{make_default_id, parse_timestamp};
use crate::tab::*;

const COLUMNS: [&str; 6] = [
    "responseId",
    "surveyId",
    "employeeId",
    "submittedAt",
    "questionId",
    "answerText",
];

fn column_indexes(header: &StringRecord, path: &str) -> TabResult<[usize; 6]> {
    let mut idxs = [0usize; 6];
    for (i, name) in COLUMNS.iter().enumerate() {
        idxs[i] = header
            .iter()
            .position(|h| h.trim() == *name)
            .context(MissingColumnSnafu {
                column: name.to_string(),
                path: path.to_string(),
            })?;
    }
    Ok(idxs)
}

/// Reads the answer table: one line per stored answer, preceded by a header
/// line naming the columns.
///
/// The response header (survey, respondent, submission time) is taken from
/// the first line of each response. An empty `responseId` gets an id derived
/// from the line number, so the line forms a response of its own.
pub fn read_csv_responses(path: &str) -> BTabResult<Vec<Response>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu {
            path: path.to_string(),
        })?;
    let header = rdr
        .headers()
        .context(CsvLineParseSnafu { lineno: 1usize })?
        .clone();
    let [id_idx, survey_idx, employee_idx, submitted_idx, question_idx, answer_idx] =
        column_indexes(&header, path)?;
    debug!("read_csv_responses: {}: header: {:?}", path, header);

    let mut headers: Vec<Response> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<AnswerRow> = Vec::new();
    for (idx, record_r) in rdr.records().enumerate() {
        let lineno = idx + 2;
        let record = record_r.context(CsvLineParseSnafu { lineno })?;
        let field = |i: usize| record.get(i).unwrap_or("").to_string();

        let response_id = match field(id_idx).trim() {
            "" => make_default_id(path, lineno),
            x => x.to_string(),
        };
        if !seen.contains_key(&response_id) {
            let submitted_at = parse_timestamp(&field(submitted_idx), lineno)?;
            seen.insert(response_id.clone(), headers.len());
            headers.push(Response {
                id: response_id.clone(),
                survey_id: field(survey_idx).trim().to_string(),
                employee_id: field(employee_idx).trim().to_string(),
                submitted_at,
                answers: Default::default(),
            });
        }

        let question_id = field(question_idx).trim().to_string();
        if question_id.is_empty() {
            warn!(
                "read_csv_responses: {}: line {} has no question id, skipping",
                path, lineno
            );
            continue;
        }
        rows.push(AnswerRow {
            response_id,
            question_id,
            answer_text: field(answer_idx),
        });
    }
    info!(
        "read_csv_responses: {}: {} responses, {} answers",
        path,
        headers.len(),
        rows.len()
    );
    Ok(assemble_responses(headers, &rows))
}
