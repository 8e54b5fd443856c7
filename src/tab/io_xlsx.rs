use calamine::{open_workbook, DataType, Reader, Xlsx};
use chrono::{DateTime, Utc};

use crate::tab::config_reader::ResponseSource;
use crate::tab::io_common::{excel_serial_to_datetime, make_default_id, parse_timestamp};
use crate::tab::*;

/// Where the fixed columns and the question columns sit in the header row.
#[derive(Eq, PartialEq, Debug)]
struct SheetLayout {
    id_idx: Option<usize>,
    employee_idx: usize,
    submitted_idx: usize,
    questions: Vec<(usize, String)>,
}

fn header_text(cell: &DataType) -> Option<String> {
    match cell {
        DataType::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        DataType::Int(i) => Some(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Some(format!("{}", *f as i64)),
        _ => None,
    }
}

fn read_layout(header: &[DataType], path: &str) -> TabResult<SheetLayout> {
    let names: Vec<Option<String>> = header.iter().map(header_text).collect();
    let find = |name: &str| names.iter().position(|n| n.as_deref() == Some(name));
    let employee_idx = find("employeeId").context(MissingColumnSnafu {
        column: "employeeId",
        path,
    })?;
    let submitted_idx = find("submittedAt").context(MissingColumnSnafu {
        column: "submittedAt",
        path,
    })?;
    let id_idx = find("responseId");
    let questions = names
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != id_idx && *i != employee_idx && *i != submitted_idx)
        .filter_map(|(i, n)| n.clone().map(|n| (i, n)))
        .collect();
    Ok(SheetLayout {
        id_idx,
        employee_idx,
        submitted_idx,
        questions,
    })
}

/// The stored answer held in a question cell. Empty cells are unanswered
/// questions.
fn read_answer_cell(cell: &DataType, lineno: usize) -> TabResult<Option<String>> {
    match cell {
        DataType::Empty => Ok(None),
        DataType::String(s) if s.trim().is_empty() => Ok(None),
        DataType::String(s) => Ok(Some(s.clone())),
        DataType::Int(i) => Ok(Some(i.to_string())),
        DataType::Float(f) if f.fract() == 0.0 => Ok(Some(format!("{}", *f as i64))),
        DataType::Float(f) => Ok(Some(f.to_string())),
        DataType::Bool(b) => Ok(Some(b.to_string())),
        x => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", x),
        }
        .fail(),
    }
}

fn read_text_cell(cell: Option<&DataType>, lineno: usize) -> TabResult<Option<String>> {
    match cell {
        None | Some(DataType::Empty) => Ok(None),
        Some(DataType::String(s)) => Ok(Some(s.trim().to_string()).filter(|s| !s.is_empty())),
        Some(DataType::Int(i)) => Ok(Some(i.to_string())),
        Some(DataType::Float(f)) if f.fract() == 0.0 => Ok(Some(format!("{}", *f as i64))),
        Some(x) => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", x),
        }
        .fail(),
    }
}

fn read_timestamp_cell(cell: Option<&DataType>, lineno: usize) -> TabResult<DateTime<Utc>> {
    match cell {
        Some(DataType::String(s)) => parse_timestamp(s, lineno),
        Some(DataType::DateTime(f)) | Some(DataType::Float(f)) => excel_serial_to_datetime(*f)
            .context(ParsingTimestampSnafu {
                value: f.to_string(),
                lineno,
            }),
        x => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", x),
        }
        .fail(),
    }
}

fn get_range(path: &str, source: &ResponseSource) -> BTabResult<calamine::Range<DataType>> {
    debug!(
        "read_xlsx_responses: path: {:?} worksheet: {:?}",
        path, &source.excel_worksheet_name
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = source.excel_worksheet_name.as_ref() {
        let wrange = workbook
            .worksheet_range(worksheet_name)
            .context(MissingWorksheetSnafu {
                name: worksheet_name.clone(),
                path,
            })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => Err(Box::new(TabError::EmptyExcel {
                path: path.to_string(),
            })),
            [(worksheet_name, wrange)] => {
                debug!(
                    "read_xlsx_responses: path: {:?} worksheet: {:?}",
                    path, worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => Err(Box::new(TabError::AmbiguousWorksheet {
                path: path.to_string(),
            })),
        }
    }
}

/// Reads one response per row. The first row is the header.
pub fn read_xlsx_responses(
    path: &str,
    source: &ResponseSource,
    survey_id: &str,
) -> BTabResult<Vec<Response>> {
    let wrange = get_range(path, source)?;
    let mut iter = wrange.rows();
    let header = iter.next().context(EmptyExcelSnafu { path })?;
    let layout = read_layout(header, path)?;
    debug!("read_xlsx_responses: layout: {:?}", layout);

    let mut res: Vec<Response> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let lineno = idx + 2;
        if row.iter().all(|c| matches!(c, DataType::Empty)) {
            continue;
        }
        let id = match layout.id_idx {
            Some(i) => read_text_cell(row.get(i), lineno)?,
            None => None,
        }
        .unwrap_or_else(|| make_default_id(path, lineno));
        let employee_id = read_text_cell(row.get(layout.employee_idx), lineno)?
            .unwrap_or_default();
        let submitted_at = read_timestamp_cell(row.get(layout.submitted_idx), lineno)?;
        let mut response = Response {
            id,
            survey_id: survey_id.to_string(),
            employee_id,
            submitted_at,
            answers: Default::default(),
        };
        for (col, question_id) in layout.questions.iter() {
            if let Some(cell) = row.get(*col) {
                if let Some(answer) = read_answer_cell(cell, lineno)? {
                    response.answers.insert(question_id.clone(), answer);
                }
            }
        }
        res.push(response);
    }
    info!("read_xlsx_responses: {}: {} responses", path, res.len());
    Ok(res)
}
