use log::{debug, info, warn};

use snafu::{prelude::*, ErrorCompat, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use survey_core::*;
use text_diff::print_diff;

use crate::tab::config_reader::*;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_json;
mod io_xlsx;

pub use crate::tab::io_common::infer_provider;

#[derive(Debug, Snafu)]
pub enum TabError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The spreadsheet {path} is empty"))]
    EmptyExcel { path: String },
    #[snafu(display("Worksheet {name} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("{path} has several worksheets, the worksheet name must be provided"))]
    AmbiguousWorksheet { path: String },
    #[snafu(display("Unexpected cell at line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("Column {column} is missing from {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Invalid timestamp {value:?} at line {lineno}"))]
    ParsingTimestamp { value: String, lineno: usize },
    #[snafu(display("Unknown response provider {provider}"))]
    UnknownProvider { provider: String },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("{source}"))]
    Survey { source: SurveyError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TabResult<T> = Result<T, TabError>;
pub type BTabResult<T> = Result<T, Box<TabError>>;

/// What to tabulate and where to write it.
#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub config_path: String,
    /// Summary to compare the computed one with.
    pub reference_path: Option<String>,
    /// A file, or `stdout`.
    pub out_path: Option<String>,
    /// Replaces the response sources of the configuration.
    pub input: Option<ResponseSource>,
    /// Restricts the report to the responses of one respondent.
    pub respondent: Option<String>,
}

fn read_responses(path: &str, source: &ResponseSource, survey: &Survey) -> BTabResult<Vec<Response>> {
    info!("Attempting to read response file {:?}", path);
    match source.provider()? {
        Provider::Json => io_json::read_json_responses(path),
        Provider::Csv => io_csv::read_csv_responses(path),
        Provider::Xlsx => io_xlsx::read_xlsx_responses(path, source, &survey.id),
    }
}

fn format_timestamp(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn tally_to_json(t: &QuestionTally) -> JSValue {
    let mut js = json!({
        "question": t.question_id,
        "prompt": t.prompt,
        "type": t.question_type.label(),
    });
    match &t.tally {
        Tally::Options(counts) => {
            let options: Vec<JSValue> = counts
                .iter()
                .map(|(option, count)| json!({"option": option, "count": count}))
                .collect();
            js["options"] = json!(options);
        }
        Tally::Ranked {
            responses_ranked,
            total_ranked,
        } => {
            js["ranked"] = json!({
                "responses": responses_ranked,
                "selections": total_ranked,
            });
        }
    }
    js
}

fn free_text_to_json(c: &FreeTextCollection) -> JSValue {
    let answers: Vec<JSValue> = c
        .entries
        .iter()
        .map(|e| {
            json!({
                "respondent": e.respondent_id,
                "text": e.text,
                "submittedAt": format_timestamp(&e.submitted_at),
            })
        })
        .collect();
    json!({
        "question": c.question_id,
        "prompt": c.prompt,
        "type": c.question_type.label(),
        "answers": answers,
    })
}

fn build_summary_js(config: &TabConfig, report: &SurveyReport, respondent: Option<&str>) -> JSValue {
    let mut config_js = json!({
        "report": config.output_settings.report_name,
        "survey": config.survey.id,
        "title": config.survey.title,
        "responses": report.response_count,
    });
    if let Some(r) = respondent {
        config_js["respondent"] = json!(r);
    }
    let mut respondents: JSMap<String, JSValue> = JSMap::new();
    for (id, count) in report.respondent_counts.iter() {
        respondents.insert(id.clone(), json!(count));
    }
    let tallies: Vec<JSValue> = report.question_tallies.iter().map(tally_to_json).collect();
    let free_text: Vec<JSValue> = report.free_text.iter().map(free_text_to_json).collect();
    json!({
        "config": config_js,
        "respondents": respondents,
        "tallies": tallies,
        "freeText": free_text,
    })
}

fn output_path(request: &ReportRequest, config: &TabConfig, root_p: &Path) -> Option<String> {
    if let Some(out) = request.out_path.clone() {
        return Some(out);
    }
    let dir = config.output_settings.output_directory.clone()?;
    let file_name: String = config
        .output_settings
        .report_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let p: PathBuf = [
        root_p.to_path_buf(),
        PathBuf::from(dir),
        PathBuf::from(format!("{}_summary.json", file_name)),
    ]
    .iter()
    .collect();
    Some(p.display().to_string())
}

fn write_output(out_path: Option<String>, contents: &str) -> BTabResult<()> {
    match out_path.as_deref() {
        None | Some("stdout") => {
            println!("{}", contents);
        }
        Some(p) => {
            info!("Writing summary to {:?}", p);
            fs::write(p, contents).context(WritingOutputSnafu { path: p })?;
        }
    }
    Ok(())
}

fn check_reference(reference_path: &str, pretty_js_stats: &str) -> TabResult<()> {
    let summary_ref = read_summary(reference_path)?;
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference summary");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        whatever!("Difference detected between calculated summary and reference summary")
    }
    Ok(())
}

/// Tabulates the responses described by a configuration file.
pub fn run_report(request: &ReportRequest) -> BTabResult<()> {
    let config_p = Path::new(request.config_path.as_str());
    let config = read_config(&request.config_path)?;
    info!("config: {:?}", config.output_settings);
    validate_stored_survey(&config.survey).context(SurveySnafu {})?;

    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
    let mut responses: Vec<Response> = Vec::new();
    match request.input.as_ref() {
        Some(source) => {
            let mut file_data = read_responses(&source.file_path, source, &config.survey)?;
            responses.append(&mut file_data);
        }
        None => {
            if config.response_sources.is_empty() {
                warn!("run_report: no response source in {}", request.config_path);
            }
            for source in config.response_sources.iter() {
                let p: PathBuf = [root_p.to_path_buf(), PathBuf::from(&source.file_path)]
                    .iter()
                    .collect();
                let p2 = p.as_path().display().to_string();
                let mut file_data = read_responses(&p2, source, &config.survey)?;
                responses.append(&mut file_data);
            }
        }
    }
    debug!("run_report: {} responses read", responses.len());

    let report = match request.respondent.as_deref() {
        Some(employee_id) => aggregate_for_respondent(&config.survey, &responses, employee_id),
        None => aggregate(&config.survey, &responses),
    }
    .context(SurveySnafu {})?;

    let result_js = build_summary_js(&config, &report, request.respondent.as_deref());
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    write_output(output_path(request, &config, root_p), &pretty_js_stats)?;

    if let Some(reference_path) = request.reference_path.as_deref() {
        check_reference(reference_path, &pretty_js_stats)?;
    }
    Ok(())
}

fn build_resolve_js(config_path: &str, answers_path: &str) -> BTabResult<JSValue> {
    let config = read_config(config_path)?;
    validate_stored_survey(&config.survey).context(SurveySnafu {})?;
    let sheet = read_answer_sheet(answers_path)?;
    let visible = resolve_visible_questions(&config.survey, &sheet).context(SurveySnafu {})?;
    let visible_ids: Vec<&str> = visible.iter().map(|q| q.id.as_str()).collect();
    let unanswered: Vec<&str> = visible
        .iter()
        .filter(|q| !sheet.get(&q.id).map(|a| a.has_answer()).unwrap_or(false))
        .map(|q| q.id.as_str())
        .collect();
    info!(
        "build_resolve_js: {} visible questions, {} unanswered",
        visible_ids.len(),
        unanswered.len()
    );
    Ok(json!({
        "survey": config.survey.id,
        "visible": visible_ids,
        "unanswered": unanswered,
    }))
}

/// Prints the questions shown to a respondent, given the answers collected
/// so far.
pub fn run_resolve(config_path: &str, answers_path: &str, out_path: Option<String>) -> BTabResult<()> {
    let js = build_resolve_js(config_path, answers_path)?;
    let pretty = serde_json::to_string_pretty(&js).context(ParsingJsonSnafu {})?;
    write_output(out_path, &pretty)
}

/// Prints an error and its trace, if any.
pub fn report_error(e: &TabError) {
    eprintln!("An error occured: {}", e);
    if let Some(bt) = ErrorCompat::backtrace(e) {
        eprintln!("trace: {}", bt);
    }
}

#[cfg(test)]
fn run_report_test(test_name: &str, config_lpath: &str, summary_lpath: &str) {
    let test_dir = format!("{}/tests/data", env!("CARGO_MANIFEST_DIR"));
    info!("Running test {}", test_name);
    let res = run_report(&ReportRequest {
        config_path: format!("{}/{}/{}", test_dir, test_name, config_lpath),
        reference_path: Some(format!("{}/{}/{}", test_dir, test_name, summary_lpath)),
        ..Default::default()
    });
    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        report_error(&e);
        panic!("test {} failed: {}", test_name, e);
    }
}

#[cfg(test)]
pub fn test_wrapper(test_name: &str) {
    run_report_test(
        test_name,
        format!("{}_config.json", test_name).as_str(),
        format!("{}_expected_summary.json", test_name).as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn lunch_linear() {
        init();
        test_wrapper("lunch_linear");
    }

    #[test]
    fn onboarding_branching() {
        init();
        test_wrapper("onboarding_branching");
    }

    #[test]
    fn tools_ranked() {
        init();
        test_wrapper("tools_ranked");
    }

    #[test]
    fn respondent_filter() {
        init();
        let test_dir = format!("{}/tests/data/lunch_linear", env!("CARGO_MANIFEST_DIR"));
        let res = run_report(&ReportRequest {
            config_path: format!("{}/lunch_linear_config.json", test_dir),
            reference_path: Some(format!("{}/lunch_linear_e-002_summary.json", test_dir)),
            respondent: Some("e-002".to_string()),
            ..Default::default()
        });
        assert!(res.is_ok(), "{:?}", res);
    }

    #[test]
    fn reference_mismatch_is_an_error() {
        init();
        let test_dir = format!("{}/tests/data/lunch_linear", env!("CARGO_MANIFEST_DIR"));
        let res = run_report(&ReportRequest {
            config_path: format!("{}/lunch_linear_config.json", test_dir),
            reference_path: Some(format!("{}/lunch_linear_e-002_summary.json", test_dir)),
            ..Default::default()
        });
        assert!(matches!(
            res.map_err(|e| *e),
            Err(TabError::Whatever { .. })
        ));
    }

    #[test]
    fn missing_config() {
        let res = run_report(&ReportRequest {
            config_path: "does/not/exist.json".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            res.map_err(|e| *e),
            Err(TabError::OpeningJson { .. })
        ));
    }

    #[test]
    fn resolve_branching() {
        init();
        let test_dir = format!(
            "{}/tests/data/onboarding_branching",
            env!("CARGO_MANIFEST_DIR")
        );
        let res = run_resolve(
            &format!("{}/onboarding_branching_config.json", test_dir),
            &format!("{}/answers_remote.json", test_dir),
            Some("stdout".to_string()),
        );
        assert!(res.is_ok(), "{:?}", res);
    }

    #[test]
    fn dangling_branch() {
        init();
        test_wrapper("dangling_branch");
    }

    #[test]
    fn resolve_stops_at_dangling_branch() {
        init();
        let test_dir = format!("{}/tests/data/dangling_branch", env!("CARGO_MANIFEST_DIR"));
        let config_path = format!("{}/dangling_branch_config.json", test_dir);
        let answers_path = format!("{}/answers_yes.json", test_dir);
        let js = build_resolve_js(&config_path, &answers_path).unwrap();
        assert_eq!(js["visible"], json!(["q1"]));
        assert_eq!(js["unanswered"], json!([]));
        let res = run_resolve(&config_path, &answers_path, Some("stdout".to_string()));
        assert!(res.is_ok(), "{:?}", res);
    }

    #[test]
    fn stored_survey_still_rejects_blank_prompts() {
        init();
        let test_dir = format!("{}/tests/data/dangling_branch", env!("CARGO_MANIFEST_DIR"));
        let res = run_resolve(
            &format!("{}/dangling_branch_blank_prompt_config.json", test_dir),
            &format!("{}/answers_yes.json", test_dir),
            Some("stdout".to_string()),
        );
        assert!(matches!(res.map_err(|e| *e), Err(TabError::Survey { .. })));
    }
}
