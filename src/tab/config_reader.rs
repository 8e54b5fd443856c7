use crate::tab::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "reportName")]
    pub report_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Provider {
    Json,
    Csv,
    Xlsx,
}

impl ResponseSource {
    pub fn provider(&self) -> TabResult<Provider> {
        match self.provider.as_str() {
            "json" => Ok(Provider::Json),
            "csv" => Ok(Provider::Csv),
            "xlsx" | "excel" => Ok(Provider::Xlsx),
            x => UnknownProviderSnafu {
                provider: x.to_string(),
            }
            .fail(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TabConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub survey: Survey,
    #[serde(rename = "responseSources", default)]
    pub response_sources: Vec<ResponseSource>,
}

pub fn read_config(path: &str) -> BTabResult<TabConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {
        path: path.to_string(),
    })?;
    let config: TabConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    debug!(
        "read_config: survey {} with {} questions, {} sources",
        config.survey.id,
        config.survey.questions.len(),
        config.response_sources.len()
    );
    Ok(config)
}

pub fn read_summary(path: &str) -> TabResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {
        path: path.to_string(),
    })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

/// Reads the answers collected so far for one respondent.
pub fn read_answer_sheet(path: &str) -> BTabResult<AnswerSheet> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {
        path: path.to_string(),
    })?;
    let sheet: AnswerSheet = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    debug!("read_answer_sheet: {} answers", sheet.len());
    Ok(sheet)
}
