use clap::Parser;

/// This is a survey tabulation program: it computes the statistics of the responses
/// to a branching survey, or the questions a respondent gets to see.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The file describing the survey and where its responses are stored.
    /// See the manual of survey_core for the format.
    #[clap(short, long, value_parser)]
    pub config: String,
    /// (file path) A reference file containing the expected summary in JSON format. If provided, surveytab will
    /// check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the given
    /// location. Setting this option overrides the output directory that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the responses are read from this file. Setting this option overrides
    /// the response sources that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (json, csv or xlsx) The type of the input. By default, it is deduced from the extension of the input file.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use. Required if the file contains
    /// several worksheets.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (employee id) If specified, only the responses of this respondent are tabulated.
    #[clap(long, value_parser)]
    pub respondent: Option<String>,

    /// (file path) A JSON object of the answers collected so far. If specified, surveytab prints the questions
    /// shown to the respondent instead of a summary.
    #[clap(short, long, value_parser)]
    pub answers: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
