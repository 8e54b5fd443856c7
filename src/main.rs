mod args;
mod tab;

use clap::Parser;
use log::{info, LevelFilter};

use crate::tab::config_reader::ResponseSource;

fn input_source(args: &args::Args) -> Option<ResponseSource> {
    let path = args.input.clone()?;
    let provider = args
        .input_type
        .clone()
        .unwrap_or_else(|| tab::infer_provider(&path).to_string());
    Some(ResponseSource {
        provider,
        file_path: path,
        excel_worksheet_name: args.excel_worksheet_name.clone(),
    })
}

fn main() {
    let args = args::Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
    info!("args {:?}", args);

    let res = match args.answers.as_deref() {
        Some(answers_path) => tab::run_resolve(&args.config, answers_path, args.out.clone()),
        None => tab::run_report(&tab::ReportRequest {
            config_path: args.config.clone(),
            reference_path: args.reference.clone(),
            out_path: args.out.clone(),
            input: input_source(&args),
            respondent: args.respondent.clone(),
        }),
    };

    if let Err(e) = res {
        tab::report_error(&e);
        std::process::exit(1);
    }
}
