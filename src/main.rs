use anyhow::Result;
use clap::Parser;
use log::{error, info};

use qpcr_panda::cli::Cli;
use qpcr_panda::data::loader::open_workbook;
use qpcr_panda::error::PipelineError;
use qpcr_panda::pipeline;
use qpcr_panda::report::CsvReportWriter;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        error!("{err}");
        for cause in err.chain().skip(1) {
            error!("caused by: {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let options = cli.pipeline_options();

    let mut source = open_workbook(&cli.input).map_err(|source| PipelineError::Workbook {
        workbook: cli.input.display().to_string(),
        source,
    })?;
    let mut sink = CsvReportWriter::new(&cli.results_dir);

    let summary = pipeline::run(source.as_mut(), &mut sink, &options)?;
    if !summary.warnings.is_empty() {
        info!("{} warning(s) raised, see log above", summary.warnings.len());
    }
    println!("{}", summary.report_path.display());
    Ok(())
}
