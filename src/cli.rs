use std::path::PathBuf;

use clap::Parser;

use crate::pipeline::PipelineOptions;
use crate::pipeline::replicate::{PlateLayout, STANDARD_PLATE};
use crate::report::DEFAULT_RESULTS_DIR;

#[derive(Parser, Debug)]
#[command(
    name = "qpcr-panda",
    version,
    about = "Convert qPCR plate exports into dated sewage-concentration reports"
)]
pub struct Cli {
    /// Workbook with replicate ("rep") sheets and one "sample" sheet.
    #[arg(default_value = "sample_data.xlsx")]
    pub input: PathBuf,

    #[arg(long, default_value = DEFAULT_RESULTS_DIR)]
    pub results_dir: PathBuf,

    /// Fail instead of falling back when several sheets look like sample sheets.
    #[arg(long, default_value_t = false)]
    pub strict_metadata_sheet: bool,

    /// Keep replicate sheets read before a mis-shaped one instead of aborting.
    #[arg(long, default_value_t = false)]
    pub allow_partial_replicates: bool,

    #[arg(long, default_value_t = STANDARD_PLATE.rows)]
    pub plate_rows: usize,

    #[arg(long, default_value_t = STANDARD_PLATE.columns)]
    pub plate_columns: usize,
}

impl Cli {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            layout: PlateLayout {
                rows: self.plate_rows,
                columns: self.plate_columns,
            },
            strict_metadata_sheet: self.strict_metadata_sheet,
            allow_partial_replicates: self.allow_partial_replicates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_fixed_workflow() {
        let cli = Cli::parse_from(["qpcr-panda"]);
        assert_eq!(cli.input, PathBuf::from("sample_data.xlsx"));
        assert_eq!(cli.results_dir, PathBuf::from("results"));
        assert_eq!(cli.pipeline_options(), PipelineOptions::default());
    }

    #[test]
    fn flags_map_onto_options() {
        let cli = Cli::parse_from([
            "qpcr-panda",
            "plate.xlsx",
            "--strict-metadata-sheet",
            "--allow-partial-replicates",
            "--plate-rows",
            "384",
        ]);
        let options = cli.pipeline_options();
        assert_eq!(cli.input, PathBuf::from("plate.xlsx"));
        assert!(options.strict_metadata_sheet);
        assert!(options.allow_partial_replicates);
        assert_eq!(options.layout, PlateLayout { rows: 384, columns: 8 });
    }
}
