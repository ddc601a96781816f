//! Standard-curve and sewage-concentration formulas.
//!
//! Sheet names select the formula by plain substring match; nothing else about
//! the name is interpreted.

// ---------------------------------------------------------------------------
// Standard curves
// ---------------------------------------------------------------------------

/// Sample volume in mL that concentrations are normalised by.
pub const SAMPLE_VOLUME_ML: f64 = 15.0;

/// A fixed `log10(copies) = slope * Cq + intercept` calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardCurve {
    pub slope: f64,
    pub intercept: f64,
}

impl StandardCurve {
    pub fn copies(&self, cq: f64) -> f64 {
        10f64.powf(self.slope * cq + self.intercept)
    }
}

/// Curve shared by the N1 and PMMV assays.
pub const N1_CURVE: StandardCurve = StandardCurve {
    slope: -0.3068,
    intercept: 12.506,
};

/// Curve for the N2 assay.
pub const N2_CURVE: StandardCurve = StandardCurve {
    slope: -0.2876,
    intercept: 11.912,
};

/// Calibration curve for a sheet, if its name identifies one.
pub fn curve_for_sheet(sheet: &str) -> Option<StandardCurve> {
    if sheet.contains("N1") || sheet.contains("PMMV") {
        Some(N1_CURVE)
    } else if sheet.contains("N2") {
        Some(N2_CURVE)
    } else {
        None
    }
}

/// Total copies for one well. `None` for a non-detect or an unrecognised sheet.
pub fn standard_curve_convert(sheet: &str, cq: Option<f64>) -> Option<f64> {
    let cq = cq?;
    curve_for_sheet(sheet).map(|curve| curve.copies(cq))
}

// ---------------------------------------------------------------------------
// Sewage concentration
// ---------------------------------------------------------------------------

/// Both dilution factors of a well, `None` when missing or non-numeric.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DilutionFactors {
    pub target_pathogen: Option<f64>,
    pub fecal_indicator: Option<f64>,
}

/// Sewage concentration: `total_copies * dilution / 15 mL`, with the dilution
/// factor picked by assay family.
pub fn sewage_conc_convert(
    sheet: &str,
    total_copies: Option<f64>,
    dilution: DilutionFactors,
) -> Option<f64> {
    let factor = if sheet.contains("N1") || sheet.contains("N2") {
        dilution.target_pathogen
    } else if sheet.contains("PMMV") {
        dilution.fecal_indicator
    } else {
        return None;
    };
    Some(total_copies? * factor? / SAMPLE_VOLUME_ML)
}
