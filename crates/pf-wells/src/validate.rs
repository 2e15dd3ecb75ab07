//! Well set validation.

use std::collections::HashSet;

use crate::error::{WellError, WellResult};
use crate::set::WellData;
use crate::wells::{WellControl, WellType};

/// Check perforation topology, controls and injection mixtures.
pub(crate) fn validate_wells(
    wells: &[WellData],
    num_cells: usize,
    num_components: usize,
) -> WellResult<()> {
    let mut seen = HashSet::new();
    for (w, well) in wells.iter().enumerate() {
        if well.perforations.is_empty() {
            return Err(WellError::NoPerforations { well: w });
        }
        for perf in &well.perforations {
            if perf.cell >= num_cells {
                return Err(WellError::CellOutOfRange {
                    cell: perf.cell,
                    num_cells,
                });
            }
            if !seen.insert(perf.cell) {
                return Err(WellError::DuplicatePerforation { cell: perf.cell });
            }
            if !(perf.well_index.is_finite() && perf.well_index > 0.0) {
                return Err(WellError::InvalidWellIndex { well: w });
            }
        }

        validate_control(w, well.kind, well.control)?;

        if !well.reference_depth.is_finite() {
            return Err(WellError::InvalidControl {
                well: w,
                what: "reference depth must be finite",
            });
        }
        if let Some(p) = well.initial_pressure {
            if !p.is_finite() {
                return Err(WellError::InvalidControl {
                    well: w,
                    what: "initial pressure must be finite",
                });
            }
        }

        match (well.kind, &well.injection_mixture) {
            (WellType::Injector, None) => return Err(WellError::MissingMixture { well: w }),
            (_, Some(mix)) if mix.len() != num_components => {
                return Err(WellError::MixtureLength {
                    well: w,
                    expected: num_components,
                    actual: mix.len(),
                });
            }
            (_, Some(mix)) if mix.iter().any(|z| !(z.is_finite() && *z >= 0.0)) => {
                return Err(WellError::InvalidControl {
                    well: w,
                    what: "injection mixture must be non-negative",
                });
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_control(well: usize, kind: WellType, control: WellControl) -> WellResult<()> {
    match control {
        WellControl::Bhp(p) if !(p.is_finite() && p > 0.0) => Err(WellError::InvalidControl {
            well,
            what: "bottom-hole pressure must be positive",
        }),
        WellControl::Rate(q) if !q.is_finite() => Err(WellError::InvalidControl {
            well,
            what: "rate must be finite",
        }),
        WellControl::Rate(q) if kind == WellType::Injector && q < 0.0 => {
            Err(WellError::InvalidControl {
                well,
                what: "injector rate must be non-negative",
            })
        }
        WellControl::Rate(q) if kind == WellType::Producer && q > 0.0 => {
            Err(WellError::InvalidControl {
                well,
                what: "producer rate must be non-positive",
            })
        }
        _ => Ok(()),
    }
}
