//! Post-hoc validation of a written container
//!
//! The writer never enforces declared bounds. This pass reads a container
//! back and reports every finding as data; a container with findings is
//! still readable.

use crate::errors::Result;
use crate::reader::ContainerReader;
use crate::schema::{SchemaRegistry, QC_MAX, QC_MIN};
use crate::writer::extrema;
use std::fmt;
use tracing::debug;

/// One validation finding.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    /// QC codes outside 0..=9 (fill excluded).
    QcOutOfDomain {
        variable: String,
        count: usize,
        example: i64,
    },
    /// Values outside the declared `valid_min`/`valid_max`.
    OutOfRange {
        variable: String,
        min: f64,
        max: f64,
        count: usize,
    },
    /// A bounding-box attribute that disagrees with the stored data.
    BoundsMismatch {
        attribute: String,
        declared: Option<f64>,
        actual: f64,
    },
    /// A format variable absent from the file.
    MissingVariable { variable: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::QcOutOfDomain {
                variable,
                count,
                example,
            } => write!(
                f,
                "{}: {} QC value(s) outside {}..={} (e.g. {})",
                variable, count, QC_MIN, QC_MAX, example
            ),
            ValidationIssue::OutOfRange {
                variable,
                min,
                max,
                count,
            } => write!(
                f,
                "{}: {} value(s) outside valid range [{}, {}]",
                variable, count, min, max
            ),
            ValidationIssue::BoundsMismatch {
                attribute,
                declared: Some(declared),
                actual,
            } => write!(f, "{}: declared {}, data gives {}", attribute, declared, actual),
            ValidationIssue::BoundsMismatch {
                attribute,
                declared: None,
                actual,
            } => write!(f, "{}: missing, data gives {}", attribute, actual),
            ValidationIssue::MissingVariable { variable } => {
                write!(f, "{}: variable missing", variable)
            }
        }
    }
}

/// Findings for one container, in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Bounding attributes and the variable each is computed from.
const BOUNDS: [(&str, &str, &str); 3] = [
    ("lat", "geospatial_lat_min", "geospatial_lat_max"),
    ("lon", "geospatial_lon_min", "geospatial_lon_max"),
    ("depth", "geospatial_vertical_min", "geospatial_vertical_max"),
];

/// Validate declared ranges, QC domains and bounding-box attributes.
pub fn validate(reader: &ContainerReader) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();

    for descriptor in SchemaRegistry::global().variables() {
        if !reader.has_variable(descriptor.name) {
            report.issues.push(ValidationIssue::MissingVariable {
                variable: descriptor.name.to_string(),
            });
            continue;
        }

        let Some((min, max)) = descriptor.valid_range else {
            continue;
        };

        let fill = reader
            .fill_value(descriptor.name)?
            .or_else(|| descriptor.fill.map(|f| f.as_f64()));
        let values = reader.values_f64(descriptor.name)?;
        let offending: Vec<f64> = values
            .iter()
            .copied()
            .filter(|v| !v.is_nan() && Some(*v) != fill)
            .filter(|v| *v < min || *v > max)
            .collect();

        debug!(
            variable = descriptor.name,
            offending = offending.len(),
            "checked declared range"
        );

        if let Some(first) = offending.first() {
            let issue = if descriptor.is_qc() {
                ValidationIssue::QcOutOfDomain {
                    variable: descriptor.name.to_string(),
                    count: offending.len(),
                    example: *first as i64,
                }
            } else {
                ValidationIssue::OutOfRange {
                    variable: descriptor.name.to_string(),
                    min,
                    max,
                    count: offending.len(),
                }
            };
            report.issues.push(issue);
        }
    }

    let attributes = reader.attributes()?;
    for (variable, min_key, max_key) in BOUNDS {
        if !reader.has_variable(variable) {
            continue;
        }
        let (lo, hi) = extrema(&reader.values_f64(variable)?);
        for (key, actual) in [(min_key, lo), (max_key, hi)] {
            let declared = attributes.get_f64(key);
            if !matches_bound(declared, actual) {
                report.issues.push(ValidationIssue::BoundsMismatch {
                    attribute: key.to_string(),
                    declared,
                    actual,
                });
            }
        }
    }

    Ok(report)
}

fn matches_bound(declared: Option<f64>, actual: f64) -> bool {
    match declared {
        Some(d) if d.is_nan() && actual.is_nan() => true,
        Some(d) => (d - actual).abs() <= 1e-9 * actual.abs().max(1.0),
        None => false,
    }
}
