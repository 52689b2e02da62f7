//! Chart rendering
//!
//! A chart is a write-once picture of one feature series against the track's
//! time axis. Every chart of a track shares the x-domain `[0, duration]`, where
//! duration comes from the audio file rather than from the last sample, so the
//! charts line up with each other and with the progress bar.
//!
//! Two kinds exist:
//!
//! - **Line**: value over time. The y-domain is the value range padded by 5%
//!   of each bound's magnitude, so extrema don't touch the frame edge.
//! - **EventMarker**: one full-height vertical line per event (onsets). The
//!   y-domain is fixed to `[0, 1]`.
//!
//! [`render`] computes the chart in data space; [`svg`] turns it into markup.

pub mod svg;

use crate::analysis::{SeriesData, TrackAnalysis};
use serde::Serialize;
use thiserror::Error;

/// Relative headroom above and below a line chart's extrema.
pub const LINE_PADDING: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    EventMarker,
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartKind::Line => write!(f, "line"),
            ChartKind::EventMarker => write!(f, "event-marker"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("feature '{0}' is missing")]
    MissingFeature(String),

    #[error("feature '{feature}' has no first band named '{band}'")]
    MissingBand { feature: String, band: String },

    #[error("feature '{feature}' is {found}, expected {expected}")]
    Malformed {
        feature: String,
        found: &'static str,
        expected: &'static str,
    },

    #[error("invalid track duration {0}")]
    InvalidDuration(f64),
}

/// Closed interval on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Domain {
    pub min: f64,
    pub max: f64,
}

impl Domain {
    pub fn new(min: f64, max: f64) -> Self {
        Domain { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Linear mapping from a domain onto a pixel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: Domain,
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: Domain, range: (f64, f64)) -> Self {
        LinearScale { domain, range }
    }

    pub fn map(&self, v: f64) -> f64 {
        let span = self.domain.span();
        if span == 0.0 {
            return self.range.0;
        }
        let t = (v - self.domain.min) / span;
        self.range.0 + t * (self.range.1 - self.range.0)
    }
}

/// What gets drawn, in data coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    /// Polyline through `(time, value)` points.
    Line { points: Vec<(f64, f64)> },
    /// Vertical markers spanning the whole y-domain.
    Markers { times: Vec<f64> },
}

impl Geometry {
    pub fn element_count(&self) -> usize {
        match self {
            Geometry::Line { points } => points.len(),
            Geometry::Markers { times } => times.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub kind: ChartKind,
    pub color: String,
    pub x_domain: Domain,
    pub y_domain: Domain,
    pub geometry: Geometry,
}

/// Render one series against `[0, duration]`.
pub fn render(
    feature: &str,
    data: SeriesData<'_>,
    kind: ChartKind,
    color: &str,
    duration: f64,
) -> Result<Chart, ChartError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ChartError::InvalidDuration(duration));
    }
    let x_domain = Domain::new(0.0, duration);

    let (y_domain, geometry) = match kind {
        ChartKind::Line => {
            let samples = match data {
                SeriesData::Samples(s) => s,
                SeriesData::Times(_) => {
                    return Err(ChartError::Malformed {
                        feature: feature.to_string(),
                        found: "bare timestamps",
                        expected: "{time, value} samples",
                    })
                }
            };
            let points: Vec<(f64, f64)> = samples.iter().map(|s| (s.time, s.value)).collect();
            (line_y_domain(samples.iter().map(|s| s.value)), Geometry::Line { points })
        }
        ChartKind::EventMarker => (
            Domain::new(0.0, 1.0),
            Geometry::Markers { times: data.times() },
        ),
    };

    Ok(Chart {
        kind,
        color: color.to_string(),
        x_domain,
        y_domain,
        geometry,
    })
}

/// Padded value range of a line chart.
///
/// Empty input gives `[0, 1]`; a range that collapses to a single zero gives
/// `[-1, 1]`.
pub fn line_y_domain<I: IntoIterator<Item = f64>>(values: I) -> Domain {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }

    if min > max {
        return Domain::new(0.0, 1.0);
    }

    let lo = min - min.abs() * LINE_PADDING;
    let hi = max + max.abs() * LINE_PADDING;
    if lo == hi {
        return Domain::new(lo - 1.0, hi + 1.0);
    }
    Domain::new(lo, hi)
}

/// Which part of a track's analysis a chart shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSelector {
    /// The feature itself is the series.
    Whole(&'static str),
    /// First entry of a banded feature, e.g. `timbre[0].mfcc1`.
    FirstBand {
        feature: &'static str,
        band: &'static str,
    },
}

impl SeriesSelector {
    pub fn feature(&self) -> &'static str {
        match self {
            SeriesSelector::Whole(f) => f,
            SeriesSelector::FirstBand { feature, .. } => feature,
        }
    }

    pub fn select<'a>(&self, track: &'a TrackAnalysis) -> Result<SeriesData<'a>, ChartError> {
        let feature = self.feature();
        let series = track
            .feature(feature)
            .ok_or_else(|| ChartError::MissingFeature(feature.to_string()))?;

        match self {
            SeriesSelector::Whole(_) => series.flat().ok_or_else(|| ChartError::Malformed {
                feature: feature.to_string(),
                found: series.shape(),
                expected: "a flat series",
            }),
            SeriesSelector::FirstBand { band, .. } => match series.first_band(band) {
                Some(data) => Ok(data),
                None if series.shape() == "bands" => Err(ChartError::MissingBand {
                    feature: feature.to_string(),
                    band: band.to_string(),
                }),
                None => Err(ChartError::Malformed {
                    feature: feature.to_string(),
                    found: series.shape(),
                    expected: "bands",
                }),
            },
        }
    }
}
