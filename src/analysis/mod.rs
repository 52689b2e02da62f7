//! Precomputed analysis documents
//!
//! The analysis document is produced by an external feature-extraction run and
//! maps each track's file name to its features:
//!
//! ```text
//! {
//!   "song.mp3": {
//!     "onsets":   [{"time": 0.1, "value": 1}, ...]    or  [0.1, 0.4, ...]
//!     "loudness": [{"time": 0.0, "value": -10.0}, ...]
//!     "timbre":   [{"mfcc1": [{"time": 0.0, "value": 3.2}, ...]}, {"mfcc2": ...}]
//!   }
//! }
//! ```
//!
//! Sample times are seconds from the start of the track and are expected to be
//! non-decreasing. Nothing here re-sorts them.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One point of a time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub value: f64,
}

/// A single feature of a track.
///
/// Variant order matters for deserialization: an empty array is read as
/// `Samples`, and `Other` swallows anything the other shapes reject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureSeries {
    /// `[{time, value}, ...]`
    Samples(Vec<Sample>),
    /// `[t0, t1, ...]`
    Timestamps(Vec<f64>),
    /// `[{"mfcc1": [...]}, {"mfcc2": [...]}, ...]`
    Bands(Vec<BTreeMap<String, Vec<Sample>>>),
    /// Any other shape (scalars, nested objects...). Charting it is an error.
    Other(serde_json::Value),
}

/// Borrowed view of the part of a feature that gets drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesData<'a> {
    Samples(&'a [Sample]),
    Times(&'a [f64]),
}

impl<'a> SeriesData<'a> {
    pub fn len(&self) -> usize {
        match self {
            SeriesData::Samples(s) => s.len(),
            SeriesData::Times(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Event times: the sample times, or the bare timestamps.
    pub fn times(&self) -> Vec<f64> {
        match self {
            SeriesData::Samples(s) => s.iter().map(|p| p.time).collect(),
            SeriesData::Times(t) => t.to_vec(),
        }
    }

    pub fn stats(&self) -> SeriesStats {
        match self {
            SeriesData::Samples(s) => SeriesStats::from_samples(s),
            SeriesData::Times(t) => SeriesStats::from_times(t),
        }
    }
}

impl FeatureSeries {
    /// The drawable data of this feature when it is a flat series.
    pub fn flat(&self) -> Option<SeriesData<'_>> {
        match self {
            FeatureSeries::Samples(s) => Some(SeriesData::Samples(s)),
            FeatureSeries::Timestamps(t) => Some(SeriesData::Times(t)),
            _ => None,
        }
    }

    /// The first sub-series, if it is named `band`.
    pub fn first_band(&self, band: &str) -> Option<SeriesData<'_>> {
        match self {
            FeatureSeries::Bands(bands) => bands
                .first()
                .and_then(|b| b.get(band))
                .map(|s| SeriesData::Samples(s.as_slice())),
            _ => None,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            FeatureSeries::Samples(_) => "samples",
            FeatureSeries::Timestamps(_) => "timestamps",
            FeatureSeries::Bands(_) => "bands",
            FeatureSeries::Other(_) => "unrecognized",
        }
    }

    /// Latest timestamp anywhere in this feature.
    pub fn end_time(&self) -> Option<f64> {
        match self {
            FeatureSeries::Samples(s) => s.last().map(|p| p.time),
            FeatureSeries::Timestamps(t) => t.last().copied(),
            FeatureSeries::Bands(bands) => bands
                .iter()
                .flat_map(|b| b.values())
                .filter_map(|s| s.last().map(|p| p.time))
                .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.max(t)))),
            FeatureSeries::Other(_) => None,
        }
    }
}

/// Point count and value range of a series, for the summary output.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SeriesStats {
    pub points: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub end_time: Option<f64>,
}

impl SeriesStats {
    pub fn from_samples(samples: &[Sample]) -> Self {
        let mut stats = SeriesStats {
            points: samples.len(),
            end_time: samples.last().map(|s| s.time),
            ..Default::default()
        };
        for s in samples {
            stats.min = Some(stats.min.map_or(s.value, |m| m.min(s.value)));
            stats.max = Some(stats.max.map_or(s.value, |m| m.max(s.value)));
        }
        stats
    }

    pub fn from_times(times: &[f64]) -> Self {
        SeriesStats {
            points: times.len(),
            min: None,
            max: None,
            end_time: times.last().copied(),
        }
    }
}

/// All features of one track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackAnalysis {
    /// File name of the track; doubles as display label and audio key.
    pub name: String,
    pub features: BTreeMap<String, FeatureSeries>,
}

impl TrackAnalysis {
    pub fn feature(&self, key: &str) -> Option<&FeatureSeries> {
        self.features.get(key)
    }

    /// URL of the track's audio relative to the page: `{prefix}/{name}`, with
    /// the name percent-encoded as one path segment.
    pub fn audio_src(&self, prefix: &str) -> String {
        let prefix = prefix.trim_end_matches('/');
        let name = encode_path_segment(&self.name);
        if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        }
    }

    /// Latest timestamp across all features, used when the audio can't be probed.
    pub fn end_time(&self) -> Option<f64> {
        self.features
            .values()
            .filter_map(FeatureSeries::end_time)
            .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.max(t))))
    }
}

/// Percent-encode everything but RFC 3986 unreserved characters.
fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// The whole analysis file, tracks in document order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AnalysisDocument {
    pub tracks: Vec<TrackAnalysis>,
}

impl AnalysisDocument {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let doc = Self::from_json_str(&text)?;
        log::info!("Loaded {} track(s) from {}", doc.tracks.len(), path.display());
        Ok(doc)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(text)?;
        let mut tracks = Vec::with_capacity(raw.len());

        for (name, value) in raw {
            let features: BTreeMap<String, FeatureSeries> = serde_json::from_value(value)
                .map_err(|source| Error::Track {
                    track: name.clone(),
                    source,
                })?;

            for (key, series) in &features {
                if let FeatureSeries::Other(_) = series {
                    log::warn!("{}: feature '{}' has an unrecognized shape", name, key);
                }
            }

            tracks.push(TrackAnalysis { name, features });
        }

        Ok(AnalysisDocument { tracks })
    }

    pub fn track(&self, name: &str) -> Option<&TrackAnalysis> {
        self.tracks.iter().find(|t| t.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
