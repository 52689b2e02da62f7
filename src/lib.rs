//! featurescope - Browse precomputed audio features next to the audio
//!
//! featurescope takes a JSON document of per-track audio features (onsets,
//! loudness, MFCCs, chroma and friends, computed elsewhere) and turns it into
//! a page: one panel per track, a chart per feature on a shared time axis,
//! and a small player whose progress bar lines up with the charts.
//!
//! # Overview
//!
//! Every chart's x-domain is `[0, duration]` where duration is the audio
//! file's, so a marker at 1.5s sits at the same horizontal position on every
//! chart and on the progress bar. Onsets become vertical markers; every
//! other feature becomes a line path with a y-domain padded by 5%.
//!
//! Only one track plays at a time. Starting another track stops the first,
//! and events from a track that has since been stopped are ignored.
//!
//! # Quick Start
//!
//! ```no_run
//! use featurescope::{AnalysisDocument, Config};
//! use featurescope::report;
//!
//! let doc = AnalysisDocument::load("analysis.json")?;
//! let config = Config::load(None);
//!
//! let page = report::build_page(&doc, &config, |_| {});
//! println!("{} charts drawn", page.charts_drawn());
//! report::generate("report.html", &page)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Modules
//!
//! - [`analysis`]: The analysis document and its feature series
//! - [`chart`]: Scales, domains and chart geometry (plus SVG output)
//! - [`playback`]: The single-active-track playback state machine
//! - [`page`]: Per-track panels, controls and chart slots
//! - [`report`]: HTML and JSON writers
//! - [`serve`]: Local HTTP server with audio streaming
//!
//! Without the default `native` feature only the first four are built, which
//! is what the browser player links against.

pub mod analysis;
pub mod chart;
pub mod config;
pub mod error;
pub mod page;
pub mod playback;

#[cfg(feature = "native")]
pub mod probe;
#[cfg(feature = "native")]
pub mod report;
#[cfg(feature = "native")]
pub mod serve;

pub use analysis::{AnalysisDocument, FeatureSeries, Sample, TrackAnalysis};
pub use chart::{Chart, ChartError, ChartKind};
pub use config::Config;
pub use error::{Error, Result};
pub use page::{Page, TrackPanel, Visibility};
pub use playback::{PlaybackController, PlaybackState};

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // PUBLIC API TESTS
    // ==========================================================================
    //
    // These tests verify the public API surface is correct and documented.
    // ==========================================================================

    #[test]
    fn test_public_exports() {
        // Verify core types are re-exported from crate root
        let _: ChartKind = ChartKind::Line;
        let _: PlaybackState = PlaybackState::Idle;
        let _config = Config::default();
        let _doc = AnalysisDocument::default();
    }

    #[test]
    fn test_document_accessible() {
        let doc = AnalysisDocument::from_json_str(r#"{"a.mp3": {"onsets": [0.5]}}"#).unwrap();
        let track: &TrackAnalysis = doc.track("a.mp3").unwrap();
        assert!(matches!(track.feature("onsets"), Some(FeatureSeries::Timestamps(_))));
    }

    #[test]
    fn test_visibility_variants() {
        // Charts start hidden and toggle both ways
        assert_eq!(Visibility::Hidden.toggle(), Visibility::Shown);
        assert_eq!(Visibility::Shown.toggle(), Visibility::Hidden);
    }
}
