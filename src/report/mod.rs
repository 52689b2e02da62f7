//! Report generation for feature pages
//!
//! This module builds the page for a whole analysis document and writes it
//! out in one of two formats:
//!
//! - **HTML**: the interactive page, charts inline as SVG, player controls
//!   mounted by the wasm player
//! - **JSON**: what was drawn per track and chart, for scripts and checks
//!
//! # Usage
//!
//! ```ignore
//! use featurescope::report;
//!
//! let page = report::build_page(&doc, &config, |_| {});
//! report::generate("report.html", &page)?;  // HTML
//! report::generate("report.json", &page)?;  // JSON
//! ```

pub mod html;
pub mod json;

use crate::analysis::AnalysisDocument;
use crate::config::Config;
use crate::page::{self, DurationSource, Page, PageOptions, TrackPanel};
use crate::probe;
use rayon::prelude::*;
use serde::Serialize;
use std::io;
use std::path::Path;

/// Build every track panel, probing durations from `config.audio_dir`.
///
/// Tracks are built in parallel; `on_built` runs once per finished track.
pub fn build_page<F>(doc: &AnalysisDocument, config: &Config, on_built: F) -> Page
where
    F: Fn(&TrackPanel) + Sync + Send,
{
    let options = PageOptions::from(config);

    let tracks: Vec<TrackPanel> = doc
        .tracks
        .par_iter()
        .enumerate()
        .map(|(index, track)| {
            let duration = probe::resolve_duration(track, &config.audio_dir);
            let panel = page::build_track(index, track, duration, &options);
            on_built(&panel);
            panel
        })
        .collect();

    Page { tracks, options }
}

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, page: &Page) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "json" => json::write(&mut file, page),
        _ => html::write(&mut file, page),
    }
}

/// Summary statistics for a built page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub tracks: usize,
    pub charts_drawn: usize,
    pub charts_failed: usize,
    /// Tracks whose duration didn't come from their audio file.
    pub without_audio: usize,
}

impl Summary {
    pub fn from_page(page: &Page) -> Self {
        Summary {
            tracks: page.tracks.len(),
            charts_drawn: page.charts_drawn(),
            charts_failed: page.charts_failed(),
            without_audio: page
                .tracks
                .iter()
                .filter(|t| t.duration.source != DurationSource::Probed)
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ==========================================================================
    // PAGE BUILDING TESTS
    // ==========================================================================
    //
    // No audio directory exists in these tests, so every duration falls back
    // to the analysis' last timestamp.
    // ==========================================================================

    const DOC: &str = r#"{
        "first.mp3": {
            "onsets": [0.1, 0.4],
            "loudness": [{"time": 0, "value": -10}, {"time": 2, "value": -8}]
        },
        "second.mp3": {
            "loudness": [{"time": 0, "value": 1}, {"time": 3, "value": 2}]
        },
        "third.mp3": {}
    }"#;

    fn config_without_audio(dir: &Path) -> Config {
        Config {
            audio_dir: dir.join("no-audio-here"),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_page_keeps_document_order() {
        let dir = tempfile::tempdir().unwrap();
        let doc = AnalysisDocument::from_json_str(DOC).unwrap();
        let calls = AtomicUsize::new(0);

        let page = build_page(&doc, &config_without_audio(dir.path()), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let names: Vec<_> = page.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["first.mp3", "second.mp3", "third.mp3"]);
        let indices: Vec<_> = page.tracks.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_summary_counts() {
        let dir = tempfile::tempdir().unwrap();
        let doc = AnalysisDocument::from_json_str(DOC).unwrap();
        let page = build_page(&doc, &config_without_audio(dir.path()), |_| {});

        let summary = Summary::from_page(&page);
        assert_eq!(summary.tracks, 3);
        // first: onsets + loudness, second: loudness, third: no duration at all
        assert_eq!(summary.charts_drawn, 3);
        assert_eq!(summary.charts_failed, 3 * page::FEATURES.len() - 3);
        assert_eq!(summary.without_audio, 3);
    }

    #[test]
    fn test_summary_default() {
        let summary = Summary::default();
        assert_eq!(summary.tracks, 0);
        assert_eq!(summary.charts_drawn, 0);
        assert_eq!(summary.charts_failed, 0);
    }

    #[test]
    fn test_generate_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let doc = AnalysisDocument::from_json_str(DOC).unwrap();
        let page = build_page(&doc, &config_without_audio(dir.path()), |_| {});

        let html_path = dir.path().join("report.html");
        let json_path = dir.path().join("report.JSON");
        generate(&html_path, &page).unwrap();
        generate(&json_path, &page).unwrap();

        let html = std::fs::read_to_string(&html_path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["summary"]["tracks"], 3);
    }
}
