//! Machine-readable page summary

use crate::chart::{ChartKind, Domain};
use crate::page::{Page, TrackDuration};
use crate::report::Summary;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub generated: String,
    pub summary: Summary,
    pub tracks: Vec<JsonTrack<'a>>,
}

#[derive(Serialize)]
pub struct JsonTrack<'a> {
    pub index: usize,
    pub name: &'a str,
    pub audio_src: &'a str,
    pub duration: TrackDuration,
    pub charts: Vec<JsonChart<'a>>,
}

#[derive(Serialize)]
pub struct JsonChart<'a> {
    pub id: &'a str,
    pub feature: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChartKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_domain: Option<Domain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_domain: Option<Domain>,
    /// Path points or markers drawn.
    pub elements: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> JsonReport<'a> {
    pub fn from_page(page: &'a Page) -> Self {
        let tracks = page
            .tracks
            .iter()
            .map(|t| JsonTrack {
                index: t.index,
                name: &t.name,
                audio_src: &t.audio_src,
                duration: t.duration,
                charts: t
                    .charts
                    .iter()
                    .map(|slot| match &slot.chart {
                        Ok(chart) => JsonChart {
                            id: &slot.id,
                            feature: slot.feature.key,
                            kind: Some(chart.kind),
                            x_domain: Some(chart.x_domain),
                            y_domain: Some(chart.y_domain),
                            elements: chart.geometry.element_count(),
                            error: None,
                        },
                        Err(e) => JsonChart {
                            id: &slot.id,
                            feature: slot.feature.key,
                            kind: None,
                            x_domain: None,
                            y_domain: None,
                            elements: 0,
                            error: Some(e.to_string()),
                        },
                    })
                    .collect(),
            })
            .collect();

        JsonReport {
            generated: chrono::Local::now().to_rfc3339(),
            summary: Summary::from_page(page),
            tracks,
        }
    }
}

pub fn write<W: Write>(writer: &mut W, page: &Page) -> io::Result<()> {
    let report = JsonReport::from_page(page);
    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisDocument;
    use crate::page::{build_track, DurationSource, PageOptions};

    #[test]
    fn test_json_report_shape() {
        let doc = AnalysisDocument::from_json_str(
            r#"{"song.mp3": {
                "onsets": [0.1, 0.4],
                "loudness": [{"time": 0, "value": -10}, {"time": 1, "value": -8}]
            }}"#,
        )
        .unwrap();
        let options = PageOptions::default();
        let duration = TrackDuration { seconds: 2.0, source: DurationSource::Probed };
        let page = Page {
            tracks: vec![build_track(0, &doc.tracks[0], duration, &options)],
            options,
        };

        let mut buf = Vec::new();
        write(&mut buf, &page).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        let track = &json["tracks"][0];
        assert_eq!(track["name"], "song.mp3");
        assert_eq!(track["duration"]["seconds"], 2.0);
        assert_eq!(track["duration"]["source"], "probed");

        let onsets = &track["charts"][0];
        assert_eq!(onsets["feature"], "onsets");
        assert_eq!(onsets["kind"], "event_marker");
        assert_eq!(onsets["elements"], 2);
        assert_eq!(onsets["x_domain"]["max"], 2.0);

        let tempo = track["charts"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["feature"] == "tempo")
            .unwrap();
        assert!(tempo.get("kind").is_none());
        assert_eq!(tempo["error"], "feature 'tempo' is missing");
    }
}
