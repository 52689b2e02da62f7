//! HTML page with inline SVG charts and player controls

use crate::chart::svg::{escape_xml, write_svg};
use crate::config::ChartConfig;
use crate::page::{ControlAction, DurationSource, Page, TrackPanel};
use crate::playback::format_time;
use crate::report::Summary;
use std::io::{self, Write};

/// File name wasm-pack gives the player's JS glue.
const PLAYER_MODULE: &str = "featurescope_player.js";

const STYLE: &str = r#"
        :root {
            --bg: #0d1117;
            --card: #161b22;
            --border: #30363d;
            --text: #e6edf3;
            --dim: #7d8590;
            --accent: #58a6ff;
            --error: #f85149;
        }
        * { box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
            background: var(--bg);
            color: var(--text);
            margin: 0;
            padding: 2rem;
            line-height: 1.5;
        }
        .header { border-bottom: 1px solid var(--border); margin-bottom: 2rem; padding-bottom: 1rem; }
        .logo { font-size: 2rem; font-weight: 800; color: var(--accent); }
        .stats { color: var(--dim); }
        .container {
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 1.5rem;
            margin-bottom: 2rem;
        }
        .toggle-button {
            background: none;
            border: 1px solid var(--border);
            border-radius: 6px;
            color: var(--text);
            cursor: pointer;
            margin: 0.25rem;
            padding: 0.4rem 0.8rem;
        }
        .toggle-button:hover { border-color: var(--accent); }
        .volume-slider { vertical-align: middle; }
        .time-display { font-family: 'SF Mono', 'Fira Code', monospace; margin: 0.5rem 0; }
        .duration-note { color: var(--dim); font-size: 0.875rem; }
        .chart-container { overflow-x: auto; }
        .progress-bar {
            background: var(--border);
            cursor: pointer;
            height: 10px;
            margin: 1rem 0;
            position: relative;
        }
        .progress { background: var(--accent); height: 100%; width: 0%; }
        .chart { display: none; }
        .chart .line { fill: none; stroke-width: 1.5px; }
        .chart .onset-line { stroke-width: 1px; }
        .chart-error { color: var(--error); font-family: monospace; }
"#;

/// Write the page, drawing charts into `page.options.frame`.
pub fn write<W: Write>(writer: &mut W, page: &Page) -> io::Result<()> {
    let frame = &page.options.frame;
    let summary = Summary::from_page(page);

    writeln!(writer, "<!DOCTYPE html>")?;
    writeln!(writer, r#"<html lang="en">"#)?;
    writeln!(writer, "<head>")?;
    writeln!(writer, r#"    <meta charset="UTF-8">"#)?;
    writeln!(
        writer,
        r#"    <meta name="viewport" content="width=device-width, initial-scale=1.0">"#
    )?;
    writeln!(writer, "    <title>featurescope</title>")?;
    writeln!(writer, "    <style>{}    </style>", STYLE)?;
    writeln!(writer, "</head>")?;
    writeln!(
        writer,
        r#"<body data-refresh-ms="{}">"#,
        page.options.refresh_ms
    )?;

    writeln!(writer, r#"<div class="header">"#)?;
    writeln!(writer, r#"    <div class="logo">featurescope</div>"#)?;
    writeln!(
        writer,
        r#"    <div class="stats">{} track(s) &middot; {} chart(s) drawn &middot; {} unavailable</div>"#,
        summary.tracks, summary.charts_drawn, summary.charts_failed
    )?;
    writeln!(writer, "</div>")?;

    for track in &page.tracks {
        write_track(writer, track, frame)?;
    }

    let player = page.options.player_path.trim_end_matches('/');
    writeln!(writer, r#"<script type="module">"#)?;
    writeln!(
        writer,
        r#"    import init, {{ mount }} from "./{}/{}";"#,
        escape_xml(player),
        PLAYER_MODULE
    )?;
    writeln!(
        writer,
        r#"    init().then(() => mount()).catch((e) => console.error("player failed to load", e));"#
    )?;
    writeln!(writer, "</script>")?;
    writeln!(writer, "</body>")?;
    writeln!(writer, "</html>")?;

    Ok(())
}

fn write_track<W: Write>(writer: &mut W, track: &TrackPanel, frame: &ChartConfig) -> io::Result<()> {
    let i = track.index;

    writeln!(writer, r#"<div class="container" id="track-{}">"#, i)?;
    writeln!(writer, "    <h2>{}</h2>", escape_xml(&track.name))?;

    match track.duration.source {
        DurationSource::Probed => {}
        DurationSource::Analysis => writeln!(
            writer,
            r#"    <p class="duration-note">Audio unavailable; time axis ends at the last analysis timestamp ({}).</p>"#,
            format_time(track.duration.seconds)
        )?,
        DurationSource::Unknown => writeln!(
            writer,
            r#"    <p class="duration-note">Audio unavailable and no timestamps to size the time axis.</p>"#
        )?,
    }

    for control in &track.controls {
        match control.action {
            ControlAction::Play => writeln!(
                writer,
                r#"    <button id="{}" class="toggle-button" data-action="play" data-track="{}" data-src="{}">{}</button>"#,
                control.id,
                i,
                escape_xml(&track.audio_src),
                escape_xml(&control.label)
            )?,
            ControlAction::Stop => writeln!(
                writer,
                r#"    <button id="{}" class="toggle-button" data-action="stop" data-track="{}">{}</button>"#,
                control.id,
                i,
                escape_xml(&control.label)
            )?,
            ControlAction::Volume => {
                writeln!(
                    writer,
                    r#"    <input id="{}" type="range" min="0" max="1" step="0.01" value="{}" class="volume-slider" aria-label="{}" data-action="volume" data-track="{}">"#,
                    control.id,
                    track.initial_volume,
                    escape_xml(&control.label),
                    i
                )?;
                writeln!(
                    writer,
                    r#"    <div id="{}" class="time-display">{}</div>"#,
                    track.time_display_id(),
                    track.initial_time_text()
                )?;
            }
            // Seek and toggles live further down, next to the charts
            ControlAction::Seek | ControlAction::Toggle => {}
        }
    }

    writeln!(writer, r#"    <div class="buttons">"#)?;
    for (control, slot) in track
        .controls
        .iter()
        .filter(|c| c.action == ControlAction::Toggle)
        .zip(&track.charts)
    {
        writeln!(
            writer,
            r#"        <button id="{}" class="toggle-button {}-button" data-action="toggle" data-track="{}" data-target="{}">{}</button>"#,
            control.id,
            slot.feature.key,
            i,
            control.target.as_deref().unwrap_or(&slot.id),
            escape_xml(&control.label)
        )?;
    }
    writeln!(writer, "    </div>")?;

    writeln!(writer, r#"    <div class="chart-container">"#)?;
    if let Some(seek) = track.controls_for(ControlAction::Seek).next() {
        writeln!(
            writer,
            r#"        <div id="{}" class="progress-bar" data-action="seek" data-track="{}"><div id="{}" class="progress"></div></div>"#,
            seek.id,
            i,
            seek.target.as_deref().unwrap_or_default()
        )?;
    }

    for slot in &track.charts {
        writeln!(
            writer,
            r#"        <div id="{}" class="chart" data-feature="{}" style="display: {}">"#,
            slot.id,
            slot.feature.key,
            slot.visibility.css_display()
        )?;
        match &slot.chart {
            Ok(chart) => write_svg(writer, chart, frame)?,
            Err(e) => writeln!(
                writer,
                r#"        <p class="chart-error">{}: {}</p>"#,
                escape_xml(slot.feature.label),
                escape_xml(&e.to_string())
            )?,
        }
        writeln!(writer, "        </div>")?;
    }
    writeln!(writer, "    </div>")?;
    writeln!(writer, "</div>")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisDocument;
    use crate::page::{build_track, PageOptions, TrackDuration, FEATURES};

    fn render(json: &str, seconds: f64) -> String {
        let doc = AnalysisDocument::from_json_str(json).unwrap();
        let options = PageOptions::default();
        let tracks = doc
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| {
                build_track(
                    i,
                    t,
                    TrackDuration { seconds, source: DurationSource::Probed },
                    &options,
                )
            })
            .collect();
        let page = Page { tracks, options };

        let mut buf = Vec::new();
        write(&mut buf, &page).unwrap();
        String::from_utf8(buf).unwrap()
    }

    const SONG: &str = r#"{"song.mp3": {
        "onsets": [0.1, 0.4],
        "loudness": [{"time": 0, "value": -10}, {"time": 1, "value": -8}]
    }}"#;

    // ==========================================================================
    // PAGE STRUCTURE TESTS
    // ==========================================================================
    //
    // The browser binding finds everything through ids and data-* attributes,
    // so these tests check the markup it relies on.
    // ==========================================================================

    #[test]
    fn test_player_controls_present_once_per_track() {
        let html = render(SONG, 2.0);

        assert_eq!(html.matches(r#"data-action="play""#).count(), 1);
        assert_eq!(html.matches(r#"data-action="stop""#).count(), 1);
        assert_eq!(html.matches(r#"data-action="volume""#).count(), 1);
        assert_eq!(html.matches(r#"data-action="seek""#).count(), 1);
        assert_eq!(html.matches(r#"class="time-display""#).count(), 1);
        assert!(html.contains(r#"data-src="audio/song.mp3""#));
        assert!(html.contains(">Play Audio</button>"));
        assert!(html.contains(">Stop Audio</button>"));
        assert!(html.contains(">0:00 / 0:00</div>"));
    }

    #[test]
    fn test_toggle_targets_exist() {
        let html = render(SONG, 2.0);

        assert_eq!(html.matches(r#"data-action="toggle""#).count(), FEATURES.len());
        for spec in FEATURES {
            let id = crate::page::chart_id(spec.key, 0);
            assert!(html.contains(&format!(r#"data-target="{}""#, id)), "no toggle for {}", id);
            assert!(html.contains(&format!(r#"<div id="{}" class="chart""#, id)), "no chart {}", id);
        }
    }

    #[test]
    fn test_charts_start_hidden() {
        let html = render(SONG, 2.0);
        assert_eq!(html.matches(r#"style="display: none""#).count(), FEATURES.len());
        assert!(!html.contains(r#"style="display: block""#));
    }

    #[test]
    fn test_drawn_and_failed_charts() {
        let html = render(SONG, 2.0);

        assert_eq!(html.matches("<svg").count(), 2);
        assert_eq!(html.matches(r#"class="onset-line""#).count(), 2);
        assert_eq!(html.matches(r#"class="chart-error""#).count(), FEATURES.len() - 2);
        assert!(html.contains("feature &#39;tempo&#39; is missing"));
    }

    #[test]
    fn test_track_names_are_escaped() {
        let html = render(r#"{"<b>bold</b>.mp3": {}}"#, 1.0);
        assert!(html.contains("<h2>&lt;b&gt;bold&lt;/b&gt;.mp3</h2>"));
        assert!(!html.contains("<b>bold</b>"));
    }

    #[test]
    fn test_loads_player_module() {
        let html = render(SONG, 2.0);
        assert!(html.contains(r#"import init, { mount } from "./pkg/featurescope_player.js";"#));
        assert!(html.contains(r#"<body data-refresh-ms="100">"#));
    }
}
