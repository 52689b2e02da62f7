//! Track durations from the audio files
//!
//! Charts share the x-domain `[0, duration]`, and that duration has to be the
//! audio's, not the analysis'. We read it from the container with symphonia
//! (frame count over time base), walking the packets when the container
//! doesn't record a frame count. If the audio is missing the analysis'
//! latest timestamp stands in.

use crate::analysis::TrackAnalysis;
use crate::error::{Error, Result};
use crate::page::{DurationSource, TrackDuration};
use std::fs::File;
use std::path::Path;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Duration of the audio file at `path`, in seconds.
pub fn probe_duration(path: &Path) -> Result<f64> {
    let probe_err = |reason: String| Error::Probe {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| probe_err(e.to_string()))?;

    let mut format = probed.format;
    let (track_id, params) = match format.default_track() {
        Some(track) => (track.id, track.codec_params.clone()),
        None => return Err(probe_err("no playable track".to_string())),
    };

    if let Some(frames) = params.n_frames {
        if let Some(tb) = params.time_base {
            let t = tb.calc_time(frames);
            return Ok(t.seconds as f64 + t.frac);
        }
        if let Some(rate) = params.sample_rate {
            return Ok(frames as f64 / rate as f64);
        }
    }

    // No frame count in the header: find where the last packet ends
    let mut end_ts: u64 = 0;
    while let Ok(packet) = format.next_packet() {
        if packet.track_id() == track_id {
            end_ts = end_ts.max(packet_end(packet.ts(), packet.dur()));
        }
    }

    match (params.time_base, params.sample_rate) {
        (Some(tb), _) => {
            let t = tb.calc_time(end_ts);
            Ok(t.seconds as f64 + t.frac)
        }
        (None, Some(rate)) => Ok(end_ts as f64 / rate as f64),
        (None, None) => Err(probe_err("no time base or sample rate".to_string())),
    }
}

/// End timestamp of a packet. Corrupt containers can report values that overflow.
fn packet_end(ts: u64, dur: u64) -> u64 {
    ts.saturating_add(dur)
}

/// Duration to draw `track` against: probed from `{audio_dir}/{name}`, or the
/// latest analysis timestamp when that fails.
pub fn resolve_duration(track: &TrackAnalysis, audio_dir: &Path) -> TrackDuration {
    let path = audio_dir.join(&track.name);

    match probe_duration(&path) {
        Ok(seconds) if seconds > 0.0 => {
            log::debug!("{}: {:.2}s from {}", track.name, seconds, path.display());
            return TrackDuration {
                seconds,
                source: DurationSource::Probed,
            };
        }
        Ok(seconds) => log::warn!("{}: audio reports {:.2}s", track.name, seconds),
        Err(e) => log::warn!("{}: {}", track.name, e),
    }

    match track.end_time() {
        Some(seconds) if seconds > 0.0 => {
            log::warn!(
                "{}: using last analysis timestamp ({:.2}s) as duration",
                track.name,
                seconds
            );
            TrackDuration {
                seconds,
                source: DurationSource::Analysis,
            }
        }
        _ => TrackDuration::unknown(),
    }
}
