//! The features shown for every track

use crate::chart::{ChartKind, SeriesSelector};

/// One chart row of a track panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSpec {
    /// Slug used in element ids and class names.
    pub key: &'static str,
    /// Text after "Toggle " on the button.
    pub label: &'static str,
    pub color: &'static str,
    pub kind: ChartKind,
    pub selector: SeriesSelector,
}

const fn whole(
    key: &'static str,
    label: &'static str,
    color: &'static str,
    feature: &'static str,
) -> FeatureSpec {
    FeatureSpec {
        key,
        label,
        color,
        kind: ChartKind::Line,
        selector: SeriesSelector::Whole(feature),
    }
}

const fn band(
    key: &'static str,
    label: &'static str,
    color: &'static str,
    feature: &'static str,
    band: &'static str,
) -> FeatureSpec {
    FeatureSpec {
        key,
        label,
        color,
        kind: ChartKind::Line,
        selector: SeriesSelector::FirstBand { feature, band },
    }
}

pub const FEATURES: &[FeatureSpec] = &[
    FeatureSpec {
        key: "onsets",
        label: "Onsets",
        color: "steelblue",
        kind: ChartKind::EventMarker,
        selector: SeriesSelector::Whole("onsets"),
    },
    band("timbre", "Timbre", "rgba(50, 205, 50, 0.6)", "timbre", "mfcc1"),
    whole("loudness", "Loudness", "rgba(255, 215, 0, 0.6)", "loudness"),
    band("chroma", "Chroma", "rgba(255, 0, 255, 0.6)", "chroma", "chroma1"),
    whole("tempo", "Tempo", "rgba(255, 69, 0, 0.6)", "tempo"),
    whole("spectral-centroid", "Spectral Centroid", "rgba(0, 128, 128, 0.6)", "spectral_centroid"),
    whole("spectral-bandwidth", "Spectral Bandwidth", "rgba(75, 0, 130, 0.6)", "spectral_bandwidth"),
    whole("zero-crossing", "Zero Crossing Rate", "rgba(123, 104, 238, 0.6)", "zero_crossing_rate"),
    band("spectral-contrast", "Spectral Contrast", "rgba(255, 99, 71, 0.6)", "spectral_contrast", "contrast1"),
    whole("spectral-rolloff", "Spectral Rolloff", "rgba(255, 105, 180, 0.6)", "spectral_rolloff"),
    band("mel-spectrogram", "Mel Spectrogram", "rgba(0, 191, 255, 0.6)", "mel_spectrogram", "mel1"),
    band("tonnetz", "Tonnetz", "rgba(75, 0, 130, 0.6)", "tonnetz", "tonnetz1"),
    whole("harmonic-energy", "Harmonic Energy", "rgba(34, 139, 34, 0.6)", "harmonics"),
    whole("percussive-energy", "Percussive Energy", "rgba(255, 140, 0, 0.6)", "percussives"),
    whole("spectral-flux", "Spectral Flux", "rgba(46, 139, 87, 0.6)", "spectral_flux"),
    whole("onset-strength", "Onset Strength", "rgba(30, 144, 255, 0.6)", "onset_strength"),
];

pub fn find(key: &str) -> Option<&'static FeatureSpec> {
    FEATURES.iter().find(|f| f.key == key)
}
