//! Page building
//!
//! Turns one track's analysis into a [`TrackPanel`]: the player controls, one
//! toggle per feature and one rendered chart per feature. The feature list is
//! the [`FEATURES`] table; nothing here is written per feature.
//!
//! Element ids are deterministic (`play-button-3`, `loudness-chart-3`, ...) and
//! every interactive element carries its [`ControlAction`] as
//! `data-action`, which is what the browser binding mounts on.

pub mod features;

pub use features::{FeatureSpec, FEATURES};

use crate::analysis::TrackAnalysis;
use crate::chart::{self, Chart, ChartError};
use crate::config::{ChartConfig, Config};
use crate::playback::{PLAY_LABEL, STOP_LABEL, ZERO_TIME};
use serde::Serialize;

/// What a control does when used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Play,
    Stop,
    Volume,
    Seek,
    Toggle,
}

impl ControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::Play => "play",
            ControlAction::Stop => "stop",
            ControlAction::Volume => "volume",
            ControlAction::Seek => "seek",
            ControlAction::Toggle => "toggle",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "play" => Some(ControlAction::Play),
            "stop" => Some(ControlAction::Stop),
            "volume" => Some(ControlAction::Volume),
            "seek" => Some(ControlAction::Seek),
            "toggle" => Some(ControlAction::Toggle),
            _ => None,
        }
    }
}

/// Fixed elements of a track panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Panel,
    PlayButton,
    StopButton,
    VolumeSlider,
    TimeDisplay,
    ProgressBar,
    ProgressFill,
}

impl Role {
    pub fn id(&self, track: usize) -> String {
        let prefix = match self {
            Role::Panel => "track",
            Role::PlayButton => "play-button",
            Role::StopButton => "stop-button",
            Role::VolumeSlider => "volume-slider",
            Role::TimeDisplay => "time-display",
            Role::ProgressBar => "progress-bar",
            Role::ProgressFill => "progress",
        };
        format!("{}-{}", prefix, track)
    }
}

pub fn chart_id(feature_key: &str, track: usize) -> String {
    format!("{}-chart-{}", feature_key, track)
}

/// Display state of a chart container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Hidden,
    Shown,
}

/// Every chart starts out hidden.
pub const INITIAL_VISIBILITY: Visibility = Visibility::Hidden;

impl Visibility {
    pub fn toggle(self) -> Self {
        match self {
            Visibility::Hidden => Visibility::Shown,
            Visibility::Shown => Visibility::Hidden,
        }
    }

    pub fn css_display(&self) -> &'static str {
        match self {
            Visibility::Hidden => "none",
            Visibility::Shown => "block",
        }
    }

    /// Read an inline `display` value. Unset counts as the stylesheet
    /// default, which hides charts.
    pub fn from_display(display: &str) -> Self {
        match display.trim() {
            "" | "none" => Visibility::Hidden,
            _ => Visibility::Shown,
        }
    }
}

/// Where a track's duration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationSource {
    /// Read from the audio file.
    Probed,
    /// Latest timestamp in the analysis; the audio couldn't be read.
    Analysis,
    /// Neither was available.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackDuration {
    pub seconds: f64,
    pub source: DurationSource,
}

impl TrackDuration {
    pub fn unknown() -> Self {
        TrackDuration {
            seconds: f64::NAN,
            source: DurationSource::Unknown,
        }
    }
}

/// An interactive element of a track panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub id: String,
    pub action: ControlAction,
    pub label: String,
    /// Chart id for toggles.
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSlot {
    pub id: String,
    pub feature: &'static FeatureSpec,
    pub chart: Result<Chart, ChartError>,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackPanel {
    pub index: usize,
    pub name: String,
    pub audio_src: String,
    pub duration: TrackDuration,
    pub initial_volume: f64,
    pub controls: Vec<Control>,
    pub charts: Vec<ChartSlot>,
}

impl TrackPanel {
    pub fn controls_for(&self, action: ControlAction) -> impl Iterator<Item = &Control> {
        self.controls.iter().filter(move |c| c.action == action)
    }

    pub fn chart(&self, feature_key: &str) -> Option<&ChartSlot> {
        self.charts.iter().find(|c| c.feature.key == feature_key)
    }

    pub fn drawn(&self) -> usize {
        self.charts.iter().filter(|c| c.chart.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.charts.len() - self.drawn()
    }

    pub fn time_display_id(&self) -> String {
        Role::TimeDisplay.id(self.index)
    }

    pub fn initial_time_text(&self) -> &'static str {
        ZERO_TIME
    }
}

/// Page-wide settings the builder needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOptions {
    pub audio_prefix: String,
    pub initial_volume: f64,
    pub refresh_ms: u64,
    /// Where the page loads the player bundle from.
    pub player_path: String,
    /// Pixel frame every chart is drawn into.
    pub frame: ChartConfig,
}

impl Default for PageOptions {
    fn default() -> Self {
        PageOptions {
            audio_prefix: "audio".to_string(),
            initial_volume: 1.0,
            refresh_ms: 100,
            player_path: "pkg".to_string(),
            frame: ChartConfig::default(),
        }
    }
}

impl From<&Config> for PageOptions {
    fn from(config: &Config) -> Self {
        PageOptions {
            audio_prefix: config.audio_prefix.clone(),
            initial_volume: config.player.initial_volume.clamp(0.0, 1.0),
            refresh_ms: config.player.refresh_ms,
            player_path: "pkg".to_string(),
            frame: config.chart.clone(),
        }
    }
}

/// Build the panel for the `index`-th track.
///
/// A chart whose data is missing or malformed ends up as an `Err` slot; the
/// other charts are unaffected.
pub fn build_track(
    index: usize,
    track: &TrackAnalysis,
    duration: TrackDuration,
    options: &PageOptions,
) -> TrackPanel {
    let mut controls = vec![
        Control {
            id: Role::PlayButton.id(index),
            action: ControlAction::Play,
            label: PLAY_LABEL.to_string(),
            target: None,
        },
        Control {
            id: Role::StopButton.id(index),
            action: ControlAction::Stop,
            label: STOP_LABEL.to_string(),
            target: None,
        },
        Control {
            id: Role::VolumeSlider.id(index),
            action: ControlAction::Volume,
            label: "Volume".to_string(),
            target: None,
        },
        Control {
            id: Role::ProgressBar.id(index),
            action: ControlAction::Seek,
            label: String::new(),
            target: Some(Role::ProgressFill.id(index)),
        },
    ];

    let mut charts = Vec::with_capacity(FEATURES.len());
    for spec in FEATURES {
        let id = chart_id(spec.key, index);

        controls.push(Control {
            id: format!("{}-button-{}", spec.key, index),
            action: ControlAction::Toggle,
            label: format!("Toggle {}", spec.label),
            target: Some(id.clone()),
        });

        let chart = spec
            .selector
            .select(track)
            .and_then(|data| chart::render(spec.selector.feature(), data, spec.kind, spec.color, duration.seconds));
        if let Err(ref e) = chart {
            log::warn!("{}: {} chart not drawn: {}", track.name, spec.label, e);
        }

        charts.push(ChartSlot {
            id,
            feature: spec,
            chart,
            visibility: INITIAL_VISIBILITY,
        });
    }

    TrackPanel {
        index,
        name: track.name.clone(),
        audio_src: track.audio_src(&options.audio_prefix),
        duration,
        initial_volume: options.initial_volume,
        controls,
        charts,
    }
}

/// All track panels plus the options they were built with.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub tracks: Vec<TrackPanel>,
    pub options: PageOptions,
}

impl Page {
    pub fn charts_drawn(&self) -> usize {
        self.tracks.iter().map(TrackPanel::drawn).sum()
    }

    pub fn charts_failed(&self) -> usize {
        self.tracks.iter().map(TrackPanel::failed).sum()
    }
}
