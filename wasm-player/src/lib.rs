//! Browser binding for the featurescope player
//!
//! `mount()` finds every element with a `data-action` attribute on a page
//! written by `featurescope` and routes its events into one shared
//! [`PlaybackController`]. Each session gets its own `HtmlAudioElement`; the
//! time display refresh runs on `setInterval`.

use featurescope::page::{ControlAction, Role, Visibility};
use featurescope::playback::{
    AudioBackend, AudioHandle, PlaybackController, PlaybackError, PlayerView, Scheduler,
    SessionId, TrackId, DEFAULT_REFRESH,
};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    console, Document, Event, HtmlAudioElement, HtmlElement, HtmlInputElement, MouseEvent, Window,
};

type Controller = PlaybackController<DomBackend, DomView, IntervalScheduler>;
type SharedController = Rc<RefCell<Controller>>;
type WeakController = Weak<RefCell<Controller>>;

/// Volume used when a track's slider can't be read.
const FALLBACK_VOLUME: f64 = 1.0;

fn use_controller(controller: &RefCell<Controller>, f: impl FnOnce(&mut Controller)) {
    match controller.try_borrow_mut() {
        Ok(mut c) => f(&mut c),
        Err(_) => console::warn_1(&"featurescope: player busy, event dropped".into()),
    };
}

fn with_controller(controller: &WeakController, f: impl FnOnce(&mut Controller)) {
    if let Some(rc) = controller.upgrade() {
        use_controller(&rc, f);
    }
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

// =============================================================================
// Audio
// =============================================================================

pub struct DomAudio {
    element: HtmlAudioElement,
    listeners: Vec<(&'static str, Closure<dyn FnMut(Event)>)>,
    on_rejected: Rc<Closure<dyn FnMut(JsValue)>>,
}

impl AudioHandle for DomAudio {
    fn play(&mut self) {
        match self.element.play() {
            Ok(promise) => {
                let _ = promise.catch(&self.on_rejected);
            }
            Err(e) => console::warn_2(&"featurescope: play failed".into(), &e),
        }
    }

    fn pause(&mut self) {
        if let Err(e) = self.element.pause() {
            console::warn_2(&"featurescope: pause failed".into(), &e);
        }
    }

    fn position(&self) -> f64 {
        self.element.current_time()
    }

    fn set_position(&mut self, seconds: f64) {
        self.element.set_current_time(seconds);
    }

    fn duration(&self) -> f64 {
        self.element.duration()
    }

    fn set_volume(&mut self, level: f64) {
        self.element.set_volume(level);
    }
}

impl Drop for DomAudio {
    fn drop(&mut self) {
        for (event, listener) in &self.listeners {
            let _ = self
                .element
                .remove_event_listener_with_callback(event, listener.as_ref().unchecked_ref());
        }
    }
}

pub struct DomBackend {
    controller: WeakController,
    /// Shared by every session; a paused or replaced source rejects its
    /// pending play promise after the session is gone.
    on_rejected: Rc<Closure<dyn FnMut(JsValue)>>,
}

impl AudioBackend for DomBackend {
    type Handle = DomAudio;

    fn open(&mut self, session: SessionId, source: &str) -> Result<DomAudio, PlaybackError> {
        let unavailable = |e: JsValue| PlaybackError::Unavailable {
            source_path: source.to_string(),
            reason: describe(&e),
        };

        let element = HtmlAudioElement::new_with_src(source).map_err(unavailable)?;
        let mut audio = DomAudio {
            element,
            listeners: Vec::with_capacity(4),
            on_rejected: self.on_rejected.clone(),
        };

        let events: [(&'static str, fn(&mut Controller, SessionId)); 4] = [
            ("timeupdate", Controller::on_time_update),
            ("ended", Controller::on_ended),
            ("error", Controller::on_error),
            ("pause", Controller::on_paused),
        ];

        for (event, handler) in events {
            let controller = self.controller.clone();
            let listener = Closure::wrap(Box::new(move |_: Event| {
                with_controller(&controller, |c| handler(c, session));
            }) as Box<dyn FnMut(Event)>);
            audio
                .element
                .add_event_listener_with_callback(event, listener.as_ref().unchecked_ref())
                .map_err(unavailable)?;
            audio.listeners.push((event, listener));
        }

        Ok(audio)
    }
}

// =============================================================================
// View
// =============================================================================

pub struct DomView {
    document: Document,
}

impl DomView {
    fn element(&self, id: &str) -> Option<HtmlElement> {
        let found = self
            .document
            .get_element_by_id(id)
            .and_then(|e| e.dyn_into::<HtmlElement>().ok());
        if found.is_none() {
            console::warn_1(&format!("featurescope: no element #{}", id).into());
        }
        found
    }
}

impl PlayerView for DomView {
    fn set_button_label(&mut self, track: TrackId, label: &str) {
        if let Some(button) = self.element(&Role::PlayButton.id(track)) {
            button.set_text_content(Some(label));
        }
    }

    fn set_progress(&mut self, track: TrackId, width: &str) {
        if let Some(fill) = self.element(&Role::ProgressFill.id(track)) {
            let _ = fill.style().set_property("width", width);
        }
    }

    fn set_time_text(&mut self, track: TrackId, text: &str) {
        if let Some(display) = self.element(&Role::TimeDisplay.id(track)) {
            display.set_text_content(Some(text));
        }
    }
}

// =============================================================================
// Timer
// =============================================================================

pub struct IntervalScheduler {
    window: Window,
    controller: WeakController,
}

pub struct Interval {
    handle: Option<i32>,
    _tick: Closure<dyn FnMut()>,
}

impl Scheduler for IntervalScheduler {
    type Timer = Interval;

    fn start_interval(&mut self, period: Duration) -> Interval {
        let controller = self.controller.clone();
        let tick = Closure::wrap(Box::new(move || {
            with_controller(&controller, |c| c.tick());
        }) as Box<dyn FnMut()>);

        let handle = self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                tick.as_ref().unchecked_ref(),
                period.as_millis().min(i32::MAX as u128) as i32,
            )
            .map_err(|e| console::warn_2(&"featurescope: setInterval failed".into(), &e))
            .ok();

        Interval { handle, _tick: tick }
    }

    fn cancel(&mut self, timer: Interval) {
        if let Some(handle) = timer.handle {
            self.window.clear_interval_with_handle(handle);
        }
    }
}

// =============================================================================
// Mounting
// =============================================================================

/// Wire every `data-action` control on the page.
#[wasm_bindgen]
pub fn mount() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let refresh = refresh_interval(
        document
            .body()
            .and_then(|b| b.get_attribute("data-refresh-ms"))
            .as_deref(),
    );

    let on_rejected = Rc::new(Closure::wrap(Box::new(|e: JsValue| {
        console::warn_2(&"featurescope: playback rejected".into(), &e);
    }) as Box<dyn FnMut(JsValue)>));

    let controller: SharedController = Rc::new_cyclic(|weak: &WeakController| {
        RefCell::new(
            PlaybackController::new(
                DomBackend {
                    controller: weak.clone(),
                    on_rejected,
                },
                DomView {
                    document: document.clone(),
                },
                IntervalScheduler {
                    window: window.clone(),
                    controller: weak.clone(),
                },
            )
            .with_refresh_interval(refresh),
        )
    });

    let controls = document.query_selector_all("[data-action]")?;
    let mut mounted = 0;
    for i in 0..controls.length() {
        let Some(element) = controls
            .item(i)
            .and_then(|n| n.dyn_into::<HtmlElement>().ok())
        else {
            continue;
        };
        if mount_control(&controller, &document, &element)? {
            mounted += 1;
        }
    }

    console::log_1(&format!("featurescope: {} control(s) mounted", mounted).into());
    Ok(())
}

fn mount_control(
    controller: &SharedController,
    document: &Document,
    element: &HtmlElement,
) -> Result<bool, JsValue> {
    let Some(action) = element
        .get_attribute("data-action")
        .and_then(|a| ControlAction::parse(&a))
    else {
        return Ok(false);
    };
    let track: Option<TrackId> = element
        .get_attribute("data-track")
        .and_then(|t| t.parse().ok());
    let controller = controller.clone();

    let (event, handler): (&str, Box<dyn FnMut(Event)>) = match (action, track) {
        (ControlAction::Toggle, _) => {
            let Some(target) = element.get_attribute("data-target") else {
                console::warn_1(&format!("featurescope: toggle #{} has no target", element.id()).into());
                return Ok(false);
            };
            let document = document.clone();
            ("click", Box::new(move |_: Event| toggle_chart(&document, &target)))
        }

        (_, None) => {
            console::warn_1(&format!("featurescope: control #{} has no track", element.id()).into());
            return Ok(false);
        }

        (ControlAction::Play, Some(track)) => {
            let src = element.get_attribute("data-src").unwrap_or_default();
            let document = document.clone();
            (
                "click",
                Box::new(move |_: Event| {
                    let volume = slider_volume(&document, track);
                    use_controller(&controller, |c| {
                        if let Err(e) = c.play(track, &src, volume) {
                            console::warn_1(&format!("featurescope: {}", e).into());
                        }
                    });
                }),
            )
        }

        (ControlAction::Stop, Some(track)) => (
            "click",
            Box::new(move |_: Event| use_controller(&controller, |c| c.stop(track))),
        ),

        (ControlAction::Volume, Some(track)) => {
            let input = element
                .clone()
                .dyn_into::<HtmlInputElement>()
                .map_err(|_| JsValue::from_str("volume control is not an input"))?;
            (
                "input",
                Box::new(move |_: Event| {
                    let Ok(level) = input.value().parse::<f64>() else {
                        return;
                    };
                    use_controller(&controller, |c| {
                        if c.active_track() == Some(track) {
                            c.set_volume(level);
                        }
                    });
                }),
            )
        }

        (ControlAction::Seek, Some(track)) => {
            let bar = element.clone();
            (
                "click",
                Box::new(move |event: Event| {
                    let Some(event) = event.dyn_ref::<MouseEvent>() else {
                        return;
                    };
                    let rect = bar.get_bounding_client_rect();
                    let fraction = click_fraction(event.client_x() as f64, rect.left(), rect.width());
                    use_controller(&controller, |c| {
                        if c.active_track() == Some(track) {
                            c.seek(fraction);
                        }
                    });
                }),
            )
        }
    };

    let closure = Closure::wrap(handler);
    element.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    // Controls live as long as the page
    closure.forget();
    Ok(true)
}

/// Flip a chart container between hidden and shown.
fn toggle_chart(document: &Document, target: &str) {
    let Some(chart) = document
        .get_element_by_id(target)
        .and_then(|e| e.dyn_into::<HtmlElement>().ok())
    else {
        console::error_1(&format!("featurescope: no chart #{}", target).into());
        return;
    };

    let style = chart.style();
    let current = style.get_property_value("display").unwrap_or_default();
    let next = Visibility::from_display(&current).toggle();
    let _ = style.set_property("display", next.css_display());
}

fn slider_volume(document: &Document, track: TrackId) -> f64 {
    document
        .get_element_by_id(&Role::VolumeSlider.id(track))
        .and_then(|e| e.dyn_into::<HtmlInputElement>().ok())
        .and_then(|input| input.value().parse::<f64>().ok())
        .unwrap_or(FALLBACK_VOLUME)
}

/// Refresh period from the page's `data-refresh-ms`, if it's a positive integer.
pub fn refresh_interval(attr: Option<&str>) -> Duration {
    attr.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&ms| ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_REFRESH)
}

/// Where a click at `x` falls along a bar starting at `left`, as 0..1.
pub fn click_fraction(x: f64, left: f64, width: f64) -> f64 {
    if !(width > 0.0) || !x.is_finite() {
        return 0.0;
    }
    ((x - left) / width).clamp(0.0, 1.0)
}
