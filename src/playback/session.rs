//! The one open audio source

use super::{AudioHandle, SessionId, TrackId};

/// An opened audio source and what the controller knows about it.
///
/// A session is dropped through [`PlaybackSession::teardown`], which pauses
/// the handle and rewinds it before letting go, so a replaced session can
/// never keep sounding.
#[derive(Debug)]
pub struct PlaybackSession<H: AudioHandle> {
    pub id: SessionId,
    pub track: TrackId,
    pub source: String,
    pub playing: bool,
    handle: H,
}

impl<H: AudioHandle> PlaybackSession<H> {
    pub fn new(id: SessionId, track: TrackId, source: String, handle: H) -> Self {
        PlaybackSession {
            id,
            track,
            source,
            playing: false,
            handle,
        }
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    pub fn play(&mut self) {
        self.handle.play();
        self.playing = true;
    }

    /// Known duration in seconds; `None` until the source has reported it.
    pub fn duration(&self) -> Option<f64> {
        let d = self.handle.duration();
        (d.is_finite() && d > 0.0).then_some(d)
    }

    /// Pause, rewind to zero and release the handle. Returns the track it played.
    pub fn teardown(mut self) -> TrackId {
        self.handle.pause();
        self.handle.set_position(0.0);
        self.playing = false;
        self.track
    }
}
