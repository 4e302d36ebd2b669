//! Sound channel abstraction
//!
//! An [`AudioChannel`] is one physical sound emitter: it has a bound clip,
//! volume, pitch, a play head, routing and spatial placement. Playback
//! instances and the music player drive channels; they never touch audio
//! data themselves.
//!
//! [`SimulatedChannel`] keeps all of that state in memory and moves its play
//! head on `tick`. Tests and the command-line runner use it; a real backend
//! supplies its own implementation through a [`ChannelFactory`].

use std::sync::Arc;

use cuebox_common::catalog::ClipDescriptor;

/// Creates fresh channels for the pool and the music player
pub type ChannelFactory = Box<dyn Fn() -> Box<dyn AudioChannel> + Send>;

/// One physical sound-emitting channel
pub trait AudioChannel: Send {
    /// Bind (or clear) the clip this channel plays
    fn set_clip(&mut self, clip: Option<Arc<ClipDescriptor>>);
    fn clip(&self) -> Option<&Arc<ClipDescriptor>>;

    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);

    fn pitch(&self) -> f32;
    fn set_pitch(&mut self, pitch: f32);

    fn is_muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);

    /// Play head in clip seconds
    fn time(&self) -> f32;
    fn set_time(&mut self, time: f32);

    fn position(&self) -> [f32; 3];
    fn set_position(&mut self, position: [f32; 3]);

    /// Output (mixer) group
    fn output(&self) -> Option<&str>;
    fn set_output(&mut self, output: Option<String>);

    /// Scene anchor the channel follows
    fn parent(&self) -> Option<&str>;
    fn set_parent(&mut self, parent: Option<String>);

    /// Start playing after `delay` seconds of silence
    fn play(&mut self, delay: f32);
    fn pause(&mut self);
    fn unpause(&mut self);
    fn stop(&mut self);

    /// True while started and not paused or stopped (including a pending delay)
    fn is_playing(&self) -> bool;

    /// Advance backend-side time; backends with their own clock ignore this
    fn tick(&mut self, _dt: f32) {}
}

/// In-memory channel whose play head advances on `tick`
///
/// The play head moves in wall-clock seconds; pitch is stored but does not
/// stretch playback.
#[derive(Debug, Clone)]
pub struct SimulatedChannel {
    clip: Option<Arc<ClipDescriptor>>,
    volume: f32,
    pitch: f32,
    muted: bool,
    time: f32,
    position: [f32; 3],
    output: Option<String>,
    parent: Option<String>,
    started: bool,
    paused: bool,
    pending_delay: f32,
    plays: u32,
}

impl SimulatedChannel {
    pub fn new() -> Self {
        Self {
            clip: None,
            volume: 1.0,
            pitch: 1.0,
            muted: false,
            time: 0.0,
            position: [0.0; 3],
            output: None,
            parent: None,
            started: false,
            paused: false,
            pending_delay: 0.0,
            plays: 0,
        }
    }

    /// Factory producing boxed simulated channels
    pub fn factory() -> ChannelFactory {
        Box::new(|| Box::new(SimulatedChannel::new()) as Box<dyn AudioChannel>)
    }

    /// Number of `play` calls since creation
    pub fn play_count(&self) -> u32 {
        self.plays
    }

    /// Remaining silent pre-roll
    pub fn pending_delay(&self) -> f32 {
        self.pending_delay
    }

    pub fn is_paused(&self) -> bool {
        self.started && self.paused
    }
}

impl Default for SimulatedChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioChannel for SimulatedChannel {
    fn set_clip(&mut self, clip: Option<Arc<ClipDescriptor>>) {
        self.clip = clip;
        self.time = 0.0;
    }

    fn clip(&self) -> Option<&Arc<ClipDescriptor>> {
        self.clip.as_ref()
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn pitch(&self) -> f32 {
        self.pitch
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(-3.0, 3.0);
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn time(&self) -> f32 {
        self.time
    }

    fn set_time(&mut self, time: f32) {
        let length = self.clip.as_ref().map(|c| c.length).unwrap_or(0.0);
        self.time = time.clamp(0.0, length);
    }

    fn position(&self) -> [f32; 3] {
        self.position
    }

    fn set_position(&mut self, position: [f32; 3]) {
        self.position = position;
    }

    fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    fn set_output(&mut self, output: Option<String>) {
        self.output = output;
    }

    fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn set_parent(&mut self, parent: Option<String>) {
        self.parent = parent;
    }

    fn play(&mut self, delay: f32) {
        if self.clip.is_none() {
            return;
        }
        self.started = true;
        self.paused = false;
        self.pending_delay = delay.max(0.0);
        self.plays += 1;
    }

    fn pause(&mut self) {
        if self.started {
            self.paused = true;
        }
    }

    fn unpause(&mut self) {
        self.paused = false;
    }

    fn stop(&mut self) {
        self.started = false;
        self.paused = false;
        self.pending_delay = 0.0;
    }

    fn is_playing(&self) -> bool {
        self.started && !self.paused
    }

    fn tick(&mut self, dt: f32) {
        if !self.is_playing() || dt <= 0.0 {
            return;
        }
        let mut remaining = dt;
        if self.pending_delay > 0.0 {
            let consumed = self.pending_delay.min(remaining);
            self.pending_delay -= consumed;
            remaining -= consumed;
        }
        if remaining <= 0.0 {
            return;
        }

        let length = self.clip.as_ref().map(|c| c.length).unwrap_or(0.0);
        self.time += remaining;
        if self.time >= length {
            // Non-looping channel runs off the end of its clip
            self.time = length;
            self.started = false;
        }
    }
}
