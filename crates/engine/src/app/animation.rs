use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub frame: u32,
    pub duration_ms: f32,
}

impl Keyframe {
    pub const fn new(frame: u32, duration_ms: f32) -> Self {
        Self { frame, duration_ms }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Loop,
    Once,
}

/// Maps elapsed time to a frame index over a fixed sequence of keyframes.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePattern {
    starts_ms: Vec<f32>,
    frames: Vec<u32>,
    duration_ms: f32,
    playback: Playback,
    elapsed_ms: f32,
}

impl FramePattern {
    pub fn new(keyframes: &[Keyframe], playback: Playback) -> Self {
        let mut starts_ms = Vec::with_capacity(keyframes.len());
        let mut frames = Vec::with_capacity(keyframes.len());
        let mut cursor = 0.0f32;
        for keyframe in keyframes {
            starts_ms.push(cursor);
            frames.push(keyframe.frame);
            cursor += keyframe.duration_ms.max(0.0);
        }
        Self {
            starts_ms,
            frames,
            duration_ms: cursor,
            playback,
            elapsed_ms: 0.0,
        }
    }

    pub fn looping(keyframes: &[Keyframe]) -> Self {
        Self::new(keyframes, Playback::Loop)
    }

    /// Single-frame pattern; stepping it never changes the frame.
    pub fn still(frame: u32) -> Self {
        Self::new(&[Keyframe::new(frame, 0.0)], Playback::Once)
    }

    pub fn duration_ms(&self) -> f32 {
        self.duration_ms
    }

    pub fn elapsed_ms(&self) -> f32 {
        self.elapsed_ms
    }

    pub fn reset(&mut self, start_ms: f32) {
        self.elapsed_ms = start_ms.max(0.0);
        if self.playback == Playback::Loop && self.duration_ms > 0.0 {
            self.elapsed_ms %= self.duration_ms;
        }
    }

    pub fn step(&mut self, delta_ms: f32) {
        self.elapsed_ms += delta_ms.max(0.0);
        if self.duration_ms <= 0.0 {
            self.elapsed_ms = 0.0;
            return;
        }
        match self.playback {
            Playback::Loop => {
                if self.elapsed_ms >= self.duration_ms {
                    self.elapsed_ms %= self.duration_ms;
                }
            }
            Playback::Once => self.elapsed_ms = self.elapsed_ms.min(self.duration_ms),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.playback == Playback::Once && self.elapsed_ms >= self.duration_ms
    }

    pub fn frame(&self) -> u32 {
        let mut current = self.frames.first().copied().unwrap_or(0);
        for (start, frame) in self.starts_ms.iter().zip(&self.frames) {
            if *start <= self.elapsed_ms {
                current = *frame;
            } else {
                break;
            }
        }
        current
    }
}

/// Named patterns with exactly one active at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSet {
    patterns: HashMap<&'static str, FramePattern>,
    active: &'static str,
}

impl AnimationSet {
    pub fn new(initial: &'static str, patterns: Vec<(&'static str, FramePattern)>) -> Self {
        Self {
            patterns: patterns.into_iter().collect(),
            active: initial,
        }
    }

    pub fn active(&self) -> &'static str {
        self.active
    }

    /// Switches to `key` and rewinds it to `start_ms`. Replaying the active
    /// key does nothing, so held input does not restart the cycle.
    pub fn play(&mut self, key: &'static str, start_ms: f32) {
        if self.active == key {
            return;
        }
        self.active = key;
        if let Some(pattern) = self.patterns.get_mut(key) {
            pattern.reset(start_ms);
        }
    }

    pub fn step(&mut self, delta_ms: f32) {
        if let Some(pattern) = self.patterns.get_mut(self.active) {
            pattern.step(delta_ms);
        }
    }

    pub fn frame(&self) -> Option<u32> {
        self.patterns.get(self.active).map(FramePattern::frame)
    }
}
