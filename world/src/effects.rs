use wizard_maze_core::{PixelPoint, Tint};

/// Frames per second of a death animation.
pub const DEATH_ANIMATION_SPEED: f32 = 10.0;

/// Number of frames in a death animation sheet.
pub const DEATH_FRAME_COUNT: f32 = 8.0;

/// Screen shake applied to the whole maze.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraShake {
    enabled: bool,
    active: bool,
    time: f32,
    amplitude: f32,
    intensity: f32,
    duration: f32,
    offset: PixelPoint,
}

impl CameraShake {
    /// Creates an idle shake; a disabled shake ignores every request.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            active: false,
            time: 0.0,
            amplitude: 0.0,
            intensity: 0.0,
            duration: 0.0,
            offset: PixelPoint::new(0.0, 0.0),
        }
    }

    /// Starts a shake unless one is already running. A negative duration never ends.
    pub fn shake(&mut self, amplitude: f32, intensity: f32, duration: f32) -> bool {
        if self.active || !self.enabled {
            return false;
        }
        self.active = true;
        self.time = 0.0;
        self.amplitude = amplitude;
        self.intensity = intensity;
        self.duration = duration;
        true
    }

    /// Advances the shake and recomputes the offset.
    pub fn update(&mut self, dt: f32) {
        if !self.active || !self.enabled {
            return;
        }
        self.time += dt;
        if self.duration < 0.0 || self.time < self.duration {
            let phase = self.time * self.intensity;
            self.offset = PixelPoint::new(
                phase.sin() * self.amplitude,
                phase.cos() * self.amplitude,
            );
        } else {
            self.stop();
        }
    }

    /// Ends the current shake immediately.
    pub fn stop(&mut self) {
        self.active = false;
        self.offset = PixelPoint::default();
    }

    /// Whether a shake is running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Current display offset.
    #[must_use]
    pub const fn offset(&self) -> PixelPoint {
        self.offset
    }
}

/// Short-lived animation left behind by a dying character.
#[derive(Clone, Debug, PartialEq)]
pub struct DeathAnimation {
    position: PixelPoint,
    tint: Tint,
    frame: f32,
}

impl DeathAnimation {
    pub(crate) const fn new(position: PixelPoint, tint: Tint) -> Self {
        Self {
            position,
            tint,
            frame: 0.0,
        }
    }

    /// Where the animation plays.
    #[must_use]
    pub const fn position(&self) -> PixelPoint {
        self.position
    }

    /// Tint of the dying character.
    #[must_use]
    pub const fn tint(&self) -> Tint {
        self.tint
    }

    /// Index of the frame to display.
    #[must_use]
    pub fn frame(&self) -> u32 {
        self.frame.floor() as u32
    }

    pub(crate) fn update(&mut self, dt: f32) {
        self.frame += dt * DEATH_ANIMATION_SPEED;
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.frame > DEATH_FRAME_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::{CameraShake, DeathAnimation};
    use wizard_maze_core::{PixelPoint, Tint};

    #[test]
    fn shake_ignores_requests_while_running() {
        let mut shake = CameraShake::new(true);
        assert!(shake.shake(2.0, 50.0, 0.1));
        assert!(!shake.shake(4.0, 50.0, 2.0));
        shake.update(0.05);
        assert!(shake.offset().x.abs() <= 2.0);
        shake.update(0.06);
        assert!(!shake.is_active());
        assert_eq!(shake.offset(), PixelPoint::default());
    }

    #[test]
    fn disabled_shake_never_starts() {
        let mut shake = CameraShake::new(false);
        assert!(!shake.shake(3.0, 50.0, 0.5));
        assert!(!shake.is_active());
    }

    #[test]
    fn death_animation_expires_after_its_frames() {
        let mut death = DeathAnimation::new(PixelPoint::new(10.0, 10.0), Tint::from_rgb(255, 255, 255));
        death.update(0.5);
        assert_eq!(death.frame(), 5);
        assert!(!death.is_finished());
        death.update(0.4);
        assert!(death.is_finished());
    }
}
