//! Cue gain envelope
//!
//! Linear fade in over `[0, fade_in)`, linear fade out over
//! `(duration - fade_out, duration]`, full volume in between. When the two
//! fades overlap the fade out wins. Mute is not part of the envelope; the
//! scheduler applies it to the output separately.

use crate::timeline::CueSettings;

/// Gain at `elapsed` seconds into a cue of `duration` seconds
pub fn gain_at(elapsed: f32, duration: f32, settings: &CueSettings) -> f32 {
    let volume = settings.volume;

    let in_fade_in = elapsed >= 0.0 && elapsed < settings.fade_in;
    let in_fade_out = elapsed > duration - settings.fade_out && elapsed <= duration;

    let gain = if in_fade_out {
        (duration - elapsed) / settings.fade_out * volume
    } else if in_fade_in {
        elapsed / settings.fade_in * volume
    } else {
        volume
    };

    gain.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn settings(volume: f32, fade_in: f32, fade_out: f32) -> CueSettings {
        CueSettings::new(false, volume, fade_in, fade_out)
    }

    #[test]
    fn test_mid_fade_in() {
        assert_relative_eq!(gain_at(1.0, 10.0, &settings(0.8, 2.0, 2.0)), 0.4);
    }

    #[test]
    fn test_steady_region() {
        assert_relative_eq!(gain_at(5.0, 10.0, &settings(0.8, 2.0, 2.0)), 0.8);
        assert_relative_eq!(gain_at(2.0, 10.0, &settings(0.8, 2.0, 2.0)), 0.8);
    }

    #[test]
    fn test_fade_out() {
        assert_relative_eq!(gain_at(9.0, 10.0, &settings(0.8, 2.0, 2.0)), 0.4);
        assert_relative_eq!(gain_at(10.0, 10.0, &settings(0.8, 2.0, 2.0)), 0.0);
    }

    #[test]
    fn test_no_fades_is_flat() {
        let flat = settings(0.6, 0.0, 0.0);
        assert_relative_eq!(gain_at(0.0, 10.0, &flat), 0.6);
        assert_relative_eq!(gain_at(10.0, 10.0, &flat), 0.6);
    }

    #[test]
    fn test_overlapping_fades_prefer_fade_out() {
        // fade in covers [0, 8), fade out covers (4, 10]
        let overlap = settings(1.0, 8.0, 6.0);
        assert_relative_eq!(gain_at(2.0, 10.0, &overlap), 0.25);
        assert_relative_eq!(gain_at(7.0, 10.0, &overlap), 0.5);
    }

    #[test]
    fn test_starts_silent_with_fade_in() {
        assert_relative_eq!(gain_at(0.0, 10.0, &settings(1.0, 3.0, 0.0)), 0.0);
    }
}
