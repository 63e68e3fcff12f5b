use super::NavAction;

/// Map a `KeyboardEvent.key` value to a navigation action. Recognized keys
/// should have their default action prevented.
pub fn key_action(key: &str, shift: bool) -> Option<NavAction> {
    match key {
        " " | "Spacebar" if shift => Some(NavAction::Previous),
        " " | "Spacebar" => Some(NavAction::Next),
        "ArrowRight" | "ArrowDown" | "PageDown" | "Right" | "Down" => Some(NavAction::Next),
        "ArrowLeft" | "ArrowUp" | "PageUp" | "Left" | "Up" => Some(NavAction::Previous),
        "Home" => Some(NavAction::First),
        "End" => Some(NavAction::Last),
        _ => None,
    }
}

pub const DEFAULT_WHEEL_COOLDOWN_MS: f64 = 600.0;

/// `WheelEvent.deltaMode` values.
pub const DELTA_PIXEL: u32 = 0;

/// Legacy `wheelDelta` step reported by one mouse-wheel notch.
const LEGACY_NOTCH: f64 = 120.0;

/// Pixel deltas at or above this, in whole pixels, come from a wheel notch.
const NOTCH_PIXELS: f64 = 100.0;

/// Continuous deltas at or below this are jitter.
const TRACKPAD_NOISE: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelSource {
    /// A discrete mouse-wheel step.
    Notch,
    /// Trackpad or inertial mouse deltas.
    Continuous,
}

/// The parts of a wheel event the debouncer looks at.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelSample {
    pub delta_x: f64,
    pub delta_y: f64,
    pub delta_mode: u32,
    /// Deprecated `wheelDelta`, where the engine still reports it.
    pub wheel_delta: Option<f64>,
}

impl WheelSample {
    /// Dominant-axis delta; positive means forward.
    pub fn delta(&self) -> f64 {
        if self.delta_x.abs() > self.delta_y.abs() {
            self.delta_x
        } else {
            self.delta_y
        }
    }

    pub fn source(&self) -> WheelSource {
        if let Some(legacy) = self.wheel_delta.filter(|w| *w != 0.0) {
            if legacy.abs() % LEGACY_NOTCH == 0.0 {
                return WheelSource::Notch;
            }
            return WheelSource::Continuous;
        }
        if self.delta_mode != DELTA_PIXEL {
            return WheelSource::Notch;
        }
        let delta = self.delta().abs();
        if delta >= NOTCH_PIXELS && delta.fract() == 0.0 {
            WheelSource::Notch
        } else {
            WheelSource::Continuous
        }
    }
}

/// Turns a stream of wheel events into at most one navigation per gesture.
///
/// After an accepted event nothing is accepted for `cooldown_ms`. Continuous
/// deltas that keep shrinking after a navigation are the momentum tail of the
/// same gesture and stay suppressed until they grow again or the stream pauses
/// for a full cool-down.
#[derive(Debug, Clone)]
pub struct WheelDebouncer {
    cooldown_ms: f64,
    last_navigation: Option<f64>,
    last_event: Option<f64>,
    last_magnitude: f64,
}

impl Default for WheelDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_WHEEL_COOLDOWN_MS)
    }
}

impl WheelDebouncer {
    pub fn new(cooldown_ms: f64) -> Self {
        Self {
            cooldown_ms,
            last_navigation: None,
            last_event: None,
            last_magnitude: 0.0,
        }
    }

    /// Feed one wheel event observed at `now_ms`.
    pub fn accept(&mut self, now_ms: f64, sample: WheelSample) -> Option<NavAction> {
        let delta = sample.delta();
        let magnitude = delta.abs();
        let source = sample.source();
        if magnitude == 0.0 || (source == WheelSource::Continuous && magnitude <= TRACKPAD_NOISE) {
            return None;
        }

        let paused = self
            .last_event
            .is_none_or(|t| now_ms - t >= self.cooldown_ms);
        let decaying = source == WheelSource::Continuous
            && self.last_navigation.is_some()
            && !paused
            && magnitude <= self.last_magnitude;
        let cooling = self
            .last_navigation
            .is_some_and(|t| now_ms - t < self.cooldown_ms);

        self.last_event = Some(now_ms);
        self.last_magnitude = magnitude;

        if cooling || decaying {
            log::trace!("wheel {delta} suppressed (cooling={cooling}, decaying={decaying})");
            return None;
        }

        self.last_navigation = Some(now_ms);
        Some(if delta > 0.0 {
            NavAction::Next
        } else {
            NavAction::Previous
        })
    }
}

pub const DEFAULT_SNAP_BAND_PX: f64 = 8.0;

/// Horizontal extent of the scrubber track in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub left: f64,
    pub width: f64,
}

/// An in-progress touch drag on the scrubber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrubberDrag {
    start_x: f64,
    start_position: f64,
    snap_band: f64,
}

impl ScrubberDrag {
    pub fn begin(touch_x: f64, current_position: f64, snap_band: f64) -> Self {
        Self {
            start_x: touch_x,
            start_position: current_position,
            snap_band: snap_band.max(0.0),
        }
    }

    /// Fractional page position for a touch at `touch_x`.
    pub fn position(&self, touch_x: f64, track: Track, page_count: usize) -> f64 {
        if (touch_x - self.start_x).abs() <= self.snap_band {
            return self.start_position;
        }
        if page_count == 0 || track.width <= 0.0 {
            return 0.0;
        }
        let fraction = ((touch_x - track.left) / track.width).clamp(0.0, 1.0);
        (fraction * page_count as f64).min((page_count - 1) as f64)
    }

    /// Page to settle on when the touch ends at `touch_x`.
    pub fn release(&self, touch_x: f64, track: Track, page_count: usize) -> usize {
        let position = self.position(touch_x, track, page_count);
        (position.round().max(0.0) as usize).min(page_count.saturating_sub(1))
    }
}
