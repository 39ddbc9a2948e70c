//! The single authoritative zoom factor.

use crate::events::{EventBus, SubscriptionId};

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 10.0;
pub const DEFAULT_SCALE: f32 = 1.0;
/// Multiplier applied per zoom tick.
pub const DEFAULT_TICK_FACTOR: f32 = 1.1;

const UNCHANGED_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleChange {
    pub previous: f32,
    pub current: f32,
}

impl ScaleChange {
    /// `current / previous`
    pub fn ratio(&self) -> f32 {
        self.current / self.previous
    }
}

fn round_hundredths(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Holds the current scale, clamps every write and notifies subscribers
/// synchronously on change.
///
/// ```
/// use pdfmask_viewer::ScaleController;
///
/// let mut scale = ScaleController::new(1.0);
/// assert_eq!(scale.zoom_by_ticks(1, None).map(|c| c.current), Some(1.1));
/// assert!(scale.set_scale(1.1).is_none());
/// assert_eq!(scale.set_scale(50.0).map(|c| c.current), Some(10.0));
/// ```
#[derive(Debug)]
pub struct ScaleController {
    scale: f32,
    min: f32,
    max: f32,
    tick_factor: f32,
    subscribers: EventBus<ScaleChange>,
}

impl ScaleController {
    pub fn new(initial: f32) -> Self {
        Self::with_bounds(initial, MIN_SCALE, MAX_SCALE)
    }

    /// Bounds are swapped if given in the wrong order.
    pub fn with_bounds(initial: f32, min: f32, max: f32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let initial = if initial.is_finite() { initial } else { DEFAULT_SCALE };
        Self {
            scale: initial.clamp(min, max),
            min,
            max,
            tick_factor: DEFAULT_TICK_FACTOR,
            subscribers: EventBus::new(),
        }
    }

    pub fn with_tick_factor(mut self, tick_factor: f32) -> Self {
        if tick_factor.is_finite() && tick_factor > 1.0 {
            self.tick_factor = tick_factor;
        }
        self
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    pub fn tick_factor(&self) -> f32 {
        self.tick_factor
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Set the scale, clamped to the bounds. Returns `None` when nothing changed.
    pub fn set_scale(&mut self, value: f32) -> Option<ScaleChange> {
        if !value.is_finite() {
            log::debug!("ignoring non-finite scale {value}");
            return None;
        }
        let next = self.clamp(value);
        if (next - self.scale).abs() < UNCHANGED_EPSILON {
            return None;
        }

        let change = ScaleChange { previous: self.scale, current: next };
        self.scale = next;
        log::debug!("scale {} -> {}", change.previous, change.current);
        self.subscribers.emit(&change);
        Some(change)
    }

    /// Multiply by `factor^ticks` (tick factor by default), clamped and rounded
    /// to hundredths.
    ///
    /// A tick always moves the scale by at least 0.01 unless a bound stops it,
    /// so a small factor at a low scale cannot round back to where it started.
    pub fn zoom_by_ticks(&mut self, ticks: i32, factor: Option<f32>) -> Option<ScaleChange> {
        if ticks == 0 {
            return None;
        }
        let factor = factor.filter(|f| f.is_finite() && *f > 0.0).unwrap_or(self.tick_factor);
        // Clamp before narrowing: an overflowing product is +inf or 0.
        let target = f64::from(self.scale) * f64::from(factor).powi(ticks);
        if target.is_nan() {
            return None;
        }
        let clamped = target.clamp(f64::from(self.min), f64::from(self.max)) as f32;

        let mut next = self.clamp(round_hundredths(clamped));
        if (next - self.scale).abs() < UNCHANGED_EPSILON && factor != 1.0 {
            let step = if (factor > 1.0) == (ticks > 0) { 0.01 } else { -0.01 };
            next = round_hundredths(self.scale + step);
        }
        self.set_scale(next)
    }

    /// Continuous zoom, e.g. from a pinch gesture.
    ///
    /// Non-finite, non-positive and near-1 factors are ignored.
    pub fn zoom_by_factor(&mut self, factor: f32) -> Option<ScaleChange> {
        if !factor.is_finite() || factor <= 0.0 || (factor - 1.0).abs() < UNCHANGED_EPSILON {
            return None;
        }
        self.set_scale(self.scale * factor)
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ScaleChange) + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}

impl Default for ScaleController {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE)
    }
}

/// Scale at which a page of `page_width` points fills `viewport_width` pixels
/// minus `gap` on each side.
pub fn fit_width_scale(viewport_width: f32, page_width: f32, gap: f32) -> Option<f32> {
    let available = viewport_width - gap * 2.0;
    (page_width > 0.0 && available > 0.0).then(|| available / page_width)
}

/// Scale at which the whole page fits inside the viewport.
pub fn fit_page_scale(
    viewport_width: f32,
    viewport_height: f32,
    page_width: f32,
    page_height: f32,
    gap: f32,
) -> Option<f32> {
    let available_height = viewport_height - gap * 2.0;
    let by_height = (page_height > 0.0 && available_height > 0.0)
        .then(|| available_height / page_height)?;
    let by_width = fit_width_scale(viewport_width, page_width, gap)?;
    Some(by_width.min(by_height))
}
