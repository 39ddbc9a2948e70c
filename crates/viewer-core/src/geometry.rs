//! Rectangle math, visibility fractions and ordered search.
//!
//! Everything here is a pure function of its inputs.

/// Percent values closer than this rank as a tie.
pub const PERCENT_TIE_EPSILON: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (right > x && bottom > y).then(|| Rect::new(x, y, right - x, bottom - y))
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Multiply every coordinate by `factor`.
    pub fn scaled(&self, factor: f32) -> Rect {
        Rect::new(self.x * factor, self.y * factor, self.width * factor, self.height * factor)
    }

    /// Same rectangle with non-negative width and height.
    pub fn normalized(&self) -> Rect {
        let (x, width) = if self.width < 0.0 { (self.x + self.width, -self.width) } else { (self.x, self.width) };
        let (y, height) =
            if self.height < 0.0 { (self.y + self.height, -self.height) } else { (self.y, self.height) };
        Rect::new(x, y, width, height)
    }
}

/// Document units (PDF points) to viewport pixels.
pub fn to_viewport(document_units: f32, scale: f32) -> f32 {
    document_units * scale
}

/// Viewport pixels to document units. A non-positive scale maps to zero.
pub fn to_document(viewport_pixels: f32, scale: f32) -> f32 {
    if scale > 0.0 {
        viewport_pixels / scale
    } else {
        0.0
    }
}

/// Visible percentage of one page, measured on the current tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityEntry {
    pub index: u32,
    /// 0..=100
    pub percent: f32,
}

impl VisibilityEntry {
    pub fn new(index: u32, percent: f32) -> Self {
        Self { index, percent }
    }

    pub fn is_visible(&self) -> bool {
        self.percent > 0.0
    }

    pub fn is_fully_visible(&self) -> bool {
        self.percent >= 100.0
    }
}

/// Fraction of `[start, start + len)` covered by `[view_start, view_start + view_len)`.
fn axis_fraction(start: f32, len: f32, view_start: f32, view_len: f32) -> f32 {
    if len <= 0.0 {
        return 0.0;
    }
    let end = start + len;
    let view_end = view_start + view_len;
    if start >= view_start && end <= view_end {
        return 1.0;
    }
    let overlap = (end.min(view_end) - start.max(view_start)).max(0.0);
    (overlap / len).clamp(0.0, 1.0)
}

/// Percentage (0..=100, floored) of `element`'s area inside `viewport`.
///
/// ```
/// use pdfmask_viewer::geometry::{visible_percent, Rect};
///
/// let viewport = Rect::new(0.0, 0.0, 800.0, 600.0);
/// assert_eq!(visible_percent(&viewport, &Rect::new(0.0, 100.0, 800.0, 400.0)), 100.0);
/// assert_eq!(visible_percent(&viewport, &Rect::new(0.0, 400.0, 800.0, 400.0)), 50.0);
/// ```
pub fn visible_percent(viewport: &Rect, element: &Rect) -> f32 {
    if element.area() <= 0.0 {
        return 0.0;
    }
    let vertical = axis_fraction(element.y, element.height, viewport.y, viewport.height);
    let horizontal = axis_fraction(element.x, element.width, viewport.x, viewport.width);
    (vertical * horizontal * 100.0).floor()
}

/// Page indexes ordered by descending visibility, ties broken by ascending index.
///
/// Percentages within [`PERCENT_TIE_EPSILON`] of the highest value in a run
/// tie with it, wherever they fall relative to each other.
pub fn rank_by_visibility(entries: &[VisibilityEntry]) -> Vec<u32> {
    let mut ranked: Vec<(f32, u32)> = entries
        .iter()
        .map(|entry| {
            let percent = if entry.percent.is_finite() { entry.percent } else { 0.0 };
            (percent, entry.index)
        })
        .collect();
    ranked.sort_unstable_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

    // Each tie run is anchored at its first (largest) percent.
    let mut start = 0;
    while start < ranked.len() {
        let head = ranked[start].0;
        let end = start
            + ranked[start..].iter().take_while(|(percent, _)| head - percent < PERCENT_TIE_EPSILON).count();
        ranked[start..end].sort_unstable_by_key(|&(_, index)| index);
        start = end;
    }

    ranked.into_iter().map(|(_, index)| index).collect()
}

/// First position in `items` for which `predicate` holds, or `items.len()`.
///
/// `predicate` must be monotonic over `items` (false...false, true...true).
pub fn binary_search_first<T, F>(items: &[T], mut predicate: F) -> usize
where
    F: FnMut(&T) -> bool,
{
    items.partition_point(|item| !predicate(item))
}
