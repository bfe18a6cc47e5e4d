use crate::error::ViewRangeError;
use serde::{Deserialize, Serialize};

/// Drag-to-pan gesture in progress: `anchor` is where the drag started, `shift`
/// where the pointer is now
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reframe {
    pub anchor: f64,
    pub shift: f64,
}

/// Uncommitted changes staged during an interactive gesture. Every field is
/// optional; staging merges field by field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewRangeTimeUpdate {
    pub cursor: Option<f64>,
    pub reframe: Option<Reframe>,
    pub shift_start: Option<f64>,
    pub shift_end: Option<f64>,
}

impl ViewRangeTimeUpdate {
    pub fn cursor(position: f64) -> Self {
        Self {
            cursor: Some(position),
            ..Self::default()
        }
    }

    pub fn reframe(anchor: f64, shift: f64) -> Self {
        Self {
            reframe: Some(Reframe { anchor, shift }),
            ..Self::default()
        }
    }

    pub fn shift_start(position: f64) -> Self {
        Self {
            shift_start: Some(position),
            ..Self::default()
        }
    }

    pub fn shift_end(position: f64) -> Self {
        Self {
            shift_end: Some(position),
            ..Self::default()
        }
    }

    fn merge(&mut self, other: ViewRangeTimeUpdate) {
        if other.cursor.is_some() {
            self.cursor = other.cursor;
        }
        if other.reframe.is_some() {
            self.reframe = other.reframe;
        }
        if other.shift_start.is_some() {
            self.shift_start = other.shift_start;
        }
        if other.shift_end.is_some() {
            self.shift_end = other.shift_end;
        }
    }

    /// The range this update would commit, if it describes one
    pub fn preview(&self, current: (f64, f64)) -> Option<(f64, f64)> {
        if let Some(Reframe { anchor, shift }) = self.reframe {
            return Some((anchor.min(shift), anchor.max(shift)));
        }
        match (self.shift_start, self.shift_end) {
            (None, None) => None,
            (start, end) => {
                let start = start.unwrap_or(current.0);
                let end = end.unwrap_or(current.1);
                Some((start.min(end), start.max(end)))
            }
        }
    }
}

/// Visible time window over the trace.
///
/// Bounds are fractions of the trace duration: `0.0` is the trace start and
/// `1.0` its end. Values outside that interval are allowed and simply show an
/// empty region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewRange {
    pub current: (f64, f64),
    pub next: Option<ViewRangeTimeUpdate>,
}

impl Default for ViewRange {
    fn default() -> Self {
        Self {
            current: (0.0, 1.0),
            next: None,
        }
    }
}

impl ViewRange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a new window and drop any staged gesture
    pub fn update_view_range_time(
        &mut self,
        start: f64,
        end: f64,
        track_src: Option<&str>,
    ) -> Result<(), ViewRangeError> {
        if start.is_nan() || end.is_nan() {
            return Err(ViewRangeError::NotANumber);
        }
        if start > end {
            return Err(ViewRangeError::Inverted { start, end });
        }
        tracing::debug!(start, end, source = track_src.unwrap_or("-"), "view range committed");
        self.current = (start, end);
        self.next = None;
        Ok(())
    }

    /// Stage part of a gesture without committing it
    pub fn update_next_view_range_time(&mut self, update: ViewRangeTimeUpdate) {
        match self.next.as_mut() {
            Some(pending) => pending.merge(update),
            None => self.next = Some(update),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.next.is_some()
    }

    /// Range to draw as a dimmed overlay while a gesture is in progress
    pub fn preview(&self) -> Option<(f64, f64)> {
        self.next.and_then(|n| n.preview(self.current))
    }

    /// Drop a staged gesture without committing it
    pub fn discard_next(&mut self) {
        self.next = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Zoom around the window centre; `factor < 1.0` zooms in
    pub fn zoom(&mut self, factor: f64) -> Result<(), ViewRangeError> {
        let (start, end) = self.current;
        let centre = (start + end) / 2.0;
        let half = ((end - start) * factor / 2.0).max(f64::EPSILON);
        self.update_view_range_time(centre - half, centre + half, Some("zoom"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_clears_pending() {
        let mut range = ViewRange::new();
        range.update_next_view_range_time(ViewRangeTimeUpdate::shift_start(0.2));
        assert!(range.is_pending());

        range.update_view_range_time(0.2, 0.8, Some("minimap")).unwrap();
        assert_eq!(range.current, (0.2, 0.8));
        assert!(!range.is_pending());
    }

    #[test]
    fn staged_updates_merge_without_committing() {
        let mut range = ViewRange::new();
        range.update_next_view_range_time(ViewRangeTimeUpdate::cursor(0.4));
        range.update_next_view_range_time(ViewRangeTimeUpdate::reframe(0.6, 0.3));

        let next = range.next.unwrap();
        assert_eq!(next.cursor, Some(0.4));
        assert_eq!(next.reframe, Some(Reframe { anchor: 0.6, shift: 0.3 }));
        assert_eq!(range.current, (0.0, 1.0));
        assert_eq!(range.preview(), Some((0.3, 0.6)));
    }

    #[test]
    fn only_inverted_ranges_are_rejected() {
        let mut range = ViewRange::new();
        assert_eq!(
            range.update_view_range_time(0.9, 0.1, None),
            Err(ViewRangeError::Inverted { start: 0.9, end: 0.1 })
        );
        assert_eq!(range.current, (0.0, 1.0));

        // Beyond the trace is fine
        assert!(range.update_view_range_time(-0.5, 1.5, None).is_ok());
        assert!(range.update_view_range_time(0.3, 0.3, None).is_ok());
    }

    #[test]
    fn shift_preview_keeps_other_bound() {
        let mut range = ViewRange::new();
        range.update_view_range_time(0.2, 0.6, None).unwrap();
        range.update_next_view_range_time(ViewRangeTimeUpdate::shift_end(0.9));
        assert_eq!(range.preview(), Some((0.2, 0.9)));

        range.reset();
        assert_eq!(range, ViewRange::default());
    }

    #[test]
    fn discarded_gesture_leaves_committed_range() {
        let mut range = ViewRange::new();
        range.update_view_range_time(0.1, 0.5, None).unwrap();
        range.update_next_view_range_time(ViewRangeTimeUpdate::reframe(0.2, 0.3));
        range.discard_next();
        assert!(!range.is_pending());
        assert_eq!(range.current, (0.1, 0.5));
    }
}
