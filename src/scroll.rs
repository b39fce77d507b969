/// How close to the bottom (in rows) still counts as "at the bottom".
/// Absorbs the row or two of drift that wrapping changes can introduce.
const TOLERANCE: u16 = 5;

/// Keeps the chat view glued to the newest message unless the user has
/// scrolled away on purpose.
///
/// Whether the view was at the bottom is captured *before* the conversation
/// changes (`note_mutation`), because appending content moves the bottom out
/// from under the old offset. The decision is then applied with fresh
/// geometry at the next render (`begin_frame`).
#[derive(Debug)]
pub struct ScrollAnchor {
    offset: u16,
    viewport: u16,
    content: u16,
    pinned: bool,
}

impl ScrollAnchor {
    pub fn new() -> Self {
        Self {
            offset: 0,
            viewport: 0,
            content: 0,
            pinned: true,
        }
    }

    fn at_bottom(&self) -> bool {
        self.offset + self.viewport + TOLERANCE >= self.content
    }

    /// Call before mutating the conversation. Records whether the view is
    /// currently at the bottom so `begin_frame` knows whether to follow.
    pub fn note_mutation(&mut self) {
        self.pinned = self.at_bottom();
    }

    /// Call once per render with the current geometry. Returns the vertical
    /// offset to draw with: snapped to the bottom when pinned, otherwise the
    /// previous offset clamped into range.
    pub fn begin_frame(&mut self, content: u16, viewport: u16) -> u16 {
        self.content = content;
        self.viewport = viewport;
        let max_offset = content.saturating_sub(viewport);
        if self.pinned {
            self.offset = max_offset;
        } else {
            self.offset = self.offset.min(max_offset);
        }
        self.offset
    }

    pub fn scroll_up(&mut self, rows: u16) {
        self.offset = self.offset.saturating_sub(rows);
        self.pinned = self.at_bottom();
    }

    pub fn scroll_down(&mut self, rows: u16) {
        let max_offset = self.content.saturating_sub(self.viewport);
        self.offset = self.offset.saturating_add(rows).min(max_offset);
        self.pinned = self.at_bottom();
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.viewport.max(1));
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.viewport.max(1));
    }
}

impl Default for ScrollAnchor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_pinned_to_the_bottom() {
        let mut anchor = ScrollAnchor::new();
        assert_eq!(anchor.begin_frame(50, 10), 40);
    }

    #[test]
    fn follows_appends_while_at_the_bottom() {
        let mut anchor = ScrollAnchor::new();
        anchor.begin_frame(50, 10);

        anchor.note_mutation();
        assert_eq!(anchor.begin_frame(60, 10), 50);
    }

    #[test]
    fn stays_put_when_scrolled_away() {
        let mut anchor = ScrollAnchor::new();
        anchor.begin_frame(50, 10);
        anchor.scroll_up(20);

        anchor.note_mutation();
        assert_eq!(anchor.begin_frame(60, 10), 20);
    }

    #[test]
    fn drift_within_tolerance_still_pins() {
        let mut anchor = ScrollAnchor::new();
        anchor.begin_frame(50, 10);
        anchor.scroll_up(3);

        anchor.note_mutation();
        assert_eq!(anchor.begin_frame(60, 10), 50);
    }

    #[test]
    fn scrolling_back_down_re_engages_the_pin() {
        let mut anchor = ScrollAnchor::new();
        anchor.begin_frame(50, 10);
        anchor.scroll_up(20);
        anchor.scroll_down(20);

        anchor.note_mutation();
        assert_eq!(anchor.begin_frame(60, 10), 50);
    }

    #[test]
    fn clamps_when_content_shrinks() {
        let mut anchor = ScrollAnchor::new();
        anchor.begin_frame(50, 10);
        anchor.scroll_up(20);

        assert_eq!(anchor.begin_frame(15, 10), 5);
    }

    #[test]
    fn short_content_never_scrolls() {
        let mut anchor = ScrollAnchor::new();
        assert_eq!(anchor.begin_frame(5, 10), 0);
        anchor.scroll_down(3);
        assert_eq!(anchor.begin_frame(5, 10), 0);
    }

    #[test]
    fn page_movement_uses_the_viewport_height() {
        let mut anchor = ScrollAnchor::new();
        anchor.begin_frame(50, 10);
        anchor.page_up();
        assert_eq!(anchor.begin_frame(50, 10), 30);
        anchor.page_down();
        assert_eq!(anchor.begin_frame(50, 10), 40);
    }
}
