//! Horizontal product carousel: scroll offset and visible window.

use std::ops::Range;

pub const CARD_WIDTH: u64 = 300;
pub const CARD_GAP: u64 = 16;
pub const TRACK_PADDING: u64 = 16;
/// Distance moved by one scroll button press.
pub const SCROLL_STEP: u64 = 290;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Carousel {
    offset: u64,
    viewport_width: u64,
    item_count: usize,
}

impl Carousel {
    pub fn new(viewport_width: u64) -> Self {
        Self {
            offset: 0,
            viewport_width,
            item_count: 0,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn set_item_count(&mut self, item_count: usize) {
        self.item_count = item_count;
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn set_viewport_width(&mut self, viewport_width: u64) {
        self.viewport_width = viewport_width;
        self.offset = self.offset.min(self.max_offset());
    }

    /// Full scrollable width of the track.
    pub fn content_width(&self) -> u64 {
        match self.item_count as u64 {
            0 => 0,
            n => 2 * TRACK_PADDING + n * CARD_WIDTH + (n - 1) * CARD_GAP,
        }
    }

    pub fn max_offset(&self) -> u64 {
        self.content_width().saturating_sub(self.viewport_width)
    }

    pub fn scroll_left(&mut self) {
        self.offset = self.offset.saturating_sub(SCROLL_STEP);
    }

    pub fn scroll_right(&mut self) {
        self.offset = (self.offset + SCROLL_STEP).min(self.max_offset());
    }

    pub fn can_scroll_left(&self) -> bool {
        self.offset > 0
    }

    pub fn can_scroll_right(&self) -> bool {
        self.offset < self.max_offset()
    }

    /// Indices of the cards that intersect the viewport.
    pub fn visible_range(&self) -> Range<usize> {
        let window_end = self.offset + self.viewport_width;
        let mut first = None;
        let mut end = 0;
        for index in 0..self.item_count {
            let start = TRACK_PADDING + index as u64 * (CARD_WIDTH + CARD_GAP);
            let stop = start + CARD_WIDTH;
            if stop > self.offset && start < window_end {
                first.get_or_insert(index);
                end = index + 1;
            }
        }
        match first {
            Some(first) => first..end,
            None => 0..0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_carousel_never_moves() {
        let mut carousel = Carousel::new(800);
        carousel.scroll_right();
        carousel.scroll_left();
        carousel.scroll_left();
        assert_eq!(carousel.offset(), 0);
        assert_eq!(carousel.visible_range(), 0..0);
        assert!(!carousel.can_scroll_right());
    }

    #[test]
    fn scroll_moves_by_fixed_step_and_clamps() {
        let mut carousel = Carousel::new(632);
        carousel.set_item_count(6);
        // 2*16 + 6*300 + 5*16 = 1912, so max offset is 1280.
        assert_eq!(carousel.max_offset(), 1280);
        carousel.scroll_right();
        assert_eq!(carousel.offset(), 290);
        carousel.scroll_right();
        assert_eq!(carousel.offset(), 580);
        for _ in 0..10 {
            carousel.scroll_right();
        }
        assert_eq!(carousel.offset(), 1280);
        carousel.scroll_left();
        assert_eq!(carousel.offset(), 990);
    }

    #[test]
    fn shrinking_item_count_clamps_offset() {
        let mut carousel = Carousel::new(632);
        carousel.set_item_count(6);
        carousel.scroll_right();
        carousel.scroll_right();
        carousel.set_item_count(2);
        assert_eq!(carousel.offset(), 16);
        carousel.set_viewport_width(1000);
        assert_eq!(carousel.offset(), 0);
        assert!(!carousel.can_scroll_left());
    }

    #[test]
    fn visible_range_tracks_offset() {
        let mut carousel = Carousel::new(632);
        carousel.set_item_count(6);
        assert_eq!(carousel.visible_range(), 0..2);
        carousel.scroll_right();
        assert_eq!(carousel.visible_range(), 0..3);
        carousel.scroll_right();
        assert_eq!(carousel.visible_range(), 1..4);
    }
}
