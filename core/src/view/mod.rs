//! Home page view model.
//!
//! Everything here is plain data derived from cache state, so a host can
//! render it with any UI toolkit or print it from a terminal.

pub mod carousel;
pub mod panel;
pub mod product_card;
pub mod storefront;

pub use carousel::Carousel;
pub use panel::{GuideView, Link, Panel, PanelView, TrainerCard, TrainersView};
pub use product_card::{CardAction, ProductCard, ProductSlot};
pub use storefront::{HomeView, MountToken, Storefront};

/// Viewport assumed when the host does not report one.
pub const DEFAULT_VIEWPORT_WIDTH: u64 = 1280;

/// UI-local state of the home page: which hero panel is shown and where
/// the product carousel is scrolled to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomePage {
    panel: Panel,
    carousel: Carousel,
}

impl Default for HomePage {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWPORT_WIDTH)
    }
}

impl HomePage {
    pub fn new(viewport_width: u64) -> Self {
        Self {
            panel: Panel::default(),
            carousel: Carousel::new(viewport_width),
        }
    }

    pub fn panel(&self) -> Panel {
        self.panel
    }

    pub fn select_panel(&mut self, panel: Panel) {
        self.panel = panel;
    }

    pub fn carousel(&self) -> &Carousel {
        &self.carousel
    }

    pub fn carousel_mut(&mut self) -> &mut Carousel {
        &mut self.carousel
    }

    pub fn scroll_left(&mut self) {
        self.carousel.scroll_left();
    }

    pub fn scroll_right(&mut self) {
        self.carousel.scroll_right();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_guide_panel() {
        let mut page = HomePage::default();
        assert_eq!(page.panel(), Panel::Guide);
        page.select_panel(Panel::Trainers);
        assert_eq!(page.panel(), Panel::Trainers);
        page.select_panel(Panel::Guide);
        assert_eq!(page.panel(), Panel::Guide);
    }

    #[test]
    fn scrolling_delegates_to_carousel() {
        let mut page = HomePage::new(632);
        page.carousel_mut().set_item_count(6);
        page.scroll_right();
        page.scroll_right();
        page.scroll_left();
        assert_eq!(page.carousel().offset(), carousel::SCROLL_STEP);
    }
}
