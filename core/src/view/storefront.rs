//! Home page controller: reads through the query cache, renders snapshots
//! and runs the add-to-cart mutation.
//!
//! # Design
//! `Storefront` owns a `MountToken`. Once `unmount` is called, every read
//! and mutation fails fast with `ApiError::Cancelled` before touching the
//! network, and a mutation that was already in flight still invalidates the
//! cache but drops its notification.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::mutation::AddToCartMutation;
use crate::notify::{Notification, NotificationCenter, Notifier};
use crate::query::{QueryCache, QueryKey, QueryState};
use crate::types::{Product, ProductCatalog, Trainer, User};
use crate::view::panel::{GuideView, Panel, PanelView, TrainersView};
use crate::view::product_card::{ProductCard, ProductSlot};
use crate::view::HomePage;

/// Placeholders shown while the first product load runs.
pub const SKELETON_SLOTS: usize = 4;

/// Shared flag tripped when the owning view goes away.
#[derive(Debug, Clone)]
pub struct MountToken(Arc<AtomicBool>);

impl Default for MountToken {
    fn default() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }
}

impl MountToken {
    pub fn is_mounted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn unmount(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn check(&self) -> Result<(), ApiError> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(ApiError::Cancelled)
        }
    }
}

/// Forwards notifications only while the view is mounted.
struct MountedNotifier<'a> {
    inner: &'a dyn Notifier,
    mount: &'a MountToken,
}

impl Notifier for MountedNotifier<'_> {
    fn notify(&self, notification: Notification) {
        if self.mount.is_mounted() {
            self.inner.notify(notification);
        } else {
            debug!(message = %notification.message, "view unmounted, notification dropped");
        }
    }
}

/// Everything the home page shows, rendered from cache state.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeView {
    pub panel: PanelView,
    pub products: Vec<ProductSlot>,
    pub visible: std::ops::Range<usize>,
    pub can_scroll_left: bool,
    pub can_scroll_right: bool,
}

pub struct Storefront {
    api: Arc<ApiClient>,
    cache: Arc<QueryCache>,
    notifications: Arc<NotificationCenter>,
    mount: MountToken,
}

impl Storefront {
    pub fn new(api: Arc<ApiClient>, cache: Arc<QueryCache>) -> Self {
        Self::with_notifications(api, cache, Arc::new(NotificationCenter::default()))
    }

    pub fn with_notifications(
        api: Arc<ApiClient>,
        cache: Arc<QueryCache>,
        notifications: Arc<NotificationCenter>,
    ) -> Self {
        Self {
            api,
            cache,
            notifications,
            mount: MountToken::default(),
        }
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn mount_token(&self) -> MountToken {
        self.mount.clone()
    }

    pub fn unmount(&self) {
        self.mount.unmount();
    }

    pub fn trainers(&self) -> Result<Arc<Vec<Trainer>>, ApiError> {
        self.mount.check()?;
        self.cache.fetch(&QueryKey::TRAINERS, || {
            self.mount.check()?;
            self.api.get_all_trainers()
        })
    }

    pub fn current_user(&self) -> Result<Arc<Option<User>>, ApiError> {
        self.mount.check()?;
        self.cache.fetch(&QueryKey::CURRENT_USER, || {
            self.mount.check()?;
            self.api.get_current_user()
        })
    }

    pub fn products(&self) -> Result<Arc<ProductCatalog>, ApiError> {
        self.mount.check()?;
        self.cache.fetch(&QueryKey::ALL_PRODUCTS, || {
            self.mount.check()?;
            self.api.get_all_products()
        })
    }

    /// Load all three queries. A failing query is logged and leaves its
    /// section empty; only cancellation is reported.
    pub fn refresh(&self) -> Result<(), ApiError> {
        self.mount.check()?;
        degrade("trainers", self.trainers())?;
        degrade("current user", self.current_user())?;
        degrade("products", self.products())?;
        Ok(())
    }

    /// Render `page` from whatever the cache holds right now. Never blocks
    /// on the network; updates the carousel's item count.
    pub fn snapshot(&self, page: &mut HomePage) -> HomeView {
        let user = self
            .cache
            .peek::<Option<User>>(&QueryKey::CURRENT_USER)
            .value()
            .and_then(|user| (**user).clone());

        let panel = match page.panel() {
            Panel::Guide => PanelView::Guide(GuideView::new(user.as_ref())),
            Panel::Trainers => {
                let trainers = self.cache.peek::<Vec<Trainer>>(&QueryKey::TRAINERS);
                let trainers = trainers.value().map(|t| t.as_slice()).unwrap_or_default();
                PanelView::Trainers(TrainersView::new(trainers))
            }
        };

        let products = match self.cache.peek::<ProductCatalog>(&QueryKey::ALL_PRODUCTS) {
            QueryState::Loading => vec![ProductSlot::Skeleton; SKELETON_SLOTS],
            state => state
                .value()
                .map(|catalog| {
                    catalog
                        .special_products
                        .iter()
                        .map(|product| ProductSlot::Card(ProductCard::new(product, user.as_ref())))
                        .collect()
                })
                .unwrap_or_default(),
        };

        page.carousel_mut().set_item_count(products.len());
        let carousel = page.carousel();
        HomeView {
            panel,
            products,
            visible: carousel.visible_range(),
            can_scroll_left: carousel.can_scroll_left(),
            can_scroll_right: carousel.can_scroll_right(),
        }
    }

    /// Add `product` to the signed-in user's cart. One request per call.
    pub fn add_to_cart(&self, product: &Product) -> Result<Option<Notification>, ApiError> {
        self.mount.check()?;
        let notifier = MountedNotifier {
            inner: self.notifications.as_ref(),
            mount: &self.mount,
        };
        AddToCartMutation::new(&self.api, &self.cache, &notifier).run(product)
    }
}

fn degrade<T>(what: &str, result: Result<T, ApiError>) -> Result<(), ApiError> {
    match result {
        Ok(_) => Ok(()),
        Err(ApiError::Cancelled) => Err(ApiError::Cancelled),
        Err(e) => {
            warn!(query = what, error = %e, "query failed, section left empty");
            Ok(())
        }
    }
}
