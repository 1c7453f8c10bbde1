//! Gallery Top-Five Cascade
//!
//! Mutations touching top-five membership or ordering keep the order values
//! dense (1..K, no gaps) and then rebuild the promotional hero slides from
//! scratch: hero slides are derived records, so a full replace avoids drift
//! between the gallery and the slides at the cost of discarding any direct
//! edits to previously generated slides.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::model::{GalleryItem, HeroSlide, OrderUpdate};
use crate::store::{Store, Stored};

/// Subtitle applied to every generated slide.
const SLIDE_SUBTITLE: &str = "Sports Academy";
/// Description used when a gallery item has none.
const SLIDE_DESCRIPTION_FALLBACK: &str = "Join us for exciting sports activities";
const SLIDE_CTA_TEXT: &str = "Learn More";
const SLIDE_CTA_LINK: &str = "#activities";

impl Store {
    /// Gallery items currently in the top-five set, ascending by order.
    pub async fn top_five(&self) -> Vec<Stored<GalleryItem>> {
        let mut items: Vec<Stored<GalleryItem>> = self
            .gallery
            .list()
            .await
            .into_iter()
            .filter(|item| item.data.is_top_five)
            .collect();
        items.sort_by_key(|item| item.data.top_five_order);
        items
    }

    /// Flip an item's top-five membership.
    ///
    /// Joining appends at order K+1; leaving renumbers every greater order
    /// down by one and resets the item's own order to 0.
    pub async fn toggle_top_five(&self, id: &str) -> Result<Stored<GalleryItem>> {
        let toggled = self
            .gallery
            .modify(|docs| -> Result<Stored<GalleryItem>> {
                let mut item = docs
                    .remove(id)
                    .ok_or_else(|| Error::NotFound("gallery item not found".to_string()))?;

                if item.data.is_top_five {
                    let removed_order = item.data.top_five_order;
                    for other in docs.values_mut() {
                        if other.data.is_top_five && other.data.top_five_order > removed_order {
                            other.data.top_five_order -= 1;
                            other.updated_at = Utc::now();
                        }
                    }
                    item.data.is_top_five = false;
                    item.data.top_five_order = 0;
                } else {
                    let count = docs.values().filter(|d| d.data.is_top_five).count() as u32;
                    item.data.is_top_five = true;
                    item.data.top_five_order = count + 1;
                }

                item.updated_at = Utc::now();
                docs.insert(id.to_string(), item.clone());
                Ok(item)
            })
            .await?;

        self.rebuild_hero_slides().await;
        Ok(toggled)
    }

    /// Apply a client-supplied ordering to the top-five set. Unknown ids are
    /// ignored rather than failing the whole request.
    pub async fn reorder_gallery(&self, updates: &[OrderUpdate]) -> Result<()> {
        self.gallery
            .modify(|docs| {
                for update in updates {
                    if let Some(item) = docs.get_mut(update.id.as_str()) {
                        item.data.top_five_order = update.order;
                        item.updated_at = Utc::now();
                    }
                }
            })
            .await;

        self.rebuild_hero_slides().await;
        Ok(())
    }

    /// Remove a gallery item. Deleting a top-five member closes the gap in
    /// the remaining orders before the slides are rebuilt.
    pub async fn delete_gallery_item(&self, id: &str) -> Result<Stored<GalleryItem>> {
        let removed = self
            .gallery
            .modify(|docs| -> Result<Stored<GalleryItem>> {
                let item = docs
                    .remove(id)
                    .ok_or_else(|| Error::NotFound("gallery item not found".to_string()))?;

                if item.data.is_top_five {
                    for other in docs.values_mut() {
                        if other.data.is_top_five
                            && other.data.top_five_order > item.data.top_five_order
                        {
                            other.data.top_five_order -= 1;
                            other.updated_at = Utc::now();
                        }
                    }
                }
                Ok(item)
            })
            .await?;

        self.rebuild_hero_slides().await;
        Ok(removed)
    }

    /// Regenerate the hero slides from the current top-five set.
    pub(crate) async fn rebuild_hero_slides(&self) {
        let top = self.top_five().await;
        self.hero_slides.clear().await;
        for item in top {
            self.hero_slides
                .insert(HeroSlide {
                    title: item.data.title,
                    subtitle: SLIDE_SUBTITLE.to_string(),
                    description: item
                        .data
                        .description
                        .unwrap_or_else(|| SLIDE_DESCRIPTION_FALLBACK.to_string()),
                    background_image: item.data.image_url,
                    cta_text: SLIDE_CTA_TEXT.to_string(),
                    cta_link: SLIDE_CTA_LINK.to_string(),
                    redirect_url: String::new(),
                    open_new_tab: false,
                })
                .await;
        }
    }
}
