//! Client-side mirror of the server's markers and categories.
//!
//! A [`Reconciler`] applies pushed [`ServerEvent`]s to its own copy of the
//! data and to a [`VisualLayer`], the seam to whatever actually draws the map.

use std::collections::HashMap;

use crate::protocol::ServerEvent;
use crate::types::{Category, Marker, MarkerId};

/// What the reconciler needs from the map widget.
pub trait VisualLayer {
    /// Whatever the widget hands back for a drawn marker
    type Handle;

    fn draw_marker(&mut self, marker: &Marker) -> Self::Handle;

    fn erase_marker(&mut self, handle: Self::Handle);

    fn recolor_marker(&mut self, handle: &mut Self::Handle, color: &str);

    /// Redraw the legend from scratch
    fn render_legend(&mut self, categories: &[Category]);
}

/// Headless layer: keeps the mirror without drawing anything
impl VisualLayer for () {
    type Handle = ();

    fn draw_marker(&mut self, _marker: &Marker) -> Self::Handle {}

    fn erase_marker(&mut self, _handle: ()) {}

    fn recolor_marker(&mut self, _handle: &mut (), _color: &str) {}

    fn render_legend(&mut self, _categories: &[Category]) {}
}

/// Local id for a record that arrived without one. Never sent back.
pub fn fallback_id() -> String {
    format!(
        "{}{}",
        chrono::Utc::now().timestamp_millis(),
        rand::random::<u32>()
    )
}

fn with_local_id(mut category: Category) -> Category {
    if category.id.is_empty() {
        category.id = fallback_id();
    }
    category
}

pub struct Reconciler<V: VisualLayer> {
    layer: V,
    markers: HashMap<MarkerId, (V::Handle, Marker)>,
    categories: Vec<Category>,
}

impl<V: VisualLayer> Reconciler<V> {
    pub fn new(layer: V) -> Self {
        Self {
            layer,
            markers: HashMap::new(),
            categories: Vec::new(),
        }
    }

    /// Apply one pushed event. Events addressed at unknown ids are ignored.
    pub fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::LoadMarkers(markers) => {
                for (_, (handle, _)) in self.markers.drain() {
                    self.layer.erase_marker(handle);
                }
                for marker in markers {
                    self.add_marker(marker);
                }
            }
            ServerEvent::LoadCategories(categories) => {
                self.categories = categories.into_iter().map(with_local_id).collect();
                self.layer.render_legend(&self.categories);
            }
            ServerEvent::NewMarker(marker) => self.add_marker(marker),
            ServerEvent::MarkerDeleted(id) => {
                if let Some((handle, _)) = self.markers.remove(&id) {
                    self.layer.erase_marker(handle);
                }
            }
            ServerEvent::MarkerColorUpdated(update) => {
                if let Some((handle, marker)) = self.markers.get_mut(&update.marker_id) {
                    self.layer.recolor_marker(handle, &update.new_color);
                    marker.color = update.new_color;
                }
            }
            ServerEvent::NewCategory(category) => {
                let category = with_local_id(category);
                self.categories.retain(|c| c.id != category.id);
                self.categories.push(category);
                self.layer.render_legend(&self.categories);
            }
            ServerEvent::DeleteCategory(id) => {
                self.categories.retain(|c| c.id != id);
                self.layer.render_legend(&self.categories);
            }
            ServerEvent::Error { code, msg } => {
                tracing::warn!("Server rejected a request: {} {}", code, msg);
            }
        }
    }

    fn add_marker(&mut self, mut marker: Marker) {
        if marker.id.is_empty() {
            marker.id = fallback_id();
        }
        let handle = self.layer.draw_marker(&marker);
        if let Some((old, _)) = self.markers.insert(marker.id.clone(), (handle, marker)) {
            self.layer.erase_marker(old);
        }
    }

    pub fn marker(&self, id: &str) -> Option<&Marker> {
        self.markers.get(id).map(|(_, marker)| marker)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values().map(|(_, marker)| marker)
    }

    /// Legend entries in the order they were received
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn layer(&self) -> &V {
        &self.layer
    }
}
