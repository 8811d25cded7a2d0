use crate::types::*;
use serde::{Deserialize, Serialize};

/// Requests a client may send. Frames look like `{"event": "addMarker", "data": {..}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    AddMarker(Marker),
    DeleteMarker(MarkerId),
    UpdateMarkerColor(ColorUpdate),
    AddCategory(Category),
    DeleteCategory(CategoryId),
}

/// Events pushed by the server, either to one connection or to all of them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Full marker list, sent on connect
    LoadMarkers(Vec<Marker>),
    /// Full category list, sent on connect
    LoadCategories(Vec<Category>),
    NewMarker(Marker),
    MarkerDeleted(MarkerId),
    MarkerColorUpdated(ColorUpdate),
    NewCategory(Category),
    DeleteCategory(CategoryId),
    /// Rejection of a request, sent to its originator only
    Error { code: String, msg: String },
}

impl ServerEvent {
    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerEvent::Error {
            code: code.to_string(),
            msg: msg.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} must not be blank")]
    Blank(&'static str),

    #[error("{field} is longer than {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("coordinates must be finite numbers")]
    NonFiniteCoords,
}

impl ClientEvent {
    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::AddMarker(_) => "addMarker",
            ClientEvent::DeleteMarker(_) => "deleteMarker",
            ClientEvent::UpdateMarkerColor(_) => "updateMarkerColor",
            ClientEvent::AddCategory(_) => "addCategory",
            ClientEvent::DeleteCategory(_) => "deleteCategory",
        }
    }

    /// Boundary checks run before anything touches the store.
    ///
    /// Ids on add requests may be blank (the server assigns one); ids on
    /// delete and update requests may not.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ClientEvent::AddMarker(marker) => {
                check_len("id", &marker.id)?;
                if !marker.coords.is_finite() {
                    return Err(ValidationError::NonFiniteCoords);
                }
                check_present("color", &marker.color)
            }
            ClientEvent::DeleteMarker(id) | ClientEvent::DeleteCategory(id) => {
                check_present("id", id)?;
                check_len("id", id)
            }
            ClientEvent::UpdateMarkerColor(update) => {
                check_present("markerId", &update.marker_id)?;
                check_len("markerId", &update.marker_id)?;
                check_present("newColor", &update.new_color)
            }
            ClientEvent::AddCategory(category) => {
                check_len("id", &category.id)?;
                check_present("name", &category.name)?;
                check_present("color", &category.color)
            }
        }
    }
}

fn check_present(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Blank(field))
    } else {
        Ok(())
    }
}

fn check_len(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.chars().count() > MAX_ID_LEN {
        Err(ValidationError::TooLong {
            field,
            max: MAX_ID_LEN,
        })
    } else {
        Ok(())
    }
}
