use serde::{Deserialize, Serialize};

/// Opaque ID types for readability
pub type MarkerId = String;
pub type CategoryId = String;

/// Longest identifier accepted from a client
pub const MAX_ID_LEN: usize = 128;

/// A point on the map in the image's simple CRS.
///
/// Serialized as `[lat, lng]`. Map widgets report click positions as
/// `{"lat": .., "lng": ..}`, so that form is accepted on input as well.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "CoordsRepr", into = "[f64; 2]")]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

impl Coords {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CoordsRepr {
    Pair([f64; 2]),
    LatLng { lat: f64, lng: f64 },
}

impl From<CoordsRepr> for Coords {
    fn from(repr: CoordsRepr) -> Self {
        match repr {
            CoordsRepr::Pair([lat, lng]) => Self { lat, lng },
            CoordsRepr::LatLng { lat, lng } => Self { lat, lng },
        }
    }
}

impl From<Coords> for [f64; 2] {
    fn from(coords: Coords) -> Self {
        [coords.lat, coords.lng]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Marker {
    /// Client-generated; blank means "assign one for me"
    #[serde(default)]
    pub id: MarkerId,
    pub coords: Coords,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "desc", alias = "description")]
    pub description: String,
    #[serde(default)]
    pub color: String,
}

/// A named, colored legend entry. Not linked to markers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    #[serde(default)]
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColorUpdate {
    pub marker_id: MarkerId,
    pub new_color: String,
}

/// Generate a fresh server-side identifier
pub fn new_id() -> String {
    ulid::Ulid::new().to_string()
}
