use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// The authenticated user attached to the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
}

impl From<User> for Principal {
    fn from(u: User) -> Self {
        Self { id: u.id, username: u.username }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageRef {
    pub url: String,
    /// Storage key, used to remove the image later.
    pub filename: String,
}

impl ImageRef {
    /// 200px wide variant for hosted images; other URLs are returned unchanged.
    pub fn thumbnail(&self) -> String {
        if self.url.contains("/upload/") {
            self.url.replacen("/upload/", "/upload/w_200/", 1)
        } else {
            self.url.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Campground {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    pub geometry: Option<GeoPoint>,
    pub images: Vec<ImageRef>,
    pub author_id: Option<Uuid>,
}

impl Campground {
    pub fn path(&self) -> String {
        campground_path(self.id)
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.author_id == Some(user_id)
    }
}

pub fn campground_path(id: Uuid) -> String {
    format!("/campgrounds/{}", id)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: Uuid,
    pub campground_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub rating: i64,
}

/// A review joined with its author's username for display.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub review: Review,
    pub author: String,
}

/// Everything the show page needs.
#[derive(Debug, Clone, Serialize)]
pub struct CampgroundDetail {
    pub campground: Campground,
    pub author: Option<User>,
    pub reviews: Vec<ReviewView>,
}

/// Validated campground form, ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct CampgroundInput {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    /// Linked image URLs.
    pub images: Vec<String>,
    /// Files already written by the image store.
    pub uploaded: Vec<ImageRef>,
    pub delete_images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewInput {
    pub body: String,
    pub rating: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}
