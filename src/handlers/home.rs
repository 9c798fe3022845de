use crate::models::{ApiResponse, Item, NavLink};
use axum::Json;

pub fn nav_links() -> Vec<NavLink> {
    [
        ("🚪 Backdoor", "/"),
        ("🎨 List Item", "/listitem"),
        ("💙 Favourites", "/favourites"),
    ]
    .into_iter()
    .map(|(label, href)| NavLink {
        label: label.to_string(),
        href: href.to_string(),
    })
    .collect()
}

pub async fn home() -> Json<ApiResponse<Vec<NavLink>>> {
    Json(ApiResponse::ok(nav_links()))
}

// No favourites API exists yet.
pub async fn favourites() -> Json<ApiResponse<Vec<Item>>> {
    Json(ApiResponse::ok(Vec::new()))
}
