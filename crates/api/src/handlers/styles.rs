use axum::Json;
use serde::Serialize;
use studio_core::style::Style;

use crate::response::DataResponse;

#[derive(Debug, Serialize)]
pub struct StyleCatalog {
    pub styles: Vec<&'static str>,
    pub default: &'static str,
}

/// GET /api/v1/styles
pub async fn list_styles() -> Json<DataResponse<StyleCatalog>> {
    Json(DataResponse {
        data: StyleCatalog {
            styles: Style::ALL.iter().map(|s| s.name()).collect(),
            default: Style::default().name(),
        },
    })
}
