use axum::Json;

use crate::models::api::StyleCategoryView;
use crate::services::catalog;

/// GET /api/v1/styles — the style catalog grouped by category.
pub async fn list_styles() -> Json<Vec<StyleCategoryView>> {
    Json(
        catalog::by_category()
            .into_iter()
            .map(|(category, styles)| StyleCategoryView {
                category: category.to_string(),
                styles,
            })
            .collect(),
    )
}
