//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use emporium_api::DashboardStats;
use tracing::{error, instrument};

use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::middleware::RequireAdmin;
use crate::models::Flash;
use crate::state::AppState;
use crate::views::{OrderRowView, ProductView};

/// Dashboard metrics.
#[derive(Debug, Clone)]
pub struct DashboardMetrics {
    pub orders: String,
    pub pending_orders: String,
    pub revenue: String,
    pub customers: String,
    pub products: String,
}

impl From<&DashboardStats> for DashboardMetrics {
    fn from(stats: &DashboardStats) -> Self {
        Self {
            orders: stats.total_orders.to_string(),
            pending_orders: stats.pending_orders.to_string(),
            revenue: stats.total_revenue.to_string(),
            customers: stats.total_users.to_string(),
            products: stats.total_products.to_string(),
        }
    }
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub metrics: DashboardMetrics,
    /// Most recent orders.
    pub orders: Vec<OrderRowView>,
    pub low_stock: Vec<ProductView>,
}

/// Dashboard page handler.
///
/// Backend failures other than auth render zeroed metrics with a toast.
#[instrument(skip_all, fields(user_id = %admin.user.id))]
pub async fn index(
    State(state): State<AppState>,
    admin: RequireAdmin,
    mut layout: Layout,
) -> Result<DashboardTemplate> {
    let stats = match state.api().session(&admin.tokens).admin_dashboard().await {
        Ok(stats) => stats,
        Err(e) if e.is_auth() => return Err(e.into()),
        Err(e) => {
            error!(error = %e, "failed to load dashboard stats");
            layout.toasts.push(Flash::error(e.user_message()));
            DashboardStats::default()
        }
    };

    Ok(DashboardTemplate {
        layout,
        metrics: DashboardMetrics::from(&stats),
        orders: stats.recent_orders.iter().map(OrderRowView::from).collect(),
        low_stock: stats.low_stock.iter().map(ProductView::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use emporium_core::Price;

    use super::*;

    #[test]
    fn test_metrics_format_revenue() {
        let stats = DashboardStats {
            total_orders: 4,
            total_revenue: Price::from_minor(123_456),
            ..DashboardStats::default()
        };
        let metrics = DashboardMetrics::from(&stats);
        assert_eq!(metrics.orders, "4");
        assert_eq!(metrics.revenue, Price::from_minor(123_456).to_string());
        assert_eq!(metrics.pending_orders, "0");
    }
}
