//! Product management route handlers.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use emporium_api::{ApiError, ProductInput};
use emporium_core::{BrandId, Page, Product, ProductId};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info, instrument};

use super::{ToastsTemplate, is_htmx};
use crate::error::{AppError, Result};
use crate::filters;
use crate::layout::Layout;
use crate::middleware::{RequireAdmin, debounce_key, push_flash};
use crate::models::Flash;
use crate::state::AppState;
use crate::views::{Pagination, ProductView, SelectOption, page_number};

/// Rows per page; the backend's page size.
const PAGE_SIZE: u64 = 20;

/// Search and pagination query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub search: Option<String>,
    pub page: Option<String>,
}

impl ProductsQuery {
    fn term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Create/edit form fields, kept as typed text so a rejected form re-renders
/// exactly as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub discount_price: String,
    pub stock: String,
    pub category: String,
    pub brand_id: String,
    /// One image URL per line.
    pub images: String,
    pub is_active: Option<String>,
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.amount().to_string(),
            discount_price: product
                .discount_price
                .map(|p| p.amount().to_string())
                .unwrap_or_default(),
            stock: product.stock.to_string(),
            category: product.category.clone(),
            brand_id: product
                .brand
                .as_ref()
                .map(|b| b.id.to_string())
                .unwrap_or_default(),
            images: product.images.join("\n"),
            is_active: product.is_active.then(|| "on".to_string()),
        }
    }
}

impl ProductForm {
    /// Validate and convert to the backend body.
    ///
    /// # Errors
    ///
    /// Returns a message suitable for a toast.
    pub fn to_input(&self) -> std::result::Result<ProductInput, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Name is required".to_string());
        }

        let price = parse_amount(&self.price).ok_or("Price must be a number")?;
        if price <= Decimal::ZERO {
            return Err("Price must be greater than zero".to_string());
        }

        let discount_price = match self.discount_price.trim() {
            "" => None,
            raw => {
                let discount = parse_amount(raw).ok_or("Discount price must be a number")?;
                if discount <= Decimal::ZERO || discount >= price {
                    return Err("Discount price must be between zero and the price".to_string());
                }
                Some(discount)
            }
        };

        let stock = self
            .stock
            .trim()
            .parse::<i64>()
            .map_err(|_| "Stock must be a whole number".to_string())?;
        if stock < 0 {
            return Err("Stock cannot be negative".to_string());
        }

        let brand_id = match self.brand_id.trim() {
            "" => None,
            raw => Some(BrandId::from_str(raw).map_err(|_| "Unknown brand".to_string())?),
        };

        Ok(ProductInput {
            name: name.to_string(),
            description: self.description.trim().to_string(),
            price,
            discount_price,
            stock,
            category: self.category.trim().to_string(),
            brand_id,
            images: self
                .images
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
            is_active: self.is_active.is_some(),
        })
    }
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}

/// Products list page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub search: String,
    pub products: Vec<ProductView>,
    pub pagination: Pagination,
}

/// Products table fragment (HTMX search).
#[derive(Template, WebTemplate)]
#[template(path = "fragments/products_table.html")]
pub struct ProductsTableTemplate {
    pub products: Vec<ProductView>,
    pub pagination: Pagination,
}

/// Create/edit form page.
#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub layout: Layout,
    pub heading: String,
    pub action: String,
    pub form: ProductForm,
    pub brands: Vec<SelectOption>,
}

fn table(
    page: &Page<Product>,
    search: Option<&str>,
    page_no: u32,
) -> (Vec<ProductView>, Pagination) {
    let base = search.map_or_else(
        || "/products".to_string(),
        |term| {
            let term: String = url::form_urlencoded::byte_serialize(term.as_bytes()).collect();
            format!("/products?search={term}")
        },
    );
    (
        page.results.iter().map(ProductView::from).collect(),
        Pagination::new(
            &base,
            page_no,
            page.has_previous(),
            page.has_next(),
            page.total_pages(PAGE_SIZE),
        ),
    )
}

/// Products list page handler.
#[instrument(skip(state, admin, layout))]
pub async fn index(
    State(state): State<AppState>,
    admin: RequireAdmin,
    mut layout: Layout,
    Query(query): Query<ProductsQuery>,
) -> Result<ProductsIndexTemplate> {
    let page_no = page_number(query.page.as_deref());
    let page = match state
        .api()
        .session(&admin.tokens)
        .admin_products(query.term(), page_no)
        .await
    {
        Ok(page) => page,
        Err(e) if e.is_auth() => return Err(e.into()),
        Err(e) => {
            error!(error = %e, "failed to fetch products");
            layout.toasts.push(Flash::error(e.user_message()));
            Page::default()
        }
    };

    let (products, pagination) = table(&page, query.term(), page_no);
    Ok(ProductsIndexTemplate {
        search: query.term().unwrap_or_default().to_string(),
        layout,
        products,
        pagination,
    })
}

/// Debounced search results (HTMX). A superseded keystroke gets 204.
#[instrument(skip(state, admin))]
pub async fn search(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Query(query): Query<ProductsQuery>,
) -> Result<Response> {
    let key = format!("{}:products", debounce_key(admin.tokens.session()).await);
    let page_no = page_number(query.page.as_deref());
    let api = state.api().session(&admin.tokens);

    let Some(result) = state
        .debouncer()
        .run(key, api.admin_products(query.term(), page_no))
        .await
    else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let (products, pagination) = table(&result?, query.term(), page_no);
    Ok(ProductsTableTemplate {
        products,
        pagination,
    }
    .into_response())
}

async fn brand_options(
    state: &AppState,
    admin: &RequireAdmin,
    selected: &str,
) -> Vec<SelectOption> {
    match state.api().session(&admin.tokens).admin_brands().await {
        Ok(brands) => brands
            .into_iter()
            .map(|brand| SelectOption {
                selected: brand.id.to_string() == selected,
                value: brand.id.to_string(),
                label: brand.name,
            })
            .collect(),
        Err(e) => {
            error!(error = %e, "failed to load brands for product form");
            Vec::new()
        }
    }
}

async fn render_form(
    state: &AppState,
    admin: &RequireAdmin,
    mut layout: Layout,
    heading: &str,
    action: String,
    form: ProductForm,
    error: Option<String>,
) -> ProductFormTemplate {
    if let Some(message) = error {
        layout.toasts.push(Flash::error(message));
    }
    ProductFormTemplate {
        brands: brand_options(state, admin, &form.brand_id).await,
        layout,
        heading: heading.to_string(),
        action,
        form,
    }
}

/// New product form.
#[instrument(skip_all)]
pub async fn new(
    State(state): State<AppState>,
    admin: RequireAdmin,
    layout: Layout,
) -> ProductFormTemplate {
    let form = ProductForm {
        stock: "0".to_string(),
        is_active: Some("on".to_string()),
        ..ProductForm::default()
    };
    render_form(&state, &admin, layout, "New product", "/products".to_string(), form, None).await
}

/// Create a product.
#[instrument(skip_all, fields(name = %form.name))]
pub async fn create(
    State(state): State<AppState>,
    admin: RequireAdmin,
    layout: Layout,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let action = "/products".to_string();
    let input = match form.to_input() {
        Ok(input) => input,
        Err(message) => {
            return Ok(render_form(&state, &admin, layout, "New product", action, form, Some(message))
                .await
                .into_response());
        }
    };

    match state
        .api()
        .session(&admin.tokens)
        .admin_create_product(&input)
        .await
    {
        Ok(product) => {
            push_flash(
                admin.tokens.session(),
                Flash::success(format!("Created {}", product.name)),
            )
            .await;
            Ok(Redirect::to("/products").into_response())
        }
        Err(e) if e.is_auth() => Err(e.into()),
        Err(e) => Ok(
            render_form(&state, &admin, layout, "New product", action, form, Some(e.user_message()))
                .await
                .into_response(),
        ),
    }
}

/// Edit product form.
#[instrument(skip(state, admin, layout))]
pub async fn edit(
    State(state): State<AppState>,
    admin: RequireAdmin,
    layout: Layout,
    Path(id): Path<ProductId>,
) -> Result<ProductFormTemplate> {
    let product = state.api().session(&admin.tokens).admin_product(id).await?;
    Ok(render_form(
        &state,
        &admin,
        layout,
        &format!("Edit {}", product.name),
        format!("/products/{id}"),
        ProductForm::from(&product),
        None,
    )
    .await)
}

/// Update a product.
#[instrument(skip(state, admin, layout, form))]
pub async fn update(
    State(state): State<AppState>,
    admin: RequireAdmin,
    layout: Layout,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let action = format!("/products/{id}");
    let heading = format!("Edit {}", form.name.trim());
    let input = match form.to_input() {
        Ok(input) => input,
        Err(message) => {
            return Ok(render_form(&state, &admin, layout, &heading, action, form, Some(message))
                .await
                .into_response());
        }
    };

    match state
        .api()
        .session(&admin.tokens)
        .admin_update_product(id, &input)
        .await
    {
        Ok(product) => {
            info!(product_id = %id, "product updated");
            push_flash(
                admin.tokens.session(),
                Flash::success(format!("Saved {}", product.name)),
            )
            .await;
            Ok(Redirect::to("/products").into_response())
        }
        Err(e @ ApiError::NotFound(_)) => Err(AppError::Api(e)),
        Err(e) if e.is_auth() => Err(e.into()),
        Err(e) => Ok(
            render_form(&state, &admin, layout, &heading, action, form, Some(e.user_message()))
                .await
                .into_response(),
        ),
    }
}

/// Delete a product. HTMX callers get an empty row plus a toast.
#[instrument(skip(state, admin, headers))]
pub async fn delete(
    State(state): State<AppState>,
    admin: RequireAdmin,
    headers: HeaderMap,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let flash = match state.api().session(&admin.tokens).admin_delete_product(id).await {
        Ok(()) => Flash::success("Product deleted"),
        Err(e) if e.is_auth() => return Err(e.into()),
        Err(e) => {
            error!(product_id = %id, error = %e, "failed to delete product");
            if is_htmx(&headers) {
                // Keep the row; only the toast is swapped in.
                return Ok((
                    [("HX-Reswap", "none")],
                    ToastsTemplate {
                        toasts: vec![Flash::error(e.user_message())],
                    },
                )
                    .into_response());
            }
            Flash::error(e.user_message())
        }
    };

    if is_htmx(&headers) {
        return Ok(ToastsTemplate {
            toasts: vec![flash],
        }
        .into_response());
    }
    push_flash(admin.tokens.session(), flash).await;
    Ok(Redirect::to("/products").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            name: " Trail Runner ".to_string(),
            price: "2499.00".to_string(),
            stock: "12".to_string(),
            brand_id: "3".to_string(),
            images: "https://cdn/a.jpg\n\n https://cdn/b.jpg ".to_string(),
            is_active: Some("on".to_string()),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_valid_form_converts() {
        let input = form().to_input().unwrap();
        assert_eq!(input.name, "Trail Runner");
        assert_eq!(input.price, Decimal::new(249_900, 2));
        assert_eq!(input.brand_id, Some(BrandId::new(3)));
        assert_eq!(input.images, vec!["https://cdn/a.jpg", "https://cdn/b.jpg"]);
        assert!(input.is_active);
        assert!(input.discount_price.is_none());
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let mut f = form();
        f.price = "free".to_string();
        assert_eq!(f.to_input().unwrap_err(), "Price must be a number");

        let mut f = form();
        f.stock = "-1".to_string();
        assert_eq!(f.to_input().unwrap_err(), "Stock cannot be negative");

        let mut f = form();
        f.discount_price = "3000".to_string();
        assert!(f.to_input().is_err());

        let mut f = form();
        f.name = "  ".to_string();
        assert_eq!(f.to_input().unwrap_err(), "Name is required");
    }

    #[test]
    fn test_unchecked_box_deactivates() {
        let mut f = form();
        f.is_active = None;
        assert!(!f.to_input().unwrap().is_active);
    }

    #[test]
    fn test_search_term_in_pagination_links() {
        let page = Page::<Product> {
            count: 45,
            next: Some("n".to_string()),
            ..Page::default()
        };
        let (_, pagination) = table(&page, Some("red shoe"), 1);
        assert_eq!(
            pagination.next_url.as_deref(),
            Some("/products?search=red+shoe&page=2")
        );
        assert_eq!(pagination.total_pages, 3);
    }
}
