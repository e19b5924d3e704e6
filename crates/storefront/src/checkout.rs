//! Checkout: form validation and order placement.
//!
//! Validation collects every violated field rule and reports them together,
//! so the buyer fixes the form in one pass. Order placement is transactional
//! against the in-memory ledger: stock is checked for all lines before
//! anything is committed.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use sokoni_core::{CustomerId, Email, Phone, ProductId, SaleId};

use crate::cart::engine::{CartSummary, LineItem};
use crate::catalog::ProductCatalog;

// =============================================================================
// Wire types
// =============================================================================

/// The checkout form as posted, with its hyphenated field names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(rename = "billing-first-name", default)]
    pub billing_first_name: Option<String>,
    #[serde(rename = "billing-last-name", default)]
    pub billing_last_name: Option<String>,
    #[serde(rename = "billing-email", default)]
    pub billing_email: Option<String>,
    #[serde(rename = "billing-mobile", default)]
    pub billing_mobile: Option<String>,
    #[serde(rename = "billing-address1", default)]
    pub billing_address1: Option<String>,
    #[serde(rename = "billing-address2", default)]
    pub billing_address2: Option<String>,
    #[serde(rename = "billing-country", default)]
    pub billing_country: Option<String>,
    #[serde(rename = "billing-city", default)]
    pub billing_city: Option<String>,
    #[serde(rename = "billing-state", default)]
    pub billing_state: Option<String>,
    #[serde(rename = "billing-zip", default)]
    pub billing_zip: Option<String>,

    /// Optional ship-to address. Some client revisions posted the shipping
    /// fee under this same key, so anything that is not an object decodes as
    /// no separate address.
    #[serde(default, deserialize_with = "lenient_shipping")]
    pub shipping: Option<ShippingDetails>,

    pub payment: Option<String>,

    /// Client-computed totals, accepted for drift detection only.
    #[serde(default)]
    pub subtotal: Option<f64>,
    #[serde(rename = "coupon-discount", default)]
    pub coupon_discount: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,

    #[serde(default)]
    pub csrf_token: Option<String>,
}

/// A separate shipping address, when the order ships elsewhere.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShippingDetails {
    #[serde(rename = "shipping-first-name", default)]
    pub first_name: Option<String>,
    #[serde(rename = "shipping-last-name", default)]
    pub last_name: Option<String>,
    #[serde(rename = "shipping-email", default)]
    pub email: Option<String>,
    #[serde(rename = "shipping-mobile", default)]
    pub mobile: Option<String>,
    #[serde(rename = "shipping-address1", default)]
    pub address1: Option<String>,
    #[serde(rename = "shipping-address2", default)]
    pub address2: Option<String>,
    #[serde(rename = "shipping-country", default)]
    pub country: Option<String>,
    #[serde(rename = "shipping-city", default)]
    pub city: Option<String>,
    #[serde(rename = "shipping-state", default)]
    pub state: Option<String>,
    #[serde(rename = "shipping-zip", default)]
    pub zip: Option<String>,
}

fn lenient_shipping<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ShippingDetails>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_object() {
        serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom)
    } else {
        Ok(None)
    }
}

// =============================================================================
// Validation
// =============================================================================

/// A checkout form that passed validation.
#[derive(Debug, Clone)]
pub struct ValidOrder {
    pub contact: OrderContact,
    pub ship_to: Option<ShippingDetails>,
    pub payment_method: String,
}

/// The buyer behind an order.
#[derive(Debug, Clone)]
pub struct OrderContact {
    pub full_name: String,
    pub email: Email,
    pub phone: Phone,
}

fn trimmed(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Validate a checkout form, collecting every violated rule.
///
/// # Errors
///
/// Returns the full list of violation messages when any rule fails.
pub fn validate(request: &CheckoutRequest) -> Result<ValidOrder, Vec<String>> {
    let mut errors = Vec::new();

    let required: [(&Option<String>, &str); 9] = [
        (&request.billing_first_name, "First Name"),
        (&request.billing_last_name, "Last Name"),
        (&request.billing_email, "Email"),
        (&request.billing_mobile, "Mobile Number"),
        (&request.billing_address1, "Address Line 1"),
        (&request.billing_country, "Country"),
        (&request.billing_city, "City"),
        (&request.billing_state, "State"),
        (&request.billing_zip, "ZIP Code"),
    ];
    for (value, name) in required {
        if trimmed(value.as_ref()).is_none() {
            errors.push(format!("{name} is required."));
        }
    }

    let email = trimmed(request.billing_email.as_ref()).and_then(|raw| match Email::parse(raw) {
        Ok(email) => Some(email),
        Err(_) => {
            errors.push("Please enter a valid email address.".to_string());
            None
        }
    });

    let phone = trimmed(request.billing_mobile.as_ref()).and_then(|raw| match Phone::parse(raw) {
        Ok(phone) => Some(phone),
        Err(_) => {
            errors.push("Please enter a valid mobile number (10-15 digits).".to_string());
            None
        }
    });

    if let Some(shipping) = &request.shipping {
        let required: [(&Option<String>, &str); 7] = [
            (&shipping.first_name, "Shipping First Name"),
            (&shipping.last_name, "Shipping Last Name"),
            (&shipping.address1, "Shipping Address Line 1"),
            (&shipping.country, "Shipping Country"),
            (&shipping.city, "Shipping City"),
            (&shipping.state, "Shipping State"),
            (&shipping.zip, "Shipping ZIP Code"),
        ];
        for (value, name) in required {
            if trimmed(value.as_ref()).is_none() {
                errors.push(format!("{name} is required."));
            }
        }

        if let Some(raw) = trimmed(shipping.email.as_ref())
            && Email::parse(raw).is_err()
        {
            errors.push("Please enter a valid shipping email address.".to_string());
        }

        if let Some(raw) = trimmed(shipping.mobile.as_ref())
            && Phone::parse(raw).is_err()
        {
            errors.push("Please enter a valid shipping mobile number.".to_string());
        }
    }

    let payment_method = trimmed(request.payment.as_ref());
    if payment_method.is_none() {
        errors.push("Please select a payment method.".to_string());
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    // All fields were present and well-formed above.
    let (Some(email), Some(phone), Some(payment_method)) = (email, phone, payment_method) else {
        return Err(vec!["Checkout form is incomplete.".to_string()]);
    };

    let full_name = format!(
        "{} {}",
        trimmed(request.billing_first_name.as_ref()).unwrap_or_default(),
        trimmed(request.billing_last_name.as_ref()).unwrap_or_default(),
    );

    Ok(ValidOrder {
        contact: OrderContact {
            full_name,
            email,
            phone,
        },
        ship_to: request.shipping.clone(),
        payment_method: payment_method.to_string(),
    })
}

/// Compare client-posted totals against the authoritative summary and log
/// any drift. Client values are never used.
pub fn log_total_drift(request: &CheckoutRequest, summary: &CartSummary) {
    let drifted = |posted: Option<f64>, actual: Decimal| {
        posted
            .and_then(Decimal::from_f64)
            .is_some_and(|p| p != actual)
    };

    if drifted(request.subtotal, summary.subtotal)
        || drifted(request.coupon_discount, summary.discount)
        || drifted(request.total, summary.total)
    {
        tracing::warn!(
            posted_subtotal = ?request.subtotal,
            posted_discount = ?request.coupon_discount,
            posted_total = ?request.total,
            subtotal = %summary.subtotal,
            discount = %summary.discount,
            total = %summary.total,
            "client-posted totals differ from computed summary"
        );
    }
}

// =============================================================================
// Order ledger
// =============================================================================

/// Errors surfaced by order placement.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A cart line asks for more units than remain in stock.
    #[error("Insufficient stock for {product}")]
    InsufficientStock { product: String },
}

/// A customer, deduplicated by email.
#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub id: CustomerId,
    pub full_name: String,
    pub phone: Phone,
    pub email: Email,
}

/// One line of a recorded sale.
#[derive(Debug, Clone, Serialize)]
pub struct SaleLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub purchase_amount: Decimal,
}

/// A recorded sale.
#[derive(Debug, Clone, Serialize)]
pub struct Sale {
    pub id: SaleId,
    pub customer_id: CustomerId,
    pub lines: Vec<SaleLine>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A recorded payment.
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub sale_id: SaleId,
    pub customer_id: CustomerId,
    pub payment_method: String,
    pub amount: Decimal,
}

/// Orders, customers, payments, and live inventory.
///
/// Placement is all-or-nothing: every line's stock is verified before any
/// decrement, customer creation, or sale record happens.
#[derive(Debug)]
pub struct OrderLedger {
    inner: Mutex<LedgerInner>,
}

#[derive(Debug)]
struct LedgerInner {
    next_sale_id: i64,
    next_customer_id: i64,
    customers: Vec<Customer>,
    sales: Vec<Sale>,
    payments: Vec<Payment>,
    inventory: HashMap<ProductId, u32>,
}

impl OrderLedger {
    /// Create a ledger with `default_stock` units of every catalog product.
    #[must_use]
    pub fn new(catalog: &ProductCatalog, default_stock: u32) -> Self {
        let inventory = catalog
            .all()
            .iter()
            .map(|p| (p.id, default_stock))
            .collect();

        Self {
            inner: Mutex::new(LedgerInner {
                next_sale_id: 1,
                next_customer_id: 1,
                customers: Vec::new(),
                sales: Vec::new(),
                payments: Vec::new(),
                inventory,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Units currently in stock for a product. Unknown products have none.
    #[must_use]
    pub fn available(&self, product_id: ProductId) -> u32 {
        self.lock().inventory.get(&product_id).copied().unwrap_or(0)
    }

    /// Place an order: verify stock for every line, decrement inventory,
    /// find-or-create the customer, and record the sale and payment.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InsufficientStock` if any line exceeds the
    /// remaining stock; nothing is committed in that case.
    pub fn place_order(
        &self,
        order: &ValidOrder,
        cart: &[LineItem],
        summary: &CartSummary,
    ) -> Result<SaleId, LedgerError> {
        let mut inner = self.lock();

        // Aggregate quantities per product, then verify before any decrement.
        let mut requested: HashMap<ProductId, u32> = HashMap::new();
        for line in cart {
            *requested.entry(line.product_id).or_insert(0) += line.quantity;
        }
        for line in cart {
            let Some(total) = requested.get(&line.product_id) else {
                continue;
            };
            let stock = inner.inventory.get(&line.product_id).copied().unwrap_or(0);
            if stock < *total {
                return Err(LedgerError::InsufficientStock {
                    product: line.name.clone(),
                });
            }
        }

        for (product_id, quantity) in &requested {
            if let Some(stock) = inner.inventory.get_mut(product_id) {
                *stock -= quantity;
            }
        }

        let customer_id = match inner
            .customers
            .iter()
            .find(|c| c.email == order.contact.email)
        {
            Some(existing) => existing.id,
            None => {
                let id = CustomerId::new(inner.next_customer_id);
                inner.next_customer_id += 1;
                inner.customers.push(Customer {
                    id,
                    full_name: order.contact.full_name.clone(),
                    phone: order.contact.phone.clone(),
                    email: order.contact.email.clone(),
                });
                id
            }
        };

        let sale_id = SaleId::new(inner.next_sale_id);
        inner.next_sale_id += 1;

        inner.sales.push(Sale {
            id: sale_id,
            customer_id,
            lines: cart
                .iter()
                .map(|line| SaleLine {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    quantity: line.quantity,
                    purchase_amount: line.line_total(),
                })
                .collect(),
            subtotal: summary.subtotal,
            shipping: summary.shipping,
            discount: summary.discount,
            total: summary.total,
            created_at: Utc::now(),
        });

        inner.payments.push(Payment {
            sale_id,
            customer_id,
            payment_method: order.payment_method.clone(),
            amount: summary.total,
        });

        Ok(sale_id)
    }

    /// Look up a recorded sale.
    #[must_use]
    pub fn sale(&self, id: SaleId) -> Option<Sale> {
        self.lock().sales.iter().find(|s| s.id == id).cloned()
    }

    /// Number of recorded sales.
    #[must_use]
    pub fn sales_count(&self) -> usize {
        self.lock().sales.len()
    }

    /// Look up a customer by email.
    #[must_use]
    pub fn find_customer(&self, email: &Email) -> Option<Customer> {
        self.lock()
            .customers
            .iter()
            .find(|c| &c.email == email)
            .cloned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::cart::engine::CartEngine;
    use crate::catalog::Product;
    use crate::config::CartConfig;
    use crate::coupons::CouponBook;

    use super::*;

    fn request() -> CheckoutRequest {
        serde_json::from_value(json!({
            "billing-first-name": "Asha",
            "billing-last-name": "Mwangi",
            "billing-email": "asha@example.com",
            "billing-mobile": "+254712345678",
            "billing-address1": "12 Biashara Street",
            "billing-country": "Kenya",
            "billing-city": "Nairobi",
            "billing-state": "Nairobi",
            "billing-zip": "00100",
            "payment": "mpesa",
            "csrf_token": "token"
        }))
        .unwrap()
    }

    fn catalog() -> ProductCatalog {
        ProductCatalog::from_products(vec![
            Product {
                id: ProductId::new(2),
                name: "Blue Jacket".to_string(),
                price: Decimal::new(1500, 0),
                image: "img/product-2.jpg".to_string(),
                rating: 4.5,
                category: "jackets".to_string(),
                description: "Stylish denim jacket.".to_string(),
            },
        ])
        .unwrap()
    }

    fn engine(catalog: Arc<ProductCatalog>) -> CartEngine {
        CartEngine::new(catalog, CouponBook::builtin(), CartConfig::default())
    }

    #[test]
    fn test_validate_accepts_complete_form() {
        let order = validate(&request()).unwrap();
        assert_eq!(order.contact.full_name, "Asha Mwangi");
        assert_eq!(order.contact.email.as_str(), "asha@example.com");
        assert_eq!(order.payment_method, "mpesa");
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let errors = validate(&CheckoutRequest::default()).unwrap_err();
        assert!(errors.contains(&"First Name is required.".to_string()));
        assert!(errors.contains(&"ZIP Code is required.".to_string()));
        assert!(errors.contains(&"Please select a payment method.".to_string()));
        assert!(errors.len() >= 10);
    }

    #[test]
    fn test_validate_rejects_bad_email_and_mobile() {
        let mut request = request();
        request.billing_email = Some("not-an-email".to_string());
        request.billing_mobile = Some("12345".to_string());

        let errors = validate(&request).unwrap_err();
        assert!(errors.contains(&"Please enter a valid email address.".to_string()));
        assert!(
            errors.contains(&"Please enter a valid mobile number (10-15 digits).".to_string())
        );
    }

    #[test]
    fn test_validate_whitespace_is_missing() {
        let mut request = request();
        request.billing_city = Some("   ".to_string());
        let errors = validate(&request).unwrap_err();
        assert_eq!(errors, vec!["City is required.".to_string()]);
    }

    #[test]
    fn test_validate_shipping_block() {
        let mut request = request();
        request.shipping = Some(ShippingDetails {
            first_name: Some("Asha".to_string()),
            email: Some("bad-email".to_string()),
            ..ShippingDetails::default()
        });

        let errors = validate(&request).unwrap_err();
        assert!(errors.contains(&"Shipping Last Name is required.".to_string()));
        assert!(errors.contains(&"Shipping ZIP Code is required.".to_string()));
        assert!(
            errors.contains(&"Please enter a valid shipping email address.".to_string())
        );
        assert!(!errors.contains(&"Shipping First Name is required.".to_string()));
    }

    #[test]
    fn test_shipping_fee_number_reads_as_no_address() {
        let request: CheckoutRequest = serde_json::from_value(json!({
            "billing-first-name": "Asha",
            "shipping": 10.0
        }))
        .unwrap();
        assert!(request.shipping.is_none());
    }

    #[test]
    fn test_place_order_records_sale_and_decrements_stock() {
        let catalog = Arc::new(catalog());
        let engine = engine(Arc::clone(&catalog));
        let ledger = OrderLedger::new(&catalog, 100);

        let mut cart = Vec::new();
        engine
            .add_item(&mut cart, ProductId::new(2), "M", "Black", Some(2.0))
            .unwrap();
        let summary = engine.compute_summary(&cart, Decimal::ZERO);

        let order = validate(&request()).unwrap();
        let sale_id = ledger.place_order(&order, &cart, &summary).unwrap();

        assert_eq!(sale_id, SaleId::new(1));
        assert_eq!(ledger.available(ProductId::new(2)), 98);

        let sale = ledger.sale(sale_id).unwrap();
        assert_eq!(sale.total, Decimal::new(3010, 0));
        assert_eq!(sale.lines.len(), 1);
        assert_eq!(
            sale.lines.first().unwrap().purchase_amount,
            Decimal::new(3000, 0)
        );
    }

    #[test]
    fn test_place_order_dedups_customer_and_increments_sale_id() {
        let catalog = Arc::new(catalog());
        let engine = engine(Arc::clone(&catalog));
        let ledger = OrderLedger::new(&catalog, 100);

        let mut cart = Vec::new();
        engine
            .add_item(&mut cart, ProductId::new(2), "M", "Black", Some(1.0))
            .unwrap();
        let summary = engine.compute_summary(&cart, Decimal::ZERO);
        let order = validate(&request()).unwrap();

        let first = ledger.place_order(&order, &cart, &summary).unwrap();
        let second = ledger.place_order(&order, &cart, &summary).unwrap();

        assert_eq!(first, SaleId::new(1));
        assert_eq!(second, SaleId::new(2));

        let email = Email::parse("asha@example.com").unwrap();
        let customer = ledger.find_customer(&email).unwrap();
        assert_eq!(customer.id, CustomerId::new(1));
        assert_eq!(ledger.sale(second).unwrap().customer_id, customer.id);
    }

    #[test]
    fn test_place_order_insufficient_stock_commits_nothing() {
        let catalog = Arc::new(catalog());
        let engine = engine(Arc::clone(&catalog));
        let ledger = OrderLedger::new(&catalog, 3);

        // Two lines of the same product whose sum exceeds stock.
        let mut cart = Vec::new();
        engine
            .add_item(&mut cart, ProductId::new(2), "M", "Black", Some(2.0))
            .unwrap();
        engine
            .add_item(&mut cart, ProductId::new(2), "L", "Black", Some(2.0))
            .unwrap();
        let summary = engine.compute_summary(&cart, Decimal::ZERO);
        let order = validate(&request()).unwrap();

        let result = ledger.place_order(&order, &cart, &summary);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientStock { .. })
        ));
        assert_eq!(ledger.available(ProductId::new(2)), 3);
        assert_eq!(ledger.sales_count(), 0);
        assert!(ledger.find_customer(&order.contact.email).is_none());
    }
}
