//! In-memory store standing in for PostgreSQL in tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use common::{
    Role,
    token::{TokenConfig, TokenService},
};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::checkout::{self, PricedLine};
use crate::error::{ApiError, ApiResult};
use crate::models::money::check_range;
use crate::models::{
    Account, AccountSummary, Cart, CartItem, NewProduct, Order, OrderWithOwner, Product,
    ShippingAddress, UpdateProduct,
};
use crate::repositories::{AccountRepository, CartRepository, OrderRepository, ProductRepository};
use crate::state::AppState;

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    products: Vec<Product>,
    /// (owner, lines of (product id, quantity)) in creation order
    carts: Vec<(Uuid, Vec<(Uuid, i32)>)>,
    orders: Vec<Order>,
}

impl Tables {
    fn cart(&self, account_id: Uuid) -> Option<Cart> {
        let (_, lines) = self.carts.iter().find(|(owner, _)| *owner == account_id)?;
        let items = lines
            .iter()
            .filter_map(|(product_id, quantity)| {
                self.products
                    .iter()
                    .find(|p| p.id == *product_id)
                    .map(|product| CartItem {
                        product: product.clone(),
                        quantity: *quantity,
                    })
            })
            .collect();
        Some(Cart { account_id, items })
    }

    fn lines_mut(&mut self, account_id: Uuid) -> Option<&mut Vec<(Uuid, i32)>> {
        self.carts
            .iter_mut()
            .find(|(owner, _)| *owner == account_id)
            .map(|(_, lines)| lines)
    }
}

/// All four repositories over one lock, so checkout is trivially atomic
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn add_account(&self, username: &str, role: Role, balance: Decimal) -> Account {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            role,
            is_verified: true,
            balance,
            is_test_account: false,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().unwrap().accounts.push(account.clone());
        account
    }

    pub fn add_product(&self, name: &str, price: Decimal) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            price,
            image_url: String::new(),
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().unwrap().products.push(product.clone());
        product
    }

    pub fn balance(&self, account_id: Uuid) -> Option<Decimal> {
        self.tables
            .lock()
            .unwrap()
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .map(|a| a.balance)
    }

    pub fn cart_lines(&self, account_id: Uuid) -> Vec<(Uuid, i32)> {
        self.tables
            .lock()
            .unwrap()
            .lines_mut(account_id)
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    pub fn order_count(&self) -> usize {
        self.tables.lock().unwrap().orders.len()
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn list(&self) -> ApiResult<Vec<Product>> {
        Ok(self.tables.lock().unwrap().products.clone())
    }

    async fn find(&self, id: Uuid) -> ApiResult<Option<Product>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn create(&self, product: &NewProduct, price: Decimal) -> ApiResult<Product> {
        let created = self.add_product(product.name.trim(), price);
        let mut tables = self.tables.lock().unwrap();
        let stored = tables
            .products
            .iter_mut()
            .find(|p| p.id == created.id)
            .expect("product just inserted");
        stored.description = product.description.clone();
        stored.image_url = product.image_url.clone();
        Ok(stored.clone())
    }

    async fn update(&self, id: Uuid, update: &UpdateProduct) -> ApiResult<Product> {
        let mut tables = self.tables.lock().unwrap();
        let product = tables
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(ApiError::NotFound("Product"))?;
        update.apply(product);
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete(&self, id: Uuid) -> ApiResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.products.len();
        tables.products.retain(|p| p.id != id);
        if tables.products.len() == before {
            return Err(ApiError::NotFound("Product"));
        }
        for (_, lines) in tables.carts.iter_mut() {
            lines.retain(|(product_id, _)| *product_id != id);
        }
        Ok(())
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn get(&self, account_id: Uuid) -> ApiResult<Cart> {
        let mut tables = self.tables.lock().unwrap();
        if tables.lines_mut(account_id).is_none() {
            tables.carts.push((account_id, Vec::new()));
        }
        Ok(tables.cart(account_id).expect("cart just created"))
    }

    async fn find(&self, account_id: Uuid) -> ApiResult<Cart> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .cart(account_id)
            .unwrap_or_else(|| Cart::empty(account_id)))
    }

    async fn add_item(
        &self,
        account_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> ApiResult<Cart> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.products.iter().any(|p| p.id == product_id) {
            return Err(ApiError::NotFound("Product"));
        }
        if tables.lines_mut(account_id).is_none() {
            tables.carts.push((account_id, Vec::new()));
        }
        let lines = tables.lines_mut(account_id).expect("cart just created");
        match lines.iter_mut().find(|(id, _)| *id == product_id) {
            Some((_, existing)) => {
                *existing = existing
                    .checked_add(quantity)
                    .ok_or_else(|| ApiError::Validation("Quantity is too large".to_string()))?;
            }
            None => lines.push((product_id, quantity)),
        }
        Ok(tables.cart(account_id).expect("cart exists"))
    }

    async fn update_item(
        &self,
        account_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> ApiResult<Cart> {
        let mut tables = self.tables.lock().unwrap();
        let lines = tables
            .lines_mut(account_id)
            .ok_or(ApiError::NotFound("Cart"))?;
        let (_, existing) = lines
            .iter_mut()
            .find(|(id, _)| *id == product_id)
            .ok_or(ApiError::NotFound("Cart item"))?;
        *existing = quantity;
        Ok(tables.cart(account_id).expect("cart exists"))
    }

    async fn remove_item(&self, account_id: Uuid, product_id: Uuid) -> ApiResult<Cart> {
        let mut tables = self.tables.lock().unwrap();
        let lines = tables
            .lines_mut(account_id)
            .ok_or(ApiError::NotFound("Cart"))?;
        lines.retain(|(id, _)| *id != product_id);
        Ok(tables.cart(account_id).expect("cart exists"))
    }

    async fn clear(&self, account_id: Uuid) -> ApiResult<Cart> {
        if let Some(lines) = self.tables.lock().unwrap().lines_mut(account_id) {
            lines.clear();
        }
        Ok(Cart::empty(account_id))
    }

    async fn list_all(&self) -> ApiResult<Vec<Cart>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .carts
            .iter()
            .filter_map(|(owner, _)| tables.cart(*owner))
            .collect())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn place_order(
        &self,
        account_id: Uuid,
        shipping_address: ShippingAddress,
    ) -> ApiResult<(Order, Decimal)> {
        let mut tables = self.tables.lock().unwrap();
        let balance = tables
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .map(|a| a.balance)
            .ok_or(ApiError::NotFound("User"))?;

        let lines = tables
            .cart(account_id)
            .map(|cart| {
                cart.items
                    .into_iter()
                    .map(|item| PricedLine {
                        product_id: item.product.id,
                        product_name: item.product.name,
                        unit_price: item.product.price,
                        quantity: item.quantity,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let quote = checkout::quote(lines)?;
        let remaining = checkout::debit(balance, quote.total)?;
        let order = checkout::build_order(account_id, quote, shipping_address);

        if let Some(account) = tables.accounts.iter_mut().find(|a| a.id == account_id) {
            account.balance = remaining;
        }
        tables.orders.push(order.clone());
        if let Some(lines) = tables.lines_mut(account_id) {
            lines.clear();
        }
        Ok((order, remaining))
    }

    async fn list_for_account(&self, account_id: Uuid) -> ApiResult<Vec<Order>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .orders
            .iter()
            .rev()
            .filter(|o| o.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> ApiResult<Vec<OrderWithOwner>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .orders
            .iter()
            .rev()
            .map(|order| OrderWithOwner {
                order: order.clone(),
                account: tables
                    .accounts
                    .iter()
                    .find(|a| a.id == order.account_id)
                    .map(AccountSummary::from),
            })
            .collect())
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn list(&self) -> ApiResult<Vec<Account>> {
        Ok(self.tables.lock().unwrap().accounts.clone())
    }

    async fn find(&self, id: Uuid) -> ApiResult<Option<Account>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .accounts
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn adjust_balance(&self, id: Uuid, amount: Decimal) -> ApiResult<Account> {
        let mut tables = self.tables.lock().unwrap();
        let account = tables
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ApiError::NotFound("User"))?;
        let balance = account.balance + amount;
        check_range(balance, "Balance")?;
        account.balance = balance;
        Ok(account.clone())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> ApiResult<Account> {
        let mut tables = self.tables.lock().unwrap();
        let account = tables
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ApiError::NotFound("User"))?;
        account.role = role;
        Ok(account.clone())
    }

    async fn delete(&self, id: Uuid) -> ApiResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.accounts.len();
        tables.accounts.retain(|a| a.id != id);
        if tables.accounts.len() == before {
            return Err(ApiError::NotFound("User"));
        }
        Ok(())
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub tokens: TokenService,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let tokens = TokenService::new(&TokenConfig {
            secret: "test-secret".to_string(),
            expiry_seconds: 3600,
        });
        let state = AppState {
            tokens: tokens.clone(),
            accounts: store.clone(),
            products: store.clone(),
            carts: store.clone(),
            orders: store.clone(),
        };

        Self {
            store,
            tokens,
            router: crate::routes::create_router(state),
        }
    }

    pub fn token_for(&self, account: &Account) -> String {
        self.tokens.issue(account.id, account.role).unwrap()
    }

    /// Account with a token, ready to call user routes
    pub fn user(&self, username: &str, balance: i64) -> (Account, String) {
        let account = self
            .store
            .add_account(username, Role::Standard, Decimal::new(balance, 0));
        let token = self.token_for(&account);
        (account, token)
    }

    pub fn admin(&self) -> (Account, String) {
        let account = self
            .store
            .add_account("admin", Role::Administrator, Decimal::ZERO);
        let token = self.token_for(&account);
        (account, token)
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}
