//! Data models for the shop service

pub mod account;
pub mod cart;
pub mod money;
pub mod order;
pub mod product;

pub use account::{Account, AccountSummary, BalanceAdjustment, RoleChange};
pub use cart::{
    AddItemRequest, Cart, CartItem, UpdateItemRequest, require_product_id, validate_quantity,
};
pub use order::{
    CheckoutRequest, CheckoutResponse, Order, OrderLine, OrderWithOwner, ShippingAddress,
};
pub use product::{NewProduct, Product, UpdateProduct};
