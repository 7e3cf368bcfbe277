//! Administrative account management

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use common::{AuthUser, Role};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{BalanceAdjustment, RoleChange, money::validate_amount},
    state::AppState,
};

pub async fn list_users(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.accounts.list().await?))
}

/// Add a signed amount to an account's balance
pub async fn adjust_balance(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BalanceAdjustment>,
) -> ApiResult<impl IntoResponse> {
    let amount = payload
        .amount
        .ok_or_else(|| ApiError::Validation("Amount is required".to_string()))?;
    validate_amount(amount, "Amount")?;

    let account = state.accounts.adjust_balance(id, amount).await?;
    info!(admin_id = %admin.id, account_id = %id, %amount, "Balance adjustment applied");

    Ok(Json(json!({
        "message": "Balance updated",
        "user": account,
    })))
}

pub async fn change_role(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleChange>,
) -> ApiResult<impl IntoResponse> {
    let role = payload
        .role
        .parse::<Role>()
        .map_err(|_| ApiError::Validation("Role must be either user or admin".to_string()))?;

    let account = state.accounts.set_role(id, role).await?;
    info!(admin_id = %admin.id, account_id = %id, %role, "Role change applied");

    Ok(Json(json!({
        "message": "Role updated",
        "user": account,
    })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.accounts.delete(id).await?;
    Ok(Json(json!({ "message": "User deleted" })))
}

#[cfg(test)]
mod tests {
    use crate::testing::TestApp;
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_list_users_hides_password_material() {
        let app = TestApp::new();
        let (_, admin) = app.admin();
        app.user("jane", 0);

        let (status, users) = app.call("GET", "/users", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let users = users.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.get("password_hash").is_none()));
    }

    #[tokio::test]
    async fn test_balance_adjustment_may_go_negative() {
        let app = TestApp::new();
        let (_, admin) = app.admin();
        let (jane, _) = app.user("jane", 50);
        let uri = format!("/users/balance/{}", jane.id);

        let (status, body) = app
            .call("PUT", &uri, Some(&admin), Some(json!({ "amount": "25.50" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["balance"], "75.50");

        let (status, body) = app
            .call("PUT", &uri, Some(&admin), Some(json!({ "amount": "-100" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["balance"], "-24.50");
        assert_eq!(app.store.balance(jane.id), Some(Decimal::new(-2450, 2)));

        let (status, _) = app.call("PUT", &uri, Some(&admin), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        for amount in ["0.001", "10000000000", "-10000000000"] {
            let (status, _) = app
                .call("PUT", &uri, Some(&admin), Some(json!({ "amount": amount })))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "amount {}", amount);
        }
        assert_eq!(app.store.balance(jane.id), Some(Decimal::new(-2450, 2)));

        let (status, _) = app
            .call(
                "PUT",
                &format!("/users/balance/{}", Uuid::new_v4()),
                Some(&admin),
                Some(json!({ "amount": "1" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_balance_cannot_leave_the_money_range() {
        let app = TestApp::new();
        let (_, admin) = app.admin();
        let (jane, _) = app.user("jane", 9_999_999_000);
        let uri = format!("/users/balance/{}", jane.id);

        let (status, body) = app
            .call("PUT", &uri, Some(&admin), Some(json!({ "amount": "1000" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Balance is out of range");
        assert_eq!(
            app.store.balance(jane.id),
            Some(Decimal::from(9_999_999_000_i64))
        );

        let (status, _) = app
            .call("PUT", &uri, Some(&admin), Some(json!({ "amount": "999.99" })))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_role_change() {
        let app = TestApp::new();
        let (_, admin) = app.admin();
        let (jane, token) = app.user("jane", 0);
        let uri = format!("/users/{}/role", jane.id);

        let (status, _) = app
            .call("PUT", &uri, Some(&admin), Some(json!({ "role": "superuser" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .call("PUT", &uri, Some(&admin), Some(json!({ "role": "admin" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "admin");

        // Existing tokens still carry the old role until they expire
        let (status, _) = app.call("GET", "/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_delete_user_leaves_orders_behind() {
        let app = TestApp::new();
        let (_, admin) = app.admin();
        let (jane, token) = app.user("jane", 10);
        let mug = app.store.add_product("Mug", Decimal::new(5, 0));
        app.call(
            "POST",
            "/cart/add",
            Some(&token),
            Some(json!({ "product_id": mug.id })),
        )
        .await;
        app.call(
            "POST",
            "/orders",
            Some(&token),
            Some(json!({
                "shipping_address": {
                    "street": "1 Main St",
                    "city": "Springfield",
                    "postal_code": "12345"
                }
            })),
        )
        .await;

        let uri = format!("/users/{}", jane.id);
        let (status, _) = app.call("DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.call("DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, orders) = app.call("GET", "/orders", Some(&admin), None).await;
        assert_eq!(orders.as_array().unwrap().len(), 1);
        assert_eq!(orders[0]["account"], json!(null));
    }
}
