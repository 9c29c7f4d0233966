//! End-to-end customer flow over HTTP.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`fc-cli migrate`)
//! - The API running (`cargo run -p freshcart-api`)
//! - At least one in-stock product in the catalog (`fc-cli seed products`)
//! - `SELLER_EMAIL`/`SELLER_PASSWORD`, `DATABASE_URL` and
//!   `STRIPE_WEBHOOK_SECRET` matching the server, for the seller and payment
//!   tests
//!
//! Run with: `cargo test -p freshcart-integration-tests -- --ignored`

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::{Client, RequestBuilder, Response, StatusCode, multipart};
use secrecy::SecretString;
use serde_json::{Value, json};

use freshcart_api::db::create_pool;
use freshcart_api::db::orders::OrderRepository;
use freshcart_core::{AddressId, OrderId, OrderLineRequest, PaymentType, ProductId, UserId};
use freshcart_integration_tests::{api_base_url, required_env, stripe_signature, unique_email};

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Send a request, waiting out the auth rate limiter when it answers 429.
async fn send_patiently(request: RequestBuilder) -> Response {
    for _ in 0..20 {
        let resp = request
            .try_clone()
            .expect("request body must be cloneable")
            .send()
            .await
            .expect("Failed to send request");
        if resp.status() != StatusCode::TOO_MANY_REQUESTS {
            return resp;
        }
        let wait = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(6);
        tokio::time::sleep(Duration::from_secs(wait)).await;
    }
    panic!("still rate limited after 20 attempts");
}

async fn registered_client() -> Client {
    let client = client();
    let resp = send_patiently(
        client
            .post(format!("{}/api/user/register", api_base_url()))
            .json(&json!({
                "name": "Integration Tester",
                "email": unique_email(),
                "password": "correct-horse-battery",
            })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    client
}

async fn seller_client() -> Client {
    let client = client();
    let resp = send_patiently(
        client
            .post(format!("{}/api/seller/login", api_base_url()))
            .json(&json!({
                "email": required_env("SELLER_EMAIL"),
                "password": required_env("SELLER_PASSWORD"),
            })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    client
}

async fn get_json(client: &Client, path: &str) -> Value {
    client
        .get(format!("{}{path}", api_base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn current_user_id(client: &Client) -> i32 {
    let body = get_json(client, "/api/user/is-auth").await;
    i32::try_from(body["user"]["id"].as_i64().unwrap()).unwrap()
}

async fn add_address(client: &Client) -> i64 {
    let body: Value = client
        .post(format!("{}/api/address/add", api_base_url()))
        .json(&json!({"address": {
            "firstName": "Ada", "lastName": "Lovelace", "street": "1 Market St",
            "city": "Springfield", "region": "IL", "zipcode": "62701",
            "country": "US", "phone": "555-0100"
        }}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["address"]["id"].as_i64().unwrap()
}

async fn add_product(seller: &Client, name: &str) -> i64 {
    let product_data = json!({
        "name": name,
        "category": "Integration",
        "price": 4,
        "offerPrice": 3,
    });
    let form = multipart::Form::new().text("productData", product_data.to_string());
    let resp = seller
        .post(format!("{}/api/product/add", api_base_url()))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    body["product"]["id"].as_i64().unwrap()
}

async fn remove_product(seller: &Client, id: i64) {
    let resp = seller
        .delete(format!("{}/api/product/remove/{id}", api_base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

fn unix_now() -> i64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    i64::try_from(secs).unwrap()
}

async fn first_in_stock_product(client: &Client) -> Value {
    let body: Value = client
        .get(format!("{}/api/product/list", api_base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["products"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["inStock"] == true)
        .cloned()
        .expect("catalog has no in-stock product")
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_register_then_is_auth() {
    let client = registered_client().await;
    let body: Value = client
        .get(format!("{}/api/user/is-auth", api_base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["name"], "Integration Tester");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_duplicate_registration_conflicts() {
    let email = unique_email();
    let payload = json!({"name": "Dup", "email": email, "password": "correct-horse-battery"});

    let first = client()
        .post(format!("{}/api/user/register", api_base_url()))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = client()
        .post(format!("{}/api/user/register", api_base_url()))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_cart_address_and_cod_order() {
    let base = api_base_url();
    let client = registered_client().await;
    let product = first_in_stock_product(&client).await;
    let product_id = product["id"].as_i64().unwrap();

    let cart: Value = client
        .post(format!("{base}/api/cart/update"))
        .json(&json!({"cartItems": {(product_id.to_string()): 2}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["success"], true);
    assert_eq!(cart["cartItems"][product_id.to_string()], 2);

    let address: Value = client
        .post(format!("{base}/api/address/add"))
        .json(&json!({"address": {
            "firstName": "Ada", "lastName": "Lovelace", "street": "1 Market St",
            "city": "Springfield", "region": "IL", "zipcode": "62701",
            "country": "US", "phone": "555-0100"
        }}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let address_id = address["address"]["id"].as_i64().unwrap();

    let placed = client
        .post(format!("{base}/api/order/cod"))
        .json(&json!({
            "items": [{"product": product_id, "quantity": 2}],
            "address": address_id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(placed.status(), StatusCode::OK);
    let placed: Value = placed.json().await.unwrap();
    assert_eq!(placed["order"]["status"], "Order Placed");
    assert_eq!(placed["order"]["paymentType"], "COD");

    let orders: Value = client
        .get(format!("{base}/api/order/user"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let listed = &orders["orders"][0];
    assert_eq!(listed["id"], placed["order"]["id"]);
    assert_eq!(listed["address"]["id"], address_id);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_order_with_unknown_product_is_rejected() {
    let base = api_base_url();
    let client = registered_client().await;
    let product = first_in_stock_product(&client).await;
    let address_id = add_address(&client).await;

    let resp = client
        .post(format!("{base}/api/order/cod"))
        .json(&json!({
            "items": [
                {"product": product["id"], "quantity": 1},
                {"product": i32::MAX, "quantity": 1},
            ],
            "address": address_id,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], format!("Product {} not found", i32::MAX));

    // the valid line was not written either
    let orders = get_json(&client, "/api/order/user").await;
    assert_eq!(orders["orders"], json!([]));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_order_with_unknown_address_is_rejected() {
    let base = api_base_url();
    let client = registered_client().await;
    let product = first_in_stock_product(&client).await;

    let resp = client
        .post(format!("{base}/api/order/cod"))
        .json(&json!({
            "items": [{"product": product["id"], "quantity": 1}],
            "address": i32::MAX,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Address not found");
}

#[tokio::test]
#[ignore = "Requires running API server, database and seller credentials"]
async fn test_out_of_stock_product_is_rejected() {
    let base = api_base_url();
    let seller = seller_client().await;
    let product_id = add_product(&seller, &format!("Stockout {}", unique_email())).await;

    let resp = seller
        .put(format!("{base}/api/product/stock"))
        .json(&json!({"id": product_id, "inStock": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let client = registered_client().await;
    let address_id = add_address(&client).await;
    let resp = client
        .post(format!("{base}/api/order/cod"))
        .json(&json!({
            "items": [{"product": product_id, "quantity": 1}],
            "address": address_id,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["message"],
        format!("Product {product_id} is out of stock")
    );

    let orders = get_json(&client, "/api/order/user").await;
    assert_eq!(orders["orders"], json!([]));

    remove_product(&seller, product_id).await;
}

async fn post_payment_event(kind: &str, order_id: OrderId, user_id: UserId) -> Response {
    let body = json!({
        "id": format!("evt_{}", unique_email()),
        "type": kind,
        "data": {"object": {
            "id": format!("pi_it_{order_id}"),
            "metadata": {"order_id": order_id.to_string(), "user_id": user_id.to_string()},
        }},
    })
    .to_string();
    let signature = stripe_signature(&required_env("STRIPE_WEBHOOK_SECRET"), unix_now(), &body);

    Client::new()
        .post(format!("{}/stripe", api_base_url()))
        .header("stripe-signature", signature)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires running API server, database and webhook secret"]
async fn test_duplicate_payment_webhook_pays_once() {
    let base = api_base_url();
    let client = registered_client().await;
    let user_id = UserId::new(current_user_id(&client).await);
    let product = first_in_stock_product(&client).await;
    let product_id = i32::try_from(product["id"].as_i64().unwrap()).unwrap();
    let address_id = i32::try_from(add_address(&client).await).unwrap();

    let cart = client
        .post(format!("{base}/api/cart/update"))
        .json(&json!({"cartItems": {(product_id.to_string()): 1}}))
        .send()
        .await
        .unwrap();
    assert_eq!(cart.status(), StatusCode::OK);

    // An Online order as checkout leaves it: unpaid, hidden from listings.
    let pool = create_pool(&SecretString::from(required_env("DATABASE_URL")))
        .await
        .unwrap();
    let orders = OrderRepository::new(&pool);
    let order = orders
        .place(
            user_id,
            AddressId::new(address_id),
            &[OrderLineRequest {
                product: ProductId::new(product_id),
                quantity: 1,
            }],
            PaymentType::Online,
        )
        .await
        .unwrap();
    let listed = get_json(&client, "/api/order/user").await;
    assert_eq!(listed["orders"], json!([]));

    for _ in 0..2 {
        let resp = post_payment_event("payment_intent.succeeded", order.id, user_id).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["received"], true);
    }

    let paid = orders.get(order.id).await.unwrap().unwrap();
    assert!(paid.is_paid);
    assert_eq!(paid.status.to_string(), "Order Placed");

    let listed = get_json(&client, "/api/order/user").await;
    let listed = listed["orders"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], json!(order.id));

    let cart = get_json(&client, "/api/cart/get").await;
    assert_eq!(cart["cartItems"], json!({}));

    // a late failure notice must not cancel a paid order
    let resp = post_payment_event("payment_intent.payment_failed", order.id, user_id).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let still_paid = orders.get(order.id).await.unwrap().unwrap();
    assert!(still_paid.is_paid);
    assert_eq!(still_paid.status.to_string(), "Order Placed");
}
