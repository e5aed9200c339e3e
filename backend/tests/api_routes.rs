use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use storefront_admin::api;

mod support;

#[actix_web::test]
async fn mutations_require_admin_header() {
    let Some(t) = support::init_test_db().await else { return };
    let order = t.order(None).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(t.state.clone()))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/orders/{}/cancel", order))
        .set_json(json!({ "reason": "no header" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(t.order_status(order).await, "pending");
}

#[actix_web::test]
async fn finalize_over_http_returns_envelope() {
    let Some(t) = support::init_test_db().await else { return };

    let order = t.order(None).await;
    t.item(order, "tool", 1, 2, 1_500).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(t.state.clone()))
            .configure(api::configure_routes),
    )
    .await;

    let detail = test::TestRequest::get().uri(&format!("/orders/{}", order)).to_request();
    let body: Value = test::call_and_read_body_json(&app, detail).await;
    assert_eq!(body["data"]["formattedAmount"], "₦3,000.00");

    let req = test::TestRequest::post()
        .uri(&format!("/orders/{}/finalize", order))
        .insert_header(("X-Admin-Id", "7"))
        .set_json(json!({ "notes": "Paid at counter" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["orderId"], order);
    assert_eq!(body["data"]["formattedAmount"], "₦3,000.00");

    let again = test::TestRequest::post()
        .uri(&format!("/orders/{}/finalize", order))
        .insert_header(("X-Admin-Id", "7"))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, again).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "INVALID_STATE");
}

#[actix_web::test]
async fn malformed_finalize_body_is_rejected_before_payment() {
    let Some(t) = support::init_test_db().await else { return };

    let shop = t.template("Shop", 20_000).await;
    let domain = t.domain(shop, "keep-free.com").await;
    let order = t.order(None).await;
    let item = t.item(order, "template", shop, 1, 20_000).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(t.state.clone()))
            .configure(api::configure_routes),
    )
    .await;

    for body in [
        json!({ "amountPaid": "23,000", "domainAssignments": [{ "domainId": domain, "orderItemId": item }] }),
        json!({ "domainAssignments": [{ "domainId": domain.to_string() }] }),
        json!({ "amount_paid": "20000" }),
    ] {
        let req = test::TestRequest::post()
            .uri(&format!("/orders/{}/finalize", order))
            .insert_header(("X-Admin-Id", "7"))
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
    }

    assert_eq!(t.order_status(order).await, "pending");
    assert_eq!(t.sales_for(order).await, 0);
    assert_eq!(t.domain_status(domain).await, "available");

    // An empty body still means "charge the computed total".
    let req = test::TestRequest::post()
        .uri(&format!("/orders/{}/finalize", order))
        .insert_header(("X-Admin-Id", "7"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(t.order_status(order).await, "paid");
}

#[actix_web::test]
async fn unknown_order_is_404() {
    let Some(t) = support::init_test_db().await else { return };

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(t.state.clone()))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/orders/31337").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[actix_web::test]
async fn bulk_cancel_over_http_reports_counts() {
    let Some(t) = support::init_test_db().await else { return };

    let first = t.order(None).await;
    let second = t.order(None).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(t.state.clone()))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/orders/bulk-cancel")
        .insert_header(("X-Admin-Id", "1"))
        .set_json(json!({ "ids": [first, second, 0] }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["data"]["successCount"], 2);
    assert_eq!(body["data"]["failCount"], 0);
    assert_eq!(
        t.scalar_text("SELECT cancellation_reason FROM pending_orders WHERE id = $1", first).await,
        "Cancelled by administrator"
    );
}

#[actix_web::test]
async fn ledger_audit_endpoint_reports_balanced_ledger() {
    let Some(t) = support::init_test_db().await else { return };
    t.affiliate("AUDIT01", "active").await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(t.state.clone()))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/affiliates/ledger-audit").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["data"]["affiliatesChecked"], 1);
    assert_eq!(body["data"]["discrepancies"], json!([]));
}
