use rust_decimal::Decimal;

use storefront_admin::models::CreateAffiliateRequest;
use storefront_admin::services::ServiceError;

mod support;

const ADMIN: i64 = 1;

/// Affiliate with `amount` of pending commission earned through a real sale.
async fn affiliate_with_commission(t: &support::TestDb, code: &str, sale_amount: i64) -> i64 {
    let affiliate = t.affiliate(code, "active").await;
    let order = t.order(Some(code)).await;
    t.state.order_finalizer
        .mark_order_paid(order, ADMIN, Decimal::from(sale_amount), None)
        .await
        .expect("sale");
    affiliate
}

async fn balances(t: &support::TestDb, affiliate: i64) -> (Decimal, Decimal, Decimal) {
    (
        t.scalar_decimal("SELECT commission_earned FROM affiliates WHERE id = $1", affiliate).await,
        t.scalar_decimal("SELECT commission_pending FROM affiliates WHERE id = $1", affiliate).await,
        t.scalar_decimal("SELECT commission_paid FROM affiliates WHERE id = $1", affiliate).await,
    )
}

#[actix_web::test]
async fn paid_withdrawal_moves_pending_to_paid() {
    let Some(t) = support::init_test_db().await else { return };

    // 30% of 23,000
    let affiliate = affiliate_with_commission(&t, "EARNER1", 23_000).await;
    let withdrawal = t.withdrawal(affiliate, 5_000).await;

    t.state.affiliate_ledger
        .process_withdrawal(withdrawal, "paid", Some("Sent"), ADMIN)
        .await
        .unwrap();

    assert_eq!(
        balances(&t, affiliate).await,
        (Decimal::from(6_900), Decimal::from(1_900), Decimal::from(5_000))
    );
    assert_eq!(
        t.scalar_text("SELECT status FROM withdrawal_requests WHERE id = $1", withdrawal).await,
        "paid"
    );
    assert_eq!(
        t.scalar_i64("SELECT processed_by FROM withdrawal_requests WHERE id = $1", withdrawal).await,
        ADMIN
    );

    let audit = t.state.ledger_auditor.audit().await.unwrap();
    assert_eq!(audit.affiliates_checked, 1);
    assert!(audit.discrepancies.is_empty());
}

#[actix_web::test]
async fn withdrawal_larger_than_pending_is_refused() {
    let Some(t) = support::init_test_db().await else { return };

    let affiliate = affiliate_with_commission(&t, "EARNER2", 1_000).await;
    let withdrawal = t.withdrawal(affiliate, 500).await;

    let result = t.state.affiliate_ledger
        .process_withdrawal(withdrawal, "paid", None, ADMIN)
        .await;

    assert!(matches!(result, Err(ServiceError::InvalidState(_))));
    assert_eq!(
        balances(&t, affiliate).await,
        (Decimal::from(300), Decimal::from(300), Decimal::ZERO)
    );
    assert_eq!(
        t.scalar_text("SELECT status FROM withdrawal_requests WHERE id = $1", withdrawal).await,
        "pending"
    );
}

#[actix_web::test]
async fn only_pending_withdrawals_can_be_processed() {
    let Some(t) = support::init_test_db().await else { return };

    let affiliate = affiliate_with_commission(&t, "EARNER3", 10_000).await;
    let withdrawal = t.withdrawal(affiliate, 1_000).await;
    let ledger = &t.state.affiliate_ledger;

    ledger.process_withdrawal(withdrawal, "rejected", Some("Bank details invalid"), ADMIN).await.unwrap();
    assert_eq!(
        balances(&t, affiliate).await,
        (Decimal::from(3_000), Decimal::from(3_000), Decimal::ZERO)
    );

    let again = ledger.process_withdrawal(withdrawal, "paid", None, ADMIN).await;
    assert!(matches!(again, Err(ServiceError::InvalidState(_))));

    let bad_status = ledger.process_withdrawal(withdrawal, "pending", None, ADMIN).await;
    assert!(matches!(bad_status, Err(ServiceError::InvalidInput(_))));

    let missing = ledger.process_withdrawal(424_242, "approved", None, ADMIN).await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));
}

#[actix_web::test]
async fn approved_withdrawal_queues_email_without_balance_change() {
    let Some(t) = support::init_test_db().await else { return };

    let affiliate = affiliate_with_commission(&t, "EARNER4", 10_000).await;
    let withdrawal = t.withdrawal(affiliate, 1_000).await;

    t.state.affiliate_ledger
        .process_withdrawal(withdrawal, "Approved", None, ADMIN)
        .await
        .unwrap();

    assert_eq!(
        balances(&t, affiliate).await,
        (Decimal::from(3_000), Decimal::from(3_000), Decimal::ZERO)
    );
    assert_eq!(
        t.scalar_i64(
            "SELECT COUNT(*) FROM email_queue WHERE template = 'withdrawal_processed' AND payload->>'withdrawalId' = $1::BIGINT::TEXT",
            withdrawal
        ).await,
        1
    );
}

#[actix_web::test]
async fn create_affiliate_normalizes_and_rejects_duplicates() {
    let Some(t) = support::init_test_db().await else { return };

    let ledger = &t.state.affiliate_ledger;
    let created = ledger
        .create_affiliate(
            CreateAffiliateRequest {
                name: "Jane Doe".to_string(),
                email: "Jane@Example.com".to_string(),
                code: "jane2024".to_string(),
            },
            ADMIN,
        )
        .await
        .unwrap();

    assert_eq!(created.code, "JANE2024");
    assert_eq!(created.commission_earned, Decimal::ZERO);

    let same_code = ledger
        .create_affiliate(
            CreateAffiliateRequest {
                name: "John Doe".to_string(),
                email: "john@example.com".to_string(),
                code: "JANE2024".to_string(),
            },
            ADMIN,
        )
        .await;
    assert!(matches!(same_code, Err(ServiceError::InvalidInput(_))));

    let same_email = ledger
        .create_affiliate(
            CreateAffiliateRequest {
                name: "Jane Again".to_string(),
                email: "jane@example.com".to_string(),
                code: "JANE2025".to_string(),
            },
            ADMIN,
        )
        .await;
    assert!(matches!(same_email, Err(ServiceError::InvalidInput(_))));

    let bad_code = ledger
        .create_affiliate(
            CreateAffiliateRequest {
                name: "Ola".to_string(),
                email: "ola@example.com".to_string(),
                code: "ab".to_string(),
            },
            ADMIN,
        )
        .await;
    assert!(matches!(bad_code, Err(ServiceError::InvalidInput(_))));
}

#[actix_web::test]
async fn suspended_affiliate_stops_earning() {
    let Some(t) = support::init_test_db().await else { return };

    let affiliate = affiliate_with_commission(&t, "EARNER5", 1_000).await;
    t.state.affiliate_ledger.set_affiliate_status(affiliate, "suspended", ADMIN).await.unwrap();

    let order = t.order(Some("EARNER5")).await;
    let result = t.state.order_finalizer
        .mark_order_paid(order, ADMIN, Decimal::from(1_000), None)
        .await
        .unwrap();

    assert_eq!(result.commission, Decimal::ZERO);
    assert_eq!(
        balances(&t, affiliate).await,
        (Decimal::from(300), Decimal::from(300), Decimal::ZERO)
    );

    let unknown = t.state.affiliate_ledger.set_affiliate_status(affiliate, "retired", ADMIN).await;
    assert!(matches!(unknown, Err(ServiceError::InvalidInput(_))));
}
