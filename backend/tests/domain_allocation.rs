use storefront_admin::models::{DomainAssignment, FinalizeOrderRequest};
use storefront_admin::services::{AssignOutcome, ServiceError};

mod support;

const ADMIN: i64 = 1;

#[actix_web::test]
async fn concurrent_claims_for_one_domain_have_one_winner() {
    let Some(t) = support::init_test_db().await else { return };

    let shop = t.template("Shop", 20_000).await;
    let domain = t.domain(shop, "contested.com").await;

    let order_a = t.order(None).await;
    let item_a = t.item(order_a, "template", shop, 1, 20_000).await;
    let order_b = t.order(None).await;
    let item_b = t.item(order_b, "template", shop, 1, 20_000).await;

    let allocator = &t.state.domain_allocator;
    let (a, b) = tokio::join!(
        allocator.set_order_item_domain(item_a, domain, order_a, ADMIN),
        allocator.set_order_item_domain(item_b, domain, order_b, 2),
    );

    let winners = [&a, &b].iter().filter(|r| matches!(r, Ok(AssignOutcome::Assigned))).count();
    let losers = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Err(ServiceError::ConflictingAssignment(_))))
        .count();
    assert_eq!((winners, losers), (1, 1));

    let holder = t.scalar_i64("SELECT assigned_order_id FROM domains WHERE id = $1", domain).await;
    let expected = if a.is_ok() { order_a } else { order_b };
    assert_eq!(holder, expected);
}

#[actix_web::test]
async fn available_list_includes_domains_held_by_current_order() {
    let Some(t) = support::init_test_db().await else { return };

    let shop = t.template("Shop", 20_000).await;
    let other_family = t.template("Blog", 5_000).await;
    let held = t.domain(shop, "held.com").await;
    let free = t.domain(shop, "free.com").await;
    t.domain(other_family, "blog-one.com").await;

    let order = t.order(None).await;
    let item = t.item(order, "template", shop, 1, 20_000).await;
    t.state.domain_allocator.set_order_item_domain(item, held, order, ADMIN).await.unwrap();

    let with_order = t.state.domain_allocator.get_available_domains(shop, Some(order)).await.unwrap();
    let ids: Vec<i64> = with_order.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![held, free]);

    let without_order = t.state.domain_allocator.get_available_domains(shop, None).await.unwrap();
    let ids: Vec<i64> = without_order.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![free]);

    let other_order = t.order(None).await;
    let for_other = t.state.domain_allocator.get_available_domains(shop, Some(other_order)).await.unwrap();
    assert!(for_other.iter().all(|d| d.id != held));
}

#[actix_web::test]
async fn reassigning_an_item_releases_its_previous_domain() {
    let Some(t) = support::init_test_db().await else { return };

    let shop = t.template("Shop", 20_000).await;
    let first = t.domain(shop, "first.com").await;
    let second = t.domain(shop, "second.com").await;

    let order = t.order(None).await;
    let item = t.item(order, "template", shop, 1, 20_000).await;

    let allocator = &t.state.domain_allocator;
    assert_eq!(
        allocator.set_order_item_domain(item, first, order, ADMIN).await.unwrap(),
        AssignOutcome::Assigned
    );
    assert_eq!(
        allocator.set_order_item_domain(item, first, order, ADMIN).await.unwrap(),
        AssignOutcome::AlreadyAssigned
    );
    assert_eq!(
        allocator.set_order_item_domain(item, second, order, ADMIN).await.unwrap(),
        AssignOutcome::Assigned
    );

    assert_eq!(t.domain_status(first).await, "available");
    assert_eq!(t.domain_status(second).await, "in_use");
}

#[actix_web::test]
async fn invalid_targets_are_rejected() {
    let Some(t) = support::init_test_db().await else { return };

    let shop = t.template("Shop", 20_000).await;
    let blog = t.template("Blog", 5_000).await;
    let shop_domain = t.domain(shop, "shop.com").await;
    let blog_domain = t.domain(blog, "blog.com").await;

    let order = t.order(None).await;
    let template_item = t.item(order, "template", shop, 1, 20_000).await;
    let tool_item = t.item(order, "tool", 1, 1, 1_500).await;
    let other_order = t.order(None).await;

    let allocator = &t.state.domain_allocator;

    let tool = allocator.set_order_item_domain(tool_item, shop_domain, order, ADMIN).await;
    assert!(matches!(tool, Err(ServiceError::InvalidInput(_))));

    let family = allocator.set_order_item_domain(template_item, blog_domain, order, ADMIN).await;
    assert!(matches!(family, Err(ServiceError::InvalidInput(_))));

    let foreign = allocator.set_order_item_domain(template_item, shop_domain, other_order, ADMIN).await;
    assert!(matches!(foreign, Err(ServiceError::InvalidInput(_))));

    let missing = allocator.set_order_item_domain(template_item, 987_654, order, ADMIN).await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));

    assert_eq!(t.domain_status(shop_domain).await, "available");
    assert_eq!(t.domain_status(blog_domain).await, "available");
}

#[actix_web::test]
async fn legacy_order_gets_chosen_domain() {
    let Some(t) = support::init_test_db().await else { return };

    let shop = t.template("Shop", 20_000).await;
    let domain = t.domain(shop, "legacy.com").await;
    let order = t.legacy_order(shop, None).await;

    let outcome = t.state.domain_allocator.assign_domain_to_customer(domain, order, ADMIN).await.unwrap();
    assert_eq!(outcome, AssignOutcome::Assigned);
    assert_eq!(
        t.scalar_i64("SELECT chosen_domain_id FROM pending_orders WHERE id = $1", order).await,
        domain
    );
    assert_eq!(t.domain_status(domain).await, "in_use");
}

#[actix_web::test]
async fn order_without_template_cannot_take_a_domain_directly() {
    let Some(t) = support::init_test_db().await else { return };

    let shop = t.template("Shop", 20_000).await;
    let domain = t.domain(shop, "any-family.com").await;

    // Itemized order: pending_orders.template_id stays NULL.
    let order = t.order(None).await;
    t.item(order, "tool", 1, 1, 1_500).await;

    let direct = t.state.domain_allocator.assign_domain_to_customer(domain, order, ADMIN).await;
    assert!(matches!(direct, Err(ServiceError::InvalidInput(_))));

    let request = FinalizeOrderRequest {
        amount_paid: None,
        notes: None,
        domain_assignments: vec![DomainAssignment { domain_id: domain, order_item_id: None }],
    };
    let finalize = t.state.order_finalizer.finalize_order(order, ADMIN, request).await;
    assert!(matches!(finalize, Err(ServiceError::InvalidInput(_))));

    assert_eq!(t.domain_status(domain).await, "available");
    assert_eq!(t.order_status(order).await, "pending");
    assert_eq!(t.sales_for(order).await, 0);
}

#[actix_web::test]
async fn legacy_order_rejects_domain_of_another_family() {
    let Some(t) = support::init_test_db().await else { return };

    let shop = t.template("Shop", 20_000).await;
    let blog = t.template("Blog", 5_000).await;
    let blog_domain = t.domain(blog, "blog-only.com").await;
    let order = t.legacy_order(shop, None).await;

    let result = t.state.domain_allocator.assign_domain_to_customer(blog_domain, order, ADMIN).await;
    assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    assert_eq!(t.domain_status(blog_domain).await, "available");
}

#[actix_web::test]
async fn suspended_domains_cannot_be_assigned_and_in_use_cannot_be_deleted() {
    let Some(t) = support::init_test_db().await else { return };

    let shop = t.template("Shop", 20_000).await;
    let paused = t.domain(shop, "paused.com").await;
    let live = t.domain(shop, "live.com").await;

    let order = t.order(None).await;
    let item = t.item(order, "template", shop, 1, 20_000).await;
    let allocator = &t.state.domain_allocator;

    allocator.set_domain_suspended(paused, true, ADMIN).await.unwrap();
    assert_eq!(t.domain_status(paused).await, "suspended");

    let result = allocator.set_order_item_domain(item, paused, order, ADMIN).await;
    assert!(matches!(result, Err(ServiceError::InvalidInput(_))));

    allocator.set_order_item_domain(item, live, order, ADMIN).await.unwrap();

    let suspend_live = allocator.set_domain_suspended(live, true, ADMIN).await;
    assert!(matches!(suspend_live, Err(ServiceError::InvalidState(_))));

    let delete_live = allocator.delete_domain(live, ADMIN).await;
    assert!(matches!(delete_live, Err(ServiceError::InvalidState(_))));

    allocator.set_domain_suspended(paused, false, ADMIN).await.unwrap();
    allocator.delete_domain(paused, ADMIN).await.unwrap();
    assert_eq!(
        t.scalar_i64("SELECT COUNT(*) FROM domains WHERE id = $1", paused).await,
        0
    );
}

#[actix_web::test]
async fn bulk_add_skips_duplicates_and_malformed_names() {
    let Some(t) = support::init_test_db().await else { return };

    let shop = t.template("Shop", 20_000).await;
    t.domain(shop, "existing.com").await;

    let result = t.state.domain_allocator
        .bulk_add_domains(shop, "New-One.com\nnew-two.com, existing.com\nnot_a_domain\nnew-one.com", ADMIN)
        .await
        .unwrap();

    assert_eq!(result.added, 2);
    assert_eq!(result.skipped, 3);

    let added = t.state.domain_allocator
        .add_domain(shop, "https://third.com/", ADMIN)
        .await
        .unwrap();
    assert_eq!(added.domain_name, "third.com");

    let duplicate = t.state.domain_allocator.add_domain(shop, "third.com", ADMIN).await;
    assert!(matches!(duplicate, Err(ServiceError::InvalidInput(_))));

    let unknown_template = t.state.domain_allocator.add_domain(999, "fourth.com", ADMIN).await;
    assert!(matches!(unknown_template, Err(ServiceError::NotFound(_))));
}
