//! CodeStore interface tests.
//!
//! Every function expects an empty store.

use codici::model::NewCode;
use codici::storage::{CodeStore, OrderClaim};

fn code(code: &str, isbn: &str) -> NewCode {
    NewCode::new(code, "EDITORE", "Titolo", isbn)
}

// =============================================================================
// claim tests
// =============================================================================

pub async fn test_claim_empty_store<S: CodeStore>(store: &S) {
    let result = store.claim("111").await.expect("claim should succeed");
    assert!(result.is_none(), "empty store has nothing to claim");
    assert!(store.list_redeemed().await.unwrap().is_empty());
}

pub async fn test_claim_moves_code_to_redeemed<S: CodeStore>(store: &S) {
    store.insert(code("A1", "111")).await.unwrap();

    let redeemed = store
        .claim("111")
        .await
        .expect("claim should succeed")
        .expect("code should be claimed");

    assert_eq!(redeemed.code, "A1");
    assert_eq!(redeemed.publisher_code, "EDITORE");
    assert_eq!(redeemed.product_title, "Titolo");
    assert_eq!(redeemed.isbn, "111");
    assert_eq!(store.count_available().await.unwrap(), 0);

    let log = store.list_redeemed().await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].code, "A1");
}

pub async fn test_claim_lowest_id_first<S: CodeStore>(store: &S) {
    store.insert(code("A1", "111")).await.unwrap();
    store.insert(code("B1", "222")).await.unwrap();
    store.insert(code("A2", "111")).await.unwrap();

    let first = store.claim("111").await.unwrap().unwrap();
    let second = store.claim("111").await.unwrap().unwrap();

    assert_eq!(first.code, "A1");
    assert_eq!(second.code, "A2");
    assert!(store.claim("111").await.unwrap().is_none());
    assert_eq!(store.count_available().await.unwrap(), 1);
}

pub async fn test_claim_unknown_isbn_leaves_pool<S: CodeStore>(store: &S) {
    store.insert(code("A1", "111")).await.unwrap();

    assert!(store.claim("999").await.unwrap().is_none());
    assert_eq!(store.count_available().await.unwrap(), 1);
    assert!(store.list_redeemed().await.unwrap().is_empty());
}

// =============================================================================
// claim_for_order tests
// =============================================================================

pub async fn test_claim_for_order_once<S: CodeStore>(store: &S) {
    store
        .insert_many(vec![code("A1", "111"), code("A2", "111"), code("B1", "222")])
        .await
        .unwrap();
    assert!(!store.order_issued(42).await.unwrap());

    let first = store.claim_for_order(42, "111").await.unwrap();
    assert!(matches!(first, OrderClaim::Claimed(ref r) if r.code == "A1"));
    assert!(store.order_issued(42).await.unwrap());

    // Same order, any ISBN: nothing more is issued.
    assert_eq!(
        store.claim_for_order(42, "111").await.unwrap(),
        OrderClaim::AlreadyIssued
    );
    assert_eq!(
        store.claim_for_order(42, "222").await.unwrap(),
        OrderClaim::AlreadyIssued
    );
    assert_eq!(store.count_available().await.unwrap(), 2);
    assert_eq!(store.list_redeemed().await.unwrap().len(), 1);

    // Other orders are unaffected.
    let other = store.claim_for_order(43, "111").await.unwrap();
    assert!(matches!(other, OrderClaim::Claimed(ref r) if r.code == "A2"));
}

pub async fn test_claim_for_order_without_stock<S: CodeStore>(store: &S) {
    assert_eq!(
        store.claim_for_order(50, "111").await.unwrap(),
        OrderClaim::NoStock
    );
    assert!(!store.order_issued(50).await.unwrap());

    store.insert(code("A1", "111")).await.unwrap();
    assert!(matches!(
        store.claim_for_order(50, "111").await.unwrap(),
        OrderClaim::Claimed(_)
    ));
}

// =============================================================================
// primitive tests
// =============================================================================

pub async fn test_find_remove_append<S: CodeStore>(store: &S) {
    store.insert(code("A1", "111")).await.unwrap();
    store.insert(code("A2", "111")).await.unwrap();

    let found = store
        .find_available("111")
        .await
        .unwrap()
        .expect("code should be found");
    assert_eq!(found.code, "A1");

    assert!(store.remove(found.id).await.unwrap());
    assert!(!store.remove(found.id).await.unwrap(), "second remove is a no-op");

    let redeemed = store.append_redeemed(found.into()).await.unwrap();
    assert_eq!(redeemed.code, "A1");
    assert_eq!(store.count_available().await.unwrap(), 1);
    assert!(store.find_available("222").await.unwrap().is_none());
}

// =============================================================================
// admin operation tests
// =============================================================================

pub async fn test_insert_many_and_list<S: CodeStore>(store: &S) {
    let inserted = store
        .insert_many(vec![code("A1", "111"), code("A2", "111"), code("B1", "222")])
        .await
        .unwrap();
    assert_eq!(inserted, 3);

    let listed = store.list_available().await.unwrap();
    let codes: Vec<_> = listed.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["A1", "A2", "B1"]);
    assert!(listed.windows(2).all(|w| w[0].id < w[1].id));

    assert_eq!(store.insert_many(vec![]).await.unwrap(), 0);
    assert_eq!(store.count_available().await.unwrap(), 3);
}

pub async fn test_delete_all_keeps_redeemed<S: CodeStore>(store: &S) {
    store
        .insert_many(vec![code("A1", "111"), code("A2", "111")])
        .await
        .unwrap();
    store.claim("111").await.unwrap();

    assert_eq!(store.delete_all_available().await.unwrap(), 1);
    assert_eq!(store.count_available().await.unwrap(), 0);
    assert_eq!(store.list_redeemed().await.unwrap().len(), 1);
}

pub async fn test_delete_one<S: CodeStore>(store: &S) {
    let a = store.insert(code("A1", "111")).await.unwrap();
    store.insert(code("A2", "111")).await.unwrap();

    assert!(store.delete_available(a.id).await.unwrap());
    assert!(!store.delete_available(a.id).await.unwrap());

    let left = store.list_available().await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].code, "A2");
}

pub async fn test_ids_not_reused_after_clear<S: CodeStore>(store: &S) {
    let first = store.insert(code("A1", "111")).await.unwrap();
    store.delete_all_available().await.unwrap();
    let second = store.insert(code("A2", "111")).await.unwrap();

    assert!(second.id > first.id, "ids must keep increasing");
}

/// Run all CodeStore tests, building a fresh store for each.
#[macro_export]
macro_rules! run_code_store_tests {
    ($make:expr) => {
        use $crate::storage::code_store_tests::*;

        test_claim_empty_store(&$make).await;
        println!("  test_claim_empty_store: PASSED");

        test_claim_moves_code_to_redeemed(&$make).await;
        println!("  test_claim_moves_code_to_redeemed: PASSED");

        test_claim_lowest_id_first(&$make).await;
        println!("  test_claim_lowest_id_first: PASSED");

        test_claim_unknown_isbn_leaves_pool(&$make).await;
        println!("  test_claim_unknown_isbn_leaves_pool: PASSED");

        test_claim_for_order_once(&$make).await;
        println!("  test_claim_for_order_once: PASSED");

        test_claim_for_order_without_stock(&$make).await;
        println!("  test_claim_for_order_without_stock: PASSED");

        test_find_remove_append(&$make).await;
        println!("  test_find_remove_append: PASSED");

        test_insert_many_and_list(&$make).await;
        println!("  test_insert_many_and_list: PASSED");

        test_delete_all_keeps_redeemed(&$make).await;
        println!("  test_delete_all_keeps_redeemed: PASSED");

        test_delete_one(&$make).await;
        println!("  test_delete_one: PASSED");

        test_ids_not_reused_after_clear(&$make).await;
        println!("  test_ids_not_reused_after_clear: PASSED");
    };
}
