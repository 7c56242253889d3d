//! Issues one code per completed order.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::allocator::{AllocateError, Allocator};
use crate::model::RedeemedCode;
use crate::notifier::Notifier;
use crate::settings::SettingsService;

use super::{Order, OrderCompletionHandler, OrderError, OrderOutcome, OrderSource};

/// Order-completion handler that allocates and mails redemption codes.
///
/// Items are visited in order; the first qualifying item with stock wins
/// and the rest of the order is ignored. Only one code is issued per order.
pub struct CodeIssuer {
    orders: Arc<dyn OrderSource>,
    allocator: Allocator,
    notifier: Notifier,
    settings: SettingsService,
    qualifying_category: String,
}

impl CodeIssuer {
    pub fn new(
        orders: Arc<dyn OrderSource>,
        allocator: Allocator,
        notifier: Notifier,
        settings: SettingsService,
        qualifying_category: impl Into<String>,
    ) -> Self {
        Self {
            orders,
            allocator,
            notifier,
            settings,
            qualifying_category: qualifying_category.into(),
        }
    }

    /// Try each qualifying item until one yields a code. The claim also
    /// records the order, so at most one code is ever issued per order.
    async fn issue(&self, order: &Order) -> Option<RedeemedCode> {
        let isbns = order
            .items
            .iter()
            .filter_map(|item| item.product.as_ref())
            .filter(|product| product.in_category(&self.qualifying_category))
            .map(|product| product.sku.as_str());

        for isbn in isbns {
            match self.allocator.allocate_for_order(order.id, isbn).await {
                Ok(redeemed) => return Some(redeemed),
                Err(AllocateError::NotFound { .. }) => continue,
                Err(AllocateError::AlreadyIssued { .. }) => {
                    info!(order_id = order.id, "order already received a code");
                    return None;
                }
                Err(e) => {
                    error!(order_id = order.id, isbn, error = %e, "allocation failed");
                    continue;
                }
            }
        }
        None
    }

    async fn notify(&self, order: &Order, redeemed: &RedeemedCode) {
        self.notifier
            .notify_buyer(&order.billing_email, &redeemed.code)
            .await;

        let remaining = match self.allocator.remaining().await {
            Ok(remaining) => remaining,
            Err(e) => {
                warn!(order_id = order.id, error = %e, "could not count remaining codes");
                return;
            }
        };

        let current = self.settings.load().await;
        self.notifier
            .maybe_notify_low_stock(
                remaining,
                current.notification_threshold,
                current.admin_destination(self.settings.defaults()),
            )
            .await;
    }
}

#[async_trait]
impl OrderCompletionHandler for CodeIssuer {
    async fn on_order_completed(&self, order_id: u64) -> Result<OrderOutcome, OrderError> {
        match self.allocator.order_issued(order_id).await {
            Ok(true) => {
                info!(order_id, "order already received a code");
                return Ok(OrderOutcome::NothingIssued);
            }
            Ok(false) => {}
            // The claim re-checks inside its transaction.
            Err(e) => warn!(order_id, error = %e, "could not check order history"),
        }

        let Some(order) = self.orders.fetch_order(order_id).await? else {
            warn!(order_id, "completed order not found");
            return Ok(OrderOutcome::NothingIssued);
        };

        if !order.is_completed() {
            warn!(order_id, status = %order.status, "order is not completed");
            return Ok(OrderOutcome::NothingIssued);
        }

        match self.issue(&order).await {
            Some(redeemed) => {
                info!(order_id, code_id = redeemed.id, isbn = %redeemed.isbn, "issued code for order");
                self.notify(&order, &redeemed).await;
                Ok(OrderOutcome::Issued(redeemed))
            }
            None => {
                info!(order_id, "no code issued for order");
                Ok(OrderOutcome::NothingIssued)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::MockMailTransport;
    use crate::model::NewCode;
    use crate::notifier::{BUYER_SUBJECT, LOW_STOCK_SUBJECT};
    use crate::orders::{InMemoryOrderSource, LineItem, Product};
    use crate::settings::{SettingsDefaults, KEY_NOTIFICATION_THRESHOLD};
    use crate::storage::{CodeStore, MockCodeStore, MockSettingsStore, SettingsStore};

    struct Harness {
        issuer: CodeIssuer,
        codes: Arc<MockCodeStore>,
        settings: Arc<MockSettingsStore>,
        orders: Arc<InMemoryOrderSource>,
        mailer: Arc<MockMailTransport>,
    }

    async fn harness(codes: Vec<NewCode>) -> Harness {
        let codes = Arc::new(MockCodeStore::with_codes(codes).await);
        let settings = Arc::new(MockSettingsStore::new());
        let orders = Arc::new(InMemoryOrderSource::new());
        let mailer = Arc::new(MockMailTransport::new());
        let svc = SettingsService::new(
            settings.clone(),
            SettingsDefaults {
                admin_email: "admin@example.com".to_string(),
                ..SettingsDefaults::default()
            },
        );
        let issuer = CodeIssuer::new(
            orders.clone(),
            Allocator::new(codes.clone()),
            Notifier::new(mailer.clone(), svc.clone()),
            svc,
            "e-learning",
        );
        Harness {
            issuer,
            codes,
            settings,
            orders,
            mailer,
        }
    }

    fn item(sku: &str, category: &str) -> LineItem {
        LineItem {
            name: format!("Product {sku}"),
            product: Some(Product {
                id: 1,
                sku: sku.to_string(),
                categories: vec![category.to_string()],
            }),
        }
    }

    fn order(id: u64, items: Vec<LineItem>) -> Order {
        Order {
            id,
            status: "completed".to_string(),
            billing_email: "buyer@example.com".to_string(),
            items,
        }
    }

    #[tokio::test]
    async fn test_one_code_per_order_with_multiple_qualifying_items() {
        let h = harness(vec![
            NewCode::new("A1", "E", "T", "111"),
            NewCode::new("B1", "E", "T", "222"),
        ])
        .await;
        h.orders
            .insert(order(1, vec![item("111", "e-learning"), item("222", "e-learning")]))
            .await;

        let outcome = h.issuer.on_order_completed(1).await.unwrap();

        assert!(matches!(outcome, OrderOutcome::Issued(ref r) if r.code == "A1"));
        assert_eq!(h.codes.count_available().await.unwrap(), 1);
        assert_eq!(h.codes.list_redeemed().await.unwrap().len(), 1);
        assert_eq!(h.mailer.sent_to("buyer@example.com").await.len(), 1);
    }

    #[tokio::test]
    async fn test_skips_items_without_stock_and_other_categories() {
        let h = harness(vec![
            NewCode::new("P1", "E", "T", "333"),
            NewCode::new("B1", "E", "T", "222"),
        ])
        .await;
        h.orders
            .insert(order(
                2,
                vec![
                    LineItem {
                        name: "deleted".to_string(),
                        product: None,
                    },
                    item("333", "paper-books"),
                    item("111", "e-learning"),
                    item("222", "e-learning"),
                ],
            ))
            .await;

        let outcome = h.issuer.on_order_completed(2).await.unwrap();

        assert!(matches!(outcome, OrderOutcome::Issued(ref r) if r.code == "B1"));
        let left: Vec<_> = h
            .codes
            .list_available()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.code)
            .collect();
        assert_eq!(left, vec!["P1"]);
    }

    #[tokio::test]
    async fn test_no_stock_completes_silently() {
        let h = harness(vec![]).await;
        h.orders.insert(order(3, vec![item("111", "e-learning")])).await;

        let outcome = h.issuer.on_order_completed(3).await.unwrap();

        assert_eq!(outcome, OrderOutcome::NothingIssued);
        assert!(h.mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_order_is_nothing_issued() {
        let h = harness(vec![NewCode::new("A1", "E", "T", "111")]).await;
        assert_eq!(
            h.issuer.on_order_completed(404).await.unwrap(),
            OrderOutcome::NothingIssued
        );
        assert_eq!(h.codes.count_available().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_low_stock_alert_when_remaining_hits_threshold() {
        let h = harness(vec![
            NewCode::new("A1", "E", "T", "111"),
            NewCode::new("A2", "E", "T", "111"),
            NewCode::new("A3", "E", "T", "111"),
        ])
        .await;
        h.orders.insert(order(4, vec![item("111", "e-learning")])).await;

        // Default threshold 2: 3 -> 2 remaining triggers the alert.
        h.issuer.on_order_completed(4).await.unwrap();
        let alerts = h.mailer.sent_to("admin@example.com").await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].subject, LOW_STOCK_SUBJECT);

        // 2 -> 1 remaining: below threshold, no second alert.
        h.orders.insert(order(5, vec![item("111", "e-learning")])).await;
        h.issuer.on_order_completed(5).await.unwrap();
        assert_eq!(h.mailer.sent_to("admin@example.com").await.len(), 1);
    }

    #[tokio::test]
    async fn test_replayed_completion_issues_nothing() {
        let h = harness(vec![
            NewCode::new("A1", "E", "T", "111"),
            NewCode::new("A2", "E", "T", "111"),
            NewCode::new("A3", "E", "T", "111"),
        ])
        .await;
        h.orders.insert(order(8, vec![item("111", "e-learning")])).await;

        let first = h.issuer.on_order_completed(8).await.unwrap();
        assert!(matches!(first, OrderOutcome::Issued(_)));

        for _ in 0..2 {
            assert_eq!(
                h.issuer.on_order_completed(8).await.unwrap(),
                OrderOutcome::NothingIssued
            );
        }
        assert_eq!(h.codes.count_available().await.unwrap(), 2);
        assert_eq!(h.codes.list_redeemed().await.unwrap().len(), 1);
        assert_eq!(h.mailer.sent_to("buyer@example.com").await.len(), 1);
    }

    #[tokio::test]
    async fn test_order_not_completed_issues_nothing() {
        let h = harness(vec![NewCode::new("A1", "E", "T", "111")]).await;
        let mut pending = order(9, vec![item("111", "e-learning")]);
        pending.status = "processing".to_string();
        h.orders.insert(pending).await;

        assert_eq!(
            h.issuer.on_order_completed(9).await.unwrap(),
            OrderOutcome::NothingIssued
        );
        assert_eq!(h.codes.count_available().await.unwrap(), 1);
        assert!(h.mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_fail_order() {
        let h = harness(vec![NewCode::new("A1", "E", "T", "111")]).await;
        h.codes.set_fail_on_claim(true).await;
        h.orders.insert(order(6, vec![item("111", "e-learning")])).await;

        assert_eq!(
            h.issuer.on_order_completed(6).await.unwrap(),
            OrderOutcome::NothingIssued
        );
    }

    #[tokio::test]
    async fn test_count_failure_still_mails_buyer() {
        let h = harness(vec![NewCode::new("A1", "E", "T", "111")]).await;
        h.codes.set_fail_on_count(true).await;
        h.settings.put(KEY_NOTIFICATION_THRESHOLD, "0").await.unwrap();
        h.orders.insert(order(7, vec![item("111", "e-learning")])).await;

        h.issuer.on_order_completed(7).await.unwrap();

        let sent = h.mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, BUYER_SUBJECT);
    }
}
