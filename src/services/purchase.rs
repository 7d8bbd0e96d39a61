//! Coin-for-content purchase.
//!
//! One completed purchase per (buyer, item), with the debit, the sales bump,
//! the ledger row and the buyer-catalog clone applied as a single unit. The
//! Postgres implementation takes row locks on the item and the buyer inside
//! one transaction, so two concurrent purchases of the same pair serialize
//! and the second one fails the already-owned check. The unique index on
//! purchases (buyer_id, content_id) backs this at the storage layer.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{ContentItem, Purchase, User};

#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("content not found")]
    ContentNotFound,

    #[error("buyer not found")]
    BuyerNotFound,

    #[error("content is not for sale")]
    NotForSale,

    #[error("authors cannot purchase their own content")]
    SelfPurchase,

    #[error("content already purchased")]
    AlreadyOwned,

    #[error("insufficient coin balance")]
    InsufficientCoins,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    pub purchase: Purchase,
    /// Buyer-owned clone of the purchased item: new identity, price 0,
    /// sales reset, private, source_id pointing at the original
    pub cloned: ContentItem,
}

/// Precondition checks shared by every ledger implementation
pub fn validate(buyer: &User, item: &ContentItem, already_owned: bool) -> Result<(), PurchaseError> {
    if item.price <= 0 {
        return Err(PurchaseError::NotForSale);
    }
    if item.author_id == buyer.id {
        return Err(PurchaseError::SelfPurchase);
    }
    if already_owned {
        return Err(PurchaseError::AlreadyOwned);
    }
    if buyer.coins < item.price {
        return Err(PurchaseError::InsufficientCoins);
    }
    Ok(())
}

#[async_trait]
pub trait PurchaseLedger: Send + Sync {
    async fn purchase(&self, buyer_id: Uuid, content_id: Uuid)
        -> Result<PurchaseOutcome, PurchaseError>;
}

/// Production ledger: one transaction, row locks on item and buyer
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseLedger for PgLedger {
    async fn purchase(
        &self,
        buyer_id: Uuid,
        content_id: Uuid,
    ) -> Result<PurchaseOutcome, PurchaseError> {
        let mut tx = self.pool.begin().await?;

        // Lock order is item then buyer; every purchase path takes the same
        // order so concurrent purchases cannot deadlock
        let item = sqlx::query_as::<_, ContentItem>("SELECT * FROM content WHERE id = $1 FOR UPDATE")
            .bind(content_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(PurchaseError::ContentNotFound)?;

        let buyer = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(buyer_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(PurchaseError::BuyerNotFound)?;

        let prior: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM purchases
            WHERE buyer_id = $1 AND content_id = $2 AND status = 'completed'
            "#,
        )
        .bind(buyer_id)
        .bind(content_id)
        .fetch_one(&mut *tx)
        .await?;

        validate(&buyer, &item, prior > 0)?;

        sqlx::query("UPDATE users SET coins = coins - $1, updated_at = now() WHERE id = $2")
            .bind(item.price)
            .bind(buyer_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE content SET sales = sales + 1, updated_at = now() WHERE id = $1")
            .bind(content_id)
            .execute(&mut *tx)
            .await?;

        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO purchases (id, buyer_id, content_id, price_paid, status)
            VALUES ($1, $2, $3, $4, 'completed')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(buyer_id)
        .bind(content_id)
        .bind(item.price)
        .fetch_one(&mut *tx)
        .await?;

        let cloned = sqlx::query_as::<_, ContentItem>(
            r#"
            INSERT INTO content (id, author_id, title, kind, body, price, is_public, sales, source_id)
            VALUES ($1, $2, $3, $4, $5, 0, false, 0, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(buyer_id)
        .bind(&item.title)
        .bind(&item.kind)
        .bind(&item.body)
        .bind(item.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            buyer = %buyer_id,
            content = %content_id,
            price = item.price,
            "purchase completed"
        );

        Ok(PurchaseOutcome { purchase, cloned })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn user(coins: i64) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: String::new(),
            name: "Test".to_string(),
            role: "parent".to_string(),
            plan: "free".to_string(),
            coins,
            created_at: now,
            updated_at: now,
        }
    }

    fn item(author_id: Uuid, price: i64) -> ContentItem {
        let now = Utc::now();
        ContentItem {
            id: Uuid::new_v4(),
            author_id,
            title: "Counting Stars".to_string(),
            kind: "story".to_string(),
            body: serde_json::json!({}),
            price,
            is_public: true,
            sales: 0,
            source_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn validate_accepts_a_well_formed_purchase() {
        let buyer = user(100);
        let item = item(Uuid::new_v4(), 40);
        assert!(validate(&buyer, &item, false).is_ok());
    }

    #[test]
    fn validate_rejects_free_items() {
        let buyer = user(100);
        let item = item(Uuid::new_v4(), 0);
        assert!(matches!(
            validate(&buyer, &item, false),
            Err(PurchaseError::NotForSale)
        ));
    }

    #[test]
    fn validate_rejects_self_purchase() {
        let buyer = user(100);
        let item = item(buyer.id, 40);
        assert!(matches!(
            validate(&buyer, &item, false),
            Err(PurchaseError::SelfPurchase)
        ));
    }

    #[test]
    fn validate_rejects_repeat_purchase() {
        let buyer = user(100);
        let item = item(Uuid::new_v4(), 40);
        assert!(matches!(
            validate(&buyer, &item, true),
            Err(PurchaseError::AlreadyOwned)
        ));
    }

    #[test]
    fn validate_rejects_insufficient_balance() {
        let buyer = user(39);
        let item = item(Uuid::new_v4(), 40);
        assert!(matches!(
            validate(&buyer, &item, false),
            Err(PurchaseError::InsufficientCoins)
        ));
    }

    /// Ledger over a single mutex-guarded state map; isolation comes from the
    /// lock the way the Postgres ledger gets it from row locks
    struct MemoryLedger {
        state: Mutex<MemoryState>,
    }

    struct MemoryState {
        users: HashMap<Uuid, User>,
        items: HashMap<Uuid, ContentItem>,
        purchases: Vec<Purchase>,
    }

    #[async_trait]
    impl PurchaseLedger for MemoryLedger {
        async fn purchase(
            &self,
            buyer_id: Uuid,
            content_id: Uuid,
        ) -> Result<PurchaseOutcome, PurchaseError> {
            let mut state = self.state.lock().await;

            let item = state
                .items
                .get(&content_id)
                .cloned()
                .ok_or(PurchaseError::ContentNotFound)?;
            let buyer = state
                .users
                .get(&buyer_id)
                .cloned()
                .ok_or(PurchaseError::BuyerNotFound)?;
            let already_owned = state.purchases.iter().any(|p| {
                p.buyer_id == buyer_id && p.content_id == content_id && p.status == "completed"
            });

            validate(&buyer, &item, already_owned)?;

            state.users.get_mut(&buyer_id).unwrap().coins -= item.price;
            state.items.get_mut(&content_id).unwrap().sales += 1;

            let purchase = Purchase {
                id: Uuid::new_v4(),
                buyer_id,
                content_id,
                price_paid: item.price,
                status: "completed".to_string(),
                created_at: Utc::now(),
            };
            state.purchases.push(purchase.clone());

            let cloned = ContentItem {
                id: Uuid::new_v4(),
                author_id: buyer_id,
                price: 0,
                sales: 0,
                is_public: false,
                source_id: Some(item.id),
                ..item
            };
            state.items.insert(cloned.id, cloned.clone());

            Ok(PurchaseOutcome { purchase, cloned })
        }
    }

    #[tokio::test]
    async fn concurrent_double_purchase_completes_exactly_once() {
        let buyer = user(100);
        let buyer_id = buyer.id;
        let item = item(Uuid::new_v4(), 40);
        let content_id = item.id;

        let ledger = Arc::new(MemoryLedger {
            state: Mutex::new(MemoryState {
                users: HashMap::from([(buyer.id, buyer)]),
                items: HashMap::from([(item.id, item)]),
                purchases: Vec::new(),
            }),
        });

        let a = tokio::spawn({
            let ledger = ledger.clone();
            async move { ledger.purchase(buyer_id, content_id).await }
        });
        let b = tokio::spawn({
            let ledger = ledger.clone();
            async move { ledger.purchase(buyer_id, content_id).await }
        });

        let results = [a.await.unwrap(), b.await.unwrap()];
        let completed = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(completed, 1, "exactly one purchase may complete");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(PurchaseError::AlreadyOwned))));

        let state = ledger.state.lock().await;
        assert_eq!(state.users[&buyer_id].coins, 60, "coins debited once");
        assert_eq!(state.items[&content_id].sales, 1);
        assert_eq!(state.purchases.len(), 1);
    }

    #[tokio::test]
    async fn failed_purchase_leaves_no_partial_effect() {
        let buyer = user(10);
        let buyer_id = buyer.id;
        let item = item(Uuid::new_v4(), 40);
        let content_id = item.id;

        let ledger = MemoryLedger {
            state: Mutex::new(MemoryState {
                users: HashMap::from([(buyer.id, buyer)]),
                items: HashMap::from([(item.id, item)]),
                purchases: Vec::new(),
            }),
        };

        let result = ledger.purchase(buyer_id, content_id).await;
        assert!(matches!(result, Err(PurchaseError::InsufficientCoins)));

        let state = ledger.state.lock().await;
        assert_eq!(state.users[&buyer_id].coins, 10);
        assert_eq!(state.items[&content_id].sales, 0);
        assert!(state.purchases.is_empty());
    }
}
