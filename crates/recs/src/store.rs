//! Postgres collaborators.
//!
//! Reads the raw event and product-feature tables and fully replaces
//! the derived tables each run: `product_similarities` is truncated
//! and rebuilt; `user_recommendations` is replaced per user so a
//! failed run never leaves a user with a half-written list.

use sqlx::{PgPool, Row};
use tracing::{debug, info};

use shopmind_core::error::Result;
use shopmind_core::models::{
    Event, EventType, ProductFeatures, SimilarityPair, UserRecommendation,
};

pub struct EventStore {
    pool: PgPool,
}

impl EventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load every tracked event, oldest first. Rows with event types
    /// outside the known vocabulary are skipped.
    pub async fn load_events(&self) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, product_id, event_type, created_at
            FROM user_events
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let event_type_str: String = row.get("event_type");
            let Some(event_type) = EventType::parse(&event_type_str) else {
                debug!(event_type = %event_type_str, "skipping unknown event type");
                continue;
            };
            events.push(Event {
                user_id: row.get("user_id"),
                product_id: row.get("product_id"),
                event_type,
                created_at: row.get("created_at"),
            });
        }
        info!(count = events.len(), "loaded events");
        Ok(events)
    }
}

pub struct FeatureStore {
    pool: PgPool,
}

impl FeatureStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load the aggregated feature text per product. Products without
    /// feature text are excluded; they can still appear on the
    /// collaborative side.
    pub async fn load_product_features(&self) -> Result<Vec<ProductFeatures>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, features_text
            FROM product_features
            WHERE features_text IS NOT NULL AND features_text <> ''
            ORDER BY product_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let features = rows
            .into_iter()
            .map(|row| ProductFeatures {
                product_id: row.get("product_id"),
                features_text: row.get("features_text"),
            })
            .collect::<Vec<_>>();
        info!(count = features.len(), "loaded product features");
        Ok(features)
    }
}

pub struct SimilarityStore {
    pool: PgPool,
}

impl SimilarityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace the whole similarity table with the given canonical
    /// pairs, inserting in batches of `batch_size` rows per
    /// transaction.
    pub async fn replace_all(&self, pairs: &[SimilarityPair], batch_size: usize) -> Result<u64> {
        sqlx::query("TRUNCATE TABLE product_similarities")
            .execute(&self.pool)
            .await?;

        let batch_size = batch_size.max(1);
        let mut written = 0_u64;
        for batch in pairs.chunks(batch_size) {
            let mut tx = self.pool.begin().await?;
            for pair in batch {
                sqlx::query(
                    r#"
                    INSERT INTO product_similarities
                        (product_id_1, product_id_2, score, cf_score, content_score)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(pair.product_id_1)
                .bind(pair.product_id_2)
                .bind(pair.score)
                .bind(pair.cf_score)
                .bind(pair.content_score)
                .execute(&mut *tx)
                .await?;
                written += 1;
            }
            tx.commit().await?;
            debug!(written, total = pairs.len(), "similarity batch committed");
        }
        info!(count = written, "similarity table rebuilt");
        Ok(written)
    }
}

pub struct RecommendationStore {
    pool: PgPool,
}

impl RecommendationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace one user's recommendation list atomically: delete the
    /// old rows and insert the new ranked list in one transaction.
    pub async fn replace_for_user(
        &self,
        user_id: i64,
        recommendations: &[UserRecommendation],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_recommendations WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        for (position, rec) in recommendations.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO user_recommendations (user_id, product_id, score, position)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(rec.user_id)
            .bind(rec.product_id)
            .bind(rec.score)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Persist recommendations grouped per user. Input must already be
    /// ranked within each user.
    pub async fn save_all(&self, recommendations: &[UserRecommendation]) -> Result<u64> {
        let mut written = 0_u64;
        let mut start = 0;
        while start < recommendations.len() {
            let user_id = recommendations[start].user_id;
            let mut end = start;
            while end < recommendations.len() && recommendations[end].user_id == user_id {
                end += 1;
            }
            self.replace_for_user(user_id, &recommendations[start..end]).await?;
            written += (end - start) as u64;
            start = end;
        }
        info!(count = written, "recommendations saved");
        Ok(written)
    }
}
