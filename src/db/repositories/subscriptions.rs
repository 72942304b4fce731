use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::db::{
    helpers::{format_optional_date, parse_billing_cycle, parse_datetime, parse_optional_date},
    models::{Subscription, SubscriptionInput},
    Database,
};

use super::SubscriptionStore;

const SELECT_COLUMNS: &str = "SELECT id, name, service_name, category, amount, currency,
        billing_cycle, next_billing_date, is_active, payment_method, notes,
        usage_percentage, is_essential, created_at, updated_at
     FROM subscriptions";

fn row_to_subscription(row: &Row) -> Result<Subscription> {
    let id: String = row.get("id")?;
    let billing_cycle: String = row.get("billing_cycle")?;
    let next_billing_date: Option<String> = row.get("next_billing_date")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Subscription {
        name: row.get("name")?,
        service_name: row.get("service_name")?,
        category: row.get("category")?,
        amount: row.get("amount")?,
        currency: row.get("currency")?,
        billing_cycle: parse_billing_cycle(&billing_cycle, &id),
        next_billing_date: parse_optional_date(next_billing_date, "next_billing_date", &id),
        is_active: row.get("is_active")?,
        payment_method: row.get("payment_method")?,
        notes: row.get("notes")?,
        usage_percentage: row.get("usage_percentage")?,
        is_essential: row.get("is_essential")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
        id,
    })
}

fn fetch_by_id(conn: &Connection, id: &str) -> Result<Option<Subscription>> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
    let mut rows = stmt.query(params![id])?;
    let subscription = match rows.next()? {
        Some(row) => Some(row_to_subscription(row)?),
        None => None,
    };
    Ok(subscription)
}

impl Database {
    pub async fn insert_subscription(&self, input: SubscriptionInput) -> Result<Subscription> {
        self.execute(move |conn| {
            let record = Subscription::from_input(input, Utc::now());
            conn.execute(
                "INSERT INTO subscriptions (id, name, service_name, category, amount, currency,
                     billing_cycle, next_billing_date, is_active, payment_method, notes,
                     usage_percentage, is_essential, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    record.id,
                    record.name,
                    record.service_name,
                    record.category,
                    record.amount,
                    record.currency,
                    record.billing_cycle.as_str(),
                    format_optional_date(record.next_billing_date),
                    record.is_active,
                    record.payment_method,
                    record.notes,
                    record.usage_percentage,
                    record.is_essential,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert subscription")?;
            Ok(record)
        })
        .await
    }

    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS}
                 ORDER BY next_billing_date IS NULL, next_billing_date ASC, created_at ASC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut subscriptions = Vec::new();
            while let Some(row) = rows.next()? {
                subscriptions.push(row_to_subscription(row)?);
            }

            Ok(subscriptions)
        })
        .await
    }

    pub async fn get_subscription(&self, id: &str) -> Result<Option<Subscription>> {
        let id = id.to_string();
        self.execute(move |conn| fetch_by_id(conn, &id)).await
    }

    /// Overwrite the editable fields; the active flag and creation time are left alone.
    pub async fn update_subscription(
        &self,
        id: &str,
        input: SubscriptionInput,
    ) -> Result<Option<Subscription>> {
        let id = id.to_string();
        self.execute(move |conn| {
            let now = Utc::now();
            let rows_affected = conn
                .execute(
                    "UPDATE subscriptions
                     SET name = ?1,
                         service_name = ?2,
                         category = ?3,
                         amount = ?4,
                         currency = ?5,
                         billing_cycle = ?6,
                         next_billing_date = ?7,
                         payment_method = ?8,
                         notes = ?9,
                         usage_percentage = ?10,
                         is_essential = ?11,
                         updated_at = ?12
                     WHERE id = ?13",
                    params![
                        input.name,
                        input.service_name,
                        input.category,
                        input.amount,
                        input.currency,
                        input.billing_cycle.as_str(),
                        format_optional_date(input.next_billing_date),
                        input.payment_method,
                        input.notes,
                        input.usage_percentage,
                        input.is_essential,
                        now.to_rfc3339(),
                        id,
                    ],
                )
                .with_context(|| format!("failed to update subscription {id}"))?;

            if rows_affected == 0 {
                return Ok(None);
            }
            fetch_by_id(conn, &id)
        })
        .await
    }

    pub async fn delete_subscription(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute("DELETE FROM subscriptions WHERE id = ?1", params![id])
                .with_context(|| format!("failed to delete subscription {id}"))?;
            Ok(rows_affected > 0)
        })
        .await
    }

    pub async fn set_subscription_active(
        &self,
        id: &str,
        active: bool,
    ) -> Result<Option<Subscription>> {
        let id = id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute(
                    "UPDATE subscriptions
                     SET is_active = ?1,
                         updated_at = ?2
                     WHERE id = ?3",
                    params![active, Utc::now().to_rfc3339(), id],
                )
                .with_context(|| format!("failed to update active flag for {id}"))?;

            if rows_affected == 0 {
                return Ok(None);
            }
            fetch_by_id(conn, &id)
        })
        .await
    }

    /// Number of active records; cheap check used at startup logging.
    pub async fn count_active_subscriptions(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM subscriptions WHERE is_active = 1",
                [],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}

#[async_trait]
impl SubscriptionStore for Database {
    async fn list_all(&self) -> Result<Vec<Subscription>> {
        self.list_subscriptions().await
    }

    async fn get(&self, id: &str) -> Result<Option<Subscription>> {
        self.get_subscription(id).await
    }

    async fn create(&self, input: SubscriptionInput) -> Result<Subscription> {
        self.insert_subscription(input).await
    }

    async fn update(&self, id: &str, input: SubscriptionInput) -> Result<Option<Subscription>> {
        self.update_subscription(id, input).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.delete_subscription(id).await
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<Option<Subscription>> {
        self.set_subscription_active(id, active).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use crate::db::models::BillingCycle;

    fn input(name: &str, amount: f64, next: Option<NaiveDate>) -> SubscriptionInput {
        SubscriptionInput {
            name: name.into(),
            service_name: name.into(),
            category: Some("Entertainment".into()),
            amount,
            currency: "USD".into(),
            billing_cycle: BillingCycle::Monthly,
            next_billing_date: next,
            payment_method: "Credit Card".into(),
            notes: None,
            usage_percentage: Some(85.0),
            is_essential: false,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[tokio::test]
    async fn create_then_get_returns_same_record() {
        let db = Database::in_memory().expect("db");
        let created = db
            .create(input("Netflix", 15.99, date(2026, 11, 2)))
            .await
            .expect("create");

        let fetched = db.get(&created.id).await.expect("get").expect("present");
        assert_eq!(fetched.name, "Netflix");
        assert_eq!(fetched.amount, 15.99);
        assert_eq!(fetched.next_billing_date, date(2026, 11, 2));
        assert_eq!(fetched.usage_percentage, Some(85.0));
        assert!(fetched.is_active);
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[tokio::test]
    async fn list_all_sorts_by_next_billing_date_with_missing_dates_last() {
        let db = Database::in_memory().expect("db");
        db.create(input("Later", 1.0, date(2026, 12, 1))).await.expect("create");
        db.create(input("Undated", 1.0, None)).await.expect("create");
        db.create(input("Sooner", 1.0, date(2026, 10, 20))).await.expect("create");

        let names: Vec<String> = db
            .list_all()
            .await
            .expect("list")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Sooner", "Later", "Undated"]);
    }

    async fn backdate_updated_at(db: &Database, id: &str) -> chrono::DateTime<Utc> {
        let stamp = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let id = id.to_string();
        db.execute(move |conn| {
            conn.execute(
                "UPDATE subscriptions SET updated_at = ?1 WHERE id = ?2",
                params![stamp.to_rfc3339(), id],
            )?;
            Ok(())
        })
        .await
        .expect("backdate");
        stamp
    }

    #[tokio::test]
    async fn update_keeps_identity_and_refreshes_updated_at() {
        let db = Database::in_memory().expect("db");
        let created = db.create(input("Spotify", 9.99, None)).await.expect("create");
        db.set_active(&created.id, false).await.expect("deactivate");
        let stale = backdate_updated_at(&db, &created.id).await;

        let mut changed = input("Spotify Family", 16.99, date(2026, 11, 5));
        changed.billing_cycle = BillingCycle::Yearly;
        let updated = db
            .update(&created.id, changed)
            .await
            .expect("update")
            .expect("present");

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > stale);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.name, "Spotify Family");
        assert_eq!(updated.billing_cycle, BillingCycle::Yearly);
        assert!(!updated.is_active, "update must not touch the active flag");
    }

    #[tokio::test]
    async fn unknown_ids_report_absence() {
        let db = Database::in_memory().expect("db");
        assert!(db.update("missing", input("X", 1.0, None)).await.expect("update").is_none());
        assert!(!db.delete("missing").await.expect("delete"));
        assert!(db.set_active("missing", true).await.expect("set_active").is_none());
        assert!(db.get("missing").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let db = Database::in_memory().expect("db");
        let created = db.create(input("Hulu", 7.99, None)).await.expect("create");
        assert!(db.delete(&created.id).await.expect("delete"));
        assert!(db.list_all().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn set_active_flips_flag_and_counts() {
        let db = Database::in_memory().expect("db");
        let a = db.create(input("A", 1.0, None)).await.expect("create");
        db.create(input("B", 1.0, None)).await.expect("create");
        assert_eq!(db.count_active_subscriptions().await.expect("count"), 2);

        let stale = backdate_updated_at(&db, &a.id).await;
        let toggled = db
            .set_active(&a.id, false)
            .await
            .expect("set_active")
            .expect("present");
        assert!(!toggled.is_active);
        assert!(toggled.updated_at > stale);
        assert_eq!(toggled.created_at, a.created_at);
        assert_eq!(db.count_active_subscriptions().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn legacy_free_text_cycle_reads_as_monthly() {
        let db = Database::in_memory().expect("db");
        let created = db.create(input("Gym", 30.0, None)).await.expect("create");
        let id = created.id.clone();
        db.execute(move |conn| {
            conn.execute(
                "UPDATE subscriptions SET billing_cycle = 'Weekly' WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .expect("corrupt cycle");

        let fetched = db.get(&created.id).await.expect("get").expect("present");
        assert_eq!(fetched.billing_cycle, BillingCycle::Monthly);
    }

    #[tokio::test]
    async fn unreadable_stored_date_does_not_block_listing() {
        let db = Database::in_memory().expect("db");
        let broken = db
            .create(input("Broken", 5.0, date(2026, 11, 1)))
            .await
            .expect("create");
        db.create(input("Fine", 5.0, date(2026, 11, 2)))
            .await
            .expect("create");
        let id = broken.id.clone();
        db.execute(move |conn| {
            conn.execute(
                "UPDATE subscriptions SET next_billing_date = 'next tuesday' WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .expect("corrupt date");

        let records = db.list_all().await.expect("list");
        assert_eq!(records.len(), 2);
        let fetched = records
            .iter()
            .find(|r| r.id == broken.id)
            .expect("broken row still listed");
        assert_eq!(fetched.next_billing_date, None);
    }

    #[tokio::test]
    async fn negative_amounts_are_refused_by_the_schema() {
        let db = Database::in_memory().expect("db");
        assert!(db.create(input("Broken", -1.0, None)).await.is_err());
    }
}
