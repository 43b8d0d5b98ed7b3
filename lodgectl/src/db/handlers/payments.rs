//! Database repository for payments.
//!
//! The stored status is one of PENDING, PAID or CANCELLED. Filtering by OVERDUE is translated into
//! "pending and due before today" so listings agree with [`display_status`].

use crate::{
    billing::payments::{PaymentFilter, display_status},
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::payments::{Payment, PaymentCreateDBRequest, PaymentDBResponse, PaymentStatus, PaymentUpdateDBRequest},
    },
    types::{BoarderId, Operation, PaymentId, abbrev_uuid},
};
use chrono::NaiveDate;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Paginated listing filter. `today` anchors the derived OVERDUE status.
#[derive(Debug, Clone)]
pub struct PaymentListFilter {
    pub skip: i64,
    pub limit: i64,
    pub criteria: PaymentFilter,
    pub today: NaiveDate,
}

impl PaymentListFilter {
    pub fn new(skip: i64, limit: i64, today: NaiveDate) -> Self {
        Self {
            skip,
            limit,
            criteria: PaymentFilter::default(),
            today,
        }
    }

    fn push_conditions(&self, query: &mut QueryBuilder<'_, Postgres>) {
        let criteria = &self.criteria;
        match criteria.status {
            Some(PaymentStatus::Overdue) => {
                query.push(" AND status = 'PENDING' AND due_date < ");
                query.push_bind(self.today);
            }
            Some(PaymentStatus::Pending) => {
                query.push(" AND status = 'PENDING' AND due_date >= ");
                query.push_bind(self.today);
            }
            Some(status) => {
                query.push(" AND status = ");
                query.push_bind(status);
            }
            None => {}
        }
        if let Some(payment_type) = criteria.payment_type {
            query.push(" AND payment_type = ");
            query.push_bind(payment_type);
        }
        if let Some(boarder_id) = criteria.boarder_id {
            query.push(" AND boarder_id = ");
            query.push_bind(boarder_id);
        }
        if let Some(due_from) = criteria.due_from {
            query.push(" AND due_date >= ");
            query.push_bind(due_from);
        }
        if let Some(due_to) = criteria.due_to {
            query.push(" AND due_date <= ");
            query.push_bind(due_to);
        }
        if let Some(search) = criteria.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let search_pattern = format!("%{}%", search.to_lowercase());
            query.push(" AND (LOWER(COALESCE(description, '')) LIKE ");
            query.push_bind(search_pattern.clone());
            query.push(" OR LOWER(COALESCE(receipt_number, '')) LIKE ");
            query.push_bind(search_pattern);
            query.push(")");
        }
    }
}

pub struct Payments<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Payments<'c> {
    type CreateRequest = PaymentCreateDBRequest;
    type UpdateRequest = PaymentUpdateDBRequest;
    type Response = PaymentDBResponse;
    type Id = PaymentId;
    type Filter = PaymentListFilter;

    #[instrument(skip(self, request), fields(boarder_id = %abbrev_uuid(&request.boarder_id), amount = %request.amount), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                id, boarder_id, amount, payment_type, status, due_date, paid_date, receipt_number, description
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.boarder_id)
        .bind(request.amount)
        .bind(request.payment_type)
        .bind(request.status)
        .bind(request.due_date)
        .bind(request.paid_date)
        .bind(&request.receipt_number)
        .bind(&request.description)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(payment)
    }

    #[instrument(skip(self), fields(payment_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(payment)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<PaymentId>) -> Result<HashMap<Self::Id, PaymentDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let payments = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(payments.into_iter().map(|p| (p.id, p)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM payments WHERE 1=1");
        filter.push_conditions(&mut query);

        query.push(" ORDER BY due_date DESC, created_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let payments = query.build_query_as::<Payment>().fetch_all(&mut *self.db).await?;
        Ok(payments)
    }

    #[instrument(skip(self), fields(payment_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Edits a pending payment. Paid and cancelled payments are refused.
    #[instrument(skip(self, request), fields(payment_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments SET
                amount = COALESCE($2, amount),
                payment_type = COALESCE($3, payment_type),
                due_date = COALESCE($4, due_date),
                description = CASE WHEN $5 THEN $6 ELSE description END,
                updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.amount)
        .bind(request.payment_type)
        .bind(request.due_date)
        .bind(request.description.is_some())
        .bind(request.description.clone().flatten())
        .fetch_optional(&mut *self.db)
        .await?;

        match payment {
            Some(payment) => Ok(payment),
            None => Err(self.refusal(id, "only pending payments can be edited").await?),
        }
    }
}

impl<'c> Payments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Count payments matching the filter
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &PaymentListFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM payments WHERE 1=1");
        filter.push_conditions(&mut query);

        let count: (i64,) = query.build_query_as().fetch_one(&mut *self.db).await?;
        Ok(count.0)
    }

    /// Every payment, optionally for a single boarder, for aggregate statistics
    #[instrument(skip(self), err)]
    pub async fn list_all(&mut self, boarder_id: Option<BoarderId>) -> Result<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE ($1::uuid IS NULL OR boarder_id = $1) ORDER BY due_date ASC",
        )
        .bind(boarder_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(payments)
    }

    /// Settles a pending payment. Paid and cancelled payments are left untouched.
    ///
    /// A receipt number already on the payment is kept.
    #[instrument(skip(self, receipt_number), fields(payment_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_paid(&mut self, id: PaymentId, paid_date: NaiveDate, receipt_number: &str) -> Result<Payment> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments SET
                status = 'PAID',
                paid_date = $2,
                receipt_number = COALESCE(receipt_number, $3),
                updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(paid_date)
        .bind(receipt_number)
        .fetch_optional(&mut *self.db)
        .await?;

        match payment {
            Some(payment) => Ok(payment),
            None => Err(self.refusal(id, "only pending payments can be marked as paid").await?),
        }
    }

    /// Cancels a payment that has not been paid
    #[instrument(skip(self), fields(payment_id = %abbrev_uuid(&id)), err)]
    pub async fn cancel(&mut self, id: PaymentId) -> Result<Payment> {
        let payment = sqlx::query_as::<_, Payment>(
            "UPDATE payments SET status = 'CANCELLED', updated_at = NOW() WHERE id = $1 AND status <> 'PAID' RETURNING *",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        match payment {
            Some(payment) => Ok(payment),
            None => Err(self.refusal(id, "paid payments cannot be cancelled").await?),
        }
    }

    /// Explains why a conditional update matched no row
    async fn refusal(&mut self, id: PaymentId, reason: &str) -> Result<DbError> {
        let Some(payment) = self.get_by_id(id).await? else {
            return Ok(DbError::NotFound);
        };
        let today = chrono::Utc::now().date_naive();
        Ok(DbError::ProtectedEntity {
            operation: Operation::Update,
            reason: format!("{reason} (payment is {:?})", display_status(payment.status, payment.due_date, today)),
            entity_type: "payment".to_string(),
            entity_id: Some(id.to_string()),
        })
    }
}
