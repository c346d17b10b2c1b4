//! Database transaction utilities
//!
//! Multi-row writes that must land together (e.g. all locations of one
//! instance) go through `TransactionGuard`.

use sqlx::{PgPool, Postgres, Transaction};
use std::ops::{Deref, DerefMut};
use stowage_core::AppError;

/// A database transaction that must be committed explicitly.
///
/// Dropping the guard without calling [`TransactionGuard::commit`] rolls the
/// transaction back (sqlx issues the rollback when the connection returns to the pool).
///
/// ```ignore
/// let mut tx = TransactionGuard::begin(&pool).await?;
/// sqlx::query("INSERT INTO ...").execute(&mut **tx).await?;
/// tx.commit().await?;
/// ```
pub struct TransactionGuard {
    transaction: Transaction<'static, Postgres>,
}

impl TransactionGuard {
    pub async fn begin(pool: &PgPool) -> Result<Self, AppError> {
        let transaction = pool.begin().await?;
        Ok(Self { transaction })
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.transaction.commit().await?;
        Ok(())
    }
}

impl Deref for TransactionGuard {
    type Target = Transaction<'static, Postgres>;

    fn deref(&self) -> &Self::Target {
        &self.transaction
    }
}

impl DerefMut for TransactionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.transaction
    }
}
