//! PostgreSQL persistence through SQLx.
//!
//! - [`models`]: row structs and the create/update requests the repositories accept
//! - [`handlers`]: one repository per table, built over a borrowed `PgConnection`
//! - [`errors`]: [`errors::DbError`], the constraint-aware error every repository returns
//!
//! Repositories never own a pool. The caller picks a pooled connection for reads or a transaction
//! when several writes must land together:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! Boarders::new(&mut tx).move_out(boarder_id, today).await?;
//! tx.commit().await?;
//! ```
//!
//! Writes that change how many active boarders a room has lock the room row, recount and store the
//! derived status before returning. The schema is embedded from `migrations/` and applied by
//! [`crate::migrator`] on startup.

pub mod errors;
pub mod handlers;
pub mod models;
