//! Boarder authentication for the self-service portal.
//!
//! Each boarder holds a short access code (see [`crate::access`]). Portal requests present it in
//! the `X-Access-Code` header, and [`current_boarder::CurrentBoarder`] resolves it to the active
//! boarder. Unknown codes and codes of boarders who have moved out yield `401 Unauthorized`.
//!
//! The management API under `/api/v1` carries no authentication of its own and is expected to
//! sit behind the operator's network boundary.

pub mod current_boarder;
