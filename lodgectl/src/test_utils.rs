//! Fixtures for handler and integration tests.

use crate::access::generate_access_code;
use crate::config::{Config, DatabaseConfig, PoolSettings};
use crate::db::{
    handlers::{Boarders, Payments, Repository, Rooms},
    models::{
        boarders::{Boarder, BoarderCreateDBRequest},
        payments::{Payment, PaymentCreateDBRequest, PaymentType},
        rooms::{Room, RoomCreateDBRequest},
    },
};
use crate::types::{BoarderId, RoomId};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

pub async fn create_test_app(pool: PgPool) -> TestServer {
    let config = create_test_config();

    crate::Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application")
        .into_test_server()
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig {
            // The pool comes from #[sqlx::test]
            url: "unused".to_string(),
            pool: PoolSettings {
                max_connections: 1,
                min_connections: 1,
                ..Default::default()
            },
        },
        ..Default::default()
    }
}

pub async fn create_test_room(pool: &PgPool, room_number: &str, capacity: i32) -> Room {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let request = RoomCreateDBRequest::builder()
        .room_number(room_number.to_string())
        .floor(1)
        .capacity(capacity)
        .monthly_rate(Decimal::new(3500, 0))
        .amenities(vec!["wifi".to_string()])
        .build();

    Rooms::new(&mut conn)
        .create(&request)
        .await
        .expect("Failed to create test room")
        .room
}

pub async fn create_test_boarder(pool: &PgPool, email: &str, room_id: Option<RoomId>) -> Boarder {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let request = BoarderCreateDBRequest::builder()
        .first_name("Test".to_string())
        .last_name("Boarder".to_string())
        .email(email.to_lowercase())
        .phone("09171234567".to_string())
        .move_in_date(Utc::now().date_naive() - Duration::days(30))
        .maybe_room_id(room_id)
        .access_code(generate_access_code(8))
        .build();

    Boarders::new(&mut conn)
        .create(&request)
        .await
        .expect("Failed to create test boarder")
}

/// A pending rent payment due a week from today.
pub async fn create_test_payment(pool: &PgPool, boarder_id: BoarderId, amount: i64) -> Payment {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let request = PaymentCreateDBRequest::builder()
        .boarder_id(boarder_id)
        .amount(Decimal::new(amount, 0))
        .payment_type(PaymentType::Rent)
        .due_date(Utc::now().date_naive() + Duration::days(7))
        .build();

    Payments::new(&mut conn)
        .create(&request)
        .await
        .expect("Failed to create test payment")
}
