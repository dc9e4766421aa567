use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;
use boxoffice_core::repository::{BookingRepository, Cancellation, RepoResult};
use boxoffice_shared::{Booking, BookingDetails, BookingFilter, BookingStatus, Event, EventSummary};

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const EVENT_COLUMNS: &str = "id, total_tickets, available_tickets, created_at, updated_at, deleted_at";
const BOOKING_COLUMNS: &str = "id, event_id, user_id, status, created_at, updated_at, deleted_at";

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    total_tickets: i32,
    available_tickets: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            total_tickets: row.total_tickets,
            available_tickets: row.available_tickets,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    event_id: Uuid,
    user_id: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = String;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            event_id: row.event_id,
            user_id: row.user_id,
            status: row.status.parse::<BookingStatus>()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookingDetailsRow {
    #[sqlx(flatten)]
    booking: BookingRow,
    event_total_tickets: Option<i32>,
    event_available_tickets: Option<i32>,
}

impl TryFrom<BookingDetailsRow> for BookingDetails {
    type Error = String;

    fn try_from(row: BookingDetailsRow) -> Result<Self, Self::Error> {
        let event_id = row.booking.event_id;
        let event = match (row.event_total_tickets, row.event_available_tickets) {
            (Some(total_tickets), Some(available_tickets)) => Some(EventSummary {
                id: event_id,
                total_tickets,
                available_tickets,
            }),
            _ => None,
        };

        Ok(BookingDetails {
            booking: Booking::try_from(row.booking)?,
            event,
        })
    }
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn create_event(&self, event: &Event) -> RepoResult<Event> {
        let row: EventRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO events (id, total_tickets, available_tickets, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(event.id)
        .bind(event.total_tickets)
        .bind(event.available_tickets)
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_event(&self, id: Uuid) -> RepoResult<Option<Event>> {
        let row: Option<EventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM events WHERE id = $1 AND deleted_at IS NULL",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Event::from))
    }

    async fn save_event(&self, event: &Event) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET total_tickets = $2, available_tickets = $3, deleted_at = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(event.id)
        .bind(event.total_tickets)
        .bind(event.available_tickets)
        .bind(event.deleted_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(format!("Event {} does not exist", event.id).into());
        }
        Ok(())
    }

    async fn create_booking(
        &self,
        event_id: Uuid,
        user_id: &str,
        status: BookingStatus,
    ) -> RepoResult<Booking> {
        let row: BookingRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO bookings (id, event_id, user_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(event_id)
        .bind(user_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(Booking::try_from(row)?)
    }

    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE id = $1 AND deleted_at IS NULL",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Booking::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn soft_delete_booking(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'CANCELED', deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> RepoResult<Vec<BookingDetails>> {
        let rows: Vec<BookingDetailsRow> = sqlx::query_as(
            r#"
            SELECT b.id, b.event_id, b.user_id, b.status, b.created_at, b.updated_at, b.deleted_at,
                   e.total_tickets AS event_total_tickets,
                   e.available_tickets AS event_available_tickets
            FROM bookings b
            LEFT JOIN events e ON e.id = b.event_id
            WHERE ($1::uuid IS NULL OR b.event_id = $1)
              AND ($2 OR b.deleted_at IS NULL)
            ORDER BY b.created_at, b.id
            "#,
        )
        .bind(filter.event_id)
        .bind(filter.include_canceled)
        .fetch_all(&self.pool)
        .await?;

        let details = rows
            .into_iter()
            .map(BookingDetails::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(details)
    }

    async fn commit_reservation(&self, event_id: Uuid, user_id: &str) -> RepoResult<Option<Booking>> {
        let mut tx = self.pool.begin().await?;

        let decremented: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE events
            SET available_tickets = available_tickets - 1, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL AND available_tickets > 0
            RETURNING id
            "#,
        )
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;

        if decremented.is_none() {
            let (exists,): (bool,) = sqlx::query_as(
                "SELECT EXISTS (SELECT 1 FROM events WHERE id = $1 AND deleted_at IS NULL)",
            )
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;

            if !exists {
                return Ok(None);
            }
            warn!("Persisted availability for event {} is exhausted", event_id);
            return Err(format!("Event {} has no persisted availability", event_id).into());
        }

        let row: BookingRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO bookings (id, event_id, user_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(event_id)
        .bind(user_id)
        .bind(BookingStatus::Confirmed.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(Booking::try_from(row)?))
    }

    async fn commit_cancellation(
        &self,
        booking_id: Uuid,
        promote_to: Option<&str>,
    ) -> RepoResult<Option<Cancellation>> {
        let mut tx = self.pool.begin().await?;

        // Row lock so two cancellations of the same booking serialize here
        let current: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Ok(None);
        };
        let event_id = current.event_id;
        let was_confirmed = current.status == BookingStatus::Confirmed.as_str();

        let canceled: BookingRow = sqlx::query_as(&format!(
            r#"
            UPDATE bookings
            SET status = 'CANCELED', deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .fetch_one(&mut *tx)
        .await?;

        let promoted = match promote_to {
            Some(user_id) => {
                let row: BookingRow = sqlx::query_as(&format!(
                    r#"
                    INSERT INTO bookings (id, event_id, user_id, status)
                    VALUES ($1, $2, $3, $4)
                    RETURNING {}
                    "#,
                    BOOKING_COLUMNS
                ))
                .bind(Uuid::new_v4())
                .bind(event_id)
                .bind(user_id)
                .bind(BookingStatus::Confirmed.as_str())
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query("UPDATE events SET updated_at = NOW() WHERE id = $1")
                    .bind(event_id)
                    .execute(&mut *tx)
                    .await?;

                Some(Booking::try_from(row)?)
            }
            None if was_confirmed => {
                let result = sqlx::query(
                    r#"
                    UPDATE events
                    SET available_tickets = available_tickets + 1, updated_at = NOW()
                    WHERE id = $1 AND available_tickets < total_tickets
                    "#,
                )
                .bind(event_id)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    // Dropping the transaction rolls back the cancellation
                    return Err(format!("Event {} is already at full availability", event_id).into());
                }
                None
            }
            None => None,
        };

        tx.commit().await?;

        Ok(Some(Cancellation {
            canceled: Booking::try_from(canceled)?,
            promoted,
        }))
    }
}
