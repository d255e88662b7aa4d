use std::sync::Arc;

use log::info;
use thiserror::Error;

use crate::{
    util::{non_empty, parse_date, DATE_FORMAT},
    Config, Database, DatabaseError, EventData, NewEvent, PrimaryKey, UpdatedEvent,
};

/// Manages the events students can register for
pub struct EventCatalog<Db> {
    db: Arc<Db>,
    default_max_seats: i64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("The {0} field is required")]
    MissingField(&'static str),
    #[error("Invalid date format, expected {}", DATE_FORMAT)]
    InvalidDate,
    #[error("Seats cannot be negative")]
    InvalidSeats,
    #[error("Registration fee must be a non-negative number")]
    InvalidFee,
    #[error("Seats cannot be lower than the {confirmed} confirmed registrations")]
    SeatsBelowConfirmed { confirmed: i64 },
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Event {0} doesn't exist")]
    NotFound(PrimaryKey),
    #[error(transparent)]
    Db(DatabaseError),
}

/// Event fields as submitted, before validation
#[derive(Debug, Clone, Default)]
pub struct EventFields {
    pub name: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub max_seats: Option<String>,
    pub registration_fee: Option<String>,
}

/// An event along with how many seats are taken
#[derive(Debug, Clone)]
pub struct EventSummary {
    pub event: EventData,
    pub seats_taken: i64,
}

impl EventSummary {
    pub fn seats_left(&self) -> i64 {
        (self.event.max_seats - self.seats_taken).max(0)
    }
}

impl EventFields {
    /// Validates the fields, filling in defaults for seats and fee
    pub fn validate(&self, default_max_seats: i64) -> Result<NewEvent, ValidationError> {
        let name = non_empty(&self.name).ok_or(ValidationError::MissingField("name"))?;
        let description =
            non_empty(&self.description).ok_or(ValidationError::MissingField("description"))?;
        let location =
            non_empty(&self.location).ok_or(ValidationError::MissingField("location"))?;

        if self.date.trim().is_empty() {
            return Err(ValidationError::MissingField("date"));
        }

        let date = parse_date(&self.date).ok_or(ValidationError::InvalidDate)?;

        // Anything that isn't an integer falls back to the default
        let max_seats = match self.max_seats.as_deref().map(|s| s.trim().parse::<i64>()) {
            Some(Ok(seats)) if seats < 0 => return Err(ValidationError::InvalidSeats),
            Some(Ok(seats)) => seats,
            _ => default_max_seats,
        };

        let registration_fee = match self.registration_fee.as_deref().and_then(non_empty) {
            None => 0.0,
            Some(fee) => match fee.parse::<f64>() {
                Ok(fee) if fee.is_finite() && fee >= 0.0 => fee,
                _ => return Err(ValidationError::InvalidFee),
            },
        };

        Ok(NewEvent {
            name,
            description,
            date,
            location,
            max_seats,
            registration_fee,
        })
    }
}

impl<Db> EventCatalog<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>, config: &Config) -> Self {
        Self {
            db: db.clone(),
            default_max_seats: config.default_max_seats,
        }
    }

    pub fn default_max_seats(&self) -> i64 {
        self.default_max_seats
    }

    pub async fn create(&self, fields: EventFields) -> Result<EventData, EventError> {
        let new_event = fields.validate(self.default_max_seats)?;
        let event = self.db.create_event(new_event).await.map_err(EventError::Db)?;

        info!("Created event {} ({})", event.name, event.id);

        Ok(event)
    }

    /// Replaces every field of an event
    pub async fn edit(&self, event_id: PrimaryKey, fields: EventFields) -> Result<EventData, EventError> {
        let new_event = fields.validate(self.default_max_seats)?;

        let updated = self
            .db
            .update_event(UpdatedEvent {
                id: event_id,
                fields: new_event,
            })
            .await
            .map_err(|e| Self::event_error(event_id, e))?;

        match updated {
            Some(event) => {
                info!("Updated event {} ({})", event.name, event.id);
                Ok(event)
            }
            None => {
                let confirmed = self
                    .db
                    .confirmed_count(event_id)
                    .await
                    .map_err(EventError::Db)?;

                Err(ValidationError::SeatsBelowConfirmed { confirmed }.into())
            }
        }
    }

    /// Deletes an event along with its registrations
    pub async fn delete(&self, event_id: PrimaryKey) -> Result<(), EventError> {
        self.db
            .delete_event_and_registrations(event_id)
            .await
            .map_err(|e| Self::event_error(event_id, e))?;

        info!("Deleted event {}", event_id);

        Ok(())
    }

    pub async fn get(&self, event_id: PrimaryKey) -> Result<EventData, EventError> {
        self.db
            .event_by_id(event_id)
            .await
            .map_err(|e| Self::event_error(event_id, e))
    }

    /// All events, latest first
    pub async fn list(&self) -> Result<Vec<EventData>, EventError> {
        self.db.list_events().await.map_err(EventError::Db)
    }

    pub async fn summary(&self, event_id: PrimaryKey) -> Result<EventSummary, EventError> {
        let event = self.get(event_id).await?;
        let seats_taken = self
            .db
            .confirmed_count(event_id)
            .await
            .map_err(EventError::Db)?;

        Ok(EventSummary { event, seats_taken })
    }

    /// All events with their seat counts, latest first
    pub async fn overview(&self) -> Result<Vec<EventSummary>, EventError> {
        let events = self.list().await?;
        let mut summaries = Vec::with_capacity(events.len());

        for event in events {
            let seats_taken = self
                .db
                .confirmed_count(event.id)
                .await
                .map_err(EventError::Db)?;

            summaries.push(EventSummary { event, seats_taken });
        }

        Ok(summaries)
    }

    fn event_error(event_id: PrimaryKey, error: DatabaseError) -> EventError {
        match error {
            DatabaseError::NotFound { .. } => EventError::NotFound(event_id),
            e => EventError::Db(e),
        }
    }
}
