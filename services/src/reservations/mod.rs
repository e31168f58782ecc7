//! Reservation records: the document model, the persistence service and the
//! `/api/reservations` handlers.

mod document;
mod routes;
mod service;

pub use document::{
    DATE_KEY, RECURRENCE_KEY, RecordPayload, ReservationDocument, ReservationRecord,
};
pub use routes::{AppState, DeleteResponse, ErrorResponse, StatusResponse, routes};
pub use service::{Loaded, ReservationService, StoreError, SyncOutcome};
