//! Live clinic activity over Server-Sent Events.
//!
//! Each frame's `data:` is one [`AppEvent`] as JSON, tagged by `type`:
//! `patient_registered`, `appointment_booked`, `appointment_status_changed`,
//! `invoice_issued` or `invoice_paid`. Front-desk dashboards use it to
//! refresh without polling.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::warn;

use crate::auth::AuthUser;
use crate::state::{AppEvent, SharedState};

fn to_frame(event: &AppEvent) -> Option<Event> {
    match Event::default().json_data(event) {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!(error = %e, "Dropping unencodable clinic event");
            None
        }
    }
}

/// GET /api/events
pub async fn sse_handler(
    State(state): State<SharedState>,
    user: AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let uid = user.uid().to_string();
    let stream = BroadcastStream::new(state.subscribe()).filter_map(move |received| match received {
        Ok(event) => to_frame(&event).map(Ok),
        // A slow client misses events rather than stalling the channel.
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!(uid = %uid, skipped, "Event stream client lagged");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use netram_common::Role;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_stream_opens_for_signed_in_users_only() {
        let app = TestApp::new();
        let (status, _) = app.get("/api/events", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = app.sign_up("r@clinic.org", Role::Receptionist).await;
        let req = Request::get("/api/events")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream");
    }

    #[tokio::test]
    async fn test_clinic_workflow_publishes_events_in_order() {
        let app = TestApp::new();
        let mut rx = app.state.subscribe();
        let desk = app.sign_up("desk@clinic.org", Role::Receptionist).await;

        let (_, patient) = app.post("/api/patients", Some(&desk),
            json!({"name": "John Doe", "dob": "1970-01-01"})).await;
        let pid = patient["id"].as_str().unwrap();

        let (_, appt) = app.post("/api/appointments", Some(&desk), json!({
            "patient_id": pid, "patient_name": "John Doe", "doctor_name": "Dr. Smith",
            "date": "2030-07-30", "time": "10:00", "appointment_type": "follow_up",
        })).await;
        let appt_id = appt["id"].as_str().unwrap();
        app.post(&format!("/api/appointments/{appt_id}/status"), Some(&desk),
            json!({"status": "Confirmed"})).await;

        let (_, inv) = app.post("/api/billing", Some(&desk), json!({
            "patient_id": pid, "patient_name": "John Doe",
            "items": [{"description": "Consultation", "amount_cents": 15000}],
        })).await;
        let inv_id = inv["id"].as_str().unwrap();
        app.post(&format!("/api/billing/{inv_id}/pay"), Some(&desk), json!({})).await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(serde_json::to_value(&event).unwrap());
        }
        assert_eq!(events, vec![
            json!({"type": "patient_registered", "patient_id": pid, "name": "John Doe"}),
            json!({"type": "appointment_booked", "appointment_id": appt_id,
                   "patient_name": "John Doe", "date": "2030-07-30", "time": "10:00"}),
            json!({"type": "appointment_status_changed", "appointment_id": appt_id, "status": "Confirmed"}),
            json!({"type": "invoice_issued", "invoice_id": inv_id,
                   "patient_name": "John Doe", "amount_cents": 15000}),
            json!({"type": "invoice_paid", "invoice_id": inv_id}),
        ]);
    }

    #[test]
    fn test_every_event_encodes_to_a_frame() {
        let events = [
            AppEvent::PatientRegistered { patient_id: "p1".into(), name: "John Doe".into() },
            AppEvent::AppointmentStatusChanged { appointment_id: "a1".into(), status: "Cancelled".into() },
            AppEvent::InvoicePaid { invoice_id: "inv-1".into() },
        ];
        assert!(events.iter().all(|e| to_frame(e).is_some()));
    }
}
