use crate::availability::AvailabilityProvider;
use crate::bulk_upload::{upload_csv, BannerKind, UploadBanner};
use crate::configuration::Configuration;
use crate::error::SchedulerError;
use crate::filters::{filter_documents, filter_events, is_month, parse_term, DocumentFilter};
use crate::portal_data::PortalData;
use crate::portal_source::{PortalSource, UploadTable};
use crate::session::{FetchOutcome, SchedulerSession, SessionRegistry};
use crate::static_data::StaticPortalData;
use crate::types::{
    Booking, CalendarEvent, CarouselImage, CurriculumSubject, DaySchedule, DaySummary,
    DocumentItem, DocumentType, EventType, Student,
};
use axum::body::Body;
use axum::extract::{Path, Query, Request};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Response;
use axum::{extract::State, http::StatusCode, Json};
use axum::{
    routing::{delete, get, post},
    Router,
};
use chrono::NaiveDate;
use futures::{Stream, StreamExt};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    static ref ISO_DATE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
}

type HttpError = (StatusCode, String);

pub struct AppState<P: AvailabilityProvider, S: PortalSource, C: Configuration> {
    pub sessions: SessionRegistry<P>,
    pub portal: PortalData<S>,
    pub configuration: C,
}

impl<P: AvailabilityProvider, S: PortalSource, C: Configuration> Clone for AppState<P, S, C> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            portal: self.portal.clone(),
            configuration: self.configuration.clone(),
        }
    }
}

fn unknown_session(id: Uuid) -> HttpError {
    (StatusCode::NOT_FOUND, format!("Session {id} does not exist"))
}

impl<P: AvailabilityProvider, S: PortalSource, C: Configuration> AppState<P, S, C> {
    fn session(&self, id: Uuid) -> Result<SchedulerSession<P>, HttpError> {
        self.sessions.get(id).ok_or_else(|| unknown_session(id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionCreated {
    session_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct SlotsQuery {
    #[validate(regex(path = *ISO_DATE))]
    date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct OverviewQuery {
    #[validate(regex(path = *ISO_DATE))]
    from: String,
    #[validate(range(min = 1, max = 31))]
    days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct BookRequest {
    #[validate(length(min = 1))]
    slot_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BookingIdRequest {
    booking_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentsQuery {
    #[serde(rename = "type")]
    kind: DocumentType,
    month: Option<String>,
    term: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EventsQuery {
    #[serde(rename = "type")]
    kind: Option<EventType>,
    month: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct About {
    title: String,
}

pub fn create_app<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    provider: P,
    source: S,
    fallback: StaticPortalData,
    configuration: C,
) -> Router {
    let state = AppState {
        sessions: SessionRegistry::new(
            provider,
            configuration.slot_fetch_delay(),
            configuration.session_idle_timeout(),
        ),
        portal: PortalData::new(source, fallback),
        configuration,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let scheduler = Router::new()
        .route("/sessions", post(create_session::<P, S, C>))
        .route("/sessions/:id", delete(close_session::<P, S, C>))
        .route("/sessions/:id/slots", get(get_slots::<P, S, C>))
        .route("/sessions/:id/overview", get(get_overview::<P, S, C>))
        .route("/sessions/:id/book", post(book_slot::<P, S, C>))
        .route("/sessions/:id/cancel", post(cancel_booking::<P, S, C>))
        .route("/sessions/:id/reschedule", post(reschedule_booking::<P, S, C>))
        .route("/sessions/:id/bookings", get(get_bookings::<P, S, C>))
        .route("/sessions/:id/bookings/stream", get(stream_bookings::<P, S, C>));

    let portal = Router::new()
        .route("/about", get(get_about::<P, S, C>))
        .route("/students/:id", get(get_student::<P, S, C>))
        .route("/students/:id/documents", get(get_documents::<P, S, C>))
        .route("/events", get(get_events::<P, S, C>))
        .route("/curriculum/:class_grade", get(get_curriculum::<P, S, C>))
        .route("/carousel", get(get_carousel::<P, S, C>));

    let admin = Router::new()
        .route("/admin/upload/:table", post(upload_table::<P, S, C>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth::<P, S, C>,
        ));

    Router::new()
        .merge(scheduler)
        .merge(portal)
        .merge(admin)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn admin_auth<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, HttpError> {
    match request.headers().get("x-admin-password") {
        Some(auth_header) => {
            if auth_header.to_str().unwrap_or("") != state.configuration.password() {
                return Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()));
            }
        }
        None => return Err((StatusCode::UNAUTHORIZED, "Missing credentials".to_string())),
    }
    Ok(next.run(request).await)
}

fn scheduler_error(err: SchedulerError) -> HttpError {
    let status = match err {
        SchedulerError::SlotBusy { .. }
        | SchedulerError::AlreadyBooked { .. }
        | SchedulerError::NoDaySelected => StatusCode::CONFLICT,
        SchedulerError::UnknownSlot { .. } | SchedulerError::UnknownBooking { .. } => {
            StatusCode::NOT_FOUND
        }
        SchedulerError::CalendarUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, err.to_string())
}

fn validated<T: Validate>(request: &T) -> Result<(), HttpError> {
    request
        .validate()
        .map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))
}

fn parse_date(value: &str) -> Result<NaiveDate, HttpError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|err| (StatusCode::BAD_REQUEST, format!("Invalid date {value}: {err}")))
}

async fn create_session<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
) -> Json<SessionCreated> {
    let (session_id, _) = state.sessions.create();
    Json(SessionCreated { session_id })
}

async fn close_session<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    state
        .sessions
        .remove(id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| unknown_session(id))
}

async fn get_slots<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
    Path(id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<DaySchedule>, HttpError> {
    validated(&query)?;
    let date = parse_date(&query.date)?;
    let session = state.session(id)?;

    match session.select_date(date).await.map_err(scheduler_error)? {
        FetchOutcome::Applied(schedule) => Ok(Json(schedule)),
        FetchOutcome::Stale => Err((
            StatusCode::CONFLICT,
            "A newer day was selected meanwhile".to_string(),
        )),
    }
}

async fn get_overview<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
    Path(id): Path<Uuid>,
    Query(query): Query<OverviewQuery>,
) -> Result<Json<Vec<DaySummary>>, HttpError> {
    validated(&query)?;
    let from = parse_date(&query.from)?;
    let session = state.session(id)?;

    session
        .overview(from, query.days)
        .map(Json)
        .map_err(scheduler_error)
}

async fn book_slot<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
    Path(id): Path<Uuid>,
    Json(request): Json<BookRequest>,
) -> Result<Json<Booking>, HttpError> {
    validated(&request)?;
    let session = state.session(id)?;
    session
        .book(&request.slot_id)
        .map(Json)
        .map_err(scheduler_error)
}

async fn cancel_booking<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
    Path(id): Path<Uuid>,
    Json(request): Json<BookingIdRequest>,
) -> Result<Json<Booking>, HttpError> {
    let session = state.session(id)?;
    session
        .cancel(request.booking_id)
        .map(Json)
        .map_err(scheduler_error)
}

async fn reschedule_booking<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
    Path(id): Path<Uuid>,
    Json(request): Json<BookingIdRequest>,
) -> Result<Json<Booking>, HttpError> {
    let session = state.session(id)?;
    session
        .reschedule(request.booking_id)
        .map(Json)
        .map_err(scheduler_error)
}

async fn get_bookings<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Booking>>, HttpError> {
    let session = state.session(id)?;
    Ok(Json(session.my_meetings()))
}

async fn stream_bookings<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, HttpError> {
    let session = state.session(id)?;
    info!(%id, "Booking stream subscribed");

    let stream = session
        .booking_stream()
        .map(|bookings| Event::default().event("bookings").json_data(bookings));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn get_about<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
) -> Json<About> {
    Json(About {
        title: state.configuration.website_title(),
    })
}

async fn get_student<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
    Path(login_id): Path<String>,
) -> Json<Student> {
    Json(state.portal.student_profile(&login_id).await)
}

async fn get_documents<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
    Path(student_id): Path<String>,
    Query(query): Query<DocumentsQuery>,
) -> Result<Json<Vec<DocumentItem>>, HttpError> {
    if let Some(month) = &query.month {
        if !is_month(month) {
            return Err((StatusCode::BAD_REQUEST, format!("Unknown month: {month}")));
        }
    }
    let term = match query.term.as_deref().and_then(parse_term) {
        Some(Ok(term)) => Some(term),
        Some(Err(err)) => return Err((StatusCode::BAD_REQUEST, err)),
        None => None,
    };

    let filter = DocumentFilter {
        kind: query.kind,
        month: query.month,
        term,
    };
    let documents = state.portal.documents(&student_id).await;
    Ok(Json(filter_documents(&documents, &filter)))
}

async fn get_events<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<CalendarEvent>>, HttpError> {
    if let Some(month) = &query.month {
        if !is_month(month) {
            return Err((StatusCode::BAD_REQUEST, format!("Unknown month: {month}")));
        }
    }
    let events = state.portal.events().await;
    Ok(Json(filter_events(
        &events,
        query.month.as_deref(),
        query.kind,
    )))
}

async fn get_curriculum<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
    Path(class_grade): Path<String>,
) -> Json<Vec<CurriculumSubject>> {
    Json(state.portal.curriculum(&class_grade).await)
}

async fn get_carousel<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
) -> Json<Vec<CarouselImage>> {
    Json(state.portal.carousel_images().await)
}

async fn upload_table<P: AvailabilityProvider, S: PortalSource, C: Configuration>(
    State(state): State<AppState<P, S, C>>,
    Path(table): Path<UploadTable>,
    body: String,
) -> (StatusCode, Json<UploadBanner>) {
    let banner = upload_csv(&state.portal, table, &body).await;
    let status = match banner.kind {
        BannerKind::Success => StatusCode::OK,
        BannerKind::Error => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(banner))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::availability::SeededCalendar;
    use crate::testutils::{MockPortalSource, TestConfiguration};
    use crate::types::SlotStatus;
    use reqwest::Client;
    use serde_json::Value;
    use std::{sync::atomic::Ordering, time::Duration};
    use tokio::{task::JoinHandle, time::timeout};

    async fn init() -> (JoinHandle<()>, MockPortalSource, String) {
        init_with(TestConfiguration::default()).await
    }

    async fn init_with(
        configuration: TestConfiguration,
    ) -> (JoinHandle<()>, MockPortalSource, String) {
        let mock_source = MockPortalSource::new();
        let app = create_app(
            SeededCalendar,
            mock_source.clone(),
            StaticPortalData::bundled().unwrap(),
            configuration,
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (server, mock_source, address)
    }

    async fn new_session(client: &Client, address: &str) -> Uuid {
        let response = client
            .post(format!("{address}/sessions"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK.as_u16());
        response.json::<SessionCreated>().await.unwrap().session_id
    }

    async fn load_day(client: &Client, address: &str, session: Uuid, date: &str) -> DaySchedule {
        let response = client
            .get(format!("{address}/sessions/{session}/slots?date={date}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK.as_u16());
        response.json().await.unwrap()
    }

    #[tokio::test]
    async fn test_book_and_cancel_flow() {
        let (server, _, address) = init().await;
        let client = Client::new();
        let session = new_session(&client, &address).await;

        let schedule = load_day(&client, &address, session, "2024-06-17").await;
        assert_eq!(schedule.slots.len(), 20);
        assert_eq!(schedule.available, 16);
        assert_eq!(schedule.slots[4].status, SlotStatus::Unavailable);

        let response = client
            .post(format!("{address}/sessions/{session}/book"))
            .json(&BookRequest {
                slot_id: "2024-06-17-0900AM".into(),
            })
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK.as_u16());
        let booking: Booking = response.json().await.unwrap();
        assert_eq!(booking.time, "09:00 AM");

        let response = client
            .post(format!("{address}/sessions/{session}/book"))
            .json(&BookRequest {
                slot_id: "2024-06-17-0900AM".into(),
            })
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT.as_u16());

        let bookings: Vec<Booking> = client
            .get(format!("{address}/sessions/{session}/bookings"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(bookings, vec![booking.clone()]);

        for expected in [StatusCode::OK, StatusCode::NOT_FOUND] {
            let response = client
                .post(format!("{address}/sessions/{session}/cancel"))
                .json(&BookingIdRequest {
                    booking_id: booking.id,
                })
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), expected.as_u16());
        }

        let schedule = load_day(&client, &address, session, "2024-06-17").await;
        assert_eq!(schedule.slots[0].status, SlotStatus::Available);

        server.abort();
    }

    #[tokio::test]
    async fn test_reschedule_releases_booking() {
        let (server, _, address) = init().await;
        let client = Client::new();
        let session = new_session(&client, &address).await;
        load_day(&client, &address, session, "2024-06-18").await;

        let booking: Booking = client
            .post(format!("{address}/sessions/{session}/book"))
            .json(&BookRequest {
                slot_id: "2024-06-18-0200PM".into(),
            })
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let response = client
            .post(format!("{address}/sessions/{session}/reschedule"))
            .json(&BookingIdRequest {
                booking_id: booking.id,
            })
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK.as_u16());

        let bookings: Vec<Booking> = client
            .get(format!("{address}/sessions/{session}/bookings"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(bookings.is_empty());

        server.abort();
    }

    #[tokio::test]
    async fn test_weekend_and_overview() {
        let (server, _, address) = init().await;
        let client = Client::new();
        let session = new_session(&client, &address).await;

        let schedule = load_day(&client, &address, session, "2024-06-15").await;
        assert!(schedule.slots.is_empty());

        let overview: Vec<DaySummary> = client
            .get(format!(
                "{address}/sessions/{session}/overview?from=2024-06-14&days=4"
            ))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let available: Vec<usize> = overview.iter().map(|day| day.available).collect();
        assert_eq!(available, vec![16, 0, 0, 16]);

        server.abort();
    }

    #[test_case::test_case ("slots?date=2024-6-17", StatusCode::BAD_REQUEST)]
    #[test_case::test_case ("slots?date=2024-02-31", StatusCode::BAD_REQUEST)]
    #[test_case::test_case ("slots", StatusCode::BAD_REQUEST)]
    #[test_case::test_case ("overview?from=2024-06-17&days=0", StatusCode::BAD_REQUEST)]
    #[test_case::test_case ("overview?from=2024-06-17&days=7", StatusCode::OK)]
    #[tokio::test]
    async fn test_query_validation(path: &str, status_code: StatusCode) {
        let (server, _, address) = init().await;
        let client = Client::new();
        let session = new_session(&client, &address).await;

        let response = client
            .get(format!("{address}/sessions/{session}/{path}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), status_code.as_u16());

        server.abort();
    }

    #[test_case::test_case ("get", "slots?date=2024-06-17")]
    #[test_case::test_case ("get", "bookings")]
    #[test_case::test_case ("post", "cancel")]
    #[tokio::test]
    async fn test_unknown_session(method: &str, path: &str) {
        let (server, _, address) = init().await;
        let client = Client::new();
        let url = format!("{address}/sessions/{}/{path}", Uuid::new_v4());

        let request_builder = match method {
            "get" => client.get(url),
            "post" => client.post(url).json(&BookingIdRequest {
                booking_id: Uuid::new_v4(),
            }),
            _ => panic!("Unsupported HTTP method: {}", method),
        };
        let response = request_builder.send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND.as_u16());

        server.abort();
    }

    #[tokio::test]
    async fn test_closed_session_is_gone() {
        let (server, _, address) = init().await;
        let client = Client::new();
        let session = new_session(&client, &address).await;
        load_day(&client, &address, session, "2024-06-17").await;

        for expected in [StatusCode::NO_CONTENT, StatusCode::NOT_FOUND] {
            let response = client
                .delete(format!("{address}/sessions/{session}"))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), expected.as_u16());
        }

        for path in ["slots?date=2024-06-17", "bookings", "bookings/stream"] {
            let response = client
                .get(format!("{address}/sessions/{session}/{path}"))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND.as_u16());
        }

        server.abort();
    }

    #[tokio::test]
    async fn test_closing_session_ends_booking_stream() {
        let (server, _, address) = init().await;
        let client = Client::new();
        let session = new_session(&client, &address).await;

        let mut stream = client
            .get(format!("{address}/sessions/{session}/bookings/stream"))
            .send()
            .await
            .unwrap();
        let mut received = String::new();
        while !received.contains("data: []") {
            let chunk = timeout(Duration::from_secs(2), stream.chunk())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            received.push_str(&String::from_utf8_lossy(&chunk));
        }

        client
            .delete(format!("{address}/sessions/{session}"))
            .send()
            .await
            .unwrap();

        loop {
            let chunk = timeout(Duration::from_secs(2), stream.chunk())
                .await
                .unwrap()
                .unwrap();
            if chunk.is_none() {
                break;
            }
        }

        server.abort();
    }

    #[tokio::test]
    async fn test_superseded_day_request_conflicts() {
        let (server, _, address) = init_with(TestConfiguration {
            slot_fetch_delay: Duration::from_millis(300),
        })
        .await;
        let client = Client::new();
        let session = new_session(&client, &address).await;

        let first = tokio::spawn({
            let client = client.clone();
            let url = format!("{address}/sessions/{session}/slots?date=2024-06-17");
            async move { client.get(url).send().await.unwrap() }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = client
            .get(format!("{address}/sessions/{session}/slots?date=2024-06-18"))
            .send()
            .await
            .unwrap();
        let first = first.await.unwrap();

        assert_eq!(first.status(), StatusCode::CONFLICT.as_u16());
        assert_eq!(second.status(), StatusCode::OK.as_u16());
        let schedule: DaySchedule = second.json().await.unwrap();
        assert_eq!(schedule.date, NaiveDate::from_ymd_opt(2024, 6, 18).unwrap());

        server.abort();
    }

    #[tokio::test]
    async fn test_booking_stream() {
        let (server, _, address) = init().await;
        let client = Client::new();
        let session = new_session(&client, &address).await;
        load_day(&client, &address, session, "2024-06-17").await;

        let mut stream = client
            .get(format!("{address}/sessions/{session}/bookings/stream"))
            .send()
            .await
            .unwrap();
        assert_eq!(
            stream
                .headers()
                .get("content-type")
                .unwrap()
                .to_str()
                .unwrap(),
            "text/event-stream"
        );

        let mut received = String::new();
        while !received.contains("data: []") {
            let chunk = timeout(Duration::from_secs(2), stream.chunk())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            received.push_str(&String::from_utf8_lossy(&chunk));
        }
        assert!(received.contains("event: bookings"));

        client
            .post(format!("{address}/sessions/{session}/book"))
            .json(&BookRequest {
                slot_id: "2024-06-17-0915AM".into(),
            })
            .send()
            .await
            .unwrap();

        while !received.contains("2024-06-17-0915AM") {
            let chunk = timeout(Duration::from_secs(2), stream.chunk())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            received.push_str(&String::from_utf8_lossy(&chunk));
        }

        server.abort();
    }

    #[test_case::test_case (None, StatusCode::UNAUTHORIZED, 0)]
    #[test_case::test_case (Some("wrong"), StatusCode::UNAUTHORIZED, 0)]
    #[test_case::test_case (Some("123"), StatusCode::OK, 1)]
    #[tokio::test]
    async fn test_upload_authorization(
        password: Option<&str>,
        status_code: StatusCode,
        expected_backend_calls: u64,
    ) {
        let (server, mock_source, address) = init().await;

        let client = Client::new();
        let mut request_builder = client
            .post(format!("{address}/admin/upload/events"))
            .body("id,title,date,type\ne9,Sports Day,2024-12-05,school\n");
        if let Some(password) = password {
            request_builder = request_builder.header("x-admin-password", password);
        }
        let response = request_builder.send().await.unwrap();

        assert_eq!(response.status(), status_code.as_u16());
        assert_eq!(
            mock_source.0.calls_to_insert_rows.load(Ordering::SeqCst),
            expected_backend_calls
        );
        server.abort();
    }

    #[tokio::test]
    async fn test_upload_failure_banner() {
        let (server, mock_source, address) = init().await;
        mock_source.0.success.store(false, Ordering::SeqCst);

        let response = Client::new()
            .post(format!("{address}/admin/upload/students"))
            .header("x-admin-password", "123")
            .body("id,name\nST-9,New Student\n")
            .send()
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::INTERNAL_SERVER_ERROR.as_u16()
        );
        let banner: UploadBanner = response.json().await.unwrap();
        assert_eq!(banner.kind, BannerKind::Error);
        assert!(banner.text.starts_with("Upload failed:"));

        server.abort();
    }

    #[tokio::test]
    async fn test_portal_reads_fall_back() {
        let (server, mock_source, address) = init().await;
        mock_source.0.success.store(false, Ordering::SeqCst);
        let client = Client::new();

        let student: Student = client
            .get(format!("{address}/students/demo-user"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(student.name, "Layaa Ramesh");

        let documents: Vec<DocumentItem> = client
            .get(format!(
                "{address}/students/{}/documents?type=newsletter&month=July",
                student.id
            ))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "n2");

        let reports: Vec<DocumentItem> = client
            .get(format!(
                "{address}/students/{}/documents?type=report&term=Term%20II",
                student.id
            ))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, "r2");

        let events: Vec<CalendarEvent> = client
            .get(format!("{address}/events?type=school&month=August"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Independence Day");

        let carousel: Vec<Value> = client
            .get(format!("{address}/carousel"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(carousel.len(), 4);

        server.abort();
    }

    #[test_case::test_case ("students/ST-1/documents?type=newsletter&month=Juli")]
    #[test_case::test_case ("students/ST-1/documents?type=report&term=Term%20IV")]
    #[test_case::test_case ("students/ST-1/documents?type=invoice")]
    #[test_case::test_case ("events?month=june")]
    #[tokio::test]
    async fn test_portal_query_validation(path: &str) {
        let (server, _, address) = init().await;

        let response = Client::new()
            .get(format!("{address}/{path}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST.as_u16());

        server.abort();
    }

    #[tokio::test]
    async fn test_portal_reads_from_source() {
        let (server, mock_source, address) = init().await;
        let client = Client::new();

        let student: Student = client
            .get(format!("{address}/students/BLT-7"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(student.id, "mock-BLT-7");

        let about: About = client
            .get(format!("{address}/about"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(about.title, "Test Portal");

        let curriculum: Vec<CurriculumSubject> = client
            .get(format!("{address}/curriculum/Grade%203%20-%20A"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(curriculum.is_empty());
        assert_eq!(
            mock_source.0.calls_to_curriculum.load(Ordering::SeqCst),
            1
        );

        server.abort();
    }
}
