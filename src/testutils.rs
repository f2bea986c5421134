use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use futures::StreamExt;
use tokio::time::timeout;
use tokio_stream::wrappers::WatchStream;

use crate::{
    configuration::Configuration,
    error::PortalError,
    portal_source::{PortalSource, Row, UploadTable},
    types::{Booking, CalendarEvent, CarouselImage, CurriculumSubject, DocumentItem, Student},
};

#[derive(Clone, Default)]
pub struct TestConfiguration {
    pub slot_fetch_delay: Duration,
}

impl Configuration for TestConfiguration {
    fn website_title(&self) -> String {
        "Test Portal".into()
    }

    fn password(&self) -> String {
        "123".into()
    }

    fn port(&self) -> String {
        "0".into()
    }

    fn tables_url(&self) -> Option<String> {
        None
    }

    fn tables_key(&self) -> Option<String> {
        None
    }

    fn slot_fetch_delay(&self) -> Duration {
        self.slot_fetch_delay
    }

    fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(60)
    }
}

pub async fn read_from_booking_stream(stream: &mut WatchStream<Vec<Booking>>) -> Vec<Booking> {
    timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("No booking update within a second")
        .expect("Booking stream closed")
}

pub struct MockPortalSourceInner {
    pub success: AtomicBool,
    pub calls_to_student_profile: AtomicU64,
    pub calls_to_documents: AtomicU64,
    pub calls_to_events: AtomicU64,
    pub calls_to_curriculum: AtomicU64,
    pub calls_to_carousel_images: AtomicU64,
    pub calls_to_insert_rows: AtomicU64,
    pub inserted: Mutex<Vec<(UploadTable, Vec<Row>)>>,
}

#[derive(Clone)]
pub struct MockPortalSource(pub Arc<MockPortalSourceInner>);

impl MockPortalSourceInner {
    fn new() -> Self {
        Self {
            success: AtomicBool::new(true),
            calls_to_student_profile: AtomicU64::default(),
            calls_to_documents: AtomicU64::default(),
            calls_to_events: AtomicU64::default(),
            calls_to_curriculum: AtomicU64::default(),
            calls_to_carousel_images: AtomicU64::default(),
            calls_to_insert_rows: AtomicU64::default(),
            inserted: Mutex::default(),
        }
    }
}

impl MockPortalSource {
    pub fn new() -> Self {
        Self(Arc::new(MockPortalSourceInner::new()))
    }

    fn result<T>(&self, value: T) -> Result<T, PortalError> {
        match self.0.success.load(Ordering::SeqCst) {
            true => Ok(value),
            false => Err(PortalError::Status {
                table: "mock".into(),
                status: 503,
            }),
        }
    }
}

impl PortalSource for MockPortalSource {
    async fn student_profile(&self, login_id: &str) -> Result<Student, PortalError> {
        self.0.calls_to_student_profile.fetch_add(1, Ordering::SeqCst);
        self.result(Student {
            id: format!("mock-{login_id}"),
            name: "Mock Student".into(),
            photo_url: String::new(),
            dob: "2016-01-01".into(),
            doj: "2021-06-01".into(),
            admission_no: login_id.into(),
            class_grade: "Grade 1 - A".into(),
            age: 6,
            father_name: String::new(),
            father_phone: String::new(),
            father_email: String::new(),
            mother_name: String::new(),
            mother_phone: String::new(),
            mother_email: String::new(),
            guardian_name: "N/A".into(),
            guardian_phone: None,
            guardian_email: None,
        })
    }

    async fn documents(&self, _student_id: &str) -> Result<Vec<DocumentItem>, PortalError> {
        self.0.calls_to_documents.fetch_add(1, Ordering::SeqCst);
        self.result(vec![])
    }

    async fn events(&self) -> Result<Vec<CalendarEvent>, PortalError> {
        self.0.calls_to_events.fetch_add(1, Ordering::SeqCst);
        self.result(vec![])
    }

    async fn curriculum(&self, _class_grade: &str) -> Result<Vec<CurriculumSubject>, PortalError> {
        self.0.calls_to_curriculum.fetch_add(1, Ordering::SeqCst);
        self.result(vec![])
    }

    async fn carousel_images(&self) -> Result<Vec<CarouselImage>, PortalError> {
        self.0
            .calls_to_carousel_images
            .fetch_add(1, Ordering::SeqCst);
        self.result(vec![])
    }

    async fn insert_rows(&self, table: UploadTable, rows: Vec<Row>) -> Result<usize, PortalError> {
        self.0.calls_to_insert_rows.fetch_add(1, Ordering::SeqCst);
        let count = rows.len();
        let result = self.result(count);
        if result.is_ok() {
            self.0.inserted.lock().unwrap().push((table, rows));
        }
        result
    }
}
