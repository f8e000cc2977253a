//! Test helper utilities: a scripted transform and HTTP helpers for E2E runs

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use photoshoot::models::image::{ImageHandle, SourceImage};
use photoshoot::services::catalog;
use photoshoot::services::transform::{ImageTransform, TransformError};
use serde::Deserialize;
use tokio::sync::watch;
use tokio::time::sleep;
use uuid::Uuid;

use crate::fixtures::png_bytes;

/// What the scripted transform does for one call.
#[derive(Debug, Clone)]
pub enum Scripted {
    Succeed,
    Fail(String),
}

/// In-memory [`ImageTransform`] with per-style scripts, delays and gates.
///
/// Records the start and completion order of calls and the highest number of
/// calls that were unresolved at the same time.
#[derive(Default)]
pub struct ScriptedTransform {
    default_delay: Duration,
    delays: Mutex<HashMap<String, Duration>>,
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    gates: Mutex<HashMap<String, watch::Receiver<bool>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    produced: AtomicUsize,
    started: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
}

impl ScriptedTransform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            default_delay: delay,
            ..Self::default()
        }
    }

    /// Queue outcomes for a style; once exhausted the style succeeds.
    pub fn script(&self, name: &str, outcomes: impl IntoIterator<Item = Scripted>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .extend(outcomes);
    }

    pub fn delay(&self, name: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(name.to_string(), delay);
    }

    /// Hold every call for `name` until the returned sender sends `true`.
    pub fn gate(&self, name: &str) -> watch::Sender<bool> {
        let (tx, rx) = watch::channel(false);
        self.gates.lock().unwrap().insert(name.to_string(), rx);
        tx
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }

    pub fn calls_for(&self, name: &str) -> usize {
        self.started().iter().filter(|n| n.as_str() == name).count()
    }

    fn name_for(directive: &str) -> String {
        catalog::all()
            .iter()
            .find(|s| s.directive == directive)
            .map(|s| s.name.to_string())
            .expect("directive must come from the catalog")
    }
}

#[async_trait]
impl ImageTransform for ScriptedTransform {
    async fn transform(
        &self,
        _source: &SourceImage,
        directive: &str,
    ) -> Result<ImageHandle, TransformError> {
        let name = Self::name_for(directive);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.started.lock().unwrap().push(name.clone());

        let gate = self.gates.lock().unwrap().get(&name).cloned();
        if let Some(mut gate) = gate {
            loop {
                let open = *gate.borrow_and_update();
                if open || gate.changed().await.is_err() {
                    break;
                }
            }
        }
        let delay = self
            .delays
            .lock()
            .unwrap()
            .get(&name)
            .copied()
            .unwrap_or(self.default_delay);
        sleep(delay).await;

        let outcome = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&name)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Scripted::Succeed);

        self.finished.lock().unwrap().push(name);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            Scripted::Succeed => {
                let n = self.produced.fetch_add(1, Ordering::SeqCst) as u8;
                Ok(ImageHandle::new(
                    png_bytes(16, 20, [n.wrapping_mul(37), 90, 200]),
                    "image/png",
                ))
            }
            Scripted::Fail(message) => Err(TransformError::Remote(message)),
        }
    }
}

/// Response from POST /api/v1/sessions
#[derive(Debug, Deserialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
}

/// Response from GET /api/v1/sessions/{id}
#[derive(Debug, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub running: bool,
    pub settled: bool,
    pub jobs: Vec<JobSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct JobSnapshot {
    pub name: String,
    pub status: String,
    pub image_url: Option<String>,
    pub error: Option<String>,
}

/// Upload a photo and open a session
pub async fn upload_source(
    client: &reqwest::Client,
    base_url: &str,
    image_bytes: Vec<u8>,
) -> Result<SessionCreated, Box<dyn std::error::Error>> {
    let form = reqwest::multipart::Form::new().part(
        "image",
        reqwest::multipart::Part::bytes(image_bytes)
            .file_name("photo.png")
            .mime_str("image/png")?,
    );

    let response = client
        .post(format!("{}/api/v1/sessions", base_url))
        .multipart(form)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await?;
        return Err(format!("Upload failed with status {}: {}", status, error_text).into());
    }

    Ok(response.json::<SessionCreated>().await?)
}

/// Poll a session until every job is terminal (with timeout)
pub async fn wait_until_settled(
    client: &reqwest::Client,
    base_url: &str,
    session_id: Uuid,
    timeout_secs: u64,
) -> Result<SessionSnapshot, Box<dyn std::error::Error>> {
    let max_attempts = timeout_secs * 2; // Poll every 500ms

    for attempt in 0..max_attempts {
        let snapshot = client
            .get(format!("{}/api/v1/sessions/{}", base_url, session_id))
            .send()
            .await?
            .error_for_status()?
            .json::<SessionSnapshot>()
            .await?;

        if snapshot.settled && !snapshot.running {
            return Ok(snapshot);
        }
        if attempt % 10 == 0 && attempt > 0 {
            println!("  ... still waiting (attempt {}/{})", attempt, max_attempts);
        }
        sleep(Duration::from_millis(500)).await;
    }

    Err(format!("Session did not settle within {} seconds", timeout_secs).into())
}
