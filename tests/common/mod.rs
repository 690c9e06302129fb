#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

use spotwatch::activity::{Attachment, PipelineActivity};
use spotwatch::error::{Result, SpotwatchError};
use spotwatch::fetch::ReportSource;
use spotwatch::model::BugCollection;
use spotwatch::parsers::spotbugs;
use spotwatch::watch::ActivityStore;

pub const SAMPLE_REPORT: &[u8] = include_bytes!("../fixtures/spotbugsXml.xml");
pub const WORKED_EXAMPLE: &[u8] = include_bytes!("../fixtures/worked_example.xml");

/// An activity in namespace `jx` with one `spotbugs` attachment.
pub fn activity_with_reports(name: &str, urls: &[&str]) -> PipelineActivity {
    let mut activity = PipelineActivity::new(name, "jx");
    activity.metadata.resource_version = Some("1".to_string());
    activity.spec.attachments.push(Attachment {
        name: "spotbugs".to_string(),
        urls: urls.iter().map(|u| u.to_string()).collect(),
    });
    activity
}

/// Serves canned report bodies by URL; unknown URLs fail with HTTP 404.
#[derive(Default)]
pub struct FakeReports {
    bodies: HashMap<String, Vec<u8>>,
    pub fetched: RefCell<Vec<String>>,
}

impl FakeReports {
    pub fn with(mut self, url: &str, body: &[u8]) -> Self {
        self.bodies.insert(url.to_string(), body.to_vec());
        self
    }
}

impl ReportSource for FakeReports {
    fn fetch(&self, url: &str) -> Result<BugCollection> {
        self.fetched.borrow_mut().push(url.to_string());
        match self.bodies.get(url) {
            Some(body) => spotbugs::parse(body),
            None => Err(SpotwatchError::Status {
                url: url.to_string(),
                code: 404,
                reason: "Not Found".to_string(),
            }),
        }
    }
}

/// In-memory store that checks `resourceVersion` like the API server does
/// and records every successful update.
#[derive(Default)]
pub struct RecordingStore {
    current: RefCell<HashMap<String, PipelineActivity>>,
    pub updates: RefCell<Vec<PipelineActivity>>,
    pub conflicts: RefCell<usize>,
}

impl RecordingStore {
    pub fn seeded(activity: &PipelineActivity) -> Self {
        let store = Self::default();
        store
            .current
            .borrow_mut()
            .insert(activity.name().to_string(), activity.clone());
        store
    }

    pub fn get(&self, name: &str) -> Option<PipelineActivity> {
        self.current.borrow().get(name).cloned()
    }

    pub fn update_count(&self) -> usize {
        self.updates.borrow().len()
    }
}

impl ActivityStore for RecordingStore {
    fn update(&self, activity: &PipelineActivity) -> Result<PipelineActivity> {
        let mut current = self.current.borrow_mut();
        let name = activity.name().to_string();
        let version = match current.get(&name) {
            Some(stored) if stored.metadata.resource_version != activity.metadata.resource_version => {
                *self.conflicts.borrow_mut() += 1;
                return Err(SpotwatchError::Conflict {
                    name,
                    message: "the object has been modified".to_string(),
                });
            }
            Some(stored) => stored
                .metadata
                .resource_version
                .as_deref()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0),
            None => 0,
        };

        let mut stored = activity.clone();
        stored.metadata.resource_version = Some((version + 1).to_string());
        current.insert(name, stored.clone());
        self.updates.borrow_mut().push(stored.clone());
        Ok(stored)
    }
}

/// Serve one canned HTTP response on a local port. Returns the base URL and
/// a receiver for the request line the server saw.
pub fn serve_once(status_line: &str, body: &[u8]) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let response = {
        let mut r = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status_line,
            body.len()
        )
        .into_bytes();
        r.extend_from_slice(body);
        r
    };
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        loop {
            let mut header = String::new();
            if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                break;
            }
        }
        tx.send(request_line.trim_end().to_string()).unwrap();
        let mut stream = stream;
        stream.write_all(&response).unwrap();
        stream.flush().unwrap();
    });

    (format!("http://{}", addr), rx)
}
