#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use swordfish::client::{ApiRequest, RawResponse, StatusClient, Transport};
use swordfish::settings::ServiceSettings;
use swordfish::SwordfishError;

pub const DOCUMENT: &str = r#"
[caller_settings]
config_name = "dna_r9.4.1_450bps_fast"
host = "127.0.0.1"
port = 5555
barcode_kits = ["EXP-NBD104"]

[conditions]
reference = "/data/hg38.mmi"

[conditions.classified]
name = "classified"
control = false
min_chunks = 0
max_chunks = 2
targets = []
single_on = "stop_receiving"
multi_on = "stop_receiving"
single_off = "stop_receiving"
multi_off = "stop_receiving"
no_seq = "proceed"
no_map = "proceed"

[conditions.unclassified]
name = "unclassified_reads"
control = false
min_chunks = 0
max_chunks = 2
targets = []
single_on = "unblock"
multi_on = "unblock"
single_off = "unblock"
multi_off = "unblock"
no_seq = "proceed"
no_map = "proceed"

[conditions.barcode07]
name = "barcode07"
control = false
min_chunks = 1
max_chunks = 8
targets = ["chr1:100-200"]
single_on = "proceed"
multi_on = "proceed"
single_off = "stop_receiving"
multi_off = "stop_receiving"
no_seq = "proceed"
no_map = "proceed"
"#;

pub const PRESETS: &str = r#"
[chunk_settings]
min_chunks = 0
max_chunks = 4

[unblock_behaviour]
single_on = "unblock"
"#;

/// Write the sample document (and presets) into `dir`; returns the document path.
pub fn write_fixtures(dir: &Path) -> (PathBuf, PathBuf) {
    let document = dir.join("exp.toml");
    let presets = dir.join("presets.toml");
    fs::write(&document, DOCUMENT).expect("write document");
    fs::write(&presets, PRESETS).expect("write presets");
    (document, presets)
}

pub fn ok(body: &str) -> RawResponse {
    RawResponse::new(200, body)
}

pub fn status(code: u16) -> RawResponse {
    RawResponse::new(code, "")
}

#[derive(Default)]
struct Script {
    routes: Vec<(String, VecDeque<RawResponse>)>,
    requests: Vec<ApiRequest>,
}

/// Fake minoTour: replies are scripted per URL fragment. Each route plays
/// its responses in order and keeps repeating the last one.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, fragment: &str, responses: Vec<RawResponse>) -> Self {
        self.script
            .lock()
            .unwrap()
            .routes
            .push((fragment.to_string(), responses.into()));
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn count(&self, fragment: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.url.contains(fragment))
            .count()
    }

    pub fn client(&self) -> StatusClient {
        let settings = ServiceSettings::new("mt.test", 8100, "secret").unwrap();
        StatusClient::new(&settings, Box::new(self.clone()))
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &ApiRequest) -> Result<RawResponse, SwordfishError> {
        let mut script = self.script.lock().unwrap();
        script.requests.push(request.clone());
        let queue = script
            .routes
            .iter_mut()
            .find(|(fragment, _)| request.url.contains(fragment.as_str()))
            .map(|(_, queue)| queue);
        let Some(queue) = queue else {
            return Ok(RawResponse::new(404, ""));
        };
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        Ok(response.unwrap_or_else(|| RawResponse::new(404, "")))
    }
}
