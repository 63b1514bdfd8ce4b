//! Scripted Gremlin Server stub for integration tests.
//!
//! Speaks just enough HTTP/1.1 for one `POST /` per connection and answers
//! through a caller-supplied closure.

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn script(&self) -> &str {
        self.body["gremlin"].as_str().unwrap_or_default()
    }
}

pub struct GremlinStub {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl GremlinStub {
    pub fn start<F>(mut respond: F) -> Self
    where
        F: FnMut(&Value) -> (u16, Value) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let requests = requests.clone();
            let stop = stop.clone();
            std::thread::spawn(move || {
                for stream in listener.incoming() {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let Ok(stream) = stream else { continue };
                    let Some(recorded) = read_request(&stream) else {
                        continue;
                    };
                    let (status, body) = respond(&recorded.body);
                    requests.lock().unwrap().push(recorded);
                    write_response(stream, status, &body);
                }
            })
        };

        Self {
            addr,
            requests,
            stop,
            handle: Some(handle),
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r.script().to_string())
            .collect()
    }
}

impl Drop for GremlinStub {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = TcpStream::connect(self.addr);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn read_request(stream: &TcpStream) -> Option<Recorded> {
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok();
    let mut reader = BufReader::new(stream.try_clone().ok()?);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).ok()? == 0 {
        return None;
    }

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            }
            headers.push((name, value));
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    Some(Recorded { headers, body })
}

fn write_response(mut stream: TcpStream, status: u16, body: &Value) {
    let bytes = serde_json::to_vec(body).unwrap_or_default();
    let reason = if status < 300 { "OK" } else { "Error" };
    let head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        bytes.len()
    );
    stream.write_all(head.as_bytes()).ok();
    stream.write_all(&bytes).ok();
    stream.flush().ok();
}

/// A successful response envelope around `data`.
pub fn ok(data: Value) -> (u16, Value) {
    (
        200,
        json!({
            "requestId": "00000000-0000-0000-0000-000000000000",
            "status": { "code": 200, "message": "", "attributes": {} },
            "result": { "data": data, "meta": {} }
        }),
    )
}

/// GraphSON 2.0 list wrapper.
pub fn g_list(items: Vec<Value>) -> Value {
    json!({ "@type": "g:List", "@value": items })
}

/// GraphSON 2.0 `valueMap(true)` row.
pub fn g_person(id: i64, name: &str, age: i64) -> Value {
    json!({
        "@type": "g:Map",
        "@value": [
            { "@type": "g:T", "@value": "id" }, { "@type": "g:Int64", "@value": id },
            { "@type": "g:T", "@value": "label" }, "person",
            "name", g_list(vec![json!(name)]),
            "age", g_list(vec![json!({ "@type": "g:Int64", "@value": age })])
        ]
    })
}

/// What Gremlin Server sends back for a failing script.
pub fn script_error(message: &str) -> (u16, Value) {
    (
        500,
        json!({
            "message": message,
            "Exception-Class": "groovy.lang.MissingPropertyException"
        }),
    )
}

/// A port nothing listens on.
pub fn dead_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    port
}
