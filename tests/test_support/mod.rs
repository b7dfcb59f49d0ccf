#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub const ADMIN_EMAIL: &str = "root@districtd.local";
pub const ADMIN_PASSWORD: &str = "super-secret-1";

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub struct Sidecar {
    pub child: Child,
    pub stdin: ChildStdin,
    pub reader: BufReader<ChildStdout>,
    next_id: u64,
}

pub fn spawn_sidecar() -> Sidecar {
    let exe = env!("CARGO_BIN_EXE_districtd");
    let mut child = Command::new(exe)
        .env_remove("DISTRICTD_WORKSPACE")
        .env_remove("DISTRICTD_SEED_CSV")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn districtd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    Sidecar {
        child,
        stdin,
        reader: BufReader::new(stdout),
        next_id: 0,
    }
}

impl Sidecar {
    pub fn send_line(&mut self, line: &str) -> serde_json::Value {
        writeln!(self.stdin, "{}", line).expect("write request");
        self.stdin.flush().expect("flush request");
        let mut out = String::new();
        self.reader.read_line(&mut out).expect("read response line");
        assert!(!out.trim().is_empty(), "empty response for {}", line);
        serde_json::from_str(out.trim()).expect("parse response json")
    }

    pub fn request(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let payload = json!({ "id": id, "method": method, "params": params });
        let value = self.send_line(&payload.to_string());
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    pub fn request_ok(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or(serde_json::Value::Null)
    }

    /// Returns the error code of a request expected to fail.
    pub fn request_err(&mut self, method: &str, params: serde_json::Value) -> String {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value
            .pointer("/error/code")
            .and_then(|v| v.as_str())
            .expect("error code")
            .to_string()
    }

    /// Opens the workspace, creates the first super admin, signs in and
    /// picks a district.
    pub fn bootstrap(&mut self, workspace: &std::path::Path, district: &str) {
        self.request_ok("workspace.select", json!({ "path": workspace.to_string_lossy() }));
        self.request_ok(
            "users.create",
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD, "role": "super_admin" }),
        );
        self.request_ok(
            "auth.login",
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        );
        self.request_ok("auth.selectDistrict", json!({ "district": district }));
    }

    pub fn finish(mut self) {
        drop(self.stdin);
        let _ = self.child.wait();
    }
}

pub fn institution(id: &str, name: &str, category: &str, domains: &[&str], tools: &[&str]) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "category": category,
        "location": { "area": "Mangaluru", "lat": 12.91, "lng": 74.85 },
        "domains": domains,
        "tools": tools,
        "degrees": ["B.E"],
        "coe": false,
        "intake": 120,
        "placed": 60,
    })
}
