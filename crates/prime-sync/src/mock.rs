//! Scripted transport for tests

use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::FetchError;
use crate::transport::{HttpResponse, Transport};

enum Reply {
    Response(HttpResponse),
    Failure(String),
}

/// Replies to known URLs and answers 404 to anything else, recording every request
#[derive(Default)]
pub struct ScriptedTransport {
    replies: HashMap<String, Reply>,
    requests: RefCell<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(self, url: &str, body: Value) -> Self {
        self.with_status(url, 200, &body.to_string())
    }

    pub fn with_status(mut self, url: &str, status: u16, body: &str) -> Self {
        self.replies.insert(
            url.to_string(),
            Reply::Response(HttpResponse {
                status,
                body: body.to_string(),
            }),
        );
        self
    }

    pub fn with_failure(mut self, url: &str, message: &str) -> Self {
        self.replies
            .insert(url.to_string(), Reply::Failure(message.to_string()));
        self
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.requests.borrow_mut().push(url.to_string());
        match self.replies.get(url) {
            Some(Reply::Response(response)) => Ok(response.clone()),
            Some(Reply::Failure(message)) => Err(FetchError::Request {
                url: url.to_string(),
                source: message.clone().into(),
            }),
            None => Ok(HttpResponse {
                status: 404,
                body: String::new(),
            }),
        }
    }
}

/// A `queryResponse` envelope
pub fn page(count: i64, last: i64, entity: Vec<Value>) -> Value {
    json!({
        "queryResponse": {
            "@count": count,
            "@first": 0,
            "@last": last,
            "entity": entity
        }
    })
}

pub fn device_row(name: &str, admin_status: &str, software_type: &str) -> Value {
    json!({
        "devicesDTO": {
            "deviceName": name,
            "adminStatus": admin_status,
            "softwareType": software_type
        }
    })
}

pub fn group_row(id: i64, name: &str, parent_id: i64, path: &str) -> Value {
    json!({
        "groupSpecificationDTO": {
            "@id": id,
            "groupName": name,
            "parentId": parent_id,
            "groupPath": path
        }
    })
}
