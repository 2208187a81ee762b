//! Jira tracker: the REST API v2 over blocking HTTPS.
//!
//! One `ureq` agent per tracker, authenticated with HTTP Basic and optionally
//! routed through a proxy. All calls are synchronous.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::ClientConfig;
use crate::model::{Comment, CommentHandle, CommentId, RawTicket, TicketSummary};

use super::{Result, Tracker, TrackerError};

/// Search results requested per page.
const PAGE_SIZE: usize = 100;

/// A [`Tracker`] backed by a Jira server.
pub struct JiraTracker {
    agent: ureq::Agent,
    endpoint: String,
    auth: SecretString,

    /// Custom field id of the designated field, e.g. `customfield_14000`.
    field: String,
}

impl fmt::Debug for JiraTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraTracker")
            .field("endpoint", &self.endpoint)
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

impl JiraTracker {
    /// Builds a tracker for the given client configuration and designated field.
    pub fn new(client: &ClientConfig, field: impl Into<String>) -> Result<Self> {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(proxy) = &client.proxy {
            let proxy = ureq::Proxy::new(proxy)
                .map_err(|e| TrackerError::service(format!("invalid proxy '{proxy}'"), e))?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            agent: builder.build(),
            endpoint: client.endpoint.trim_end_matches('/').to_string(),
            auth: basic_auth(&client.identity, &client.secret),
            field: field.into(),
        })
    }

    fn api(&self, path: &str) -> String {
        format!("{}/rest/api/2/{path}", self.endpoint)
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Authorization", self.auth.expose_secret())
            .set("Accept", "application/json")
    }

    /// Sends a request, mapping a 404 to `NotFound(subject)`.
    fn execute(
        &self,
        request: ureq::Request,
        body: Option<Value>,
        subject: &str,
    ) -> Result<ureq::Response> {
        let method = request.method().to_string();
        let url = request.url().to_string();
        debug!(%method, %url, "ticket service request");

        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };

        match result {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(404, _)) => Err(TrackerError::NotFound(subject.to_string())),
            Err(ureq::Error::Status(code, response)) => Err(TrackerError::Status {
                method,
                url,
                code,
                detail: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(transport)) => Err(TrackerError::service(
                format!("{method} {url} failed"),
                transport,
            )),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, request: ureq::Request, subject: &str) -> Result<T> {
        let url = request.url().to_string();
        self.execute(request, None, subject)?
            .into_json()
            .map_err(|e| TrackerError::service(format!("unexpected response from {url}"), e))
    }
}

impl Tracker for JiraTracker {
    fn fetch_ticket(&self, key: &str) -> Result<RawTicket> {
        let fields = format!("summary,comment,{}", self.field);
        let request = self
            .request("GET", &self.api(&format!("issue/{key}")))
            .query("fields", &fields);
        let issue: JiraIssue = self.get_json(request, key)?;
        Ok(to_raw_ticket(issue, &self.field))
    }

    fn update_field(&self, key: &str, text: &str) -> Result<()> {
        let mut fields = Map::new();
        fields.insert(self.field.clone(), Value::String(text.to_string()));
        let request = self.request("PUT", &self.api(&format!("issue/{key}")));
        self.execute(request, Some(json!({ "fields": fields })), key)?;
        Ok(())
    }

    fn search(&self, query: &str) -> Result<Vec<TicketSummary>> {
        let url = self.api("search");
        let page_size = PAGE_SIZE.to_string();
        let mut results = Vec::new();
        let mut start_at = 0_usize;

        loop {
            let request = self
                .request("GET", &url)
                .query("jql", query)
                .query("fields", "summary")
                .query("startAt", &start_at.to_string())
                .query("maxResults", &page_size);
            let page: JiraSearchPage = self.get_json(request, query)?;

            let count = page.issues.len();
            results.extend(page.issues.into_iter().map(|issue| TicketSummary {
                key: issue.key,
                summary: issue.fields.summary,
            }));

            start_at += count;
            if count == 0 || start_at >= page.total {
                break;
            }
        }

        Ok(results)
    }

    fn add_comment(&self, key: &str, body: &str) -> Result<CommentId> {
        let request = self.request("POST", &self.api(&format!("issue/{key}/comment")));
        let created: JiraComment = self
            .execute(request, Some(json!({ "body": body })), key)?
            .into_json()
            .map_err(|e| TrackerError::service("unexpected comment response", e))?;

        Ok(CommentId {
            key: key.to_string(),
            id: created.id,
        })
    }

    fn get_comment(&self, id: &CommentId) -> Result<CommentHandle> {
        let request = self.request(
            "GET",
            &self.api(&format!("issue/{}/comment/{}", id.key, id.id)),
        );
        let comment: JiraComment = self.get_json(request, &id.to_string())?;

        Ok(CommentHandle {
            comment: id.clone(),
            body: comment.body,
        })
    }

    fn update_comment(&self, handle: &CommentHandle, body: &str) -> Result<()> {
        let id = &handle.comment;
        let request = self.request(
            "PUT",
            &self.api(&format!("issue/{}/comment/{}", id.key, id.id)),
        );
        self.execute(request, Some(json!({ "body": body })), &id.to_string())?;
        Ok(())
    }

    fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{key}", self.endpoint)
    }
}

/// `Authorization` header value for HTTP Basic.
fn basic_auth(identity: &str, secret: &SecretString) -> SecretString {
    let credentials = format!("{identity}:{}", secret.expose_secret());
    SecretString::from(format!("Basic {}", STANDARD.encode(credentials)))
}

fn to_raw_ticket(issue: JiraIssue, field: &str) -> RawTicket {
    let JiraIssue { key, mut fields } = issue;

    let field = match fields.rest.remove(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        // Not a plain text field; hand the JSON to the codec as-is.
        Some(other) => Some(other.to_string()),
    };

    let comments = fields
        .comment
        .map(|page| page.comments)
        .unwrap_or_default()
        .into_iter()
        .map(|c| {
            let (author_name, author_id) = match c.author {
                Some(author) => (
                    author.display_name,
                    author.name.or(author.account_id).unwrap_or_default(),
                ),
                None => (String::new(), String::new()),
            };
            Comment {
                id: c.id,
                body: c.body,
                created: c.created,
                author_name,
                author_id,
            }
        })
        .collect();

    RawTicket {
        key,
        summary: fields.summary,
        field,
        comments,
    }
}

// ── Response shapes ──

/// JSON shape of `GET /issue/{key}`.
#[derive(Deserialize)]
struct JiraIssue {
    key: String,
    fields: JiraFields,
}

#[derive(Deserialize)]
struct JiraFields {
    #[serde(default)]
    summary: String,

    comment: Option<JiraCommentPage>,

    /// Custom fields, keyed by field id.
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Deserialize)]
struct JiraCommentPage {
    comments: Vec<JiraComment>,
}

#[derive(Deserialize)]
struct JiraComment {
    id: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    created: String,
    author: Option<JiraUser>,
}

/// Server deployments report `name`; cloud deployments only `accountId`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraUser {
    #[serde(default)]
    display_name: String,
    name: Option<String>,
    account_id: Option<String>,
}

/// JSON shape of `GET /search`.
#[derive(Deserialize)]
struct JiraSearchPage {
    #[serde(default)]
    total: usize,
    issues: Vec<JiraSearchIssue>,
}

#[derive(Deserialize)]
struct JiraSearchIssue {
    key: String,
    fields: JiraSummaryFields,
}

#[derive(Deserialize)]
struct JiraSummaryFields {
    #[serde(default)]
    summary: String,
}
