use std::future::Future;
use std::time::Duration;

use reqwest::Url;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ClientError;
use crate::models::{
    AppliedResponse, ApplicationSubmission, ApplyResponse, JobDescriptor, ListKind, UserRecord,
};
use crate::session::Session;

// --- Backend traits ---

/// Admin endpoints behind the bearer credential.
pub trait AdminBackend {
    fn list_users(
        &self,
        list: ListKind,
    ) -> impl Future<Output = Result<Vec<UserRecord>, ClientError>> + Send;

    fn delete_user(
        &self,
        list: ListKind,
        id: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}

/// Public job-link endpoints used by the application form.
pub trait JobsBackend {
    fn fetch_job(
        &self,
        link_id: &str,
    ) -> impl Future<Output = Result<JobDescriptor, ClientError>> + Send;

    fn has_applied(
        &self,
        link_id: &str,
        email: &str,
    ) -> impl Future<Output = Result<bool, ClientError>> + Send;

    fn apply(
        &self,
        link_id: &str,
        submission: &ApplicationSubmission,
    ) -> impl Future<Output = Result<ApplyResponse, ClientError>> + Send;
}

// --- reqwest implementation ---

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    api_base: String,
    base_url: Url,
    session: Session,
}

impl HttpClient {
    pub fn new(api_base: &str, session: Session, timeout: Duration) -> Result<Self, ClientError> {
        let api_base = api_base.trim_end_matches('/').to_string();
        let base_url = Url::parse(&api_base)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidBase(api_base.clone()))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hirex/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_base,
            base_url,
            session,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Appends path segments to the API base. Each segment is
    /// percent-encoded, so ids cannot change the route.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn admin_url(&self, list: ListKind, id: Option<&str>) -> Url {
        match id {
            Some(id) => self.endpoint(&["admin", list.path_segment(), id]),
            None => self.endpoint(&["admin", list.path_segment()]),
        }
    }

    fn job_url(&self, link_id: &str, action: Option<&str>) -> Url {
        match action {
            Some(action) => self.endpoint(&["jobs", link_id, action]),
            None => self.endpoint(&["jobs", link_id]),
        }
    }

    fn bearer(&self) -> Result<HeaderValue, ClientError> {
        HeaderValue::from_str(&self.session.authorization()).map_err(|e| {
            ClientError::Storage(format!("stored token is not a valid header value: {e}"))
        })
    }
}

/// Turns a non-2xx response into `ClientError::Status`, pulling `message`
/// out of a JSON error body when there is one.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string));

    tracing::debug!("backend returned {}: {}", status, body);
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl AdminBackend for HttpClient {
    async fn list_users(&self, list: ListKind) -> Result<Vec<UserRecord>, ClientError> {
        let url = self.admin_url(list, None);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, self.bearer()?)
            .send()
            .await?;
        let bytes = check_status(response).await?.bytes().await?;

        // any 2xx body that is not a JSON array is an empty list
        let body = serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|e| {
            tracing::warn!("{} list body is not JSON: {}", list.label(), e);
            Value::Null
        });
        Ok(UserRecord::parse_list(body))
    }

    async fn delete_user(&self, list: ListKind, id: &str) -> Result<(), ClientError> {
        let url = self.admin_url(list, Some(id));
        tracing::info!("DELETE {}", url);

        let response = self
            .client
            .delete(url)
            .header(AUTHORIZATION, self.bearer()?)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

impl JobsBackend for HttpClient {
    async fn fetch_job(&self, link_id: &str) -> Result<JobDescriptor, ClientError> {
        let url = self.job_url(link_id, None);
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        read_json(check_status(response).await?).await
    }

    async fn has_applied(&self, link_id: &str, email: &str) -> Result<bool, ClientError> {
        let url = self.job_url(link_id, Some("applied"));
        tracing::debug!("GET {} (duplicate check)", url);

        let response = self.client.get(url).query(&[("email", email)]).send().await?;
        let body: AppliedResponse = read_json(check_status(response).await?).await?;
        Ok(body.applied)
    }

    async fn apply(
        &self,
        link_id: &str,
        submission: &ApplicationSubmission,
    ) -> Result<ApplyResponse, ClientError> {
        let url = self.job_url(link_id, Some("apply"));
        tracing::info!("POST {} as {:?}", url, submission.profile_type);

        let response = self.client.post(url).json(submission).send().await?;
        let bytes = check_status(response).await?.bytes().await?;

        // The application is accepted once the status is 2xx, whatever the body says.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(ApplyResponse::default());
        }
        match serde_json::from_slice(&bytes) {
            Ok(body) => Ok(body),
            Err(e) => {
                tracing::warn!("apply response for {} is not JSON: {}", link_id, e);
                Ok(ApplyResponse::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileType;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn client() -> HttpClient {
        HttpClient::new(
            "http://localhost:8080/api/",
            Session::new(Some("t0k".to_string())),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn client_at(base: &str, token: Option<&str>) -> HttpClient {
        HttpClient::new(base, Session::new(token.map(str::to_string)), Duration::from_secs(5))
            .unwrap()
    }

    /// Answers exactly one request with `status` and `body`, then hands back
    /// the raw request it received.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                    continue;
                };
                let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
                let content_length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + content_length {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });

        (base, handle)
    }

    fn submission() -> ApplicationSubmission {
        ApplicationSubmission {
            name: "Asha".to_string(),
            email: "asha@mail.io".to_string(),
            profile_type: ProfileType::Student,
            college: Some("IIT".to_string()),
            cgpa: None,
            is_fresher: None,
            degree: None,
            company: None,
            lpa: None,
            years_exp: None,
            skills: vec!["Rust".to_string()],
        }
    }

    #[test]
    fn test_admin_urls() {
        let client = client();
        assert_eq!(client.api_base(), "http://localhost:8080/api");
        assert_eq!(
            client.admin_url(ListKind::Candidate, None).as_str(),
            "http://localhost:8080/api/admin/candidates"
        );
        assert_eq!(
            client.admin_url(ListKind::Recruiter, Some("r9")).as_str(),
            "http://localhost:8080/api/admin/recruiters/r9"
        );
    }

    #[test]
    fn test_job_urls() {
        let client = client();
        assert_eq!(client.job_url("abc", None).as_str(), "http://localhost:8080/api/jobs/abc");
        assert_eq!(
            client.job_url("abc", Some("applied")).as_str(),
            "http://localhost:8080/api/jobs/abc/applied"
        );
    }

    #[test]
    fn test_ids_are_escaped_in_paths() {
        let client = client();
        assert_eq!(
            client.job_url("a/b?c#d", Some("apply")).as_str(),
            "http://localhost:8080/api/jobs/a%2Fb%3Fc%23d/apply"
        );
        assert_eq!(
            client.admin_url(ListKind::Candidate, Some("../x")).as_str(),
            "http://localhost:8080/api/admin/candidates/..%2Fx"
        );
    }

    #[test]
    fn test_invalid_base_rejected() {
        let result = HttpClient::new("not a url", Session::default(), Duration::from_secs(5));
        assert!(matches!(result, Err(ClientError::InvalidBase(_))));
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(client().bearer().unwrap(), "Bearer t0k");

        let anonymous = client_at("http://localhost:8080/api", None);
        assert_eq!(anonymous.bearer().unwrap(), "Bearer undefined");
    }

    #[tokio::test]
    async fn test_list_users_sends_bearer() {
        let (base, server) = serve_once(
            "200 OK",
            r#"[{"_id":"c1","name":"Asha","email":"asha@mail.io","role":"Candidate"}]"#,
        )
        .await;

        let users = client_at(&base, Some("t0k")).list_users(ListKind::Candidate).await.unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "c1");
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/admin/candidates HTTP/1.1"));
        assert!(request.to_lowercase().contains("authorization: bearer t0k"));
    }

    #[tokio::test]
    async fn test_list_users_without_token_sends_undefined() {
        let (base, server) = serve_once("200 OK", "[]").await;

        client_at(&base, None).list_users(ListKind::Recruiter).await.unwrap();

        let request = server.await.unwrap().to_lowercase();
        assert!(request.contains("authorization: bearer undefined"));
    }

    #[tokio::test]
    async fn test_list_users_non_array_bodies_are_empty() {
        for body in ["<html>ok</html>", "", r#"{"users":[]}"#] {
            let (base, server) = serve_once("200 OK", body).await;
            let users = client_at(&base, Some("t0k")).list_users(ListKind::Candidate).await;
            assert!(users.unwrap().is_empty(), "body {:?} should give an empty list", body);
            server.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_error_status_carries_backend_message() {
        let (base, server) = serve_once("404 Not Found", r#"{"message":"User not found"}"#).await;

        let err = client_at(&base, Some("t0k"))
            .delete_user(ListKind::Recruiter, "r/9")
            .await
            .unwrap_err();

        assert_eq!(err.backend_message(), Some("User not found"));
        assert!(matches!(err, ClientError::Status { status: 404, .. }));
        let request = server.await.unwrap();
        assert!(request.starts_with("DELETE /api/admin/recruiters/r%2F9 HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_error_status_without_json_has_no_message() {
        let (base, server) = serve_once("500 Internal Server Error", "boom").await;

        let err = client_at(&base, None).fetch_job("L1").await.unwrap_err();

        assert!(matches!(err, ClientError::Status { status: 500, message: None }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_has_applied_is_public_and_encodes_email() {
        let (base, server) = serve_once("200 OK", r#"{"applied":true}"#).await;

        let applied = client_at(&base, Some("t0k")).has_applied("L1", "a+b@x.io").await.unwrap();

        assert!(applied);
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/jobs/L1/applied?email=a%2Bb%40x.io HTTP/1.1"));
        assert!(!request.to_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_apply_posts_json_and_reads_response() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"alreadyApplied":true,"message":"Seen you before"}"#,
        )
        .await;

        let response = client_at(&base, None).apply("L1", &submission()).await.unwrap();

        assert_eq!(response.already_applied, Some(true));
        assert_eq!(response.message.as_deref(), Some("Seen you before"));
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/jobs/L1/apply HTTP/1.1"));
        assert!(request.contains(r#""profileType":"student""#));
        assert!(!request.contains("yearsExp"));
    }

    #[tokio::test]
    async fn test_apply_success_without_json_body_is_accepted() {
        let replies = [
            ("201 Created", "Application received"),
            ("200 OK", ""),
            ("200 OK", " \n"),
        ];
        for (status, body) in replies {
            let (base, server) = serve_once(status, body).await;
            let response = client_at(&base, None).apply("L1", &submission()).await.unwrap();
            assert_eq!(response.already_applied, None);
            assert_eq!(response.message, None);
            server.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_apply_rejection_surfaces_message() {
        let (base, server) =
            serve_once("400 Bad Request", r#"{"message":"Applications are closed"}"#).await;

        let err = client_at(&base, None).apply("L1", &submission()).await.unwrap_err();

        assert_eq!(err.backend_message(), Some("Applications are closed"));
        server.await.unwrap();
    }
}
