//! Report generation through the Gemini generative API.
//!
//! The application sends a prompt assembled from a test session's results,
//! bugs and logs, and stores the returned HTML verbatim — no parsing or
//! validation beyond non-emptiness.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::app::db::{bug_tickets::BugTicket, session_logs::SessionLog, test_results::TestResult};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Everything the prompt is assembled from.
pub struct ReportData<'a> {
    pub session_id: &'a str,
    pub project_name: &'a str,
    pub results: &'a [TestResult],
    pub bugs: &'a [BugTicket],
    pub logs: &'a [SessionLog],
}

#[derive(Debug)]
pub enum ReportError {
    /// GEMINI_API_KEY is not configured.
    Unconfigured,
    /// The HTTP call failed or the API answered with a non-success status.
    Api(String),
    /// The API answered, but without usable content.
    EmptyResponse,
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Unconfigured => write!(f, "report API key is not configured"),
            ReportError::Api(msg) => write!(f, "report API error: {msg}"),
            ReportError::EmptyResponse => write!(f, "report API returned no content"),
        }
    }
}

impl std::error::Error for ReportError {}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Thin client over the generateContent endpoint.
pub struct GeminiClient<'a> {
    http: &'a reqwest::Client,
    api_key: &'a str,
    model: &'a str,
}

impl<'a> GeminiClient<'a> {
    pub fn new(http: &'a reqwest::Client, api_key: &'a str, model: &'a str) -> Self {
        Self { http, api_key, model }
    }

    /// Send one prompt, return the first candidate's text.
    pub async fn generate(&self, prompt: String) -> Result<String, ReportError> {
        let url = format!(
            "{BASE_URL}/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReportError::Api(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Api(format!("{status}: {body}")));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ReportError::Api(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ReportError::EmptyResponse);
        }
        Ok(text)
    }

    /// Generate the HTML report for one test session.
    pub async fn generate_test_report(&self, data: &ReportData<'_>) -> Result<String, ReportError> {
        self.generate(build_prompt(data)).await
    }
}

/// Assemble the report prompt from the session's data.
pub fn build_prompt(data: &ReportData<'_>) -> String {
    let screenshots: Vec<&str> = data
        .logs
        .iter()
        .filter_map(|l| l.screenshot.as_deref())
        .filter(|s| !s.trim().is_empty())
        .collect();

    format!(
        "Generate a detailed HTML report for the following automated website \
         test session.\n\n\
         ## Session\n\
         - Session ID: {session_id}\n\
         - Project: {project_name}\n\
         - Test results: {result_count}\n\
         - Bugs found: {bug_count}\n\
         - Log entries: {log_count}\n\
         - Screenshots: {screenshot_count}\n\n\
         ## Test results\n{results}\n\n\
         ## Bugs\n{bugs}\n\n\
         ## Logs\n{logs}\n\n\
         Produce a single self-contained HTML document with a summary \
         section, a per-page result table and a bug list ordered by \
         severity.",
        session_id = data.session_id,
        project_name = data.project_name,
        result_count = data.results.len(),
        bug_count = data.bugs.len(),
        log_count = data.logs.len(),
        screenshot_count = screenshots.len(),
        results = serde_json::to_string_pretty(data.results).unwrap_or_default(),
        bugs = serde_json::to_string_pretty(data.bugs).unwrap_or_default(),
        logs = serde_json::to_string_pretty(data.logs).unwrap_or_default(),
    )
}

/// Machine-readable summary stored next to the generated HTML.
pub fn build_summary(data: &ReportData<'_>, generated_at: time::OffsetDateTime) -> Value {
    let passed = data.results.iter().filter(|r| r.status == "passed").count();
    let failed = data.results.iter().filter(|r| r.status == "failed").count();
    let by_severity = |severity: &str| data.bugs.iter().filter(|b| b.severity == severity).count();

    json!({
        "testSessionId": data.session_id,
        "projectName": data.project_name,
        "totalTests": data.results.len(),
        "passedTests": passed,
        "failedTests": failed,
        "totalBugs": data.bugs.len(),
        "criticalBugs": by_severity("critical"),
        "highBugs": by_severity("high"),
        "mediumBugs": by_severity("medium"),
        "lowBugs": by_severity("low"),
        "generatedAt": generated_at.unix_timestamp(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn result(status: &str) -> TestResult {
        TestResult {
            id: "r".into(),
            organization_id: "o".into(),
            test_session_id: "s".into(),
            url: "https://example.com".into(),
            status: status.into(),
            execution_time_ms: 12,
            screenshot: None,
            console_logs: None,
            network_logs: None,
            user_actions: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn bug(severity: &str) -> BugTicket {
        BugTicket {
            id: "b".into(),
            organization_id: "o".into(),
            project_id: "p".into(),
            test_session_id: Some("s".into()),
            test_result_id: None,
            reported_by: None,
            title: "Broken link".into(),
            description: None,
            severity: severity.into(),
            bug_type: "functional".into(),
            status: "open".into(),
            url: None,
            steps: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn log(screenshot: Option<&str>) -> SessionLog {
        SessionLog {
            id: "l".into(),
            organization_id: "o".into(),
            test_session_id: "s".into(),
            level: "info".into(),
            message: "visited page".into(),
            screenshot: screenshot.map(|s| s.to_string()),
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn summary_counts_by_status_and_severity() {
        let results = vec![result("passed"), result("passed"), result("failed")];
        let bugs = vec![bug("critical"), bug("low"), bug("low")];
        let logs = vec![];
        let data = ReportData {
            session_id: "s1",
            project_name: "Storefront",
            results: &results,
            bugs: &bugs,
            logs: &logs,
        };
        let summary = build_summary(&data, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(summary["totalTests"], 3);
        assert_eq!(summary["passedTests"], 2);
        assert_eq!(summary["failedTests"], 1);
        assert_eq!(summary["totalBugs"], 3);
        assert_eq!(summary["criticalBugs"], 1);
        assert_eq!(summary["lowBugs"], 2);
        assert_eq!(summary["generatedAt"], 0);
    }

    #[test]
    fn prompt_names_the_project_and_counts_screenshots() {
        let results = vec![result("passed")];
        let bugs = vec![];
        let logs = vec![log(Some("shot.png")), log(Some("  ")), log(None)];
        let data = ReportData {
            session_id: "s1",
            project_name: "Storefront",
            results: &results,
            bugs: &bugs,
            logs: &logs,
        };
        let prompt = build_prompt(&data);
        assert!(prompt.contains("Project: Storefront"));
        assert!(prompt.contains("Screenshots: 1"));
        assert!(prompt.contains("HTML"));
    }
}
