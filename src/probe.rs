use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::types::{Candidate, ProbeOutcome};

/// A single liveness check for one candidate.
///
/// Implementations must be stateless with respect to individual calls and
/// must always return a classified outcome instead of failing.
pub trait Probe: Send + Sync + 'static {
    fn probe(&self, candidate: &Candidate) -> impl Future<Output = ProbeOutcome> + Send;
}

/// Probe backed by an HTTP verification service.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    template: String,
}

impl HttpProbe {
    /// Build a probe for `template`, bounding every request by `timeout`.
    pub fn new(template: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            template: template.into(),
        })
    }

    async fn check(&self, candidate: &Candidate) -> ProbeOutcome {
        let url = build_url(&self.template, candidate);
        let response = match self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(r) => r,
            Err(e) => return transport_error(candidate, &e),
        };
        match response.text().await {
            Ok(body) => classify_reply(candidate, &body),
            Err(e) => transport_error(candidate, &e),
        }
    }
}

impl Probe for HttpProbe {
    fn probe(&self, candidate: &Candidate) -> impl Future<Output = ProbeOutcome> + Send {
        self.check(candidate)
    }
}

/// Substitute the candidate into a request template.
///
/// `{host}` and `{ip}` are both accepted for the host; `{port}` for the port.
pub fn build_url(template: &str, candidate: &Candidate) -> String {
    template
        .replace("{host}", &candidate.host)
        .replace("{ip}", &candidate.host)
        .replace("{port}", &candidate.port)
}

/// First record of the verification service's JSON array reply.
#[derive(Debug, Default, Deserialize)]
struct VerifyRecord {
    #[serde(default, deserialize_with = "bool_like")]
    proxyip: bool,
    #[serde(default, rename = "countryCode")]
    country_code: Option<String>,
    #[serde(default, rename = "asOrganization")]
    as_organization: Option<String>,
}

/// Classify a raw verification reply body for `candidate`.
pub fn classify_reply(candidate: &Candidate, body: &str) -> ProbeOutcome {
    // Only the first record is read; later elements may be anything.
    let records: Vec<serde_json::Value> = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => return parse_error(candidate, &e),
    };
    let Some(first) = records.into_iter().next() else {
        return parse_error(candidate, &"reply is an empty array");
    };
    let first = match VerifyRecord::deserialize(first) {
        Ok(r) => r,
        Err(e) => return parse_error(candidate, &e),
    };

    if first.proxyip {
        ProbeOutcome::Alive {
            host: candidate.host.clone(),
            port: candidate.port.clone(),
            country_code: non_empty(first.country_code),
            org_name: non_empty(first.as_organization),
        }
    } else {
        ProbeOutcome::Dead {
            host: candidate.host.clone(),
            port: candidate.port.clone(),
        }
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

fn transport_error(candidate: &Candidate, cause: &dyn std::fmt::Display) -> ProbeOutcome {
    ProbeOutcome::Error {
        host: candidate.host.clone(),
        port: candidate.port.clone(),
        reason: format!("Error checking {candidate}: {cause}"),
    }
}

fn parse_error(candidate: &Candidate, cause: &dyn std::fmt::Display) -> ProbeOutcome {
    ProbeOutcome::Error {
        host: candidate.host.clone(),
        port: candidate.port.clone(),
        reason: format!("Error parsing JSON for {candidate}: {cause}"),
    }
}

/// Accept `true`/`false`, numbers, and textual booleans; `null` is false.
fn bool_like<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolLike {
        Bool(bool),
        Number(f64),
        Text(String),
    }

    Ok(match Option::<BoolLike>::deserialize(deserializer)? {
        Some(BoolLike::Bool(b)) => b,
        Some(BoolLike::Number(n)) => n != 0.0,
        Some(BoolLike::Text(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        ),
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand() -> Candidate {
        Candidate::new("1.1.1.1", "8080")
    }

    #[test]
    fn url_substitutes_both_host_placeholders() {
        let c = cand();
        assert_eq!(
            build_url("https://check.example/{ip}:{port}", &c),
            "https://check.example/1.1.1.1:8080"
        );
        assert_eq!(
            build_url("http://x/?h={host}&p={port}", &c),
            "http://x/?h=1.1.1.1&p=8080"
        );
    }

    #[test]
    fn alive_reply_carries_metadata() {
        let body = r#"[{"proxyip": true, "countryCode": "US", "asOrganization": "OrgA"}]"#;
        assert_eq!(
            classify_reply(&cand(), body),
            ProbeOutcome::Alive {
                host: "1.1.1.1".into(),
                port: "8080".into(),
                country_code: Some("US".into()),
                org_name: Some("OrgA".into()),
            }
        );
    }

    #[test]
    fn missing_flag_means_dead() {
        let body = r#"[{"countryCode": "DE"}]"#;
        assert!(matches!(classify_reply(&cand(), body), ProbeOutcome::Dead { .. }));
    }

    #[test]
    fn textual_flag_accepted_and_metadata_optional() {
        let body = r#"[{"proxyip": "true", "countryCode": null}, {"proxyip": false}]"#;
        match classify_reply(&cand(), body) {
            ProbeOutcome::Alive {
                country_code,
                org_name,
                ..
            } => {
                assert_eq!(country_code, None);
                assert_eq!(org_name, None);
            }
            other => panic!("expected alive, got {other:?}"),
        }
    }

    #[test]
    fn only_first_record_is_read() {
        let body = r#"[{"proxyip": true, "countryCode": "US"}, {"proxyip": {"nested": 1}}, 7]"#;
        match classify_reply(&cand(), body) {
            ProbeOutcome::Alive { country_code, .. } => {
                assert_eq!(country_code.as_deref(), Some("US"));
            }
            other => panic!("expected alive, got {other:?}"),
        }
    }

    #[test]
    fn malformed_and_empty_replies_are_errors() {
        for body in ["not json", "{}", "[]", "[42]", r#"[{"proxyip": {"x": 1}}]"#] {
            match classify_reply(&cand(), body) {
                ProbeOutcome::Error { reason, .. } => {
                    assert!(reason.starts_with("Error parsing JSON for 1.1.1.1:8080"), "{reason}");
                }
                other => panic!("expected error for {body:?}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = HttpProbe::new(
            format!("http://{addr}/{{ip}}:{{port}}"),
            Duration::from_secs(2),
        )
        .unwrap();
        match probe.probe(&cand()).await {
            ProbeOutcome::Error { reason, .. } => {
                assert!(reason.starts_with("Error checking 1.1.1.1:8080: "), "{reason}");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
