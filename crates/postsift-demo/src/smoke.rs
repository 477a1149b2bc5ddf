//! Fallback demonstration traffic

use postsift_client::{Classify, ClassifierClient, ClientConfig};
use postsift_core::{ClassificationRequest, Endpoint, Error};

use crate::stub::{spawn_stub, FaultConfig};

const SAMPLE_POSTS: [&str; 6] = [
    "Lovely weather in the capital today",
    "The minister's new budget bill goes to a vote on Tuesday",
    "They are hiding the truth about the miracle cure, wake up",
    "Members of that sect are vermin and traitors to the faith",
    "March on their offices and burn them down",
    "\u{2600}\u{FE0F}\u{1F30A}",
];

/// Push sample posts through a real fallback client.
///
/// Without explicit endpoints, two local stubs are started: the first always
/// reports a service error, so every verdict demonstrates the fallback.
pub async fn run_smoke(endpoint_urls: Vec<String>) -> anyhow::Result<()> {
    let endpoints = if endpoint_urls.is_empty() {
        println!("No endpoints given, starting two local stubs (one broken, one healthy)");
        let failing = spawn_stub(
            "flaky",
            FaultConfig {
                error_rate: 1.0,
                ..Default::default()
            },
        )
        .await?;
        let healthy = spawn_stub("healthy", FaultConfig::default()).await?;
        vec![
            Endpoint::named("flaky", failing),
            Endpoint::named("healthy", healthy),
        ]
    } else {
        endpoint_urls.into_iter().map(Endpoint::new).collect()
    };

    println!("Fallback order:");
    for (i, endpoint) in endpoints.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, endpoint.display_name(), endpoint.url);
    }
    println!();

    let client = ClassifierClient::new(ClientConfig::new(endpoints).with_timeout_ms(5_000))?;

    let mut exhausted = 0usize;
    for text in SAMPLE_POSTS {
        let request = ClassificationRequest::from_text(text).with_source("smoke");
        match client.classify(&request).await {
            Ok(verdict) => println!(
                "{:<58} -> {:<36} via {} ({} ms)",
                text, verdict.label, verdict.endpoint, verdict.latency_ms
            ),
            Err(Error::Exhausted(report)) => {
                exhausted += 1;
                println!("{:<58} -> unavailable ({})", text, report.summary());
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!();
    if exhausted == 0 {
        println!("All {} posts classified", SAMPLE_POSTS.len());
    } else {
        println!(
            "{} of {} posts exhausted every endpoint",
            exhausted,
            SAMPLE_POSTS.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fallback_lands_on_the_healthy_stub() {
        let failing = spawn_stub(
            "broken",
            FaultConfig {
                error_rate: 1.0,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let healthy = spawn_stub("ok", FaultConfig::default()).await.unwrap();

        let client = ClassifierClient::new(ClientConfig::new(vec![
            Endpoint::named("broken", failing),
            Endpoint::named("ok", healthy),
        ]))
        .unwrap();

        let request = ClassificationRequest::from_text("march on their offices and burn them down");
        let verdict = client.classify(&request).await.unwrap();

        assert_eq!(verdict.endpoint, "ok");
        assert_eq!(verdict.label, "Call for Violence");
    }

    #[tokio::test]
    async fn all_broken_stubs_exhaust() {
        let a = spawn_stub(
            "broken-a",
            FaultConfig {
                error_rate: 1.0,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let b = spawn_stub(
            "broken-b",
            FaultConfig {
                http_error_rate: 1.0,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let client = ClassifierClient::new(ClientConfig::new(vec![
            Endpoint::named("broken-a", a),
            Endpoint::named("broken-b", b),
        ]))
        .unwrap();

        let err = client
            .classify(&ClassificationRequest::from_text("hello"))
            .await
            .unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(err.to_string(), "classification unavailable");
    }
}
