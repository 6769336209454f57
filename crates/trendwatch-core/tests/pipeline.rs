// End-to-end: mock trending page + stub metadata source + real SQLite history
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use trendwatch_api::{RetryConfig, TrendingClient};
use trendwatch_core::{
    EnrichmentCoordinator, EnrichmentStatus, Error, MetadataSource, Novelty, Pipeline,
    PipelineSettings, RankingWeights, RepoId, RepoMetadata, RunRequest, TrendingFetcher,
    TrendingPeriod,
};
use trendwatch_store::NoveltyStore;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Knows a fixed set of repos; anything else is a 404
struct StubSource;

#[async_trait::async_trait]
impl MetadataSource for StubSource {
    async fn repository(&self, id: &RepoId) -> trendwatch_core::Result<RepoMetadata> {
        match id.key().as_str() {
            "x/y" => Ok(RepoMetadata {
                stars: 1250,
                forks: 40,
                open_issues: 7,
                language: Some("Rust".into()),
                ..Default::default()
            }),
            "a/b" => Ok(RepoMetadata {
                stars: 60,
                forks: 2,
                description: Some("filled in by the API".into()),
                ..Default::default()
            }),
            "fresh/one" => Ok(RepoMetadata {
                stars: 15,
                ..Default::default()
            }),
            _ => Err(Error::NotFound(id.full_name())),
        }
    }
}

fn article(owner: &str, name: &str, stars: &str, gained: u64) -> String {
    format!(
        r#"<article class="Box-row">
             <h2 class="h3 lh-condensed"><a href="/{owner}/{name}">{owner} / {name}</a></h2>
             <a class="Link--muted" href="/{owner}/{name}/stargazers">{stars}</a>
             <span class="d-inline-block float-sm-right">{gained} stars today</span>
           </article>"#
    )
}

async fn listing(articles: &[String]) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/trending"))
        .and(query_param("since", "daily"))
        .respond_with(ResponseTemplate::new(200).set_body_string(articles.join("\n")))
        .mount(&server)
        .await;
    server
}

fn pipeline_for(server: &MockServer) -> Pipeline {
    let client = TrendingClient::with_base_url(server.uri())
        .unwrap()
        .with_retry_config(RetryConfig {
            max_attempts: 2,
            initial_delay_ms: 10,
            max_delay_ms: 10,
            backoff_multiplier: 1.0,
        });

    Pipeline::new(
        TrendingFetcher::new(client),
        EnrichmentCoordinator::new(Arc::new(StubSource), Duration::from_secs(5)),
        PipelineSettings {
            lookback_days: 3,
            concurrency: 2,
            weights: RankingWeights::default(),
            budget: Duration::from_secs(30),
        },
    )
}

fn request() -> RunRequest {
    RunRequest {
        period: TrendingPeriod::Daily,
        language: String::new(),
        limit: 25,
        dry_run: false,
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

#[tokio::test]
async fn novelty_tracks_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let store = NoveltyStore::new(dir.path().join("history.db"));

    // Day 1: both repos are brand new
    let server = listing(&[article("x", "y", "1,200", 300), article("a", "b", "50", 310)]).await;
    let report = pipeline_for(&server)
        .run(&store, &request(), day(1))
        .await
        .unwrap();

    assert_eq!(report.total_fetched, 2);
    assert_eq!(report.new_count, 2);
    assert!(report.entries.iter().all(|e| e.novelty == Novelty::New));
    let ab = report
        .entries
        .iter()
        .find(|e| e.candidate.id.key() == "a/b")
        .unwrap();
    assert_eq!(ab.candidate.stars, 60);
    assert_eq!(ab.candidate.description.as_deref(), Some("filled in by the API"));

    // Day 2: a/b is back, plus one newcomer and one the API has never heard of
    let server = listing(&[
        article("a", "b", "80", 90),
        article("fresh", "one", "12", 40),
        article("ghost", "repo", "3", 5),
    ])
    .await;
    let report = pipeline_for(&server)
        .run(&store, &request(), day(2))
        .await
        .unwrap();

    assert_eq!(report.total_fetched, 3);
    assert_eq!(report.new_count, 2);
    let novelty_of = |key: &str| {
        report
            .entries
            .iter()
            .find(|e| e.candidate.id.key() == key)
            .map(|e| e.novelty)
            .unwrap()
    };
    assert_eq!(novelty_of("a/b"), Novelty::Recurring);
    assert_eq!(novelty_of("fresh/one"), Novelty::New);
    assert_eq!(novelty_of("ghost/repo"), Novelty::New);

    let ghost = report
        .entries
        .iter()
        .find(|e| e.candidate.id.key() == "ghost/repo")
        .unwrap();
    assert_eq!(ghost.candidate.enrichment, EnrichmentStatus::Failed);
    assert_eq!(ghost.candidate.stars, 3);

    // Recurring entries sink below the new ones here
    assert_eq!(report.entries.last().unwrap().candidate.id.key(), "a/b");
    let ranks: Vec<_> = report.entries.iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);

    // Day 6: x/y was last seen five days ago, so it's new again; a/b four days ago
    let server = listing(&[article("x", "y", "1,300", 20), article("a", "b", "90", 10)]).await;
    let report = pipeline_for(&server)
        .run(&store, &request(), day(6))
        .await
        .unwrap();
    assert!(report.entries.iter().all(|e| e.novelty == Novelty::New));

    let session = store.session().unwrap();
    assert_eq!(session.appearance_count("a/b").unwrap(), 3);
    assert_eq!(session.history("x/y").unwrap(), vec![day(6), day(1)]);
    let stats = session.statistics(day(6)).unwrap();
    assert_eq!(stats.total_repositories, 4);
    assert_eq!(stats.total_observations, 7);
}

#[tokio::test]
async fn failed_fetch_leaves_history_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store = NoveltyStore::new(dir.path().join("history.db"));

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let err = pipeline_for(&server)
        .run(&store, &request(), day(1))
        .await
        .unwrap_err();

    match &err {
        Error::Fetch(fetch) => {
            assert_eq!(fetch.attempts, 2);
            assert!(fetch.is_transient());
        }
        other => panic!("expected fetch error, got {other}"),
    }
    assert!(err.is_fatal());
    assert!(!store.path().exists());
}
