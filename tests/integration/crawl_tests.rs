//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run whole
//! batches end-to-end: configuration, registry, HTTP fetch, extraction and
//! JSON output.

use ladle::config::{parse_config, Config};
use ladle::crawler::{crawl, ErrorKind, OutcomeStatus};
use ladle::extract::FieldValue;
use ladle::output::render_json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RECIPE_PAGE: &str = r#"<html><head><title>Chicken Parmesan</title></head><body>
<h1>Chicken Parmesan</h1>
<ul>
  <li class="ingredient">2 chicken breasts</li>
  <li class="ingredient">1 cup marinara sauce</li>
  <li class="ingredient">  1/2 cup parmesan cheese </li>
</ul>
</body></html>"#;

const NAMELESS_PAGE: &str = r#"<html><body>
<ul><li class="ingredient">water</li></ul>
</body></html>"#;

/// Allrecipes-style markup for the bundled site rules
const ALLRECIPES_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Chicken Parmesan Recipe</title></head><body>
<h1 class="article-heading type--lion">
  Chicken   Parmesan
</h1>
<div class="mm-recipes-details">
  <div class="mm-recipes-details__item">
    <div class="mm-recipes-details__label">Prep Time:</div>
    <div class="mm-recipes-details__value">15 mins</div>
  </div>
  <div class="mm-recipes-details__item">
    <div class="mm-recipes-details__label">Cook Time:</div>
    <div class="mm-recipes-details__value">20 mins</div>
  </div>
  <div class="mm-recipes-details__item">
    <div class="mm-recipes-details__label">Total Time:</div>
    <div class="mm-recipes-details__value">35 mins</div>
  </div>
  <div class="mm-recipes-details__item">
    <div class="mm-recipes-details__label">Servings:</div>
    <div class="mm-recipes-details__value">4</div>
  </div>
</div>
<ul class="mm-recipes-structured-ingredients__list">
  <li class="mm-recipes-structured-ingredients__list-item"><p><span>2</span> <span>chicken breasts</span></p></li>
  <li class="mm-recipes-structured-ingredients__list-item"><p><span>1</span> <span>cup</span> <span>marinara sauce</span></p></li>
  <li class="mm-recipes-structured-ingredients__list-item"><p><span>1/2</span> <span>cup</span> <span>parmesan cheese</span></p></li>
</ul>
<ol>
  <li class="comp mntl-sc-block mntl-sc-block-startgroup mntl-sc-block-group--LI">
    <p class="comp mntl-sc-block mntl-sc-block-html">Preheat the oven to 450 degrees F.</p>
  </li>
  <li class="comp mntl-sc-block mntl-sc-block-startgroup mntl-sc-block-group--LI">
    <p class="comp mntl-sc-block mntl-sc-block-html">   </p>
  </li>
  <li class="comp mntl-sc-block mntl-sc-block-startgroup mntl-sc-block-group--LI">
    <p class="comp mntl-sc-block mntl-sc-block-html">Bake until the cheese is
      bubbly and golden.</p>
  </li>
</ol>
<table><tbody class="mm-recipes-nutrition-facts-summary__table-body">
  <tr class="mm-recipes-nutrition-facts-summary__table-row">
    <td class="mm-recipes-nutrition-facts-summary__table-cell text-body-100-prominent">1,180</td>
    <td class="mm-recipes-nutrition-facts-summary__table-cell text-body-100">Calories</td>
  </tr>
  <tr class="mm-recipes-nutrition-facts-summary__table-row">
    <td class="mm-recipes-nutrition-facts-summary__table-cell text-body-100-prominent">22g</td>
    <td class="mm-recipes-nutrition-facts-summary__table-cell text-body-100">Fat</td>
  </tr>
  <tr class="mm-recipes-nutrition-facts-summary__table-row">
    <td class="mm-recipes-nutrition-facts-summary__table-cell text-body-100-prominent">28g</td>
    <td class="mm-recipes-nutrition-facts-summary__table-cell text-body-100">Carbs</td>
  </tr>
</tbody></table>
</body></html>"#;

/// Builds a configuration registering the mock server's host
fn create_test_config(domain: &str, scheduler: &str) -> Config {
    let content = format!(
        r#"
[scheduler]
concurrency = 4
{scheduler}

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[[site]]
domain = "{domain}"

[[site.field]]
name = "name"
selector = "h1"
required = true

[[site.field]]
name = "ingredients"
selector = "li.ingredient"
cardinality = "list"
required = true
"#
    );
    parse_config(&content).expect("test configuration should be valid")
}

/// Host of the mock server, which is what sites are registered under
fn server_domain(server: &MockServer) -> String {
    url::Url::parse(&server.uri())
        .expect("Failed to parse base URL")
        .host_str()
        .expect("Failed to extract host")
        .to_string()
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html")
}

#[tokio::test]
async fn test_batch_mixes_outcomes_in_submission_order() {
    let server = MockServer::start().await;
    let base = server.uri();
    let config = create_test_config(
        &server_domain(&server),
        "per-task-timeout-ms = 5000\nmax-retries = 0",
    );

    Mock::given(method("GET"))
        .and(path("/complete"))
        .respond_with(html(RECIPE_PAGE).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/partial"))
        .respond_with(html(NAMELESS_PAGE))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let urls = vec![
        format!("{}/complete", base),
        format!("{}/partial", base),
        format!("{}/missing", base),
        "https://unregistered.example.org/recipe".to_string(),
        "not a url".to_string(),
    ];

    let result = crawl(&config, urls.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.len(), 5);
    for (outcome, url) in result.outcomes.iter().zip(&urls) {
        assert_eq!(&outcome.url, url);
    }

    let complete = result.outcomes[0].record().unwrap();
    assert_eq!(result.outcomes[0].status(), OutcomeStatus::Complete);
    assert_eq!(
        complete.get("name"),
        Some(&FieldValue::Single("Chicken Parmesan".to_string()))
    );
    assert_eq!(
        complete.get("ingredients").and_then(FieldValue::as_list).map(|l| l.len()),
        Some(3)
    );

    assert_eq!(result.outcomes[1].status(), OutcomeStatus::Partial);
    assert_eq!(
        result.outcomes[1].record().unwrap().completeness.missing_fields(),
        &["name".to_string()]
    );

    let kinds: Vec<Option<ErrorKind>> = result.outcomes[2..]
        .iter()
        .map(|o| o.error().map(|e| e.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            Some(ErrorKind::HttpClientError(404)),
            Some(ErrorKind::NotRegistered),
            Some(ErrorKind::InvalidUrl),
        ]
    );
    assert!(!result.all_succeeded());
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    let config = create_test_config(
        &server_domain(&server),
        "per-task-timeout-ms = 5000\nmax-retries = 2\nbackoff-base-ms = 10\nbackoff-max-ms = 50",
    );

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(html(RECIPE_PAGE))
        .mount(&server)
        .await;

    let result = crawl(
        &config,
        vec![format!("{}/flaky", server.uri())],
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let outcome = &result.outcomes[0];
    assert_eq!(outcome.status(), OutcomeStatus::Complete);
    assert_eq!(outcome.attempts, 3);
}

#[tokio::test]
async fn test_retries_exhausted_on_server_error() {
    let server = MockServer::start().await;
    let config = create_test_config(
        &server_domain(&server),
        "per-task-timeout-ms = 5000\nmax-retries = 1\nbackoff-base-ms = 10\nbackoff-max-ms = 50",
    );

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let result = crawl(
        &config,
        vec![format!("{}/broken", server.uri())],
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(
        result.outcomes[0].error().map(|e| e.kind),
        Some(ErrorKind::HttpServerError(500))
    );
}

#[tokio::test]
async fn test_slow_page_times_out_without_delaying_others() {
    let server = MockServer::start().await;
    let base = server.uri();
    let config = create_test_config(
        &server_domain(&server),
        "per-task-timeout-ms = 300\nmax-retries = 0",
    );

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html(RECIPE_PAGE).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fast"))
        .respond_with(html(RECIPE_PAGE))
        .mount(&server)
        .await;

    let started = std::time::Instant::now();
    let result = crawl(
        &config,
        vec![format!("{}/slow", base), format!("{}/fast", base)],
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(
        result.outcomes[0].error().map(|e| e.kind),
        Some(ErrorKind::FetchTimeout)
    );
    assert_eq!(result.outcomes[1].status(), OutcomeStatus::Complete);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_non_html_response_is_malformed_markup() {
    let server = MockServer::start().await;
    let config = create_test_config(
        &server_domain(&server),
        "per-task-timeout-ms = 5000\nmax-retries = 2",
    );

    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(br#"{"name": "soup"}"#.to_vec(), "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = crawl(
        &config,
        vec![format!("{}/data.json", server.uri())],
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(
        result.outcomes[0].error().map(|e| e.kind),
        Some(ErrorKind::MalformedMarkup)
    );
}

#[tokio::test]
async fn test_requests_identify_the_crawler() {
    let server = MockServer::start().await;
    let config = create_test_config(&server_domain(&server), "per-task-timeout-ms = 5000");

    Mock::given(method("GET"))
        .and(path("/recipe"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(html(RECIPE_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let result = crawl(
        &config,
        vec![format!("{}/recipe", server.uri())],
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(result.all_succeeded());
}

#[tokio::test]
async fn test_cancelled_batch_reports_every_url() {
    let server = MockServer::start().await;
    let base = server.uri();
    let config = create_test_config(&server_domain(&server), "per-task-timeout-ms = 30000");

    Mock::given(method("GET"))
        .respond_with(html(RECIPE_PAGE).set_delay(Duration::from_secs(20)))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let urls: Vec<String> = (0..6).map(|i| format!("{}/page{}", base, i)).collect();
    let started = std::time::Instant::now();
    let result = crawl(&config, urls, cancel).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.len(), 6);
    assert!(result
        .outcomes
        .iter()
        .all(|o| o.error().map(|e| e.kind) == Some(ErrorKind::Cancelled)));
}

#[tokio::test]
async fn test_bundled_allrecipes_rules_extract_recipe() {
    let server = MockServer::start().await;

    // Point the bundled rules at the mock server
    let content = include_str!("../../sites/allrecipes.toml")
        .replace("www.allrecipes.com", &server_domain(&server));
    let config = parse_config(&content).unwrap();

    Mock::given(method("GET"))
        .and(path("/recipe/223042/chicken-parmesan/"))
        .respond_with(html(ALLRECIPES_PAGE))
        .mount(&server)
        .await;

    let result = crawl(
        &config,
        vec![format!("{}/recipe/223042/chicken-parmesan/", server.uri())],
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let outcome = &result.outcomes[0];
    assert_eq!(outcome.status(), OutcomeStatus::Complete);
    let record = outcome.record().unwrap();

    assert_eq!(
        record.get("name"),
        Some(&FieldValue::Single("Chicken Parmesan".to_string()))
    );
    assert_eq!(
        record.get("ingredients"),
        Some(&FieldValue::List(vec![
            "2 chicken breasts".to_string(),
            "1 cup marinara sauce".to_string(),
            "1/2 cup parmesan cheese".to_string(),
        ]))
    );
    assert_eq!(
        record.get("steps"),
        Some(&FieldValue::List(vec![
            "Preheat the oven to 450 degrees F.".to_string(),
            "Bake until the cheese is bubbly and golden.".to_string(),
        ]))
    );

    let timing = record.group("timing").unwrap();
    assert_eq!(timing.get("prep_time").and_then(FieldValue::as_single), Some("15 mins"));
    assert_eq!(timing.get("cook_time").and_then(FieldValue::as_single), Some("20 mins"));
    assert_eq!(timing.get("total_time").and_then(FieldValue::as_single), Some("35 mins"));

    let nutrition = record.group("nutrition").unwrap();
    assert_eq!(nutrition.get("calories").and_then(FieldValue::as_single), Some("1180"));
    assert_eq!(nutrition.get("fat").and_then(FieldValue::as_single), Some("22g"));
    assert_eq!(nutrition.get("carbs").and_then(FieldValue::as_single), Some("28g"));
    assert_eq!(nutrition.get("protein"), Some(&FieldValue::Missing));

    let rendered = render_json(&result, false).unwrap();
    let json: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(json[0]["status"], "complete");
    assert_eq!(json[0]["record"]["nutrition"]["calories"], "1180");
    assert!(json[0]["record"]["nutrition"]["protein"].is_null());
    assert_eq!(json[0]["record"]["timing"]["prep_time"], "15 mins");
}
