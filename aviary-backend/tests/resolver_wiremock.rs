//! Fallback chain tests against mocked Wikimedia and stock photo APIs.

use aviary_backend::config::{Endpoints, ResolverConfig};
use aviary_backend::module::ImageResolver;
use aviary_common::{Bird, ImageSource};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ResolverConfig {
    let uri = server.uri();
    ResolverConfig {
        endpoints: Endpoints {
            commons_api: format!("{}/commons/api.php", uri),
            wikipedia_api: format!("{}/wiki/api.php", uri),
            wikipedia_rest: format!("{}/rest", uri),
            wikipedia_page: "https://en.wikipedia.org/wiki".to_string(),
            unsplash_api: format!("{}/unsplash", uri),
            pixabay_api: format!("{}/pixabay/", uri),
            placeholder_template: "https://placehold.co/600x400?text={text}".to_string(),
        },
        request_timeout_secs: 5,
        ..ResolverConfig::default()
    }
}

fn empty_commons() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"batchcomplete": true}))
}

async fn mount_commons(server: &MockServer, generator: &str, response: ResponseTemplate, hits: u64) {
    Mock::given(method("GET"))
        .and(path("/commons/api.php"))
        .and(query_param("generator", generator))
        .respond_with(response)
        .expect(hits)
        .mount(server)
        .await;
}

fn macaw() -> Bird {
    Bird::new("Scarlet Macaw", "Ara macao", "Parrots and Macaws")
}

fn quetzal() -> Bird {
    Bird::new("Resplendent Quetzal", "Pharomachrus mocinno", "Trogons and Quetzals")
}

#[tokio::test]
async fn test_commons_category_skips_maps_and_stops_chain() {
    let server = MockServer::start().await;
    let fixture = include_str!("fixtures/commons_category_macaw.json");

    Mock::given(method("GET"))
        .and(path("/commons/api.php"))
        .and(query_param("generator", "categorymembers"))
        .and(query_param("gcmtitle", "Category:Ara macao"))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixture))
        .expect(1)
        .mount(&server)
        .await;
    mount_commons(&server, "search", empty_commons(), 0).await;
    Mock::given(method("GET"))
        .and(path("/rest/page/summary/Scarlet_Macaw"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = ImageResolver::new(config_for(&server)).unwrap();
    let images = resolver.resolve(&macaw()).await;

    assert_eq!(images.len(), 3, "map and diagram files must be dropped");
    assert!(images.iter().all(|c| c.source == ImageSource::Commons));
    let urls: Vec<&str> = images.iter().map(|c| c.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://upload.example/thumb/800px-Ara_macao_perched.jpg",
            "https://upload.example/thumb/800px-Scarlet_macaw_in_flight.jpeg",
            "https://upload.example/Ara_macao_pair_Carara.PNG",
        ]
    );
    assert!(images.iter().all(|c| !c.url.contains("map") && !c.url.contains("diagram")));
}

#[tokio::test]
async fn test_commons_search_runs_when_category_is_empty() {
    let server = MockServer::start().await;

    mount_commons(&server, "categorymembers", empty_commons(), 1).await;
    Mock::given(method("GET"))
        .and(path("/commons/api.php"))
        .and(query_param("generator", "search"))
        .and(query_param("gsrsearch", "Ara macao incategory:Birds"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {"pages": [
                {"title": "File:Second hit.jpg", "index": 2,
                 "imageinfo": [{"url": "https://upload.example/second.jpg"}]},
                {"title": "File:First hit.jpg", "index": 1,
                 "imageinfo": [{"url": "https://upload.example/first.jpg"}]}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = ImageResolver::new(config_for(&server)).unwrap();
    let images = resolver.resolve(&macaw()).await;

    assert_eq!(images.len(), 2);
    assert_eq!(images[0].url, "https://upload.example/first.jpg");
    assert_eq!(images[0].link, "https://commons.wikimedia.org/wiki/File:First_hit.jpg");
}

#[tokio::test]
async fn test_wikipedia_summary_fallback() {
    let server = MockServer::start().await;

    mount_commons(&server, "categorymembers", empty_commons(), 1).await;
    mount_commons(&server, "search", empty_commons(), 1).await;
    Mock::given(method("GET"))
        .and(path("/rest/page/summary/Scarlet_Macaw"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "standard",
            "title": "Scarlet macaw",
            "thumbnail": {"source": "https://upload.example/320px-Scarlet_macaw.jpg"},
            "originalimage": {"source": "https://upload.example/Scarlet_macaw.jpg"},
            "content_urls": {"desktop": {"page": "https://en.wikipedia.org/wiki/Scarlet_macaw"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = ImageResolver::new(config_for(&server)).unwrap();
    let images = resolver.resolve(&macaw()).await;

    assert_eq!(images.len(), 1);
    assert_eq!(images[0].source, ImageSource::Wikipedia);
    assert_eq!(images[0].url, "https://upload.example/Scarlet_macaw.jpg");
    assert_eq!(images[0].link, "https://en.wikipedia.org/wiki/Scarlet_macaw");
}

#[tokio::test]
async fn test_wikipedia_search_uses_top_hit_thumbnail() {
    let server = MockServer::start().await;

    mount_commons(&server, "categorymembers", empty_commons(), 1).await;
    mount_commons(&server, "search", empty_commons(), 1).await;
    Mock::given(method("GET"))
        .and(path("/rest/page/summary/Scarlet_Macaw"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "disambiguation",
            "title": "Scarlet Macaw"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wiki/api.php"))
        .and(query_param("list", "search"))
        .and(query_param("srsearch", "Scarlet Macaw bird"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {"search": [{"title": "Scarlet macaw"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/page/summary/Scarlet_macaw"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "standard",
            "thumbnail": {"source": "https://upload.example/320px-Scarlet_macaw.jpg"},
            "originalimage": {"source": "https://upload.example/Scarlet_macaw.jpg"}
        })))
        .mount(&server)
        .await;

    let resolver = ImageResolver::new(config_for(&server)).unwrap();
    let images = resolver.resolve(&macaw()).await;

    assert_eq!(images.len(), 1);
    assert_eq!(images[0].url, "https://upload.example/320px-Scarlet_macaw.jpg");
    assert_eq!(images[0].link, "https://en.wikipedia.org/wiki/Scarlet_macaw");
}

#[tokio::test]
async fn test_all_sources_failing_yields_placeholder() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.unsplash_access_key = Some("test-key".to_string());
    config.pixabay_api_key = Some("test-key".to_string());

    let resolver = ImageResolver::new(config).unwrap();
    let images = resolver.resolve(&quetzal()).await;

    assert_eq!(images.len(), 1);
    assert_eq!(images[0].source, ImageSource::Placeholder);
    assert_eq!(
        images[0].url,
        "https://placehold.co/600x400?text=Resplendent%20Quetzal"
    );
    assert_eq!(images[0].link, "https://en.wikipedia.org/wiki/Resplendent_Quetzal");
}

#[tokio::test]
async fn test_malformed_json_is_not_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let resolver = ImageResolver::new(config_for(&server)).unwrap();
    let images = resolver.resolve(&macaw()).await;

    assert_eq!(images.len(), 1);
    assert!(images[0].is_placeholder());
}

#[tokio::test]
async fn test_stock_photos_rank_best_match_first() {
    let server = MockServer::start().await;
    let fixture = include_str!("fixtures/unsplash_quetzal.json");

    mount_commons(&server, "categorymembers", empty_commons(), 1).await;
    mount_commons(&server, "search", empty_commons(), 1).await;
    Mock::given(method("GET"))
        .and(path("/wiki/api.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"query": {"search": []}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/unsplash/search/photos"))
        .and(query_param("client_id", "unsplash-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixture))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.unsplash_access_key = Some("unsplash-key".to_string());

    let resolver = ImageResolver::new(config).unwrap();
    let images = resolver.resolve(&quetzal()).await;

    // Three queries return the same photos; duplicates collapse
    assert_eq!(images.len(), 3);
    assert_eq!(images[0].url, "https://images.unsplash.example/q2?w=1080");
    assert_eq!(images[0].source, ImageSource::Unsplash);
    let attribution = images[0].attribution.as_ref().unwrap();
    assert_eq!(attribution.name, "Ana Mora");
    assert_eq!(attribution.link, "https://unsplash.com/@anamora");
}

#[tokio::test]
async fn test_stock_step_is_skipped_without_keys() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/unsplash/search/photos"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let resolver = ImageResolver::new(config_for(&server)).unwrap();
    assert!(!resolver.strategy_names().contains(&"stock-photos"));
    let images = resolver.resolve(&quetzal()).await;
    assert!(images[0].is_placeholder());
}

#[tokio::test]
async fn test_seeded_pixabay_pick_is_reproducible() {
    use aviary_backend::module::resolver::StockPhotoStrategy;
    use aviary_backend::module::ImageStrategy;
    use std::sync::Arc;

    let server = MockServer::start().await;

    // Three photos with equal scores: any of them may be picked first
    let hits: Vec<_> = (1..=3)
        .map(|n| {
            json!({
                "id": n,
                "pageURL": format!("https://pixabay.com/photos/quetzal-{}/", n),
                "tags": "quetzal, bird",
                "webformatURL": format!("https://pixabay.example/{}_640.jpg", n),
                "likes": 0,
                "user": "birder",
                "user_id": 42
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/pixabay/"))
        .and(query_param("key", "pixabay-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 3, "hits": hits})))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.pixabay_api_key = Some("pixabay-key".to_string());
    let config = Arc::new(config);
    let client = reqwest::Client::new();

    let first = StockPhotoStrategy::with_seed(client.clone(), config.clone(), 7)
        .find(&quetzal())
        .await
        .unwrap();
    let second = StockPhotoStrategy::with_seed(client, config, 7)
        .find(&quetzal())
        .await
        .unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    assert!(first.iter().all(|c| c.source == ImageSource::Pixabay));
    let attribution = first[0].attribution.as_ref().unwrap();
    assert_eq!(attribution.link, "https://pixabay.com/users/birder-42/");
}
