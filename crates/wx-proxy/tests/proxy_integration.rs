//! Integration tests for the dev server.
//!
//! A real server is bound on an ephemeral port and requests travel over TCP,
//! so `Host` headers look exactly as they would from a browser.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use url::Url;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wx_core::{define_config, Config, PluginDescriptor, ProxyRule, ProxyTable};
use wx_proxy::DevServer;

/// Start a dev server with `proxy` and `plugins`, returning its address
async fn start_dev_server(proxy: ProxyTable, plugins: Vec<PluginDescriptor>) -> SocketAddr {
    let mut config = Config::default();
    config.plugins = plugins;
    config.server.proxy = proxy;
    start_with_config(config).await
}

async fn start_with_config(config: Config) -> SocketAddr {
    let server = DevServer::new(define_config(config).unwrap()).unwrap();
    let app = server.router();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn weather_rule(target: &str, change_origin: bool) -> ProxyTable {
    let mut table = ProxyTable::new();
    table.insert(
        "/weather",
        ProxyRule::new(Url::parse(target).unwrap()).with_change_origin(change_origin),
    );
    table
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn test_forwards_with_changed_origin() {
    let mock_server = MockServer::start().await;
    let upstream_host = mock_server.address().to_string();

    Mock::given(method("GET"))
        .and(path("/weather/today"))
        .and(header("host", upstream_host.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("sunny"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let addr = start_dev_server(weather_rule(&mock_server.uri(), true), vec![]).await;

    let response = client()
        .get(format!("http://{}/weather/today", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "sunny");
}

#[tokio::test]
async fn test_keeps_client_host_without_change_origin() {
    let mock_server = MockServer::start().await;
    let addr = {
        // The dev server address must be known before the mock is mounted
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let dev_host = addr.to_string();

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(header("host", dev_host.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = Config::default();
    config.plugins.clear();
    config.server.proxy = weather_rule(&mock_server.uri(), false);
    let app = DevServer::new(define_config(config).unwrap()).unwrap().router();
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let response = client()
        .get(format!("http://{}/weather", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_query_method_and_body_forwarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/weather/report"))
        .and(query_param("address", "4600 Silver Hill Rd"))
        .and(body_string("{\"temp\":21}"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("x-upstream", "backend")
                .set_body_string("created"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let addr = start_dev_server(weather_rule(&mock_server.uri(), true), vec![]).await;

    let response = client()
        .post(format!(
            "http://{}/weather/report?address=4600%20Silver%20Hill%20Rd",
            addr
        ))
        .body("{\"temp\":21}")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    assert_eq!(
        response.headers().get("x-upstream").unwrap().to_str().unwrap(),
        "backend"
    );
    assert_eq!(response.text().await.unwrap(), "created");
}

#[tokio::test]
async fn test_upstream_status_relayed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Address parameter is missing\n"))
        .mount(&mock_server)
        .await;

    let addr = start_dev_server(weather_rule(&mock_server.uri(), true), vec![]).await;

    let response = client()
        .get(format!("http://{}/weather", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "Address parameter is missing\n");
}

#[tokio::test]
async fn test_redirects_are_not_followed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/elsewhere"))
        .mount(&mock_server)
        .await;

    let addr = start_dev_server(weather_rule(&mock_server.uri(), true), vec![]).await;

    let response = reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
        .get(format!("http://{}/weather", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 302);
    assert_eq!(response.headers().get("location").unwrap(), "/elsewhere");
}

#[tokio::test]
async fn test_unmatched_path_is_not_forwarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let addr = start_dev_server(weather_rule(&mock_server.uri(), true), vec![]).await;

    let response = client()
        .get(format!("http://{}/api/weather", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let dead = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let addr = start_dev_server(weather_rule(&format!("http://{}", dead), true), vec![]).await;

    let response = client()
        .get(format!("http://{}/weather/today", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn test_slow_upstream_is_gateway_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather/today"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let mut config = Config::default();
    config.plugins.clear();
    config.server.proxy = weather_rule(&mock_server.uri(), true);
    config.server.proxy_timeout_secs = 1;
    let addr = start_with_config(config).await;

    let response = client()
        .get(format!("http://{}/weather/today", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 504);
    assert_eq!(response.text().await.unwrap(), "Gateway Timeout");
}

#[tokio::test]
async fn test_plugin_serves_assets_and_proxy_takes_precedence() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("from backend"))
        .mount(&mock_server)
        .await;

    let build = tempfile::tempdir().unwrap();
    std::fs::write(build.path().join("index.html"), "<html>app shell</html>").unwrap();
    std::fs::write(build.path().join("app.js"), "console.log('wx')").unwrap();
    // A stray asset under the proxied prefix must never be served
    std::fs::write(build.path().join("weather"), "static file").unwrap();

    let mut plugin = PluginDescriptor::sveltekit();
    plugin.root = build.path().to_path_buf();

    let addr = start_dev_server(weather_rule(&mock_server.uri(), true), vec![plugin]).await;
    let client = client();

    let asset = client
        .get(format!("http://{}/app.js", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(asset.status(), 200);
    assert_eq!(asset.text().await.unwrap(), "console.log('wx')");

    let spa_route = client
        .get(format!("http://{}/forecast/seattle", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(spa_route.status(), 200);
    assert_eq!(spa_route.text().await.unwrap(), "<html>app shell</html>");

    let proxied = client
        .get(format!("http://{}/weather", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(proxied.text().await.unwrap(), "from backend");
}
