// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use anyhow::Result;
use coverage_client::{ClientConfig, CoverageClient, PollPolicy};
use coverage_view::{CoverageLoader, LoadedView, RouteController, RouteState, View, ViewLoader};
use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn fixture() -> Result<(MockServer, CoverageLoader)> {
    let server = MockServer::start().await;
    let base = server.uri();

    let config = ClientConfig {
        backend_url: Url::parse(&base)?,
        zero_coverage_url: Url::parse(&format!("{base}/zero_coverage_report.json"))?,
        hg_url: Url::parse(&format!("{base}/hg"))?,
        mapper_url: Url::parse(&format!("{base}/mapper"))?,
        changeset_poll: PollPolicy::immediate(),
    };

    let loader = CoverageLoader::new(Arc::new(CoverageClient::new(config)));
    Ok((server, loader))
}

async fn mount_filters(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v2/filters"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"platforms": ["linux", "windows"], "suites": ["mochitest"]})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_directory_view() -> Result<()> {
    let (server, loader) = fixture().await?;
    mount_filters(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/path"))
        .and(query_param("path", "dom"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "path": "dom",
            "type": "directory",
            "coveragePercent": 50.0,
            "children": [{"path": "dom/base", "type": "directory", "coveragePercent": 50.0}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/history"))
        .and(query_param("path", "dom"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"date": 1546300800, "coverage": 49.5, "changeset": "aaa"},
            {"date": 1546387200, "coverage": 50.0, "changeset": "bbb"}
        ])))
        .mount(&server)
        .await;

    let view = loader.load(&RouteState::parse("#path=dom")).await?;

    match view {
        LoadedView::Directory {
            coverage,
            filters,
            history,
            ..
        } => {
            assert_eq!(coverage.children.len(), 1);
            assert_eq!(filters.platforms, vec!["linux", "windows"]);
            assert_eq!(history.map(|points| points.len()), Some(2));
        }
        other => panic!("unexpected view: {:?}", other.view()),
    }

    Ok(())
}

#[tokio::test]
async fn test_file_view_reads_source_at_revision() -> Result<()> {
    let (server, loader) = fixture().await?;
    mount_filters(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/path"))
        .and(query_param("path", "dom/a.cpp"))
        .and(query_param("changeset", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "path": "dom/a.cpp",
            "type": "file",
            "coveragePercent": 50.0,
            "coverage": [-1, 3, 0]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hg/raw-file/abc/dom/a.cpp"))
        .respond_with(ResponseTemplate::new(200).set_body_string("int a;\nint b;\nint c;\n"))
        .expect(1)
        .mount(&server)
        .await;

    let view = loader
        .load(&RouteState::parse("#view=file&revision=abc&path=dom%2Fa.cpp"))
        .await?;

    assert_eq!(view.view(), View::File);
    if let LoadedView::File {
        coverage, source, ..
    } = view
    {
        assert!(source.starts_with("int a;"));
        assert_eq!(coverage.coverage.map(|lines| lines.len()), Some(3));
    }

    Ok(())
}

#[tokio::test]
async fn test_zero_view_fetches_third_party_only_when_hidden() -> Result<()> {
    let (server, loader) = fixture().await?;

    Mock::given(method("GET"))
        .and(path("/zero_coverage_report.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hg_revision": "0123456789ab",
            "files": [{"name": "dom/a.cpp", "funcs": 2, "uncovered": true}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hg/raw-file/tip/tools/rewriting/ThirdPartyPaths.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("third_party/\nmedia/libvpx/\n"))
        .expect(1)
        .mount(&server)
        .await;

    let shown = loader.load(&RouteState::parse("#view=zero")).await?;
    if let LoadedView::Zero { third_party, .. } = &shown {
        assert!(third_party.is_empty());
    }

    let hidden = loader
        .load(&RouteState::parse("#view=zero&third_party=off"))
        .await?;
    match hidden {
        LoadedView::Zero {
            report,
            third_party,
            ..
        } => {
            assert_eq!(report.revision, "0123456789ab");
            assert_eq!(report.files[0].path, "dom/a.cpp");
            assert_eq!(*third_party, vec!["third_party/", "media/libvpx/"]);
        }
        other => panic!("unexpected view: {:?}", other.view()),
    }

    Ok(())
}

#[tokio::test]
async fn test_network_error_aborts_load() -> Result<()> {
    let (server, loader) = fixture().await?;
    mount_filters(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/path"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let controller = RouteController::new(loader);
    let err = controller
        .navigate("#path=dom")
        .await
        .expect_err("load should fail");

    let message = format!("{:#}", err);
    assert!(message.starts_with("Failed to load coverage"), "{}", message);
    assert!(message.contains("500 - Internal Server Error"), "{}", message);

    Ok(())
}

#[tokio::test]
async fn test_invalid_view() -> Result<()> {
    let (server, loader) = fixture().await?;

    let err = loader
        .load(&RouteState::parse("#view=browser"))
        .await
        .expect_err("unknown views are rejected");
    assert_eq!(err.to_string(), "Invalid view : browser");

    assert!(server.received_requests().await.unwrap_or_default().is_empty());

    Ok(())
}
