use std::fs;
use std::path::Path;

use elements::{Application, AppMode};
use elements_core::config::AppConfig;
use elements_core::models::{RequestContext, SlotLayout};
use serde_json::json;

fn write_declarations(root: &Path) {
    let dir = root.join("elements");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("core.json"),
        r#"[
            // static teaser
            {"name": "banner", "file": "static", "config": {"html": "<b>sale</b>"}, "cache": false},
            {"name": "footer", "file": "static", "cache": {"ttl": 60, "page": false},
             "config": {"html": "footer", "meta": {"data": [{"title": "Shop"}]}}}
        ]"#,
    )
    .unwrap();
}

fn config_for(root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.elements.config_path = root.to_path_buf();
    config.observability.metrics_enabled = false;
    config
}

#[tokio::test]
async fn test_check_lists_definitions() {
    let dir = tempfile::tempdir().unwrap();
    write_declarations(dir.path());
    let app = Application::new(config_for(dir.path())).await.unwrap();

    let summary = app.check();
    assert_eq!(summary["count"], 2);
    assert_eq!(summary["cache"], "memory");
    assert_eq!(summary["elements"][0]["identifier"], "core.banner");
    assert_eq!(summary["elements"][1]["cache"]["page"], false);
}

#[tokio::test]
async fn test_render_resolves_layout() {
    let dir = tempfile::tempdir().unwrap();
    write_declarations(dir.path());
    let app = Application::new(config_for(dir.path())).await.unwrap();

    let layout: SlotLayout = serde_json::from_value(json!({
        "header": ["core.banner"],
        "footer": [
            "core.footer",
            null,
            {"element": "core.banner", "configOverwrite": {"html": "<i>override</i>"}},
            "core.unknown"
        ]
    }))
    .unwrap();

    let first = app.render(&layout, RequestContext::new("/shop")).await.unwrap();
    assert_eq!(first["slots"]["header"][0]["html"], "<b>sale</b>");
    let footer = first["slots"]["footer"].as_array().unwrap();
    assert_eq!(footer.len(), 3);
    assert_eq!(footer[0]["html"], "footer");
    assert_eq!(footer[1]["html"], "<i>override</i>");
    assert_eq!(footer[2]["doesNotExist"], true);
    assert_eq!(first["meta"], json!([{"title": "Shop"}]));

    let second = app.render(&layout, RequestContext::new("/other")).await.unwrap();
    assert_eq!(second["slots"]["footer"][0]["fromCache"], true);
    assert_eq!(second["slots"]["footer"][0]["page"], "/other");
    assert!(second["slots"]["header"][0].get("fromCache").is_none());
}

#[tokio::test]
async fn test_single_element() {
    let dir = tempfile::tempdir().unwrap();
    write_declarations(dir.path());
    let app = Application::new(config_for(dir.path())).await.unwrap();

    let result = app
        .element("core.banner", RequestContext::new("/"), Some(json!({"html": "x"})))
        .await
        .unwrap();
    assert_eq!(result.field("html"), Some(&json!("x")));
    assert_eq!(result.id.as_deref(), Some("core.static"));

    assert!(app.element("", RequestContext::new("/"), None).await.is_err());
}

#[tokio::test]
async fn test_missing_declaration_dir_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let app = Application::new(config_for(dir.path())).await.unwrap();

    assert_eq!(app.check()["count"], 0);
    assert!(dir.path().join("elements").is_dir());
}

#[tokio::test]
async fn test_unknown_implementation_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let elements = dir.path().join("elements");
    fs::create_dir_all(&elements).unwrap();
    fs::write(elements.join("news.json"), r#"[{"name": "list", "file": "list"}]"#).unwrap();

    let err = Application::new(config_for(dir.path())).await.err().unwrap();
    assert!(format!("{err:#}").contains("news.list"));
}

#[test]
fn test_mode_parsing() {
    assert_eq!("render".parse::<AppMode>().unwrap(), AppMode::Render);
    assert!("serve".parse::<AppMode>().is_err());
}
