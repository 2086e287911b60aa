use clap::Parser;
use couponfarm::browser::{self, BrowserHandle};
use couponfarm::config::Options;

#[test]
fn config_builds_for_the_headful_defaults() {
    // The builder auto-detects an executable when no path is set, which needs
    // a local install; the override keeps this off that path. Nothing runs it.
    let opts = Options::parse_from(["couponfarm", "--chrome-path", "/usr/bin/chromium"]);
    assert!(browser::build_config(&opts).is_ok());
}

#[test]
fn config_builds_headless_behind_a_proxy() {
    let opts = Options::parse_from([
        "couponfarm",
        "--headless",
        "--chrome-path",
        "/usr/bin/chromium",
        "--proxy-host",
        "10.0.0.1",
        "--proxy-port",
        "3128",
        "--proxy-protocol",
        "socks5",
    ]);
    assert!(browser::build_config(&opts).is_ok());
}

#[tokio::test]
#[ignore = "needs a local Chromium install"]
async fn launch_and_teardown_round_trip() {
    let opts = Options::parse_from(["couponfarm", "--headless"]);
    let handle = BrowserHandle::launch(&opts).await.unwrap();
    let page = handle.new_page("about:blank").await.unwrap();
    let url = page.url().await.unwrap();
    assert_eq!(url.as_deref(), Some("about:blank"));
    handle.close().await;
}
