use crate::browser;
use crate::config::Options;
use crate::errors::WorkflowError;
use crate::events::{self, ResponseWatcher};
use crate::promo::{classify, report_path, PromoResponse};
use crate::reporting::ReportSink;
use crate::retry::retry;
use crate::utils::{sample, settle};
use chromiumoxide::{Element, Page};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

mod selectors {
    pub const SHOP_BUTTON: &str = r#"button[data-linkid="shop"]"#;
    pub const FLYOUT_LEVEL1: &str = r#"#flyout-content li[id^="flyout_Section_"]"#;
    pub const FLYOUT_LEVEL2: &str = r#"#flyout-content li[id^="l2_flyout_Section_"]"#;
    pub const FLYOUT_LEVEL3: &str = r#"#flyout-content li[id^="l3_flyout_Section_"]"#;
    pub const ADD_TO_CART: &str = r#"button[id*="add-to-cart"]"#;
    pub const DIALOG_CLOSE: &str = ".header-close-bt";
    pub const CART_PREVIEW: &str = "#cart-preview-wrapper a";
    pub const PROMO_COLLAPSED: &str = ".accordion-addPromoCode-header-collapsed div";
    pub const PROMO_REMOVE: &str = r#"*[data-automation-id="remove-promo-code"]"#;
    pub const PROMO_CONTAINER: &str = r#"[data-automation-id="promo-code-container"]"#;
}

const PROMO_BOX_ATTEMPTS: usize = 3;

static PROMO_API_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"purchase/api/cart/\d+/promocode").unwrap());

/// True for the cart promocode API (`purchase/api/cart/<id>/promocode`).
pub fn is_promo_api_url(url: &str) -> bool {
    PROMO_API_URL.is_match(url)
}

async fn require_element(page: &Page, selector: &'static str) -> Result<Element, WorkflowError> {
    let mut found = page.find_elements(selector).await?;
    if found.is_empty() {
        return Err(WorkflowError::ElementMissing(selector));
    }
    Ok(found.remove(0))
}

async fn first_element(
    page: &Page,
    selector: &'static str,
) -> Result<Option<Element>, WorkflowError> {
    Ok(page.find_elements(selector).await?.into_iter().next())
}

/// Capture the cookie jar and post it to the collector. Best-effort: capture
/// and delivery problems end as log lines, never as step failures.
async fn save_cookies(page: &Page, sink: &dyn ReportSink) {
    match browser::cookies_json(page).await {
        Ok(value) => {
            sink.post_json("save_cookies", serde_json::json!({ "value": value }))
                .await;
        }
        Err(err) => warn!("cookie capture failed: {err}"),
    }
}

/// Open a randomly chosen category from the shop flyout, then put an item in
/// the cart. The flyout walk is raced against the page navigating and the
/// category listing response arriving; all three must land.
pub async fn open_category(
    page: &Page,
    opts: &Options,
    sink: &dyn ReportSink,
) -> Result<(), WorkflowError> {
    let navigated: Result<(), WorkflowError> = async {
        let button = require_element(page, selectors::SHOP_BUTTON).await?;
        button.scroll_into_view().await?;

        let mut watcher = ResponseWatcher::attach(page).await?;
        let fragment = opts.category_fragment();
        tokio::try_join!(
            events::wait_for_navigation(page, "category open"),
            search_category(page, sink),
            async {
                watcher
                    .wait_matching("category listing", |url| url.contains(&fragment))
                    .await?;
                Ok(())
            },
        )?;
        Ok(())
    }
    .await;

    navigated.map_err(|err| WorkflowError::Category(err.to_string()))?;
    add_item(page, opts, sink).await
}

/// Walk the flyout menu: sample a level-1 section, hover, sample level-2,
/// hover, then click a level-3 entry when one exists or the level-2 entry
/// otherwise.
async fn search_category(page: &Page, sink: &dyn ReportSink) -> Result<(), WorkflowError> {
    sink.fire("shop").await;
    save_cookies(page, sink).await;

    let level1 = page.find_elements(selectors::FLYOUT_LEVEL1).await?;
    let level1_pick = sample(&level1, "level-1 flyout sections")?;
    level1_pick.hover().await?;
    settle(2000).await;

    let level2 = page.find_elements(selectors::FLYOUT_LEVEL2).await?;
    let level2_pick = sample(&level2, "level-2 flyout sections")?;
    level2_pick.hover().await?;
    settle(2000).await;

    let level3 = page.find_elements(selectors::FLYOUT_LEVEL3).await?;
    if level3.is_empty() {
        info!("no level-3 sections, opening the level-2 category");
        level2_pick.click().await?;
    } else {
        sample(&level3, "level-3 flyout sections")?.click().await?;
    }
    Ok(())
}

/// Add a randomly chosen item to the cart from the open category page, then
/// close the confirmation layer.
pub async fn add_item(
    page: &Page,
    opts: &Options,
    sink: &dyn ReportSink,
) -> Result<(), WorkflowError> {
    let result = async {
        settle(5000).await;
        let buttons = page.find_elements(selectors::ADD_TO_CART).await?;
        // Two independent draws, mimicking a shopper eyeing one product
        // while taking another.
        let browse_target = sample(&buttons, "add-to-cart controls")?;
        let add_target = sample(&buttons, "add-to-cart controls")?;

        add_target.click().await?;
        settle(5000).await;
        browse_target.scroll_into_view().await?;
        settle(5000).await;

        let mut watcher = ResponseWatcher::attach(page).await?;
        let cart_items = opts.cart_items_url();
        tokio::try_join!(
            async {
                watcher
                    .wait_matching("cart items api", |url| url == cart_items)
                    .await?;
                Ok(())
            },
            async {
                sink.fire("add_to_cart").await;
                Ok::<(), WorkflowError>(())
            },
        )?;

        require_element(page, selectors::DIALOG_CLOSE).await?.click().await?;
        save_cookies(page, sink).await;
        Ok(())
    }
    .await;

    result.map_err(|err: WorkflowError| WorkflowError::AddItem(err.to_string()))
}

/// Click through to the cart, joined with the cart page response arriving.
pub async fn go_to_cart(page: &Page, opts: &Options) -> Result<(), WorkflowError> {
    let result = async {
        let cart_button = require_element(page, selectors::CART_PREVIEW).await?;
        let mut watcher = ResponseWatcher::attach(page).await?;
        let fragment = opts.cart_fragment();
        tokio::try_join!(
            async {
                watcher
                    .wait_matching("cart page", |url| url.contains(&fragment))
                    .await?;
                Ok(())
            },
            async {
                cart_button.click().await?;
                Ok::<(), WorkflowError>(())
            },
        )?;
        Ok(())
    }
    .await;

    result.map_err(|err: WorkflowError| WorkflowError::CartNavigation(err.to_string()))
}

/// Expand the promo-code accordion when it is collapsed. The expansion click
/// comes from the collector endpoint; this side fires the request, waits,
/// and verifies the collapsed header is gone. Bounded retry.
pub async fn open_promo_box(page: &Page, sink: &dyn ReportSink) -> Result<(), WorkflowError> {
    retry(PROMO_BOX_ATTEMPTS, "open promo box", || {
        expand_promo_box(page, sink)
    })
    .await
    .map_err(|_| WorkflowError::PromoBox {
        attempts: PROMO_BOX_ATTEMPTS,
    })
}

async fn expand_promo_box(page: &Page, sink: &dyn ReportSink) -> Result<(), WorkflowError> {
    if first_element(page, selectors::PROMO_COLLAPSED).await?.is_some() {
        tokio::join!(sink.fire("open_promo_code"), settle(5000));
    }
    if first_element(page, selectors::PROMO_COLLAPSED).await?.is_some() {
        return Err(WorkflowError::PromoBoxCollapsed);
    }
    Ok(())
}

/// Submit the configured coupon and capture the promo API's answer.
pub async fn add_promo_code(
    page: &Page,
    opts: &Options,
    sink: &dyn ReportSink,
) -> Result<PromoResponse, WorkflowError> {
    let result = async {
        let mut watcher = ResponseWatcher::attach(page).await?;
        let input_path = format!("input_promo_code/{}", opts.coupon_type);
        let (captured, ()) = tokio::try_join!(
            watcher.wait_matching("promo code api", is_promo_api_url),
            async {
                sink.fire(&input_path).await;
                Ok::<(), WorkflowError>(())
            },
        )?;
        info!(url = %captured.url, status = captured.status, "promo code response");
        let body = watcher.body_json(page, &captured).await?;
        Ok(serde_json::from_value::<PromoResponse>(body)?)
    }
    .await;

    result.map_err(|err: WorkflowError| WorkflowError::PromoSubmission(err.to_string()))
}

/// Classify the promo response and report the verdict. The report is awaited
/// before the settle delay; delivery failures stay inside the sink. Never
/// fails; a mismatch is logged and the settle delay still runs.
pub async fn check_promo_code(opts: &Options, sink: &dyn ReportSink, response: &PromoResponse) {
    let coupons = response.coupons();
    let verdict = classify(coupons);
    info!("promo verdict: {verdict:?}");
    match report_path(verdict, coupons, &opts.coupon_type) {
        Some(path) => sink.fire(&path).await,
        None => warn!("unexpected promo code response: {coupons:?}"),
    }
    settle(4000).await;
}

/// Remove an applied promo code when the control exists. The caller consumes
/// the result; removal problems must not fail the coupon test.
pub async fn remove_promo_code(page: &Page) -> Result<(), WorkflowError> {
    match first_element(page, selectors::PROMO_REMOVE).await? {
        Some(button) => {
            let (clicked, ()) = tokio::join!(button.click(), settle(5000));
            clicked?;
            info!("promo code removed");
        }
        None => info!("no promo code to remove"),
    }
    Ok(())
}

/// Whether the promo container shows the site's rate-limit banner (the one
/// that talks about attempts). Missing container reads as no banner.
pub async fn check_promo_error(page: &Page) -> Result<bool, WorkflowError> {
    let Some(container) = first_element(page, selectors::PROMO_CONTAINER).await? else {
        return Ok(false);
    };
    let text = container.inner_text().await?.unwrap_or_default();
    Ok(text.contains("attempts"))
}
