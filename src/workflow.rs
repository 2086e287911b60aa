use crate::browser::{self, BrowserHandle};
use crate::config::Options;
use crate::errors::WorkflowError;
use crate::events;
use crate::reporting::ReportSink;
use crate::retailer;
use crate::retry::retry;
use crate::utils::settle;
use chromiumoxide::Page;
use tracing::{error, info, warn};

const CATEGORY_ATTEMPTS: usize = 3;
const COUPON_ATTEMPTS: usize = 5;

/// One full coupon check: cart, settle, promo box, submit, classify, remove.
///
/// On failure this captures a diagnostic screenshot and looks for the
/// site's rate-limit banner before handing back the original error; the
/// diagnostics never replace it.
pub async fn test_coupon(
    page: &Page,
    opts: &Options,
    sink: &dyn ReportSink,
) -> Result<(), WorkflowError> {
    let result: Result<(), WorkflowError> = async {
        retailer::go_to_cart(page, opts).await?;
        settle(5000).await;
        retailer::open_promo_box(page, sink).await?;
        let response = retailer::add_promo_code(page, opts, sink).await?;
        retailer::check_promo_code(opts, sink, &response).await;
        if let Err(err) = retailer::remove_promo_code(page).await {
            warn!("promo code removal failed: {err}");
        }
        Ok(())
    }
    .await;

    if let Err(err) = &result {
        error!("coupon test failed: {err}");
        if let Err(shot_err) = browser::screenshot(page, &opts.screenshot_dir, "test_coupon").await
        {
            warn!("diagnostic screenshot failed: {shot_err}");
        }
        match retailer::check_promo_error(page).await {
            Ok(rate_limited) => info!("rate-limit banner present: {rate_limited}"),
            Err(check_err) => warn!("rate-limit check failed: {check_err}"),
        }
    }
    result
}

/// The whole run against one browser session: open the cart page, open a
/// category (retried), then run the doubled coupon test (retried). The
/// caller owns session teardown; this only drives the page.
pub async fn run(
    handle: &BrowserHandle,
    opts: &Options,
    sink: &dyn ReportSink,
) -> Result<(), WorkflowError> {
    let page = handle.new_page("about:blank").await?;
    page.goto(opts.cart_url()).await?;
    events::wait_for_navigation(&page, "cart page load").await?;
    info!("cart page loaded");

    retry(CATEGORY_ATTEMPTS, "open category", || {
        retailer::open_category(&page, opts, sink)
    })
    .await?;

    settle(5000).await;

    retry(COUPON_ATTEMPTS, "coupon test", || async {
        test_coupon(&page, opts, sink).await?;
        // A second check in the same attempt; a failure in either restarts
        // the pair.
        test_coupon(&page, opts, sink).await
    })
    .await?;

    info!("coupon run finished");
    Ok(())
}
