use clap::Parser;
use std::path::PathBuf;

/// Run configuration. Parsed once in `main` and passed by reference; nothing
/// below the entry point reads flags or environment on its own.
#[derive(Parser, Debug, Clone)]
#[command(name = "couponfarm")]
#[command(about = "Drives a retail cart through a randomized coupon test loop")]
pub struct Options {
    /// Coupon type submitted and reported with each verdict
    #[arg(long, default_value = "TEN_OFF")]
    pub coupon_type: String,

    /// Port of the local reporting endpoint
    #[arg(long, default_value_t = 8000)]
    pub server_port: u16,

    /// Retailer host the workflow drives (may carry a port)
    #[arg(long, default_value = "website.com")]
    pub retailer_host: String,

    /// Scheme for retailer URLs
    #[arg(long, default_value = "https")]
    pub retailer_scheme: String,

    /// Proxy host; when set, Chromium is launched behind it
    #[arg(long)]
    pub proxy_host: Option<String>,

    /// Proxy port
    #[arg(long)]
    pub proxy_port: Option<u16>,

    /// Proxy username (not injectable via launch flags; see startup log)
    #[arg(long)]
    pub proxy_username: Option<String>,

    /// Proxy password
    #[arg(long)]
    pub proxy_password: Option<String>,

    /// Proxy scheme
    #[arg(long, default_value = "http")]
    pub proxy_protocol: String,

    /// Run the browser headless
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    /// Chromium executable override
    #[arg(long)]
    pub chrome_path: Option<PathBuf>,

    /// Directory for diagnostic screenshots
    #[arg(long, default_value = ".")]
    pub screenshot_dir: PathBuf,

    /// Mirror logs into a daily-rolling file
    #[arg(long, default_value_t = false)]
    pub file_log: bool,

    /// Directory for log files
    #[arg(long, default_value = "logs")]
    pub log_dir: String,
}

impl Options {
    pub fn origin(&self) -> String {
        format!("{}://{}", self.retailer_scheme, self.retailer_host)
    }

    pub fn cart_url(&self) -> String {
        format!("{}/cart", self.origin())
    }

    /// URL fragment that identifies a category listing response.
    pub fn category_fragment(&self) -> String {
        format!("{}/pl/", self.retailer_host)
    }

    /// URL fragment that identifies a cart page response.
    pub fn cart_fragment(&self) -> String {
        format!("{}/cart", self.retailer_host)
    }

    /// Exact URL of the cart-items API hit when an item lands in the cart.
    pub fn cart_items_url(&self) -> String {
        format!("{}/purchase/api/cart/cartitems", self.origin())
    }

    pub fn report_base(&self) -> String {
        format!("http://127.0.0.1:{}/", self.server_port)
    }

    /// Chromium `--proxy-server` argument, when a proxy is configured.
    pub fn proxy_arg(&self) -> Option<String> {
        let host = self.proxy_host.as_deref()?;
        let port = self.proxy_port?;
        Some(format!(
            "--proxy-server={}://{}:{}",
            self.proxy_protocol, host, port
        ))
    }

    pub fn has_proxy_credentials(&self) -> bool {
        self.proxy_username.is_some() || self.proxy_password.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_run() {
        let opts = Options::parse_from(["couponfarm"]);
        assert_eq!(opts.coupon_type, "TEN_OFF");
        assert_eq!(opts.server_port, 8000);
        assert_eq!(opts.retailer_host, "website.com");
        assert_eq!(opts.cart_url(), "https://website.com/cart");
        assert_eq!(opts.report_base(), "http://127.0.0.1:8000/");
        assert_eq!(
            opts.cart_items_url(),
            "https://website.com/purchase/api/cart/cartitems"
        );
        assert!(!opts.headless);
        assert!(opts.proxy_arg().is_none());
    }

    #[test]
    fn proxy_arg_needs_host_and_port() {
        let opts = Options::parse_from(["couponfarm", "--proxy-host", "10.0.0.1"]);
        assert!(opts.proxy_arg().is_none());

        let opts = Options::parse_from([
            "couponfarm",
            "--proxy-host",
            "10.0.0.1",
            "--proxy-port",
            "3128",
        ]);
        assert_eq!(
            opts.proxy_arg().as_deref(),
            Some("--proxy-server=http://10.0.0.1:3128")
        );
    }

    #[test]
    fn host_with_port_flows_into_fragments() {
        let opts = Options::parse_from([
            "couponfarm",
            "--retailer-host",
            "127.0.0.1:4180",
            "--retailer-scheme",
            "http",
        ]);
        assert_eq!(opts.cart_url(), "http://127.0.0.1:4180/cart");
        assert_eq!(opts.category_fragment(), "127.0.0.1:4180/pl/");
    }
}
