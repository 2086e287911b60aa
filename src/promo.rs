use serde::Deserialize;

/// Body of the cart promocode API response, reduced to the fields the
/// verdict depends on. Everything is optional; the site omits fields freely.
#[derive(Debug, Clone, Deserialize)]
pub struct PromoResponse {
    #[serde(default)]
    pub data: Option<PromoData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromoData {
    #[serde(default)]
    pub coupons: Vec<Coupon>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub is_valid: Option<bool>,
}

impl PromoResponse {
    pub fn coupons(&self) -> &[Coupon] {
        self.data.as_ref().map(|d| d.coupons.as_slice()).unwrap_or(&[])
    }
}

/// Outcome of classifying a promocode response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The coupon at `index` was accepted.
    Valid { index: usize },
    /// The single submitted coupon was explicitly rejected.
    Invalid,
    /// Anything the rules below do not cover.
    Unexpected,
}

/// Classify a coupon list, in precedence order:
/// a lone valid coupon, a valid second coupon, a lone explicitly-invalid
/// coupon, otherwise unexpected. "Explicitly" means the payload said
/// `isValid: false`; a missing flag never counts as a rejection.
pub fn classify(coupons: &[Coupon]) -> Verdict {
    if coupons.len() == 1 && coupons[0].is_valid == Some(true) {
        return Verdict::Valid { index: 0 };
    }
    if coupons.len() >= 2 && coupons[1].is_valid == Some(true) {
        return Verdict::Valid { index: 1 };
    }
    if coupons.len() == 1 && coupons[0].is_valid == Some(false) {
        return Verdict::Invalid;
    }
    Verdict::Unexpected
}

/// Reporting path for a verdict, or `None` when nothing should be fired.
pub fn report_path(verdict: Verdict, coupons: &[Coupon], coupon_type: &str) -> Option<String> {
    match verdict {
        Verdict::Valid { index } => Some(format!(
            "valid_coupon/{}/{}",
            coupon_type,
            code_at(coupons, index)
        )),
        Verdict::Invalid => Some(format!(
            "invalid_coupon/{}/{}",
            coupon_type,
            code_at(coupons, 0)
        )),
        Verdict::Unexpected => None,
    }
}

fn code_at(coupons: &[Coupon], index: usize) -> &str {
    coupons
        .get(index)
        .and_then(|c| c.coupon_code.as_deref())
        .unwrap_or("unknown")
}
