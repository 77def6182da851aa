//! Promotional banners shown on the storefront home page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::BannerId;

/// A home page banner offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerOffer {
    pub id: BannerId,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

impl BannerOffer {
    /// Whether the banner should be rendered at `now`. Open-ended bounds always pass.
    #[must_use]
    pub fn is_showing_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.is_none_or(|start| start <= now)
            && self.ends_at.is_none_or(|end| now <= end)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_banner_window() {
        let now = Utc::now();
        let mut banner = BannerOffer {
            id: BannerId::new(1),
            title: "Monsoon sale".to_string(),
            subtitle: None,
            image: None,
            link: None,
            is_active: true,
            starts_at: None,
            ends_at: None,
        };
        assert!(banner.is_showing_at(now));

        banner.ends_at = Some(now - Duration::hours(1));
        assert!(!banner.is_showing_at(now));

        banner.ends_at = None;
        banner.is_active = false;
        assert!(!banner.is_showing_at(now));
    }
}
