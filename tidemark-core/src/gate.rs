//! URL gate: blocklist/allowlist pattern matcher
//!
//! First stage of the pipeline. Pure string matching over case-insensitive
//! substring patterns; the allowlist is checked before the blocklist and
//! overrides it, ambiguous URLs default to Normal. No network or DOM
//! access, so the gate is deterministic and trivially testable.

use serde::{Deserialize, Serialize};

/// Gate verdict for a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlClass {
    /// Never capture pages at this URL
    Block,
    /// Known learning/documentation domain
    Prioritize,
    /// Neither list matched; capture normally
    Normal,
}

impl UrlClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlClass::Block => "block",
            UrlClass::Prioritize => "prioritize",
            UrlClass::Normal => "normal",
        }
    }
}

/// Patterns that always block capture.
///
/// Families: browser-internal schemes, own-app pages, developer-tool
/// dashboards, email/messaging, social feeds, search results,
/// shopping/banking/payments, auth/settings/account pages, streaming,
/// online document editors.
const BLOCKLIST: &[&str] = &[
    // Browser-internal schemes
    "chrome://",
    "chrome-extension://",
    "about:",
    "edge://",
    "moz-extension://",
    "view-source:",
    // Developer-tool dashboards
    "localhost:",
    "127.0.0.1",
    "vercel.com/dashboard",
    "console.aws.amazon.com",
    "console.cloud.google.com",
    // Email and messaging
    "mail.google.com",
    "outlook.live.com",
    "outlook.office.com",
    "slack.com/client",
    "discord.com/channels",
    "web.whatsapp.com",
    "web.telegram.org",
    // Social feeds
    "twitter.com/home",
    "x.com/home",
    "facebook.com",
    "instagram.com",
    "tiktok.com",
    "linkedin.com/feed",
    "reddit.com/r/all",
    // Search result pages
    "google.com/search",
    "bing.com/search",
    "duckduckgo.com/?q=",
    // Shopping, banking, payments
    "amazon.com/gp/cart",
    "amazon.com/buy",
    "checkout",
    "paypal.com",
    "stripe.com/dashboard",
    "banking",
    // Auth, settings, account pages
    "/login",
    "/signin",
    "/sign-in",
    "/signup",
    "/sign-up",
    "/auth/",
    "/oauth",
    "/settings",
    "/account",
    "/billing",
    "/password",
    // Streaming
    "netflix.com",
    "hulu.com",
    "disneyplus.com",
    "twitch.tv",
    // Online document editors
    "docs.google.com/document/d",
    "docs.google.com/spreadsheets/d",
    "notion.so",
    "figma.com/file",
];

/// Patterns that override the blocklist.
///
/// Documentation sites, known learning platforms, and developer
/// Q&A/reference sites.
const ALLOWLIST: &[&str] = &[
    "developer.mozilla.org",
    "docs.rs",
    "doc.rust-lang.org",
    "stackoverflow.com/questions",
    "stackexchange.com",
    "wikipedia.org",
    "arxiv.org",
    "github.com",
    "news.ycombinator.com/item",
    "coursera.org/learn",
    "khanacademy.org",
    "/docs/",
    "/documentation/",
    "/reference/",
    "/tutorial",
    "/learn/",
];

/// Blocklist/allowlist URL matcher.
///
/// Custom patterns extend (never replace) the built-in lists, so a user
/// can block their own app domains or allow a private wiki.
#[derive(Debug, Clone, Default)]
pub struct UrlGate {
    custom_blocklist: Vec<String>,
    custom_allowlist: Vec<String>,
}

impl UrlGate {
    /// Gate with only the built-in pattern lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate with extra user-supplied patterns on top of the built-ins.
    pub fn with_custom_patterns(blocklist: Vec<String>, allowlist: Vec<String>) -> Self {
        Self {
            custom_blocklist: blocklist
                .into_iter()
                .map(|p| p.to_lowercase())
                .collect(),
            custom_allowlist: allowlist
                .into_iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    /// Classify a URL.
    ///
    /// Order matters: the allowlist is checked first and short-circuits
    /// to Prioritize even when a blocklist pattern would also match.
    /// URLs matching neither list default to Normal, biasing toward
    /// capture rather than silently losing data.
    pub fn classify(&self, url: &str) -> UrlClass {
        let url = url.to_lowercase();

        if ALLOWLIST.iter().any(|p| url.contains(p))
            || self.custom_allowlist.iter().any(|p| url.contains(p.as_str()))
        {
            return UrlClass::Prioritize;
        }

        if BLOCKLIST.iter().any(|p| url.contains(p))
            || self.custom_blocklist.iter().any(|p| url.contains(p.as_str()))
        {
            return UrlClass::Block;
        }

        UrlClass::Normal
    }
}
