/// Referrer hosts that never count as an inbound link: search engines, feed
/// readers, and URL shorteners.
const BLOCKED_REFERRER_HOSTS: &[&str] = &[
    "duckduckgo.com",
    "fraidyc.at",
    "baidu.com",
    "t.co",
    "www.feedly.com",
    "feedly.com",
    "www.findyour.blog",
    "www.google",
    "m.baidu.com",
];

/// Whether a referrer URL should be recorded as an inbound link. Only
/// external http(s) referrers count; blocklisted hosts and the site's own
/// domain are excluded by a scheme+host prefix check.
pub fn is_relevant_referrer(referrer: &str, own_domain: &str) -> bool {
    if referrer.is_empty() {
        return false;
    }
    if !referrer.starts_with("http") {
        return false;
    }
    let own = [own_domain];
    for host in BLOCKED_REFERRER_HOSTS.iter().chain(own.iter()) {
        if host.is_empty() {
            continue;
        }
        if referrer.starts_with(&format!("http://{host}"))
            || referrer.starts_with(&format!("https://{host}"))
        {
            return false;
        }
    }
    true
}
