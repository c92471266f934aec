use crate::config::ProxyConfig;
use url::Url;

/// Proxy resolution order from spec §4.C: repository-level config wins over
/// global config wins over environment variables wins over none. A
/// repository-level `enabled = false` disables proxying outright regardless
/// of what global config or the environment say.
pub fn resolve_proxy(repository_proxy: Option<&ProxyConfig>, global_proxy: Option<&ProxyConfig>) -> Option<Url> {
    if let Some(proxy) = repository_proxy {
        if !proxy.enabled {
            return None;
        }
        if let Some(url) = proxy.https_proxy.clone().or_else(|| proxy.http_proxy.clone()) {
            return Some(url);
        }
    }
    if let Some(proxy) = global_proxy {
        if !proxy.enabled {
            return None;
        }
        if let Some(url) = proxy.https_proxy.clone().or_else(|| proxy.http_proxy.clone()) {
            return Some(url);
        }
    }
    std::env::var("HTTPS_PROXY")
        .or_else(|_| std::env::var("https_proxy"))
        .or_else(|_| std::env::var("HTTP_PROXY"))
        .or_else(|_| std::env::var("http_proxy"))
        .ok()
        .and_then(|value| Url::parse(&value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_level_wins_over_global() {
        let repo = ProxyConfig {
            enabled: true,
            http_proxy: None,
            https_proxy: Some(Url::parse("https://repo-proxy.example").unwrap()),
            no_proxy: vec![],
        };
        let global = ProxyConfig {
            enabled: true,
            http_proxy: None,
            https_proxy: Some(Url::parse("https://global-proxy.example").unwrap()),
            no_proxy: vec![],
        };
        let resolved = resolve_proxy(Some(&repo), Some(&global));
        assert_eq!(resolved.unwrap().host_str(), Some("repo-proxy.example"));
    }

    #[test]
    fn repository_disabled_overrides_global() {
        let repo = ProxyConfig { enabled: false, http_proxy: None, https_proxy: None, no_proxy: vec![] };
        let global = ProxyConfig {
            enabled: true,
            http_proxy: None,
            https_proxy: Some(Url::parse("https://global-proxy.example").unwrap()),
            no_proxy: vec![],
        };
        assert!(resolve_proxy(Some(&repo), Some(&global)).is_none());
    }
}
