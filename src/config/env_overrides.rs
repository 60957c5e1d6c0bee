use super::Config;

fn env_nonempty(keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| std::env::var(key).ok().filter(|value| !value.is_empty()))
}

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Some(secs) = env_nonempty(&["UNFURLER_TIMEOUT_SECS"])
            && let Ok(secs) = secs.parse::<u64>()
        {
            self.unfurl.request_timeout_secs = secs;
        }

        if let Some(secs) = env_nonempty(&["UNFURLER_DEADLINE_SECS"])
            && let Ok(secs) = secs.parse::<u64>()
        {
            self.unfurl.deadline_secs = secs;
        }

        if let Some(hops) = env_nonempty(&["UNFURLER_MAX_REDIRECTS"])
            && let Ok(hops) = hops.parse::<usize>()
        {
            self.unfurl.max_redirects = hops;
        }

        if let Some(bytes) = env_nonempty(&["UNFURLER_MAX_BODY_BYTES"])
            && let Ok(bytes) = bytes.parse::<usize>()
        {
            self.unfurl.max_body_bytes = bytes;
        }

        if let Some(key) = env_nonempty(&["UNFURLER_SAFE_BROWSING_KEY"]) {
            self.safety.safe_browsing_api_key = Some(key);
        }

        if let Some(host) = env_nonempty(&["UNFURLER_GATEWAY_HOST", "HOST"]) {
            self.gateway.host = host;
        }

        if let Some(port) = env_nonempty(&["UNFURLER_GATEWAY_PORT", "PORT"])
            && let Ok(port) = port.parse::<u16>()
        {
            self.gateway.port = port;
        }
    }
}
