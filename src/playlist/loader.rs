//! Playlist Loader (C4)
//!
//! Fetches and filters the remote URL list, and owns the daily reload
//! daemon that keeps the [`PlaylistStore`] fresh.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use super::store::PlaylistStore;

/// Fetch the playlist body over HTTP, filter it against `blocklist`, and
/// return the survivors in random order.
///
/// Any failure (network, non-success status) is logged and produces an
/// empty sequence rather than propagating — playlist fetch failures are
/// transient and non-fatal (spec §7).
pub async fn fetch(playlist_url: &str, timeout: Duration, blocklist: &[String]) -> Vec<String> {
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(err) => {
            warn!("failed to build HTTP client for playlist fetch: {}", err);
            return Vec::new();
        }
    };

    let body = match client.get(playlist_url).send().await {
        Ok(response) => match response.error_for_status() {
            Ok(response) => match response.text().await {
                Ok(text) => text,
                Err(err) => {
                    warn!("failed to read playlist body from {}: {}", playlist_url, err);
                    return Vec::new();
                }
            },
            Err(err) => {
                warn!("playlist fetch from {} returned an error status: {}", playlist_url, err);
                return Vec::new();
            }
        },
        Err(err) => {
            warn!("failed to fetch playlist from {}: {}", playlist_url, err);
            return Vec::new();
        }
    };

    let mut urls = parse_and_filter(&body, blocklist);
    urls.shuffle(&mut rand::rng());
    info!("playlist loaded: {} URLs", urls.len());
    urls
}

fn parse_and_filter(body: &str, blocklist: &[String]) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| !is_blocked(line, blocklist))
        .map(str::to_string)
        .collect()
}

fn is_blocked(url: &str, blocklist: &[String]) -> bool {
    let lowered = url.to_lowercase();
    blocklist.iter().any(|needle| lowered.contains(needle.as_str()))
}

/// Block until the next local-midnight instant, re-fetch the playlist, and
/// replace the store on success. Runs until `stop` is set.
///
/// A single sleep is computed from the wall-clock delta to the next
/// midnight: a backwards clock jump can cause a double reload, and a
/// forward jump merely delays the next one. Neither case is treated as an
/// error, per spec §4.2.
pub async fn reload_daemon(
    store: PlaylistStore,
    playlist_url: String,
    blocklist: Vec<String>,
    fetch_timeout: Duration,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Relaxed) {
        let sleep_duration = duration_until_next_local_midnight();
        debug!(
            "playlist reload sleeping {} until next local midnight",
            humantime::format_duration(sleep_duration)
        );
        tokio::time::sleep(sleep_duration).await;

        if stop.load(Ordering::Relaxed) {
            break;
        }

        let urls = fetch(&playlist_url, fetch_timeout, &blocklist).await;
        if urls.is_empty() {
            warn!("playlist reload produced no URLs, keeping previous pool");
            continue;
        }
        store.replace(urls).await;
        info!("playlist pool reloaded at local midnight");
    }
}

fn duration_until_next_local_midnight() -> Duration {
    let now = Local::now();
    let tomorrow_midnight = (now + chrono::Duration::days(1))
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_local_timezone(Local)
        .single()
        .unwrap_or_else(|| now + chrono::Duration::days(1));

    (tomorrow_midnight - now)
        .to_std()
        .unwrap_or(Duration::from_secs(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocklist_filter_removes_matching_substrings_case_insensitively() {
        let body = "http://a.example/s1\n#EXTINF:0,foo\nhttp://b.BAD.example/s2\nhttp://c.example/s3";
        let blocklist = vec!["bad".to_string()];
        let mut urls = parse_and_filter(body, &blocklist);
        urls.sort();
        assert_eq!(urls, vec!["http://a.example/s1", "http://c.example/s3"]);
    }

    #[test]
    fn blocklist_filter_is_idempotent_under_duplicated_substrings() {
        let body = "http://a.example/s1\nhttp://b.BAD.example/s2";
        let once = vec!["bad".to_string()];
        let duplicated = vec!["bad".to_string(), "bad".to_string()];

        assert_eq!(parse_and_filter(body, &once), parse_and_filter(body, &duplicated));
    }

    #[test]
    fn comment_and_blank_lines_are_ignored() {
        let body = "\n# comment\nhttp://a.example/s1\n   \n";
        let urls = parse_and_filter(body, &[]);
        assert_eq!(urls, vec!["http://a.example/s1"]);
    }

    #[test]
    fn next_midnight_is_always_in_the_future_and_within_a_day() {
        let delta = duration_until_next_local_midnight();
        assert!(delta <= Duration::from_secs(24 * 60 * 60));
    }
}
