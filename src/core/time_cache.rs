//! Per-thread timestamp formatting cache
//!
//! Rendering a calendar timestamp for every emitted line is comparatively
//! expensive, and resolving the local UTC offset even more so. The cache keeps
//! the last rendered string per `(zone, pattern)` and only re-renders when the
//! wall-clock second changes. The local offset is cached separately and is only
//! re-resolved every [`OFFSET_REFRESH_INTERVAL`].
//!
//! Each thread owns its own cache (see [`with_thread_cache`]), so header
//! rendering never contends on a lock.

use chrono::{DateTime, FixedOffset, Local, Offset, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

/// Minimum distance between two renders of the same `(zone, pattern)`.
pub const TIMESTAMP_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Minimum distance between two resolutions of the local UTC offset.
pub const OFFSET_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// ISO 8601 with a numeric offset: `2025-01-08T10:30:45+0100`
pub const DEFAULT_TIME_PATTERN: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Time zone a timestamp header is rendered in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeZoneMode {
    #[default]
    Local,
    Utc,
}

impl TimeZoneMode {
    #[inline]
    fn index(self) -> usize {
        match self {
            TimeZoneMode::Local => 0,
            TimeZoneMode::Utc => 1,
        }
    }
}

/// Resolves the local UTC offset, in minutes, at the given instant.
pub type OffsetResolver = fn(&DateTime<Utc>) -> i32;

/// Default [`OffsetResolver`] backed by the system time zone database.
pub fn local_offset_minutes(at: &DateTime<Utc>) -> i32 {
    Local
        .offset_from_utc_datetime(&at.naive_utc())
        .local_minus_utc()
        / 60
}

/// Render an offset in minutes as `+HHMM` / `-HHMM`.
pub fn numeric_utc_offset(offset_minutes: i32) -> String {
    let sign = if offset_minutes < 0 { '-' } else { '+' };
    let abs = offset_minutes.unsigned_abs();
    format!("{}{:02}{:02}", sign, abs / 60, abs % 60)
}

/// Replace every `%z` in `pattern` with the literal numeric offset.
/// `%%` escapes are preserved.
fn substitute_offset(pattern: &str, offset_minutes: i32) -> Cow<'_, str> {
    if !pattern.contains("%z") {
        return Cow::Borrowed(pattern);
    }

    let offset = numeric_utc_offset(offset_minutes);
    let mut out = String::with_capacity(pattern.len() + offset.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('z') => {
                chars.next();
                out.push_str(&offset);
            }
            Some('%') => {
                chars.next();
                out.push_str("%%");
            }
            _ => out.push('%'),
        }
    }
    Cow::Owned(out)
}

#[derive(Debug)]
struct CachedTime {
    rendered: String,
    second: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct CachedOffset {
    minutes: i32,
    resolved_at: DateTime<Utc>,
}

/// Cache of rendered timestamps keyed by `(zone, pattern)`.
#[derive(Debug)]
pub struct TimeFormatCache {
    entries: [HashMap<String, CachedTime>; 2],
    offset: Option<CachedOffset>,
    resolve_offset: OffsetResolver,
    renders: u64,
    offset_resolutions: u64,
}

impl TimeFormatCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_offset_resolver(local_offset_minutes)
    }

    /// Create a cache that resolves the local offset through `resolver`.
    #[must_use]
    pub fn with_offset_resolver(resolver: OffsetResolver) -> Self {
        Self {
            entries: [HashMap::new(), HashMap::new()],
            offset: None,
            resolve_offset: resolver,
            renders: 0,
            offset_resolutions: 0,
        }
    }

    /// Render `timestamp` (floored to the second) with `pattern` in `zone`.
    ///
    /// Returns the cached string when the floored second matches the last
    /// render for this `(zone, pattern)`. An invalid pattern renders as the
    /// pattern text itself.
    pub fn render(&mut self, zone: TimeZoneMode, pattern: &str, timestamp: &DateTime<Utc>) -> &str {
        let second = timestamp.trunc_subsecs(0);
        let idx = zone.index();

        let fresh = self.entries[idx]
            .get(pattern)
            .is_some_and(|entry| entry.second == second);

        if !fresh {
            let rendered = self.render_uncached(zone, pattern, &second);
            match self.entries[idx].get_mut(pattern) {
                Some(entry) => {
                    entry.rendered = rendered;
                    entry.second = second;
                }
                None => {
                    self.entries[idx].insert(pattern.to_string(), CachedTime { rendered, second });
                }
            }
        }

        self.entries[idx]
            .get(pattern)
            .map_or("", |entry| entry.rendered.as_str())
    }

    /// Number of renders that missed the cache.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// Number of times the local offset was resolved.
    pub fn offset_resolutions(&self) -> u64 {
        self.offset_resolutions
    }

    fn render_uncached(&mut self, zone: TimeZoneMode, pattern: &str, second: &DateTime<Utc>) -> String {
        self.renders += 1;

        let offset_minutes = match zone {
            TimeZoneMode::Utc => 0,
            TimeZoneMode::Local => self.local_offset(second),
        };
        let fixed = FixedOffset::east_opt(offset_minutes * 60).unwrap_or_else(|| Utc.fix());
        let pattern = substitute_offset(pattern, offset_minutes);

        let mut out = String::with_capacity(pattern.len() + 8);
        if write!(out, "{}", second.with_timezone(&fixed).format(&pattern)).is_err() {
            out.clear();
            out.push_str(&pattern);
        }
        out
    }

    fn local_offset(&mut self, now: &DateTime<Utc>) -> i32 {
        let stale = match self.offset {
            None => true,
            // A negative delta (clock moved backwards) also forces a refresh
            Some(cached) => match (*now - cached.resolved_at).to_std() {
                Ok(elapsed) => elapsed >= OFFSET_REFRESH_INTERVAL,
                Err(_) => true,
            },
        };

        if stale {
            let minutes = (self.resolve_offset)(now);
            self.offset_resolutions += 1;
            self.offset = Some(CachedOffset {
                minutes,
                resolved_at: *now,
            });
        }

        self.offset.map_or(0, |cached| cached.minutes)
    }
}

impl Default for TimeFormatCache {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static THREAD_TIME_CACHE: RefCell<TimeFormatCache> = RefCell::new(TimeFormatCache::new());
}

/// Run `f` with the calling thread's cache.
///
/// Re-entrant calls, and calls made after the thread's storage was torn
/// down (e.g. from another thread-local's destructor), run `f` against a
/// fresh throwaway cache instead.
pub fn with_thread_cache<R>(mut f: impl FnMut(&mut TimeFormatCache) -> R) -> R {
    let cached = THREAD_TIME_CACHE.try_with(|cache| {
        cache.try_borrow_mut().ok().map(|mut cache| f(&mut cache))
    });
    match cached {
        Ok(Some(result)) => result,
        _ => f(&mut TimeFormatCache::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn fixed_datetime() -> DateTime<Utc> {
        // 2025-01-08 10:30:45.123456 UTC
        Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45)
            .single()
            .expect("valid datetime")
            + TimeDelta::microseconds(123456)
    }

    fn plus_two_hours(_: &DateTime<Utc>) -> i32 {
        120
    }

    fn minus_five_thirty(_: &DateTime<Utc>) -> i32 {
        -330
    }

    #[test]
    fn test_utc_render() {
        let mut cache = TimeFormatCache::new();
        let out = cache.render(TimeZoneMode::Utc, DEFAULT_TIME_PATTERN, &fixed_datetime());
        assert_eq!(out, "2025-01-08T10:30:45+0000");
    }

    #[test]
    fn test_local_render_uses_resolved_offset() {
        let mut cache = TimeFormatCache::with_offset_resolver(plus_two_hours);
        let out = cache.render(TimeZoneMode::Local, DEFAULT_TIME_PATTERN, &fixed_datetime());
        assert_eq!(out, "2025-01-08T12:30:45+0200");
    }

    #[test]
    fn test_negative_offset() {
        let mut cache = TimeFormatCache::with_offset_resolver(minus_five_thirty);
        let out = cache.render(TimeZoneMode::Local, "%H:%M %z", &fixed_datetime());
        assert_eq!(out, "05:00 -0530");
    }

    #[test]
    fn test_same_second_is_cached() {
        let mut cache = TimeFormatCache::new();
        let t = fixed_datetime();
        let first = cache.render(TimeZoneMode::Utc, DEFAULT_TIME_PATTERN, &t).to_string();
        let second = cache
            .render(TimeZoneMode::Utc, DEFAULT_TIME_PATTERN, &(t + TimeDelta::milliseconds(500)))
            .to_string();

        assert_eq!(first, second);
        assert_eq!(cache.renders(), 1);
    }

    #[test]
    fn test_next_second_rerenders() {
        let mut cache = TimeFormatCache::new();
        let t = fixed_datetime();
        let first = cache.render(TimeZoneMode::Utc, DEFAULT_TIME_PATTERN, &t).to_string();
        let later = cache
            .render(TimeZoneMode::Utc, DEFAULT_TIME_PATTERN, &(t + TimeDelta::seconds(1)))
            .to_string();

        assert_ne!(first, later);
        assert_eq!(later, "2025-01-08T10:30:46+0000");
        assert_eq!(cache.renders(), 2);
    }

    #[test]
    fn test_patterns_and_zones_cached_independently() {
        let mut cache = TimeFormatCache::with_offset_resolver(plus_two_hours);
        let t = fixed_datetime();
        assert_eq!(cache.render(TimeZoneMode::Utc, "%H", &t), "10");
        assert_eq!(cache.render(TimeZoneMode::Local, "%H", &t), "12");
        assert_eq!(cache.render(TimeZoneMode::Utc, "%M", &t), "30");
        assert_eq!(cache.renders(), 3);
    }

    #[test]
    fn test_offset_refresh_granularity() {
        let mut cache = TimeFormatCache::with_offset_resolver(plus_two_hours);
        let t = fixed_datetime();

        for s in 0..10 {
            cache.render(TimeZoneMode::Local, DEFAULT_TIME_PATTERN, &(t + TimeDelta::seconds(s)));
        }
        assert_eq!(cache.renders(), 10);
        assert_eq!(cache.offset_resolutions(), 1);

        cache.render(TimeZoneMode::Local, DEFAULT_TIME_PATTERN, &(t + TimeDelta::seconds(10)));
        assert_eq!(cache.offset_resolutions(), 2);
    }

    #[test]
    fn test_utc_never_resolves_offset() {
        let mut cache = TimeFormatCache::with_offset_resolver(plus_two_hours);
        cache.render(TimeZoneMode::Utc, DEFAULT_TIME_PATTERN, &fixed_datetime());
        assert_eq!(cache.offset_resolutions(), 0);
    }

    #[test]
    fn test_escaped_percent_is_preserved() {
        let mut cache = TimeFormatCache::new();
        let out = cache.render(TimeZoneMode::Utc, "%%z %z", &fixed_datetime());
        assert_eq!(out, "%z +0000");
    }

    #[test]
    fn test_invalid_pattern_renders_verbatim() {
        let mut cache = TimeFormatCache::new();
        let out = cache.render(TimeZoneMode::Utc, "%Q", &fixed_datetime());
        assert_eq!(out, "%Q");
    }

    #[test]
    fn test_numeric_utc_offset() {
        assert_eq!(numeric_utc_offset(0), "+0000");
        assert_eq!(numeric_utc_offset(60), "+0100");
        assert_eq!(numeric_utc_offset(-90), "-0130");
        assert_eq!(numeric_utc_offset(345), "+0545");
    }

    #[test]
    fn test_thread_cache_is_per_thread() {
        let t = fixed_datetime();
        with_thread_cache(|c| {
            c.render(TimeZoneMode::Utc, "%S", &t);
        });
        let other_thread_renders = std::thread::spawn(|| with_thread_cache(|c| c.renders()))
            .join()
            .unwrap();
        assert_eq!(other_thread_renders, 0);
    }
}
