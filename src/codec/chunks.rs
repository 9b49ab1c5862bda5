//! Cookie chunking for values that exceed the per-cookie size browsers
//! reliably accept.
//!
//! A value that fits is passed through untouched. An oversized value is split
//! into `name.0, name.1, …` slices while the base `name` cookie becomes a
//! `chunks:<n>` count marker. Token values are base64url, which never
//! contains `:`, so the marker cannot collide with a real value.

use crate::cookies::{Cookie, RequestCookies};

/// Conservative total size a single cookie may occupy, name and attributes
/// included.
pub const MAX_COOKIE_SIZE: usize = 4096;

const CHUNK_COUNT_PREFIX: &str = "chunks:";

/// Bytes available for the value of one chunk of `cookie`.
///
/// Measured from the serialized form with an empty value, with slack for the
/// `.NN` index suffix.
fn chunk_capacity(cookie: &Cookie) -> usize {
    let probe = Cookie::new(format!("{}.00", cookie.name), "", cookie.options.clone());
    MAX_COOKIE_SIZE.saturating_sub(probe.serialize().len()).max(1)
}

/// Split `cookie` if its serialized size exceeds [`MAX_COOKIE_SIZE`].
///
/// Returns the cookie unchanged (as a single element) when it fits.
#[must_use]
pub fn chunk(cookie: Cookie) -> Vec<Cookie> {
    if cookie.serialize().len() <= MAX_COOKIE_SIZE {
        return vec![cookie];
    }

    let capacity = chunk_capacity(&cookie);
    let bytes = cookie.value.as_bytes();
    let count = bytes.len().div_ceil(capacity);

    let mut cookies = Vec::with_capacity(count + 1);
    cookies.push(Cookie::new(
        cookie.name.clone(),
        format!("{CHUNK_COUNT_PREFIX}{count}"),
        cookie.options.clone(),
    ));
    for (index, slice) in bytes.chunks(capacity).enumerate() {
        // Token values are ASCII (base64url), so byte slicing is safe.
        cookies.push(Cookie::new(
            format!("{}.{index}", cookie.name),
            String::from_utf8_lossy(slice).into_owned(),
            cookie.options.clone(),
        ));
    }
    cookies
}

/// Reassemble a possibly chunked cookie value from the request.
///
/// Returns the value plus clear instructions covering every cookie the value
/// occupied, marker and chunks included. When the value is absent or partial
/// the caller applies the clears unconditionally so the client heals itself;
/// when reassembly succeeds the caller applies them only if it goes on to
/// reject the value, so a healthy cookie is never torn down.
#[must_use]
pub fn dechunk(cookies: &RequestCookies, name: &str, secure: bool) -> (Option<String>, Vec<Cookie>) {
    let Some(base) = cookies.get(name) else {
        return (None, Vec::new());
    };

    let Some(count_str) = base.strip_prefix(CHUNK_COUNT_PREFIX) else {
        // Plain, unchunked cookie.
        return (Some(base.to_string()), vec![Cookie::clearing(name, secure)]);
    };

    let mut clears = vec![Cookie::clearing(name, secure)];
    let Ok(count) = count_str.parse::<usize>() else {
        return (None, clears);
    };

    let mut value = String::new();
    for index in 0..count {
        let chunk_name = format!("{name}.{index}");
        match cookies.get(&chunk_name) {
            Some(chunk) => {
                value.push_str(chunk);
                clears.push(Cookie::clearing(chunk_name, secure));
            }
            None => {
                // Partial state: drop everything we did find.
                return (None, clears);
            }
        }
    }

    (Some(value), clears)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::CookieOptions;

    fn cookie(value: String) -> Cookie {
        Cookie::new(
            "ensaluti.session-token",
            value,
            CookieOptions::defaults(false).with_max_age(3600),
        )
    }

    fn as_request(cookies: &[Cookie]) -> RequestCookies {
        let pairs: Vec<(&str, &str)> = cookies
            .iter()
            .map(|c| (c.name.as_str(), c.value.as_str()))
            .collect();
        RequestCookies::from_pairs(&pairs)
    }

    #[test]
    fn small_value_passes_through() {
        let original = cookie("x".repeat(10));
        let chunked = chunk(original.clone());
        assert_eq!(chunked, vec![original]);

        let (value, clears) = dechunk(
            &as_request(&chunked),
            "ensaluti.session-token",
            false,
        );
        assert_eq!(value.as_deref(), Some("xxxxxxxxxx"));
        assert_eq!(clears.len(), 1);
        assert_eq!(clears[0].name, "ensaluti.session-token");
    }

    #[test]
    fn large_value_round_trips() {
        let payload = "a".repeat(10_000);
        let chunked = chunk(cookie(payload.clone()));
        assert!(chunked.len() > 2, "10k bytes must span multiple chunks");
        assert!(chunked[0].value.starts_with("chunks:"));
        for c in &chunked {
            assert!(c.serialize().len() <= MAX_COOKIE_SIZE);
        }

        let (value, clears) = dechunk(
            &as_request(&chunked),
            "ensaluti.session-token",
            false,
        );
        assert_eq!(value, Some(payload));
        // One clear instruction per presented cookie, marker included.
        assert_eq!(clears.len(), chunked.len());
        for presented in &chunked {
            assert!(clears.iter().any(|c| c.name == presented.name));
        }
    }

    #[test]
    fn missing_chunk_is_absent_and_clears_the_rest() {
        let mut chunked = chunk(cookie("b".repeat(10_000)));
        // Drop the second data chunk.
        chunked.remove(2);

        let (value, clears) = dechunk(
            &as_request(&chunked),
            "ensaluti.session-token",
            false,
        );
        assert_eq!(value, None);
        assert!(!clears.is_empty());
        assert!(clears.iter().all(Cookie::is_clear));
        assert!(clears.iter().any(|c| c.name == "ensaluti.session-token"));
    }

    #[test]
    fn corrupt_count_marker_is_absent() {
        let cookies = RequestCookies::from_pairs(&[("n", "chunks:not-a-number")]);
        let (value, clears) = dechunk(&cookies, "n", false);
        assert_eq!(value, None);
        assert_eq!(clears.len(), 1);
    }

    #[test]
    fn absent_cookie_is_silent() {
        let (value, clears) = dechunk(&RequestCookies::default(), "n", false);
        assert_eq!(value, None);
        assert!(clears.is_empty());
    }
}
