use super::preset::{Family, Preset};
use wreq::header::{HeaderMap, HeaderValue};

const CHROME_SEC_CH_UA: &str =
    r#""Chromium";v="143", "Not/A)Brand";v="24", "Google Chrome";v="143""#;

/// Headers for a cross-site `fetch()` of a JSON lookup endpoint.
pub fn lookup_headers(preset: &Preset) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert("User-Agent", HeaderValue::from_static(preset.user_agent));
    headers.insert("Accept", HeaderValue::from_static("application/json, */*"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("cross-site"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("cors"));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("empty"));

    match preset.family {
        Family::Chrome => {
            headers.insert("Sec-Ch-Ua", HeaderValue::from_static(CHROME_SEC_CH_UA));
            headers.insert("Sec-Ch-Ua-Mobile", HeaderValue::from_static("?0"));
            headers.insert(
                "Sec-Ch-Ua-Platform",
                HeaderValue::from_static("\"Windows\""),
            );
            headers.insert(
                "Accept-Language",
                HeaderValue::from_static("en-US,en;q=0.9"),
            );
            headers.insert("Priority", HeaderValue::from_static("u=1, i"));
        }
        Family::Firefox => {
            headers.insert(
                "Accept-Language",
                HeaderValue::from_static("en-US,en;q=0.5"),
            );
        }
        Family::Safari => {
            headers.insert(
                "Accept-Language",
                HeaderValue::from_static("en-US,en;q=0.9"),
            );
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::get_preset;

    #[test]
    fn client_hints_only_for_chrome() {
        let chrome = lookup_headers(&get_preset("chrome-143").unwrap());
        assert!(chrome.contains_key("Sec-Ch-Ua"));

        let firefox = lookup_headers(&get_preset("firefox-133").unwrap());
        assert!(!firefox.contains_key("Sec-Ch-Ua"));
        assert_eq!(firefox["Accept-Language"], "en-US,en;q=0.5");
    }
}
