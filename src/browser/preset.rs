use wreq_util::Emulation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    Chrome,
    Firefox,
    Safari,
}

/// Browser identity used for TLS emulation and request headers on lookups.
#[derive(Clone)]
pub struct Preset {
    pub name: &'static str,
    pub family: Family,
    pub user_agent: &'static str,
    pub emulation: Emulation,
}

pub const PRESET_NAMES: &[&str] = &["chrome-143", "firefox-133", "safari-18"];

pub const DEFAULT_PRESET: &str = "chrome-143";

pub fn get_preset(name: &str) -> Option<Preset> {
    let preset = match name {
        "chrome-143" => Preset {
            name: "chrome-143",
            family: Family::Chrome,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36",
            emulation: Emulation::Chrome143,
        },
        "firefox-133" => Preset {
            name: "firefox-133",
            family: Family::Firefox,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
            emulation: Emulation::Firefox133,
        },
        "safari-18" => Preset {
            name: "safari-18",
            family: Family::Safari,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.0 Safari/605.1.15",
            emulation: Emulation::Safari18,
        },
        _ => return None,
    };
    Some(preset)
}
