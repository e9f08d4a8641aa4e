//! Built-in named actions.
//!
//! Consulted by the resolver after the user's `custom_keys` / `custom_sources`.

/// Built-in key commands: name -> remote command.
pub const DEFAULT_KEYS: &[(&str, &str)] = &[
    ("up", "DPAD_UP"),
    ("down", "DPAD_DOWN"),
    ("left", "DPAD_LEFT"),
    ("right", "DPAD_RIGHT"),
    ("center", "DPAD_CENTER"),
    ("back", "BACK"),
    ("home", "HOME"),
    ("menu", "MENU"),
    ("power", "POWER"),
    ("volume_up", "VOLUME_UP"),
    ("volume_down", "VOLUME_DOWN"),
    ("volume_mute", "VOLUME_MUTE"),
    ("play_pause", "MEDIA_PLAY_PAUSE"),
    ("play", "MEDIA_PLAY"),
    ("pause", "MEDIA_PAUSE"),
    ("stop", "MEDIA_STOP"),
    ("rewind", "MEDIA_REWIND"),
    ("fast_forward", "MEDIA_FAST_FORWARD"),
    ("previous", "MEDIA_PREVIOUS"),
    ("next", "MEDIA_NEXT"),
    ("channel_up", "CHANNEL_UP"),
    ("channel_down", "CHANNEL_DOWN"),
    ("delete", "DEL"),
    ("forward_delete", "FORWARD_DEL"),
    ("enter", "ENTER"),
    ("info", "INFO"),
    ("settings", "SETTINGS"),
    ("input", "TV_INPUT"),
    ("sleep", "SLEEP"),
    ("keyboard", "KEYBOARD"),
    ("textbox", "TEXTBOX"),
    ("search", "SEARCH"),
];

/// Built-in sources: name -> activity / deep link.
pub const DEFAULT_SOURCES: &[(&str, &str)] = &[
    ("youtube", "https://www.youtube.com"),
    ("netflix", "netflix://"),
    ("spotify", "spotify://"),
    ("disney", "https://www.disneyplus.com"),
    ("prime_video", "https://app.primevideo.com"),
    ("plex", "plex://"),
    ("hulu", "hulu://"),
    ("max", "https://play.max.com"),
    ("twitch", "twitch://home"),
    ("kodi", "org.xbmc.kodi"),
];

/// Named keys whose long press auto-repeats instead of sending one long press.
pub const REPEATABLE_KEYS: &[&str] = &[
    "up",
    "down",
    "left",
    "right",
    "volume_up",
    "volume_down",
    "delete",
];

/// Browser key names forwarded from a text field: key -> named action.
pub const KEYDOWN_KEYS: &[(&str, &str)] = &[
    ("Backspace", "delete"),
    ("Delete", "forward_delete"),
    ("Enter", "enter"),
    ("ArrowLeft", "left"),
    ("ArrowRight", "right"),
];

pub fn default_key(name: &str) -> Option<&'static str> {
    lookup(DEFAULT_KEYS, name)
}

pub fn default_source(name: &str) -> Option<&'static str> {
    lookup(DEFAULT_SOURCES, name)
}

/// Named action for a non-printing key typed into a text field.
pub fn keydown_action(key: &str) -> Option<&'static str> {
    lookup(KEYDOWN_KEYS, key)
}

pub fn is_repeatable(name: &str) -> bool {
    REPEATABLE_KEYS.contains(&name)
}

fn lookup(table: &'static [(&'static str, &'static str)], name: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, value)| *value)
}
