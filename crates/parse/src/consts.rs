use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

regex!(VERSION_REGEX, r"^(\d+)(?:\.(\d+))?$");
// "QtQuick.Controls/Button 2.15"
regex!(EXPORT_REGEX, r"^([^/\s]+)/([^/\s]+)\s+(\d+)(?:\.(\d+))?$");
regex!(IDENTIFIER_REGEX, r"^[A-Za-z_$][A-Za-z0-9_$]*$");
regex!(MODULE_REGEX, r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*$");
