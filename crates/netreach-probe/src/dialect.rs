use std::fmt;
use std::str::FromStr;

/// Output grammar family of the platform's ping and route tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Windows,
    Posix,
}

impl Dialect {
    pub fn host() -> Self {
        if cfg!(windows) {
            Dialect::Windows
        } else {
            Dialect::Posix
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Windows => "windows",
            Dialect::Posix => "posix",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "windows" | "win" => Ok(Dialect::Windows),
            "posix" | "unix" | "linux" | "macos" => Ok(Dialect::Posix),
            other => Err(format!("unknown dialect: {other}")),
        }
    }
}
