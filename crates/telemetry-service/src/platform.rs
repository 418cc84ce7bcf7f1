/// Which user-service mechanism this host supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Darwin,
    Linux,
    Unsupported,
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" => Platform::Darwin,
            "linux" => Platform::Linux,
            _ => Platform::Unsupported,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Darwin => "darwin",
            Platform::Linux => "linux",
            Platform::Unsupported => "unsupported",
        }
    }
}
