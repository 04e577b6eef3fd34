use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SuivmError;

/// Deployment network with its own release stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Mainnet,
    Testnet,
    Devnet,
}

impl Environment {
    pub const ALL: [Environment; 3] = [Self::Mainnet, Self::Testnet, Self::Devnet];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Devnet => "devnet",
        }
    }

    /// Prefix every release tag of this environment starts with.
    pub fn tag_prefix(self) -> String {
        format!("{}-", self.as_str())
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Some(Self::Mainnet),
            "testnet" => Some(Self::Testnet),
            "devnet" => Some(Self::Devnet),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = SuivmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| SuivmError::UnknownEnvironment {
            value: s.to_string(),
        })
    }
}

/// Operating system flavour used in release archive names.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ubuntu,
    Macos,
    Windows,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Self::Ubuntu, Self::Macos, Self::Windows];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ubuntu => "ubuntu",
            Self::Macos => "macos",
            Self::Windows => "windows",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "ubuntu" | "linux" => Some(Self::Ubuntu),
            "macos" | "darwin" | "mac" => Some(Self::Macos),
            "windows" | "win" => Some(Self::Windows),
            _ => None,
        }
    }

    pub fn host() -> Option<Self> {
        match std::env::consts::OS {
            "linux" => Some(Self::Ubuntu),
            "macos" => Some(Self::Macos),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// File name of an executable on this platform.
    pub fn executable_name(self, stem: &str) -> String {
        match self {
            Self::Windows => format!("{stem}.exe"),
            Self::Ubuntu | Self::Macos => stem.to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = SuivmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| SuivmError::UnknownPlatform {
            value: s.to_string(),
        })
    }
}

/// CPU architecture token used in release archive names.
///
/// Releases use `arm64` for Apple silicon and `aarch64` for Linux arm builds,
/// so both are kept as distinct tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Arch {
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "aarch64")]
    Aarch64,
    #[serde(rename = "arm64")]
    Arm64,
}

impl Arch {
    pub const ALL: [Arch; 3] = [Self::X86_64, Self::Aarch64, Self::Arm64];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
            Self::Arm64 => "arm64",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Some(Self::X86_64),
            "aarch64" => Some(Self::Aarch64),
            "arm64" => Some(Self::Arm64),
            _ => None,
        }
    }

    pub fn host() -> Option<Self> {
        match (std::env::consts::ARCH, std::env::consts::OS) {
            ("x86_64", _) => Some(Self::X86_64),
            ("aarch64", "macos") => Some(Self::Arm64),
            ("aarch64", _) => Some(Self::Aarch64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = SuivmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| SuivmError::UnknownArch {
            value: s.to_string(),
        })
    }
}
