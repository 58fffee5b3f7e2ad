//! Host identifiers used to pick a tool download.
//!
//! Tool releases publish one archive per host triple. Triples are not
//! normalized across vendors (`x86_64-pc-linux-gnu` vs `x86_64-linux-gnu`),
//! so a host is matched against an ordered allow-list of aliases rather than a
//! single canonical name.
//!
//! # Example
//!
//! ```
//! use boardpack_schema::host::default_hosts;
//!
//! let hosts = default_hosts();
//! println!("Selecting tools for: {}", hosts.join(", "));
//! ```

/// Host triples accepted on `x86_64` Linux.
pub const LINUX_X86_64: &[&str] = &["x86_64-pc-linux-gnu", "x86_64-linux-gnu"];
/// Host triples accepted on 32-bit x86 Linux.
pub const LINUX_I686: &[&str] = &["i686-pc-linux-gnu", "i686-linux-gnu"];
/// Host triples accepted on 64-bit ARM Linux.
pub const LINUX_AARCH64: &[&str] = &["aarch64-linux-gnu", "aarch64-unknown-linux-gnu"];
/// Host triples accepted on 32-bit ARM Linux.
pub const LINUX_ARM: &[&str] = &["arm-linux-gnueabihf", "armhf-pc-linux-gnu"];
/// Host triples accepted on macOS. Vendors still ship 32-bit-tagged builds.
pub const MACOS: &[&str] = &["x86_64-apple-darwin", "i386-apple-darwin11"];
/// Host triples accepted on Windows.
pub const WINDOWS: &[&str] = &["i686-mingw32", "x86_64-mingw32"];

/// The host allow-list for the machine this binary was built for.
pub fn default_hosts() -> Vec<String> {
    current().iter().map(|h| (*h).to_string()).collect()
}

fn current() -> &'static [&'static str] {
    #[cfg(target_os = "macos")]
    {
        MACOS
    }
    #[cfg(target_os = "windows")]
    {
        WINDOWS
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        match std::env::consts::ARCH {
            "x86" => LINUX_I686,
            "aarch64" => LINUX_AARCH64,
            "arm" => LINUX_ARM,
            _ => LINUX_X86_64,
        }
    }
}
