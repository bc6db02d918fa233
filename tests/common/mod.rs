//! Integration test common infrastructure.
//!
//! Builds server state and sessions without a transport.

#![allow(dead_code)]

use slircd_xline::ServerState;
use slircd_xline::xline::EnforcementOptions;
use std::io::Write;
use std::net::IpAddr;

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid IP literal")
}

/// Fresh state with default enforcement options.
pub fn server() -> ServerState {
    ServerState::new("00T", EnforcementOptions::default())
}

/// Connect a session whose hostname is its IP, as when DNS fails.
pub fn connect(state: &ServerState, nick: &str, user: &str, addr: &str, now: i64) -> String {
    state
        .connect(nick, user, addr, ip(addr), now)
        .unwrap_or_else(|d| panic!("{} unexpectedly banned: {}", nick, d.quit_reason))
}

/// Write `contents` to a temporary config file.
pub fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}
