//! X-line entity types.
//!
//! # Line Types
//!
//! | Type | Scope | Match Pattern |
//! |------|-------|---------------|
//! | G-Line | Network | ident@host (host or IP) |
//! | K-Line | Local | ident@host (host or IP) |
//! | Z-Line | Network | IP address |
//! | Q-Line | Network | Nickname |
//! | E-Line | Local | ident@host, grants immunity |
//!
//! All five share one [`XLine`] struct; per-type behavior is dispatched on
//! [`LineType`] and the shape of its [`LineMask`].

use super::session::Session;
use super::wildcard::{irc_to_lower, matches};
use crate::error::XLineError;
use std::fmt;

/// X-line kinds following traditional IRC server conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(clippy::enum_variant_names)] // Traditional IRC naming: K-Line, G-Line, etc.
pub enum LineType {
    /// G-line: network-wide ident@host ban.
    Gline,
    /// K-line: local ident@host ban.
    Kline,
    /// Z-line: IP address ban.
    Zline,
    /// Q-line: nickname ban.
    Qline,
    /// E-line: exemption from all of the above.
    Eline,
}

impl LineType {
    /// Single-letter tag used in quit messages ("G-Lined").
    pub const fn tag(&self) -> char {
        match self {
            LineType::Gline => 'G',
            LineType::Kline => 'K',
            LineType::Zline => 'Z',
            LineType::Qline => 'Q',
            LineType::Eline => 'E',
        }
    }

    /// Display name for operator notices.
    pub const fn name(&self) -> &'static str {
        match self {
            LineType::Gline => "G-Line",
            LineType::Kline => "K-Line",
            LineType::Zline => "Z-Line",
            LineType::Qline => "Q-Line",
            LineType::Eline => "E-Line",
        }
    }

    /// Whether lines of this type disconnect matching sessions.
    pub const fn is_enforcing(&self) -> bool {
        !matches!(self, LineType::Eline)
    }
}

impl fmt::Display for LineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Split an `ident@host` mask.
///
/// A missing or empty ident becomes `*`, as does an empty host.
pub fn split_ident_host(mask: &str) -> (String, String) {
    let (ident, host) = match mask.split_once('@') {
        Some((ident, host)) => (ident, host),
        None => ("*", mask),
    };
    let or_star = |s: &str| {
        if s.is_empty() {
            "*".to_string()
        } else {
            s.to_string()
        }
    };
    (or_star(ident), or_star(host))
}

/// Drop any `ident@` prefix from an IP mask.
pub fn strip_ident(mask: &str) -> &str {
    mask.split_once('@').map_or(mask, |(_, ip)| ip)
}

/// The mask fields of a line, shaped by its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMask {
    /// G/K/E-lines.
    UserHost { ident: String, host: String },
    /// Z-lines.
    Ip(String),
    /// Q-lines.
    Nick(String),
}

impl LineMask {
    /// Normalize a raw operator mask for the given line type.
    pub fn parse(line_type: LineType, raw: &str) -> Self {
        match line_type {
            LineType::Gline | LineType::Kline | LineType::Eline => {
                let (ident, host) = split_ident_host(raw);
                LineMask::UserHost { ident, host }
            }
            LineType::Zline => LineMask::Ip(strip_ident(raw).to_string()),
            LineType::Qline => LineMask::Nick(raw.to_string()),
        }
    }

    /// Key for the type+mask lookup index. Host-like parts are case-folded.
    pub fn key(&self) -> String {
        match self {
            LineMask::UserHost { ident, host } => format!("{}@{}", ident, irc_to_lower(host)),
            LineMask::Ip(ip) => irc_to_lower(ip),
            LineMask::Nick(nick) => irc_to_lower(nick),
        }
    }
}

impl fmt::Display for LineMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineMask::UserHost { ident, host } => write!(f, "{}@{}", ident, host),
            LineMask::Ip(ip) => f.write_str(ip),
            LineMask::Nick(nick) => f.write_str(nick),
        }
    }
}

/// How enforcement presents itself to a disconnected client.
#[derive(Debug, Clone, Default)]
pub struct EnforcementOptions {
    /// Server-wide notice sent before the disconnect.
    pub banner: Option<String>,
    /// Show only "X-Lined" as the public quit message.
    pub hide_bans: bool,
}

/// A disconnect requested by an enforcement line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    /// Session to disconnect.
    pub uid: String,
    /// Type of the line that matched.
    pub line_type: LineType,
    /// Banner notice to send before closing, if configured.
    pub notice: Option<String>,
    /// Quit message shown to other users.
    pub quit_reason: String,
    /// Quit message shown to operators.
    pub oper_reason: String,
}

/// A single ban or exemption rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XLine {
    line_type: LineType,
    mask: LineMask,
    /// Unix timestamp the line was set at.
    set_time: i64,
    /// Seconds; zero means permanent.
    duration: u64,
    /// `set_time + duration`. Ignored for permanent lines.
    expiry: i64,
    source: String,
    reason: String,
}

impl XLine {
    pub fn new(
        line_type: LineType,
        mask: &str,
        set_time: i64,
        duration: u64,
        source: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let duration_secs = i64::try_from(duration).unwrap_or(i64::MAX);
        Self {
            line_type,
            mask: LineMask::parse(line_type, mask),
            set_time,
            duration,
            expiry: set_time.saturating_add(duration_secs),
            source: source.into(),
            reason: reason.into(),
        }
    }

    pub fn line_type(&self) -> LineType {
        self.line_type
    }

    pub fn mask(&self) -> &LineMask {
        &self.mask
    }

    pub fn set_time(&self) -> i64 {
        self.set_time
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn expiry(&self) -> i64 {
        self.expiry
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_permanent(&self) -> bool {
        self.duration == 0
    }

    /// Whether the line has run out at `now`. Permanent lines never do.
    pub fn is_expired(&self, now: i64) -> bool {
        !self.is_permanent() && now > self.expiry
    }

    /// Sort key for the active list: timed lines by expiry, then all
    /// permanent lines.
    pub(crate) fn sort_key(&self) -> (bool, i64) {
        if self.is_permanent() {
            (true, 0)
        } else {
            (false, self.expiry)
        }
    }

    /// Check this line against a live session.
    ///
    /// Exempt sessions never match an enforcement line. E-lines skip that
    /// guard, otherwise recomputation could never keep a flag set.
    pub fn matches_session<S: Session + ?Sized>(&self, session: &S) -> bool {
        if self.line_type.is_enforcing() && session.is_exempt() {
            return false;
        }

        match &self.mask {
            LineMask::UserHost { ident, host } => {
                matches(session.ident(), ident, false)
                    && (matches(session.host(), host, true)
                        || matches(&session.ip_string(), host, true))
            }
            LineMask::Ip(ip) => matches(&session.ip_string(), ip, true),
            LineMask::Nick(nick) => matches(session.nick(), nick, true),
        }
    }

    /// Check this line against a raw mask string instead of a session.
    pub fn matches_mask(&self, candidate: &str) -> bool {
        match &self.mask {
            LineMask::UserHost { ident, host } => {
                let (cand_ident, cand_host) = split_ident_host(candidate);
                matches(&cand_ident, ident, false) && matches(&cand_host, host, true)
            }
            LineMask::Ip(ip) => matches(strip_ident(candidate), ip, true),
            LineMask::Nick(nick) => matches(candidate, nick, true),
        }
    }

    /// Build the disconnect for a session this line matched.
    pub fn apply<S: Session + ?Sized>(
        &self,
        session: &S,
        options: &EnforcementOptions,
    ) -> Result<Disconnect, XLineError> {
        if !self.line_type.is_enforcing() {
            return Err(XLineError::UnsupportedType(self.line_type));
        }

        let tag = self.line_type.tag();
        let full = format!("{}-Lined: {}", tag, self.reason);
        let quit_reason = if options.hide_bans {
            format!("{}-Lined", tag)
        } else {
            full.clone()
        };

        Ok(Disconnect {
            uid: session.uid().to_string(),
            line_type: self.line_type,
            notice: options
                .banner
                .as_ref()
                .filter(|b| !b.is_empty())
                .map(|b| format!("*** {}", b)),
            quit_reason,
            oper_reason: full,
        })
    }

    /// Operator notice for a timed line that has just expired.
    pub fn describe_expiry(&self, now: i64) -> String {
        format!(
            "Expiring timed {} {} (set by {} {} seconds ago)",
            self.line_type.name(),
            self.mask,
            self.source,
            now.saturating_sub(self.set_time).max(0)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        nick: &'static str,
        ident: &'static str,
        host: &'static str,
        ip: &'static str,
        exempt: bool,
    }

    impl Session for Probe {
        fn uid(&self) -> &str {
            "001AAAAAA"
        }
        fn nick(&self) -> &str {
            self.nick
        }
        fn ident(&self) -> &str {
            self.ident
        }
        fn host(&self) -> &str {
            self.host
        }
        fn ip_string(&self) -> String {
            self.ip.to_string()
        }
        fn is_exempt(&self) -> bool {
            self.exempt
        }
        fn set_exempt(&mut self, exempt: bool) {
            self.exempt = exempt;
        }
    }

    fn probe() -> Probe {
        Probe {
            nick: "Alice",
            ident: "alice",
            host: "host.example.com",
            ip: "10.0.0.5",
            exempt: false,
        }
    }

    #[test]
    fn test_split_ident_host() {
        assert_eq!(split_ident_host("bob@host"), ("bob".into(), "host".into()));
        assert_eq!(split_ident_host("host"), ("*".into(), "host".into()));
        assert_eq!(split_ident_host("@host"), ("*".into(), "host".into()));
        assert_eq!(split_ident_host("bob@"), ("bob".into(), "*".into()));
        assert_eq!(split_ident_host(""), ("*".into(), "*".into()));
    }

    #[test]
    fn test_zline_strips_ident() {
        let line = XLine::new(LineType::Zline, "user@192.168.1.*", 0, 0, "oper", "r");
        assert_eq!(line.mask(), &LineMask::Ip("192.168.1.*".into()));
    }

    #[test]
    fn test_userhost_matches_host_or_ip() {
        let by_host = XLine::new(LineType::Gline, "*@*.EXAMPLE.com", 0, 0, "oper", "r");
        let by_ip = XLine::new(LineType::Kline, "ali*@10.0.0.*", 0, 0, "oper", "r");
        let wrong_ident = XLine::new(LineType::Kline, "bob@*", 0, 0, "oper", "r");
        assert!(by_host.matches_session(&probe()));
        assert!(by_ip.matches_session(&probe()));
        assert!(!wrong_ident.matches_session(&probe()));
    }

    #[test]
    fn test_ident_is_case_sensitive() {
        let line = XLine::new(LineType::Gline, "ALICE@*", 0, 0, "oper", "r");
        assert!(!line.matches_session(&probe()));
    }

    #[test]
    fn test_exempt_session_never_matches_bans() {
        let mut p = probe();
        p.exempt = true;
        for line_type in [LineType::Gline, LineType::Kline, LineType::Zline, LineType::Qline] {
            let line = XLine::new(line_type, "*", 0, 0, "oper", "r");
            assert!(!line.matches_session(&p), "{line_type} matched an exempt session");
        }
        let eline = XLine::new(LineType::Eline, "*@*", 0, 0, "oper", "r");
        assert!(eline.matches_session(&p));
    }

    #[test]
    fn test_qline_matches_nick_case_insensitively() {
        let line = XLine::new(LineType::Qline, "ALI?E", 0, 0, "oper", "reserved");
        assert!(line.matches_session(&probe()));
        assert!(line.matches_mask("alice"));
        assert!(!line.matches_mask("bob"));
    }

    #[test]
    fn test_matches_mask_userhost() {
        let line = XLine::new(LineType::Gline, "*@10.0.0.5", 0, 0, "oper", "r");
        assert!(line.matches_mask("*@10.0.0.5"));
        assert!(line.matches_mask("10.0.0.5"));
        assert!(!line.matches_mask("*@10.0.0.6"));
    }

    #[test]
    fn test_expiry_and_ordering_key() {
        let timed = XLine::new(LineType::Gline, "*@x", 1000, 3600, "oper", "r");
        assert_eq!(timed.expiry(), 4600);
        assert!(!timed.is_expired(4600));
        assert!(timed.is_expired(4601));

        let perm = XLine::new(LineType::Gline, "*@y", 1000, 0, "oper", "r");
        assert!(!perm.is_expired(i64::MAX));
        assert!(timed.sort_key() < perm.sort_key());
    }

    #[test]
    fn test_apply_formats_reason() {
        let line = XLine::new(LineType::Gline, "*@*", 0, 0, "oper", "Spamming");
        let shown = line.apply(&probe(), &EnforcementOptions::default()).unwrap();
        assert_eq!(shown.quit_reason, "G-Lined: Spamming");
        assert_eq!(shown.oper_reason, "G-Lined: Spamming");
        assert_eq!(shown.notice, None);

        let options = EnforcementOptions {
            banner: Some("Appeal at example.net".into()),
            hide_bans: true,
        };
        let hidden = line.apply(&probe(), &options).unwrap();
        assert_eq!(hidden.quit_reason, "G-Lined");
        assert_eq!(hidden.oper_reason, "G-Lined: Spamming");
        assert_eq!(hidden.notice.as_deref(), Some("*** Appeal at example.net"));
    }

    #[test]
    fn test_eline_cannot_apply() {
        let line = XLine::new(LineType::Eline, "*@*", 0, 0, "oper", "r");
        assert!(matches!(
            line.apply(&probe(), &EnforcementOptions::default()),
            Err(XLineError::UnsupportedType(LineType::Eline))
        ));
    }

    #[test]
    fn test_describe_expiry() {
        let line = XLine::new(LineType::Kline, "bad@host", 1000, 60, "oper", "r");
        assert_eq!(
            line.describe_expiry(1061),
            "Expiring timed K-Line bad@host (set by oper 61 seconds ago)"
        );
    }
}
