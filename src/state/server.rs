//! Shared server state: the line store plus the local session table.
//!
//! Both live behind one `parking_lot::Mutex` so every store mutation and
//! every sweep over sessions is serialized, and enforcement never iterates
//! a session set that another task is changing underneath it.

use super::session::{LocalSession, SessionTable};
use crate::config::{Config, XLinesConfig};
use crate::xline::{Disconnect, EnforcementOptions, LineType, XLineManager};
use parking_lot::Mutex;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Inner {
    xlines: XLineManager,
    sessions: SessionTable,
}

/// Outcome of one scheduler tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Operator notices for lines that expired this tick.
    pub expired: Vec<String>,
    /// Sessions disconnected by newly applied lines.
    pub disconnected: Vec<Disconnect>,
}

/// Server-wide X-line state.
#[derive(Debug)]
pub struct ServerState {
    sid: String,
    next_client: AtomicU64,
    inner: Mutex<Inner>,
}

/// Current unix time in seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl ServerState {
    pub fn new(sid: impl Into<String>, options: EnforcementOptions) -> Self {
        Self {
            sid: sid.into(),
            next_client: AtomicU64::new(0),
            inner: Mutex::new(Inner {
                xlines: XLineManager::new(options),
                sessions: SessionTable::new(),
            }),
        }
    }

    /// Build state from configuration, loading every static line.
    pub fn from_config(config: &Config, now: i64) -> Self {
        let state = Self::new(
            config.server.sid.clone(),
            config.xlines.enforcement_options(),
        );
        state.load_static_lines(&config.xlines, now);
        state
    }

    fn load_static_lines(&self, config: &XLinesConfig, now: i64) {
        let mut inner = self.inner.lock();
        let Inner { xlines, sessions } = &mut *inner;

        let mut loaded = 0usize;
        for line in config.ban_lines(now) {
            match xlines.add(line, sessions) {
                Ok(_) => loaded += 1,
                Err(e) => warn!(error = %e, "Failed to load static line"),
            }
        }
        let elines = xlines.reload_exemptions(config.exception_lines(now), sessions);
        info!(bans = loaded, elines, "Static X-lines loaded");
    }

    /// Re-read enforcement options and E-lines after a rehash.
    ///
    /// Static ban blocks are not reloaded; operator-set bans must survive
    /// a rehash.
    pub fn rehash(&self, config: &XLinesConfig, now: i64) -> usize {
        let mut inner = self.inner.lock();
        let Inner { xlines, sessions } = &mut *inner;
        xlines.set_options(config.enforcement_options());
        xlines.reload_exemptions(config.exception_lines(now), sessions)
    }

    /// Add a line set by `source`, timestamped now.
    pub fn add_line(
        &self,
        line_type: LineType,
        duration: u64,
        source: &str,
        reason: &str,
        mask: &str,
    ) -> bool {
        self.add_line_at(unix_now(), line_type, duration, source, reason, mask)
    }

    /// Add a line with an explicit set time.
    pub fn add_line_at(
        &self,
        now: i64,
        line_type: LineType,
        duration: u64,
        source: &str,
        reason: &str,
        mask: &str,
    ) -> bool {
        let mut inner = self.inner.lock();
        let Inner { xlines, sessions } = &mut *inner;
        match line_type {
            LineType::Gline => xlines.add_gline(now, duration, source, reason, mask),
            LineType::Kline => xlines.add_kline(now, duration, source, reason, mask),
            LineType::Zline => xlines.add_zline(now, duration, source, reason, mask),
            LineType::Qline => xlines.add_qline(now, duration, source, reason, mask),
            LineType::Eline => xlines.add_eline(sessions, now, duration, source, reason, mask),
        }
    }

    pub fn remove_line(&self, mask: &str, line_type: LineType) -> bool {
        let mut inner = self.inner.lock();
        let Inner { xlines, sessions } = &mut *inner;
        xlines.remove(mask, line_type, false, sessions)
    }

    /// Register a new local session.
    ///
    /// Runs the connect-time X-line check. A banned session is never
    /// inserted and its disconnect is returned instead of a UID.
    pub fn connect(
        &self,
        nick: &str,
        user: &str,
        host: &str,
        ip: IpAddr,
        now: i64,
    ) -> Result<String, Disconnect> {
        let n = self.next_client.fetch_add(1, Ordering::Relaxed);
        let mut session = LocalSession {
            uid: format!("{}{:06X}", self.sid, n),
            nick: nick.to_string(),
            user: user.to_string(),
            host: host.to_string(),
            ip,
            created_at: now,
            exempt: false,
        };

        let mut inner = self.inner.lock();
        if let Some(disconnect) = inner.xlines.check_connect(&mut session) {
            info!(
                nick = %nick,
                ip = %ip,
                line_type = %disconnect.line_type,
                "Rejected X-lined connection"
            );
            return Err(disconnect);
        }

        let uid = session.uid.clone();
        debug!(uid = %uid, nick = %nick, exempt = session.exempt, "Session registered");
        inner.sessions.insert(session);
        Ok(uid)
    }

    /// Remove a session that quit on its own.
    pub fn quit(&self, uid: &str) -> Option<LocalSession> {
        self.inner.lock().sessions.remove(uid)
    }

    /// Whether a nickname is free of Q-lines. Returns the Q-line reason
    /// when it is not.
    pub fn check_nick(&self, nick: &str) -> Option<String> {
        let inner = self.inner.lock();
        inner
            .xlines
            .matches_qline(nick)
            .map(|line| line.reason().to_string())
    }

    /// One scheduler tick: reap expired lines, then apply pending ones.
    pub fn tick(&self, now: i64) -> TickReport {
        let mut inner = self.inner.lock();
        let Inner { xlines, sessions } = &mut *inner;

        let expired = xlines.sweep_expired(now, sessions);
        xlines.apply_pending(sessions);

        TickReport {
            expired,
            disconnected: sessions.take_disconnects(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    /// Exempt flag of a session, if it is still connected.
    pub fn is_exempt(&self, uid: &str) -> Option<bool> {
        self.inner.lock().sessions.get(uid).map(|s| s.exempt)
    }

    /// Run a read-only query against the line store.
    pub fn with_xlines<R>(&self, f: impl FnOnce(&XLineManager) -> R) -> R {
        f(&self.inner.lock().xlines)
    }
}
