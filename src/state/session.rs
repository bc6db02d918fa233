//! Local client sessions as seen by the X-line store.

use crate::xline::{Disconnect, Session, SessionSet};
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::info;

/// A registered local client.
#[derive(Debug, Clone)]
pub struct LocalSession {
    pub uid: String,
    pub nick: String,
    /// Username (ident).
    pub user: String,
    pub host: String,
    /// Real IP address of the connection.
    pub ip: IpAddr,
    /// Unix timestamp when this session registered.
    pub created_at: i64,
    /// Immune to bans, per the last exemption recomputation.
    pub exempt: bool,
}

impl Session for LocalSession {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn nick(&self) -> &str {
        &self.nick
    }

    fn ident(&self) -> &str {
        &self.user
    }

    fn host(&self) -> &str {
        &self.host
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

/// Local sessions keyed by UID.
///
/// Disconnects remove the session and are queued for the transport layer,
/// which owns the socket and sends the notice and ERROR line.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<String, LocalSession>,
    disconnects: Vec<Disconnect>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: LocalSession) {
        self.sessions.insert(session.uid.clone(), session);
    }

    pub fn remove(&mut self, uid: &str) -> Option<LocalSession> {
        self.sessions.remove(uid)
    }

    pub fn get(&self, uid: &str) -> Option<&LocalSession> {
        self.sessions.get(uid)
    }

    pub fn get_mut(&mut self, uid: &str) -> Option<&mut LocalSession> {
        self.sessions.get_mut(uid)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drain disconnects issued since the last call.
    pub fn take_disconnects(&mut self) -> Vec<Disconnect> {
        std::mem::take(&mut self.disconnects)
    }
}

impl SessionSet for SessionTable {
    type Session = LocalSession;

    fn sessions(&self) -> impl Iterator<Item = &LocalSession> {
        self.sessions.values()
    }

    fn sessions_mut(&mut self) -> impl Iterator<Item = &mut LocalSession> {
        self.sessions.values_mut()
    }

    fn disconnect(&mut self, disconnect: Disconnect) {
        if let Some(session) = self.sessions.remove(&disconnect.uid) {
            info!(
                uid = %session.uid,
                nick = %session.nick,
                reason = %disconnect.quit_reason,
                "Session disconnected"
            );
            self.disconnects.push(disconnect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xline::LineType;

    fn session(uid: &str) -> LocalSession {
        LocalSession {
            uid: uid.to_string(),
            nick: "nick".to_string(),
            user: "user".to_string(),
            host: "host.example".to_string(),
            ip: "2001:db8::1".parse().unwrap(),
            created_at: 0,
            exempt: false,
        }
    }

    #[test]
    fn test_ip_string_is_literal() {
        assert_eq!(session("a").ip_string(), "2001:db8::1");
    }

    #[test]
    fn test_disconnect_removes_and_queues() {
        let mut table = SessionTable::new();
        table.insert(session("a"));
        table.insert(session("b"));

        let disconnect = Disconnect {
            uid: "a".into(),
            line_type: LineType::Kline,
            notice: None,
            quit_reason: "K-Lined: bye".into(),
            oper_reason: "K-Lined: bye".into(),
        };
        table.disconnect(disconnect.clone());
        // A second disconnect for a gone session is dropped.
        table.disconnect(disconnect.clone());

        assert_eq!(table.len(), 1);
        assert!(table.get("a").is_none());
        assert_eq!(table.take_disconnects(), vec![disconnect]);
        assert!(table.take_disconnects().is_empty());
    }
}
