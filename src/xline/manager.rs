//! The active line store.
//!
//! All lines of every type live in one list sorted by expiry, with every
//! permanent line after every timed line. Expiry therefore only ever looks
//! at the front of the list. A per-type index keyed by normalized mask sits
//! beside the list, and newly added enforcement lines wait in a pending
//! queue until the next application pass runs them against live sessions.
//!
//! The store has a single owner. Callers that share it across tasks must
//! serialize access (see [`crate::state::ServerState`]).

use super::session::{Session, SessionSet};
use super::types::{Disconnect, EnforcementOptions, LineMask, LineType, XLine};
use crate::error::XLineError;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of a successful add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// No line existed for this type and mask.
    Added,
    /// An existing line for this type and mask was replaced.
    Replaced,
}

/// Owner of all active X-lines.
#[derive(Debug, Default)]
pub struct XLineManager {
    /// Every active line, ascending by expiry, permanent lines last.
    active_lines: VecDeque<Arc<XLine>>,
    /// Type -> normalized mask -> line. Mirrors `active_lines` exactly.
    lookup_lines: HashMap<LineType, HashMap<String, Arc<XLine>>>,
    /// Enforcement lines not yet run against connected sessions.
    pending_lines: VecDeque<Arc<XLine>>,
    options: EnforcementOptions,
}

impl XLineManager {
    pub fn new(options: EnforcementOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &EnforcementOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: EnforcementOptions) {
        self.options = options;
    }

    /// Number of active lines of all types.
    pub fn len(&self) -> usize {
        self.active_lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_lines.is_empty()
    }

    /// Number of lines waiting for the next application pass.
    pub fn pending_len(&self) -> usize {
        self.pending_lines.len()
    }

    /// Active lines of one type, in expiry order.
    pub fn lines(&self, line_type: LineType) -> impl Iterator<Item = &XLine> + '_ {
        self.active_lines
            .iter()
            .filter(move |line| line.line_type() == line_type)
            .map(|line| line.as_ref())
    }

    /// Look up a line by its exact normalized mask.
    pub fn get(&self, line_type: LineType, mask: &str) -> Option<&XLine> {
        let key = LineMask::parse(line_type, mask).key();
        self.lookup_lines
            .get(&line_type)
            .and_then(|by_mask| by_mask.get(&key))
            .map(|line| line.as_ref())
    }

    // ------------------------------------------------------------------
    // Add / remove
    // ------------------------------------------------------------------

    /// Add a line, replacing any line with the same type and mask.
    ///
    /// E-lines immediately recompute every session's exempt flag. Other
    /// types are queued for the next [`apply_pending`](Self::apply_pending).
    pub fn add<S: SessionSet>(
        &mut self,
        line: XLine,
        sessions: &mut S,
    ) -> Result<AddOutcome, XLineError> {
        let is_eline = line.line_type() == LineType::Eline;
        let outcome = self.insert(line)?;
        if is_eline {
            self.recompute_exemptions(sessions);
        }
        Ok(outcome)
    }

    /// Add a G-line. Returns `false` if the line could not be stored.
    pub fn add_gline(
        &mut self,
        now: i64,
        duration: u64,
        source: &str,
        reason: &str,
        hostmask: &str,
    ) -> bool {
        self.add_enforcing(XLine::new(LineType::Gline, hostmask, now, duration, source, reason))
    }

    /// Add a K-line. Returns `false` if the line could not be stored.
    pub fn add_kline(
        &mut self,
        now: i64,
        duration: u64,
        source: &str,
        reason: &str,
        hostmask: &str,
    ) -> bool {
        self.add_enforcing(XLine::new(LineType::Kline, hostmask, now, duration, source, reason))
    }

    /// Add a Z-line. Any `ident@` prefix on the address is dropped.
    pub fn add_zline(
        &mut self,
        now: i64,
        duration: u64,
        source: &str,
        reason: &str,
        ipaddr: &str,
    ) -> bool {
        self.add_enforcing(XLine::new(LineType::Zline, ipaddr, now, duration, source, reason))
    }

    /// Add a Q-line on a nickname mask.
    pub fn add_qline(
        &mut self,
        now: i64,
        duration: u64,
        source: &str,
        reason: &str,
        nickname: &str,
    ) -> bool {
        self.add_enforcing(XLine::new(LineType::Qline, nickname, now, duration, source, reason))
    }

    /// Add an E-line and recompute exemptions across `sessions`.
    pub fn add_eline<S: SessionSet>(
        &mut self,
        sessions: &mut S,
        now: i64,
        duration: u64,
        source: &str,
        reason: &str,
        hostmask: &str,
    ) -> bool {
        let line = XLine::new(LineType::Eline, hostmask, now, duration, source, reason);
        match self.add(line, sessions) {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, code = e.error_code(), "Failed to add E-Line");
                false
            }
        }
    }

    fn add_enforcing(&mut self, line: XLine) -> bool {
        let line_type = line.line_type();
        match self.insert(line) {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, code = e.error_code(), line_type = %line_type, "Failed to add line");
                false
            }
        }
    }

    /// Store a line in the sorted list, the index and (for enforcement
    /// types) the pending queue. Replaces a same-mask line without running
    /// its unset behavior.
    fn insert(&mut self, line: XLine) -> Result<AddOutcome, XLineError> {
        let line_type = line.line_type();
        let key = line.mask().key();

        let existing = self
            .lookup_lines
            .get(&line_type)
            .and_then(|by_mask| by_mask.get(&key))
            .cloned();
        let outcome = match existing {
            Some(old) => {
                if !self.unlink(&old) {
                    error!(line_type = %line_type, mask = %key, "Indexed line missing from active list");
                    return Err(XLineError::DuplicateMask {
                        line_type,
                        mask: line.mask().to_string(),
                    });
                }
                AddOutcome::Replaced
            }
            None => AddOutcome::Added,
        };

        let line = Arc::new(line);
        let sort_key = line.sort_key();
        let pos = self
            .active_lines
            .partition_point(|other| other.sort_key() <= sort_key);
        self.active_lines.insert(pos, Arc::clone(&line));
        self.lookup_lines
            .entry(line_type)
            .or_default()
            .insert(key, Arc::clone(&line));
        if line_type.is_enforcing() {
            self.pending_lines.push_back(Arc::clone(&line));
        }

        info!(
            line_type = %line_type,
            mask = %line.mask(),
            source = %line.source(),
            duration = line.duration(),
            replaced = outcome == AddOutcome::Replaced,
            "X-line added"
        );

        Ok(outcome)
    }

    /// Remove the first line of `line_type` matching `mask`.
    ///
    /// An exact normalized-mask hit wins; otherwise the active list is
    /// scanned in expiry order and the line's own mask is globbed against
    /// `mask`. With `simulate` set nothing is changed and the return value
    /// only reports whether a line would have been removed.
    pub fn remove<S: SessionSet>(
        &mut self,
        mask: &str,
        line_type: LineType,
        simulate: bool,
        sessions: &mut S,
    ) -> bool {
        let Some(line) = self.locate(mask, line_type) else {
            return false;
        };
        if simulate {
            return true;
        }

        if !self.unlink(&line) {
            warn!(line_type = %line_type, mask = %mask, "Line vanished during removal");
            return false;
        }
        info!(line_type = %line_type, mask = %line.mask(), "X-line removed");
        self.unset(&line, sessions);
        true
    }

    fn locate(&self, mask: &str, line_type: LineType) -> Option<Arc<XLine>> {
        let by_mask = self.lookup_lines.get(&line_type)?;
        if let Some(line) = by_mask.get(&LineMask::parse(line_type, mask).key()) {
            return Some(Arc::clone(line));
        }
        self.active_lines
            .iter()
            .find(|line| line.line_type() == line_type && line.matches_mask(mask))
            .cloned()
    }

    /// Drop a line from the active list, the index and the pending queue.
    /// Returns whether it was present in the active list.
    fn unlink(&mut self, line: &Arc<XLine>) -> bool {
        let Some(pos) = self
            .active_lines
            .iter()
            .position(|other| Arc::ptr_eq(other, line))
        else {
            return false;
        };
        self.active_lines.remove(pos);
        self.forget(line);
        true
    }

    /// Index and pending-queue half of [`unlink`](Self::unlink).
    fn forget(&mut self, line: &Arc<XLine>) {
        let line_type = line.line_type();
        if let Some(by_mask) = self.lookup_lines.get_mut(&line_type) {
            let key = line.mask().key();
            if by_mask.get(&key).is_some_and(|indexed| Arc::ptr_eq(indexed, line)) {
                by_mask.remove(&key);
            }
            if by_mask.is_empty() {
                self.lookup_lines.remove(&line_type);
            }
        }
        self.pending_lines.retain(|pending| !Arc::ptr_eq(pending, line));
    }

    /// Type-specific cleanup once a line is gone.
    fn unset<S: SessionSet>(&self, line: &XLine, sessions: &mut S) {
        if line.line_type() == LineType::Eline {
            self.rebuild_exemptions(sessions);
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    fn has_lines(&self, line_type: LineType) -> bool {
        self.lookup_lines
            .get(&line_type)
            .is_some_and(|by_mask| !by_mask.is_empty())
    }

    /// First line of `line_type`, in expiry order, matching a session.
    pub fn find_first_session<S: Session + ?Sized>(
        &self,
        line_type: LineType,
        session: &S,
    ) -> Option<&XLine> {
        if !self.has_lines(line_type) {
            return None;
        }
        self.lines(line_type)
            .find(|line| line.matches_session(session))
    }

    /// First line of `line_type`, in expiry order, matching a raw mask.
    pub fn find_first_mask(&self, line_type: LineType, mask: &str) -> Option<&XLine> {
        if !self.has_lines(line_type) {
            return None;
        }
        self.lines(line_type).find(|line| line.matches_mask(mask))
    }

    pub fn matches_gline<S: Session + ?Sized>(&self, session: &S) -> Option<&XLine> {
        self.find_first_session(LineType::Gline, session)
    }

    pub fn matches_kline<S: Session + ?Sized>(&self, session: &S) -> Option<&XLine> {
        self.find_first_session(LineType::Kline, session)
    }

    pub fn matches_zline<S: Session + ?Sized>(&self, session: &S) -> Option<&XLine> {
        self.find_first_session(LineType::Zline, session)
    }

    /// Q-lines are checked against a nickname, typically before a NICK
    /// change is accepted.
    pub fn matches_qline(&self, nick: &str) -> Option<&XLine> {
        self.find_first_mask(LineType::Qline, nick)
    }

    pub fn matches_exception<S: Session + ?Sized>(&self, session: &S) -> Option<&XLine> {
        self.find_first_session(LineType::Eline, session)
    }

    /// Connect-time authorization.
    ///
    /// Refreshes the session's exempt flag, then checks Z, K, G and Q-lines
    /// in that order. Returns the disconnect for the first match.
    pub fn check_connect<S: Session + ?Sized>(&self, session: &mut S) -> Option<Disconnect> {
        self.refresh_exemption(session);
        let line = [LineType::Zline, LineType::Kline, LineType::Gline, LineType::Qline]
            .into_iter()
            .find_map(|line_type| self.find_first_session(line_type, &*session))?;

        match line.apply(&*session, &self.options) {
            Ok(disconnect) => Some(disconnect),
            Err(e) => {
                warn!(error = %e, uid = %session.uid(), "Connect check matched a non-enforcing line");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Expiry
    // ------------------------------------------------------------------

    /// Reap timed lines whose expiry is strictly before `now`.
    ///
    /// Stops at the first line that is still live or permanent. Returns the
    /// operator notice for each expired line, in expiry order.
    pub fn sweep_expired<S: SessionSet>(&mut self, now: i64, sessions: &mut S) -> Vec<String> {
        let mut notices = Vec::new();
        let mut eline_expired = false;

        while self
            .active_lines
            .front()
            .is_some_and(|front| front.is_expired(now))
        {
            let Some(line) = self.active_lines.pop_front() else {
                break;
            };
            self.forget(&line);

            let notice = line.describe_expiry(now);
            info!(target: "snotice", line_type = %line.line_type(), "{}", notice);
            notices.push(notice);

            if line.line_type() == LineType::Eline {
                eline_expired = true;
            }
        }

        if eline_expired {
            self.rebuild_exemptions(sessions);
        }
        if !notices.is_empty() {
            debug!(count = notices.len(), remaining = self.active_lines.len(), "Expired X-lines swept");
        }

        notices
    }

    // ------------------------------------------------------------------
    // Application
    // ------------------------------------------------------------------

    /// Run every pending line against every connected session, then clear
    /// the pending queue.
    ///
    /// Matches are collected before any disconnect is issued, since a
    /// disconnect may remove the session from `sessions`. Each session is
    /// disconnected at most once, by the earliest pending line it matches.
    /// Returns the number of sessions disconnected.
    pub fn apply_pending<S: SessionSet>(&mut self, sessions: &mut S) -> usize {
        if self.pending_lines.is_empty() {
            return 0;
        }

        let mut disconnects: Vec<Disconnect> = Vec::new();
        for session in sessions.sessions() {
            let Some(line) = self
                .pending_lines
                .iter()
                .find(|line| line.matches_session(session))
            else {
                continue;
            };
            match line.apply(session, &self.options) {
                Ok(disconnect) => disconnects.push(disconnect),
                Err(e) => warn!(error = %e, uid = %session.uid(), "Pending line cannot be applied"),
            }
        }

        let applied = self.pending_lines.len();
        self.pending_lines.clear();

        let count = disconnects.len();
        for disconnect in disconnects {
            info!(
                uid = %disconnect.uid,
                line_type = %disconnect.line_type,
                reason = %disconnect.oper_reason,
                "Disconnecting X-lined session"
            );
            sessions.disconnect(disconnect);
        }
        debug!(lines = applied, disconnected = count, "Pending X-lines applied");

        count
    }

    // ------------------------------------------------------------------
    // Exemptions
    // ------------------------------------------------------------------

    /// Set each session's exempt flag to whether any E-line matches it.
    pub fn recompute_exemptions<S: SessionSet>(&self, sessions: &mut S) {
        let elines: Vec<&Arc<XLine>> = self
            .lookup_lines
            .get(&LineType::Eline)
            .map(|by_mask| by_mask.values().collect())
            .unwrap_or_default();

        let mut exempt = 0usize;
        for session in sessions.sessions_mut() {
            let matched = elines.iter().any(|line| line.matches_session(&*session));
            session.set_exempt(matched);
            exempt += usize::from(matched);
        }
        debug!(elines = elines.len(), exempt, "Exemptions recomputed");
    }

    /// Clear every exempt flag, then recompute from scratch.
    pub fn rebuild_exemptions<S: SessionSet>(&self, sessions: &mut S) {
        for session in sessions.sessions_mut() {
            session.set_exempt(false);
        }
        self.recompute_exemptions(sessions);
    }

    /// Recompute the exempt flag of a single session.
    pub fn refresh_exemption<S: Session + ?Sized>(&self, session: &mut S) {
        let exempt = self.matches_exception(&*session).is_some();
        session.set_exempt(exempt);
    }

    /// Replace every E-line with `elines` and recompute exemptions once.
    ///
    /// Used when the exception blocks of the configuration are reloaded.
    /// Non-E-line entries are skipped. Returns the number of E-lines loaded.
    pub fn reload_exemptions<S: SessionSet>(&mut self, elines: Vec<XLine>, sessions: &mut S) -> usize {
        let old: Vec<Arc<XLine>> = self
            .active_lines
            .iter()
            .filter(|line| line.line_type() == LineType::Eline)
            .cloned()
            .collect();
        for line in &old {
            self.unlink(line);
        }

        let mut loaded = 0;
        for line in elines {
            if line.line_type() != LineType::Eline {
                warn!(line_type = %line.line_type(), mask = %line.mask(), "Skipping non E-Line in exemption reload");
                continue;
            }
            match self.insert(line) {
                Ok(_) => loaded += 1,
                Err(e) => error!(error = %e, "Failed to reload E-Line"),
            }
        }

        self.rebuild_exemptions(sessions);
        info!(removed = old.len(), loaded, "E-lines reloaded");
        loaded
    }
}
