//! Session seams used by the line store.
//!
//! The X-line core never owns client state. It reads identity fields and the
//! exempt flag through [`Session`], and asks a [`SessionSet`] to carry out
//! disconnects, which may remove the session from the set.

use super::types::Disconnect;

/// Identity view of a connected client, plus its exempt flag.
pub trait Session {
    /// Unique id of the session, used to address disconnects.
    fn uid(&self) -> &str;

    /// Current nickname.
    fn nick(&self) -> &str;

    /// Username (ident) as supplied at registration.
    fn ident(&self) -> &str;

    /// Resolved hostname, or the IP string when resolution failed.
    fn host(&self) -> &str;

    /// Literal IP address string.
    fn ip_string(&self) -> String;

    /// Exempt flag as of the last exemption recomputation.
    fn is_exempt(&self) -> bool;

    fn set_exempt(&mut self, exempt: bool);
}

/// The live set of local sessions.
pub trait SessionSet {
    type Session: Session;

    fn sessions(&self) -> impl Iterator<Item = &Self::Session>;

    fn sessions_mut(&mut self) -> impl Iterator<Item = &mut Self::Session>;

    /// Disconnect a session. Implementations usually remove it from the set.
    fn disconnect(&mut self, disconnect: Disconnect);
}
