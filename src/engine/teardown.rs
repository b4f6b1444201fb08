/// How far a connection has progressed into its FIN handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Teardown {
    /// Normal operation; no FIN has been sent or accepted.
    None,
    /// We sent a FIN first, either because our source ended or because the
    /// retransmission limit forced the connection closed. Waiting on the
    /// peer's FIN.
    ActiveClosing,
    /// The peer's FIN arrived first and we answered with our own. Waiting
    /// on the peer's final acknowledgement.
    PassiveClosing,
}
