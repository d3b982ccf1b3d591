//! Connection state machine.
//!
//! ```text
//! AwaitingLine ──► DispatchingStandard ──► Closed
//!      │
//!      ├─────────► ReceivingBody ────────► Closed
//!      │
//!      └─────────────────────────────────► Closed
//! ```

/// Per-connection protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Reading text lines until the request line arrives.
    AwaitingLine,
    /// A Standard request is being resolved; input is ignored.
    DispatchingStandard,
    /// Every inbound byte belongs to the Drift payload.
    ReceivingBody,
    /// Terminal. The response has been produced or the peer is gone.
    Closed,
}

/// Attempted move not present in the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal connection state transition {from:?} -> {to:?}")]
pub struct IllegalTransition {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

impl ConnectionState {
    /// Whether the table allows `self -> to`.
    pub fn can_transition_to(self, to: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, to),
            (AwaitingLine, DispatchingStandard)
                | (AwaitingLine, ReceivingBody)
                | (AwaitingLine, Closed)
                | (DispatchingStandard, Closed)
                | (ReceivingBody, Closed)
        )
    }

    /// Apply a transition, rejecting moves outside the table.
    pub fn transition(&mut self, to: ConnectionState) -> Result<(), IllegalTransition> {
        if !self.can_transition_to(to) {
            return Err(IllegalTransition { from: *self, to });
        }
        tracing::trace!(from = ?*self, to = ?to, "Connection state transition");
        *self = to;
        Ok(())
    }

    /// Whether inbound bytes are still interpreted.
    pub fn accepts_input(self) -> bool {
        matches!(
            self,
            ConnectionState::AwaitingLine | ConnectionState::ReceivingBody
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionState::*;
    use super::*;

    #[test]
    fn standard_path() {
        let mut state = AwaitingLine;
        state.transition(DispatchingStandard).unwrap();
        state.transition(Closed).unwrap();
        assert_eq!(state, Closed);
    }

    #[test]
    fn drift_path() {
        let mut state = AwaitingLine;
        state.transition(ReceivingBody).unwrap();
        state.transition(Closed).unwrap();
    }

    #[test]
    fn closed_is_terminal() {
        for to in [AwaitingLine, DispatchingStandard, ReceivingBody, Closed] {
            assert!(!Closed.can_transition_to(to));
        }
    }

    #[test]
    fn no_way_back_to_line_mode() {
        let mut state = ReceivingBody;
        let err = state.transition(AwaitingLine).unwrap_err();
        assert_eq!(
            err,
            IllegalTransition {
                from: ReceivingBody,
                to: AwaitingLine
            }
        );
        assert_eq!(state, ReceivingBody);
        assert!(!DispatchingStandard.can_transition_to(ReceivingBody));
    }

    #[test]
    fn only_line_and_body_states_read_input() {
        assert!(AwaitingLine.accepts_input());
        assert!(ReceivingBody.accepts_input());
        assert!(!DispatchingStandard.accepts_input());
        assert!(!Closed.accepts_input());
    }
}
