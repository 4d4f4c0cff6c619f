//! Connection state machine for the transport client.
//!
//! Pure bookkeeping with no I/O: the connection supervisor reports what
//! happened (`on_open`, `on_error`, `on_close`) and this module decides what
//! to do next.
//!
//! ```text
//!                 begin_connect
//!  Disconnected ────────────────► Connecting ──on_open──► Connected
//!       ▲                             │                      │
//!       │                          on_error               on_close
//!       │                             ▼                      │
//!       └────────── on_close ────── Error ◄──────────────────┘
//!                      │
//!                      └─► Reconnect (attempts < max, not manual, not destroyed)
//!                          Stop      (otherwise)
//! ```
//!
//! The reconnect counter is incremented when the reconnect actually starts
//! (after the retry interval), and reset to zero by every successful open.
//!
//! A close that follows an error and leads to a retry keeps the `Error`
//! phase through the retry wait, so observers of the status channel see the
//! failure until the next attempt begins.  A close that gives up always ends
//! in `Disconnected`.

/// Status reported to observers.
///
/// `Connecting` is an internal phase and is reported as `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
    Error,
}

/// Internal connection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// What the supervisor should do after a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Wait the retry interval, then call [`ConnectionState::begin_reconnect`].
    Reconnect,
    /// Give up; the client stays disconnected until `connect` is called.
    Stop,
}

/// Connection bookkeeping owned by one transport client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    phase: Phase,
    reconnect_attempts: u32,
    max_reconnect_attempts: u32,
    manual_close: bool,
    destroyed: bool,
}

impl ConnectionState {
    pub fn new(max_reconnect_attempts: u32) -> Self {
        Self {
            phase: Phase::Disconnected,
            reconnect_attempts: 0,
            max_reconnect_attempts,
            manual_close: false,
            destroyed: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> ConnectionStatus {
        match self.phase {
            Phase::Disconnected | Phase::Connecting => ConnectionStatus::Disconnected,
            Phase::Connected => ConnectionStatus::Connected,
            Phase::Error => ConnectionStatus::Error,
        }
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn is_manual_close(&self) -> bool {
        self.manual_close
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Starts an explicit connection attempt.
    ///
    /// Returns `false` (and changes nothing) when already connected or
    /// connecting, or when the client has been destroyed.
    pub fn begin_connect(&mut self) -> bool {
        if self.destroyed || matches!(self.phase, Phase::Connected | Phase::Connecting) {
            return false;
        }
        self.manual_close = false;
        self.phase = Phase::Connecting;
        true
    }

    /// The socket opened.
    pub fn on_open(&mut self) {
        self.phase = Phase::Connected;
        self.reconnect_attempts = 0;
    }

    /// A connection attempt or an open connection failed.
    pub fn on_error(&mut self) {
        self.phase = Phase::Error;
    }

    /// The socket closed (or never opened).  Decides whether to retry.
    pub fn on_close(&mut self) -> CloseAction {
        let action = if !self.manual_close
            && !self.destroyed
            && self.reconnect_attempts < self.max_reconnect_attempts
        {
            CloseAction::Reconnect
        } else {
            CloseAction::Stop
        };
        if !(action == CloseAction::Reconnect && self.phase == Phase::Error) {
            self.phase = Phase::Disconnected;
        }
        action
    }

    /// The retry interval elapsed; starts the next attempt.
    ///
    /// Returns `false` when a manual close or destroy happened in the
    /// meantime.
    pub fn begin_reconnect(&mut self) -> bool {
        if self.manual_close || self.destroyed {
            return false;
        }
        self.reconnect_attempts += 1;
        self.phase = Phase::Connecting;
        true
    }

    /// The user asked to disconnect.
    pub fn mark_manual_close(&mut self) {
        self.manual_close = true;
        self.phase = Phase::Disconnected;
    }

    /// Makes the client permanently unusable.
    pub fn destroy(&mut self) {
        self.mark_manual_close();
        self.destroyed = true;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
