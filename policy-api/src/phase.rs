#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ExecutionPhase {
    Request,
    Response,
    MessageRequest,
    MessageResponse,
}

impl ExecutionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "REQUEST",
            Self::Response => "RESPONSE",
            Self::MessageRequest => "MESSAGE_REQUEST",
            Self::MessageResponse => "MESSAGE_RESPONSE",
        }
    }

    pub fn is_message(&self) -> bool {
        matches!(self, Self::MessageRequest | Self::MessageResponse)
    }

    /// Request-family phases run a flow's pre steps, response-family
    /// phases run its post steps.
    pub fn is_request_family(&self) -> bool {
        matches!(self, Self::Request | Self::MessageRequest)
    }
}

impl std::fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stream axis of the legacy policy dialect. Legacy policies only exist on
/// the plain request/response streams, never on message streams.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StreamKind {
    Request,
    Response,
}

impl StreamKind {
    pub fn from_phase(phase: ExecutionPhase) -> Option<Self> {
        match phase {
            ExecutionPhase::Request => Some(Self::Request),
            ExecutionPhase::Response => Some(Self::Response),
            ExecutionPhase::MessageRequest | ExecutionPhase::MessageResponse => None,
        }
    }
}
