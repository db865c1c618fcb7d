use crate::config::SessionConfig;
use uuid::Uuid;
use vesper_voice::CredentialRequest;

/// Names a single connection attempt joins under.
///
/// Regenerated for every attempt so a retry never collides with a stale
/// participant still registered on the signaling server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub session_id: String,
    pub room_name: String,
    pub participant_name: String,
    pub agent_name: String,
}

impl SessionIdentity {
    pub fn fresh(config: &SessionConfig) -> Self {
        let session_id = Uuid::new_v4().simple().to_string();
        let short = &session_id[..12];
        Self {
            room_name: format!("{}-{}", config.room_prefix, short),
            participant_name: format!("{}-{}", config.participant_prefix, short),
            agent_name: config.agent_name.clone(),
            session_id,
        }
    }

    pub fn credential_request(&self) -> CredentialRequest {
        CredentialRequest::new(&self.room_name, &self.participant_name, &self.agent_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_identities_differ() {
        let config = SessionConfig::default();
        let a = SessionIdentity::fresh(&config);
        let b = SessionIdentity::fresh(&config);
        assert_ne!(a.room_name, b.room_name);
        assert_ne!(a.participant_name, b.participant_name);
        assert!(a.room_name.starts_with("voice-agent-room-"));
        assert!(a.participant_name.starts_with("user-"));
        assert_eq!(a.agent_name, "voice-agent");
    }

    #[test]
    fn credential_request_carries_all_names() {
        let identity = SessionIdentity::fresh(&SessionConfig::default());
        let request = identity.credential_request();
        assert_eq!(request.room_name, identity.room_name);
        assert_eq!(request.participant_name, identity.participant_name);
        assert!(request.validate().is_ok());
    }
}
