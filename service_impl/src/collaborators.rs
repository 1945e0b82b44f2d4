use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use service::{ConsultantDirectory, MeetingProvisioner, Notifier, ProvisionedMeeting, ServiceError};
use uuid::Uuid;

/// Logs and drops every notification (§6: failures must never propagate into
/// the booking transaction's result, so a no-op is a legitimate stand-in
/// until a real transport, e.g. an email/SMS dispatcher, is wired up).
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn session_booked(&self, session_id: Uuid, client_id: Uuid, consultant_id: Uuid) {
        tracing::info!(%session_id, %client_id, %consultant_id, "session booked");
    }
}

/// Always declines to provision a meeting link. A session is created without
/// one (§6); a real implementation would call out to a video-conferencing
/// API and is out of scope for this core.
pub struct NoMeetingProvisioner;

#[async_trait]
impl MeetingProvisioner for NoMeetingProvisioner {
    async fn create(&self, _session_id: Uuid) -> Option<ProvisionedMeeting> {
        None
    }
}

/// Resolves consultant slugs from a static `slug=uuid:is_active` map read
/// once from the `CONSULTANTS` environment variable (e.g.
/// `acme=6f9c2f1a-...:true,other=...:false`). Consultant identity and
/// ownership live outside this core (§3); this is the minimal directory a
/// standalone deployment needs until it is replaced by a call into whatever
/// system of record owns consultant accounts.
pub struct StaticConsultantDirectory {
    entries: HashMap<String, (Uuid, bool)>,
}

impl StaticConsultantDirectory {
    pub fn from_env() -> Self {
        let raw = env::var("CONSULTANTS").unwrap_or_default();
        let mut entries = HashMap::new();
        for entry in raw.split(',').filter(|s| !s.is_empty()) {
            let Some((slug, rest)) = entry.split_once('=') else { continue };
            let Some((id_str, active_str)) = rest.split_once(':') else { continue };
            let (Ok(id), Ok(is_active)) = (id_str.parse::<Uuid>(), active_str.parse::<bool>()) else { continue };
            entries.insert(slug.to_string(), (id, is_active));
        }
        Self { entries }
    }
}

#[async_trait]
impl ConsultantDirectory for StaticConsultantDirectory {
    async fn resolve_slug(&self, slug: &str) -> Result<Option<(Uuid, bool)>, ServiceError> {
        Ok(self.entries.get(slug).copied())
    }
}
