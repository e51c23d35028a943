use hexmap_shared::{ApiError, CampaignId, Role};

/// Identity of the caller, as resolved by the server from its own session
/// store. Nothing in here ever comes from a request body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionContext {
    pub campaign_id: CampaignId,
    pub campaign_slug: String,
    pub role: Role,
}

impl SessionContext {
    pub fn new(campaign_id: CampaignId, campaign_slug: impl Into<String>, role: Role) -> Self {
        Self {
            campaign_id,
            campaign_slug: campaign_slug.into(),
            role,
        }
    }

    pub fn dm(campaign_id: CampaignId, campaign_slug: impl Into<String>) -> Self {
        Self::new(campaign_id, campaign_slug, Role::Dm)
    }

    pub fn player(campaign_id: CampaignId, campaign_slug: impl Into<String>) -> Self {
        Self::new(campaign_id, campaign_slug, Role::Player)
    }

    /// Rejects a request addressed to a campaign other than the caller's own
    pub fn authorize(&self, slug: &str) -> Result<(), ApiError> {
        if self.campaign_slug != slug {
            return Err(ApiError::authorization(format!(
                "session belongs to campaign '{}', not '{}'",
                self.campaign_slug, slug
            )));
        }
        Ok(())
    }

    /// Like [`authorize`](Self::authorize), additionally requiring the DM role
    pub fn authorize_dm(&self, slug: &str, action: &str) -> Result<(), ApiError> {
        self.authorize(slug)?;
        if !self.role.is_dm() {
            return Err(ApiError::authorization(format!(
                "only the DM may {}",
                action
            )));
        }
        Ok(())
    }
}
