mod campaign_record;
mod memory_store;

pub use campaign_record::CampaignRecord;
pub use memory_store::{CampaignSeed, MemoryStore};
