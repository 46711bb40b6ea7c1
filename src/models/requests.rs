use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use crate::models::{AssemblyStrategy, MatchProfile};

/// Request to run the match function for one profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RunRequest {
    #[validate(custom(function = "validate_profile"))]
    pub profile: MatchProfile,
}

fn validate_profile(profile: &MatchProfile) -> Result<(), ValidationError> {
    if profile.name.trim().is_empty() {
        return Err(ValidationError::new("empty_profile_name"));
    }
    if profile.pools.is_empty() {
        return Err(ValidationError::new("no_pools"));
    }
    if profile.quality_attribute.trim().is_empty() {
        return Err(ValidationError::new("empty_quality_attribute"));
    }
    match &profile.strategy {
        AssemblyStrategy::Team { team_size, .. } if *team_size == 0 => {
            Err(ValidationError::new("team_size_not_positive"))
        }
        AssemblyStrategy::CrossPool { per_pool_count, .. } if *per_pool_count == 0 => {
            Err(ValidationError::new("per_pool_count_not_positive"))
        }
        _ => Ok(()),
    }
}
