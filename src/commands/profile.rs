use chrono::Utc;

use crate::models::profile::{GoalProfile, OnboardingInput, ProfileUpdateInput};
use crate::models::progress::{AdvancementOutcome, ProgressHistory};

use super::{run, AppState, CommandResult};

pub fn profile_get(state: &AppState) -> CommandResult<Option<GoalProfile>> {
    run(|| state.profile().get_profile())
}

pub fn profile_onboard(state: &AppState, payload: OnboardingInput) -> CommandResult<GoalProfile> {
    run(|| state.profile().onboard(payload, Utc::now()))
}

pub fn profile_update(
    state: &AppState,
    payload: ProfileUpdateInput,
) -> CommandResult<GoalProfile> {
    run(|| state.profile().update_profile(payload, Utc::now()))
}

pub fn goal_progress_history(state: &AppState) -> CommandResult<Option<ProgressHistory>> {
    run(|| state.goal_progress().progress_history())
}

/// Manual trigger of the weekly check; the same pipeline runs on every start.
pub fn goal_progress_run(state: &AppState) -> CommandResult<AdvancementOutcome> {
    Ok(state.goal_progress().run_advancement(Utc::now()))
}
